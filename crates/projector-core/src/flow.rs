// crates/projector-core/src/flow.rs
// ============================================================================
// Module: Flow Abstraction
// Description: Keyed, subscribable state sources consumed by the gateway.
// Purpose: Define the two-operation capability every data source exposes.
// Dependencies: async-trait, serde_json, tokio-stream, thiserror
// ============================================================================

//! ## Overview
//! A [`Flow`] is a named source of keyed JSON state. It supports exactly two
//! data operations: a point lookup for a set of keys and a subscription that
//! yields change notifications for a set of keys. Keys use the
//! `<collection>/<id>/<field>` form and are otherwise opaque.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio_stream::Stream;

// ============================================================================
// SECTION: Flow Keys
// ============================================================================

/// Fully qualified key in the `<collection>/<id>/<field>` form.
///
/// # Invariants
/// - Collection and field are non-empty and never contain `/`.
/// - The id is a positive integer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FlowKey {
    /// Rendered key text.
    raw: String,
    /// Byte length of the collection segment.
    collection_len: usize,
    /// Numeric id segment.
    id: u64,
}

impl FlowKey {
    /// Builds a key from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidFlowKey`] when a segment is empty or malformed.
    pub fn new(collection: &str, id: u64, field: &str) -> Result<Self, InvalidFlowKey> {
        Self::parse(&format!("{collection}/{id}/{field}"))
    }

    /// Parses a key from its textual form.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidFlowKey`] when the text is not `<collection>/<id>/<field>`.
    pub fn parse(text: &str) -> Result<Self, InvalidFlowKey> {
        let invalid = || InvalidFlowKey(text.to_string());
        let mut parts = text.splitn(3, '/');
        let collection = parts.next().ok_or_else(invalid)?;
        let id = parts.next().ok_or_else(invalid)?;
        let field = parts.next().ok_or_else(invalid)?;
        if collection.is_empty() || field.is_empty() || field.contains('/') {
            return Err(invalid());
        }
        let id = id.parse::<u64>().map_err(|_| invalid())?;
        if id == 0 {
            return Err(invalid());
        }
        Ok(Self {
            raw: text.to_string(),
            collection_len: collection.len(),
            id,
        })
    }

    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the collection segment.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.raw[..self.collection_len]
    }

    /// Returns the id segment.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns the field segment.
    #[must_use]
    pub fn field(&self) -> &str {
        self.raw.rsplit_once('/').map_or("", |(_, field)| field)
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for FlowKey {
    type Err = InvalidFlowKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FlowKey {
    type Error = InvalidFlowKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FlowKey> for String {
    fn from(key: FlowKey) -> Self {
        key.raw
    }
}

/// Rejected key text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid flow key `{0}`")]
pub struct InvalidFlowKey(pub String);

// ============================================================================
// SECTION: Flow Trait
// ============================================================================

/// Key to value mapping; `None` marks an absent or deleted key.
pub type FlowValues = BTreeMap<FlowKey, Option<Value>>;

/// Stream of change sets produced by [`Flow::subscribe`].
pub type FlowStream = Pin<Box<dyn Stream<Item = Result<FlowValues, FlowError>> + Send>>;

/// Named, subscribable source of keyed state.
///
/// # Invariants
/// - `get` returns an entry for every requested key.
/// - Each `subscribe` call yields an independent stream; a finished or
///   failed stream is restarted by subscribing again.
/// - Change sets only contain requested keys, in the order the flow produced
///   them.
#[async_trait]
pub trait Flow: Send + Sync {
    /// Returns the flow name used to tag errors.
    fn name(&self) -> &str;

    /// Reads the current values of `keys`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the underlying source cannot be read.
    async fn get(&self, keys: &[FlowKey]) -> Result<FlowValues, FlowError>;

    /// Subscribes to changes of `keys`.
    fn subscribe(&self, keys: &[FlowKey]) -> FlowStream;
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Flow failures.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// A key failed validation.
    #[error(transparent)]
    InvalidKey(#[from] InvalidFlowKey),
    /// Seed or state data is malformed.
    #[error("invalid flow data: {0}")]
    InvalidData(String),
    /// The source cannot serve requests.
    #[error("flow unavailable: {0}")]
    Unavailable(String),
    /// A subscriber fell behind and missed updates.
    #[error("flow {flow} lagged and skipped {skipped} updates")]
    Lagged {
        /// Flow that dropped updates.
        flow: String,
        /// Number of skipped change sets.
        skipped: u64,
    },
    /// Composition rules were violated.
    #[error("flow composition error: {0}")]
    Composition(String),
    /// Failure attributed to a named source.
    #[error("flow {flow} failed: {message}")]
    Source {
        /// Failing flow name.
        flow: String,
        /// Failure description.
        message: String,
    },
}

impl FlowError {
    /// Attributes the error to `flow` unless it already names its source.
    #[must_use]
    pub fn tagged(self, flow: &str) -> Self {
        match self {
            Self::Lagged {
                ..
            }
            | Self::Source {
                ..
            } => self,
            other => Self::Source {
                flow: flow.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Returns true when the error reports missed updates.
    #[must_use]
    pub const fn is_lagged(&self) -> bool {
        matches!(self, Self::Lagged { .. })
    }
}
