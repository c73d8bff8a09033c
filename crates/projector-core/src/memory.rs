// crates/projector-core/src/memory.rs
// ============================================================================
// Module: In-Memory Flow
// Description: Flow backed by an in-process map and a broadcast channel.
// Purpose: Serve seeded state and hold polled state for override flows.
// Dependencies: serde_json, tokio, tokio-stream
// ============================================================================

//! ## Overview
//! [`MemoryFlow`] keeps its state in a map guarded by a lock and publishes the
//! effective change set of every write on a bounded broadcast channel.
//! Writes that do not change a value are not published. Subscribers that fall
//! behind the channel capacity receive [`FlowError::Lagged`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::flow::Flow;
use crate::flow::FlowError;
use crate::flow::FlowKey;
use crate::flow::FlowStream;
use crate::flow::FlowValues;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Buffered change sets per subscriber before it is reported as lagged.
const UPDATE_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// SECTION: Memory Flow
// ============================================================================

/// Flow backed by an in-process key/value map.
///
/// # Invariants
/// - Published change sets only contain keys whose value actually changed.
/// - Change sets are published while the write lock is held, so subscribers
///   observe writes in the order they were applied.
pub struct MemoryFlow {
    /// Flow name used to tag errors.
    name: String,
    /// Current state.
    state: RwLock<BTreeMap<FlowKey, Value>>,
    /// Change set publisher.
    updates: broadcast::Sender<Arc<FlowValues>>,
}

impl MemoryFlow {
    /// Creates an empty flow.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            name: name.into(),
            state: RwLock::new(BTreeMap::new()),
            updates,
        }
    }

    /// Creates a flow seeded from a `{ "<key>": value }` JSON object.
    ///
    /// Members with a `null` value are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the seed is not an object or a member name
    /// is not a valid key.
    pub fn from_json(name: impl Into<String>, seed: &Value) -> Result<Self, FlowError> {
        let Value::Object(members) = seed else {
            return Err(FlowError::InvalidData("seed must be a JSON object".to_string()));
        };
        let mut state = BTreeMap::new();
        for (key, value) in members {
            if value.is_null() {
                continue;
            }
            state.insert(FlowKey::parse(key)?, value.clone());
        }
        let flow = Self::new(name);
        flow.replace_all(state)?;
        Ok(flow)
    }

    /// Applies a change set and publishes the effective changes.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Unavailable`] when the state lock is poisoned.
    pub fn apply(&self, changes: FlowValues) -> Result<FlowValues, FlowError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        Ok(self.apply_locked(&mut state, changes))
    }

    /// Replaces the whole state, publishing updates and deletions.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Unavailable`] when the state lock is poisoned.
    pub fn replace_all(&self, next: BTreeMap<FlowKey, Value>) -> Result<FlowValues, FlowError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let mut changes: FlowValues = state
            .keys()
            .filter(|key| !next.contains_key(*key))
            .map(|key| (key.clone(), None))
            .collect();
        changes.extend(next.into_iter().map(|(key, value)| (key, Some(value))));
        Ok(self.apply_locked(&mut state, changes))
    }

    /// Returns the number of stored keys.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Unavailable`] when the state lock is poisoned.
    pub fn len(&self) -> Result<usize, FlowError> {
        Ok(self.state.read().map_err(|_| poisoned())?.len())
    }

    /// Returns true when no key is stored.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Unavailable`] when the state lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, FlowError> {
        Ok(self.len()? == 0)
    }

    /// Writes `changes` into `state` and publishes what actually changed.
    fn apply_locked(
        &self,
        state: &mut BTreeMap<FlowKey, Value>,
        changes: FlowValues,
    ) -> FlowValues {
        let mut effective = FlowValues::new();
        for (key, value) in changes {
            match value {
                Some(value) => {
                    if state.get(&key) != Some(&value) {
                        state.insert(key.clone(), value.clone());
                        effective.insert(key, Some(value));
                    }
                }
                None => {
                    if state.remove(&key).is_some() {
                        effective.insert(key, None);
                    }
                }
            }
        }
        if !effective.is_empty() {
            // No receivers is not an error; nobody is subscribed yet.
            let _ = self.updates.send(Arc::new(effective.clone()));
        }
        effective
    }
}

#[async_trait]
impl Flow for MemoryFlow {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, keys: &[FlowKey]) -> Result<FlowValues, FlowError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(keys.iter().map(|key| (key.clone(), state.get(key).cloned())).collect())
    }

    fn subscribe(&self, keys: &[FlowKey]) -> FlowStream {
        let wanted: BTreeSet<FlowKey> = keys.iter().cloned().collect();
        let name = self.name.clone();
        let stream =
            BroadcastStream::new(self.updates.subscribe()).filter_map(move |item| match item {
                Ok(changes) => {
                    let hits: FlowValues = changes
                        .iter()
                        .filter(|(key, _)| wanted.contains(*key))
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect();
                    (!hits.is_empty()).then_some(Ok(hits))
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => Some(Err(FlowError::Lagged {
                    flow: name.clone(),
                    skipped,
                })),
            });
        Box::pin(stream)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Error reported when a writer panicked while holding the state lock.
fn poisoned() -> FlowError {
    FlowError::Unavailable("flow state lock poisoned".to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
