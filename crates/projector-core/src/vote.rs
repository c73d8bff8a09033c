// crates/projector-core/src/vote.rs
// ============================================================================
// Module: Live Vote Flow
// Description: Override flow serving live poll tallies.
// Purpose: Hold periodically polled vote counts under `poll/<id>/live_votes`.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! [`LiveVoteFlow`] stores the latest tallies fetched from a
//! [`VoteCountSource`]. Each refresh replaces the whole tally set, so polls
//! the source no longer reports are deleted for subscribers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::combine::OverrideRoute;
use crate::flow::Flow;
use crate::flow::FlowError;
use crate::flow::FlowKey;
use crate::flow::FlowStream;
use crate::flow::FlowValues;
use crate::memory::MemoryFlow;
use crate::refresher::Refresh;
use crate::refresher::RefreshError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Collection the tallies belong to.
pub const POLL_COLLECTION: &str = "poll";
/// Field carrying the tally.
pub const LIVE_VOTES_FIELD: &str = "live_votes";

// ============================================================================
// SECTION: Source
// ============================================================================

/// Poll id to tally payload.
pub type PollTallies = BTreeMap<u64, Value>;

/// Upstream provider of live tallies.
#[async_trait]
pub trait VoteCountSource: Send + Sync {
    /// Fetches the tallies of all polls currently running.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError`] when the upstream cannot be read.
    async fn fetch(&self) -> Result<PollTallies, RefreshError>;
}

// ============================================================================
// SECTION: Flow
// ============================================================================

/// Override flow serving `poll/<id>/live_votes`.
pub struct LiveVoteFlow {
    /// Tally storage.
    store: MemoryFlow,
    /// Tally provider.
    source: Arc<dyn VoteCountSource>,
}

impl LiveVoteFlow {
    /// Creates an empty flow fed by `source`.
    #[must_use]
    pub fn new(source: Arc<dyn VoteCountSource>) -> Self {
        Self {
            store: MemoryFlow::new("live_votes"),
            source,
        }
    }

    /// Route under which the flow overrides the primary flow.
    #[must_use]
    pub fn route() -> OverrideRoute {
        OverrideRoute::collection_field(POLL_COLLECTION, LIVE_VOTES_FIELD)
    }

    /// Returns the key holding the tally of `poll_id`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::InvalidKey`] for poll id zero.
    pub fn key(poll_id: u64) -> Result<FlowKey, FlowError> {
        FlowKey::new(POLL_COLLECTION, poll_id, LIVE_VOTES_FIELD).map_err(FlowError::from)
    }
}

#[async_trait]
impl Refresh for LiveVoteFlow {
    async fn refresh(&self) -> Result<(), RefreshError> {
        let tallies = self.source.fetch().await?;
        let mut next = BTreeMap::new();
        for (poll_id, tally) in tallies {
            let key = Self::key(poll_id).map_err(|err| RefreshError::Decode(err.to_string()))?;
            next.insert(key, tally);
        }
        self.store.replace_all(next).map_err(|err| RefreshError::Apply(err.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Flow for LiveVoteFlow {
    fn name(&self) -> &str {
        self.store.name()
    }

    async fn get(&self, keys: &[FlowKey]) -> Result<FlowValues, FlowError> {
        self.store.get(keys).await
    }

    fn subscribe(&self, keys: &[FlowKey]) -> FlowStream {
        self.store.subscribe(keys)
    }
}
