// crates/projector-core/src/combine.rs
// ============================================================================
// Module: Flow Composition
// Description: Overlay override flows onto a primary flow by key route.
// Purpose: Present several flows as one logical flow without duplication.
// Dependencies: tokio-stream
// ============================================================================

//! ## Overview
//! [`FlowComposer`] registers override flows under [`OverrideRoute`]s and
//! builds a single [`Flow`]. Every key is served by exactly one source: the
//! best matching override, or the primary flow when no route matches.
//!
//! Route precedence is deterministic: a collection/field route beats any
//! prefix route, and among prefix routes the longest prefix wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_stream::StreamExt;
use tokio_stream::StreamMap;

use crate::flow::Flow;
use crate::flow::FlowError;
use crate::flow::FlowKey;
use crate::flow::FlowStream;
use crate::flow::FlowValues;

// ============================================================================
// SECTION: Routes
// ============================================================================

/// Key selector for an override flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideRoute {
    /// Matches keys whose text starts with the prefix.
    Prefix(String),
    /// Matches `<collection>/<any id>/<field>` keys.
    CollectionField {
        /// Collection segment.
        collection: String,
        /// Field segment.
        field: String,
    },
}

impl OverrideRoute {
    /// Builds a prefix route.
    #[must_use]
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    /// Builds a collection/field route.
    #[must_use]
    pub fn collection_field(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self::CollectionField {
            collection: collection.into(),
            field: field.into(),
        }
    }

    /// Returns the match rank for `key`, higher is more specific.
    fn rank(&self, key: &FlowKey) -> Option<usize> {
        match self {
            Self::Prefix(prefix) => {
                key.as_str().starts_with(prefix.as_str()).then_some(prefix.len())
            }
            Self::CollectionField {
                collection,
                field,
            } => (key.collection() == collection && key.field() == field).then_some(usize::MAX),
        }
    }
}

// ============================================================================
// SECTION: Composer
// ============================================================================

/// Builder for a composed flow.
pub struct FlowComposer {
    /// Flow serving every unrouted key.
    primary: Arc<dyn Flow>,
    /// Registered override flows.
    overrides: Vec<(OverrideRoute, Arc<dyn Flow>)>,
}

impl FlowComposer {
    /// Starts a composition over `primary`.
    #[must_use]
    pub fn new(primary: Arc<dyn Flow>) -> Self {
        Self {
            primary,
            overrides: Vec::new(),
        }
    }

    /// Registers `flow` as the source for keys matched by `route`.
    #[must_use]
    pub fn with_override(mut self, route: OverrideRoute, flow: Arc<dyn Flow>) -> Self {
        self.overrides.push((route, flow));
        self
    }

    /// Builds the logical flow.
    ///
    /// Without overrides the primary flow itself is returned.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Composition`] for empty prefixes or duplicate routes.
    pub fn build(self) -> Result<Arc<dyn Flow>, FlowError> {
        if self.overrides.is_empty() {
            return Ok(self.primary);
        }
        for (index, (route, _)) in self.overrides.iter().enumerate() {
            if let OverrideRoute::Prefix(prefix) = route
                && prefix.is_empty()
            {
                return Err(FlowError::Composition("override prefix must be non-empty".to_string()));
            }
            if self.overrides[..index].iter().any(|(seen, _)| seen == route) {
                return Err(FlowError::Composition(format!("duplicate override route {route:?}")));
            }
        }
        let name = std::iter::once(self.primary.name())
            .chain(self.overrides.iter().map(|(_, flow)| flow.name()))
            .collect::<Vec<_>>()
            .join("+");
        Ok(Arc::new(ComposedFlow {
            name,
            primary: self.primary,
            overrides: self.overrides,
        }))
    }
}

/// Flow routing each key to the primary or an override flow.
///
/// # Invariants
/// - The route table is immutable after construction.
/// - A key is served by exactly one source.
pub struct ComposedFlow {
    /// Combined source names.
    name: String,
    /// Flow serving every unrouted key.
    primary: Arc<dyn Flow>,
    /// Override flows with their routes.
    overrides: Vec<(OverrideRoute, Arc<dyn Flow>)>,
}

impl ComposedFlow {
    /// Returns the flow serving `key`.
    #[must_use]
    pub fn source_for(&self, key: &FlowKey) -> &Arc<dyn Flow> {
        match self.route_index(key) {
            Some(index) => &self.overrides[index].1,
            None => &self.primary,
        }
    }

    /// Returns the index of the winning override for `key`.
    fn route_index(&self, key: &FlowKey) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (index, (route, _)) in self.overrides.iter().enumerate() {
            if let Some(rank) = route.rank(key)
                && best.is_none_or(|(_, best_rank)| rank > best_rank)
            {
                best = Some((index, rank));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Groups keys by serving source; slot 0 is the primary flow.
    fn partition(&self, keys: &[FlowKey]) -> BTreeMap<usize, Vec<FlowKey>> {
        let mut groups: BTreeMap<usize, Vec<FlowKey>> = BTreeMap::new();
        for key in keys {
            let slot = self.route_index(key).map_or(0, |index| index + 1);
            groups.entry(slot).or_default().push(key.clone());
        }
        groups
    }

    /// Returns the flow stored in `slot`.
    fn slot(&self, slot: usize) -> &Arc<dyn Flow> {
        match slot.checked_sub(1) {
            Some(index) => &self.overrides[index].1,
            None => &self.primary,
        }
    }
}

#[async_trait]
impl Flow for ComposedFlow {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, keys: &[FlowKey]) -> Result<FlowValues, FlowError> {
        let mut values = FlowValues::new();
        for (slot, group) in self.partition(keys) {
            let flow = self.slot(slot);
            let found = flow.get(&group).await.map_err(|err| err.tagged(flow.name()))?;
            values.extend(found);
        }
        Ok(values)
    }

    fn subscribe(&self, keys: &[FlowKey]) -> FlowStream {
        let mut streams = StreamMap::new();
        for (slot, group) in self.partition(keys) {
            let flow = self.slot(slot);
            let name = flow.name().to_string();
            let stream: FlowStream = Box::pin(
                flow.subscribe(&group).map(move |item| item.map_err(|err| err.tagged(&name))),
            );
            streams.insert(slot, stream);
        }
        Box::pin(streams.map(|(_, item)| item))
    }
}
