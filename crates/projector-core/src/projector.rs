// crates/projector-core/src/projector.rs
// ============================================================================
// Module: Projector Views
// Description: Projector identifiers and the views assembled from flow keys.
// Purpose: Translate a projector id into key sets, snapshots, and previews.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A projector snapshot is read in three rounds: the projector's own fields,
//! the fields of its current projections, and the live tallies of projected
//! polls. The union of those keys is what a subscription listens to.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::flow::Flow;
use crate::flow::FlowError;
use crate::flow::FlowKey;
use crate::flow::FlowValues;
use crate::vote::LiveVoteFlow;
use crate::vote::POLL_COLLECTION;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Projector collection name.
pub const PROJECTOR_COLLECTION: &str = "projector";
/// Projection collection name.
pub const PROJECTION_COLLECTION: &str = "projection";
/// Projector field listing the projections on screen.
pub const CURRENT_PROJECTIONS_FIELD: &str = "current_projection_ids";
/// Projector field listing the queued projections.
pub const PREVIEW_PROJECTIONS_FIELD: &str = "preview_projection_ids";
/// Projection field naming the projected object.
pub const CONTENT_OBJECT_FIELD: &str = "content_object_id";

/// Projector fields served to clients.
pub const PROJECTOR_FIELDS: &[&str] = &[
    "id",
    "name",
    "meeting_id",
    CURRENT_PROJECTIONS_FIELD,
    PREVIEW_PROJECTIONS_FIELD,
    "scale",
    "scroll",
    "width",
    "aspect_ratio_numerator",
    "aspect_ratio_denominator",
    "color",
    "background_color",
    "header_background_color",
    "header_font_color",
    "header_h1_color",
    "chyron_background_color",
    "chyron_font_color",
    "show_header_footer",
    "show_title",
    "show_logo",
    "show_clock",
];

/// Projection fields served to clients.
pub const PROJECTION_FIELDS: &[&str] = &[
    "id",
    CONTENT_OBJECT_FIELD,
    "current_projector_id",
    "preview_projector_id",
    "stable",
    "type",
    "options",
    "weight",
];

// ============================================================================
// SECTION: Projector Id
// ============================================================================

/// Positive projector identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ProjectorId(u64);

/// Rejected projector id text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid projector id `{0}`")]
pub struct InvalidProjectorId(pub String);

impl ProjectorId {
    /// Wraps a raw id; zero is rejected.
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Parses a path segment.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidProjectorId`] unless the text is a positive integer.
    pub fn parse(text: &str) -> Result<Self, InvalidProjectorId> {
        text.parse::<u64>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| InvalidProjectorId(text.to_string()))
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the key of one projector field.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::InvalidKey`] when `field` is malformed.
    pub fn key(self, field: &str) -> Result<FlowKey, FlowError> {
        FlowKey::new(PROJECTOR_COLLECTION, self.0, field).map_err(FlowError::from)
    }
}

impl fmt::Display for ProjectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SECTION: Views
// ============================================================================

/// Projector state with its current projections and live tallies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectorSnapshot {
    /// Projector id.
    pub id: ProjectorId,
    /// Projector fields present in the flow.
    pub projector: Map<String, Value>,
    /// Current projections by id.
    pub projections: BTreeMap<u64, Map<String, Value>>,
    /// Live tallies by poll id.
    pub live_votes: BTreeMap<u64, Value>,
    /// Keys the snapshot was read from.
    #[serde(skip)]
    pub keys: Vec<FlowKey>,
}

impl ProjectorSnapshot {
    /// Reads the snapshot of projector `id` from `flow`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when any read fails.
    pub async fn load(flow: &dyn Flow, id: ProjectorId) -> Result<Self, FlowError> {
        let projector_keys = field_keys(PROJECTOR_COLLECTION, id.get(), PROJECTOR_FIELDS)?;
        let projector_values = flow.get(&projector_keys).await?;
        let projection_ids =
            id_list(projector_values.get(&id.key(CURRENT_PROJECTIONS_FIELD)?));
        let (projections, projection_keys) = load_projections(flow, &projection_ids).await?;

        let mut vote_keys = Vec::new();
        for projection in projections.values() {
            if let Some(poll_id) = projection
                .get(CONTENT_OBJECT_FIELD)
                .and_then(Value::as_str)
                .and_then(poll_id)
            {
                vote_keys.push(LiveVoteFlow::key(poll_id)?);
            }
        }
        let live_votes = flow
            .get(&vote_keys)
            .await?
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key.id(), value)))
            .collect();

        let mut keys = projector_keys;
        keys.extend(projection_keys);
        keys.extend(vote_keys);
        Ok(Self {
            id,
            projector: field_map(&projector_values),
            projections,
            live_votes,
            keys,
        })
    }

    /// Returns true when `changes` alter which keys the snapshot covers.
    #[must_use]
    pub fn is_structural_change(&self, changes: &FlowValues) -> bool {
        changes.keys().any(|key| {
            (key.collection() == PROJECTOR_COLLECTION
                && key.id() == self.id.get()
                && key.field() == CURRENT_PROJECTIONS_FIELD)
                || (key.collection() == PROJECTION_COLLECTION
                    && key.field() == CONTENT_OBJECT_FIELD
                    && self.projections.contains_key(&key.id()))
        })
    }
}

/// Projector preview: the projections queued for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewPayload {
    /// Projector id.
    pub id: ProjectorId,
    /// Queued projection ids in projector order.
    pub preview_projection_ids: Vec<u64>,
    /// Queued projections by id.
    pub projections: BTreeMap<u64, Map<String, Value>>,
}

impl PreviewPayload {
    /// Reads the preview of projector `id` from `flow`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when any read fails.
    pub async fn load(flow: &dyn Flow, id: ProjectorId) -> Result<Self, FlowError> {
        let preview_key = id.key(PREVIEW_PROJECTIONS_FIELD)?;
        let values = flow.get(std::slice::from_ref(&preview_key)).await?;
        let preview_projection_ids = id_list(values.get(&preview_key));
        let (projections, _) = load_projections(flow, &preview_projection_ids).await?;
        Ok(Self {
            id,
            preview_projection_ids,
            projections,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the keys of `fields` for one object.
fn field_keys(collection: &str, id: u64, fields: &[&str]) -> Result<Vec<FlowKey>, FlowError> {
    fields
        .iter()
        .map(|field| FlowKey::new(collection, id, field).map_err(FlowError::from))
        .collect()
}

/// Reads projection fields and groups them by projection id.
async fn load_projections(
    flow: &dyn Flow,
    ids: &[u64],
) -> Result<(BTreeMap<u64, Map<String, Value>>, Vec<FlowKey>), FlowError> {
    let mut keys = Vec::with_capacity(ids.len() * PROJECTION_FIELDS.len());
    for id in ids {
        keys.extend(field_keys(PROJECTION_COLLECTION, *id, PROJECTION_FIELDS)?);
    }
    let values = flow.get(&keys).await?;
    let mut projections: BTreeMap<u64, Map<String, Value>> = BTreeMap::new();
    for (key, value) in values {
        if let Some(value) = value {
            projections.entry(key.id()).or_default().insert(key.field().to_string(), value);
        }
    }
    Ok((projections, keys))
}

/// Maps present values to their field names.
fn field_map(values: &FlowValues) -> Map<String, Value> {
    values
        .iter()
        .filter_map(|(key, value)| {
            value.as_ref().map(|value| (key.field().to_string(), value.clone()))
        })
        .collect()
}

/// Reads a JSON array of positive ids, skipping anything else.
fn id_list(value: Option<&Option<Value>>) -> Vec<u64> {
    match value {
        Some(Some(Value::Array(items))) => {
            items.iter().filter_map(Value::as_u64).filter(|id| *id > 0).collect()
        }
        _ => Vec::new(),
    }
}

/// Extracts the poll id from a `poll/<id>` content object reference.
fn poll_id(content_object_id: &str) -> Option<u64> {
    let (collection, id) = content_object_id.split_once('/')?;
    if collection != POLL_COLLECTION {
        return None;
    }
    id.parse().ok().filter(|id| *id > 0)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
