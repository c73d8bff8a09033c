// crates/projector-server/src/restricter.rs
// ============================================================================
// Module: Restriction Client
// Description: Client for the external restriction service.
// Purpose: Ask whether a caller may see a projector, bounded in time and size.
// Dependencies: reqwest, serde_json
// ============================================================================

//! ## Overview
//! The restriction service answers a keyed read on behalf of a user: it
//! returns only the keys the user may see. Requesting `projector/<id>/id` and
//! finding it in the answer proves the caller may view projector `<id>`.
//! The client makes exactly one call per request with no cache and no retry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use bytes::Bytes;
use projector_config::RestricterConfig;
use projector_core::ProjectorId;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::auth::CallerId;

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Restriction service interface.
#[async_trait]
pub trait Restricter: Send + Sync {
    /// Returns the restricted answer for `projector/<id>/id` as seen by `caller`.
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionError`] when the call cannot produce a readable
    /// 200 response.
    async fn restrict(&self, caller: CallerId, projector: ProjectorId)
    -> Result<Bytes, RestrictionError>;
}

// ============================================================================
// SECTION: HTTP Restricter
// ============================================================================

/// Restriction client speaking HTTP.
pub struct HttpRestricter {
    /// Restriction endpoint.
    url: Url,
    /// Maximum accepted response body size.
    max_response_bytes: usize,
    /// HTTP client configured with timeouts.
    client: Client,
}

impl HttpRestricter {
    /// Builds a restriction client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RestrictionError::Build`] when the URL or HTTP client is invalid.
    pub fn new(config: &RestricterConfig) -> Result<Self, RestrictionError> {
        let url = Url::parse(&config.url).map_err(|err| RestrictionError::Build(err.to_string()))?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|err| RestrictionError::Build(err.to_string()))?;
        Ok(Self {
            url,
            max_response_bytes: config.max_response_bytes,
            client,
        })
    }

    /// Builds the request URL carrying the caller.
    fn request_url(&self, caller: CallerId) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("user_id", &caller.get().to_string())
            .append_pair("single", "1");
        url
    }
}

#[async_trait]
impl Restricter for HttpRestricter {
    async fn restrict(
        &self,
        caller: CallerId,
        projector: ProjectorId,
    ) -> Result<Bytes, RestrictionError> {
        let body = serde_json::to_vec(&restriction_request(projector))
            .map_err(|err| RestrictionError::Build(err.to_string()))?;
        let mut response = self
            .client
            .post(self.request_url(caller))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| RestrictionError::Transport(err.to_string()))?;
        if response.status() != StatusCode::OK {
            return Err(RestrictionError::Status(response.status().as_u16()));
        }
        let limit = u64::try_from(self.max_response_bytes).unwrap_or(u64::MAX);
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(RestrictionError::Body("response exceeds size limit".to_string()));
        }
        let mut collected = Vec::new();
        while let Some(chunk) =
            response.chunk().await.map_err(|err| RestrictionError::Body(err.to_string()))?
        {
            if collected.len() + chunk.len() > self.max_response_bytes {
                return Err(RestrictionError::Body("response exceeds size limit".to_string()));
            }
            collected.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(collected))
    }
}

/// Builds the keyed read asking for `projector/<id>/id`.
#[must_use]
pub fn restriction_request(projector: ProjectorId) -> Value {
    json!([{
        "collection": "projector",
        "ids": [projector.get()],
        "fields": {"id": null},
    }])
}

/// Returns true when `body` is an object whose `projector/<id>/id` equals `<id>`.
#[must_use]
pub fn has_projector_marker(body: &[u8], projector: ProjectorId) -> bool {
    let Ok(Value::Object(members)) = serde_json::from_slice::<Value>(body) else {
        return false;
    };
    members
        .get(&format!("projector/{projector}/id"))
        .and_then(Value::as_u64)
        .is_some_and(|id| id == projector.get())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Restriction call failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestrictionError {
    /// The request could not be constructed.
    #[error("restriction request build failed: {0}")]
    Build(String),
    /// The request did not complete (connect failure, timeout, reset).
    #[error("restriction request failed: {0}")]
    Transport(String),
    /// The service answered with a non-200 status.
    #[error("restriction service returned status {0}")]
    Status(u16),
    /// The 200 response body could not be read within limits.
    #[error("restriction response unreadable: {0}")]
    Body(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
