// crates/projector-server/src/live_votes.rs
// ============================================================================
// Module: Live Vote Source
// Description: HTTP client for the vote service tally endpoint.
// Purpose: Feed running poll tallies into the live vote override flow.
// Dependencies: reqwest, serde
// ============================================================================

//! ## Overview
//! [`HttpVoteCountSource`] fetches `{"polls": {"<poll_id>": <tally>}}` from
//! the vote service. Any failure surfaces as a [`RefreshError`]; the
//! refresher reports it and tries again on the next tick.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use projector_config::LiveVotesConfig;
use projector_core::PollTallies;
use projector_core::RefreshError;
use projector_core::VoteCountSource;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::Url;
use serde::Deserialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted tally response size.
const MAX_VOTE_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Source
// ============================================================================

/// Tally response body.
#[derive(Debug, Deserialize)]
struct VoteCountResponse {
    /// Tallies keyed by poll id.
    #[serde(default)]
    polls: PollTallies,
}

/// Vote count source speaking HTTP.
pub struct HttpVoteCountSource {
    /// Tally endpoint.
    url: Url,
    /// HTTP client configured with a timeout.
    client: Client,
}

impl HttpVoteCountSource {
    /// Builds the source from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::Source`] when the URL or client is invalid.
    pub fn new(config: &LiveVotesConfig) -> Result<Self, RefreshError> {
        let url = Url::parse(&config.url).map_err(|err| RefreshError::Source(err.to_string()))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| RefreshError::Source(err.to_string()))?;
        Ok(Self {
            url,
            client,
        })
    }
}

#[async_trait]
impl VoteCountSource for HttpVoteCountSource {
    async fn fetch(&self) -> Result<PollTallies, RefreshError> {
        let mut response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|err| RefreshError::Source(err.to_string()))?;
        if response.status() != StatusCode::OK {
            return Err(RefreshError::Source(format!(
                "vote service returned status {}",
                response.status().as_u16()
            )));
        }
        let mut body = Vec::new();
        while let Some(chunk) =
            response.chunk().await.map_err(|err| RefreshError::Source(err.to_string()))?
        {
            if body.len() + chunk.len() > MAX_VOTE_RESPONSE_BYTES {
                return Err(RefreshError::Decode("vote response exceeds size limit".to_string()));
            }
            body.extend_from_slice(&chunk);
        }
        let decoded: VoteCountResponse =
            serde_json::from_slice(&body).map_err(|err| RefreshError::Decode(err.to_string()))?;
        Ok(decoded.polls)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
