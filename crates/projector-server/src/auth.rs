// crates/projector-server/src/auth.rs
// ============================================================================
// Module: Request Authentication
// Description: Caller identity and the authenticator collaborator.
// Purpose: Turn request credentials into a caller id, failing closed.
// Dependencies: axum, subtle
// ============================================================================

//! ## Overview
//! The gateway only needs one thing from authentication: the caller id that
//! is forwarded to the restriction service. [`Authenticator`] is the seam;
//! [`TokenAuthenticator`] resolves configured tokens presented as a bearer
//! token or in the session cookie.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::header::COOKIE;
use projector_config::AuthConfig;
use subtle::ConstantTimeEq;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted size of a credential-carrying header.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Authenticated caller, forwarded to the restriction service as `user_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallerId(u64);

impl CallerId {
    /// Wraps a raw user id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw user id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credentials were presented.
    #[error("unauthenticated: {0}")]
    Missing(String),
    /// Credentials were presented but rejected.
    #[error("unauthenticated: {0}")]
    Rejected(String),
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Resolves request headers to a caller.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticates the request.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when no valid credentials are present.
    async fn authenticate(&self, headers: &HeaderMap) -> Result<CallerId, AuthError>;
}

// ============================================================================
// SECTION: Token Authenticator
// ============================================================================

/// Authenticator backed by a static token table.
pub struct TokenAuthenticator {
    /// Accepted tokens and their callers.
    tokens: Vec<(String, CallerId)>,
    /// Cookie consulted when no bearer token is present.
    cookie_name: String,
}

impl TokenAuthenticator {
    /// Builds the authenticator from configuration.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            tokens: config
                .tokens
                .iter()
                .map(|entry| (entry.token.clone(), CallerId::new(entry.user_id)))
                .collect(),
            cookie_name: config.cookie_name.clone(),
        }
    }

    /// Returns the caller for `token`, comparing every entry in constant time.
    fn lookup(&self, token: &str) -> Option<CallerId> {
        let mut found = None;
        for (candidate, caller) in &self.tokens {
            if bool::from(candidate.as_bytes().ct_eq(token.as_bytes())) {
                found = Some(*caller);
            }
        }
        found
    }
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<CallerId, AuthError> {
        let token = match header_text(headers, AUTHORIZATION.as_str())? {
            Some(header) => parse_bearer_token(header)?,
            None => {
                let cookies = header_text(headers, COOKIE.as_str())?
                    .ok_or_else(|| AuthError::Missing("missing credentials".to_string()))?;
                cookie_value(cookies, &self.cookie_name)
                    .ok_or_else(|| AuthError::Missing("missing session cookie".to_string()))?
            }
        };
        self.lookup(&token).ok_or_else(|| AuthError::Rejected("invalid token".to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns a header as text, enforcing the size limit.
fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, AuthError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    if value.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Rejected(format!("{name} header too large")));
    }
    value
        .to_str()
        .map(Some)
        .map_err(|_| AuthError::Rejected(format!("{name} header is not ascii")))
}

/// Extracts the token of a `Bearer <token>` header.
fn parse_bearer_token(header: &str) -> Result<String, AuthError> {
    let (scheme, token) = header.trim().split_once(' ').unwrap_or((header.trim(), ""));
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Rejected("invalid authorization header".to_string()));
    }
    Ok(token.to_string())
}

/// Finds `name` in a `Cookie` header.
fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.trim_matches('"').to_string())
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
