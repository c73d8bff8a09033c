// crates/projector-server/src/gateway.rs
// ============================================================================
// Module: Auth Gateway
// Description: Per-request authentication and remote authorization middleware.
// Purpose: Admit a projector request only after the restriction service agrees.
// Dependencies: axum, serde
// ============================================================================

//! ## Overview
//! [`require_projector_access`] runs in front of every projector route:
//! authenticate, validate the `{id}` segment, ask the restriction service,
//! then forward with [`CallerId`] and [`ProjectorId`] in the request
//! extensions. Each step fails closed with a JSON error body, and every
//! decision is recorded as an access audit event.
//!
//! Authorization happens once per request. An open subscription keeps the
//! permission it was granted at connect time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::Json;
use axum::extract::Path;
use axum::extract::Request;
use axum::extract::State;
use axum::extract::rejection::PathRejection;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use projector_core::ProjectorId;
use serde::Serialize;

use crate::audit::AccessOutcome;
use crate::audit::AuditSink;
use crate::audit::ProjectorAccessEvent;
use crate::audit::ProjectorAccessParams;
use crate::auth::Authenticator;
use crate::auth::CallerId;
use crate::restricter::Restricter;
use crate::restricter::RestrictionError;
use crate::restricter::has_projector_marker;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message for failed authentication.
pub const MSG_AUTHENTICATE_FAILED: &str = "authenticate request failed";
/// Message for a malformed projector id.
pub const MSG_INVALID_ID: &str = "Projector id invalid";
/// Message for a restriction request that could not be built.
pub const MSG_RESTRICTION_BUILD_FAILED: &str = "creating restriction request failed";
/// Message for a failed or rejected restriction call.
pub const MSG_RESTRICTION_FAILED: &str = "restriction request failed";
/// Message for a caller without access.
pub const MSG_PERMISSION_DENIED: &str = "permissions denied";

// ============================================================================
// SECTION: Error Body
// ============================================================================

/// JSON body of every gateway and handler error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Always true.
    pub error: bool,
    /// Human-readable reason.
    pub msg: String,
}

/// Builds an error response with the standard body.
#[must_use]
pub fn error_response(status: StatusCode, msg: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: true,
            msg: msg.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Collaborators consulted by the gateway.
#[derive(Clone)]
pub struct AuthGateway {
    /// Request authentication.
    authenticator: Arc<dyn Authenticator>,
    /// Remote authorization.
    restricter: Arc<dyn Restricter>,
    /// Access decision log.
    audit: Arc<dyn AuditSink>,
}

/// Gateway rejection before the handler runs.
struct Denial {
    /// Response status.
    status: StatusCode,
    /// Client-facing message.
    msg: &'static str,
    /// Audit detail.
    reason: String,
}

impl AuthGateway {
    /// Creates a gateway over the given collaborators.
    #[must_use]
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        restricter: Arc<dyn Restricter>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            authenticator,
            restricter,
            audit,
        }
    }

    /// Maps a restriction failure to the client response.
    fn restriction_denial(err: RestrictionError) -> Denial {
        let (status, msg) = match &err {
            RestrictionError::Build(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_RESTRICTION_BUILD_FAILED)
            }
            RestrictionError::Transport(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_RESTRICTION_FAILED)
            }
            RestrictionError::Status(code) => (
                StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                MSG_RESTRICTION_FAILED,
            ),
            RestrictionError::Body(_) => (StatusCode::UNAUTHORIZED, MSG_PERMISSION_DENIED),
        };
        Denial {
            status,
            msg,
            reason: err.to_string(),
        }
    }

    /// Runs authentication and authorization for one request.
    async fn admit(
        &self,
        headers: &HeaderMap,
        raw_id: Result<&str, String>,
    ) -> Result<(CallerId, ProjectorId), (Option<CallerId>, Denial)> {
        let caller = self.authenticator.authenticate(headers).await.map_err(|err| {
            (None, Denial {
                status: StatusCode::UNAUTHORIZED,
                msg: MSG_AUTHENTICATE_FAILED,
                reason: err.to_string(),
            })
        })?;
        let projector = raw_id
            .and_then(|raw| ProjectorId::parse(raw).map_err(|err| err.to_string()))
            .map_err(|reason| {
                (Some(caller), Denial {
                    status: StatusCode::BAD_REQUEST,
                    msg: MSG_INVALID_ID,
                    reason,
                })
            })?;
        let body = self
            .restricter
            .restrict(caller, projector)
            .await
            .map_err(|err| (Some(caller), Self::restriction_denial(err)))?;
        if !has_projector_marker(&body, projector) {
            return Err((Some(caller), Denial {
                status: StatusCode::UNAUTHORIZED,
                msg: MSG_PERMISSION_DENIED,
                reason: "restriction answer lacks projector marker".to_string(),
            }));
        }
        Ok((caller, projector))
    }

    /// Records one access decision.
    fn record(
        &self,
        path: &str,
        caller: Option<CallerId>,
        raw_id: Option<&str>,
        denial: Option<&Denial>,
    ) {
        self.audit.record_access(&ProjectorAccessEvent::new(ProjectorAccessParams {
            path: path.to_string(),
            caller_id: caller.map(CallerId::get),
            projector_id: raw_id.map(str::to_string),
            outcome: if denial.is_some() { AccessOutcome::Denied } else { AccessOutcome::Allowed },
            status: denial.map(|denial| denial.status.as_u16()),
            reason: denial.map(|denial| denial.reason.clone()),
        }));
    }
}

/// Middleware guarding `{id}` projector routes.
///
/// A segment axum cannot decode is handled after authentication, like any
/// other invalid id.
pub async fn require_projector_access(
    State(gateway): State<AuthGateway>,
    raw_id: Result<Path<String>, PathRejection>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let raw_id = raw_id.map(|Path(raw)| raw).map_err(|rejection| rejection.body_text());
    let segment = raw_id.as_deref().ok();
    match gateway.admit(request.headers(), raw_id.as_deref().map_err(Clone::clone)).await {
        Ok((caller, projector)) => {
            gateway.record(&path, Some(caller), segment, None);
            request.extensions_mut().insert(caller);
            request.extensions_mut().insert(projector);
            next.run(request).await
        }
        Err((caller, denial)) => {
            gateway.record(&path, caller, segment, Some(&denial));
            error_response(denial.status, denial.msg)
        }
    }
}
