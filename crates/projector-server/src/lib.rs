// crates/projector-server/src/lib.rs
// ============================================================================
// Module: Projector Server
// Description: HTTP gateway serving projector state behind remote authorization.
// Purpose: Expose projector snapshots, previews, and subscriptions.
// Dependencies: axum, reqwest, projector-config, projector-core
// ============================================================================

//! ## Overview
//! `projector-server` puts an [`AuthGateway`] in front of the projector
//! routes, asks the restriction service before every projector read, and
//! keeps the live vote override flow fresh in the background. Audit events
//! go through an injected [`AuditSink`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod gateway;
pub mod handlers;
pub mod live_votes;
pub mod restricter;
pub mod routes;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AccessOutcome;
pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::LiveVoteRefreshEvent;
pub use audit::NoopAuditSink;
pub use audit::ProjectorAccessEvent;
pub use audit::ServiceEvent;
pub use audit::StderrAuditSink;
pub use audit::StdoutAuditSink;
pub use auth::AuthError;
pub use auth::Authenticator;
pub use auth::CallerId;
pub use auth::TokenAuthenticator;
pub use gateway::AuthGateway;
pub use gateway::ErrorBody;
pub use handlers::AppState;
pub use live_votes::HttpVoteCountSource;
pub use restricter::HttpRestricter;
pub use restricter::Restricter;
pub use restricter::RestrictionError;
pub use routes::build_router;
pub use server::ProjectorServer;
pub use server::ServerError;
pub use server::ServerParts;
pub use server::build_data_flow;
