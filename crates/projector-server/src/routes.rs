// crates/projector-server/src/routes.rs
// ============================================================================
// Module: Projector Routes
// Description: Router wiring for the projector HTTP surface.
// Purpose: Put the auth gateway in front of every `{id}` route.
// Dependencies: axum
// ============================================================================

//! ## Overview
//! All routes live under `/system/projector/`. The health route is public;
//! the `{id}` routes are wrapped by [`require_projector_access`] via
//! `route_layer`, so unknown paths still fall through to the default 404
//! without touching the gateway.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::get;

use crate::gateway::AuthGateway;
use crate::gateway::require_projector_access;
use crate::handlers::AppState;
use crate::handlers::get_projector;
use crate::handlers::health;
use crate::handlers::preview_projector;
use crate::handlers::subscribe_projector;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Path prefix shared by every projector route.
pub const ROUTE_PREFIX: &str = "/system/projector";

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the projector router.
#[must_use]
pub fn build_router(state: AppState, gateway: AuthGateway) -> Router {
    let protected = Router::new()
        .route(&format!("{ROUTE_PREFIX}/get/{{id}}"), get(get_projector))
        .route(&format!("{ROUTE_PREFIX}/subscribe/{{id}}"), get(subscribe_projector))
        .route(&format!("{ROUTE_PREFIX}/preview/{{id}}"), get(preview_projector))
        .route_layer(from_fn_with_state(gateway, require_projector_access));
    Router::new()
        .route(&format!("{ROUTE_PREFIX}/health"), get(health))
        .merge(protected)
        .with_state(state)
}
