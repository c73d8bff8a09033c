// crates/projector-config/src/lib.rs
// ============================================================================
// Module: Projector Config Library
// Description: Canonical config model, environment overrides, and secrets.
// Purpose: Single source of truth for projector.toml semantics.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! `projector-config` defines the configuration of the projector gateway. A
//! TOML file provides the base, the deployment's environment variables
//! override it, and validation fails closed before anything starts.
//!
//! Database credentials are resolved separately through [`secrets`] so the
//! password never lives in the parsed configuration.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod secrets;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use secrets::DEV_PASSWORD_FALLBACK;
pub use secrets::DatabaseConnection;
pub use secrets::SecretError;
pub use secrets::read_password;
