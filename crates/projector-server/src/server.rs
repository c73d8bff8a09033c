// crates/projector-server/src/server.rs
// ============================================================================
// Module: Projector Server
// Description: Startup wiring, background refresh, and HTTP serving.
// Purpose: Assemble flows and collaborators and run until cancelled.
// Dependencies: axum, projector-config, projector-core, tokio, tokio-util
// ============================================================================

//! ## Overview
//! [`ProjectorServer`] owns the composed data flow, the auth gateway, and
//! the live vote refresher. [`ProjectorServer::from_config`] builds the
//! production collaborators; [`ProjectorServer::new`] accepts injected ones
//! so tests can stand in for the auth and restriction services.
//!
//! In public-access-only mode the live vote flow is never constructed and
//! the data flow is the primary flow itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::sync::Arc;

use axum::Router;
use projector_config::ProjectorConfig;
use projector_core::Flow;
use projector_core::FlowComposer;
use projector_core::FlowError;
use projector_core::IntervalTickSource;
use projector_core::LiveVoteFlow;
use projector_core::MemoryFlow;
use projector_core::PeriodicRefresher;
use projector_core::Refresh;
use projector_core::VoteCountSource;
use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::audit::AuditSink;
use crate::audit::LiveVoteRefreshEvent;
use crate::audit::ServiceEvent;
use crate::audit::sink_from_config;
use crate::auth::Authenticator;
use crate::auth::TokenAuthenticator;
use crate::gateway::AuthGateway;
use crate::handlers::AppState;
use crate::live_votes::HttpVoteCountSource;
use crate::restricter::HttpRestricter;
use crate::restricter::Restricter;
use crate::routes::build_router;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name of the primary flow.
const PRIMARY_FLOW_NAME: &str = "datastore";
/// Maximum accepted seed file size.
const MAX_SEED_FILE_SIZE: u64 = 64 * 1024 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Collaborators the server is assembled from.
pub struct ServerParts {
    /// Audit sink shared by every component.
    pub audit: Arc<dyn AuditSink>,
    /// Request authentication.
    pub authenticator: Arc<dyn Authenticator>,
    /// Remote authorization.
    pub restricter: Arc<dyn Restricter>,
    /// Primary data flow.
    pub primary: Arc<dyn Flow>,
    /// Live tally provider; ignored in public-access-only mode.
    pub vote_source: Option<Arc<dyn VoteCountSource>>,
}

/// Assembled projector server.
pub struct ProjectorServer {
    /// Validated configuration.
    config: ProjectorConfig,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Auth gateway for the `{id}` routes.
    gateway: AuthGateway,
    /// Composed data flow.
    data_flow: Arc<dyn Flow>,
    /// Live vote override, absent in public-access-only mode.
    live_votes: Option<Arc<LiveVoteFlow>>,
}

impl ProjectorServer {
    /// Assembles the server from injected collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Init`] when the flows cannot be composed.
    pub fn new(config: ProjectorConfig, parts: ServerParts) -> Result<Self, ServerError> {
        let live_votes = if config.public_access_only {
            None
        } else {
            parts.vote_source.map(|source| Arc::new(LiveVoteFlow::new(source)))
        };
        let data_flow = build_data_flow(parts.primary, live_votes.clone())
            .map_err(|err| ServerError::Init(err.to_string()))?;
        let gateway =
            AuthGateway::new(parts.authenticator, parts.restricter, Arc::clone(&parts.audit));
        Ok(Self {
            config,
            audit: parts.audit,
            gateway,
            data_flow,
            live_votes,
        })
    }

    /// Builds the production server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration, the seed file, or a client
    /// cannot be initialized.
    pub fn from_config(config: ProjectorConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let audit = sink_from_config(&config).map_err(|err| ServerError::Init(err.to_string()))?;
        let primary = load_primary_flow(&config)?;
        let vote_source: Option<Arc<dyn VoteCountSource>> = if config.public_access_only {
            None
        } else {
            let source = HttpVoteCountSource::new(&config.live_votes)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            Some(Arc::new(source))
        };
        let restricter = HttpRestricter::new(&config.restricter)
            .map_err(|err| ServerError::Init(err.to_string()))?;
        let parts = ServerParts {
            audit,
            authenticator: Arc::new(TokenAuthenticator::from_config(&config.auth)),
            restricter: Arc::new(restricter),
            primary,
            vote_source,
        };
        Self::new(config, parts)
    }

    /// Returns the composed data flow.
    #[must_use]
    pub fn data_flow(&self) -> Arc<dyn Flow> {
        Arc::clone(&self.data_flow)
    }

    /// Returns the live vote flow when it was constructed.
    #[must_use]
    pub fn live_vote_flow(&self) -> Option<Arc<LiveVoteFlow>> {
        self.live_votes.clone()
    }

    /// Builds the HTTP router; `shutdown` ends open subscriptions.
    #[must_use]
    pub fn router(&self, shutdown: CancellationToken) -> Router {
        build_router(AppState::new(self.data_flow(), shutdown), self.gateway.clone())
    }

    /// Binds the configured address and serves until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self, cancel: CancellationToken) -> Result<(), ServerError> {
        let addr =
            self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("bind {addr} failed: {err}")))?;
        self.serve_listener(listener, cancel).await
    }

    /// Serves on an already bound listener until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when the HTTP server fails.
    pub async fn serve_listener(
        self,
        listener: TcpListener,
        cancel: CancellationToken,
    ) -> Result<(), ServerError> {
        let refresher = self.live_votes.as_ref().map(|flow| {
            let audit = Arc::clone(&self.audit);
            let target: Arc<dyn Refresh> = Arc::clone(flow) as Arc<dyn Refresh>;
            PeriodicRefresher::new().start(
                cancel.child_token(),
                IntervalTickSource::new(self.config.live_votes.interval()),
                target,
                move |err| audit.record_refresh(&LiveVoteRefreshEvent::new(err.to_string())),
            )
        });

        let local = listener.local_addr().map(|addr| addr.to_string()).ok();
        self.audit.record_service(&ServiceEvent::new("listening", local));

        let router = self.router(cancel.clone());
        let shutdown = cancel.clone();
        let served = axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|err| ServerError::Transport(err.to_string()));

        cancel.cancel();
        if let Some(handle) = refresher {
            let message = match handle.join().await {
                Ok(report) => format!("ticks={} failures={}", report.ticks, report.failures),
                Err(err) => err.to_string(),
            };
            self.audit.record_service(&ServiceEvent::new("refresher_stopped", Some(message)));
        }
        self.audit.record_service(&ServiceEvent::new("shutdown", None));
        served
    }
}

// ============================================================================
// SECTION: Flow Assembly
// ============================================================================

/// Overlays the live vote flow, when present, on the primary flow.
///
/// # Errors
///
/// Returns [`FlowError::Composition`] when the overrides conflict.
pub fn build_data_flow(
    primary: Arc<dyn Flow>,
    live_votes: Option<Arc<LiveVoteFlow>>,
) -> Result<Arc<dyn Flow>, FlowError> {
    let mut composer = FlowComposer::new(primary);
    if let Some(flow) = live_votes {
        composer = composer.with_override(LiveVoteFlow::route(), flow);
    }
    composer.build()
}

/// Loads the primary flow from the configured seed file, or starts empty.
fn load_primary_flow(config: &ProjectorConfig) -> Result<Arc<dyn Flow>, ServerError> {
    let Some(path) = config.datastore.seed_path.as_deref() else {
        return Ok(Arc::new(MemoryFlow::new(PRIMARY_FLOW_NAME)));
    };
    let display = path.display();
    let metadata = fs::metadata(path)
        .map_err(|err| ServerError::Init(format!("seed file {display}: {err}")))?;
    if metadata.len() > MAX_SEED_FILE_SIZE {
        return Err(ServerError::Init(format!("seed file {display} exceeds size limit")));
    }
    let bytes =
        fs::read(path).map_err(|err| ServerError::Init(format!("seed file {display}: {err}")))?;
    let seed: Value = serde_json::from_slice(&bytes)
        .map_err(|err| ServerError::Init(format!("seed file {display}: {err}")))?;
    let flow = MemoryFlow::from_json(PRIMARY_FLOW_NAME, &seed)
        .map_err(|err| ServerError::Init(format!("seed file {display}: {err}")))?;
    Ok(Arc::new(flow))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server startup and serving failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(String),
    /// A flow or collaborator could not be initialized.
    #[error("init error: {0}")]
    Init(String),
    /// Listener or HTTP serving failed.
    #[error("transport error: {0}")]
    Transport(String),
}
