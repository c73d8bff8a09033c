// crates/projector-server/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared fixtures for projector server tests.
// Purpose: Provide a mock restriction service, audit capture, and a server
//          bound to an ephemeral port.
// Dependencies: axum, projector-config, projector-core, projector-server
// ============================================================================

//! ## Overview
//! The mock restriction service runs on `127.0.0.1:0`, counts every call,
//! and answers according to a [`RestricterMode`]. [`spawn_server`] wires a
//! real [`ProjectorServer`] against it with a [`RecordingAuditSink`].

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only fixtures use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use projector_config::AuthTokenConfig;
use projector_config::ProjectorConfig;
use projector_core::Flow;
use projector_core::VoteCountSource;
use projector_server::AuditSink;
use projector_server::HttpRestricter;
use projector_server::LiveVoteRefreshEvent;
use projector_server::ProjectorAccessEvent;
use projector_server::ProjectorServer;
use projector_server::ServerParts;
use projector_server::ServiceEvent;
use projector_server::TokenAuthenticator;
use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Token accepted by the test authenticator.
pub const TOKEN: &str = "test-token";
/// User id bound to [`TOKEN`].
pub const USER_ID: u64 = 5;

// ============================================================================
// SECTION: Audit Capture
// ============================================================================

/// Audit sink keeping every event in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Access decisions in order.
    pub access: Mutex<Vec<ProjectorAccessEvent>>,
    /// Refresh failures in order.
    pub refresh: Mutex<Vec<LiveVoteRefreshEvent>>,
    /// Lifecycle events in order.
    pub service: Mutex<Vec<ServiceEvent>>,
}

impl RecordingAuditSink {
    /// Returns the recorded access decisions.
    pub fn access_events(&self) -> Vec<ProjectorAccessEvent> {
        self.access.lock().unwrap().clone()
    }

    /// Returns the recorded lifecycle kinds.
    pub fn service_kinds(&self) -> Vec<String> {
        self.service.lock().unwrap().iter().map(|event| event.kind.clone()).collect()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record_access(&self, event: &ProjectorAccessEvent) {
        self.access.lock().unwrap().push(event.clone());
    }

    fn record_refresh(&self, event: &LiveVoteRefreshEvent) {
        self.refresh.lock().unwrap().push(event.clone());
    }

    fn record_service(&self, event: &ServiceEvent) {
        self.service.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Mock Restriction Service
// ============================================================================

/// How the mock restriction service answers.
#[derive(Clone)]
pub enum RestricterMode {
    /// 200 with the projector marker for the requested id.
    Allow,
    /// 200 with an object lacking the marker.
    NoMarker,
    /// The given status with an empty object body.
    Status(StatusCode),
    /// Sleeps before answering like [`RestricterMode::Allow`].
    Slow(Duration),
    /// 200 with the given body verbatim as JSON content.
    Raw(&'static str),
    /// 200 with the marker plus `n` bytes of filler members.
    Padded(usize),
}

/// Shared state of the mock service.
pub struct MockRestricter {
    /// Answer mode.
    mode: RestricterMode,
    /// Number of calls received.
    pub hits: AtomicUsize,
    /// `user_id` query values in call order.
    pub users: Mutex<Vec<String>>,
}

impl MockRestricter {
    /// Returns the number of calls received.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Answers a restriction call according to the configured mode.
async fn restrict_handler(
    State(mock): State<Arc<MockRestricter>>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    mock.hits.fetch_add(1, Ordering::SeqCst);
    if let Some(user) = query.get("user_id") {
        mock.users.lock().unwrap().push(user.clone());
    }
    let id = body[0]["ids"][0].as_u64().unwrap_or_default();
    match &mock.mode {
        RestricterMode::Allow => Json(marker(id)).into_response(),
        RestricterMode::NoMarker => Json(json!({"projector/other/id": id})).into_response(),
        RestricterMode::Status(status) => (*status, Json(json!({}))).into_response(),
        RestricterMode::Slow(delay) => {
            tokio::time::sleep(*delay).await;
            Json(marker(id)).into_response()
        }
        RestricterMode::Raw(body) => {
            ([(CONTENT_TYPE, "application/json")], *body).into_response()
        }
        RestricterMode::Padded(n) => {
            let mut body = marker(id);
            body["filler"] = json!("x".repeat(*n));
            Json(body).into_response()
        }
    }
}

/// Restricted answer proving access to projector `id`.
fn marker(id: u64) -> Value {
    let mut members = serde_json::Map::new();
    members.insert(format!("projector/{id}/id"), json!(id));
    Value::Object(members)
}

/// Handle to a running mock restriction service.
pub struct MockRestricterServer {
    /// Endpoint URL.
    pub url: String,
    /// Shared state for assertions.
    pub state: Arc<MockRestricter>,
    /// Stops the service when dropped or fired.
    _shutdown: oneshot::Sender<()>,
}

/// Starts a mock restriction service on an ephemeral port.
pub async fn spawn_restricter(mode: RestricterMode) -> MockRestricterServer {
    let state = Arc::new(MockRestricter {
        mode,
        hits: AtomicUsize::new(0),
        users: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/internal/autoupdate", post(restrict_handler))
        .with_state(Arc::clone(&state));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });
    MockRestricterServer {
        url: format!("http://{addr}/internal/autoupdate"),
        state,
        _shutdown: shutdown_tx,
    }
}

// ============================================================================
// SECTION: Projector Server
// ============================================================================

/// Returns a configuration pointing at `restricter_url` with one test token.
pub fn test_config(restricter_url: &str) -> ProjectorConfig {
    let mut config = ProjectorConfig::default();
    config.restricter.url = restricter_url.to_string();
    config.restricter.timeout_ms = 1_000;
    config.restricter.connect_timeout_ms = 500;
    config.auth.tokens = vec![AuthTokenConfig {
        token: TOKEN.to_string(),
        user_id: USER_ID,
    }];
    config
}

/// Running projector server.
pub struct RunningServer {
    /// Base URL, e.g. `http://127.0.0.1:1234`.
    pub base: String,
    /// Captured audit events.
    pub audit: Arc<RecordingAuditSink>,
    /// Shutdown trigger.
    pub cancel: CancellationToken,
    /// Serve task.
    pub task: JoinHandle<Result<(), projector_server::ServerError>>,
}

impl RunningServer {
    /// Builds an absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Cancels the server and waits for it to finish.
    pub async fn stop(self) -> Arc<RecordingAuditSink> {
        self.cancel.cancel();
        self.task.await.expect("join").expect("serve");
        self.audit
    }
}

/// Serves a projector server over `primary` on an ephemeral port.
pub async fn spawn_server(
    config: ProjectorConfig,
    primary: Arc<dyn Flow>,
    vote_source: Option<Arc<dyn VoteCountSource>>,
) -> RunningServer {
    let audit = Arc::new(RecordingAuditSink::default());
    let restricter = HttpRestricter::new(&config.restricter).expect("restricter");
    let parts = ServerParts {
        audit: Arc::clone(&audit) as Arc<dyn AuditSink>,
        authenticator: Arc::new(TokenAuthenticator::from_config(&config.auth)),
        restricter: Arc::new(restricter),
        primary,
        vote_source,
    };
    let server = ProjectorServer::new(config, parts).expect("server");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let cancel = CancellationToken::new();
    let task = tokio::spawn(server.serve_listener(listener, cancel.clone()));
    RunningServer {
        base: format!("http://{addr}"),
        audit,
        cancel,
        task,
    }
}

/// Returns a client that authenticates as [`USER_ID`].
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().timeout(Duration::from_secs(5)).build().expect("client")
}

/// Returns the value of the bearer header for [`TOKEN`].
pub fn bearer() -> String {
    format!("Bearer {TOKEN}")
}
