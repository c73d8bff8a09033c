// crates/projector-server/src/handlers.rs
// ============================================================================
// Module: Projector Handlers
// Description: Request handlers behind the auth gateway.
// Purpose: Serve projector snapshots, previews, and change subscriptions.
// Dependencies: axum, projector-core, tokio, tokio-stream, tokio-util
// ============================================================================

//! ## Overview
//! Handlers read from the composed data [`Flow`]. They never authorize on
//! their own: the projector id arrives through the request extensions set by
//! the gateway. Subscriptions are streamed as server-sent events, starting
//! with a `snapshot` event followed by `update` events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::Extension;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::response::Sse;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use projector_core::Flow;
use projector_core::FlowError;
use projector_core::FlowStream;
use projector_core::PreviewPayload;
use projector_core::ProjectorId;
use projector_core::ProjectorSnapshot;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::gateway::ErrorBody;
use crate::gateway::error_response;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message for a flow failure while building a response.
pub const MSG_FLOW_FAILED: &str = "reading projector data failed";
/// Default interval between SSE keep-alive comments.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);
/// Buffered SSE events per subscription.
const SUBSCRIPTION_BUFFER: usize = 16;

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Composed data flow.
    flow: Arc<dyn Flow>,
    /// Keep-alive interval for subscriptions.
    keep_alive: Duration,
    /// Fired on server shutdown; ends open subscriptions.
    shutdown: CancellationToken,
}

impl AppState {
    /// Creates handler state over `flow`.
    #[must_use]
    pub fn new(flow: Arc<dyn Flow>, shutdown: CancellationToken) -> Self {
        Self {
            flow,
            keep_alive: DEFAULT_KEEP_ALIVE,
            shutdown,
        }
    }

    /// Overrides the keep-alive interval.
    #[must_use]
    pub const fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Returns the data flow.
    #[must_use]
    pub fn flow(&self) -> &Arc<dyn Flow> {
        &self.flow
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// `GET /system/projector/health`.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "healthy": true }))
}

/// `GET /system/projector/get/{id}`.
pub async fn get_projector(
    State(state): State<AppState>,
    Extension(id): Extension<ProjectorId>,
) -> Response {
    match ProjectorSnapshot::load(state.flow.as_ref(), id).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, MSG_FLOW_FAILED),
    }
}

/// `GET /system/projector/preview/{id}`.
pub async fn preview_projector(
    State(state): State<AppState>,
    Extension(id): Extension<ProjectorId>,
) -> Response {
    match PreviewPayload::load(state.flow.as_ref(), id).await {
        Ok(preview) => Json(preview).into_response(),
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, MSG_FLOW_FAILED),
    }
}

/// `GET /system/projector/subscribe/{id}`.
pub async fn subscribe_projector(
    State(state): State<AppState>,
    Extension(id): Extension<ProjectorId>,
) -> impl IntoResponse {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(SUBSCRIPTION_BUFFER);
    tokio::spawn(run_subscription(Arc::clone(&state.flow), id, tx, state.shutdown.clone()));
    Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::new().interval(state.keep_alive))
}

// ============================================================================
// SECTION: Subscription
// ============================================================================

/// What the subscription loop does after waiting.
enum Step {
    /// Stop streaming.
    Finish,
    /// Take a fresh snapshot and subscribe again.
    Resnapshot,
    /// Forward one event.
    Send(Event),
}

/// Streams one projector subscription into `tx` until the client leaves,
/// the flow closes, or the server shuts down.
async fn run_subscription(
    flow: Arc<dyn Flow>,
    id: ProjectorId,
    tx: mpsc::Sender<Result<Event, Infallible>>,
    shutdown: CancellationToken,
) {
    loop {
        let (snapshot, mut updates) = match subscribe_snapshot(flow.as_ref(), id).await {
            Ok(pair) => pair,
            Err(err) => {
                let _ = tx.send(Ok(error_event(&err.to_string()))).await;
                return;
            }
        };
        if tx.send(Ok(json_event("snapshot", &snapshot))).await.is_err() {
            return;
        }
        loop {
            let step = tokio::select! {
                () = tx.closed() => Step::Finish,
                () = shutdown.cancelled() => Step::Finish,
                next = updates.next() => match next {
                    None => Step::Finish,
                    Some(Ok(changes)) if snapshot.is_structural_change(&changes) => {
                        Step::Resnapshot
                    }
                    Some(Ok(changes)) => Step::Send(json_event("update", &changes)),
                    Some(Err(err)) if err.is_lagged() => Step::Resnapshot,
                    Some(Err(err)) => Step::Send(error_event(&err.to_string())),
                },
            };
            match step {
                Step::Finish => return,
                Step::Resnapshot => break,
                Step::Send(event) => {
                    if tx.send(Ok(event)).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Loads a snapshot and subscribes to its keys.
///
/// The snapshot is reloaded after subscribing so no change between the read
/// and the subscription is lost; when the key set moved meanwhile the
/// subscription is redone with the new keys.
async fn subscribe_snapshot(
    flow: &dyn Flow,
    id: ProjectorId,
) -> Result<(ProjectorSnapshot, FlowStream), FlowError> {
    let mut snapshot = ProjectorSnapshot::load(flow, id).await?;
    loop {
        let updates = flow.subscribe(&snapshot.keys);
        let current = ProjectorSnapshot::load(flow, id).await?;
        if current.keys == snapshot.keys {
            return Ok((current, updates));
        }
        snapshot = current;
    }
}

/// Builds a named event with a JSON payload.
fn json_event<T: Serialize>(name: &str, payload: &T) -> Event {
    Event::default()
        .event(name)
        .json_data(payload)
        .unwrap_or_else(|err| error_event(&err.to_string()))
}

/// Builds an `error` event carrying the standard error body.
fn error_event(msg: &str) -> Event {
    let body = ErrorBody {
        error: true,
        msg: msg.to_string(),
    };
    Event::default()
        .event("error")
        .json_data(&body)
        .unwrap_or_else(|_| Event::default().event("error").data(msg))
}
