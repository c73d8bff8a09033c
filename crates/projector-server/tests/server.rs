//! Route, view, subscription, and lifecycle tests.
// crates/projector-server/tests/server.rs
// ============================================================================
// Module: Projector Server Tests
// Description: Route, view, subscription, and lifecycle tests.
// Purpose: Exercise the assembled server over real HTTP.
// Dependencies: projector-core, projector-server, reqwest, tokio
// ============================================================================

//! Server tests bind the full router on an ephemeral port backed by a seeded
//! memory flow and a mock restriction service that always admits.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

mod common;

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use common::RecordingAuditSink;
use common::RestricterMode;
use common::bearer;
use common::client;
use common::spawn_restricter;
use common::spawn_server;
use common::test_config;
use projector_core::Flow;
use projector_core::FlowKey;
use projector_core::FlowValues;
use projector_core::LiveVoteFlow;
use projector_core::MemoryFlow;
use projector_core::PollTallies;
use projector_core::Refresh;
use projector_core::RefreshError;
use projector_core::VoteCountSource;
use projector_server::AuditSink;
use projector_server::HttpRestricter;
use projector_server::ProjectorServer;
use projector_server::ServerParts;
use projector_server::TokenAuthenticator;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Vote source answering with a fixed tally set.
struct StaticVotes(Mutex<PollTallies>);

#[async_trait]
impl VoteCountSource for StaticVotes {
    async fn fetch(&self) -> Result<PollTallies, RefreshError> {
        Ok(self.0.lock().unwrap().clone())
    }
}

/// Vote source whose upstream is always down.
struct FailingVotes;

#[async_trait]
impl VoteCountSource for FailingVotes {
    async fn fetch(&self) -> Result<PollTallies, RefreshError> {
        Err(RefreshError::Source("vote service unreachable".to_string()))
    }
}

fn seeded_flow() -> Arc<MemoryFlow> {
    let seed = json!({
        "projector/7/id": 7,
        "projector/7/name": "Main",
        "projector/7/current_projection_ids": [1, 2],
        "projector/7/preview_projection_ids": [3],
        "projection/1/id": 1,
        "projection/1/content_object_id": "poll/4",
        "projection/1/current_projector_id": 7,
        "projection/2/id": 2,
        "projection/2/content_object_id": "topic/1",
        "projection/2/current_projector_id": 7,
        "projection/3/id": 3,
        "projection/3/content_object_id": "topic/2",
        "projection/3/preview_projector_id": 7,
        "poll/4/live_votes": {"stale": true},
    });
    Arc::new(MemoryFlow::from_json("datastore", &seed).expect("seed"))
}

fn key(text: &str) -> FlowKey {
    FlowKey::parse(text).expect("key")
}

async fn authorized_json(url: &str) -> (u16, Value) {
    let response =
        client().get(url).header(AUTHORIZATION, bearer()).send().await.expect("send");
    let status = response.status().as_u16();
    (status, response.json().await.expect("json"))
}

/// Reads SSE frames until one with `event` arrives and returns its data.
async fn next_event(
    response: &mut reqwest::Response,
    buffer: &mut String,
    event: &str,
) -> Value {
    let marker = format!("event: {event}\n");
    loop {
        while let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();
            if frame.contains(&marker) {
                let data = frame
                    .lines()
                    .find_map(|line| line.strip_prefix("data: "))
                    .expect("data line");
                return serde_json::from_str(data).expect("event json");
            }
        }
        let chunk = tokio::time::timeout(Duration::from_secs(5), response.chunk())
            .await
            .expect("event in time")
            .expect("chunk")
            .expect("stream open");
        buffer.push_str(std::str::from_utf8(&chunk).expect("utf8"));
    }
}

// ============================================================================
// SECTION: Routes
// ============================================================================

#[tokio::test]
async fn health_is_public_and_unknown_paths_are_404() {
    let restricter = spawn_restricter(RestricterMode::Allow).await;
    let server = spawn_server(test_config(&restricter.url), seeded_flow(), None).await;

    let health =
        client().get(server.url("/system/projector/health")).send().await.expect("send");
    assert_eq!(health.status().as_u16(), 200);
    assert_eq!(health.json::<Value>().await.expect("json"), json!({"healthy": true}));

    let missing =
        client().get(server.url("/system/projector/nope/7")).send().await.expect("send");
    assert_eq!(missing.status().as_u16(), 404);
    assert_eq!(restricter.state.hits(), 0);

    let audit = server.stop().await;
    assert!(audit.access_events().is_empty());
    assert_eq!(audit.service_kinds(), vec!["listening".to_string(), "shutdown".to_string()]);
}

#[tokio::test]
async fn get_returns_projector_snapshot() {
    let restricter = spawn_restricter(RestricterMode::Allow).await;
    let server = spawn_server(test_config(&restricter.url), seeded_flow(), None).await;

    let (status, body) = authorized_json(&server.url("/system/projector/get/7")).await;
    assert_eq!(status, 200);
    assert_eq!(body["id"], 7);
    assert_eq!(body["projector"]["name"], "Main");
    assert_eq!(body["projections"]["1"]["content_object_id"], "poll/4");
    assert_eq!(body["projections"]["2"]["content_object_id"], "topic/1");
    assert!(body["projections"].get("3").is_none());
    assert_eq!(body["live_votes"]["4"], json!({"stale": true}));
    server.stop().await;
}

#[tokio::test]
async fn get_unknown_projector_is_empty_snapshot() {
    let restricter = spawn_restricter(RestricterMode::Allow).await;
    let server = spawn_server(test_config(&restricter.url), seeded_flow(), None).await;

    let (status, body) = authorized_json(&server.url("/system/projector/get/99")).await;
    assert_eq!(status, 200);
    assert_eq!(body["projector"], json!({}));
    assert_eq!(body["projections"], json!({}));
    server.stop().await;
}

#[tokio::test]
async fn preview_lists_queued_projections() {
    let restricter = spawn_restricter(RestricterMode::Allow).await;
    let server = spawn_server(test_config(&restricter.url), seeded_flow(), None).await;

    let (status, body) = authorized_json(&server.url("/system/projector/preview/7")).await;
    assert_eq!(status, 200);
    assert_eq!(body["preview_projection_ids"], json!([3]));
    assert_eq!(body["projections"]["3"]["content_object_id"], "topic/2");
    server.stop().await;
}

#[tokio::test]
async fn protected_routes_require_authentication() {
    let restricter = spawn_restricter(RestricterMode::Allow).await;
    let server = spawn_server(test_config(&restricter.url), seeded_flow(), None).await;

    for path in ["get/7", "preview/7", "subscribe/7"] {
        let response = client()
            .get(server.url(&format!("/system/projector/{path}")))
            .send()
            .await
            .expect("send");
        assert_eq!(response.status().as_u16(), 401, "{path}");
    }
    assert_eq!(restricter.state.hits(), 0);
    server.stop().await;
}

// ============================================================================
// SECTION: Subscriptions
// ============================================================================

#[tokio::test]
async fn subscription_sends_snapshot_then_updates() {
    let restricter = spawn_restricter(RestricterMode::Allow).await;
    let primary = seeded_flow();
    let server =
        spawn_server(test_config(&restricter.url), Arc::clone(&primary) as Arc<dyn Flow>, None)
            .await;

    let mut response = client()
        .get(server.url("/system/projector/subscribe/7"))
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 200);
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"), "{content_type}");

    let mut buffer = String::new();
    let snapshot = next_event(&mut response, &mut buffer, "snapshot").await;
    assert_eq!(snapshot["projector"]["name"], "Main");

    let mut changes = FlowValues::new();
    changes.insert(key("projector/7/name"), Some(json!("Side")));
    primary.apply(changes).expect("apply");
    let update = next_event(&mut response, &mut buffer, "update").await;
    assert_eq!(update, json!({"projector/7/name": "Side"}));

    let mut changes = FlowValues::new();
    changes.insert(key("projector/7/current_projection_ids"), Some(json!([2])));
    primary.apply(changes).expect("apply");
    let resnapshot = next_event(&mut response, &mut buffer, "snapshot").await;
    assert_eq!(resnapshot["projector"]["name"], "Side");
    assert!(resnapshot["projections"].get("1").is_none());

    drop(response);
    server.stop().await;
}

#[tokio::test]
async fn shutdown_ends_open_subscriptions() {
    let restricter = spawn_restricter(RestricterMode::Allow).await;
    let server = spawn_server(test_config(&restricter.url), seeded_flow(), None).await;

    let mut response = client()
        .get(server.url("/system/projector/subscribe/7"))
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .expect("send");
    let mut buffer = String::new();
    next_event(&mut response, &mut buffer, "snapshot").await;

    let stopped = tokio::time::timeout(Duration::from_secs(5), server.stop()).await;
    assert!(stopped.is_ok());
}

#[tokio::test]
async fn failing_vote_refresh_is_audited_and_serving_continues() {
    let restricter = spawn_restricter(RestricterMode::Allow).await;
    let mut config = test_config(&restricter.url);
    config.live_votes.interval_ms = 20;
    let votes: Arc<dyn VoteCountSource> = Arc::new(FailingVotes);
    let server = spawn_server(config, seeded_flow(), Some(votes)).await;

    let recorded = tokio::time::timeout(Duration::from_secs(5), async {
        while server.audit.refresh.lock().unwrap().len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(recorded.is_ok(), "refresh failures were not audited");
    assert!(
        server.audit.refresh.lock().unwrap()[0].error.contains("vote service unreachable")
    );

    let (status, body) = authorized_json(&server.url("/system/projector/get/7")).await;
    assert_eq!(status, 200);
    assert_eq!(body["projector"]["name"], "Main");

    let audit = server.stop().await;
    let stopped = audit
        .service
        .lock()
        .unwrap()
        .iter()
        .find(|event| event.kind == "refresher_stopped")
        .and_then(|event| event.message.clone())
        .expect("refresher_stopped event");
    assert!(stopped.starts_with("ticks="), "{stopped}");
    assert!(!stopped.ends_with("failures=0"), "{stopped}");
    assert_eq!(audit.service_kinds().last().map(String::as_str), Some("shutdown"));
}

// ============================================================================
// SECTION: Assembly
// ============================================================================

fn server_parts(
    primary: Arc<dyn Flow>,
    vote_source: Option<Arc<dyn VoteCountSource>>,
) -> (ServerParts, projector_config::ProjectorConfig) {
    let config = test_config("http://127.0.0.1:9/internal/autoupdate");
    let parts = ServerParts {
        audit: Arc::new(RecordingAuditSink::default()) as Arc<dyn AuditSink>,
        authenticator: Arc::new(TokenAuthenticator::from_config(&config.auth)),
        restricter: Arc::new(HttpRestricter::new(&config.restricter).expect("restricter")),
        primary,
        vote_source,
    };
    (parts, config)
}

#[tokio::test]
async fn public_access_only_uses_primary_flow() {
    let primary: Arc<dyn Flow> = seeded_flow();
    let votes: Arc<dyn VoteCountSource> = Arc::new(StaticVotes(Mutex::new(PollTallies::new())));
    let (parts, mut config) = server_parts(Arc::clone(&primary), Some(votes));
    config.public_access_only = true;

    let server = ProjectorServer::new(config, parts).expect("server");
    assert!(server.live_vote_flow().is_none());
    assert!(Arc::ptr_eq(&server.data_flow(), &primary));
}

#[tokio::test]
async fn live_votes_override_primary_tallies() {
    let primary: Arc<dyn Flow> = seeded_flow();
    let mut tallies = PollTallies::new();
    tallies.insert(4, json!({"yes": 3}));
    let votes: Arc<dyn VoteCountSource> = Arc::new(StaticVotes(Mutex::new(tallies)));
    let (parts, config) = server_parts(Arc::clone(&primary), Some(votes));

    let server = ProjectorServer::new(config, parts).expect("server");
    let live = server.live_vote_flow().expect("live vote flow");
    assert!(!Arc::ptr_eq(&server.data_flow(), &primary));

    let poll = LiveVoteFlow::key(4).expect("key");
    let before = server.data_flow().get(std::slice::from_ref(&poll)).await.expect("get");
    assert_eq!(before[&poll], None);

    live.refresh().await.expect("refresh");
    let after = server.data_flow().get(std::slice::from_ref(&poll)).await.expect("get");
    assert_eq!(after[&poll], Some(json!({"yes": 3})));
}
