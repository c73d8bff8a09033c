// crates/projector-core/src/lib.rs
// ============================================================================
// Module: Projector Core
// Description: Flow abstraction, flow composition, and background refresh.
// Purpose: Provide the data plane served by the projector gateway.
// Dependencies: serde_json, tokio, tokio-stream, tokio-util
// ============================================================================

//! ## Overview
//! `projector-core` owns everything the gateway reads from: keyed [`Flow`]
//! sources, the [`FlowComposer`] that overlays override flows on a primary
//! flow, the [`PeriodicRefresher`] that keeps polled flows current, and the
//! projector views assembled from flow keys. It has no HTTP dependencies.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod combine;
pub mod flow;
pub mod memory;
pub mod projector;
pub mod refresher;
pub mod vote;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use combine::ComposedFlow;
pub use combine::FlowComposer;
pub use combine::OverrideRoute;
pub use flow::Flow;
pub use flow::FlowError;
pub use flow::FlowKey;
pub use flow::FlowStream;
pub use flow::FlowValues;
pub use flow::InvalidFlowKey;
pub use memory::MemoryFlow;
pub use projector::InvalidProjectorId;
pub use projector::PreviewPayload;
pub use projector::ProjectorId;
pub use projector::ProjectorSnapshot;
pub use refresher::IntervalTickSource;
pub use refresher::ManualTickSource;
pub use refresher::PeriodicRefresher;
pub use refresher::Refresh;
pub use refresher::RefreshError;
pub use refresher::RefreshReport;
pub use refresher::RefresherHandle;
pub use refresher::RefresherState;
pub use refresher::TickSource;
pub use refresher::TickTrigger;
pub use refresher::Ticks;
pub use vote::LiveVoteFlow;
pub use vote::PollTallies;
pub use vote::VoteCountSource;
