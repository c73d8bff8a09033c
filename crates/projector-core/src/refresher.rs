// crates/projector-core/src/refresher.rs
// ============================================================================
// Module: Periodic Refresher
// Description: Supervised background loop driving a refresh on every tick.
// Purpose: Keep polled flows current without touching the request path.
// Dependencies: tokio, tokio-util
// ============================================================================

//! ## Overview
//! [`PeriodicRefresher`] awaits a [`Refresh`] target on every tick produced by
//! a [`TickSource`]. A failed refresh is handed to the error callback and the
//! loop continues; only cancellation or an exhausted tick source ends it.
//! The tick source's stop operation always runs when the loop exits.
//!
//! State machine: `Idle` until started, `Running` while ticking, `Stopped`
//! once finished. `start` consumes the refresher, so `Idle` is never re-entered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default refresh period.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

// ============================================================================
// SECTION: Refresh Target
// ============================================================================

/// Work performed on every tick.
#[async_trait]
pub trait Refresh: Send + Sync {
    /// Runs one refresh.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError`] when the refresh fails; the loop continues.
    async fn refresh(&self) -> Result<(), RefreshError>;
}

/// Refresh failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The upstream source could not be reached or answered with an error.
    #[error("refresh source failed: {0}")]
    Source(String),
    /// The upstream payload could not be decoded.
    #[error("refresh payload invalid: {0}")]
    Decode(String),
    /// The fetched state could not be applied.
    #[error("refresh apply failed: {0}")]
    Apply(String),
    /// The refresher task terminated abnormally.
    #[error("refresher task failed: {0}")]
    Task(String),
}

// ============================================================================
// SECTION: Tick Sources
// ============================================================================

/// Factory for tick streams.
pub trait TickSource: Send + 'static {
    /// Starts producing ticks.
    fn start(&mut self) -> Ticks;
}

/// Receiver of tick events paired with the stop operation of its producer.
pub struct Ticks {
    /// Tick events.
    receiver: mpsc::Receiver<()>,
    /// Releases the producer; taken on first stop.
    stop: Option<Box<dyn FnOnce() + Send>>,
}

impl Ticks {
    /// Pairs a tick receiver with its stop operation.
    #[must_use]
    pub fn new(receiver: mpsc::Receiver<()>, stop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            receiver,
            stop: Some(Box::new(stop)),
        }
    }

    /// Waits for the next tick; `None` once the producer is gone.
    pub async fn next(&mut self) -> Option<()> {
        self.receiver.recv().await
    }

    /// Stops the producer. Further calls do nothing.
    pub fn stop(&mut self) {
        self.receiver.close();
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }
}

impl Drop for Ticks {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Wall-clock tick source with a fixed period.
///
/// The first tick fires one period after start. Ticks that cannot be
/// delivered while a refresh is running are delayed, not queued.
#[derive(Debug, Clone, Copy)]
pub struct IntervalTickSource {
    /// Time between ticks.
    period: Duration,
}

impl IntervalTickSource {
    /// Creates a tick source firing every `period`.
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
        }
    }
}

impl Default for IntervalTickSource {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_PERIOD)
    }
}

impl TickSource for IntervalTickSource {
    fn start(&mut self) -> Ticks {
        let (sender, receiver) = mpsc::channel(1);
        let period = self.period;
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if sender.send(()).await.is_err() {
                    break;
                }
            }
        });
        Ticks::new(receiver, move || task.abort())
    }
}

/// Manually driven tick source for tests and embedding.
pub struct ManualTickSource {
    /// Receiver handed out on start.
    receiver: Option<mpsc::Receiver<()>>,
    /// Set once the produced ticks are stopped.
    stopped: Arc<AtomicBool>,
}

/// Fires ticks into a [`ManualTickSource`].
#[derive(Clone)]
pub struct TickTrigger {
    /// Tick sender.
    sender: mpsc::Sender<()>,
    /// Shared stop flag.
    stopped: Arc<AtomicBool>,
}

impl ManualTickSource {
    /// Creates a source buffering up to `capacity` unconsumed ticks.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, TickTrigger) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let stopped = Arc::new(AtomicBool::new(false));
        (
            Self {
                receiver: Some(receiver),
                stopped: Arc::clone(&stopped),
            },
            TickTrigger {
                sender,
                stopped,
            },
        )
    }
}

impl TickSource for ManualTickSource {
    fn start(&mut self) -> Ticks {
        // A second start yields an already-closed tick stream.
        let receiver = self.receiver.take().unwrap_or_else(|| mpsc::channel(1).1);
        let stopped = Arc::clone(&self.stopped);
        Ticks::new(receiver, move || stopped.store(true, Ordering::SeqCst))
    }
}

impl TickTrigger {
    /// Fires one tick; returns false once the refresher stopped listening.
    pub async fn fire(&self) -> bool {
        self.sender.send(()).await.is_ok()
    }

    /// Returns true once the consuming side released the tick stream.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: Refresher
// ============================================================================

/// Lifecycle of a refresher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefresherState {
    /// Constructed, not started.
    Idle,
    /// Ticking.
    Running,
    /// Finished; terminal.
    Stopped,
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Ticks received (one refresh attempt each).
    pub ticks: u64,
    /// Refresh attempts that failed.
    pub failures: u64,
}

/// Periodic refresh loop in the `Idle` state.
pub struct PeriodicRefresher {
    /// State publisher.
    state: watch::Sender<RefresherState>,
}

impl Default for PeriodicRefresher {
    fn default() -> Self {
        Self::new()
    }
}

impl PeriodicRefresher {
    /// Creates an idle refresher.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(RefresherState::Idle);
        Self {
            state,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> RefresherState {
        *self.state.borrow()
    }

    /// Spawns the loop on the current tokio runtime.
    ///
    /// `on_error` receives every failed refresh; it must not block.
    pub fn start<S, F>(
        self,
        cancel: CancellationToken,
        mut tick_source: S,
        target: Arc<dyn Refresh>,
        on_error: F,
    ) -> RefresherHandle
    where
        S: TickSource,
        F: Fn(RefreshError) + Send + Sync + 'static,
    {
        self.state.send_replace(RefresherState::Running);
        let state_rx = self.state.subscribe();
        let state = self.state;
        let loop_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let mut ticks = tick_source.start();
            let report = run_loop(&mut ticks, &loop_cancel, target.as_ref(), &on_error).await;
            ticks.stop();
            state.send_replace(RefresherState::Stopped);
            report
        });
        RefresherHandle {
            cancel,
            state: state_rx,
            task,
        }
    }
}

/// Drives `target` until cancellation or tick exhaustion.
async fn run_loop(
    ticks: &mut Ticks,
    cancel: &CancellationToken,
    target: &dyn Refresh,
    on_error: &(dyn Fn(RefreshError) + Send + Sync),
) -> RefreshReport {
    let mut report = RefreshReport::default();
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            tick = ticks.next() => {
                if tick.is_none() {
                    break;
                }
                report.ticks += 1;
                let outcome = tokio::select! {
                    () = cancel.cancelled() => break,
                    outcome = target.refresh() => outcome,
                };
                if let Err(err) = outcome {
                    report.failures += 1;
                    on_error(err);
                }
            }
        }
    }
    report
}

/// Handle to a running refresher.
pub struct RefresherHandle {
    /// Token stopping the loop.
    cancel: CancellationToken,
    /// State observer.
    state: watch::Receiver<RefresherState>,
    /// Loop task.
    task: JoinHandle<RefreshReport>,
}

impl RefresherHandle {
    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> RefresherState {
        *self.state.borrow()
    }

    /// Requests the loop to stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns the token governing the loop.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the loop to finish and returns its counters.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::Task`] when the loop task panicked or was aborted.
    pub async fn join(self) -> Result<RefreshReport, RefreshError> {
        self.task.await.map_err(|err| RefreshError::Task(err.to_string()))
    }
}
