//! Metrics Poller
//!
//! Refreshes the dashboard on a fixed interval. Each tick issues three
//! independent fetches (metrics, traces, errors); a failure in one never
//! blocks or corrupts the other two, and nothing propagates to the timer.
//!
//! Ticks are spawned rather than awaited by the timer loop, so a slow
//! backend produces overlapping polls instead of a drifting schedule. Each
//! tick carries a monotonic sequence number; whether an out-of-order
//! completion is applied is decided by the dashboard's [`StalePolicy`].
//!
//! Nothing here bounds how long a fetch may take. If the backend hangs and
//! the HTTP client has no request timeout, every tick adds another pending
//! poll; [`MetricsPoller::in_flight`] exposes the count and the poller
//! warns once it reaches [`PILE_UP_WARNING`].
//!
//! [`StalePolicy`]: super::StalePolicy

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::dashboard::DashboardState;
use crate::api::AssistantApi;

/// Shared, poll-updated dashboard
pub type SharedDashboard = Arc<RwLock<DashboardState>>;

/// Receiver that yields whenever a completion changed the dashboard
pub type DashboardWatcher = watch::Receiver<u64>;

/// Pending timer polls at which a pile-up is logged
pub const PILE_UP_WARNING: usize = 5;

pub struct MetricsPoller {
    api: Arc<dyn AssistantApi>,
    state: SharedDashboard,
    ticks: Arc<AtomicU64>,
    updates: Arc<watch::Sender<u64>>,
    in_flight: Arc<AtomicUsize>,
    request_timeout: Option<Duration>,
    timer: Option<JoinHandle<()>>,
}

impl MetricsPoller {
    pub fn new(api: Arc<dyn AssistantApi>, state: DashboardState) -> Self {
        let (updates, _) = watch::channel(0);
        Self {
            api,
            state: Arc::new(RwLock::new(state)),
            ticks: Arc::new(AtomicU64::new(0)),
            updates: Arc::new(updates),
            in_flight: Arc::new(AtomicUsize::new(0)),
            request_timeout: None,
            timer: None,
        }
    }

    /// Record the request timeout the API client was built with. The
    /// poller only uses it to warn about unbounded polls.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Timer polls started but not yet finished
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SharedDashboard {
        Arc::clone(&self.state)
    }

    /// Subscribe to dashboard changes
    pub fn subscribe(&self) -> DashboardWatcher {
        self.updates.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Number of ticks issued so far (timer and manual)
    pub fn ticks_issued(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Start the fixed-interval refresh. The first tick fires immediately.
    /// Restarting replaces the previous timer.
    pub fn start(&mut self, interval: Duration) {
        self.stop();
        let period = interval.max(Duration::from_millis(1));
        tracing::info!("Starting metrics poller every {:?}", period);
        if self.request_timeout.is_none() {
            tracing::warn!(
                "No request timeout set (GROZY_REQUEST_TIMEOUT_SECS); a hung backend leaves polls pending"
            );
        }

        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        let ticks = Arc::clone(&self.ticks);
        let updates = Arc::clone(&self.updates);
        let in_flight = Arc::clone(&self.in_flight);

        self.timer = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                timer.tick().await;
                let tick = ticks.fetch_add(1, Ordering::SeqCst) + 1;
                let pending = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                if pending == PILE_UP_WARNING {
                    tracing::warn!(tick, pending, "Metrics polls are piling up; backend not answering");
                }
                let poll = poll_once(
                    Arc::clone(&api),
                    Arc::clone(&state),
                    Arc::clone(&updates),
                    tick,
                );
                let in_flight = Arc::clone(&in_flight);
                tokio::spawn(async move {
                    poll.await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                });
            }
        }));
    }

    /// Cancel the timer. Polls already in flight still complete.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            tracing::info!("Metrics poller stopped");
        }
    }

    /// Run one poll now, outside the timer cadence and without resetting
    /// it. Overlap with a timer tick is tolerated. Returns the tick number.
    pub async fn refresh_now(&self) -> u64 {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(tick, "Manual refresh");
        poll_once(
            Arc::clone(&self.api),
            Arc::clone(&self.state),
            Arc::clone(&self.updates),
            tick,
        )
        .await;
        tick
    }
}

impl Drop for MetricsPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fetch metrics, traces and errors concurrently; apply each as it lands.
async fn poll_once(
    api: Arc<dyn AssistantApi>,
    state: SharedDashboard,
    updates: Arc<watch::Sender<u64>>,
    tick: u64,
) {
    let metrics = async {
        let outcome = api.metrics().await;
        state.write().await.apply_metrics(tick, outcome);
        updates.send_modify(|revision| *revision += 1);
    };
    let traces = async {
        let outcome = api.traces().await;
        state.write().await.apply_traces(tick, outcome);
        updates.send_modify(|revision| *revision += 1);
    };
    let errors = async {
        let outcome = api.errors().await;
        state.write().await.apply_errors(tick, outcome);
        updates.send_modify(|revision| *revision += 1);
    };
    tokio::join!(metrics, traces, errors);
}
