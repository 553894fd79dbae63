//! Metrics Poller Integration Tests
//!
//! Independent panel failures, timer behaviour after failures, manual
//! refresh, stop, and ordering of overlapping polls.

mod helpers;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use grozy_console::api::AssistantApi;
use grozy_console::metrics::Severity;
use grozy_console::{DashboardState, DashboardView, MetricsPoller, StalePolicy};

use helpers::{eventually, refused, snapshot, trace, FakeBackend};

fn poller(api: &Arc<FakeBackend>, policy: StalePolicy) -> MetricsPoller {
    let api: Arc<dyn AssistantApi> = api.clone();
    MetricsPoller::new(api, DashboardState::new(policy))
}

/// A traces failure leaves metrics and errors updated and keeps the old
/// traces on screen.
#[tokio::test]
async fn test_failures_are_independent() {
    let api = Arc::new(FakeBackend::new());
    api.set_metrics(Ok(snapshot(3)));
    api.set_traces(Ok(vec![trace("Hola")]));
    let poller = poller(&api, StalePolicy::default());

    poller.refresh_now().await;

    api.set_metrics(Ok(snapshot(7)));
    api.set_traces(Err(refused("/api/metrics/traces")));
    poller.refresh_now().await;

    let state = poller.state();
    let state = state.read().await;
    assert_eq!(state.snapshot().unwrap().total_requests, 7);
    assert!(state.metrics_panel().last_error().is_none());
    assert!(state.errors_panel().last_error().is_none());

    let traces = state.traces_panel();
    assert_eq!(traces.content().unwrap()[0].request, "Hola");
    assert!(traces.last_error().unwrap().contains("/api/metrics/traces"));

    let view = DashboardView::project(&state);
    assert_eq!(view.traces.len(), 1);
    assert_eq!(view.notes.len(), 1);
}

#[tokio::test]
async fn test_metrics_failure_keeps_charts_and_advisories() {
    let api = Arc::new(FakeBackend::new());
    api.set_metrics(Ok(grozy_console::api::MetricsSnapshot {
        avg_latency: 6.2,
        error_rate: 2.0,
        avg_precision: 0.9,
        avg_cpu_percent: 50.0,
        ..Default::default()
    }));
    let poller = poller(&api, StalePolicy::default());
    poller.refresh_now().await;

    api.set_metrics(Err(refused("/api/metrics")));
    api.set_traces(Ok(vec![trace("nuevo")]));
    poller.refresh_now().await;

    let state = poller.state();
    let state = state.read().await;
    let advisories = state.advisories();
    assert_eq!(advisories.len(), 3);
    assert_eq!(
        advisories
            .iter()
            .filter(|a| a.severity == Severity::Critical)
            .count(),
        1
    );
    assert_eq!(state.charts().revision, 1);
    assert!(state.metrics_panel().last_error().is_some());
    assert_eq!(state.traces_panel().content().unwrap()[0].request, "nuevo");
}

/// The timer keeps firing after every fetch in a tick has failed
#[tokio::test]
async fn test_timer_survives_failures() {
    let api = Arc::new(FakeBackend::new());
    api.set_metrics(Err(refused("/api/metrics")));
    api.set_traces(Err(refused("/api/metrics/traces")));
    api.set_errors(Err(refused("/api/metrics/errors")));
    let mut poller = poller(&api, StalePolicy::default());

    poller.start(Duration::from_millis(20));
    assert!(eventually(|| api.traces_calls.load(Ordering::SeqCst) >= 3).await);
    assert!(poller.is_running());

    // Backend recovers; the next tick picks it up
    api.set_traces(Ok(vec![trace("de vuelta")]));
    let state = poller.state();
    let mut recovered = false;
    for _ in 0..100 {
        if state.read().await.traces_panel().content().is_some() {
            recovered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(recovered);
    poller.stop();
}

#[tokio::test]
async fn test_each_tick_fetches_all_three() {
    let api = Arc::new(FakeBackend::new());
    let poller = poller(&api, StalePolicy::default());
    let mut updates = poller.subscribe();

    let tick = poller.refresh_now().await;
    assert_eq!(tick, 1);
    assert_eq!(api.metrics_calls.load(Ordering::SeqCst), 1);
    assert_eq!(api.traces_calls.load(Ordering::SeqCst), 1);
    assert_eq!(api.errors_calls.load(Ordering::SeqCst), 1);

    // One notification per applied completion
    assert!(updates.has_changed().unwrap());
    assert_eq!(*updates.borrow_and_update(), 3);
}

#[tokio::test]
async fn test_stop_cancels_timer() {
    let api = Arc::new(FakeBackend::new());
    let mut poller = poller(&api, StalePolicy::default());

    poller.start(Duration::from_millis(20));
    assert!(eventually(|| api.metrics_calls.load(Ordering::SeqCst) >= 2).await);
    poller.stop();
    assert!(!poller.is_running());

    // Let any tick already spawned finish
    tokio::time::sleep(Duration::from_millis(30)).await;
    let calls = api.metrics_calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(api.metrics_calls.load(Ordering::SeqCst), calls);
}

#[tokio::test]
async fn test_refresh_now_does_not_touch_schedule() {
    let api = Arc::new(FakeBackend::new());
    let mut poller = poller(&api, StalePolicy::default());
    poller.start(Duration::from_secs(3600));
    assert!(eventually(|| api.metrics_calls.load(Ordering::SeqCst) == 1).await);

    poller.refresh_now().await;
    poller.refresh_now().await;
    assert_eq!(api.metrics_calls.load(Ordering::SeqCst), 3);
    assert_eq!(poller.ticks_issued(), 3);
    assert!(poller.is_running());
}

/// Tick 1 finishes after tick 2: applied by default
#[tokio::test]
async fn test_overlap_last_completion_wins() {
    let api = Arc::new(FakeBackend::new());
    api.push_metrics(Duration::from_millis(150), Ok(snapshot(1)));
    api.push_metrics(Duration::ZERO, Ok(snapshot(2)));
    let poller = poller(&api, StalePolicy::LastCompletionWins);

    tokio::join!(poller.refresh_now(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        poller.refresh_now().await
    });

    let state = poller.state();
    assert_eq!(state.read().await.snapshot().unwrap().total_requests, 1);
}

/// Same overlap, but the late tick-1 completion is discarded
#[tokio::test]
async fn test_overlap_drop_stale() {
    let api = Arc::new(FakeBackend::new());
    api.push_metrics(Duration::from_millis(150), Ok(snapshot(1)));
    api.push_metrics(Duration::ZERO, Ok(snapshot(2)));
    let poller = poller(&api, StalePolicy::DropStale);

    tokio::join!(poller.refresh_now(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        poller.refresh_now().await
    });

    let state = poller.state();
    assert_eq!(state.read().await.snapshot().unwrap().total_requests, 2);
}

/// A backend that stops answering leaves timer polls pending; they drain
/// once it replies again.
#[tokio::test]
async fn test_slow_backend_polls_pile_up_then_drain() {
    let api = Arc::new(FakeBackend::new());
    for total in 1..=5 {
        api.push_metrics(Duration::from_millis(300), Ok(snapshot(total)));
    }
    let mut poller = poller(&api, StalePolicy::default());
    assert_eq!(poller.request_timeout(), None);

    poller.start(Duration::from_millis(20));
    assert!(eventually(|| poller.in_flight() >= 3).await);
    poller.stop();

    assert!(eventually(|| poller.in_flight() == 0).await);
    let state = poller.state();
    assert!(state.read().await.snapshot().is_some());
}

#[tokio::test]
async fn test_request_timeout_is_recorded() {
    let api: Arc<dyn AssistantApi> = Arc::new(FakeBackend::new());
    let poller = MetricsPoller::new(api, DashboardState::new(StalePolicy::default()))
        .with_request_timeout(Some(Duration::from_secs(10)));
    assert_eq!(poller.request_timeout(), Some(Duration::from_secs(10)));
    assert_eq!(poller.in_flight(), 0);
}
