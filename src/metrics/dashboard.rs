//! Dashboard state
//!
//! Holds the latest snapshot, the derived charts and advisories, and the
//! traces and errors panels. Each panel is updated independently: a failed
//! fetch leaves the panel's last-known-good content in place and records
//! the error next to it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::advisory::{analyze, Advisory};
use super::charts::ChartSet;
use crate::api::{ErrorRecord, MetricsSnapshot, TraceRecord};
use crate::error::Result;

/// How completions from overlapping polls are ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Every completion is applied; the last one to finish wins even if it
    /// was issued by an older tick.
    #[default]
    LastCompletionWins,
    /// A completion from a tick older than the one a panel already shows is
    /// discarded.
    DropStale,
}

/// Outcome of applying one fetch completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    /// Fetch failed; previous content kept
    Failed,
    /// Dropped under [`StalePolicy::DropStale`]
    Stale,
}

/// One independently refreshed panel
#[derive(Debug, Clone, Serialize)]
pub struct Panel<T> {
    content: Option<T>,
    last_error: Option<String>,
    last_tick: Option<u64>,
    updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        Self {
            content: None,
            last_error: None,
            last_tick: None,
            updated_at: None,
        }
    }
}

impl<T> Panel<T> {
    pub fn content(&self) -> Option<&T> {
        self.content.as_ref()
    }

    /// Diagnostic of the most recent failed fetch, cleared on success
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn is_stale(&self, tick: u64, policy: StalePolicy) -> bool {
        policy == StalePolicy::DropStale && self.last_tick.is_some_and(|last| last > tick)
    }

    fn apply(&mut self, tick: u64, policy: StalePolicy, outcome: Result<T>, name: &str) -> Applied {
        if self.is_stale(tick, policy) {
            tracing::debug!(panel = name, tick, "Dropping stale completion");
            return Applied::Stale;
        }
        self.last_tick = Some(tick);
        match outcome {
            Ok(content) => {
                self.content = Some(content);
                self.last_error = None;
                self.updated_at = Some(Utc::now());
                Applied::Updated
            }
            Err(err) => {
                tracing::warn!(panel = name, tick, "Fetch failed, keeping last content: {}", err);
                self.last_error = Some(err.diagnostic());
                Applied::Failed
            }
        }
    }
}

/// Everything the dashboard renders
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardState {
    pub policy: StalePolicy,
    metrics: Panel<MetricsSnapshot>,
    traces: Panel<Vec<TraceRecord>>,
    errors: Panel<Vec<ErrorRecord>>,
    charts: ChartSet,
    advisories: Vec<Advisory>,
}

impl DashboardState {
    pub fn new(policy: StalePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> Option<&MetricsSnapshot> {
        self.metrics.content()
    }

    pub fn metrics_panel(&self) -> &Panel<MetricsSnapshot> {
        &self.metrics
    }

    pub fn traces_panel(&self) -> &Panel<Vec<TraceRecord>> {
        &self.traces
    }

    pub fn errors_panel(&self) -> &Panel<Vec<ErrorRecord>> {
        &self.errors
    }

    pub fn charts(&self) -> &ChartSet {
        &self.charts
    }

    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    /// Apply a metrics fetch: on success the charts and advisories are
    /// recomputed from the new snapshot.
    pub fn apply_metrics(&mut self, tick: u64, outcome: Result<MetricsSnapshot>) -> Applied {
        let applied = self.metrics.apply(tick, self.policy, outcome, "metrics");
        if applied == Applied::Updated {
            if let Some(snapshot) = self.metrics.content() {
                self.charts.replace_from(snapshot);
                self.advisories = analyze(snapshot);
            }
        }
        applied
    }

    pub fn apply_traces(&mut self, tick: u64, outcome: Result<Vec<TraceRecord>>) -> Applied {
        self.traces.apply(tick, self.policy, outcome, "traces")
    }

    pub fn apply_errors(&mut self, tick: u64, outcome: Result<Vec<ErrorRecord>>) -> Applied {
        self.errors.apply(tick, self.policy, outcome, "errors")
    }
}
