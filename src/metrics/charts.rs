//! Chart models fed by metrics snapshots
//!
//! Each model is replaced wholesale on every successful metrics fetch. The
//! backend snapshot is already windowed, so nothing accumulates locally.

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;

use crate::api::MetricsSnapshot;

/// Time-ordered latency line
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencyChart {
    pub labels: Vec<String>,
    /// Seconds
    pub values: Vec<f64>,
}

/// Tool-usage histogram, most used first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolUsageChart {
    pub bars: Vec<(String, u64)>,
}

/// CPU and memory percentage lines, bounded to 0-100
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceChart {
    pub labels: Vec<String>,
    pub cpu: Vec<f64>,
    pub memory: Vec<f64>,
}

/// Success/failure split
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RatioChart {
    pub successful: u64,
    pub failed: u64,
}

impl RatioChart {
    /// Success share in 0-1; `None` before any request was recorded
    pub fn success_fraction(&self) -> Option<f64> {
        let total = self.successful + self.failed;
        (total > 0).then(|| self.successful as f64 / total as f64)
    }
}

/// The four live charts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSet {
    pub latency: LatencyChart,
    pub tools: ToolUsageChart,
    pub resources: ResourceChart,
    pub ratio: RatioChart,
    /// Bumped on every replace
    pub revision: u64,
}

impl ChartSet {
    /// Replace every series from `snapshot`
    pub fn replace_from(&mut self, snapshot: &MetricsSnapshot) {
        self.latency = LatencyChart {
            labels: snapshot
                .latency_history
                .iter()
                .map(|p| time_label(&p.timestamp))
                .collect(),
            values: snapshot.latency_history.iter().map(|p| p.latency).collect(),
        };

        let mut bars: Vec<(String, u64)> = snapshot
            .tool_usage
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        bars.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        self.tools = ToolUsageChart { bars };

        self.resources = ResourceChart {
            labels: snapshot
                .resource_usage
                .iter()
                .map(|p| time_label(&p.timestamp))
                .collect(),
            cpu: snapshot
                .resource_usage
                .iter()
                .map(|p| clamp_percent(p.cpu_percent))
                .collect(),
            memory: snapshot
                .resource_usage
                .iter()
                .map(|p| clamp_percent(p.memory_percent))
                .collect(),
        };

        self.ratio = RatioChart {
            successful: snapshot.successful_requests,
            failed: snapshot.failed_requests,
        };

        self.revision += 1;
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// `HH:MM:SS` for ISO timestamps, the raw string otherwise
pub fn time_label(timestamp: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return dt.format("%H:%M:%S").to_string();
    }
    match timestamp.parse::<NaiveDateTime>() {
        Ok(dt) => dt.format("%H:%M:%S").to_string(),
        Err(_) => timestamp.to_string(),
    }
}
