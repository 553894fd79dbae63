//! Analysis advisory
//!
//! Maps a metrics snapshot to an ordered list of severity-tagged advisories.
//! Pure and deterministic: the same snapshot always yields the same list.
//! Thresholds are fixed; comparisons are strict, so a value exactly on a
//! threshold falls into the milder tier.

use serde::Serialize;

use crate::api::MetricsSnapshot;

pub const LATENCY_CRITICAL_SECS: f64 = 5.0;
pub const LATENCY_WARNING_SECS: f64 = 3.0;
pub const ERROR_RATE_CRITICAL_PCT: f64 = 10.0;
pub const ERROR_RATE_WARNING_PCT: f64 = 5.0;
pub const PRECISION_CRITICAL: f64 = 0.6;
pub const PRECISION_WARNING: f64 = 0.8;
pub const RESOURCE_WARNING_PCT: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Success,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Warning => write!(f, "warning"),
            Severity::Success => write!(f, "ok"),
        }
    }
}

/// Which metric an advisory is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Latency,
    ErrorRate,
    Precision,
    Cpu,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advisory {
    pub severity: Severity,
    pub topic: Topic,
    pub message: String,
}

impl Advisory {
    fn new(severity: Severity, topic: Topic, message: impl Into<String>) -> Self {
        Self {
            severity,
            topic,
            message: message.into(),
        }
    }
}

/// Advisories for `snapshot`, in order: latency, error rate, precision,
/// then resource warnings (if any).
pub fn analyze(snapshot: &MetricsSnapshot) -> Vec<Advisory> {
    let mut advisories = Vec::with_capacity(5);

    let latency = snapshot.avg_latency;
    advisories.push(if latency > LATENCY_CRITICAL_SECS {
        Advisory::new(
            Severity::Critical,
            Topic::Latency,
            format!(
                "High average latency ({latency:.2}s > 5s). Optimize vector store queries or reduce k."
            ),
        )
    } else if latency > LATENCY_WARNING_SECS {
        Advisory::new(
            Severity::Warning,
            Topic::Latency,
            format!("Moderate average latency ({latency:.2}s > 3s). Review tool efficiency."),
        )
    } else {
        Advisory::new(
            Severity::Success,
            Topic::Latency,
            format!("Latency within acceptable range ({latency:.2}s)."),
        )
    });

    let error_rate = snapshot.error_rate;
    advisories.push(if error_rate > ERROR_RATE_CRITICAL_PCT {
        Advisory::new(
            Severity::Critical,
            Topic::ErrorRate,
            format!(
                "High error rate ({error_rate:.1}% > 10%). Review logs and exception handling."
            ),
        )
    } else if error_rate > ERROR_RATE_WARNING_PCT {
        Advisory::new(
            Severity::Warning,
            Topic::ErrorRate,
            format!("Moderate error rate ({error_rate:.1}% > 5%). Watch recent errors."),
        )
    } else {
        Advisory::new(
            Severity::Success,
            Topic::ErrorRate,
            format!("Low error rate ({error_rate:.1}%)."),
        )
    });

    let precision = snapshot.avg_precision;
    advisories.push(if precision < PRECISION_CRITICAL {
        Advisory::new(
            Severity::Critical,
            Topic::Precision,
            format!(
                "Low tool-selection precision ({:.0}% < 60%). Review the system prompt and tool selection.",
                precision * 100.0
            ),
        )
    } else if precision < PRECISION_WARNING {
        Advisory::new(
            Severity::Warning,
            Topic::Precision,
            format!(
                "Moderate tool-selection precision ({:.0}% < 80%).",
                precision * 100.0
            ),
        )
    } else {
        Advisory::new(
            Severity::Success,
            Topic::Precision,
            format!("High tool-selection precision ({:.0}%).", precision * 100.0),
        )
    });

    if snapshot.avg_cpu_percent > RESOURCE_WARNING_PCT {
        advisories.push(Advisory::new(
            Severity::Warning,
            Topic::Cpu,
            format!("High CPU usage ({:.1}% > 80%).", snapshot.avg_cpu_percent),
        ));
    }
    if snapshot.avg_memory_percent > RESOURCE_WARNING_PCT {
        advisories.push(Advisory::new(
            Severity::Warning,
            Topic::Memory,
            format!("High memory usage ({:.1}% > 80%).", snapshot.avg_memory_percent),
        ));
    }

    advisories
}
