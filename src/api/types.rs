//! Wire types for the backend REST surface
//!
//! Numeric snapshot fields default to zero when missing or `null`; the
//! dashboard shows zeros rather than refusing a partial snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Treat `null` like a missing field
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// POST /api/chat body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
}

/// POST /api/reset body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetRequest {
    pub session_id: String,
}

/// POST /api/chat response. Only `response` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    /// Server-side agent latency in seconds
    #[serde(default)]
    pub latency: Option<f64>,
    #[serde(default, deserialize_with = "null_default")]
    pub tools_used: Vec<String>,
    #[serde(default)]
    pub success: Option<bool>,
}

impl ChatReply {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            latency: None,
            tools_used: Vec::new(),
            success: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyPoint {
    #[serde(deserialize_with = "null_default")]
    pub timestamp: String,
    #[serde(deserialize_with = "null_default")]
    pub latency: f64,
    pub success: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcePoint {
    #[serde(deserialize_with = "null_default")]
    pub timestamp: String,
    #[serde(deserialize_with = "null_default")]
    pub cpu_percent: f64,
    #[serde(deserialize_with = "null_default")]
    pub memory_percent: f64,
    pub memory_used_mb: Option<f64>,
}

/// GET /api/metrics payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSnapshot {
    #[serde(deserialize_with = "null_default")]
    pub total_requests: u64,
    #[serde(deserialize_with = "null_default")]
    pub successful_requests: u64,
    #[serde(deserialize_with = "null_default")]
    pub failed_requests: u64,
    /// Percent, 0-100
    #[serde(deserialize_with = "null_default")]
    pub success_rate: f64,
    /// Percent, 0-100
    #[serde(deserialize_with = "null_default")]
    pub error_rate: f64,
    /// Seconds
    #[serde(deserialize_with = "null_default")]
    pub avg_latency: f64,
    #[serde(deserialize_with = "null_default")]
    pub p95_latency: f64,
    #[serde(deserialize_with = "null_default")]
    pub p99_latency: f64,
    /// Fraction, 0-1
    #[serde(deserialize_with = "null_default")]
    pub avg_precision: f64,
    #[serde(deserialize_with = "null_default")]
    pub avg_cpu_percent: f64,
    #[serde(deserialize_with = "null_default")]
    pub avg_memory_percent: f64,
    #[serde(deserialize_with = "null_default")]
    pub total_tool_calls: u64,
    #[serde(deserialize_with = "null_default")]
    pub error_count: u64,
    #[serde(deserialize_with = "null_default")]
    pub latency_history: Vec<LatencyPoint>,
    #[serde(deserialize_with = "null_default")]
    pub tool_usage: BTreeMap<String, u64>,
    #[serde(deserialize_with = "null_default")]
    pub resource_usage: Vec<ResourcePoint>,
    pub generated_at: Option<String>,
}

/// One item of GET /api/metrics/traces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceRecord {
    #[serde(deserialize_with = "null_default")]
    pub timestamp: String,
    #[serde(deserialize_with = "null_default")]
    pub latency: f64,
    #[serde(deserialize_with = "null_default")]
    pub request: String,
    #[serde(deserialize_with = "null_default")]
    pub response: String,
    #[serde(deserialize_with = "null_default")]
    pub tools_used: Vec<String>,
    pub success: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorRecord {
    #[serde(deserialize_with = "null_default")]
    pub timestamp: String,
    #[serde(deserialize_with = "null_default")]
    pub error: String,
    pub request: Option<String>,
    pub tools_used: Option<Vec<String>>,
}

/// GET /api/metrics/errors payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorsPayload {
    #[serde(deserialize_with = "null_default")]
    pub recent_errors: Vec<ErrorRecord>,
    pub error_count: Option<u64>,
    pub error_rate: Option<f64>,
}

/// GET /api/metrics/export payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOutcome {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExportOutcome {
    pub fn summary(&self) -> String {
        match (self.success, &self.message, &self.error) {
            (true, Some(message), _) => message.clone(),
            (true, None, _) => "Metrics exported".to_string(),
            (false, _, Some(error)) => format!("Export failed: {error}"),
            (false, _, None) => "Export failed".to_string(),
        }
    }
}

/// GET /api/report/generate payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub report: String,
}

/// GET /api/security/status payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityStatus {
    pub enabled: bool,
    #[serde(deserialize_with = "null_default")]
    pub features: BTreeMap<String, bool>,
    #[serde(deserialize_with = "null_default")]
    pub active_protections: Vec<String>,
    pub message: Option<String>,
}

/// One entry of the backend's security event log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityEvent {
    #[serde(deserialize_with = "null_default")]
    pub timestamp: String,
    #[serde(rename = "type", deserialize_with = "null_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_default")]
    pub details: String,
    /// Anonymized by the backend
    pub ip: Option<String>,
}

/// GET /api/security/logs payload. The backend returns at most the last
/// 100 events; `total_events` counts all of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityLogs {
    #[serde(deserialize_with = "null_default")]
    pub total_events: u64,
    #[serde(deserialize_with = "null_default")]
    pub events: Vec<SecurityEvent>,
}

/// `{success, data, error}` wrapper some endpoints use. Bare payloads are
/// accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped {
        success: bool,
        data: Option<T>,
        error: Option<String>,
    },
    Bare(T),
}

impl<T> Envelope<T> {
    /// Unwrap to the payload, or the reason it is unusable
    pub(crate) fn into_payload(self) -> std::result::Result<T, String> {
        match self {
            Envelope::Bare(payload) => Ok(payload),
            Envelope::Wrapped {
                success: true,
                data: Some(payload),
                ..
            } => Ok(payload),
            Envelope::Wrapped {
                success: true,
                data: None,
                ..
            } => Err("response is missing the data field".to_string()),
            Envelope::Wrapped {
                success: false,
                error,
                ..
            } => Err(error.unwrap_or_else(|| "backend reported success=false".to_string())),
        }
    }
}
