//! Backend REST surface
//!
//! [`AssistantApi`] is the only boundary between the console and the GROZY
//! backend. Nothing else in the crate touches reqwest.

pub mod http;
pub mod types;

use async_trait::async_trait;

pub use crate::error::Result;
pub use http::HttpAssistantClient;
pub use types::*;

/// Endpoint paths, relative to the configured base URL
pub mod paths {
    pub const CHAT: &str = "api/chat";
    pub const RESET: &str = "api/reset";
    pub const HEALTH: &str = "api/health";
    pub const METRICS: &str = "api/metrics";
    pub const TRACES: &str = "api/metrics/traces";
    pub const ERRORS: &str = "api/metrics/errors";
    pub const EXPORT: &str = "api/metrics/export";
    pub const REPORT: &str = "api/report/generate";
    pub const SECURITY_STATUS: &str = "api/security/status";
    pub const SECURITY_LOGS: &str = "api/security/logs";

    /// Header the backend checks on protected endpoints
    pub const API_KEY_HEADER: &str = "X-API-Key";

    /// Label used in logs and diagnostics
    pub fn label(path: &str) -> String {
        format!("/{path}")
    }
}

#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Send one user message within a session
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// Drop the backend-side conversation for `session_id`
    async fn reset_session(&self, session_id: &str) -> Result<()>;

    /// Succeeds on any 2xx
    async fn health(&self) -> Result<()>;

    async fn metrics(&self) -> Result<MetricsSnapshot>;

    async fn traces(&self) -> Result<Vec<TraceRecord>>;

    async fn errors(&self) -> Result<Vec<ErrorRecord>>;

    /// Ask the backend to write its metrics export file
    async fn export_metrics(&self) -> Result<ExportOutcome>;

    /// Generated analysis report, as plain text
    async fn generate_report(&self) -> Result<String>;

    async fn security_status(&self) -> Result<SecurityStatus>;

    /// Recent security events. Protected: a missing or wrong key comes back
    /// as a 401 [`ClientError::Status`](crate::ClientError::Status).
    async fn security_logs(&self, api_key: &str) -> Result<SecurityLogs>;
}
