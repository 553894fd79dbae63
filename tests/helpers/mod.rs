//! Shared test backends
//!
//! - [`FakeBackend`]: in-process `AssistantApi` with scripted replies, call
//!   counters and optional per-call delays
//! - [`spawn_mock`]: serves an axum router on an ephemeral port for the
//!   reqwest client tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;

use grozy_console::api::{
    AssistantApi, ChatReply, ChatRequest, ErrorRecord, ExportOutcome, MetricsSnapshot,
    SecurityLogs, SecurityStatus, TraceRecord,
};
use grozy_console::{ClientError, Result};

/// Scripted backend. Unscripted calls fall back to the defaults set on the
/// struct; scripted ones are consumed in call order.
pub struct FakeBackend {
    chat_script: Mutex<VecDeque<Result<ChatReply>>>,
    chat_delay: Mutex<Duration>,
    health: Mutex<Result<()>>,
    metrics: Mutex<Result<MetricsSnapshot>>,
    metrics_script: Mutex<VecDeque<(Duration, Result<MetricsSnapshot>)>>,
    traces: Mutex<Result<Vec<TraceRecord>>>,
    errors: Mutex<Result<Vec<ErrorRecord>>>,
    report: Mutex<Result<String>>,
    reset_ids: Mutex<Vec<String>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub metrics_calls: AtomicUsize,
    pub traces_calls: AtomicUsize,
    pub errors_calls: AtomicUsize,
    pub report_calls: AtomicUsize,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            chat_script: Mutex::new(VecDeque::new()),
            chat_delay: Mutex::new(Duration::ZERO),
            health: Mutex::new(Ok(())),
            metrics: Mutex::new(Ok(MetricsSnapshot::default())),
            metrics_script: Mutex::new(VecDeque::new()),
            traces: Mutex::new(Ok(Vec::new())),
            errors: Mutex::new(Ok(Vec::new())),
            report: Mutex::new(Ok("REPORTE DE OBSERVABILIDAD".to_string())),
            reset_ids: Mutex::new(Vec::new()),
            chat_requests: Mutex::new(Vec::new()),
            metrics_calls: AtomicUsize::new(0),
            traces_calls: AtomicUsize::new(0),
            errors_calls: AtomicUsize::new(0),
            report_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that refuses every connection
    pub fn unreachable() -> Self {
        let fake = Self::default();
        *fake.health.lock().unwrap() = Err(refused("/api/health"));
        fake.push_chat(Err(refused("/api/chat")));
        fake
    }

    pub fn push_chat(&self, reply: Result<ChatReply>) {
        self.chat_script.lock().unwrap().push_back(reply);
    }

    pub fn set_chat_delay(&self, delay: Duration) {
        *self.chat_delay.lock().unwrap() = delay;
    }

    pub fn set_health(&self, outcome: Result<()>) {
        *self.health.lock().unwrap() = outcome;
    }

    pub fn set_metrics(&self, outcome: Result<MetricsSnapshot>) {
        *self.metrics.lock().unwrap() = outcome;
    }

    /// Queue a metrics reply that completes after `delay`
    pub fn push_metrics(&self, delay: Duration, outcome: Result<MetricsSnapshot>) {
        self.metrics_script
            .lock()
            .unwrap()
            .push_back((delay, outcome));
    }

    pub fn set_traces(&self, outcome: Result<Vec<TraceRecord>>) {
        *self.traces.lock().unwrap() = outcome;
    }

    pub fn set_errors(&self, outcome: Result<Vec<ErrorRecord>>) {
        *self.errors.lock().unwrap() = outcome;
    }

    pub fn set_report(&self, outcome: Result<String>) {
        *self.report.lock().unwrap() = outcome;
    }

    pub fn reset_ids(&self) -> Vec<String> {
        self.reset_ids.lock().unwrap().clone()
    }

    pub fn chat_count(&self) -> usize {
        self.chat_requests.lock().unwrap().len()
    }
}

#[async_trait]
impl AssistantApi for FakeBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.chat_requests.lock().unwrap().push(request.clone());
        let delay = *self.chat_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.chat_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(ChatReply::text(format!("eco: {}", request.message))))
    }

    async fn reset_session(&self, session_id: &str) -> Result<()> {
        self.reset_ids.lock().unwrap().push(session_id.to_string());
        Ok(())
    }

    async fn health(&self) -> Result<()> {
        self.health.lock().unwrap().clone()
    }

    async fn metrics(&self) -> Result<MetricsSnapshot> {
        self.metrics_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.metrics_script.lock().unwrap().pop_front();
        match scripted {
            Some((delay, outcome)) => {
                tokio::time::sleep(delay).await;
                outcome
            }
            None => self.metrics.lock().unwrap().clone(),
        }
    }

    async fn traces(&self) -> Result<Vec<TraceRecord>> {
        self.traces_calls.fetch_add(1, Ordering::SeqCst);
        self.traces.lock().unwrap().clone()
    }

    async fn errors(&self) -> Result<Vec<ErrorRecord>> {
        self.errors_calls.fetch_add(1, Ordering::SeqCst);
        self.errors.lock().unwrap().clone()
    }

    async fn export_metrics(&self) -> Result<ExportOutcome> {
        Ok(ExportOutcome {
            success: true,
            message: Some("Métricas exportadas".to_string()),
            error: None,
        })
    }

    async fn generate_report(&self) -> Result<String> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        self.report.lock().unwrap().clone()
    }

    async fn security_status(&self) -> Result<SecurityStatus> {
        Ok(SecurityStatus::default())
    }

    async fn security_logs(&self, api_key: &str) -> Result<SecurityLogs> {
        if api_key == FAKE_API_KEY {
            Ok(SecurityLogs::default())
        } else {
            Err(ClientError::Status {
                endpoint: "/api/security/logs".to_string(),
                status: 401,
                body: String::new(),
            })
        }
    }
}

/// Only key the fake backend accepts
pub const FAKE_API_KEY: &str = "grozy_test_key";

pub fn refused(endpoint: &str) -> ClientError {
    ClientError::transport(endpoint, "connection refused")
}

pub fn snapshot(total_requests: u64) -> MetricsSnapshot {
    MetricsSnapshot {
        total_requests,
        successful_requests: total_requests,
        success_rate: 100.0,
        avg_latency: 1.5,
        avg_precision: 0.9,
        ..MetricsSnapshot::default()
    }
}

pub fn trace(request: &str) -> TraceRecord {
    TraceRecord {
        timestamp: "2025-03-01T10:00:00".to_string(),
        latency: 1.2,
        request: request.to_string(),
        response: "ok".to_string(),
        tools_used: vec!["buscar_productos".to_string()],
        success: Some(true),
    }
}

/// Serve `router` on 127.0.0.1 with an OS-assigned port; returns the base URL
pub async fn spawn_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock backend");
    });
    format!("http://{addr}")
}

/// Base URL of a port nothing listens on
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind spare port");
    let addr = listener.local_addr().expect("spare port address");
    drop(listener);
    format!("http://{addr}")
}

/// Poll `condition` until it holds or a second passes
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
