//! Render projections
//!
//! Pure functions from client state to what a front-end draws. Nothing in
//! here mutates state or talks to the backend; the terminal front-end uses
//! the `Display` impls, an HTML front-end uses the `html` fields.

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::api::{ErrorRecord, MetricsSnapshot, TraceRecord};
use crate::chat::{ChatClient, ChatState, ChatTurn, Connection, Role};
use crate::format::{format_message, plain_text};
use crate::metrics::charts::time_label;
use crate::metrics::{Advisory, ChartSet, DashboardState, Panel, Severity};

/// Rows shown in the traces and errors tables
pub const PANEL_ROWS: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct TurnView {
    pub role: Role,
    /// Sanitised markup from the formatter
    pub html: String,
    /// Terminal rendering of the same text
    pub plain: String,
    /// Local `HH:MM`
    pub time: String,
    pub latency: Option<f64>,
    pub tools_used: Vec<String>,
    pub is_error: bool,
}

impl TurnView {
    fn project(turn: &ChatTurn) -> Self {
        Self {
            role: turn.role,
            html: format_message(&turn.text),
            plain: plain_text(&turn.text),
            time: local_time(turn.rendered_at, "%H:%M"),
            latency: turn.latency,
            tools_used: turn.tools_used.clone(),
            is_error: turn.is_error,
        }
    }
}

impl fmt::Display for TurnView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let who = match self.role {
            Role::User => "Tú",
            Role::Assistant => "GROZY",
        };
        writeln!(f, "[{}] {}:", self.time, who)?;
        for line in self.plain.lines() {
            writeln!(f, "  {line}")?;
        }
        if self.latency.is_some() || !self.tools_used.is_empty() {
            let mut meta = Vec::new();
            if let Some(latency) = self.latency {
                meta.push(format!("{latency:.2}s"));
            }
            if !self.tools_used.is_empty() {
                meta.push(format!("tools: {}", self.tools_used.join(", ")));
            }
            writeln!(f, "  ({})", meta.join(" · "))?;
        }
        Ok(())
    }
}

/// Everything the chat surface draws
#[derive(Debug, Clone, Serialize)]
pub struct ChatView {
    pub session_id: String,
    pub turns: Vec<TurnView>,
    /// Typing placeholder visible
    pub typing: bool,
    pub input_enabled: bool,
    pub status: String,
    pub connected: Option<bool>,
    pub confirm_reset: bool,
}

impl ChatView {
    pub fn project(chat: &ChatClient) -> Self {
        let sending = chat.state() == ChatState::Sending;
        Self {
            session_id: chat.session_id().to_string(),
            turns: chat.transcript().iter().map(TurnView::project).collect(),
            typing: sending,
            input_enabled: !sending,
            status: chat.status().text.clone(),
            connected: match chat.connection() {
                Connection::Unknown => None,
                Connection::Connected => Some(true),
                Connection::Disconnected => Some(false),
            },
            confirm_reset: chat.awaiting_reset_confirmation(),
        }
    }
}

impl fmt::Display for ChatView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for turn in &self.turns {
            writeln!(f, "{turn}")?;
        }
        if self.typing {
            writeln!(f, "GROZY está escribiendo...")?;
        }
        write!(f, "[{}]", self.status)
    }
}

/// One headline number
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRow {
    pub time: String,
    pub latency: String,
    pub request: String,
    pub tools: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRow {
    pub time: String,
    pub error: String,
    pub request: Option<String>,
}

/// Everything the dashboard draws
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub kpis: Vec<Kpi>,
    pub advisories: Vec<Advisory>,
    pub charts: ChartSet,
    pub traces: Vec<TraceRow>,
    pub errors: Vec<ErrorRow>,
    /// Per-panel failure notes: (panel, diagnostic)
    pub notes: Vec<(&'static str, String)>,
    pub updated_at: Option<String>,
}

impl DashboardView {
    pub fn project(state: &DashboardState) -> Self {
        let kpis = state.snapshot().map(kpi_cards).unwrap_or_default();

        let traces = state
            .traces_panel()
            .content()
            .map(|traces| newest_first(traces).map(trace_row).collect())
            .unwrap_or_default();

        let errors = state
            .errors_panel()
            .content()
            .map(|errors| newest_first(errors).map(error_row).collect())
            .unwrap_or_default();

        let mut notes = Vec::new();
        push_note(&mut notes, "metrics", state.metrics_panel());
        push_note(&mut notes, "traces", state.traces_panel());
        push_note(&mut notes, "errors", state.errors_panel());

        Self {
            kpis,
            advisories: state.advisories().to_vec(),
            charts: state.charts().clone(),
            traces,
            errors,
            notes,
            updated_at: state
                .metrics_panel()
                .updated_at()
                .map(|at| local_time(at, "%H:%M:%S")),
        }
    }
}

fn push_note<T>(notes: &mut Vec<(&'static str, String)>, name: &'static str, panel: &Panel<T>) {
    if let Some(err) = panel.last_error() {
        notes.push((name, err.to_string()));
    }
}

/// Last `PANEL_ROWS` items, newest first. The backend lists oldest first.
fn newest_first<T>(items: &[T]) -> impl Iterator<Item = &T> {
    items.iter().rev().take(PANEL_ROWS)
}

fn kpi_cards(m: &MetricsSnapshot) -> Vec<Kpi> {
    vec![
        Kpi {
            label: "Requests",
            value: m.total_requests.to_string(),
        },
        Kpi {
            label: "Success rate",
            value: format!("{:.1}%", m.success_rate),
        },
        Kpi {
            label: "Avg latency",
            value: format!("{:.2}s", m.avg_latency),
        },
        Kpi {
            label: "P95 / P99",
            value: format!("{:.2}s / {:.2}s", m.p95_latency, m.p99_latency),
        },
        Kpi {
            label: "Precision",
            value: format!("{:.1}%", m.avg_precision * 100.0),
        },
        Kpi {
            label: "CPU",
            value: format!("{:.1}%", m.avg_cpu_percent),
        },
        Kpi {
            label: "Memory",
            value: format!("{:.1}%", m.avg_memory_percent),
        },
        Kpi {
            label: "Tool calls",
            value: m.total_tool_calls.to_string(),
        },
        Kpi {
            label: "Errors",
            value: format!("{} ({:.1}%)", m.error_count, m.error_rate),
        },
    ]
}

fn trace_row(trace: &TraceRecord) -> TraceRow {
    TraceRow {
        time: time_label(&trace.timestamp),
        latency: format!("{:.2}s", trace.latency),
        request: truncate(&trace.request, 50),
        tools: if trace.tools_used.is_empty() {
            "-".to_string()
        } else {
            trace.tools_used.join(", ")
        },
        success: trace.success.unwrap_or(true),
    }
}

fn error_row(record: &ErrorRecord) -> ErrorRow {
    ErrorRow {
        time: time_label(&record.timestamp),
        error: record.error.clone(),
        request: record.request.as_deref().map(|r| truncate(r, 50)),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn local_time(at: DateTime<Utc>, pattern: &str) -> String {
    at.with_timezone(&Local).format(pattern).to_string()
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== GROZY metrics ==")?;
        if self.kpis.is_empty() {
            writeln!(f, "No metrics yet")?;
        }
        for kpi in &self.kpis {
            writeln!(f, "{:<14} {}", kpi.label, kpi.value)?;
        }

        if !self.advisories.is_empty() {
            writeln!(f, "\n-- Analysis --")?;
            for advisory in &self.advisories {
                let marker = match advisory.severity {
                    Severity::Critical => "✗",
                    Severity::Warning => "!",
                    Severity::Success => "✓",
                };
                writeln!(f, "{marker} [{}] {}", advisory.severity, advisory.message)?;
            }
        }

        if !self.charts.tools.bars.is_empty() {
            writeln!(f, "\n-- Tool usage --")?;
            let widest = self
                .charts
                .tools
                .bars
                .iter()
                .map(|(_, count)| *count)
                .max()
                .unwrap_or(1)
                .max(1);
            for (name, count) in &self.charts.tools.bars {
                let width = (*count * 30 / widest) as usize;
                writeln!(f, "{:<24} {:<30} {}", name, "█".repeat(width), count)?;
            }
        }

        if let (Some(last), Some(label)) = (
            self.charts.latency.values.last(),
            self.charts.latency.labels.last(),
        ) {
            let peak = self
                .charts
                .latency
                .values
                .iter()
                .copied()
                .fold(0.0_f64, f64::max);
            writeln!(
                f,
                "\nLatency: last {last:.2}s at {label}, peak {peak:.2}s over {} points",
                self.charts.latency.values.len()
            )?;
        }
        if let (Some(cpu), Some(memory)) = (
            self.charts.resources.cpu.last(),
            self.charts.resources.memory.last(),
        ) {
            writeln!(f, "Resources: CPU {cpu:.1}%, memory {memory:.1}%")?;
        }
        if let Some(fraction) = self.charts.ratio.success_fraction() {
            writeln!(
                f,
                "Outcomes: {} ok / {} failed ({:.1}% ok)",
                self.charts.ratio.successful,
                self.charts.ratio.failed,
                fraction * 100.0
            )?;
        }

        writeln!(f, "\n-- Recent traces --")?;
        if self.traces.is_empty() {
            writeln!(f, "No traces")?;
        }
        for row in &self.traces {
            let mark = if row.success { "✓" } else { "✗" };
            writeln!(
                f,
                "{} {} {:>7} {} [{}]",
                mark, row.time, row.latency, row.request, row.tools
            )?;
        }

        writeln!(f, "\n-- Recent errors --")?;
        if self.errors.is_empty() {
            writeln!(f, "No errors")?;
        }
        for row in &self.errors {
            match &row.request {
                Some(request) => writeln!(f, "{} {} ({})", row.time, row.error, request)?,
                None => writeln!(f, "{} {}", row.time, row.error)?,
            }
        }

        for (panel, note) in &self.notes {
            writeln!(f, "⚠ {panel}: {note}")?;
        }
        if let Some(at) = &self.updated_at {
            write!(f, "Updated {at}")?;
        }
        Ok(())
    }
}
