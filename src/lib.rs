//! GROZY Console - chat client and metrics dashboard
//!
//! Client side of the GROZY shopping assistant. Everything talks to the
//! backend over its REST surface through the [`api::AssistantApi`] trait;
//! nothing here runs the agent itself.
//!
//! ## Components
//! - [`chat::ChatClient`]: session-scoped chat state machine
//! - [`metrics::MetricsPoller`]: fixed-interval dashboard refresh
//! - [`metrics::analyze`]: threshold advisories from a metrics snapshot
//! - [`report::ReportViewer`]: generated report with copy/download
//! - [`view`]: pure render projections for terminal or HTML front-ends
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use grozy_console::{ChatClient, ClientConfig, HttpAssistantClient, SessionManager};
//!
//! # async fn run() -> grozy_console::Result<()> {
//! let config = ClientConfig::from_env();
//! let api = HttpAssistantClient::new(&config)?;
//! let mut chat = ChatClient::new(SessionManager::new(), &config);
//! chat.probe(&api).await;
//! chat.send(&api, "Hola").await;
//! println!("{}", chat.view());
//! # Ok(())
//! # }
//! ```

// Errors and configuration
pub mod config;
pub mod error;

// Backend REST surface
pub mod api;

// Chat
pub mod chat;
pub mod format;
pub mod session;

// Observability dashboard
pub mod metrics;
pub mod report;

// Rendering
pub mod view;

pub use api::{AssistantApi, HttpAssistantClient};
pub use chat::{ChatClient, ChatState, ChatTurn, Role};
pub use config::ClientConfig;
pub use error::{ClientError, ReportError, Result};
pub use metrics::{analyze, DashboardState, MetricsPoller, StalePolicy};
pub use report::ReportViewer;
pub use session::SessionManager;
pub use view::{ChatView, DashboardView};
