//! Metrics dashboard: poller, chart models, advisory and panel state

pub mod advisory;
pub mod charts;
pub mod dashboard;
pub mod poller;

pub use advisory::{analyze, Advisory, Severity, Topic};
pub use charts::{ChartSet, LatencyChart, RatioChart, ResourceChart, ToolUsageChart};
pub use dashboard::{Applied, DashboardState, Panel, StalePolicy};
pub use poller::{DashboardWatcher, MetricsPoller, SharedDashboard, PILE_UP_WARNING};
