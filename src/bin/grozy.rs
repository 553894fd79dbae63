//! GROZY terminal front-end
//!
//! Chat with the shopping assistant and watch its metrics from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Interactive chat (/reset, /status, /quit)
//! grozy chat
//!
//! # Live dashboard, refreshed every 5 s until Ctrl-C
//! grozy dashboard
//!
//! # One snapshot as JSON
//! grozy dashboard --once -o json
//!
//! # Generate the analysis report and save it
//! grozy report --save
//!
//! # Point at another backend
//! GROZY_API_URL=http://grozy.local:5000 grozy health --security
//!
//! # Recent security events (key from GROZY_API_KEY or --api-key)
//! grozy health --security --logs
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grozy_console::api::{AssistantApi, SecurityLogs};
use grozy_console::report::ReportDisplay;
use grozy_console::view::ChatView;
use grozy_console::{
    ChatClient, ClientConfig, DashboardState, DashboardView, HttpAssistantClient, MetricsPoller,
    ReportViewer, SessionManager, StalePolicy,
};

#[derive(Parser)]
#[command(name = "grozy")]
#[command(version)]
#[command(about = "Chat client and metrics dashboard for the GROZY shopping assistant")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL
    #[arg(long, global = true, env = "GROZY_API_URL")]
    api_url: Option<String>,

    /// Per-request timeout in seconds (none by default)
    #[arg(long, global = true, env = "GROZY_REQUEST_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Output format: json or pretty (default)
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session
    Chat,

    /// Metrics dashboard
    Dashboard {
        /// Fetch once and exit instead of polling
        #[arg(long)]
        once: bool,

        /// Poll interval in milliseconds
        #[arg(long, env = "GROZY_POLL_INTERVAL_MS")]
        interval_ms: Option<u64>,

        /// Discard completions from polls older than what is shown
        #[arg(long)]
        drop_stale: bool,
    },

    /// Generate the analysis report
    Report {
        /// Save the report to a timestamped file
        #[arg(long)]
        save: bool,

        /// Directory for --save (defaults to GROZY_REPORT_DIR or .)
        #[arg(long, env = "GROZY_REPORT_DIR")]
        dir: Option<PathBuf>,
    },

    /// Ask the backend to export its metrics
    Export,

    /// Check that the backend is reachable
    Health {
        /// Also show the security layer status
        #[arg(long)]
        security: bool,

        /// Also show recent security events (needs an API key)
        #[arg(long, requires = "security")]
        logs: bool,

        /// Key for the protected security endpoints
        #[arg(long, env = "GROZY_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    init_logging();

    // Reads .env before clap looks at the environment
    let config = ClientConfig::from_env();
    let cli = Cli::parse();

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grozy_console=info,grozy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli, mut config: ClientConfig) -> anyhow::Result<()> {
    if let Some(url) = cli.api_url {
        config.base_url = url;
    }
    if let Some(secs) = cli.timeout_secs {
        config.request_timeout = Some(Duration::from_secs(secs));
    }

    let runtime = Runtime::new().context("Failed to start the async runtime")?;
    let _guard = runtime.enter();

    let api: Arc<dyn AssistantApi> = Arc::new(
        HttpAssistantClient::new(&config)
            .with_context(|| format!("Invalid backend URL {}", config.base_url))?,
    );
    tracing::debug!("Using backend {}", config.base_url);

    match cli.command {
        Commands::Chat => cmd_chat(&runtime, api, &config),
        Commands::Dashboard {
            once,
            interval_ms,
            drop_stale,
        } => {
            if let Some(ms) = interval_ms.filter(|ms| *ms > 0) {
                config.poll_interval = Duration::from_millis(ms);
            }
            if drop_stale {
                config.stale_policy = StalePolicy::DropStale;
            }
            cmd_dashboard(&runtime, api, &config, once, cli.format)
        }
        Commands::Report { save, dir } => {
            let dir = save.then(|| dir.unwrap_or_else(|| config.report_dir.clone()));
            cmd_report(&runtime, api.as_ref(), dir)
        }
        Commands::Export => cmd_export(&runtime, api.as_ref(), cli.format),
        Commands::Health {
            security,
            logs,
            api_key,
        } => {
            if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
                config.api_key = Some(key.trim().to_string());
            }
            let logs_key = if logs {
                match config.api_key.as_deref() {
                    Some(key) => Some(key),
                    None => bail!("--logs needs an API key (--api-key or GROZY_API_KEY)"),
                }
            } else {
                None
            };
            cmd_health(&runtime, api.as_ref(), security, logs_key, cli.format)
        }
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

const CHAT_HELP: &str = "Commands: /reset  start a new conversation\n          \
                         /status show session and connection\n          \
                         /quit   leave";

fn cmd_chat(
    runtime: &Runtime,
    api: Arc<dyn AssistantApi>,
    config: &ClientConfig,
) -> anyhow::Result<()> {
    let mut chat = ChatClient::new(SessionManager::new(), config);
    let mut editor = DefaultEditor::new().context("Failed to open the terminal")?;
    let mut printed = 0;

    runtime.block_on(chat.probe(api.as_ref()));
    println!("{}", CHAT_HELP.dimmed());
    print_new_turns(&chat.view(), &mut printed);
    print_status(&chat.view());

    loop {
        chat.tick(Instant::now());
        let line = match editor.readline(&format!("{} ", "›".cyan().bold())) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => println!("{}", CHAT_HELP.dimmed()),
            "/status" => {
                let view = chat.view();
                println!("session: {}", view.session_id);
                println!("backend: {}", config.base_url);
                print_status(&view);
            }
            "/reset" => {
                if !chat.request_reset() {
                    println!("{}", "Wait for the current reply first.".yellow());
                    continue;
                }
                let answer = editor.readline("¿Reiniciar la conversación? [y/N] ")?;
                if matches!(answer.trim(), "y" | "Y" | "s" | "S") {
                    chat.confirm_reset_with(Arc::clone(&api), Instant::now());
                    printed = 0;
                    print_new_turns(&chat.view(), &mut printed);
                    print_status(&chat.view());
                } else {
                    chat.cancel_reset();
                }
            }
            message => {
                if let Err(e) = editor.add_history_entry(message) {
                    tracing::debug!("History not updated: {}", e);
                }
                println!("{}", "GROZY está escribiendo...".dimmed());
                runtime.block_on(chat.send(api.as_ref(), message));
                let view = chat.view();
                print_new_turns(&view, &mut printed);
                print_status(&view);
            }
        }
    }

    Ok(())
}

fn print_new_turns(view: &ChatView, printed: &mut usize) {
    let start = (*printed).min(view.turns.len());
    for turn in &view.turns[start..] {
        let text = turn.to_string();
        if turn.is_error {
            println!("{}", text.red());
        } else {
            println!("{text}");
        }
    }
    *printed = view.turns.len();
}

fn print_status(view: &ChatView) {
    let dot = match view.connected {
        Some(true) => "●".green(),
        Some(false) => "●".red(),
        None => "●".dimmed(),
    };
    println!("{} {}", dot, view.status.dimmed());
}

fn cmd_dashboard(
    runtime: &Runtime,
    api: Arc<dyn AssistantApi>,
    config: &ClientConfig,
    once: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut poller = MetricsPoller::new(api, DashboardState::new(config.stale_policy))
        .with_request_timeout(config.request_timeout);
    let state = poller.state();

    if once {
        runtime.block_on(poller.refresh_now());
        let view = DashboardView::project(&runtime.block_on(state.read()));
        return print_dashboard(&view, format, false);
    }

    runtime.block_on(async {
        let mut updates = poller.subscribe();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        poller.start(config.poll_interval);
        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let view = DashboardView::project(&*state.read().await);
                    print_dashboard(&view, format, true)?;
                }
                _ = &mut ctrl_c => break,
            }
        }
        poller.stop();
        Ok::<_, anyhow::Error>(())
    })
}

fn print_dashboard(view: &DashboardView, format: OutputFormat, redraw: bool) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(view)?),
        OutputFormat::Pretty => {
            if redraw {
                print!("\x1B[2J\x1B[H");
            }
            println!("{view}");
        }
    }
    Ok(())
}

fn cmd_report(
    runtime: &Runtime,
    api: &dyn AssistantApi,
    save_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut viewer = ReportViewer::new();
    println!("{}", grozy_console::report::GENERATING_PLACEHOLDER.dimmed());
    runtime.block_on(viewer.open(api));
    println!("{}", viewer.displayed_text());

    if *viewer.display() == ReportDisplay::Failed {
        bail!("Report generation failed");
    }
    if let Some(dir) = save_dir {
        let path = viewer.download(&dir)?;
        println!("{} Saved to {}", "OK".green(), path.display());
    }
    Ok(())
}

fn cmd_export(runtime: &Runtime, api: &dyn AssistantApi, format: OutputFormat) -> anyhow::Result<()> {
    let outcome = runtime
        .block_on(api.export_metrics())
        .map_err(|e| anyhow::anyhow!(e.diagnostic()))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Pretty if outcome.success => {
            println!("{} {}", "OK".green(), outcome.summary())
        }
        OutputFormat::Pretty => {}
    }
    if !outcome.success {
        bail!(outcome.summary());
    }
    Ok(())
}

fn cmd_health(
    runtime: &Runtime,
    api: &dyn AssistantApi,
    security: bool,
    logs_key: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    runtime
        .block_on(api.health())
        .map_err(|e| anyhow::anyhow!(e.diagnostic()))?;
    match format {
        OutputFormat::Json if !security => println!(r#"{{"reachable": true}}"#),
        OutputFormat::Json => {}
        OutputFormat::Pretty => println!("{} backend is reachable", "OK".green()),
    }
    if !security {
        return Ok(());
    }

    let status = runtime
        .block_on(api.security_status())
        .map_err(|e| anyhow::anyhow!(e.diagnostic()))?;
    let logs = match logs_key {
        Some(key) => Some(runtime.block_on(api.security_logs(key)).map_err(|e| {
            if e.status() == Some(401) {
                anyhow::anyhow!("API key rejected by {}", e.diagnostic())
            } else {
                anyhow::anyhow!(e.diagnostic())
            }
        })?),
        None => None,
    };

    match format {
        OutputFormat::Json => {
            let mut out = serde_json::json!({ "security": status });
            if let Some(logs) = &logs {
                out["logs"] = serde_json::to_value(logs)?;
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Pretty => {
            let state = if status.enabled {
                "enabled".green()
            } else {
                "disabled".yellow()
            };
            println!("Security: {state}");
            for (feature, on) in &status.features {
                let mark = if *on { "✓".green() } else { "✗".red() };
                println!("  {mark} {feature}");
            }
            for protection in &status.active_protections {
                println!("  • {protection}");
            }
            if let Some(message) = &status.message {
                println!("{}", message.dimmed());
            }
            if let Some(logs) = &logs {
                print_security_logs(logs);
            }
        }
    }
    Ok(())
}

fn print_security_logs(logs: &SecurityLogs) {
    println!();
    println!(
        "{} ({} shown of {})",
        "Security events".bold(),
        logs.events.len(),
        logs.total_events
    );
    if logs.events.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for event in &logs.events {
        println!(
            "  {} {:<22} {} {}",
            event.timestamp.dimmed(),
            event.kind.yellow(),
            event.details,
            event.ip.as_deref().unwrap_or("").dimmed()
        );
    }
}
