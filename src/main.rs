//! tool-agent — one request, one tool decision, one answer.
//!
//! Usage:
//!   tool-agent tools              List the advertised tools
//!   tool-agent ask <TEXT>...      Run one cycle for a request
//!   tool-agent demo               Run the two built-in sample requests

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use tracing::error;

use tool_agent::agent::{CycleReport, Session};
use tool_agent::backend;
use tool_agent::config::{self, AgentConfig, BackendKind};
use tool_agent::tools::{self, ToolRegistry};

const DEMO_REQUESTS: &[&str] = &["3 加 5 等于多少？", "北京今天天气怎么样？"];

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "tool-agent")]
#[command(version)]
#[command(about = "Minimal tool-calling agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the TOML config file.
    #[arg(long)]
    config: Option<String>,

    /// Log level (debug, info, warn, error). Overrides the config file.
    #[arg(long)]
    log_level: Option<String>,

    /// Use the offline mock backend instead of the HTTP endpoint.
    #[arg(long)]
    mock: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the tools advertised to the model.
    Tools,

    /// Answer one request.
    Ask {
        /// The request text.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Run the sample requests back to back.
    Demo,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_deref()
        .map(config::resolve_path)
        .unwrap_or_else(config::default_config_path);
    let mut cfg = config::load_with_env(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if cli.mock {
        cfg.backend = BackendKind::Mock;
    }

    // Initialize logging
    let level = cli.log_level.clone().unwrap_or_else(|| cfg.log_level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let registry = Arc::new(tools::builtin_registry().context("Failed to register tools")?);

    match cli.command {
        Commands::Tools => {
            print_tools(&registry);
            Ok(())
        }
        Commands::Ask { text } => cmd_ask(&cfg, registry, &text.join(" ")).await,
        Commands::Demo => cmd_demo(&cfg, registry).await,
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_ask(cfg: &AgentConfig, registry: Arc<ToolRegistry>, input: &str) -> Result<()> {
    print_tools(&registry);
    let mut session = build_session(cfg, registry);
    let report = session.handle(input).await.context("Agent cycle failed")?;
    print_report(input, &report);
    Ok(())
}

async fn cmd_demo(cfg: &AgentConfig, registry: Arc<ToolRegistry>) -> Result<()> {
    print_tools(&registry);
    let mut session = build_session(cfg, registry);

    for (i, input) in DEMO_REQUESTS.iter().enumerate() {
        if i > 0 {
            println!("{}", "-".repeat(50).dimmed());
        }
        match session.handle(input).await {
            Ok(report) => print_report(input, &report),
            Err(e) => {
                error!("Request failed: {}", e);
                eprintln!("{} {}", "Error:".red().bold(), e);
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_session(cfg: &AgentConfig, registry: Arc<ToolRegistry>) -> Session {
    println!(
        "{} Starting agent (backend: {}, model: {})",
        ">>>".green().bold(),
        cfg.backend,
        cfg.model,
    );
    Session::from_config(cfg, backend::from_config(cfg), registry)
}

fn print_tools(registry: &ToolRegistry) {
    println!("{}", "Available tools:".bold());
    for d in registry.descriptors() {
        println!("  {}: {}", d.name.cyan(), d.description);
    }
    println!();
}

fn print_report(input: &str, report: &CycleReport) {
    println!("{} {}", "User:".bold(), input);
    for outcome in &report.outcomes {
        let status = if outcome.is_success() {
            "ok".green()
        } else {
            "error".red()
        };
        println!(
            "  {} {} ({} attempt(s))",
            status,
            outcome.tool_name,
            outcome.attempts_used
        );
    }
    println!("{} {}", "Agent:".bold(), report.reply);
}
