#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

//! agentauthd - multi-agent authorization demo daemon
//!
//! This daemon provides:
//! - HTTP API that runs the token-binding demo and serves its log
//! - Single-step endpoints for each agent role
//! - A one-shot `run` command that prints the narrative to the terminal

use std::net::{IpAddr, SocketAddr};

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agentauth_demo::{RunResult, Severity};
use agentauthd::api;
use agentauthd::config::Config;
use agentauthd::state::AppState;

/// Applies `start --bind/--port` on top of the configured listen address.
fn override_listen(
    config: &mut Config,
    bind: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if bind.is_none() && port.is_none() {
        return Ok(());
    }
    let current = config.listen_addr()?;
    let ip = match bind {
        Some(host) => {
            let host = host.trim().trim_start_matches('[').trim_end_matches(']');
            host.parse::<IpAddr>()
                .map_err(|e| anyhow::anyhow!("Invalid bind address {host:?}: {e}"))?
        }
        None => current.ip(),
    };
    config.listen = SocketAddr::new(ip, port.unwrap_or(current.port())).to_string();
    Ok(())
}

#[derive(Parser)]
#[command(name = "agentauthd")]
#[command(about = "Multi-agent authorization demo daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (default)
    Start {
        /// Bind address
        #[arg(short, long)]
        bind: Option<String>,

        /// Port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the demo once and print the narrative
    Run,

    /// Show daemon status
    Status {
        /// Daemon URL
        #[arg(default_value = "http://127.0.0.1:8000")]
        url: String,
    },

    /// Show effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(ref path) = cli.config {
        Config::from_file(path)?
    } else {
        Config::load_default()?
    };
    config.apply_env_overrides()?;

    // Override log level from CLI
    let log_level = match cli.verbose {
        0 => config.tracing_level(),
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        None | Some(Commands::Start { .. }) => {
            if let Some(Commands::Start { bind, port }) = cli.command {
                override_listen(&mut config, bind, port)?;
            }

            config.validate()?;
            run_daemon(config).await
        }

        Some(Commands::Run) => {
            config.validate()?;
            run_once(config).await
        }

        Some(Commands::Status { url }) => check_status(&url).await,

        Some(Commands::ShowConfig) => {
            let yaml = serde_yaml::to_string(&config)?;
            println!("{}", yaml);
            Ok(())
        }
    }
}

async fn run_daemon(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        listen = %config.listen,
        agentauth_api = %config.agentauth_api,
        requesting = %config.scenario.requesting.agent,
        observing = %config.scenario.observing.agent,
        "Starting agentauthd"
    );

    let state = AppState::new(config.clone())?;
    let app = api::create_router(state.clone());

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(
        uptime_secs = state.uptime_secs(),
        last_verdict = ?state.orchestrator.last_result().map(|r| r.verdict),
        "Daemon stopped"
    );

    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "SIGTERM handler unavailable, waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    let _ = tokio::signal::ctrl_c().await;

    tracing::info!("Shutdown signal received");
}

async fn run_once(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(config)?;
    let result = state.orchestrator.run_demo().await?;
    print!("{}", render_narrative(&result));

    if !result.security_holds {
        anyhow::bail!("security check did not pass ({:?})", result.verdict);
    }
    Ok(())
}

fn severity_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "  ",
        Severity::Success => "ok",
        Severity::Warning => "!!",
        Severity::Error => "XX",
    }
}

fn render_narrative(result: &RunResult) -> String {
    let mut out = String::new();
    for entry in &result.log {
        out.push_str(&format!(
            "{} [{}] {:<16} {}\n",
            entry.timestamp.format("%H:%M:%S%.3f"),
            severity_marker(entry.severity),
            entry.actor.as_str(),
            entry.message
        ));
    }
    out.push('\n');
    out.push_str(&format!("Verdict: {:?}\n", result.verdict));
    out.push_str(&result.conclusion);
    out.push('\n');
    if let Some(ref error) = result.error {
        out.push_str(&format!("Error: {error}\n"));
    }
    out
}

async fn check_status(url: &str) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/health", url.trim_end_matches('/')))
        .send()
        .await?;

    if resp.status().is_success() {
        let health: api::HealthResponse = resp.json().await?;
        println!("Status: {}", health.status);
        println!("Version: {}", health.version);
        println!("AgentAuth API: {}", health.agentauth_api);
        println!("Phase: {:?}", health.phase);
        println!("Uptime: {}s", health.uptime_secs);
        println!("Session: {}", health.session_id);
    } else {
        println!("Error: {} {}", resp.status(), resp.text().await?);
    }

    Ok(())
}
