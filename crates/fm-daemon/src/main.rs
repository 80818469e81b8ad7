//! forgemind: simulated multi-agent delivery pipeline, headless or from an
//! interactive console.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fm_agents::Orchestrator;
use fm_daemon::environment::{self, Overrides};
use fm_daemon::{console, report};
use fm_integrations::Collaborators;
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// forgemind -- drive tasks through research, code, tests and deployment.
#[derive(Parser)]
#[command(name = "forgemind", version, about)]
struct Cli {
    /// Config file (default: ~/.forgemind/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Number of tasks the simulated tracker returns.
    #[arg(long, global = true)]
    tasks: Option<usize>,

    /// Multiplier for every simulated latency; 0 runs without waiting.
    #[arg(long, global = true)]
    latency_scale: Option<f64>,

    /// Emit JSON log lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize, run every task once and print a summary (default).
    Run,
    /// Interactive console: start, stop, select, feedback, status.
    Console,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dotenv_path = environment::load_dotenv();
    let overrides = Overrides {
        tasks: cli.tasks,
        latency_scale: cli.latency_scale,
        json_logs: cli.json_logs,
    };
    let config = environment::resolve(cli.config.as_deref(), &overrides)?;
    fm_telemetry::logging::init_from_config(&config.general.project_name, &config.general);
    if let Some(path) = dotenv_path {
        info!(path = %path.display(), "loaded .env");
    }

    info!(version = env!("CARGO_PKG_VERSION"), "forgemind starting");
    let orch = Orchestrator::new(
        Collaborators::simulated(&config.integrations),
        &config.pipeline,
    );

    match cli.command {
        None | Some(Commands::Run) => run_headless(orch).await,
        Some(Commands::Console) => {
            if let Err(e) = orch.initialize().await {
                // the console stays usable so the operator can inspect logs
                tracing::error!(error = %e, "initialization failed");
            }
            console::run(orch).await
        }
    }
}

async fn run_headless(orch: Orchestrator) -> Result<()> {
    orch.initialize()
        .await
        .context("failed to initialize orchestrator")?;
    orch.start().await;

    tokio::select! {
        _ = orch.wait_for_drain() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            info!("ctrl-c received, finishing the task in flight");
            orch.stop().await;
            orch.wait_for_drain().await;
        }
    }
    orch.wait_for_side_effects().await;

    println!("{}", report::task_table(&orch.tasks().await));
    let metrics = orch.metrics().await;
    println!(
        "{}",
        report::summary(&orch.summary().await, false, metrics.as_ref())
    );
    info!("forgemind finished");
    Ok(())
}
