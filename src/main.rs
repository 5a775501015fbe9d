use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::RwLock;

use conductor::config::Config;
use conductor::core::ProjectPlan;
use conductor::monitor::{MonitorEvent, MonitorEventKind};
use conductor::{clog, clog_error, ExecutionMonitor, Orchestrator, Result};

/// Conductor - dependency-aware orchestration of agent task waves
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    CONDUCTOR_LOG=<level>  Log level: error, warn, info, debug or trace"
)]
pub struct Cli {
    /// Enable debug logging (writes to ~/.conductor/conductor.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Config file (defaults to ~/.conductor/conductor.toml)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print project metrics
    Status {
        #[arg(long)]
        plan: PathBuf,
    },

    /// List tasks that are ready to start
    Ready {
        #[arg(long)]
        plan: PathBuf,
    },

    /// Print critical-path tasks and the longest chain length in hours
    CriticalPath {
        #[arg(long)]
        plan: PathBuf,
    },

    /// Print the full dashboard snapshot
    Dashboard {
        #[arg(long)]
        plan: PathBuf,
    },

    /// Run the execution monitor and print every event as a JSON line
    Monitor {
        #[arg(long)]
        plan: PathBuf,

        /// Run this many ticks back to back instead of starting the timer
        #[arg(long)]
        ticks: Option<u32>,

        /// Override the configured tick interval
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match Config::data_dir().and_then(|dir| conductor::log::init(&dir, cli.debug)) {
        Ok(path) => clog!("Logging to {}", path.display()),
        Err(e) => eprintln!("conductor: logging disabled: {}", e),
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Command::Status { plan } => {
            let orchestrator = load_orchestrator(&plan, &config)?;
            print_json(&orchestrator.project_status())
        }
        Command::Ready { plan } => {
            let orchestrator = load_orchestrator(&plan, &config)?;
            print_json(&orchestrator.ready_tasks())
        }
        Command::CriticalPath { plan } => {
            let orchestrator = load_orchestrator(&plan, &config)?;
            print_json(&serde_json::json!({
                "hours": orchestrator.critical_path_hours(),
                "tasks": orchestrator.critical_path(),
            }))
        }
        Command::Dashboard { plan } => {
            let orchestrator = load_orchestrator(&plan, &config)?;
            print_json(&orchestrator.dashboard_data())
        }
        Command::Monitor {
            plan,
            ticks,
            interval_secs,
        } => run_monitor(&plan, config, ticks, interval_secs),
    }
}

fn load_orchestrator(plan: &Path, config: &Config) -> Result<Orchestrator> {
    let plan = ProjectPlan::load(plan)?;
    Orchestrator::with_config(plan, config.orchestrator.clone())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_event(event: &MonitorEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(e) => clog_error!("Failed to serialize {} event: {}", event.kind(), e),
    }
}

/// Run the monitor until `ticks` manual ticks complete, or until Ctrl-C.
fn run_monitor(
    plan: &Path,
    mut config: Config,
    ticks: Option<u32>,
    interval_secs: Option<u64>,
) -> Result<()> {
    if let Some(secs) = interval_secs {
        config.monitor.interval_secs = secs;
    }
    let orchestrator = Arc::new(RwLock::new(load_orchestrator(plan, &config)?));

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut monitor = ExecutionMonitor::new(orchestrator, config.monitor.clone());
        for kind in MonitorEventKind::ALL {
            monitor.subscribe(kind, print_event);
        }

        match ticks {
            Some(count) => {
                clog!("Running {} monitor ticks", count);
                for _ in 0..count {
                    monitor.tick().await;
                }
            }
            None => {
                monitor.start();
                tokio::signal::ctrl_c().await?;
                monitor.stop();
            }
        }
        Ok::<(), conductor::Error>(())
    })
}
