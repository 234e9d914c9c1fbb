//! quad-ops: reconcile Compose projects from git repositories into host
//! supervisor units.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use qops_core::{load_daemon_config, ChangeStatus, DaemonConfig};
use qops_lifecycle::LifecycleManager;
use qops_store::ArtifactStore;
use qopsd::platform;
use qopsd::reconciler::Reconciler;

#[derive(Parser)]
#[command(name = "quad-ops")]
#[command(about = "Compose-to-supervisor reconciliation")]
#[command(version)]
struct Cli {
    /// Path to the daemon configuration file
    #[arg(short, long, default_value = "/etc/quad-ops/config.toml", global = true)]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single reconciliation pass and exit
    Reconcile {
        /// Restart every managed service even when its artifact is unchanged
        #[arg(long)]
        force: bool,
    },
    /// Run the reconciliation loop until interrupted
    Daemon {
        /// Seconds between the start of successive passes
        #[arg(long, default_value = "300")]
        interval: u64,
        /// Run a single pass then exit
        #[arg(long)]
        once: bool,
    },
    /// List the managed artifacts currently deployed on this host
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn build_reconciler(config: DaemonConfig) -> anyhow::Result<Reconciler> {
    let platform = platform::detect()?;
    let renderer = platform::build_renderer(platform, config.user_mode);
    let supervisor = platform::build_supervisor(platform, config.user_mode, &config.quadlet_dir);
    let lifecycle = LifecycleManager::new(supervisor);
    Ok(Reconciler::new(config, renderer, lifecycle))
}

fn run_list(config: &DaemonConfig, json: bool) -> anyhow::Result<()> {
    let store = ArtifactStore::new(config.quadlet_dir.clone());
    let artifacts = store
        .list()
        .with_context(|| format!("listing artifacts in {}", config.quadlet_dir.display()))?;

    if json {
        let entries: Vec<serde_json::Value> = artifacts
            .iter()
            .map(|a| {
                serde_json::json!({
                    "path": a.rel_path,
                    "service": a.service_fq_name,
                    "kind": a.kind.as_str(),
                    "hash": a.hash,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if artifacts.is_empty() {
        println!("No managed artifacts in {}", config.quadlet_dir.display());
        return Ok(());
    }
    println!("{:<60} {:<10} HASH", "PATH", "KIND");
    println!("{}", "-".repeat(84));
    for artifact in &artifacts {
        println!(
            "{:<60} {:<10} {}",
            artifact.rel_path,
            artifact.kind.as_str(),
            &artifact.hash[..12.min(artifact.hash.len())]
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_daemon_config(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    init_tracing(config.verbose);

    match cli.command {
        Commands::Reconcile { force } => {
            let reconciler = build_reconciler(config)?;
            let report = reconciler.reconcile(force);
            print!("{report}");
            if !report.success() {
                std::process::exit(1);
            }
        }
        Commands::Daemon { interval, once } => {
            let reconciler = build_reconciler(config)?;
            if once {
                let report = reconciler.reconcile(false);
                print!("{report}");
                if !report.success() {
                    std::process::exit(1);
                }
                return Ok(());
            }

            let shutdown = Arc::new(AtomicBool::new(false));
            signal_hook::flag::register(signal_hook::consts::SIGINT, shutdown.clone())?;
            signal_hook::flag::register(signal_hook::consts::SIGTERM, shutdown.clone())?;

            tracing::info!(interval_secs = interval, "daemon started");
            let ticks = qopsd::daemon::run_loop(Duration::from_secs(interval), &shutdown, || {
                let report = reconciler.reconcile(false);
                let ok = report.success();
                tracing::info!(
                    created = report.count(ChangeStatus::Created),
                    updated = report.count(ChangeStatus::Updated),
                    removed = report.count(ChangeStatus::Removed),
                    unchanged = report.count(ChangeStatus::Unchanged),
                    ok,
                    "reconciliation finished"
                );
                if !ok {
                    tracing::warn!("\n{report}");
                }
                ok
            });
            tracing::info!(ticks, "daemon stopped");
        }
        Commands::List { json } => {
            run_list(&config, json)?;
        }
    }

    Ok(())
}
