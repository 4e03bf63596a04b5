//! Modploy - module deployment agent
//!
//! Usage:
//!   modploy run               # Deploy configured directories and watch them
//!   modploy inspect a.jar     # Show how an archive would be classified
//!   modploy config            # Print the effective configuration

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modploy_core::archive::Archive;
use modploy_core::classify::Classifier;
use modploy_core::config::{ConfigStore, DeployConfig, to_toml};
use modploy_core::deploy::Deployer;
use modploy_core::host::{HostRuntime, MemoryHost};
use modploy_core::location::resolve_location;

#[derive(Parser)]
#[command(name = "modploy")]
#[command(about = "Module deployment agent", long_about = None)]
struct Cli {
    /// Path to modploy.toml (defaults to the user config directory)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy configured directories against an in-memory dry-run host
    ///
    /// Runs until Ctrl-C or until an archive requests a host stop.
    Run(RunArgs),

    /// Show metadata, location identity and the action a fresh host would take
    Inspect {
        /// Archives to inspect
        #[arg(required = true)]
        archives: Vec<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Args)]
struct RunArgs {
    /// Runtime directory, replaces the configured list (repeatable)
    #[arg(long = "runtime-dir")]
    runtime_dirs: Vec<PathBuf>,

    /// Application directory, replaces the configured list (repeatable)
    #[arg(long = "app-dir")]
    app_dirs: Vec<PathBuf>,

    /// Watch application directories for changes
    #[arg(long)]
    watch: bool,

    /// Quiet period in milliseconds before a change batch is processed
    #[arg(long)]
    quiet_period_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modploy_core=info,modploy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Run(args) => run(config, args).await,
        Commands::Inspect { archives } => inspect(&archives),
        Commands::Config => {
            print!("{}", to_toml(&config)?);
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<DeployConfig> {
    let store = match path {
        Some(path) => ConfigStore::from_path(path),
        None => ConfigStore::from_default_location()?,
    };
    store.load()
}

async fn run(mut config: DeployConfig, args: RunArgs) -> Result<()> {
    if !args.runtime_dirs.is_empty() {
        config.runtime_dirs = args.runtime_dirs;
    }
    if !args.app_dirs.is_empty() {
        config.application_dirs = args.app_dirs;
    }
    if args.watch {
        config.watch_application_dirs = true;
    }
    if let Some(quiet_period_ms) = args.quiet_period_ms {
        config.quiet_period_ms = quiet_period_ms;
    }
    config.validate()?;

    let host = Arc::new(MemoryHost::new());
    let shutdown = host.shutdown_token();
    let mut deployer = Deployer::new(config, host.clone());

    let summary = deployer.start();
    println!(
        "Deployed {} runtime and {} application modules ({} started)",
        summary.runtime_modules, summary.application_modules, summary.started
    );

    if summary.halted {
        println!("Host stop requested during deployment");
    } else if summary.watched_dirs > 0 {
        println!("Watching {} directories, press Ctrl-C to stop", summary.watched_dirs);
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = shutdown.cancelled() => println!("Host stop requested"),
        }
    }

    deployer.stop().await;

    for location in host.locations() {
        println!("  {}", location);
    }
    Ok(())
}

fn inspect(archives: &[PathBuf]) -> Result<()> {
    let host: Arc<dyn HostRuntime> = Arc::new(MemoryHost::new());
    let classifier = Classifier::new(host);

    for path in archives {
        let archive = Archive::open(path)?;
        let metadata = archive.metadata();
        let location = resolve_location(&metadata, &archive.file_name());
        let action = classifier.classify(&metadata, &location, false);

        println!("{}", path.display());
        println!(
            "  symbolic name: {}",
            metadata.symbolic_name.as_deref().unwrap_or("(none)")
        );
        println!("  version:       {}", metadata.version.as_deref().unwrap_or("(none)"));
        println!("  location:      {}", location);
        println!("  action:        {}", action);
    }
    Ok(())
}
