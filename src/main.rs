//! Stalesweep main entry point
//!
//! Command-line interface for the stalesweep listing auditor. The default
//! mode supervises a child sweep process and respawns it on the dedicated
//! restart exit code; `--once` runs a single sweep pass in-process.

use anyhow::Context;
use clap::Parser;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use stalesweep::config::{load_config_with_hash, Config};
use stalesweep::storage::open_store;
use stalesweep::supervisor::{RecoverySupervisor, RESTART_EXIT_CODE};
use stalesweep::sweep::{build_adapters, Orchestrator, RunOutcome};
use tracing_subscriber::EnvFilter;

/// Stalesweep: a resumable search-listing liveness auditor
///
/// Stalesweep re-visits configured keywords across content providers, checks
/// whether listed result pages are still reachable, and files removal
/// feedback for expired results. Progress is durable: interrupted runs
/// resume where they left off.
#[derive(Parser, Debug)]
#[command(name = "stalesweep")]
#[command(version = "1.0.0")]
#[command(about = "A resumable search-listing liveness auditor", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run a single sweep pass in-process (what the supervisor spawns)
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    once: bool,

    /// Validate config and show what would be swept without sweeping
    #[arg(long, conflicts_with_all = ["once", "stats"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["once", "dry_run"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    if cli.stats {
        return handle_stats(&config);
    }

    let code = if cli.once {
        handle_once(config).await?
    } else {
        handle_supervise(&cli).await?
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("stalesweep=info,warn"),
            1 => EnvFilter::new("stalesweep=debug,info"),
            2 => EnvFilter::new("stalesweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the sweep plan
fn handle_dry_run(config: &Config) {
    println!("=== Stalesweep Dry Run ===\n");

    println!("Sweep Configuration:");
    println!("  Max pages per pair: {}", config.sweep.max_pages);
    println!("  Max failures per pair: {}", config.sweep.max_failures);
    println!("  Liveness timeout: {}s", config.timeouts.liveness_secs);
    println!("  Feedback wait: {}s", config.timeouts.feedback_secs);
    println!(
        "  Session login wait: {}s",
        config.timeouts.session_login_secs
    );

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nProviders ({}):", config.sweep.providers.len());
    for id in &config.sweep.providers {
        if let Some(provider) = config.provider(id) {
            println!("  - {} ({})", id, provider.search_url);
        }
    }

    println!("\nKeywords ({}):", config.sweep.keywords.len());
    for keyword in &config.sweep.keywords {
        println!("  - {}", keyword);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would sweep {} (keyword, provider) pairs",
        config.sweep.keywords.len() * config.sweep.providers.len()
    );
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use stalesweep::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.storage.database_path);

    let store = open_store(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --once mode: one sweep pass; restart requests become the
/// dedicated exit code the supervisor watches for
async fn handle_once(config: Config) -> anyhow::Result<i32> {
    let store = open_store(Path::new(&config.storage.database_path))
        .context("failed to initialize store")?;
    let adapters = build_adapters(&config)?;
    let mut orchestrator = Orchestrator::new(store, adapters, &config.sweep);

    match orchestrator.run().await? {
        RunOutcome::Completed(summary) => {
            tracing::info!(
                completed = summary.pairs_completed,
                expired = summary.expired_found,
                feedback = summary.feedback_submitted,
                "sweep pass completed"
            );
            Ok(0)
        }
        RunOutcome::RestartNeeded {
            keyword,
            provider,
            url,
        } => {
            tracing::error!(
                keyword,
                provider,
                url,
                "requesting process restart after fatal feedback failure"
            );
            Ok(RESTART_EXIT_CODE)
        }
    }
}

/// Default mode: supervise a `--once` child and respawn it on restart exits
async fn handle_supervise(cli: &Cli) -> anyhow::Result<i32> {
    let mut args: Vec<OsString> = vec![OsString::from("--once")];
    if cli.quiet {
        args.push(OsString::from("--quiet"));
    }
    for _ in 0..cli.verbose {
        args.push(OsString::from("-v"));
    }
    args.push(cli.config.clone().into_os_string());

    let supervisor = RecoverySupervisor::current_process(args)?;
    let code = supervisor.run().await?;
    Ok(code)
}
