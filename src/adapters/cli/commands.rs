//! CLI Command Handlers

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::adapters::replay::ReplayFeed;
use crate::adapters::synthetic::{SyntheticConfig, SyntheticFeed};
use crate::application::{ArbitrageEngine, EngineRunner, RunSummary};
use crate::config::{load_config, Config, LoggingSection, ProfileStore, PROFILE_ENV};
use crate::domain::EvaluationReport;
use crate::ports::QuoteFeed;

/// Spread Sentinel - adaptive spread signals for mini/full futures pairs
#[derive(Parser, Debug)]
#[command(
    name = "spread-sentinel",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Adaptive spread-arbitrage signal engine",
    long_about = "Spread Sentinel tracks the spread between a mini and a full futures contract, \
                  scores it against a rolling z-score and emits tiered, cost-aware signals. \
                  It never routes orders."
)]
pub struct CliApp {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a replay file or a synthetic feed, printing one JSON report per snapshot
    Run(RunCmd),

    /// List configured profiles
    Profiles(ProfilesCmd),

    /// Validate the configuration and print the resolved thresholds
    Check(CheckCmd),
}

#[derive(Parser, Debug)]
pub struct RunCmd {
    /// JSON-lines quote file; a synthetic feed is used when omitted
    #[arg(long, value_name = "FILE")]
    pub replay: Option<String>,

    /// Synthetic feed length in steps
    #[arg(long, default_value_t = 500)]
    pub steps: usize,

    /// Synthetic feed seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Delay between quotes in milliseconds
    #[arg(long, value_name = "MS")]
    pub pace_ms: Option<u64>,

    /// Profile to activate (overrides config and environment)
    #[arg(short, long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Only print reports that carry a signal
    #[arg(long)]
    pub signals_only: bool,
}

#[derive(Parser, Debug)]
pub struct ProfilesCmd {
    /// Output format (text, json)
    #[arg(short, long, value_name = "FORMAT", default_value = "text")]
    pub format: String,
}

#[derive(Parser, Debug)]
pub struct CheckCmd {
    /// Profile to resolve instead of the configured one
    #[arg(short, long, value_name = "NAME")]
    pub profile: Option<String>,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    let config = read_config(app.config.as_deref())?;
    init_logging(app.verbose, app.debug, app.json_logs, &config.logging)?;

    match app.command {
        Command::Run(cmd) => run_command(config, cmd).await,
        Command::Profiles(cmd) => profiles_command(&config, cmd),
        Command::Check(cmd) => check_command(config, cmd),
    }
}

fn read_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(raw) => {
            let path = PathBuf::from(shellexpand::tilde(raw).as_ref());
            load_config(&path).with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => {
            let mut config = Config::default();
            config.apply_profile_override(std::env::var(PROFILE_ENV).ok());
            config.validate().context("Invalid default configuration")?;
            Ok(config)
        }
    }
}

/// Flags win over `[logging].level`; `RUST_LOG` wins over the config file
fn init_logging(verbose: bool, debug: bool, json_flag: bool, logging: &LoggingSection) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    // Reports go to stdout, logs to stderr
    let builder = fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr);
    if json_flag || logging.json {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow!("Failed to initialise logging: {e}"))
    } else {
        builder.try_init().map_err(|e| anyhow!("Failed to initialise logging: {e}"))
    }
}

async fn run_command(mut config: Config, cmd: RunCmd) -> Result<()> {
    config.apply_profile_override(cmd.profile.clone());
    let settings = config.resolve().context("Failed to resolve configuration")?;
    let tick = settings.adjustment_tick;
    let mut runner = EngineRunner::new(ArbitrageEngine::new(settings), tick);

    let pace = cmd.pace_ms.map(Duration::from_millis);
    let feed: Box<dyn QuoteFeed> = match &cmd.replay {
        Some(raw) => {
            let path = PathBuf::from(shellexpand::tilde(raw).as_ref());
            let feed = ReplayFeed::new(path);
            Box::new(match pace {
                Some(pace) => feed.with_pace(pace),
                None => feed,
            })
        }
        None => Box::new(SyntheticFeed::new(SyntheticConfig {
            steps: cmd.steps,
            seed: cmd.seed,
            pace,
            ..SyntheticConfig::default()
        })),
    };

    if runner.engine().is_alert_only() {
        info!("Alert-only mode: reports are informational");
    }

    let signals_only = cmd.signals_only;
    let print_report = move |report: &EvaluationReport| {
        if signals_only && report.outcome.signal().is_none() {
            return;
        }
        match serde_json::to_string(report) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("Failed to serialise report: {}", e),
        }
    };

    let summary: Option<RunSummary> = tokio::select! {
        result = runner.run(feed.as_ref(), print_report) => Some(result.context("Run failed")?),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping");
            None
        }
    };

    match summary {
        Some(summary) => println!("{}", serde_json::to_string(&summary)?),
        None => println!("{}", serde_json::to_string(runner.engine().session_stats())?),
    }
    Ok(())
}

fn profiles_command(config: &Config, cmd: ProfilesCmd) -> Result<()> {
    let store = ProfileStore::from_config(config).context("Invalid profiles")?;

    if cmd.format == "json" {
        let profiles: Vec<_> = store.iter().collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "active": store.active_name(),
                "profiles": profiles,
            }))?
        );
        return Ok(());
    }

    println!(
        "  {:<16} {:>8} {:>8} {:>8} {:>10} {:>9}",
        "PROFILE", "Z", "SAMPLES", "HISTORY", "MIN_PROFIT", "SLIPPAGE"
    );
    for profile in store.iter() {
        let marker = if profile.name == store.active_name() { '*' } else { ' ' };
        println!(
            "{} {:<16} {:>8.2} {:>8} {:>8} {:>10} {:>9}",
            marker,
            profile.name,
            profile.spread_std_devs,
            profile.min_samples_for_signal,
            profile.history_size,
            profile.min_profit,
            profile.slippage_points
        );
    }
    Ok(())
}

fn check_command(mut config: Config, cmd: CheckCmd) -> Result<()> {
    config.apply_profile_override(cmd.profile);
    let settings = config.resolve().context("Configuration is invalid")?;
    let engine = ArbitrageEngine::new(settings);

    println!("{}", serde_json::to_string_pretty(&*engine.thresholds())?);
    println!("{}", serde_json::to_string_pretty(&engine.regime_status())?);
    info!("Configuration OK");
    Ok(())
}
