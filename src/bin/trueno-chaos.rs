//! Trueno-Chaos CLI
//!
//! Runs the full chaos suite against the in-process memory target and prints the report.

#![allow(clippy::print_stdout)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trueno_chaos::adapter::{MemoryTarget, MemoryTargetSettings};
use trueno_chaos::config::SuiteConfig;
use trueno_chaos::report::{render_json, render_text};
use trueno_chaos::suite::ChaosSuite;

/// Trueno-Chaos CLI
#[derive(Parser)]
#[command(name = "trueno-chaos")]
#[command(author, version, about = "Chaos engineering suite for stateful backends", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// TOML suite configuration
    #[arg(short, long, env = "TRUENO_CHAOS_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for the random failure injector
    #[arg(long)]
    seed: Option<u64>,

    /// Pause between experiments in milliseconds
    #[arg(long)]
    isolation_delay_ms: Option<u64>,

    /// Pause between baseline and first experiment in milliseconds
    #[arg(long)]
    settle_delay_ms: Option<u64>,

    /// Liveness probes tolerated before giving up on recovery
    #[arg(long)]
    recovery_attempts: Option<u32>,

    /// Session capacity of the memory target (0 = unlimited)
    #[arg(long, default_value = "100")]
    max_connections: usize,

    /// Skip every pause and hold (smoke runs)
    #[arg(long)]
    fast: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn suite_config(&self) -> anyhow::Result<SuiteConfig> {
        let mut config = match &self.config {
            Some(path) => SuiteConfig::from_toml_file(path)?,
            None => SuiteConfig::default(),
        };
        if self.fast {
            config = config.without_delays();
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(ms) = self.isolation_delay_ms {
            config.isolation_delay_ms = ms;
        }
        if let Some(ms) = self.settle_delay_ms {
            config.settle_delay_ms = ms;
        }
        if let Some(attempts) = self.recovery_attempts {
            config.recovery.max_attempts = attempts;
        }
        config.validate()?;
        Ok(config)
    }

    fn target(&self) -> MemoryTarget {
        MemoryTarget::with_settings(MemoryTargetSettings {
            max_connections: (self.max_connections > 0).then_some(self.max_connections),
            ..MemoryTargetSettings::default()
        })
    }
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn abort_message(error: &trueno_chaos::Error) -> String {
    format!("Chaos suite aborted: {error}")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter_from_verbosity(cli.verbose)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.suite_config()?;
    let suite = ChaosSuite::new(Arc::new(cli.target()), config);

    match suite.run().await {
        Ok(report) => {
            if cli.json {
                println!("{}", render_json(&report)?);
            } else {
                print!("{}", render_text(&report));
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", abort_message(&e));
            std::process::exit(1);
        }
    }
}
