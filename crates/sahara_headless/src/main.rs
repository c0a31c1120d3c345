//! Headless Sahara Raiders runner.
//!
//! This binary runs the simulation without graphics, controlled via JSON on
//! stdin/stdout.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin, persist to a save file
//! cargo run -p sahara_headless -- run --save saves/world.json
//!
//! # Simulate a day of world time in 60 s steps
//! cargo run -p sahara_headless -- simulate --seconds 86400 --step 60
//!
//! # Validate a balance file
//! cargo run -p sahara_headless -- validate assets/config/sahara.ron
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sahara_core::config::GameConfig;
use sahara_core::world::{GameData, GameStats};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sahara_headless::{
    config_file::{self, load_config},
    runner::HeadlessRunner,
    sink::LogSink,
    storage::{unix_now, SaveStore},
};

#[derive(Parser)]
#[command(name = "sahara_headless")]
#[command(about = "Headless Sahara Raiders runner for automated play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Balance config (RON); built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play an interactive session over stdin/stdout
    Run {
        /// Save file to restore from and write back to
        #[arg(short, long, default_value = "sahara_save.json")]
        save: PathBuf,

        /// Keep the session in memory only
        #[arg(long)]
        no_save: bool,
    },

    /// Advance a fresh world and print a summary
    Simulate {
        /// World seconds to simulate
        #[arg(long, default_value = "86400")]
        seconds: f64,

        /// Seconds per tick
        #[arg(long, default_value = "60")]
        step: f64,

        /// Override the config seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Check a balance config file and report every problem
    Validate {
        /// Config file to check
        path: PathBuf,
    },
}

/// Printed by `simulate`.
#[derive(Serialize)]
struct SimulationReport {
    seed: u64,
    clock: f64,
    ticks: u64,
    events: usize,
    stats: GameStats,
    hash: u64,
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for protocol output
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Validate { path }) => cmd_validate(path),
        Some(Commands::Simulate {
            seconds,
            step,
            seed,
        }) => cmd_simulate(load_config_or_exit(cli.config), seconds, step, seed),
        Some(Commands::Run { save, no_save }) => {
            cmd_run(load_config_or_exit(cli.config), (!no_save).then_some(save));
        }
        None => cmd_run(
            load_config_or_exit(cli.config),
            Some(PathBuf::from("sahara_save.json")),
        ),
    }
}

fn load_config_or_exit(path: Option<PathBuf>) -> GameConfig {
    match config_file::load_or_default(path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config");
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

/// Run an interactive session.
fn cmd_run(config: GameConfig, save: Option<PathBuf>) {
    let mut runner = match save {
        Some(path) => {
            let store = SaveStore::new(path);
            let game = store.load_or_default(config, unix_now(), Box::new(LogSink));
            HeadlessRunner::with_store(game, store)
        }
        None => HeadlessRunner::new(GameData::with_sink(config, Box::new(LogSink))),
    };

    let stdin = io::stdin();
    if let Err(e) = runner.run(stdin.lock(), io::stdout().lock()) {
        tracing::error!(error = %e, "Session aborted");
        std::process::exit(1);
    }
}

/// Simulate a fresh world and print a JSON report.
fn cmd_simulate(config: GameConfig, seconds: f64, step: f64, seed: Option<u64>) {
    if !(step.is_finite() && step > 0.0 && seconds.is_finite() && seconds >= 0.0) {
        eprintln!("FATAL: --seconds must be non-negative and --step positive");
        std::process::exit(1);
    }
    let config = match seed {
        Some(seed) => config.with_seed(seed),
        None => config,
    };
    let seed = config.seed;
    let mut game = GameData::new(config);

    let ticks = (seconds / step).ceil() as u64;
    let mut events = 0;
    let mut remaining = seconds;
    for _ in 0..ticks {
        let dt = step.min(remaining);
        events += game.tick(dt).len();
        remaining -= dt;
    }

    tracing::info!(
        seed,
        ticks,
        events,
        clock = game.clock(),
        "Simulation finished"
    );

    let report = SimulationReport {
        seed,
        clock: game.clock(),
        ticks,
        events,
        stats: game.stats(),
        hash: game.state_hash(),
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("FATAL: Failed to serialize report: {e}");
            std::process::exit(1);
        }
    }
}

/// Validate a config file.
fn cmd_validate(path: PathBuf) {
    match load_config(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), seed = config.seed, "Config is valid");
            println!("OK: {}", path.display());
        }
        Err(e) => {
            eprintln!("INVALID: {}: {e}", path.display());
            std::process::exit(1);
        }
    }
}
