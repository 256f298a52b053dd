//! Headless tribe game runner.
//!
//! This binary runs the simulation without graphics, controlled via JSON on
//! stdin/stdout. Designed for scripted play, CI testing and determinism checks.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode on the default map
//! cargo run -p tribe_headless
//!
//! # Interactive mode on a scenario file, with state after every tick
//! cargo run -p tribe_headless -- run --scenario scenarios/default.ron --auto-state
//!
//! # Simulate 1200 ticks and print a summary
//! cargo run -p tribe_headless -- simulate --ticks 1200
//!
//! # Check determinism across 8 parallel runs
//! cargo run -p tribe_headless -- verify --runs 8
//!
//! # Draw the field after 600 ticks
//! cargo run -p tribe_headless -- render --ticks 600 --color
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tribe_headless::{
    ascii::{render_ascii, AsciiConfig},
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::Scenario,
    verify::{run_scenario, verify_determinism},
};

#[derive(Parser)]
#[command(name = "tribe_headless")]
#[command(about = "Headless tribe RTS runner for scripted play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the JSON-lines protocol on stdin/stdout
    Run {
        /// Scenario file, or "default" for the built-in map
        #[arg(short, long, default_value = "default")]
        scenario: String,

        /// Answer every tick with the full state
        #[arg(long)]
        auto_state: bool,
    },

    /// Simulate a scenario without input and print a summary
    Simulate {
        /// Scenario file, or "default" for the built-in map
        #[arg(short, long, default_value = "default")]
        scenario: String,

        /// Number of ticks to simulate
        #[arg(short, long, default_value = "3600")]
        ticks: u64,
    },

    /// Verify determinism by running a scenario several times
    Verify {
        /// Scenario file, or "default" for the built-in map
        #[arg(short, long, default_value = "default")]
        scenario: String,

        /// Number of ticks per run
        #[arg(short, long, default_value = "3600")]
        ticks: u64,

        /// Number of runs to compare
        #[arg(short, long, default_value = "4")]
        runs: u32,
    },

    /// Print the field as ASCII after some ticks
    Render {
        /// Scenario file, or "default" for the built-in map
        #[arg(short, long, default_value = "default")]
        scenario: String,

        /// Number of ticks to simulate first
        #[arg(short, long, default_value = "0")]
        ticks: u64,

        /// Width in characters
        #[arg(long, default_value = "80")]
        width: usize,

        /// Height in characters
        #[arg(long, default_value = "24")]
        height: usize,

        /// Use ANSI colors
        #[arg(long)]
        color: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            auto_state,
        }) => cmd_run(&scenario, auto_state),
        Some(Commands::Simulate { scenario, ticks }) => cmd_simulate(&scenario, ticks),
        Some(Commands::Verify {
            scenario,
            ticks,
            runs,
        }) => cmd_verify(&scenario, ticks, runs),
        Some(Commands::Render {
            scenario,
            ticks,
            width,
            height,
            color,
        }) => cmd_render(&scenario, ticks, width, height, color),
        None => cmd_run("default", false),
    }
}

/// Load a scenario or exit.
fn load_scenario(name: &str) -> Scenario {
    match Scenario::resolve(name) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Failed to load scenario: {e}");
            std::process::exit(1);
        }
    }
}

/// Run the interactive protocol
fn cmd_run(scenario: &str, auto_state: bool) {
    tracing::info!("Starting headless runner on {}", scenario);

    let sim = match load_scenario(scenario).build() {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Failed to build scenario: {e}");
            std::process::exit(1);
        }
    };

    let config = HeadlessConfig {
        auto_state_output: auto_state,
    };
    let mut runner = HeadlessRunner::with_config(sim, config);
    if let Err(e) = runner.run_stdio() {
        eprintln!("Protocol IO failed: {e}");
        std::process::exit(1);
    }
}

/// Simulate without input
fn cmd_simulate(scenario: &str, ticks: u64) {
    tracing::info!("Simulating {} for {} ticks", scenario, ticks);

    let summary = match run_scenario(&load_scenario(scenario), ticks) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Simulation failed: {e}");
            std::process::exit(1);
        }
    };

    eprintln!("Simulated {} ticks:", summary.ticks);
    eprintln!("  Shots:       {} ({} hits)", summary.shots, summary.hits);
    eprintln!("  Deaths:      {}", summary.deaths);
    eprintln!("  Trained:     {}", summary.trained);
    eprintln!("  Constructed: {}", summary.constructed);
    eprintln!("  Alive:       red {} / blue {}", summary.red_alive, summary.blue_alive);
    eprintln!("  Gems:        {}", summary.gems);
    println!("{:016x}", summary.final_hash);
}

/// Verify determinism
fn cmd_verify(scenario: &str, ticks: u64, runs: u32) {
    tracing::info!(
        "Verifying determinism: {} for {} ticks ({} runs)",
        scenario,
        ticks,
        runs
    );

    let report = match verify_determinism(&load_scenario(scenario), ticks, runs) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Verification failed: {e}");
            std::process::exit(1);
        }
    };

    if report.is_deterministic() {
        eprintln!(
            "PASS: All {} runs produced identical results",
            report.hashes.len()
        );
        if let Some(hash) = report.hashes.first() {
            eprintln!("  Final hash: {hash:016x}");
        }
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        for (run, hash) in report.hashes.iter().enumerate() {
            eprintln!("  Run {run}: {hash:016x}");
        }
        std::process::exit(1);
    }
}

/// Render the field as ASCII
fn cmd_render(scenario: &str, ticks: u64, width: usize, height: usize, color: bool) {
    let mut sim = match load_scenario(scenario).build() {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Failed to build scenario: {e}");
            std::process::exit(1);
        }
    };
    for _ in 0..ticks {
        sim.tick();
    }

    let config = AsciiConfig {
        width,
        height,
        show_legend: true,
        use_color: color,
    };
    print!("{}", render_ascii(&sim, &config));
}
