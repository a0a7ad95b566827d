mod engine;
mod game;

use std::path::{Path, PathBuf};

use beat_runner_core::{AppConfig, BeatError};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use engine::{MetronomeSettings, SimulatedEngine};
use game::RunOptions;

fn main() -> beat_runner_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            bpm,
            seconds,
            fps,
            jitter_ms,
            reaction_ms,
            seed,
        } => {
            let settings = MetronomeSettings {
                bpm,
                jitter_ms,
                seed,
                ..Default::default()
            };
            let options = RunOptions {
                seconds,
                fps,
                max_reaction_secs: reaction_ms / 1000.0,
                seed,
            };
            run_game(config.as_deref(), settings, options)
        }
        Commands::DumpConfig { output } => dump_config(output.as_deref()),
    }
}

fn run_game(
    config: Option<&Path>,
    settings: MetronomeSettings,
    options: RunOptions,
) -> beat_runner_core::Result<()> {
    if !(settings.bpm.is_finite() && settings.bpm > 0.0) {
        return Err(BeatError::config(format!("bpm must be positive, got {}", settings.bpm)));
    }
    if options.fps == 0 {
        return Err(BeatError::config("fps must be non-zero"));
    }

    let config = match config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    tracing::info!(bpm = settings.bpm, seconds = options.seconds, fps = options.fps, "starting run");

    let summary = game::run(SimulatedEngine::new(settings), &config, options)?;
    println!("{}", serde_json::to_string_pretty(&summary.to_json())?);
    Ok(())
}

fn dump_config(output: Option<&Path>) -> beat_runner_core::Result<()> {
    let json = AppConfig::default().to_json_pretty()?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!(?path, "default configuration written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Beat-synchronised rhythm game driver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play the demo level headless against a simulated metronome.
    Run {
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Metronome tempo in beats per minute.
        #[arg(long, default_value_t = 120.0)]
        bpm: f32,
        /// How long to run, in seconds.
        #[arg(long, default_value_t = 8.0)]
        seconds: f64,
        /// Simulation ticks per second.
        #[arg(long, default_value_t = 60)]
        fps: u32,
        /// Maximum random offset of each beat from the grid, in milliseconds.
        #[arg(long, default_value_t = 0.0)]
        jitter_ms: f64,
        /// Slowest autopilot reaction after a beat, in milliseconds.
        #[arg(long, default_value_t = 150.0)]
        reaction_ms: f64,
        /// Seed for the metronome jitter and the autopilot.
        #[arg(long, default_value_t = 7)]
        seed: u64,
    },
    /// Print (or write) the default configuration as JSON.
    DumpConfig {
        /// Destination file. Prints to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
