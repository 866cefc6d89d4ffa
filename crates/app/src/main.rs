use std::path::{Path, PathBuf};

use beatsync_core::{AppConfig, JudgmentLog, Outcome, TimingError};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod script;

use script::Script;

fn main() -> beatsync_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate { script, log } => run_simulate(&config, &script, log.as_deref()),
        Commands::Verify { script, log } => run_verify(&config, &script, &log),
    }
}

fn load_config(path: Option<&Path>) -> beatsync_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading config");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::live_defaults()),
    }
}

fn run_simulate(
    config: &AppConfig,
    script_path: &PathBuf,
    log_path: Option<&Path>,
) -> beatsync_core::Result<()> {
    tracing::info!(script = ?script_path, "starting simulation");

    let script = Script::load(script_path)?;
    let beatmap = script.beatmap();
    tracing::info!(events = beatmap.len(), "loaded script");

    let simulation = script::run(&script, config)?;
    let count = |outcome: Outcome| {
        simulation
            .log
            .events()
            .iter()
            .filter(|event| event.outcome == outcome)
            .count()
    };
    tracing::info!(
        frames = simulation.frames,
        exact = count(Outcome::Exact),
        edge = count(Outcome::Edge),
        timeout = count(Outcome::Timeout),
        steps = simulation.periodic_steps,
        "simulation finished"
    );

    if let Some(path) = log_path {
        simulation.log.write_json(path)?;
        tracing::info!(?path, "wrote judgment log");
    }
    Ok(())
}

fn run_verify(
    config: &AppConfig,
    script_path: &PathBuf,
    log_path: &PathBuf,
) -> beatsync_core::Result<()> {
    tracing::info!(script = ?script_path, log = ?log_path, "verifying replay");

    let expected = JudgmentLog::read_json(log_path)?;
    let script = Script::load(script_path)?;
    let simulation = script::run(&script, config)?;

    match expected.first_divergence(&simulation.log) {
        None => {
            tracing::info!(events = expected.len(), "replay matches recorded judgments");
            Ok(())
        }
        Some(index) => {
            tracing::error!(
                index,
                expected = ?expected.events().get(index),
                actual = ?simulation.log.events().get(index),
                "replay diverged"
            );
            Err(TimingError::msg(format!(
                "replay diverged from the recorded log at judgment {index}"
            )))
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Beat clock and judgment scheduler driver", long_about = None)]
struct Cli {
    /// Optional JSON config overriding tempo, playback rate and edge policy.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a level script headlessly and report every judgment.
    Simulate {
        /// Path to the level script.
        script: PathBuf,
        /// Where to write the judgment log.
        #[arg(short, long)]
        log: Option<PathBuf>,
    },
    /// Re-run a level script and compare it against a recorded judgment log.
    Verify {
        /// Path to the level script.
        script: PathBuf,
        /// Judgment log produced by an earlier `simulate --log`.
        log: PathBuf,
    },
}
