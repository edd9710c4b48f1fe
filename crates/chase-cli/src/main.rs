//! Headless runner for the neural pursuer.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use neural_chase_core::{run_sweep, ChaseConfig, PolicyKind, Session};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "neural-chase")]
#[command(version)]
#[command(about = "Headless runs of an online-trained neural pursuer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one or more sessions and emit JSON run summaries
    Run {
        /// Frames to simulate per session
        #[arg(short, long, default_value = "10000")]
        steps: usize,

        /// Sample metrics every K frames (and on the last frame)
        #[arg(long, default_value = "100")]
        sample_every: usize,

        /// Seed for the first session; overrides the config file
        #[arg(long)]
        seed: Option<u64>,

        /// Number of sessions, seeded seed, seed+1, ... and run in parallel
        #[arg(long, default_value = "1")]
        seeds: u64,

        /// Configuration file (JSON, missing fields take defaults)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Scripted player behaviour
        #[arg(short, long, value_enum, default_value = "orbit")]
        player: PlayerArg,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default configuration as JSON
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlayerArg {
    Stationary,
    Orbit,
    #[value(alias = "evader")]
    Evade,
}

impl From<PlayerArg> for PolicyKind {
    fn from(arg: PlayerArg) -> Self {
        match arg {
            PlayerArg::Stationary => PolicyKind::Stationary,
            PlayerArg::Orbit => PolicyKind::Orbit,
            PlayerArg::Evade => PolicyKind::Evader,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            steps,
            sample_every,
            seed,
            seeds,
            config,
            player,
            output,
        } => run(
            steps,
            sample_every,
            seed,
            seeds,
            config.as_deref(),
            player.into(),
            output.as_deref(),
        ),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&ChaseConfig::default())?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ChaseConfig> {
    let Some(path) = path else {
        return Ok(ChaseConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ChaseConfig::from_json(&text)
        .with_context(|| format!("invalid config {}", path.display()))
}

fn run(
    steps: usize,
    sample_every: usize,
    seed: Option<u64>,
    seeds: u64,
    config_path: Option<&Path>,
    policy: PolicyKind,
    output: Option<&Path>,
) -> Result<()> {
    if seeds == 0 {
        bail!("--seeds must be at least 1");
    }
    let mut config = load_config(config_path)?;
    if let Some(seed) = seed {
        config.seed = seed;
    }

    let json = if seeds == 1 {
        let mut session = Session::try_new(config.clone()).context("invalid configuration")?;
        let mut player = policy.build(&config);
        info!(
            "running {steps} frames, seed {}, {} vs {}",
            config.seed,
            session.player_name(),
            session.agent().name()
        );
        let summary = session
            .try_run_experiment(steps, sample_every, player.as_mut())
            .context("experiment rejected")?;
        info!(
            "done: level {}, {} catches, {} training steps, avg loss {:.5}",
            summary.final_level,
            summary.catches.len(),
            summary.train_steps,
            summary.final_average_loss
        );
        serde_json::to_string_pretty(&summary)?
    } else {
        let seed_list: Vec<u64> = (0..seeds)
            .map(|i| config.seed.wrapping_add(i))
            .collect();
        info!("running {} sessions of {steps} frames", seed_list.len());
        let summaries = run_sweep(&config, &seed_list, steps, sample_every, policy)
            .context("sweep failed")?;
        let best = summaries.iter().map(|s| s.max_level).max().unwrap_or(1);
        info!("done: best level {best}");
        serde_json::to_string_pretty(&summaries)?
    };

    match output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
