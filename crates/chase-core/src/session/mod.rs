pub mod lifecycle;
pub mod metrics;

pub use lifecycle::{SceneEvent, StepReport};
pub use metrics::*;

use crate::agent::PursuitAgent;
use crate::config::{ChaseConfig, ConfigError};
use crate::names;
use crate::nn::NeuralController;
use crate::player::{PlayerPolicy, PolicyKind};
use crate::world::WorldBounds;
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scene {
    #[default]
    Play,
    /// Pause between levels.
    Level,
    GameOver,
}

/// Headless game loop around one `PursuitAgent`: owns positions, collision,
/// scene transitions and leveling.
pub struct Session {
    pub(crate) config: ChaseConfig,
    pub(crate) bounds: WorldBounds,
    pub(crate) agent: PursuitAgent,
    pub(crate) scene: Scene,
    pub(crate) frame: u64,
    pub(crate) wait_frame: u64,
    pub(crate) score: u64,
    pub(crate) player_name: String,
    pub(crate) player_pos: [f32; 2],
    pub(crate) pursuer_pos: [f32; 2],
    /// Name picks only; the controller has its own generator.
    pub(crate) rng: ChaCha12Rng,
    pub(crate) restarts: u64,
    pub(crate) max_level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    InvalidSampleEvery,
    TooManySteps { max: usize, actual: usize },
    TooManySamples { max: usize, actual: usize },
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            ExperimentError::TooManySteps { max, actual } => {
                write!(f, "steps ({actual}) exceed supported maximum ({max})")
            }
            ExperimentError::TooManySamples { max, actual } => {
                write!(
                    f,
                    "sample count ({actual}) exceeds supported maximum ({max})"
                )
            }
        }
    }
}

impl Error for ExperimentError {}

#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    Config(ConfigError),
    Experiment(ExperimentError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Config(e) => write!(f, "{e}"),
            RunError::Experiment(e) => write!(f, "{e}"),
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(err: ConfigError) -> Self {
        RunError::Config(err)
    }
}

impl From<ExperimentError> for RunError {
    fn from(err: ExperimentError) -> Self {
        RunError::Experiment(err)
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RunError::Config(e) => Some(e),
            RunError::Experiment(e) => Some(e),
        }
    }
}

impl Session {
    pub const MAX_EXPERIMENT_STEPS: usize = 10_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 100_000;

    pub fn new(config: ChaseConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_new(config: ChaseConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = ChaCha12Rng::seed_from_u64(config.seed.wrapping_add(1));
        let controller = NeuralController::with_rng(
            ChaCha12Rng::seed_from_u64(config.seed),
            config.learning_rate,
        );
        let agent = PursuitAgent::new(
            controller,
            &config.agent(),
            names::random_pursuer_name(&mut rng),
        );
        let player_name = names::random_player_name(&mut rng).to_string();

        Ok(Self {
            bounds: config.bounds(),
            agent,
            scene: Scene::Play,
            frame: 0,
            wait_frame: 0,
            score: 0,
            player_name,
            player_pos: config.player_start,
            pursuer_pos: config.pursuer_start,
            rng,
            restarts: 0,
            max_level: 1,
            config,
        })
    }

    pub fn config(&self) -> &ChaseConfig {
        &self.config
    }

    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    pub fn agent(&self) -> &PursuitAgent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut PursuitAgent {
        &mut self.agent
    }

    pub fn scene(&self) -> Scene {
        self.scene
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Frames survived in the current run.
    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn player_position(&self) -> [f32; 2] {
        self.player_pos
    }

    pub fn pursuer_position(&self) -> [f32; 2] {
        self.pursuer_pos
    }

    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    /// Center distance at which the pursuer catches the player, in world units.
    pub fn catch_distance(&self) -> f32 {
        (self.agent.size() + self.config.player_size) / 100.0
    }

    /// Promote the pursuer and enter the between-levels pause.
    pub fn next_level(&mut self) {
        self.wait_frame = self.frame;
        self.scene = Scene::Level;
        let level = self.agent.level() + 1;
        let name = names::random_pursuer_name(&mut self.rng);
        self.agent.set_level(level, name);
        self.max_level = self.max_level.max(level);
        info!("level {level}: {name} takes over");
    }

    /// Start over at level 1 with a fresh network and new names. Both the
    /// player and the pursuer return to their configured start positions; the
    /// pursuer does not stay where it made the catch.
    pub fn restart(&mut self) {
        self.frame = 0;
        self.wait_frame = 0;
        self.score = 0;
        self.scene = Scene::Play;
        self.player_name = names::random_player_name(&mut self.rng).to_string();
        let name = names::random_pursuer_name(&mut self.rng);
        self.agent.set_level(1, name);
        self.agent.reset();
        self.player_pos = self.config.player_start;
        self.pursuer_pos = self.config.pursuer_start;
        self.restarts += 1;
        info!("restart #{}: {} vs {name}", self.restarts, self.player_name);
    }

    pub fn run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
        policy: &mut dyn PlayerPolicy,
    ) -> RunSummary {
        self.try_run_experiment(steps, sample_every, policy)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
        policy: &mut dyn PlayerPolicy,
    ) -> Result<RunSummary, ExperimentError> {
        let estimated_samples = Self::check_experiment(steps, sample_every)?;

        let dt = self.config.dt;
        let train_steps_before = self.agent.train_steps();
        let mut samples = Vec::with_capacity(estimated_samples);
        let mut level_events = Vec::new();
        let mut catches = Vec::new();
        let mut divergence_resets = 0usize;

        for step in 1..=steps {
            let input = policy.position(step as u64, dt, self.pursuer_pos, self.bounds);
            let report = self.step(dt, input);
            match report.event {
                Some(SceneEvent::LevelUp { level }) => level_events.push(LevelEvent {
                    step,
                    level,
                    pursuer_name: self.agent.name().to_string(),
                    average_loss: self.agent.average_loss(),
                }),
                Some(SceneEvent::Caught { score, level }) => catches.push(CatchEvent {
                    step,
                    score,
                    level,
                }),
                Some(SceneEvent::PursuerReset) => divergence_resets += 1,
                Some(SceneEvent::Resumed) | Some(SceneEvent::Restarted) | None => {}
            }
            if step % sample_every == 0 || step == steps {
                samples.push(self.collect_step_metrics(step));
            }
        }

        Ok(RunSummary {
            schema_version: 1,
            seed: self.config.seed,
            steps,
            sample_every,
            samples,
            level_events,
            catches,
            max_level: self.max_level,
            final_level: self.agent.level(),
            restarts: self.restarts,
            train_steps: self.agent.train_steps() - train_steps_before,
            final_average_loss: self.agent.average_loss(),
            divergence_resets,
            diverged: self.agent.diverged(),
        })
    }

    fn check_experiment(steps: usize, sample_every: usize) -> Result<usize, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }
        Ok(estimated_samples)
    }
}

/// Run one independent session per seed in parallel. Each session owns its
/// own controller; results come back in seed order.
pub fn run_sweep(
    config: &ChaseConfig,
    seeds: &[u64],
    steps: usize,
    sample_every: usize,
    policy: PolicyKind,
) -> Result<Vec<RunSummary>, RunError> {
    config.validate()?;
    Session::check_experiment(steps, sample_every)?;

    seeds
        .par_iter()
        .map(|&seed| -> Result<RunSummary, RunError> {
            let config = ChaseConfig {
                seed,
                ..config.clone()
            };
            let mut session = Session::try_new(config)?;
            let mut player = policy.build(session.config());
            Ok(session.try_run_experiment(steps, sample_every, player.as_mut())?)
        })
        .collect()
}
