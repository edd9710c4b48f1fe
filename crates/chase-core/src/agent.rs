use crate::config::ChaseConfig;
use crate::history::LossHistory;
use crate::nn::{NeuralController, INPUT_SIZE, OUTPUT_SIZE};
use crate::world::WorldBounds;
use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Per-pursuer tuning. See `ChaseConfig` for the meaning of each field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub learning_rate: f32,
    pub train_cadence: u64,
    pub loss_history_capacity: usize,
    pub knowledge_per_level: u64,
    pub base_speed: f32,
    pub speed_per_level: f32,
    pub base_size: f32,
    pub size_per_level: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        ChaseConfig::default().agent()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlowdownError {
    InvalidDuration(f32),
    InvalidFactor(f32),
}

impl fmt::Display for SlowdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlowdownError::InvalidDuration(d) => {
                write!(f, "slowdown duration must be non-negative and finite (got {d})")
            }
            SlowdownError::InvalidFactor(k) => {
                write!(f, "slowdown factor must be positive and finite (got {k})")
            }
        }
    }
}

impl Error for SlowdownError {}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slowdown {
    remaining: f32,
    factor: f32,
}

/// Result of one control tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    /// Movement to add to the pursuer's position (caller clamps).
    pub delta: [f32; 2],
    pub output: [f32; OUTPUT_SIZE],
    /// Loss of the training step run on this tick, if any.
    pub loss: Option<f32>,
    pub level_up_ready: bool,
    /// True when the tick was skipped because world state was unavailable.
    pub idle: bool,
}

impl TickOutcome {
    pub fn idle() -> Self {
        Self {
            delta: [0.0, 0.0],
            output: [0.0; OUTPUT_SIZE],
            loss: None,
            level_up_ready: false,
            idle: true,
        }
    }
}

/// Read-only diagnostics for a HUD or log sink.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentTelemetry {
    pub name: String,
    pub level: u32,
    pub knowledge: u64,
    pub speed: f32,
    pub size: f32,
    pub features: [f32; INPUT_SIZE],
    pub labels: [f32; OUTPUT_SIZE],
    pub last_output: [f32; OUTPUT_SIZE],
    pub last_loss: f32,
    pub average_loss: f32,
    pub train_steps: u64,
    pub diverged: bool,
}

/// Drives a `NeuralController` from live world positions and trains it
/// online on the direction to the player.
#[derive(Clone, Debug)]
pub struct PursuitAgent {
    controller: NeuralController,
    config: AgentConfig,
    name: String,
    level: u32,
    knowledge: u64,
    speed: f32,
    size: f32,
    features: [f32; INPUT_SIZE],
    labels: [f32; OUTPUT_SIZE],
    losses: LossHistory,
    tick_count: u64,
    train_steps: u64,
    slowdown: Option<Slowdown>,
}

impl PursuitAgent {
    /// Starts at level 1. Panics if `train_cadence` or `loss_history_capacity` is zero.
    pub fn new(
        controller: NeuralController,
        config: &AgentConfig,
        name: impl Into<String>,
    ) -> Self {
        assert!(config.train_cadence > 0, "train_cadence must be positive");
        let mut agent = Self {
            controller,
            config: config.clone(),
            name: String::new(),
            level: 1,
            knowledge: 0,
            speed: config.base_speed,
            size: config.base_size,
            features: [0.0; INPUT_SIZE],
            labels: [0.0; OUTPUT_SIZE],
            losses: LossHistory::with_capacity(config.loss_history_capacity),
            tick_count: 0,
            train_steps: 0,
            slowdown: None,
        };
        agent.set_level(1, name);
        agent
    }

    /// Seeded controller built from `config.learning_rate`.
    pub fn with_seed(seed: u64, config: &AgentConfig, name: impl Into<String>) -> Self {
        let rng = ChaCha12Rng::seed_from_u64(seed);
        Self::new(
            NeuralController::with_rng(rng, config.learning_rate),
            config,
            name,
        )
    }

    /// One control step. `player` is `None` while the player is unavailable
    /// (e.g. during scene setup); such ticks change nothing.
    pub fn tick(
        &mut self,
        dt: f32,
        player: Option<[f32; 2]>,
        self_pos: [f32; 2],
        bounds: WorldBounds,
    ) -> TickOutcome {
        let Some(player) = player else {
            return TickOutcome::idle();
        };

        self.features = [player[0], player[1], self_pos[0], self_pos[1]];
        self.labels = [
            (player[0] - self_pos[0]) / bounds.width,
            (player[1] - self_pos[1]) / bounds.height,
        ];

        let output = self.controller.predict(&self.features);

        let speed = self.effective_speed();
        let [half_w, half_h] = bounds.half_extents();
        let delta = [
            half_w * output[0] * dt * speed,
            half_h * output[1] * dt * speed,
        ];
        if let Some(slow) = &mut self.slowdown {
            slow.remaining -= dt;
            if slow.remaining <= 0.0 {
                self.slowdown = None;
                debug!("{}: slowdown expired", self.name);
            }
        }

        self.tick_count += 1;
        let loss = if self.tick_count.is_multiple_of(self.config.train_cadence) {
            let loss = self.controller.train_step(&self.features, &self.labels);
            self.losses.push(loss);
            self.train_steps += 1;
            Some(loss)
        } else {
            None
        };

        self.knowledge += 1;
        let level_up_ready = self.level_up_ready();
        if level_up_ready && self.knowledge == self.level_up_threshold() + 1 {
            info!(
                "{} ready to leave level {} (avg loss {:.5})",
                self.name,
                self.level,
                self.average_loss()
            );
        }

        TickOutcome {
            delta,
            output,
            loss,
            level_up_ready,
            idle: false,
        }
    }

    pub fn set_level(&mut self, level: u32, name: impl Into<String>) {
        self.level = level;
        self.name = name.into();
        self.knowledge = 0;
        self.speed = self.config.base_speed + level as f32 * self.config.speed_per_level;
        self.size = self.config.base_size + level as f32 * self.config.size_per_level;
    }

    /// Scale movement by `factor` for the next `duration` seconds of ticked
    /// simulation time. Replaces any active slowdown; a zero duration cancels it.
    pub fn apply_slowdown(&mut self, duration: f32, factor: f32) -> Result<(), SlowdownError> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(SlowdownError::InvalidDuration(duration));
        }
        if !factor.is_finite() || factor <= 0.0 {
            return Err(SlowdownError::InvalidFactor(factor));
        }
        self.slowdown = (duration > 0.0).then_some(Slowdown {
            remaining: duration,
            factor,
        });
        Ok(())
    }

    /// Fresh network weights, empty loss history, zero knowledge. The cadence
    /// clock keeps running.
    pub fn reset(&mut self) {
        self.controller.reset();
        self.losses.clear();
        self.knowledge = 0;
    }

    fn level_up_threshold(&self) -> u64 {
        self.level as u64 * self.config.knowledge_per_level
    }

    pub fn level_up_ready(&self) -> bool {
        self.knowledge > self.level_up_threshold()
    }

    pub fn effective_speed(&self) -> f32 {
        match self.slowdown {
            Some(slow) => self.speed * slow.factor,
            None => self.speed,
        }
    }

    pub fn is_slowed(&self) -> bool {
        self.slowdown.is_some()
    }

    pub fn controller(&self) -> &NeuralController {
        &self.controller
    }

    pub fn diverged(&self) -> bool {
        self.controller.diverged()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn knowledge(&self) -> u64 {
        self.knowledge
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn features(&self) -> [f32; INPUT_SIZE] {
        self.features
    }

    /// Most recent training target (normalized direction to the player).
    pub fn labels(&self) -> [f32; OUTPUT_SIZE] {
        self.labels
    }

    pub fn last_output(&self) -> [f32; OUTPUT_SIZE] {
        self.controller.last_output()
    }

    pub fn last_loss(&self) -> f32 {
        self.controller.last_loss()
    }

    pub fn average_loss(&self) -> f32 {
        self.losses.mean()
    }

    pub fn loss_history(&self) -> &LossHistory {
        &self.losses
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn train_steps(&self) -> u64 {
        self.train_steps
    }

    pub fn telemetry(&self) -> AgentTelemetry {
        AgentTelemetry {
            name: self.name.clone(),
            level: self.level,
            knowledge: self.knowledge,
            speed: self.speed,
            size: self.size,
            features: self.features,
            labels: self.labels,
            last_output: self.last_output(),
            last_loss: self.last_loss(),
            average_loss: self.average_loss(),
            train_steps: self.train_steps,
            diverged: self.diverged(),
        }
    }
}
