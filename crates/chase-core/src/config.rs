use crate::agent::AgentConfig;
use crate::history::DEFAULT_LOSS_HISTORY;
use crate::nn::DEFAULT_LEARNING_RATE;
use crate::world::WorldBounds;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Session configuration. Distances are world units (the playfield is
/// 7.2 × 12.8 by default, centered on the origin); sizes are diameters in
/// hundredths of a world unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaseConfig {
    pub world_width: f32,
    pub world_height: f32,
    /// Simulation time per frame, in seconds.
    pub dt: f32,
    pub seed: u64,
    pub learning_rate: f32,
    /// Train every Nth tick. Larger values learn more slowly.
    pub train_cadence: u64,
    pub loss_history_capacity: usize,
    pub knowledge_per_level: u64,
    pub base_speed: f32,
    pub speed_per_level: f32,
    pub base_size: f32,
    pub size_per_level: f32,
    pub player_size: f32,
    pub player_start: [f32; 2],
    pub pursuer_start: [f32; 2],
    pub collision_cooldown_frames: u64,
    pub level_transition_frames: u64,
    pub game_over_frames: u64,
    /// Re-initialize the pursuer when its controller produces non-finite values.
    pub reset_on_divergence: bool,
}

impl Default for ChaseConfig {
    fn default() -> Self {
        Self {
            world_width: 7.2,
            world_height: 12.8,
            dt: 1.0 / 60.0,
            seed: 42,
            learning_rate: DEFAULT_LEARNING_RATE,
            train_cadence: 100,
            loss_history_capacity: DEFAULT_LOSS_HISTORY,
            knowledge_per_level: 3550,
            base_speed: 1.0,
            speed_per_level: 0.4,
            base_size: 120.0,
            size_per_level: 10.0,
            player_size: 60.0,
            player_start: [0.0, -3.0],
            pursuer_start: [0.0, 3.0],
            collision_cooldown_frames: 100,
            level_transition_frames: 500,
            game_over_frames: 1200,
            reset_on_divergence: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Parse(String),
    InvalidWorldSize { width: f32, height: f32 },
    InvalidTimeStep(f32),
    InvalidLearningRate(f32),
    ZeroTrainCadence,
    ZeroLossHistoryCapacity,
    ZeroKnowledgePerLevel,
    InvalidDimension { field: &'static str, value: f32 },
    StartOutOfBounds { entity: &'static str, position: [f32; 2] },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "invalid config JSON: {msg}"),
            ConfigError::InvalidWorldSize { width, height } => write!(
                f,
                "world size must be positive and finite (got {width} x {height})"
            ),
            ConfigError::InvalidTimeStep(dt) => {
                write!(f, "dt must be positive and finite (got {dt})")
            }
            ConfigError::InvalidLearningRate(lr) => {
                write!(f, "learning_rate must be positive and finite (got {lr})")
            }
            ConfigError::ZeroTrainCadence => write!(f, "train_cadence must be positive"),
            ConfigError::ZeroLossHistoryCapacity => {
                write!(f, "loss_history_capacity must be positive")
            }
            ConfigError::ZeroKnowledgePerLevel => {
                write!(f, "knowledge_per_level must be positive")
            }
            ConfigError::InvalidDimension { field, value } => {
                write!(f, "{field} must be non-negative and finite (got {value})")
            }
            ConfigError::StartOutOfBounds { entity, position } => write!(
                f,
                "{entity} start position [{}, {}] lies outside the world",
                position[0], position[1]
            ),
        }
    }
}

impl Error for ConfigError {}

impl ChaseConfig {
    /// Parse a (possibly partial) JSON config and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.world_width) || !positive(self.world_height) {
            return Err(ConfigError::InvalidWorldSize {
                width: self.world_width,
                height: self.world_height,
            });
        }
        if !positive(self.dt) {
            return Err(ConfigError::InvalidTimeStep(self.dt));
        }
        if !positive(self.learning_rate) {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }
        if self.train_cadence == 0 {
            return Err(ConfigError::ZeroTrainCadence);
        }
        if self.loss_history_capacity == 0 {
            return Err(ConfigError::ZeroLossHistoryCapacity);
        }
        if self.knowledge_per_level == 0 {
            return Err(ConfigError::ZeroKnowledgePerLevel);
        }
        for (field, value) in [
            ("base_speed", self.base_speed),
            ("speed_per_level", self.speed_per_level),
            ("base_size", self.base_size),
            ("size_per_level", self.size_per_level),
            ("player_size", self.player_size),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDimension { field, value });
            }
        }
        let bounds = self.bounds();
        for (entity, position) in [
            ("player", self.player_start),
            ("pursuer", self.pursuer_start),
        ] {
            if !bounds.contains(position) {
                return Err(ConfigError::StartOutOfBounds { entity, position });
            }
        }
        Ok(())
    }

    pub fn bounds(&self) -> WorldBounds {
        WorldBounds::new(self.world_width, self.world_height)
    }

    pub fn agent(&self) -> AgentConfig {
        AgentConfig {
            learning_rate: self.learning_rate,
            train_cadence: self.train_cadence,
            loss_history_capacity: self.loss_history_capacity,
            knowledge_per_level: self.knowledge_per_level,
            base_speed: self.base_speed,
            speed_per_level: self.speed_per_level,
            base_size: self.base_size,
            size_per_level: self.size_per_level,
        }
    }
}
