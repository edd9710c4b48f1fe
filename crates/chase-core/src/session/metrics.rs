use super::{Scene, Session};
use crate::world;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StepMetrics {
    pub step: usize,
    pub frame: u64,
    pub scene: Scene,
    pub level: u32,
    pub knowledge: u64,
    pub player: [f32; 2],
    pub pursuer: [f32; 2],
    pub distance: f32,
    pub last_output: [f32; 2],
    pub last_loss: f32,
    /// Mean over the loss history window.
    pub average_loss: f32,
    pub train_steps: u64,
    pub speed: f32,
    pub score: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelEvent {
    pub step: usize,
    pub level: u32,
    pub pursuer_name: String,
    pub average_loss: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatchEvent {
    pub step: usize,
    /// Frames the player survived.
    pub score: u64,
    pub level: u32,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub seed: u64,
    pub steps: usize,
    pub sample_every: usize,
    pub samples: Vec<StepMetrics>,
    #[serde(default)]
    pub level_events: Vec<LevelEvent>,
    #[serde(default)]
    pub catches: Vec<CatchEvent>,
    pub max_level: u32,
    pub final_level: u32,
    #[serde(default)]
    pub restarts: u64,
    /// Training steps taken during this run.
    pub train_steps: u64,
    pub final_average_loss: f32,
    #[serde(default)]
    pub divergence_resets: usize,
    #[serde(default)]
    pub diverged: bool,
}

impl Session {
    pub(crate) fn collect_step_metrics(&self, step: usize) -> StepMetrics {
        let agent = &self.agent;
        StepMetrics {
            step,
            frame: self.frame,
            scene: self.scene,
            level: agent.level(),
            knowledge: agent.knowledge(),
            player: self.player_pos,
            pursuer: self.pursuer_pos,
            distance: world::distance(self.player_pos, self.pursuer_pos),
            last_output: agent.last_output(),
            last_loss: agent.last_loss(),
            average_loss: agent.average_loss(),
            train_steps: agent.train_steps(),
            speed: agent.effective_speed(),
            score: self.score,
        }
    }
}
