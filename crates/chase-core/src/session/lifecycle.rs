use super::{Scene, Session};
use crate::agent::TickOutcome;
use crate::world;
use log::{info, warn};

/// Scene transition or notable event produced by one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SceneEvent {
    /// The pursuer was promoted; the session is now pausing between levels.
    LevelUp { level: u32 },
    /// The player was caught after surviving `score` frames.
    Caught { score: u64, level: u32 },
    /// Level pause over, back to play.
    Resumed,
    /// Game-over pause over, everything re-initialized.
    Restarted,
    /// The controller diverged and was re-initialized.
    PursuerReset,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    pub frame: u64,
    pub scene: Scene,
    pub tick: TickOutcome,
    pub distance: f32,
    pub event: Option<SceneEvent>,
}

impl Session {
    /// Advance one frame. `player_input` is the player's requested position,
    /// or `None` when no player is available this frame.
    pub fn step(&mut self, dt: f32, player_input: Option<[f32; 2]>) -> StepReport {
        self.frame = self.frame.saturating_add(1);

        let (tick, event) = match self.scene {
            Scene::Play => self.step_play_phase(dt, player_input),
            Scene::Level => (TickOutcome::idle(), self.step_level_phase()),
            Scene::GameOver => (TickOutcome::idle(), self.step_game_over_phase()),
        };

        StepReport {
            frame: self.frame,
            scene: self.scene,
            tick,
            distance: world::distance(self.player_pos, self.pursuer_pos),
            event,
        }
    }

    /// Move the player, tick the pursuer, then resolve collision and leveling.
    fn step_play_phase(
        &mut self,
        dt: f32,
        player_input: Option<[f32; 2]>,
    ) -> (TickOutcome, Option<SceneEvent>) {
        if let Some(requested) = player_input {
            self.player_pos = self.bounds.clamp(requested);
        }
        let player = player_input.map(|_| self.player_pos);

        let tick = self.agent.tick(dt, player, self.pursuer_pos, self.bounds);
        // Clamped before the next tick reads the position back. A non-finite
        // step would poison every later feature vector, so it is dropped.
        if tick.delta.iter().all(|d| d.is_finite()) {
            self.pursuer_pos = self.bounds.clamp([
                self.pursuer_pos[0] + tick.delta[0],
                self.pursuer_pos[1] + tick.delta[1],
            ]);
        }
        self.score = self.frame;

        if self.agent.diverged() && self.config.reset_on_divergence {
            warn!(
                "{}: controller diverged at frame {}, re-initializing",
                self.agent.name(),
                self.frame
            );
            self.agent.reset();
            return (tick, Some(SceneEvent::PursuerReset));
        }

        if self.frame > self.wait_frame.saturating_add(self.config.collision_cooldown_frames)
            && world::distance(self.player_pos, self.pursuer_pos) <= self.catch_distance()
        {
            self.wait_frame = self.frame;
            self.scene = Scene::GameOver;
            let level = self.agent.level();
            info!(
                "{} caught by {} after {} frames",
                self.player_name,
                self.agent.name(),
                self.score
            );
            return (
                tick,
                Some(SceneEvent::Caught {
                    score: self.score,
                    level,
                }),
            );
        }

        if tick.level_up_ready {
            self.next_level();
            return (
                tick,
                Some(SceneEvent::LevelUp {
                    level: self.agent.level(),
                }),
            );
        }

        (tick, None)
    }

    fn step_level_phase(&mut self) -> Option<SceneEvent> {
        if self.frame > self.wait_frame.saturating_add(self.config.level_transition_frames) {
            self.wait_frame = self.frame;
            self.scene = Scene::Play;
            return Some(SceneEvent::Resumed);
        }
        None
    }

    fn step_game_over_phase(&mut self) -> Option<SceneEvent> {
        if self.frame > self.wait_frame.saturating_add(self.config.game_over_frames) {
            self.restart();
            return Some(SceneEvent::Restarted);
        }
        None
    }
}
