//! Scripted stand-ins for the human player, used by headless runs.

use crate::config::ChaseConfig;
use crate::world::WorldBounds;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt, str::FromStr};

pub trait PlayerPolicy {
    /// Player position for this frame, or `None` if the player is not
    /// available yet.
    fn position(
        &mut self,
        frame: u64,
        dt: f32,
        pursuer: [f32; 2],
        bounds: WorldBounds,
    ) -> Option<[f32; 2]>;
}

/// Never moves.
#[derive(Clone, Copy, Debug)]
pub struct Stationary {
    pub at: [f32; 2],
}

impl PlayerPolicy for Stationary {
    fn position(&mut self, _: u64, _: f32, _: [f32; 2], bounds: WorldBounds) -> Option<[f32; 2]> {
        Some(bounds.clamp(self.at))
    }
}

/// Circles the origin at a fixed angular speed (rad/s).
#[derive(Clone, Copy, Debug)]
pub struct Orbit {
    pub radius: f32,
    pub angular_speed: f32,
}

impl PlayerPolicy for Orbit {
    fn position(
        &mut self,
        frame: u64,
        dt: f32,
        _: [f32; 2],
        bounds: WorldBounds,
    ) -> Option<[f32; 2]> {
        let theta = frame as f32 * dt * self.angular_speed;
        Some(bounds.clamp([self.radius * theta.cos(), self.radius * theta.sin()]))
    }
}

/// Runs straight away from the pursuer at `speed` units/s, sliding along walls.
#[derive(Clone, Copy, Debug)]
pub struct Evader {
    pub position: [f32; 2],
    pub speed: f32,
}

impl PlayerPolicy for Evader {
    fn position(
        &mut self,
        _: u64,
        dt: f32,
        pursuer: [f32; 2],
        bounds: WorldBounds,
    ) -> Option<[f32; 2]> {
        let dx = self.position[0] - pursuer[0];
        let dy = self.position[1] - pursuer[1];
        let len = (dx * dx + dy * dy).sqrt();
        if len > f32::EPSILON {
            let step = self.speed * dt / len;
            self.position = bounds.clamp([
                self.position[0] + dx * step,
                self.position[1] + dy * step,
            ]);
        }
        Some(self.position)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Stationary,
    Orbit,
    Evader,
}

impl PolicyKind {
    pub fn build(self, config: &ChaseConfig) -> Box<dyn PlayerPolicy + Send> {
        let [hw, hh] = config.bounds().half_extents();
        match self {
            PolicyKind::Stationary => Box::new(Stationary {
                at: config.player_start,
            }),
            PolicyKind::Orbit => Box::new(Orbit {
                radius: hw.min(hh) * 0.8,
                angular_speed: 0.5,
            }),
            PolicyKind::Evader => Box::new(Evader {
                position: config.player_start,
                speed: 2.0,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPolicy(pub String);

impl fmt::Display for UnknownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown player policy '{}' (expected stationary, orbit or evader)",
            self.0
        )
    }
}

impl Error for UnknownPolicy {}

impl FromStr for PolicyKind {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stationary" => Ok(PolicyKind::Stationary),
            "orbit" => Ok(PolicyKind::Orbit),
            "evader" | "evade" => Ok(PolicyKind::Evader),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: WorldBounds = WorldBounds {
        width: 7.2,
        height: 12.8,
    };

    #[test]
    fn evader_moves_away_and_stays_on_field() {
        let mut evader = Evader {
            position: [0.0, -3.0],
            speed: 2.0,
        };
        let first = evader.position(1, 0.5, [0.0, 3.0], BOUNDS).unwrap();
        assert!((first[1] - -4.0).abs() < 1e-6);
        for frame in 2..100 {
            let p = evader.position(frame, 0.5, [0.0, 3.0], BOUNDS).unwrap();
            assert!(BOUNDS.contains(p));
        }
        assert_eq!(evader.position, [0.0, -6.4]);
    }

    #[test]
    fn orbit_keeps_radius() {
        let mut orbit = Orbit {
            radius: 2.0,
            angular_speed: 1.0,
        };
        for frame in 0..50 {
            let p = orbit.position(frame, 0.1, [0.0, 0.0], BOUNDS).unwrap();
            let r = (p[0] * p[0] + p[1] * p[1]).sqrt();
            assert!((r - 2.0).abs() < 1e-5);
        }
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("orbit".parse::<PolicyKind>(), Ok(PolicyKind::Orbit));
        assert_eq!("Evade".parse::<PolicyKind>(), Ok(PolicyKind::Evader));
        let err = "mouse".parse::<PolicyKind>().unwrap_err();
        assert!(err.to_string().contains("mouse"));
    }
}
