//! Online-trained neural pursuer.
//!
//! A small feed-forward controller steers an AI chaser toward a player and
//! learns from every Nth observation while the game runs. `PursuitAgent`
//! wraps the controller with leveling, slowdowns and loss bookkeeping;
//! `Session` is a headless game loop around one agent.
//!
//! ```rust
//! use neural_chase_core::{ChaseConfig, PolicyKind, Session};
//!
//! let config = ChaseConfig {
//!     collision_cooldown_frames: 10_000,
//!     ..ChaseConfig::default()
//! };
//! let mut session = Session::new(config.clone());
//! let mut player = PolicyKind::Orbit.build(&config);
//! let summary = session.run_experiment(300, 100, player.as_mut());
//! assert_eq!(summary.samples.len(), 3);
//! assert_eq!(summary.train_steps, 3);
//! ```

pub mod agent;
pub mod config;
pub mod history;
pub mod names;
pub mod nn;
pub mod player;
pub mod session;
pub mod world;

pub use agent::{AgentConfig, AgentTelemetry, PursuitAgent, SlowdownError, TickOutcome};
pub use config::{ChaseConfig, ConfigError};
pub use history::LossHistory;
pub use nn::{NeuralController, ShapeError};
pub use player::{PlayerPolicy, PolicyKind};
pub use session::{run_sweep, ExperimentError, RunError, RunSummary, Scene, Session};
pub use world::WorldBounds;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
