//! Grid-world environment: pipeline units and the [`GridWorld`] orchestrator.
//!
//! A world is assembled from five units, one per stage (reset, transition,
//! reward, terminating, observation), either directly as trait objects or
//! from a [`GridWorldConfig`](gridverse_core::config::GridWorldConfig)
//! resolved through the [`Registries`].
//!
//! ```no_run
//! use gridverse_core::config::GridWorldConfig;
//! use gridverse_core::Action;
//! use gridverse_env::{GridWorld, Registries};
//!
//! let config = GridWorldConfig::from_file("door_key.toml").unwrap();
//! let mut world = GridWorld::from_config(&config, &Registries::with_defaults()).unwrap();
//! world.reset().unwrap();
//! let result = world.step(Action::MoveForward).unwrap();
//! println!("reward {} done {}", result.reward, result.done());
//! ```

pub mod episode;
pub mod gridworld;
pub mod observations;
pub mod registry;
pub mod resets;
pub mod rewards;
pub mod terminations;
pub mod traits;
pub mod transitions;
pub mod visibility;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use episode::{Episode, EpisodeState};
pub use gridworld::{GridWorld, StepResult};
pub use registry::{Constructor, PartialUnit, Registries, Registry};
pub use traits::{
    CompositeReward, CompositeTermination, ObservationFunction, Reduction, ResetFunction,
    RewardFunction, TerminatingFunction, TransitionChain, TransitionFunction, VisibilityFunction,
};
pub use visibility::VisibilityMask;
