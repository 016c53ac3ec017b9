//! Data model for gridverse grid worlds.
//!
//! Geometry, grid objects, grids, agents, states and observations, the
//! action set, declared spaces, errors, seeding and the TOML environment
//! description. Pipeline units and the environment itself live in
//! `gridverse-env`.

pub mod action;
pub mod agent;
pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod object;
pub mod seed;
pub mod spaces;
pub mod state;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use action::Action;
pub use agent::Agent;
pub use error::{ConfigError, GridverseError, InvariantError, LifecycleError};
pub use geometry::{Area, DistanceMetric, Orientation, Pose, Position};
pub use grid::Grid;
pub use object::{Capabilities, Color, DoorStatus, GridObject, ObjectDescriptor, ObjectKind};
pub use seed::GridRng;
pub use state::{Observation, State};
