//! Shared test fixtures and utilities for Gridverse crates.
//!
//! Provides deterministic RNG setup, canned layouts and worlds, and rollout
//! helpers.

pub mod episodes;
pub mod fixtures;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use episodes::{Transition, dones, rewards, rollout};
pub use fixtures::{
    DOOR_ROOM, EXIT_ROOM, door_room_world, exit_room_world, grid_with_walls, layout_state,
    open_state, standard_transitions,
};
pub use rng::{random_actions, seeded_rng};
