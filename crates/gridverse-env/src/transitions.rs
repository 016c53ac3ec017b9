//! Transition units: in-place state mechanics.
//!
//! Each unit reacts to a subset of actions and leaves the state untouched
//! otherwise. Random draws only happen when a unit actually applies, so the
//! generator is consumed identically for identical trajectories.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::trace;

use gridverse_core::error::{ConfigError, InvariantError};
use gridverse_core::geometry::{Position, manhattan_boundary};
use gridverse_core::object::{Capabilities, DoorStatus, GridObject, ObjectKind};
use gridverse_core::seed::GridRng;
use gridverse_core::{Action, State};

use crate::traits::TransitionFunction;

fn check_probability(unit: &str, probability: f64) -> Result<f64, ConfigError> {
    if (0.0..=1.0).contains(&probability) {
        Ok(probability)
    } else {
        Err(ConfigError::InvalidParameter {
            unit: unit.into(),
            key: "failure_probability".into(),
            message: format!("must lie in [0, 1], got {probability}"),
        })
    }
}

/// `true` with probability `p`, without touching the generator when `p == 0`.
fn fails(rng: &mut GridRng, p: f64) -> bool {
    p > 0.0 && rng.gen_bool(p)
}

// ---------------------------------------------------------------------------
// MoveAgent
// ---------------------------------------------------------------------------

/// Moves the agent one cell for the four move actions.
///
/// The move happens only when the target is inside the grid and does not
/// block movement. With `failure_probability > 0` the action is dropped at
/// random.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveAgent {
    failure_probability: f64,
}

impl MoveAgent {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            failure_probability: 0.0,
        }
    }

    pub fn with_failure_probability(failure_probability: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            failure_probability: check_probability("move_agent", failure_probability)?,
        })
    }
}

impl TransitionFunction for MoveAgent {
    fn apply(&self, state: &mut State, action: Action, rng: &mut GridRng) -> Result<(), InvariantError> {
        let Some(target) = state.agent.attempted_position(action) else {
            return Ok(());
        };
        if fails(rng, self.failure_probability) {
            trace!(%action, "move dropped");
            return Ok(());
        }
        if state.grid.contains(target) && !state.grid.get(target)?.blocks_movement() {
            state.agent.pose.position = target;
        }
        Ok(())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "move_agent"
    }
}

// ---------------------------------------------------------------------------
// TurnAgent
// ---------------------------------------------------------------------------

/// Rotates the agent a quarter turn for the two turn actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnAgent {
    failure_probability: f64,
}

impl TurnAgent {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            failure_probability: 0.0,
        }
    }

    pub fn with_failure_probability(failure_probability: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            failure_probability: check_probability("turn_agent", failure_probability)?,
        })
    }
}

impl TransitionFunction for TurnAgent {
    fn apply(&self, state: &mut State, action: Action, rng: &mut GridRng) -> Result<(), InvariantError> {
        if !action.is_turn() || fails(rng, self.failure_probability) {
            return Ok(());
        }
        let orientation = &mut state.agent.pose.orientation;
        *orientation = match action {
            Action::TurnLeft => orientation.rotate_left(),
            _ => orientation.rotate_right(),
        };
        Ok(())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "turn_agent"
    }
}

// ---------------------------------------------------------------------------
// PickAndDrop
// ---------------------------------------------------------------------------

/// Moves a holdable object between the cell in front and the agent's hand.
///
/// Pick needs an empty hand; drop needs a Floor cell in front. Nothing is
/// swapped, so every cell keeps exactly one occupant.
#[derive(Debug, Clone, Copy, Default)]
pub struct PickAndDrop;

impl TransitionFunction for PickAndDrop {
    fn apply(&self, state: &mut State, action: Action, _rng: &mut GridRng) -> Result<(), InvariantError> {
        if action != Action::PickAndDrop {
            return Ok(());
        }
        let front = state.agent.front();
        if !state.grid.contains(front) {
            return Ok(());
        }
        let cell = state.grid.get(front)?;
        if state.agent.is_empty_handed() {
            if cell.holdable() {
                state.agent.held = state.grid.set(front, GridObject::Floor)?;
            }
        } else if cell.is(ObjectKind::Floor) {
            let held = std::mem::replace(&mut state.agent.held, GridObject::NoneObject);
            state.grid.set(front, held)?;
        }
        Ok(())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "pick_n_drop"
    }
}

// ---------------------------------------------------------------------------
// ActuateDoor
// ---------------------------------------------------------------------------

/// Door state machine, driven by the actuate action on the door in front.
///
/// Closed and Open toggle. Locked becomes Closed when the agent holds a key
/// of the door's color; the key is consumed. Otherwise Locked stays Locked.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActuateDoor;

impl TransitionFunction for ActuateDoor {
    fn apply(&self, state: &mut State, action: Action, _rng: &mut GridRng) -> Result<(), InvariantError> {
        if action != Action::Actuate {
            return Ok(());
        }
        let front = state.agent.front();
        if !state.grid.contains(front) {
            return Ok(());
        }
        let held_key = match state.agent.held {
            GridObject::Key { color } => Some(color),
            _ => None,
        };
        let GridObject::Door { status, color } = state.grid.get_mut(front)? else {
            return Ok(());
        };
        match *status {
            DoorStatus::Open => *status = DoorStatus::Closed,
            DoorStatus::Closed => *status = DoorStatus::Open,
            DoorStatus::Locked if held_key == Some(*color) => {
                *status = DoorStatus::Closed;
                state.agent.held = GridObject::NoneObject;
            }
            DoorStatus::Locked => {}
        }
        Ok(())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "actuate_door"
    }
}

// ---------------------------------------------------------------------------
// ActuateBox
// ---------------------------------------------------------------------------

/// Breaks the box in front, leaving its content in the cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActuateBox;

impl TransitionFunction for ActuateBox {
    fn apply(&self, state: &mut State, action: Action, _rng: &mut GridRng) -> Result<(), InvariantError> {
        if action != Action::Actuate {
            return Ok(());
        }
        let front = state.agent.front();
        if !state.grid.contains(front) {
            return Ok(());
        }
        let cell = state.grid.get_mut(front)?;
        if let GridObject::Box { content } = cell {
            let content = std::mem::take(content.as_mut());
            *cell = content;
        }
        Ok(())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "actuate_box"
    }
}

// ---------------------------------------------------------------------------
// MoveObstacles
// ---------------------------------------------------------------------------

/// Every moving obstacle steps to a random adjacent Floor cell.
///
/// Obstacles are visited in row-major order of their positions at the start
/// of the step. An obstacle with no adjacent Floor stays put. The agent's
/// cell is not excluded: an obstacle may move onto the agent, which is what
/// the bump reward and termination detect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveObstacles;

impl TransitionFunction for MoveObstacles {
    fn apply(&self, state: &mut State, _action: Action, rng: &mut GridRng) -> Result<(), InvariantError> {
        for position in state.grid.positions_of(ObjectKind::MovingObstacle) {
            let candidates: Vec<Position> = manhattan_boundary(position, 1)
                .into_iter()
                .filter(|p| state.grid.contains(*p))
                .filter(|p| state.grid.get(*p).is_ok_and(|obj| obj.is(ObjectKind::Floor)))
                .collect();
            if let Some(&target) = candidates.choose(rng) {
                state.grid.swap(position, target)?;
            }
        }
        Ok(())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "move_obstacles"
    }
}

// ---------------------------------------------------------------------------
// Teleport
// ---------------------------------------------------------------------------

/// Relocates an agent standing on a telepod to another telepod of the same
/// color, chosen uniformly. No partner means no effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Teleport;

impl TransitionFunction for Teleport {
    fn apply(&self, state: &mut State, _action: Action, rng: &mut GridRng) -> Result<(), InvariantError> {
        let here = state.agent.position();
        let GridObject::Telepod { color } = *state.grid.get(here)? else {
            return Ok(());
        };
        let partners: Vec<Position> = state
            .grid
            .iter()
            .filter(|(p, obj)| *p != here && **obj == GridObject::telepod(color))
            .map(|(p, _)| p)
            .collect();
        if let Some(&target) = partners.choose(rng) {
            trace!(from = %here, to = %target, "teleport");
            state.agent.pose.position = target;
        }
        Ok(())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "teleport"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
