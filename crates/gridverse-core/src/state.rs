//! Ground-truth state and the agent's observation of it.

use crate::agent::Agent;
use crate::error::InvariantError;
use crate::grid::Grid;
use crate::object::GridObject;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Ground-truth world: one grid plus one agent.
///
/// Transition units mutate a `State` in place through `&mut`; the grid's
/// shape never changes and the agent always stays inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    pub grid: Grid,
    pub agent: Agent,
}

impl State {
    pub fn new(grid: Grid, agent: Agent) -> Result<Self, InvariantError> {
        let state = Self { grid, agent };
        state.check_agent_in_bounds()?;
        Ok(state)
    }

    pub fn check_agent_in_bounds(&self) -> Result<(), InvariantError> {
        let p = self.agent.position();
        if self.grid.contains(p) {
            Ok(())
        } else {
            Err(InvariantError::AgentOutOfBounds { y: p.y, x: p.x })
        }
    }

    /// The object under the agent.
    pub fn agent_cell(&self) -> Result<&GridObject, InvariantError> {
        self.grid.get(self.agent.position())
    }

    /// The object the agent faces, or `None` if it faces the edge of the grid.
    #[must_use]
    pub fn front_object(&self) -> Option<&GridObject> {
        let front = self.agent.front();
        if self.grid.contains(front) {
            self.grid.get(front).ok()
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// Agent-relative, visibility-masked window onto a [`State`].
///
/// Built fresh every step. `agent` is expressed in the window's frame, so its
/// orientation is always north.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Observation {
    pub grid: Grid,
    pub agent: Agent,
}

impl Observation {
    #[must_use]
    pub const fn new(grid: Grid, agent: Agent) -> Self {
        Self { grid, agent }
    }
}
