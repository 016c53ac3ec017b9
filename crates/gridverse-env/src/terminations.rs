//! Terminating units. Pure predicates over `(state, action, next_state)`.
//!
//! Composition lives in [`CompositeTermination`](crate::traits::CompositeTermination);
//! the step limit is tracked by the episode, not by a predicate.

use gridverse_core::object::{Capabilities, ObjectKind};
use gridverse_core::{Action, State};

use crate::rewards::bumps_into_wall;
use crate::traits::TerminatingFunction;

/// Ends the episode when the agent stands on an object of `object_type`.
#[derive(Debug, Clone, Copy)]
pub struct OverlapTermination {
    pub object_type: ObjectKind,
}

impl OverlapTermination {
    #[must_use]
    pub const fn new(object_type: ObjectKind) -> Self {
        Self { object_type }
    }

    #[must_use]
    pub const fn reach_exit() -> Self {
        Self::new(ObjectKind::Exit)
    }
}

impl TerminatingFunction for OverlapTermination {
    fn is_terminal(&self, _state: &State, _action: Action, next_state: &State) -> bool {
        next_state
            .agent_cell()
            .is_ok_and(|obj| obj.is(self.object_type))
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        if self.object_type == ObjectKind::Exit {
            "reach_exit"
        } else {
            "overlap"
        }
    }
}

/// Ends the episode when the agent shares its cell with a moving obstacle.
#[derive(Debug, Clone, Copy, Default)]
pub struct BumpMovingObstacleTermination;

impl TerminatingFunction for BumpMovingObstacleTermination {
    fn is_terminal(&self, _state: &State, _action: Action, next_state: &State) -> bool {
        next_state
            .agent_cell()
            .is_ok_and(|obj| obj.kind() == ObjectKind::MovingObstacle)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "bump_moving_obstacle"
    }
}

/// Ends the episode when a move action targets a Wall.
#[derive(Debug, Clone, Copy, Default)]
pub struct BumpIntoWallTermination;

impl TerminatingFunction for BumpIntoWallTermination {
    fn is_terminal(&self, state: &State, action: Action, _next_state: &State) -> bool {
        bumps_into_wall(state, action)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "bump_into_wall"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::CompositeTermination;
    use gridverse_core::geometry::{Orientation, Position};
    use gridverse_core::grid::Grid;
    use gridverse_core::object::GridObject;
    use gridverse_core::Agent;

    fn state_at(y: i32, x: i32) -> State {
        let mut grid = Grid::new(4, 4).unwrap();
        grid.set(Position::new(0, 1), GridObject::Wall).unwrap();
        grid.set(Position::new(3, 3), GridObject::exit()).unwrap();
        grid.set(Position::new(2, 0), GridObject::MovingObstacle).unwrap();
        State::new(grid, Agent::new(Position::new(y, x), Orientation::North)).unwrap()
    }

    #[test]
    fn reach_exit() {
        let unit = OverlapTermination::reach_exit();
        assert!(unit.is_terminal(&state_at(2, 3), Action::MoveBackward, &state_at(3, 3)));
        assert!(!unit.is_terminal(&state_at(3, 3), Action::MoveForward, &state_at(2, 3)));
    }

    #[test]
    fn bump_into_wall_uses_prior_state() {
        let unit = BumpIntoWallTermination;
        let s = state_at(1, 1);
        assert!(unit.is_terminal(&s, Action::MoveForward, &s));
        assert!(!unit.is_terminal(&s, Action::MoveBackward, &s));
    }

    #[test]
    fn bump_moving_obstacle() {
        let unit = BumpMovingObstacleTermination;
        assert!(unit.is_terminal(&state_at(1, 0), Action::MoveBackward, &state_at(2, 0)));
        assert!(!unit.is_terminal(&state_at(1, 0), Action::TurnLeft, &state_at(1, 0)));
    }

    #[test]
    fn any_of_exit_or_obstacle() {
        let term = CompositeTermination::any()
            .add(Box::new(OverlapTermination::reach_exit()))
            .add(Box::new(BumpMovingObstacleTermination));
        let s = state_at(1, 1);
        assert!(term.is_terminal(&s, Action::MoveForward, &state_at(2, 0)));
        assert!(term.is_terminal(&s, Action::MoveForward, &state_at(3, 3)));
        assert!(!term.is_terminal(&s, Action::MoveForward, &state_at(1, 2)));
    }
}
