use crate::action::Action;
use crate::geometry::{Orientation, Pose, Position};
use crate::object::GridObject;

/// The agent: a pose plus the single object it holds.
///
/// `held` is [`GridObject::NoneObject`] when the hand is empty. The agent
/// owns the held instance; it is not present in the grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Agent {
    pub pose: Pose,
    pub held: GridObject,
}

impl Agent {
    #[must_use]
    pub const fn new(position: Position, orientation: Orientation) -> Self {
        Self {
            pose: Pose::new(position, orientation),
            held: GridObject::NoneObject,
        }
    }

    #[must_use]
    pub fn holding(mut self, object: GridObject) -> Self {
        self.held = object;
        self
    }

    #[must_use]
    pub const fn position(&self) -> Position {
        self.pose.position
    }

    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.pose.orientation
    }

    /// The cell the agent faces.
    #[must_use]
    pub fn front(&self) -> Position {
        self.pose.front()
    }

    /// Where a move action would take the agent, ignoring obstacles.
    /// `None` for non-move actions.
    #[must_use]
    pub fn attempted_position(&self, action: Action) -> Option<Position> {
        action.local_delta().map(|delta| self.pose.apply(delta))
    }

    #[must_use]
    pub const fn is_empty_handed(&self) -> bool {
        self.held.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Color;

    #[test]
    fn new_agent_is_empty_handed() {
        let agent = Agent::new(Position::new(1, 1), Orientation::East);
        assert!(agent.is_empty_handed());
        assert!(!agent.clone().holding(GridObject::key(Color::Red)).is_empty_handed());
    }

    #[test]
    fn attempted_positions_follow_orientation() {
        let agent = Agent::new(Position::new(2, 2), Orientation::East);
        assert_eq!(agent.front(), Position::new(2, 3));
        assert_eq!(agent.attempted_position(Action::MoveForward), Some(Position::new(2, 3)));
        assert_eq!(agent.attempted_position(Action::MoveBackward), Some(Position::new(2, 1)));
        assert_eq!(agent.attempted_position(Action::MoveLeft), Some(Position::new(1, 2)));
        assert_eq!(agent.attempted_position(Action::MoveRight), Some(Position::new(3, 2)));
        assert_eq!(agent.attempted_position(Action::Actuate), None);
    }
}
