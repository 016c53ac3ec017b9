//! Reward units.
//!
//! All units are pure functions of `(state, action, next_state)`.

use gridverse_core::error::InvariantError;
use gridverse_core::geometry::DistanceMetric;
use gridverse_core::object::{Capabilities, GridObject, ObjectKind};
use gridverse_core::{Action, State};

use crate::traits::RewardFunction;

fn agent_on(state: &State, kind: ObjectKind) -> Result<bool, InvariantError> {
    Ok(state.agent_cell()?.is(kind))
}

// ---------------------------------------------------------------------------
// LivingReward
// ---------------------------------------------------------------------------

/// Constant reward every step, typically a small penalty.
#[derive(Debug, Clone, Copy)]
pub struct LivingReward {
    pub reward: f32,
}

impl Default for LivingReward {
    fn default() -> Self {
        Self { reward: -1.0 }
    }
}

impl RewardFunction for LivingReward {
    fn reward(&self, _state: &State, _action: Action, _next_state: &State) -> Result<f32, InvariantError> {
        Ok(self.reward)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "living_reward"
    }
}

// ---------------------------------------------------------------------------
// Overlap
// ---------------------------------------------------------------------------

/// `reward_on` when the agent ends the step on an object of `object_type`,
/// `reward_off` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct Overlap {
    pub object_type: ObjectKind,
    pub reward_on: f32,
    pub reward_off: f32,
}

impl Overlap {
    #[must_use]
    pub const fn new(object_type: ObjectKind) -> Self {
        Self {
            object_type,
            reward_on: 1.0,
            reward_off: 0.0,
        }
    }

    /// Overlap with the Exit.
    #[must_use]
    pub const fn reach_exit(reward_on: f32, reward_off: f32) -> Self {
        Self {
            object_type: ObjectKind::Exit,
            reward_on,
            reward_off,
        }
    }
}

impl RewardFunction for Overlap {
    fn reward(&self, _state: &State, _action: Action, next_state: &State) -> Result<f32, InvariantError> {
        Ok(if agent_on(next_state, self.object_type)? {
            self.reward_on
        } else {
            self.reward_off
        })
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

// ---------------------------------------------------------------------------
// BumpMovingObstacle
// ---------------------------------------------------------------------------

/// `reward` when the agent shares its cell with a moving obstacle.
#[derive(Debug, Clone, Copy)]
pub struct BumpMovingObstacle {
    pub reward: f32,
}

impl Default for BumpMovingObstacle {
    fn default() -> Self {
        Self { reward: -1.0 }
    }
}

impl RewardFunction for BumpMovingObstacle {
    fn reward(&self, _state: &State, _action: Action, next_state: &State) -> Result<f32, InvariantError> {
        Ok(if agent_on(next_state, ObjectKind::MovingObstacle)? {
            self.reward
        } else {
            0.0
        })
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "bump_moving_obstacle"
    }
}

// ---------------------------------------------------------------------------
// ProportionalToDistance
// ---------------------------------------------------------------------------

/// `reward_per_unit_distance` times the distance from the agent to the
/// unique object of `object_type` after the step.
#[derive(Debug, Clone, Copy)]
pub struct ProportionalToDistance {
    pub object_type: ObjectKind,
    pub metric: DistanceMetric,
    pub reward_per_unit_distance: f32,
}

impl ProportionalToDistance {
    #[must_use]
    pub const fn new(object_type: ObjectKind) -> Self {
        Self {
            object_type,
            metric: DistanceMetric::Manhattan,
            reward_per_unit_distance: -1.0,
        }
    }
}

impl RewardFunction for ProportionalToDistance {
    fn reward(&self, _state: &State, _action: Action, next_state: &State) -> Result<f32, InvariantError> {
        let target = next_state.grid.unique_position_of(self.object_type)?;
        let distance = self.metric.distance(next_state.agent.position(), target);
        Ok(self.reward_per_unit_distance * distance)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "proportional_to_distance"
    }
}

// ---------------------------------------------------------------------------
// GettingCloser
// ---------------------------------------------------------------------------

/// Rewards changes in distance to the unique object of `object_type`.
///
/// `reward_closer` when the step decreased the distance, `reward_further`
/// when it increased it, zero when unchanged.
#[derive(Debug, Clone, Copy)]
pub struct GettingCloser {
    pub object_type: ObjectKind,
    pub metric: DistanceMetric,
    pub reward_closer: f32,
    pub reward_further: f32,
}

impl GettingCloser {
    #[must_use]
    pub const fn new(object_type: ObjectKind) -> Self {
        Self {
            object_type,
            metric: DistanceMetric::Manhattan,
            reward_closer: 1.0,
            reward_further: -1.0,
        }
    }
}

impl RewardFunction for GettingCloser {
    fn reward(&self, state: &State, _action: Action, next_state: &State) -> Result<f32, InvariantError> {
        let before = self.metric.distance(
            state.agent.position(),
            state.grid.unique_position_of(self.object_type)?,
        );
        let after = self.metric.distance(
            next_state.agent.position(),
            next_state.grid.unique_position_of(self.object_type)?,
        );
        Ok(if after < before {
            self.reward_closer
        } else if after > before {
            self.reward_further
        } else {
            0.0
        })
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "getting_closer"
    }
}

// ---------------------------------------------------------------------------
// BumpIntoWall
// ---------------------------------------------------------------------------

/// `reward` when a move action targets a Wall.
#[derive(Debug, Clone, Copy)]
pub struct BumpIntoWall {
    pub reward: f32,
}

impl Default for BumpIntoWall {
    fn default() -> Self {
        Self { reward: -1.0 }
    }
}

pub(crate) fn bumps_into_wall(state: &State, action: Action) -> bool {
    state
        .agent
        .attempted_position(action)
        .filter(|p| state.grid.contains(*p))
        .is_some_and(|p| state.grid.get(p).is_ok_and(|obj| obj.is(ObjectKind::Wall)))
}

impl RewardFunction for BumpIntoWall {
    fn reward(&self, state: &State, action: Action, _next_state: &State) -> Result<f32, InvariantError> {
        Ok(if bumps_into_wall(state, action) { self.reward } else { 0.0 })
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "bump_into_wall"
    }
}

// ---------------------------------------------------------------------------
// ActuateDoorReward
// ---------------------------------------------------------------------------

/// Rewards the door in front of the agent changing between open and not
/// open. Both snapshots are inspected at the cell in front in `state`.
#[derive(Debug, Clone, Copy)]
pub struct ActuateDoorReward {
    pub reward_open: f32,
    pub reward_close: f32,
}

impl Default for ActuateDoorReward {
    fn default() -> Self {
        Self {
            reward_open: 1.0,
            reward_close: -1.0,
        }
    }
}

impl RewardFunction for ActuateDoorReward {
    fn reward(&self, state: &State, action: Action, next_state: &State) -> Result<f32, InvariantError> {
        if action != Action::Actuate {
            return Ok(0.0);
        }
        let front = state.agent.front();
        if !state.grid.contains(front) {
            return Ok(0.0);
        }
        let before = state.grid.get(front)?;
        let after = next_state.grid.get(front)?;
        if !before.is(ObjectKind::Door) || !after.is(ObjectKind::Door) {
            return Ok(0.0);
        }
        Ok(match (before.is_open_door(), after.is_open_door()) {
            (false, true) => self.reward_open,
            (true, false) => self.reward_close,
            _ => 0.0,
        })
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "actuate_door"
    }
}

// ---------------------------------------------------------------------------
// PickAndDropReward
// ---------------------------------------------------------------------------

/// Rewards picking up and dropping objects of `object_type`.
#[derive(Debug, Clone, Copy)]
pub struct PickAndDropReward {
    pub object_type: ObjectKind,
    pub reward_pick: f32,
    pub reward_drop: f32,
}

impl PickAndDropReward {
    #[must_use]
    pub const fn new(object_type: ObjectKind) -> Self {
        Self {
            object_type,
            reward_pick: 1.0,
            reward_drop: -1.0,
        }
    }

    fn held_target(&self, object: &GridObject) -> bool {
        object.is(self.object_type)
    }
}

impl RewardFunction for PickAndDropReward {
    fn reward(&self, state: &State, _action: Action, next_state: &State) -> Result<f32, InvariantError> {
        let before = self.held_target(&state.agent.held);
        let after = self.held_target(&next_state.agent.held);
        Ok(match (before, after) {
            (false, true) => self.reward_pick,
            (true, false) => self.reward_drop,
            _ => 0.0,
        })
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "pick_n_drop"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gridverse_core::geometry::{Orientation, Position};
    use gridverse_core::grid::Grid;
    use gridverse_core::object::{Color, DoorStatus};
    use gridverse_core::Agent;

    fn state_at(y: i32, x: i32) -> State {
        let mut grid = Grid::new(5, 5).unwrap();
        grid.set(Position::new(0, 0), GridObject::Wall).unwrap();
        grid.set(Position::new(3, 3), GridObject::exit()).unwrap();
        State::new(grid, Agent::new(Position::new(y, x), Orientation::North)).unwrap()
    }

    #[test]
    fn living_reward_is_constant() {
        let s = state_at(1, 1);
        let unit = LivingReward { reward: -0.1 };
        assert_relative_eq!(unit.reward(&s, Action::MoveForward, &s).unwrap(), -0.1);
    }

    #[test]
    fn reach_exit_uses_next_state() {
        let unit = Overlap::reach_exit(5.0, -0.05);
        let off = state_at(2, 3);
        let on = state_at(3, 3);
        assert_relative_eq!(unit.reward(&off, Action::MoveBackward, &on).unwrap(), 5.0);
        assert_relative_eq!(unit.reward(&on, Action::MoveForward, &off).unwrap(), -0.05);
        assert_eq!(unit.name(), "reach_exit");
    }

    #[test]
    fn proportional_to_distance() {
        let unit = ProportionalToDistance::new(ObjectKind::Exit);
        let s = state_at(1, 1);
        assert_relative_eq!(unit.reward(&s, Action::Actuate, &s).unwrap(), -4.0);
    }

    #[test]
    fn proportional_to_distance_requires_unique_target() {
        let unit = ProportionalToDistance::new(ObjectKind::Key);
        let s = state_at(1, 1);
        assert!(matches!(
            unit.reward(&s, Action::Actuate, &s),
            Err(InvariantError::NotUnique { count: 0, .. })
        ));
    }

    #[test]
    fn getting_closer_signs() {
        let unit = GettingCloser::new(ObjectKind::Exit);
        let far = state_at(1, 1);
        let near = state_at(2, 1);
        assert_relative_eq!(unit.reward(&far, Action::MoveBackward, &near).unwrap(), 1.0);
        assert_relative_eq!(unit.reward(&near, Action::MoveForward, &far).unwrap(), -1.0);
        assert_relative_eq!(unit.reward(&far, Action::TurnLeft, &far).unwrap(), 0.0);
    }

    #[test]
    fn bump_into_wall_checks_attempted_cell() {
        let unit = BumpIntoWall::default();
        let s = state_at(1, 0);
        assert_relative_eq!(unit.reward(&s, Action::MoveForward, &s).unwrap(), -1.0);
        assert_relative_eq!(unit.reward(&s, Action::TurnLeft, &s).unwrap(), 0.0);
        assert_relative_eq!(unit.reward(&s, Action::MoveLeft, &s).unwrap(), 0.0);
    }

    #[test]
    fn bump_moving_obstacle() {
        let unit = BumpMovingObstacle::default();
        let mut s = state_at(1, 1);
        assert_relative_eq!(unit.reward(&s, Action::TurnLeft, &s).unwrap(), 0.0);
        s.grid.set(Position::new(1, 1), GridObject::MovingObstacle).unwrap();
        assert_relative_eq!(unit.reward(&s, Action::TurnLeft, &s).unwrap(), -1.0);
    }

    #[test]
    fn actuate_door_rewards_opening_and_closing() {
        let unit = ActuateDoorReward::default();
        let mut closed = state_at(2, 2);
        closed.grid.set(Position::new(1, 2), GridObject::door(DoorStatus::Closed, Color::Red)).unwrap();
        let mut open = closed.clone();
        open.grid.set(Position::new(1, 2), GridObject::door(DoorStatus::Open, Color::Red)).unwrap();
        assert_relative_eq!(unit.reward(&closed, Action::Actuate, &open).unwrap(), 1.0);
        assert_relative_eq!(unit.reward(&open, Action::Actuate, &closed).unwrap(), -1.0);
        assert_relative_eq!(unit.reward(&closed, Action::MoveForward, &open).unwrap(), 0.0);
    }

    #[test]
    fn pick_and_drop_reward() {
        let unit = PickAndDropReward::new(ObjectKind::Key);
        let empty = state_at(2, 2);
        let mut holding = empty.clone();
        holding.agent.held = GridObject::key(Color::Red);
        assert_relative_eq!(unit.reward(&empty, Action::PickAndDrop, &holding).unwrap(), 1.0);
        assert_relative_eq!(unit.reward(&holding, Action::PickAndDrop, &empty).unwrap(), -1.0);
        assert_relative_eq!(unit.reward(&holding, Action::PickAndDrop, &holding).unwrap(), 0.0);
    }

    #[test]
    fn rewards_are_pure() {
        let s = state_at(1, 1);
        let n = state_at(2, 1);
        let (s0, n0) = (s.clone(), n.clone());
        let units: Vec<Box<dyn RewardFunction>> = vec![
            Box::new(LivingReward::default()),
            Box::new(Overlap::new(ObjectKind::Exit)),
            Box::new(GettingCloser::new(ObjectKind::Exit)),
            Box::new(ProportionalToDistance::new(ObjectKind::Exit)),
            Box::new(BumpIntoWall::default()),
        ];
        for unit in &units {
            let a = unit.reward(&s, Action::MoveBackward, &n).unwrap();
            let b = unit.reward(&s, Action::MoveBackward, &n).unwrap();
            assert_relative_eq!(a, b);
        }
        assert_eq!(s, s0);
        assert_eq!(n, n0);
    }
}
