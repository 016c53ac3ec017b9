//! Rollout helpers for tests.
//!
//! Thin wrappers around common episode operations that reduce boilerplate
//! in integration tests.

use gridverse_core::{Action, GridverseError, LifecycleError, Observation, State};
use gridverse_env::gridworld::GridWorld;

/// Everything one step produced, plus the state it led to.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub action: Action,
    pub observation: Observation,
    pub reward: f32,
    pub done: bool,
    pub state: State,
}

/// Reset `world`, then apply `actions` until they run out or the episode
/// ends. Returns the initial observation and one record per step taken.
pub fn rollout(
    world: &mut GridWorld,
    seed: u64,
    actions: &[Action],
) -> Result<(Observation, Vec<Transition>), GridverseError> {
    let initial = world.reset_with_seed(seed)?;
    let mut transitions = Vec::with_capacity(actions.len());
    for &action in actions {
        let result = world.step(action)?;
        let done = result.done();
        let state = world.state().cloned().ok_or(LifecycleError::Uninitialized)?;
        transitions.push(Transition {
            action,
            observation: result.observation,
            reward: result.reward,
            done,
            state,
        });
        if done {
            break;
        }
    }
    Ok((initial, transitions))
}

/// Rewards of a rollout, in order.
pub fn rewards(transitions: &[Transition]) -> Vec<f32> {
    transitions.iter().map(|t| t.reward).collect()
}

/// Done flags of a rollout, in order.
pub fn dones(transitions: &[Transition]) -> Vec<bool> {
    transitions.iter().map(|t| t.done).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::exit_room_world;

    #[test]
    fn rollout_stops_when_done() {
        let mut world = exit_room_world(0);
        let actions = [
            Action::MoveForward,
            Action::MoveForward,
            Action::MoveForward,
            Action::TurnRight,
            Action::MoveForward,
            Action::MoveForward,
            Action::MoveForward,
            Action::MoveForward,
        ];
        let (_, steps) = rollout(&mut world, 0, &actions).unwrap();
        assert_eq!(steps.len(), 6);
        assert_eq!(dones(&steps).last(), Some(&true));
    }
}
