//! Pipeline-unit contracts and their composites.
//!
//! Ownership encodes the mutation rules: transition units get `&mut State`,
//! reward and terminating units only get `&State` for both the pre- and
//! post-transition snapshots and no generator. Randomness always arrives as
//! an explicit `&mut GridRng`.

use gridverse_core::error::{GridverseError, InvariantError};
use gridverse_core::geometry::Position;
use gridverse_core::grid::Grid;
use gridverse_core::seed::GridRng;
use gridverse_core::{Action, Observation, State};

use crate::visibility::VisibilityMask;

// ---------------------------------------------------------------------------
// ResetFunction
// ---------------------------------------------------------------------------

/// Builds the initial state of an episode.
pub trait ResetFunction: Send + Sync + 'static {
    fn reset(&self, rng: &mut GridRng) -> Result<State, GridverseError>;

    /// Human-readable name for this reset function.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// TransitionFunction
// ---------------------------------------------------------------------------

/// Mutates the state in place in response to an action.
///
/// Implementations may change cell contents and the agent, but never the
/// grid shape, and must draw randomness only from `rng`.
pub trait TransitionFunction: Send + Sync + 'static {
    fn apply(&self, state: &mut State, action: Action, rng: &mut GridRng) -> Result<(), InvariantError>;

    /// Human-readable name for this transition function.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// RewardFunction
// ---------------------------------------------------------------------------

/// Scores a `(state, action, next_state)` transition.
pub trait RewardFunction: Send + Sync + 'static {
    fn reward(&self, state: &State, action: Action, next_state: &State) -> Result<f32, InvariantError>;

    /// Human-readable name for this reward function.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// TerminatingFunction
// ---------------------------------------------------------------------------

/// Decides whether a `(state, action, next_state)` transition ends the episode.
pub trait TerminatingFunction: Send + Sync + 'static {
    fn is_terminal(&self, state: &State, action: Action, next_state: &State) -> bool;

    /// Human-readable name for this terminating function.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// VisibilityFunction
// ---------------------------------------------------------------------------

/// Computes which cells of an agent-relative view are perceivable.
///
/// The returned mask has the shape of `view` and always marks
/// `agent_position` visible.
pub trait VisibilityFunction: Send + Sync + 'static {
    fn visibility(
        &self,
        view: &Grid,
        agent_position: Position,
        rng: &mut GridRng,
    ) -> Result<VisibilityMask, InvariantError>;

    fn name(&self) -> &str;

    /// Whether identical inputs always yield identical masks. Stochastic
    /// functions consume `rng` and return `false`.
    fn is_deterministic(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// ObservationFunction
// ---------------------------------------------------------------------------

/// Derives the agent's observation from the ground-truth state.
pub trait ObservationFunction: Send + Sync + 'static {
    fn observe(&self, state: &State, rng: &mut GridRng) -> Result<Observation, InvariantError>;

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// TransitionChain
// ---------------------------------------------------------------------------

/// Ordered sequence of transition functions, applied one after the other
/// with the same generator.
#[derive(Default)]
pub struct TransitionChain {
    functions: Vec<Box<dyn TransitionFunction>>,
}

impl TransitionChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transition function. Returns `self` for chaining.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, function: Box<dyn TransitionFunction>) -> Self {
        self.functions.push(function);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl TransitionFunction for TransitionChain {
    fn apply(&self, state: &mut State, action: Action, rng: &mut GridRng) -> Result<(), InvariantError> {
        for function in &self.functions {
            function.apply(state, action, rng)?;
        }
        Ok(())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "chain"
    }
}

// ---------------------------------------------------------------------------
// CompositeReward
// ---------------------------------------------------------------------------

/// Sum of several reward functions.
///
/// Use [`breakdown`](Self::breakdown) to inspect individual contributions.
#[derive(Default)]
pub struct CompositeReward {
    rewards: Vec<Box<dyn RewardFunction>>,
}

impl CompositeReward {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reward function. Returns `self` for chaining.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, reward: Box<dyn RewardFunction>) -> Self {
        self.rewards.push(reward);
        self
    }

    /// Compute each component reward and return `(name, value)` pairs.
    pub fn breakdown(
        &self,
        state: &State,
        action: Action,
        next_state: &State,
    ) -> Result<Vec<(&str, f32)>, InvariantError> {
        self.rewards
            .iter()
            .map(|reward| {
                reward
                    .reward(state, action, next_state)
                    .map(|value| (reward.name(), value))
            })
            .collect()
    }
}

impl RewardFunction for CompositeReward {
    fn reward(&self, state: &State, action: Action, next_state: &State) -> Result<f32, InvariantError> {
        let mut total = 0.0;
        for reward in &self.rewards {
            total += reward.reward(state, action, next_state)?;
        }
        Ok(total)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "chain"
    }
}

// ---------------------------------------------------------------------------
// CompositeTermination
// ---------------------------------------------------------------------------

/// How a [`CompositeTermination`] combines its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reduction {
    /// Logical OR. Empty composites never terminate.
    #[default]
    Any,
    /// Logical AND. Empty composites always terminate.
    All,
}

/// OR- or AND-composition of terminating functions.
#[derive(Default)]
pub struct CompositeTermination {
    reduction: Reduction,
    conditions: Vec<Box<dyn TerminatingFunction>>,
}

impl CompositeTermination {
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn all() -> Self {
        Self {
            reduction: Reduction::All,
            conditions: Vec::new(),
        }
    }

    /// Add a terminating function. Returns `self` for chaining.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, condition: Box<dyn TerminatingFunction>) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub const fn reduction(&self) -> Reduction {
        self.reduction
    }
}

impl TerminatingFunction for CompositeTermination {
    fn is_terminal(&self, state: &State, action: Action, next_state: &State) -> bool {
        let mut results = self
            .conditions
            .iter()
            .map(|condition| condition.is_terminal(state, action, next_state));
        match self.reduction {
            Reduction::Any => results.any(|done| done),
            Reduction::All => results.all(|done| done),
        }
    }

    fn name(&self) -> &str {
        match self.reduction {
            Reduction::Any => "reduce_any",
            Reduction::All => "reduce_all",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gridverse_core::geometry::Orientation;
    use gridverse_core::seed::rng_from_seed;
    use gridverse_core::Agent;

    // -- Mocks --

    struct ConstantReward {
        value: f32,
        label: &'static str,
    }

    impl RewardFunction for ConstantReward {
        fn reward(&self, _: &State, _: Action, _: &State) -> Result<f32, InvariantError> {
            Ok(self.value)
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    struct Constant(bool);

    impl TerminatingFunction for Constant {
        fn is_terminal(&self, _: &State, _: Action, _: &State) -> bool {
            self.0
        }

        #[allow(clippy::unnecessary_literal_bound)]
        fn name(&self) -> &str {
            "constant"
        }
    }

    struct StepRight;

    impl TransitionFunction for StepRight {
        fn apply(&self, state: &mut State, _: Action, _: &mut GridRng) -> Result<(), InvariantError> {
            state.agent.pose.position.x += 1;
            Ok(())
        }

        #[allow(clippy::unnecessary_literal_bound)]
        fn name(&self) -> &str {
            "step_right"
        }
    }

    fn state() -> State {
        State::new(
            Grid::new(3, 5).unwrap(),
            Agent::new(Position::new(1, 0), Orientation::North),
        )
        .unwrap()
    }

    // ---- TransitionChain ----

    #[test]
    fn chain_applies_in_order() {
        let chain = TransitionChain::new().add(Box::new(StepRight)).add(Box::new(StepRight));
        let mut s = state();
        let mut rng = rng_from_seed(0);
        chain.apply(&mut s, Action::Actuate, &mut rng).unwrap();
        assert_eq!(s.agent.position(), Position::new(1, 2));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn empty_chain_is_noop() {
        let chain = TransitionChain::new();
        let mut s = state();
        let before = s.clone();
        chain.apply(&mut s, Action::MoveForward, &mut rng_from_seed(0)).unwrap();
        assert_eq!(s, before);
        assert!(chain.is_empty());
    }

    // ---- CompositeReward ----

    #[test]
    fn composite_reward_empty_returns_zero() {
        let reward = CompositeReward::new();
        let s = state();
        assert_relative_eq!(reward.reward(&s, Action::Actuate, &s).unwrap(), 0.0);
    }

    #[test]
    fn composite_reward_is_literal_sum() {
        let reward = CompositeReward::new()
            .add(Box::new(ConstantReward {
                value: 5.0,
                label: "goal",
            }))
            .add(Box::new(ConstantReward {
                value: -0.25,
                label: "living",
            }));
        let s = state();
        assert_relative_eq!(reward.reward(&s, Action::Actuate, &s).unwrap(), 4.75);
    }

    #[test]
    fn composite_reward_breakdown() {
        let reward = CompositeReward::new()
            .add(Box::new(ConstantReward {
                value: 1.0,
                label: "a",
            }))
            .add(Box::new(ConstantReward {
                value: 2.0,
                label: "b",
            }));
        let s = state();
        let breakdown = reward.breakdown(&s, Action::Actuate, &s).unwrap();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].0, "a");
        assert_relative_eq!(breakdown[1].1, 2.0);
    }

    // ---- CompositeTermination ----

    #[test]
    fn any_is_or() {
        let s = state();
        let term = CompositeTermination::any()
            .add(Box::new(Constant(false)))
            .add(Box::new(Constant(true)));
        assert!(term.is_terminal(&s, Action::Actuate, &s));
        let term = CompositeTermination::any().add(Box::new(Constant(false)));
        assert!(!term.is_terminal(&s, Action::Actuate, &s));
        assert!(!CompositeTermination::any().is_terminal(&s, Action::Actuate, &s));
    }

    #[test]
    fn all_is_and() {
        let s = state();
        let term = CompositeTermination::all()
            .add(Box::new(Constant(true)))
            .add(Box::new(Constant(false)));
        assert!(!term.is_terminal(&s, Action::Actuate, &s));
        let term = CompositeTermination::all()
            .add(Box::new(Constant(true)))
            .add(Box::new(Constant(true)));
        assert!(term.is_terminal(&s, Action::Actuate, &s));
        assert_eq!(term.name(), "reduce_all");
        assert_eq!(term.reduction(), Reduction::All);
    }

    // -- Send + Sync --

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn composites_are_send_sync() {
        assert_send_sync::<TransitionChain>();
        assert_send_sync::<CompositeReward>();
        assert_send_sync::<CompositeTermination>();
    }
}
