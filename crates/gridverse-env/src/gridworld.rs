//! The environment orchestrator.
//!
//! [`GridWorld`] owns the ground-truth [`State`], the single environment
//! generator and one unit per pipeline stage. A step runs
//! transition, observation, reward and termination in that order on a copy of
//! the state and commits it only when every stage succeeded.

use tracing::{debug, info};

use gridverse_core::config::GridWorldConfig;
use gridverse_core::error::{ConfigError, GridverseError, InvariantError, LifecycleError};
use gridverse_core::seed::{GridRng, make_rng, rng_from_seed};
use gridverse_core::spaces::{ObservationSpace, StateSpace};
use gridverse_core::{Action, Observation, State};

use crate::episode::Episode;
use crate::registry::Registries;
use crate::traits::{
    ObservationFunction, ResetFunction, RewardFunction, TerminatingFunction, TransitionFunction,
};

// ---------------------------------------------------------------------------
// StepResult
// ---------------------------------------------------------------------------

/// Outcome of one [`GridWorld::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f32,
    /// The terminating function fired.
    pub terminated: bool,
    /// The step limit was reached without termination.
    pub truncated: bool,
}

impl StepResult {
    /// Whether the episode is over, for either reason.
    #[must_use]
    pub const fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// A scored step, not yet committed.
struct Outcome {
    next: State,
    observation: Observation,
    reward: f32,
    terminated: bool,
}

// ---------------------------------------------------------------------------
// GridWorld
// ---------------------------------------------------------------------------

pub struct GridWorld {
    reset_function: Box<dyn ResetFunction>,
    transition_function: Box<dyn TransitionFunction>,
    reward_function: Box<dyn RewardFunction>,
    terminating_function: Box<dyn TerminatingFunction>,
    observation_function: Box<dyn ObservationFunction>,
    state_space: Option<StateSpace>,
    observation_space: Option<ObservationSpace>,
    max_steps: Option<u32>,
    seed: u64,
    rng: GridRng,
    state: Option<State>,
    observation: Option<Observation>,
    episode: Episode,
}

impl GridWorld {
    /// Assemble an environment from its five units. The generator is seeded
    /// from entropy until [`set_seed`](Self::set_seed) is called.
    #[must_use]
    pub fn new(
        reset_function: Box<dyn ResetFunction>,
        transition_function: Box<dyn TransitionFunction>,
        reward_function: Box<dyn RewardFunction>,
        terminating_function: Box<dyn TerminatingFunction>,
        observation_function: Box<dyn ObservationFunction>,
    ) -> Self {
        let (seed, rng) = make_rng(None);
        Self {
            reset_function,
            transition_function,
            reward_function,
            terminating_function,
            observation_function,
            state_space: None,
            observation_space: None,
            max_steps: None,
            seed,
            rng,
            state: None,
            observation: None,
            episode: Episode::default(),
        }
    }

    /// Builder: truncate episodes after `max_steps` steps.
    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Builder: seed the environment generator.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.set_seed(seed);
        self
    }

    /// Builder: check every state and observation against these spaces.
    #[must_use]
    pub fn with_spaces(mut self, state_space: StateSpace, observation_space: ObservationSpace) -> Self {
        self.state_space = Some(state_space);
        self.observation_space = Some(observation_space);
        self
    }

    /// Resolve every unit of `config` through `registries`.
    ///
    /// The observation unit receives the observation space's `shape` and
    /// `agent_position` unless the description sets them itself, in which
    /// case they must agree with the space.
    pub fn from_config(config: &GridWorldConfig, registries: &Registries) -> Result<Self, ConfigError> {
        config.validate()?;
        let state_space = config.state_space()?;
        let observation_space = config.observation_space()?;

        let mut observation = registries.observation.partial(&config.observation)?;
        let mut defaults = toml::Table::new();
        defaults.insert(
            "shape".into(),
            toml::Value::Array(vec![
                window_extent(observation_space.height)?,
                window_extent(observation_space.width)?,
            ]),
        );
        defaults.insert(
            "agent_position".into(),
            toml::Value::Array(vec![
                observation_space.agent_position.y.into(),
                observation_space.agent_position.x.into(),
            ]),
        );
        observation.bind_defaults(&defaults);
        check_binding(observation.params(), "shape", &defaults)?;
        check_binding(observation.params(), "agent_position", &defaults)?;

        let mut world = Self::new(
            registries.reset.build(&config.reset, registries)?,
            registries.transition.build(&config.transition, registries)?,
            registries.reward.build(&config.reward, registries)?,
            registries.terminating.build(&config.terminating, registries)?,
            observation.build(registries)?,
        )
        .with_spaces(state_space, observation_space);
        world.max_steps = config.max_steps;
        if let Some(seed) = config.seed {
            world.set_seed(seed);
        }
        info!(
            reset = world.reset_function.name(),
            transition = world.transition_function.name(),
            reward = world.reward_function.name(),
            terminating = world.terminating_function.name(),
            observation = world.observation_function.name(),
            "assembled gridworld"
        );
        Ok(world)
    }

    /// Reseed the environment generator. Takes effect immediately.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = rng_from_seed(seed);
    }

    /// Start a new episode, continuing the current generator stream.
    pub fn reset(&mut self) -> Result<Observation, GridverseError> {
        self.reset_inner(None)
    }

    /// Reseed, then start a new episode.
    pub fn reset_with_seed(&mut self, seed: u64) -> Result<Observation, GridverseError> {
        self.set_seed(seed);
        self.reset_inner(Some(seed))
    }

    fn reset_inner(&mut self, seed: Option<u64>) -> Result<Observation, GridverseError> {
        let state = self.reset_function.reset(&mut self.rng)?;
        state.check_agent_in_bounds()?;
        self.check_state(&state)?;
        let observation = self.observation_function.observe(&state, &mut self.rng)?;
        self.check_observation(&observation)?;

        self.episode.reset(seed.or(Some(self.seed)));
        info!(
            episode = self.episode.episode_number,
            seed = self.seed,
            height = state.grid.height(),
            width = state.grid.width(),
            "reset"
        );
        self.state = Some(state);
        self.observation = Some(observation.clone());
        Ok(observation)
    }

    /// Advance the episode by one action.
    ///
    /// Fails with [`LifecycleError`] before the first reset and after the
    /// episode has ended. On any error the world is left as it was, random
    /// generator included, so a retry replays the same draws.
    pub fn step(&mut self, action: Action) -> Result<StepResult, GridverseError> {
        self.episode.state.require_ready()?;
        let rng_before = self.rng.clone();
        let outcome = self.evaluate(action).and_then(|outcome| {
            self.episode.advance(outcome.reward)?;
            Ok(outcome)
        });
        let Outcome {
            next,
            observation,
            reward,
            terminated,
        } = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                self.rng = rng_before;
                return Err(err);
            }
        };

        let truncated = if terminated {
            self.episode.terminate();
            false
        } else {
            self.episode.check_truncation(self.max_steps)
        };
        debug!(
            %action,
            reward,
            terminated,
            truncated,
            step = self.episode.step_count,
            "step"
        );
        if truncated {
            info!(steps = self.episode.step_count, "episode truncated");
        }

        self.state = Some(next);
        self.observation = Some(observation.clone());
        Ok(StepResult {
            observation,
            reward,
            terminated,
            truncated,
        })
    }

    /// Transition, observe and score `action` without committing anything
    /// but generator draws.
    fn evaluate(&mut self, action: Action) -> Result<Outcome, GridverseError> {
        let state = self.state.as_ref().ok_or(LifecycleError::Uninitialized)?;

        let mut next = state.clone();
        self.transition_function.apply(&mut next, action, &mut self.rng)?;
        if next.grid.shape() != state.grid.shape() {
            return Err(InvariantError::ShapeMismatch {
                expected_height: state.grid.height(),
                expected_width: state.grid.width(),
                height: next.grid.height(),
                width: next.grid.width(),
            }
            .into());
        }
        next.check_agent_in_bounds()?;
        self.check_state(&next)?;

        let observation = self.observation_function.observe(&next, &mut self.rng)?;
        self.check_observation(&observation)?;
        let reward = self.reward_function.reward(state, action, &next)?;
        let terminated = self.terminating_function.is_terminal(state, action, &next);
        Ok(Outcome {
            next,
            observation,
            reward,
            terminated,
        })
    }

    fn check_state(&self, state: &State) -> Result<(), InvariantError> {
        match &self.state_space {
            Some(space) if !space.contains(state) => Err(InvariantError::StateOutsideSpace),
            _ => Ok(()),
        }
    }

    fn check_observation(&self, observation: &Observation) -> Result<(), InvariantError> {
        match &self.observation_space {
            Some(space) if !space.contains(observation) => Err(InvariantError::ObservationOutsideSpace),
            _ => Ok(()),
        }
    }

    // -- Accessors --

    /// Current ground-truth state; `None` before the first reset.
    #[must_use]
    pub const fn state(&self) -> Option<&State> {
        self.state.as_ref()
    }

    /// Latest observation; `None` before the first reset.
    #[must_use]
    pub const fn observation(&self) -> Option<&Observation> {
        self.observation.as_ref()
    }

    #[must_use]
    pub const fn episode(&self) -> &Episode {
        &self.episode
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn max_steps(&self) -> Option<u32> {
        self.max_steps
    }

    #[must_use]
    pub const fn state_space(&self) -> Option<&StateSpace> {
        self.state_space.as_ref()
    }

    #[must_use]
    pub const fn observation_space(&self) -> Option<&ObservationSpace> {
        self.observation_space.as_ref()
    }
}

fn window_extent(extent: usize) -> Result<toml::Value, ConfigError> {
    i64::try_from(extent)
        .map(toml::Value::Integer)
        .map_err(|_| ConfigError::InvalidValue {
            field: "observation_space.shape".into(),
            message: format!("{extent} is too large"),
        })
}

fn check_binding(
    params: &gridverse_core::config::Params,
    key: &str,
    expected: &toml::Table,
) -> Result<(), ConfigError> {
    let bound = params.optional_pair(key)?;
    let wanted = expected.get(key).and_then(|value| match value.as_array().map(Vec::as_slice) {
        Some([toml::Value::Integer(a), toml::Value::Integer(b)]) => Some([*a, *b]),
        _ => None,
    });
    if bound == wanted {
        Ok(())
    } else {
        Err(ConfigError::Incompatible(format!(
            "observation `{key}` {bound:?} disagrees with the observation space {wanted:?}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gridverse_core::config::UnitConfig;
    use gridverse_core::geometry::Position;

    use crate::observations::FromVisibility;
    use crate::resets::LayoutReset;
    use crate::rewards::LivingReward;
    use crate::terminations::OverlapTermination;
    use crate::traits::TransitionChain;
    use crate::transitions::{MoveAgent, TurnAgent};

    const CORRIDOR: [&str; 3] = ["#####", "#>.E#", "#####"];

    fn corridor() -> GridWorld {
        GridWorld::new(
            Box::new(LayoutReset::new(&CORRIDOR).unwrap()),
            Box::new(TransitionChain::new().add(Box::new(MoveAgent::new())).add(Box::new(TurnAgent::new()))),
            Box::new(LivingReward { reward: -0.5 }),
            Box::new(OverlapTermination::reach_exit()),
            Box::new(FromVisibility::new(3, 3).unwrap()),
        )
        .with_seed(1)
    }

    #[test]
    fn step_before_reset_fails() {
        let mut world = corridor();
        let err = world.step(Action::MoveForward).unwrap_err();
        assert!(matches!(err, GridverseError::Lifecycle(LifecycleError::Uninitialized)));
        assert!(world.state().is_none());
    }

    #[test]
    fn episode_reaches_exit() {
        let mut world = corridor();
        let obs = world.reset().unwrap();
        assert_eq!(obs.agent.position(), Position::new(2, 1));

        let first = world.step(Action::MoveForward).unwrap();
        assert!(!first.done());
        assert_relative_eq!(first.reward, -0.5);

        let second = world.step(Action::MoveForward).unwrap();
        assert!(second.terminated);
        assert!(!second.truncated);
        assert_eq!(world.state().unwrap().agent.position(), Position::new(1, 3));
        assert_relative_eq!(world.episode().total_reward, -1.0);
        assert_eq!(world.episode().step_count, 2);

        let err = world.step(Action::MoveForward).unwrap_err();
        assert!(matches!(err, GridverseError::Lifecycle(LifecycleError::EpisodeDone)));
    }

    #[test]
    fn truncation_at_step_limit() {
        let mut world = corridor().with_max_steps(2);
        world.reset().unwrap();
        let first = world.step(Action::TurnLeft).unwrap();
        assert!(!first.done());
        let second = world.step(Action::TurnLeft).unwrap();
        assert!(second.truncated);
        assert!(!second.terminated);
        assert!(second.done());
        assert!(world.episode().is_done());
    }

    #[test]
    fn reset_recovers_from_done() {
        let mut world = corridor().with_max_steps(1);
        world.reset().unwrap();
        world.step(Action::TurnLeft).unwrap();
        world.reset().unwrap();
        assert!(world.step(Action::TurnLeft).is_ok());
        assert_eq!(world.episode().episode_number, 2);
    }

    #[test]
    fn reset_with_seed_records_seed() {
        let mut world = corridor();
        world.reset_with_seed(99).unwrap();
        assert_eq!(world.seed(), 99);
        assert_eq!(world.episode().seed, Some(99));
    }

    #[test]
    fn state_outside_space_is_rejected() {
        use gridverse_core::object::{Color, ObjectKind};
        let state_space = StateSpace::new(3, 5, [ObjectKind::Floor, ObjectKind::Wall], [Color::None]).unwrap();
        let observation_space = ObservationSpace::new(
            3,
            3,
            [ObjectKind::Floor, ObjectKind::Wall, ObjectKind::Exit],
            [Color::None],
        )
        .unwrap();
        let mut world = corridor().with_spaces(state_space, observation_space);
        let err = world.reset().unwrap_err();
        assert!(matches!(err, GridverseError::Invariant(InvariantError::StateOutsideSpace)));
    }

    const CONFIG: &str = r######"
        max_steps = 10
        seed = 3

        [state_space]
        shape = [3, 5]
        objects = ["Floor", "Wall", "Exit"]

        [observation_space]
        shape = [3, 3]
        objects = ["Floor", "Wall", "Exit"]

        [reset]
        name = "layout"
        rows = ["#####", "#>.E#", "#####"]

        [transition]
        name = "move_agent"

        [reward]
        name = "reach_exit"
        reward_on = 5.0
        reward_off = -0.05

        [observation]
        name = "from_visibility"

        [terminating]
        name = "reach_exit"
    "######;

    #[test]
    fn from_config_late_binds_observation_shape() {
        let config = GridWorldConfig::from_toml_str(CONFIG).unwrap();
        let mut world = GridWorld::from_config(&config, &Registries::with_defaults()).unwrap();
        assert_eq!(world.max_steps(), Some(10));
        assert_eq!(world.seed(), 3);
        let obs = world.reset().unwrap();
        assert_eq!(obs.grid.shape(), (3, 3));
        world.step(Action::MoveForward).unwrap();
        let last = world.step(Action::MoveForward).unwrap();
        assert_relative_eq!(last.reward, 5.0);
        assert!(last.terminated);
    }

    #[test]
    fn from_config_rejects_conflicting_shape() {
        let mut config = GridWorldConfig::from_toml_str(CONFIG).unwrap();
        config.observation = UnitConfig::new("from_visibility")
            .with("shape", toml::Value::Array(vec![5.into(), 5.into()]));
        let err = GridWorld::from_config(&config, &Registries::with_defaults()).err().unwrap();
        assert!(matches!(err, ConfigError::Incompatible(_)));
    }

    #[test]
    fn from_config_rejects_unknown_unit() {
        let mut config = GridWorldConfig::from_toml_str(CONFIG).unwrap();
        config.reward = UnitConfig::new("no_such_reward");
        let err = GridWorld::from_config(&config, &Registries::with_defaults()).err().unwrap();
        assert!(matches!(err, ConfigError::UnknownName { .. }));
    }

    #[test]
    fn failed_step_rewinds_the_generator() {
        use crate::rewards::ProportionalToDistance;
        use crate::visibility::CoinflipVisibility;
        use gridverse_core::object::ObjectKind;
        use rand::Rng;

        // Both the transition and the observation draw; the reward then fails
        // because the corridor holds no key.
        let mut world = GridWorld::new(
            Box::new(LayoutReset::new(&CORRIDOR).unwrap()),
            Box::new(MoveAgent::with_failure_probability(0.5).unwrap()),
            Box::new(ProportionalToDistance::new(ObjectKind::Key)),
            Box::new(OverlapTermination::reach_exit()),
            Box::new(
                FromVisibility::new(3, 3)
                    .unwrap()
                    .with_visibility(Box::new(CoinflipVisibility::new(0.5).unwrap())),
            ),
        )
        .with_seed(5);
        world.reset().unwrap();
        let state = world.state().cloned();
        let mut expected = world.rng.clone();

        for _ in 0..3 {
            let err = world.step(Action::MoveForward).unwrap_err();
            assert!(matches!(err, GridverseError::Invariant(InvariantError::NotUnique { .. })));
        }
        assert_eq!(world.state().cloned(), state);
        assert_eq!(world.episode().step_count, 0);
        let actual: u64 = world.rng.r#gen();
        assert_eq!(actual, expected.r#gen::<u64>());
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn gridworld_is_send_sync() {
        assert_send_sync::<GridWorld>();
        assert_send_sync::<StepResult>();
    }
}
