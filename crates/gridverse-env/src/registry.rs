//! Name-keyed constructor tables for pipeline units.
//!
//! A [`Registry`] maps a unit name to a constructor that builds the unit from
//! keyword [`Params`]. Lookups go through [`Registry::partial`], which returns
//! a [`PartialUnit`] whose missing parameters can still be bound before it is
//! built; this is how the environment injects values only it knows, such as
//! the observation window shape.
//!
//! Every failure here is a [`ConfigError`] raised at assembly time.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use gridverse_core::config::{Params, UnitConfig};
use gridverse_core::error::ConfigError;
use gridverse_core::geometry::{DistanceMetric, Position};
use gridverse_core::object::ObjectKind;

use crate::observations::FromVisibility;
use crate::resets::{
    DoorKeyReset, DynamicObstaclesReset, EmptyReset, FourRoomsReset, LayoutReset, TeleportReset,
};
use crate::rewards::{
    ActuateDoorReward, BumpIntoWall, BumpMovingObstacle, GettingCloser, LivingReward, Overlap,
    PickAndDropReward, ProportionalToDistance,
};
use crate::terminations::{BumpIntoWallTermination, BumpMovingObstacleTermination, OverlapTermination};
use crate::traits::{
    CompositeReward, CompositeTermination, ObservationFunction, ResetFunction, RewardFunction,
    TerminatingFunction, TransitionChain, TransitionFunction, VisibilityFunction,
};
use crate::transitions::{
    ActuateBox, ActuateDoor, MoveAgent, MoveObstacles, PickAndDrop, Teleport, TurnAgent,
};
use crate::visibility::{
    CoinflipVisibility, FullVisibility, MinigridVisibility, PartialVisibility, RaytracingVisibility,
    StochasticRaytracingVisibility, WedgeVisibility,
};

/// Builds a unit from its parameters. Nested units are resolved through the
/// full set of registries.
pub type Constructor<T> = fn(&Params, &Registries) -> Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Constructors for one category of unit.
pub struct Registry<T> {
    kind: &'static str,
    constructors: BTreeMap<String, Constructor<T>>,
}

impl<T> Registry<T> {
    #[must_use]
    pub const fn new(kind: &'static str) -> Self {
        Self {
            kind,
            constructors: BTreeMap::new(),
        }
    }

    /// Add a constructor under `name`. Names are unique per registry.
    pub fn register(&mut self, name: impl Into<String>, constructor: Constructor<T>) -> Result<(), ConfigError> {
        let name = name.into();
        if self.constructors.contains_key(&name) {
            warn!(registry = self.kind, %name, "duplicate registration rejected");
            return Err(ConfigError::DuplicateName {
                registry: self.kind.into(),
                name,
            });
        }
        debug!(registry = self.kind, %name, "registered");
        self.constructors.insert(name, constructor);
        Ok(())
    }

    /// Look up `unit.name` and capture its parameters for later binding.
    pub fn partial(&self, unit: &UnitConfig) -> Result<PartialUnit<T>, ConfigError> {
        let Some(&constructor) = self.constructors.get(&unit.name) else {
            warn!(registry = self.kind, name = %unit.name, "unknown name");
            return Err(ConfigError::UnknownName {
                registry: self.kind.into(),
                name: unit.name.clone(),
            });
        };
        Ok(PartialUnit {
            params: unit.to_params(),
            constructor,
        })
    }

    /// Look up and build in one go.
    pub fn build(&self, unit: &UnitConfig, registries: &Registries) -> Result<T, ConfigError> {
        self.partial(unit)?.build(registries)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    fn with_entries(kind: &'static str, entries: &[(&str, Constructor<T>)]) -> Self {
        Self {
            kind,
            constructors: entries
                .iter()
                .map(|(name, constructor)| ((*name).to_owned(), *constructor))
                .collect(),
        }
    }
}

/// A looked-up constructor with its parameters, not yet built.
pub struct PartialUnit<T> {
    params: Params,
    constructor: Constructor<T>,
}

impl<T> PartialUnit<T> {
    /// Bind `key` unless the description already set it.
    pub fn bind(&mut self, key: &str, value: impl Into<toml::Value>) {
        if !self.params.contains(key) {
            self.params.insert(key, value);
        }
    }

    /// Bind every key of `defaults` the description left unset.
    pub fn bind_defaults(&mut self, defaults: &toml::Table) {
        self.params.merge_defaults(defaults);
    }

    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    pub fn build(self, registries: &Registries) -> Result<T, ConfigError> {
        (self.constructor)(&self.params, registries)
    }
}

// ---------------------------------------------------------------------------
// Registries
// ---------------------------------------------------------------------------

/// One registry per unit category.
pub struct Registries {
    pub reset: Registry<Box<dyn ResetFunction>>,
    pub transition: Registry<Box<dyn TransitionFunction>>,
    pub reward: Registry<Box<dyn RewardFunction>>,
    pub terminating: Registry<Box<dyn TerminatingFunction>>,
    pub observation: Registry<Box<dyn ObservationFunction>>,
    pub visibility: Registry<Box<dyn VisibilityFunction>>,
}

impl Registries {
    /// Empty registries, for fully custom unit sets.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            reset: Registry::new("reset"),
            transition: Registry::new("transition"),
            reward: Registry::new("reward"),
            terminating: Registry::new("terminating"),
            observation: Registry::new("observation"),
            visibility: Registry::new("visibility"),
        }
    }

    /// Registries holding every built-in unit.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            reset: Registry::with_entries("reset", RESETS),
            transition: Registry::with_entries("transition", TRANSITIONS),
            reward: Registry::with_entries("reward", REWARDS),
            terminating: Registry::with_entries("terminating", TERMINATINGS),
            observation: Registry::with_entries("observation", OBSERVATIONS),
            visibility: Registry::with_entries("visibility", VISIBILITIES),
        }
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ---------------------------------------------------------------------------
// Built-in constructors
// ---------------------------------------------------------------------------

fn failure_probability(p: &Params) -> Result<f64, ConfigError> {
    p.optional_f32("failure_probability", 0.0).map(f64::from)
}

fn object_type(p: &Params) -> Result<ObjectKind, ConfigError> {
    p.required_parse("object_type")
}

fn metric(p: &Params) -> Result<DistanceMetric, ConfigError> {
    p.optional_parse("distance_function", DistanceMetric::Manhattan)
}

const RESETS: &[(&str, Constructor<Box<dyn ResetFunction>>)] = &[
    ("empty", |p, _| {
        let reset = EmptyReset::new(
            p.required_usize("height")?,
            p.required_usize("width")?,
            p.optional_bool("random_agent", false)?,
        )?;
        Ok(Box::new(reset))
    }),
    ("four_rooms", |p, _| {
        let reset = FourRoomsReset::new(p.required_usize("height")?, p.required_usize("width")?)?;
        Ok(Box::new(reset))
    }),
    ("dynamic_obstacles", |p, _| {
        let reset = DynamicObstaclesReset::new(
            p.required_usize("height")?,
            p.required_usize("width")?,
            p.required_usize("num_obstacles")?,
            p.optional_bool("random_agent", false)?,
        )?;
        Ok(Box::new(reset))
    }),
    ("door_key", |p, _| Ok(Box::new(DoorKeyReset::new(p.required_usize("size")?)?))),
    ("teleport", |p, _| {
        let reset = TeleportReset::new(p.required_usize("height")?, p.required_usize("width")?)?;
        Ok(Box::new(reset))
    }),
    ("layout", |p, _| Ok(Box::new(LayoutReset::new(p.required_strings("rows")?.as_slice())?))),
];

const TRANSITIONS: &[(&str, Constructor<Box<dyn TransitionFunction>>)] = &[
    ("move_agent", |p, _| {
        Ok(Box::new(MoveAgent::with_failure_probability(failure_probability(p)?)?))
    }),
    ("turn_agent", |p, _| {
        Ok(Box::new(TurnAgent::with_failure_probability(failure_probability(p)?)?))
    }),
    ("pick_n_drop", |_, _| Ok(Box::new(PickAndDrop))),
    ("actuate_door", |_, _| Ok(Box::new(ActuateDoor))),
    ("actuate_box", |_, _| Ok(Box::new(ActuateBox))),
    ("move_obstacles", |_, _| Ok(Box::new(MoveObstacles))),
    ("teleport", |_, _| Ok(Box::new(Teleport))),
    ("chain", |p, registries| {
        let mut chain = TransitionChain::new();
        for unit in p.required_units("functions")? {
            chain = chain.add(registries.transition.build(&unit, registries)?);
        }
        Ok(Box::new(chain))
    }),
];

const REWARDS: &[(&str, Constructor<Box<dyn RewardFunction>>)] = &[
    ("living_reward", |p, _| {
        Ok(Box::new(LivingReward {
            reward: p.optional_f32("reward", -1.0)?,
        }))
    }),
    ("overlap", |p, _| {
        Ok(Box::new(Overlap {
            object_type: object_type(p)?,
            reward_on: p.optional_f32("reward_on", 1.0)?,
            reward_off: p.optional_f32("reward_off", 0.0)?,
        }))
    }),
    ("reach_exit", reach_exit_reward),
    ("reach_goal", reach_exit_reward),
    ("bump_moving_obstacle", |p, _| {
        Ok(Box::new(BumpMovingObstacle {
            reward: p.optional_f32("reward", -1.0)?,
        }))
    }),
    ("proportional_to_distance", |p, _| {
        Ok(Box::new(ProportionalToDistance {
            object_type: object_type(p)?,
            metric: metric(p)?,
            reward_per_unit_distance: p.optional_f32("reward_per_unit_distance", -1.0)?,
        }))
    }),
    ("getting_closer", |p, _| {
        Ok(Box::new(GettingCloser {
            object_type: object_type(p)?,
            metric: metric(p)?,
            reward_closer: p.optional_f32("reward_closer", 1.0)?,
            reward_further: p.optional_f32("reward_further", -1.0)?,
        }))
    }),
    ("bump_into_wall", |p, _| {
        Ok(Box::new(BumpIntoWall {
            reward: p.optional_f32("reward", -1.0)?,
        }))
    }),
    ("actuate_door", |p, _| {
        Ok(Box::new(ActuateDoorReward {
            reward_open: p.optional_f32("reward_open", 1.0)?,
            reward_close: p.optional_f32("reward_close", -1.0)?,
        }))
    }),
    ("pick_n_drop", |p, _| {
        Ok(Box::new(PickAndDropReward {
            object_type: object_type(p)?,
            reward_pick: p.optional_f32("reward_pick", 1.0)?,
            reward_drop: p.optional_f32("reward_drop", -1.0)?,
        }))
    }),
    ("chain", |p, registries| {
        let mut sum = CompositeReward::new();
        for unit in p.required_units("functions")? {
            sum = sum.add(registries.reward.build(&unit, registries)?);
        }
        Ok(Box::new(sum))
    }),
];

fn reach_exit_reward(p: &Params, _: &Registries) -> Result<Box<dyn RewardFunction>, ConfigError> {
    Ok(Box::new(Overlap::reach_exit(
        p.optional_f32("reward_on", 1.0)?,
        p.optional_f32("reward_off", 0.0)?,
    )))
}

const TERMINATINGS: &[(&str, Constructor<Box<dyn TerminatingFunction>>)] = &[
    ("overlap", |p, _| Ok(Box::new(OverlapTermination::new(object_type(p)?)))),
    ("reach_exit", |_, _| Ok(Box::new(OverlapTermination::reach_exit()))),
    ("reach_goal", |_, _| Ok(Box::new(OverlapTermination::reach_exit()))),
    ("bump_moving_obstacle", |_, _| Ok(Box::new(BumpMovingObstacleTermination))),
    ("bump_into_wall", |_, _| Ok(Box::new(BumpIntoWallTermination))),
    ("reduce_any", |p, registries| {
        let mut any = CompositeTermination::any();
        for unit in p.required_units("functions")? {
            any = any.add(registries.terminating.build(&unit, registries)?);
        }
        Ok(Box::new(any))
    }),
    ("reduce_all", |p, registries| {
        let mut all = CompositeTermination::all();
        for unit in p.required_units("functions")? {
            all = all.add(registries.terminating.build(&unit, registries)?);
        }
        Ok(Box::new(all))
    }),
];

const OBSERVATIONS: &[(&str, Constructor<Box<dyn ObservationFunction>>)] = &[("from_visibility", |p, registries| {
    let [height, width] = p
        .optional_pair("shape")?
        .ok_or_else(|| ConfigError::MissingParameter {
            unit: p.unit().into(),
            key: "shape".into(),
        })?;
    let invalid = |key: &str| ConfigError::InvalidParameter {
        unit: p.unit().into(),
        key: key.into(),
        message: "out of range".into(),
    };
    let height = usize::try_from(height).map_err(|_| invalid("shape"))?;
    let width = usize::try_from(width).map_err(|_| invalid("shape"))?;
    let observation = match p.optional_pair("agent_position")? {
        Some([y, x]) => {
            let y = i32::try_from(y).map_err(|_| invalid("agent_position"))?;
            let x = i32::try_from(x).map_err(|_| invalid("agent_position"))?;
            FromVisibility::with_agent_position(height, width, Position::new(y, x))?
        }
        None => FromVisibility::new(height, width)?,
    };
    let visibility = match p.optional_unit("visibility")? {
        Some(unit) => registries.visibility.build(&unit, registries)?,
        None => Box::new(FullVisibility),
    };
    Ok(Box::new(observation.with_visibility(visibility)))
})];

const VISIBILITIES: &[(&str, Constructor<Box<dyn VisibilityFunction>>)] = &[
    ("full", |_, _| Ok(Box::new(FullVisibility))),
    ("partial", |_, _| Ok(Box::new(PartialVisibility))),
    ("minigrid", |_, _| Ok(Box::new(MinigridVisibility))),
    ("wedge", |_, _| Ok(Box::new(WedgeVisibility))),
    ("raytracing", |_, _| Ok(Box::new(RaytracingVisibility))),
    ("stochastic_raytracing", |p, _| {
        let default = StochasticRaytracingVisibility::DEFAULT_SAMPLES as usize;
        // Out-of-range counts are reported by the constructor.
        let samples = u32::try_from(p.optional_usize("samples", default)?).unwrap_or(u32::MAX);
        Ok(Box::new(StochasticRaytracingVisibility::new(samples)?))
    }),
    ("coinflip", |p, _| {
        let probability = p.optional_f32("probability", 0.5)?;
        Ok(Box::new(CoinflipVisibility::new(f64::from(probability))?))
    }),
];

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
