//! Declared state and observation spaces.
//!
//! A space fixes the grid shape and the object/color vocabularies an
//! environment may produce. The environment checks every state and
//! observation it produces against them.

use std::collections::BTreeSet;

use crate::error::ConfigError;
use crate::geometry::{Orientation, Position};
use crate::object::{Capabilities, Color, GridObject, ObjectKind};
use crate::state::{Observation, State};

fn vocabulary_ok(
    objects: &BTreeSet<ObjectKind>,
    colors: &BTreeSet<Color>,
    object: &GridObject,
    extra: Option<ObjectKind>,
) -> bool {
    let kind = object.kind();
    let color = object.color();
    (extra == Some(kind) || objects.contains(&kind)) && (color == Color::None || colors.contains(&color))
}

// ---------------------------------------------------------------------------
// StateSpace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSpace {
    pub height: usize,
    pub width: usize,
    pub objects: BTreeSet<ObjectKind>,
    pub colors: BTreeSet<Color>,
}

impl StateSpace {
    pub fn new(
        height: usize,
        width: usize,
        objects: impl IntoIterator<Item = ObjectKind>,
        colors: impl IntoIterator<Item = Color>,
    ) -> Result<Self, ConfigError> {
        let space = Self {
            height,
            width,
            objects: objects.into_iter().collect(),
            colors: colors.into_iter().collect(),
        };
        space.validate()?;
        Ok(space)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.height == 0 || self.width == 0 {
            return Err(ConfigError::InvalidValue {
                field: "state_space.shape".into(),
                message: "must be positive".into(),
            });
        }
        if self.objects.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "state_space.objects".into(),
                message: "must not be empty".into(),
            });
        }
        if self.objects.contains(&ObjectKind::Hidden) {
            return Err(ConfigError::InvalidValue {
                field: "state_space.objects".into(),
                message: "Hidden cannot appear in a state".into(),
            });
        }
        Ok(())
    }

    /// Whether `state` has the declared shape and vocabulary, and its agent
    /// stands inside the grid holding a declared object (or nothing).
    #[must_use]
    pub fn contains(&self, state: &State) -> bool {
        state.grid.shape() == (self.height, self.width)
            && state
                .grid
                .iter()
                .all(|(_, obj)| vocabulary_ok(&self.objects, &self.colors, obj, None))
            && state.grid.contains(state.agent.position())
            && vocabulary_ok(
                &self.objects,
                &self.colors,
                &state.agent.held,
                Some(ObjectKind::NoneObject),
            )
    }
}

// ---------------------------------------------------------------------------
// ObservationSpace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationSpace {
    pub height: usize,
    pub width: usize,
    pub objects: BTreeSet<ObjectKind>,
    pub colors: BTreeSet<Color>,
    /// Where the agent sits inside the observation window.
    pub agent_position: Position,
}

impl ObservationSpace {
    /// Build a space with the agent anchored at the bottom-center cell.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn new(
        height: usize,
        width: usize,
        objects: impl IntoIterator<Item = ObjectKind>,
        colors: impl IntoIterator<Item = Color>,
    ) -> Result<Self, ConfigError> {
        let agent_position = Position::new(height as i32 - 1, (width / 2) as i32);
        Self::with_agent_position(height, width, objects, colors, agent_position)
    }

    pub fn with_agent_position(
        height: usize,
        width: usize,
        objects: impl IntoIterator<Item = ObjectKind>,
        colors: impl IntoIterator<Item = Color>,
        agent_position: Position,
    ) -> Result<Self, ConfigError> {
        let space = Self {
            height,
            width,
            objects: objects.into_iter().collect(),
            colors: colors.into_iter().collect(),
            agent_position,
        };
        space.validate()?;
        Ok(space)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.height == 0 || self.width == 0 {
            return Err(ConfigError::InvalidValue {
                field: "observation_space.shape".into(),
                message: "must be positive".into(),
            });
        }
        if self.width % 2 == 0 {
            return Err(ConfigError::InvalidValue {
                field: "observation_space.shape".into(),
                message: format!("width must be odd, got {}", self.width),
            });
        }
        if self.objects.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "observation_space.objects".into(),
                message: "must not be empty".into(),
            });
        }
        let window = crate::geometry::Area::from_shape(self.height, self.width);
        if !window.contains(self.agent_position) {
            return Err(ConfigError::InvalidValue {
                field: "observation_space.agent_position".into(),
                message: format!(
                    "{} lies outside the {}x{} window",
                    self.agent_position, self.height, self.width
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, observation: &Observation) -> bool {
        observation.grid.shape() == (self.height, self.width)
            && observation
                .grid
                .iter()
                .all(|(_, obj)| vocabulary_ok(&self.objects, &self.colors, obj, Some(ObjectKind::Hidden)))
            && observation.agent.position() == self.agent_position
            && observation.agent.orientation() == Orientation::North
            && vocabulary_ok(
                &self.objects,
                &self.colors,
                &observation.agent.held,
                Some(ObjectKind::NoneObject),
            )
    }
}
