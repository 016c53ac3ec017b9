//! Declarative environment description, loaded from TOML.
//!
//! ```toml
//! max_steps = 100
//! seed = 7
//!
//! [state_space]
//! shape = [5, 5]
//! objects = ["Floor", "Wall", "Exit"]
//!
//! [observation_space]
//! shape = [3, 3]
//! objects = ["Floor", "Wall", "Exit"]
//!
//! [reset]
//! name = "layout"
//! rows = ["#####", "#>..#", "#...#", "#..E#", "#####"]
//!
//! [transition]
//! name = "move_agent"
//!
//! [reward]
//! name = "reach_exit"
//! reward_on = 5.0
//! reward_off = -0.05
//!
//! [observation]
//! name = "from_visibility"
//! visibility = { name = "raytracing" }
//!
//! [terminating]
//! name = "reach_exit"
//! ```
//!
//! Every unit table has a `name`, resolved through the function registry, and
//! any number of keyword parameters, read through [`Params`].

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::geometry::Position;
use crate::object::{Color, ObjectKind};
use crate::spaces::{ObservationSpace, StateSpace};

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

fn default_colors() -> Vec<String> {
    vec!["NONE".into()]
}

// ---------------------------------------------------------------------------
// GridWorldConfig
// ---------------------------------------------------------------------------

/// Complete description of an environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridWorldConfig {
    /// Steps after which an episode is truncated. `None` means unbounded.
    #[serde(default)]
    pub max_steps: Option<u32>,

    /// Seed for the environment generator. Drawn from entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    pub state_space: SpaceConfig,
    pub observation_space: SpaceConfig,

    pub reset: UnitConfig,
    pub transition: UnitConfig,
    pub reward: UnitConfig,
    pub observation: UnitConfig,
    pub terminating: UnitConfig,
}

impl GridWorldConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_steps".into(),
                message: "must be positive".into(),
            });
        }
        self.state_space()?;
        self.observation_space()?;
        Ok(())
    }

    pub fn state_space(&self) -> Result<StateSpace, ConfigError> {
        let [height, width] = self.state_space.shape;
        StateSpace::new(
            height,
            width,
            parse_all("state_space.objects", &self.state_space.objects)?,
            parse_all("state_space.colors", &self.state_space.colors)?,
        )
    }

    /// The observation space; the agent defaults to the bottom-center cell.
    pub fn observation_space(&self) -> Result<ObservationSpace, ConfigError> {
        let [height, width] = self.observation_space.shape;
        let objects: Vec<ObjectKind> =
            parse_all("observation_space.objects", &self.observation_space.objects)?;
        let colors: Vec<Color> = parse_all("observation_space.colors", &self.observation_space.colors)?;
        match self.observation_space.agent_position {
            Some([y, x]) => {
                ObservationSpace::with_agent_position(height, width, objects, colors, Position::new(y, x))
            }
            None => ObservationSpace::new(height, width, objects, colors),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading gridworld config");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

fn parse_all<T>(field: &str, names: &[String]) -> Result<Vec<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    names
        .iter()
        .map(|name| {
            name.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                field: field.into(),
                message: e.to_string(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// SpaceConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceConfig {
    /// `[height, width]`.
    pub shape: [usize; 2],
    pub objects: Vec<String>,
    #[serde(default = "default_colors")]
    pub colors: Vec<String>,
    /// Observation spaces only: `[y, x]` of the agent inside the window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_position: Option<[i32; 2]>,
}

// ---------------------------------------------------------------------------
// UnitConfig
// ---------------------------------------------------------------------------

/// A named pipeline unit plus its keyword parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitConfig {
    pub name: String,
    #[serde(flatten)]
    pub params: toml::Table,
}

impl UnitConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: toml::Table::new(),
        }
    }

    /// Builder-style parameter binding.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn to_params(&self) -> Params {
        Params::new(self.name.clone(), self.params.clone())
    }
}

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

/// Keyword parameters of one unit, with typed accessors.
///
/// Errors name the unit and key so assembly failures point at the offending
/// line of the description.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Params {
    unit: String,
    table: toml::Table,
}

impl Params {
    #[must_use]
    pub const fn new(unit: String, table: toml::Table) -> Self {
        Self { unit, table }
    }

    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    /// Bind `key`, overwriting an earlier binding.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<toml::Value>) {
        self.table.insert(key.into(), value.into());
    }

    /// Bind every key of `other` that is not already bound.
    pub fn merge_defaults(&mut self, other: &toml::Table) {
        for (key, value) in other {
            self.table.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    fn missing(&self, key: &str) -> ConfigError {
        ConfigError::MissingParameter {
            unit: self.unit.clone(),
            key: key.into(),
        }
    }

    fn invalid(&self, key: &str, message: impl Into<String>) -> ConfigError {
        ConfigError::InvalidParameter {
            unit: self.unit.clone(),
            key: key.into(),
            message: message.into(),
        }
    }

    fn required(&self, key: &str) -> Result<&toml::Value, ConfigError> {
        self.table.get(key).ok_or_else(|| self.missing(key))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn required_f32(&self, key: &str) -> Result<f32, ConfigError> {
        match self.required(key)? {
            toml::Value::Float(v) => Ok(*v as f32),
            toml::Value::Integer(v) => Ok(*v as f32),
            other => Err(self.invalid(key, format!("expected a number, got {}", other.type_str()))),
        }
    }

    pub fn optional_f32(&self, key: &str, default: f32) -> Result<f32, ConfigError> {
        if self.contains(key) {
            self.required_f32(key)
        } else {
            Ok(default)
        }
    }

    pub fn required_usize(&self, key: &str) -> Result<usize, ConfigError> {
        match self.required(key)? {
            toml::Value::Integer(v) => {
                usize::try_from(*v).map_err(|_| self.invalid(key, format!("expected a non-negative integer, got {v}")))
            }
            other => Err(self.invalid(key, format!("expected an integer, got {}", other.type_str()))),
        }
    }

    pub fn optional_usize(&self, key: &str, default: usize) -> Result<usize, ConfigError> {
        if self.contains(key) {
            self.required_usize(key)
        } else {
            Ok(default)
        }
    }

    pub fn optional_bool(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.table.get(key) {
            None => Ok(default),
            Some(toml::Value::Boolean(v)) => Ok(*v),
            Some(other) => Err(self.invalid(key, format!("expected a boolean, got {}", other.type_str()))),
        }
    }

    pub fn required_str(&self, key: &str) -> Result<&str, ConfigError> {
        match self.required(key)? {
            toml::Value::String(s) => Ok(s),
            other => Err(self.invalid(key, format!("expected a string, got {}", other.type_str()))),
        }
    }

    /// Parse a string parameter with `FromStr` (object kinds, colors, metrics).
    pub fn required_parse<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.required_str(key)?
            .parse()
            .map_err(|e: T::Err| self.invalid(key, e.to_string()))
    }

    pub fn optional_parse<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        if self.contains(key) {
            self.required_parse(key)
        } else {
            Ok(default)
        }
    }

    pub fn required_strings(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        match self.required(key)? {
            toml::Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    toml::Value::String(s) => Ok(s.clone()),
                    other => Err(self.invalid(key, format!("expected strings, found {}", other.type_str()))),
                })
                .collect(),
            other => Err(self.invalid(key, format!("expected an array, got {}", other.type_str()))),
        }
    }

    /// `[a, b]` integer pair, e.g. a shape or position.
    pub fn optional_pair(&self, key: &str) -> Result<Option<[i64; 2]>, ConfigError> {
        let Some(value) = self.table.get(key) else {
            return Ok(None);
        };
        match value.as_array().map(Vec::as_slice) {
            Some([toml::Value::Integer(a), toml::Value::Integer(b)]) => Ok(Some([*a, *b])),
            _ => Err(self.invalid(key, "expected a pair of integers")),
        }
    }

    /// A nested unit table, e.g. `visibility = { name = "raytracing" }`.
    pub fn required_unit(&self, key: &str) -> Result<UnitConfig, ConfigError> {
        self.required(key)?
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| self.invalid(key, e.to_string()))
    }

    pub fn optional_unit(&self, key: &str) -> Result<Option<UnitConfig>, ConfigError> {
        if self.contains(key) {
            self.required_unit(key).map(Some)
        } else {
            Ok(None)
        }
    }

    /// An array of nested unit tables, e.g. the members of a chain.
    pub fn required_units(&self, key: &str) -> Result<Vec<UnitConfig>, ConfigError> {
        match self.required(key)? {
            toml::Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.clone()
                        .try_into()
                        .map_err(|e: toml::de::Error| self.invalid(key, e.to_string()))
                })
                .collect(),
            other => Err(self.invalid(key, format!("expected an array of tables, got {}", other.type_str()))),
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

    const EXAMPLE: &str = r######"
max_steps = 100
seed = 7

[state_space]
shape = [5, 5]
objects = ["Floor", "Wall", "Exit"]

[observation_space]
shape = [3, 3]
objects = ["Floor", "Wall", "Exit"]

[reset]
name = "layout"
rows = ["#####", "#>..#", "#...#", "#..E#", "#####"]

[transition]
name = "chain"
functions = [{ name = "move_agent" }, { name = "turn_agent", failure_probability = 0.1 }]

[reward]
name = "reach_exit"
reward_on = 5.0
reward_off = -0.05

[observation]
name = "from_visibility"
visibility = { name = "raytracing" }

[terminating]
name = "reach_exit"
"######;

    #[test]
    fn parse_example() {
        let config = GridWorldConfig::from_toml_str(EXAMPLE).unwrap();
        assert_eq!(config.max_steps, Some(100));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.state_space.colors, vec!["NONE".to_string()]);
        assert_eq!(config.reward.name, "reach_exit");
        let params = config.reward.to_params();
        assert_relative_eq!(params.required_f32("reward_on").unwrap(), 5.0);
        assert_relative_eq!(params.optional_f32("missing", 1.5).unwrap(), 1.5);
    }

    #[test]
    fn spaces_from_config() {
        let config = GridWorldConfig::from_toml_str(EXAMPLE).unwrap();
        let state = config.state_space().unwrap();
        assert_eq!((state.height, state.width), (5, 5));
        assert!(state.objects.contains(&ObjectKind::Exit));
        let obs = config.observation_space().unwrap();
        assert_eq!(obs.agent_position, Position::new(2, 1));
    }

    #[test]
    fn nested_units() {
        let config = GridWorldConfig::from_toml_str(EXAMPLE).unwrap();
        let members = config.transition.to_params().required_units("functions").unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[1].name, "turn_agent");
        assert_relative_eq!(
            members[1].to_params().required_f32("failure_probability").unwrap(),
            0.1
        );
        let visibility = config.observation.to_params().required_unit("visibility").unwrap();
        assert_eq!(visibility.name, "raytracing");
    }

    #[test]
    fn even_observation_width_rejected() {
        let content = EXAMPLE.replace("shape = [3, 3]", "shape = [3, 4]");
        let err = GridWorldConfig::from_toml_str(&content).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn unknown_object_name_rejected() {
        let content = EXAMPLE.replacen("\"Exit\"]", "\"Lava\"]", 1);
        let err = GridWorldConfig::from_toml_str(&content).unwrap_err();
        assert!(err.to_string().contains("Lava"));
    }

    #[test]
    fn zero_max_steps_rejected() {
        let content = EXAMPLE.replace("max_steps = 100", "max_steps = 0");
        assert!(GridWorldConfig::from_toml_str(&content).is_err());
    }

    #[test]
    fn malformed_toml_is_toml_error() {
        let err = GridWorldConfig::from_toml_str("max_steps = [").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = GridWorldConfig::from_file("/nonexistent/gridworld.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn params_errors_name_unit_and_key() {
        let params = UnitConfig::new("living_reward").with("reward", "lots").to_params();
        let err = params.required_f32("reward").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameter `reward` for `living_reward`: expected a number, got string"
        );
        let err = params.required_f32("other").unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter { .. }));
    }

    #[test]
    fn params_parse_and_pairs() {
        let params = UnitConfig::new("overlap")
            .with("object_type", "Exit")
            .with("color", "red")
            .with("shape", toml::Value::Array(vec![7.into(), 9.into()]))
            .to_params();
        assert_eq!(params.required_parse::<ObjectKind>("object_type").unwrap(), ObjectKind::Exit);
        assert_eq!(params.optional_parse("color", Color::None).unwrap(), Color::Red);
        assert_eq!(params.optional_pair("shape").unwrap(), Some([7, 9]));
        assert_eq!(params.optional_pair("absent").unwrap(), None);
        assert!(params.required_parse::<ObjectKind>("color").is_err());
    }

    #[test]
    fn merge_defaults_keeps_existing() {
        let mut params = UnitConfig::new("u").with("a", 1).to_params();
        let mut defaults = toml::Table::new();
        defaults.insert("a".into(), 2.into());
        defaults.insert("b".into(), 3.into());
        params.merge_defaults(&defaults);
        assert_eq!(params.required_usize("a").unwrap(), 1);
        assert_eq!(params.required_usize("b").unwrap(), 3);
    }
}
