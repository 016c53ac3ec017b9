use thiserror::Error;

use crate::object::ObjectKind;

/// Top-level error type for gridverse.
#[derive(Debug, Error)]
pub enum GridverseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invariant violated: {0}")]
    Invariant(#[from] InvariantError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
}

/// Errors raised while assembling an environment from a description.
///
/// These are detected before the first step and are never recovered from.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unknown {registry} function `{name}`")]
    UnknownName { registry: String, name: String },

    #[error("{registry} registry already contains `{name}`")]
    DuplicateName { registry: String, name: String },

    #[error("Missing parameter `{key}` for `{unit}`")]
    MissingParameter { unit: String, key: String },

    #[error("Invalid parameter `{key}` for `{unit}`: {message}")]
    InvalidParameter {
        unit: String,
        key: String,
        message: String,
    },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Incompatible configuration: {0}")]
    Incompatible(String),
}

/// Violations of structural invariants of grids, objects and states.
///
/// Copy + static messages so they can be raised from hot paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("Position ({y}, {x}) out of bounds for {height}x{width} grid")]
    OutOfBounds {
        y: i32,
        x: i32,
        height: usize,
        width: usize,
    },

    #[error("Status index {index} out of range for {kind} ({num_states} states)")]
    StatusOutOfRange {
        kind: ObjectKind,
        index: usize,
        num_states: usize,
    },

    #[error("Grid must have at least one row and one column")]
    EmptyGrid,

    #[error("Grid rows must all have the same length")]
    RaggedGrid,

    #[error("Agent position ({y}, {x}) lies outside the grid")]
    AgentOutOfBounds { y: i32, x: i32 },

    #[error("Visibility requires the agent on the bottom row of a {height}-row view, found row {y}")]
    AgentNotOnBottomRow { y: i32, height: usize },

    #[error("Shape mismatch: expected {expected_height}x{expected_width}, got {height}x{width}")]
    ShapeMismatch {
        expected_height: usize,
        expected_width: usize,
        height: usize,
        width: usize,
    },

    #[error("Expected exactly one {kind} in the grid, found {count}")]
    NotUnique { kind: ObjectKind, count: usize },

    #[error("Unknown object type index {index}")]
    UnknownTypeIndex { index: usize },

    #[error("{kind} cannot be rebuilt from a state descriptor")]
    NotRepresentable { kind: ObjectKind },

    #[error("A box cannot contain {kind}")]
    InvalidBoxContent { kind: ObjectKind },

    #[error("State does not satisfy the declared state space")]
    StateOutsideSpace,

    #[error("Observation does not satisfy the declared observation space")]
    ObservationOutsideSpace,
}

/// Misuse of the reset/step lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("step called before reset")]
    Uninitialized,

    #[error("step called on a finished episode; call reset first")]
    EpisodeDone,
}
