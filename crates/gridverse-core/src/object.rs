//! Grid objects: the closed set of cell occupants and their capabilities.
//!
//! Every cell of a [`Grid`](crate::grid::Grid) holds exactly one
//! [`GridObject`]. Physical and visual attributes are exposed through the
//! [`Capabilities`] trait; [`Door`](GridObject::Door) is the only variant
//! whose attributes depend on its status.
//!
//! Adding a new object type means adding a [`GridObject`] variant, an
//! [`ObjectKind`] entry, and extending the `Capabilities` match arms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InvariantError;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// Object color. `None` is the default for uncolored objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    #[default]
    None,
    Red,
    Green,
    Blue,
    Yellow,
}

impl Color {
    pub const ALL: [Self; 5] = [Self::None, Self::Red, Self::Green, Self::Blue, Self::Yellow];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::Red => "RED",
            Self::Green => "GREEN",
            Self::Blue => "BLUE",
            Self::Yellow => "YELLOW",
        };
        f.write_str(name)
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Self::None),
            "RED" => Ok(Self::Red),
            "GREEN" => Ok(Self::Green),
            "BLUE" => Ok(Self::Blue),
            "YELLOW" => Ok(Self::Yellow),
            _ => Err(format!("unknown color `{s}`")),
        }
    }
}

// ---------------------------------------------------------------------------
// DoorStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DoorStatus {
    Open,
    Closed,
    Locked,
}

impl DoorStatus {
    pub const ALL: [Self; 3] = [Self::Open, Self::Closed, Self::Locked];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for DoorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            "LOCKED" => Ok(Self::Locked),
            _ => Err(format!("unknown door status `{s}`")),
        }
    }
}

// ---------------------------------------------------------------------------
// ObjectKind
// ---------------------------------------------------------------------------

/// Fieldless tag of a [`GridObject`] variant, with a stable type index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    NoneObject,
    Hidden,
    Floor,
    Wall,
    Exit,
    Door,
    Key,
    MovingObstacle,
    Box,
    Telepod,
    Beacon,
}

impl ObjectKind {
    pub const ALL: [Self; 11] = [
        Self::NoneObject,
        Self::Hidden,
        Self::Floor,
        Self::Wall,
        Self::Exit,
        Self::Door,
        Self::Key,
        Self::MovingObstacle,
        Self::Box,
        Self::Telepod,
        Self::Beacon,
    ];

    /// Stable integer id used in state/observation descriptors.
    #[must_use]
    pub const fn type_index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_type_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Number of distinct status values; `status_index` lies in `[0, num_states)`.
    #[must_use]
    pub const fn num_states(self) -> usize {
        match self {
            Self::Door => DoorStatus::ALL.len(),
            _ => 1,
        }
    }

    /// Whether objects of this kind can be rebuilt from a `(type, color, status)`
    /// descriptor alone.
    #[must_use]
    pub const fn can_be_represented_in_state(self) -> bool {
        !matches!(self, Self::Hidden | Self::Box)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoneObject => "NoneObject",
            Self::Hidden => "Hidden",
            Self::Floor => "Floor",
            Self::Wall => "Wall",
            Self::Exit => "Exit",
            Self::Door => "Door",
            Self::Key => "Key",
            Self::MovingObstacle => "MovingObstacle",
            Self::Box => "Box",
            Self::Telepod => "Telepod",
            Self::Beacon => "Beacon",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    /// Accepts the display name (`"MovingObstacle"`) or snake case
    /// (`"moving_obstacle"`). `"Goal"` is an alias of `Exit`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "noneobject" | "nonegridobject" | "none" => Ok(Self::NoneObject),
            "hidden" => Ok(Self::Hidden),
            "floor" => Ok(Self::Floor),
            "wall" => Ok(Self::Wall),
            "exit" | "goal" => Ok(Self::Exit),
            "door" => Ok(Self::Door),
            "key" => Ok(Self::Key),
            "movingobstacle" => Ok(Self::MovingObstacle),
            "box" => Ok(Self::Box),
            "telepod" => Ok(Self::Telepod),
            "beacon" => Ok(Self::Beacon),
            _ => Err(format!("unknown object type `{s}`")),
        }
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Fixed attribute set every grid object exposes.
pub trait Capabilities {
    fn kind(&self) -> ObjectKind;
    fn color(&self) -> Color;
    fn status_index(&self) -> usize;
    fn blocks_movement(&self) -> bool;
    fn blocks_vision(&self) -> bool;
    fn holdable(&self) -> bool;
}

// ---------------------------------------------------------------------------
// GridObject
// ---------------------------------------------------------------------------

/// A single cell occupant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum GridObject {
    /// Empty hand. The default held object; never placed in a grid by the
    /// built-in units.
    NoneObject,
    /// Placeholder for cells the agent cannot perceive.
    Hidden,
    #[default]
    Floor,
    Wall,
    Exit {
        color: Color,
    },
    Door {
        status: DoorStatus,
        color: Color,
    },
    Key {
        color: Color,
    },
    MovingObstacle,
    /// Breakable container; always holds one non-sentinel object.
    Box {
        content: Box<GridObject>,
    },
    Telepod {
        color: Color,
    },
    Beacon {
        color: Color,
    },
}

impl GridObject {
    #[must_use]
    pub const fn exit() -> Self {
        Self::Exit { color: Color::None }
    }

    #[must_use]
    pub const fn door(status: DoorStatus, color: Color) -> Self {
        Self::Door { status, color }
    }

    #[must_use]
    pub const fn key(color: Color) -> Self {
        Self::Key { color }
    }

    #[must_use]
    pub const fn telepod(color: Color) -> Self {
        Self::Telepod { color }
    }

    #[must_use]
    pub const fn beacon(color: Color) -> Self {
        Self::Beacon { color }
    }

    /// Wrap `content` in a box. Sentinels cannot be boxed.
    pub fn boxed(content: Self) -> Result<Self, InvariantError> {
        match content.kind() {
            kind @ (ObjectKind::NoneObject | ObjectKind::Hidden) => {
                Err(InvariantError::InvalidBoxContent { kind })
            }
            _ => Ok(Self::Box {
                content: Box::new(content),
            }),
        }
    }

    #[must_use]
    pub fn is(&self, kind: ObjectKind) -> bool {
        self.kind() == kind
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::NoneObject)
    }

    #[must_use]
    pub const fn is_open_door(&self) -> bool {
        matches!(
            self,
            Self::Door {
                status: DoorStatus::Open,
                ..
            }
        )
    }

    #[must_use]
    pub const fn is_locked_door(&self) -> bool {
        matches!(
            self,
            Self::Door {
                status: DoorStatus::Locked,
                ..
            }
        )
    }

    #[must_use]
    pub fn descriptor(&self) -> ObjectDescriptor {
        ObjectDescriptor {
            type_index: self.kind().type_index(),
            color_index: self.color().index(),
            status_index: self.status_index(),
        }
    }

    /// Rebuild an object from its descriptor.
    ///
    /// Fails when the status index is out of range for the type, or when the
    /// type cannot be represented by a descriptor (e.g. a box, whose content
    /// is not part of the descriptor).
    pub fn from_descriptor(
        kind: ObjectKind,
        color: Color,
        status_index: usize,
    ) -> Result<Self, InvariantError> {
        if status_index >= kind.num_states() {
            return Err(InvariantError::StatusOutOfRange {
                kind,
                index: status_index,
                num_states: kind.num_states(),
            });
        }
        Ok(match kind {
            ObjectKind::NoneObject => Self::NoneObject,
            ObjectKind::Floor => Self::Floor,
            ObjectKind::Wall => Self::Wall,
            ObjectKind::Exit => Self::Exit { color },
            ObjectKind::Door => Self::Door {
                status: DoorStatus::ALL[status_index],
                color,
            },
            ObjectKind::Key => Self::Key { color },
            ObjectKind::MovingObstacle => Self::MovingObstacle,
            ObjectKind::Telepod => Self::Telepod { color },
            ObjectKind::Beacon => Self::Beacon { color },
            ObjectKind::Hidden | ObjectKind::Box => {
                return Err(InvariantError::NotRepresentable { kind });
            }
        })
    }
}

impl Capabilities for GridObject {
    fn kind(&self) -> ObjectKind {
        match self {
            Self::NoneObject => ObjectKind::NoneObject,
            Self::Hidden => ObjectKind::Hidden,
            Self::Floor => ObjectKind::Floor,
            Self::Wall => ObjectKind::Wall,
            Self::Exit { .. } => ObjectKind::Exit,
            Self::Door { .. } => ObjectKind::Door,
            Self::Key { .. } => ObjectKind::Key,
            Self::MovingObstacle => ObjectKind::MovingObstacle,
            Self::Box { .. } => ObjectKind::Box,
            Self::Telepod { .. } => ObjectKind::Telepod,
            Self::Beacon { .. } => ObjectKind::Beacon,
        }
    }

    fn color(&self) -> Color {
        match self {
            Self::Exit { color }
            | Self::Door { color, .. }
            | Self::Key { color }
            | Self::Telepod { color }
            | Self::Beacon { color } => *color,
            _ => Color::None,
        }
    }

    fn status_index(&self) -> usize {
        match self {
            Self::Door { status, .. } => status.index(),
            _ => 0,
        }
    }

    fn blocks_movement(&self) -> bool {
        match self {
            Self::Wall | Self::Box { .. } => true,
            Self::Door { status, .. } => *status != DoorStatus::Open,
            _ => false,
        }
    }

    fn blocks_vision(&self) -> bool {
        match self {
            Self::NoneObject | Self::Hidden | Self::Wall => true,
            Self::Door { status, .. } => *status != DoorStatus::Open,
            _ => false,
        }
    }

    fn holdable(&self) -> bool {
        matches!(self, Self::Key { .. })
    }
}

// ---------------------------------------------------------------------------
// ObjectDescriptor
// ---------------------------------------------------------------------------

/// The `(type, color, status)` triple that encodes an object in the state and
/// observation schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub type_index: usize,
    pub color_index: usize,
    pub status_index: usize,
}

impl ObjectDescriptor {
    /// Decode back into an object.
    pub fn to_object(self) -> Result<GridObject, InvariantError> {
        let kind = ObjectKind::from_type_index(self.type_index).ok_or(
            InvariantError::UnknownTypeIndex {
                index: self.type_index,
            },
        )?;
        let color = Color::from_index(self.color_index).unwrap_or_default();
        GridObject::from_descriptor(kind, color, self.status_index)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
