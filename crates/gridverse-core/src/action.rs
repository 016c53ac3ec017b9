//! The closed action set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::{Orientation, Position};

/// One of the eight agent actions. Discriminants are the integer encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Action {
    MoveForward = 0,
    MoveBackward = 1,
    MoveLeft = 2,
    MoveRight = 3,
    TurnLeft = 4,
    TurnRight = 5,
    Actuate = 6,
    PickAndDrop = 7,
}

impl Action {
    pub const ALL: [Self; 8] = [
        Self::MoveForward,
        Self::MoveBackward,
        Self::MoveLeft,
        Self::MoveRight,
        Self::TurnLeft,
        Self::TurnRight,
        Self::Actuate,
        Self::PickAndDrop,
    ];

    #[must_use]
    pub const fn is_move(self) -> bool {
        matches!(
            self,
            Self::MoveForward | Self::MoveBackward | Self::MoveLeft | Self::MoveRight
        )
    }

    #[must_use]
    pub const fn is_turn(self) -> bool {
        matches!(self, Self::TurnLeft | Self::TurnRight)
    }

    /// Agent-frame displacement of a move action, `None` otherwise.
    #[must_use]
    pub const fn local_delta(self) -> Option<Position> {
        match self {
            Self::MoveForward => Some(Orientation::North.as_delta()),
            Self::MoveBackward => Some(Orientation::South.as_delta()),
            Self::MoveLeft => Some(Orientation::West.as_delta()),
            Self::MoveRight => Some(Orientation::East.as_delta()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Action {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL.get(usize::from(value)).copied().ok_or(value)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MoveForward => "MOVE_FORWARD",
            Self::MoveBackward => "MOVE_BACKWARD",
            Self::MoveLeft => "MOVE_LEFT",
            Self::MoveRight => "MOVE_RIGHT",
            Self::TurnLeft => "TURN_LEFT",
            Self::TurnRight => "TURN_RIGHT",
            Self::Actuate => "ACTUATE",
            Self::PickAndDrop => "PICK_N_DROP",
        };
        f.write_str(name)
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MOVE_FORWARD" => Ok(Self::MoveForward),
            "MOVE_BACKWARD" => Ok(Self::MoveBackward),
            "MOVE_LEFT" => Ok(Self::MoveLeft),
            "MOVE_RIGHT" => Ok(Self::MoveRight),
            "TURN_LEFT" => Ok(Self::TurnLeft),
            "TURN_RIGHT" => Ok(Self::TurnRight),
            "ACTUATE" => Ok(Self::Actuate),
            "PICK_N_DROP" | "PICK_AND_DROP" => Ok(Self::PickAndDrop),
            _ => Err(format!("unknown action `{s}`")),
        }
    }
}
