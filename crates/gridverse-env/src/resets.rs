//! Reset units: initial-state generators.
//!
//! Parameters are checked at construction, so `reset` only fails on a
//! broken invariant. Procedural generators draw every random choice from the
//! supplied generator.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use gridverse_core::error::{ConfigError, GridverseError, InvariantError};
use gridverse_core::geometry::{Orientation, Position};
use gridverse_core::grid::Grid;
use gridverse_core::object::{Color, DoorStatus, GridObject, ObjectKind};
use gridverse_core::seed::GridRng;
use gridverse_core::{Agent, State};

use crate::traits::ResetFunction;

fn too_small(unit: &str, key: &str, minimum: usize, got: usize) -> ConfigError {
    ConfigError::InvalidParameter {
        unit: unit.into(),
        key: key.into(),
        message: format!("must be at least {minimum}, got {got}"),
    }
}

/// Floor grid surrounded by a one-cell Wall border.
fn walled_room(height: usize, width: usize) -> Result<Grid, InvariantError> {
    let mut grid = Grid::new(height, width)?;
    for p in grid.area().border_positions().collect::<Vec<_>>() {
        grid.set(p, GridObject::Wall)?;
    }
    Ok(grid)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn position(y: usize, x: usize) -> Position {
    Position::new(y as i32, x as i32)
}

fn random_orientation(rng: &mut GridRng) -> Orientation {
    Orientation::ALL[rng.gen_range(0..Orientation::ALL.len())]
}

/// Uniformly chosen Floor cell, or an error when there is none.
fn random_floor(grid: &Grid, rng: &mut GridRng) -> Result<Position, InvariantError> {
    grid.positions_of(ObjectKind::Floor)
        .choose(rng)
        .copied()
        .ok_or(InvariantError::NotUnique {
            kind: ObjectKind::Floor,
            count: 0,
        })
}

// ---------------------------------------------------------------------------
// EmptyReset
// ---------------------------------------------------------------------------

/// Walled room with the Exit in the bottom-right corner.
///
/// The agent starts at `(1, 1)` facing East, or on a random Floor cell with
/// a random orientation when `random_agent` is set.
#[derive(Debug, Clone, Copy)]
pub struct EmptyReset {
    height: usize,
    width: usize,
    random_agent: bool,
}

impl EmptyReset {
    pub fn new(height: usize, width: usize, random_agent: bool) -> Result<Self, ConfigError> {
        if height < 4 {
            return Err(too_small("empty", "height", 4, height));
        }
        if width < 4 {
            return Err(too_small("empty", "width", 4, width));
        }
        Ok(Self {
            height,
            width,
            random_agent,
        })
    }

    fn build(&self, rng: &mut GridRng) -> Result<State, InvariantError> {
        let mut grid = walled_room(self.height, self.width)?;
        grid.set(position(self.height - 2, self.width - 2), GridObject::exit())?;
        let agent = if self.random_agent {
            Agent::new(random_floor(&grid, rng)?, random_orientation(rng))
        } else {
            Agent::new(Position::new(1, 1), Orientation::East)
        };
        State::new(grid, agent)
    }
}

impl ResetFunction for EmptyReset {
    fn reset(&self, rng: &mut GridRng) -> Result<State, GridverseError> {
        Ok(self.build(rng)?)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "empty"
    }
}

// ---------------------------------------------------------------------------
// FourRoomsReset
// ---------------------------------------------------------------------------

/// Four rooms joined by one random opening in each dividing wall segment,
/// with the Exit and the agent on random Floor cells.
#[derive(Debug, Clone, Copy)]
pub struct FourRoomsReset {
    height: usize,
    width: usize,
}

impl FourRoomsReset {
    pub fn new(height: usize, width: usize) -> Result<Self, ConfigError> {
        if height < 5 {
            return Err(too_small("four_rooms", "height", 5, height));
        }
        if width < 5 {
            return Err(too_small("four_rooms", "width", 5, width));
        }
        Ok(Self { height, width })
    }
}

impl ResetFunction for FourRoomsReset {
    fn reset(&self, rng: &mut GridRng) -> Result<State, GridverseError> {
        let (h, w) = (self.height, self.width);
        let (split_y, split_x) = (h / 2, w / 2);
        let mut grid = walled_room(h, w)?;
        for y in 0..h {
            grid.set(position(y, split_x), GridObject::Wall)?;
        }
        for x in 0..w {
            grid.set(position(split_y, x), GridObject::Wall)?;
        }

        let openings = [
            position(rng.gen_range(1..split_y), split_x),
            position(rng.gen_range(split_y + 1..h - 1), split_x),
            position(split_y, rng.gen_range(1..split_x)),
            position(split_y, rng.gen_range(split_x + 1..w - 1)),
        ];
        for p in openings {
            grid.set(p, GridObject::Floor)?;
        }

        let exit = random_floor(&grid, rng)?;
        grid.set(exit, GridObject::exit())?;
        let agent = Agent::new(random_floor(&grid, rng)?, random_orientation(rng));
        Ok(State::new(grid, agent)?)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "four_rooms"
    }
}

// ---------------------------------------------------------------------------
// DynamicObstaclesReset
// ---------------------------------------------------------------------------

/// [`EmptyReset`] plus `num_obstacles` moving obstacles on distinct vacant
/// Floor cells.
#[derive(Debug, Clone, Copy)]
pub struct DynamicObstaclesReset {
    room: EmptyReset,
    num_obstacles: usize,
}

impl DynamicObstaclesReset {
    pub fn new(
        height: usize,
        width: usize,
        num_obstacles: usize,
        random_agent: bool,
    ) -> Result<Self, ConfigError> {
        let room = EmptyReset::new(height, width, random_agent)?;
        // interior minus the exit and the agent
        let vacant = (height - 2) * (width - 2) - 2;
        if num_obstacles > vacant {
            return Err(ConfigError::InvalidParameter {
                unit: "dynamic_obstacles".into(),
                key: "num_obstacles".into(),
                message: format!("{num_obstacles} obstacles do not fit in {vacant} vacant cells"),
            });
        }
        Ok(Self { room, num_obstacles })
    }
}

impl ResetFunction for DynamicObstaclesReset {
    fn reset(&self, rng: &mut GridRng) -> Result<State, GridverseError> {
        let mut state = self.room.build(rng)?;
        let agent = state.agent.position();
        let vacant: Vec<Position> = state
            .grid
            .positions_of(ObjectKind::Floor)
            .into_iter()
            .filter(|p| *p != agent)
            .collect();
        for p in vacant.choose_multiple(rng, self.num_obstacles) {
            state.grid.set(*p, GridObject::MovingObstacle)?;
        }
        Ok(state)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "dynamic_obstacles"
    }
}

// ---------------------------------------------------------------------------
// DoorKeyReset
// ---------------------------------------------------------------------------

/// Square room split by a wall column with a locked yellow door.
///
/// The yellow key and the agent start on distinct cells left of the wall;
/// the Exit sits in the bottom-right corner.
#[derive(Debug, Clone, Copy)]
pub struct DoorKeyReset {
    size: usize,
}

impl DoorKeyReset {
    pub fn new(size: usize) -> Result<Self, ConfigError> {
        if size < 5 {
            return Err(too_small("door_key", "size", 5, size));
        }
        Ok(Self { size })
    }
}

impl ResetFunction for DoorKeyReset {
    fn reset(&self, rng: &mut GridRng) -> Result<State, GridverseError> {
        let size = self.size;
        let mut grid = walled_room(size, size)?;
        grid.set(position(size - 2, size - 2), GridObject::exit())?;

        let wall_x = rng.gen_range(2..=size - 3);
        for y in 0..size {
            grid.set(position(y, wall_x), GridObject::Wall)?;
        }
        let door_y = rng.gen_range(2..=size - 2);
        grid.set(
            position(door_y, wall_x),
            GridObject::door(DoorStatus::Locked, Color::Yellow),
        )?;

        let left: Vec<Position> = (1..=size - 2)
            .flat_map(|y| (1..wall_x).map(move |x| position(y, x)))
            .collect();
        let chosen: Vec<Position> = left.choose_multiple(rng, 2).copied().collect();
        let [key, agent] = chosen[..] else {
            return Err(InvariantError::NotUnique {
                kind: ObjectKind::Floor,
                count: chosen.len(),
            }
            .into());
        };
        grid.set(key, GridObject::key(Color::Yellow))?;
        let agent = Agent::new(agent, random_orientation(rng));
        Ok(State::new(grid, agent)?)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "door_key"
    }
}

// ---------------------------------------------------------------------------
// TeleportReset
// ---------------------------------------------------------------------------

/// Walled room with a pair of red telepods in the off-diagonal corners, the
/// Exit bottom-right and the agent top-left facing East.
#[derive(Debug, Clone, Copy)]
pub struct TeleportReset {
    height: usize,
    width: usize,
}

impl TeleportReset {
    pub fn new(height: usize, width: usize) -> Result<Self, ConfigError> {
        if height < 4 {
            return Err(too_small("teleport", "height", 4, height));
        }
        if width < 4 {
            return Err(too_small("teleport", "width", 4, width));
        }
        Ok(Self { height, width })
    }
}

impl ResetFunction for TeleportReset {
    fn reset(&self, _rng: &mut GridRng) -> Result<State, GridverseError> {
        let (h, w) = (self.height, self.width);
        let mut grid = walled_room(h, w)?;
        grid.set(position(h - 2, w - 2), GridObject::exit())?;
        grid.set(position(1, w - 2), GridObject::telepod(Color::Red))?;
        grid.set(position(h - 2, 1), GridObject::telepod(Color::Red))?;
        Ok(State::new(grid, Agent::new(Position::new(1, 1), Orientation::East))?)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "teleport"
    }
}

// ---------------------------------------------------------------------------
// LayoutReset
// ---------------------------------------------------------------------------

/// Fixed world drawn as ASCII rows.
///
/// | glyph | object |
/// |-------|--------|
/// | `#` | Wall |
/// | `.` | Floor |
/// | `E` | Exit |
/// | `K` | yellow Key |
/// | `D` | locked yellow Door |
/// | `d` | closed yellow Door |
/// | `_` | open yellow Door |
/// | `O` | MovingObstacle |
/// | `T` | red Telepod |
/// | `^` `>` `v` `<` | agent facing N/E/S/W, on Floor |
#[derive(Debug, Clone)]
pub struct LayoutReset {
    state: State,
}

impl LayoutReset {
    pub fn new<S: AsRef<str>>(rows: &[S]) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidParameter {
            unit: "layout".into(),
            key: "rows".into(),
            message,
        };
        let mut agent = None;
        let mut cells = Vec::with_capacity(rows.len());
        for (y, row) in rows.iter().enumerate() {
            let mut line = Vec::new();
            for (x, glyph) in row.as_ref().chars().enumerate() {
                let orientation = match glyph {
                    '^' => Some(Orientation::North),
                    '>' => Some(Orientation::East),
                    'v' => Some(Orientation::South),
                    '<' => Some(Orientation::West),
                    _ => None,
                };
                if let Some(orientation) = orientation {
                    if agent.is_some() {
                        return Err(invalid("more than one agent glyph".into()));
                    }
                    agent = Some(Agent::new(position(y, x), orientation));
                    line.push(GridObject::Floor);
                    continue;
                }
                line.push(match glyph {
                    '#' => GridObject::Wall,
                    '.' => GridObject::Floor,
                    'E' => GridObject::exit(),
                    'K' => GridObject::key(Color::Yellow),
                    'D' => GridObject::door(DoorStatus::Locked, Color::Yellow),
                    'd' => GridObject::door(DoorStatus::Closed, Color::Yellow),
                    '_' => GridObject::door(DoorStatus::Open, Color::Yellow),
                    'O' => GridObject::MovingObstacle,
                    'T' => GridObject::telepod(Color::Red),
                    other => return Err(invalid(format!("unknown glyph `{other}` at ({y}, {x})"))),
                });
            }
            cells.push(line);
        }
        let agent = agent.ok_or_else(|| invalid("no agent glyph".into()))?;
        let grid = Grid::from_rows(cells).map_err(|e| invalid(e.to_string()))?;
        let state = State::new(grid, agent).map_err(|e| invalid(e.to_string()))?;
        debug!(shape = ?state.grid.shape(), "parsed layout");
        Ok(Self { state })
    }

    #[must_use]
    pub const fn state(&self) -> &State {
        &self.state
    }
}

impl ResetFunction for LayoutReset {
    fn reset(&self, _rng: &mut GridRng) -> Result<State, GridverseError> {
        Ok(self.state.clone())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "layout"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
