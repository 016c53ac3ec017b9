//! Bounds-checked 2-D container of grid objects.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::InvariantError;
use crate::geometry::{Area, Orientation, Pose, Position};
use crate::object::{Capabilities, DoorStatus, GridObject, ObjectKind};

/// Rectangular, row-major array of [`GridObject`]s.
///
/// The shape is fixed at construction. Every cell holds exactly one object;
/// the only way to change a cell is to overwrite it ([`Grid::set`]) or
/// exchange it with another cell ([`Grid::swap`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    height: usize,
    width: usize,
    cells: Vec<GridObject>,
}

impl Grid {
    /// A `height × width` grid with every cell set to `object`.
    pub fn filled(height: usize, width: usize, object: &GridObject) -> Result<Self, InvariantError> {
        if height == 0 || width == 0 {
            return Err(InvariantError::EmptyGrid);
        }
        Ok(Self {
            height,
            width,
            cells: vec![object.clone(); height * width],
        })
    }

    /// A `height × width` grid of floor.
    pub fn new(height: usize, width: usize) -> Result<Self, InvariantError> {
        Self::filled(height, width, &GridObject::Floor)
    }

    /// Build from explicit rows. All rows must have the same, non-zero length.
    pub fn from_rows(rows: Vec<Vec<GridObject>>) -> Result<Self, InvariantError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if height == 0 || width == 0 {
            return Err(InvariantError::EmptyGrid);
        }
        if rows.iter().any(|row| row.len() != width) {
            return Err(InvariantError::RaggedGrid);
        }
        Ok(Self {
            height,
            width,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// `(height, width)`.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    #[must_use]
    pub const fn area(&self) -> Area {
        Area::from_shape(self.height, self.width)
    }

    /// Whether `p` is a cell of the grid. Negative positions are never
    /// contained, even though [`Grid::get`] accepts them.
    #[must_use]
    pub const fn contains(&self, p: Position) -> bool {
        self.area().contains(p)
    }

    /// Flat index of `p`, wrapping negative coordinates around once.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn index_of(&self, p: Position) -> Result<usize, InvariantError> {
        let h = self.height as i32;
        let w = self.width as i32;
        let y = if p.y < 0 { p.y + h } else { p.y };
        let x = if p.x < 0 { p.x + w } else { p.x };
        if (0..h).contains(&y) && (0..w).contains(&x) {
            Ok(y as usize * self.width + x as usize)
        } else {
            Err(InvariantError::OutOfBounds {
                y: p.y,
                x: p.x,
                height: self.height,
                width: self.width,
            })
        }
    }

    pub fn get(&self, p: Position) -> Result<&GridObject, InvariantError> {
        let i = self.index_of(p)?;
        Ok(&self.cells[i])
    }

    pub fn get_mut(&mut self, p: Position) -> Result<&mut GridObject, InvariantError> {
        let i = self.index_of(p)?;
        Ok(&mut self.cells[i])
    }

    /// Overwrite the cell at `p`, returning its previous occupant.
    pub fn set(&mut self, p: Position, object: GridObject) -> Result<GridObject, InvariantError> {
        let cell = self.get_mut(p)?;
        Ok(std::mem::replace(cell, object))
    }

    /// Exchange the occupants of two cells.
    pub fn swap(&mut self, a: Position, b: Position) -> Result<(), InvariantError> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        self.cells.swap(i, j);
        Ok(())
    }

    /// Replace every occurrence of `from` with a clone of `to`. Returns the
    /// number of cells changed.
    pub fn replace(&mut self, from: &GridObject, to: &GridObject) -> usize {
        let mut changed = 0;
        for cell in self.cells.iter_mut().filter(|c| **c == *from) {
            cell.clone_from(to);
            changed += 1;
        }
        changed
    }

    /// All positions, row-major.
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        let area = self.area();
        (area.ymin..=area.ymax).flat_map(move |y| (area.xmin..=area.xmax).map(move |x| Position::new(y, x)))
    }

    /// `(position, object)` pairs, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &GridObject)> {
        self.positions().zip(self.cells.iter())
    }

    /// Positions holding an object of `kind`, row-major.
    #[must_use]
    pub fn positions_of(&self, kind: ObjectKind) -> Vec<Position> {
        self.iter()
            .filter(|(_, obj)| obj.kind() == kind)
            .map(|(p, _)| p)
            .collect()
    }

    #[must_use]
    pub fn count(&self, kind: ObjectKind) -> usize {
        self.cells.iter().filter(|obj| obj.kind() == kind).count()
    }

    /// The position of the single object of `kind`.
    pub fn unique_position_of(&self, kind: ObjectKind) -> Result<Position, InvariantError> {
        let found = self.positions_of(kind);
        match found.as_slice() {
            [p] => Ok(*p),
            _ => Err(InvariantError::NotUnique {
                kind,
                count: found.len(),
            }),
        }
    }

    /// Distinct object kinds present.
    #[must_use]
    pub fn object_kinds(&self) -> BTreeSet<ObjectKind> {
        self.cells.iter().map(Capabilities::kind).collect()
    }

    /// Copy of the cells covered by `area`, padding cells outside the grid
    /// with [`GridObject::Hidden`].
    pub fn subgrid(&self, area: Area) -> Result<Self, InvariantError> {
        let rows = (area.ymin..=area.ymax)
            .map(|y| {
                (area.xmin..=area.xmax)
                    .map(|x| self.cell_or_hidden(Position::new(y, x)))
                    .collect()
            })
            .collect();
        Self::from_rows(rows)
    }

    /// The grid rotated so that `orientation` points up.
    #[must_use]
    pub fn rotated(&self, orientation: Orientation) -> Self {
        let mut grid = self.clone();
        for _ in 0..orientation.quarter_turns() {
            grid = grid.rotated_counter_clockwise();
        }
        grid
    }

    fn rotated_counter_clockwise(&self) -> Self {
        let (h, w) = self.shape();
        let mut cells = Vec::with_capacity(h * w);
        for r in 0..w {
            for c in 0..h {
                cells.push(self.cells[c * w + (w - 1 - r)].clone());
            }
        }
        Self {
            height: w,
            width: h,
            cells,
        }
    }

    /// Agent-relative window of shape `height × width`.
    ///
    /// Local cell `(r, c)` shows the global cell
    /// `pose.apply((r, c) - anchor)`, so `anchor` is where the pose itself
    /// lands in the window and the pose's orientation points up. Cells
    /// outside the grid are [`GridObject::Hidden`].
    pub fn view(
        &self,
        pose: Pose,
        height: usize,
        width: usize,
        anchor: Position,
    ) -> Result<Self, InvariantError> {
        let local = Area::from_shape(height, width);
        let rows = (local.ymin..=local.ymax)
            .map(|r| {
                (local.xmin..=local.xmax)
                    .map(|c| self.cell_or_hidden(pose.apply(Position::new(r, c) - anchor)))
                    .collect()
            })
            .collect();
        Self::from_rows(rows)
    }

    fn cell_or_hidden(&self, p: Position) -> GridObject {
        if self.contains(p) {
            self.get(p).cloned().unwrap_or(GridObject::Hidden)
        } else {
            GridObject::Hidden
        }
    }
}

fn glyph(object: &GridObject) -> char {
    match object {
        GridObject::NoneObject => '?',
        GridObject::Hidden => ' ',
        GridObject::Floor => '.',
        GridObject::Wall => '#',
        GridObject::Exit { .. } => 'E',
        GridObject::Door { status, .. } => match status {
            DoorStatus::Open => '_',
            DoorStatus::Closed => 'd',
            DoorStatus::Locked => 'D',
        },
        GridObject::Key { .. } => 'K',
        GridObject::MovingObstacle => 'O',
        GridObject::Box { .. } => 'B',
        GridObject::Telepod { .. } => 'T',
        GridObject::Beacon { .. } => 'b',
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.cells.chunks(self.width).enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for object in row {
                write!(f, "{}", glyph(object))?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
