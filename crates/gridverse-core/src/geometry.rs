//! Positions, orientations, poses and rectangular areas.
//!
//! Coordinates are `(y, x)` = (row, column) with `y` growing downwards.
//! North is "up" (`y - 1`). All operations here are pure value arithmetic.

use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Integer `(y, x)` grid coordinate, also used for offsets between cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    pub y: i32,
    pub x: i32,
}

impl Position {
    #[must_use]
    pub const fn new(y: i32, x: i32) -> Self {
        Self { y, x }
    }

    #[must_use]
    pub const fn origin() -> Self {
        Self { y: 0, x: 0 }
    }

    /// L1 distance.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> i32 {
        (self.y - other.y).abs() + (self.x - other.x).abs()
    }

    /// L2 distance.
    #[must_use]
    pub fn euclidean(self, other: Self) -> f32 {
        let dy = (self.y - other.y) as f32;
        let dx = (self.x - other.x) as f32;
        dy.hypot(dx)
    }
}

impl Add for Position {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.y + rhs.y, self.x + rhs.x)
    }
}

impl Sub for Position {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.y - rhs.y, self.x - rhs.x)
    }
}

impl Neg for Position {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.y, -self.x)
    }
}

impl From<(i32, i32)> for Position {
    fn from((y, x): (i32, i32)) -> Self {
        Self::new(y, x)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.y, self.x)
    }
}

// ---------------------------------------------------------------------------
// Orientation
// ---------------------------------------------------------------------------

/// One of the four cardinal directions.
///
/// Orientations double as rotations: `North` is the identity and each
/// subsequent variant is a further clockwise quarter turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    North,
    East,
    South,
    West,
}

impl Orientation {
    pub const ALL: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Number of clockwise quarter turns from `North`.
    #[must_use]
    pub const fn quarter_turns(self) -> u8 {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    #[must_use]
    pub const fn from_quarter_turns(turns: u8) -> Self {
        match turns % 4 {
            0 => Self::North,
            1 => Self::East,
            2 => Self::South,
            _ => Self::West,
        }
    }

    #[must_use]
    pub const fn rotate_left(self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + 3)
    }

    #[must_use]
    pub const fn rotate_right(self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + 1)
    }

    /// Rotation composition: apply `other`, then `self`.
    #[must_use]
    pub const fn compose(self, other: Self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + other.quarter_turns())
    }

    #[must_use]
    pub const fn inverse(self) -> Self {
        Self::from_quarter_turns(4 - self.quarter_turns())
    }

    /// Unit step in this direction.
    #[must_use]
    pub const fn as_delta(self) -> Position {
        match self {
            Self::North => Position::new(-1, 0),
            Self::East => Position::new(0, 1),
            Self::South => Position::new(1, 0),
            Self::West => Position::new(0, -1),
        }
    }

    /// Rotate an offset expressed in a north-facing frame into this frame.
    #[must_use]
    pub const fn rotate(self, offset: Position) -> Position {
        match self {
            Self::North => offset,
            Self::East => Position::new(offset.x, -offset.y),
            Self::South => Position::new(-offset.y, -offset.x),
            Self::West => Position::new(-offset.x, offset.y),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::North => "north",
            Self::East => "east",
            Self::South => "south",
            Self::West => "west",
        };
        f.write_str(name)
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "north" | "n" => Ok(Self::North),
            "east" | "e" => Ok(Self::East),
            "south" | "s" => Ok(Self::South),
            "west" | "w" => Ok(Self::West),
            other => Err(format!("unknown orientation `{other}`")),
        }
    }
}

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// A position plus an orientation.
///
/// Read as a frame transform: [`Pose::apply`] maps an offset in the pose's
/// local (north-facing) frame to the parent frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Position,
    pub orientation: Orientation,
}

impl Pose {
    #[must_use]
    pub const fn new(position: Position, orientation: Orientation) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Local → parent.
    #[must_use]
    pub fn apply(self, local: Position) -> Position {
        self.position + self.orientation.rotate(local)
    }

    /// Parent → local.
    #[must_use]
    pub fn unapply(self, global: Position) -> Position {
        self.orientation.inverse().rotate(global - self.position)
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    #[must_use]
    pub fn compose(self, other: Self) -> Self {
        Self::new(
            self.apply(other.position),
            self.orientation.compose(other.orientation),
        )
    }

    #[must_use]
    pub fn inverse(self) -> Self {
        let orientation = self.orientation.inverse();
        Self::new(-orientation.rotate(self.position), orientation)
    }

    /// The cell directly ahead.
    #[must_use]
    pub fn front(self) -> Position {
        self.position + self.orientation.as_delta()
    }
}

// ---------------------------------------------------------------------------
// Area
// ---------------------------------------------------------------------------

/// Inclusive rectangle `[ymin, ymax] × [xmin, xmax]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Area {
    pub ymin: i32,
    pub ymax: i32,
    pub xmin: i32,
    pub xmax: i32,
}

impl Area {
    #[must_use]
    pub const fn new(ymin: i32, ymax: i32, xmin: i32, xmax: i32) -> Self {
        Self {
            ymin,
            ymax,
            xmin,
            xmax,
        }
    }

    /// The area covering a `height × width` grid anchored at the origin.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub const fn from_shape(height: usize, width: usize) -> Self {
        Self::new(0, height as i32 - 1, 0, width as i32 - 1)
    }

    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn height(&self) -> usize {
        (self.ymax - self.ymin + 1).max(0) as usize
    }

    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn width(&self) -> usize {
        (self.xmax - self.xmin + 1).max(0) as usize
    }

    #[must_use]
    pub const fn top_left(&self) -> Position {
        Position::new(self.ymin, self.xmin)
    }

    #[must_use]
    pub const fn contains(&self, p: Position) -> bool {
        self.ymin <= p.y && p.y <= self.ymax && self.xmin <= p.x && p.x <= self.xmax
    }

    /// Every position, row-major.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (self.ymin..=self.ymax).flat_map(move |y| (self.xmin..=self.xmax).map(move |x| Position::new(y, x)))
    }

    /// Positions on the outer ring, row-major.
    pub fn border_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions().filter(move |p| self.is_border(*p))
    }

    /// Positions strictly inside the outer ring, row-major.
    pub fn inner_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions().filter(move |p| !self.is_border(*p))
    }

    fn is_border(&self, p: Position) -> bool {
        p.y == self.ymin || p.y == self.ymax || p.x == self.xmin || p.x == self.xmax
    }

    #[must_use]
    pub const fn translate(&self, offset: Position) -> Self {
        Self::new(
            self.ymin + offset.y,
            self.ymax + offset.y,
            self.xmin + offset.x,
            self.xmax + offset.x,
        )
    }
}

// ---------------------------------------------------------------------------
// Distances
// ---------------------------------------------------------------------------

/// Metric used by distance-shaped rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    #[default]
    Manhattan,
    Euclidean,
}

impl DistanceMetric {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn distance(self, a: Position, b: Position) -> f32 {
        match self {
            Self::Manhattan => a.manhattan(b) as f32,
            Self::Euclidean => a.euclidean(b),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manhattan" => Ok(Self::Manhattan),
            "euclidean" => Ok(Self::Euclidean),
            other => Err(format!("unknown distance metric `{other}`")),
        }
    }
}

/// Positions at exactly Manhattan distance `distance` from `center`.
///
/// Ordered clockwise starting from the top vertex, so for `distance == 1`
/// the order is top, right, bottom, left.
#[must_use]
pub fn manhattan_boundary(center: Position, distance: i32) -> Vec<Position> {
    if distance <= 0 {
        return vec![center];
    }
    let d = distance;
    let mut out = Vec::with_capacity(4 * d as usize);
    for k in 0..d {
        out.push(Position::new(center.y - d + k, center.x + k));
    }
    for k in 0..d {
        out.push(Position::new(center.y + k, center.x + d - k));
    }
    for k in 0..d {
        out.push(Position::new(center.y + d - k, center.x - k));
    }
    for k in 0..d {
        out.push(Position::new(center.y - k, center.x - d + k));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn position_arithmetic() {
        let a = Position::new(1, 2);
        let b = Position::new(3, -1);
        assert_eq!(a + b, Position::new(4, 1));
        assert_eq!(a - b, Position::new(-2, 3));
        assert_eq!(-a, Position::new(-1, -2));
    }

    #[test]
    fn distances() {
        let a = Position::new(0, 0);
        let b = Position::new(3, 4);
        assert_eq!(a.manhattan(b), 7);
        assert_relative_eq!(a.euclidean(b), 5.0);
        assert_relative_eq!(DistanceMetric::Manhattan.distance(a, b), 7.0);
    }

    #[test]
    fn rotation_table_is_closed() {
        for o in Orientation::ALL {
            assert_eq!(o.rotate_left().rotate_right(), o);
            assert_eq!(o.rotate_right().rotate_right().rotate_right().rotate_right(), o);
            assert_eq!(o.compose(o.inverse()), Orientation::North);
        }
        assert_eq!(Orientation::North.rotate_right(), Orientation::East);
        assert_eq!(Orientation::North.rotate_left(), Orientation::West);
        assert_eq!(Orientation::East.compose(Orientation::South), Orientation::West);
    }

    #[test]
    fn rotate_forward_matches_delta() {
        let forward = Position::new(-1, 0);
        for o in Orientation::ALL {
            assert_eq!(o.rotate(forward), o.as_delta());
        }
    }

    #[test]
    fn rotate_right_offset_when_facing_east_points_south() {
        assert_eq!(Orientation::East.rotate(Position::new(0, 1)), Position::new(1, 0));
        assert_eq!(Orientation::West.rotate(Position::new(0, 1)), Position::new(-1, 0));
    }

    #[test]
    fn pose_apply_unapply_roundtrip() {
        let pose = Pose::new(Position::new(3, 5), Orientation::West);
        for local in [Position::new(0, 0), Position::new(-2, 1), Position::new(4, -3)] {
            assert_eq!(pose.unapply(pose.apply(local)), local);
        }
    }

    #[test]
    fn pose_inverse_composes_to_identity() {
        let pose = Pose::new(Position::new(2, -1), Orientation::East);
        let identity = pose.compose(pose.inverse());
        assert_eq!(identity, Pose::default());
    }

    #[test]
    fn pose_compose_applies_right_first() {
        let a = Pose::new(Position::new(1, 1), Orientation::East);
        let b = Pose::new(Position::new(0, 2), Orientation::South);
        let p = Position::new(-1, 0);
        assert_eq!(a.compose(b).apply(p), a.apply(b.apply(p)));
    }

    #[test]
    fn pose_front() {
        let pose = Pose::new(Position::new(1, 1), Orientation::East);
        assert_eq!(pose.front(), Position::new(1, 2));
    }

    #[test]
    fn area_iteration() {
        let area = Area::from_shape(3, 4);
        assert_eq!(area.height(), 3);
        assert_eq!(area.width(), 4);
        assert_eq!(area.positions().count(), 12);
        assert_eq!(area.border_positions().count(), 10);
        assert_eq!(area.inner_positions().collect::<Vec<_>>(), vec![
            Position::new(1, 1),
            Position::new(1, 2)
        ]);
        assert!(area.contains(Position::new(2, 3)));
        assert!(!area.contains(Position::new(3, 0)));
    }

    #[test]
    fn area_translate() {
        let area = Area::new(0, 1, 0, 1).translate(Position::new(2, -1));
        assert_eq!(area, Area::new(2, 3, -1, 0));
    }

    #[test]
    fn manhattan_boundary_unit_order() {
        let ring = manhattan_boundary(Position::new(2, 2), 1);
        assert_eq!(ring, vec![
            Position::new(1, 2),
            Position::new(2, 3),
            Position::new(3, 2),
            Position::new(2, 1),
        ]);
    }

    #[test]
    fn manhattan_boundary_distance_two() {
        let center = Position::new(5, 5);
        let ring = manhattan_boundary(center, 2);
        assert_eq!(ring.len(), 8);
        assert!(ring.iter().all(|p| p.manhattan(center) == 2));
    }

    #[test]
    fn orientation_from_str() {
        assert_eq!("East".parse::<Orientation>(), Ok(Orientation::East));
        assert!("up".parse::<Orientation>().is_err());
    }
}
