//! Visibility engine: which cells of an agent-relative view can be seen.
//!
//! All functions share the [`VisibilityFunction`] contract. Views are in the
//! agent frame (agent facing up). The agent's own cell is always visible.

use std::cmp::Ordering;

use rand::Rng;

use gridverse_core::error::{ConfigError, InvariantError};
use gridverse_core::geometry::{Area, Position};
use gridverse_core::grid::Grid;
use gridverse_core::object::Capabilities;
use gridverse_core::seed::GridRng;

use crate::traits::VisibilityFunction;

// ---------------------------------------------------------------------------
// VisibilityMask
// ---------------------------------------------------------------------------

/// Boolean mask with the shape of the view it was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisibilityMask {
    height: usize,
    width: usize,
    cells: Vec<bool>,
}

impl VisibilityMask {
    #[must_use]
    pub fn filled(height: usize, width: usize, visible: bool) -> Self {
        Self {
            height,
            width,
            cells: vec![visible; height * width],
        }
    }

    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    #[allow(clippy::cast_sign_loss)]
    fn index(&self, p: Position) -> Option<usize> {
        Area::from_shape(self.height, self.width)
            .contains(p)
            .then(|| p.y as usize * self.width + p.x as usize)
    }

    /// Out-of-range positions are reported invisible.
    #[must_use]
    pub fn get(&self, p: Position) -> bool {
        self.index(p).is_some_and(|i| self.cells[i])
    }

    /// Positions outside the mask are ignored.
    pub fn set(&mut self, p: Position, visible: bool) {
        if let Some(i) = self.index(p) {
            self.cells[i] = visible;
        }
    }

    #[must_use]
    pub fn count_visible(&self) -> usize {
        self.cells.iter().filter(|v| **v).count()
    }

    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<bool>> {
        self.cells.chunks(self.width).map(<[bool]>::to_vec).collect()
    }
}

fn transparent(view: &Grid, p: Position) -> bool {
    view.get(p).is_ok_and(|obj| !obj.blocks_vision())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn require_bottom_row(view: &Grid, agent: Position) -> Result<(), InvariantError> {
    if agent.y == view.height() as i32 - 1 && view.contains(agent) {
        Ok(())
    } else {
        Err(InvariantError::AgentNotOnBottomRow {
            y: agent.y,
            height: view.height(),
        })
    }
}

// ---------------------------------------------------------------------------
// FullVisibility
// ---------------------------------------------------------------------------

/// Every cell visible; occlusion is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullVisibility;

impl VisibilityFunction for FullVisibility {
    fn visibility(
        &self,
        view: &Grid,
        _agent_position: Position,
        _rng: &mut GridRng,
    ) -> Result<VisibilityMask, InvariantError> {
        Ok(VisibilityMask::filled(view.height(), view.width(), true))
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "full"
    }
}

// ---------------------------------------------------------------------------
// WedgeVisibility
// ---------------------------------------------------------------------------

/// Front-facing cone that widens by one cell on each side per row.
///
/// A cell `(y, x)` is visible iff it lies on or ahead of the agent's row and
/// `|x - agent.x| <= agent.y - y`. Transparency is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct WedgeVisibility;

impl VisibilityFunction for WedgeVisibility {
    fn visibility(
        &self,
        view: &Grid,
        agent_position: Position,
        _rng: &mut GridRng,
    ) -> Result<VisibilityMask, InvariantError> {
        let mut mask = VisibilityMask::filled(view.height(), view.width(), false);
        for p in view.positions() {
            let ahead = agent_position.y - p.y;
            if ahead >= 0 && (p.x - agent_position.x).abs() <= ahead {
                mask.set(p, true);
            }
        }
        mask.set(agent_position, true);
        Ok(mask)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "wedge"
    }
}

// ---------------------------------------------------------------------------
// PartialVisibility
// ---------------------------------------------------------------------------

/// Shadow propagation outward from an agent on the bottom row.
///
/// Straight lines up, left and right are visible until the first opaque
/// cell; every other cell is visible if one of its three neighbours towards
/// the agent is both visible and transparent.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialVisibility;

impl VisibilityFunction for PartialVisibility {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn visibility(
        &self,
        view: &Grid,
        agent_position: Position,
        _rng: &mut GridRng,
    ) -> Result<VisibilityMask, InvariantError> {
        require_bottom_row(view, agent_position)?;
        let Position { y: ay, x: ax } = agent_position;
        let w = view.width() as i32;
        let mut mask = VisibilityMask::filled(view.height(), view.width(), false);
        mask.set(agent_position, true);

        let lit = |mask: &VisibilityMask, y: i32, x: i32| {
            let p = Position::new(y, x);
            mask.get(p) && transparent(view, p)
        };

        for y in (0..ay).rev() {
            let v = lit(&mask, y + 1, ax);
            mask.set(Position::new(y, ax), v);
        }
        for x in ax + 1..w {
            let v = lit(&mask, ay, x - 1);
            mask.set(Position::new(ay, x), v);
        }
        for x in (0..ax).rev() {
            let v = lit(&mask, ay, x + 1);
            mask.set(Position::new(ay, x), v);
        }
        for y in (0..ay).rev() {
            for x in (0..ax).rev() {
                let v = lit(&mask, y + 1, x) || lit(&mask, y, x + 1) || lit(&mask, y + 1, x + 1);
                mask.set(Position::new(y, x), v);
            }
            for x in ax + 1..w {
                let v = lit(&mask, y + 1, x) || lit(&mask, y, x - 1) || lit(&mask, y + 1, x - 1);
                mask.set(Position::new(y, x), v);
            }
        }
        Ok(mask)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "partial"
    }
}

// ---------------------------------------------------------------------------
// MinigridVisibility
// ---------------------------------------------------------------------------

/// Row-by-row sweep from an agent on the bottom row: light spreads sideways
/// and diagonally upward from every visible transparent cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinigridVisibility;

impl VisibilityFunction for MinigridVisibility {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn visibility(
        &self,
        view: &Grid,
        agent_position: Position,
        _rng: &mut GridRng,
    ) -> Result<VisibilityMask, InvariantError> {
        require_bottom_row(view, agent_position)?;
        let h = view.height() as i32;
        let w = view.width() as i32;
        let mut mask = VisibilityMask::filled(view.height(), view.width(), false);
        mask.set(agent_position, true);

        for y in (0..h).rev() {
            for x in 0..w - 1 {
                let p = Position::new(y, x);
                if mask.get(p) && transparent(view, p) {
                    mask.set(Position::new(y, x + 1), true);
                    if y > 0 {
                        mask.set(Position::new(y - 1, x), true);
                        mask.set(Position::new(y - 1, x + 1), true);
                    }
                }
            }
            for x in (1..w).rev() {
                let p = Position::new(y, x);
                if mask.get(p) && transparent(view, p) {
                    mask.set(Position::new(y, x - 1), true);
                    if y > 0 {
                        mask.set(Position::new(y - 1, x), true);
                        mask.set(Position::new(y - 1, x - 1), true);
                    }
                }
            }
        }
        Ok(mask)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "minigrid"
    }
}

// ---------------------------------------------------------------------------
// RaytracingVisibility
// ---------------------------------------------------------------------------

/// Exact line-of-sight between cell centers.
///
/// A target is visible iff no vision-blocking cell is crossed by the open
/// segment joining the agent's cell center to the target's cell center. A
/// cell is crossed when the segment passes through the interior of its unit
/// square; touching only a corner does not count. The endpoints themselves
/// never occlude, so a wall is visible if nothing lies in front of it.
///
/// All arithmetic is on exact rationals, so results do not depend on
/// sampling resolution or evaluation order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RaytracingVisibility;

/// `num / den` with `den > 0`.
#[derive(Debug, Clone, Copy)]
struct Fraction {
    num: i64,
    den: i64,
}

impl Fraction {
    const ZERO: Self = Self { num: 0, den: 1 };
    const ONE: Self = Self { num: 1, den: 1 };

    fn compare(self, other: Self) -> Ordering {
        (self.num * other.den).cmp(&(other.num * self.den))
    }

    fn larger(self, other: Self) -> Self {
        if self.compare(other) == Ordering::Less { other } else { self }
    }

    fn smaller(self, other: Self) -> Self {
        if self.compare(other) == Ordering::Greater { other } else { self }
    }
}

/// Open interval of the segment parameter `t` for which the coordinate
/// `a + t * d` lies strictly within `half` of `c`.
fn axis_interval(a: i64, d: i64, c: i64, half: i64) -> Option<(Fraction, Fraction)> {
    if d == 0 {
        return ((a - c).abs() < half).then_some((Fraction::ZERO, Fraction::ONE));
    }
    let (mut lo, mut hi, mut den) = (c - half - a, c + half - a, d);
    if den < 0 {
        (lo, hi, den) = (-hi, -lo, -den);
    }
    Some((Fraction { num: lo, den }, Fraction { num: hi, den }))
}

/// Whether the segment `from -> to` passes through the interior of the
/// square of half-side `half` centred on `cell`. Points are `(y, x)` in a
/// common integer scale.
fn segment_crosses(from: (i64, i64), to: (i64, i64), cell: (i64, i64), half: i64) -> bool {
    let (Some((ylo, yhi)), Some((xlo, xhi))) = (
        axis_interval(from.0, to.0 - from.0, cell.0, half),
        axis_interval(from.1, to.1 - from.1, cell.1, half),
    ) else {
        return false;
    };
    let lo = Fraction::ZERO.larger(ylo).larger(xlo);
    let hi = Fraction::ONE.smaller(yhi).smaller(xhi);
    lo.compare(hi) == Ordering::Less
}

/// `p` in units of `1 / scale` of a cell.
fn scaled(p: Position, scale: i64) -> (i64, i64) {
    (scale * i64::from(p.y), scale * i64::from(p.x))
}

fn crosses(from: Position, to: Position, cell: Position) -> bool {
    segment_crosses(scaled(from, 2), scaled(to, 2), scaled(cell, 2), 1)
}

/// Cells in the bounding box of `from` and `to`, endpoints excluded.
fn between(from: Position, to: Position) -> Vec<Position> {
    Area::new(
        from.y.min(to.y),
        from.y.max(to.y),
        from.x.min(to.x),
        from.x.max(to.x),
    )
    .positions()
    .filter(|p| *p != from && *p != to)
    .collect()
}

/// Whether nothing opaque lies strictly between `from` and `to`.
#[must_use]
pub fn line_of_sight(view: &Grid, from: Position, to: Position) -> bool {
    between(from, to)
        .into_iter()
        .filter(|p| crosses(from, to, *p))
        .all(|p| transparent(view, p))
}

impl VisibilityFunction for RaytracingVisibility {
    fn visibility(
        &self,
        view: &Grid,
        agent_position: Position,
        _rng: &mut GridRng,
    ) -> Result<VisibilityMask, InvariantError> {
        let mut mask = VisibilityMask::filled(view.height(), view.width(), false);
        for p in view.positions() {
            if line_of_sight(view, agent_position, p) {
                mask.set(p, true);
            }
        }
        mask.set(agent_position, true);
        Ok(mask)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "raytracing"
    }
}

// ---------------------------------------------------------------------------
// StochasticRaytracingVisibility
// ---------------------------------------------------------------------------

/// Raytracing with partial occlusion.
///
/// Rays leave the agent's cell center toward a `samples x samples` lattice
/// of points inside each target cell. A cell is visible with probability
/// equal to the fraction of its rays that cross no vision-blocking cell,
/// using the same crossing rule as [`RaytracingVisibility`]. With one
/// sample per axis the fractions are 0 or 1 and the mask matches it.
///
/// One draw per cell in row-major order; fully lit and fully shadowed cells
/// are decided without consuming randomness.
#[derive(Debug, Clone, Copy)]
pub struct StochasticRaytracingVisibility {
    samples: u32,
}

impl StochasticRaytracingVisibility {
    pub const DEFAULT_SAMPLES: u32 = 3;
    pub const MAX_SAMPLES: u32 = 16;

    pub fn new(samples: u32) -> Result<Self, ConfigError> {
        if !(1..=Self::MAX_SAMPLES).contains(&samples) {
            return Err(ConfigError::InvalidParameter {
                unit: "stochastic_raytracing".into(),
                key: "samples".into(),
                message: format!("must lie in [1, {}], got {samples}", Self::MAX_SAMPLES),
            });
        }
        Ok(Self { samples })
    }

    /// Sample points per axis of each target cell.
    #[must_use]
    pub const fn samples(&self) -> u32 {
        self.samples
    }

    /// Fraction of the rays from `from` into `to` that nothing opaque blocks.
    #[must_use]
    pub fn lit_fraction(&self, view: &Grid, from: Position, to: Position) -> f64 {
        if from == to {
            return 1.0;
        }
        let k = i64::from(self.samples);
        let scale = 2 * k;
        let blockers: Vec<(i64, i64)> = between(from, to)
            .into_iter()
            .filter(|p| !transparent(view, *p))
            .map(|p| scaled(p, scale))
            .collect();
        if blockers.is_empty() {
            return 1.0;
        }
        let origin = scaled(from, scale);
        let center = scaled(to, scale);
        // Offsets of the lattice points from the cell center, strictly
        // inside the cell.
        let offsets: Vec<i64> = (0..k).map(|i| 2 * i + 1 - k).collect();
        let mut lit = 0_u32;
        for dy in &offsets {
            for dx in &offsets {
                let target = (center.0 + dy, center.1 + dx);
                if !blockers.iter().any(|cell| segment_crosses(origin, target, *cell, k)) {
                    lit += 1;
                }
            }
        }
        f64::from(lit) / f64::from(self.samples * self.samples)
    }
}

impl Default for StochasticRaytracingVisibility {
    fn default() -> Self {
        Self { samples: Self::DEFAULT_SAMPLES }
    }
}

impl VisibilityFunction for StochasticRaytracingVisibility {
    fn visibility(
        &self,
        view: &Grid,
        agent_position: Position,
        rng: &mut GridRng,
    ) -> Result<VisibilityMask, InvariantError> {
        let mut mask = VisibilityMask::filled(view.height(), view.width(), false);
        for p in view.positions() {
            let fraction = self.lit_fraction(view, agent_position, p);
            let visible = if fraction >= 1.0 {
                true
            } else if fraction <= 0.0 {
                false
            } else {
                rng.gen_bool(fraction)
            };
            mask.set(p, visible);
        }
        mask.set(agent_position, true);
        Ok(mask)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "stochastic_raytracing"
    }

    fn is_deterministic(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// CoinflipVisibility
// ---------------------------------------------------------------------------

/// Each cell independently visible with a fixed probability.
///
/// Stochastic: one draw per cell in row-major order, including the agent's
/// cell, which is then forced visible. Identical inputs give different masks
/// unless the generator state is identical too.
#[derive(Debug, Clone, Copy)]
pub struct CoinflipVisibility {
    probability: f64,
}

impl CoinflipVisibility {
    pub fn new(probability: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfigError::InvalidParameter {
                unit: "coinflip".into(),
                key: "probability".into(),
                message: format!("must lie in [0, 1], got {probability}"),
            });
        }
        Ok(Self { probability })
    }

    #[must_use]
    pub const fn probability(&self) -> f64 {
        self.probability
    }
}

impl VisibilityFunction for CoinflipVisibility {
    fn visibility(
        &self,
        view: &Grid,
        agent_position: Position,
        rng: &mut GridRng,
    ) -> Result<VisibilityMask, InvariantError> {
        let mut mask = VisibilityMask::filled(view.height(), view.width(), false);
        for p in view.positions() {
            let visible = rng.gen_bool(self.probability);
            mask.set(p, visible);
        }
        mask.set(agent_position, true);
        Ok(mask)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "coinflip"
    }

    fn is_deterministic(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
