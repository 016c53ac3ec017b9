//! Observation functions.

use gridverse_core::error::{ConfigError, InvariantError};
use gridverse_core::geometry::{Area, Orientation, Position};
use gridverse_core::object::GridObject;
use gridverse_core::seed::GridRng;
use gridverse_core::{Agent, Observation, State};

use crate::traits::{ObservationFunction, VisibilityFunction};
use crate::visibility::FullVisibility;

/// Agent-centric window masked by a visibility function.
///
/// The window has shape `height x width`; the agent sits at `agent_position`
/// facing up and holds a copy of its real held object. Cells the visibility
/// function masks out, and cells beyond the grid, become
/// [`GridObject::Hidden`].
pub struct FromVisibility {
    height: usize,
    width: usize,
    agent_position: Position,
    visibility: Box<dyn VisibilityFunction>,
}

impl FromVisibility {
    /// Window with the agent at the bottom-center cell and full visibility.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn new(height: usize, width: usize) -> Result<Self, ConfigError> {
        let agent_position = Position::new(height as i32 - 1, (width / 2) as i32);
        Self::with_agent_position(height, width, agent_position)
    }

    pub fn with_agent_position(
        height: usize,
        width: usize,
        agent_position: Position,
    ) -> Result<Self, ConfigError> {
        if height == 0 || width % 2 == 0 {
            return Err(ConfigError::InvalidParameter {
                unit: "from_visibility".into(),
                key: "shape".into(),
                message: format!("need a positive height and odd width, got {height}x{width}"),
            });
        }
        if !Area::from_shape(height, width).contains(agent_position) {
            return Err(ConfigError::InvalidParameter {
                unit: "from_visibility".into(),
                key: "agent_position".into(),
                message: format!("{agent_position} lies outside the {height}x{width} window"),
            });
        }
        Ok(Self {
            height,
            width,
            agent_position,
            visibility: Box::new(FullVisibility),
        })
    }

    /// Replace the visibility function. Returns `self` for chaining.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Box<dyn VisibilityFunction>) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    #[must_use]
    pub const fn agent_position(&self) -> Position {
        self.agent_position
    }

    #[must_use]
    pub fn visibility(&self) -> &dyn VisibilityFunction {
        self.visibility.as_ref()
    }
}

impl ObservationFunction for FromVisibility {
    fn observe(&self, state: &State, rng: &mut GridRng) -> Result<Observation, InvariantError> {
        let mut view = state
            .grid
            .view(state.agent.pose, self.height, self.width, self.agent_position)?;
        let mask = self.visibility.visibility(&view, self.agent_position, rng)?;
        for p in view.positions().collect::<Vec<_>>() {
            if !mask.get(p) {
                view.set(p, GridObject::Hidden)?;
            }
        }
        let agent = Agent::new(self.agent_position, Orientation::North).holding(state.agent.held.clone());
        Ok(Observation::new(view, agent))
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "from_visibility"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::RaytracingVisibility;
    use gridverse_core::grid::Grid;
    use gridverse_core::object::Color;
    use gridverse_core::seed::rng_from_seed;

    fn state(orientation: Orientation) -> State {
        let mut grid = Grid::new(5, 5).unwrap();
        grid.set(Position::new(1, 3), GridObject::exit()).unwrap();
        grid.set(Position::new(2, 1), GridObject::Wall).unwrap();
        State::new(grid, Agent::new(Position::new(2, 2), orientation)).unwrap()
    }

    #[test]
    fn observation_is_agent_relative() {
        let obs_fn = FromVisibility::new(3, 3).unwrap();
        let obs = obs_fn.observe(&state(Orientation::North), &mut rng_from_seed(0)).unwrap();
        assert_eq!(obs.agent.position(), Position::new(2, 1));
        assert_eq!(obs.agent.orientation(), Orientation::North);
        assert_eq!(*obs.grid.get(Position::new(1, 2)).unwrap(), GridObject::exit());
        assert_eq!(*obs.grid.get(Position::new(2, 0)).unwrap(), GridObject::Wall);

        let obs = obs_fn.observe(&state(Orientation::East), &mut rng_from_seed(0)).unwrap();
        // facing east, the exit at (1, 3) is ahead and to the left
        assert_eq!(*obs.grid.get(Position::new(1, 0)).unwrap(), GridObject::exit());
    }

    #[test]
    fn outside_grid_is_hidden() {
        let mut grid = Grid::new(3, 3).unwrap();
        grid.set(Position::new(0, 0), GridObject::Wall).unwrap();
        let s = State::new(grid, Agent::new(Position::new(0, 1), Orientation::North)).unwrap();
        let obs = FromVisibility::new(3, 3).unwrap().observe(&s, &mut rng_from_seed(0)).unwrap();
        assert_eq!(*obs.grid.get(Position::new(0, 1)).unwrap(), GridObject::Hidden);
        assert_eq!(*obs.grid.get(Position::new(2, 0)).unwrap(), GridObject::Wall);
    }

    #[test]
    fn masked_cells_become_hidden() {
        let mut grid = Grid::new(5, 5).unwrap();
        grid.set(Position::new(2, 2), GridObject::Wall).unwrap();
        let s = State::new(grid, Agent::new(Position::new(4, 2), Orientation::North)).unwrap();
        let obs_fn = FromVisibility::new(5, 5)
            .unwrap()
            .with_visibility(Box::new(RaytracingVisibility));
        let obs = obs_fn.observe(&s, &mut rng_from_seed(0)).unwrap();
        assert_eq!(*obs.grid.get(Position::new(1, 2)).unwrap(), GridObject::Hidden);
        assert_eq!(*obs.grid.get(Position::new(2, 2)).unwrap(), GridObject::Wall);
        assert_eq!(*obs.grid.get(Position::new(1, 1)).unwrap(), GridObject::Floor);
    }

    #[test]
    fn held_object_is_copied() {
        let mut s = state(Orientation::North);
        s.agent.held = GridObject::key(Color::Blue);
        let obs = FromVisibility::new(3, 3).unwrap().observe(&s, &mut rng_from_seed(0)).unwrap();
        assert_eq!(obs.agent.held, GridObject::key(Color::Blue));
    }

    #[test]
    fn rejects_even_width() {
        assert!(FromVisibility::new(3, 4).is_err());
        assert!(FromVisibility::with_agent_position(3, 3, Position::new(3, 0)).is_err());
    }
}
