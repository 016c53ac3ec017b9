//! Canned worlds and states.

use gridverse_core::geometry::{Orientation, Position};
use gridverse_core::grid::Grid;
use gridverse_core::object::GridObject;
use gridverse_core::{Agent, State};

use gridverse_env::gridworld::GridWorld;
use gridverse_env::observations::FromVisibility;
use gridverse_env::resets::LayoutReset;
use gridverse_env::rewards::{LivingReward, Overlap};
use gridverse_env::terminations::OverlapTermination;
use gridverse_env::traits::{
    CompositeReward, CompositeTermination, TransitionChain, TransitionFunction,
};
use gridverse_env::transitions::{ActuateDoor, MoveAgent, PickAndDrop, TurnAgent};
use gridverse_env::visibility::RaytracingVisibility;

/// 5x5 walled room, Exit at (3, 3), agent at (1, 1) facing East.
pub const EXIT_ROOM: [&str; 5] = ["#####", "#>..#", "#...#", "#..E#", "#####"];

/// Two rooms split by a locked yellow door, key in the left room.
pub const DOOR_ROOM: [&str; 5] = ["#######", "#>.#..#", "#K.D..#", "#..#.E#", "#######"];

/// Grid of `height x width` Floor with Walls at `walls`.
pub fn grid_with_walls(height: usize, width: usize, walls: &[(i32, i32)]) -> Grid {
    let mut grid = Grid::new(height, width).expect("positive shape");
    for &(y, x) in walls {
        grid.set(Position::new(y, x), GridObject::Wall).expect("wall inside grid");
    }
    grid
}

/// State parsed from layout rows.
pub fn layout_state(rows: &[&str]) -> State {
    LayoutReset::new(rows).expect("valid layout").state().clone()
}

/// State with the agent at `(y, x)` facing `orientation` on an open grid.
pub fn open_state(height: usize, width: usize, y: i32, x: i32, orientation: Orientation) -> State {
    State::new(
        Grid::new(height, width).expect("positive shape"),
        Agent::new(Position::new(y, x), orientation),
    )
    .expect("agent inside grid")
}

/// Move, turn, pick-and-drop and door actuation, in that order.
pub fn standard_transitions() -> TransitionChain {
    let units: [Box<dyn TransitionFunction>; 4] = [
        Box::new(MoveAgent::new()),
        Box::new(TurnAgent::new()),
        Box::new(PickAndDrop),
        Box::new(ActuateDoor),
    ];
    units.into_iter().fold(TransitionChain::new(), TransitionChain::add)
}

/// The exit-room task: reach the Exit for +5, pay 0.05 per other step.
///
/// Observations are 5x5 windows with raytraced visibility.
pub fn exit_room_world(seed: u64) -> GridWorld {
    GridWorld::new(
        Box::new(LayoutReset::new(&EXIT_ROOM).expect("valid layout")),
        Box::new(standard_transitions()),
        Box::new(Overlap::reach_exit(5.0, -0.05)),
        Box::new(OverlapTermination::reach_exit()),
        Box::new(
            FromVisibility::new(5, 5)
                .expect("odd window")
                .with_visibility(Box::new(RaytracingVisibility)),
        ),
    )
    .with_seed(seed)
}

/// The door-room task with a living penalty on top of the exit reward.
pub fn door_room_world(seed: u64) -> GridWorld {
    let reward = CompositeReward::new()
        .add(Box::new(Overlap::reach_exit(1.0, 0.0)))
        .add(Box::new(LivingReward { reward: -0.01 }));
    GridWorld::new(
        Box::new(LayoutReset::new(&DOOR_ROOM).expect("valid layout")),
        Box::new(standard_transitions()),
        Box::new(reward),
        Box::new(CompositeTermination::any().add(Box::new(OverlapTermination::reach_exit()))),
        Box::new(FromVisibility::new(3, 3).expect("odd window")),
    )
    .with_seed(seed)
    .with_max_steps(50)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridverse_core::object::ObjectKind;

    #[test]
    fn layouts_parse() {
        let exit = layout_state(&EXIT_ROOM);
        assert_eq!(exit.grid.unique_position_of(ObjectKind::Exit).unwrap(), Position::new(3, 3));
        let door = layout_state(&DOOR_ROOM);
        assert_eq!(door.grid.count(ObjectKind::Door), 1);
        assert_eq!(door.grid.count(ObjectKind::Key), 1);
    }

    #[test]
    fn standard_chain_has_four_units() {
        assert_eq!(standard_transitions().len(), 4);
    }
}
