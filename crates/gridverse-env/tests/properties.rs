//! Properties that hold for every built-in environment under random play.

use gridverse_core::object::{Capabilities, ObjectKind};
use gridverse_core::Action::{Actuate, MoveForward, PickAndDrop, TurnLeft, TurnRight};
use gridverse_core::config::UnitConfig;
use gridverse_core::{Action, Position, State};
use gridverse_env::observations::FromVisibility;
use gridverse_env::resets::{DoorKeyReset, DynamicObstaclesReset, FourRoomsReset, TeleportReset};
use gridverse_env::rewards::{LivingReward, Overlap};
use gridverse_env::terminations::{BumpMovingObstacleTermination, OverlapTermination};
use gridverse_env::transitions::{ActuateBox, MoveObstacles, Teleport};
use gridverse_env::visibility::{
    CoinflipVisibility, FullVisibility, MinigridVisibility, PartialVisibility, RaytracingVisibility,
    StochasticRaytracingVisibility, WedgeVisibility,
};
use gridverse_env::{
    CompositeReward, CompositeTermination, GridWorld, Registries, ResetFunction, RewardFunction,
    TransitionChain, VisibilityFunction,
};
use gridverse_test_utils::{
    door_room_world, random_actions, rollout, seeded_rng, standard_transitions,
};

fn full_transitions() -> TransitionChain {
    standard_transitions()
        .add(Box::new(ActuateBox))
        .add(Box::new(Teleport))
        .add(Box::new(MoveObstacles))
}

fn world(reset: Box<dyn ResetFunction>, visibility: Box<dyn VisibilityFunction>) -> GridWorld {
    GridWorld::new(
        reset,
        Box::new(full_transitions()),
        Box::new(
            CompositeReward::new()
                .add(Box::new(Overlap::reach_exit(1.0, 0.0)))
                .add(Box::new(LivingReward::default())),
        ),
        Box::new(
            CompositeTermination::any()
                .add(Box::new(OverlapTermination::reach_exit()))
                .add(Box::new(BumpMovingObstacleTermination)),
        ),
        Box::new(FromVisibility::new(7, 7).unwrap().with_visibility(visibility)),
    )
    .with_max_steps(100)
}

fn worlds() -> Vec<GridWorld> {
    vec![
        world(
            Box::new(DynamicObstaclesReset::new(8, 8, 4, true).unwrap()),
            Box::new(RaytracingVisibility),
        ),
        world(Box::new(FourRoomsReset::new(9, 9).unwrap()), Box::new(PartialVisibility)),
        world(Box::new(DoorKeyReset::new(6).unwrap()), Box::new(MinigridVisibility)),
        world(Box::new(TeleportReset::new(6, 7).unwrap()), Box::new(WedgeVisibility)),
        world(
            Box::new(DynamicObstaclesReset::new(6, 6, 2, false).unwrap()),
            Box::new(CoinflipVisibility::new(0.5).unwrap()),
        ),
        world(
            Box::new(FourRoomsReset::new(9, 9).unwrap()),
            Box::new(StochasticRaytracingVisibility::default()),
        ),
    ]
}

fn check_state(state: &State, shape: (usize, usize)) {
    assert_eq!(state.grid.shape(), shape);
    let agent = state.agent.position();
    assert!(state.grid.contains(agent));
    let cell = state.grid.get(agent).unwrap();
    assert!(!cell.blocks_movement(), "agent stands on {cell:?}");
    assert!(!cell.is(ObjectKind::NoneObject));
    assert!(!cell.is(ObjectKind::Hidden));
}

#[test]
fn same_seed_same_trajectory() {
    let actions = random_actions(60, 1);
    for (mut a, mut b) in worlds().into_iter().zip(worlds()) {
        let (a0, ta) = rollout(&mut a, 17, &actions).unwrap();
        let (b0, tb) = rollout(&mut b, 17, &actions).unwrap();
        assert_eq!(a0, b0);
        assert_eq!(ta, tb);
    }
}

#[test]
fn different_seeds_change_random_layouts() {
    let actions = random_actions(1, 2);
    let mut layouts = Vec::new();
    for seed in 0..8 {
        let mut w = world(
            Box::new(DynamicObstaclesReset::new(8, 8, 4, true).unwrap()),
            Box::new(FullVisibility),
        );
        let (_, steps) = rollout(&mut w, seed, &actions).unwrap();
        layouts.push(steps[0].state.clone());
    }
    assert!(layouts.iter().any(|s| s != &layouts[0]));
}

#[test]
fn random_play_keeps_state_valid() {
    for (i, mut w) in worlds().into_iter().enumerate() {
        let seed = 100 + i as u64;
        w.reset_with_seed(seed).unwrap();
        let shape = w.state().unwrap().grid.shape();
        check_state(w.state().unwrap(), shape);
        for action in random_actions(100, seed) {
            let result = w.step(action).unwrap();
            check_state(w.state().unwrap(), shape);
            assert_eq!(result.observation.grid.shape(), (7, 7));
            assert_eq!(result.observation.agent.position(), Position::new(6, 3));
            if result.done() {
                w.reset().unwrap();
            }
        }
    }
}

#[test]
fn observed_agent_cell_is_never_hidden() {
    for (i, mut w) in worlds().into_iter().enumerate() {
        let seed = 200 + i as u64;
        let (initial, steps) = rollout(&mut w, seed, &random_actions(40, seed)).unwrap();
        for obs in std::iter::once(&initial).chain(steps.iter().map(|t| &t.observation)) {
            let cell = obs.grid.get(obs.agent.position()).unwrap();
            assert!(!cell.is(ObjectKind::Hidden));
        }
    }
}

#[test]
fn visibility_always_includes_the_agent() {
    let functions: Vec<Box<dyn VisibilityFunction>> = vec![
        Box::new(FullVisibility),
        Box::new(WedgeVisibility),
        Box::new(PartialVisibility),
        Box::new(MinigridVisibility),
        Box::new(RaytracingVisibility),
        Box::new(CoinflipVisibility::new(0.0).unwrap()),
        Box::new(StochasticRaytracingVisibility::default()),
    ];
    let mut rng = seeded_rng(9);
    for seed in 0..10 {
        let state = DynamicObstaclesReset::new(7, 7, 6, true)
            .unwrap()
            .reset(&mut seeded_rng(seed))
            .unwrap();
        let view = state.grid.view(state.agent.pose, 5, 5, Position::new(4, 2)).unwrap();
        for f in &functions {
            let mask = f.visibility(&view, Position::new(4, 2), &mut rng).unwrap();
            assert_eq!(mask.shape(), (5, 5), "{}", f.name());
            assert!(mask.get(Position::new(4, 2)), "{}", f.name());
        }
    }
}

/// A description of every built-in reward unit, with the parameters it needs.
fn reward_unit(registries: &Registries, name: &str) -> Box<dyn RewardFunction> {
    let unit = match name {
        "overlap" | "proportional_to_distance" | "getting_closer" => {
            UnitConfig::new(name).with("object_type", "Exit")
        }
        "pick_n_drop" => UnitConfig::new(name).with("object_type", "Key"),
        "chain" => {
            let member = |unit: &str| {
                let mut table = toml::Table::new();
                table.insert("name".into(), unit.into());
                toml::Value::Table(table)
            };
            UnitConfig::new(name).with(
                "functions",
                toml::Value::Array(vec![member("living_reward"), member("actuate_door")]),
            )
        }
        _ => UnitConfig::new(name),
    };
    registries.reward.build(&unit, registries).unwrap()
}

#[test]
fn reward_units_do_not_mutate_their_inputs() {
    // Pick the key, open the door, walk to the exit, then wander.
    let mut actions = vec![
        TurnRight,
        PickAndDrop,
        MoveForward,
        TurnLeft,
        MoveForward,
        Actuate,
        Actuate,
        MoveForward,
        MoveForward,
        TurnRight,
        MoveForward,
    ];
    actions.extend(random_actions(30, 8));
    let mut world = door_room_world(8);
    let (_, steps) = rollout(&mut world, 8, &actions).unwrap();

    let registries = Registries::with_defaults();
    let names: Vec<&str> = registries.reward.names().collect();
    assert!(names.len() >= 11);
    for name in names {
        let unit = reward_unit(&registries, name);
        for pair in steps.windows(2) {
            let (before, after) = (pair[0].state.clone(), pair[1].state.clone());
            let first = unit.reward(&before, pair[1].action, &after).unwrap();
            let second = unit.reward(&before, pair[1].action, &after).unwrap();
            assert!((first - second).abs() < f32::EPSILON, "{name}");
            assert!(first.is_finite(), "{name}");
            assert_eq!(before, pair[0].state, "{name}");
            assert_eq!(after, pair[1].state, "{name}");
        }
    }
}

#[test]
fn actions_decode_from_their_index() {
    for action in Action::ALL {
        assert_eq!(Action::try_from(action.index()).unwrap(), action);
    }
}
