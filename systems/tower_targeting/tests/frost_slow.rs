use std::time::Duration;

use grid_defence_core::{
    CellCoord, CellRect, CellRectSize, Command, EnemyKind, ScheduledSpawn, TowerKind, WavePlan,
    FIXED_TICK,
};
use grid_defence_system_tower_combat::TowerCombat;
use grid_defence_system_tower_targeting::TowerTargeting;
use grid_defence_world::{self as world, query, Economy, GridModel, World};

const FROST_CELL: CellCoord = CellCoord::new(6, 3);

fn frost_corridor() -> World {
    let route: Vec<CellCoord> = (0..24).map(|column| CellCoord::new(column, 4)).collect();
    let playable = CellRect::from_origin_and_size(CellCoord::new(0, 0), CellRectSize::new(24, 9));
    let grid = GridModel::from_route(24, 9, playable, &route);
    let mut world = World::new(
        grid,
        route,
        Economy {
            gold: 500,
            lives: 20,
        },
    );

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::BuildTower {
            kind: TowerKind::Frost,
            cell: FROST_CELL,
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::StartWave {
            plan: WavePlan::new(
                1,
                vec![ScheduledSpawn {
                    kind: EnemyKind::Scout,
                    at: Duration::ZERO,
                    hp_scale: 1.0,
                }],
            ),
        },
        &mut events,
    );
    assert_eq!(query::tower_view(&world).iter().count(), 1, "{events:?}");
    world
}

#[test]
fn frost_slow_ends_once_the_enemy_leaves_range() {
    let mut world = frost_corridor();
    let mut targeting = TowerTargeting::new();
    let mut combat = TowerCombat::new();
    let mut engagements = Vec::new();
    let mut commands = Vec::new();
    let mut events = Vec::new();

    let range = TowerKind::Frost.stats_at(1).range;
    let full_step = EnemyKind::Scout.stats().speed * FIXED_TICK.as_secs_f32();
    let slowed_step = full_step * TowerKind::Frost.stats_at(1).slow_multiplier.unwrap_or(1.0);
    let (mut slowed_ticks, mut free_ticks_after) = (0, 0);

    for _ in 0..900 {
        let before = query::enemy_view(&world).iter().next().copied();
        world::apply(&mut world, Command::Tick { dt: FIXED_TICK }, &mut events);
        let after = query::enemy_view(&world).iter().next().copied();

        if let (Some(before), Some(after)) = (before, after) {
            let step = after.progress - before.progress;
            let distance = before.position.distance(FROST_CELL.center());
            if distance < range - 0.05 {
                assert!((step - slowed_step).abs() < 1e-4, "step {step} at {distance}");
                slowed_ticks += 1;
            } else if distance > range + 0.05 {
                assert!((step - full_step).abs() < 1e-4, "step {step} at {distance}");
                if before.position.x > FROST_CELL.center().x {
                    free_ticks_after += 1;
                }
            }
        }
        if before.is_some() && after.is_none() {
            break;
        }

        let towers = query::tower_view(&world);
        let enemies = query::enemy_view(&world);
        targeting.handle(
            &towers,
            &enemies,
            query::tower_index(&world),
            query::enemy_index(&world),
            &mut engagements,
        );
        combat.handle(&engagements, FIXED_TICK, &mut commands);
        for command in commands.drain(..) {
            world::apply(&mut world, command, &mut events);
        }
    }

    assert!(slowed_ticks > 0, "the frost tower never slowed the scout");
    assert!(free_ticks_after > 0, "the scout never left frost range");
}
