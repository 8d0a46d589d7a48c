use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use grid_defence_core::{
    CellCoord, CellRect, CellRectSize, Command, EnemyKind, Event, ScheduledSpawn, TowerKind,
    WavePlan, FIXED_TICK,
};
use grid_defence_system_tower_combat::TowerCombat;
use grid_defence_system_tower_targeting::TowerTargeting;
use grid_defence_world::{self as world, query, Economy, GridModel, World};

#[test]
fn deterministic_replay_produces_identical_event_logs() {
    let first = replay();
    let second = replay();

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(
        first.events.iter().any(|event| event.starts_with("EnemyKilled")),
        "towers never finished an enemy"
    );
    assert!(
        first.events.iter().any(|event| event.starts_with("ChainHopped")),
        "the tesla never chained"
    );
}

#[test]
fn fired_towers_always_pick_the_furthest_enemy_in_range() {
    let mut world = scripted_world();
    let mut targeting = TowerTargeting::new();
    let mut engagements = Vec::new();

    for _ in 0..900 {
        let mut events = Vec::new();
        world::apply(&mut world, Command::Tick { dt: FIXED_TICK }, &mut events);

        let towers = query::tower_view(&world);
        let enemies = query::enemy_view(&world);
        targeting.handle(
            &towers,
            &enemies,
            query::tower_index(&world),
            query::enemy_index(&world),
            &mut engagements,
        );

        for engagement in &engagements {
            let Some(first) = engagement.targets.first() else {
                continue;
            };
            let Some(tower) = towers.get(engagement.tower) else {
                continue;
            };
            let range_squared = engagement.stats.range * engagement.stats.range;
            let best = enemies
                .iter()
                .filter(|enemy| enemy.position.distance_squared(tower.position()) <= range_squared)
                .map(|enemy| enemy.progress)
                .fold(f32::MIN, f32::max);
            let chosen = enemies.get(*first).map(|enemy| enemy.progress);
            assert_eq!(chosen, Some(best));
        }

        let mut commands = Vec::new();
        TowerCombat::new().handle(&engagements, FIXED_TICK, &mut commands);
        for command in commands {
            world::apply(&mut world, command, &mut events);
        }
    }
}

fn scripted_world() -> World {
    let mut route: Vec<CellCoord> = (0..16).map(|column| CellCoord::new(column, 4)).collect();
    route.extend((5..12).map(|row| CellCoord::new(15, row)));
    route.extend((16..24).map(|column| CellCoord::new(column, 11)));
    let playable = CellRect::from_origin_and_size(CellCoord::new(0, 0), CellRectSize::new(24, 16));
    let grid = GridModel::from_route(24, 16, playable, &route);
    let mut world = World::new(
        grid,
        route,
        Economy {
            gold: 2_000,
            lives: 20,
        },
    );

    let builds = [
        (TowerKind::Arrow, CellCoord::new(4, 3)),
        (TowerKind::Cannon, CellCoord::new(8, 5)),
        (TowerKind::Tesla, CellCoord::new(14, 6)),
        (TowerKind::Frost, CellCoord::new(16, 8)),
        (TowerKind::Laser, CellCoord::new(18, 10)),
        (TowerKind::Amplifier, CellCoord::new(13, 5)),
        (TowerKind::Multishot, CellCoord::new(20, 12)),
    ];
    let mut events = Vec::new();
    for (kind, cell) in builds {
        world::apply(&mut world, Command::BuildTower { kind, cell }, &mut events);
    }
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, Event::CommandRejected { .. })),
        "{events:?}"
    );

    let kinds = [
        EnemyKind::Scout,
        EnemyKind::Grunt,
        EnemyKind::Scout,
        EnemyKind::Guardian,
        EnemyKind::Scout,
        EnemyKind::Runner,
        EnemyKind::Swarm,
        EnemyKind::Swarm,
    ];
    let spawns = kinds
        .iter()
        .enumerate()
        .map(|(index, kind)| ScheduledSpawn {
            kind: *kind,
            at: Duration::from_millis(400 * index as u64),
            hp_scale: 1.0,
        })
        .collect();
    world::apply(
        &mut world,
        Command::StartWave {
            plan: WavePlan::new(1, spawns),
        },
        &mut events,
    );
    world
}

fn replay() -> ReplayOutcome {
    let mut world = scripted_world();
    let mut targeting = TowerTargeting::new();
    let mut combat = TowerCombat::new();
    let mut engagements = Vec::new();
    let mut commands = Vec::new();
    let mut log = Vec::new();

    for _ in 0..1_200 {
        let mut events = Vec::new();
        world::apply(&mut world, Command::Tick { dt: FIXED_TICK }, &mut events);

        targeting.handle(
            &query::tower_view(&world),
            &query::enemy_view(&world),
            query::tower_index(&world),
            query::enemy_index(&world),
            &mut engagements,
        );
        commands.clear();
        combat.handle(&engagements, FIXED_TICK, &mut commands);
        for command in commands.drain(..) {
            world::apply(&mut world, command, &mut events);
        }

        log.extend(events.iter().map(|event| format!("{event:?}")));
    }

    ReplayOutcome {
        events: log,
        gold: query::gold(&world),
        lives: query::lives(&world),
        score: query::score(&world),
    }
}

#[derive(Debug, PartialEq)]
struct ReplayOutcome {
    events: Vec<String>,
    gold: u32,
    lives: u32,
    score: u64,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.events.hash(&mut hasher);
        self.gold.hash(&mut hasher);
        self.lives.hash(&mut hasher);
        self.score.hash(&mut hasher);
        hasher.finish()
    }
}
