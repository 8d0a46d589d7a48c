use std::time::Duration;

use grid_defence_core::{
    CellCoord, CellRect, CellRectSize, ChainSpec, Command, EnemyId, EnemyKind, Event,
    RejectionReason, RouteSubject, ScheduledSpawn, SessionStatus, Shot, TowerId, TowerKind,
    WavePlan, FIXED_TICK,
};
use grid_defence_world::{self as world, query, Economy, GridModel, World};

const COLUMNS: u32 = 20;
const ROWS: u32 = 7;

fn corridor(economy: Economy) -> World {
    let route: Vec<CellCoord> = (0..COLUMNS).map(|column| CellCoord::new(column, 3)).collect();
    let playable =
        CellRect::from_origin_and_size(CellCoord::new(0, 0), CellRectSize::new(COLUMNS, ROWS));
    let grid = GridModel::from_route(COLUMNS, ROWS, playable, &route);
    World::new(grid, route, economy)
}

fn rich() -> Economy {
    Economy {
        gold: 1_000,
        lives: 20,
    }
}

fn spawn_at(kind: EnemyKind, seconds: f32, hp_scale: f32) -> ScheduledSpawn {
    ScheduledSpawn {
        kind,
        at: Duration::from_secs_f32(seconds),
        hp_scale,
    }
}

fn run(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    events
}

fn tick(world: &mut World, ticks: usize) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        world::apply(world, Command::Tick { dt: FIXED_TICK }, &mut events);
    }
    events
}

fn build(world: &mut World, kind: TowerKind, cell: CellCoord) -> TowerId {
    let events = run(world, Command::BuildTower { kind, cell });
    events
        .iter()
        .find_map(|event| match event {
            Event::TowerBuilt { tower, .. } => Some(*tower),
            _ => None,
        })
        .unwrap_or_else(|| panic!("build rejected: {events:?}"))
}

fn spawned(events: &[Event]) -> Vec<EnemyId> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::EnemySpawned { enemy, .. } => Some(*enemy),
            _ => None,
        })
        .collect()
}

fn damage_dealt(events: &[Event]) -> Vec<(EnemyId, f32)> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::EnemyDamaged { enemy, amount } => Some((*enemy, *amount)),
            _ => None,
        })
        .collect()
}

fn four_brutes(world: &mut World) -> Vec<EnemyId> {
    let plan = WavePlan::new(
        1,
        (0..4)
            .map(|index| spawn_at(EnemyKind::Brute, index as f32 * 0.5, 1.0))
            .collect(),
    );
    let _ = run(world, Command::StartWave { plan });
    let enemies = spawned(&tick(world, 95));
    assert_eq!(enemies.len(), 4);
    enemies
}

#[test]
fn chain_damage_falls_off_across_nearest_unhit_enemies() {
    let mut world = corridor(rich());
    let tesla = build(&mut world, TowerKind::Tesla, CellCoord::new(10, 2));
    let brutes = four_brutes(&mut world);

    let fired = run(
        &mut world,
        Command::FireProjectiles {
            tower: tesla,
            shots: vec![Shot {
                target: brutes[0],
                damage: 30.0,
                speed: 100.0,
                splash_radius: None,
                chain: Some(ChainSpec {
                    jumps: 3,
                    radius: 2.5,
                }),
            }],
            interval: Duration::from_secs(1),
        },
    );
    assert!(matches!(fired[0], Event::ProjectileFired { .. }));

    let events = tick(&mut world, 60);
    let hits = damage_dealt(&events);
    let expected = [30.0, 21.0, 14.7, 10.29];

    assert_eq!(hits.len(), expected.len(), "{hits:?}");
    for ((enemy, amount), (brute, want)) in hits.iter().zip(brutes.iter().zip(expected)) {
        assert_eq!(enemy, brute, "hop skipped the nearest unhit enemy");
        assert!((amount - want).abs() < 1e-3, "{amount} != {want}");
    }
    assert_eq!(query::projectile_count(&world), 0);
}

#[test]
fn splash_deals_half_damage_around_the_impact() {
    let mut world = corridor(rich());
    let cannon = build(&mut world, TowerKind::Cannon, CellCoord::new(3, 2));
    let brutes = four_brutes(&mut world);

    let _ = run(
        &mut world,
        Command::FireProjectiles {
            tower: cannon,
            shots: vec![Shot {
                target: brutes[0],
                damage: 30.0,
                speed: 100.0,
                splash_radius: Some(1.0),
                chain: None,
            }],
            interval: Duration::from_secs(1),
        },
    );
    let hits = damage_dealt(&tick(&mut world, 10));

    assert_eq!(
        hits,
        vec![(brutes[0], 30.0), (brutes[1], 15.0), (brutes[2], 15.0)]
    );
}

#[test]
fn scout_hit_points_decide_the_number_of_hits() {
    for (hp_scale, hits_needed) in [(1.0, 6), (1.15, 7)] {
        let mut world = corridor(rich());
        let arrow = build(&mut world, TowerKind::Arrow, CellCoord::new(2, 2));
        let plan = WavePlan::new(1, vec![spawn_at(EnemyKind::Scout, 0.0, hp_scale)]);
        let _ = run(&mut world, Command::StartWave { plan });
        let scout = spawned(&tick(&mut world, 1))[0];

        let mut hits = 0;
        while query::enemy_alive(&world, scout) {
            let _ = run(
                &mut world,
                Command::ApplyBeam {
                    tower: arrow,
                    enemy: scout,
                    amount: 10.0,
                },
            );
            hits += 1;
            assert!(hits <= 10, "scout never died");
        }

        assert_eq!(hits, hits_needed, "hp scale {hp_scale}");
        let tower = query::tower_at(&world, CellCoord::new(2, 2)).expect("arrow present");
        assert_eq!(tower.kills, 1);
    }
}

#[test]
fn wave_completes_once_queue_and_enemies_are_gone() {
    let mut world = corridor(rich());
    let arrow = build(&mut world, TowerKind::Arrow, CellCoord::new(2, 2));
    let plan = WavePlan::new(
        1,
        vec![
            spawn_at(EnemyKind::Swarm, 0.0, 1.0),
            spawn_at(EnemyKind::Swarm, 1.0, 1.0),
        ],
    );
    let _ = run(&mut world, Command::StartWave { plan });
    let first = spawned(&tick(&mut world, 1))[0];

    let _ = run(
        &mut world,
        Command::ApplyBeam {
            tower: arrow,
            enemy: first,
            amount: 100.0,
        },
    );
    let events = tick(&mut world, 1);
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, Event::WaveCompleted { .. })),
        "second spawn still queued"
    );
    assert!(query::wave_in_progress(&world));

    let second = spawned(&tick(&mut world, 60))[0];
    let gold_before = query::gold(&world);
    let _ = run(
        &mut world,
        Command::ApplyBeam {
            tower: arrow,
            enemy: second,
            amount: 100.0,
        },
    );
    let events = tick(&mut world, 1);

    assert!(events.contains(&Event::WaveCompleted { wave: 1, bonus: 25 }));
    assert_eq!(query::gold(&world), gold_before + 2 + 25);
    assert!(!query::wave_in_progress(&world));
    assert_eq!(query::waves_completed(&world), 1);
}

#[test]
fn gold_aura_applies_at_the_death_location() {
    let mut world = corridor(rich());
    let arrow = build(&mut world, TowerKind::Arrow, CellCoord::new(12, 2));
    let _ = build(&mut world, TowerKind::Treasury, CellCoord::new(2, 2));
    let plan = WavePlan::new(1, vec![spawn_at(EnemyKind::Scout, 0.0, 1.0)]);
    let _ = run(&mut world, Command::StartWave { plan });
    let scout = spawned(&tick(&mut world, 1))[0];

    let events = run(
        &mut world,
        Command::ApplyBeam {
            tower: arrow,
            enemy: scout,
            amount: 100.0,
        },
    );

    assert!(events.contains(&Event::EnemyKilled {
        enemy: scout,
        kind: EnemyKind::Scout,
        tower: Some(arrow),
        reward: 6,
    }));
}

#[test]
fn guardian_ward_reduces_damage_to_nearby_enemies() {
    let mut world = corridor(rich());
    let arrow = build(&mut world, TowerKind::Arrow, CellCoord::new(2, 2));
    let plan = WavePlan::new(
        1,
        vec![
            spawn_at(EnemyKind::Guardian, 0.0, 1.0),
            spawn_at(EnemyKind::Scout, 0.1, 1.0),
        ],
    );
    let _ = run(&mut world, Command::StartWave { plan });
    let enemies = spawned(&tick(&mut world, 10));
    let (guardian, scout) = (enemies[0], enemies[1]);

    let mut events = run(
        &mut world,
        Command::ApplyBeam {
            tower: arrow,
            enemy: scout,
            amount: 10.0,
        },
    );
    events.extend(run(
        &mut world,
        Command::ApplyBeam {
            tower: arrow,
            enemy: guardian,
            amount: 10.0,
        },
    ));
    let hits = damage_dealt(&events);

    assert!((hits[0].1 - 7.0).abs() < 1e-4, "{hits:?}");
    assert!((hits[1].1 - 10.0).abs() < 1e-4, "guardians do not ward themselves");
}

#[test]
fn leaking_the_last_life_ends_the_session() {
    let mut world = corridor(Economy { gold: 0, lives: 1 });
    let plan = WavePlan::new(1, vec![spawn_at(EnemyKind::Runner, 0.0, 1.0)]);
    let _ = run(&mut world, Command::StartWave { plan });

    let events = tick(&mut world, 60 * 8);
    assert!(events.contains(&Event::GameOver));
    assert_eq!(query::status(&world), SessionStatus::GameOver);
    assert_eq!(query::lives(&world), 0);

    assert!(tick(&mut world, 5).is_empty(), "ticks ignored after game over");
    assert_eq!(
        run(
            &mut world,
            Command::BuildTower {
                kind: TowerKind::Arrow,
                cell: CellCoord::new(2, 2),
            },
        ),
        vec![Event::CommandRejected {
            reason: RejectionReason::GameOver
        }]
    );
}

#[test]
fn projectile_slots_are_reused() {
    let mut world = corridor(rich());
    let arrow = build(&mut world, TowerKind::Arrow, CellCoord::new(2, 2));
    let plan = WavePlan::new(1, vec![spawn_at(EnemyKind::Boss, 0.0, 1.0)]);
    let _ = run(&mut world, Command::StartWave { plan });
    let boss = spawned(&tick(&mut world, 1))[0];

    for _ in 0..20 {
        let _ = run(
            &mut world,
            Command::FireProjectiles {
                tower: arrow,
                shots: vec![Shot {
                    target: boss,
                    damage: 1.0,
                    speed: 60.0,
                    splash_radius: None,
                    chain: None,
                }],
                interval: Duration::ZERO,
            },
        );
        let _ = tick(&mut world, 5);
    }

    assert_eq!(query::projectile_count(&world), 0);
    assert_eq!(query::projectile_capacity(&world), 1);
}

#[test]
fn projectile_aimed_at_a_dead_enemy_is_released_without_damage() {
    let mut world = corridor(rich());
    let arrow = build(&mut world, TowerKind::Arrow, CellCoord::new(10, 2));
    let plan = WavePlan::new(1, vec![spawn_at(EnemyKind::Scout, 0.0, 1.0)]);
    let _ = run(&mut world, Command::StartWave { plan });
    let scout = spawned(&tick(&mut world, 1))[0];

    let _ = run(
        &mut world,
        Command::FireProjectiles {
            tower: arrow,
            shots: vec![Shot {
                target: scout,
                damage: 10.0,
                speed: 1.0,
                splash_radius: None,
                chain: None,
            }],
            interval: Duration::ZERO,
        },
    );
    let _ = run(
        &mut world,
        Command::ApplyBeam {
            tower: arrow,
            enemy: scout,
            amount: 100.0,
        },
    );
    let events = tick(&mut world, 1);

    assert!(damage_dealt(&events).is_empty());
    assert_eq!(query::projectile_count(&world), 0);
}

#[test]
fn barricade_reroute_applies_to_spawn_route() {
    let mut world = corridor(rich());
    let blocked = CellCoord::new(8, 3);
    let _ = build(&mut world, TowerKind::Barricade, blocked);
    assert!(!query::is_walkable(&world, blocked));

    let detour: Vec<CellCoord> = (0..8)
        .map(|column| CellCoord::new(column, 3))
        .chain([CellCoord::new(7, 4), CellCoord::new(8, 4), CellCoord::new(9, 4)])
        .chain((9..COLUMNS).map(|column| CellCoord::new(column, 3)))
        .collect();
    let _ = run(
        &mut world,
        Command::AssignRoute {
            subject: RouteSubject::Spawn,
            route: detour.clone(),
        },
    );
    assert_eq!(query::spawn_route(&world), detour.as_slice());

    let _ = run(&mut world, Command::SellTower { cell: blocked });
    assert_eq!(query::spawn_route(&world), query::route(&world));
}

fn lone_scout(world: &mut World) -> EnemyId {
    let plan = WavePlan::new(1, vec![spawn_at(EnemyKind::Scout, 0.0, 1.0)]);
    let _ = run(world, Command::StartWave { plan });
    spawned(&tick(world, 1))[0]
}

fn progress_of(world: &World, enemy: EnemyId) -> f32 {
    query::enemy_view(world)
        .get(enemy)
        .map(|snapshot| snapshot.progress)
        .expect("enemy alive")
}

#[test]
fn slows_last_one_step_and_the_latest_one_wins() {
    let mut world = corridor(rich());
    let scout = lone_scout(&mut world);
    let full_step = EnemyKind::Scout.stats().speed * FIXED_TICK.as_secs_f32();

    let start = progress_of(&world, scout);
    for multiplier in [0.6, 0.5] {
        let _ = run(
            &mut world,
            Command::SlowEnemy {
                enemy: scout,
                multiplier,
            },
        );
    }
    let _ = tick(&mut world, 1);
    let slowed = progress_of(&world, scout) - start;
    assert!((slowed - full_step * 0.5).abs() < 1e-4, "{slowed}");

    let before = progress_of(&world, scout);
    let _ = tick(&mut world, 1);
    let recovered = progress_of(&world, scout) - before;
    assert!((recovered - full_step).abs() < 1e-4, "{recovered}");
}

#[test]
fn routes_behind_a_moving_enemy_are_discarded() {
    let mut world = corridor(rich());
    let scout = lone_scout(&mut world);
    let _ = tick(&mut world, 180);
    let before = progress_of(&world, scout);
    assert!(before > 4.0);

    let stale = vec![CellCoord::new(1, 3), CellCoord::new(1, 4), CellCoord::new(2, 4)];
    let events = run(
        &mut world,
        Command::AssignRoute {
            subject: RouteSubject::Enemy(scout),
            route: stale,
        },
    );
    assert!(events.contains(&Event::RouteDiscarded { enemy: scout }));
    assert_eq!(progress_of(&world, scout), before);
    assert_eq!(query::reroute_origin(&world, scout).map(|cell| cell.row()), Some(3));
}

#[test]
fn enemies_wait_at_a_barricade_until_rerouted() {
    let mut world = corridor(rich());
    let scout = lone_scout(&mut world);
    let blocked = CellCoord::new(4, 3);
    let _ = build(&mut world, TowerKind::Barricade, blocked);

    let _ = tick(&mut world, 240);
    let waiting = query::enemy_view(&world)
        .get(scout)
        .map(|snapshot| snapshot.position)
        .expect("enemy alive");
    assert_eq!(waiting, CellCoord::new(3, 3).center());
    assert_eq!(query::reroute_origin(&world, scout), Some(CellCoord::new(3, 3)));

    let detour: Vec<CellCoord> = [
        CellCoord::new(3, 3),
        CellCoord::new(3, 4),
        CellCoord::new(4, 4),
        CellCoord::new(5, 4),
    ]
    .into_iter()
    .chain((5..COLUMNS).map(|column| CellCoord::new(column, 3)))
    .collect();
    let events = run(
        &mut world,
        Command::AssignRoute {
            subject: RouteSubject::Enemy(scout),
            route: detour,
        },
    );
    assert!(!events.contains(&Event::RouteDiscarded { enemy: scout }));

    let mut last = progress_of(&world, scout);
    for _ in 0..120 {
        let _ = tick(&mut world, 1);
        let Some(snapshot) = query::enemy_view(&world).get(scout).copied() else {
            break;
        };
        assert!(snapshot.progress >= last);
        assert!(snapshot.position.distance(blocked.center()) > 0.5);
        last = snapshot.progress;
    }
    assert!(last > 5.0);
}
