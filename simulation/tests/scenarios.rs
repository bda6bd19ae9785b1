use std::{collections::HashMap, time::Duration};

use pipeline_defence_core::{
    tuning::{EconomyTuning, EnemyStats},
    CellCoord, Command, EnemyId, EnemyKind, Event, FinishReason, FireBlocked, RunResult,
    RunTuning, Seed, TowerId, TowerKind, WaveNumber,
};
use pipeline_defence_simulation::{Session, SessionConfig};
use pipeline_defence_system_run_controller::RunController;
use pipeline_defence_world::{self as world, query, World};

const STEP: Duration = Duration::from_millis(20);

fn session_with(tuning: RunTuning) -> Session {
    let mut config = SessionConfig::new(Seed::new(12_345));
    config.tuning = tuning;
    config.fixed_step = STEP;
    Session::new(config).expect("session starts")
}

/// Places a tower on the first free cell touching the start of the path.
fn place_near_entry(session: &mut Session) -> TowerId {
    let cells: Vec<CellCoord> = query::path(session.world())
        .expect("configured path")
        .cells()
        .to_vec();
    for cell in cells.iter().take(4) {
        for (dx, dy) in [(0, -1), (0, 1), (1, -1), (1, 1), (-1, -1), (-1, 1)] {
            let column = i64::from(cell.column()) + dx;
            let row = i64::from(cell.row()) + dy;
            let (Ok(column), Ok(row)) = (u32::try_from(column), u32::try_from(row)) else {
                continue;
            };
            if let Ok(tower) = session.place_tower(TowerKind::Prover, CellCoord::new(column, row)) {
                return tower;
            }
        }
    }
    panic!("no free cell next to the path entry");
}

fn run_for(session: &mut Session, duration: Duration) -> Vec<Event> {
    let mut log = Vec::new();
    let _ = session.advance(duration, &mut log);
    log
}

fn straight_world(tuning: RunTuning) -> World {
    let mut world = World::new(tuning);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigureRun {
            columns: 12,
            rows: 5,
            tile_length: 34.0,
            path: (0..12).map(|column| CellCoord::new(column, 2)).collect(),
        },
        &mut events,
    );
    world
}

fn attempt_shot(tuning: RunTuning) -> (World, Vec<Event>) {
    let mut world = straight_world(tuning);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::PlaceTower {
            kind: TowerKind::Prover,
            cell: CellCoord::new(1, 1),
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::SpawnEnemy {
            kind: EnemyKind::Light,
            wave: WaveNumber::FIRST,
        },
        &mut events,
    );
    events.clear();
    world::apply(
        &mut world,
        Command::FireProjectile {
            tower: TowerId::new(0),
            target: EnemyId::new(0),
        },
        &mut events,
    );
    (world, events)
}

fn stocked_economy() -> EconomyTuning {
    EconomyTuning {
        fire_bucket_initial: 6.0,
        ..EconomyTuning::default()
    }
}

#[test]
fn each_gate_blocks_in_isolation() {
    let mut capped = RunTuning {
        economy: stocked_economy(),
        ..RunTuning::default()
    };
    capped.economy.projectile_cap = 0;

    let empty_bucket = RunTuning::default();

    let mut drained = RunTuning {
        economy: stocked_economy(),
        ..RunTuning::default()
    };
    drained.economy.energy_initial = 2.0;
    drained.towers.energy_cost = 3.0;

    for (tuning, expected) in [
        (capped, FireBlocked::ProjectileCap),
        (empty_bucket, FireBlocked::FireBucketEmpty),
        (drained, FireBlocked::InsufficientEnergy),
    ] {
        let (world, events) = attempt_shot(tuning);
        assert_eq!(
            events,
            vec![Event::FireRejected {
                tower: TowerId::new(0),
                reason: expected
            }]
        );
        assert_eq!(query::resources(&world).live_projectiles, 0);
    }

    let (world, events) = attempt_shot(RunTuning {
        economy: stocked_economy(),
        ..RunTuning::default()
    });
    assert!(matches!(events.as_slice(), [Event::ProjectileFired { .. }]));
    assert_eq!(query::resources(&world).live_projectiles, 1);
}

#[test]
fn starved_tower_never_fires_and_energy_is_untouched() {
    let mut tuning = RunTuning {
        economy: stocked_economy(),
        ..RunTuning::default()
    };
    tuning.economy.energy_initial = 2.0;
    tuning.economy.energy_regen_per_second = 0.0;
    tuning.towers.energy_cost = 3.0;

    let mut session = session_with(tuning);
    let _ = place_near_entry(&mut session);
    let log = run_for(&mut session, Duration::from_secs(30));

    assert!(log
        .iter()
        .any(|event| matches!(event, Event::EnemySpawned { .. })));
    assert!(!log
        .iter()
        .any(|event| matches!(event, Event::ProjectileFired { .. })));
    let resources = query::resources(session.world());
    assert_eq!(resources.energy, 2.0);
    assert_eq!(resources.live_projectiles, 0);
}

#[test]
fn single_lethal_hit_awards_the_reward_once() {
    let mut tuning = RunTuning {
        economy: stocked_economy(),
        ..RunTuning::default()
    };
    tuning.enemies.light = EnemyStats {
        base_hp: 10.0,
        hp_per_wave: 0.0,
        base_speed: 10.0,
        speed_per_wave: 0.0,
        radius: 5.0,
    };
    tuning.projectiles.damage = 10.0;

    let mut session = session_with(tuning);
    let _ = place_near_entry(&mut session);
    let log = run_for(&mut session, Duration::from_secs(30));

    let mut hits: HashMap<EnemyId, usize> = HashMap::new();
    let mut kills: HashMap<EnemyId, usize> = HashMap::new();
    for event in &log {
        match event {
            Event::EnemyHit {
                enemy,
                remaining_hp,
                ..
            } => {
                assert!(*remaining_hp <= 0.0, "one hit must be lethal");
                *hits.entry(*enemy).or_default() += 1;
            }
            Event::EnemyDestroyed { enemy, reward, .. } => {
                assert_eq!(*reward, 10);
                *kills.entry(*enemy).or_default() += 1;
            }
            _ => {}
        }
    }

    assert!(!kills.is_empty(), "tower next to the entry should kill");
    assert!(kills.values().all(|count| *count == 1));
    assert_eq!(hits, kills);
    let score = session.snapshot().score;
    assert_eq!(score as usize, kills.len() * 10);
}

#[test]
fn simultaneous_depletion_and_timeout_finish_once() {
    let mut tuning = RunTuning::default();
    tuning.run.base_health = 1;
    tuning.run.time_limit_ms = 1_000;

    let mut world = straight_world(tuning);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SpawnEnemy {
            kind: EnemyKind::Light,
            wave: WaveNumber::FIRST,
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::Tick {
            dt: Duration::from_secs(20),
        },
        &mut events,
    );
    let run = query::run(&world);
    assert_eq!(run.base_health, 0);
    assert!(run.elapsed >= run.time_limit);

    let mut controller = RunController::new();
    let mut commands = Vec::new();
    controller.handle(&events, &run, &mut commands);
    controller.handle(&events, &run, &mut commands);
    commands.push(Command::FinishRun {
        reason: FinishReason::TimeLimit,
    });
    for command in commands {
        world::apply(&mut world, command, &mut events);
    }

    let finished: Vec<&Event> = events
        .iter()
        .filter(|event| matches!(event, Event::RunFinished { .. }))
        .collect();
    assert_eq!(
        finished,
        vec![&Event::RunFinished {
            result: RunResult {
                score: 0,
                wave: 0,
                duration_ms: 1_000
            },
            reason: FinishReason::BaseDepleted
        }]
    );
}

#[test]
fn undefended_run_finishes_exactly_once() {
    let mut session = session_with(RunTuning::default());
    let mut log = Vec::new();
    while !session.is_finished() {
        let _ = session.advance(Duration::from_secs(1), &mut log);
    }
    let result = session.run_to_completion();

    let finished: Vec<&Event> = log
        .iter()
        .filter(|event| matches!(event, Event::RunFinished { .. }))
        .collect();
    assert_eq!(finished.len(), 1);
    assert!(result.duration_ms <= 240_000);
    assert_eq!(session.result(), Some(result));
    assert!(session.step(STEP).is_empty(), "finished runs stay frozen");
}
