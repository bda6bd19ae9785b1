#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative run state for Pipeline Defence.
//!
//! The world owns every enemy, tower, projectile, the shared resource pool,
//! and the run lifetime counters. It is mutated exclusively through [`apply`]
//! and observed through the [`query`] module.

mod enemies;
mod path;
mod projectiles;
mod resources;
mod towers;

use std::time::Duration;

use glam::Vec2;
use pipeline_defence_core::{
    CellCoord, Command, EnemyId, EnemyKind, Event, FinishReason, FireBlocked, GridSize,
    PlacementError, RunResult, RunTuning, TowerId, TowerKind, WaveNumber,
};

use crate::{
    enemies::{EnemyRoster, SpawnStats},
    projectiles::{Impact, Launch, ProjectileRoster},
    resources::ResourcePool,
    towers::{TowerRegistry, TowerStats},
};

pub use crate::path::Path;

#[derive(Debug)]
struct RunState {
    elapsed: Duration,
    base_health: u32,
    wave: u32,
    score: u32,
    credits: u32,
    finished: Option<RunResult>,
}

impl RunState {
    fn new(tuning: &RunTuning) -> Self {
        Self {
            elapsed: Duration::ZERO,
            base_health: tuning.run.base_health,
            wave: 0,
            score: 0,
            credits: tuning.run.starting_credits,
            finished: None,
        }
    }
}

/// Represents the authoritative state of a single run.
#[derive(Debug)]
pub struct World {
    tuning: RunTuning,
    grid: GridSize,
    tile_length: f32,
    path: Option<Path>,
    enemies: EnemyRoster,
    towers: TowerRegistry,
    projectiles: ProjectileRoster,
    resources: ResourcePool,
    run: RunState,
}

impl World {
    /// Creates an unconfigured world governed by `tuning`.
    ///
    /// Ticks and spawns are ignored until a `ConfigureRun` command installs
    /// the grid and path.
    #[must_use]
    pub fn new(tuning: RunTuning) -> Self {
        Self {
            grid: GridSize::new(0, 0),
            tile_length: 0.0,
            path: None,
            enemies: EnemyRoster::new(),
            towers: TowerRegistry::new(),
            projectiles: ProjectileRoster::new(),
            resources: ResourcePool::new(&tuning.economy),
            run: RunState::new(&tuning),
            tuning,
        }
    }

    fn reset(&mut self, grid: GridSize, tile_length: f32, path: Path) {
        self.grid = grid;
        self.tile_length = tile_length;
        self.path = Some(path);
        self.enemies = EnemyRoster::new();
        self.towers = TowerRegistry::new();
        self.projectiles = ProjectileRoster::new();
        self.resources = ResourcePool::new(&self.tuning.economy);
        self.run = RunState::new(&self.tuning);
    }

    fn is_finished(&self) -> bool {
        self.run.finished.is_some()
    }

    fn bounds(&self) -> Vec2 {
        Vec2::new(
            self.grid.columns() as f32 * self.tile_length,
            self.grid.rows() as f32 * self.tile_length,
        )
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        if self.run.finished.is_some() {
            return;
        }

        self.run.elapsed = self.run.elapsed.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        if self.resources.regenerate(dt) {
            out_events.push(Event::ResourcesRegenerated {
                energy: self.resources.energy(),
                fire_bucket: self.resources.fire_bucket(),
            });
        }

        let dt_secs = dt.as_secs_f32();
        self.towers.cool_down(dt_secs);

        let mut arrived = Vec::new();
        self.enemies.advance(dt_secs, path, &mut arrived);
        for enemy in arrived {
            self.run.base_health = self.run.base_health.saturating_sub(1);
            out_events.push(Event::EnemyBreached {
                enemy,
                base_health: self.run.base_health,
            });
        }

        let bounds = self.bounds();
        let mut impacts = Vec::new();
        self.projectiles
            .advance(dt, bounds, &mut self.enemies, &mut impacts);
        for impact in impacts {
            match impact {
                Impact::Hit {
                    projectile,
                    enemy,
                    damage,
                } => {
                    out_events.push(Event::EnemyHit {
                        enemy,
                        projectile,
                        remaining_hp: damage.remaining_hp,
                    });
                    if damage.destroyed {
                        let reward = self.tuning.enemies.score_reward;
                        self.run.score = self.run.score.saturating_add(reward);
                        out_events.push(Event::EnemyDestroyed {
                            enemy,
                            reward,
                            score: self.run.score,
                        });
                    }
                }
                Impact::Expired { projectile } => {
                    out_events.push(Event::ProjectileExpired { projectile });
                }
            }
        }
    }

    fn place_tower(&mut self, kind: TowerKind, cell: CellCoord) -> Result<TowerId, PlacementError> {
        if self.is_finished() {
            return Err(PlacementError::RunFinished);
        }
        if !self.grid.contains(cell) {
            return Err(PlacementError::OutOfBounds);
        }
        if self
            .path
            .as_ref()
            .map_or(false, |path| path.contains_cell(cell))
        {
            return Err(PlacementError::OnPath);
        }
        if self.towers.is_occupied(cell) {
            return Err(PlacementError::Occupied);
        }
        let cost = self.tuning.towers.placement_cost;
        if self.run.credits < cost {
            return Err(PlacementError::InsufficientCredits);
        }

        self.run.credits -= cost;
        let stats = TowerStats {
            range: self.tuning.towers.range(self.tile_length),
            energy_cost: self.tuning.towers.energy_cost,
        };
        Ok(self.towers.insert(kind, cell, self.tile_length, stats))
    }

    fn spawn_enemy(&mut self, kind: EnemyKind, wave: WaveNumber, out_events: &mut Vec<Event>) {
        if self.is_finished() {
            return;
        }
        let Some(path) = self.path.as_ref() else {
            return;
        };

        let stats = self.tuning.enemies.stats(kind);
        let spawn = SpawnStats {
            hp: stats.hp(wave.get()),
            speed: stats.speed(wave.get()),
            radius: stats.radius,
        };
        let enemy = self.enemies.spawn(kind, spawn, path.point_at(0.0));
        out_events.push(Event::EnemySpawned {
            enemy,
            kind,
            hp: spawn.hp,
            speed: spawn.speed,
        });
    }

    /// Validates and executes a single shot.
    ///
    /// Resource gates are checked before the target so that a starved pool
    /// is reported even when the target has already left.
    fn fire(&mut self, tower: TowerId, target: EnemyId) -> Result<Launch, FireBlocked> {
        if self.is_finished() {
            return Err(FireBlocked::RunFinished);
        }
        let state = self.towers.get(tower).ok_or(FireBlocked::MissingTower)?;
        if state.cooldown > 0.0 {
            return Err(FireBlocked::CoolingDown);
        }
        let energy_cost = state.energy_cost;
        let origin = state.center;
        let range = state.range;

        self.resources
            .snapshot(self.projectiles.len())
            .admits(energy_cost)?;

        let enemy = self.enemies.get(target).ok_or(FireBlocked::MissingTarget)?;
        if enemy.position.distance(origin) > range {
            return Err(FireBlocked::OutOfRange);
        }
        let aim = enemy.position;

        self.resources.consume(energy_cost);
        if let Some(state) = self.towers.get_mut(tower) {
            state.cooldown = self.tuning.towers.fire_interval();
        }

        let projectiles = &self.tuning.projectiles;
        Ok(Launch {
            origin,
            aim,
            speed: projectiles.speed,
            damage: projectiles.damage,
            radius: projectiles.radius,
            time_to_live: Duration::from_millis(projectiles.time_to_live_ms),
        })
    }

    fn finish(&mut self, reason: FinishReason, out_events: &mut Vec<Event>) {
        if self.is_finished() {
            return;
        }
        let duration = self.run.elapsed.min(self.tuning.run.time_limit());
        let result = RunResult {
            score: self.run.score,
            wave: self.run.wave,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        };
        self.run.finished = Some(result);
        out_events.push(Event::RunFinished { result, reason });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureRun {
            columns,
            rows,
            tile_length,
            path,
        } => {
            let grid = GridSize::new(columns, rows);
            if let Some(path) = Path::from_cells(path, grid, tile_length) {
                let waypoints = path.cells().len();
                let path_length = path.total_length();
                world.reset(grid, tile_length, path);
                out_events.push(Event::RunConfigured {
                    waypoints,
                    path_length,
                });
            }
        }
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::PlaceTower { kind, cell } => match world.place_tower(kind, cell) {
            Ok(tower) => out_events.push(Event::TowerPlaced { tower, kind, cell }),
            Err(reason) => out_events.push(Event::TowerPlacementRejected { kind, cell, reason }),
        },
        Command::StartWave { wave } => {
            if !world.is_finished() {
                world.run.wave = wave.get();
                out_events.push(Event::WaveStarted { wave });
            }
        }
        Command::SpawnEnemy { kind, wave } => world.spawn_enemy(kind, wave, out_events),
        Command::FireProjectile { tower, target } => match world.fire(tower, target) {
            Ok(launch) => {
                let projectile = world.projectiles.launch(launch);
                out_events.push(Event::ProjectileFired {
                    projectile,
                    tower,
                    target,
                });
            }
            Err(reason) => out_events.push(Event::FireRejected { tower, reason }),
        },
        Command::FinishRun { reason } => world.finish(reason, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use pipeline_defence_core::{
        EnemyView, GridSize, ResourceSnapshot, RunSnapshot, RunTuning, TowerView,
    };

    use super::{Path, World};

    /// Captures a read-only view of the enemies on the path.
    #[must_use]
    pub fn enemies(world: &World) -> EnemyView {
        EnemyView::from_snapshots(world.enemies.snapshots())
    }

    /// Captures a read-only view of the placed towers.
    #[must_use]
    pub fn towers(world: &World) -> TowerView {
        TowerView::from_snapshots(world.towers.snapshots())
    }

    /// Reports the shared resource levels.
    #[must_use]
    pub fn resources(world: &World) -> ResourceSnapshot {
        world.resources.snapshot(world.projectiles.len())
    }

    /// Summarises the run lifetime state.
    #[must_use]
    pub fn run(world: &World) -> RunSnapshot {
        RunSnapshot {
            elapsed: world.run.elapsed,
            time_limit: world.tuning.run.time_limit(),
            base_health: world.run.base_health,
            wave: world.run.wave,
            score: world.run.score,
            credits: world.run.credits,
            active_enemies: world.enemies.len(),
            finished: world.run.finished,
        }
    }

    /// Installed path, if the run has been configured.
    #[must_use]
    pub fn path(world: &World) -> Option<&Path> {
        world.path.as_ref()
    }

    /// Dimensions of the configured grid.
    #[must_use]
    pub fn grid(world: &World) -> GridSize {
        world.grid
    }

    /// Side length of a tile in world units.
    #[must_use]
    pub fn tile_length(world: &World) -> f32 {
        world.tile_length
    }

    /// Tuning that governs the run.
    #[must_use]
    pub fn tuning(world: &World) -> &RunTuning {
        &world.tuning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_defence_core::tuning::EconomyTuning;

    fn straight_path(columns: u32, row: u32) -> Vec<CellCoord> {
        (0..columns).map(|column| CellCoord::new(column, row)).collect()
    }

    fn configured(tuning: RunTuning) -> World {
        let mut world = World::new(tuning);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureRun {
                columns: 10,
                rows: 5,
                tile_length: 10.0,
                path: straight_path(10, 2),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::RunConfigured {
                waypoints: 10,
                path_length: 90.0
            }]
        );
        world
    }

    fn stocked() -> RunTuning {
        RunTuning {
            economy: EconomyTuning {
                fire_bucket_initial: 6.0,
                ..EconomyTuning::default()
            },
            ..RunTuning::default()
        }
    }

    fn place(world: &mut World, cell: CellCoord) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            world,
            Command::PlaceTower {
                kind: TowerKind::Prover,
                cell,
            },
            &mut events,
        );
        events
    }

    fn spawn(world: &mut World) -> EnemyId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnEnemy {
                kind: EnemyKind::Light,
                wave: WaveNumber::FIRST,
            },
            &mut events,
        );
        match events.as_slice() {
            [Event::EnemySpawned { enemy, .. }] => *enemy,
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn invalid_path_leaves_world_unconfigured() {
        let mut world = World::new(RunTuning::default());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureRun {
                columns: 4,
                rows: 4,
                tile_length: 10.0,
                path: vec![CellCoord::new(0, 0), CellCoord::new(0, 0)],
            },
            &mut events,
        );
        assert!(events.is_empty());
        assert!(query::path(&world).is_none());

        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );
        assert!(events.is_empty(), "unconfigured world ignores ticks");
    }

    #[test]
    fn placement_rejections_follow_rules() {
        let mut world = configured(RunTuning::default());

        assert!(matches!(
            place(&mut world, CellCoord::new(10, 0)).as_slice(),
            [Event::TowerPlacementRejected {
                reason: PlacementError::OutOfBounds,
                ..
            }]
        ));
        assert!(matches!(
            place(&mut world, CellCoord::new(3, 2)).as_slice(),
            [Event::TowerPlacementRejected {
                reason: PlacementError::OnPath,
                ..
            }]
        ));
        assert!(matches!(
            place(&mut world, CellCoord::new(3, 1)).as_slice(),
            [Event::TowerPlaced { .. }]
        ));
        assert!(matches!(
            place(&mut world, CellCoord::new(3, 1)).as_slice(),
            [Event::TowerPlacementRejected {
                reason: PlacementError::Occupied,
                ..
            }]
        ));
        assert!(matches!(
            place(&mut world, CellCoord::new(4, 1)).as_slice(),
            [Event::TowerPlaced { .. }]
        ));
        assert!(matches!(
            place(&mut world, CellCoord::new(5, 1)).as_slice(),
            [Event::TowerPlaced { .. }]
        ));
        assert_eq!(query::run(&world).credits, 0);
        assert!(matches!(
            place(&mut world, CellCoord::new(6, 1)).as_slice(),
            [Event::TowerPlacementRejected {
                reason: PlacementError::InsufficientCredits,
                ..
            }]
        ));
    }

    #[test]
    fn enemy_reaching_exit_costs_one_base_health() {
        let mut world = configured(RunTuning::default());
        let enemy = spawn(&mut world);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(5),
            },
            &mut events,
        );
        assert!(events.contains(&Event::EnemyBreached {
            enemy,
            base_health: 19
        }));
        assert_eq!(query::run(&world).active_enemies, 0);
    }

    #[test]
    fn successful_shot_spends_resources_and_starts_cooldown() {
        let mut world = configured(stocked());
        let _ = place(&mut world, CellCoord::new(1, 1));
        let enemy = spawn(&mut world);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::FireProjectile {
                tower: TowerId::new(0),
                target: enemy,
            },
            &mut events,
        );

        assert!(matches!(
            events.as_slice(),
            [Event::ProjectileFired { .. }]
        ));
        let resources = query::resources(&world);
        assert_eq!(resources.fire_bucket, 5.0);
        assert_eq!(resources.energy, 99.0);
        assert_eq!(resources.live_projectiles, 1);
        let tower = query::towers(&world).into_vec()[0];
        assert!((tower.cooldown - 0.4).abs() < 1e-6);

        events.clear();
        apply(
            &mut world,
            Command::FireProjectile {
                tower: TowerId::new(0),
                target: enemy,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::FireRejected {
                tower: TowerId::new(0),
                reason: FireBlocked::CoolingDown
            }]
        );
    }

    #[test]
    fn empty_bucket_blocks_fire_without_spending_energy() {
        let mut world = configured(RunTuning::default());
        let _ = place(&mut world, CellCoord::new(1, 1));
        let enemy = spawn(&mut world);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::FireProjectile {
                tower: TowerId::new(0),
                target: enemy,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::FireRejected {
                tower: TowerId::new(0),
                reason: FireBlocked::FireBucketEmpty
            }]
        );
        assert_eq!(query::resources(&world).energy, 100.0);
    }

    #[test]
    fn finish_is_terminal_and_idempotent() {
        let mut world = configured(RunTuning::default());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(300),
            },
            &mut events,
        );
        events.clear();

        apply(
            &mut world,
            Command::FinishRun {
                reason: FinishReason::TimeLimit,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::FinishRun {
                reason: FinishReason::BaseDepleted,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::RunFinished {
                result: RunResult {
                    score: 0,
                    wave: 0,
                    duration_ms: 240_000
                },
                reason: FinishReason::TimeLimit
            }]
        );

        events.clear();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::SpawnEnemy {
                kind: EnemyKind::Batch,
                wave: WaveNumber::FIRST,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::StartWave {
                wave: WaveNumber::new(2),
            },
            &mut events,
        );
        assert!(events.is_empty());
        assert!(matches!(
            place(&mut world, CellCoord::new(1, 1)).as_slice(),
            [Event::TowerPlacementRejected {
                reason: PlacementError::RunFinished,
                ..
            }]
        ));
    }

    #[test]
    fn reconfiguring_resets_the_run() {
        let mut world = configured(RunTuning::default());
        let _ = place(&mut world, CellCoord::new(1, 1));
        let _ = spawn(&mut world);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureRun {
                columns: 10,
                rows: 5,
                tile_length: 10.0,
                path: straight_path(10, 3),
            },
            &mut events,
        );
        let run = query::run(&world);
        assert_eq!(run.credits, 150);
        assert_eq!(run.active_enemies, 0);
        assert_eq!(query::towers(&world).into_vec().len(), 0);
    }
}
