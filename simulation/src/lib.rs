#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-order tick loop that drives one run.
//!
//! A [`Session`] generates the path from the run seed, configures the world,
//! and owns every pure system. Each [`Session::step`] executes, in order:
//!
//! 1. `Tick` on the world (time, regeneration, cooldowns, enemies, projectiles),
//! 2. the wave director,
//! 3. tower targeting followed by tower combat, applying each shot in turn,
//! 4. the run controller.
//!
//! Host loops with variable frame times feed [`Session::advance`], which slices
//! frames into fixed steps so the same seed and step length replay identically.

use std::time::Duration;

use pipeline_defence_core::{
    CellCoord, Command, Event, FinishReason, GridSize, PlacementError, RunResult, RunSnapshot,
    RunTuning, Seed, TowerId, TowerKind, TowerTarget,
};
use pipeline_defence_system_path_generation::{generate, PathError};
use pipeline_defence_system_run_controller::RunController;
use pipeline_defence_system_tower_combat::TowerCombat;
use pipeline_defence_system_tower_targeting::TowerTargeting;
use pipeline_defence_system_wave_director::{WaveDirector, WavePhase};
use pipeline_defence_world::{self as world, query, World};
use thiserror::Error;
use tracing::{debug, info, trace};

/// Default viewport width in world units.
pub const DEFAULT_VIEWPORT_WIDTH: f32 = 1024.0;
/// Default viewport height in world units.
pub const DEFAULT_VIEWPORT_HEIGHT: f32 = 576.0;
/// Default tile edge length in world units.
pub const DEFAULT_TILE_LENGTH: f32 = 34.0;
/// Default fixed step, one sixtieth of a second.
pub const DEFAULT_FIXED_STEP: Duration = Duration::from_nanos(16_666_667);

/// Parameters required to start a session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Seed issued for the run.
    pub seed: Seed,
    /// Grid dimensions in tiles.
    pub grid: GridSize,
    /// Tile edge length in world units.
    pub tile_length: f32,
    /// Tuning knobs for the run.
    pub tuning: RunTuning,
    /// Length of a single fixed step used by [`Session::advance`].
    pub fixed_step: Duration,
}

impl SessionConfig {
    /// Configuration for `seed` with the grid that fits the default viewport.
    #[must_use]
    pub fn new(seed: Seed) -> Self {
        Self {
            seed,
            grid: GridSize::from_viewport(
                DEFAULT_VIEWPORT_WIDTH,
                DEFAULT_VIEWPORT_HEIGHT,
                DEFAULT_TILE_LENGTH,
            ),
            tile_length: DEFAULT_TILE_LENGTH,
            tuning: RunTuning::default(),
            fixed_step: DEFAULT_FIXED_STEP,
        }
    }
}

/// Errors raised while starting a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The path generator could not produce a path for the grid.
    #[error(transparent)]
    Path(#[from] PathError),
    /// Tile length must be a positive, finite number.
    #[error("tile length must be positive and finite, got {0}")]
    InvalidTileLength(f32),
    /// The fixed step must be longer than zero.
    #[error("fixed step must be longer than zero")]
    ZeroStep,
    /// The world refused the generated path.
    #[error("world rejected the generated path")]
    PathRejected,
}

/// One run: the world plus every system, stepped in a fixed order.
#[derive(Debug)]
pub struct Session {
    seed: Seed,
    world: World,
    wave_director: WaveDirector,
    targeting: TowerTargeting,
    combat: TowerCombat,
    run_controller: RunController,
    fixed_step: Duration,
    accumulator: Duration,
    events: Vec<Event>,
    commands: Vec<Command>,
    targets: Vec<TowerTarget>,
}

impl Session {
    /// Generates the path for the seed and configures a fresh world.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        if !(config.tile_length.is_finite() && config.tile_length > 0.0) {
            return Err(SessionError::InvalidTileLength(config.tile_length));
        }
        if config.fixed_step.is_zero() {
            return Err(SessionError::ZeroStep);
        }

        let path = generate(config.seed, config.grid, &config.tuning.path)?;
        let wave_director = WaveDirector::new(config.seed, config.tuning.waves.clone());
        let mut world = World::new(config.tuning);
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::ConfigureRun {
                columns: config.grid.columns(),
                rows: config.grid.rows(),
                tile_length: config.tile_length,
                path,
            },
            &mut events,
        );

        let Some(Event::RunConfigured {
            waypoints,
            path_length,
        }) = events.first()
        else {
            return Err(SessionError::PathRejected);
        };
        debug!(
            seed = config.seed.get(),
            waypoints, path_length, "session configured"
        );

        Ok(Self {
            seed: config.seed,
            world,
            wave_director,
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            run_controller: RunController::new(),
            fixed_step: config.fixed_step,
            accumulator: Duration::ZERO,
            events,
            commands: Vec::new(),
            targets: Vec::new(),
        })
    }

    /// Seed the session was started with.
    #[must_use]
    pub fn seed(&self) -> Seed {
        self.seed
    }

    /// Read-only access to the world for queries.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Current run summary.
    #[must_use]
    pub fn snapshot(&self) -> RunSnapshot {
        query::run(&self.world)
    }

    /// Current phase of the wave director.
    #[must_use]
    pub fn wave_phase(&self) -> WavePhase {
        self.wave_director.phase()
    }

    /// Terminal result once the run finished.
    #[must_use]
    pub fn result(&self) -> Option<RunResult> {
        self.snapshot().finished
    }

    /// Reports whether the run reached its terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.result().is_some()
    }

    /// Events produced by the most recent step.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Places a tower, charging its cost against the run credits.
    pub fn place_tower(&mut self, kind: TowerKind, cell: CellCoord) -> Result<TowerId, PlacementError> {
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::PlaceTower { kind, cell }, &mut events);
        for event in events {
            match event {
                Event::TowerPlaced { tower, .. } => return Ok(tower),
                Event::TowerPlacementRejected { reason, .. } => return Err(reason),
                _ => {}
            }
        }
        Err(PlacementError::OutOfBounds)
    }

    /// Executes one step of `dt` and returns the events it produced.
    ///
    /// Steps after the run finished produce no events.
    pub fn step(&mut self, dt: Duration) -> &[Event] {
        self.events.clear();
        world::apply(&mut self.world, Command::Tick { dt }, &mut self.events);
        if self.events.is_empty() {
            return &self.events;
        }

        let run = query::run(&self.world);
        self.wave_director
            .handle(&self.events, &run, &mut self.commands);
        self.flush_commands();

        let run = query::run(&self.world);
        let towers = query::towers(&self.world);
        self.targeting.handle(
            &run,
            &towers,
            &query::enemies(&self.world),
            &mut self.targets,
        );
        self.combat.handle(
            &run,
            &towers,
            query::resources(&self.world),
            &self.targets,
            &mut self.commands,
        );
        self.flush_commands();

        let run = query::run(&self.world);
        self.run_controller
            .handle(&self.events, &run, &mut self.commands);
        self.flush_commands();

        self.log_milestones();
        &self.events
    }

    /// Feeds a variable-length frame, running as many fixed steps as fit.
    ///
    /// Events from every executed step are appended to `log`. Returns the
    /// number of steps executed; leftover time carries into the next call.
    pub fn advance(&mut self, frame: Duration, log: &mut Vec<Event>) -> usize {
        self.accumulator = self.accumulator.saturating_add(frame);
        let mut steps = 0;
        while self.accumulator >= self.fixed_step && !self.is_finished() {
            self.accumulator -= self.fixed_step;
            let step = self.fixed_step;
            log.extend_from_slice(self.step(step));
            steps += 1;
        }
        steps
    }

    /// Steps with the fixed step until the run finishes.
    ///
    /// The loop is bounded by the time limit; a run still open afterwards is
    /// closed on the time limit.
    pub fn run_to_completion(&mut self) -> RunResult {
        let limit = self.snapshot().remaining();
        let max_steps = limit.as_nanos() / self.fixed_step.as_nanos() + 2;
        let mut steps = 0u128;
        while !self.is_finished() && steps < max_steps {
            let step = self.fixed_step;
            let _ = self.step(step);
            steps += 1;
        }

        if !self.is_finished() {
            self.events.clear();
            world::apply(
                &mut self.world,
                Command::FinishRun {
                    reason: FinishReason::TimeLimit,
                },
                &mut self.events,
            );
            self.log_milestones();
        }

        let snapshot = self.snapshot();
        snapshot.finished.unwrap_or(RunResult {
            score: snapshot.score,
            wave: snapshot.wave,
            duration_ms: u64::try_from(snapshot.elapsed.as_millis()).unwrap_or(u64::MAX),
        })
    }

    fn flush_commands(&mut self) {
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events);
        }
    }

    fn log_milestones(&self) {
        for event in &self.events {
            match event {
                Event::WaveStarted { wave } => debug!(wave = wave.get(), "wave started"),
                Event::EnemyBreached { base_health, .. } => {
                    trace!(base_health, "enemy breached the base");
                }
                Event::RunFinished { result, reason } => info!(
                    score = result.score,
                    wave = result.wave,
                    duration_ms = result.duration_ms,
                    ?reason,
                    "run finished"
                ),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_configuration() {
        let mut config = SessionConfig::new(Seed::new(1));
        config.tile_length = 0.0;
        assert!(matches!(
            Session::new(config),
            Err(SessionError::InvalidTileLength(_))
        ));

        let mut config = SessionConfig::new(Seed::new(1));
        config.fixed_step = Duration::ZERO;
        assert!(matches!(Session::new(config), Err(SessionError::ZeroStep)));

        let mut config = SessionConfig::new(Seed::new(1));
        config.grid = GridSize::new(0, 18);
        assert!(matches!(Session::new(config), Err(SessionError::Path(_))));
    }

    #[test]
    fn default_grid_fills_the_viewport() {
        let config = SessionConfig::new(Seed::new(1));
        assert_eq!(config.grid, GridSize::new(30, 16));
        assert_eq!(config.tile_length, 34.0);
    }

    #[test]
    fn first_step_starts_wave_one() {
        let mut session = Session::new(SessionConfig::new(Seed::new(12_345))).expect("session");
        let events = session.step(Duration::from_millis(16)).to_vec();
        assert!(events.contains(&Event::WaveStarted {
            wave: pipeline_defence_core::WaveNumber::FIRST
        }));
        assert_eq!(session.snapshot().wave, 1);
        assert_eq!(
            session.wave_phase(),
            WavePhase::Spawning {
                wave: pipeline_defence_core::WaveNumber::FIRST
            }
        );
    }

    #[test]
    fn advance_carries_leftover_time() {
        let mut config = SessionConfig::new(Seed::new(3));
        config.fixed_step = Duration::from_millis(10);
        let mut session = Session::new(config).expect("session");
        let mut log = Vec::new();

        assert_eq!(session.advance(Duration::from_millis(25), &mut log), 2);
        assert_eq!(session.advance(Duration::from_millis(5), &mut log), 1);
        assert_eq!(session.snapshot().elapsed, Duration::from_millis(30));
    }
}
