#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Pipeline Defence engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub mod rng;
pub mod tuning;

pub use tuning::RunTuning;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Installs the grid and the generated path, resetting all run state.
    ConfigureRun {
        /// Number of tile columns laid out in the grid.
        columns: u32,
        /// Number of tile rows laid out in the grid.
        rows: u32,
        /// Length of each square tile measured in world units.
        tile_length: f32,
        /// Ordered waypoints from the entry edge to the exit edge.
        path: Vec<CellCoord>,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests placement of a tower on the provided cell.
    PlaceTower {
        /// Type of tower to construct.
        kind: TowerKind,
        /// Cell the tower should occupy.
        cell: CellCoord,
    },
    /// Announces that the provided wave is now the active wave.
    StartWave {
        /// Wave that became active.
        wave: WaveNumber,
    },
    /// Requests that an enemy enter the path at its start.
    SpawnEnemy {
        /// Kind of enemy to spawn.
        kind: EnemyKind,
        /// Wave whose scaling formulas determine the enemy's stats.
        wave: WaveNumber,
    },
    /// Requests that a tower fire a projectile at the provided enemy.
    FireProjectile {
        /// Tower attempting to fire.
        tower: TowerId,
        /// Enemy the projectile is aimed at.
        target: EnemyId,
    },
    /// Requests that the run transition into its terminal state.
    FinishRun {
        /// Condition that ended the run.
        reason: FinishReason,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that the grid and path were installed.
    RunConfigured {
        /// Number of waypoints composing the path.
        waypoints: usize,
        /// Total arc length of the path in world units.
        path_length: f32,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Reports that the periodic regeneration timer refilled resources.
    ResourcesRegenerated {
        /// Energy available after regeneration.
        energy: f32,
        /// Fire bucket tokens available after regeneration.
        fire_bucket: f32,
    },
    /// Confirms that a tower was placed into the world.
    TowerPlaced {
        /// Identifier assigned to the tower by the world.
        tower: TowerId,
        /// Type of tower that was placed.
        kind: TowerKind,
        /// Cell occupied by the tower.
        cell: CellCoord,
    },
    /// Reports that a tower placement request was rejected.
    TowerPlacementRejected {
        /// Type of tower requested for placement.
        kind: TowerKind,
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Announces that a new wave became active.
    WaveStarted {
        /// Wave that became active.
        wave: WaveNumber,
    },
    /// Confirms that an enemy entered the path.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Kind of the spawned enemy.
        kind: EnemyKind,
        /// Hit points assigned at spawn.
        hp: f32,
        /// Speed assigned at spawn, in world units per second.
        speed: f32,
    },
    /// Reports that an enemy reached the end of the path and damaged the base.
    EnemyBreached {
        /// Enemy that reached the base.
        enemy: EnemyId,
        /// Base health remaining after the breach.
        base_health: u32,
    },
    /// Confirms that a tower fired a projectile.
    ProjectileFired {
        /// Identifier assigned to the projectile.
        projectile: ProjectileId,
        /// Tower that fired.
        tower: TowerId,
        /// Enemy the projectile was aimed at.
        target: EnemyId,
    },
    /// Reports that a fire request was refused this tick.
    FireRejected {
        /// Tower that attempted to fire.
        tower: TowerId,
        /// Condition that blocked the shot.
        reason: FireBlocked,
    },
    /// Reports that a projectile struck an enemy.
    EnemyHit {
        /// Enemy that was struck.
        enemy: EnemyId,
        /// Projectile consumed by the hit.
        projectile: ProjectileId,
        /// Hit points remaining after damage was applied.
        remaining_hp: f32,
    },
    /// Reports that an enemy was destroyed by damage.
    EnemyDestroyed {
        /// Enemy that was destroyed.
        enemy: EnemyId,
        /// Score awarded for the kill.
        reward: u32,
        /// Cumulative score after the reward.
        score: u32,
    },
    /// Reports that a projectile expired without hitting anything.
    ProjectileExpired {
        /// Projectile that expired.
        projectile: ProjectileId,
    },
    /// Terminal event emitted exactly once per run.
    RunFinished {
        /// Final result handed to the scoring service.
        result: RunResult,
        /// Condition that ended the run.
        reason: FinishReason,
    },
}

/// Seed issued by the scoring service; the sole source of run determinism.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seed(u32);

impl Seed {
    /// Wraps the provided raw seed.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the raw seed value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Derives the seed of a wave-local generator.
    ///
    /// Mixing with XOR keeps every wave reproducible while giving each wave a
    /// distinct stream.
    #[must_use]
    pub const fn for_wave(self, wave: WaveNumber) -> u32 {
        self.0 ^ wave.get()
    }
}

/// One-based wave counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaveNumber(u32);

impl WaveNumber {
    /// First wave of every run.
    pub const FIRST: Self = Self(1);

    /// Creates a new wave number.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric wave.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Wave that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new projectile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Centre of the cell in world units for the provided tile length.
    #[must_use]
    pub fn center(self, tile_length: f32) -> Vec2 {
        Vec2::new(
            self.column as f32 * tile_length + tile_length / 2.0,
            self.row as f32 * tile_length + tile_length / 2.0,
        )
    }
}

/// Dimensions of the tile grid measured in whole tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    columns: u32,
    rows: u32,
}

impl GridSize {
    /// Creates a grid description with explicit dimensions.
    #[must_use]
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Derives the grid that fits inside a viewport of the provided size.
    ///
    /// Partial tiles along the right and bottom edges are discarded. A
    /// non-positive tile length yields an empty grid.
    #[must_use]
    pub fn from_viewport(width: f32, height: f32, tile_length: f32) -> Self {
        if tile_length <= 0.0 || width <= 0.0 || height <= 0.0 {
            return Self::new(0, 0);
        }
        Self::new(
            (width / tile_length).floor() as u32,
            (height / tile_length).floor() as u32,
        )
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }
}

/// Kinds of enemies that travel the path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Fast, fragile enemy spawned every wave.
    Light,
    /// Slow, durable enemy spawned on periodic waves.
    Batch,
}

/// Types of towers that can be constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerKind {
    /// Standard single-target tower.
    Prover,
}

/// Reasons a tower placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The run has ended, so placement is disabled.
    RunFinished,
    /// The requested cell lies outside the configured grid.
    OutOfBounds,
    /// The requested cell is part of the enemy path.
    OnPath,
    /// Another tower already occupies the cell.
    Occupied,
    /// Not enough credits remain to pay for the tower.
    InsufficientCredits,
}

/// Conditions that block a tower from firing this tick.
///
/// None of these are failures: the tower simply re-checks next tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FireBlocked {
    /// The run has ended.
    RunFinished,
    /// No tower with the provided identifier exists.
    MissingTower,
    /// The tower's cooldown has not elapsed yet.
    CoolingDown,
    /// The live projectile count reached the cap.
    ProjectileCap,
    /// The global fire bucket holds less than one token.
    FireBucketEmpty,
    /// Energy is below the tower's per-shot cost.
    InsufficientEnergy,
    /// The target no longer exists.
    MissingTarget,
    /// The target lies outside the tower's range.
    OutOfRange,
}

/// Condition that ended a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinishReason {
    /// Base health reached zero.
    BaseDepleted,
    /// The run time limit elapsed.
    TimeLimit,
}

/// Terminal result record handed to the scoring service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunResult {
    /// Cumulative score.
    pub score: u32,
    /// Wave active when the run ended.
    pub wave: u32,
    /// Run duration in milliseconds, capped at the time limit.
    pub duration_ms: u64,
}

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Unique identifier assigned to the enemy.
    pub id: EnemyId,
    /// Kind of the enemy.
    pub kind: EnemyKind,
    /// Remaining hit points.
    pub hp: f32,
    /// Current position in world units.
    pub position: Vec2,
    /// Arc-length progress along the path.
    pub distance: f32,
}

/// Read-only snapshot describing all enemies on the path.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Number of enemies captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no enemies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Kind of tower that was constructed.
    pub kind: TowerKind,
    /// Cell occupied by the tower.
    pub cell: CellCoord,
    /// Centre of the tower in world units.
    pub center: Vec2,
    /// Targeting range in world units.
    pub range: f32,
    /// Energy consumed per shot.
    pub energy_cost: f32,
    /// Seconds until the tower may fire again; zero or negative means ready.
    pub cooldown: f32,
}

impl TowerSnapshot {
    /// Reports whether the tower's cooldown has elapsed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.cooldown <= 0.0
    }
}

/// Read-only snapshot describing all towers placed on the grid.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Finds the snapshot of the provided tower.
    #[must_use]
    pub fn get(&self, tower: TowerId) -> Option<&TowerSnapshot> {
        self.snapshots
            .binary_search_by_key(&tower, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Shared resource levels that gate every shot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResourceSnapshot {
    /// Energy currently available.
    pub energy: f32,
    /// Upper bound on energy.
    pub energy_max: f32,
    /// Fire bucket tokens currently available.
    pub fire_bucket: f32,
    /// Upper bound on fire bucket tokens.
    pub fire_bucket_max: f32,
    /// Projectiles currently in flight.
    pub live_projectiles: usize,
    /// Maximum number of projectiles allowed in flight.
    pub projectile_cap: usize,
}

impl ResourceSnapshot {
    /// Checks every resource gate for a shot costing `energy_cost`.
    ///
    /// Gates are evaluated in a fixed order: projectile cap, fire bucket,
    /// energy. The first failing gate is reported.
    pub fn admits(&self, energy_cost: f32) -> Result<(), FireBlocked> {
        if self.live_projectiles >= self.projectile_cap {
            return Err(FireBlocked::ProjectileCap);
        }
        if self.fire_bucket < 1.0 {
            return Err(FireBlocked::FireBucketEmpty);
        }
        if self.energy < energy_cost {
            return Err(FireBlocked::InsufficientEnergy);
        }
        Ok(())
    }

    /// Applies the consumption of a single shot to the snapshot.
    pub fn consume(&mut self, energy_cost: f32) {
        self.fire_bucket -= 1.0;
        self.energy = (self.energy - energy_cost).max(0.0);
        self.live_projectiles = self.live_projectiles.saturating_add(1);
    }
}

/// Read-only summary of the run lifetime state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSnapshot {
    /// Simulated time since the run started.
    pub elapsed: Duration,
    /// Fixed run duration limit.
    pub time_limit: Duration,
    /// Remaining base health.
    pub base_health: u32,
    /// Currently active wave; zero before the first wave starts.
    pub wave: u32,
    /// Cumulative score.
    pub score: u32,
    /// Credits available for tower placement.
    pub credits: u32,
    /// Enemies currently on the path.
    pub active_enemies: usize,
    /// Terminal result once the run has finished.
    pub finished: Option<RunResult>,
}

impl RunSnapshot {
    /// Reports whether the run reached its terminal state.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    /// Time left before the run limit elapses.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.time_limit.saturating_sub(self.elapsed)
    }
}

/// Assignment of an enemy to a tower computed by the targeting system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerTarget {
    /// Tower that acquired the target.
    pub tower: TowerId,
    /// Enemy selected as the target.
    pub enemy: EnemyId,
    /// Centre of the tower in world units.
    pub tower_center: Vec2,
    /// Position of the enemy in world units.
    pub enemy_position: Vec2,
    /// Euclidean distance between the tower and the enemy.
    pub distance: f32,
}
