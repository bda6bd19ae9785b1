//! Adjustable constants that shape a run.
//!
//! Every section deserialises with `#[serde(default)]`, so a configuration
//! file only needs to mention the knobs it overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::EnemyKind;

/// Aggregated tuning knobs for a single run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunTuning {
    /// Run lifetime limits and starting stock.
    pub run: RunLimits,
    /// Energy, fire bucket, and projectile cap.
    pub economy: EconomyTuning,
    /// Enemy stat formulas.
    pub enemies: EnemyTuning,
    /// Tower stats and fire cadence.
    pub towers: TowerTuning,
    /// Projectile flight parameters.
    pub projectiles: ProjectileTuning,
    /// Wave sizing and pacing.
    pub waves: WaveTuning,
    /// Path generator policy.
    pub path: PathTuning,
}

impl RunTuning {
    /// Name of the first fractional knob that is NaN or infinite, if any.
    #[must_use]
    pub fn first_non_finite(&self) -> Option<&'static str> {
        let economy = &self.economy;
        let light = &self.enemies.light;
        let batch = &self.enemies.batch;
        let towers = &self.towers;
        let projectiles = &self.projectiles;
        let singles = [
            ("economy.energy_max", economy.energy_max),
            ("economy.energy_initial", economy.energy_initial),
            ("economy.energy_regen_per_second", economy.energy_regen_per_second),
            ("economy.fire_bucket_max", economy.fire_bucket_max),
            ("economy.fire_bucket_initial", economy.fire_bucket_initial),
            ("enemies.light.base_hp", light.base_hp),
            ("enemies.light.hp_per_wave", light.hp_per_wave),
            ("enemies.light.base_speed", light.base_speed),
            ("enemies.light.speed_per_wave", light.speed_per_wave),
            ("enemies.light.radius", light.radius),
            ("enemies.batch.base_hp", batch.base_hp),
            ("enemies.batch.hp_per_wave", batch.hp_per_wave),
            ("enemies.batch.base_speed", batch.base_speed),
            ("enemies.batch.speed_per_wave", batch.speed_per_wave),
            ("enemies.batch.radius", batch.radius),
            ("towers.range_tiles", towers.range_tiles),
            ("towers.energy_cost", towers.energy_cost),
            ("towers.damage_per_second", towers.damage_per_second),
            ("towers.cooldown_floor", towers.cooldown_floor),
            ("towers.cooldown_normalization", towers.cooldown_normalization),
            ("projectiles.speed", projectiles.speed),
            ("projectiles.damage", projectiles.damage),
            ("projectiles.radius", projectiles.radius),
        ];
        let doubles = [
            ("waves.spawn_window_fraction", self.waves.spawn_window_fraction),
            ("waves.min_spawn_interval_secs", self.waves.min_spawn_interval_secs),
            ("waves.light_per_wave", self.waves.light_per_wave),
            ("path.band_low", self.path.band_low),
            ("path.band_span", self.path.band_span),
            ("path.right_bias", self.path.right_bias),
            ("path.retarget_chance", self.path.retarget_chance),
        ];

        singles
            .into_iter()
            .find(|(_, value)| !value.is_finite())
            .map(|(name, _)| name)
            .or_else(|| {
                doubles
                    .into_iter()
                    .find(|(_, value)| !value.is_finite())
                    .map(|(name, _)| name)
            })
    }
}

/// Run lifetime limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLimits {
    /// Run duration limit in milliseconds.
    pub time_limit_ms: u64,
    /// Base health at run start.
    pub base_health: u32,
    /// Credits available for tower placement at run start.
    pub starting_credits: u32,
}

impl RunLimits {
    /// Run duration limit as a [`Duration`].
    #[must_use]
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            time_limit_ms: 4 * 60 * 1_000,
            base_health: 20,
            starting_credits: 150,
        }
    }
}

/// How the fire bucket refills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketRefill {
    /// Refill straight to the maximum once per regeneration period.
    Atomic,
    /// Refill continuously at `max` tokens per second.
    Incremental,
}

/// Resource economy parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyTuning {
    /// Upper bound on energy.
    pub energy_max: f32,
    /// Energy at run start.
    pub energy_initial: f32,
    /// Energy regenerated per second, applied once per period.
    pub energy_regen_per_second: f32,
    /// Fire bucket capacity, i.e. global shots per second.
    pub fire_bucket_max: f32,
    /// Fire bucket tokens at run start.
    pub fire_bucket_initial: f32,
    /// Fire bucket refill policy.
    pub fire_bucket_refill: BucketRefill,
    /// Period of the regeneration timer in milliseconds.
    pub regen_period_ms: u64,
    /// Maximum number of projectiles in flight.
    pub projectile_cap: usize,
}

impl EconomyTuning {
    /// Regeneration period as a [`Duration`].
    #[must_use]
    pub fn regen_period(&self) -> Duration {
        Duration::from_millis(self.regen_period_ms)
    }
}

impl Default for EconomyTuning {
    fn default() -> Self {
        Self {
            energy_max: 100.0,
            energy_initial: 100.0,
            energy_regen_per_second: 10.0,
            fire_bucket_max: 6.0,
            fire_bucket_initial: 0.0,
            fire_bucket_refill: BucketRefill::Atomic,
            regen_period_ms: 1_000,
            projectile_cap: 20,
        }
    }
}

/// Linear per-wave scaling for one enemy kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyStats {
    /// Hit points at wave zero.
    pub base_hp: f32,
    /// Hit points added per wave.
    pub hp_per_wave: f32,
    /// Speed at wave zero, in world units per second.
    pub base_speed: f32,
    /// Speed added per wave.
    pub speed_per_wave: f32,
    /// Collision radius in world units.
    pub radius: f32,
}

impl EnemyStats {
    /// Hit points of an enemy spawned on `wave`.
    #[must_use]
    pub fn hp(&self, wave: u32) -> f32 {
        self.base_hp + wave as f32 * self.hp_per_wave
    }

    /// Speed of an enemy spawned on `wave`.
    #[must_use]
    pub fn speed(&self, wave: u32) -> f32 {
        self.base_speed + wave as f32 * self.speed_per_wave
    }
}

impl Default for EnemyStats {
    fn default() -> Self {
        Self {
            base_hp: 14.0,
            hp_per_wave: 1.4,
            base_speed: 80.0,
            speed_per_wave: 2.5,
            radius: 5.0,
        }
    }
}

/// Enemy parameters for every kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    /// Light enemy formulas.
    pub light: EnemyStats,
    /// Batch enemy formulas.
    pub batch: EnemyStats,
    /// Score awarded per destroyed enemy.
    pub score_reward: u32,
}

impl EnemyTuning {
    /// Stats that apply to the provided kind.
    #[must_use]
    pub fn stats(&self, kind: EnemyKind) -> &EnemyStats {
        match kind {
            EnemyKind::Light => &self.light,
            EnemyKind::Batch => &self.batch,
        }
    }
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            light: EnemyStats::default(),
            batch: EnemyStats {
                base_hp: 70.0,
                hp_per_wave: 9.0,
                base_speed: 46.0,
                speed_per_wave: 1.5,
                radius: 6.0,
            },
            score_reward: 10,
        }
    }
}

/// Tower parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerTuning {
    /// Credits charged per placement.
    pub placement_cost: u32,
    /// Targeting range measured in tiles.
    pub range_tiles: f32,
    /// Energy consumed per shot.
    pub energy_cost: f32,
    /// Rated damage per second; drives the fire interval.
    pub damage_per_second: f32,
    /// Shortest allowed fire interval in seconds.
    pub cooldown_floor: f32,
    /// Divisor converting the dps rating into a cooldown reduction.
    pub cooldown_normalization: f32,
}

impl TowerTuning {
    /// Seconds between shots: `max(floor, 1 - dps / normalization)`.
    ///
    /// The conversion saturates at the floor and is kept verbatim for
    /// compatibility with recorded runs.
    #[must_use]
    pub fn fire_interval(&self) -> f32 {
        let normalization = if self.cooldown_normalization == 0.0 {
            f32::INFINITY
        } else {
            self.cooldown_normalization
        };
        (1.0 - self.damage_per_second / normalization).max(self.cooldown_floor)
    }

    /// Targeting range in world units for the provided tile length.
    #[must_use]
    pub fn range(&self, tile_length: f32) -> f32 {
        self.range_tiles * tile_length
    }
}

impl Default for TowerTuning {
    fn default() -> Self {
        Self {
            placement_cost: 50,
            range_tiles: 4.0,
            energy_cost: 1.0,
            damage_per_second: 12.0,
            cooldown_floor: 0.12,
            cooldown_normalization: 20.0,
        }
    }
}

/// Projectile parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    /// Flight speed in world units per second.
    pub speed: f32,
    /// Damage applied on hit.
    pub damage: f32,
    /// Lifetime in milliseconds before the projectile expires.
    pub time_to_live_ms: u64,
    /// Collision radius in world units.
    pub radius: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 230.0,
            damage: 10.0,
            time_to_live_ms: 2_000,
            radius: 1.5,
        }
    }
}

/// Wave sizing and pacing parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTuning {
    /// Shortest wave duration in whole seconds.
    pub min_duration_secs: u32,
    /// Random spread added on top of the minimum duration, in whole seconds.
    pub duration_spread_secs: u32,
    /// Fraction of the wave duration used for spawning.
    pub spawn_window_fraction: f64,
    /// Floor on the interval between spawns, in seconds.
    pub min_spawn_interval_secs: f64,
    /// Light enemies present on every wave.
    pub light_base: u32,
    /// Light enemies added per wave number.
    pub light_per_wave: f64,
    /// Batch enemies appear on waves that are multiples of this period.
    pub batch_period: u32,
    /// Batch enemies present on a batch wave.
    pub batch_base: u32,
    /// Delay between an emptied field and the next wave, in milliseconds.
    pub grace_ms: u64,
}

impl WaveTuning {
    /// Grace delay as a [`Duration`].
    #[must_use]
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            min_duration_secs: 25,
            duration_spread_secs: 35,
            spawn_window_fraction: 0.6,
            min_spawn_interval_secs: 0.25,
            light_base: 8,
            light_per_wave: 1.8,
            batch_period: 4,
            batch_base: 2,
            grace_ms: 1_500,
        }
    }
}

/// Path generator policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathTuning {
    /// Lower edge of the vertical band for start and target rows, as a fraction of the height.
    pub band_low: f64,
    /// Height of the vertical band, as a fraction of the grid height.
    pub band_span: f64,
    /// Probability of stepping right on any given step.
    pub right_bias: f64,
    /// Probability of choosing a new target row after each step.
    pub retarget_chance: f64,
}

impl Default for PathTuning {
    fn default() -> Self {
        Self {
            band_low: 0.2,
            band_span: 0.6,
            right_bias: 0.65,
            retarget_chance: 0.08,
        }
    }
}
