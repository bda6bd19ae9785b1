//! Shared resource pool gating tower fire.

use std::time::Duration;

use pipeline_defence_core::{
    tuning::{BucketRefill, EconomyTuning},
    ResourceSnapshot,
};

/// Energy, fire bucket, and projectile cap owned by a single run.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ResourcePool {
    energy: f32,
    energy_max: f32,
    energy_per_period: f32,
    fire_bucket: f32,
    fire_bucket_max: f32,
    refill: BucketRefill,
    period: Duration,
    since_regen: Duration,
    projectile_cap: usize,
}

impl ResourcePool {
    pub(crate) fn new(economy: &EconomyTuning) -> Self {
        let period = economy.regen_period();
        Self {
            energy: economy.energy_initial.min(economy.energy_max).max(0.0),
            energy_max: economy.energy_max,
            energy_per_period: economy.energy_regen_per_second * period.as_secs_f32(),
            fire_bucket: economy
                .fire_bucket_initial
                .min(economy.fire_bucket_max)
                .max(0.0),
            fire_bucket_max: economy.fire_bucket_max,
            refill: economy.fire_bucket_refill,
            period,
            since_regen: Duration::ZERO,
            projectile_cap: economy.projectile_cap,
        }
    }

    /// Advances the regeneration timer by `dt`.
    ///
    /// Returns `true` when at least one regeneration period elapsed. The
    /// incremental bucket refills every call regardless of the timer.
    pub(crate) fn regenerate(&mut self, dt: Duration) -> bool {
        if self.refill == BucketRefill::Incremental {
            self.fire_bucket = (self.fire_bucket + self.fire_bucket_max * dt.as_secs_f32())
                .min(self.fire_bucket_max);
        }

        if self.period.is_zero() {
            return false;
        }

        self.since_regen = self.since_regen.saturating_add(dt);
        let mut fired = false;
        while self.since_regen >= self.period {
            self.since_regen -= self.period;
            self.energy = (self.energy + self.energy_per_period).min(self.energy_max);
            if self.refill == BucketRefill::Atomic {
                self.fire_bucket = self.fire_bucket_max;
            }
            fired = true;
        }
        fired
    }

    pub(crate) fn snapshot(&self, live_projectiles: usize) -> ResourceSnapshot {
        ResourceSnapshot {
            energy: self.energy,
            energy_max: self.energy_max,
            fire_bucket: self.fire_bucket,
            fire_bucket_max: self.fire_bucket_max,
            live_projectiles,
            projectile_cap: self.projectile_cap,
        }
    }

    /// Commits the cost of one admitted shot.
    pub(crate) fn consume(&mut self, energy_cost: f32) {
        let mut snapshot = self.snapshot(0);
        snapshot.consume(energy_cost);
        self.energy = snapshot.energy;
        self.fire_bucket = snapshot.fire_bucket;
    }

    pub(crate) fn energy(&self) -> f32 {
        self.energy
    }

    pub(crate) fn fire_bucket(&self) -> f32 {
        self.fire_bucket
    }
}
