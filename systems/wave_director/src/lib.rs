#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that paces waves and schedules enemy spawns.
//!
//! Each wave moves through `idle → spawning → draining → idle(next wave)`.
//! Wave contents are drawn from a wave-local generator seeded with
//! `seed XOR wave`, so the same seed always yields the same compositions and
//! spawn timings. The next wave starts once the field is observed empty while
//! draining and a fixed grace delay has elapsed.

use std::time::Duration;

use pipeline_defence_core::{
    rng::Mulberry32, tuning::WaveTuning, Command, EnemyKind, Event, RunSnapshot, Seed, WaveNumber,
};

/// Composition and pacing of a single wave.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WavePlan {
    /// Wave described by the plan.
    pub wave: WaveNumber,
    /// Nominal wave duration.
    pub duration: Duration,
    /// Light enemies spawned during the wave.
    pub light: u32,
    /// Batch enemies spawned during the wave.
    pub batch: u32,
    /// Delay between consecutive spawns.
    pub interval: Duration,
}

impl WavePlan {
    /// Total number of enemies spawned during the wave.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.light.saturating_add(self.batch)
    }

    /// Kind of the `index`-th spawn (zero based); lights precede batches.
    #[must_use]
    pub fn kind_at(&self, index: u32) -> EnemyKind {
        if index < self.light {
            EnemyKind::Light
        } else {
            EnemyKind::Batch
        }
    }

    /// Offset from wave start at which the `index`-th spawn fires.
    #[must_use]
    pub fn offset_at(&self, index: u32) -> Duration {
        self.interval.saturating_mul(index.saturating_add(1))
    }

    /// Iterator over every scheduled spawn as `(offset, kind)` pairs.
    pub fn schedule(&self) -> impl Iterator<Item = (Duration, EnemyKind)> + '_ {
        (0..self.total()).map(move |index| (self.offset_at(index), self.kind_at(index)))
    }
}

/// Number of light enemies spawned on `wave`.
#[must_use]
pub fn light_count(wave: WaveNumber, tuning: &WaveTuning) -> u32 {
    let scaled = (tuning.light_per_wave * f64::from(wave.get())).floor();
    tuning.light_base.saturating_add(scaled as u32)
}

/// Number of batch enemies spawned on `wave`; zero off the batch period.
#[must_use]
pub fn batch_count(wave: WaveNumber, tuning: &WaveTuning) -> u32 {
    if tuning.batch_period == 0 || wave.get() % tuning.batch_period != 0 {
        return 0;
    }
    tuning
        .batch_base
        .saturating_add(wave.get() / tuning.batch_period)
}

/// Derives the deterministic plan for `wave` of the run seeded with `seed`.
#[must_use]
pub fn plan_wave(seed: Seed, wave: WaveNumber, tuning: &WaveTuning) -> WavePlan {
    let mut rng = Mulberry32::new(seed.for_wave(wave));
    let spread = (rng.next_f64() * f64::from(tuning.duration_spread_secs)).floor();
    let duration_secs = f64::from(tuning.min_duration_secs) + spread;

    let light = light_count(wave, tuning);
    let batch = batch_count(wave, tuning);
    let total = light.saturating_add(batch).max(1);

    let window = duration_secs * tuning.spawn_window_fraction;
    let interval = (window / f64::from(total)).max(tuning.min_spawn_interval_secs);

    WavePlan {
        wave,
        duration: seconds(duration_secs),
        light,
        batch,
        interval: seconds(interval),
    }
}

/// Converts seconds to a duration, saturating values too large to represent.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

/// Externally observable wave phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WavePhase {
    /// Waiting before the provided wave starts.
    Idle {
        /// Wave that starts once the wait elapses.
        next: WaveNumber,
    },
    /// Spawning enemies of the provided wave.
    Spawning {
        /// Wave currently spawning.
        wave: WaveNumber,
    },
    /// Every spawn fired; waiting for the field to empty.
    Draining {
        /// Wave whose enemies are still on the field.
        wave: WaveNumber,
    },
    /// The run finished and no further waves will start.
    Halted,
}

#[derive(Clone, Debug)]
enum Phase {
    Idle {
        next: WaveNumber,
        wait: Duration,
    },
    Spawning {
        plan: WavePlan,
        clock: Duration,
        emitted: u32,
    },
    Draining {
        wave: WaveNumber,
    },
    Halted,
}

/// Wave pacing state machine.
#[derive(Clone, Debug)]
pub struct WaveDirector {
    seed: Seed,
    tuning: WaveTuning,
    phase: Phase,
}

impl WaveDirector {
    /// Creates a director whose first wave starts on the first handled tick.
    #[must_use]
    pub fn new(seed: Seed, tuning: WaveTuning) -> Self {
        Self {
            seed,
            tuning,
            phase: Phase::Idle {
                next: WaveNumber::FIRST,
                wait: Duration::ZERO,
            },
        }
    }

    /// Current phase of the director.
    #[must_use]
    pub fn phase(&self) -> WavePhase {
        match &self.phase {
            Phase::Idle { next, .. } => WavePhase::Idle { next: *next },
            Phase::Spawning { plan, .. } => WavePhase::Spawning { wave: plan.wave },
            Phase::Draining { wave } => WavePhase::Draining { wave: *wave },
            Phase::Halted => WavePhase::Halted,
        }
    }

    /// Consumes tick events and the run snapshot, emitting wave commands.
    ///
    /// Only time reported through [`Event::TimeAdvanced`] moves the schedule,
    /// which keeps the director independent of wall-clock timers.
    pub fn handle(&mut self, events: &[Event], run: &RunSnapshot, out: &mut Vec<Command>) {
        if run.is_finished() {
            self.phase = Phase::Halted;
            return;
        }

        let mut dt = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt: step } = event {
                dt = dt.saturating_add(*step);
            }
        }

        let transition = match &mut self.phase {
            Phase::Idle { next, wait } => {
                *wait = wait.saturating_sub(dt);
                if wait.is_zero() {
                    let wave = *next;
                    out.push(Command::StartWave { wave });
                    Some(Phase::Spawning {
                        plan: plan_wave(self.seed, wave, &self.tuning),
                        clock: Duration::ZERO,
                        emitted: 0,
                    })
                } else {
                    None
                }
            }
            Phase::Spawning {
                plan,
                clock,
                emitted,
            } => {
                *clock = clock.saturating_add(dt);
                while *emitted < plan.total() && plan.offset_at(*emitted) <= *clock {
                    out.push(Command::SpawnEnemy {
                        kind: plan.kind_at(*emitted),
                        wave: plan.wave,
                    });
                    *emitted += 1;
                }
                (*emitted >= plan.total()).then(|| Phase::Draining { wave: plan.wave })
            }
            // Spawns from the previous step are already on the field here.
            Phase::Draining { wave } => (run.active_enemies == 0).then(|| Phase::Idle {
                next: wave.next(),
                wait: self.tuning.grace(),
            }),
            Phase::Halted => None,
        };

        if let Some(phase) = transition {
            self.phase = phase;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> WaveTuning {
        WaveTuning::default()
    }

    #[test]
    fn batch_waves_follow_the_period() {
        let tuning = tuning();
        assert_eq!(batch_count(WaveNumber::new(1), &tuning), 0);
        assert_eq!(batch_count(WaveNumber::new(3), &tuning), 0);
        assert_eq!(batch_count(WaveNumber::new(4), &tuning), 3);
        assert_eq!(batch_count(WaveNumber::new(8), &tuning), 4);
    }

    #[test]
    fn light_count_matches_linear_formula() {
        let tuning = tuning();
        assert_eq!(light_count(WaveNumber::new(1), &tuning), 9);
        assert_eq!(light_count(WaveNumber::new(5), &tuning), 17);
        assert_eq!(light_count(WaveNumber::new(10), &tuning), 26);
    }

    #[test]
    fn zero_batch_period_disables_batches() {
        let tuning = WaveTuning {
            batch_period: 0,
            ..self::tuning()
        };
        assert_eq!(batch_count(WaveNumber::new(4), &tuning), 0);
    }

    #[test]
    fn plan_duration_stays_in_range() {
        let tuning = tuning();
        for raw in 0..500 {
            let plan = plan_wave(Seed::new(raw * 7919), WaveNumber::new(1 + raw % 12), &tuning);
            assert!(plan.duration >= Duration::from_secs(25));
            assert!(plan.duration < Duration::from_secs(60));
            assert!(plan.interval >= Duration::from_millis(250));
        }
    }

    #[test]
    fn interval_floor_applies_to_crowded_waves() {
        let tuning = WaveTuning {
            light_base: 10_000,
            ..self::tuning()
        };
        let plan = plan_wave(Seed::new(5), WaveNumber::FIRST, &tuning);
        assert_eq!(plan.interval, Duration::from_millis(250));
    }

    #[test]
    fn unbounded_spawn_window_saturates_instead_of_panicking() {
        let tuning = WaveTuning {
            spawn_window_fraction: f64::INFINITY,
            ..self::tuning()
        };
        let plan = plan_wave(Seed::new(5), WaveNumber::FIRST, &tuning);
        assert_eq!(plan.interval, Duration::MAX);
        assert_eq!(plan.offset_at(3), Duration::MAX);

        let tuning = WaveTuning {
            spawn_window_fraction: f64::NAN,
            ..self::tuning()
        };
        let plan = plan_wave(Seed::new(5), WaveNumber::FIRST, &tuning);
        assert_eq!(plan.interval, Duration::from_millis(250));
    }

    #[test]
    fn schedule_lists_lights_before_batches() {
        let plan = WavePlan {
            wave: WaveNumber::new(4),
            duration: Duration::from_secs(30),
            light: 2,
            batch: 1,
            interval: Duration::from_secs(2),
        };
        let schedule: Vec<_> = plan.schedule().collect();
        assert_eq!(
            schedule,
            vec![
                (Duration::from_secs(2), EnemyKind::Light),
                (Duration::from_secs(4), EnemyKind::Light),
                (Duration::from_secs(6), EnemyKind::Batch),
            ]
        );
    }

    #[test]
    fn halts_once_run_finishes() {
        let mut director = WaveDirector::new(Seed::new(1), tuning());
        let finished = RunSnapshot {
            elapsed: Duration::from_secs(240),
            time_limit: Duration::from_secs(240),
            base_health: 3,
            wave: 2,
            score: 0,
            credits: 0,
            active_enemies: 4,
            finished: Some(pipeline_defence_core::RunResult {
                score: 0,
                wave: 2,
                duration_ms: 240_000,
            }),
        };
        let mut out = Vec::new();
        director.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_secs(1),
            }],
            &finished,
            &mut out,
        );
        assert!(out.is_empty());
        assert_eq!(director.phase(), WavePhase::Halted);
    }
}
