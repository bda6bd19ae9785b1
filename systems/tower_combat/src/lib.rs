#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that emits projectile firing commands from targeting data.
//!
//! A tower fires only when its cooldown elapsed and the shared resource pool
//! admits the shot. The pool is charged locally for every emitted command, so
//! a batch never requests more shots than the pool can pay for.

use pipeline_defence_core::{
    Command, ResourceSnapshot, RunSnapshot, TowerId, TowerSnapshot, TowerTarget, TowerView,
};

/// Tower combat system that queues firing commands for ready towers.
#[derive(Debug, Default)]
pub struct TowerCombat {
    scratch: Vec<Command>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::FireProjectile` entries for towers ready to fire.
    ///
    /// Blocked towers are skipped silently and re-evaluated on the next step.
    pub fn handle(
        &mut self,
        run: &RunSnapshot,
        towers: &TowerView,
        resources: ResourceSnapshot,
        tower_targets: &[TowerTarget],
        out: &mut Vec<Command>,
    ) {
        if run.is_finished() || tower_targets.is_empty() {
            return;
        }

        self.scratch.clear();
        let mut budget = resources;

        for target in tower_targets {
            let Some(snapshot) = find_tower(towers, target.tower) else {
                continue;
            };
            if !snapshot.is_ready() {
                continue;
            }
            if budget.admits(snapshot.energy_cost).is_err() {
                continue;
            }

            budget.consume(snapshot.energy_cost);
            self.scratch.push(Command::FireProjectile {
                tower: target.tower,
                target: target.enemy,
            });
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

fn find_tower(towers: &TowerView, tower: TowerId) -> Option<&TowerSnapshot> {
    towers.get(tower)
}
