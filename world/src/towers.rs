//! Authoritative tower state management utilities.

use std::collections::BTreeMap;

use glam::Vec2;
use pipeline_defence_core::{CellCoord, TowerId, TowerKind, TowerSnapshot};

/// Tower record stored inside the world.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TowerState {
    /// Identifier allocated by the world for the tower.
    pub(crate) id: TowerId,
    /// Kind of tower that was constructed.
    pub(crate) kind: TowerKind,
    /// Cell occupied by the tower.
    pub(crate) cell: CellCoord,
    pub(crate) center: Vec2,
    pub(crate) range: f32,
    pub(crate) energy_cost: f32,
    /// Seconds until the tower may fire again.
    pub(crate) cooldown: f32,
}

impl TowerState {
    fn snapshot(&self) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id,
            kind: self.kind,
            cell: self.cell,
            center: self.center,
            range: self.range,
            energy_cost: self.energy_cost,
            cooldown: self.cooldown,
        }
    }
}

/// Stats fixed at placement time.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TowerStats {
    pub(crate) range: f32,
    pub(crate) energy_cost: f32,
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    by_cell: BTreeMap<CellCoord, TowerId>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            by_cell: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    pub(crate) fn is_occupied(&self, cell: CellCoord) -> bool {
        self.by_cell.contains_key(&cell)
    }

    /// Stores a new tower centred on `cell`; new towers start ready to fire.
    pub(crate) fn insert(
        &mut self,
        kind: TowerKind,
        cell: CellCoord,
        tile_length: f32,
        stats: TowerStats,
    ) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get().saturating_add(1));
        let _ = self.by_cell.insert(cell, id);
        let _ = self.entries.insert(
            id,
            TowerState {
                id,
                kind,
                cell,
                center: cell.center(tile_length),
                range: stats.range,
                energy_cost: stats.energy_cost,
                cooldown: 0.0,
            },
        );
        id
    }

    pub(crate) fn get(&self, tower: TowerId) -> Option<&TowerState> {
        self.entries.get(&tower)
    }

    pub(crate) fn get_mut(&mut self, tower: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&tower)
    }

    /// Counts every cooldown down by `dt_secs`, saturating at zero.
    pub(crate) fn cool_down(&mut self, dt_secs: f32) {
        for tower in self.entries.values_mut() {
            tower.cooldown = (tower.cooldown - dt_secs).max(0.0);
        }
    }

    pub(crate) fn snapshots(&self) -> Vec<TowerSnapshot> {
        self.entries.values().map(TowerState::snapshot).collect()
    }
}
