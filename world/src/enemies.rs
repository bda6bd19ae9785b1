//! Enemy storage and path advancement.

use glam::Vec2;
use pipeline_defence_core::{EnemyId, EnemyKind, EnemySnapshot};

use crate::path::Path;

/// Enemy record stored inside the world.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EnemyState {
    pub(crate) id: EnemyId,
    pub(crate) kind: EnemyKind,
    pub(crate) hp: f32,
    pub(crate) speed: f32,
    pub(crate) radius: f32,
    /// Arc-length progress along the path.
    pub(crate) distance: f32,
    pub(crate) position: Vec2,
}

impl EnemyState {
    pub(crate) fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            kind: self.kind,
            hp: self.hp,
            position: self.position,
            distance: self.distance,
        }
    }
}

/// Parameters assigned to an enemy when it enters the path.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SpawnStats {
    pub(crate) hp: f32,
    pub(crate) speed: f32,
    pub(crate) radius: f32,
}

/// Outcome of damaging an enemy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Damage {
    pub(crate) remaining_hp: f32,
    pub(crate) destroyed: bool,
}

/// Flat enemy collection kept in ascending id order.
#[derive(Debug)]
pub(crate) struct EnemyRoster {
    entries: Vec<EnemyState>,
    next_enemy_id: EnemyId,
}

impl EnemyRoster {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_enemy_id: EnemyId::new(0),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get(&self, enemy: EnemyId) -> Option<&EnemyState> {
        self.index_of(enemy).map(|index| &self.entries[index])
    }

    /// Places a new enemy at the start of the path.
    pub(crate) fn spawn(&mut self, kind: EnemyKind, stats: SpawnStats, start: Vec2) -> EnemyId {
        let id = self.next_enemy_id;
        self.next_enemy_id = EnemyId::new(id.get().saturating_add(1));
        self.entries.push(EnemyState {
            id,
            kind,
            hp: stats.hp,
            speed: stats.speed,
            radius: stats.radius,
            distance: 0.0,
            position: start,
        });
        id
    }

    /// Moves every enemy `speed × dt` along the path.
    ///
    /// Enemies that arrive at the end are removed and reported through
    /// `arrived` in id order.
    pub(crate) fn advance(&mut self, dt_secs: f32, path: &Path, arrived: &mut Vec<EnemyId>) {
        self.entries.retain_mut(|enemy| {
            enemy.distance += enemy.speed * dt_secs;
            if path.is_arrival(enemy.distance) {
                arrived.push(enemy.id);
                return false;
            }
            enemy.position = path.point_at(enemy.distance);
            true
        });
    }

    /// First enemy in id order whose collision circle overlaps the probe.
    pub(crate) fn first_overlapping(&self, position: Vec2, radius: f32) -> Option<EnemyId> {
        self.entries
            .iter()
            .find(|enemy| enemy.position.distance(position) <= enemy.radius + radius)
            .map(|enemy| enemy.id)
    }

    /// Applies damage, removing the enemy once its hit points reach zero.
    pub(crate) fn damage(&mut self, enemy: EnemyId, amount: f32) -> Option<Damage> {
        let index = self.index_of(enemy)?;
        let state = &mut self.entries[index];
        state.hp -= amount;
        let remaining_hp = state.hp;
        let destroyed = remaining_hp <= 0.0;
        if destroyed {
            let _ = self.entries.remove(index);
        }
        Some(Damage {
            remaining_hp,
            destroyed,
        })
    }

    pub(crate) fn snapshots(&self) -> Vec<EnemySnapshot> {
        self.entries.iter().map(EnemyState::snapshot).collect()
    }

    fn index_of(&self, enemy: EnemyId) -> Option<usize> {
        self.entries
            .binary_search_by_key(&enemy, |state| state.id)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_defence_core::{CellCoord, GridSize};

    fn straight_path() -> Path {
        let cells = (0..5).map(|column| CellCoord::new(column, 0)).collect();
        Path::from_cells(cells, GridSize::new(5, 1), 10.0).expect("valid path")
    }

    fn stats(hp: f32, speed: f32) -> SpawnStats {
        SpawnStats {
            hp,
            speed,
            radius: 5.0,
        }
    }

    #[test]
    fn identifiers_increase_monotonically() {
        let mut roster = EnemyRoster::new();
        let path = straight_path();
        let first = roster.spawn(EnemyKind::Light, stats(10.0, 1.0), path.point_at(0.0));
        let second = roster.spawn(EnemyKind::Batch, stats(10.0, 1.0), path.point_at(0.0));
        assert!(first < second);
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn advance_moves_by_speed_times_dt() {
        let mut roster = EnemyRoster::new();
        let path = straight_path();
        let id = roster.spawn(EnemyKind::Light, stats(10.0, 8.0), path.point_at(0.0));
        let mut arrived = Vec::new();
        roster.advance(0.5, &path, &mut arrived);

        let enemy = roster.get(id).expect("enemy");
        assert_eq!(enemy.distance, 4.0);
        assert_eq!(enemy.position, Vec2::new(9.0, 5.0));
        assert!(arrived.is_empty());
    }

    #[test]
    fn enemies_reaching_the_end_are_removed() {
        let mut roster = EnemyRoster::new();
        let path = straight_path();
        let fast = roster.spawn(EnemyKind::Light, stats(10.0, 100.0), path.point_at(0.0));
        let slow = roster.spawn(EnemyKind::Batch, stats(10.0, 1.0), path.point_at(0.0));
        let mut arrived = Vec::new();
        roster.advance(1.0, &path, &mut arrived);

        assert_eq!(arrived, vec![fast]);
        assert!(roster.get(fast).is_none());
        assert!(roster.get(slow).is_some());
    }

    #[test]
    fn lethal_damage_removes_enemy_once() {
        let mut roster = EnemyRoster::new();
        let id = roster.spawn(EnemyKind::Light, stats(10.0, 1.0), Vec2::ZERO);
        assert_eq!(
            roster.damage(id, 10.0),
            Some(Damage {
                remaining_hp: 0.0,
                destroyed: true
            })
        );
        assert_eq!(roster.damage(id, 10.0), None);
        assert_eq!(roster.len(), 0);
    }

    #[test]
    fn overlap_prefers_lowest_identifier() {
        let mut roster = EnemyRoster::new();
        let first = roster.spawn(EnemyKind::Light, stats(10.0, 1.0), Vec2::new(0.0, 0.0));
        let _ = roster.spawn(EnemyKind::Light, stats(10.0, 1.0), Vec2::new(1.0, 0.0));
        assert_eq!(roster.first_overlapping(Vec2::new(0.5, 0.0), 1.0), Some(first));
        assert_eq!(roster.first_overlapping(Vec2::new(50.0, 0.0), 1.0), None);
    }
}
