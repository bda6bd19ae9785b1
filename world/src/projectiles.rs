//! Projectile flight, collision, and expiry.

use std::time::Duration;

use glam::Vec2;
use pipeline_defence_core::{EnemyId, ProjectileId};

use crate::enemies::{Damage, EnemyRoster};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ProjectileState {
    pub(crate) id: ProjectileId,
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) damage: f32,
    pub(crate) radius: f32,
    pub(crate) age: Duration,
    pub(crate) time_to_live: Duration,
}

/// Launch parameters for a new projectile.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Launch {
    pub(crate) origin: Vec2,
    pub(crate) aim: Vec2,
    pub(crate) speed: f32,
    pub(crate) damage: f32,
    pub(crate) radius: f32,
    pub(crate) time_to_live: Duration,
}

/// Resolution of a projectile during a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Impact {
    Hit {
        projectile: ProjectileId,
        enemy: EnemyId,
        damage: Damage,
    },
    Expired {
        projectile: ProjectileId,
    },
}

#[derive(Debug)]
pub(crate) struct ProjectileRoster {
    entries: Vec<ProjectileState>,
    next_projectile_id: ProjectileId,
}

impl ProjectileRoster {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_projectile_id: ProjectileId::new(0),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Spawns a projectile flying in a straight line toward `launch.aim`.
    ///
    /// The aim point is the target's position at launch; there is no lead. A
    /// launch aimed at its own origin flies along +x.
    pub(crate) fn launch(&mut self, launch: Launch) -> ProjectileId {
        let id = self.next_projectile_id;
        self.next_projectile_id = ProjectileId::new(id.get().saturating_add(1));
        let heading = (launch.aim - launch.origin)
            .try_normalize()
            .unwrap_or(Vec2::X);
        self.entries.push(ProjectileState {
            id,
            position: launch.origin,
            velocity: heading * launch.speed,
            damage: launch.damage,
            radius: launch.radius,
            age: Duration::ZERO,
            time_to_live: launch.time_to_live,
        });
        id
    }

    /// Moves every projectile and resolves hits, then expiry.
    ///
    /// Projectiles are processed in id order. A projectile hits the first
    /// enemy in id order whose collision circle overlaps its own; enemies
    /// destroyed by an earlier projectile are already gone, so a kill is never
    /// counted twice. Projectiles leaving `[0, bounds]` or outliving their
    /// time-to-live expire.
    pub(crate) fn advance(
        &mut self,
        dt: Duration,
        bounds: Vec2,
        enemies: &mut EnemyRoster,
        impacts: &mut Vec<Impact>,
    ) {
        let dt_secs = dt.as_secs_f32();
        let mut index = 0;
        while index < self.entries.len() {
            let projectile = &mut self.entries[index];
            projectile.position += projectile.velocity * dt_secs;
            projectile.age = projectile.age.saturating_add(dt);

            let id = projectile.id;
            let position = projectile.position;
            let damage = projectile.damage;
            let radius = projectile.radius;
            let expired = projectile.age >= projectile.time_to_live
                || !within_bounds(position, bounds);

            if let Some(enemy) = enemies.first_overlapping(position, radius) {
                if let Some(outcome) = enemies.damage(enemy, damage) {
                    let _ = self.entries.remove(index);
                    impacts.push(Impact::Hit {
                        projectile: id,
                        enemy,
                        damage: outcome,
                    });
                    continue;
                }
            }

            if expired {
                let _ = self.entries.remove(index);
                impacts.push(Impact::Expired { projectile: id });
                continue;
            }

            index += 1;
        }
    }
}

fn within_bounds(position: Vec2, bounds: Vec2) -> bool {
    (0.0..=bounds.x).contains(&position.x) && (0.0..=bounds.y).contains(&position.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enemies::SpawnStats;
    use pipeline_defence_core::EnemyKind;

    const BOUNDS: Vec2 = Vec2::new(1_000.0, 1_000.0);

    fn launch(origin: Vec2, aim: Vec2) -> Launch {
        Launch {
            origin,
            aim,
            speed: 100.0,
            damage: 10.0,
            radius: 1.5,
            time_to_live: Duration::from_secs(2),
        }
    }

    fn enemy(roster: &mut EnemyRoster, hp: f32, at: Vec2) -> EnemyId {
        roster.spawn(
            EnemyKind::Light,
            SpawnStats {
                hp,
                speed: 0.0,
                radius: 5.0,
            },
            at,
        )
    }

    #[test]
    fn velocity_points_at_aim() {
        let mut roster = ProjectileRoster::new();
        let _ = roster.launch(launch(Vec2::ZERO, Vec2::new(0.0, 50.0)));
        assert_eq!(roster.entries[0].velocity, Vec2::new(0.0, 100.0));
    }

    #[test]
    fn launch_on_top_of_aim_still_moves() {
        let origin = Vec2::new(40.0, 40.0);
        let mut roster = ProjectileRoster::new();
        let _ = roster.launch(launch(origin, origin));
        assert_eq!(roster.entries[0].velocity, Vec2::new(100.0, 0.0));

        let mut enemies = EnemyRoster::new();
        let mut impacts = Vec::new();
        roster.advance(Duration::from_millis(100), BOUNDS, &mut enemies, &mut impacts);
        assert_eq!(roster.entries[0].position, Vec2::new(50.0, 40.0));
    }

    #[test]
    fn hit_consumes_projectile_and_damages_enemy() {
        let mut enemies = EnemyRoster::new();
        let target = enemy(&mut enemies, 25.0, Vec2::new(100.0, 100.0));
        let mut roster = ProjectileRoster::new();
        let shot = roster.launch(launch(Vec2::new(100.0, 80.0), Vec2::new(100.0, 100.0)));

        let mut impacts = Vec::new();
        roster.advance(Duration::from_millis(200), BOUNDS, &mut enemies, &mut impacts);

        assert_eq!(
            impacts,
            vec![Impact::Hit {
                projectile: shot,
                enemy: target,
                damage: Damage {
                    remaining_hp: 15.0,
                    destroyed: false
                }
            }]
        );
        assert_eq!(roster.len(), 0);
    }

    #[test]
    fn second_projectile_cannot_rekill_destroyed_enemy() {
        let mut enemies = EnemyRoster::new();
        let target = enemy(&mut enemies, 10.0, Vec2::new(50.0, 50.0));
        let mut roster = ProjectileRoster::new();
        let first = roster.launch(launch(Vec2::new(50.0, 49.0), Vec2::new(50.0, 50.0)));
        let second = roster.launch(launch(Vec2::new(49.0, 50.0), Vec2::new(50.0, 50.0)));

        let mut impacts = Vec::new();
        roster.advance(Duration::from_millis(10), BOUNDS, &mut enemies, &mut impacts);

        let kills = impacts
            .iter()
            .filter(|impact| matches!(impact, Impact::Hit { damage, .. } if damage.destroyed))
            .count();
        assert_eq!(kills, 1);
        assert!(matches!(
            impacts[0],
            Impact::Hit { projectile, enemy, .. } if projectile == first && enemy == target
        ));
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.entries[0].id, second);
    }

    #[test]
    fn projectiles_expire_after_time_to_live_or_leaving_bounds() {
        let mut enemies = EnemyRoster::new();
        let mut roster = ProjectileRoster::new();
        let lingering = roster.launch(launch(Vec2::new(500.0, 500.0), Vec2::new(500.0, 500.0)));
        let escaping = roster.launch(launch(Vec2::new(995.0, 10.0), Vec2::new(1_100.0, 10.0)));

        let mut impacts = Vec::new();
        roster.advance(Duration::from_millis(100), BOUNDS, &mut enemies, &mut impacts);
        assert_eq!(
            impacts,
            vec![Impact::Expired {
                projectile: escaping
            }]
        );

        impacts.clear();
        roster.advance(Duration::from_secs(2), BOUNDS, &mut enemies, &mut impacts);
        assert_eq!(
            impacts,
            vec![Impact::Expired {
                projectile: lingering
            }]
        );
    }
}
