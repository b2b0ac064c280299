//! Projectiles launched by ranged attacks.

use std::time::Duration;

use throne_defence_core::{ProjectileSnapshot, Target, Team, UnitId, Vec2, PROJECTILE_HIT_DISTANCE};

/// Projectile homing in on its target's current position.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Projectile {
    pub(crate) attacker: UnitId,
    pub(crate) team: Team,
    pub(crate) target: Target,
    pub(crate) position: Vec2,
    pub(crate) speed: f32,
    pub(crate) damage: f32,
}

/// Outcome of moving a projectile for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flight {
    InFlight,
    Hit,
}

impl Projectile {
    /// Moves towards `destination`. Reports a hit once the projectile is
    /// within [`PROJECTILE_HIT_DISTANCE`] of it.
    pub(crate) fn advance(&mut self, destination: Vec2, dt: Duration) -> Flight {
        let step = self.speed * dt.as_secs_f32();
        let offset = destination - self.position;
        let distance = offset.length();
        if distance - step <= PROJECTILE_HIT_DISTANCE {
            self.position = destination;
            return Flight::Hit;
        }
        self.position += offset / distance * step;
        Flight::InFlight
    }

    pub(crate) fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            attacker: self.attacker,
            target: self.target,
            position: self.position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrow() -> Projectile {
        Projectile {
            attacker: UnitId::new(1),
            team: Team::Enemies,
            target: Target::Unit(UnitId::new(2)),
            position: Vec2::ZERO,
            speed: 10.0,
            damage: 5.0,
        }
    }

    #[test]
    fn projectiles_fly_at_their_speed_until_they_hit() {
        let mut arrow = arrow();
        let target = Vec2::new(3.0, 0.0);
        assert_eq!(arrow.advance(target, Duration::from_millis(100)), Flight::InFlight);
        assert_eq!(arrow.position, Vec2::new(1.0, 0.0));
        assert_eq!(arrow.advance(target, Duration::from_millis(100)), Flight::InFlight);
        assert_eq!(arrow.advance(target, Duration::from_millis(100)), Flight::Hit);
        assert_eq!(arrow.position, target);
    }

    #[test]
    fn projectiles_follow_moving_targets() {
        let mut arrow = arrow();
        let _ = arrow.advance(Vec2::new(10.0, 0.0), Duration::from_millis(100));
        let _ = arrow.advance(Vec2::new(1.0, 10.0), Duration::from_millis(100));
        assert!((arrow.position - Vec2::new(1.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn close_targets_are_hit_without_moving() {
        let mut arrow = arrow();
        assert_eq!(arrow.advance(Vec2::new(0.05, 0.0), Duration::ZERO), Flight::Hit);
    }
}
