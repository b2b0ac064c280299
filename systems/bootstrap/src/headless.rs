//! Frontend collaborators for sessions that draw nothing.

use std::collections::BTreeMap;

use throne_defence_core::Vec2;
use throne_defence_system_selection::{Accessory, ObjectPool, PooledId, ScreenProjector};

/// Camera looking straight down; one screen unit spans `1 / zoom` ground units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TopDownCamera {
    /// Ground point at the screen origin.
    pub origin: Vec2,
    /// Screen units per ground unit.
    pub zoom: f32,
}

impl Default for TopDownCamera {
    fn default() -> Self {
        Self {
            origin: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl ScreenProjector for TopDownCamera {
    fn screen_to_ground(&self, screen: Vec2) -> Vec2 {
        self.origin + screen / self.zoom
    }

    fn ground_to_screen(&self, ground: Vec2) -> Vec2 {
        (ground - self.origin) * self.zoom
    }
}

/// Object pool that only remembers which accessories are out.
#[derive(Debug, Default)]
pub struct RecordingPool {
    next: u32,
    active: BTreeMap<PooledId, (Accessory, Vec2)>,
    acquired: usize,
}

impl RecordingPool {
    /// Accessories currently shown, with their positions.
    pub fn active(&self) -> impl Iterator<Item = (PooledId, Accessory, Vec2)> + '_ {
        self.active
            .iter()
            .map(|(id, (accessory, position))| (*id, *accessory, *position))
    }

    /// Number of accessories handed out over the pool's lifetime.
    #[must_use]
    pub fn acquired(&self) -> usize {
        self.acquired
    }
}

impl ObjectPool for RecordingPool {
    fn acquire(&mut self, accessory: Accessory, position: Vec2) -> PooledId {
        let id = PooledId::new(self.next);
        self.next += 1;
        self.acquired += 1;
        let _ = self.active.insert(id, (accessory, position));
        id
    }

    fn place(&mut self, id: PooledId, position: Vec2) {
        if let Some((_, current)) = self.active.get_mut(&id) {
            *current = position;
        }
    }

    fn release(&mut self, id: PooledId) {
        let _ = self.active.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cameras_round_trip_points() {
        let camera = TopDownCamera {
            origin: Vec2::new(-10.0, 5.0),
            zoom: 2.0,
        };
        let ground = Vec2::new(3.0, -1.0);
        assert_eq!(camera.screen_to_ground(camera.ground_to_screen(ground)), ground);
        assert_eq!(camera.screen_to_ground(Vec2::ZERO), camera.origin);
    }

    #[test]
    fn released_accessories_disappear() {
        let mut pool = RecordingPool::default();
        let marker = pool.acquire(Accessory::PositionMarker, Vec2::ONE);
        let ring = pool.acquire(Accessory::AreaIndicator { radius: 2.0 }, Vec2::ZERO);
        pool.place(ring, Vec2::new(4.0, 4.0));
        pool.release(marker);

        let active: Vec<_> = pool.active().collect();
        assert_eq!(
            active,
            vec![(ring, Accessory::AreaIndicator { radius: 2.0 }, Vec2::new(4.0, 4.0))]
        );
        assert_eq!(pool.acquired(), 2);
    }
}
