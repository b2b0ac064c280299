//! Per-team spatial registry of living units.

use std::time::Duration;

use throne_defence_core::{Team, UnitId, Vec2};
use throne_defence_spatial::{KdTree, SpatialError};

/// Keeps one [`KdTree`] per team so spatial queries are always team-scoped.
///
/// Units enter their team's tree when they spawn and leave it when they die.
/// Trees cache the positions units had at the last rebuild; [`Self::update`]
/// refreshes them at a bounded rate.
#[derive(Clone, Debug, Default)]
pub struct TeamUnitRegistry {
    friends: KdTree<UnitId>,
    enemies: KdTree<UnitId>,
}

impl TeamUnitRegistry {
    /// Creates a registry with empty trees for both teams.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tree(&self, team: Team) -> &KdTree<UnitId> {
        match team {
            Team::Friends => &self.friends,
            Team::Enemies => &self.enemies,
        }
    }

    fn tree_mut(&mut self, team: Team) -> &mut KdTree<UnitId> {
        match team {
            Team::Friends => &mut self.friends,
            Team::Enemies => &mut self.enemies,
        }
    }

    /// Number of units registered for `team`.
    #[must_use]
    pub fn len(&self, team: Team) -> usize {
        self.tree(team).len()
    }

    /// Registers a freshly spawned or revived unit.
    pub fn on_unit_created(&mut self, unit: UnitId, team: Team, position: Vec2) {
        self.tree_mut(team).insert(unit, position);
    }

    /// Removes every unit in `units` from `team` with a single rebuild.
    ///
    /// Returns the number of removed units.
    pub fn on_units_died(&mut self, team: Team, units: &[UnitId]) -> usize {
        if units.is_empty() {
            return 0;
        }
        self.tree_mut(team).remove_all(|unit| units.contains(unit))
    }

    /// Nearest registered unit of `team` to `point`.
    #[must_use]
    pub fn closest_unit(&self, team: Team, point: Vec2) -> Option<UnitId> {
        self.tree(team).find_closest(point).copied()
    }

    /// Registered units of `team` inside the inclusive rectangle.
    #[must_use]
    pub fn units_in_region(&self, team: Team, min: Vec2, max: Vec2) -> Vec<UnitId> {
        self.tree(team).in_region(min, max).into_iter().copied().collect()
    }

    /// Registered units of `team` inside the inclusive circle.
    #[must_use]
    pub fn units_in_circle(&self, team: Team, center: Vec2, radius: f32) -> Vec<UnitId> {
        self.tree(team)
            .in_circle(center, radius)
            .into_iter()
            .copied()
            .collect()
    }

    /// Rate-limited rebuild of both trees with positions from `locate`.
    ///
    /// Returns whether any tree was rebuilt.
    pub fn update(
        &mut self,
        rate: f32,
        now: Duration,
        mut locate: impl FnMut(UnitId) -> Vec2,
    ) -> Result<bool, SpatialError> {
        let friends = self.friends.update(rate, now, |unit| locate(*unit))?;
        let enemies = self.enemies.update(rate, now, |unit| locate(*unit))?;
        Ok(friends || enemies)
    }
}
