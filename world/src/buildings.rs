//! Authoritative building state management utilities.

use std::collections::BTreeMap;

use throne_defence_core::{
    BarracksLevel, BuildingId, BuildingKind, BuildingSnapshot, ProductionSnapshot, UnitKind,
    UnitProfile, Vec2, DEFAULT_CREATION_SPEED, MIN_CREATION_SPEED,
};

/// Training and upgrade settings shared by every barracks.
#[derive(Clone, Debug, PartialEq)]
pub struct BarracksConfig {
    /// Units per second trained at level one.
    pub base_creation_speed: f32,
    /// Upgrade steps; a barracks tops out at `levels.len() + 1`.
    pub levels: Vec<BarracksLevel>,
    /// Offset from the barracks where trained units appear.
    pub spawn_offset: Vec2,
}

impl Default for BarracksConfig {
    fn default() -> Self {
        Self {
            base_creation_speed: DEFAULT_CREATION_SPEED,
            levels: BarracksLevel::default_table(),
            spawn_offset: Vec2::new(0.0, 3.0),
        }
    }
}

impl BarracksConfig {
    /// Training state at `level`, starting from the trained kind's `base` profile.
    pub(crate) fn production(
        &self,
        unit: UnitKind,
        level: u32,
        base: UnitProfile,
    ) -> ProductionSnapshot {
        let applied = (level.max(1) as usize - 1).min(self.levels.len());
        let mut profile = base;
        let mut creation_speed = self.base_creation_speed;
        for step in &self.levels[..applied] {
            step.improve(&mut profile);
            creation_speed += step.creation_speed_up;
        }
        ProductionSnapshot {
            unit,
            level,
            creation_speed: creation_speed.max(MIN_CREATION_SPEED),
            upgrade_cost: self.levels.get(applied).map(|step| step.upgrade_cost),
            profile,
        }
    }
}

/// Building stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct BuildingState {
    pub(crate) id: BuildingId,
    pub(crate) kind: BuildingKind,
    pub(crate) position: Vec2,
    pub(crate) health: f32,
    pub(crate) max_health: f32,
    pub(crate) level: u32,
}

impl BuildingState {
    pub(crate) fn is_standing(&self) -> bool {
        self.health > 0.0
    }

    /// Snapshot without training state; the world fills that in.
    pub(crate) fn snapshot(&self) -> BuildingSnapshot {
        BuildingSnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
            health: self.health,
            max_health: self.max_health,
            production: None,
        }
    }
}

/// Registry that stores buildings and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct BuildingRegistry {
    entries: BTreeMap<BuildingId, BuildingState>,
    next_building_id: BuildingId,
}

impl BuildingRegistry {
    /// Creates an empty building registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_building_id: BuildingId::new(0),
        }
    }

    pub(crate) fn insert(
        &mut self,
        kind: BuildingKind,
        position: Vec2,
        max_health: f32,
    ) -> BuildingId {
        let id = self.next_building_id;
        self.next_building_id = BuildingId::new(id.get() + 1);
        let _ = self.entries.insert(
            id,
            BuildingState {
                id,
                kind,
                position,
                health: max_health,
                max_health,
                level: 1,
            },
        );
        id
    }

    pub(crate) fn get(&self, id: BuildingId) -> Option<&BuildingState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: BuildingId) -> Option<&mut BuildingState> {
        self.entries.get_mut(&id)
    }

    /// First standing building of `kind` in identifier order.
    pub(crate) fn standing_of_kind(&self, kind: BuildingKind) -> Option<&BuildingState> {
        self.entries
            .values()
            .find(|building| building.kind == kind && building.is_standing())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &BuildingState> {
        self.entries.values()
    }
}
