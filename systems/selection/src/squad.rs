//! Groups of friendly units selected together with a box drag.

use throne_defence_core::{HealthChange, ShowableData, UnitDirectory, UnitId, UnitSnapshot};

/// Name shown in the selection panel for a squad.
pub const SQUAD_NAME: &str = "Selected units";

/// Several friendly units selected as one entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Squad {
    members: Vec<UnitId>,
}

impl Squad {
    /// Creates a squad from the provided units, dropping duplicates.
    #[must_use]
    pub fn new(members: impl IntoIterator<Item = UnitId>) -> Self {
        let mut members: Vec<UnitId> = members.into_iter().collect();
        members.sort_unstable();
        members.dedup();
        Self { members }
    }

    /// Units still in the squad.
    #[must_use]
    pub fn members(&self) -> &[UnitId] {
        &self.members
    }

    /// Number of units in the squad.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Reports whether every member has left the squad.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Reports whether `unit` belongs to the squad.
    #[must_use]
    pub fn contains(&self, unit: UnitId) -> bool {
        self.members.binary_search(&unit).is_ok()
    }

    /// Drops `unit` from the squad. Returns whether it was a member.
    pub fn remove(&mut self, unit: UnitId) -> bool {
        match self.members.binary_search(&unit) {
            Ok(index) => {
                let _ = self.members.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    /// Selection panel record listing the health of every living member.
    #[must_use]
    pub fn showable<D>(&self, units: &D) -> ShowableData
    where
        D: UnitDirectory + ?Sized,
    {
        ShowableData {
            name: SQUAD_NAME.to_owned(),
            description: self.health_lines(units),
            details: None,
        }
    }

    /// Combined health of the living members.
    #[must_use]
    pub fn health_change<D>(&self, units: &D) -> HealthChange
    where
        D: UnitDirectory + ?Sized,
    {
        let (current, max) = self
            .living(units)
            .fold((0.0, 0.0), |(current, max), unit| {
                (current + unit.health, max + unit.max_health)
            });
        let fullness = if current > 0.0 && max > 0.0 {
            current / max
        } else {
            0.0
        };
        HealthChange {
            current,
            fullness,
            description: self.health_lines(units),
        }
    }

    fn health_lines<D>(&self, units: &D) -> String
    where
        D: UnitDirectory + ?Sized,
    {
        self.living(units)
            .map(|unit| format!("HP: {:.0} / {:.0}\n", unit.health, unit.max_health))
            .collect()
    }

    fn living<'a, D>(&'a self, units: &'a D) -> impl Iterator<Item = UnitSnapshot> + 'a
    where
        D: UnitDirectory + ?Sized,
    {
        self.members
            .iter()
            .filter_map(|id| units.unit(*id))
            .filter(|unit| unit.alive)
    }
}
