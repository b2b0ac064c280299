#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that answers "what should this unit fight next" from world lookups.
//!
//! All queries are team-scoped: a unit only ever receives targets from the
//! team opposing its own. Buildings act as fallbacks so that enemies march on
//! the throne and minions return to the fountain when nothing is in reach.

use throne_defence_core::{
    AreaTarget, BuildingDirectory, BuildingId, BuildingKind, Target, TargetLookup, Team, UnitId,
    UnitIndex, UnitKind, UnitSnapshot, Vec2, HERO_AUTO_ATTACK_DISTANCE,
};

/// Resolves unit and building targets for team members.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetResolver {
    auto_attack_distance: f32,
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetResolver {
    /// Creates a resolver using the standard hero auto-attack distance.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_auto_attack_distance(HERO_AUTO_ATTACK_DISTANCE)
    }

    /// Creates a resolver whose heroes engage enemies within `distance` on their own.
    #[must_use]
    pub const fn with_auto_attack_distance(distance: f32) -> Self {
        Self {
            auto_attack_distance: distance,
        }
    }

    /// Nearest unit of the team opposing `team`.
    #[must_use]
    pub fn unit_target_for<I>(&self, index: &I, team: Team, position: Vec2) -> Option<UnitId>
    where
        I: UnitIndex + ?Sized,
    {
        index.closest_unit(team.opponent(), position)
    }

    /// Units of the team opposing `team` inside `area`.
    pub fn unit_targets_in_area<I>(
        &self,
        index: &I,
        team: Team,
        area: &AreaTarget,
        out: &mut Vec<UnitId>,
    ) where
        I: UnitIndex + ?Sized,
    {
        index.units_in_circle(team.opponent(), area.center, area.radius, out);
    }

    /// Standing building of `kind`.
    #[must_use]
    pub fn building<B>(&self, buildings: &B, kind: BuildingKind) -> Option<BuildingId>
    where
        B: BuildingDirectory + ?Sized,
    {
        buildings.building_of_kind(kind)
    }

    /// Building a unit of `kind` heads for when no unit is in reach.
    #[must_use]
    pub fn fallback_for<B>(&self, buildings: &B, kind: UnitKind) -> Option<Target>
    where
        B: BuildingDirectory + ?Sized,
    {
        let building = match kind {
            UnitKind::Raider | UnitKind::Archer => BuildingKind::Throne,
            UnitKind::Minion => BuildingKind::Fountain,
            UnitKind::Hero => return None,
        };
        self.building(buildings, building).map(Target::Building)
    }

    /// Picks the target `seeker` should pursue next.
    ///
    /// * Enemies take the nearest friendly unit, otherwise the throne.
    /// * Minions keep a player-assigned target while it exists, otherwise take
    ///   the nearest enemy, otherwise head back to the fountain.
    /// * Heroes keep a player-assigned target while it exists, otherwise take
    ///   the nearest enemy within the auto-attack distance.
    #[must_use]
    pub fn next_target<W>(&self, world: &W, seeker: &UnitSnapshot) -> Option<Target>
    where
        W: UnitIndex + TargetLookup + BuildingDirectory + ?Sized,
    {
        match seeker.kind {
            UnitKind::Raider | UnitKind::Archer => self
                .closest_enemy(world, seeker)
                .or_else(|| self.fallback_for(world, seeker.kind)),
            UnitKind::Minion => self
                .assigned_target(world, seeker)
                .or_else(|| self.closest_enemy(world, seeker))
                .or_else(|| self.fallback_for(world, seeker.kind)),
            UnitKind::Hero => self.assigned_target(world, seeker).or_else(|| {
                self.closest_enemy(world, seeker).filter(|target| {
                    world.target_info(target).is_some_and(|info| {
                        info.position.distance(seeker.position) <= self.auto_attack_distance
                    })
                })
            }),
        }
    }

    fn closest_enemy<W>(&self, world: &W, seeker: &UnitSnapshot) -> Option<Target>
    where
        W: UnitIndex + ?Sized,
    {
        self.unit_target_for(world, seeker.team, seeker.position)
            .map(Target::Unit)
    }

    fn assigned_target<W>(&self, world: &W, seeker: &UnitSnapshot) -> Option<Target>
    where
        W: TargetLookup + ?Sized,
    {
        if !seeker.target_assigned {
            return None;
        }
        let target = seeker.target?;
        let info = world.target_info(&target)?;
        let exists = info.attackable.map_or(true, |attackable| attackable.alive);
        exists.then_some(target)
    }
}
