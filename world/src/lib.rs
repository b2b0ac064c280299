#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Throne Defence.
//!
//! The world owns every unit, building and projectile, the per-team spatial
//! registry, the gold purse and the session clock. It mutates only through
//! [`apply`] and exposes read-only access through the [`query`] module and
//! the lookup traits from the core crate.

mod buildings;
mod projectiles;
mod registry;
mod units;

use std::{collections::BTreeMap, time::Duration};

use thiserror::Error;
use throne_defence_core::{
    AreaTarget, Attackable, BarracksLevel, BuildingDirectory, BuildingId, BuildingKind,
    BuildingSnapshot, Command, Event, HealthChange, ProductionSnapshot, SkillKind, SkillLevel,
    Target, TargetHandling, TargetInfo, TargetLookup, Team, UnitDirectory, UnitId, UnitIndex,
    UnitKind, UnitProfile, UnitSnapshot, Vec2, DEFAULT_STARTING_GOLD, WELCOME_BANNER,
};
use throne_defence_spatial::SpatialError;
use tracing::{debug, info};

pub use buildings::BarracksConfig;
pub use registry::TeamUnitRegistry;

use buildings::{BuildingRegistry, BuildingState};
use projectiles::{Flight, Projectile};
use units::{SkillState, Unit};

/// Default number of spatial index rebuilds per simulated second.
pub const DEFAULT_INDEX_REBUILD_RATE: f32 = 2.0;

const DEFAULT_THRONE_HEALTH: f32 = 10_000.0;
const DEFAULT_FOUNTAIN_RADIUS: f32 = 10.0;
const DEFAULT_FOUNTAIN_HEALING: f32 = 20.0;
const DEFAULT_HERO_MANA_REGEN: f32 = 2.0;
const DEFAULT_EXPERIENCE_PER_LEVEL: u32 = 100;
const ATTACK_RANGE_TOLERANCE: f32 = 0.01;

/// Failures raised when a command or configuration violates a precondition.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum WorldError {
    /// Damage amounts must not be negative.
    #[error("damage must not be negative, got {amount}")]
    NegativeDamage {
        /// Rejected amount.
        amount: f32,
    },
    /// Skill slot beyond the owner's skill list.
    #[error("unit {unit:?} has no skill in slot {slot}, it owns {count}")]
    SkillSlotOutOfRange {
        /// Skill owner.
        unit: UnitId,
        /// Requested slot.
        slot: usize,
        /// Number of owned skills.
        count: usize,
    },
    /// Index rebuild rate that is not positive.
    #[error("index rebuild rate must be positive, got {rate}")]
    InvalidRebuildRate {
        /// Rejected rate.
        rate: f32,
    },
    /// Unit profile with an impossible value.
    #[error("{kind:?} profile is invalid: {reason}")]
    InvalidProfile {
        /// Kind whose profile is invalid.
        kind: UnitKind,
        /// Description of the problem.
        reason: &'static str,
    },
    /// Skill table that cannot be used.
    #[error("{kind:?} skill table is invalid: {reason}")]
    InvalidSkillTable {
        /// Skill whose table is invalid.
        kind: SkillKind,
        /// Description of the problem.
        reason: &'static str,
    },
    /// Barracks upgrade step that cannot be used.
    #[error("barracks level step {step} is invalid: {reason}")]
    InvalidBarracksLevel {
        /// Index of the step in the table.
        step: usize,
        /// Description of the problem.
        reason: &'static str,
    },
    /// Negative or non-finite building or fountain setting.
    #[error("invalid setting {name}: {value}")]
    InvalidSetting {
        /// Name of the setting.
        name: &'static str,
        /// Rejected value.
        value: f32,
    },
    /// The spatial index rejected an operation.
    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

/// Tunable parameters of the world.
#[derive(Clone, Debug)]
pub struct WorldConfig {
    /// Profile overrides per unit kind; missing kinds use their defaults.
    pub profiles: BTreeMap<UnitKind, UnitProfile>,
    /// Hero skill book in slot order.
    pub hero_skills: Vec<(SkillKind, Vec<SkillLevel>)>,
    /// Spatial index rebuilds per simulated second.
    pub index_rebuild_rate: f32,
    /// Health of a freshly placed throne.
    pub throne_health: f32,
    /// Radius around the fountain in which friendly units heal.
    pub fountain_radius: f32,
    /// Health restored per second to each unit near the fountain.
    pub fountain_healing: f32,
    /// Mana restored per second to units with a mana pool.
    pub mana_regen: f32,
    /// Experience needed per hero level; level `n` needs `n` times this.
    pub experience_per_level: u32,
    /// Gold in the purse when the world starts.
    pub starting_gold: u64,
    /// Training and upgrade settings of barracks.
    pub barracks: BarracksConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            profiles: BTreeMap::new(),
            hero_skills: [SkillKind::IceBolt, SkillKind::Meteor]
                .into_iter()
                .map(|kind| (kind, kind.default_levels()))
                .collect(),
            index_rebuild_rate: DEFAULT_INDEX_REBUILD_RATE,
            throne_health: DEFAULT_THRONE_HEALTH,
            fountain_radius: DEFAULT_FOUNTAIN_RADIUS,
            fountain_healing: DEFAULT_FOUNTAIN_HEALING,
            mana_regen: DEFAULT_HERO_MANA_REGEN,
            experience_per_level: DEFAULT_EXPERIENCE_PER_LEVEL,
            starting_gold: DEFAULT_STARTING_GOLD,
            barracks: BarracksConfig::default(),
        }
    }
}

impl WorldConfig {
    fn validate(&self) -> Result<(), WorldError> {
        if self.index_rebuild_rate.is_nan() || self.index_rebuild_rate <= 0.0 {
            return Err(WorldError::InvalidRebuildRate {
                rate: self.index_rebuild_rate,
            });
        }
        for (name, value) in [
            ("throne_health", self.throne_health),
            ("fountain_radius", self.fountain_radius),
            ("fountain_healing", self.fountain_healing),
            ("mana_regen", self.mana_regen),
            ("barracks_creation_speed", self.barracks.base_creation_speed),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(WorldError::InvalidSetting { name, value });
            }
        }
        for (&kind, profile) in &self.profiles {
            validate_profile(kind, profile)?;
        }
        for (kind, levels) in &self.hero_skills {
            validate_skill_table(*kind, levels)?;
        }
        if !self.barracks.spawn_offset.is_finite() {
            return Err(WorldError::InvalidSetting {
                name: "barracks_spawn_offset",
                value: self.barracks.spawn_offset.length(),
            });
        }
        validate_barracks_levels(&self.barracks.levels)
    }

    fn profile(&self, kind: UnitKind) -> UnitProfile {
        self.profiles
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_profile())
    }
}

fn validate_profile(kind: UnitKind, profile: &UnitProfile) -> Result<(), WorldError> {
    let invalid = |reason| Err(WorldError::InvalidProfile { kind, reason });
    if !(profile.max_health > 0.0) {
        return invalid("max health must be positive");
    }
    if profile.damage < 0.0 || profile.armor < 0.0 {
        return invalid("damage and armor must not be negative");
    }
    if profile.attack_range < 0.0 || profile.speed < 0.0 || profile.max_mana < 0.0 {
        return invalid("range, speed and mana must not be negative");
    }
    if profile
        .projectile_speed
        .is_some_and(|speed| !speed.is_finite() || speed <= 0.0)
    {
        return invalid("projectile speed must be positive and finite");
    }
    Ok(())
}

fn validate_barracks_levels(levels: &[BarracksLevel]) -> Result<(), WorldError> {
    for (step, level) in levels.iter().enumerate() {
        let gains = [
            level.creation_speed_up,
            level.health_bonus,
            level.damage_bonus,
            level.armor_bonus,
        ];
        if gains.iter().any(|gain| !gain.is_finite() || *gain < 0.0) {
            return Err(WorldError::InvalidBarracksLevel {
                step,
                reason: "speed up and bonuses must be finite and not negative",
            });
        }
    }
    Ok(())
}

fn validate_skill_table(kind: SkillKind, levels: &[SkillLevel]) -> Result<(), WorldError> {
    let invalid = |reason| Err(WorldError::InvalidSkillTable { kind, reason });
    if levels.is_empty() {
        return invalid("at least one level is required");
    }
    for level in levels {
        if level.damage < 0.0 {
            return invalid("damage must not be negative");
        }
        if level.cooldown_secs < 0.0 || level.distance < 0.0 || level.radius < 0.0 {
            return invalid("cooldown, distance and radius must not be negative");
        }
    }
    Ok(())
}

/// Represents the authoritative Throne Defence world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    config: WorldConfig,
    clock: Duration,
    last_dt: Duration,
    units: BTreeMap<UnitId, Unit>,
    next_unit_id: UnitId,
    buildings: BuildingRegistry,
    registry: TeamUnitRegistry,
    pending_deaths: Vec<(UnitId, Team)>,
    projectiles: Vec<Projectile>,
    gold: u64,
    game_over: bool,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_valid_config(WorldConfig::default())
    }

    /// Creates a world after validating `config`.
    pub fn with_config(config: WorldConfig) -> Result<Self, WorldError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: WorldConfig) -> Self {
        Self {
            banner: WELCOME_BANNER,
            gold: config.starting_gold,
            config,
            clock: Duration::ZERO,
            last_dt: Duration::ZERO,
            units: BTreeMap::new(),
            next_unit_id: UnitId::new(0),
            buildings: BuildingRegistry::new(),
            registry: TeamUnitRegistry::new(),
            pending_deaths: Vec::new(),
            projectiles: Vec::new(),
            game_over: false,
        }
    }

    fn living_unit_mut(&mut self, unit: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&unit).filter(|unit| unit.is_alive())
    }

    fn skill_slot(&self, unit: UnitId, slot: usize) -> Result<Option<&Unit>, WorldError> {
        let Some(owner) = self.units.get(&unit) else {
            return Ok(None);
        };
        if slot >= owner.skills.len() {
            return Err(WorldError::SkillSlotOutOfRange {
                unit,
                slot,
                count: owner.skills.len(),
            });
        }
        Ok(Some(owner).filter(|owner| owner.is_alive()))
    }

    fn spawn_unit(
        &mut self,
        kind: UnitKind,
        position: Vec2,
        profile: UnitProfile,
        out_events: &mut Vec<Event>,
    ) {
        let id = self.next_unit_id;
        self.next_unit_id = UnitId::new(id.get() + 1);

        let skills = if kind == UnitKind::Hero {
            self.config
                .hero_skills
                .iter()
                .map(|(skill, levels)| SkillState::new(*skill, levels.clone()))
                .collect()
        } else {
            Vec::new()
        };
        let unit = Unit::new(id, kind, position, profile, skills);
        let team = unit.team;
        let _ = self.units.insert(id, unit);
        self.registry.on_unit_created(id, team, position);
        out_events.push(Event::UnitSpawned {
            unit: id,
            kind,
            team,
            position,
        });
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        self.clock = self.clock.saturating_add(dt);
        self.last_dt = dt;
        out_events.push(Event::TimeAdvanced { dt });

        let mana_regen = self.config.mana_regen;
        for unit in self.units.values_mut().filter(|unit| unit.is_alive()) {
            for slot in unit.tick(dt, mana_regen) {
                out_events.push(Event::SkillReady { unit: unit.id, slot });
            }
        }

        self.heal_around_fountain(dt, out_events);
        self.advance_projectiles(dt, out_events)?;

        let units = &self.units;
        let rebuilt = self
            .registry
            .update(self.config.index_rebuild_rate, self.clock, |id| {
                units.get(&id).map_or(Vec2::ZERO, |unit| unit.position)
            })?;
        if rebuilt {
            debug!(
                friends = self.registry.len(Team::Friends),
                enemies = self.registry.len(Team::Enemies),
                "rebuilt unit index"
            );
        }
        Ok(())
    }

    fn heal_around_fountain(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let Some(fountain) = self.buildings.standing_of_kind(BuildingKind::Fountain) else {
            return;
        };
        let amount = self.config.fountain_healing * dt.as_secs_f32();
        if amount <= 0.0 {
            return;
        }
        let radius = self.config.fountain_radius;
        let nearby = self
            .registry
            .units_in_circle(Team::Friends, fountain.position, radius);
        for id in nearby {
            let Some(unit) = self.living_unit_mut(id) else {
                continue;
            };
            if unit.heal(amount) {
                out_events.push(Event::HealthChanged {
                    subject: Target::Unit(id),
                    change: HealthChange::new(unit.health, unit.profile.max_health),
                });
            }
        }
    }

    fn advance_projectiles(
        &mut self,
        dt: Duration,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let mut landed = Vec::new();
        let mut flying = std::mem::take(&mut self.projectiles);
        flying.retain_mut(|projectile| {
            let destination = self
                .target_info(&projectile.target)
                .filter(|info| info.can_be_attacked_by(projectile.team));
            let Some(info) = destination else {
                debug!(
                    attacker = projectile.attacker.get(),
                    "projectile lost its target"
                );
                return false;
            };
            match projectile.advance(info.position, dt) {
                Flight::InFlight => true,
                Flight::Hit => {
                    landed.push((projectile.attacker, projectile.target, projectile.damage));
                    false
                }
            }
        });
        self.projectiles = flying;

        for (attacker, target, raw) in landed {
            let damage = self.after_armor(target, raw);
            out_events.push(Event::UnitAttacked {
                attacker,
                target,
                damage,
            });
            self.damage(target, damage, Some(attacker), out_events)?;
        }
        Ok(())
    }

    fn assign_target(
        &mut self,
        unit: UnitId,
        target: Target,
        manual: bool,
        out_events: &mut Vec<Event>,
    ) {
        let Some(state) = self.living_unit_mut(unit) else {
            return;
        };
        if state.target == Some(target) && state.target_assigned == manual {
            return;
        }
        state.target = Some(target);
        state.target_assigned = manual;
        state.handling = TargetHandling::Attack;
        out_events.push(Event::TargetChanged {
            unit,
            target: Some(target),
            manual,
        });
    }

    fn reset_target(&mut self, unit: UnitId, out_events: &mut Vec<Event>) {
        let Some(state) = self.units.get_mut(&unit) else {
            return;
        };
        if state.reset_target() {
            out_events.push(Event::TargetChanged {
                unit,
                target: None,
                manual: false,
            });
        }
    }

    fn attack(
        &mut self,
        attacker: UnitId,
        target: Target,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let Some(state) = self.units.get(&attacker) else {
            return Ok(());
        };
        if !state.is_alive() || !state.attack_ready() {
            return Ok(());
        }
        let (team, origin, profile) = (state.team, state.position, state.profile);

        let Some(info) = self.target_info(&target) else {
            return Ok(());
        };
        if !info.can_be_attacked_by(team) {
            return Ok(());
        }
        if (info.position - origin).length() > profile.attack_range + ATTACK_RANGE_TOLERANCE {
            return Ok(());
        }

        if let Some(state) = self.units.get_mut(&attacker) {
            state.start_attack_cooldown();
        }
        if let Some(speed) = profile.projectile_speed {
            self.projectiles.push(Projectile {
                attacker,
                team,
                target,
                position: origin,
                speed,
                damage: profile.damage,
            });
            out_events.push(Event::ProjectileFired {
                attacker,
                target,
                position: origin,
            });
            return Ok(());
        }
        let damage = self.after_armor(target, profile.damage);
        out_events.push(Event::UnitAttacked {
            attacker,
            target,
            damage,
        });
        self.damage(target, damage, Some(attacker), out_events)
    }

    fn after_armor(&self, target: Target, raw: f32) -> f32 {
        let armor = match target {
            Target::Unit(victim) => self.units.get(&victim).map_or(0.0, |unit| unit.profile.armor),
            _ => 0.0,
        };
        (raw - armor).max(0.0)
    }

    fn damage(
        &mut self,
        target: Target,
        amount: f32,
        source: Option<UnitId>,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        if amount.is_nan() || amount < 0.0 {
            return Err(WorldError::NegativeDamage { amount });
        }
        match target {
            Target::Unit(victim) => self.damage_unit(victim, amount, source, out_events),
            Target::Building(building) => {
                self.damage_building(building, amount, out_events);
                Ok(())
            }
            Target::Point(_) | Target::Area(_) => Ok(()),
        }
    }

    fn damage_unit(
        &mut self,
        victim: UnitId,
        amount: f32,
        source: Option<UnitId>,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let Some(unit) = self.living_unit_mut(victim) else {
            return Ok(());
        };
        let killed = unit.take_damage(amount);
        let (team, kind, health, max_health) =
            (unit.team, unit.kind, unit.health, unit.profile.max_health);
        let (reward, gold) = (unit.profile.experience_reward, unit.profile.gold_reward);

        out_events.push(Event::HealthChanged {
            subject: Target::Unit(victim),
            change: HealthChange::new(health, max_health),
        });
        if !killed {
            return Ok(());
        }

        info!(unit = victim.get(), ?kind, ?team, "unit died");
        self.pending_deaths.push((victim, team));
        out_events.push(Event::UnitDied {
            unit: victim,
            team,
            kind,
            killer: source,
        });
        self.add_gold(gold, out_events);
        if let Some(killer) = source {
            self.grant_experience(killer, reward, out_events);
        }
        Ok(())
    }

    fn add_gold(&mut self, amount: u64, out_events: &mut Vec<Event>) {
        if amount == 0 {
            return;
        }
        let old = self.gold;
        self.gold = old.saturating_add(amount);
        out_events.push(Event::GoldChanged {
            old,
            new: self.gold,
        });
    }

    fn production_of(&self, building: &BuildingState) -> Option<ProductionSnapshot> {
        let unit = building.kind.trains()?;
        Some(
            self.config
                .barracks
                .production(unit, building.level, self.config.profile(unit)),
        )
    }

    fn building_snapshot(&self, building: &BuildingState) -> BuildingSnapshot {
        BuildingSnapshot {
            production: self.production_of(building),
            ..building.snapshot()
        }
    }

    fn train_unit(&mut self, building: BuildingId, out_events: &mut Vec<Event>) {
        let Some(state) = self.buildings.get(building).filter(|state| state.is_standing()) else {
            return;
        };
        let Some(production) = self.production_of(state) else {
            return;
        };
        let position = state.position + self.config.barracks.spawn_offset;
        debug!(
            building = building.get(),
            level = production.level,
            "trained a unit"
        );
        self.spawn_unit(production.unit, position, production.profile, out_events);
    }

    fn upgrade_building(&mut self, building: BuildingId, out_events: &mut Vec<Event>) {
        let Some(state) = self.buildings.get(building).filter(|state| state.is_standing()) else {
            return;
        };
        let Some(cost) = self.production_of(state).and_then(|p| p.upgrade_cost) else {
            return;
        };
        if self.gold < cost {
            debug!(building = building.get(), cost, gold = self.gold, "upgrade unaffordable");
            return;
        }
        let old = self.gold;
        self.gold -= cost;
        out_events.push(Event::GoldChanged {
            old,
            new: self.gold,
        });
        let Some(state) = self.buildings.get_mut(building) else {
            return;
        };
        state.level += 1;
        info!(building = building.get(), level = state.level, "building levelled up");
        out_events.push(Event::BuildingLeveledUp {
            building,
            level: state.level,
        });
    }

    fn damage_building(&mut self, building: BuildingId, amount: f32, out_events: &mut Vec<Event>) {
        let Some(state) = self.buildings.get_mut(building) else {
            return;
        };
        if !state.is_standing() || state.kind.attackable_by().is_none() {
            return;
        }
        state.health = (state.health - amount).max(0.0);
        out_events.push(Event::HealthChanged {
            subject: Target::Building(building),
            change: HealthChange::new(state.health, state.max_health),
        });
        if !state.is_standing() && state.kind == BuildingKind::Throne {
            info!(building = building.get(), "throne destroyed");
            self.game_over = true;
            out_events.push(Event::ThroneDestroyed { building });
        }
    }

    fn grant_experience(&mut self, hero: UnitId, amount: u32, out_events: &mut Vec<Event>) {
        if amount == 0 {
            return;
        }
        let per_level = self.config.experience_per_level;
        let Some(unit) = self.living_unit_mut(hero) else {
            return;
        };
        if unit.kind != UnitKind::Hero {
            return;
        }
        unit.experience += amount;
        out_events.push(Event::ExperienceGained {
            unit: hero,
            amount,
            total: unit.experience,
        });
        if per_level == 0 {
            return;
        }
        while unit.experience >= per_level * unit.level {
            unit.experience -= per_level * unit.level;
            unit.level_up();
            info!(unit = hero.get(), level = unit.level, "hero levelled up");
            out_events.push(Event::HeroLeveledUp {
                unit: hero,
                level: unit.level,
            });
        }
    }

    fn queue_skill(
        &mut self,
        unit: UnitId,
        slot: usize,
        target: Target,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let Some(owner) = self.skill_slot(unit, slot)? else {
            return Ok(());
        };
        if !owner.skills[slot].can_be_used_with(owner.mana) {
            return Ok(());
        }
        if let Some(owner) = self.units.get_mut(&unit) {
            owner.target = Some(target);
            owner.target_assigned = true;
            owner.handling = TargetHandling::UseSkill { slot };
        }
        out_events.push(Event::SkillQueued { unit, slot, target });
        out_events.push(Event::TargetChanged {
            unit,
            target: Some(target),
            manual: true,
        });
        Ok(())
    }

    fn cast_skill(
        &mut self,
        unit: UnitId,
        slot: usize,
        target: Target,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let Some(owner) = self.skill_slot(unit, slot)? else {
            return Ok(());
        };
        let skill = &owner.skills[slot];
        if !skill.can_be_used_with(owner.mana) {
            return Ok(());
        }
        let (kind, spec, team) = (skill.kind, skill.spec(), owner.team);
        let info = self.target_info(&target);
        if !kind.verify_target(&target, info.as_ref(), team) {
            return Ok(());
        }

        if let Some(owner) = self.units.get_mut(&unit) {
            owner.mana -= spec.mana_cost as f32;
            owner.skills[slot].start_recharging();
        }
        out_events.push(Event::SkillCast {
            unit,
            slot,
            kind,
            target,
        });

        match (kind, target) {
            (SkillKind::IceBolt, target) => {
                self.damage(target, spec.damage, Some(unit), out_events)?;
                if let Some(victim) = target.unit().and_then(|id| self.living_unit_mut(id)) {
                    victim.freeze(
                        Duration::from_secs_f32(spec.freeze_secs.max(0.0)),
                        spec.freeze_speed_factor,
                    );
                }
            }
            (SkillKind::Meteor, Target::Area(AreaTarget { center, radius })) => {
                let victims =
                    self.registry
                        .units_in_circle(team.opponent(), center, radius.max(0.0));
                for victim in victims {
                    self.damage_unit(victim, spec.damage, Some(unit), out_events)?;
                }
            }
            (SkillKind::Meteor, _) => {}
        }

        self.reset_target(unit, out_events);
        Ok(())
    }

    fn revive(&mut self, unit: UnitId, out_events: &mut Vec<Event>) {
        let Some(state) = self.units.get_mut(&unit) else {
            return;
        };
        if state.is_alive() {
            return;
        }
        state.revive();
        let (team, position, health) = (state.team, state.position, state.health);
        self.registry.on_unit_created(unit, team, position);
        info!(unit = unit.get(), "unit revived");
        out_events.push(Event::UnitRevived { unit, position });
        out_events.push(Event::HealthChanged {
            subject: Target::Unit(unit),
            change: HealthChange::new(health, health),
        });
    }

    fn flush_deaths(&mut self) {
        if self.pending_deaths.is_empty() {
            return;
        }
        let deaths = std::mem::take(&mut self.pending_deaths);
        for team in Team::ALL {
            let fallen: Vec<UnitId> = deaths
                .iter()
                .filter(|(_, side)| *side == team)
                .map(|(unit, _)| *unit)
                .collect();
            let _ = self.registry.on_units_died(team, &fallen);
        }
        for (unit, _) in deaths {
            let keep = self
                .units
                .get(&unit)
                .is_some_and(|state| state.kind == UnitKind::Hero);
            if !keep {
                let _ = self.units.remove(&unit);
            }
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Commands that name units or buildings that no longer exist are ignored, and
/// so are upgrades the purse cannot pay for. Precondition violations are
/// reported as [`WorldError`]; the events emitted before the violation stay in
/// `out_events`.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), WorldError> {
    let result = match command {
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::SpawnUnit { kind, position } => {
            let profile = world.config.profile(kind);
            world.spawn_unit(kind, position, profile, out_events);
            Ok(())
        }
        Command::PlaceBuilding { kind, position } => {
            let health = match kind {
                BuildingKind::Throne => world.config.throne_health,
                BuildingKind::Fountain | BuildingKind::Barracks => 1.0,
            };
            let building = world.buildings.insert(kind, position, health);
            out_events.push(Event::BuildingPlaced {
                building,
                kind,
                position,
            });
            Ok(())
        }
        Command::FaceTowards { unit, point } => {
            if let Some(state) = world.living_unit_mut(unit) {
                state.face(point);
            }
            Ok(())
        }
        Command::MoveUnit { unit, toward } => {
            let dt = world.last_dt;
            if let Some(state) = world.living_unit_mut(unit) {
                state.move_towards(toward, dt);
            }
            Ok(())
        }
        Command::AssignTarget {
            unit,
            target,
            manual,
        } => {
            world.assign_target(unit, target, manual, out_events);
            Ok(())
        }
        Command::ResetTarget { unit } => {
            world.reset_target(unit, out_events);
            Ok(())
        }
        Command::Attack { attacker, target } => world.attack(attacker, target, out_events),
        Command::QueueSkill { unit, slot, target } => {
            world.queue_skill(unit, slot, target, out_events)
        }
        Command::CastSkill { unit, slot, target } => {
            world.cast_skill(unit, slot, target, out_events)
        }
        Command::ReviveUnit { unit } => {
            world.revive(unit, out_events);
            Ok(())
        }
        Command::TrainUnit { building } => {
            world.train_unit(building, out_events);
            Ok(())
        }
        Command::UpgradeBuilding { building } => {
            world.upgrade_building(building, out_events);
            Ok(())
        }
    };
    world.flush_deaths();
    result
}

impl UnitIndex for World {
    fn closest_unit(&self, team: Team, point: Vec2) -> Option<UnitId> {
        self.registry.closest_unit(team, point)
    }

    fn units_in_region(&self, team: Team, min: Vec2, max: Vec2, out: &mut Vec<UnitId>) {
        out.extend(self.registry.units_in_region(team, min, max));
    }

    fn units_in_circle(&self, team: Team, center: Vec2, radius: f32, out: &mut Vec<UnitId>) {
        out.extend(self.registry.units_in_circle(team, center, radius));
    }
}

impl TargetLookup for World {
    fn target_info(&self, target: &Target) -> Option<TargetInfo> {
        match *target {
            Target::Unit(id) => self.units.get(&id).map(|unit| TargetInfo {
                position: unit.position,
                attackable: Some(Attackable {
                    alive: unit.is_alive(),
                    attackable_by: unit.team.opponent(),
                }),
            }),
            Target::Building(id) => self.buildings.get(id).map(|building| TargetInfo {
                position: building.position,
                attackable: building.kind.attackable_by().map(|team| Attackable {
                    alive: building.is_standing(),
                    attackable_by: team,
                }),
            }),
            Target::Point(point) => Some(TargetInfo::passive(point)),
            Target::Area(area) => Some(TargetInfo::passive(area.center)),
        }
    }
}

impl UnitDirectory for World {
    fn unit(&self, id: UnitId) -> Option<UnitSnapshot> {
        self.units.get(&id).map(Unit::snapshot)
    }
}

impl BuildingDirectory for World {
    fn building_of_kind(&self, kind: BuildingKind) -> Option<BuildingId> {
        self.buildings.standing_of_kind(kind).map(|building| building.id)
    }

    fn building(&self, id: BuildingId) -> Option<BuildingSnapshot> {
        self.buildings
            .get(id)
            .map(|building| self.building_snapshot(building))
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use throne_defence_core::{
        BuildingDirectory, BuildingId, BuildingSnapshot, ButtonData, ProjectileSnapshot,
        ShowableData, Target, Team, UnitDirectory, UnitId, UnitSnapshot,
    };

    use super::{TeamUnitRegistry, World};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Simulated time elapsed since the world was created.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.clock
    }

    /// Gold currently in the purse.
    #[must_use]
    pub fn gold(world: &World) -> u64 {
        world.gold
    }

    /// Projectiles still in flight, oldest first.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .projectiles
            .iter()
            .map(super::Projectile::snapshot)
            .collect()
    }

    /// Reports whether the throne fell.
    #[must_use]
    pub fn is_game_over(world: &World) -> bool {
        world.game_over
    }

    /// Provides read-only access to the per-team spatial registry.
    #[must_use]
    pub fn registry(world: &World) -> &TeamUnitRegistry {
        &world.registry
    }

    /// Captures a read-only view of every unit, dead heroes included.
    #[must_use]
    pub fn unit_view(world: &World) -> UnitView {
        UnitView {
            snapshots: world.units.values().map(super::Unit::snapshot).collect(),
        }
    }

    /// Snapshot of a single unit.
    #[must_use]
    pub fn unit(world: &World, id: UnitId) -> Option<UnitSnapshot> {
        world.unit(id)
    }

    /// Living units of `team` in identifier order.
    #[must_use]
    pub fn living_units_of(world: &World, team: Team) -> Vec<UnitId> {
        world
            .units
            .values()
            .filter(|unit| unit.team == team && unit.is_alive())
            .map(|unit| unit.id)
            .collect()
    }

    /// Snapshots of every building in identifier order.
    #[must_use]
    pub fn buildings(world: &World) -> Vec<BuildingSnapshot> {
        world
            .buildings
            .iter()
            .map(|building| world.building_snapshot(building))
            .collect()
    }

    /// Action buttons of a building for the current purse.
    #[must_use]
    pub fn building_buttons(world: &World, id: BuildingId) -> Vec<ButtonData> {
        world
            .building(id)
            .map(|building| building.buttons(world.gold))
            .unwrap_or_default()
    }

    /// Selection panel record for a unit or building target.
    #[must_use]
    pub fn showable_for(world: &World, target: &Target) -> Option<ShowableData> {
        match *target {
            Target::Unit(id) => world.unit(id).map(|unit| unit.showable()),
            Target::Building(id) => world.building(id).map(|building| building.showable()),
            Target::Point(_) | Target::Area(_) => None,
        }
    }

    /// Skill buttons of a unit in slot order.
    #[must_use]
    pub fn skill_buttons(world: &World, id: UnitId) -> Vec<ButtonData> {
        world
            .unit(id)
            .map(|unit| unit.skill_buttons())
            .unwrap_or_default()
    }

    /// Read-only snapshot describing all units.
    #[derive(Clone, Debug)]
    pub struct UnitView {
        snapshots: Vec<UnitSnapshot>,
    }

    impl UnitView {
        /// Iterator over the captured unit snapshots in identifier order.
        pub fn iter(&self) -> impl Iterator<Item = &UnitSnapshot> {
            self.snapshots.iter()
        }

        /// Consumes the view, yielding the underlying snapshots.
        pub fn into_vec(self) -> Vec<UnitSnapshot> {
            self.snapshots
        }
    }
}
