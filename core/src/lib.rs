#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Throne Defence simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems read immutable snapshots through the
//! lookup traits declared here ([`UnitIndex`], [`TargetLookup`],
//! [`UnitDirectory`], [`BuildingDirectory`]) and respond exclusively with new
//! command batches.
//!
//! Enemy deaths pay gold into a session-wide purse, and the purse pays for
//! barracks upgrades; both sides of that exchange travel as commands and
//! events like everything else.
//!
//! Ground-plane positions are [`Vec2`] values where `x` is world X and `y` is
//! world Z. Height is never represented.

use std::time::Duration;

pub use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Throne Defence.";

/// Distance within which a hero engages enemies it was not ordered to attack.
pub const HERO_AUTO_ATTACK_DISTANCE: f32 = 20.0;

/// Distance at which a unit considers a ground point reached.
pub const POINT_ARRIVAL_DISTANCE: f32 = 0.1;

/// Distance at which a projectile strikes its target.
pub const PROJECTILE_HIT_DISTANCE: f32 = 0.1;

/// Flight speed of arrows in world units per second.
pub const DEFAULT_ARROW_SPEED: f32 = 15.0;

/// Gold in the purse when a session starts.
pub const DEFAULT_STARTING_GOLD: u64 = 100;

/// Units per second a level one barracks trains.
pub const DEFAULT_CREATION_SPEED: f32 = 0.05;

/// Slowest training speed a barracks can run at.
pub const MIN_CREATION_SPEED: f32 = 0.001;

/// Keyboard shortcut of a building's level up button.
pub const UPGRADE_HOTKEY: char = 'U';

/// Side a unit or building fights for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Player-controlled side defending the throne.
    Friends,
    /// Attacking waves.
    Enemies,
}

impl Team {
    /// Both teams in a stable order.
    pub const ALL: [Team; 2] = [Team::Friends, Team::Enemies];

    /// Returns the team this team fights against.
    #[must_use]
    pub const fn opponent(self) -> Team {
        match self {
            Team::Enemies => Team::Friends,
            Team::Friends => Team::Enemies,
        }
    }
}

/// Unique identifier assigned to a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingId(u32);

impl BuildingId {
    /// Creates a new building identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the building identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Enumerates the unit archetypes that can take part in a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Player hero that owns skills, levels up and revives after death.
    Hero,
    /// Friendly soldier guarding the fountain.
    Minion,
    /// Enemy melee attacker marching on the throne.
    Raider,
    /// Enemy ranged attacker.
    Archer,
}

impl UnitKind {
    /// Team every unit of this kind belongs to.
    #[must_use]
    pub const fn team(self) -> Team {
        match self {
            UnitKind::Hero | UnitKind::Minion => Team::Friends,
            UnitKind::Raider | UnitKind::Archer => Team::Enemies,
        }
    }

    /// Human readable name shown in the selection panel.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            UnitKind::Hero => "Hero",
            UnitKind::Minion => "Minion",
            UnitKind::Raider => "Raider",
            UnitKind::Archer => "Archer",
        }
    }

    /// Baseline combat profile for the kind.
    #[must_use]
    pub const fn default_profile(self) -> UnitProfile {
        match self {
            UnitKind::Hero => UnitProfile {
                max_health: 500.0,
                armor: 2.0,
                damage: 35.0,
                attack_range: 2.5,
                attack_interval: Duration::from_millis(800),
                speed: 6.0,
                max_mana: 200.0,
                experience_reward: 0,
                gold_reward: 0,
                projectile_speed: None,
            },
            UnitKind::Minion => UnitProfile {
                max_health: 150.0,
                armor: 1.0,
                damage: 12.0,
                attack_range: 2.0,
                attack_interval: Duration::from_secs(1),
                speed: 4.0,
                max_mana: 0.0,
                experience_reward: 0,
                gold_reward: 0,
                projectile_speed: None,
            },
            UnitKind::Raider => UnitProfile {
                max_health: 120.0,
                armor: 0.0,
                damage: 10.0,
                attack_range: 2.0,
                attack_interval: Duration::from_secs(1),
                speed: 3.5,
                max_mana: 0.0,
                experience_reward: 20,
                gold_reward: 10,
                projectile_speed: None,
            },
            UnitKind::Archer => UnitProfile {
                max_health: 80.0,
                armor: 0.0,
                damage: 8.0,
                attack_range: 12.0,
                attack_interval: Duration::from_millis(1500),
                speed: 3.0,
                max_mana: 0.0,
                experience_reward: 25,
                gold_reward: 15,
                projectile_speed: Some(DEFAULT_ARROW_SPEED),
            },
        }
    }
}

/// Combat statistics applied to a unit when it spawns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitProfile {
    /// Health the unit starts with and can be healed up to.
    pub max_health: f32,
    /// Flat reduction applied to every incoming hit.
    pub armor: f32,
    /// Damage dealt by a single attack.
    pub damage: f32,
    /// Distance at which the unit can hit its target.
    pub attack_range: f32,
    /// Minimum simulated time between two attacks.
    pub attack_interval: Duration,
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Mana pool available for skills.
    pub max_mana: f32,
    /// Experience granted to the hero that lands the killing blow.
    pub experience_reward: u32,
    /// Gold paid into the purse when the unit dies.
    pub gold_reward: u64,
    /// Ranged units launch projectiles flying at this speed; melee units
    /// (`None`) strike immediately.
    pub projectile_speed: Option<f32>,
}

/// Enumerates the buildings that anchor a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    /// The throne enemies march on; losing it ends the session.
    Throne,
    /// Healing fountain that friendly units fall back to.
    Fountain,
    /// Trains minions over time and can be upgraded with gold.
    Barracks,
}

impl BuildingKind {
    /// Human readable name shown in the selection panel.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            BuildingKind::Throne => "Throne",
            BuildingKind::Fountain => "Fountain",
            BuildingKind::Barracks => "Barracks",
        }
    }

    /// Unit kind the building trains, if any.
    #[must_use]
    pub const fn trains(self) -> Option<UnitKind> {
        match self {
            BuildingKind::Barracks => Some(UnitKind::Minion),
            BuildingKind::Throne | BuildingKind::Fountain => None,
        }
    }

    /// Team allowed to damage the building, if any.
    #[must_use]
    pub const fn attackable_by(self) -> Option<Team> {
        match self {
            BuildingKind::Throne => Some(Team::Enemies),
            BuildingKind::Fountain | BuildingKind::Barracks => None,
        }
    }
}

/// One step of a barracks upgrade table.
///
/// Level `n` of a barracks has the first `n - 1` steps applied; the step at
/// index `n - 1` is what the next level up costs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BarracksLevel {
    /// Gold spent to reach this step.
    pub upgrade_cost: u64,
    /// Training speed added, in units per second.
    #[serde(default)]
    pub creation_speed_up: f32,
    /// Maximum health added to trained units.
    #[serde(default)]
    pub health_bonus: f32,
    /// Damage added to trained units.
    #[serde(default)]
    pub damage_bonus: f32,
    /// Armor added to trained units.
    #[serde(default)]
    pub armor_bonus: f32,
}

impl BarracksLevel {
    /// Upgrade steps used when no table is configured.
    #[must_use]
    pub fn default_table() -> Vec<BarracksLevel> {
        vec![
            BarracksLevel {
                upgrade_cost: 100,
                creation_speed_up: 0.025,
                health_bonus: 30.0,
                damage_bonus: 4.0,
                armor_bonus: 0.5,
            },
            BarracksLevel {
                upgrade_cost: 250,
                creation_speed_up: 0.025,
                health_bonus: 40.0,
                damage_bonus: 6.0,
                armor_bonus: 0.5,
            },
        ]
    }

    /// Adds the step's bonuses to `profile`.
    pub fn improve(&self, profile: &mut UnitProfile) {
        profile.max_health += self.health_bonus;
        profile.damage += self.damage_bonus;
        profile.armor += self.armor_bonus;
    }
}

/// Circular ground area used by area-targeted skills.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AreaTarget {
    /// Centre of the area on the ground plane.
    pub center: Vec2,
    /// Radius of the area in world units.
    pub radius: f32,
}

/// Anything a unit can be ordered to approach or act upon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Target {
    /// Another unit.
    Unit(UnitId),
    /// A building.
    Building(BuildingId),
    /// A bare ground point.
    Point(Vec2),
    /// A circular ground area.
    Area(AreaTarget),
}

impl Target {
    /// Unit identifier when the target is a unit.
    #[must_use]
    pub const fn unit(&self) -> Option<UnitId> {
        match self {
            Target::Unit(id) => Some(*id),
            _ => None,
        }
    }
}

/// Attack-related facts about a resolved target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attackable {
    /// Whether the target is still alive.
    pub alive: bool,
    /// Team whose members may damage the target.
    pub attackable_by: Team,
}

/// Read-only facts about a target at the moment of the lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetInfo {
    /// Current ground position of the target.
    pub position: Vec2,
    /// Present when the target can take damage.
    pub attackable: Option<Attackable>,
}

impl TargetInfo {
    /// Describes a target that cannot be attacked.
    #[must_use]
    pub const fn passive(position: Vec2) -> Self {
        Self {
            position,
            attackable: None,
        }
    }

    /// Reports whether a member of `team` may attack the target right now.
    #[must_use]
    pub fn can_be_attacked_by(&self, team: Team) -> bool {
        self.attackable
            .is_some_and(|attackable| attackable.alive && attackable.attackable_by == team)
    }
}

/// Selects how a unit deals with its current target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TargetHandling {
    /// Approach and attack, or walk to a point.
    #[default]
    Attack,
    /// Approach and cast the skill in `slot` on the target.
    UseSkill {
        /// Index of the skill in the owner's skill list.
        slot: usize,
    },
}

/// Enumerates the skills a hero can learn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    /// Single-target bolt that damages and freezes a unit.
    IceBolt,
    /// Area blast damaging every enemy inside the radius.
    Meteor,
}

impl SkillKind {
    /// Human readable skill name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            SkillKind::IceBolt => "Ice Bolt",
            SkillKind::Meteor => "Meteor",
        }
    }

    /// Short description shown on the skill button.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            SkillKind::IceBolt => "Deals damage to a single target and freezes it.",
            SkillKind::Meteor => "Calls down meteorites that damage enemies in an area.",
        }
    }

    /// Keyboard shortcut bound to the skill button.
    #[must_use]
    pub const fn hotkey(self) -> char {
        match self {
            SkillKind::IceBolt => 'Q',
            SkillKind::Meteor => 'W',
        }
    }

    /// Per-level parameters used when no table is configured.
    #[must_use]
    pub fn default_levels(self) -> Vec<SkillLevel> {
        match self {
            SkillKind::IceBolt => vec![
                SkillLevel {
                    mana_cost: 30,
                    cooldown_secs: 6.0,
                    distance: 15.0,
                    damage: 60.0,
                    radius: 0.0,
                    freeze_secs: 3.0,
                    freeze_speed_factor: 0.4,
                },
                SkillLevel {
                    mana_cost: 40,
                    cooldown_secs: 5.0,
                    distance: 18.0,
                    damage: 90.0,
                    radius: 0.0,
                    freeze_secs: 4.0,
                    freeze_speed_factor: 0.3,
                },
            ],
            SkillKind::Meteor => vec![
                SkillLevel {
                    mana_cost: 80,
                    cooldown_secs: 15.0,
                    distance: 0.0,
                    damage: 120.0,
                    radius: 6.0,
                    freeze_secs: 0.0,
                    freeze_speed_factor: 1.0,
                },
                SkillLevel {
                    mana_cost: 100,
                    cooldown_secs: 12.0,
                    distance: 0.0,
                    damage: 180.0,
                    radius: 8.0,
                    freeze_secs: 0.0,
                    freeze_speed_factor: 1.0,
                },
            ],
        }
    }

    /// Targeting mode configured for the provided level parameters.
    #[must_use]
    pub fn targeting_mode(self, level: &SkillLevel) -> TargetingMode {
        match self {
            SkillKind::IceBolt => TargetingMode::Unit {
                usable_radius: level.distance,
            },
            SkillKind::Meteor => TargetingMode::Area {
                radius: level.radius,
            },
        }
    }

    /// Distance from which the skill may be used. Meteor reaches anywhere.
    #[must_use]
    pub fn using_distance(self, level: &SkillLevel) -> f32 {
        match self {
            SkillKind::IceBolt => level.distance,
            SkillKind::Meteor => f32::MAX,
        }
    }

    /// Checks whether `target` is acceptable for a skill cast by a member of
    /// `owner_team`.
    #[must_use]
    pub fn verify_target(
        self,
        target: &Target,
        info: Option<&TargetInfo>,
        owner_team: Team,
    ) -> bool {
        match self {
            SkillKind::IceBolt => {
                matches!(target, Target::Unit(_) | Target::Building(_))
                    && info.is_some_and(|info| info.can_be_attacked_by(owner_team))
            }
            SkillKind::Meteor => matches!(target, Target::Area(_)),
        }
    }
}

/// How the player picks a target for a skill.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TargetingMode {
    /// Pick a unit under the cursor within the usable radius of the caster.
    Unit {
        /// Radius drawn around the caster while selecting.
        usable_radius: f32,
    },
    /// Pick a ground area centred on the cursor.
    Area {
        /// Radius of the affected area.
        radius: f32,
    },
}

/// Parameters of a skill at a single level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkillLevel {
    /// Mana spent per cast.
    pub mana_cost: u32,
    /// Seconds before the skill can be cast again.
    pub cooldown_secs: f32,
    /// Distance from which a unit-targeted skill may be used.
    #[serde(default)]
    pub distance: f32,
    /// Damage dealt to every affected unit.
    pub damage: f32,
    /// Blast radius of area skills.
    #[serde(default)]
    pub radius: f32,
    /// Seconds the target stays frozen.
    #[serde(default)]
    pub freeze_secs: f32,
    /// Movement speed multiplier while frozen.
    #[serde(default = "SkillLevel::unfrozen_factor")]
    pub freeze_speed_factor: f32,
}

impl SkillLevel {
    fn unfrozen_factor() -> f32 {
        1.0
    }

    /// Cooldown expressed as a duration. Negative values clamp to zero.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f32(self.cooldown_secs.max(0.0))
    }
}

/// Read-only view of a skill owned by a unit.
#[derive(Clone, Debug, PartialEq)]
pub struct SkillSnapshot {
    /// Kind of the skill.
    pub kind: SkillKind,
    /// Current skill level, starting at one.
    pub level: u32,
    /// Parameters of the current level.
    pub spec: SkillLevel,
    /// Time left before the skill recharges.
    pub cooldown_remaining: Duration,
    /// Whether a higher level exists.
    pub can_level_up: bool,
}

impl SkillSnapshot {
    /// Reports whether the skill is still recharging.
    #[must_use]
    pub fn is_recharging(&self) -> bool {
        !self.cooldown_remaining.is_zero()
    }

    /// Reports whether an owner with `mana` could cast the skill now.
    #[must_use]
    pub fn can_be_used_with(&self, mana: f32) -> bool {
        !self.is_recharging() && self.spec.mana_cost as f32 <= mana
    }

    /// Targeting mode at the current level.
    #[must_use]
    pub fn targeting_mode(&self) -> TargetingMode {
        self.kind.targeting_mode(&self.spec)
    }

    /// Using distance at the current level.
    #[must_use]
    pub fn using_distance(&self) -> f32 {
        self.kind.using_distance(&self.spec)
    }

    /// Button record describing the skill for an owner with `mana`.
    #[must_use]
    pub fn button(&self, index: usize, mana: f32) -> ButtonData {
        ButtonData {
            index,
            label: format!(
                "{}({})\n{} mp",
                self.kind.display_name(),
                self.level,
                self.spec.mana_cost
            ),
            description: self.kind.description().to_owned(),
            active: self.spec.mana_cost as f32 <= mana,
            flashing: false,
            hotkey: self.kind.hotkey(),
        }
    }
}

/// Read-only view of a unit.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitSnapshot {
    /// Identifier of the unit.
    pub id: UnitId,
    /// Archetype of the unit.
    pub kind: UnitKind,
    /// Team of the unit.
    pub team: Team,
    /// Ground position of the unit.
    pub position: Vec2,
    /// Unit-length facing direction on the ground plane.
    pub heading: Vec2,
    /// Whether the unit is alive.
    pub alive: bool,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Current mana.
    pub mana: f32,
    /// Maximum mana.
    pub max_mana: f32,
    /// Distance at which the unit can hit.
    pub attack_range: f32,
    /// Whether the attack has recharged.
    pub attack_ready: bool,
    /// Effective movement speed including slows.
    pub speed: f32,
    /// Current target, if any.
    pub target: Option<Target>,
    /// Whether the target was assigned by the player.
    pub target_assigned: bool,
    /// Strategy applied to the current target.
    pub handling: TargetHandling,
    /// Hero level; one for every other unit.
    pub level: u32,
    /// Accumulated experience.
    pub experience: u32,
    /// Skills owned by the unit.
    pub skills: Vec<SkillSnapshot>,
}

impl UnitSnapshot {
    /// Player-controllable units accept manual orders.
    #[must_use]
    pub fn is_controllable(&self) -> bool {
        self.alive && self.team == Team::Friends
    }

    /// Health record for health bars.
    #[must_use]
    pub fn health_change(&self) -> HealthChange {
        HealthChange::new(self.health, self.max_health)
    }

    /// Selection panel record for the unit.
    #[must_use]
    pub fn showable(&self) -> ShowableData {
        let mut description = format!("HP: {:.0} / {:.0}", self.health, self.max_health);
        if self.max_mana > 0.0 {
            description.push_str(&format!("\nMP: {:.0} / {:.0}", self.mana, self.max_mana));
        }
        let details = (self.kind == UnitKind::Hero)
            .then(|| format!("Level {} ({} xp)", self.level, self.experience));
        ShowableData {
            name: self.kind.display_name().to_owned(),
            description,
            details,
        }
    }

    /// Skill buttons for the unit in slot order.
    #[must_use]
    pub fn skill_buttons(&self) -> Vec<ButtonData> {
        self.skills
            .iter()
            .enumerate()
            .map(|(index, skill)| skill.button(index, self.mana))
            .collect()
    }
}

/// Read-only view of a building.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildingSnapshot {
    /// Identifier of the building.
    pub id: BuildingId,
    /// Kind of the building.
    pub kind: BuildingKind,
    /// Ground position of the building.
    pub position: Vec2,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Training state of buildings that train units.
    pub production: Option<ProductionSnapshot>,
}

impl BuildingSnapshot {
    /// Selection panel record for the building.
    #[must_use]
    pub fn showable(&self) -> ShowableData {
        let name = self.kind.display_name().to_owned();
        match &self.production {
            Some(production) => ShowableData {
                name,
                description: format!(
                    "Level: {}\nSpeed: {:.3}",
                    production.level, production.creation_speed
                ),
                details: Some(format!(
                    "{}\nHP: {:.0}\nDamage: {:.0}\nArmor: {:.1}",
                    production.unit.display_name(),
                    production.profile.max_health,
                    production.profile.damage,
                    production.profile.armor
                )),
            },
            None => ShowableData {
                name,
                description: format!("HP: {:.0} / {:.0}", self.health, self.max_health),
                details: None,
            },
        }
    }

    /// Action buttons of the building for a purse holding `gold`.
    #[must_use]
    pub fn buttons(&self, gold: u64) -> Vec<ButtonData> {
        self.production
            .as_ref()
            .and_then(|production| production.button(gold))
            .into_iter()
            .collect()
    }
}

/// Training state of a barracks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProductionSnapshot {
    /// Kind of the trained units.
    pub unit: UnitKind,
    /// Current level, starting at one.
    pub level: u32,
    /// Units trained per second.
    pub creation_speed: f32,
    /// Gold the next level costs; `None` at the top level.
    pub upgrade_cost: Option<u64>,
    /// Profile trained units spawn with at the current level.
    pub profile: UnitProfile,
}

impl ProductionSnapshot {
    /// Time between two trained units.
    #[must_use]
    pub fn spawn_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.creation_speed.max(MIN_CREATION_SPEED))
    }

    /// Level up button for a purse holding `gold`; none at the top level.
    #[must_use]
    pub fn button(&self, gold: u64) -> Option<ButtonData> {
        let cost = self.upgrade_cost?;
        Some(ButtonData {
            index: 0,
            label: format!("Level up\n{cost} gold"),
            description: "Improves trained units and speeds up training.".to_owned(),
            active: gold >= cost,
            flashing: false,
            hotkey: UPGRADE_HOTKEY,
        })
    }
}

/// Read-only view of a projectile in flight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Unit that launched the projectile.
    pub attacker: UnitId,
    /// Target the projectile homes in on.
    pub target: Target,
    /// Current ground position.
    pub position: Vec2,
}

/// Text shown in the selection panel for the selected entity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShowableData {
    /// Entity name.
    pub name: String,
    /// Main description block.
    pub description: String,
    /// Optional secondary block.
    pub details: Option<String>,
}

/// Presentation record for a single action button.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonData {
    /// Position of the button in its panel.
    pub index: usize,
    /// Label printed on the button.
    pub label: String,
    /// Tooltip text.
    pub description: String,
    /// Whether the button can be pressed.
    pub active: bool,
    /// Whether the button asks for attention.
    pub flashing: bool,
    /// Keyboard shortcut.
    pub hotkey: char,
}

/// Health record broadcast whenever health changes.
#[derive(Clone, Debug, PartialEq)]
pub struct HealthChange {
    /// Current health.
    pub current: f32,
    /// Current health as a fraction of the maximum, in `[0, 1]`.
    pub fullness: f32,
    /// Printable "current/max" text.
    pub description: String,
}

impl HealthChange {
    /// Builds the record for `current` out of `max` health.
    #[must_use]
    pub fn new(current: f32, max: f32) -> Self {
        let fullness = if max > 0.0 {
            (current / max).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            current,
            fullness,
            description: format!("{current:.0}/{max:.0}"),
        }
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests a new unit of the provided kind.
    SpawnUnit {
        /// Archetype of the unit; it also decides the team.
        kind: UnitKind,
        /// Ground position the unit appears at.
        position: Vec2,
    },
    /// Requests placement of a building.
    PlaceBuilding {
        /// Kind of the building.
        kind: BuildingKind,
        /// Ground position of the building.
        position: Vec2,
    },
    /// Turns a unit towards a point.
    FaceTowards {
        /// Unit to rotate.
        unit: UnitId,
        /// Point to face.
        point: Vec2,
    },
    /// Moves a unit towards a point by its speed over the last tick.
    MoveUnit {
        /// Unit to move.
        unit: UnitId,
        /// Destination the unit walks towards.
        toward: Vec2,
    },
    /// Gives a unit a new target.
    AssignTarget {
        /// Unit receiving the target.
        unit: UnitId,
        /// New target.
        target: Target,
        /// Whether the player issued the order.
        manual: bool,
    },
    /// Clears the unit's target and returns it to the attack strategy.
    ResetTarget {
        /// Unit to reset.
        unit: UnitId,
    },
    /// Strikes a target once, if the attack has recharged.
    Attack {
        /// Attacking unit.
        attacker: UnitId,
        /// Target of the strike.
        target: Target,
    },
    /// Orders a unit to approach a target and cast a skill on it.
    QueueSkill {
        /// Skill owner.
        unit: UnitId,
        /// Index of the skill in the owner's list.
        slot: usize,
        /// Target of the skill.
        target: Target,
    },
    /// Casts a skill on a target immediately.
    CastSkill {
        /// Skill owner.
        unit: UnitId,
        /// Index of the skill in the owner's list.
        slot: usize,
        /// Target of the skill.
        target: Target,
    },
    /// Brings a dead hero back at full health.
    ReviveUnit {
        /// Hero to revive.
        unit: UnitId,
    },
    /// Trains one unit at a building that trains units.
    TrainUnit {
        /// Training building.
        building: BuildingId,
    },
    /// Spends gold to raise a building's level.
    UpgradeBuilding {
        /// Building to upgrade.
        building: BuildingId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a unit entered the world.
    UnitSpawned {
        /// Identifier assigned to the unit.
        unit: UnitId,
        /// Archetype of the unit.
        kind: UnitKind,
        /// Team of the unit.
        team: Team,
        /// Spawn position.
        position: Vec2,
    },
    /// Confirms that a building was placed.
    BuildingPlaced {
        /// Identifier assigned to the building.
        building: BuildingId,
        /// Kind of the building.
        kind: BuildingKind,
        /// Position of the building.
        position: Vec2,
    },
    /// Reports that a unit's target changed.
    TargetChanged {
        /// Unit whose target changed.
        unit: UnitId,
        /// New target, `None` after a reset.
        target: Option<Target>,
        /// Whether the player issued the order.
        manual: bool,
    },
    /// Reports a landed attack.
    UnitAttacked {
        /// Attacking unit.
        attacker: UnitId,
        /// Struck target.
        target: Target,
        /// Damage dealt after armour.
        damage: f32,
    },
    /// Reports a health change of a unit or building.
    HealthChanged {
        /// Unit or building whose health changed.
        subject: Target,
        /// New health record.
        change: HealthChange,
    },
    /// Reports a unit death.
    UnitDied {
        /// Unit that died.
        unit: UnitId,
        /// Team of the unit.
        team: Team,
        /// Archetype of the unit.
        kind: UnitKind,
        /// Unit that landed the killing blow.
        killer: Option<UnitId>,
    },
    /// Reports that the throne fell and the session is lost.
    ThroneDestroyed {
        /// Identifier of the throne.
        building: BuildingId,
    },
    /// Reports that a unit switched to casting a skill on a target.
    SkillQueued {
        /// Skill owner.
        unit: UnitId,
        /// Skill slot.
        slot: usize,
        /// Target of the skill.
        target: Target,
    },
    /// Reports a cast skill.
    SkillCast {
        /// Skill owner.
        unit: UnitId,
        /// Skill slot.
        slot: usize,
        /// Kind of the skill.
        kind: SkillKind,
        /// Target of the skill.
        target: Target,
    },
    /// Reports that a skill finished recharging.
    SkillReady {
        /// Skill owner.
        unit: UnitId,
        /// Skill slot.
        slot: usize,
    },
    /// Reports experience earned by a hero.
    ExperienceGained {
        /// Hero that earned experience.
        unit: UnitId,
        /// Experience earned.
        amount: u32,
        /// Experience accumulated towards the next level.
        total: u32,
    },
    /// Reports a hero level up.
    HeroLeveledUp {
        /// Hero that levelled up.
        unit: UnitId,
        /// New level.
        level: u32,
    },
    /// Reports a revived hero.
    UnitRevived {
        /// Hero that came back.
        unit: UnitId,
        /// Position it came back at.
        position: Vec2,
    },
    /// Reports a projectile launched by a ranged attack. The hit arrives
    /// later as [`Event::UnitAttacked`].
    ProjectileFired {
        /// Attacking unit.
        attacker: UnitId,
        /// Target the projectile homes in on.
        target: Target,
        /// Launch position.
        position: Vec2,
    },
    /// Reports a change of the gold purse.
    GoldChanged {
        /// Gold before the change.
        old: u64,
        /// Gold after the change.
        new: u64,
    },
    /// Reports a building level up.
    BuildingLeveledUp {
        /// Upgraded building.
        building: BuildingId,
        /// New level.
        level: u32,
    },
}

/// Team-scoped spatial queries over living units.
pub trait UnitIndex {
    /// Nearest unit of `team` to `point`.
    fn closest_unit(&self, team: Team, point: Vec2) -> Option<UnitId>;

    /// Units of `team` inside the inclusive rectangle `[min, max]`.
    fn units_in_region(&self, team: Team, min: Vec2, max: Vec2, out: &mut Vec<UnitId>);

    /// Units of `team` inside the inclusive circle.
    fn units_in_circle(&self, team: Team, center: Vec2, radius: f32, out: &mut Vec<UnitId>);
}

/// Resolves targets into positions and attack facts.
pub trait TargetLookup {
    /// Returns `None` when the target no longer exists.
    fn target_info(&self, target: &Target) -> Option<TargetInfo>;
}

/// Looks up unit snapshots.
pub trait UnitDirectory {
    /// Snapshot of the unit, dead heroes included.
    fn unit(&self, id: UnitId) -> Option<UnitSnapshot>;
}

/// Looks up buildings.
pub trait BuildingDirectory {
    /// Identifier of the building of `kind` still standing, if any.
    fn building_of_kind(&self, kind: BuildingKind) -> Option<BuildingId>;

    /// Snapshot of the building.
    fn building(&self, id: BuildingId) -> Option<BuildingSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opponents_are_symmetric() {
        assert_eq!(Team::Friends.opponent(), Team::Enemies);
        assert_eq!(Team::Enemies.opponent(), Team::Friends);
    }

    #[test]
    fn unit_kinds_map_to_teams() {
        assert_eq!(UnitKind::Hero.team(), Team::Friends);
        assert_eq!(UnitKind::Minion.team(), Team::Friends);
        assert_eq!(UnitKind::Raider.team(), Team::Enemies);
        assert_eq!(UnitKind::Archer.team(), Team::Enemies);
    }

    #[test]
    fn ice_bolt_requires_living_hostile_target() {
        let target = Target::Unit(UnitId::new(3));
        let alive = TargetInfo {
            position: Vec2::ZERO,
            attackable: Some(Attackable {
                alive: true,
                attackable_by: Team::Friends,
            }),
        };
        let dead = TargetInfo {
            attackable: Some(Attackable {
                alive: false,
                attackable_by: Team::Friends,
            }),
            ..alive
        };

        assert!(SkillKind::IceBolt.verify_target(&target, Some(&alive), Team::Friends));
        assert!(!SkillKind::IceBolt.verify_target(&target, Some(&alive), Team::Enemies));
        assert!(!SkillKind::IceBolt.verify_target(&target, Some(&dead), Team::Friends));
        assert!(!SkillKind::IceBolt.verify_target(&target, None, Team::Friends));
        assert!(!SkillKind::IceBolt.verify_target(
            &Target::Point(Vec2::ONE),
            Some(&TargetInfo::passive(Vec2::ONE)),
            Team::Friends
        ));
    }

    #[test]
    fn meteor_accepts_only_areas() {
        let area = Target::Area(AreaTarget {
            center: Vec2::new(4.0, 4.0),
            radius: 6.0,
        });
        assert!(SkillKind::Meteor.verify_target(&area, None, Team::Friends));
        let unit = Target::Unit(UnitId::new(1));
        assert!(!SkillKind::Meteor.verify_target(&unit, None, Team::Friends));
    }

    #[test]
    fn skill_button_label_reports_level_and_cost() {
        let spec = SkillKind::IceBolt.default_levels()[0];
        let skill = SkillSnapshot {
            kind: SkillKind::IceBolt,
            level: 1,
            spec,
            cooldown_remaining: Duration::ZERO,
            can_level_up: true,
        };

        let affordable = skill.button(0, 100.0);
        assert_eq!(affordable.label, "Ice Bolt(1)\n30 mp");
        assert!(affordable.active);
        assert_eq!(affordable.hotkey, 'Q');

        let broke = skill.button(0, 10.0);
        assert!(!broke.active, "button must be inactive without enough mana");
    }

    #[test]
    fn recharging_skill_cannot_be_used() {
        let skill = SkillSnapshot {
            kind: SkillKind::Meteor,
            level: 1,
            spec: SkillKind::Meteor.default_levels()[0],
            cooldown_remaining: Duration::from_secs(2),
            can_level_up: false,
        };
        assert!(!skill.can_be_used_with(1_000.0));
        assert_eq!(skill.using_distance(), f32::MAX);
    }

    #[test]
    fn health_change_clamps_fullness() {
        let change = HealthChange::new(25.0, 100.0);
        assert_eq!(change.fullness, 0.25);
        assert_eq!(change.description, "25/100");

        assert_eq!(HealthChange::new(5.0, 0.0).fullness, 0.0);
    }

    #[test]
    fn barracks_buttons_track_the_purse() {
        let production = ProductionSnapshot {
            unit: UnitKind::Minion,
            level: 1,
            creation_speed: 0.05,
            upgrade_cost: Some(100),
            profile: UnitKind::Minion.default_profile(),
        };
        let barracks = BuildingSnapshot {
            id: BuildingId::new(2),
            kind: BuildingKind::Barracks,
            position: Vec2::ZERO,
            health: 1.0,
            max_health: 1.0,
            production: Some(production),
        };

        let buttons = barracks.buttons(100);
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].label, "Level up\n100 gold");
        assert!(buttons[0].active);
        assert!(!barracks.buttons(99)[0].active);
        assert_eq!(production.spawn_interval(), Duration::from_secs(20));

        let showable = barracks.showable();
        assert_eq!(showable.name, "Barracks");
        assert_eq!(showable.description, "Level: 1\nSpeed: 0.050");

        let top = BuildingSnapshot {
            production: Some(ProductionSnapshot {
                upgrade_cost: None,
                ..production
            }),
            ..barracks
        };
        assert!(top.buttons(u64::MAX).is_empty());
    }

    #[test]
    fn barracks_steps_improve_profiles() {
        let mut profile = UnitKind::Minion.default_profile();
        BarracksLevel::default_table()[0].improve(&mut profile);
        assert_eq!(profile.max_health, 180.0);
        assert_eq!(profile.damage, 16.0);
        assert_eq!(profile.armor, 1.5);
        assert_eq!(UnitKind::Archer.default_profile().projectile_speed, Some(15.0));
        assert_eq!(BuildingKind::Barracks.trains(), Some(UnitKind::Minion));
        assert_eq!(BuildingKind::Barracks.attackable_by(), None);
    }

    #[test]
    fn skill_levels_parse_from_toml_with_defaults() {
        let level: SkillLevel = toml::from_str(
            "mana_cost = 10\ncooldown_secs = 2.5\ndamage = 40.0\nradius = 3.0\n",
        )
        .expect("skill level parses");
        assert_eq!(level.mana_cost, 10);
        assert_eq!(level.freeze_speed_factor, 1.0);
        assert_eq!(level.cooldown(), Duration::from_millis(2_500));
    }
}
