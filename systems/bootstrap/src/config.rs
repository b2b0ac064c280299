//! Session settings loaded from TOML.

use std::{collections::BTreeMap, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use throne_defence_core::{
    BarracksLevel, SkillKind, SkillLevel, UnitKind, UnitProfile, Vec2, HERO_AUTO_ATTACK_DISTANCE,
};
use throne_defence_system_combat::DEFAULT_TARGET_SEARCH_INTERVAL;
use throne_defence_system_input::ScreenRect;
use throne_defence_system_selection::DEFAULT_SINGLE_CLICK_DELAY;
use throne_defence_system_spawning::{EnemySheet, SpawnArea, WaveData};
use throne_defence_world::{BarracksConfig, WorldConfig};

use crate::BootstrapError;

/// Every tunable of a session. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Simulated milliseconds per fixed tick, used by runners.
    pub tick_ms: u64,
    /// Spatial index rebuilds per simulated second.
    pub index_rebuild_rate: f32,
    /// Milliseconds between two target searches of a busy unit.
    pub target_search_interval_ms: u64,
    /// Longest press in milliseconds that still counts as a click.
    pub single_click_delay_ms: u64,
    /// Seconds between session start and the first wave.
    pub wave_start_delay_secs: f32,
    /// Distance within which an idle hero picks fights on its own.
    pub hero_auto_attack_distance: f32,
    /// Distance from the cursor's ground point within which units are picked.
    pub pick_radius: f32,
    /// Throne position.
    pub throne: Vec2,
    /// Fountain position.
    pub fountain: Vec2,
    /// Barracks position; `None` opens the session without one.
    pub barracks: Option<Vec2>,
    /// Hero spawn point; revived heroes return here.
    pub hero_spawn: Vec2,
    /// One starting minion per entry.
    pub minion_spawns: Vec<Vec2>,
    /// Health of the throne.
    pub throne_health: f32,
    /// Healing radius of the fountain.
    pub fountain_radius: f32,
    /// Health per second restored by the fountain.
    pub fountain_healing: f32,
    /// Mana per second restored to units with a mana pool.
    pub mana_regen: f32,
    /// Experience per hero level.
    pub experience_per_level: u32,
    /// Gold in the purse when the session opens.
    pub starting_gold: u64,
    /// Minions per second a level one barracks trains.
    pub barracks_creation_speed: f32,
    /// Barracks upgrade steps, cheapest first.
    pub barracks_levels: Vec<BarracksLevel>,
    /// Where trained units appear relative to the barracks.
    pub barracks_spawn_offset: Vec2,
    /// Profile overrides per unit kind.
    pub profiles: BTreeMap<UnitKind, ProfileOverride>,
    /// Hero skill book in slot order.
    pub hero_skills: Vec<SkillTable>,
    /// Enemy waves in order.
    pub waves: Vec<WaveData>,
    /// Rectangle where enemies appear.
    pub spawn_area: SpawnArea,
    /// Seed of the spawn position generator.
    pub seed: u64,
    /// Screen rectangles covered by UI; the cursor over them blocks selection.
    pub ui_panels: Vec<ScreenRect>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let world = WorldConfig::default();
        Self {
            tick_ms: 50,
            index_rebuild_rate: world.index_rebuild_rate,
            target_search_interval_ms: DEFAULT_TARGET_SEARCH_INTERVAL.as_millis() as u64,
            single_click_delay_ms: DEFAULT_SINGLE_CLICK_DELAY.as_millis() as u64,
            wave_start_delay_secs: 10.0,
            hero_auto_attack_distance: HERO_AUTO_ATTACK_DISTANCE,
            pick_radius: 1.5,
            throne: Vec2::new(0.0, -40.0),
            fountain: Vec2::new(0.0, -30.0),
            barracks: Some(Vec2::new(-15.0, -30.0)),
            hero_spawn: Vec2::new(0.0, -25.0),
            minion_spawns: vec![
                Vec2::new(-6.0, -20.0),
                Vec2::new(-2.0, -20.0),
                Vec2::new(2.0, -20.0),
                Vec2::new(6.0, -20.0),
            ],
            throne_health: world.throne_health,
            fountain_radius: world.fountain_radius,
            fountain_healing: world.fountain_healing,
            mana_regen: world.mana_regen,
            experience_per_level: world.experience_per_level,
            starting_gold: world.starting_gold,
            barracks_creation_speed: world.barracks.base_creation_speed,
            barracks_levels: world.barracks.levels,
            barracks_spawn_offset: world.barracks.spawn_offset,
            profiles: BTreeMap::new(),
            hero_skills: world
                .hero_skills
                .into_iter()
                .map(|(kind, levels)| SkillTable { kind, levels })
                .collect(),
            waves: default_waves(),
            spawn_area: SpawnArea::default(),
            seed: 0,
            ui_panels: Vec::new(),
        }
    }
}

fn default_waves() -> Vec<WaveData> {
    let wave = |start_delay_secs, raiders, archers| WaveData {
        start_delay_secs,
        enemies: vec![
            EnemySheet {
                kind: UnitKind::Raider,
                count: raiders,
            },
            EnemySheet {
                kind: UnitKind::Archer,
                count: archers,
            },
        ],
    };
    vec![wave(0.0, 4, 1), wave(30.0, 6, 3), wave(30.0, 10, 5)]
}

/// Replaces selected fields of a kind's default profile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileOverride {
    /// Maximum health.
    pub max_health: Option<f32>,
    /// Flat damage reduction.
    pub armor: Option<f32>,
    /// Damage per attack.
    pub damage: Option<f32>,
    /// Attack range.
    pub attack_range: Option<f32>,
    /// Seconds between attacks.
    pub attack_interval_secs: Option<f32>,
    /// Movement speed.
    pub speed: Option<f32>,
    /// Mana pool.
    pub max_mana: Option<f32>,
    /// Experience granted to the killing hero.
    pub experience_reward: Option<u32>,
    /// Gold paid when the unit dies.
    pub gold_reward: Option<u64>,
    /// Speed of launched projectiles; zero or less turns the unit melee.
    pub projectile_speed: Option<f32>,
}

impl ProfileOverride {
    /// Profile of `kind` with the overridden fields replaced.
    pub fn apply(&self, kind: UnitKind) -> Result<UnitProfile, BootstrapError> {
        let mut profile = kind.default_profile();
        if let Some(secs) = self.attack_interval_secs {
            profile.attack_interval = Duration::try_from_secs_f32(secs).map_err(|_| {
                BootstrapError::InvalidSetting {
                    name: "attack_interval_secs",
                    value: secs,
                }
            })?;
        }
        profile.max_health = self.max_health.unwrap_or(profile.max_health);
        profile.armor = self.armor.unwrap_or(profile.armor);
        profile.damage = self.damage.unwrap_or(profile.damage);
        profile.attack_range = self.attack_range.unwrap_or(profile.attack_range);
        profile.speed = self.speed.unwrap_or(profile.speed);
        profile.max_mana = self.max_mana.unwrap_or(profile.max_mana);
        profile.experience_reward = self.experience_reward.unwrap_or(profile.experience_reward);
        profile.gold_reward = self.gold_reward.unwrap_or(profile.gold_reward);
        if let Some(speed) = self.projectile_speed {
            profile.projectile_speed = (speed > 0.0).then_some(speed);
        }
        Ok(profile)
    }
}

/// Levels of one hero skill. An empty table uses the skill's defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkillTable {
    /// Skill kind.
    pub kind: SkillKind,
    /// Per-level parameters, first level first.
    #[serde(default)]
    pub levels: Vec<SkillLevel>,
}

impl SessionConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, BootstrapError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self, BootstrapError> {
        let text = fs::read_to_string(path).map_err(|source| BootstrapError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Fixed tick length.
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// World settings derived from this configuration.
    pub fn world_config(&self) -> Result<WorldConfig, BootstrapError> {
        let profiles = self
            .profiles
            .iter()
            .map(|(&kind, profile)| Ok((kind, profile.apply(kind)?)))
            .collect::<Result<_, BootstrapError>>()?;
        let hero_skills = self
            .hero_skills
            .iter()
            .map(|table| {
                let levels = if table.levels.is_empty() {
                    table.kind.default_levels()
                } else {
                    table.levels.clone()
                };
                (table.kind, levels)
            })
            .collect();

        Ok(WorldConfig {
            profiles,
            hero_skills,
            index_rebuild_rate: self.index_rebuild_rate,
            throne_health: self.throne_health,
            fountain_radius: self.fountain_radius,
            fountain_healing: self.fountain_healing,
            mana_regen: self.mana_regen,
            experience_per_level: self.experience_per_level,
            starting_gold: self.starting_gold,
            barracks: BarracksConfig {
                base_creation_speed: self.barracks_creation_speed,
                levels: self.barracks_levels.clone(),
                spawn_offset: self.barracks_spawn_offset,
            },
        })
    }

    /// Delay before the first wave.
    pub fn wave_start_delay(&self) -> Result<Duration, BootstrapError> {
        Duration::try_from_secs_f32(self.wave_start_delay_secs).map_err(|_| {
            BootstrapError::InvalidSetting {
                name: "wave_start_delay_secs",
                value: self.wave_start_delay_secs,
            }
        })
    }
}
