//! Authoritative unit state.

use std::time::Duration;

use throne_defence_core::{
    SkillKind, SkillLevel, SkillSnapshot, Target, TargetHandling, Team, UnitId, UnitKind,
    UnitProfile, UnitSnapshot, Vec2,
};

/// Skill owned by a unit together with its recharge state.
#[derive(Clone, Debug)]
pub(crate) struct SkillState {
    pub(crate) kind: SkillKind,
    levels: Vec<SkillLevel>,
    level: u32,
    pub(crate) cooldown: Duration,
}

impl SkillState {
    /// Creates a level one skill. `levels` must not be empty.
    pub(crate) fn new(kind: SkillKind, levels: Vec<SkillLevel>) -> Self {
        Self {
            kind,
            levels,
            level: 1,
            cooldown: Duration::ZERO,
        }
    }

    pub(crate) fn spec(&self) -> SkillLevel {
        let index = (self.level as usize).saturating_sub(1);
        self.levels
            .get(index)
            .or_else(|| self.levels.last())
            .copied()
            .unwrap_or(SkillLevel {
                mana_cost: 0,
                cooldown_secs: 0.0,
                distance: 0.0,
                damage: 0.0,
                radius: 0.0,
                freeze_secs: 0.0,
                freeze_speed_factor: 1.0,
            })
    }

    fn can_level_up(&self) -> bool {
        (self.level as usize) < self.levels.len()
    }

    /// Raises the level when a higher table entry exists and resets recharging.
    pub(crate) fn level_up(&mut self) -> bool {
        if !self.can_level_up() {
            return false;
        }
        self.level += 1;
        self.cooldown = Duration::ZERO;
        true
    }

    pub(crate) fn can_be_used_with(&self, mana: f32) -> bool {
        self.cooldown.is_zero() && self.spec().mana_cost as f32 <= mana
    }

    pub(crate) fn start_recharging(&mut self) {
        self.cooldown = self.spec().cooldown();
    }

    /// Advances recharging. Returns `true` when the skill just became ready.
    pub(crate) fn tick(&mut self, dt: Duration) -> bool {
        if self.cooldown.is_zero() {
            return false;
        }
        self.cooldown = self.cooldown.saturating_sub(dt);
        self.cooldown.is_zero()
    }

    fn snapshot(&self) -> SkillSnapshot {
        SkillSnapshot {
            kind: self.kind,
            level: self.level,
            spec: self.spec(),
            cooldown_remaining: self.cooldown,
            can_level_up: self.can_level_up(),
        }
    }
}

/// Movement slow applied by freezing skills.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Freeze {
    remaining: Duration,
    speed_factor: f32,
}

/// Unit stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Unit {
    pub(crate) id: UnitId,
    pub(crate) kind: UnitKind,
    pub(crate) team: Team,
    pub(crate) position: Vec2,
    heading: Vec2,
    spawn_point: Vec2,
    pub(crate) profile: UnitProfile,
    pub(crate) health: f32,
    pub(crate) mana: f32,
    attack_cooldown: Duration,
    pub(crate) target: Option<Target>,
    pub(crate) target_assigned: bool,
    pub(crate) handling: TargetHandling,
    pub(crate) skills: Vec<SkillState>,
    pub(crate) level: u32,
    pub(crate) experience: u32,
    freeze: Option<Freeze>,
}

impl Unit {
    pub(crate) fn new(
        id: UnitId,
        kind: UnitKind,
        position: Vec2,
        profile: UnitProfile,
        skills: Vec<SkillState>,
    ) -> Self {
        Self {
            id,
            kind,
            team: kind.team(),
            position,
            heading: Vec2::Y,
            spawn_point: position,
            profile,
            health: profile.max_health,
            mana: profile.max_mana,
            attack_cooldown: Duration::ZERO,
            target: None,
            target_assigned: false,
            handling: TargetHandling::Attack,
            skills,
            level: 1,
            experience: 0,
            freeze: None,
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub(crate) fn attack_ready(&self) -> bool {
        self.attack_cooldown.is_zero()
    }

    pub(crate) fn start_attack_cooldown(&mut self) {
        self.attack_cooldown = self.profile.attack_interval;
    }

    pub(crate) fn speed(&self) -> f32 {
        match self.freeze {
            Some(freeze) => self.profile.speed * freeze.speed_factor,
            None => self.profile.speed,
        }
    }

    pub(crate) fn freeze(&mut self, duration: Duration, speed_factor: f32) {
        if duration.is_zero() {
            return;
        }
        self.freeze = Some(Freeze {
            remaining: duration,
            speed_factor: speed_factor.clamp(0.0, 1.0),
        });
    }

    /// Advances cooldowns, effects and mana regeneration. Returns the skill
    /// slots that finished recharging.
    pub(crate) fn tick(&mut self, dt: Duration, mana_regen: f32) -> Vec<usize> {
        self.attack_cooldown = self.attack_cooldown.saturating_sub(dt);
        if let Some(freeze) = &mut self.freeze {
            freeze.remaining = freeze.remaining.saturating_sub(dt);
            if freeze.remaining.is_zero() {
                self.freeze = None;
            }
        }
        if self.profile.max_mana > 0.0 {
            self.mana = (self.mana + mana_regen * dt.as_secs_f32()).min(self.profile.max_mana);
        }
        self.skills
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, skill)| skill.tick(dt).then_some(slot))
            .collect()
    }

    pub(crate) fn face(&mut self, point: Vec2) {
        let direction = (point - self.position).normalize_or_zero();
        if direction != Vec2::ZERO {
            self.heading = direction;
        }
    }

    /// Moves towards `point` without overshooting it.
    pub(crate) fn move_towards(&mut self, point: Vec2, dt: Duration) {
        let step = self.speed() * dt.as_secs_f32();
        let offset = point - self.position;
        let distance = offset.length();
        if distance <= step {
            self.position = point;
        } else if distance > 0.0 {
            self.position += offset / distance * step;
        }
    }

    /// Subtracts `amount` from health. Returns `true` when the hit was lethal.
    pub(crate) fn take_damage(&mut self, amount: f32) -> bool {
        self.health = (self.health - amount).max(0.0);
        let killed = self.health <= 0.0;
        if killed {
            let _ = self.reset_target();
            self.freeze = None;
        }
        killed
    }

    /// Restores up to `amount` health. Returns `true` when health changed.
    pub(crate) fn heal(&mut self, amount: f32) -> bool {
        let healed = (self.health + amount).min(self.profile.max_health);
        let changed = healed > self.health;
        self.health = healed;
        changed
    }

    pub(crate) fn reset_target(&mut self) -> bool {
        let had_target = self.target.is_some();
        self.target = None;
        self.target_assigned = false;
        self.handling = TargetHandling::Attack;
        had_target
    }

    pub(crate) fn revive(&mut self) {
        self.health = self.profile.max_health;
        self.mana = self.profile.max_mana;
        self.position = self.spawn_point;
        self.attack_cooldown = Duration::ZERO;
        let _ = self.reset_target();
    }

    /// Applies one level up: full health and mana, every upgradable skill
    /// improves.
    pub(crate) fn level_up(&mut self) {
        self.level += 1;
        self.health = self.profile.max_health;
        self.mana = self.profile.max_mana;
        for skill in &mut self.skills {
            let _ = skill.level_up();
        }
    }

    pub(crate) fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            id: self.id,
            kind: self.kind,
            team: self.team,
            position: self.position,
            heading: self.heading,
            alive: self.is_alive(),
            health: self.health,
            max_health: self.profile.max_health,
            mana: self.mana,
            max_mana: self.profile.max_mana,
            attack_range: self.profile.attack_range,
            attack_ready: self.attack_ready(),
            speed: self.speed(),
            target: self.target,
            target_assigned: self.target_assigned,
            handling: self.handling,
            level: self.level,
            experience: self.experience,
            skills: self.skills.iter().map(SkillState::snapshot).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minion() -> Unit {
        Unit::new(
            UnitId::new(1),
            UnitKind::Minion,
            Vec2::ZERO,
            UnitKind::Minion.default_profile(),
            Vec::new(),
        )
    }

    #[test]
    fn movement_never_overshoots() {
        let mut unit = minion();
        unit.move_towards(Vec2::new(1.0, 0.0), Duration::from_secs(1));
        assert_eq!(unit.position, Vec2::new(1.0, 0.0));

        unit.move_towards(Vec2::new(101.0, 0.0), Duration::from_millis(500));
        assert_eq!(unit.position, Vec2::new(3.0, 0.0));
    }

    #[test]
    fn freeze_slows_until_it_expires() {
        let mut unit = minion();
        unit.freeze(Duration::from_secs(2), 0.25);
        assert_eq!(unit.speed(), 1.0);

        let _ = unit.tick(Duration::from_secs(2), 0.0);
        assert_eq!(unit.speed(), 4.0);
    }

    #[test]
    fn lethal_damage_clears_target_and_clamps_health() {
        let mut unit = minion();
        unit.target = Some(Target::Point(Vec2::ONE));
        assert!(unit.take_damage(1_000.0));
        assert_eq!(unit.health, 0.0);
        assert!(unit.target.is_none());
    }

    #[test]
    fn heal_caps_at_maximum() {
        let mut unit = minion();
        assert!(!unit.heal(10.0), "full health cannot be healed");
        assert!(!unit.take_damage(30.0));
        assert!(unit.heal(100.0));
        assert_eq!(unit.health, 150.0);
    }

    #[test]
    fn skills_report_when_recharged() {
        let mut skill = SkillState::new(SkillKind::IceBolt, SkillKind::IceBolt.default_levels());
        skill.start_recharging();
        assert!(!skill.can_be_used_with(1_000.0));
        assert!(!skill.tick(Duration::from_secs(3)));
        assert!(skill.tick(Duration::from_secs(3)));
        assert!(skill.can_be_used_with(30.0));
        assert!(!skill.can_be_used_with(29.0));
    }

    #[test]
    fn skill_levels_stop_at_table_end() {
        let mut skill = SkillState::new(SkillKind::Meteor, SkillKind::Meteor.default_levels());
        assert!(skill.level_up());
        assert!(!skill.level_up());
        assert_eq!(skill.spec().mana_cost, 100);
    }
}
