//! Target handling strategies.

use throne_defence_core::{
    Command, SkillSnapshot, Target, TargetHandling, TargetInfo, UnitSnapshot,
    POINT_ARRIVAL_DISTANCE,
};

/// Decides when a unit is close enough to its target, whether the target is
/// still worth acting on, and what acting means.
pub trait TargetHandleStrategy {
    /// Reports whether `actor` can act on the target from where it stands.
    fn is_close_enough(&self, actor: &UnitSnapshot, target: &Target, info: &TargetInfo) -> bool;

    /// Reports whether the target is still acceptable.
    fn is_valid(&self, actor: &UnitSnapshot, target: &Target, info: &TargetInfo) -> bool;

    /// Emits the commands that act on the target.
    fn act(&self, actor: &UnitSnapshot, target: Target, out: &mut Vec<Command>);
}

/// Approach and strike attackable targets; walk to anything else.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttackStrategy;

impl TargetHandleStrategy for AttackStrategy {
    fn is_close_enough(&self, actor: &UnitSnapshot, _target: &Target, info: &TargetInfo) -> bool {
        let reach = if info.attackable.is_some() {
            actor.attack_range
        } else {
            POINT_ARRIVAL_DISTANCE
        };
        actor.position.distance(info.position) <= reach
    }

    fn is_valid(&self, actor: &UnitSnapshot, _target: &Target, info: &TargetInfo) -> bool {
        info.can_be_attacked_by(actor.team)
    }

    fn act(&self, actor: &UnitSnapshot, target: Target, out: &mut Vec<Command>) {
        if actor.attack_ready {
            out.push(Command::Attack {
                attacker: actor.id,
                target,
            });
        }
    }
}

/// Approach the target and cast the skill in `slot` on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UseSkillStrategy {
    slot: usize,
}

impl UseSkillStrategy {
    /// Creates a strategy casting the skill in `slot`.
    #[must_use]
    pub const fn new(slot: usize) -> Self {
        Self { slot }
    }

    fn skill<'a>(&self, actor: &'a UnitSnapshot) -> Option<&'a SkillSnapshot> {
        actor.skills.get(self.slot)
    }
}

impl TargetHandleStrategy for UseSkillStrategy {
    fn is_close_enough(&self, actor: &UnitSnapshot, _target: &Target, info: &TargetInfo) -> bool {
        self.skill(actor).is_some_and(|skill| {
            actor.position.distance(info.position) <= skill.using_distance()
        })
    }

    fn is_valid(&self, actor: &UnitSnapshot, target: &Target, info: &TargetInfo) -> bool {
        self.skill(actor).is_some_and(|skill| {
            skill.kind.verify_target(target, Some(info), actor.team)
                && skill.can_be_used_with(actor.mana)
        })
    }

    fn act(&self, actor: &UnitSnapshot, target: Target, out: &mut Vec<Command>) {
        // The world resets the caster's target once the cast lands.
        out.push(Command::CastSkill {
            unit: actor.id,
            slot: self.slot,
            target,
        });
    }
}

/// Shared decision procedure: face the target, then act on it when close
/// enough and still valid, drop it when close but invalid, or walk towards it.
///
/// `info` is `None` when the target no longer exists; the target is dropped.
pub fn handle_target<S>(
    strategy: &S,
    actor: &UnitSnapshot,
    target: Target,
    info: Option<TargetInfo>,
    out: &mut Vec<Command>,
) where
    S: TargetHandleStrategy + ?Sized,
{
    let Some(info) = info else {
        out.push(Command::ResetTarget { unit: actor.id });
        return;
    };

    out.push(Command::FaceTowards {
        unit: actor.id,
        point: info.position,
    });

    if strategy.is_close_enough(actor, &target, &info) {
        if strategy.is_valid(actor, &target, &info) {
            strategy.act(actor, target, out);
        } else {
            out.push(Command::ResetTarget { unit: actor.id });
        }
    } else {
        out.push(Command::MoveUnit {
            unit: actor.id,
            toward: info.position,
        });
    }
}

/// Dispatches to the strategy selected by `handling`.
pub fn handle_with(
    handling: TargetHandling,
    actor: &UnitSnapshot,
    target: Target,
    info: Option<TargetInfo>,
    out: &mut Vec<Command>,
) {
    match handling {
        TargetHandling::Attack => handle_target(&AttackStrategy, actor, target, info, out),
        TargetHandling::UseSkill { slot } => {
            handle_target(&UseSkillStrategy::new(slot), actor, target, info, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use throne_defence_core::{
        AreaTarget, Attackable, SkillKind, Team, UnitId, UnitKind, Vec2,
    };

    fn hero_at(x: f32) -> UnitSnapshot {
        UnitSnapshot {
            id: UnitId::new(1),
            kind: UnitKind::Hero,
            team: Team::Friends,
            position: Vec2::new(x, 0.0),
            heading: Vec2::Y,
            alive: true,
            health: 500.0,
            max_health: 500.0,
            mana: 100.0,
            max_mana: 200.0,
            attack_range: 2.0,
            attack_ready: true,
            speed: 6.0,
            target: None,
            target_assigned: false,
            handling: TargetHandling::Attack,
            level: 1,
            experience: 0,
            skills: [SkillKind::IceBolt, SkillKind::Meteor]
                .into_iter()
                .map(|kind| SkillSnapshot {
                    kind,
                    level: 1,
                    spec: kind.default_levels()[0],
                    cooldown_remaining: Duration::ZERO,
                    can_level_up: true,
                })
                .collect(),
        }
    }

    fn enemy_at(x: f32, alive: bool) -> TargetInfo {
        TargetInfo {
            position: Vec2::new(x, 0.0),
            attackable: Some(Attackable {
                alive,
                attackable_by: Team::Friends,
            }),
        }
    }

    const ENEMY: Target = Target::Unit(UnitId::new(9));

    fn run(
        handling: TargetHandling,
        actor: &UnitSnapshot,
        target: Target,
        info: Option<TargetInfo>,
    ) -> Vec<Command> {
        let mut out = Vec::new();
        handle_with(handling, actor, target, info, &mut out);
        out
    }

    #[test]
    fn attacks_ready_units_in_range() {
        let out = run(TargetHandling::Attack, &hero_at(0.0), ENEMY, Some(enemy_at(1.5, true)));
        assert_eq!(
            out,
            vec![
                Command::FaceTowards {
                    unit: UnitId::new(1),
                    point: Vec2::new(1.5, 0.0),
                },
                Command::Attack {
                    attacker: UnitId::new(1),
                    target: ENEMY,
                },
            ]
        );
    }

    #[test]
    fn recharging_attackers_only_face_their_target() {
        let mut actor = hero_at(0.0);
        actor.attack_ready = false;
        let out = run(TargetHandling::Attack, &actor, ENEMY, Some(enemy_at(1.0, true)));
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Command::FaceTowards { .. }));
    }

    #[test]
    fn distant_targets_are_approached() {
        let out = run(TargetHandling::Attack, &hero_at(0.0), ENEMY, Some(enemy_at(8.0, true)));
        assert_eq!(
            out.last(),
            Some(&Command::MoveUnit {
                unit: UnitId::new(1),
                toward: Vec2::new(8.0, 0.0),
            })
        );
    }

    #[test]
    fn dead_or_reached_targets_are_dropped() {
        let reset = Command::ResetTarget { unit: UnitId::new(1) };

        let out = run(TargetHandling::Attack, &hero_at(0.0), ENEMY, Some(enemy_at(1.0, false)));
        assert_eq!(out.last(), Some(&reset));

        let point = Vec2::new(0.05, 0.0);
        let out = run(
            TargetHandling::Attack,
            &hero_at(0.0),
            Target::Point(point),
            Some(TargetInfo::passive(point)),
        );
        assert_eq!(out.last(), Some(&reset), "arriving at a point ends the order");

        assert_eq!(run(TargetHandling::Attack, &hero_at(0.0), ENEMY, None), vec![reset]);
    }

    #[test]
    fn skills_are_cast_within_using_distance() {
        let handling = TargetHandling::UseSkill { slot: 0 };

        let out = run(handling, &hero_at(0.0), ENEMY, Some(enemy_at(14.0, true)));
        assert_eq!(
            out.last(),
            Some(&Command::CastSkill {
                unit: UnitId::new(1),
                slot: 0,
                target: ENEMY,
            })
        );

        let out = run(handling, &hero_at(0.0), ENEMY, Some(enemy_at(16.0, true)));
        assert!(matches!(out.last(), Some(Command::MoveUnit { .. })));
    }

    #[test]
    fn unaffordable_skills_drop_the_target() {
        let mut actor = hero_at(0.0);
        actor.mana = 10.0;
        let out = run(
            TargetHandling::UseSkill { slot: 0 },
            &actor,
            ENEMY,
            Some(enemy_at(3.0, true)),
        );
        assert_eq!(out.last(), Some(&Command::ResetTarget { unit: UnitId::new(1) }));
    }

    #[test]
    fn area_skills_reach_anywhere() {
        let area = Target::Area(AreaTarget {
            center: Vec2::new(500.0, 0.0),
            radius: 6.0,
        });
        let mut actor = hero_at(0.0);
        actor.mana = 200.0;
        let out = run(
            TargetHandling::UseSkill { slot: 1 },
            &actor,
            area,
            Some(TargetInfo::passive(Vec2::new(500.0, 0.0))),
        );
        assert_eq!(
            out.last(),
            Some(&Command::CastSkill {
                unit: UnitId::new(1),
                slot: 1,
                target: area,
            })
        );
    }
}
