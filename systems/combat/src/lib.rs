#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that drives unit behaviour: picking targets at a bounded rate
//! and handing each target to the strategy the unit currently uses.

pub mod strategy;

use std::{collections::HashMap, time::Duration};

use throne_defence_core::{
    BuildingDirectory, Command, Event, Target, TargetHandling, TargetLookup, UnitId, UnitIndex,
    UnitSnapshot,
};
use throne_defence_system_targeting::TargetResolver;
use tracing::debug;

pub use strategy::{
    handle_target, handle_with, AttackStrategy, TargetHandleStrategy, UseSkillStrategy,
};

/// Default time between two target searches of a unit that already has a target.
pub const DEFAULT_TARGET_SEARCH_INTERVAL: Duration = Duration::from_millis(500);

/// Configuration parameters required to construct the unit AI.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    target_search_interval: Duration,
    resolver: TargetResolver,
}

impl Config {
    /// Creates a configuration using the provided search cadence and resolver.
    #[must_use]
    pub const fn new(target_search_interval: Duration, resolver: TargetResolver) -> Self {
        Self {
            target_search_interval,
            resolver,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_SEARCH_INTERVAL, TargetResolver::new())
    }
}

/// Per-unit AI driver emitting movement, attack and skill commands.
#[derive(Debug)]
pub struct UnitAi {
    resolver: TargetResolver,
    search_interval: Duration,
    last_search: HashMap<UnitId, Duration>,
}

impl Default for UnitAi {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl UnitAi {
    /// Creates a unit AI using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            resolver: config.resolver,
            search_interval: config.target_search_interval,
            last_search: HashMap::new(),
        }
    }

    /// Consumes world events and unit snapshots to emit commands.
    ///
    /// Units with a valid target search again only once per search interval;
    /// units without one search every call. A unit busy casting a queued
    /// skill keeps its target.
    pub fn handle<'a, W>(
        &mut self,
        world: &W,
        now: Duration,
        events: &[Event],
        units: impl IntoIterator<Item = &'a UnitSnapshot>,
        out: &mut Vec<Command>,
    ) where
        W: UnitIndex + TargetLookup + BuildingDirectory + ?Sized,
    {
        for event in events {
            if let Event::UnitDied { unit, .. } = event {
                let _ = self.last_search.remove(unit);
            }
        }

        for unit in units {
            if !unit.alive {
                continue;
            }
            self.drive(world, now, unit, out);
        }
    }

    fn drive<W>(&mut self, world: &W, now: Duration, unit: &UnitSnapshot, out: &mut Vec<Command>)
    where
        W: UnitIndex + TargetLookup + BuildingDirectory + ?Sized,
    {
        let has_valid_target = unit.target.is_some_and(|target| target_exists(world, &target));
        let casting = matches!(unit.handling, TargetHandling::UseSkill { .. });
        let search_due = self
            .last_search
            .get(&unit.id)
            .map_or(true, |last| now.saturating_sub(*last) >= self.search_interval);

        let mut target = unit.target;
        let mut handling = unit.handling;
        if !(casting && has_valid_target) && (!has_valid_target || search_due) {
            let _ = self.last_search.insert(unit.id, now);
            let next = self.resolver.next_target(world, unit);
            if next != unit.target {
                match next {
                    Some(next) => {
                        debug!(unit = unit.id.get(), target = ?next, "acquired target");
                        out.push(Command::AssignTarget {
                            unit: unit.id,
                            target: next,
                            manual: false,
                        });
                    }
                    None => out.push(Command::ResetTarget { unit: unit.id }),
                }
                target = next;
                handling = TargetHandling::Attack;
            }
        }

        if let Some(target) = target {
            handle_with(handling, unit, target, world.target_info(&target), out);
        }
    }
}

fn target_exists<W>(world: &W, target: &Target) -> bool
where
    W: TargetLookup + ?Sized,
{
    world
        .target_info(target)
        .is_some_and(|info| info.attackable.map_or(true, |attackable| attackable.alive))
}
