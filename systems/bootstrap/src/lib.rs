#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Composition root that wires the Throne Defence systems into a session.
//!
//! [`Session::new`] builds every service exactly once from a
//! [`SessionConfig`]: the world with its throne, fountain, barracks, hero and
//! minions, the unit AI, the wave spawner, the scheduler, the selector and its
//! input subscriptions. [`Session::tick`] then runs one frame: queued input drives
//! the selector, the world advances, systems answer the frame's events with
//! commands, and the resulting events come back in a [`TickReport`].

pub mod config;
pub mod headless;

use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use thiserror::Error;
use throne_defence_core::{
    BuildingDirectory, BuildingId, BuildingKind, Command, Event, Target, Team, UnitDirectory,
    UnitId, UnitIndex, UnitKind, Vec2, UPGRADE_HOTKEY,
};
use throne_defence_system_combat::{Config as AiConfig, UnitAi};
use throne_defence_system_input::{
    InputCondition, InputError, InputFrame, InputPhase, InputProvider, InputSignal, Key,
    MouseButton, ScreenRect, SubscriberId,
};
use throne_defence_system_scheduler::{Countdown, CountdownEvent, MainThreadQueue, Scheduler};
use throne_defence_system_selection::{
    MouseSelector, ObjectPool, Raycaster, ScreenProjector, SelectionEvent, SelectorContext,
    SelectorOutput,
};
use throne_defence_system_spawning::{Config as SpawnConfig, SpawnError, SpawnReport, WaveSpawner};
use throne_defence_system_targeting::TargetResolver;
use throne_defence_world::{self as world, query, World, WorldError};
use tracing::{debug, info};

pub use config::{ProfileOverride, SessionConfig, SkillTable};

/// Seconds of revival countdown per hero level.
pub const REVIVAL_SECONDS_PER_LEVEL: f32 = 10.0;

/// Distance within which a building is picked under the cursor.
const BUILDING_PICK_RADIUS: f32 = 3.0;

const SELECTOR_SUBSCRIBER: SubscriberId = SubscriberId::new(1);

/// Failures raised while configuring or running a session.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {}", .path.display())]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration is not valid TOML for a session.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A setting holds an unusable value.
    #[error("invalid setting {name}: {value}")]
    InvalidSetting {
        /// Name of the setting.
        name: &'static str,
        /// Rejected value.
        value: f32,
    },
    /// The wave list or spawn area cannot be used.
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    /// The world rejected its configuration or a command.
    #[error(transparent)]
    World(#[from] WorldError),
    /// The input registry failed.
    #[error(transparent)]
    Input(#[from] InputError),
}

/// Presentation collaborators lent to the session for one frame.
pub struct Frontend<'a> {
    /// Camera projection.
    pub projector: &'a dyn ScreenProjector,
    /// Accessory objects.
    pub pool: &'a mut dyn ObjectPool,
}

/// Picks the unit or building drawn closest to the cursor's ground point.
pub struct GroundRaycaster<'a, W: ?Sized> {
    world: &'a W,
    projector: &'a dyn ScreenProjector,
    pick_radius: f32,
}

impl<'a, W> GroundRaycaster<'a, W>
where
    W: UnitIndex + UnitDirectory + BuildingDirectory + ?Sized,
{
    /// Creates a raycaster picking units within `pick_radius` of the ground point.
    #[must_use]
    pub fn new(world: &'a W, projector: &'a dyn ScreenProjector, pick_radius: f32) -> Self {
        Self {
            world,
            projector,
            pick_radius,
        }
    }

    fn closest_unit(&self, ground: Vec2) -> Option<(f32, Target)> {
        Team::ALL
            .into_iter()
            .filter_map(|team| self.world.closest_unit(team, ground))
            .filter_map(|id| self.world.unit(id))
            .filter(|unit| unit.alive)
            .map(|unit| (unit.position.distance(ground), Target::Unit(unit.id)))
            .filter(|(distance, _)| *distance <= self.pick_radius)
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    fn closest_building(&self, ground: Vec2) -> Option<(f32, Target)> {
        [
            BuildingKind::Throne,
            BuildingKind::Fountain,
            BuildingKind::Barracks,
        ]
        .into_iter()
            .filter_map(|kind| self.world.building_of_kind(kind))
            .filter_map(|id| self.world.building(id))
            .map(|building| {
                (
                    building.position.distance(ground),
                    Target::Building(building.id),
                )
            })
            .filter(|(distance, _)| *distance <= BUILDING_PICK_RADIUS)
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }
}

impl<W> Raycaster for GroundRaycaster<'_, W>
where
    W: UnitIndex + UnitDirectory + BuildingDirectory + ?Sized,
{
    fn raycast(&self, cursor: Vec2) -> Option<Target> {
        let ground = self.projector.screen_to_ground(cursor);
        // Units stand in front of buildings.
        self.closest_unit(ground)
            .or_else(|| self.closest_building(ground))
            .map(|(_, target)| target)
    }
}

/// Line on the hero revival board.
#[derive(Clone, Debug, PartialEq)]
pub struct RevivalNotice {
    /// Hero waiting to come back.
    pub unit: UnitId,
    /// Board caption.
    pub description: String,
    /// Seconds shown on the board.
    pub seconds_left: f32,
}

/// Everything that happened during one [`Session::tick`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// World events in the order they were produced.
    pub events: Vec<Event>,
    /// Notifications from the selector.
    pub selection: Vec<SelectionEvent>,
    /// Progress of the wave spawner.
    pub spawns: Vec<SpawnReport>,
    /// Revival board updates.
    pub revivals: Vec<RevivalNotice>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionTask {
    StartWaves,
    Train(BuildingId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SelectorAction {
    LeftDown,
    LeftHeld,
    LeftUp,
    RightDown,
    Escape,
    Skill(usize),
    BuildingButton(usize),
}

/// A running game: the world plus every system that acts on it.
#[derive(Debug)]
pub struct Session {
    world: World,
    ai: UnitAi,
    spawner: WaveSpawner,
    scheduler: Scheduler<SessionTask>,
    revivals: BTreeMap<UnitId, Countdown>,
    selector: MouseSelector,
    input: InputProvider,
    signals: MainThreadQueue<InputSignal>,
    skill_keys: Vec<(Key, usize)>,
    pick_radius: f32,
    hero: Option<UnitId>,
    pending_events: Vec<Event>,
}

impl Session {
    /// Builds the world and every system described by `config`.
    pub fn new(config: SessionConfig) -> Result<Self, BootstrapError> {
        if !config.pick_radius.is_finite() || config.pick_radius < 0.0 {
            return Err(BootstrapError::InvalidSetting {
                name: "pick_radius",
                value: config.pick_radius,
            });
        }
        let wave_start_delay = config.wave_start_delay()?;
        let mut world = World::with_config(config.world_config()?)?;

        let mut events = Vec::new();
        let buildings = [
            (BuildingKind::Throne, Some(config.throne)),
            (BuildingKind::Fountain, Some(config.fountain)),
            (BuildingKind::Barracks, config.barracks),
        ];
        for (kind, position) in buildings {
            let Some(position) = position else {
                continue;
            };
            world::apply(&mut world, Command::PlaceBuilding { kind, position }, &mut events)?;
        }
        let starting_units = std::iter::once((UnitKind::Hero, config.hero_spawn)).chain(
            config
                .minion_spawns
                .iter()
                .map(|position| (UnitKind::Minion, *position)),
        );
        for (kind, position) in starting_units {
            world::apply(&mut world, Command::SpawnUnit { kind, position }, &mut events)?;
        }
        let hero = events.iter().find_map(|event| match event {
            Event::UnitSpawned {
                unit,
                kind: UnitKind::Hero,
                ..
            } => Some(*unit),
            _ => None,
        });

        let resolver = TargetResolver::with_auto_attack_distance(config.hero_auto_attack_distance);
        let ai = UnitAi::new(AiConfig::new(
            Duration::from_millis(config.target_search_interval_ms),
            resolver,
        ));
        let spawn_config = SpawnConfig::new(config.waves.clone(), config.spawn_area, config.seed);
        spawn_config.validate()?;
        let spawner = WaveSpawner::new(spawn_config);
        let mut scheduler = Scheduler::new();
        let _ = scheduler.schedule(wave_start_delay, SessionTask::StartWaves);
        if let Some(barracks) = world.building_of_kind(BuildingKind::Barracks) {
            if let Some(production) = world.building(barracks).and_then(|b| b.production) {
                let first = production.spawn_interval();
                let _ = scheduler.schedule(first, SessionTask::Train(barracks));
            }
        }

        let skill_keys: Vec<(Key, usize)> = config
            .hero_skills
            .iter()
            .enumerate()
            .map(|(slot, table)| (Key::char(table.kind.hotkey()), slot))
            .collect();
        let input = InputProvider::new();
        let signals = MainThreadQueue::new();
        subscribe_selector(&input, &signals, &skill_keys, &config.ui_panels)?;

        info!("{}", query::welcome_banner(&world));
        Ok(Self {
            world,
            ai,
            spawner,
            scheduler,
            revivals: BTreeMap::new(),
            selector: MouseSelector::new(Duration::from_millis(config.single_click_delay_ms)),
            input,
            signals,
            skill_keys,
            pick_radius: config.pick_radius,
            hero,
            pending_events: events,
        })
    }

    /// Read-only access to the world for queries.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Selection state.
    #[must_use]
    pub fn selector(&self) -> &MouseSelector {
        &self.selector
    }

    /// Input registry; frontends may register their own handlers on it.
    #[must_use]
    pub fn input(&self) -> &InputProvider {
        &self.input
    }

    /// Wave spawner progress.
    #[must_use]
    pub fn spawner(&self) -> &WaveSpawner {
        &self.spawner
    }

    /// The hero spawned at session start.
    #[must_use]
    pub fn hero(&self) -> Option<UnitId> {
        self.hero
    }

    /// Seconds left on the revival board of `unit`, if it is waiting.
    #[must_use]
    pub fn revival_seconds_left(&self, unit: UnitId) -> Option<f32> {
        self.revivals.get(&unit).map(Countdown::seconds_left)
    }

    /// Runs one frame of `dt` simulated time with the device state in `frame`.
    pub fn tick(
        &mut self,
        dt: Duration,
        frame: &InputFrame,
        mut frontend: Frontend<'_>,
    ) -> Result<TickReport, BootstrapError> {
        let mut report = TickReport::default();
        let mut events = std::mem::take(&mut self.pending_events);
        let mut selection = SelectorOutput::default();

        self.input.handle_input(frame)?;
        let mut signals = Vec::new();
        self.signals.drain(&mut signals);
        self.selector.set_blocked(
            signals
                .iter()
                .any(|signal| matches!(signal.condition, InputCondition::CursorIn(_))),
        );
        let actions: Vec<SelectorAction> = signals
            .iter()
            .filter_map(|signal| self.action_for(signal))
            .collect();
        for action in actions {
            self.drive_selector(&mut frontend, frame.cursor, &mut selection, |selector, ctx, out| {
                match action {
                    SelectorAction::LeftDown => selector.left_down(ctx, out),
                    SelectorAction::LeftHeld => selector.left_held(ctx, out),
                    SelectorAction::LeftUp => selector.left_up(ctx, out),
                    SelectorAction::RightDown => selector.right_down(ctx, out),
                    SelectorAction::Escape => selector.escape(ctx, out),
                    SelectorAction::Skill(slot) => selector.press_skill_button(ctx, slot, out),
                    SelectorAction::BuildingButton(index) => {
                        selector.press_building_button(ctx, index, out)
                    }
                }
            });
        }
        self.drive_selector(&mut frontend, frame.cursor, &mut selection, |selector, ctx, out| {
            selector.update(ctx, out)
        });
        for command in std::mem::take(&mut selection.commands) {
            world::apply(&mut self.world, command, &mut events)?;
        }

        world::apply(&mut self.world, Command::Tick { dt }, &mut events)?;

        let mut commands = Vec::new();
        let mut due = Vec::new();
        self.scheduler.tick(dt, &mut due);
        for task in due {
            match task {
                SessionTask::StartWaves => self.spawner.start(),
                SessionTask::Train(barracks) => self.train_from(barracks, &mut commands),
            }
        }
        self.spawner.handle(&events, &mut commands, &mut report.spawns);
        self.tick_revivals(dt, &mut commands, &mut report.revivals);

        let view = query::unit_view(&self.world);
        self.ai.handle(
            &self.world,
            query::elapsed(&self.world),
            &events,
            view.iter(),
            &mut commands,
        );
        for command in commands {
            world::apply(&mut self.world, command, &mut events)?;
        }

        self.drive_selector(&mut frontend, frame.cursor, &mut selection, |selector, ctx, out| {
            selector.observe(ctx, &events, out)
        });
        for command in std::mem::take(&mut selection.commands) {
            world::apply(&mut self.world, command, &mut events)?;
        }
        self.start_revivals(&events);

        report.events = events;
        report.selection = selection.events;
        Ok(report)
    }

    fn action_for(&self, signal: &InputSignal) -> Option<SelectorAction> {
        let left = InputCondition::MouseButton(MouseButton::Left);
        let action = match (signal.condition, signal.phase) {
            (condition, InputPhase::Down) if condition == left => SelectorAction::LeftDown,
            (condition, InputPhase::Held) if condition == left => SelectorAction::LeftHeld,
            (condition, InputPhase::Up) if condition == left => SelectorAction::LeftUp,
            (InputCondition::MouseButton(MouseButton::Right), InputPhase::Down) => {
                SelectorAction::RightDown
            }
            (InputCondition::Key(Key::Escape), InputPhase::Down) => SelectorAction::Escape,
            (InputCondition::Key(key), InputPhase::Down) if key == Key::char(UPGRADE_HOTKEY) => {
                SelectorAction::BuildingButton(0)
            }
            (InputCondition::Key(key), InputPhase::Down) => {
                let (_, slot) = self.skill_keys.iter().find(|(bound, _)| *bound == key)?;
                SelectorAction::Skill(*slot)
            }
            _ => return None,
        };
        Some(action)
    }

    fn drive_selector<F>(
        &mut self,
        frontend: &mut Frontend<'_>,
        cursor: Vec2,
        out: &mut SelectorOutput,
        drive: F,
    ) where
        F: FnOnce(&mut MouseSelector, &mut SelectorContext<'_>, &mut SelectorOutput),
    {
        let raycaster = GroundRaycaster::new(&self.world, frontend.projector, self.pick_radius);
        let mut ctx = SelectorContext {
            world: &self.world,
            raycaster: &raycaster,
            projector: frontend.projector,
            pool: &mut *frontend.pool,
            cursor,
            now: query::elapsed(&self.world),
        };
        drive(&mut self.selector, &mut ctx, out);
    }

    /// Orders one unit from `barracks` and books the next one at the current
    /// training speed. Training stops for good once the barracks is gone.
    fn train_from(&mut self, barracks: BuildingId, commands: &mut Vec<Command>) {
        let production = self
            .world
            .building(barracks)
            .filter(|building| building.health > 0.0)
            .and_then(|building| building.production);
        let Some(production) = production else {
            debug!(building = barracks.get(), "barracks gone; training stopped");
            return;
        };
        commands.push(Command::TrainUnit { building: barracks });
        let _ = self
            .scheduler
            .schedule(production.spawn_interval(), SessionTask::Train(barracks));
    }

    fn tick_revivals(
        &mut self,
        dt: Duration,
        commands: &mut Vec<Command>,
        out: &mut Vec<RevivalNotice>,
    ) {
        let mut board = Vec::new();
        let mut finished = Vec::new();
        for (unit, countdown) in &mut self.revivals {
            board.clear();
            countdown.tick(dt, &mut board);
            for event in &board {
                match event {
                    CountdownEvent::Tick { seconds_left } => out.push(RevivalNotice {
                        unit: *unit,
                        description: revival_caption(&self.world, *unit),
                        seconds_left: *seconds_left,
                    }),
                    CountdownEvent::Finished => finished.push(*unit),
                }
            }
        }
        for unit in finished {
            let _ = self.revivals.remove(&unit);
            info!(unit = unit.get(), "hero revival countdown finished");
            commands.push(Command::ReviveUnit { unit });
        }
    }

    fn start_revivals(&mut self, events: &[Event]) {
        for event in events {
            let Event::UnitDied {
                unit,
                kind: UnitKind::Hero,
                ..
            } = event
            else {
                continue;
            };
            let level = query::unit(&self.world, *unit).map_or(1, |hero| hero.level);
            let seconds = level as f32 * REVIVAL_SECONDS_PER_LEVEL;
            info!(unit = unit.get(), level, seconds, "hero fell; revival scheduled");
            let _ = self.revivals.insert(*unit, Countdown::new(seconds));
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        match self.input.unsubscribe(SELECTOR_SUBSCRIBER) {
            Ok(dropped) => debug!(dropped, "selector input subscriptions dropped"),
            Err(error) => debug!(%error, "selector input subscriptions left behind"),
        }
    }
}

fn revival_caption(world: &World, unit: UnitId) -> String {
    let name = query::unit(world, unit).map_or("Hero", |hero| hero.kind.display_name());
    format!("{name} will be reborn in")
}

fn subscribe_selector(
    input: &InputProvider,
    queue: &MainThreadQueue<InputSignal>,
    skill_keys: &[(Key, usize)],
    ui_panels: &[ScreenRect],
) -> Result<(), BootstrapError> {
    let left = InputCondition::MouseButton(MouseButton::Left);
    let mut wanted = vec![
        (left, InputPhase::Down),
        (left, InputPhase::Held),
        (left, InputPhase::Up),
        (InputCondition::MouseButton(MouseButton::Right), InputPhase::Down),
        (InputCondition::Key(Key::Escape), InputPhase::Down),
        (InputCondition::Key(Key::char(UPGRADE_HOTKEY)), InputPhase::Down),
    ];
    wanted.extend(
        skill_keys
            .iter()
            .map(|(key, _)| (InputCondition::Key(*key), InputPhase::Down)),
    );
    wanted.extend(
        ui_panels
            .iter()
            .map(|panel| (InputCondition::CursorIn(*panel), InputPhase::Held)),
    );

    for (condition, phase) in wanted {
        let sender = queue.sender();
        input
            .handler(condition)?
            .subscribe(SELECTOR_SUBSCRIBER, phase, move |signal| {
                if sender.send(signal).is_err() {
                    debug!(?signal, "input queue closed; signal dropped");
                }
            })?;
    }
    Ok(())
}
