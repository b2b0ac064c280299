#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Mouse-driven selection and ordering of friendly units.
//!
//! [`MouseSelector`] is a two-state machine. In *select and move* the left
//! button picks a single entity (short click) or box-selects friendly units
//! (drag), and the right button orders the selection to a point or entity.
//! Pressing a skill button of a selected hero switches to *select target for
//! skill*, where the left button commits the target and the right button or
//! Escape cancels.
//!
//! The selector never touches the world. It reads through the lookup traits
//! in [`SelectorContext`] and answers with [`Command`]s and
//! [`SelectionEvent`]s collected in a [`SelectorOutput`].

pub mod squad;

use std::time::Duration;

use throne_defence_core::{
    AreaTarget, BuildingDirectory, BuildingId, Command, Event, HealthChange, ShowableData,
    SkillKind, Target, TargetLookup, TargetingMode, Team, UnitDirectory, UnitId, UnitIndex, Vec2,
};
use tracing::debug;

pub use squad::{Squad, SQUAD_NAME};

/// Longest press that still counts as a single click.
pub const DEFAULT_SINGLE_CLICK_DELAY: Duration = Duration::from_millis(100);

/// Resolves the entity drawn under a screen point.
pub trait Raycaster {
    /// Unit or building under `cursor`, if any. Never returns points or areas.
    fn raycast(&self, cursor: Vec2) -> Option<Target>;
}

/// Converts between screen coordinates and the ground plane.
pub trait ScreenProjector {
    /// Ground point under the screen position.
    fn screen_to_ground(&self, screen: Vec2) -> Vec2;

    /// Screen position of the ground point.
    fn ground_to_screen(&self, ground: Vec2) -> Vec2;
}

/// Visual helper objects the selector asks the frontend to show.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Accessory {
    /// Short-lived marker at a point the selection was ordered to.
    PositionMarker,
    /// Circle following the cursor while an area skill is aimed.
    AreaIndicator {
        /// Radius of the affected area.
        radius: f32,
    },
    /// Ring around the caster showing how far a unit skill reaches.
    UsingRadius {
        /// Radius of the ring.
        radius: f32,
        /// Unit the ring is attached to.
        around: UnitId,
    },
}

/// Handle to an object borrowed from an [`ObjectPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PooledId(u32);

impl PooledId {
    /// Creates a handle from its raw value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Raw handle value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Creates and recycles accessory objects.
pub trait ObjectPool {
    /// Takes an accessory from the pool, creating it if needed, at `position`.
    fn acquire(&mut self, accessory: Accessory, position: Vec2) -> PooledId;

    /// Moves a borrowed accessory.
    fn place(&mut self, id: PooledId, position: Vec2);

    /// Returns a borrowed accessory to the pool.
    fn release(&mut self, id: PooledId);
}

/// World lookups the selector relies on.
pub trait SelectionWorld: UnitIndex + UnitDirectory + BuildingDirectory + TargetLookup {}

impl<T> SelectionWorld for T where
    T: UnitIndex + UnitDirectory + BuildingDirectory + TargetLookup + ?Sized
{
}

/// Collaborators and frame data handed to every selector call.
pub struct SelectorContext<'a> {
    /// Read-only world lookups.
    pub world: &'a dyn SelectionWorld,
    /// Entity picking.
    pub raycaster: &'a dyn Raycaster,
    /// Camera projection.
    pub projector: &'a dyn ScreenProjector,
    /// Accessory objects.
    pub pool: &'a mut dyn ObjectPool,
    /// Cursor position in screen coordinates.
    pub cursor: Vec2,
    /// Session time of the current frame.
    pub now: Duration,
}

impl std::fmt::Debug for SelectorContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectorContext")
            .field("cursor", &self.cursor)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

/// Entity currently selected by the player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selectable {
    /// A single unit of either team.
    Unit(UnitId),
    /// A building.
    Building(BuildingId),
    /// Several friendly units.
    Squad(Squad),
}

/// Cursor shapes the selector asks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CursorStyle {
    /// Platform cursor.
    #[default]
    Default,
    /// Aiming cursor for unit-targeted skills.
    Crosshair,
}

/// Notifications for the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionEvent {
    /// An entity became the selection.
    Selected(Selectable),
    /// The selection was emptied.
    Cleared,
    /// The selection rectangle spans the two screen points.
    DrawRectangle {
        /// Screen position where the drag started.
        start: Vec2,
        /// Current cursor position.
        end: Vec2,
    },
    /// The left button was released; any rectangle should disappear.
    SelectionEnded,
    /// The cursor shape should change.
    CursorChanged(CursorStyle),
    /// A target gained or lost its skill-target highlight.
    HighlightChanged {
        /// Highlighted entity.
        target: Target,
        /// Whether the highlight is now shown.
        highlighted: bool,
    },
    /// The player started aiming a skill; its button should flash.
    SkillTargetingStarted {
        /// Caster.
        unit: UnitId,
        /// Skill slot.
        slot: usize,
    },
    /// A skill target was chosen and queued.
    SkillTargetingCompleted {
        /// Caster.
        unit: UnitId,
        /// Skill slot.
        slot: usize,
        /// Chosen target.
        target: Target,
    },
    /// Aiming was abandoned.
    SkillTargetingCancelled {
        /// Caster.
        unit: UnitId,
        /// Skill slot.
        slot: usize,
    },
}

/// Commands and notifications produced by one selector call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectorOutput {
    /// Orders for the world.
    pub commands: Vec<Command>,
    /// Notifications for the presentation layer.
    pub events: Vec<SelectionEvent>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct DragStart {
    ground: Vec2,
    screen: Vec2,
}

#[derive(Debug, Default)]
struct SelectAndMove {
    last_click: Duration,
    drag: Option<DragStart>,
}

#[derive(Debug)]
struct SkillTargeting {
    owner: UnitId,
    team: Team,
    slot: usize,
    kind: SkillKind,
    mode: TargetingMode,
    accessories: Vec<PooledId>,
    highlighted: Option<Target>,
}

#[derive(Debug)]
enum State {
    SelectAndMove(SelectAndMove),
    SelectTargetForSkill(SkillTargeting),
}

/// Selection state machine driven by mouse and keyboard input.
#[derive(Debug)]
pub struct MouseSelector {
    state: State,
    blocked: bool,
    selection: Option<Selectable>,
    controllable: Vec<UnitId>,
    cursor: CursorStyle,
    single_click_delay: Duration,
}

impl Default for MouseSelector {
    fn default() -> Self {
        Self::new(DEFAULT_SINGLE_CLICK_DELAY)
    }
}

impl MouseSelector {
    /// Creates a selector treating presses up to `single_click_delay` as clicks.
    #[must_use]
    pub fn new(single_click_delay: Duration) -> Self {
        Self {
            state: State::SelectAndMove(SelectAndMove::default()),
            blocked: false,
            selection: None,
            controllable: Vec::new(),
            cursor: CursorStyle::Default,
            single_click_delay,
        }
    }

    /// Current selection.
    #[must_use]
    pub fn selected(&self) -> Option<&Selectable> {
        self.selection.as_ref()
    }

    /// Selected units that accept orders.
    #[must_use]
    pub fn controllable_units(&self) -> &[UnitId] {
        &self.controllable
    }

    /// Caster and slot of the skill being aimed, if any.
    #[must_use]
    pub fn skill_targeting(&self) -> Option<(UnitId, usize)> {
        match &self.state {
            State::SelectAndMove(_) => None,
            State::SelectTargetForSkill(state) => Some((state.owner, state.slot)),
        }
    }

    /// Target carrying the skill-target highlight, if any.
    #[must_use]
    pub fn highlighted(&self) -> Option<Target> {
        match &self.state {
            State::SelectAndMove(_) => None,
            State::SelectTargetForSkill(state) => state.highlighted,
        }
    }

    /// Cursor shape last requested.
    #[must_use]
    pub fn cursor_style(&self) -> CursorStyle {
        self.cursor
    }

    /// Reports whether new selections are currently refused.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Refuses or accepts new selections, for instance while the pointer is
    /// over the UI. A drag already in progress can still finish.
    pub fn set_blocked(&mut self, blocked: bool) {
        self.blocked = blocked;
    }

    /// Selection panel record for the current selection.
    #[must_use]
    pub fn showable<W>(&self, world: &W) -> Option<ShowableData>
    where
        W: UnitDirectory + BuildingDirectory + ?Sized,
    {
        match self.selection.as_ref()? {
            Selectable::Unit(unit) => world.unit(*unit).map(|unit| unit.showable()),
            Selectable::Squad(squad) => Some(squad.showable(world)),
            Selectable::Building(building) => {
                world.building(*building).map(|building| building.showable())
            }
        }
    }

    /// Health bar record for the current selection.
    #[must_use]
    pub fn health<W>(&self, world: &W) -> Option<HealthChange>
    where
        W: UnitDirectory + BuildingDirectory + ?Sized,
    {
        match self.selection.as_ref()? {
            Selectable::Unit(unit) => world.unit(*unit).map(|unit| unit.health_change()),
            Selectable::Squad(squad) => Some(squad.health_change(world)),
            Selectable::Building(building) => world
                .building(*building)
                .map(|building| HealthChange::new(building.health, building.max_health)),
        }
    }

    /// Left button pressed.
    pub fn left_down(&mut self, ctx: &mut SelectorContext<'_>, out: &mut SelectorOutput) {
        if let State::SelectAndMove(state) = &mut self.state {
            state.last_click = ctx.now;
            if !self.blocked {
                state.drag = Some(DragStart {
                    ground: ctx.projector.screen_to_ground(ctx.cursor),
                    screen: ctx.cursor,
                });
            }
        } else if !self.blocked {
            self.try_commit_skill_target(ctx, out);
        }
    }

    /// Left button kept down during a frame.
    pub fn left_held(&mut self, ctx: &mut SelectorContext<'_>, out: &mut SelectorOutput) {
        if let State::SelectAndMove(SelectAndMove {
            drag: Some(drag), ..
        }) = &self.state
        {
            out.events.push(SelectionEvent::DrawRectangle {
                start: ctx.projector.ground_to_screen(drag.ground),
                end: ctx.cursor,
            });
        }
    }

    /// Left button released.
    pub fn left_up(&mut self, ctx: &mut SelectorContext<'_>, out: &mut SelectorOutput) {
        let State::SelectAndMove(state) = &mut self.state else {
            return;
        };
        // A drag started before the selection got blocked may still finish.
        let finished = state
            .drag
            .take()
            .map(|drag| (drag, ctx.now.saturating_sub(state.last_click)));
        if let Some((drag, held)) = finished {
            if held <= self.single_click_delay {
                self.select_one(ctx, drag.screen, out);
            } else {
                self.select_many(ctx, drag.ground, out);
            }
        }
        out.events.push(SelectionEvent::SelectionEnded);
    }

    /// Right button pressed.
    pub fn right_down(&mut self, ctx: &mut SelectorContext<'_>, out: &mut SelectorOutput) {
        match self.state {
            State::SelectAndMove(_) => self.order_selection(ctx, out),
            State::SelectTargetForSkill(_) => self.cancel_skill_targeting(ctx, out),
        }
    }

    /// Escape pressed.
    pub fn escape(&mut self, ctx: &mut SelectorContext<'_>, out: &mut SelectorOutput) {
        match self.state {
            State::SelectAndMove(_) => self.clear_selected(out),
            State::SelectTargetForSkill(_) => self.cancel_skill_targeting(ctx, out),
        }
    }

    /// Per-frame work: moves the area indicator with the cursor and
    /// refreshes target highlighting while a skill is aimed.
    pub fn update(&mut self, ctx: &mut SelectorContext<'_>, out: &mut SelectorOutput) {
        let State::SelectTargetForSkill(state) = &mut self.state else {
            return;
        };
        match state.mode {
            TargetingMode::Area { .. } => {
                let ground = ctx.projector.screen_to_ground(ctx.cursor);
                for id in &state.accessories {
                    ctx.pool.place(*id, ground);
                }
            }
            TargetingMode::Unit { .. } => state.highlight_under_cursor(ctx, out),
        }
    }

    /// Action button `index` of the selected building pressed.
    ///
    /// A barracks below its top level has one button, the upgrade; the world
    /// turns the upgrade down when the purse cannot pay for it.
    pub fn press_building_button(
        &mut self,
        ctx: &SelectorContext<'_>,
        index: usize,
        out: &mut SelectorOutput,
    ) {
        let Some(Selectable::Building(building)) = self.selection else {
            return;
        };
        let upgradable = ctx
            .world
            .building(building)
            .and_then(|snapshot| snapshot.production)
            .is_some_and(|production| production.upgrade_cost.is_some());
        if index != 0 || !upgradable {
            return;
        }
        debug!(building = building.get(), "building upgrade requested");
        out.commands.push(Command::UpgradeBuilding { building });
    }

    /// Skill button `slot` of the selected hero pressed.
    ///
    /// Starts aiming when a single controllable unit is selected and the skill
    /// can be cast with its current mana. Anything else is ignored.
    pub fn press_skill_button(
        &mut self,
        ctx: &mut SelectorContext<'_>,
        slot: usize,
        out: &mut SelectorOutput,
    ) {
        let Some(Selectable::Unit(owner)) = self.selection else {
            return;
        };
        let Some(unit) = ctx.world.unit(owner).filter(|unit| unit.is_controllable()) else {
            return;
        };
        let Some(skill) = unit.skills.get(slot) else {
            return;
        };
        if !skill.can_be_used_with(unit.mana) {
            return;
        }

        if matches!(self.state, State::SelectTargetForSkill(_)) {
            self.cancel_skill_targeting(ctx, out);
        }

        let mode = skill.targeting_mode();
        let mut accessories = Vec::new();
        let cursor = match mode {
            TargetingMode::Area { radius } => {
                let ground = ctx.projector.screen_to_ground(ctx.cursor);
                accessories.push(ctx.pool.acquire(Accessory::AreaIndicator { radius }, ground));
                CursorStyle::Default
            }
            TargetingMode::Unit { usable_radius } => {
                accessories.push(ctx.pool.acquire(
                    Accessory::UsingRadius {
                        radius: usable_radius,
                        around: owner,
                    },
                    unit.position,
                ));
                CursorStyle::Crosshair
            }
        };

        debug!(unit = owner.get(), slot, skill = ?skill.kind, "aiming skill");
        self.state = State::SelectTargetForSkill(SkillTargeting {
            owner,
            team: unit.team,
            slot,
            kind: skill.kind,
            mode,
            accessories,
            highlighted: None,
        });
        self.set_cursor(cursor, out);
        out.events.push(SelectionEvent::SkillTargetingStarted { unit: owner, slot });
    }

    /// Reacts to world events: deaths shrink or clear the selection and stop
    /// aiming for a dead caster.
    pub fn observe(
        &mut self,
        ctx: &mut SelectorContext<'_>,
        events: &[Event],
        out: &mut SelectorOutput,
    ) {
        for event in events {
            let Event::UnitDied { unit, .. } = event else {
                continue;
            };

            if self.skill_targeting().is_some_and(|(owner, _)| owner == *unit) {
                self.cancel_skill_targeting(ctx, out);
            }

            if matches!(&self.selection, Some(Selectable::Unit(selected)) if selected == unit) {
                self.clear_selected(out);
                continue;
            }

            let squad_emptied = match &mut self.selection {
                Some(Selectable::Squad(squad)) if squad.contains(*unit) => {
                    let _ = squad.remove(*unit);
                    squad.is_empty()
                }
                _ => continue,
            };
            self.controllable.retain(|member| member != unit);
            if squad_emptied {
                self.clear_selected(out);
            }
        }
    }

    fn select_one(
        &mut self,
        ctx: &mut SelectorContext<'_>,
        screen: Vec2,
        out: &mut SelectorOutput,
    ) {
        self.clear_selected(out);
        let selectable = match ctx.raycaster.raycast(screen) {
            Some(Target::Unit(unit)) => Selectable::Unit(unit),
            Some(Target::Building(building)) => Selectable::Building(building),
            _ => return,
        };
        self.select(ctx, selectable, out);
    }

    fn select_many(
        &mut self,
        ctx: &mut SelectorContext<'_>,
        start: Vec2,
        out: &mut SelectorOutput,
    ) {
        self.clear_selected(out);
        let end = ctx.projector.screen_to_ground(ctx.cursor);
        let mut units = Vec::new();
        ctx.world
            .units_in_region(Team::Friends, start.min(end), start.max(end), &mut units);

        let selectable = match units.as_slice() {
            [] => return,
            [unit] => Selectable::Unit(*unit),
            _ => Selectable::Squad(Squad::new(units)),
        };
        self.select(ctx, selectable, out);
    }

    fn select(
        &mut self,
        ctx: &SelectorContext<'_>,
        selectable: Selectable,
        out: &mut SelectorOutput,
    ) {
        self.controllable = match &selectable {
            Selectable::Unit(unit) => ctx
                .world
                .unit(*unit)
                .filter(|unit| unit.is_controllable())
                .map(|unit| vec![unit.id])
                .unwrap_or_default(),
            Selectable::Squad(squad) => squad.members().to_vec(),
            Selectable::Building(_) => Vec::new(),
        };
        self.selection = Some(selectable.clone());
        out.events.push(SelectionEvent::Selected(selectable));
    }

    fn clear_selected(&mut self, out: &mut SelectorOutput) {
        self.selection = None;
        self.controllable.clear();
        out.events.push(SelectionEvent::Cleared);
    }

    fn order_selection(&mut self, ctx: &mut SelectorContext<'_>, out: &mut SelectorOutput) {
        if self.controllable.is_empty() {
            return;
        }
        let target = match ctx.raycaster.raycast(ctx.cursor) {
            Some(target) => target,
            None => {
                let point = ctx.projector.screen_to_ground(ctx.cursor);
                let _ = ctx.pool.acquire(Accessory::PositionMarker, point);
                Target::Point(point)
            }
        };
        out.commands
            .extend(self.controllable.iter().map(|unit| Command::AssignTarget {
                unit: *unit,
                target,
                manual: true,
            }));
    }

    fn try_commit_skill_target(&mut self, ctx: &mut SelectorContext<'_>, out: &mut SelectorOutput) {
        let State::SelectTargetForSkill(state) = &self.state else {
            return;
        };
        let target = match state.mode {
            TargetingMode::Area { radius } => Some(Target::Area(AreaTarget {
                center: ctx.projector.screen_to_ground(ctx.cursor),
                radius,
            })),
            TargetingMode::Unit { .. } => ctx.raycaster.raycast(ctx.cursor),
        };
        let Some(target) = target else {
            return;
        };
        if !state.accepts(ctx, &target) {
            return;
        }

        let (unit, slot) = (state.owner, state.slot);
        out.commands.push(Command::QueueSkill { unit, slot, target });
        let _ = self.leave_skill_targeting(ctx, out);
        out.events
            .push(SelectionEvent::SkillTargetingCompleted { unit, slot, target });
    }

    fn cancel_skill_targeting(&mut self, ctx: &mut SelectorContext<'_>, out: &mut SelectorOutput) {
        if let Some((unit, slot)) = self.leave_skill_targeting(ctx, out) {
            out.events
                .push(SelectionEvent::SkillTargetingCancelled { unit, slot });
        }
    }

    fn leave_skill_targeting(
        &mut self,
        ctx: &mut SelectorContext<'_>,
        out: &mut SelectorOutput,
    ) -> Option<(UnitId, usize)> {
        let idle = State::SelectAndMove(SelectAndMove::default());
        let mut state = match std::mem::replace(&mut self.state, idle) {
            State::SelectTargetForSkill(state) => state,
            other => {
                self.state = other;
                return None;
            }
        };
        state.dispose(ctx, out);
        self.set_cursor(CursorStyle::Default, out);
        Some((state.owner, state.slot))
    }

    fn set_cursor(&mut self, cursor: CursorStyle, out: &mut SelectorOutput) {
        if self.cursor != cursor {
            self.cursor = cursor;
            out.events.push(SelectionEvent::CursorChanged(cursor));
        }
    }
}

impl SkillTargeting {
    fn accepts(&self, ctx: &SelectorContext<'_>, target: &Target) -> bool {
        let info = ctx.world.target_info(target);
        self.kind.verify_target(target, info.as_ref(), self.team)
    }

    fn owner_target(&self, ctx: &SelectorContext<'_>) -> Option<Target> {
        ctx.world.unit(self.owner).and_then(|unit| unit.target)
    }

    fn highlight_under_cursor(&mut self, ctx: &SelectorContext<'_>, out: &mut SelectorOutput) {
        let under = ctx.raycaster.raycast(ctx.cursor);
        let correct = under.is_some_and(|target| self.accepts(ctx, &target));

        if self.highlighted != under || (self.highlighted.is_some() && !correct) {
            self.reset_highlight(ctx, out);
        }

        if correct && self.highlighted != under {
            if let Some(target) = under {
                out.events.push(SelectionEvent::HighlightChanged {
                    target,
                    highlighted: true,
                });
            }
            self.highlighted = under;
        }
    }

    /// The caster's current target keeps its highlight.
    fn reset_highlight(&mut self, ctx: &SelectorContext<'_>, out: &mut SelectorOutput) {
        let Some(target) = self.highlighted else {
            return;
        };
        if self.owner_target(ctx) == Some(target) {
            return;
        }
        out.events.push(SelectionEvent::HighlightChanged {
            target,
            highlighted: false,
        });
        self.highlighted = None;
    }

    fn dispose(&mut self, ctx: &mut SelectorContext<'_>, out: &mut SelectorOutput) {
        self.reset_highlight(ctx, out);
        for id in self.accessories.drain(..) {
            ctx.pool.release(id);
        }
    }
}
