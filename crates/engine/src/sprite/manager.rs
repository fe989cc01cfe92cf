use std::collections::HashSet;

use tracing::debug;

use super::{
    DrawContext, InteractContext, PhaseContext, PhaseOutput, Sprite, SpriteHandle, SpriteKind,
    WorldView,
};
use crate::canvas::{Canvas, Cell, Projection};
use crate::env::Environment;
use crate::story::StoryEvent;

pub(crate) struct Slot {
    generation: u32,
    occupant: Option<Occupant>,
}

struct Occupant {
    /// `None` only while the sprite itself is running a phase.
    sprite: Option<Box<dyn Sprite>>,
    watch_list: Vec<SpriteHandle>,
    advance_disabled: bool,
    draw_disabled: bool,
}

impl Slot {
    pub(crate) fn sprite(&self, handle: SpriteHandle) -> Option<&dyn Sprite> {
        if self.generation != handle.generation() {
            return None;
        }
        self.occupant.as_ref()?.sprite.as_deref()
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Advance,
    Aftermath,
}

#[derive(Default)]
struct TickRequests {
    spawns: Vec<Box<dyn Sprite>>,
    kills: Vec<SpriteHandle>,
    events: Vec<StoryEvent>,
}

impl TickRequests {
    fn merge(&mut self, handle: SpriteHandle, output: PhaseOutput) {
        if output.kill_self {
            self.kills.push(handle);
        }
        self.kills.extend(output.kills);
        self.spawns.extend(output.spawns);
        self.events.extend(output.events);
    }
}

/// Owns every live sprite and runs the tick protocol over them.
#[derive(Default)]
pub struct SpriteManager {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<SpriteHandle>,
}

impl SpriteManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Live handles in insertion order.
    pub fn handles(&self) -> &[SpriteHandle] {
        &self.order
    }

    pub fn contains(&self, handle: SpriteHandle) -> bool {
        self.occupant(handle).is_some()
    }

    pub fn get(&self, handle: SpriteHandle) -> Option<&dyn Sprite> {
        self.slots.get(handle.index())?.sprite(handle)
    }

    pub fn find_kind(&self, kind: SpriteKind) -> Option<SpriteHandle> {
        self.view().find_kind(kind)
    }

    pub fn view(&self) -> WorldView<'_> {
        WorldView::new(&self.slots, &self.order)
    }

    pub fn watch_list(&self, handle: SpriteHandle) -> &[SpriteHandle] {
        self.occupant(handle)
            .map(|occupant| occupant.watch_list.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty_for(&self, cell: Cell, kind: SpriteKind) -> bool {
        self.view().is_empty_for(cell, kind)
    }

    pub fn is_platform_for(&self, cell: Cell, kind: SpriteKind) -> bool {
        self.view().is_platform_for(cell, kind)
    }

    pub fn is_void_for(&self, cell: Cell, kind: SpriteKind) -> bool {
        self.view().is_void_for(cell, kind)
    }

    pub fn set_advance_disabled(&mut self, handle: SpriteHandle, disabled: bool) -> bool {
        match self.occupant_mut(handle) {
            Some(occupant) => {
                occupant.advance_disabled = disabled;
                true
            }
            None => false,
        }
    }

    pub fn set_draw_disabled(&mut self, handle: SpriteHandle, disabled: bool) -> bool {
        match self.occupant_mut(handle) {
            Some(occupant) => {
                occupant.draw_disabled = disabled;
                true
            }
            None => false,
        }
    }

    pub fn is_advance_disabled(&self, handle: SpriteHandle) -> bool {
        self.occupant(handle)
            .is_some_and(|occupant| occupant.advance_disabled)
    }

    pub fn is_draw_disabled(&self, handle: SpriteHandle) -> bool {
        self.occupant(handle)
            .is_some_and(|occupant| occupant.draw_disabled)
    }

    /// Registers `sprite` and broadcasts its arrival to every other live
    /// sprite. The newcomer is then shown each existing sprite in turn, never
    /// itself.
    pub fn add_sprite(&mut self, mut sprite: Box<dyn Sprite>) -> SpriteHandle {
        debug_assert!(
            sprite.kind() != SpriteKind::Camera || self.find_kind(SpriteKind::Camera).is_none(),
            "a second camera joined while one is live"
        );
        let handle = self.allocate();
        let mut newcomer_watch_list = Vec::new();

        for position in 0..self.order.len() {
            let existing = self.order[position];
            let Some(occupant) = self.occupant_mut(existing) else {
                continue;
            };
            let Some(existing_sprite) = occupant.sprite.as_deref_mut() else {
                continue;
            };
            let existing_watches = existing_sprite.observe_arrival(handle, sprite.as_ref());
            let newcomer_watches = sprite.observe_arrival(existing, &*existing_sprite);
            if existing_watches {
                occupant.watch_list.push(handle);
            }
            if newcomer_watches {
                newcomer_watch_list.push(existing);
            }
        }

        debug!(
            kind = sprite.kind().name(),
            index = handle.index(),
            generation = handle.generation(),
            "sprite_added"
        );
        self.slots[handle.index()].occupant = Some(Occupant {
            sprite: Some(sprite),
            watch_list: newcomer_watch_list,
            advance_disabled: false,
            draw_disabled: false,
        });
        self.order.push(handle);
        handle
    }

    pub fn add(&mut self, sprite: impl Sprite + 'static) -> SpriteHandle {
        self.add_sprite(Box::new(sprite))
    }

    /// Removes the sprite, scrubs it from every watch list, then broadcasts its
    /// departure. Stale handles are ignored.
    pub fn remove_sprite(&mut self, handle: SpriteHandle) -> Option<Box<dyn Sprite>> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        let occupant = slot.occupant.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index() as u32);
        self.order.retain(|live| *live != handle);

        for position in 0..self.order.len() {
            let remaining = self.order[position];
            let Some(other) = self.occupant_mut(remaining) else {
                continue;
            };
            other.watch_list.retain(|watched| *watched != handle);
            if let Some(sprite) = other.sprite.as_deref_mut() {
                sprite.observe_departure(handle);
            }
        }

        debug!(index = handle.index(), "sprite_removed");
        occupant.sprite
    }

    pub fn remove_all_sprites(&mut self) {
        while let Some(handle) = self.order.first().copied() {
            self.remove_sprite(handle);
        }
    }

    /// Replaces this world with copies of `other`'s sprites, one at a time so
    /// every departure and arrival is broadcast. Suppression flags carry over.
    pub fn copy_sprites(&mut self, other: &SpriteManager) {
        self.remove_all_sprites();
        for handle in other.handles() {
            let Some(sprite) = other.get(*handle) else {
                continue;
            };
            let copy = self.add_sprite(sprite.clone_sprite());
            self.set_advance_disabled(copy, other.is_advance_disabled(*handle));
            self.set_draw_disabled(copy, other.is_draw_disabled(*handle));
        }
        debug!(sprite_count = self.len(), "sprites_copied");
    }

    /// Runs one tick: advance, interact and aftermath over every sprite that is
    /// not advance-disabled, then removals, then additions. Returns the events
    /// emitted during the tick in emission order.
    pub fn update(&mut self, env: &mut Environment) -> Vec<StoryEvent> {
        let active = self
            .order
            .iter()
            .copied()
            .filter(|handle| !self.is_advance_disabled(*handle))
            .collect::<Vec<_>>();
        let mut requests = TickRequests::default();

        for handle in &active {
            self.run_phase(*handle, Phase::Advance, env, &mut requests);
        }
        for handle in &active {
            self.run_interact(*handle);
        }
        for handle in &active {
            self.run_phase(*handle, Phase::Aftermath, env, &mut requests);
        }

        self.apply_requests(requests)
    }

    /// Draws every sprite that is not draw-disabled. Order does not matter:
    /// the canvas depth test decides what is visible.
    pub fn draw(&self, canvas: &mut Canvas, projection: Projection) {
        let ctx = DrawContext {
            world: self.view(),
            projection,
        };
        for handle in &self.order {
            let Some(occupant) = self.occupant(*handle) else {
                continue;
            };
            if occupant.draw_disabled {
                continue;
            }
            if let Some(sprite) = occupant.sprite.as_deref() {
                sprite.draw(canvas, &ctx);
            }
        }
    }

    fn run_phase(
        &mut self,
        handle: SpriteHandle,
        phase: Phase,
        env: &mut Environment,
        requests: &mut TickRequests,
    ) {
        let Some(mut sprite) = self.take_sprite(handle) else {
            return;
        };
        let output = {
            let watching = self.watch_list(handle);
            let mut ctx = PhaseContext {
                me: handle,
                world: WorldView::new(&self.slots, &self.order),
                watching,
                env: &mut *env,
            };
            match phase {
                Phase::Advance => sprite.advance(&mut ctx),
                Phase::Aftermath => sprite.aftermath(&mut ctx),
            }
        };
        self.restore_sprite(handle, sprite);
        requests.merge(handle, output);
    }

    fn run_interact(&mut self, handle: SpriteHandle) {
        let Some(mut sprite) = self.take_sprite(handle) else {
            return;
        };
        {
            let ctx = InteractContext {
                me: handle,
                world: WorldView::new(&self.slots, &self.order),
                watching: self.watch_list(handle),
            };
            sprite.interact(&ctx);
        }
        self.restore_sprite(handle, sprite);
    }

    fn apply_requests(&mut self, requests: TickRequests) -> Vec<StoryEvent> {
        let TickRequests {
            spawns,
            kills,
            events,
        } = requests;

        let mut removed = HashSet::with_capacity(kills.len());
        for handle in kills {
            if removed.insert(handle) {
                self.remove_sprite(handle);
            }
        }
        for sprite in spawns {
            self.add_sprite(sprite);
        }
        events
    }

    fn allocate(&mut self) -> SpriteHandle {
        if let Some(index) = self.free.pop() {
            let generation = self.slots[index as usize].generation;
            return SpriteHandle::new(index, generation);
        }
        self.slots.push(Slot {
            generation: 0,
            occupant: None,
        });
        SpriteHandle::new((self.slots.len() - 1) as u32, 0)
    }

    fn occupant(&self, handle: SpriteHandle) -> Option<&Occupant> {
        let slot = self.slots.get(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.occupant.as_ref()
    }

    fn occupant_mut(&mut self, handle: SpriteHandle) -> Option<&mut Occupant> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.occupant.as_mut()
    }

    fn take_sprite(&mut self, handle: SpriteHandle) -> Option<Box<dyn Sprite>> {
        self.occupant_mut(handle)?.sprite.take()
    }

    fn restore_sprite(&mut self, handle: SpriteHandle, sprite: Box<dyn Sprite>) {
        if let Some(occupant) = self.occupant_mut(handle) {
            occupant.sprite = Some(sprite);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::canvas::Point3;
    use crate::env::ScreenGeometry;
    use crate::sprite::Barrier;

    type Log = Rc<RefCell<Vec<String>>>;

    #[derive(Clone)]
    struct Probe {
        name: &'static str,
        log: Log,
        kind: SpriteKind,
        watch_everything: bool,
        spawn_on_first_advance: Option<Box<Probe>>,
        kill_self_on_tick: Option<u32>,
        kill_on_advance: Option<SpriteHandle>,
        emit_on_advance: Option<&'static str>,
        ticks: u32,
    }

    impl Probe {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: Rc::clone(log),
                kind: SpriteKind::Scenery,
                watch_everything: false,
                spawn_on_first_advance: None,
                kill_self_on_tick: None,
                kill_on_advance: None,
                emit_on_advance: None,
                ticks: 0,
            }
        }

        fn record(&self, entry: String) {
            self.log.borrow_mut().push(format!("{}:{entry}", self.name));
        }
    }

    impl Sprite for Probe {
        fn kind(&self) -> SpriteKind {
            self.kind
        }

        fn advance(&mut self, ctx: &mut PhaseContext<'_>) -> PhaseOutput {
            self.ticks += 1;
            self.record("advance".to_string());
            if ctx.world.contains(ctx.me) {
                self.record("saw_self".to_string());
            }
            let mut output = PhaseOutput::none();
            if let Some(child) = self.spawn_on_first_advance.take() {
                output.spawns.push(child);
            }
            if let Some(target) = self.kill_on_advance {
                output = output.kill(target);
            }
            if let Some(name) = self.emit_on_advance {
                output = output.event(StoryEvent::signal(name, self.ticks as i32));
            }
            output
        }

        fn interact(&mut self, ctx: &InteractContext<'_>) {
            self.record("interact".to_string());
            if ctx.world.contains(ctx.me) {
                self.record("saw_self".to_string());
            }
        }

        fn aftermath(&mut self, _ctx: &mut PhaseContext<'_>) -> PhaseOutput {
            self.record("aftermath".to_string());
            if self.kill_self_on_tick == Some(self.ticks) {
                return PhaseOutput::kill_self();
            }
            PhaseOutput::none()
        }

        fn draw(&self, _canvas: &mut Canvas, _ctx: &DrawContext<'_>) {
            self.record("draw".to_string());
        }

        fn observe_arrival(&mut self, handle: SpriteHandle, _arrival: &dyn Sprite) -> bool {
            self.record(format!("arrival:{}", handle.index()));
            self.watch_everything
        }

        fn observe_departure(&mut self, handle: SpriteHandle) {
            self.record(format!("departure:{}", handle.index()));
        }

        fn position(&self) -> Option<Point3> {
            Some(Point3::ZERO)
        }
    }

    fn env() -> Environment {
        Environment::new(7, ScreenGeometry::centred(32, 32, 1))
    }

    fn entries(log: &Log, prefix: &str) -> Vec<String> {
        log.borrow()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .cloned()
            .collect()
    }

    #[test]
    fn arrival_reaches_existing_sprite_once_and_never_the_newcomer_about_itself() {
        let log = Log::default();
        let mut manager = SpriteManager::new();
        let a = manager.add(Probe::new("a", &log));
        let b = manager.add(Probe::new("b", &log));

        assert_eq!(
            entries(&log, "a:arrival"),
            vec![format!("a:arrival:{}", b.index())]
        );
        assert_eq!(
            entries(&log, "b:arrival"),
            vec![format!("b:arrival:{}", a.index())]
        );
    }

    #[test]
    fn phases_complete_across_population_in_order() {
        let log = Log::default();
        let mut manager = SpriteManager::new();
        manager.add(Probe::new("a", &log));
        manager.add(Probe::new("b", &log));
        log.borrow_mut().clear();

        manager.update(&mut env());

        assert_eq!(
            *log.borrow(),
            vec![
                "a:advance",
                "b:advance",
                "a:interact",
                "b:interact",
                "a:aftermath",
                "b:aftermath"
            ]
        );
    }

    #[test]
    fn running_sprite_is_absent_from_its_own_world_view() {
        let log = Log::default();
        let mut manager = SpriteManager::new();
        let a = manager.add(Probe::new("a", &log));
        manager.add(Probe::new("b", &log));

        manager.update(&mut env());

        assert!(entries(&log, "a:saw_self").is_empty());
        assert!(entries(&log, "b:saw_self").is_empty());
        assert!(manager.get(a).is_some());
        assert!(manager.view().contains(a));
    }

    #[test]
    fn sprites_spawned_during_a_tick_first_run_next_tick() {
        let log = Log::default();
        let mut manager = SpriteManager::new();
        let mut parent = Probe::new("parent", &log);
        parent.spawn_on_first_advance = Some(Box::new(Probe::new("child", &log)));
        manager.add(parent);

        manager.update(&mut env());
        assert_eq!(manager.len(), 2);
        assert!(entries(&log, "child:advance").is_empty());
        assert!(entries(&log, "child:interact").is_empty());
        assert!(entries(&log, "child:aftermath").is_empty());

        manager.update(&mut env());
        assert_eq!(entries(&log, "child:advance").len(), 1);
        assert_eq!(entries(&log, "child:aftermath").len(), 1);
    }

    #[test]
    fn removed_sprite_gets_no_further_calls_and_others_see_departure() {
        let log = Log::default();
        let mut manager = SpriteManager::new();
        let mut doomed = Probe::new("doomed", &log);
        doomed.kill_self_on_tick = Some(1);
        let doomed_handle = manager.add(doomed);
        manager.add(Probe::new("witness", &log));

        manager.update(&mut env());
        assert_eq!(
            entries(&log, "witness:departure"),
            vec![format!("witness:departure:{}", doomed_handle.index())]
        );
        assert!(!manager.contains(doomed_handle));

        let calls_before = entries(&log, "doomed").len();
        manager.update(&mut env());
        manager.draw(&mut Canvas::new(4, 4, 0), Projection::default());
        assert_eq!(entries(&log, "doomed").len(), calls_before);
    }

    #[test]
    fn duplicate_kill_requests_remove_once() {
        let log = Log::default();
        let mut manager = SpriteManager::new();
        let target = manager.add(Probe::new("target", &log));
        let mut first = Probe::new("first", &log);
        first.kill_on_advance = Some(target);
        let mut second = Probe::new("second", &log);
        second.kill_on_advance = Some(target);
        second.kill_self_on_tick = Some(1);
        manager.add(first);
        let second_handle = manager.add(second);

        manager.update(&mut env());

        assert_eq!(manager.len(), 1);
        assert_eq!(entries(&log, "first:departure").len(), 2);
        assert!(!manager.contains(target));
        assert!(!manager.contains(second_handle));
    }

    #[test]
    fn stale_handle_never_resolves_after_slot_reuse() {
        let log = Log::default();
        let mut manager = SpriteManager::new();
        let old = manager.add(Probe::new("old", &log));
        assert!(manager.remove_sprite(old).is_some());
        let new = manager.add(Probe::new("new", &log));

        assert_eq!(old.index(), new.index());
        assert_ne!(old.generation(), new.generation());
        assert!(manager.get(old).is_none());
        assert!(manager.get(new).is_some());
        assert!(manager.remove_sprite(old).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn departure_prunes_watch_lists() {
        let log = Log::default();
        let mut manager = SpriteManager::new();
        let mut watcher = Probe::new("watcher", &log);
        watcher.watch_everything = true;
        let watcher_handle = manager.add(watcher);
        let watched = manager.add(Probe::new("watched", &log));
        assert_eq!(manager.watch_list(watcher_handle), &[watched]);

        manager.remove_sprite(watched);
        assert!(manager.watch_list(watcher_handle).is_empty());
    }

    #[test]
    fn newcomer_can_watch_existing_sprites() {
        let log = Log::default();
        let mut manager = SpriteManager::new();
        let first = manager.add(Probe::new("first", &log));
        let mut late = Probe::new("late", &log);
        late.watch_everything = true;
        let late_handle = manager.add(late);
        assert_eq!(manager.watch_list(late_handle), &[first]);
    }

    #[test]
    fn suppression_flags_skip_phases_and_draw_independently() {
        let log = Log::default();
        let mut manager = SpriteManager::new();
        let frozen = manager.add(Probe::new("frozen", &log));
        let hidden = manager.add(Probe::new("hidden", &log));
        assert!(manager.set_advance_disabled(frozen, true));
        assert!(manager.set_draw_disabled(hidden, true));

        manager.update(&mut env());
        manager.draw(&mut Canvas::new(4, 4, 0), Projection::default());

        assert!(entries(&log, "frozen:advance").is_empty());
        assert_eq!(entries(&log, "frozen:draw").len(), 1);
        assert_eq!(entries(&log, "hidden:advance").len(), 1);
        assert!(entries(&log, "hidden:draw").is_empty());
    }

    #[test]
    fn update_returns_events_in_emission_order() {
        let log = Log::default();
        let mut manager = SpriteManager::new();
        let mut a = Probe::new("a", &log);
        a.emit_on_advance = Some("alpha");
        let mut b = Probe::new("b", &log);
        b.emit_on_advance = Some("beta");
        manager.add(a);
        manager.add(b);

        let events = manager.update(&mut env());
        assert_eq!(
            events,
            vec![StoryEvent::signal("alpha", 1), StoryEvent::signal("beta", 1)]
        );
    }

    #[test]
    fn copy_sprites_rebroadcasts_and_keeps_flags() {
        let log = Log::default();
        let mut source = SpriteManager::new();
        let a = source.add(Probe::new("a", &log));
        source.add(Probe::new("b", &log));
        source.set_draw_disabled(a, true);

        let mut target = SpriteManager::new();
        target.add(Probe::new("old", &log));
        log.borrow_mut().clear();
        target.copy_sprites(&source);

        assert_eq!(target.len(), 2);
        let first = target.handles()[0];
        assert!(target.is_draw_disabled(first));
        assert_eq!(entries(&log, "a:arrival").len(), 1);
        assert!(entries(&log, "old:advance").is_empty());

        target.remove_all_sprites();
        assert!(target.is_empty());
        assert_eq!(entries(&log, "b:departure").len(), 1);
    }

    #[test]
    fn empty_cell_requires_every_applicable_obstacle_to_agree() {
        let mut manager = SpriteManager::new();
        let cell = Cell::new(2, 2, 0);
        assert!(manager.is_empty_for(cell, SpriteKind::Monster));

        manager.add(Barrier::solid(Cell::new(5, 5, 0), Cell::new(5, 5, 0)));
        assert!(manager.is_empty_for(cell, SpriteKind::Monster));

        manager.add(Barrier::for_kinds(cell, cell, &[SpriteKind::Monster]));
        assert!(!manager.is_empty_for(cell, SpriteKind::Monster));
        assert!(manager.is_empty_for(cell, SpriteKind::Player));
        assert!(manager.is_empty_for(cell.above(1), SpriteKind::Monster));
    }
}
