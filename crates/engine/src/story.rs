//! The outer control loop: a story advances world logic one tick at a time
//! and may hand over to another story.

use serde_json::Value;
use tracing::{debug, info};

use crate::app::InputSnapshot;
use crate::assets::AssetError;
use crate::canvas::Canvas;
use crate::env::Environment;
use crate::persistence::{SaveError, StoryRecord, WorldFactory, WorldSnapshot, SAVE_VERSION};
use crate::sprite::SpriteManager;

/// Messages flowing upward from sprites (and the runner) to the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryEvent {
    GameBegins,
    StoryContinues,
    Signal { name: &'static str, value: i32 },
}

impl StoryEvent {
    pub const fn signal(name: &'static str, value: i32) -> Self {
        Self::Signal { name, value }
    }

    pub fn is_signal(&self, expected: &str) -> bool {
        matches!(self, Self::Signal { name, .. } if *name == expected)
    }

    pub fn signal_value(&self, expected: &str) -> Option<i32> {
        match self {
            Self::Signal { name, value } if *name == expected => Some(*value),
            _ => None,
        }
    }
}

/// Outcome of one story step: the successor story, if any. Failing to find
/// an image the story needs ends the run.
pub type StoryStep = Result<Option<Box<dyn Story>>, AssetError>;

pub trait Story {
    /// Stable identifier used in logs and save records.
    fn name(&self) -> &'static str;

    /// Reacts to last tick's events. Returning a story replaces this one from
    /// the same tick on.
    fn advance(
        &mut self,
        events: &[StoryEvent],
        sprites: &mut SpriteManager,
        env: &mut Environment,
    ) -> StoryStep;

    fn save_state(&self) -> Value {
        Value::Null
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub sprite_count: usize,
    pub event_count: usize,
    pub story_switched: bool,
}

pub struct StoryRunner {
    story: Box<dyn Story>,
    sprites: SpriteManager,
    env: Environment,
    pending: Vec<StoryEvent>,
}

impl StoryRunner {
    pub fn new(story: Box<dyn Story>, env: Environment) -> Self {
        Self {
            story,
            sprites: SpriteManager::new(),
            env,
            pending: vec![StoryEvent::GameBegins],
        }
    }

    /// Resumes a saved world; the story first sees `StoryContinues`.
    pub fn restored(story: Box<dyn Story>, sprites: SpriteManager, env: Environment) -> Self {
        Self {
            story,
            sprites,
            env,
            pending: vec![StoryEvent::StoryContinues],
        }
    }

    pub fn restore(
        snapshot: WorldSnapshot,
        factory: &dyn WorldFactory,
        mut env: Environment,
    ) -> Result<Self, SaveError> {
        let tick = snapshot.tick;
        let (story, sprites) = snapshot.rebuild(factory)?;
        env.resume_at(tick);
        info!(
            story = story.name(),
            sprite_count = sprites.len(),
            tick,
            "world_restored"
        );
        Ok(Self::restored(story, sprites, env))
    }

    pub fn story_name(&self) -> &'static str {
        self.story.name()
    }

    pub fn sprites(&self) -> &SpriteManager {
        &self.sprites
    }

    pub fn sprites_mut(&mut self) -> &mut SpriteManager {
        &mut self.sprites
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn pending_events(&self) -> &[StoryEvent] {
        &self.pending
    }

    /// Runs the story step, then the sprite phases. On the tick a story hands
    /// over, whatever the old world emitted is dropped so the successor starts
    /// with no events.
    pub fn tick(&mut self, input: InputSnapshot) -> Result<TickReport, AssetError> {
        self.env.set_input(input);
        self.env.advance_tick();

        let events = std::mem::take(&mut self.pending);
        let next = self
            .story
            .advance(&events, &mut self.sprites, &mut self.env)?;
        let story_switched = next.is_some();
        if let Some(next) = next {
            info!(
                from = self.story.name(),
                to = next.name(),
                tick = self.env.tick(),
                "story_switched"
            );
            self.story = next;
        }

        let emitted = self.sprites.update(&mut self.env);
        if story_switched {
            if !emitted.is_empty() {
                debug!(dropped = emitted.len(), "story_events_dropped");
            }
        } else {
            self.pending = emitted;
        }
        if !self.pending.is_empty() {
            debug!(
                tick = self.env.tick(),
                event_count = self.pending.len(),
                "story_events_pending"
            );
        }

        Ok(TickReport {
            tick: self.env.tick(),
            sprite_count: self.sprites.len(),
            event_count: self.pending.len(),
            story_switched,
        })
    }

    pub fn draw(&self, canvas: &mut Canvas) {
        canvas.clear();
        self.sprites.draw(canvas, self.env.projection());
    }

    /// Captures the story and every sprite that opts into saving.
    pub fn snapshot(&self) -> WorldSnapshot {
        let sprites = self
            .sprites
            .handles()
            .iter()
            .filter_map(|handle| {
                let mut record = self.sprites.get(*handle)?.save_record()?;
                record.advance_disabled = self.sprites.is_advance_disabled(*handle);
                record.draw_disabled = self.sprites.is_draw_disabled(*handle);
                Some(record)
            })
            .collect();

        WorldSnapshot {
            save_version: SAVE_VERSION,
            tick: self.env.tick(),
            story: StoryRecord {
                name: self.story.name().to_string(),
                state: self.story.save_state(),
            },
            sprites,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::env::ScreenGeometry;
    use crate::sprite::{PhaseContext, PhaseOutput, Sprite, SpriteKind};

    type Seen = Rc<RefCell<Vec<(&'static str, Vec<StoryEvent>)>>>;

    struct Recording {
        name: &'static str,
        seen: Seen,
        switch_to: Option<Box<dyn Story>>,
        switch_delay: u32,
        spawn_beacon: bool,
    }

    impl Recording {
        fn new(name: &'static str, seen: &Seen) -> Self {
            Self {
                name,
                seen: Rc::clone(seen),
                switch_to: None,
                switch_delay: 0,
                spawn_beacon: false,
            }
        }
    }

    impl Story for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn advance(
            &mut self,
            events: &[StoryEvent],
            sprites: &mut SpriteManager,
            _env: &mut Environment,
        ) -> StoryStep {
            self.seen.borrow_mut().push((self.name, events.to_vec()));
            if self.spawn_beacon {
                self.spawn_beacon = false;
                sprites.add(Beacon);
            }
            if self.switch_delay > 0 {
                self.switch_delay -= 1;
                return Ok(None);
            }
            Ok(self.switch_to.take())
        }
    }

    #[derive(Clone)]
    struct Beacon;

    impl Sprite for Beacon {
        fn kind(&self) -> SpriteKind {
            SpriteKind::Panel
        }

        fn advance(&mut self, ctx: &mut PhaseContext<'_>) -> PhaseOutput {
            PhaseOutput::none().event(StoryEvent::signal("beacon", ctx.env.tick() as i32))
        }
    }

    fn env() -> Environment {
        Environment::new(3, ScreenGeometry::centred(16, 16, 1))
    }

    #[test]
    fn first_tick_sees_game_begins() {
        let seen = Seen::default();
        let mut runner = StoryRunner::new(Box::new(Recording::new("a", &seen)), env());
        let report = runner.tick(InputSnapshot::empty()).expect("tick");

        assert_eq!(report.tick, 1);
        assert_eq!(seen.borrow()[0], ("a", vec![StoryEvent::GameBegins]));
    }

    #[test]
    fn restored_runner_starts_with_story_continues() {
        let seen = Seen::default();
        let mut runner = StoryRunner::restored(
            Box::new(Recording::new("a", &seen)),
            SpriteManager::new(),
            env(),
        );
        runner.tick(InputSnapshot::empty()).expect("tick");
        assert_eq!(seen.borrow()[0].1, vec![StoryEvent::StoryContinues]);
    }

    #[test]
    fn sprite_events_reach_the_story_on_the_next_tick() {
        let seen = Seen::default();
        let mut story = Recording::new("a", &seen);
        story.spawn_beacon = true;
        let mut runner = StoryRunner::new(Box::new(story), env());

        // Tick 1 adds the beacon during the story step, so it runs the same tick.
        let report = runner.tick(InputSnapshot::empty()).expect("tick");
        assert_eq!(report.event_count, 1);
        runner.tick(InputSnapshot::empty()).expect("tick");

        assert_eq!(seen.borrow()[1].1, vec![StoryEvent::signal("beacon", 1)]);
    }

    #[test]
    fn switching_drops_old_events_and_runs_new_story_next_tick() {
        let seen = Seen::default();
        let mut first = Recording::new("first", &seen);
        first.switch_to = Some(Box::new(Recording::new("second", &seen)));
        let mut runner = StoryRunner::new(Box::new(first), env());

        let report = runner.tick(InputSnapshot::empty()).expect("tick");
        assert!(report.story_switched);
        assert_eq!(runner.story_name(), "second");

        runner.tick(InputSnapshot::empty()).expect("tick");
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], ("second", Vec::new()));
    }

    #[test]
    fn events_from_the_old_world_do_not_reach_the_successor() {
        let seen = Seen::default();
        let mut first = Recording::new("first", &seen);
        first.spawn_beacon = true;
        first.switch_delay = 1;
        first.switch_to = Some(Box::new(Recording::new("second", &seen)));
        let mut runner = StoryRunner::new(Box::new(first), env());
        let report = runner.tick(InputSnapshot::empty()).expect("tick");
        assert_eq!(report.event_count, 1);

        // The beacon stays alive and keeps signalling through the hand-over.
        let report = runner.tick(InputSnapshot::empty()).expect("tick");
        assert!(report.story_switched);
        assert_eq!(report.event_count, 0);
        assert!(runner.pending_events().is_empty());
        assert_eq!(runner.sprites().len(), 1);

        runner.tick(InputSnapshot::empty()).expect("tick");
        let seen = seen.borrow();
        assert_eq!(seen[2], ("second", Vec::new()));
    }

    #[test]
    fn signal_helpers_match_by_name() {
        let event = StoryEvent::signal("coin_collected", 3);
        assert!(event.is_signal("coin_collected"));
        assert_eq!(event.signal_value("coin_collected"), Some(3));
        assert_eq!(event.signal_value("player_died"), None);
        assert!(!StoryEvent::GameBegins.is_signal("coin_collected"));
    }

    #[test]
    fn input_is_visible_to_the_tick() {
        let seen = Seen::default();
        let mut runner = StoryRunner::new(Box::new(Recording::new("a", &seen)), env());
        runner
            .tick(InputSnapshot::empty().with_action_down(crate::app::InputAction::Fire, true))
            .expect("tick");
        assert!(runner.env().input().is_down(crate::app::InputAction::Fire));
    }
}
