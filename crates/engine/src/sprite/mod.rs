//! Sprites and the three-phase tick protocol.
//!
//! Every tick the [`SpriteManager`] runs `advance` on every live sprite, then
//! `interact` on every live sprite, then `aftermath` on every live sprite.
//! Structural changes requested along the way (spawns, kills) are applied only
//! after the third phase, so each phase sees a stable population.

mod handle;
mod kind;
mod manager;
mod obstacle;
mod world;

pub use handle::SpriteHandle;
pub use kind::SpriteKind;
pub use manager::SpriteManager;
pub use obstacle::{Barrier, Obstacle};
pub use world::WorldView;

use crate::canvas::{Canvas, Point3, Projection};
use crate::env::Environment;
use crate::persistence::SpriteRecord;
use crate::story::StoryEvent;

/// Structural requests returned from `advance` and `aftermath`.
#[derive(Default)]
pub struct PhaseOutput {
    pub spawns: Vec<Box<dyn Sprite>>,
    pub kill_self: bool,
    pub kills: Vec<SpriteHandle>,
    pub events: Vec<StoryEvent>,
}

impl PhaseOutput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn kill_self() -> Self {
        Self {
            kill_self: true,
            ..Self::default()
        }
    }

    pub fn spawn(mut self, sprite: impl Sprite + 'static) -> Self {
        self.spawns.push(Box::new(sprite));
        self
    }

    pub fn kill(mut self, handle: SpriteHandle) -> Self {
        self.kills.push(handle);
        self
    }

    pub fn event(mut self, event: StoryEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.spawns.is_empty() && !self.kill_self && self.kills.is_empty() && self.events.is_empty()
    }
}

impl std::fmt::Debug for PhaseOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseOutput")
            .field("spawns", &self.spawns.len())
            .field("kill_self", &self.kill_self)
            .field("kills", &self.kills)
            .field("events", &self.events)
            .finish()
    }
}

/// What `advance` and `aftermath` can see. The sprite being run is absent from
/// `world` for the duration of the call.
pub struct PhaseContext<'a> {
    pub me: SpriteHandle,
    pub world: WorldView<'a>,
    pub watching: &'a [SpriteHandle],
    pub env: &'a mut Environment,
}

/// What `interact` can see: a read-only world and nothing to write into.
pub struct InteractContext<'a> {
    pub me: SpriteHandle,
    pub world: WorldView<'a>,
    pub watching: &'a [SpriteHandle],
}

pub struct DrawContext<'a> {
    pub world: WorldView<'a>,
    pub projection: Projection,
}

impl DrawContext<'_> {
    /// Offset of the camera behind `handle`, or the origin when it has gone.
    pub fn camera_offset(&self, handle: Option<SpriteHandle>) -> Point3 {
        handle
            .and_then(|handle| self.world.get(handle))
            .and_then(|camera| camera.camera_offset())
            .unwrap_or(Point3::ZERO)
    }
}

/// A participant in the tick protocol.
///
/// Only `kind` and `advance` are required. `interact` cannot spawn, kill or
/// emit: it records what it learns in the sprite's own fields for
/// `aftermath` to act on.
pub trait Sprite: SpriteClone {
    fn kind(&self) -> SpriteKind;

    fn advance(&mut self, ctx: &mut PhaseContext<'_>) -> PhaseOutput;

    fn interact(&mut self, _ctx: &InteractContext<'_>) {}

    fn aftermath(&mut self, _ctx: &mut PhaseContext<'_>) -> PhaseOutput {
        PhaseOutput::none()
    }

    fn draw(&self, _canvas: &mut Canvas, _ctx: &DrawContext<'_>) {}

    /// Called when `handle` joins the world. Returning `true` appends it to
    /// this sprite's watch list.
    fn observe_arrival(&mut self, _handle: SpriteHandle, _arrival: &dyn Sprite) -> bool {
        false
    }

    /// Called after `handle` left the world. The watch list is already pruned.
    fn observe_departure(&mut self, _handle: SpriteHandle) {}

    fn as_obstacle(&self) -> Option<&dyn Obstacle> {
        None
    }

    fn position(&self) -> Option<Point3> {
        None
    }

    /// World-to-screen offset; only the camera answers.
    fn camera_offset(&self) -> Option<Point3> {
        None
    }

    fn save_record(&self) -> Option<SpriteRecord> {
        None
    }
}

pub trait SpriteClone {
    fn clone_sprite(&self) -> Box<dyn Sprite>;
}

impl<T> SpriteClone for T
where
    T: Sprite + Clone + 'static,
{
    fn clone_sprite(&self) -> Box<dyn Sprite> {
        Box::new(self.clone())
    }
}

/// Remembers the live camera for a spatial sprite.
///
/// Feed it every arrival and departure; it follows whichever camera is
/// currently live and forgets one that leaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraLink {
    handle: Option<SpriteHandle>,
}

impl CameraLink {
    pub fn handle(&self) -> Option<SpriteHandle> {
        self.handle
    }

    pub fn observe_arrival(&mut self, handle: SpriteHandle, arrival: &dyn Sprite) {
        if arrival.kind() == SpriteKind::Camera {
            self.handle = Some(handle);
        }
    }

    pub fn observe_departure(&mut self, handle: SpriteHandle) {
        if self.handle == Some(handle) {
            self.handle = None;
        }
    }

    pub fn offset(&self, ctx: &DrawContext<'_>) -> Point3 {
        ctx.camera_offset(self.handle)
    }
}
