use super::manager::Slot;
use super::{Obstacle, Sprite, SpriteHandle, SpriteKind};
use crate::canvas::Cell;

/// Read-only view of the live sprites.
///
/// Handles resolve only while their generation matches. A sprite that is
/// currently running a phase is absent from the view.
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    slots: &'a [Slot],
    order: &'a [SpriteHandle],
}

impl<'a> WorldView<'a> {
    pub(crate) fn new(slots: &'a [Slot], order: &'a [SpriteHandle]) -> Self {
        Self { slots, order }
    }

    pub fn get(&self, handle: SpriteHandle) -> Option<&'a dyn Sprite> {
        self.slots.get(handle.index())?.sprite(handle)
    }

    pub fn contains(&self, handle: SpriteHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Live sprites in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (SpriteHandle, &'a dyn Sprite)> + 'a {
        let slots = self.slots;
        let order = self.order;
        order.iter().filter_map(move |handle| {
            slots
                .get(handle.index())
                .and_then(|slot| slot.sprite(*handle))
                .map(|sprite| (*handle, sprite))
        })
    }

    pub fn find_kind(&self, kind: SpriteKind) -> Option<SpriteHandle> {
        self.iter()
            .find(|(_, sprite)| sprite.kind() == kind)
            .map(|(handle, _)| handle)
    }

    /// Obstacles that apply to sprites of `kind`.
    pub fn obstacles_for(
        &self,
        kind: SpriteKind,
    ) -> impl Iterator<Item = (SpriteHandle, &'a dyn Obstacle)> + 'a {
        self.iter().filter_map(move |(handle, sprite)| {
            sprite
                .as_obstacle()
                .filter(|obstacle| obstacle.blocks(kind))
                .map(|obstacle| (handle, obstacle))
        })
    }

    /// Free for `kind` only if every applicable obstacle agrees.
    pub fn is_empty_for(&self, cell: Cell, kind: SpriteKind) -> bool {
        self.obstacles_for(kind)
            .all(|(_, obstacle)| obstacle.is_empty(cell))
    }

    pub fn is_platform_for(&self, cell: Cell, kind: SpriteKind) -> bool {
        self.obstacles_for(kind)
            .any(|(_, obstacle)| obstacle.is_platform(cell))
    }

    pub fn is_void_for(&self, cell: Cell, kind: SpriteKind) -> bool {
        self.obstacles_for(kind)
            .any(|(_, obstacle)| obstacle.is_void(cell))
    }

    /// Same as [`Self::is_empty_for`] but restricted to `handles`, for sprites
    /// that track their own obstacle set.
    pub fn is_empty_among(&self, cell: Cell, handles: &[SpriteHandle]) -> bool {
        handles
            .iter()
            .filter_map(|handle| self.get(*handle))
            .filter_map(|sprite| sprite.as_obstacle())
            .all(|obstacle| obstacle.is_empty(cell))
    }
}
