/// Stable reference to a sprite in the manager arena.
///
/// A handle stays valid only while its slot generation matches; once the sprite
/// departs, the handle resolves to nothing even if the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteHandle {
    index: u32,
    generation: u32,
}

impl SpriteHandle {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}
