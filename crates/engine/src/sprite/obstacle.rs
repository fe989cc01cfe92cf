use serde::{Deserialize, Serialize};

use super::{PhaseContext, PhaseOutput, Sprite, SpriteKind};
use crate::canvas::Cell;
use crate::persistence::{SaveError, SpriteRecord};

/// Positional queries over the lattice answered from the implementer's own
/// geometry. A platform cell is never empty.
pub trait Obstacle {
    /// Solid cell that something may stand on top of.
    fn is_platform(&self, cell: Cell) -> bool;

    /// Unoccupied by this obstacle.
    fn is_empty(&self, cell: Cell) -> bool;

    /// Outside the playable world.
    fn is_void(&self, _cell: Cell) -> bool {
        false
    }

    /// Whether this obstacle applies to sprites of `kind`. Observers check this
    /// once when the obstacle arrives.
    fn blocks(&self, _kind: SpriteKind) -> bool {
        true
    }
}

/// Invisible box of occupied cells that applies only to selected kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barrier {
    min: Cell,
    max: Cell,
    /// `None` blocks every kind.
    blocked: Option<Vec<SpriteKind>>,
}

impl Barrier {
    /// Blocks every kind within the inclusive box `min..=max`.
    pub fn solid(min: Cell, max: Cell) -> Self {
        Self {
            min,
            max,
            blocked: None,
        }
    }

    /// Blocks only the listed kinds within the inclusive box `min..=max`.
    pub fn for_kinds(min: Cell, max: Cell, kinds: &[SpriteKind]) -> Self {
        Self {
            min,
            max,
            blocked: Some(kinds.to_vec()),
        }
    }

    pub fn contains(&self, cell: Cell) -> bool {
        (self.min.x..=self.max.x).contains(&cell.x)
            && (self.min.y..=self.max.y).contains(&cell.y)
            && (self.min.z..=self.max.z).contains(&cell.z)
    }

    pub fn from_record(record: &SpriteRecord) -> Result<Self, SaveError> {
        record.decode()
    }
}

impl Obstacle for Barrier {
    fn is_platform(&self, _cell: Cell) -> bool {
        false
    }

    fn is_empty(&self, cell: Cell) -> bool {
        !self.contains(cell)
    }

    fn blocks(&self, kind: SpriteKind) -> bool {
        match &self.blocked {
            Some(kinds) => kinds.contains(&kind),
            None => true,
        }
    }
}

impl Sprite for Barrier {
    fn kind(&self) -> SpriteKind {
        SpriteKind::Barrier
    }

    fn advance(&mut self, _ctx: &mut PhaseContext<'_>) -> PhaseOutput {
        PhaseOutput::none()
    }

    fn as_obstacle(&self) -> Option<&dyn Obstacle> {
        Some(self)
    }

    fn save_record(&self) -> Option<SpriteRecord> {
        SpriteRecord::of(SpriteKind::Barrier, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_inclusive_on_every_axis() {
        let barrier = Barrier::solid(Cell::new(0, 0, 0), Cell::new(1, 2, 3));
        assert!(barrier.contains(Cell::new(0, 0, 0)));
        assert!(barrier.contains(Cell::new(1, 2, 3)));
        assert!(!barrier.contains(Cell::new(2, 0, 0)));
        assert!(!barrier.contains(Cell::new(0, 0, 4)));
    }

    #[test]
    fn block_list_selects_kinds() {
        let barrier = Barrier::for_kinds(
            Cell::new(0, 0, 0),
            Cell::new(0, 0, 0),
            &[SpriteKind::Monster],
        );
        assert!(barrier.blocks(SpriteKind::Monster));
        assert!(!barrier.blocks(SpriteKind::Particles));
        assert!(Barrier::solid(Cell::default(), Cell::default()).blocks(SpriteKind::Particles));
    }

    #[test]
    fn barrier_is_never_a_platform() {
        let barrier = Barrier::solid(Cell::new(0, 0, 0), Cell::new(0, 0, 0));
        assert!(!barrier.is_platform(Cell::new(0, 0, 0)));
        assert!(!barrier.is_empty(Cell::new(0, 0, 0)));
        assert!(!barrier.is_void(Cell::new(9, 9, 9)));
    }
}
