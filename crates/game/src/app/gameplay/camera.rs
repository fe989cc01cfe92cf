use lattice_engine::{
    PhaseContext, PhaseOutput, Point3, SaveError, Sprite, SpriteHandle, SpriteKind, SpriteRecord,
};
use serde::{Deserialize, Serialize};

use super::decode_record;

/// Fraction of the remaining distance closed each tick.
const FOLLOW_RATE: f32 = 0.2;

/// Keeps the player near the middle of the screen by easing the projection
/// offset towards the player's ground position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Camera {
    offset: Point3,
    #[serde(skip)]
    target: Option<SpriteHandle>,
}

impl Camera {
    pub(crate) fn looking_at(offset: Point3) -> Self {
        Self {
            offset,
            target: None,
        }
    }

    pub(crate) fn from_record(record: &SpriteRecord) -> Result<Self, SaveError> {
        decode_record(record)
    }
}

impl Sprite for Camera {
    fn kind(&self) -> SpriteKind {
        SpriteKind::Camera
    }

    fn advance(&mut self, ctx: &mut PhaseContext<'_>) -> PhaseOutput {
        let Some(goal) = self
            .target
            .and_then(|target| ctx.world.get(target))
            .and_then(|target| target.position())
        else {
            return PhaseOutput::none();
        };
        self.offset.x += (goal.x - self.offset.x) * FOLLOW_RATE;
        self.offset.y += (goal.y - self.offset.y) * FOLLOW_RATE;
        PhaseOutput::none()
    }

    fn observe_arrival(&mut self, handle: SpriteHandle, arrival: &dyn Sprite) -> bool {
        if arrival.kind() == SpriteKind::Player {
            self.target = Some(handle);
        }
        false
    }

    fn observe_departure(&mut self, handle: SpriteHandle) {
        if self.target == Some(handle) {
            self.target = None;
        }
    }

    fn camera_offset(&self) -> Option<Point3> {
        Some(self.offset)
    }

    fn save_record(&self) -> Option<SpriteRecord> {
        SpriteRecord::of(SpriteKind::Camera, self)
    }
}
