//! Screen-space pictures: staged animations and the score panel.

use std::sync::Arc;

use lattice_engine::{
    rgb, AssetError, Canvas, DrawContext, IndexedImage, PhaseContext, PhaseOutput, SaveError, Sprite,
    SpriteKind, SpriteRecord,
};
use serde::{Deserialize, Serialize};

use super::art::text_image;
use super::{decode_record, Assets, UI_DEPTH};

/// Delay that never runs out.
pub(crate) const FOREVER: i32 = -1;

/// One stage of an [`AnimPicture`]: an image (or nothing) shown for `delay`
/// ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Stage {
    image: Option<String>,
    delay: i32,
}

impl Stage {
    pub(crate) fn on(image: &str, delay: i32) -> Self {
        Self {
            image: Some(image.to_string()),
            delay: normalise_delay(delay),
        }
    }

    pub(crate) fn off(delay: i32) -> Self {
        Self {
            image: None,
            delay: normalise_delay(delay),
        }
    }
}

fn normalise_delay(delay: i32) -> i32 {
    if delay < 0 {
        FOREVER
    } else {
        delay.max(1)
    }
}

/// Picture that cycles through stages. The timer counts down once per tick;
/// reaching zero moves to the next stage (wrapping) and reloads the timer with
/// that stage's delay. A [`FOREVER`] delay holds the stage, and entering an
/// empty stage that holds forever removes the picture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AnimPicture {
    at: (i32, i32),
    stages: Vec<Stage>,
    stage: usize,
    timer: i32,
    #[serde(skip)]
    images: Vec<Option<Arc<IndexedImage>>>,
}

impl AnimPicture {
    pub(crate) fn new(
        at: (i32, i32),
        stages: Vec<Stage>,
        assets: &Assets,
    ) -> Result<Self, AssetError> {
        let timer = stages.first().map_or(FOREVER, |stage| stage.delay);
        Self {
            at,
            stages,
            stage: 0,
            timer,
            images: Vec::new(),
        }
        .resolved(assets)
    }

    pub(crate) fn still(at: (i32, i32), image: &str, assets: &Assets) -> Result<Self, AssetError> {
        Self::new(at, vec![Stage::on(image, FOREVER)], assets)
    }

    pub(crate) fn from_record(record: &SpriteRecord, assets: &Assets) -> Result<Self, SaveError> {
        let picture: Self = decode_record(record)?;
        Ok(picture.resolved(assets)?)
    }

    pub(crate) fn is_showing(&self) -> bool {
        self.stages
            .get(self.stage)
            .is_some_and(|stage| stage.image.is_some())
    }

    /// Attaches every stage's image; blank stages stay empty.
    fn resolved(mut self, assets: &Assets) -> Result<Self, AssetError> {
        self.images = self
            .stages
            .iter()
            .map(|stage| stage.image.as_deref().map(|name| assets.image(name)).transpose())
            .collect::<Result<_, _>>()?;
        Ok(self)
    }
}

impl Sprite for AnimPicture {
    fn kind(&self) -> SpriteKind {
        SpriteKind::Picture
    }

    fn advance(&mut self, _ctx: &mut PhaseContext<'_>) -> PhaseOutput {
        if self.timer == FOREVER || self.stages.is_empty() {
            return PhaseOutput::none();
        }
        self.timer -= 1;
        if self.timer > 0 {
            return PhaseOutput::none();
        }

        self.stage = (self.stage + 1) % self.stages.len();
        let entered = &self.stages[self.stage];
        self.timer = entered.delay;
        if entered.image.is_none() && entered.delay == FOREVER {
            return PhaseOutput::kill_self();
        }
        PhaseOutput::none()
    }

    fn draw(&self, canvas: &mut Canvas, _ctx: &DrawContext<'_>) {
        if !self.is_showing() {
            return;
        }
        if let Some(Some(image)) = self.images.get(self.stage) {
            canvas.draw_image(image, self.at.0, self.at.1, UI_DEPTH);
        }
    }

    fn save_record(&self) -> Option<SpriteRecord> {
        SpriteRecord::of(SpriteKind::Picture, self)
    }
}

/// Score and lives readout in the top-left corner. The story replaces the
/// panel whenever either figure changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ScorePanel {
    score: u32,
    lives: u32,
    #[serde(skip)]
    image: Option<IndexedImage>,
}

impl ScorePanel {
    const COLOUR: u8 = rgb(3, 3, 3);
    const MARGIN: i32 = 4;

    pub(crate) fn new(score: u32, lives: u32) -> Self {
        Self {
            score,
            lives,
            image: None,
        }
        .rendered()
    }

    pub(crate) fn from_record(record: &SpriteRecord) -> Result<Self, SaveError> {
        let panel: Self = decode_record(record)?;
        Ok(panel.rendered())
    }

    fn rendered(mut self) -> Self {
        let text = if self.lives == 0 {
            format!("SCORE {}", self.score)
        } else {
            format!("SCORE {} LIVES {}", self.score, self.lives)
        };
        self.image = text_image(&text, Self::COLOUR, 1).ok();
        self
    }
}

impl Sprite for ScorePanel {
    fn kind(&self) -> SpriteKind {
        SpriteKind::Panel
    }

    fn advance(&mut self, _ctx: &mut PhaseContext<'_>) -> PhaseOutput {
        PhaseOutput::none()
    }

    fn draw(&self, canvas: &mut Canvas, _ctx: &DrawContext<'_>) {
        if let Some(image) = &self.image {
            let (reference_x, _) = image.reference();
            canvas.draw_image(image, Self::MARGIN + reference_x, Self::MARGIN, UI_DEPTH);
        }
    }

    fn save_record(&self) -> Option<SpriteRecord> {
        SpriteRecord::of(SpriteKind::Panel, self)
    }
}
