use lattice_engine::{
    Barrier, Particles, SaveError, Sprite, SpriteKind, SpriteRecord, Story, StoryRecord,
    WorldFactory,
};
use tracing::warn;

use super::actors::{Coin, Monster, Player};
use super::camera::Camera;
use super::pictures::{AnimPicture, ScorePanel};
use super::scenery::{SceneryRecord, Statue};
use super::stories::{FinalScore, GameOverStory, LevelProgress, LevelStory, TitleStory};
use super::Assets;

/// Rebuilds saved worlds. Shapes and images are not saved, so every record is
/// re-attached to the registry and block scale here.
pub(crate) struct GameFactory {
    assets: Assets,
    block_px: i32,
}

impl GameFactory {
    pub(crate) fn new(assets: Assets, block_px: i32) -> Self {
        Self { assets, block_px }
    }
}

fn decode_story<T: serde::de::DeserializeOwned>(record: &StoryRecord) -> Result<T, SaveError> {
    serde_path_to_error::deserialize(record.state.clone()).map_err(|error| {
        let path = error.path().to_string();
        warn!(story = %record.name, path = %path, "story_record_rejected");
        SaveError::InvalidStoryState {
            name: record.name.clone(),
            source: error.into_inner(),
        }
    })
}

impl WorldFactory for GameFactory {
    fn story(&self, record: &StoryRecord) -> Result<Box<dyn Story>, SaveError> {
        let assets = self.assets.clone();
        match record.name.as_str() {
            TitleStory::NAME => Ok(Box::new(TitleStory::new(assets))),
            LevelStory::NAME => {
                let progress: LevelProgress = decode_story(record)?;
                Ok(Box::new(LevelStory::resumed(assets, progress)))
            }
            GameOverStory::NAME => {
                let FinalScore { score } = decode_story(record)?;
                Ok(Box::new(GameOverStory::new(assets, score)))
            }
            _ => Err(SaveError::UnknownStory {
                name: record.name.clone(),
            }),
        }
    }

    fn sprite(&self, record: &SpriteRecord) -> Result<Box<dyn Sprite>, SaveError> {
        let assets = &self.assets;
        let sprite: Box<dyn Sprite> = match record.kind {
            SpriteKind::Camera => Box::new(Camera::from_record(record)?),
            SpriteKind::Player => Box::new(Player::from_record(record, assets)?),
            SpriteKind::Monster => Box::new(Monster::from_record(record, assets)?),
            SpriteKind::Pickup => Box::new(Coin::from_record(record, assets)?),
            SpriteKind::Particles => Box::new(Particles::from_record(record)?),
            SpriteKind::Barrier => Box::new(Barrier::from_record(record)?),
            SpriteKind::Statue => Box::new(Statue::from_record(record, assets)?),
            SpriteKind::Picture => Box::new(AnimPicture::from_record(record, assets)?),
            SpriteKind::Panel => Box::new(ScorePanel::from_record(record)?),
            SpriteKind::Scenery | SpriteKind::Door => match SceneryRecord::decode(record)? {
                SceneryRecord::Block(block) => Box::new(block.prepared(self.block_px)),
                SceneryRecord::Wall(wall) => Box::new(wall.prepared(self.block_px)),
                SceneryRecord::Bounds(bounds) => Box::new(bounds),
            },
            kind @ SpriteKind::Projectile => return Err(SaveError::UnknownSprite { kind }),
        };
        Ok(sprite)
    }
}
