//! Game content built on the lattice engine: scenery, actors, effects and the
//! stories that stage them.

mod actors;
mod art;
mod camera;
mod effects;
mod factory;
mod level;
mod pictures;
mod scenery;
mod stories;

use std::sync::Arc;

use lattice_engine::{
    AssetRegistry, CameraLink, Canvas, DrawContext, IndexedImage, Point3, SaveError, SpriteRecord,
    Story, WorldFactory,
};
use serde::de::DeserializeOwned;
use tracing::warn;

pub(crate) use art::{builtin_images, IMAGE_NAMES};

/// Pixel height of one block layer.
const BLOCK_HEIGHT: i32 = 8;
/// Pulls standing sprites in front of the block top they stand on while keeping
/// them behind the next block towards the viewer.
const SPRITE_DEPTH_BIAS: f32 = -0.5;
/// Screen-space pictures and panels draw over the whole scene.
const UI_DEPTH: f32 = -1.0e6;

const COIN_COLLECTED: &str = "coin_collected";
const PLAYER_DIED: &str = "player_died";
const PLAYER_FELL: &str = "player_fell";

type Assets = Arc<AssetRegistry>;

pub(crate) fn opening_story(assets: Assets) -> Box<dyn Story> {
    Box::new(stories::TitleStory::new(assets))
}

pub(crate) fn world_factory(assets: Assets, block_px: i32) -> Box<dyn WorldFactory> {
    Box::new(factory::GameFactory::new(assets, block_px))
}

/// Draws an image anchored at a lattice position, relative to the live camera.
fn draw_in_world(
    canvas: &mut Canvas,
    ctx: &DrawContext<'_>,
    camera: &CameraLink,
    image: &IndexedImage,
    position: Point3,
) {
    let at = ctx.projection.project(position, camera.offset(ctx));
    canvas.draw_image(image, at.x, at.y, at.depth + SPRITE_DEPTH_BIAS);
}

/// Decodes a saved sprite state, reporting the JSON path of the first bad field.
fn decode_record<T: DeserializeOwned>(record: &SpriteRecord) -> Result<T, SaveError> {
    serde_path_to_error::deserialize(record.state.clone()).map_err(|error| {
        let path = error.path().to_string();
        warn!(kind = record.kind.name(), path = %path, "sprite_record_rejected");
        SaveError::InvalidRecord {
            kind: record.kind,
            source: error.into_inner(),
        }
    })
}
