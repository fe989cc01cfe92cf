use std::path::Path;
use std::sync::Arc;

use lattice_engine::assets::MANIFEST_FILE;
use lattice_engine::{
    resolve_app_paths, AppError, AssetError, AssetRegistry, FileSaveSlot, GameSetup, LoopConfig,
    Palette, PngImageSource,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use super::gameplay;

const SAVE_SLOT: &str = "slot1";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) setup: GameSetup,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    info!("=== Lattice Startup ===");

    let paths = resolve_app_paths()?;
    let config = LoopConfig {
        window_title: "Lattice".to_string(),
        ..LoopConfig::default()
    };
    let assets = Arc::new(load_assets(&paths.asset_dir, &config.palette)?);
    let save_slot = FileSaveSlot::new(&paths.save_dir, SAVE_SLOT);
    info!(save_path = %save_slot.path().display(), "save_slot_ready");

    let setup = GameSetup {
        story: gameplay::opening_story(Arc::clone(&assets)),
        factory: gameplay::world_factory(assets, config.block_px),
        save_slot: Box::new(save_slot),
    };
    Ok(AppWiring { config, setup })
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// PNG art when the asset directory carries a manifest, built-in art otherwise.
fn load_assets(asset_dir: &Path, palette: &Palette) -> Result<AssetRegistry, AssetError> {
    if asset_dir.join(MANIFEST_FILE).is_file() {
        let source = PngImageSource::open(asset_dir, palette.clone())?;
        return AssetRegistry::load(&source, gameplay::IMAGE_NAMES);
    }

    debug!(asset_dir = %asset_dir.display(), "image_manifest_absent_using_builtin_art");
    let source = gameplay::builtin_images()?;
    AssetRegistry::load(&source, gameplay::IMAGE_NAMES)
}
