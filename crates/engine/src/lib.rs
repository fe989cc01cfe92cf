use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod assets;
pub mod canvas;
pub mod env;
pub mod particles;
pub mod persistence;
pub mod sprite;
pub mod story;

pub use app::{
    run_app, run_app_with_metrics, AppError, GameSetup, InputAction, InputSnapshot, LoopConfig,
    LoopMetricsSnapshot, MetricsHandle, Renderer, SEED_ENV_VAR, SLOW_FRAME_ENV_VAR,
};
pub use assets::{AssetError, AssetRegistry, ImageSource, MemoryImageSource, PngImageSource};
pub use canvas::{
    depth_offset, rgb, Canvas, Cell, DoorCutout, Face, FaceColours, IndexedImage, Palette,
    Point3, Projection, ScreenPoint, Shape, TRANSPARENT,
};
pub use env::{fold, AudioSink, Environment, LoggingAudio, ScreenGeometry};
pub use particles::{ColourRamp, Emission, Particle, Particles};
pub use persistence::{
    load_world, save_world, FileSaveSlot, MemorySaveSlot, SaveError, SaveProvider, SpriteRecord,
    StoryRecord, WorldFactory, WorldSnapshot, SAVE_VERSION,
};
pub use sprite::{
    Barrier, CameraLink, DrawContext, InteractContext, Obstacle, PhaseContext, PhaseOutput,
    Sprite, SpriteHandle, SpriteKind, SpriteManager, WorldView,
};
pub use story::{Story, StoryEvent, StoryRunner, StoryStep, TickReport};

pub const ROOT_ENV_VAR: &str = "LATTICE_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub asset_dir: PathBuf,
    pub save_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("could not read {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: std::env::VarError,
    },
    #[error("could not locate the running executable: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("executable path {0} has no parent directory")]
    ExeHasNoParent(PathBuf),
    #[error("could not create save directory {path}: {source}")]
    CreateSaveDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{env_var}={path} is not a project root (needs Cargo.toml plus crates/ or assets/)")]
    InvalidEnvRoot {
        path: PathBuf,
        env_var: &'static str,
    },
    #[error(
        "no project root above {start_dir} (looked for Cargo.toml plus crates/ or assets/); \
set {env_var} to the directory holding the workspace"
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

/// Finds the project root and makes sure its save directory exists.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = match std::env::var(ROOT_ENV_VAR) {
        Ok(value) => root_from_env(Path::new(&value))?,
        Err(std::env::VarError::NotPresent) => root_above_exe()?,
        Err(source) => {
            return Err(StartupError::EnvVar {
                var: ROOT_ENV_VAR,
                source,
            })
        }
    };
    app_paths_under(root)
}

fn app_paths_under(root: PathBuf) -> Result<AppPaths, StartupError> {
    let save_dir = root.join("saves");
    fs::create_dir_all(&save_dir).map_err(|source| StartupError::CreateSaveDir {
        path: save_dir.clone(),
        source,
    })?;
    Ok(AppPaths {
        asset_dir: root.join("assets"),
        save_dir,
        root,
    })
}

fn root_from_env(path: &Path) -> Result<PathBuf, StartupError> {
    let root = canonical_or_raw(path);
    if looks_like_root(&root) {
        Ok(root)
    } else {
        Err(StartupError::InvalidEnvRoot {
            path: root,
            env_var: ROOT_ENV_VAR,
        })
    }
}

fn root_above_exe() -> Result<PathBuf, StartupError> {
    let exe = std::env::current_exe().map_err(StartupError::CurrentExe)?;
    let Some(start) = exe.parent() else {
        return Err(StartupError::ExeHasNoParent(exe));
    };
    start
        .ancestors()
        .find(|dir| looks_like_root(dir))
        .map(canonical_or_raw)
        .ok_or_else(|| StartupError::RootNotFound {
            start_dir: canonical_or_raw(start),
            env_var: ROOT_ENV_VAR,
        })
}

fn looks_like_root(dir: &Path) -> bool {
    dir.join("Cargo.toml").is_file()
        && ["crates", "assets"]
            .iter()
            .any(|child| dir.join(child).is_dir())
}

fn canonical_or_raw(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_needs_cargo_toml_and_a_source_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(!looks_like_root(dir.path()));

        fs::write(dir.path().join("Cargo.toml"), "[workspace]\n").expect("manifest");
        assert!(!looks_like_root(dir.path()));

        fs::create_dir(dir.path().join("assets")).expect("assets");
        assert!(looks_like_root(dir.path()));
    }

    #[test]
    fn app_paths_create_the_save_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = app_paths_under(dir.path().to_path_buf()).expect("paths");
        assert!(paths.save_dir.is_dir());
        assert_eq!(paths.asset_dir, dir.path().join("assets"));
    }
}
