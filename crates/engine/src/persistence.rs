//! Versioned world snapshots handed to an external byte store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::assets::AssetError;
use crate::env::Environment;
use crate::sprite::{Sprite, SpriteKind, SpriteManager};
use crate::story::{Story, StoryRunner};

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to write save file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode world snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode world snapshot: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("save version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("no story named `{name}` can be restored")]
    UnknownStory { name: String },
    #[error("sprites of kind {kind:?} cannot be restored")]
    UnknownSprite { kind: SpriteKind },
    #[error("invalid {kind:?} record: {source}")]
    InvalidRecord {
        kind: SpriteKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid state for story `{name}`: {source}")]
    InvalidStoryState {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("saved world needs an image that is not loaded: {0}")]
    Asset(#[from] AssetError),
}

/// Saved form of one sprite: its kind tag, its own serialized state and the
/// manager-held suppression flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteRecord {
    pub kind: SpriteKind,
    pub state: Value,
    #[serde(default)]
    pub advance_disabled: bool,
    #[serde(default)]
    pub draw_disabled: bool,
}

impl SpriteRecord {
    /// Serializes `state` under `kind`. A sprite whose state cannot be
    /// serialized is skipped with a warning.
    pub fn of(kind: SpriteKind, state: &impl Serialize) -> Option<Self> {
        match serde_json::to_value(state) {
            Ok(state) => Some(Self {
                kind,
                state,
                advance_disabled: false,
                draw_disabled: false,
            }),
            Err(error) => {
                warn!(kind = kind.name(), error = %error, "sprite_record_skipped");
                None
            }
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, SaveError> {
        serde_json::from_value(self.state.clone()).map_err(|source| SaveError::InvalidRecord {
            kind: self.kind,
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub name: String,
    pub state: Value,
}

impl StoryRecord {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, SaveError> {
        serde_json::from_value(self.state.clone()).map_err(|source| {
            SaveError::InvalidStoryState {
                name: self.name.clone(),
                source,
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub save_version: u32,
    #[serde(default)]
    pub tick: u64,
    pub story: StoryRecord,
    pub sprites: Vec<SpriteRecord>,
}

impl WorldSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, SaveError> {
        serde_json::to_vec_pretty(self).map_err(SaveError::Encode)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SaveError> {
        let snapshot: Self = serde_json::from_slice(bytes).map_err(SaveError::Decode)?;
        if snapshot.save_version != SAVE_VERSION {
            return Err(SaveError::VersionMismatch {
                found: snapshot.save_version,
                expected: SAVE_VERSION,
            });
        }
        Ok(snapshot)
    }

    /// Rebuilds the story and a fresh manager. Sprites are added one at a time
    /// in saved order, so every arrival broadcast fires again.
    pub(crate) fn rebuild(
        self,
        factory: &dyn WorldFactory,
    ) -> Result<(Box<dyn Story>, SpriteManager), SaveError> {
        let story = factory.story(&self.story)?;
        let mut sprites = SpriteManager::new();
        for record in &self.sprites {
            let handle = sprites.add_sprite(factory.sprite(record)?);
            sprites.set_advance_disabled(handle, record.advance_disabled);
            sprites.set_draw_disabled(handle, record.draw_disabled);
        }
        Ok((story, sprites))
    }
}

/// Game-supplied constructors for saved records.
pub trait WorldFactory {
    fn story(&self, record: &StoryRecord) -> Result<Box<dyn Story>, SaveError>;
    fn sprite(&self, record: &SpriteRecord) -> Result<Box<dyn Sprite>, SaveError>;
}

/// Opaque byte store for one save slot.
pub trait SaveProvider {
    fn save(&mut self, bytes: &[u8]) -> Result<(), SaveError>;
    fn load(&self) -> Option<Vec<u8>>;
}

#[derive(Debug, Clone, Default)]
pub struct MemorySaveSlot {
    bytes: Option<Vec<u8>>,
}

impl MemorySaveSlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveProvider for MemorySaveSlot {
    fn save(&mut self, bytes: &[u8]) -> Result<(), SaveError> {
        self.bytes = Some(bytes.to_vec());
        Ok(())
    }

    fn load(&self) -> Option<Vec<u8>> {
        self.bytes.clone()
    }
}

/// One JSON file under the save directory, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct FileSaveSlot {
    path: PathBuf,
}

impl FileSaveSlot {
    pub fn new(save_dir: &Path, slot: &str) -> Self {
        Self {
            path: save_dir.join(format!("{slot}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SaveProvider for FileSaveSlot {
    fn save(&mut self, bytes: &[u8]) -> Result<(), SaveError> {
        write_bytes_atomic(&self.path, bytes).map_err(|source| SaveError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn load(&self) -> Option<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Some(bytes),
            Err(error) if error.kind() == io::ErrorKind::NotFound => None,
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "save_read_failed");
                None
            }
        }
    }
}

pub fn save_world(runner: &StoryRunner, provider: &mut dyn SaveProvider) -> Result<(), SaveError> {
    let snapshot = runner.snapshot();
    let bytes = snapshot.to_bytes()?;
    provider.save(&bytes)?;
    info!(
        story = %snapshot.story.name,
        sprite_count = snapshot.sprites.len(),
        bytes = bytes.len(),
        "world_saved"
    );
    Ok(())
}

/// `Ok(None)` when the provider holds no save.
pub fn load_world(
    provider: &dyn SaveProvider,
    factory: &dyn WorldFactory,
    env: Environment,
) -> Result<Option<StoryRunner>, SaveError> {
    let Some(bytes) = provider.load() else {
        return Ok(None);
    };
    let snapshot = WorldSnapshot::from_bytes(&bytes)?;
    StoryRunner::restore(snapshot, factory, env).map(Some)
}

fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, bytes)?;
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("save.json");
    let tmp_name = format!("{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::InputSnapshot;
    use crate::canvas::Cell;
    use crate::env::ScreenGeometry;
    use crate::sprite::Barrier;
    use crate::story::{StoryEvent, StoryStep};

    #[derive(Default)]
    struct Idle {
        level: u32,
    }

    impl Story for Idle {
        fn name(&self) -> &'static str {
            "idle"
        }

        fn advance(
            &mut self,
            _events: &[StoryEvent],
            _sprites: &mut SpriteManager,
            _env: &mut Environment,
        ) -> StoryStep {
            Ok(None)
        }

        fn save_state(&self) -> Value {
            Value::from(self.level)
        }
    }

    struct Factory;

    impl WorldFactory for Factory {
        fn story(&self, record: &StoryRecord) -> Result<Box<dyn Story>, SaveError> {
            match record.name.as_str() {
                "idle" => Ok(Box::new(Idle {
                    level: record.decode()?,
                })),
                other => Err(SaveError::UnknownStory {
                    name: other.to_string(),
                }),
            }
        }

        fn sprite(&self, record: &SpriteRecord) -> Result<Box<dyn Sprite>, SaveError> {
            match record.kind {
                SpriteKind::Barrier => Ok(Box::new(Barrier::from_record(record)?)),
                kind => Err(SaveError::UnknownSprite { kind }),
            }
        }
    }

    fn env() -> Environment {
        Environment::new(5, ScreenGeometry::centred(16, 16, 1))
    }

    fn runner_with_barrier() -> StoryRunner {
        let mut runner = StoryRunner::new(Box::new(Idle { level: 4 }), env());
        let barrier = runner.sprites_mut().add(Barrier::for_kinds(
            Cell::new(1, 1, 0),
            Cell::new(2, 2, 0),
            &[SpriteKind::Monster],
        ));
        runner.sprites_mut().set_draw_disabled(barrier, true);
        runner.tick(InputSnapshot::empty()).expect("tick");
        runner
    }

    #[test]
    fn memory_slot_round_trip_restores_story_sprites_and_flags() {
        let runner = runner_with_barrier();
        let mut slot = MemorySaveSlot::new();
        save_world(&runner, &mut slot).expect("save");

        let mut restored = load_world(&slot, &Factory, env())
            .expect("load")
            .expect("present");
        assert_eq!(restored.story_name(), "idle");
        assert_eq!(restored.sprites().len(), 1);
        assert_eq!(restored.env().tick(), 1);
        assert_eq!(restored.pending_events(), &[StoryEvent::StoryContinues]);

        let handle = restored.sprites().handles()[0];
        assert!(restored.sprites().is_draw_disabled(handle));
        assert!(!restored.sprites().is_empty_for(Cell::new(1, 2, 0), SpriteKind::Monster));
        assert!(restored.sprites().is_empty_for(Cell::new(1, 2, 0), SpriteKind::Player));

        restored.tick(InputSnapshot::empty()).expect("tick");
        assert_eq!(restored.env().tick(), 2);
    }

    #[test]
    fn empty_provider_loads_nothing() {
        let slot = MemorySaveSlot::new();
        assert!(load_world(&slot, &Factory, env()).expect("load").is_none());
    }

    #[test]
    fn file_slot_writes_atomically_and_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut slot = FileSaveSlot::new(&dir.path().join("saves"), "slot1");
        assert!(slot.load().is_none());

        slot.save(b"first").expect("save");
        slot.save(b"second").expect("overwrite");
        assert_eq!(slot.load().as_deref(), Some(&b"second"[..]));
        assert!(!slot.path().with_file_name("slot1.json.tmp").exists());
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let mut snapshot = runner_with_barrier().snapshot();
        snapshot.save_version = SAVE_VERSION + 1;
        let bytes = snapshot.to_bytes().expect("encode");
        match WorldSnapshot::from_bytes(&bytes) {
            Err(SaveError::VersionMismatch { found, expected }) => {
                assert_eq!(found, SAVE_VERSION + 1);
                assert_eq!(expected, SAVE_VERSION);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unknown_story_fails_restore() {
        let mut snapshot = runner_with_barrier().snapshot();
        snapshot.story.name = "missing".to_string();
        let result = StoryRunner::restore(snapshot, &Factory, env());
        assert!(matches!(result, Err(SaveError::UnknownStory { name }) if name == "missing"));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            WorldSnapshot::from_bytes(b"not json"),
            Err(SaveError::Decode(_))
        ));
    }
}
