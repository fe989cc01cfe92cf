use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::ImageReader;
use serde::Deserialize;
use tracing::debug;

use super::names::{validate_image_file, validate_image_name};
use super::AssetError;
use crate::canvas::{IndexedImage, Palette, TRANSPARENT};

pub const MANIFEST_FILE: &str = "images.json";

/// Provider of named indexed images.
pub trait ImageSource {
    fn load_image(&self, name: &str) -> Result<IndexedImage, AssetError>;
}

/// Images held in memory, typically built from text rows at startup.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageSource {
    images: HashMap<String, IndexedImage>,
}

impl MemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, image: IndexedImage) -> Result<(), AssetError> {
        validate_image_name(name).map_err(|source| AssetError::InvalidName {
            name: name.to_string(),
            source,
        })?;
        self.images.insert(name.to_string(), image);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ImageSource for MemoryImageSource {
    fn load_image(&self, name: &str) -> Result<IndexedImage, AssetError> {
        self.images
            .get(name)
            .cloned()
            .ok_or_else(|| AssetError::UnknownImage {
                name: name.to_string(),
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Manifest {
    images: HashMap<String, ManifestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestEntry {
    file: String,
    #[serde(default)]
    reference: (i32, i32),
}

/// PNG files described by an `images.json` manifest in one directory.
///
/// RGBA pixels are mapped to the nearest palette entry; fully transparent
/// pixels become [`TRANSPARENT`].
#[derive(Debug, Clone)]
pub struct PngImageSource {
    dir: PathBuf,
    manifest: Manifest,
    palette: Palette,
}

impl PngImageSource {
    pub fn open(dir: &Path, palette: Palette) -> Result<Self, AssetError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let text = fs::read_to_string(&manifest_path).map_err(|source| AssetError::ReadManifest {
            path: manifest_path.clone(),
            source,
        })?;
        let manifest: Manifest =
            serde_json::from_str(&text).map_err(|source| AssetError::ParseManifest {
                path: manifest_path.clone(),
                source,
            })?;

        for (name, entry) in &manifest.images {
            validate_image_name(name).map_err(|source| AssetError::InvalidName {
                name: name.clone(),
                source,
            })?;
            validate_image_file(&entry.file).map_err(|source| AssetError::InvalidName {
                name: entry.file.clone(),
                source,
            })?;
        }

        debug!(
            dir = %dir.display(),
            image_count = manifest.images.len(),
            "image_manifest_loaded"
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            palette,
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.manifest.images.keys().map(String::as_str)
    }
}

impl ImageSource for PngImageSource {
    fn load_image(&self, name: &str) -> Result<IndexedImage, AssetError> {
        let entry = self
            .manifest
            .images
            .get(name)
            .ok_or_else(|| AssetError::UnknownImage {
                name: name.to_string(),
            })?;
        let path = self.dir.join(&entry.file);
        let decoded = ImageReader::open(&path)
            .map_err(|source| AssetError::OpenImage {
                path: path.clone(),
                source,
            })?
            .decode()
            .map_err(|source| AssetError::DecodeImage {
                path: path.clone(),
                source,
            })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = rgba
            .pixels()
            .map(|pixel| {
                let [r, g, b, a] = pixel.0;
                if a == 0 {
                    TRANSPARENT
                } else {
                    self.palette.nearest([r, g, b])
                }
            })
            .collect();

        IndexedImage::new(width, height, pixels, entry.reference).map_err(|source| {
            AssetError::Image {
                name: name.to_string(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::rgb;

    fn write_png(dir: &Path, file: &str, width: u32, height: u32, rgba: Vec<u8>) {
        let image = image::RgbaImage::from_raw(width, height, rgba).expect("buffer size");
        image.save(dir.join(file)).expect("write png");
    }

    fn write_manifest(dir: &Path, json: serde_json::Value) {
        fs::write(dir.join(MANIFEST_FILE), json.to_string()).expect("write manifest");
    }

    #[test]
    fn png_pixels_map_to_nearest_palette_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_png(
            dir.path(),
            "dot.png",
            3,
            1,
            vec![250, 5, 5, 255, 0, 0, 0, 0, 80, 170, 255, 255],
        );
        write_manifest(
            dir.path(),
            serde_json::json!({ "images": { "dot": { "file": "dot.png", "reference": [1, 0] } } }),
        );

        let source = PngImageSource::open(dir.path(), Palette::default()).expect("open");
        let image = source.load_image("dot").expect("load");

        assert_eq!((image.width(), image.height()), (3, 1));
        assert_eq!(image.reference(), (1, 0));
        assert_eq!(image.pixel(0, 0), Some(rgb(3, 0, 0)));
        assert_eq!(image.pixel(1, 0), None);
        assert_eq!(image.pixel(2, 0), Some(rgb(1, 2, 3)));
        let opaque = image.opaque_pixels().collect::<Vec<_>>();
        assert_eq!(opaque, vec![(-1, 0, rgb(3, 0, 0)), (1, 0, rgb(1, 2, 3))]);
    }

    #[test]
    fn unknown_name_and_missing_file_are_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_manifest(
            dir.path(),
            serde_json::json!({ "images": { "ghost": { "file": "ghost.png" } } }),
        );
        let source = PngImageSource::open(dir.path(), Palette::default()).expect("open");

        assert!(matches!(
            source.load_image("nobody"),
            Err(AssetError::UnknownImage { .. })
        ));
        assert!(matches!(
            source.load_image("ghost"),
            Err(AssetError::OpenImage { .. })
        ));
    }

    #[test]
    fn manifest_rejects_escaping_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_manifest(
            dir.path(),
            serde_json::json!({ "images": { "evil": { "file": "../evil.png" } } }),
        );
        assert!(matches!(
            PngImageSource::open(dir.path(), Palette::default()),
            Err(AssetError::InvalidName { .. })
        ));
    }

    #[test]
    fn missing_manifest_is_reported_with_its_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        match PngImageSource::open(dir.path(), Palette::default()) {
            Err(AssetError::ReadManifest { path, .. }) => {
                assert_eq!(path, dir.path().join(MANIFEST_FILE));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn memory_source_serves_inserted_images() {
        let mut source = MemoryImageSource::new();
        let image = IndexedImage::from_rows(&["#"], &[('#', 5)], (0, 0)).expect("image");
        source.insert("block", image.clone()).expect("insert");
        assert_eq!(source.load_image("block").expect("load"), image);
        assert!(source.insert("Bad Name", image).is_err());
    }
}
