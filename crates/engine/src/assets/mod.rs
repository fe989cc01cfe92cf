//! Image loading. Everything is loaded once at startup into an
//! [`AssetRegistry`]; sprites hold shared handles into it.

mod names;
mod registry;
mod source;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::canvas::ImageError;

pub use names::ImageNameError;
pub use registry::AssetRegistry;
pub use source::{ImageSource, MemoryImageSource, PngImageSource, MANIFEST_FILE};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid image name `{name}`: {source}")]
    InvalidName {
        name: String,
        #[source]
        source: ImageNameError,
    },
    #[error("no image named `{name}`")]
    UnknownImage { name: String },
    #[error("failed to read image manifest {path}: {source}")]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse image manifest {path}: {source}")]
    ParseManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to open image {path}: {source}")]
    OpenImage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    DecodeImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image `{name}` is malformed: {source}")]
    Image {
        name: String,
        #[source]
        source: ImageError,
    },
}
