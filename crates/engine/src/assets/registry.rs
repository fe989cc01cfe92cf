use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::{AssetError, ImageSource};
use crate::canvas::IndexedImage;

/// Images shared by every sprite that draws them.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    images: HashMap<String, Arc<IndexedImage>>,
}

impl AssetRegistry {
    /// Loads every name up front; the first failure aborts the whole load.
    pub fn load(source: &dyn ImageSource, names: &[&str]) -> Result<Self, AssetError> {
        let mut images = HashMap::with_capacity(names.len());
        for name in names {
            let image = source.load_image(name)?;
            images.insert((*name).to_string(), Arc::new(image));
        }
        info!(image_count = images.len(), "assets_loaded");
        Ok(Self { images })
    }

    pub fn get(&self, name: &str) -> Option<Arc<IndexedImage>> {
        self.images.get(name).cloned()
    }

    pub fn image(&self, name: &str) -> Result<Arc<IndexedImage>, AssetError> {
        self.get(name).ok_or_else(|| AssetError::UnknownImage {
            name: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryImageSource;

    fn source() -> MemoryImageSource {
        let mut source = MemoryImageSource::new();
        for name in ["coin", "statue"] {
            let image = IndexedImage::from_rows(&["##"], &[('#', 7)], (0, 0)).expect("image");
            source.insert(name, image).expect("insert");
        }
        source
    }

    #[test]
    fn loads_requested_names_and_shares_them() {
        let registry = AssetRegistry::load(&source(), &["coin", "statue"]).expect("load");
        assert_eq!(registry.len(), 2);
        let first = registry.image("coin").expect("coin");
        let second = registry.image("coin").expect("coin");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn first_unknown_name_fails_the_load() {
        let result = AssetRegistry::load(&source(), &["coin", "dragon", "statue"]);
        assert!(matches!(
            result,
            Err(AssetError::UnknownImage { name }) if name == "dragon"
        ));
    }

    #[test]
    fn unrequested_images_are_not_loaded() {
        let registry = AssetRegistry::load(&source(), &["statue"]).expect("load");
        assert!(registry.get("coin").is_none());
        assert!(registry.image("coin").is_err());
    }
}
