use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageNameError {
    #[error("image name must not be empty")]
    Empty,
    #[error("image name must not start with '/'")]
    LeadingSlash,
    #[error("image name must not contain '\\\\'")]
    Backslash,
    #[error("image name must not contain '..'")]
    ParentTraversal,
    #[error("image name contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

/// Image names are lowercase path-like keys such as `ui/title` or `coin_1`.
pub(crate) fn validate_image_name(name: &str) -> Result<(), ImageNameError> {
    if name.is_empty() {
        return Err(ImageNameError::Empty);
    }
    if name.starts_with('/') {
        return Err(ImageNameError::LeadingSlash);
    }
    if name.contains('\\') {
        return Err(ImageNameError::Backslash);
    }
    if name.contains("..") {
        return Err(ImageNameError::ParentTraversal);
    }
    for ch in name.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-') {
            continue;
        }
        return Err(ImageNameError::InvalidCharacter { character: ch });
    }
    Ok(())
}

/// Manifest file entries may carry an extension but never leave the asset
/// directory.
pub(crate) fn validate_image_file(file: &str) -> Result<(), ImageNameError> {
    let stem = file.strip_suffix(".png").unwrap_or(file);
    validate_image_name(stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        for name in ["statue", "ui/title", "coin-1/frame_2"] {
            assert!(validate_image_name(name).is_ok(), "name={name}");
        }
    }

    #[test]
    fn rejects_invalid_names() {
        for name in ["", "/a", "..", "a/../b", r"a\b", "A", "a.b"] {
            assert!(validate_image_name(name).is_err(), "name={name}");
        }
    }

    #[test]
    fn files_may_end_in_png_only() {
        assert!(validate_image_file("statue.png").is_ok());
        assert!(validate_image_file("walls/brick").is_ok());
        assert_eq!(
            validate_image_file("../secret.png"),
            Err(ImageNameError::ParentTraversal)
        );
        assert!(validate_image_file("statue.bmp").is_err());
    }
}
