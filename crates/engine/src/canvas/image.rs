use thiserror::Error;

/// Colour byte reserved for "draw nothing" inside an [`IndexedImage`].
pub const TRANSPARENT: u8 = u8::MAX;

/// Indexed-colour picture with a reference point.
///
/// The reference point is the pixel that lands on the draw position, so a
/// statue image can be anchored at its feet rather than its top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    ref_x: i32,
    ref_y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("pixel count mismatch: expected {expected}, got {actual}")]
    PixelCountMismatch { expected: usize, actual: usize },
    #[error("row {row} has width {actual}, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("glyph '{glyph}' has no colour in the legend")]
    UnknownGlyph { glyph: char },
}

impl IndexedImage {
    pub fn new(
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        reference: (i32, i32),
    ) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(ImageError::PixelCountMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            ref_x: reference.0,
            ref_y: reference.1,
        })
    }

    /// Builds an image from text rows. `'.'` and `' '` are transparent; every
    /// other glyph must appear in `legend`.
    pub fn from_rows(
        rows: &[&str],
        legend: &[(char, u8)],
        reference: (i32, i32),
    ) -> Result<Self, ImageError> {
        let width = rows.first().map(|row| row.chars().count()).unwrap_or(0);
        let mut pixels = Vec::with_capacity(width * rows.len());
        for (row_index, row) in rows.iter().enumerate() {
            let row_width = row.chars().count();
            if row_width != width {
                return Err(ImageError::RaggedRow {
                    row: row_index,
                    expected: width,
                    actual: row_width,
                });
            }
            for glyph in row.chars() {
                if glyph == '.' || glyph == ' ' {
                    pixels.push(TRANSPARENT);
                    continue;
                }
                let colour = legend
                    .iter()
                    .find(|(candidate, _)| *candidate == glyph)
                    .map(|(_, colour)| *colour)
                    .ok_or(ImageError::UnknownGlyph { glyph })?;
                pixels.push(colour);
            }
        }
        Self::new(width as u32, rows.len() as u32, pixels, reference)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn reference(&self) -> (i32, i32) {
        (self.ref_x, self.ref_y)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let colour = self.pixels[y as usize * self.width as usize + x as usize];
        (colour != TRANSPARENT).then_some(colour)
    }

    /// Opaque pixels as `(dx, dy, colour)` relative to the reference point.
    pub fn opaque_pixels(&self) -> impl Iterator<Item = (i32, i32, u8)> + '_ {
        let width = self.width as usize;
        self.pixels
            .iter()
            .enumerate()
            .filter(|(_, colour)| **colour != TRANSPARENT)
            .map(move |(index, colour)| {
                let x = (index % width) as i32;
                let y = (index / width) as i32;
                (x - self.ref_x, y - self.ref_y, *colour)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_wrong_pixel_count() {
        assert_eq!(
            IndexedImage::new(2, 2, vec![1, 2, 3], (0, 0)),
            Err(ImageError::PixelCountMismatch {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn from_rows_maps_legend_and_transparency() {
        let image = IndexedImage::from_rows(&[".a", "b."], &[('a', 5), ('b', 9)], (1, 1))
            .expect("image");
        assert_eq!(image.pixel(0, 0), None);
        assert_eq!(image.pixel(1, 0), Some(5));
        assert_eq!(image.pixel(0, 1), Some(9));
        let opaque = image.opaque_pixels().collect::<Vec<_>>();
        assert_eq!(opaque, vec![(0, -1, 5), (-1, 0, 9)]);
    }

    #[test]
    fn from_rows_rejects_ragged_and_unknown() {
        assert!(matches!(
            IndexedImage::from_rows(&["aa", "a"], &[('a', 1)], (0, 0)),
            Err(ImageError::RaggedRow { row: 1, .. })
        ));
        assert_eq!(
            IndexedImage::from_rows(&["z"], &[('a', 1)], (0, 0)),
            Err(ImageError::UnknownGlyph { glyph: 'z' })
        );
    }
}
