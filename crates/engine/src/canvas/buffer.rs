use std::ops::Range;

use thiserror::Error;

use super::image::IndexedImage;
use super::palette::{MAX_SIMULTANEOUS_COLOURS, PALETTE_SIZE};

/// Depth a cleared pixel starts at; any finite plot wins against it.
pub const MAX_DEPTH: f32 = f32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("canvas uses {used} distinct colours, hardware limit is {limit}")]
pub struct PaletteBudgetError {
    pub used: usize,
    pub limit: usize,
}

/// Indexed-colour frame with a per-pixel depth test.
///
/// A plot lands only when its depth is less than or equal to the stored depth,
/// so the nearest feature wins regardless of drawing order and equal depths
/// resolve to the later plot.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    background: u8,
    colours: Vec<u8>,
    depths: Vec<f32>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: u8) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            background,
            colours: vec![background; len],
            depths: vec![MAX_DEPTH; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn background(&self) -> u8 {
        self.background
    }

    pub fn clear(&mut self) {
        self.colours.fill(self.background);
        self.depths.fill(MAX_DEPTH);
    }

    fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Returns whether the pixel was written.
    pub fn plot(&mut self, x: i32, y: i32, depth: f32, colour: u8) -> bool {
        debug_assert!(
            (colour as usize) < PALETTE_SIZE,
            "colour index {colour} outside the palette"
        );
        let Some(index) = self.index_of(x, y) else {
            return false;
        };
        if depth <= self.depths[index] {
            self.depths[index] = depth;
            self.colours[index] = colour;
            true
        } else {
            false
        }
    }

    pub fn fill(&mut self, xs: Range<i32>, ys: Range<i32>, depth: f32, colour: u8) {
        for y in ys {
            for x in xs.clone() {
                self.plot(x, y, depth, colour);
            }
        }
    }

    /// Draws `image` with its reference point at `(x, y)`; every opaque pixel
    /// shares `depth`.
    pub fn draw_image(&mut self, image: &IndexedImage, x: i32, y: i32, depth: f32) {
        for (dx, dy, colour) in image.opaque_pixels() {
            self.plot(x + dx, y + dy, depth, colour);
        }
    }

    pub fn colour_at(&self, x: i32, y: i32) -> Option<u8> {
        self.index_of(x, y).map(|index| self.colours[index])
    }

    pub fn depth_at(&self, x: i32, y: i32) -> Option<f32> {
        self.index_of(x, y).map(|index| self.depths[index])
    }

    /// Row-major colour indices.
    pub fn pixels(&self) -> &[u8] {
        &self.colours
    }

    pub fn distinct_colours(&self) -> usize {
        let mut seen = [false; 256];
        for colour in &self.colours {
            seen[*colour as usize] = true;
        }
        seen.iter().filter(|used| **used).count()
    }

    pub fn check_palette_budget(&self) -> Result<usize, PaletteBudgetError> {
        let used = self.distinct_colours();
        if used > MAX_SIMULTANEOUS_COLOURS {
            return Err(PaletteBudgetError {
                used,
                limit: MAX_SIMULTANEOUS_COLOURS,
            });
        }
        Ok(used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleared_canvas_holds_background_at_max_depth() {
        let mut canvas = Canvas::new(4, 3, 7);
        canvas.plot(1, 1, 0.0, 2);
        canvas.clear();
        assert_eq!(canvas.colour_at(1, 1), Some(7));
        assert_eq!(canvas.depth_at(1, 1), Some(MAX_DEPTH));
    }

    #[test]
    fn nearest_plot_wins_in_every_order() {
        let orders = [
            [5.0, 3.0, 4.0],
            [3.0, 5.0, 4.0],
            [4.0, 3.0, 5.0],
            [4.0, 5.0, 3.0],
            [5.0, 4.0, 3.0],
            [3.0, 4.0, 5.0],
        ];
        for order in orders {
            let mut canvas = Canvas::new(2, 2, 0);
            for depth in order {
                canvas.plot(0, 0, depth, depth as u8);
            }
            assert_eq!(canvas.colour_at(0, 0), Some(3), "order={order:?}");
            assert_eq!(canvas.depth_at(0, 0), Some(3.0));
        }
    }

    #[test]
    fn equal_depth_later_plot_wins() {
        let mut canvas = Canvas::new(1, 1, 0);
        assert!(canvas.plot(0, 0, 2.0, 10));
        assert!(canvas.plot(0, 0, 2.0, 11));
        assert!(!canvas.plot(0, 0, 2.5, 12));
        assert_eq!(canvas.colour_at(0, 0), Some(11));
    }

    #[test]
    fn out_of_bounds_plots_are_ignored() {
        let mut canvas = Canvas::new(2, 2, 0);
        assert!(!canvas.plot(-1, 0, 0.0, 1));
        assert!(!canvas.plot(0, 2, 0.0, 1));
        assert_eq!(canvas.distinct_colours(), 1);
    }

    #[test]
    fn fill_respects_depth_per_pixel() {
        let mut canvas = Canvas::new(3, 1, 0);
        canvas.plot(1, 0, 1.0, 9);
        canvas.fill(0..3, 0..1, 2.0, 4);
        assert_eq!(canvas.pixels(), &[4, 9, 4]);
    }

    #[test]
    fn draw_image_anchors_reference_point() {
        let image =
            IndexedImage::from_rows(&["ab", ".c"], &[('a', 1), ('b', 2), ('c', 3)], (1, 1))
                .expect("image");
        let mut canvas = Canvas::new(4, 4, 0);
        canvas.draw_image(&image, 2, 2, 0.0);
        assert_eq!(canvas.colour_at(1, 1), Some(1));
        assert_eq!(canvas.colour_at(2, 1), Some(2));
        assert_eq!(canvas.colour_at(1, 2), Some(0));
        assert_eq!(canvas.colour_at(2, 2), Some(3));
    }

    #[test]
    fn palette_budget_flags_more_than_sixteen_colours() {
        let mut canvas = Canvas::new(17, 1, 0);
        for x in 0..16 {
            canvas.plot(x, 0, 0.0, x as u8);
        }
        assert_eq!(canvas.check_palette_budget(), Ok(16));
        canvas.plot(16, 0, 0.0, 40);
        assert_eq!(
            canvas.check_palette_budget(),
            Err(PaletteBudgetError {
                used: 17,
                limit: MAX_SIMULTANEOUS_COLOURS
            })
        );
    }
}
