use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::canvas::{Canvas, Palette};

/// Presents an indexed canvas through a palette. The canvas keeps its own
/// resolution; `pixels` scales it to the window surface.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    canvas_width: u32,
    canvas_height: u32,
    palette: Palette,
}

impl Renderer {
    pub fn new(
        window: Arc<Window>,
        canvas_width: u32,
        canvas_height: u32,
        palette: Palette,
    ) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(
            Arc::clone(&window),
            (canvas_width, canvas_height),
            (size.width, size.height),
        )?;
        Ok(Self {
            window,
            pixels,
            canvas_width,
            canvas_height,
            palette,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(
            Arc::clone(&self.window),
            (self.canvas_width, self.canvas_height),
            (width, height),
        )?;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        canvas: (u32, u32),
        surface: (u32, u32),
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(surface.0, surface.1, window);
        Pixels::new(canvas.0, canvas.1, surface)
    }

    pub fn present(&mut self, canvas: &Canvas) -> Result<(), Error> {
        write_canvas_rgba(self.pixels.frame_mut(), canvas, &self.palette);
        self.pixels.render()
    }
}

/// Expands colour indices into RGBA. Extra frame bytes are left untouched.
pub(crate) fn write_canvas_rgba(frame: &mut [u8], canvas: &Canvas, palette: &Palette) {
    debug_assert_eq!(
        frame.len(),
        canvas.pixels().len() * 4,
        "frame and canvas sizes differ"
    );
    for (rgba, colour) in frame.chunks_exact_mut(4).zip(canvas.pixels()) {
        rgba.copy_from_slice(&palette.rgba(*colour));
    }
}
