use serde::{Deserialize, Serialize};

use super::buffer::Canvas;
use super::projection::{depth_offset, ScreenPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Top,
    /// Face on the near side of the x axis (lower-left on screen).
    Front,
    /// Face on the near side of the y axis (lower-right on screen).
    Side,
    Recess,
}

impl Face {
    pub fn depth_delta(self) -> f32 {
        match self {
            Face::Top => depth_offset::BLOCK_TOP,
            Face::Front => depth_offset::BLOCK_FRONT,
            Face::Side => depth_offset::BLOCK_SIDE,
            Face::Recess => depth_offset::DOOR_RECESS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceColours {
    pub top: u8,
    pub front: u8,
    pub side: u8,
    pub recess: u8,
}

impl FaceColours {
    pub fn colour(&self, face: Face) -> u8 {
        match face {
            Face::Top => self.top,
            Face::Front => self.front,
            Face::Side => self.side,
            Face::Recess => self.recess,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapePixel {
    pub dx: i32,
    pub dy: i32,
    pub depth_delta: f32,
    pub face: Face,
}

/// Precomputed pixel list for a composed isometric shape.
///
/// Offsets are relative to the projected centre of the shape's base cell, so
/// drawing is a loop of `plot` calls with no geometry at draw time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    pixels: Vec<ShapePixel>,
}

impl Shape {
    pub fn pixels(&self) -> &[ShapePixel] {
        &self.pixels
    }

    pub fn draw(&self, canvas: &mut Canvas, at: ScreenPoint, colours: &FaceColours) {
        for pixel in &self.pixels {
            canvas.plot(
                at.x + pixel.dx,
                at.y + pixel.dy,
                at.depth + pixel.depth_delta,
                colours.colour(pixel.face),
            );
        }
    }

    /// A unit-footprint cube `height` pixels tall at block scale `block_px`.
    pub fn block(block_px: i32, height: i32) -> Self {
        let mut pixels = Vec::new();
        push_block_pixels(&mut pixels, block_px.max(1), height.max(0), (0, 0, 0.0), None);
        Self { pixels }
    }

    /// A row of `length` cubes along the ground x axis. A door cuts a recess
    /// into the visible side face of the cells it spans.
    pub fn wall(block_px: i32, length: u32, height: i32, door: Option<DoorCutout>) -> Self {
        let scale = block_px.max(1);
        let mut pixels = Vec::new();
        for cell in 0..length as i32 {
            let door_height = door
                .filter(|door| door.spans(cell as u32))
                .map(|door| door.height.min(height));
            push_block_pixels(
                &mut pixels,
                scale,
                height.max(0),
                (2 * scale * cell, -scale * cell, cell as f32),
                door_height,
            );
        }
        Self { pixels }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorCutout {
    pub start: u32,
    pub width: u32,
    pub height: i32,
}

impl DoorCutout {
    pub fn spans(&self, cell: u32) -> bool {
        cell >= self.start && cell < self.start.saturating_add(self.width)
    }
}

fn push_block_pixels(
    out: &mut Vec<ShapePixel>,
    scale: i32,
    height: i32,
    (origin_dx, origin_dy, origin_depth): (i32, i32, f32),
    door_height: Option<i32>,
) {
    let s = scale as f32;
    let h = height as f32;
    for dx in -2 * scale..=2 * scale {
        for dy in (-height - scale)..=scale {
            let fx = dx as f32;
            let fy = dy as f32;
            let face = if fx.abs() / 2.0 + (fy + h).abs() <= s {
                Some(Face::Top)
            } else if dx < 0 {
                let edge = (fx + 2.0 * s) / 2.0;
                (fy <= edge && fy > edge - h).then_some(Face::Front)
            } else {
                let edge = s - fx / 2.0;
                (fy <= edge && fy > edge - h).then_some(Face::Side).map(|face| {
                    match door_height {
                        Some(door) if edge - fy < door as f32 => Face::Recess,
                        _ => face,
                    }
                })
            };
            if let Some(face) = face {
                out.push(ShapePixel {
                    dx: origin_dx + dx,
                    dy: origin_dy + dy,
                    depth_delta: origin_depth + face.depth_delta(),
                    face,
                });
            }
        }
    }
}
