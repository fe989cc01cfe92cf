use serde::{Deserialize, Serialize};

/// Depth deltas that order coplanar features. Smaller depth is nearer.
pub mod depth_offset {
    pub const BLOCK_FRONT: f32 = -0.30;
    pub const BLOCK_SIDE: f32 = -0.20;
    pub const BLOCK_TOP: f32 = 0.0;
    pub const PARTICLE_HALO: f32 = -0.10;
    pub const DOOR_RECESS: f32 = -0.05;
}

/// Continuous lattice position: `x`/`y` are ground axes in block units, `z` is
/// height in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub const ZERO: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Nearest lattice cell.
    pub fn cell(self) -> Cell {
        Cell::new(
            self.x.round() as i32,
            self.y.round() as i32,
            self.z.round() as i32,
        )
    }

    pub fn offset(self, dx: f32, dy: f32, dz: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn ground_distance_sq(self, other: Point3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Integer lattice cell used by obstacle queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn point(self) -> Point3 {
        Point3::new(self.x as f32, self.y as f32, self.z as f32)
    }

    pub const fn above(self, dz: i32) -> Self {
        Self::new(self.x, self.y, self.z + dz)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
    pub depth: f32,
}

/// Isometric projection onto the canvas.
///
/// `screen_x = origin_x + 2·s·(x − y)`, `screen_y = origin_y − s·(x + y) − z`,
/// `depth = x + y`, where `s` is `block_px`. Positions are taken relative to
/// the camera offset before projecting; depth uses the absolute ground sum so
/// it does not move when the camera pans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    pub origin_x: i32,
    pub origin_y: i32,
    pub block_px: i32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            origin_x: 0,
            origin_y: 0,
            block_px: 1,
        }
    }
}

impl Projection {
    pub fn new(origin: (i32, i32), block_px: i32) -> Self {
        Self {
            origin_x: origin.0,
            origin_y: origin.1,
            block_px: block_px.max(1),
        }
    }

    pub fn project(&self, point: Point3, camera: Point3) -> ScreenPoint {
        let scale = self.block_px as f32;
        let x = point.x - camera.x;
        let y = point.y - camera.y;
        let z = point.z - camera.z;
        ScreenPoint {
            x: self.origin_x + (2.0 * scale * (x - y)).round() as i32,
            y: self.origin_y - (scale * (x + y)).round() as i32 - z.round() as i32,
            depth: point.x + point.y,
        }
    }

    pub fn project_cell(&self, cell: Cell, camera: Point3) -> ScreenPoint {
        self.project(cell.point(), camera)
    }
}
