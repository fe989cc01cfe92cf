mod buffer;
mod image;
mod palette;
mod projection;
mod shapes;

pub use buffer::{Canvas, PaletteBudgetError, MAX_DEPTH};
pub use self::image::{ImageError, IndexedImage, TRANSPARENT};
pub use palette::{rgb, Palette, MAX_SIMULTANEOUS_COLOURS, PALETTE_SIZE};
pub use projection::{depth_offset, Cell, Point3, Projection, ScreenPoint};
pub use shapes::{DoorCutout, Face, FaceColours, Shape, ShapePixel};
