//! Static level geometry: blocks, walls with doors, statues and the world's
//! outer bounds.

use std::sync::Arc;

use lattice_engine::{
    AssetError, CameraLink, Canvas, Cell, DoorCutout, DrawContext, FaceColours, IndexedImage, Obstacle,
    PhaseContext, PhaseOutput, Point3, SaveError, Shape, Sprite, SpriteHandle, SpriteKind,
    SpriteRecord,
};
use serde::{Deserialize, Serialize};

use super::{decode_record, draw_in_world, Assets};

/// Saved form shared by the scenery pieces, tagged by shape.
#[derive(Debug, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub(crate) enum SceneryRecord {
    Block(Block),
    Wall(Wall),
    Bounds(WorldBounds),
}

#[derive(Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
enum SceneryRecordRef<'a> {
    Block(&'a Block),
    Wall(&'a Wall),
    Bounds(&'a WorldBounds),
}

impl SceneryRecord {
    pub(crate) fn decode(record: &SpriteRecord) -> Result<Self, SaveError> {
        decode_record(record)
    }
}

/// Unit-footprint cube spanning `height` pixels up from its base cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Block {
    base: Cell,
    height: i32,
    colours: FaceColours,
    #[serde(skip)]
    shape: Shape,
    #[serde(skip)]
    camera: CameraLink,
}

impl Block {
    pub(crate) fn new(base: Cell, height: i32, colours: FaceColours, block_px: i32) -> Self {
        Self {
            base,
            height,
            colours,
            shape: Shape::default(),
            camera: CameraLink::default(),
        }
        .prepared(block_px)
    }

    /// Rebuilds the pixel shape, which is not saved.
    pub(crate) fn prepared(mut self, block_px: i32) -> Self {
        self.shape = Shape::block(block_px, self.height);
        self
    }

    fn occupies(&self, cell: Cell) -> bool {
        cell.x == self.base.x
            && cell.y == self.base.y
            && (self.base.z..self.base.z + self.height).contains(&cell.z)
    }
}

impl Obstacle for Block {
    fn is_platform(&self, cell: Cell) -> bool {
        self.occupies(cell)
    }

    fn is_empty(&self, cell: Cell) -> bool {
        !self.occupies(cell)
    }
}

impl Sprite for Block {
    fn kind(&self) -> SpriteKind {
        SpriteKind::Scenery
    }

    fn advance(&mut self, _ctx: &mut PhaseContext<'_>) -> PhaseOutput {
        PhaseOutput::none()
    }

    fn draw(&self, canvas: &mut Canvas, ctx: &DrawContext<'_>) {
        let at = ctx
            .projection
            .project_cell(self.base, self.camera.offset(ctx));
        self.shape.draw(canvas, at, &self.colours);
    }

    fn observe_arrival(&mut self, handle: SpriteHandle, arrival: &dyn Sprite) -> bool {
        self.camera.observe_arrival(handle, arrival);
        false
    }

    fn observe_departure(&mut self, handle: SpriteHandle) {
        self.camera.observe_departure(handle);
    }

    fn as_obstacle(&self) -> Option<&dyn Obstacle> {
        Some(self)
    }

    fn position(&self) -> Option<Point3> {
        Some(self.base.point())
    }

    fn save_record(&self) -> Option<SpriteRecord> {
        SpriteRecord::of(SpriteKind::Scenery, &SceneryRecordRef::Block(self))
    }
}

/// Row of `length` blocks along the ground x axis. Cells under a door opening
/// are passable; the lintel above stays solid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Wall {
    start: Cell,
    length: u32,
    height: i32,
    door: Option<DoorCutout>,
    colours: FaceColours,
    #[serde(skip)]
    shape: Shape,
    #[serde(skip)]
    camera: CameraLink,
}

impl Wall {
    pub(crate) fn new(
        start: Cell,
        length: u32,
        height: i32,
        door: Option<DoorCutout>,
        colours: FaceColours,
        block_px: i32,
    ) -> Self {
        Self {
            start,
            length,
            height,
            door,
            colours,
            shape: Shape::default(),
            camera: CameraLink::default(),
        }
        .prepared(block_px)
    }

    pub(crate) fn prepared(mut self, block_px: i32) -> Self {
        self.shape = Shape::wall(block_px, self.length, self.height, self.door);
        self
    }

    fn occupies(&self, cell: Cell) -> bool {
        if cell.y != self.start.y || !(self.start.z..self.start.z + self.height).contains(&cell.z)
        {
            return false;
        }
        let Ok(along) = u32::try_from(cell.x - self.start.x) else {
            return false;
        };
        if along >= self.length {
            return false;
        }
        match self.door {
            Some(door) if door.spans(along) => cell.z >= self.start.z + door.height,
            _ => true,
        }
    }
}

impl Obstacle for Wall {
    fn is_platform(&self, cell: Cell) -> bool {
        self.occupies(cell)
    }

    fn is_empty(&self, cell: Cell) -> bool {
        !self.occupies(cell)
    }
}

impl Sprite for Wall {
    fn kind(&self) -> SpriteKind {
        if self.door.is_some() {
            SpriteKind::Door
        } else {
            SpriteKind::Scenery
        }
    }

    fn advance(&mut self, _ctx: &mut PhaseContext<'_>) -> PhaseOutput {
        PhaseOutput::none()
    }

    fn draw(&self, canvas: &mut Canvas, ctx: &DrawContext<'_>) {
        let at = ctx
            .projection
            .project_cell(self.start, self.camera.offset(ctx));
        self.shape.draw(canvas, at, &self.colours);
    }

    fn observe_arrival(&mut self, handle: SpriteHandle, arrival: &dyn Sprite) -> bool {
        self.camera.observe_arrival(handle, arrival);
        false
    }

    fn observe_departure(&mut self, handle: SpriteHandle) {
        self.camera.observe_departure(handle);
    }

    fn as_obstacle(&self) -> Option<&dyn Obstacle> {
        Some(self)
    }

    fn position(&self) -> Option<Point3> {
        Some(self.start.point())
    }

    fn save_record(&self) -> Option<SpriteRecord> {
        SpriteRecord::of(self.kind(), &SceneryRecordRef::Wall(self))
    }
}

/// Invisible limits of the playable world: anything outside the ground
/// rectangle or below `floor_z` is void.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct WorldBounds {
    min: (i32, i32),
    max: (i32, i32),
    floor_z: i32,
}

impl WorldBounds {
    pub(crate) fn new(min: (i32, i32), max: (i32, i32), floor_z: i32) -> Self {
        Self { min, max, floor_z }
    }
}

impl Obstacle for WorldBounds {
    fn is_platform(&self, _cell: Cell) -> bool {
        false
    }

    fn is_empty(&self, _cell: Cell) -> bool {
        true
    }

    fn is_void(&self, cell: Cell) -> bool {
        cell.z < self.floor_z
            || !(self.min.0..=self.max.0).contains(&cell.x)
            || !(self.min.1..=self.max.1).contains(&cell.y)
    }
}

impl Sprite for WorldBounds {
    fn kind(&self) -> SpriteKind {
        SpriteKind::Scenery
    }

    fn advance(&mut self, _ctx: &mut PhaseContext<'_>) -> PhaseOutput {
        PhaseOutput::none()
    }

    fn as_obstacle(&self) -> Option<&dyn Obstacle> {
        Some(self)
    }

    fn save_record(&self) -> Option<SpriteRecord> {
        SpriteRecord::of(SpriteKind::Scenery, &SceneryRecordRef::Bounds(self))
    }
}

/// Image scenery that also occupies its column of cells up to the image height.
#[derive(Debug, Clone)]
pub(crate) struct Statue {
    base: Cell,
    height: i32,
    image_name: String,
    image: Arc<IndexedImage>,
    camera: CameraLink,
}

#[derive(Debug, Serialize, Deserialize)]
struct StatueState {
    base: Cell,
    image_name: String,
}

impl Statue {
    pub(crate) fn new(base: Cell, image_name: &str, assets: &Assets) -> Result<Self, AssetError> {
        let image = assets.image(image_name)?;
        Ok(Self {
            base,
            height: image.height() as i32,
            image_name: image_name.to_string(),
            image,
            camera: CameraLink::default(),
        })
    }

    pub(crate) fn from_record(record: &SpriteRecord, assets: &Assets) -> Result<Self, SaveError> {
        let StatueState { base, image_name } = decode_record(record)?;
        Ok(Self::new(base, &image_name, assets)?)
    }

    fn occupies(&self, cell: Cell) -> bool {
        cell.x == self.base.x
            && cell.y == self.base.y
            && (self.base.z..self.base.z + self.height).contains(&cell.z)
    }
}

impl Obstacle for Statue {
    fn is_platform(&self, cell: Cell) -> bool {
        self.occupies(cell)
    }

    fn is_empty(&self, cell: Cell) -> bool {
        !self.occupies(cell)
    }
}

impl Sprite for Statue {
    fn kind(&self) -> SpriteKind {
        SpriteKind::Statue
    }

    fn advance(&mut self, _ctx: &mut PhaseContext<'_>) -> PhaseOutput {
        PhaseOutput::none()
    }

    fn draw(&self, canvas: &mut Canvas, ctx: &DrawContext<'_>) {
        draw_in_world(canvas, ctx, &self.camera, &self.image, self.base.point());
    }

    fn observe_arrival(&mut self, handle: SpriteHandle, arrival: &dyn Sprite) -> bool {
        self.camera.observe_arrival(handle, arrival);
        false
    }

    fn observe_departure(&mut self, handle: SpriteHandle) {
        self.camera.observe_departure(handle);
    }

    fn as_obstacle(&self) -> Option<&dyn Obstacle> {
        Some(self)
    }

    fn position(&self) -> Option<Point3> {
        Some(self.base.point())
    }

    fn save_record(&self) -> Option<SpriteRecord> {
        let state = StatueState {
            base: self.base,
            image_name: self.image_name.clone(),
        };
        SpriteRecord::of(SpriteKind::Statue, &state)
    }
}
