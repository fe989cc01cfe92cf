//! Level layouts. Each level is a square floor of blocks split by a wall with
//! a door, dressed with a statue and a fountain, and populated with coins and
//! monsters. Higher levels grow the floor, punch pits into it and add
//! monsters.

use std::collections::HashSet;

use lattice_engine::{
    rgb, AssetError, Barrier, Cell, DoorCutout, Environment, FaceColours, Point3, SpriteKind, SpriteManager,
};
use tracing::info;

use super::actors::{Coin, Monster, Player, Track};
use super::camera::Camera;
use super::effects::fountain;
use super::scenery::{Block, Statue, Wall, WorldBounds};
use super::{Assets, BLOCK_HEIGHT};

const BASE_SIZE: i32 = 7;
const MAX_EXTRA_SIZE: u32 = 3;
const WALL_HEIGHT: i32 = 2 * BLOCK_HEIGHT;
const DOOR_WIDTH: u32 = 2;
const COIN_PLACEMENT_ATTEMPTS: u32 = 200;

const FLOOR_COLOURS: FaceColours = FaceColours {
    top: rgb(1, 2, 1),
    front: rgb(1, 1, 0),
    side: rgb(0, 1, 0),
    recess: rgb(0, 0, 0),
};

const WALL_COLOURS: FaceColours = FaceColours {
    top: rgb(2, 2, 2),
    front: rgb(2, 1, 1),
    side: rgb(1, 1, 1),
    recess: rgb(0, 0, 0),
};

/// What the story needs to know about a level it just built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LevelSummary {
    pub(crate) coins: u32,
    pub(crate) spawn: Point3,
}

#[derive(Debug, Clone)]
struct Layout {
    size: i32,
    pits: Vec<(i32, i32)>,
    wall_y: i32,
    door_x: i32,
    statue: (i32, i32),
    fountain: (i32, i32),
    spawn: (i32, i32),
    monsters: Vec<((i32, i32), (i32, i32), Track)>,
    coins: u32,
}

impl Layout {
    fn for_level(level: u32) -> Self {
        let size = BASE_SIZE + level.saturating_sub(1).min(MAX_EXTRA_SIZE) as i32;
        let mid = size / 2;
        let pits = if level >= 2 {
            vec![(mid, 1), (mid + 1, mid + 2)]
        } else {
            Vec::new()
        };
        let candidates = [
            ((size - 2, 1), (0, 1), Track::Patrol),
            ((1, size - 2), (1, 0), Track::Circuit),
            ((size - 2, size - 2), (-1, 0), Track::Patrol),
        ];
        let monster_count = level.clamp(1, candidates.len() as u32) as usize;
        Self {
            size,
            pits,
            wall_y: mid,
            door_x: mid - 1,
            statue: (size - 1, 0),
            fountain: (0, size - 1),
            spawn: (0, 0),
            monsters: candidates[..monster_count].to_vec(),
            coins: 3 + level,
        }
    }

    fn has_floor(&self, x: i32, y: i32) -> bool {
        (0..self.size).contains(&x) && (0..self.size).contains(&y) && !self.pits.contains(&(x, y))
    }

    /// Floor cells nothing else stands on.
    fn is_open(&self, x: i32, y: i32) -> bool {
        self.has_floor(x, y)
            && y != self.wall_y
            && (x, y) != self.statue
            && (x, y) != self.fountain
            && (x, y) != self.spawn
            && !self.monsters.iter().any(|(at, _, _)| *at == (x, y))
    }
}

/// Clears the world and builds `level`. Coin placement draws on the
/// environment RNG, so a given seed always yields the same layout.
pub(crate) fn build_level(
    level: u32,
    sprites: &mut SpriteManager,
    env: &mut Environment,
    assets: &Assets,
) -> Result<LevelSummary, AssetError> {
    let layout = Layout::for_level(level);
    let block_px = env.screen().block_px;
    let size = layout.size;

    sprites.remove_all_sprites();
    sprites.add(Camera::looking_at(Point3::new(
        layout.spawn.0 as f32,
        layout.spawn.1 as f32,
        0.0,
    )));
    sprites.add(WorldBounds::new(
        (-2, -2),
        (size + 1, size + 1),
        -3 * BLOCK_HEIGHT,
    ));

    for x in 0..size {
        for y in 0..size {
            if layout.has_floor(x, y) {
                sprites.add(Block::new(
                    Cell::new(x, y, -BLOCK_HEIGHT),
                    BLOCK_HEIGHT,
                    FLOOR_COLOURS,
                    block_px,
                ));
            }
        }
    }

    let door = DoorCutout {
        start: layout.door_x as u32,
        width: DOOR_WIDTH,
        height: BLOCK_HEIGHT + BLOCK_HEIGHT / 2,
    };
    sprites.add(Wall::new(
        Cell::new(0, layout.wall_y, 0),
        size as u32,
        WALL_HEIGHT,
        Some(door),
        WALL_COLOURS,
        block_px,
    ));
    // Monsters stay on their own side of the wall.
    sprites.add(Barrier::for_kinds(
        Cell::new(layout.door_x, layout.wall_y, 0),
        Cell::new(
            layout.door_x + DOOR_WIDTH as i32 - 1,
            layout.wall_y,
            WALL_HEIGHT - 1,
        ),
        &[SpriteKind::Monster],
    ));

    sprites.add(Statue::new(
        Cell::new(layout.statue.0, layout.statue.1, 0),
        "statue",
        assets,
    )?);
    sprites.add(fountain(Point3::new(
        layout.fountain.0 as f32,
        layout.fountain.1 as f32,
        0.0,
    )));

    let coins = place_coins(&layout, sprites, env, assets)?;
    for &((x, y), heading, track) in &layout.monsters {
        sprites.add(Monster::new(Cell::new(x, y, 0), heading, track, assets)?);
    }

    let spawn = Point3::new(layout.spawn.0 as f32, layout.spawn.1 as f32, 0.0);
    sprites.add(Player::new(spawn, assets)?);

    info!(
        level,
        size,
        coins,
        monsters = layout.monsters.len(),
        sprite_count = sprites.len(),
        "level_built"
    );
    Ok(LevelSummary { coins, spawn })
}

fn place_coins(
    layout: &Layout,
    sprites: &mut SpriteManager,
    env: &mut Environment,
    assets: &Assets,
) -> Result<u32, AssetError> {
    let mut taken = HashSet::new();
    let mut attempts = 0;
    while (taken.len() as u32) < layout.coins && attempts < COIN_PLACEMENT_ATTEMPTS {
        attempts += 1;
        let x = env.below(layout.size as u32) as i32;
        let y = env.below(layout.size as u32) as i32;
        if layout.is_open(x, y) && taken.insert((x, y)) {
            sprites.add(Coin::new(Cell::new(x, y, 0), assets)?);
        }
    }
    Ok(taken.len() as u32)
}
