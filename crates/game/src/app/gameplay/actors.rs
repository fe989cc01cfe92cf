//! Things that move or get picked up: the player, monsters and coins.

use std::f32::consts::FRAC_1_SQRT_2;
use std::sync::Arc;

use lattice_engine::{
    AssetError, CameraLink, Canvas, Cell, DrawContext, IndexedImage, InputAction, InputSnapshot,
    InteractContext, PhaseContext, PhaseOutput, Point3, SaveError, Sprite, SpriteHandle,
    SpriteKind, SpriteRecord, StoryEvent, WorldView,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::effects::sparks;
use super::{decode_record, draw_in_world, Assets, COIN_COLLECTED, PLAYER_DIED, PLAYER_FELL};

const PLAYER_SPEED: f32 = 0.1;
const FALL_ACCEL: f32 = 1.0;
const MAX_FALL_SPEED: f32 = 6.0;
/// Below this height a fall always counts as leaving the world.
const FALL_LIMIT: f32 = -64.0;
const TOUCH_RADIUS_SQ: f32 = 0.5 * 0.5;
const TOUCH_HEIGHT: f32 = 6.0;
const MONSTER_SPEED: f32 = 0.05;
const COIN_BOB_PERIOD: u32 = 32;

fn touching(a: Point3, b: Point3) -> bool {
    a.ground_distance_sq(b) <= TOUCH_RADIUS_SQ && (a.z - b.z).abs() <= TOUCH_HEIGHT
}

fn heading(input: &InputSnapshot) -> (f32, f32) {
    let axis = |positive, negative| match (input.is_down(positive), input.is_down(negative)) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    };
    let dx = axis(InputAction::Right, InputAction::Left);
    let dy = axis(InputAction::Up, InputAction::Down);
    if dx != 0.0 && dy != 0.0 {
        (dx * FRAC_1_SQRT_2, dy * FRAC_1_SQRT_2)
    } else {
        (dx, dy)
    }
}

#[derive(Debug, Clone, Default)]
struct Touches {
    coins: Vec<SpriteHandle>,
    monster: bool,
}

/// Input-driven hero. Watches pickups and monsters; everything found during
/// `interact` is acted on in `aftermath`.
#[derive(Debug, Clone)]
pub(crate) struct Player {
    position: Point3,
    fall_speed: f32,
    image: Arc<IndexedImage>,
    camera: CameraLink,
    touches: Touches,
}

#[derive(Debug, Serialize, Deserialize)]
struct PlayerState {
    position: Point3,
    fall_speed: f32,
}

impl Player {
    pub(crate) fn new(position: Point3, assets: &Assets) -> Result<Self, AssetError> {
        Ok(Self {
            position,
            fall_speed: 0.0,
            image: assets.image("player")?,
            camera: CameraLink::default(),
            touches: Touches::default(),
        })
    }

    pub(crate) fn from_record(record: &SpriteRecord, assets: &Assets) -> Result<Self, SaveError> {
        let PlayerState {
            position,
            fall_speed,
        } = decode_record(record)?;
        Ok(Self {
            fall_speed,
            ..Self::new(position, assets)?
        })
    }

    fn walk(&mut self, world: &WorldView<'_>, (dx, dy): (f32, f32)) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        // Slide along whichever axis is still open.
        let attempts = [
            (dx * PLAYER_SPEED, dy * PLAYER_SPEED),
            (dx * PLAYER_SPEED, 0.0),
            (0.0, dy * PLAYER_SPEED),
        ];
        for (step_x, step_y) in attempts {
            if step_x == 0.0 && step_y == 0.0 {
                continue;
            }
            let next = self.position.offset(step_x, step_y, 0.0);
            if world.is_empty_for(next.cell(), SpriteKind::Player) {
                self.position = next;
                return;
            }
        }
    }

    fn fall(&mut self, world: &WorldView<'_>) {
        if standing(world, self.position, SpriteKind::Player) {
            self.fall_speed = 0.0;
            return;
        }
        self.fall_speed = (self.fall_speed + FALL_ACCEL).min(MAX_FALL_SPEED);
        let mut remaining = self.fall_speed;
        while remaining > 0.0 {
            let step = remaining.min(1.0);
            self.position.z -= step;
            remaining -= step;
            if standing(world, self.position, SpriteKind::Player) {
                self.fall_speed = 0.0;
                break;
            }
        }
    }
}

fn standing(world: &WorldView<'_>, position: Point3, kind: SpriteKind) -> bool {
    world.is_platform_for(position.cell().above(-1), kind)
}

impl Sprite for Player {
    fn kind(&self) -> SpriteKind {
        SpriteKind::Player
    }

    fn advance(&mut self, ctx: &mut PhaseContext<'_>) -> PhaseOutput {
        let input = *ctx.env.input();
        self.walk(&ctx.world, heading(&input));
        self.fall(&ctx.world);

        if self.position.z < FALL_LIMIT
            || ctx.world.is_void_for(self.position.cell(), SpriteKind::Player)
        {
            debug!(x = self.position.x, y = self.position.y, z = self.position.z, "player_fell");
            ctx.env.play("fall");
            return PhaseOutput::kill_self().event(StoryEvent::signal(PLAYER_FELL, 0));
        }
        PhaseOutput::none()
    }

    fn interact(&mut self, ctx: &InteractContext<'_>) {
        self.touches = Touches::default();
        for &handle in ctx.watching {
            let Some(other) = ctx.world.get(handle) else {
                continue;
            };
            let Some(position) = other.position() else {
                continue;
            };
            if !touching(self.position, position) {
                continue;
            }
            match other.kind() {
                SpriteKind::Pickup => self.touches.coins.push(handle),
                SpriteKind::Monster => self.touches.monster = true,
                _ => {}
            }
        }
    }

    fn aftermath(&mut self, ctx: &mut PhaseContext<'_>) -> PhaseOutput {
        let touches = std::mem::take(&mut self.touches);
        let mut output = PhaseOutput::none();
        for coin in touches.coins {
            ctx.env.play("coin");
            output = output
                .kill(coin)
                .event(StoryEvent::signal(COIN_COLLECTED, 1));
        }
        if touches.monster {
            ctx.env.play("hurt");
            output.kill_self = true;
            output = output
                .event(StoryEvent::signal(PLAYER_DIED, 0))
                .spawn(sparks(self.position.offset(0.0, 0.0, 4.0), ctx.env));
        }
        output
    }

    fn draw(&self, canvas: &mut Canvas, ctx: &DrawContext<'_>) {
        draw_in_world(canvas, ctx, &self.camera, &self.image, self.position);
    }

    fn observe_arrival(&mut self, handle: SpriteHandle, arrival: &dyn Sprite) -> bool {
        self.camera.observe_arrival(handle, arrival);
        matches!(arrival.kind(), SpriteKind::Pickup | SpriteKind::Monster)
    }

    fn observe_departure(&mut self, handle: SpriteHandle) {
        self.camera.observe_departure(handle);
    }

    fn position(&self) -> Option<Point3> {
        Some(self.position)
    }

    fn save_record(&self) -> Option<SpriteRecord> {
        let state = PlayerState {
            position: self.position,
            fall_speed: self.fall_speed,
        };
        SpriteRecord::of(SpriteKind::Player, &state)
    }
}

/// Movement policy for monsters: which headings to try, in order, when the
/// current step is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Track {
    /// Straight ahead, else turn back.
    Patrol,
    /// Straight ahead, else right, else left, else back.
    Circuit,
}

impl Track {
    fn candidates(self, (dx, dy): (i32, i32)) -> Vec<(i32, i32)> {
        let back = (-dx, -dy);
        match self {
            Track::Patrol => vec![(dx, dy), back],
            Track::Circuit => vec![(dx, dy), (dy, -dx), (-dy, dx), back],
        }
    }

    /// First heading from `here` whose destination is legal, if any.
    pub(crate) fn next_heading(
        self,
        here: Cell,
        heading: (i32, i32),
        legal: impl Fn(Cell) -> bool,
    ) -> Option<(i32, i32)> {
        self.candidates(heading)
            .into_iter()
            .find(|(dx, dy)| legal(Cell::new(here.x + dx, here.y + dy, here.z)))
    }
}

/// Walks cell to cell along its track. A cell is legal when it is empty for
/// monsters and has a platform under it; with no legal move the monster stays
/// put until one opens up.
#[derive(Debug, Clone)]
pub(crate) struct Monster {
    state: MonsterState,
    image: Arc<IndexedImage>,
    camera: CameraLink,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MonsterState {
    position: Point3,
    heading: (i32, i32),
    track: Track,
    goal: Option<Cell>,
    #[serde(default)]
    frozen: bool,
}

impl Monster {
    pub(crate) fn new(
        at: Cell,
        heading: (i32, i32),
        track: Track,
        assets: &Assets,
    ) -> Result<Self, AssetError> {
        let state = MonsterState {
            position: at.point(),
            heading,
            track,
            goal: None,
            frozen: false,
        };
        Self::with_state(state, assets)
    }

    fn with_state(state: MonsterState, assets: &Assets) -> Result<Self, AssetError> {
        Ok(Self {
            state,
            image: assets.image("monster")?,
            camera: CameraLink::default(),
        })
    }

    pub(crate) fn from_record(record: &SpriteRecord, assets: &Assets) -> Result<Self, SaveError> {
        Ok(Self::with_state(decode_record(record)?, assets)?)
    }

    fn choose_goal(&mut self, world: &WorldView<'_>) {
        let here = self.state.position.cell();
        let legal = |cell: Cell| {
            world.is_empty_for(cell, SpriteKind::Monster)
                && world.is_platform_for(cell.above(-1), SpriteKind::Monster)
        };
        match self.state.track.next_heading(here, self.state.heading, legal) {
            Some(heading) => {
                self.state.heading = heading;
                self.state.goal = Some(Cell::new(here.x + heading.0, here.y + heading.1, here.z));
                self.state.frozen = false;
            }
            None => {
                if !self.state.frozen {
                    debug!(x = here.x, y = here.y, "monster_frozen");
                }
                self.state.frozen = true;
            }
        }
    }
}

impl Sprite for Monster {
    fn kind(&self) -> SpriteKind {
        SpriteKind::Monster
    }

    fn advance(&mut self, ctx: &mut PhaseContext<'_>) -> PhaseOutput {
        if self.state.goal.is_none() {
            self.choose_goal(&ctx.world);
        }
        let Some(goal) = self.state.goal else {
            return PhaseOutput::none();
        };

        let target = goal.point();
        let dx = target.x - self.state.position.x;
        let dy = target.y - self.state.position.y;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance <= MONSTER_SPEED {
            self.state.position = target;
            self.state.goal = None;
        } else {
            let scale = MONSTER_SPEED / distance;
            self.state.position = self.state.position.offset(dx * scale, dy * scale, 0.0);
        }
        PhaseOutput::none()
    }

    fn draw(&self, canvas: &mut Canvas, ctx: &DrawContext<'_>) {
        draw_in_world(canvas, ctx, &self.camera, &self.image, self.state.position);
    }

    fn observe_arrival(&mut self, handle: SpriteHandle, arrival: &dyn Sprite) -> bool {
        self.camera.observe_arrival(handle, arrival);
        false
    }

    fn observe_departure(&mut self, handle: SpriteHandle) {
        self.camera.observe_departure(handle);
    }

    fn position(&self) -> Option<Point3> {
        Some(self.state.position)
    }

    fn save_record(&self) -> Option<SpriteRecord> {
        SpriteRecord::of(SpriteKind::Monster, &self.state)
    }
}

/// Passive pickup; the player finds it and asks for its removal.
#[derive(Debug, Clone)]
pub(crate) struct Coin {
    position: Point3,
    bob: u32,
    image: Arc<IndexedImage>,
    camera: CameraLink,
}

#[derive(Debug, Serialize, Deserialize)]
struct CoinState {
    position: Point3,
    bob: u32,
}

impl Coin {
    pub(crate) fn new(at: Cell, assets: &Assets) -> Result<Self, AssetError> {
        Ok(Self {
            position: at.point(),
            bob: 0,
            image: assets.image("coin")?,
            camera: CameraLink::default(),
        })
    }

    pub(crate) fn from_record(record: &SpriteRecord, assets: &Assets) -> Result<Self, SaveError> {
        let CoinState { position, bob } = decode_record(record)?;
        Ok(Self {
            position,
            bob: bob % COIN_BOB_PERIOD,
            image: assets.image("coin")?,
            camera: CameraLink::default(),
        })
    }
}

impl Sprite for Coin {
    fn kind(&self) -> SpriteKind {
        SpriteKind::Pickup
    }

    fn advance(&mut self, _ctx: &mut PhaseContext<'_>) -> PhaseOutput {
        self.bob = (self.bob + 1) % COIN_BOB_PERIOD;
        PhaseOutput::none()
    }

    fn draw(&self, canvas: &mut Canvas, ctx: &DrawContext<'_>) {
        let lift = if self.bob < COIN_BOB_PERIOD / 2 { 1.0 } else { 2.0 };
        draw_in_world(
            canvas,
            ctx,
            &self.camera,
            &self.image,
            self.position.offset(0.0, 0.0, lift),
        );
    }

    fn observe_arrival(&mut self, handle: SpriteHandle, arrival: &dyn Sprite) -> bool {
        self.camera.observe_arrival(handle, arrival);
        false
    }

    fn observe_departure(&mut self, handle: SpriteHandle) {
        self.camera.observe_departure(handle);
    }

    fn position(&self) -> Option<Point3> {
        Some(self.position)
    }

    fn save_record(&self) -> Option<SpriteRecord> {
        let state = CoinState {
            position: self.position,
            bob: self.bob,
        };
        SpriteRecord::of(SpriteKind::Pickup, &state)
    }
}
