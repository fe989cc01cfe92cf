//! One controller sprite owning many lightweight points.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::canvas::{depth_offset, Canvas, Cell, Point3};
use crate::env::Environment;
use crate::persistence::SpriteRecord;
use crate::sprite::{
    CameraLink, DrawContext, PhaseContext, PhaseOutput, Sprite, SpriteHandle, SpriteKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    position: Point3,
    velocity: Point3,
    gravity: f32,
    colour: u8,
    age: u32,
    lifetime: u32,
}

impl Particle {
    pub fn new(position: Point3, velocity: Point3, gravity: f32, lifetime: u32) -> Self {
        Self {
            position,
            velocity,
            gravity,
            colour: 0,
            age: 0,
            lifetime,
        }
    }

    pub fn position(&self) -> Point3 {
        self.position
    }

    pub fn velocity(&self) -> Point3 {
        self.velocity
    }

    pub fn colour(&self) -> u8 {
        self.colour
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn lifetime(&self) -> u32 {
        self.lifetime
    }

    pub fn is_alive(&self) -> bool {
        self.age < self.lifetime
    }

    /// Position by velocity, then velocity by gravity, then age.
    pub fn integrate(&mut self) {
        self.position = self
            .position
            .offset(self.velocity.x, self.velocity.y, self.velocity.z);
        self.velocity.z += self.gravity;
        self.age = self.age.saturating_add(1).min(self.lifetime);
    }

    /// Cell tested against obstacles: the particle's own cell one pixel up.
    pub fn collision_cell(&self) -> Cell {
        Cell::new(
            self.position.x.round() as i32,
            self.position.y.round() as i32,
            (self.position.z + 1.0).round() as i32,
        )
    }
}

/// Colours a particle passes through over its life, youngest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColourRamp {
    colours: Vec<u8>,
}

impl ColourRamp {
    pub fn new(colours: &[u8]) -> Self {
        debug_assert!(!colours.is_empty(), "colour ramp needs at least one colour");
        Self {
            colours: colours.to_vec(),
        }
    }

    pub fn colour_for(&self, age: u32, lifetime: u32) -> u8 {
        let Some(last) = self.colours.len().checked_sub(1) else {
            return 0;
        };
        if lifetime == 0 {
            return self.colours[last];
        }
        let index = (age as usize * self.colours.len()) / lifetime as usize;
        self.colours[index.min(last)]
    }
}

/// Where new particles appear and how they are launched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Emission {
    pub origin: Point3,
    /// Ground-plane speed range in blocks per tick; direction is uniform.
    pub speed: (f32, f32),
    /// Initial vertical speed range in pixels per tick.
    pub lift: (f32, f32),
    pub gravity: f32,
    pub lifetime: (u32, u32),
}

impl Emission {
    pub fn at(origin: Point3) -> Self {
        Self {
            origin,
            speed: (0.0, 0.05),
            lift: (0.5, 1.0),
            gravity: -0.1,
            lifetime: (20, 40),
        }
    }

    pub fn emit(&self, env: &mut Environment) -> Particle {
        let angle = env.uniform() * TAU;
        let speed = env.range_f32(self.speed.0, self.speed.1);
        let lift = env.range_f32(self.lift.0, self.lift.1);
        let (shortest, longest) = self.lifetime;
        let lifetime = shortest + env.below(longest.saturating_sub(shortest) + 1);
        Particle::new(
            self.origin,
            Point3::new(speed * angle.cos(), speed * angle.sin(), lift),
            self.gravity,
            lifetime,
        )
    }
}

/// Particle controller sprite.
///
/// The collision countdown is decremented while positive; collisions are
/// checked only while it is exactly zero, and a negative countdown never
/// checks. Obstacles are the ones in the watch list, which holds only those
/// that block [`SpriteKind::Particles`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particles {
    particles: Vec<Particle>,
    emission: Emission,
    ramp: ColourRamp,
    particles_per_frame: f32,
    collision_countdown: i32,
    expire_when_empty: bool,
    #[serde(skip)]
    camera: CameraLink,
}

impl Particles {
    pub fn new(emission: Emission, ramp: ColourRamp) -> Self {
        Self {
            particles: Vec::new(),
            emission,
            ramp,
            particles_per_frame: 0.0,
            collision_countdown: 0,
            expire_when_empty: false,
            camera: CameraLink::default(),
        }
    }

    pub fn with_rate(mut self, particles_per_frame: f32) -> Self {
        self.particles_per_frame = particles_per_frame.max(0.0);
        self
    }

    pub fn with_collision_countdown(mut self, countdown: i32) -> Self {
        self.collision_countdown = countdown;
        self
    }

    /// Kill the controller once it has no particles and no spawn rate.
    pub fn expiring(mut self) -> Self {
        self.expire_when_empty = true;
        self
    }

    pub fn with_particle(mut self, mut particle: Particle) -> Self {
        particle.colour = self.ramp.colour_for(particle.age, particle.lifetime);
        self.particles.push(particle);
        self
    }

    pub fn burst(mut self, count: u32, env: &mut Environment) -> Self {
        for _ in 0..count {
            let particle = self.emission.emit(env);
            self = self.with_particle(particle);
        }
        self
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn rate(&self) -> f32 {
        self.particles_per_frame
    }

    pub fn set_rate(&mut self, particles_per_frame: f32) {
        self.particles_per_frame = particles_per_frame.max(0.0);
    }

    pub fn collision_countdown(&self) -> i32 {
        self.collision_countdown
    }

    pub fn from_record(record: &SpriteRecord) -> Result<Self, crate::persistence::SaveError> {
        record.decode()
    }

    /// Integer part always, fractional part as one more with that probability.
    fn spawn_count(&self, env: &mut Environment) -> u32 {
        if self.particles_per_frame <= 0.0 {
            return 0;
        }
        let whole = self.particles_per_frame.floor();
        let fraction = self.particles_per_frame - whole;
        let extra = fraction > 0.0 && env.uniform() < fraction;
        whole as u32 + u32::from(extra)
    }
}

impl Sprite for Particles {
    fn kind(&self) -> SpriteKind {
        SpriteKind::Particles
    }

    fn advance(&mut self, ctx: &mut PhaseContext<'_>) -> PhaseOutput {
        if self.collision_countdown > 0 {
            self.collision_countdown -= 1;
        }

        for _ in 0..self.spawn_count(ctx.env) {
            let particle = self.emission.emit(ctx.env);
            self.particles.push(particle);
        }

        let check_collisions = self.collision_countdown == 0;
        let world = ctx.world;
        let watching = ctx.watching;
        let ramp = &self.ramp;
        self.particles.retain_mut(|particle| {
            particle.integrate();
            if !particle.is_alive() {
                return false;
            }
            if check_collisions && !world.is_empty_among(particle.collision_cell(), watching) {
                return false;
            }
            particle.colour = ramp.colour_for(particle.age, particle.lifetime);
            true
        });

        if self.expire_when_empty && self.particles.is_empty() && self.particles_per_frame <= 0.0 {
            return PhaseOutput::kill_self();
        }
        PhaseOutput::none()
    }

    fn draw(&self, canvas: &mut Canvas, ctx: &DrawContext<'_>) {
        let camera = self.camera.offset(ctx);
        for particle in &self.particles {
            let screen = ctx.projection.project(particle.position, camera);
            canvas.plot(
                screen.x,
                screen.y,
                screen.depth + depth_offset::PARTICLE_HALO,
                particle.colour,
            );
        }
    }

    fn observe_arrival(&mut self, handle: SpriteHandle, arrival: &dyn Sprite) -> bool {
        self.camera.observe_arrival(handle, arrival);
        arrival
            .as_obstacle()
            .is_some_and(|obstacle| obstacle.blocks(SpriteKind::Particles))
    }

    fn observe_departure(&mut self, handle: SpriteHandle) {
        self.camera.observe_departure(handle);
    }

    fn position(&self) -> Option<Point3> {
        Some(self.emission.origin)
    }

    fn save_record(&self) -> Option<SpriteRecord> {
        SpriteRecord::of(SpriteKind::Particles, self)
    }
}
