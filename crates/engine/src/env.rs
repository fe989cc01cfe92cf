use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::app::InputSnapshot;
use crate::canvas::Projection;

/// Fire-and-forget audio hooks. Nothing in the core reads a result back.
pub trait AudioSink {
    fn play(&mut self, cue: &str);
    fn loop_cue(&mut self, cue: &str);
}

/// Default sink that only records cues in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingAudio;

impl AudioSink for LoggingAudio {
    fn play(&mut self, cue: &str) {
        debug!(cue, "audio_play");
    }

    fn loop_cue(&mut self, cue: &str) {
        debug!(cue, "audio_loop");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenGeometry {
    pub width: u32,
    pub height: u32,
    pub origin_x: i32,
    pub origin_y: i32,
    pub block_px: i32,
}

impl ScreenGeometry {
    /// Screen centred on the lattice origin.
    pub fn centred(width: u32, height: u32, block_px: i32) -> Self {
        Self {
            width,
            height,
            origin_x: width as i32 / 2,
            origin_y: height as i32 / 2,
            block_px,
        }
    }

    pub fn projection(&self) -> Projection {
        Projection::new((self.origin_x, self.origin_y), self.block_px)
    }
}

/// Services the core consults synchronously during a tick.
pub struct Environment {
    rng: ChaCha8Rng,
    screen: ScreenGeometry,
    input: InputSnapshot,
    audio: Box<dyn AudioSink>,
    tick: u64,
}

impl Environment {
    pub fn new(seed: u64, screen: ScreenGeometry) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            screen,
            input: InputSnapshot::empty(),
            audio: Box::new(LoggingAudio),
            tick: 0,
        }
    }

    pub fn with_audio(mut self, audio: Box<dyn AudioSink>) -> Self {
        self.audio = audio;
        self
    }

    pub fn screen(&self) -> ScreenGeometry {
        self.screen
    }

    pub fn projection(&self) -> Projection {
        self.screen.projection()
    }

    pub fn input(&self) -> &InputSnapshot {
        &self.input
    }

    pub fn set_input(&mut self, input: InputSnapshot) {
        self.input = input;
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn advance_tick(&mut self) {
        self.tick = self.tick.saturating_add(1);
    }

    pub(crate) fn resume_at(&mut self, tick: u64) {
        self.tick = tick;
    }

    /// Uniform draw in `[0, 1)`.
    pub fn uniform(&mut self) -> f32 {
        self.rng.random::<f32>()
    }

    /// Uniform integer in `[0, bound)`; zero when `bound` is zero.
    pub fn below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.rng.random_range(0..bound)
    }

    /// Uniform draw in `[min, max)`; returns `min` for an empty range.
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.rng.random_range(min..max)
    }

    pub fn play(&mut self, cue: &str) {
        self.audio.play(cue);
    }

    pub fn loop_cue(&mut self, cue: &str) {
        self.audio.loop_cue(cue);
    }
}

/// Wraps `value` into `[0, modulus)`. A non-positive modulus yields zero.
pub fn fold(value: i32, modulus: i32) -> i32 {
    if modulus <= 0 {
        return 0;
    }
    value.rem_euclid(modulus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_wraps_negative_and_large_values() {
        assert_eq!(fold(-1, 8), 7);
        assert_eq!(fold(17, 8), 1);
        assert_eq!(fold(3, 8), 3);
        assert_eq!(fold(5, 0), 0);
    }

    #[test]
    fn same_seed_draws_same_sequence() {
        let screen = ScreenGeometry::centred(64, 48, 2);
        let mut a = Environment::new(9, screen);
        let mut b = Environment::new(9, screen);
        for _ in 0..8 {
            assert_eq!(a.uniform().to_bits(), b.uniform().to_bits());
            assert_eq!(a.below(10), b.below(10));
        }
    }

    #[test]
    fn draws_stay_in_range() {
        let mut env = Environment::new(1, ScreenGeometry::centred(8, 8, 1));
        for _ in 0..200 {
            let value = env.uniform();
            assert!((0.0..1.0).contains(&value));
            assert!(env.below(3) < 3);
            let ranged = env.range_f32(-2.0, 2.0);
            assert!((-2.0..2.0).contains(&ranged));
        }
        assert_eq!(env.below(0), 0);
        assert_eq!(env.range_f32(1.0, 1.0), 1.0);
    }

    #[test]
    fn centred_screen_projects_origin_to_middle() {
        let screen = ScreenGeometry::centred(320, 200, 4);
        let projection = screen.projection();
        assert_eq!((projection.origin_x, projection.origin_y), (160, 100));
        assert_eq!(projection.block_px, 4);
    }
}
