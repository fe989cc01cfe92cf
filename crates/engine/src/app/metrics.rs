use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LockResult, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

static POISON_REPORTED: AtomicBool = AtomicBool::new(false);

/// Takes the guard out of a poisoned lock. The snapshot is plain data, so a
/// writer that panicked mid-update cannot leave it half-built.
fn recover<G>(result: LockResult<G>, operation: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        if !POISON_REPORTED.swap(true, Ordering::Relaxed) {
            warn!(operation, "metrics_lock_poisoned");
        }
        poisoned.into_inner()
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    /// Live sprites after the last tick of the interval.
    pub sprite_count: usize,
    /// Most distinct colours seen on one presented canvas during the interval.
    pub peak_colours: usize,
}

/// Read side of the loop metrics; clones share the same snapshot.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        *recover(self.latest.read(), "read")
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        *recover(self.latest.write(), "write") = snapshot;
    }
}

#[derive(Debug, Default)]
struct Tally {
    frames: u32,
    ticks: u32,
    frame_time: Duration,
    peak_colours: usize,
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval: Duration,
    started: Instant,
    tally: Tally,
    sprite_count: usize,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            started: Instant::now(),
            tally: Tally::default(),
            sprite_count: 0,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_time: Duration, colours: usize) {
        let tally = &mut self.tally;
        tally.frames = tally.frames.saturating_add(1);
        tally.frame_time = tally.frame_time.saturating_add(frame_time);
        tally.peak_colours = tally.peak_colours.max(colours);
    }

    pub(crate) fn record_tick(&mut self, sprite_count: usize) {
        self.tally.ticks = self.tally.ticks.saturating_add(1);
        self.sprite_count = sprite_count;
    }

    /// Closes the interval once it has run its length, starting a new one.
    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed < self.interval {
            return None;
        }
        self.started = now;
        let tally = std::mem::take(&mut self.tally);

        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = match tally.frames {
            0 => 0.0,
            frames => tally.frame_time.as_secs_f32() * 1000.0 / frames as f32,
        };
        Some(LoopMetricsSnapshot {
            fps: tally.frames as f32 / seconds,
            tps: tally.ticks as f32 / seconds,
            frame_time_ms,
            sprite_count: self.sprite_count,
            peak_colours: tally.peak_colours,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn snapshot_reports_rates_and_world_figures() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        let base = Instant::now();

        accumulator.record_frame(Duration::from_millis(16), 9);
        accumulator.record_frame(Duration::from_millis(16), 12);
        for sprite_count in [3, 4, 4, 5] {
            accumulator.record_tick(sprite_count);
        }

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("snapshot should be emitted");

        assert!((snapshot.fps - 2.0).abs() < 0.05);
        assert!((snapshot.tps - 4.0).abs() < 0.05);
        assert!((snapshot.frame_time_ms - 16.0).abs() < 0.001);
        assert_eq!(snapshot.sprite_count, 5);
        assert_eq!(snapshot.peak_colours, 12);
    }

    #[test]
    fn interval_figures_reset_but_sprite_count_carries() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        let base = Instant::now();
        accumulator.record_frame(Duration::from_millis(16), 14);
        accumulator.record_tick(7);
        accumulator.maybe_snapshot(base + Duration::from_secs(1));

        accumulator.record_frame(Duration::from_millis(16), 3);
        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(3))
            .expect("second snapshot");
        assert_eq!(snapshot.peak_colours, 3);
        assert_eq!(snapshot.tps, 0.0);
        assert_eq!(snapshot.sprite_count, 7);
    }

    #[test]
    fn nothing_is_reported_mid_interval() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        let base = Instant::now();
        accumulator.record_frame(Duration::from_millis(16), 1);

        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(500))
            .is_none());
    }

    #[test]
    fn poisoned_handle_still_reads_and_publishes() {
        let handle = MetricsHandle::default();
        let shared = handle.clone();
        let _ = thread::spawn(move || {
            let _guard = shared.latest.write().expect("write guard");
            panic!("poison metrics lock");
        })
        .join();

        assert_eq!(handle.snapshot(), LoopMetricsSnapshot::default());
        let expected = LoopMetricsSnapshot {
            fps: 15.0,
            tps: 30.0,
            frame_time_ms: 11.0,
            sprite_count: 42,
            peak_colours: 16,
        };
        handle.publish(expected);
        assert_eq!(handle.snapshot(), expected);
    }
}
