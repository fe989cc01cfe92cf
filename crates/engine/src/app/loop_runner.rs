use std::cell::RefCell;
use std::env;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::assets::AssetError;
use crate::canvas::{Canvas, Palette};
use crate::env::{Environment, ScreenGeometry};
use crate::persistence::{load_world, save_world, SaveError, SaveProvider, WorldFactory};
use crate::story::{Story, StoryRunner};
use crate::StartupError;

use super::input::InputCollector;
use super::metrics::MetricsAccumulator;
use super::{InputSnapshot, MetricsHandle, Renderer};

pub const SLOW_FRAME_ENV_VAR: &str = "LATTICE_SLOW_FRAME_MS";
pub const SEED_ENV_VAR: &str = "LATTICE_SEED";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Window pixels per canvas pixel.
    pub pixel_scale: u32,
    /// Pixels per block unit in the isometric projection.
    pub block_px: i32,
    pub background: u8,
    pub palette: Palette,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
    pub seed: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Lattice".to_string(),
            canvas_width: 320,
            canvas_height: 200,
            pixel_scale: 3,
            block_px: 4,
            background: 0,
            palette: Palette::default(),
            target_tps: 30,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
            seed: 0x1a77_1ce,
        }
    }
}

impl LoopConfig {
    pub fn screen(&self) -> ScreenGeometry {
        ScreenGeometry::centred(self.canvas_width, self.canvas_height, self.block_px)
    }

    fn window_size(&self) -> LogicalSize<f64> {
        let scale = self.pixel_scale.max(1);
        LogicalSize::new(
            f64::from(self.canvas_width * scale),
            f64::from(self.canvas_height * scale),
        )
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load assets: {0}")]
    Assets(#[from] AssetError),
    #[error("failed to restore saved world: {0}")]
    Save(#[from] SaveError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Everything the game hands the loop: the opening story, how to rebuild
/// saved worlds, and where saves go.
pub struct GameSetup {
    pub story: Box<dyn Story>,
    pub factory: Box<dyn WorldFactory>,
    pub save_slot: Box<dyn SaveProvider>,
}

pub fn run_app(config: LoopConfig, setup: GameSetup) -> Result<(), AppError> {
    run_app_with_metrics(config, setup, MetricsHandle::default())
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    setup: GameSetup,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let seed = env_override(SEED_ENV_VAR, config.seed);
    let mut session = Session::new(setup, seed, config.screen());
    let mut canvas = Canvas::new(config.canvas_width, config.canvas_height, config.background);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(config.window_size())
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(
        Arc::clone(&window),
        config.canvas_width,
        config.canvas_height,
        config.palette.clone(),
    )
    .map_err(AppError::CreateRenderer)?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let slow_frame_delay =
        Duration::from_millis(env_override(SLOW_FRAME_ENV_VAR, config.simulated_slow_frame_ms));
    let mut pacer = FramePacer::new(&config, Instant::now());
    let mut metrics = MetricsAccumulator::new(non_zero_or(
        config.metrics_log_interval,
        Duration::from_secs(1),
    ));
    let mut input = InputCollector::default();
    let mut palette_budget_warned = false;
    let fatal: Rc<RefCell<Option<AppError>>> = Rc::default();
    let fatal_in_loop = Rc::clone(&fatal);

    info!(
        story = session.runner.story_name(),
        seed,
        canvas_width = config.canvas_width,
        canvas_height = config.canvas_height,
        "story_loaded"
    );
    info!(
        tick_ms = pacer.tick.as_secs_f64() * 1000.0,
        max_frame_delta_ms = pacer.max_frame_delta.as_millis() as u64,
        max_ticks_per_frame = pacer.max_ticks_per_frame,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = ?config.max_render_fps.filter(|fps| *fps > 0),
        "loop_config"
    );

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input.request_quit();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input.handle_key_event(&event);
                    if input.quit_requested() {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if !slow_frame_delay.is_zero() {
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let budget = pacer.begin_frame(now);
                    for _ in 0..budget.ticks {
                        match session.tick(input.snapshot_for_tick()) {
                            Ok(sprite_count) => metrics.record_tick(sprite_count),
                            Err(err) => {
                                error!(
                                    error = %err,
                                    story = session.runner.story_name(),
                                    "story_failed"
                                );
                                fatal_in_loop.replace(Some(AppError::Assets(err)));
                                window_target.exit();
                                return;
                            }
                        }
                    }
                    if !budget.dropped.is_zero() {
                        warn!(
                            dropped_backlog_ms = budget.dropped.as_millis() as u64,
                            max_ticks_per_frame = pacer.max_ticks_per_frame,
                            "sim_clamp_triggered"
                        );
                    }

                    let cap_sleep = pacer.cap_sleep(Instant::now());
                    if !cap_sleep.is_zero() {
                        thread::sleep(cap_sleep);
                    }

                    session.runner.draw(&mut canvas);
                    let colours = canvas.distinct_colours();
                    match canvas.check_palette_budget() {
                        Err(budget) if !palette_budget_warned => {
                            warn!(
                                used = budget.used,
                                limit = budget.limit,
                                "palette_budget_exceeded"
                            );
                            palette_budget_warned = true;
                        }
                        _ => {}
                    }
                    if let Err(error) = renderer.present(&canvas) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    pacer.presented(Instant::now());
                    metrics.record_frame(budget.frame_time, colours);

                    if let Some(snapshot) = metrics.maybe_snapshot(now) {
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            sprite_count = snapshot.sprite_count,
                            peak_colours = snapshot.peak_colours,
                            story = session.runner.story_name(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => window.request_redraw(),
            Event::LoopExiting => info!(tick = session.runner.env().tick(), "shutdown"),
            _ => {}
        })
        .map_err(AppError::EventLoopRun)?;

    match fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// The running world plus the pieces needed to save it and bring it back.
struct Session {
    runner: StoryRunner,
    factory: Box<dyn WorldFactory>,
    save_slot: Box<dyn SaveProvider>,
    seed: u64,
    screen: ScreenGeometry,
}

impl Session {
    fn new(setup: GameSetup, seed: u64, screen: ScreenGeometry) -> Self {
        Self {
            runner: StoryRunner::new(setup.story, Environment::new(seed, screen)),
            factory: setup.factory,
            save_slot: setup.save_slot,
            seed,
            screen,
        }
    }

    /// Saves and loads happen before the tick that sampled the key, so the
    /// world on disk is always a between-ticks world.
    fn tick(&mut self, input: InputSnapshot) -> Result<usize, AssetError> {
        if input.save_pressed() {
            if let Err(error) = save_world(&self.runner, self.save_slot.as_mut()) {
                warn!(error = %error, "save_failed");
            }
        }
        if input.load_pressed() {
            self.load();
        }
        Ok(self.runner.tick(input)?.sprite_count)
    }

    fn load(&mut self) {
        let env = Environment::new(self.seed, self.screen);
        match load_world(self.save_slot.as_ref(), self.factory.as_ref(), env) {
            Ok(Some(restored)) => self.runner = restored,
            Ok(None) => info!("no_save_to_load"),
            Err(error) => warn!(error = %error, "load_failed"),
        }
    }
}

/// Fixed-timestep bookkeeping. Wall-clock frame time (clamped) accrues into a
/// backlog that is paid out in whole ticks; whatever is still owed past the
/// per-frame tick cap is dropped.
#[derive(Debug)]
struct FramePacer {
    tick: Duration,
    max_frame_delta: Duration,
    max_ticks_per_frame: u32,
    render_interval: Option<Duration>,
    backlog: Duration,
    last_frame: Instant,
    last_present: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameBudget {
    frame_time: Duration,
    ticks: u32,
    dropped: Duration,
}

impl FramePacer {
    fn new(config: &LoopConfig, now: Instant) -> Self {
        let per_second = |rate: u32| Duration::from_secs_f64(1.0 / f64::from(rate));
        Self {
            tick: per_second(config.target_tps.max(1)),
            max_frame_delta: non_zero_or(config.max_frame_delta, Duration::from_millis(250)),
            max_ticks_per_frame: config.max_ticks_per_frame.max(1),
            render_interval: config.max_render_fps.filter(|fps| *fps > 0).map(per_second),
            backlog: Duration::ZERO,
            last_frame: now,
            last_present: now,
        }
    }

    fn begin_frame(&mut self, now: Instant) -> FrameBudget {
        let frame_time = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;
        self.backlog = self
            .backlog
            .saturating_add(frame_time.min(self.max_frame_delta));

        let owed = self.backlog.as_nanos() / self.tick.as_nanos().max(1);
        let ticks = owed.min(u128::from(self.max_ticks_per_frame)) as u32;
        self.backlog = self.backlog.saturating_sub(self.tick * ticks);
        let dropped = if self.backlog >= self.tick {
            std::mem::take(&mut self.backlog)
        } else {
            Duration::ZERO
        };
        FrameBudget {
            frame_time,
            ticks,
            dropped,
        }
    }

    /// How long to wait before presenting to stay under the render cap.
    fn cap_sleep(&self, now: Instant) -> Duration {
        self.render_interval.map_or(Duration::ZERO, |interval| {
            interval.saturating_sub(now.saturating_duration_since(self.last_present))
        })
    }

    fn presented(&mut self, now: Instant) {
        self.last_present = now;
    }
}

fn non_zero_or(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn env_override(var: &'static str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(raw) => parse_override(var, &raw).unwrap_or(fallback),
        Err(env::VarError::NotPresent) => fallback,
        Err(error) => {
            warn!(env_var = var, error = %error, "env_override_unreadable");
            fallback
        }
    }
}

fn parse_override(var: &'static str, raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(value) => {
            debug!(env_var = var, value, "env_override_applied");
            Some(value)
        }
        Err(_) => {
            warn!(env_var = var, raw, "env_override_invalid");
            None
        }
    }
}
