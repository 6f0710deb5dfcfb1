use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Instant;

use crate::clock::{ClockEvent, FrameContext, RenderClock};
use crate::command::{BuildTicket, CommandBuilder, CommandSlot, DrawCommand};
use crate::effect::{EffectRegistry, RenderProps};
use crate::error::{ConfigError, EffectError, ErrorInbox, ErrorReporter, RenderError, error_channel};
use crate::gpu::{AccumulationEngine, GpuBackend};
use crate::particle::ParticleGrid;
use crate::timeline::TimelineConfig;

type BuildFuture = Pin<Box<dyn Future<Output = DrawCommand>>>;

struct PendingBuild {
    ticket: BuildTicket,
    future: BuildFuture,
}

/// What happened during one [`Renderer::frame`].
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub time: f64,
    pub delta: f64,
    /// A command was drawn (false until the first build lands).
    pub drew: bool,
    /// A build finished and was installed this frame.
    pub installed: bool,
    /// Non-fatal errors drained at the start of the frame.
    pub errors: Vec<EffectError>,
}

/// Owns everything the per-frame loop touches.
///
/// Rebuilds start on [`Renderer::set_timeline`] and are polled once per frame
/// without blocking; the previous command keeps drawing until the new one
/// resolves. The loop itself never awaits. Superseded builds keep being
/// polled until they resolve so their teardown hooks run.
pub struct Renderer<B: GpuBackend> {
    backend: B,
    registry: Arc<EffectRegistry>,
    config: Arc<TimelineConfig>,
    image: Option<Arc<image::RgbaImage>>,
    grid: Arc<ParticleGrid>,
    clock: RenderClock,
    slot: CommandSlot,
    pending: Option<PendingBuild>,
    retired: Vec<PendingBuild>,
    reporter: ErrorReporter,
    inbox: ErrorInbox,
    accumulation: AccumulationEngine<B>,
    particles: B::Framebuffer,
    width: u32,
    height: u32,
    frames: u64,
}

impl<B: GpuBackend> Renderer<B> {
    pub fn new(
        mut backend: B,
        registry: Arc<EffectRegistry>,
        config: TimelineConfig,
    ) -> Result<Self, RenderError> {
        config.validate()?;
        let grid = ParticleGrid::gradient(config.particle_grid_width, config.particle_grid_height)?;
        let accumulation = AccumulationEngine::new(&mut backend, config.accumulation)?;
        let particles = backend.create_framebuffer("particles", 1, 1)?;
        let (reporter, inbox) = error_channel();
        let mut clock = RenderClock::new(config.duration());
        clock.on_event(|event| {
            if event == ClockEvent::Wrapped {
                log::debug!("Timeline looped");
            }
        });

        let mut renderer = Self {
            backend,
            registry,
            config: Arc::new(config),
            image: None,
            grid: Arc::new(grid),
            clock,
            slot: CommandSlot::new(),
            pending: None,
            retired: Vec::new(),
            reporter,
            inbox,
            accumulation,
            particles,
            width: 1,
            height: 1,
            frames: 0,
        };
        renderer.rebuild()?;
        Ok(renderer)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn clock(&self) -> &RenderClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut RenderClock {
        &mut self.clock
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn grid(&self) -> &ParticleGrid {
        &self.grid
    }

    pub fn command(&self) -> Option<&DrawCommand> {
        self.slot.active()
    }

    pub fn accumulation(&self) -> &AccumulationEngine<B> {
        &self.accumulation
    }

    pub fn is_building(&self) -> bool {
        self.pending.is_some()
    }

    /// Reporter handed to builds; clone it to report from elsewhere.
    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Replace the timeline and start a rebuild.
    ///
    /// Configuration errors are returned before anything changes; the
    /// previous timeline stays active.
    pub fn set_timeline(&mut self, config: TimelineConfig) -> Result<(), ConfigError> {
        let builder = CommandBuilder::new(&config, &self.registry)?;
        let grid = sample_grid(self.image.as_deref(), &config)?;

        self.clock.set_period(config.duration());
        self.accumulation
            .set_mode(&mut self.backend, config.accumulation);
        self.config = Arc::new(config);
        self.grid = Arc::new(grid);
        self.start_build(builder);
        Ok(())
    }

    /// Sample particles from `image` (or the gradient for `None`) and rebuild.
    pub fn set_image(&mut self, image: Option<image::RgbaImage>) -> Result<(), ConfigError> {
        let image = image.map(Arc::new);
        let builder = CommandBuilder::new(&self.config, &self.registry)?;
        let grid = sample_grid(image.as_deref(), &self.config)?;

        self.image = image;
        self.grid = Arc::new(grid);
        self.start_build(builder);
        Ok(())
    }

    /// Start building a command for the current timeline, superseding any
    /// build still in flight.
    pub fn rebuild(&mut self) -> Result<(), ConfigError> {
        let builder = CommandBuilder::new(&self.config, &self.registry)?;
        self.start_build(builder);
        Ok(())
    }

    fn start_build(&mut self, builder: CommandBuilder) {
        let ticket = self.slot.begin_build();
        if let Some(stale) = self.pending.take() {
            log::debug!("Superseding build {}", stale.ticket.generation());
            self.retired.push(stale);
        }

        let config = self.config.clone();
        let grid = self.grid.clone();
        let reporter = self.reporter.clone();
        let clock = self.clock.frame_context(self.width, self.height);
        let future: BuildFuture = Box::pin(async move {
            let props = RenderProps {
                config: &config,
                state: &grid,
                clock,
            };
            builder.build(&props, &reporter).await
        });
        self.pending = Some(PendingBuild { ticket, future });
        // Most builds finish without suspending; install them right away.
        self.poll_build();
    }

    /// Poll every outstanding build once. Returns whether a command was installed.
    fn poll_build(&mut self) -> bool {
        let mut cx = Context::from_waker(Waker::noop());

        let slot = &mut self.slot;
        self.retired.retain_mut(|stale| match stale.future.as_mut().poll(&mut cx) {
            Poll::Pending => true,
            Poll::Ready(command) => {
                slot.install(stale.ticket, command);
                false
            }
        });

        let Some(pending) = &mut self.pending else {
            return false;
        };
        match pending.future.as_mut().poll(&mut cx) {
            Poll::Pending => false,
            Poll::Ready(command) => {
                let ticket = pending.ticket;
                self.pending = None;
                self.slot.install(ticket, command)
            }
        }
    }

    /// Superseded builds that have not resolved yet.
    pub fn retired_builds(&self) -> usize {
        self.retired.len()
    }

    /// Block until the in-flight build resolves.
    pub fn finish_build(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        let command = pollster::block_on(pending.future);
        self.slot.install(pending.ticket, command)
    }

    /// Reallocate every framebuffer for a new viewport.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let (width, height) = (width.max(1), height.max(1));
        self.accumulation.resize(&mut self.backend, width, height)?;
        self.backend
            .resize_framebuffer(&mut self.particles, width, height)?;
        self.width = width;
        self.height = height;
        log::info!("Viewport resized to {width}x{height}");
        Ok(())
    }

    pub fn frame(&mut self) -> FrameReport {
        self.frame_at(Instant::now())
    }

    /// Run one frame at wall-clock instant `now`.
    pub fn frame_at(&mut self, now: Instant) -> FrameReport {
        let errors = self.inbox.drain();
        for error in &errors {
            log::error!("{error}");
        }

        self.clock.frame_at(now);
        let installed = self.poll_build();
        let frame = self.clock.frame_context(self.width, self.height);
        self.slot.run_frame_hooks(&frame);

        self.accumulation.pre_pass(&mut self.backend);
        let drew = self.draw_particles(&frame);
        self.accumulation
            .post_pass(&mut self.backend, &mut self.particles);
        self.backend.present(&self.particles);
        self.frames += 1;

        FrameReport {
            time: frame.time,
            delta: frame.delta,
            drew,
            installed,
            errors,
        }
    }

    fn draw_particles(&mut self, frame: &FrameContext) -> bool {
        let [r, g, b] = self.config.background_color;
        // Accumulated frames keep a transparent background so history shows through.
        let alpha = if self.accumulation.is_active() { 0.0 } else { 1.0 };
        self.backend.clear(&self.particles, [r, g, b, alpha]);
        let Some(command) = self.slot.active() else {
            return false;
        };
        let uniforms = command.resolve_uniforms(frame);
        self.backend.draw(&self.particles, command, &uniforms);
        true
    }
}

fn sample_grid(
    image: Option<&image::RgbaImage>,
    config: &TimelineConfig,
) -> Result<ParticleGrid, ConfigError> {
    let (w, h) = (config.particle_grid_width, config.particle_grid_height);
    match image {
        Some(image) => ParticleGrid::from_image(image, w, h, config.image_scaling),
        None => ParticleGrid::gradient(w, h),
    }
}

impl<B: GpuBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        self.slot.clear();
    }
}
