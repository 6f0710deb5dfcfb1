use super::backend::GpuBackend;
use super::pass::FullscreenPass;
use crate::error::ResourceError;
use crate::timeline::AccumulationMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulationState {
    /// Mode `none`: frames pass straight through.
    Idle,
    StepActive,
}

/// Double-buffered feedback around the particle draw.
///
/// Per active frame: [`AccumulationEngine::pre_pass`] decays the history into
/// the write slot and swaps, the caller draws its particles, then
/// [`AccumulationEngine::post_pass`] folds the particles into the history,
/// composites both into the write slot and trades that slot for the caller's
/// particle buffer.
pub struct AccumulationEngine<B: GpuBackend> {
    mode: AccumulationMode,
    slots: [B::Framebuffer; 2],
    read: usize,
    width: u32,
    height: u32,
}

impl<B: GpuBackend> AccumulationEngine<B> {
    /// Both slots start at 1x1 until the first [`AccumulationEngine::resize`].
    pub fn new(backend: &mut B, mode: AccumulationMode) -> Result<Self, ResourceError> {
        let a = backend.create_framebuffer("accumulation-a", 1, 1)?;
        let b = backend.create_framebuffer("accumulation-b", 1, 1)?;
        Ok(Self {
            mode,
            slots: [a, b],
            read: 0,
            width: 1,
            height: 1,
        })
    }

    pub fn mode(&self) -> AccumulationMode {
        self.mode
    }

    pub fn set_mode(&mut self, backend: &mut B, mode: AccumulationMode) {
        if mode == self.mode {
            return;
        }
        log::info!("Accumulation mode: {} -> {mode}", self.mode);
        if self.mode == AccumulationMode::None {
            // Don't resurrect trails from the last time accumulation was on.
            for slot in &self.slots {
                backend.clear(slot, [0.0, 0.0, 0.0, 0.0]);
            }
        }
        self.mode = mode;
    }

    pub fn state(&self) -> AccumulationState {
        if self.mode == AccumulationMode::None {
            AccumulationState::Idle
        } else {
            AccumulationState::StepActive
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == AccumulationState::StepActive
    }

    pub fn read_index(&self) -> usize {
        self.read
    }

    pub fn read(&self) -> &B::Framebuffer {
        &self.slots[self.read]
    }

    pub fn write(&self) -> &B::Framebuffer {
        &self.slots[1 - self.read]
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn resize(&mut self, backend: &mut B, width: u32, height: u32) -> Result<(), ResourceError> {
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        for slot in &mut self.slots {
            backend.resize_framebuffer(slot, width, height)?;
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Decay the history into the write slot, then swap read and write.
    pub fn pre_pass(&mut self, backend: &mut B) {
        let Some(step) = FullscreenPass::step(self.mode, self.width, self.height) else {
            return;
        };
        backend.run_pass(&step, &[self.read()], self.write());
        self.read = 1 - self.read;
    }

    /// Fold `particles` into the history and composite.
    ///
    /// On return `particles` holds the composited frame, ready to present,
    /// and the engine owns the buffer the caller drew into as its next write
    /// slot. With accumulation off `particles` is left untouched.
    pub fn post_pass(&mut self, backend: &mut B, particles: &mut B::Framebuffer) {
        if !self.is_active() {
            return;
        }
        backend.run_pass(&FullscreenPass::apply(), &[&*particles], self.read());
        backend.run_pass(
            &FullscreenPass::composite(),
            &[&*particles, self.read()],
            self.write(),
        );
        let write = 1 - self.read;
        std::mem::swap(&mut self.slots[write], particles);
    }
}
