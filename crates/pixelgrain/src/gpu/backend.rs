use std::collections::BTreeMap;

use super::pass::FullscreenPass;
use crate::command::DrawCommand;
use crate::error::ResourceError;
use crate::shader::UniformValue;

/// The graphics binding the renderer drives.
///
/// Framebuffers are owned values: whoever holds one decides what is drawn
/// into it next, which is what lets the accumulation engine hand buffers back
/// and forth with a plain move.
pub trait GpuBackend {
    type Framebuffer;

    fn create_framebuffer(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<Self::Framebuffer, ResourceError>;

    /// Reallocate `target` at a new size. Contents are undefined afterwards.
    fn resize_framebuffer(
        &mut self,
        target: &mut Self::Framebuffer,
        width: u32,
        height: u32,
    ) -> Result<(), ResourceError>;

    fn clear(&mut self, target: &Self::Framebuffer, color: [f32; 4]);

    /// Draw `command` with uniforms already resolved for this frame.
    fn draw(
        &mut self,
        target: &Self::Framebuffer,
        command: &DrawCommand,
        uniforms: &BTreeMap<String, UniformValue>,
    );

    /// Run a fullscreen fragment pass sampling `inputs` in order.
    fn run_pass(
        &mut self,
        pass: &FullscreenPass,
        inputs: &[&Self::Framebuffer],
        target: &Self::Framebuffer,
    );

    fn present(&mut self, source: &Self::Framebuffer);
}
