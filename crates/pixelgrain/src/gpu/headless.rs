use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use super::backend::GpuBackend;
use super::pass::FullscreenPass;
use crate::command::DrawCommand;
use crate::error::ResourceError;
use crate::shader::UniformValue;

const BYTES_PER_PIXEL: u64 = 4;

/// Handle to a framebuffer that only exists as bookkeeping.
#[derive(Debug, PartialEq, Eq)]
pub struct HeadlessFramebuffer {
    id: u64,
    label: String,
    width: u32,
    height: u32,
}

impl HeadlessFramebuffer {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// One recorded backend call. Framebuffers are referred to by id.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Clear {
        target: u64,
        color: [f32; 4],
    },
    Draw {
        target: u64,
        count: u32,
        uniforms: BTreeMap<String, UniformValue>,
    },
    Pass {
        label: &'static str,
        inputs: Vec<u64>,
        target: u64,
    },
    Present {
        source: u64,
    },
}

/// A backend that records what it is asked to do instead of rendering.
///
/// Used by tests and the command-line driver. An optional byte budget makes
/// allocations fail once exceeded, the same way an exhausted device would.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u64,
    allocated: FxHashMap<u64, u64>,
    budget: Option<u64>,
    ops: Vec<Op>,
    frames_presented: u64,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail allocations that would take the live total above `bytes`.
    pub fn with_budget(bytes: u64) -> Self {
        Self {
            budget: Some(bytes),
            ..Self::default()
        }
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Take the recorded calls, leaving the log empty.
    pub fn take_ops(&mut self) -> Vec<Op> {
        std::mem::take(&mut self.ops)
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn allocated_bytes(&self) -> u64 {
        self.allocated.values().sum()
    }

    fn reserve(&mut self, id: u64, label: &str, width: u32, height: u32) -> Result<(), ResourceError> {
        let bytes = u64::from(width) * u64::from(height) * BYTES_PER_PIXEL;
        let others: u64 = self
            .allocated
            .iter()
            .filter(|(other, _)| **other != id)
            .map(|(_, b)| *b)
            .sum();
        if let Some(budget) = self.budget
            && others + bytes > budget
        {
            log::error!("Framebuffer '{label}' ({width}x{height}) exceeds the {budget} byte budget");
            return Err(ResourceError::FramebufferAllocation {
                label: label.to_string(),
                width,
                height,
            });
        }
        self.allocated.insert(id, bytes);
        Ok(())
    }
}

impl GpuBackend for HeadlessBackend {
    type Framebuffer = HeadlessFramebuffer;

    fn create_framebuffer(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<HeadlessFramebuffer, ResourceError> {
        let (width, height) = (width.max(1), height.max(1));
        let id = self.next_id;
        self.reserve(id, label, width, height)?;
        self.next_id += 1;
        Ok(HeadlessFramebuffer {
            id,
            label: label.to_string(),
            width,
            height,
        })
    }

    fn resize_framebuffer(
        &mut self,
        target: &mut HeadlessFramebuffer,
        width: u32,
        height: u32,
    ) -> Result<(), ResourceError> {
        let (width, height) = (width.max(1), height.max(1));
        if target.size() == (width, height) {
            return Ok(());
        }
        self.reserve(target.id, &target.label, width, height)?;
        log::debug!(
            "Resized framebuffer '{}' to {width}x{height}",
            target.label
        );
        target.width = width;
        target.height = height;
        Ok(())
    }

    fn clear(&mut self, target: &HeadlessFramebuffer, color: [f32; 4]) {
        self.ops.push(Op::Clear {
            target: target.id,
            color,
        });
    }

    fn draw(
        &mut self,
        target: &HeadlessFramebuffer,
        command: &DrawCommand,
        uniforms: &BTreeMap<String, UniformValue>,
    ) {
        self.ops.push(Op::Draw {
            target: target.id,
            count: command.count,
            uniforms: uniforms.clone(),
        });
    }

    fn run_pass(
        &mut self,
        pass: &FullscreenPass,
        inputs: &[&HeadlessFramebuffer],
        target: &HeadlessFramebuffer,
    ) {
        self.ops.push(Op::Pass {
            label: pass.label,
            inputs: inputs.iter().map(|fb| fb.id).collect(),
            target: target.id,
        });
    }

    fn present(&mut self, source: &HeadlessFramebuffer) {
        self.frames_presented += 1;
        self.ops.push(Op::Present { source: source.id });
    }
}
