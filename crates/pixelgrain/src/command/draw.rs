use std::collections::BTreeMap;

use serde::Serialize;

use super::hooks::HookList;
use crate::clock::FrameContext;
use crate::shader::{AttributeBinding, BindingTable, GlslType, UniformBinding, UniformValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Points,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BlendFactor {
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlendState {
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendState {
    pub const ADDITIVE: BlendState = BlendState {
        src: BlendFactor::One,
        dst: BlendFactor::One,
    };

    pub const ALPHA: BlendState = BlendState {
        src: BlendFactor::SrcAlpha,
        dst: BlendFactor::OneMinusSrcAlpha,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DepthState {
    pub enable: bool,
}

/// A fully assembled particle draw.
///
/// Built once per timeline change and drawn every frame until replaced.
/// Teardown hooks registered by effects run when the command is torn down,
/// never on drop, so a command that was only described is not torn down.
pub struct DrawCommand {
    pub primitive: Primitive,
    pub count: u32,
    pub attributes: BindingTable<AttributeBinding>,
    pub uniforms: BindingTable<UniformBinding>,
    pub vert: String,
    pub frag: String,
    pub depth: DepthState,
    /// `None` draws without blending.
    pub blend: Option<BlendState>,
    pub hooks: HookList,
}

impl DrawCommand {
    /// Evaluate every uniform for one frame.
    pub fn resolve_uniforms(&self, frame: &FrameContext) -> BTreeMap<String, UniformValue> {
        self.uniforms
            .iter()
            .map(|(name, entry)| (name.clone(), entry.value.resolve(frame)))
            .collect()
    }

    pub fn run_frame_hooks(&mut self, frame: &FrameContext) {
        self.hooks.run_frame(frame);
    }

    pub fn teardown(self) {
        log::debug!("Tearing down draw command ({} particles)", self.count);
        self.hooks.teardown();
    }

    /// Serializable view for dumps and tests.
    pub fn describe(&self) -> CommandDescriptor {
        CommandDescriptor {
            primitive: self.primitive,
            count: self.count,
            attributes: self
                .attributes
                .iter()
                .map(|(name, entry)| {
                    let info = AttributeInfo {
                        ty: entry.ty,
                        len: entry.value.data.len(),
                    };
                    (name.clone(), info)
                })
                .collect(),
            uniforms: self
                .uniforms
                .iter()
                .map(|(name, entry)| {
                    let info = UniformInfo {
                        ty: entry.ty,
                        value: match &entry.value {
                            UniformBinding::Constant(v) => Some(*v),
                            UniformBinding::PerFrame(_) => None,
                        },
                    };
                    (name.clone(), info)
                })
                .collect(),
            vert: self.vert.clone(),
            frag: self.frag.clone(),
            depth: self.depth,
            blend: self.blend,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeInfo {
    #[serde(rename = "type")]
    pub ty: GlslType,
    /// Scalar count, `count * components`.
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniformInfo {
    #[serde(rename = "type")]
    pub ty: GlslType,
    /// Absent for per-frame uniforms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<UniformValue>,
}

/// `{primitive, count, attributes, uniforms, vert, frag, depth, blend?}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandDescriptor {
    pub primitive: Primitive,
    pub count: u32,
    pub attributes: BTreeMap<String, AttributeInfo>,
    pub uniforms: BTreeMap<String, UniformInfo>,
    pub vert: String,
    pub frag: String,
    pub depth: DepthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blend: Option<BlendState>,
}
