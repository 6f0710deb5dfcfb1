use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::clock::FrameContext;

use super::program::ShaderProgram;

/// GLSL type tags for uniforms and attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GlslType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    Bool,
}

impl GlslType {
    pub fn as_str(self) -> &'static str {
        match self {
            GlslType::Float => "float",
            GlslType::Vec2 => "vec2",
            GlslType::Vec3 => "vec3",
            GlslType::Vec4 => "vec4",
            GlslType::Int => "int",
            GlslType::Bool => "bool",
        }
    }

    /// Number of scalar components per element.
    pub fn components(self) -> usize {
        match self {
            GlslType::Float | GlslType::Int | GlslType::Bool => 1,
            GlslType::Vec2 => 2,
            GlslType::Vec3 => 3,
            GlslType::Vec4 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    Bool(bool),
}

impl UniformValue {
    pub fn glsl_type(&self) -> GlslType {
        match self {
            UniformValue::Float(_) => GlslType::Float,
            UniformValue::Vec2(_) => GlslType::Vec2,
            UniformValue::Vec3(_) => GlslType::Vec3,
            UniformValue::Vec4(_) => GlslType::Vec4,
            UniformValue::Int(_) => GlslType::Int,
            UniformValue::Bool(_) => GlslType::Bool,
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<glam::Vec2> for UniformValue {
    fn from(v: glam::Vec2) -> Self {
        UniformValue::Vec2(v.to_array())
    }
}

impl From<glam::Vec3> for UniformValue {
    fn from(v: glam::Vec3) -> Self {
        UniformValue::Vec3(v.to_array())
    }
}

pub type FrameCallback = Arc<dyn Fn(&FrameContext) -> UniformValue + Send + Sync>;

/// A uniform's value: fixed for the lifetime of the command, or re-evaluated
/// once per frame.
#[derive(Clone)]
pub enum UniformBinding {
    Constant(UniformValue),
    PerFrame(FrameCallback),
}

impl UniformBinding {
    pub fn per_frame(f: impl Fn(&FrameContext) -> UniformValue + Send + Sync + 'static) -> Self {
        UniformBinding::PerFrame(Arc::new(f))
    }

    pub fn resolve(&self, frame: &FrameContext) -> UniformValue {
        match self {
            UniformBinding::Constant(v) => *v,
            UniformBinding::PerFrame(f) => f(frame),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, UniformBinding::Constant(_))
    }
}

impl fmt::Debug for UniformBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniformBinding::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            UniformBinding::PerFrame(_) => f.write_str("PerFrame(..)"),
        }
    }
}

impl From<UniformValue> for UniformBinding {
    fn from(v: UniformValue) -> Self {
        UniformBinding::Constant(v)
    }
}

impl From<f32> for UniformBinding {
    fn from(v: f32) -> Self {
        UniformBinding::Constant(UniformValue::Float(v))
    }
}

/// Per-particle vertex data. The buffer is shared, not copied, between the
/// particle grid and every command built from it.
#[derive(Debug, Clone)]
pub struct AttributeBinding {
    pub data: Arc<[f32]>,
}

impl AttributeBinding {
    pub fn new(data: impl Into<Arc<[f32]>>) -> Self {
        Self { data: data.into() }
    }
}

/// How a binding kind is declared in GLSL.
pub trait Declare {
    fn declare(program: &mut ShaderProgram, ty: GlslType, name: &str);
}

impl Declare for UniformBinding {
    fn declare(program: &mut ShaderProgram, ty: GlslType, name: &str) {
        program.add_uniform(ty, name);
    }
}

impl Declare for AttributeBinding {
    fn declare(program: &mut ShaderProgram, ty: GlslType, name: &str) {
        program.add_attribute(ty, name);
    }
}

/// A compiled binding as stored in the draw command's flat table.
#[derive(Debug, Clone)]
pub struct TableEntry<T> {
    pub ty: GlslType,
    pub value: T,
}

/// Flat `{compiled name -> binding}` table consumed by the draw call.
/// Ordered so two builds of the same timeline list names identically.
pub type BindingTable<T> = BTreeMap<String, TableEntry<T>>;

pub type UniformAllocator = NamespacedBindings<UniformBinding>;
pub type AttributeAllocator = NamespacedBindings<AttributeBinding>;

/// Hands out collision-free GLSL identifiers for one effect registration.
///
/// Every name gets the registration's numeric id as a suffix, so two effects
/// can both ask for `time` and end up with `time_0` and `time_1`. The shared
/// allocator (no id) is reserved for the default uniforms every effect reads.
#[derive(Debug)]
pub struct NamespacedBindings<T> {
    id: Option<usize>,
    pending: Vec<(String, GlslType, T)>,
    logical: FxHashSet<String>,
}

impl<T: Clone + Declare> NamespacedBindings<T> {
    pub fn new(id: usize) -> Self {
        Self {
            id: Some(id),
            pending: Vec::new(),
            logical: FxHashSet::default(),
        }
    }

    /// Allocator whose names are emitted verbatim.
    pub fn shared() -> Self {
        Self {
            id: None,
            pending: Vec::new(),
            logical: FxHashSet::default(),
        }
    }

    pub fn id(&self) -> Option<usize> {
        self.id
    }

    /// Register a binding and return the identifier to embed in GLSL.
    ///
    /// # Panics
    /// If `name` was already added to this allocator.
    pub fn add(&mut self, name: &str, ty: GlslType, value: impl Into<T>) -> String {
        assert!(
            self.logical.insert(name.to_string()),
            "binding '{name}' registered twice in namespace {:?}",
            self.id
        );
        let compiled = match self.id {
            Some(id) => format!("{name}_{id}"),
            None => name.to_string(),
        };
        self.pending.push((compiled.clone(), ty, value.into()));
        compiled
    }

    /// Compiled identifiers in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|(name, _, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Declare every binding in `program` and, when given, record it in `table`.
    ///
    /// Leave `table` empty when the values already live in the shared table,
    /// for instance when declaring the same uniforms in a second stage.
    ///
    /// # Panics
    /// If a compiled name is already present in `table`.
    pub fn compile(&self, program: &mut ShaderProgram, table: Option<&mut BindingTable<T>>) {
        for (name, ty, _) in &self.pending {
            T::declare(program, *ty, name);
        }
        if let Some(table) = table {
            for (name, ty, value) in &self.pending {
                let previous = table.insert(
                    name.clone(),
                    TableEntry {
                        ty: *ty,
                        value: value.clone(),
                    },
                );
                assert!(previous.is_none(), "namespace collision on '{name}'");
            }
        }
    }
}
