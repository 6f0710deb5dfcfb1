pub mod bindings;
pub mod program;

pub use bindings::{
    AttributeAllocator, AttributeBinding, BindingTable, GlslType, NamespacedBindings,
    TableEntry, UniformAllocator, UniformBinding, UniformValue,
};
pub use program::{ShaderProgram, ShaderStage};
