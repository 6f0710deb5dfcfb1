use std::fmt::Write as _;

use super::bindings::GlslType;

/// Which pipeline stage a program is assembled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Lengths of every source buffer at some point in time.
/// Restoring one drops everything appended after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    attributes: usize,
    uniforms: usize,
    varyings: usize,
    globals: usize,
    main_body: usize,
}

/// Accumulates GLSL source fragments for one shader stage.
///
/// Sources land in five ordered buffers that are only concatenated by
/// [`ShaderProgram::compile`], so effects can add a uniform declaration after
/// they already emitted main-body code that uses it.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    stage: ShaderStage,
    attributes: String,
    uniforms: String,
    varyings: String,
    globals: String,
    main_body: String,
}

impl ShaderProgram {
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            attributes: String::new(),
            uniforms: String::new(),
            varyings: String::new(),
            globals: String::new(),
            main_body: String::new(),
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn add_attribute(&mut self, ty: GlslType, name: &str) {
        let _ = writeln!(self.attributes, "attribute {} {name};", ty.as_str());
    }

    pub fn add_uniform(&mut self, ty: GlslType, name: &str) {
        let _ = writeln!(self.uniforms, "uniform {} {name};", ty.as_str());
    }

    pub fn add_varying(&mut self, ty: GlslType, name: &str) {
        let _ = writeln!(self.varyings, "varying {} {name};", ty.as_str());
    }

    /// Global declarations and helper functions, emitted before `main`.
    pub fn add_global(&mut self, source: &str) {
        self.globals.push_str(source);
        if !source.ends_with('\n') {
            self.globals.push('\n');
        }
    }

    /// Statements appended to the body of `main`.
    pub fn add_main(&mut self, source: &str) {
        self.main_body.push_str(source);
        if !source.ends_with('\n') {
            self.main_body.push('\n');
        }
    }

    pub fn main_body(&self) -> &str {
        &self.main_body
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            attributes: self.attributes.len(),
            uniforms: self.uniforms.len(),
            varyings: self.varyings.len(),
            globals: self.globals.len(),
            main_body: self.main_body.len(),
        }
    }

    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.attributes.truncate(checkpoint.attributes);
        self.uniforms.truncate(checkpoint.uniforms);
        self.varyings.truncate(checkpoint.varyings);
        self.globals.truncate(checkpoint.globals);
        self.main_body.truncate(checkpoint.main_body);
    }

    /// Concatenate all buffers into a complete shader stage.
    pub fn compile(&self) -> String {
        let mut out = String::with_capacity(
            64 + self.attributes.len()
                + self.uniforms.len()
                + self.varyings.len()
                + self.globals.len()
                + self.main_body.len(),
        );
        if self.stage == ShaderStage::Fragment {
            out.push_str("precision highp float;\n");
        }
        out.push_str(&self.attributes);
        out.push_str(&self.uniforms);
        out.push_str(&self.varyings);
        out.push_str(&self.globals);
        out.push_str("void main() {\n");
        out.push_str(&self.main_body);
        out.push_str("}\n");
        out
    }
}
