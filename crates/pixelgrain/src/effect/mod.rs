pub mod builtin;
pub mod registry;

use std::future::Future;
use std::pin::Pin;

use rand::RngCore;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::clock::FrameContext;
use crate::command::HookList;
use crate::error::EffectError;
use crate::params::{ConfigForm, ParamDef};
use crate::particle::ParticleGrid;
use crate::shader::{AttributeAllocator, ShaderProgram, UniformAllocator};
use crate::timeline::{EffectInstance, TimelineConfig};

pub use registry::EffectRegistry;

/// Future returned by [`Effect::register`].
pub type RegisterFuture<'a> = Pin<Box<dyn Future<Output = Result<(), EffectError>> + 'a>>;

/// Everything a build reads besides the effect queue.
pub struct RenderProps<'a> {
    pub config: &'a TimelineConfig,
    pub state: &'a ParticleGrid,
    /// Clock snapshot taken when the build started.
    pub clock: FrameContext,
}

/// One effect's view of an in-flight build.
///
/// Main-body code an effect appends already sits inside its time guard. The
/// guard is closed by the builder, and so is flushing `uniforms` and
/// `attributes`: an effect only adds bindings and embeds the names it gets back.
pub struct Registration<'a> {
    pub instance: &'a EffectInstance,
    pub props: &'a RenderProps<'a>,
    pub uniforms: &'a mut UniformAllocator,
    pub vertex: &'a mut ShaderProgram,
    pub fragment: &'a mut ShaderProgram,
    pub attributes: &'a mut AttributeAllocator,
    pub hooks: &'a mut HookList,
    /// Namespace id of this registration, also used as the uniform suffix.
    pub namespace: usize,
}

impl Registration<'_> {
    /// GLSL expression for how far the current repetition has progressed, 0..1.
    pub fn progress_expr(&self) -> String {
        let period = self.instance.period();
        if period <= 0.0 {
            return "0.0".to_string();
        }
        format!(
            "(mod(globalTime - {}, {p}) / {p})",
            float_literal(self.instance.time_begin),
            p = float_literal(period)
        )
    }

    /// Namespaced identifier for a helper function or global the effect defines.
    pub fn local_name(&self, name: &str) -> String {
        format!("{name}_{}", self.namespace)
    }

    /// Typed view of the instance config. See [`parse_config`].
    pub fn config<T: DeserializeOwned + Default>(&self) -> T {
        parse_config(self.instance)
    }
}

/// Format `x` so GLSL reads it as a float literal.
pub fn float_literal(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

/// Read an instance's config into the effect's typed config.
///
/// Typed configs carry `#[serde(default)]`, so missing fields take defaults
/// and unknown ones are ignored. A document of the wrong shape falls back to
/// the full default.
pub fn parse_config<T: DeserializeOwned + Default>(instance: &EffectInstance) -> T {
    if instance.config.is_null() {
        return T::default();
    }
    match serde_json::from_value(instance.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            log::warn!(
                "Ignoring malformed config for '{}': {e}",
                instance.effect_id
            );
            T::default()
        }
    }
}

/// An effect plugin: a shader contribution plus the metadata to edit it.
pub trait Effect: Send + Sync {
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }

    /// Form descriptor for the effect's configuration.
    fn params(&self) -> Vec<ParamDef>;

    fn default_config(&self) -> Value {
        self.config_form().config()
    }

    fn random_config(&self, rng: &mut dyn RngCore) -> Value {
        let mut form = self.config_form();
        for def in self.params() {
            let value = def.random_value(rng);
            form.set(def.name(), value);
        }
        form.config()
    }

    /// A fresh form owned by the caller.
    fn config_form(&self) -> ConfigForm {
        ConfigForm::new(&self.params())
    }

    /// Append this instance's shader code and bindings.
    ///
    /// Awaited by the builder one effect at a time, so the programs in `reg`
    /// are never shared with another registration in flight.
    fn register<'a>(&'a self, reg: Registration<'a>) -> RegisterFuture<'a>;
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::shader::ShaderStage;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    #[serde(default)]
    struct Typed {
        amount: f32,
        enabled: bool,
    }

    #[test]
    fn float_literal_always_has_a_point() {
        assert_eq!(float_literal(1000.0), "1000.0");
        assert_eq!(float_literal(0.0), "0.0");
        assert_eq!(float_literal(2.5), "2.5");
    }

    #[test]
    fn parse_config_defaults_missing_fields() {
        let inst = EffectInstance::new("X", 0.0, 1.0).with_config(json!({"amount": 0.5, "extra": 1}));
        let typed: Typed = parse_config(&inst);
        assert_eq!(
            typed,
            Typed {
                amount: 0.5,
                enabled: false
            }
        );
    }

    #[test]
    fn parse_config_falls_back_on_wrong_shape() {
        let inst = EffectInstance::new("X", 0.0, 1.0).with_config(json!([1, 2, 3]));
        let typed: Typed = parse_config(&inst);
        assert_eq!(typed, Typed::default());
        let null = EffectInstance::new("X", 0.0, 1.0).with_config(Value::Null);
        assert_eq!(parse_config::<Typed>(&null), Typed::default());
    }

    #[test]
    fn progress_expr_uses_repetition_period() {
        let grid = ParticleGrid::gradient(1, 1).unwrap();
        let config = TimelineConfig::default();
        let props = RenderProps {
            config: &config,
            state: &grid,
            clock: FrameContext {
                time: 0.0,
                delta: 0.0,
                width: 1,
                height: 1,
            },
        };
        let inst = EffectInstance::new("X", 1000.0, 5000.0).with_repetitions(4);
        let mut uniforms = UniformAllocator::new(3);
        let mut attributes = AttributeAllocator::new(3);
        let mut vertex = ShaderProgram::new(ShaderStage::Vertex);
        let mut fragment = ShaderProgram::new(ShaderStage::Fragment);
        let mut hooks = HookList::default();
        let reg = Registration {
            instance: &inst,
            props: &props,
            uniforms: &mut uniforms,
            vertex: &mut vertex,
            fragment: &mut fragment,
            attributes: &mut attributes,
            hooks: &mut hooks,
            namespace: 3,
        };
        assert_eq!(
            reg.progress_expr(),
            "(mod(globalTime - 1000.0, 1000.0) / 1000.0)"
        );
        assert_eq!(reg.local_name("swirl"), "swirl_3");
    }

    #[test]
    fn zero_length_window_has_constant_progress() {
        let grid = ParticleGrid::gradient(1, 1).unwrap();
        let config = TimelineConfig::default();
        let props = RenderProps {
            config: &config,
            state: &grid,
            clock: FrameContext {
                time: 0.0,
                delta: 0.0,
                width: 1,
                height: 1,
            },
        };
        let inst = EffectInstance::new("X", 500.0, 500.0);
        let mut uniforms = UniformAllocator::new(0);
        let mut attributes = AttributeAllocator::new(0);
        let mut vertex = ShaderProgram::new(ShaderStage::Vertex);
        let mut fragment = ShaderProgram::new(ShaderStage::Fragment);
        let mut hooks = HookList::default();
        let reg = Registration {
            instance: &inst,
            props: &props,
            uniforms: &mut uniforms,
            vertex: &mut vertex,
            fragment: &mut fragment,
            attributes: &mut attributes,
            hooks: &mut hooks,
            namespace: 0,
        };
        assert_eq!(reg.progress_expr(), "0.0");
    }
}
