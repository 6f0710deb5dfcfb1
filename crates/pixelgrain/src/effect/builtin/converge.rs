use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::effect::{Effect, RegisterFuture, Registration};
use crate::error::EffectError;
use crate::params::ParamDef;
use crate::shader::GlslType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergeTarget {
    Center,
    Ring,
    Horizon,
}

impl ConvergeTarget {
    pub const ALL: &[ConvergeTarget] = &[
        ConvergeTarget::Center,
        ConvergeTarget::Ring,
        ConvergeTarget::Horizon,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConvergeTarget::Center => "center",
            ConvergeTarget::Ring => "ring",
            ConvergeTarget::Horizon => "horizon",
        }
    }

    /// GLSL expression for where a particle is drawn to.
    fn target_expr(self, radius: &str) -> String {
        match self {
            ConvergeTarget::Center => "vec2(0.0)".to_string(),
            ConvergeTarget::Ring => {
                format!("normalize(initialPosition.xy + vec2(1e-5)) * {radius}")
            }
            ConvergeTarget::Horizon => "vec2(initialPosition.x, 0.0)".to_string(),
        }
    }
}

impl FromStr for ConvergeTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConvergeTarget::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown converge target '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvergeConfig {
    pub target: String,
    pub strength: f32,
    pub radius: f32,
}

impl Default for ConvergeConfig {
    fn default() -> Self {
        Self {
            target: ConvergeTarget::Center.as_str().to_string(),
            strength: 0.8,
            radius: 0.5,
        }
    }
}

/// Gathers particles onto a shape and releases them again.
pub struct Converge;

impl Effect for Converge {
    fn id(&self) -> &'static str {
        "Converge"
    }

    fn display_name(&self) -> &'static str {
        "Converge"
    }

    fn params(&self) -> Vec<ParamDef> {
        let d = ConvergeConfig::default();
        let options: Vec<&str> = ConvergeTarget::ALL.iter().map(|t| t.as_str()).collect();
        vec![
            ParamDef::choice("target", "Target", &d.target, &options),
            ParamDef::float("strength", "Strength", d.strength, 0.0, 1.0),
            ParamDef::float("radius", "Ring radius", d.radius, 0.0, 1.0),
        ]
    }

    fn register<'a>(&'a self, mut reg: Registration<'a>) -> RegisterFuture<'a> {
        Box::pin(std::future::ready(self.emit(&mut reg)))
    }
}

impl Converge {
    fn emit(&self, reg: &mut Registration<'_>) -> Result<(), EffectError> {
        let cfg: ConvergeConfig = reg.config();
        let target =
            ConvergeTarget::from_str(&cfg.target).map_err(|e| EffectError::new(self.id(), e))?;
        let progress = reg.progress_expr();
        let strength = reg.uniforms.add("strength", GlslType::Float, cfg.strength);
        let radius = reg.uniforms.add("radius", GlslType::Float, cfg.radius);

        let ease = reg.local_name("convergeEase");
        reg.vertex.add_global(&format!(
            "float {ease}(float t) {{\n    float s = sin(t * 3.14159265359);\n    return s * s;\n}}"
        ));
        reg.vertex.add_main(&format!(
            "position.xy = mix(position.xy, {}, {ease}({progress}) * {strength});",
            target.target_expr(&radius)
        ));
        Ok(())
    }
}
