use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::effect::{Effect, RegisterFuture, Registration};
use crate::params::ParamDef;
use crate::shader::{GlslType, UniformValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorizeConfig {
    pub color: [f32; 3],
    pub amount: f32,
}

impl Default for ColorizeConfig {
    fn default() -> Self {
        Self {
            color: [1.0, 0.0, 0.0],
            amount: 0.5,
        }
    }
}

/// Tints particles towards a fixed color in the fragment stage.
pub struct Colorize;

impl Effect for Colorize {
    fn id(&self) -> &'static str {
        "Colorize"
    }

    fn display_name(&self) -> &'static str {
        "Colorize"
    }

    fn params(&self) -> Vec<ParamDef> {
        let d = ColorizeConfig::default();
        vec![
            ParamDef::color("color", "Color", d.color),
            ParamDef::float("amount", "Amount", d.amount, 0.0, 1.0),
        ]
    }

    fn register<'a>(&'a self, mut reg: Registration<'a>) -> RegisterFuture<'a> {
        let cfg: ColorizeConfig = reg.config();
        let progress = reg.progress_expr();
        let color = reg.uniforms.add(
            "color",
            GlslType::Vec3,
            UniformValue::from(Vec3::from_array(cfg.color)),
        );
        let amount = reg.uniforms.add("amount", GlslType::Float, cfg.amount);
        reg.fragment.add_main(&format!(
            "color = mix(color, {color}, {amount} * sin({progress} * 3.14159265359));"
        ));
        Box::pin(std::future::ready(Ok(())))
    }
}
