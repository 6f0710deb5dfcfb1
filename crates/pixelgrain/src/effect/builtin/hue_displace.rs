use serde::{Deserialize, Serialize};

use crate::effect::{Effect, RegisterFuture, Registration};
use crate::params::ParamDef;
use crate::shader::GlslType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HueDisplaceConfig {
    pub distance: f32,
    pub scale_by_value: bool,
    /// Offset added to every hue angle, in degrees.
    pub rotate: f32,
}

impl Default for HueDisplaceConfig {
    fn default() -> Self {
        Self {
            distance: 0.1,
            scale_by_value: true,
            rotate: 0.0,
        }
    }
}

/// Pushes each particle along the direction of its hue.
pub struct HueDisplace;

impl Effect for HueDisplace {
    fn id(&self) -> &'static str {
        "HueDisplace"
    }

    fn display_name(&self) -> &'static str {
        "Hue displace"
    }

    fn params(&self) -> Vec<ParamDef> {
        let d = HueDisplaceConfig::default();
        vec![
            ParamDef::float("distance", "Distance", d.distance, 0.0, 1.0),
            ParamDef::bool("scaleByValue", "Scale by brightness", d.scale_by_value),
            ParamDef::float("rotate", "Rotate", d.rotate, 0.0, 360.0),
        ]
    }

    fn register<'a>(&'a self, mut reg: Registration<'a>) -> RegisterFuture<'a> {
        let cfg: HueDisplaceConfig = reg.config();
        let progress = reg.progress_expr();
        let distance = reg.uniforms.add("distance", GlslType::Float, cfg.distance);
        let rotate = reg
            .uniforms
            .add("rotate", GlslType::Float, cfg.rotate.to_radians());
        let scale = if cfg.scale_by_value { " * hsv.z" } else { "" };

        // Out and back once per repetition.
        reg.vertex.add_main(&format!(
            "float hueAngle = hsv.x * 6.28318530718 + {rotate};\n\
             float hueAmount = {distance} * sin({progress} * 3.14159265359){scale};\n\
             position.xy += vec2(cos(hueAngle), sin(hueAngle)) * hueAmount;"
        ));
        Box::pin(std::future::ready(Ok(())))
    }
}
