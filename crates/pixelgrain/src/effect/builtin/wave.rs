use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::effect::{Effect, RegisterFuture, Registration};
use crate::params::ParamDef;
use crate::shader::{GlslType, UniformValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaveConfig {
    /// Displacement in clip-space units.
    pub amplitude: f32,
    pub wavelength: f32,
    /// Travel direction in degrees.
    pub direction: f32,
    /// Wave cycles per repetition.
    pub speed: f32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            amplitude: 0.05,
            wavelength: 0.5,
            direction: 0.0,
            speed: 1.0,
        }
    }
}

/// Transverse sine wave travelling across the grid.
pub struct Wave;

impl Effect for Wave {
    fn id(&self) -> &'static str {
        "Wave"
    }

    fn display_name(&self) -> &'static str {
        "Wave"
    }

    fn description(&self) -> &'static str {
        "Ripples particles sideways as a sine wave passes through"
    }

    fn params(&self) -> Vec<ParamDef> {
        let d = WaveConfig::default();
        vec![
            ParamDef::float("amplitude", "Amplitude", d.amplitude, 0.0, 0.5),
            ParamDef::float("wavelength", "Wavelength", d.wavelength, 0.05, 2.0),
            ParamDef::float("direction", "Direction", d.direction, 0.0, 360.0),
            ParamDef::float("speed", "Speed", d.speed, 0.0, 10.0),
        ]
    }

    fn register<'a>(&'a self, mut reg: Registration<'a>) -> RegisterFuture<'a> {
        let cfg: WaveConfig = reg.config();
        let progress = reg.progress_expr();
        let angle = cfg.direction.to_radians();

        let amplitude = reg.uniforms.add("amplitude", GlslType::Float, cfg.amplitude);
        let wavelength = reg
            .uniforms
            .add("wavelength", GlslType::Float, cfg.wavelength.max(0.05));
        let direction = reg.uniforms.add(
            "direction",
            GlslType::Vec2,
            UniformValue::from(Vec2::from_angle(angle)),
        );
        let speed = reg.uniforms.add("speed", GlslType::Float, cfg.speed);

        reg.vertex.add_main(&format!(
            "float wavePhase = dot(initialPosition.xy, {direction}) / {wavelength} - {progress} * {speed};\n\
             position.xy += vec2(-{direction}.y, {direction}.x) * {amplitude} * sin(wavePhase * 6.28318530718);"
        ));
        Box::pin(std::future::ready(Ok(())))
    }
}
