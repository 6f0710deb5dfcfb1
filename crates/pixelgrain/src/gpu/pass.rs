use crate::command::BlendState;
use crate::shader::UniformValue;
use crate::timeline::AccumulationMode;

/// Shared vertex stage of every fullscreen pass: one oversized triangle.
pub const FULLSCREEN_VERT: &str = "\
attribute vec2 a_position;
varying vec2 v_uv;
void main() {
    v_uv = a_position * 0.5 + 0.5;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

const DECAY_FRAG: &str = "\
precision highp float;
uniform sampler2D u_source;
uniform float u_decay;
varying vec2 v_uv;
void main() {
    gl_FragColor = texture2D(u_source, v_uv) * u_decay;
}
";

const BLUR_DECAY_FRAG: &str = "\
precision highp float;
uniform sampler2D u_source;
uniform vec2 u_texel;
uniform float u_decay;
varying vec2 v_uv;
void main() {
    vec4 sum = texture2D(u_source, v_uv + vec2(u_texel.x, 0.0))
        + texture2D(u_source, v_uv - vec2(u_texel.x, 0.0))
        + texture2D(u_source, v_uv + vec2(0.0, u_texel.y))
        + texture2D(u_source, v_uv - vec2(0.0, u_texel.y));
    gl_FragColor = sum * 0.25 * u_decay;
}
";

const SMEAR_FRAG: &str = "\
precision highp float;
uniform sampler2D u_source;
uniform float u_decay;
varying vec2 v_uv;
void main() {
    vec2 d = v_uv - 0.5;
    float a = 0.01 * length(d);
    vec2 swirl = vec2(d.x * cos(a) - d.y * sin(a), d.x * sin(a) + d.y * cos(a)) * 0.995;
    gl_FragColor = texture2D(u_source, swirl + 0.5) * u_decay;
}
";

const COMPOSITE_FRAG: &str = "\
precision highp float;
uniform sampler2D u_particles;
uniform sampler2D u_history;
varying vec2 v_uv;
void main() {
    gl_FragColor = mix(texture2D(u_particles, v_uv), texture2D(u_history, v_uv), 0.5);
}
";

/// Fraction of the fresh particle frame added to the history each frame.
pub const APPLY_WEIGHT: f32 = 0.25;

/// A fullscreen fragment pass and its uniforms.
#[derive(Debug, Clone, PartialEq)]
pub struct FullscreenPass {
    pub label: &'static str,
    pub frag: &'static str,
    pub uniforms: Vec<(&'static str, UniformValue)>,
    pub blend: Option<BlendState>,
}

impl FullscreenPass {
    /// Feedback step for `mode`, reading the history and writing a decayed copy.
    /// `None` for [`AccumulationMode::None`].
    pub fn step(mode: AccumulationMode, width: u32, height: u32) -> Option<Self> {
        let pass = match mode {
            AccumulationMode::None => return None,
            AccumulationMode::Trails => Self {
                label: "accumulation-trails",
                frag: DECAY_FRAG,
                uniforms: vec![("u_decay", UniformValue::Float(0.9))],
                blend: None,
            },
            AccumulationMode::SmoothTrails => Self {
                label: "accumulation-smooth-trails",
                frag: BLUR_DECAY_FRAG,
                uniforms: vec![
                    (
                        "u_texel",
                        UniformValue::Vec2([1.0 / width.max(1) as f32, 1.0 / height.max(1) as f32]),
                    ),
                    ("u_decay", UniformValue::Float(0.98)),
                ],
                blend: None,
            },
            AccumulationMode::Smear => Self {
                label: "accumulation-smear",
                frag: SMEAR_FRAG,
                uniforms: vec![("u_decay", UniformValue::Float(0.975))],
                blend: None,
            },
        };
        Some(pass)
    }

    /// Adds a weighted copy of the particle frame onto the history.
    pub fn apply() -> Self {
        Self {
            label: "accumulation-apply",
            frag: DECAY_FRAG,
            uniforms: vec![("u_decay", UniformValue::Float(APPLY_WEIGHT))],
            blend: Some(BlendState::ADDITIVE),
        }
    }

    /// Even mix of the particle frame and the history.
    pub fn composite() -> Self {
        Self {
            label: "accumulation-composite",
            frag: COMPOSITE_FRAG,
            uniforms: Vec::new(),
            blend: None,
        }
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }
}
