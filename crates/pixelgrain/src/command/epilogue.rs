use super::draw::BlendState;
use crate::shader::{GlslType, ShaderProgram};
use crate::timeline::{ParticleOverlap, ParticleShape, TimelineConfig};

/// Local variables every effect may read and write.
///
/// Vertex: `initialPosition`, `position`, `color`, `pointSize`.
/// Fragment: `color`.
pub fn prologue(config: &TimelineConfig, vertex: &mut ShaderProgram, fragment: &mut ShaderProgram) {
    for program in [&mut *vertex, &mut *fragment] {
        program.add_varying(GlslType::Vec3, "v_color");
    }
    let aspect = config.particle_grid_width as f32 / config.particle_grid_height.max(1) as f32;
    vertex.add_main(&format!(
        "vec3 initialPosition = vec3(texcoord * 2.0 - 1.0, 0.0);\n\
         initialPosition.x *= {};\n\
         vec3 position = initialPosition;\n\
         vec3 color = rgb;\n\
         float pointSize = particleSize;",
        crate::effect::float_literal(f64::from(aspect))
    ));
    fragment.add_main("vec3 color = v_color;");
}

/// Close both stages: project and size the particle, then cut its shape and
/// write the fragment for the overlap mode. Returns the matching blend state.
pub fn epilogue(
    config: &TimelineConfig,
    vertex: &mut ShaderProgram,
    fragment: &mut ShaderProgram,
) -> Option<BlendState> {
    vertex.add_main(
        "gl_Position = vec4(position.x * invScreenAspectRatio, position.y, position.z, 1.0);\n\
         gl_PointSize = max(pointSize, 0.0);\n\
         v_color = color;",
    );

    fragment.add_main(shape_test(config.particle_shape));
    let alpha = if config.particle_fading { "fade" } else { "1.0" };
    fragment.add_main(&format!("float alpha = {alpha};"));

    match config.particle_overlap {
        ParticleOverlap::Add => {
            fragment.add_main("gl_FragColor = vec4(color * alpha, 1.0);");
            Some(BlendState::ADDITIVE)
        }
        ParticleOverlap::Alpha => {
            fragment.add_main("gl_FragColor = vec4(color, alpha);");
            Some(BlendState::ALPHA)
        }
        ParticleOverlap::Overwrite => {
            fragment.add_main("gl_FragColor = vec4(color * alpha, 1.0);");
            None
        }
    }
}

/// Inside test on `gl_PointCoord`, leaving `fade` at 1 in the middle and 0 on
/// the edge.
fn shape_test(shape: ParticleShape) -> &'static str {
    match shape {
        ParticleShape::Circle => {
            "vec2 p = gl_PointCoord * 2.0 - 1.0;\n\
             float dist = length(p);\n\
             if (dist > 1.0) { discard; }\n\
             float fade = 1.0 - dist;"
        }
        ParticleShape::Square => {
            "vec2 p = gl_PointCoord * 2.0 - 1.0;\n\
             float fade = 1.0 - max(abs(p.x), abs(p.y));"
        }
        // Point coords grow downwards, so flip y to point the tip up.
        ParticleShape::Triangle => {
            "vec2 p = (gl_PointCoord * 2.0 - 1.0) * vec2(1.0, -1.0);\n\
             float edge = max(abs(p.x) * 0.866025 + p.y * 0.5, -p.y);\n\
             if (edge > 0.5) { discard; }\n\
             float fade = 1.0 - edge * 2.0;"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::ShaderStage;

    fn close(config: &TimelineConfig) -> (String, String, Option<BlendState>) {
        let mut vertex = ShaderProgram::new(ShaderStage::Vertex);
        let mut fragment = ShaderProgram::new(ShaderStage::Fragment);
        prologue(config, &mut vertex, &mut fragment);
        let blend = epilogue(config, &mut vertex, &mut fragment);
        (vertex.compile(), fragment.compile(), blend)
    }

    #[test]
    fn overlap_selects_blend_state() {
        let mut config = TimelineConfig::default();
        config.particle_overlap = ParticleOverlap::Add;
        assert_eq!(close(&config).2, Some(BlendState::ADDITIVE));
        config.particle_overlap = ParticleOverlap::Alpha;
        let (_, frag, blend) = close(&config);
        assert_eq!(blend, Some(BlendState::ALPHA));
        assert!(frag.contains("vec4(color, alpha)"));
        config.particle_overlap = ParticleOverlap::Overwrite;
        assert_eq!(close(&config).2, None);
    }

    #[test]
    fn each_shape_writes_one_fragment() {
        for &shape in ParticleShape::ALL {
            let mut config = TimelineConfig::default();
            config.particle_shape = shape;
            config.particle_fading = true;
            let (vert, frag, _) = close(&config);
            assert_eq!(frag.matches("gl_FragColor =").count(), 1, "{shape}");
            assert_eq!(vert.matches("gl_PointSize =").count(), 1, "{shape}");
            assert!(frag.contains("float alpha = fade;"));
            assert_eq!(frag.matches('{').count(), frag.matches('}').count());
        }
    }

    #[test]
    fn square_never_discards() {
        let mut config = TimelineConfig::default();
        config.particle_shape = ParticleShape::Square;
        assert!(!close(&config).1.contains("discard"));
    }

    #[test]
    fn grid_aspect_scales_initial_position() {
        let mut config = TimelineConfig::default();
        config.particle_grid_width = 200;
        config.particle_grid_height = 100;
        assert!(close(&config).0.contains("initialPosition.x *= 2.0;"));
    }
}
