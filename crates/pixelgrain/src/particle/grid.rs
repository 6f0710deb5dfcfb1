use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::error::ConfigError;
use crate::shader::AttributeBinding;
use crate::timeline::{ImageScaling, grid_particle_count};

/// Interleaved per-particle vertex: 32 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ParticleVertex {
    pub texcoord: [f32; 2],
    pub rgb: [f32; 3],
    pub hsv: [f32; 3],
}

/// Particle buffers derived from an image: one particle per grid cell.
///
/// `texcoord` runs 0..1 with the origin bottom-left, which is also where the
/// vertex shader derives each particle's initial position from.
#[derive(Debug, Clone)]
pub struct ParticleGrid {
    width: u32,
    height: u32,
    texcoord: Arc<[f32]>,
    rgb: Arc<[f32]>,
    hsv: Arc<[f32]>,
}

impl ParticleGrid {
    /// Sample `image` into a `width`x`height` grid.
    pub fn from_image(
        image: &image::RgbaImage,
        width: u32,
        height: u32,
        scaling: ImageScaling,
    ) -> Result<Self, ConfigError> {
        let (iw, ih) = image.dimensions();
        if iw == 0 || ih == 0 {
            return Err(ConfigError::EmptyGrid(iw, ih));
        }
        let grid_aspect = width as f32 / height.max(1) as f32;
        let image_aspect = iw as f32 / ih as f32;
        let map = UvMap::new(scaling, grid_aspect, image_aspect);

        let grid = Self::build(width, height, |uv| {
            let img_uv = map.apply(uv);
            if !(0.0..=1.0).contains(&img_uv.x) || !(0.0..=1.0).contains(&img_uv.y) {
                // Letterbox area of a fitted image.
                return [0.0; 3];
            }
            let px = ((img_uv.x * iw as f32) as u32).min(iw - 1);
            // Image rows run top to bottom, texcoords bottom to top.
            let py = (((1.0 - img_uv.y) * ih as f32) as u32).min(ih - 1);
            let p = image.get_pixel(px, py);
            let alpha = f32::from(p[3]) / 255.0;
            [
                f32::from(p[0]) / 255.0 * alpha,
                f32::from(p[1]) / 255.0 * alpha,
                f32::from(p[2]) / 255.0 * alpha,
            ]
        })?;

        log::info!(
            "Sampled {}x{} particles from {iw}x{ih} image (scaling: {scaling})",
            width,
            height
        );
        Ok(grid)
    }

    /// A synthetic color ramp for when no image is loaded.
    pub fn gradient(width: u32, height: u32) -> Result<Self, ConfigError> {
        Self::build(width, height, |uv| [uv.x, uv.y, 1.0 - uv.x])
    }

    fn build(width: u32, height: u32, color_at: impl Fn(Vec2) -> [f32; 3]) -> Result<Self, ConfigError> {
        let count = grid_particle_count(width, height)? as usize;
        let mut texcoord = Vec::with_capacity(count * 2);
        let mut rgb = Vec::with_capacity(count * 3);
        let mut hsv = Vec::with_capacity(count * 3);
        let size = Vec2::new(width as f32, height as f32);

        for y in 0..height {
            for x in 0..width {
                let uv = (Vec2::new(x as f32, y as f32) + 0.5) / size;
                let color = color_at(uv);
                texcoord.extend_from_slice(&uv.to_array());
                rgb.extend_from_slice(&color);
                hsv.extend_from_slice(&rgb_to_hsv(color));
            }
        }

        Ok(Self {
            width,
            height,
            texcoord: texcoord.into(),
            rgb: rgb.into(),
            hsv: hsv.into(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn texcoord(&self) -> AttributeBinding {
        AttributeBinding::new(self.texcoord.clone())
    }

    pub fn rgb(&self) -> AttributeBinding {
        AttributeBinding::new(self.rgb.clone())
    }

    pub fn hsv(&self) -> AttributeBinding {
        AttributeBinding::new(self.hsv.clone())
    }

    pub fn vertex(&self, index: usize) -> Option<ParticleVertex> {
        if index >= self.len() {
            return None;
        }
        let t = &self.texcoord[index * 2..index * 2 + 2];
        let c = &self.rgb[index * 3..index * 3 + 3];
        let h = &self.hsv[index * 3..index * 3 + 3];
        Some(ParticleVertex {
            texcoord: [t[0], t[1]],
            rgb: [c[0], c[1], c[2]],
            hsv: [h[0], h[1], h[2]],
        })
    }

    /// Interleaved vertex buffer for backends that upload one buffer.
    pub fn vertex_bytes(&self) -> Vec<u8> {
        let vertices: Vec<ParticleVertex> = (0..self.len()).filter_map(|i| self.vertex(i)).collect();
        bytemuck::cast_slice(&vertices).to_vec()
    }
}

/// Maps grid texcoords to image texcoords for one scaling mode.
struct UvMap {
    scale: Vec2,
}

impl UvMap {
    fn new(scaling: ImageScaling, grid_aspect: f32, image_aspect: f32) -> Self {
        let wider = image_aspect > grid_aspect;
        let scale = match scaling {
            ImageScaling::Stretch => Vec2::ONE,
            // Sample a centered sub-rectangle of the image.
            ImageScaling::Fill if wider => Vec2::new(grid_aspect / image_aspect, 1.0),
            ImageScaling::Fill => Vec2::new(1.0, image_aspect / grid_aspect),
            // Spread the image over a centered sub-rectangle of the grid.
            ImageScaling::Fit if wider => Vec2::new(1.0, image_aspect / grid_aspect),
            ImageScaling::Fit => Vec2::new(grid_aspect / image_aspect, 1.0),
        };
        Self { scale }
    }

    fn apply(&self, uv: Vec2) -> Vec2 {
        Vec2::splat(0.5) + (uv - 0.5) * self.scale
    }
}

/// RGB in 0..1 to HSV with hue in 0..1.
pub fn rgb_to_hsv([r, g, b]: [f32; 3]) -> [f32; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let d = max - min;
    let h = if d <= f32::EPSILON {
        0.0
    } else if max == r {
        ((g - b) / d).rem_euclid(6.0) / 6.0
    } else if max == g {
        ((b - r) / d + 2.0) / 6.0
    } else {
        ((r - g) / d + 4.0) / 6.0
    };
    let s = if max <= f32::EPSILON { 0.0 } else { d / max };
    [h, s, max]
}
