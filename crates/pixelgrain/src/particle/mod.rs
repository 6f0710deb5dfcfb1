pub mod grid;

pub use grid::{ParticleGrid, ParticleVertex, rgb_to_hsv};
