pub mod document;
pub mod hot_reload;
pub mod types;

pub use document::{BUILTIN_TIMELINES, SCHEMA_VERSION, TimelineDocument};
pub use hot_reload::TimelineWatcher;
pub use types::{
    AccumulationMode, EffectInstance, ImageScaling, MAX_PARTICLES, ParticleOverlap,
    ParticleShape, TimelineConfig, Track, grid_particle_count,
};
