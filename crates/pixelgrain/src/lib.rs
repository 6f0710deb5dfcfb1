//! Image-to-particle renderer driven by a timeline of shader effects.
//!
//! A [`timeline::TimelineConfig`] lists time-windowed effect instances on
//! concurrent tracks. [`command::CommandBuilder`] asks each effect to
//! contribute guarded GLSL to one vertex/fragment program pair, and
//! [`renderer::Renderer`] draws the result every frame through a
//! [`gpu::GpuBackend`], optionally wrapped in accumulation feedback.

pub mod clock;
pub mod command;
pub mod effect;
pub mod error;
pub mod gpu;
pub mod params;
pub mod particle;
pub mod renderer;
pub mod settings;
pub mod shader;
pub mod timeline;
