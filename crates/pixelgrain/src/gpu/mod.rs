pub mod accumulation;
pub mod backend;
pub mod headless;
pub mod pass;

pub use accumulation::{AccumulationEngine, AccumulationState};
pub use backend::GpuBackend;
pub use headless::{HeadlessBackend, HeadlessFramebuffer, Op};
pub use pass::FullscreenPass;
