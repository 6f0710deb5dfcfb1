pub mod builder;
pub mod draw;
pub mod epilogue;
pub mod hooks;
pub mod slot;

pub use builder::{CommandBuilder, build_command, guard};
pub use draw::{BlendFactor, BlendState, CommandDescriptor, DepthState, DrawCommand, Primitive};
pub use hooks::HookList;
pub use slot::{BuildTicket, CommandSlot};
