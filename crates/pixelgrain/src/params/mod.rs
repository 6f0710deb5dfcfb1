pub mod store;
pub mod types;

pub use store::ConfigForm;
pub use types::{ParamDef, ParamValue};
