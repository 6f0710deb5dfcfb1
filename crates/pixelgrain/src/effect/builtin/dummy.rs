use crate::effect::{Effect, RegisterFuture, Registration};
use crate::params::ParamDef;

/// Contributes nothing. Keeps a slot on a track while editing.
pub struct Dummy;

impl Effect for Dummy {
    fn id(&self) -> &'static str {
        "Dummy"
    }

    fn display_name(&self) -> &'static str {
        "Dummy"
    }

    fn params(&self) -> Vec<ParamDef> {
        Vec::new()
    }

    fn register<'a>(&'a self, _reg: Registration<'a>) -> RegisterFuture<'a> {
        Box::pin(async { Ok(()) })
    }
}
