use std::ops::ControlFlow;

use crate::clock::FrameContext;

pub type FrameHook = Box<dyn FnMut(&FrameContext) -> ControlFlow<()>>;
pub type TeardownHook = Box<dyn FnOnce()>;

/// Per-frame callbacks and cleanup registered by effects.
///
/// The hooks travel with the draw command they were registered for: the
/// render loop calls [`HookList::run_frame`] once per tick while the command
/// is active, and [`HookList::teardown`] runs when the command is replaced or
/// discarded. Dropping a hook from the list is all it takes to cancel it.
#[derive(Default)]
pub struct HookList {
    frame: Vec<FrameHook>,
    teardown: Vec<TeardownHook>,
}

impl HookList {
    pub fn on_frame(&mut self, mut hook: impl FnMut(&FrameContext) + 'static) {
        self.frame.push(Box::new(move |frame| {
            hook(frame);
            ControlFlow::Continue(())
        }));
    }

    /// Call `hook` every tick until it breaks, then drop it.
    pub fn on_frame_until(
        &mut self,
        hook: impl FnMut(&FrameContext) -> ControlFlow<()> + 'static,
    ) {
        self.frame.push(Box::new(hook));
    }

    pub fn on_teardown(&mut self, hook: impl FnOnce() + 'static) {
        self.teardown.push(Box::new(hook));
    }

    pub fn run_frame(&mut self, frame: &FrameContext) {
        self.frame.retain_mut(|hook| hook(frame).is_continue());
    }

    /// Run every teardown hook, most recently registered first.
    pub fn teardown(self) {
        for hook in self.teardown.into_iter().rev() {
            hook();
        }
    }

    pub fn extend(&mut self, other: HookList) {
        self.frame.extend(other.frame);
        self.teardown.extend(other.teardown);
    }

    pub fn frame_hook_count(&self) -> usize {
        self.frame.len()
    }

    pub fn teardown_hook_count(&self) -> usize {
        self.teardown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty() && self.teardown.is_empty()
    }
}

/// Hooks owned by a build that has not finished yet.
///
/// If the build is dropped before [`TeardownGuard::into_inner`] is called, the
/// teardown hooks collected so far run on drop.
pub struct TeardownGuard(Option<HookList>);

impl TeardownGuard {
    pub fn new(hooks: HookList) -> Self {
        Self(Some(hooks))
    }

    pub fn get_mut(&mut self) -> &mut HookList {
        self.0.get_or_insert_with(HookList::default)
    }

    /// Disarm the guard and hand the hooks back.
    pub fn into_inner(mut self) -> HookList {
        self.0.take().unwrap_or_default()
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if let Some(hooks) = self.0.take()
            && !hooks.is_empty()
        {
            log::debug!(
                "Build dropped mid-flight; running {} teardown hooks",
                hooks.teardown_hook_count()
            );
            hooks.teardown();
        }
    }
}
