use super::draw::DrawCommand;
use crate::clock::FrameContext;

/// Identifies one requested build. Only the most recent ticket may install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildTicket {
    generation: u64,
}

impl BuildTicket {
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// Holds the command the render loop draws.
///
/// Every rebuild takes a ticket first. A build that resolves after a newer
/// one was requested is stale: it is torn down instead of installed, so a
/// slow build can never overwrite the result of a later configuration.
#[derive(Default)]
pub struct CommandSlot {
    active: Option<DrawCommand>,
    latest: u64,
    installed: u64,
}

impl CommandSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_build(&mut self) -> BuildTicket {
        self.latest += 1;
        BuildTicket {
            generation: self.latest,
        }
    }

    pub fn is_current(&self, ticket: BuildTicket) -> bool {
        ticket.generation == self.latest
    }

    /// Install `command` if `ticket` is still current. Returns whether it was.
    pub fn install(&mut self, ticket: BuildTicket, command: DrawCommand) -> bool {
        if !self.is_current(ticket) {
            log::debug!(
                "Discarding stale build {} (latest is {})",
                ticket.generation,
                self.latest
            );
            command.teardown();
            return false;
        }
        if let Some(previous) = self.active.replace(command) {
            previous.teardown();
        }
        self.installed = ticket.generation;
        true
    }

    pub fn active(&self) -> Option<&DrawCommand> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut DrawCommand> {
        self.active.as_mut()
    }

    /// Generation of the installed command, 0 before the first install.
    pub fn installed_generation(&self) -> u64 {
        self.installed
    }

    pub fn run_frame_hooks(&mut self, frame: &FrameContext) {
        if let Some(command) = &mut self.active {
            command.run_frame_hooks(frame);
        }
    }

    /// Tear down the active command, leaving the slot empty.
    pub fn clear(&mut self) {
        if let Some(command) = self.active.take() {
            command.teardown();
        }
    }
}
