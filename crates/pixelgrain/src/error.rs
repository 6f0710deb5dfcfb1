use std::fmt;

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

/// Errors caused by a timeline that cannot be turned into a draw command.
/// Fatal to the build that hit them: nothing half-correct should render.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("No such effect: {0}")]
    UnknownEffect(String),
    #[error("Duplicate effect id: {0}")]
    DuplicateEffect(String),
    #[error("Unknown particle overlap mode: {0}")]
    UnknownOverlapMode(String),
    #[error("Unknown particle shape: {0}")]
    UnknownShape(String),
    #[error("Unknown image scaling mode: {0}")]
    UnknownScalingMode(String),
    #[error("Unknown accumulation mode: {0}")]
    UnknownAccumulationMode(String),
    #[error("Effect '{effect_id}' ends before it begins ({time_begin} > {time_end})")]
    InvertedWindow {
        effect_id: String,
        time_begin: String,
        time_end: String,
    },
    #[error("Effect '{0}' must repeat at least once")]
    ZeroRepetitions(String),
    #[error("Particle grid must not be empty ({0}x{1})")]
    EmptyGrid(u32, u32),
    #[error("Particle grid {0}x{1} exceeds the {max} particle limit", max = crate::timeline::MAX_PARTICLES)]
    GridTooLarge(u32, u32),
    #[error("Malformed timeline document: {0}")]
    MalformedDocument(String),
}

/// An individual effect failed to contribute its shader code.
/// Non-fatal: reported through the [`ErrorReporter`] and the build continues.
#[derive(Debug, Clone, Error)]
#[error("effect '{effect_id}' failed to register: {message}")]
pub struct EffectError {
    pub effect_id: String,
    pub message: String,
}

impl EffectError {
    pub fn new(effect_id: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            effect_id: effect_id.into(),
            message: message.to_string(),
        }
    }
}

/// GPU resource allocation failed. Fatal and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("failed to allocate {width}x{height} framebuffer '{label}'")]
    FramebufferAllocation {
        label: String,
        width: u32,
        height: u32,
    },
}

/// Umbrella error for the render loop.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Sending half of the process-wide non-fatal error channel.
///
/// Reports are queued, never handled inline: the render loop drains them at the
/// start of the next tick, so a failure inside one effect's registration cannot
/// unwind the build that is still running.
#[derive(Clone)]
pub struct ErrorReporter {
    tx: Sender<EffectError>,
}

/// Receiving half of the error channel, owned by the render loop.
pub struct ErrorInbox {
    rx: Receiver<EffectError>,
}

pub fn error_channel() -> (ErrorReporter, ErrorInbox) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (ErrorReporter { tx }, ErrorInbox { rx })
}

impl ErrorReporter {
    pub fn report(&self, error: EffectError) {
        log::warn!("{error}");
        // Inbox dropped means nobody is rendering anymore.
        let _ = self.tx.send(error);
    }
}

impl ErrorInbox {
    /// Take every report queued since the last drain.
    pub fn drain(&self) -> Vec<EffectError> {
        self.rx.try_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
