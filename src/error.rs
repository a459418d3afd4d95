//! Error types.
//!
//! Each concern gets its own enum so callers can tell a broken context handoff
//! (a programming error) apart from a machine fault (a runtime condition) or a
//! missing input subsystem (fatal at startup).
//!
//! Unbound physical inputs are deliberately absent: looking up a code with no
//! binding is a no-op, not an error.

use std::thread::ThreadId;
use thiserror::Error;

/// The input subsystem could not be brought up.
///
/// Input is essential to interactivity, so hosts are expected to terminate on
/// this error rather than continue without controllers.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to initialize gamepad subsystem: {0}")]
    Backend(String),
}

#[cfg(feature = "hid")]
impl From<hidapi::HidError> for InitError {
    fn from(err: hidapi::HidError) -> Self {
        InitError::Backend(err.to_string())
    }
}

/// Graphics context ownership violation.
///
/// These indicate a broken migration protocol and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context is already current on thread {holder:?}")]
    AlreadyCurrent { holder: ThreadId },

    #[error("context is owned by thread {owner:?}, not by the calling thread {caller:?}")]
    NotOwner { owner: ThreadId, caller: ThreadId },
}

/// A fault reported by the emulated machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("machine fault: {0}")]
    Fault(String),

    #[error("machine shutdown failed: {0}")]
    Shutdown(String),
}

/// Terminal condition of an emulation session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Machine(#[from] MachineError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("emulation thread panicked")]
    ThreadPanicked,

    #[error("failed to spawn emulation thread: {0}")]
    Spawn(String),
}

/// Settings could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid deadzone {0}: must be in 0..=32767")]
    Deadzone(i32),
}

/// Misuse of the presentation shell's emulation lifecycle.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("emulation is already running")]
    AlreadyRunning,

    #[error("emulation is not running")]
    NotRunning,

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
