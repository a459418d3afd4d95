//! Interfaces to the emulated machine.
//!
//! The machine itself is opaque: the scheduler only runs it, steps it and shuts it down,
//! and the input layer only presses and releases its logical keys.

use crate::device::DeviceId;
use crate::error::MachineError;
use serde::{Deserialize, Serialize};

/// A key code understood by the emulated machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogicalKey(pub u16);

/// Execution capability driven by the emulation scheduler.
///
/// All methods are called from the emulation thread only.
pub trait Machine: Send {
    /// Run one iteration of the main loop (typically one frame).
    fn run_loop(&mut self) -> Result<(), MachineError>;

    /// Execute a single instruction.
    fn single_step(&mut self) -> Result<(), MachineError>;

    /// Tear the machine down. Called exactly once per session.
    fn shutdown(&mut self) -> Result<(), MachineError>;
}

/// The machine's input state.
///
/// Called from the presentation thread while the machine runs on the emulation thread,
/// so implementations must tolerate that interleaving. Calls are fire-and-forget.
pub trait KeyInput: Send + Sync {
    fn press_key(&self, key: LogicalKey, device: DeviceId);
    fn release_key(&self, key: LogicalKey, device: DeviceId);
}

/// Named logical inputs of the emulated handheld.
///
/// The order of [`NativeInput::ALL`] is the order bindings are listed in settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeInput {
    A,
    B,
    X,
    Y,
    L,
    R,
    Zl,
    Zr,
    Start,
    Select,
    Home,
    DUp,
    DDown,
    DLeft,
    DRight,
    CircleUp,
    CircleDown,
    CircleLeft,
    CircleRight,
    CStickUp,
    CStickDown,
    CStickLeft,
    CStickRight,
}

impl NativeInput {
    pub const ALL: [NativeInput; 23] = [
        NativeInput::A,
        NativeInput::B,
        NativeInput::X,
        NativeInput::Y,
        NativeInput::L,
        NativeInput::R,
        NativeInput::Zl,
        NativeInput::Zr,
        NativeInput::Start,
        NativeInput::Select,
        NativeInput::Home,
        NativeInput::DUp,
        NativeInput::DDown,
        NativeInput::DLeft,
        NativeInput::DRight,
        NativeInput::CircleUp,
        NativeInput::CircleDown,
        NativeInput::CircleLeft,
        NativeInput::CircleRight,
        NativeInput::CStickUp,
        NativeInput::CStickDown,
        NativeInput::CStickLeft,
        NativeInput::CStickRight,
    ];

    /// The logical key this input is delivered to the machine as.
    pub fn key(self) -> LogicalKey {
        LogicalKey(self as u16)
    }
}
