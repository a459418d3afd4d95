//! Physical input events and codes.
//!
//! Devices report changes as small deltas ([`InputKind`]). The router turns those into
//! [`PhysicalCode`] presses and releases, which the key mapping table resolves to
//! logical keys.
//!
//! ## Value conventions
//! - **Controller axes:** raw signed magnitude in `-32768..=32767`. Stick Y axes are
//!   reported with up negative. Triggers report `0..=32767`.
//! - **Buttons:** press/release edges.
//! - **Keyboard:** host key codes (`u32`), delivered by the presentation layer rather than
//!   polled.

use crate::device::DeviceId;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Buttons of a standard game controller.
///
/// Discriminants are stable and follow the common game-controller layout, so they can be
/// used as compact indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum ControllerButton {
    A = 0,
    B = 1,
    X = 2,
    Y = 3,
    Back = 4,
    Guide = 5,
    Start = 6,
    LeftStick = 7,
    RightStick = 8,
    LeftShoulder = 9,
    RightShoulder = 10,
    DpadUp = 11,
    DpadDown = 12,
    DpadLeft = 13,
    DpadRight = 14,
}

/// Analog axes of a standard game controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum ControllerAxis {
    LeftX = 0,
    LeftY = 1,
    RightX = 2,
    RightY = 3,
    TriggerLeft = 4,
    TriggerRight = 5,
}

/// Which side of the deadzone an axis half covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisDirection {
    Negative,
    Positive,
}

/// One direction of one analog axis, bindable like a button.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisHalf {
    pub axis: ControllerAxis,
    pub direction: AxisDirection,
}

impl AxisHalf {
    pub fn negative(axis: ControllerAxis) -> Self {
        Self {
            axis,
            direction: AxisDirection::Negative,
        }
    }

    pub fn positive(axis: ControllerAxis) -> Self {
        Self {
            axis,
            direction: AxisDirection::Positive,
        }
    }
}

/// A physical input identifier, unique per device.
///
/// In TOML this reads as `{ key = 65 }`, `{ button = "a" }` or
/// `{ axis = { axis = "left_x", direction = "negative" } }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalCode {
    Key(u32),
    Button(ControllerButton),
    Axis(AxisHalf),
}

impl From<ControllerButton> for PhysicalCode {
    fn from(button: ControllerButton) -> Self {
        PhysicalCode::Button(button)
    }
}

impl From<AxisHalf> for PhysicalCode {
    fn from(half: AxisHalf) -> Self {
        PhysicalCode::Axis(half)
    }
}

/// Per-device input change (delta) reported by a polled device.
#[derive(Clone, Debug, PartialEq)]
pub enum InputKind {
    /// An analog axis moved. `value` is the raw signed magnitude.
    AxisMoved { axis: ControllerAxis, value: i16 },

    /// A button transitioned to pressed.
    ButtonPressed { button: ControllerButton },

    /// A button transitioned to released.
    ButtonReleased { button: ControllerButton },
}

/// Timestamped input event, tagged with the device that produced it.
#[derive(Clone, Debug)]
pub struct InputEvent {
    /// Capture time (monotonic).
    pub at: Instant,
    pub device: DeviceId,
    pub kind: InputKind,
}

impl InputEvent {
    pub fn new(device: DeviceId, kind: InputKind) -> Self {
        Self {
            at: Instant::now(),
            device,
            kind,
        }
    }
}
