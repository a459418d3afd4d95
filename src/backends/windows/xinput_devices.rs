#![cfg(target_os = "windows")]

//! Windows XInput controllers.
//!
//! Exposes the four XInput slots as [`Device`](crate::device::Device)s reporting the
//! standard controller layout.
//!
//! # Channel conventions
//! - Sticks report raw `-32768..=32767`, Y axes inverted so up is negative.
//! - Triggers report `0..=32767` (scaled from XInput's `0..=255`).
//! - The D-pad reports four buttons, not a hat.
//! - On disconnect every held button is released and every axis returns to rest, so
//!   nothing stays stuck down in the machine.

use crate::device::Device;
use crate::event::{ControllerAxis, ControllerButton, InputKind};

use windows_sys::Win32::UI::Input::XboxController::*;

const AXES: [ControllerAxis; 6] = [
    ControllerAxis::LeftX,
    ControllerAxis::LeftY,
    ControllerAxis::RightX,
    ControllerAxis::RightY,
    ControllerAxis::TriggerLeft,
    ControllerAxis::TriggerRight,
];

const BUTTON_MAP: &[(u16, ControllerButton)] = &[
    (XINPUT_GAMEPAD_A, ControllerButton::A),
    (XINPUT_GAMEPAD_B, ControllerButton::B),
    (XINPUT_GAMEPAD_X, ControllerButton::X),
    (XINPUT_GAMEPAD_Y, ControllerButton::Y),
    (XINPUT_GAMEPAD_BACK, ControllerButton::Back),
    (XINPUT_GAMEPAD_START, ControllerButton::Start),
    (XINPUT_GAMEPAD_LEFT_THUMB, ControllerButton::LeftStick),
    (XINPUT_GAMEPAD_RIGHT_THUMB, ControllerButton::RightStick),
    (XINPUT_GAMEPAD_LEFT_SHOULDER, ControllerButton::LeftShoulder),
    (XINPUT_GAMEPAD_RIGHT_SHOULDER, ControllerButton::RightShoulder),
    (XINPUT_GAMEPAD_DPAD_UP, ControllerButton::DpadUp),
    (XINPUT_GAMEPAD_DPAD_DOWN, ControllerButton::DpadDown),
    (XINPUT_GAMEPAD_DPAD_LEFT, ControllerButton::DpadLeft),
    (XINPUT_GAMEPAD_DPAD_RIGHT, ControllerButton::DpadRight),
];

/// XInput-backed controller in slot 0..4.
pub struct XInputDevice {
    index: u32,
    name: String,
    last_axes: [i16; 6],
    last_buttons: u16,
    connected: bool,
}

impl XInputDevice {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            name: format!("XInput Controller {index}"),
            last_axes: [0; 6],
            last_buttons: 0,
            connected: false,
        }
    }

    /// Invert a stick Y axis without overflowing on `i16::MIN`.
    #[inline]
    fn invert(v: i16) -> i16 {
        (-i32::from(v)).clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }

    #[inline]
    fn scale_trigger(v: u8) -> i16 {
        (i32::from(v) * i16::MAX as i32 / 255) as i16
    }

    /// Diff a new state against the last one.
    fn diff(&mut self, axes: [i16; 6], buttons: u16) -> Vec<InputKind> {
        let mut events = Vec::new();

        for (i, &value) in axes.iter().enumerate() {
            if value != self.last_axes[i] {
                self.last_axes[i] = value;
                events.push(InputKind::AxisMoved {
                    axis: AXES[i],
                    value,
                });
            }
        }

        let changed = buttons ^ self.last_buttons;
        for &(mask, button) in BUTTON_MAP {
            if changed & mask != 0 {
                if buttons & mask != 0 {
                    events.push(InputKind::ButtonPressed { button });
                } else {
                    events.push(InputKind::ButtonReleased { button });
                }
            }
        }
        self.last_buttons = buttons;

        events
    }
}

impl Device for XInputDevice {
    fn poll(&mut self) -> Vec<InputKind> {
        // FFI struct: must be manually zeroed
        let mut state: XINPUT_STATE = unsafe { std::mem::zeroed() };

        // XInputGetState returns 0 on success.
        let res = unsafe { XInputGetState(self.index, &mut state) };

        if res != 0 {
            if self.connected {
                self.connected = false;
                log::info!("{} disconnected", self.name);
                return self.diff([0; 6], 0);
            }
            return Vec::new();
        }

        if !self.connected {
            self.connected = true;
            log::info!("{} connected", self.name);
        }

        let gp = state.Gamepad;
        let axes = [
            gp.sThumbLX,
            Self::invert(gp.sThumbLY),
            gp.sThumbRX,
            Self::invert(gp.sThumbRY),
            Self::scale_trigger(gp.bLeftTrigger),
            Self::scale_trigger(gp.bRightTrigger),
        ];
        self.diff(axes, gp.wButtons)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invert_and_scale_stay_in_range() {
        assert_eq!(XInputDevice::invert(i16::MIN), i16::MAX);
        assert_eq!(XInputDevice::invert(100), -100);
        assert_eq!(XInputDevice::scale_trigger(0), 0);
        assert_eq!(XInputDevice::scale_trigger(255), i16::MAX);
    }

    #[test]
    fn diff_reports_edges_only() {
        let mut dev = XInputDevice::new(0);
        let events = dev.diff([0, 0, 0, 0, 0, 0], XINPUT_GAMEPAD_A);
        assert_eq!(
            events,
            vec![InputKind::ButtonPressed {
                button: ControllerButton::A
            }]
        );
        assert!(dev.diff([0; 6], XINPUT_GAMEPAD_A).is_empty());
        assert_eq!(dev.diff([0; 6], 0).len(), 1);
    }
}
