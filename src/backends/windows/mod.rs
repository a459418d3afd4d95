#![cfg(target_os = "windows")]

//! Windows input backends.
//!
//! Only XInput controllers are polled here. Keyboard input arrives through the host's
//! window events and is handed to the presentation shell directly.

pub mod xinput_devices;

use crate::device::Device;
use xinput_devices::XInputDevice;

/// Number of XInput slots.
pub const XINPUT_SLOTS: u32 = 4;

/// Wrap every XInput slot, connected or not. Slots report nothing until a pad appears.
pub fn open_xinput_slots() -> Vec<Box<dyn Device>> {
    (0..XINPUT_SLOTS)
        .map(|index| Box::new(XInputDevice::new(index)) as Box<dyn Device>)
        .collect()
}
