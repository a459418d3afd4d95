//! Input backends.
//!
//! Implementations of [`Device`](crate::device::Device) for controller sources, plus the
//! [`GamepadSubsystem`](hid::GamepadSubsystem) handle that brings them up.
//!
//! # Feature flags
//! - **`hid`** enables HID controller enumeration through `hidapi` (default).
//! - **`gilrs`** polls controllers through `gilrs` on platforms without XInput (default).
//!
//! XInput controllers are always available on Windows.

#[cfg(all(feature = "gilrs", not(target_os = "windows")))]
pub mod gilrs_pads;
pub mod hid;
pub mod virtual_input;

#[cfg(target_os = "windows")]
#[cfg_attr(docsrs, doc(cfg(target_os = "windows")))]
pub mod windows;

pub use hid::{ControllerInfo, GamepadSubsystem};
pub use virtual_input::VirtualDevice;
