//! Polled input devices and their identifiers.

use crate::event::InputKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a logical input source (the keyboard, or one controller).
///
/// Allocated once per device by a [`DeviceIdAllocator`] and stable for the lifetime of
/// that device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev{}", self.0)
    }
}

/// Hands out [`DeviceId`]s in allocation order.
#[derive(Debug, Default)]
pub struct DeviceIdAllocator {
    next: u32,
}

impl DeviceIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> DeviceId {
        let id = DeviceId(self.next);
        self.next += 1;
        id
    }
}

/// A device polled once per presentation-thread cycle.
pub trait Device: Send {
    /// Drain the changes observed since the previous poll.
    fn poll(&mut self) -> Vec<InputKind>;

    /// Human-readable device name.
    fn name(&self) -> &str;
}
