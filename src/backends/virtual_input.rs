use crate::event::{ControllerAxis, ControllerButton, InputKind};
use crate::Device;

/// A scriptable controller: queued changes are reported on the next poll.
///
/// Useful for headless runs, replays and tests.
#[derive(Debug, Default)]
pub struct VirtualDevice {
    name: String,
    events: Vec<InputKind>,
}

impl VirtualDevice {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            events: Vec::new(),
        }
    }

    /// Queue a raw input change.
    pub fn feed(&mut self, kind: InputKind) {
        self.events.push(kind);
    }

    pub fn set_axis(&mut self, axis: ControllerAxis, value: i16) {
        self.feed(InputKind::AxisMoved { axis, value });
    }

    pub fn press_button(&mut self, button: ControllerButton) {
        self.feed(InputKind::ButtonPressed { button });
    }

    pub fn release_button(&mut self, button: ControllerButton) {
        self.feed(InputKind::ButtonReleased { button });
    }
}

impl Device for VirtualDevice {
    fn poll(&mut self) -> Vec<InputKind> {
        std::mem::take(&mut self.events)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
