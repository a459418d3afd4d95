//! Routing of physical input into the machine.
//!
//! [`InputRouter`] owns the polled devices and the axis debouncer, and forwards everything
//! through the shared [`KeyMap`]. It lives on the presentation thread; polling is never
//! concurrent with itself, but runs concurrently with the emulation thread.

use crate::axis::AxisDebouncer;
use crate::binding::KeyMap;
use crate::config::{InputSettings, KeyMapping};
use crate::device::{Device, DeviceId, DeviceIdAllocator};
use crate::event::{InputEvent, InputKind, PhysicalCode};
use crate::machine::KeyInput;
use std::sync::Arc;

struct Registered {
    id: DeviceId,
    device: Box<dyn Device>,
}

pub struct InputRouter {
    ids: DeviceIdAllocator,
    keyboard: DeviceId,
    devices: Vec<Registered>,
    keymap: Arc<KeyMap>,
    axes: AxisDebouncer,
    /// Controller bindings from the last reload, applied to controllers added later.
    controller_bindings: Vec<KeyMapping>,
}

impl InputRouter {
    /// Create a router with a keyboard device and no controllers.
    pub fn new(input: Arc<dyn KeyInput>) -> Self {
        let mut ids = DeviceIdAllocator::new();
        let keyboard = ids.allocate();
        Self {
            ids,
            keyboard,
            devices: Vec::new(),
            keymap: Arc::new(KeyMap::new(input)),
            axes: AxisDebouncer::default(),
            controller_bindings: Vec::new(),
        }
    }

    pub fn keyboard(&self) -> DeviceId {
        self.keyboard
    }

    pub fn keymap(&self) -> &Arc<KeyMap> {
        &self.keymap
    }

    /// Ids of the registered controllers, in registration order.
    pub fn controllers(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.devices.iter().map(|r| r.id)
    }

    /// Register a polled device with the controller bindings of the last [`reload`](Self::reload).
    pub fn add_device<D: Device + 'static>(&mut self, device: D) -> DeviceId {
        self.add_boxed(Box::new(device))
    }

    pub fn add_boxed(&mut self, device: Box<dyn Device>) -> DeviceId {
        let id = self.ids.allocate();
        log::info!("registered input device {id}: {}", device.name());
        self.keymap.reload_device(id, &self.controller_bindings);
        self.devices.push(Registered { id, device });
        id
    }

    /// Rebuild every device's bindings from `settings` in one atomic swap.
    pub fn reload(&mut self, settings: &InputSettings) {
        self.axes.set_threshold(settings.deadzone);

        let mut entries = vec![(self.keyboard, settings.keyboard.as_slice())];
        entries.extend(
            self.devices
                .iter()
                .map(|r| (r.id, settings.controller.as_slice())),
        );
        self.keymap.reload_all(entries);
        self.controller_bindings = settings.controller.clone();
    }

    pub fn key_pressed(&self, code: u32) {
        self.keymap.press(self.keyboard, PhysicalCode::Key(code));
    }

    pub fn key_released(&self, code: u32) {
        self.keymap.release(self.keyboard, PhysicalCode::Key(code));
    }

    /// Poll every device once and route what they report. Returns the routed events.
    pub fn poll_all(&mut self) -> Vec<InputEvent> {
        let mut events = Vec::new();
        for registered in self.devices.iter_mut() {
            let id = registered.id;
            events.extend(
                registered
                    .device
                    .poll()
                    .into_iter()
                    .map(|kind| InputEvent::new(id, kind)),
            );
        }
        for event in &events {
            self.route(event);
        }
        events
    }

    /// Apply one event to the key map.
    pub fn route(&mut self, event: &InputEvent) {
        match event.kind {
            InputKind::ButtonPressed { button } => {
                self.keymap.press(event.device, PhysicalCode::Button(button));
            }
            InputKind::ButtonReleased { button } => {
                self.keymap.release(event.device, PhysicalCode::Button(button));
            }
            InputKind::AxisMoved { axis, value } => {
                for edge in self.axes.feed(event.device, axis, value) {
                    if edge.pressed {
                        self.keymap.press(event.device, edge.code);
                    } else {
                        self.keymap.release(event.device, edge.code);
                    }
                }
            }
        }
    }
}
