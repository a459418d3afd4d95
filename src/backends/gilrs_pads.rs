//! Cross-platform controllers through gilrs.
//!
//! `Gilrs` is not `Send`, so it lives on its own pump thread. The pump forwards each pad's
//! events over a channel to the [`GilrsDevice`] handed out for that pad, which the router
//! polls on the presentation thread like any other device.
//!
//! # Channel conventions
//! - Sticks are scaled from `-1.0..=1.0` to `-32767..=32767`, Y inverted so up is negative.
//! - Triggers (`LeftZ`/`RightZ`) are scaled from `0.0..=1.0` to `0..=32767`.
//! - When a pad disconnects its device releases every held button and recentres every axis.

use crate::device::Device;
use crate::error::InitError;
use crate::event::{ControllerAxis, ControllerButton, InputKind};
use gilrs::{Axis, Button, Event, EventType, Gilrs};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const PUMP_INTERVAL: Duration = Duration::from_millis(4);

#[derive(Default)]
struct PumpShared {
    stop: AtomicBool,
    /// Connected pads by gilrs id.
    pads: Mutex<HashMap<usize, String>>,
    /// Where each pad's events go, once a device was opened for it.
    sinks: Mutex<HashMap<usize, Sender<InputKind>>>,
}

impl PumpShared {
    fn connect(&self, pad: usize, name: &str) {
        log::info!("gamepad {pad} connected: {name}");
        self.pads.lock().insert(pad, name.to_string());
    }

    fn disconnect(&self, pad: usize) {
        log::info!("gamepad {pad} disconnected");
        self.pads.lock().remove(&pad);
        // dropping the sender tells the device its pad is gone
        self.sinks.lock().remove(&pad);
    }

    fn forward(&self, pad: usize, kind: InputKind) {
        let mut sinks = self.sinks.lock();
        if let Some(sink) = sinks.get(&pad) {
            if sink.send(kind).is_err() {
                sinks.remove(&pad);
            }
        }
    }
}

/// Owner of the gilrs pump thread.
pub struct GilrsPump {
    shared: Arc<PumpShared>,
    thread: Option<JoinHandle<()>>,
}

impl GilrsPump {
    /// Start the pump and wait until gilrs is up and the initial pads are known.
    pub fn start() -> Result<Self, InitError> {
        let shared = Arc::new(PumpShared::default());
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        let pump_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("gilrs".into())
            .spawn(move || {
                let gilrs = match Gilrs::new() {
                    Ok(gilrs) => gilrs,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                for (id, gamepad) in gilrs.gamepads() {
                    pump_shared.connect(usize::from(id), gamepad.name());
                }
                let _ = ready_tx.send(Ok(()));
                pump(gilrs, &pump_shared);
            })
            .map_err(|e| InitError::Backend(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                shared,
                thread: Some(thread),
            }),
            Ok(Err(message)) => {
                let _ = thread.join();
                Err(InitError::Backend(message))
            }
            Err(_) => Err(InitError::Backend("gilrs thread exited during startup".into())),
        }
    }

    /// Names of the pads connected right now.
    pub fn connected(&self) -> Vec<String> {
        self.shared.pads.lock().values().cloned().collect()
    }

    /// Open a device for every connected pad. A pad opened again is routed to the new
    /// device only.
    pub fn open_devices(&self) -> Vec<Box<dyn Device>> {
        let pads = self.shared.pads.lock().clone();
        let mut sinks = self.shared.sinks.lock();
        pads.into_iter()
            .map(|(pad, name)| {
                let (tx, rx) = mpsc::channel();
                sinks.insert(pad, tx);
                Box::new(GilrsDevice::new(name, rx)) as Box<dyn Device>
            })
            .collect()
    }
}

impl Drop for GilrsPump {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("gilrs pump thread panicked");
            }
        }
    }
}

fn pump(mut gilrs: Gilrs, shared: &PumpShared) {
    while !shared.stop.load(Ordering::Acquire) {
        while let Some(Event { id, event, .. }) = gilrs.next_event() {
            let pad = usize::from(id);
            match event {
                EventType::Connected => shared.connect(pad, gilrs.gamepad(id).name()),
                EventType::Disconnected => shared.disconnect(pad),
                other => {
                    if let Some(kind) = translate(other) {
                        shared.forward(pad, kind);
                    }
                }
            }
        }
        thread::sleep(PUMP_INTERVAL);
    }
    log::debug!("gilrs pump stopped");
}

fn translate(event: EventType) -> Option<InputKind> {
    match event {
        EventType::ButtonPressed(button, _) => {
            map_button(button).map(|button| InputKind::ButtonPressed { button })
        }
        EventType::ButtonReleased(button, _) => {
            map_button(button).map(|button| InputKind::ButtonReleased { button })
        }
        EventType::AxisChanged(axis, value, _) => map_axis(axis).map(|axis| InputKind::AxisMoved {
            axis,
            value: scale_axis(axis, value),
        }),
        _ => None,
    }
}

fn map_button(button: Button) -> Option<ControllerButton> {
    Some(match button {
        Button::South => ControllerButton::A,
        Button::East => ControllerButton::B,
        Button::West => ControllerButton::X,
        Button::North => ControllerButton::Y,
        Button::Select => ControllerButton::Back,
        Button::Mode => ControllerButton::Guide,
        Button::Start => ControllerButton::Start,
        Button::LeftThumb => ControllerButton::LeftStick,
        Button::RightThumb => ControllerButton::RightStick,
        Button::LeftTrigger => ControllerButton::LeftShoulder,
        Button::RightTrigger => ControllerButton::RightShoulder,
        Button::DPadUp => ControllerButton::DpadUp,
        Button::DPadDown => ControllerButton::DpadDown,
        Button::DPadLeft => ControllerButton::DpadLeft,
        Button::DPadRight => ControllerButton::DpadRight,
        _ => return None,
    })
}

fn map_axis(axis: Axis) -> Option<ControllerAxis> {
    Some(match axis {
        Axis::LeftStickX => ControllerAxis::LeftX,
        Axis::LeftStickY => ControllerAxis::LeftY,
        Axis::RightStickX => ControllerAxis::RightX,
        Axis::RightStickY => ControllerAxis::RightY,
        Axis::LeftZ => ControllerAxis::TriggerLeft,
        Axis::RightZ => ControllerAxis::TriggerRight,
        _ => return None,
    })
}

fn scale_axis(axis: ControllerAxis, value: f32) -> i16 {
    let value = match axis {
        ControllerAxis::LeftY | ControllerAxis::RightY => -value.clamp(-1.0, 1.0),
        ControllerAxis::TriggerLeft | ControllerAxis::TriggerRight => value.clamp(0.0, 1.0),
        ControllerAxis::LeftX | ControllerAxis::RightX => value.clamp(-1.0, 1.0),
    };
    (value * f32::from(i16::MAX)).round() as i16
}

/// One gilrs pad as a polled [`Device`].
pub struct GilrsDevice {
    name: String,
    events: Option<Receiver<InputKind>>,
    held: Vec<ControllerButton>,
    displaced: Vec<ControllerAxis>,
}

impl GilrsDevice {
    fn new(name: String, events: Receiver<InputKind>) -> Self {
        Self {
            name,
            events: Some(events),
            held: Vec::new(),
            displaced: Vec::new(),
        }
    }

    fn track(&mut self, kind: &InputKind) {
        match *kind {
            InputKind::ButtonPressed { button } => {
                if !self.held.contains(&button) {
                    self.held.push(button);
                }
            }
            InputKind::ButtonReleased { button } => self.held.retain(|b| *b != button),
            InputKind::AxisMoved { axis, value } => {
                self.displaced.retain(|a| *a != axis);
                if value != 0 {
                    self.displaced.push(axis);
                }
            }
        }
    }

    fn let_go(&mut self) -> Vec<InputKind> {
        let buttons = self
            .held
            .drain(..)
            .map(|button| InputKind::ButtonReleased { button });
        let axes = self
            .displaced
            .drain(..)
            .map(|axis| InputKind::AxisMoved { axis, value: 0 });
        buttons.chain(axes).collect()
    }
}

impl Device for GilrsDevice {
    fn poll(&mut self) -> Vec<InputKind> {
        let Some(events) = self.events.take() else {
            return Vec::new();
        };

        let mut out = Vec::new();
        loop {
            match events.try_recv() {
                Ok(kind) => {
                    self.track(&kind);
                    out.push(kind);
                }
                Err(TryRecvError::Empty) => {
                    self.events = Some(events);
                    break;
                }
                Err(TryRecvError::Disconnected) => {
                    log::info!("{} went away, releasing its inputs", self.name);
                    out.extend(self.let_go());
                    break;
                }
            }
        }
        out
    }

    fn name(&self) -> &str {
        &self.name
    }
}
