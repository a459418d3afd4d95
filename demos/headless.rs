//! Drive a toy machine without a window.
//!
//! A virtual controller pushes the left stick up and down while the machine runs, then
//! the machine is paused, single-stepped a few times and stopped.
//!
//! Run with `RUST_LOG=debug` to see the scheduler and input traces.

use emuhost::backends::VirtualDevice;
use emuhost::{
    ControllerAxis, ControllerButton, DeviceId, GraphicsContext, KeyInput, LogicalKey, Logger,
    Machine, MachineError, NotificationFilter, PresentationShell, Settings,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Context that only logs; there is no real surface.
struct NullContext;

impl GraphicsContext for NullContext {
    fn make_current(&self) {
        log::debug!("context current on {:?}", thread::current().id());
    }

    fn done_current(&self) {
        log::debug!("context released by {:?}", thread::current().id());
    }

    fn swap_buffers(&self) {}
}

struct PrintKeys;

impl KeyInput for PrintKeys {
    fn press_key(&self, key: LogicalKey, device: DeviceId) {
        log::info!("{device}: press {}", key.0);
    }

    fn release_key(&self, key: LogicalKey, device: DeviceId) {
        log::info!("{device}: release {}", key.0);
    }
}

/// Counts frames and instructions.
struct Counter {
    frames: Arc<AtomicU64>,
    instructions: u64,
}

impl Machine for Counter {
    fn run_loop(&mut self) -> Result<(), MachineError> {
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.instructions += 1000;
        thread::sleep(Duration::from_millis(16));
        Ok(())
    }

    fn single_step(&mut self) -> Result<(), MachineError> {
        self.instructions += 1;
        log::info!("stepped to instruction {}", self.instructions);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), MachineError> {
        log::info!("executed {} instructions", self.instructions);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::default();
    let mut shell = PresentationShell::new(NullContext, Arc::new(PrintKeys), &settings)?;
    shell.add_listener(Logger::new(), NotificationFilter::All);

    let mut pad = VirtualDevice::new("virtual pad");
    let script = [-30000, -20000, 0, 4000, 25000, 32767, 0];
    for value in script {
        pad.set_axis(ControllerAxis::LeftY, value);
    }
    pad.press_button(ControllerButton::Start);
    pad.release_button(ControllerButton::Start);
    shell.add_controller(pad);
    shell.reload_keymaps(&settings);

    let frames = Arc::new(AtomicU64::new(0));
    shell.start_emulation(Counter {
        frames: frames.clone(),
        instructions: 0,
    })?;

    shell.set_running(true);
    for _ in 0..10 {
        shell.poll_events();
        thread::sleep(Duration::from_millis(16));
    }

    shell.set_running(false);
    for _ in 0..3 {
        shell.request_single_step();
        thread::sleep(Duration::from_millis(5));
        shell.poll_events();
    }

    shell.stop_emulation()?;
    log::info!("ran {} frames", frames.load(Ordering::Relaxed));
    Ok(())
}
