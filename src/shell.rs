//! Presentation-thread side of the emulator frontend.
//!
//! [`PresentationShell`] hosts the drawable surface's graphics context, forwards window and
//! controller input to the machine, and owns the lifecycle of the emulation thread. It must
//! be created and used on the presentation thread.
//!
//! # Context handoff
//! The shell owns the context while no emulation runs. Starting emulation migrates it to
//! the emulation thread before that thread is released; when the thread exits it migrates
//! the context back, and [`stop_emulation`](PresentationShell::stop_emulation) makes it
//! current here again.
//!
//! # Example
//! ```no_run
//! # use emuhost::*;
//! # struct Gl; impl GraphicsContext for Gl {
//! #     fn make_current(&self) {} fn done_current(&self) {} fn swap_buffers(&self) {} }
//! # struct Keys; impl KeyInput for Keys {
//! #     fn press_key(&self, _: LogicalKey, _: DeviceId) {}
//! #     fn release_key(&self, _: LogicalKey, _: DeviceId) {} }
//! # struct Toy; impl Machine for Toy {
//! #     fn run_loop(&mut self) -> Result<(), MachineError> { Ok(()) }
//! #     fn single_step(&mut self) -> Result<(), MachineError> { Ok(()) }
//! #     fn shutdown(&mut self) -> Result<(), MachineError> { Ok(()) } }
//! let mut shell = PresentationShell::new(Gl, std::sync::Arc::new(Keys), &Settings::default())?;
//! shell.add_listener(Logger::new(), NotificationFilter::All);
//! shell.start_emulation(Toy)?;
//! shell.set_running(true);
//! loop {
//!     shell.poll_events();
//!     # break;
//! }
//! shell.stop_emulation()?;
//! # Ok::<(), ShellError>(())
//! ```

use crate::backends::hid::GamepadSubsystem;
use crate::config::Settings;
use crate::context::{ContextBroker, GraphicsContext};
use crate::device::{Device, DeviceId};
use crate::error::{ContextError, ShellError};
use crate::event::InputEvent;
use crate::eventbus::{EmulationListener, NotificationBus, NotificationFilter};
use crate::machine::{KeyInput, Machine};
use crate::manager::InputRouter;
use crate::scheduler::{self, Notification, RunState, SchedulerHandle};
use std::sync::Arc;
use std::thread::{self, ThreadId};

pub struct PresentationShell {
    thread: ThreadId,
    broker: Arc<ContextBroker>,
    router: InputRouter,
    bus: NotificationBus,
    emu: Option<SchedulerHandle>,
    /// Whether this thread may paint. Off while the emulation thread renders.
    painting: bool,
}

impl PresentationShell {
    /// Create the shell on the calling thread and make the context current here.
    pub fn new(
        context: impl GraphicsContext + 'static,
        input: Arc<dyn KeyInput>,
        settings: &Settings,
    ) -> Result<Self, ContextError> {
        let broker = Arc::new(ContextBroker::new(context));
        broker.acquire()?;

        let mut router = InputRouter::new(input);
        router.reload(&settings.input);

        Ok(Self {
            thread: thread::current().id(),
            broker,
            router,
            bus: NotificationBus::new(),
            emu: None,
            painting: true,
        })
    }

    pub fn broker(&self) -> &Arc<ContextBroker> {
        &self.broker
    }

    pub fn router(&self) -> &InputRouter {
        &self.router
    }

    pub fn keyboard(&self) -> DeviceId {
        self.router.keyboard()
    }

    pub fn painting_enabled(&self) -> bool {
        self.painting
    }

    pub fn add_listener(
        &mut self,
        listener: impl EmulationListener + 'static,
        filter: NotificationFilter,
    ) -> u64 {
        self.bus.add_listener(listener, filter)
    }

    pub fn remove_listener(&mut self, id: u64) {
        self.bus.remove_listener(id);
    }

    /// Register a controller with the controller bindings currently loaded.
    pub fn add_controller(&mut self, device: impl Device + 'static) -> DeviceId {
        self.router.add_device(device)
    }

    /// Register every pollable controller of `subsystem`.
    pub fn add_controllers_from(&mut self, subsystem: &GamepadSubsystem) -> Vec<DeviceId> {
        for info in subsystem.enumerated() {
            log::debug!("enumerated controller: {info:?}");
        }
        subsystem
            .controllers()
            .into_iter()
            .map(|device| self.router.add_boxed(device))
            .collect()
    }

    /// Rebuild all key bindings from `settings`.
    pub fn reload_keymaps(&mut self, settings: &Settings) {
        self.router.reload(&settings.input);
    }

    pub fn key_press(&self, code: u32) {
        self.router.key_pressed(code);
    }

    pub fn key_release(&self, code: u32) {
        self.router.key_released(code);
    }

    /// Spawn the emulation thread for `machine` and hand it the context.
    ///
    /// The machine starts paused; call [`set_running`](Self::set_running) to run it.
    pub fn start_emulation<M: Machine + 'static>(&mut self, machine: M) -> Result<(), ShellError> {
        if self.emu.is_some() {
            return Err(ShellError::AlreadyRunning);
        }

        let mut emu = scheduler::spawn(machine, Arc::clone(&self.broker), self.thread)?;
        let Some(emu_thread) = emu.thread_id() else {
            return Err(ShellError::NotRunning);
        };

        self.painting = false;
        if let Err(e) = self.move_context(emu_thread) {
            self.painting = true;
            emu.request_stop();
            let _ = emu.join();
            return Err(e.into());
        }
        emu.start();
        self.emu = Some(emu);
        log::info!("emulation started on {emu_thread:?}");
        Ok(())
    }

    /// Stop the emulation thread, wait for it and take the context back.
    ///
    /// Returns how the session ended. Notifications still queued are dispatched first.
    pub fn stop_emulation(&mut self) -> Result<(), ShellError> {
        let Some(mut emu) = self.emu.take() else {
            return Err(ShellError::NotRunning);
        };

        emu.request_stop();
        let result = emu.join();
        self.deliver(emu.drain_notifications());
        self.router.keymap().release_all();

        let reacquired = self.broker.acquire();
        if reacquired.is_ok() {
            self.painting = true;
        }
        log::info!("emulation stopped");
        // the session result takes precedence over a failed handback
        result?;
        reacquired?;
        Ok(())
    }

    pub fn set_running(&self, running: bool) {
        if let Some(emu) = &self.emu {
            emu.set_running(running);
        }
    }

    pub fn request_single_step(&self) {
        if let Some(emu) = &self.emu {
            emu.request_single_step();
        }
    }

    /// Ask the emulation thread to stop without waiting for it.
    pub fn request_stop(&self) {
        if let Some(emu) = &self.emu {
            emu.request_stop();
        }
    }

    pub fn run_state(&self) -> RunState {
        self.emu.as_ref().map_or(RunState::Stopped, |e| e.run_state())
    }

    pub fn is_running(&self) -> bool {
        self.run_state() == RunState::Running
    }

    /// Whether an emulation thread exists and has not exited yet.
    pub fn emulation_active(&self) -> bool {
        self.emu.as_ref().is_some_and(|e| !e.is_finished())
    }

    /// One presentation-thread cycle: poll controllers, then deliver notifications.
    ///
    /// Returns the controller events that were routed.
    pub fn poll_events(&mut self) -> Vec<InputEvent> {
        let events = self.router.poll_all();
        let notifications = self
            .emu
            .as_ref()
            .map(|emu| emu.drain_notifications())
            .unwrap_or_default();
        self.deliver(notifications);
        events
    }

    /// Swap buffers from the presentation thread (only valid while not emulating).
    pub fn swap_buffers(&self) -> Result<(), ContextError> {
        self.broker.swap_buffers()
    }

    /// Release the context here and hand it to the emulation thread. The way back is the
    /// emulation thread's own exit action.
    fn move_context(&self, emu_thread: ThreadId) -> Result<(), ContextError> {
        debug_assert_eq!(thread::current().id(), self.thread);
        self.broker.migrate(emu_thread)
    }

    fn deliver(&mut self, notifications: Vec<Notification>) {
        for notification in &notifications {
            if let Notification::Faulted(e) = notification {
                log::error!("emulation fault: {e}");
            }
        }
        self.bus.emit_all(&notifications);
    }
}

impl Drop for PresentationShell {
    fn drop(&mut self) {
        if self.emu.is_some() {
            if let Err(e) = self.stop_emulation() {
                log::warn!("emulation ended with error during shutdown: {e}");
            }
        }
    }
}
