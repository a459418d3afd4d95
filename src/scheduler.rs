//! Emulation thread scheduling.
//!
//! The emulation thread runs the machine as fast as it can while running, executes single
//! instructions on request, and otherwise blocks until told to do something.
//!
//! The presentation thread controls it through a [`SchedulerHandle`], which sends
//! [`Command`]s over a channel. Only the emulation thread ever changes the running, step
//! and stop flags, so the idle wait is a plain blocking receive: any command that could
//! change the wait predicate wakes it, and the predicate is re-checked after every wake.
//!
//! Debug-mode notifications come back over a second channel and are emitted on edges only:
//! `DebugModeLeft` when execution becomes active, `DebugModeEntered` when it stops being
//! active without a stop request.
//!
//! A panic inside the machine is caught and treated as a fault, so the exit path (shutdown,
//! context handback, `Faulted` and `Stopped`) runs no matter how the session ends.

use crate::context::ContextBroker;
use crate::error::{MachineError, SchedulerError};
use crate::machine::Machine;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

/// Lifecycle state of the emulation thread, as last published by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped = 0,
    Idle = 1,
    Running = 2,
    SteppingOnce = 3,
}

impl RunState {
    fn from_discriminant(discriminant: u8) -> Self {
        match discriminant {
            0 => Self::Stopped,
            1 => Self::Idle,
            2 => Self::Running,
            3 => Self::SteppingOnce,
            _ => panic!("invalid run state discriminant: {discriminant}"),
        }
    }
}

/// Requests from the presentation thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    SetRunning(bool),
    Step,
    Stop,
}

/// Messages from the emulation thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    DebugModeEntered,
    DebugModeLeft,
    /// The session ended on an error. Always followed by `Stopped`.
    Faulted(SchedulerError),
    /// The session is over and the context has been handed back.
    Stopped,
}

#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    wakeups: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(RunState::Stopped as u8),
            wakeups: AtomicU64::new(0),
        }
    }
}

/// Presentation-side handle to one emulation session.
///
/// Dropping the handle requests a stop and joins the thread.
pub struct SchedulerHandle {
    commands: Sender<Command>,
    notifications: Receiver<Notification>,
    shared: Arc<Shared>,
    thread: Option<JoinHandle<Result<(), SchedulerError>>>,
}

/// Spawn the emulation thread for `machine`.
///
/// The thread blocks until [`SchedulerHandle::start`], so the caller can migrate the
/// graphics context to [`SchedulerHandle::thread_id`] first. On exit the thread hands the
/// context to `home`.
pub fn spawn<M: Machine + 'static>(
    machine: M,
    broker: Arc<ContextBroker>,
    home: ThreadId,
) -> Result<SchedulerHandle, SchedulerError> {
    let (command_sender, command_receiver) = mpsc::channel();
    let (notification_sender, notification_receiver) = mpsc::channel();
    let shared = Arc::new(Shared::new());

    let scheduler = Scheduler::new(
        machine,
        command_receiver,
        notification_sender,
        Arc::clone(&shared),
    );
    let thread = thread::Builder::new()
        .name("emu".into())
        .spawn(move || scheduler.session(&broker, home))
        .map_err(|e| SchedulerError::Spawn(e.to_string()))?;

    Ok(SchedulerHandle {
        commands: command_sender,
        notifications: notification_receiver,
        shared,
        thread: Some(thread),
    })
}

impl SchedulerHandle {
    /// Id of the emulation thread (the context migration destination).
    pub fn thread_id(&self) -> Option<ThreadId> {
        self.thread.as_ref().map(|t| t.thread().id())
    }

    /// Let the thread acquire the context and enter its loop.
    pub fn start(&self) {
        self.send(Command::Start);
    }

    pub fn set_running(&self, running: bool) {
        self.send(Command::SetRunning(running));
    }

    /// Ask for one instruction. Requests made while one is still pending are merged.
    pub fn request_single_step(&self) {
        self.send(Command::Step);
    }

    pub fn request_stop(&self) {
        self.send(Command::Stop);
    }

    pub fn run_state(&self) -> RunState {
        RunState::from_discriminant(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.run_state() == RunState::Running
    }

    /// Number of times the thread has blocked in its idle wait.
    pub fn wake_cycles(&self) -> u64 {
        self.shared.wakeups.load(Ordering::Relaxed)
    }

    /// Next pending notification, without blocking.
    pub fn try_notification(&self) -> Option<Notification> {
        self.notifications.try_recv().ok()
    }

    /// Every pending notification, without blocking.
    pub fn drain_notifications(&self) -> Vec<Notification> {
        self.notifications.try_iter().collect()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the thread to exit and return how the session ended.
    pub fn join(&mut self) -> Result<(), SchedulerError> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| {
                self.shared
                    .state
                    .store(RunState::Stopped as u8, Ordering::Release);
                SchedulerError::ThreadPanicked
            })?,
            None => Ok(()),
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            log::debug!("emulation thread already exited, dropping {command:?}");
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.request_stop();
            if let Err(e) = self.join() {
                log::warn!("emulation session ended with error: {e}");
            }
        }
    }
}

/// Emulation-thread side of a session.
struct Scheduler<M> {
    machine: M,
    commands: Receiver<Command>,
    notifications: Sender<Notification>,
    shared: Arc<Shared>,
    running: bool,
    step_pending: bool,
    stop: bool,
    /// Whether the previous iteration executed code (or is about to step again), so
    /// `DebugModeLeft` is emitted before the next execution only when needed.
    was_active: bool,
}

impl<M: Machine> Scheduler<M> {
    fn new(
        machine: M,
        commands: Receiver<Command>,
        notifications: Sender<Notification>,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            machine,
            commands,
            notifications,
            shared,
            running: false,
            step_pending: false,
            stop: false,
            was_active: false,
        }
    }

    /// Whole thread body: start gate, loop, exit action.
    fn session(mut self, broker: &ContextBroker, home: ThreadId) -> Result<(), SchedulerError> {
        if !self.wait_for_start() {
            log::debug!("emulation session cancelled before start");
            self.publish(RunState::Stopped);
            self.emit(Notification::Stopped);
            return Ok(());
        }

        log::info!("emulation thread started");
        let result = match broker.acquire() {
            Ok(()) => contain("machine", MachineError::Fault, || self.drive())
                .map_err(SchedulerError::from),
            Err(e) => Err(e.into()),
        };

        let machine = &mut self.machine;
        let shutdown = contain("shutdown", MachineError::Shutdown, || machine.shutdown())
            .map_err(SchedulerError::from);
        let handback = broker.migrate(home).map_err(SchedulerError::from);
        let result = result.and(shutdown).and(handback);

        if let Err(e) = &result {
            log::error!("emulation stopped: {e}");
            self.emit(Notification::Faulted(e.clone()));
        } else {
            log::info!("emulation thread stopped");
        }
        self.publish(RunState::Stopped);
        self.emit(Notification::Stopped);
        result
    }

    /// Block until `Start`. Returns `false` if the session was stopped first.
    fn wait_for_start(&mut self) -> bool {
        loop {
            match self.commands.recv() {
                Ok(Command::Start) => return true,
                Ok(Command::Stop) | Err(_) => return false,
                Ok(command) => self.apply(command),
            }
        }
    }

    fn drive(&mut self) -> Result<(), MachineError> {
        self.publish(RunState::Idle);
        while !self.stop {
            self.tick()?;
        }
        Ok(())
    }

    /// One loop iteration.
    fn tick(&mut self) -> Result<(), MachineError> {
        self.drain();
        if self.stop {
            return Ok(());
        }

        if self.running {
            self.publish(RunState::Running);
            if !self.was_active {
                self.emit(Notification::DebugModeLeft);
            }

            self.machine.run_loop()?;

            self.drain();
            self.was_active = self.running || self.step_pending;
            if !self.was_active && !self.stop {
                self.emit(Notification::DebugModeEntered);
            }
        } else if self.step_pending {
            self.publish(RunState::SteppingOnce);
            if !self.was_active {
                self.emit(Notification::DebugModeLeft);
            }

            self.step_pending = false;
            self.machine.single_step()?;
            self.emit(Notification::DebugModeEntered);
            // give observers a chance to inspect state before the next instruction
            thread::yield_now();

            self.was_active = false;
        } else {
            self.publish(RunState::Idle);
            self.idle_wait();
        }
        Ok(())
    }

    fn idle_wait(&mut self) {
        while !(self.running || self.step_pending || self.stop) {
            self.shared.wakeups.fetch_add(1, Ordering::Relaxed);
            match self.commands.recv() {
                Ok(command) => self.apply(command),
                Err(_) => {
                    log::debug!("command channel closed, stopping");
                    self.stop = true;
                }
            }
        }
    }

    fn drain(&mut self) {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.apply(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.stop = true;
                    break;
                }
            }
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Start => log::trace!("ignoring repeated start"),
            Command::SetRunning(running) => self.running = running,
            Command::Step => {
                if self.step_pending {
                    log::trace!("step already pending");
                }
                self.step_pending = true;
            }
            Command::Stop => self.stop = true,
        }
    }

    fn publish(&self, state: RunState) {
        self.shared.state.store(state as u8, Ordering::Release);
    }

    fn emit(&self, notification: Notification) {
        let _ = self.notifications.send(notification);
    }
}

/// Run `f`, turning a panic into `wrap(message)`.
fn contain(
    what: &str,
    wrap: fn(String) -> MachineError,
    f: impl FnOnce() -> Result<(), MachineError>,
) -> Result<(), MachineError> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = format!("{what} panicked: {}", panic_message(payload.as_ref()));
        log::error!("{message}");
        Err(wrap(message))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Calls {
        runs: usize,
        steps: usize,
        shutdowns: usize,
    }

    /// Machine whose `run_loop` replays scripted commands, as if the presentation thread
    /// sent them while the iteration was executing.
    struct ScriptedMachine {
        calls: Calls,
        feedback: Sender<Command>,
        script: VecDeque<Vec<Command>>,
        fail_on_run: Option<usize>,
    }

    impl Machine for ScriptedMachine {
        fn run_loop(&mut self) -> Result<(), MachineError> {
            self.calls.runs += 1;
            if self.fail_on_run == Some(self.calls.runs) {
                return Err(MachineError::Fault("bad opcode".into()));
            }
            for command in self.script.pop_front().unwrap_or_default() {
                self.feedback.send(command).unwrap();
            }
            Ok(())
        }

        fn single_step(&mut self) -> Result<(), MachineError> {
            self.calls.steps += 1;
            Ok(())
        }

        fn shutdown(&mut self) -> Result<(), MachineError> {
            self.calls.shutdowns += 1;
            Ok(())
        }
    }

    struct Rig {
        scheduler: Scheduler<ScriptedMachine>,
        commands: Sender<Command>,
        notifications: Receiver<Notification>,
    }

    impl Rig {
        fn new(script: Vec<Vec<Command>>) -> Self {
            let (commands, command_rx) = mpsc::channel();
            let (notify_tx, notifications) = mpsc::channel();
            let machine = ScriptedMachine {
                calls: Calls::default(),
                feedback: commands.clone(),
                script: script.into(),
                fail_on_run: None,
            };
            let scheduler = Scheduler::new(machine, command_rx, notify_tx, Arc::new(Shared::new()));
            Self {
                scheduler,
                commands,
                notifications,
            }
        }

        fn send(&self, command: Command) {
            self.commands.send(command).unwrap();
        }

        fn notifications(&self) -> Vec<Notification> {
            self.notifications.try_iter().collect()
        }
    }

    use Notification::{DebugModeEntered as Entered, DebugModeLeft as Left};

    #[test]
    fn running_emits_left_once_then_entered_on_pause() {
        let mut rig = Rig::new(vec![vec![], vec![], vec![Command::SetRunning(false)]]);
        rig.send(Command::SetRunning(true));

        for _ in 0..3 {
            rig.scheduler.tick().unwrap();
        }

        assert_eq!(rig.scheduler.machine.calls.runs, 3);
        assert_eq!(rig.notifications(), vec![Left, Entered]);
        assert_eq!(rig.scheduler.shared.state.load(Ordering::Relaxed), RunState::Running as u8);
    }

    #[test]
    fn notifications_alternate_across_pause_resume_cycles() {
        let mut rig = Rig::new(vec![
            vec![Command::SetRunning(false), Command::SetRunning(true)],
            vec![Command::SetRunning(false)],
            vec![Command::SetRunning(false), Command::Step],
        ]);

        rig.send(Command::SetRunning(true));
        rig.scheduler.tick().unwrap();
        rig.scheduler.tick().unwrap();
        rig.send(Command::SetRunning(true));
        rig.scheduler.tick().unwrap();
        rig.scheduler.tick().unwrap();

        // run 1: paused and resumed inside one iteration, still active
        // run 2: paused -> Entered
        // run 3: paused with a step pending, still active
        // step: no Left (still active), then Entered
        assert_eq!(rig.notifications(), vec![Left, Entered, Left, Entered]);
        assert_eq!(rig.scheduler.machine.calls.runs, 3);
        assert_eq!(rig.scheduler.machine.calls.steps, 1);
    }

    #[test]
    fn repeated_step_requests_before_observation_step_once() {
        let mut rig = Rig::new(vec![]);
        rig.send(Command::Step);
        rig.send(Command::Step);
        rig.send(Command::Step);

        rig.scheduler.tick().unwrap();
        assert_eq!(rig.scheduler.machine.calls.steps, 1);
        assert!(!rig.scheduler.step_pending);

        rig.send(Command::Step);
        rig.scheduler.tick().unwrap();
        assert_eq!(rig.scheduler.machine.calls.steps, 2);
        assert_eq!(rig.notifications(), vec![Left, Entered, Left, Entered]);
    }

    #[test]
    fn stop_during_run_suppresses_entered() {
        let mut rig = Rig::new(vec![vec![Command::SetRunning(false), Command::Stop]]);
        rig.send(Command::SetRunning(true));

        rig.scheduler.drive().unwrap();

        assert_eq!(rig.scheduler.machine.calls.runs, 1);
        assert_eq!(rig.notifications(), vec![Left]);
    }

    #[test]
    fn machine_fault_ends_the_loop() {
        let mut rig = Rig::new(vec![]);
        rig.scheduler.machine.fail_on_run = Some(2);
        rig.send(Command::SetRunning(true));

        let err = rig.scheduler.drive().unwrap_err();

        assert_eq!(err, MachineError::Fault("bad opcode".into()));
        assert_eq!(rig.scheduler.machine.calls.runs, 2);
    }

    #[test]
    fn dropped_sender_counts_as_stop() {
        let Rig {
            mut scheduler,
            commands,
            notifications: _notifications,
        } = Rig::new(vec![]);
        drop(commands);
        scheduler.machine.feedback = mpsc::channel().0;

        scheduler.drive().unwrap();
        assert!(scheduler.stop);
    }

    #[test]
    fn commands_before_start_are_kept() {
        let mut rig = Rig::new(vec![]);
        rig.send(Command::SetRunning(true));
        rig.send(Command::Step);
        rig.send(Command::Start);

        assert!(rig.scheduler.wait_for_start());
        assert!(rig.scheduler.running);
        assert!(rig.scheduler.step_pending);
    }

    #[test]
    fn stop_before_start_cancels() {
        let mut rig = Rig::new(vec![]);
        rig.send(Command::Stop);
        assert!(!rig.scheduler.wait_for_start());
    }
}
