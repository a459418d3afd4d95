#![allow(dead_code)]

use emuhost::{DeviceId, GraphicsContext, KeyInput, LogicalKey, Machine, MachineError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Context double that panics if it is ever made current on two threads at once.
#[derive(Clone, Default)]
pub struct TrackingContext {
    pub current: Arc<Mutex<Option<ThreadId>>>,
    pub makes: Arc<AtomicUsize>,
    pub swaps: Arc<AtomicUsize>,
}

impl TrackingContext {
    pub fn current_on(&self) -> Option<ThreadId> {
        *self.current.lock()
    }
}

impl GraphicsContext for TrackingContext {
    fn make_current(&self) {
        let me = thread::current().id();
        let mut current = self.current.lock();
        if let Some(other) = *current {
            assert_eq!(other, me, "context made current on two threads");
        }
        *current = Some(me);
        self.makes.fetch_add(1, Ordering::SeqCst);
    }

    fn done_current(&self) {
        let mut current = self.current.lock();
        assert_eq!(*current, Some(thread::current().id()), "done_current off-thread");
        *current = None;
    }

    fn swap_buffers(&self) {
        assert_eq!(
            self.current_on(),
            Some(thread::current().id()),
            "swap on a context that is not current"
        );
        self.swaps.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingInput {
    pub events: Mutex<Vec<(bool, LogicalKey, DeviceId)>>,
}

impl RecordingInput {
    pub fn take(&self) -> Vec<(bool, LogicalKey, DeviceId)> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl KeyInput for RecordingInput {
    fn press_key(&self, key: LogicalKey, device: DeviceId) {
        self.events.lock().push((true, key, device));
    }

    fn release_key(&self, key: LogicalKey, device: DeviceId) {
        self.events.lock().push((false, key, device));
    }
}

#[derive(Default)]
pub struct MachineStats {
    pub runs: AtomicUsize,
    pub steps: AtomicUsize,
    pub shutdowns: AtomicUsize,
    /// Set if the machine ever executed without the context current on its thread.
    pub ran_without_context: AtomicBool,
}

impl MachineStats {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn steps(&self) -> usize {
        self.steps.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

/// Machine double that counts calls and checks it owns the context while executing.
pub struct CountingMachine {
    pub stats: Arc<MachineStats>,
    pub context: TrackingContext,
    pub fail_on_run: Option<usize>,
    pub panic_on_run: Option<usize>,
}

impl CountingMachine {
    pub fn new(context: &TrackingContext) -> (Arc<MachineStats>, Self) {
        let stats = Arc::new(MachineStats::default());
        let machine = Self {
            stats: stats.clone(),
            context: context.clone(),
            fail_on_run: None,
            panic_on_run: None,
        };
        (stats, machine)
    }

    fn check_context(&self) {
        if self.context.current_on() != Some(thread::current().id()) {
            self.stats.ran_without_context.store(true, Ordering::SeqCst);
        }
    }
}

impl Machine for CountingMachine {
    fn run_loop(&mut self) -> Result<(), MachineError> {
        self.check_context();
        let runs = self.stats.runs.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_run == Some(runs) {
            return Err(MachineError::Fault(format!("fault on run {runs}")));
        }
        if self.panic_on_run == Some(runs) {
            panic!("crash on run {runs}");
        }
        thread::sleep(Duration::from_micros(200));
        Ok(())
    }

    fn single_step(&mut self) -> Result<(), MachineError> {
        self.check_context();
        self.stats.steps.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), MachineError> {
        self.stats.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
