mod support;

use emuhost::scheduler::{self, Notification, RunState, SchedulerHandle};
use emuhost::{ContextBroker, MachineError, SchedulerError};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use support::*;

struct Session {
    context: TrackingContext,
    broker: Arc<ContextBroker>,
    stats: Arc<MachineStats>,
    handle: SchedulerHandle,
}

fn start_session(fail_on_run: Option<usize>) -> Session {
    init_logger();
    let context = TrackingContext::default();
    let broker = Arc::new(ContextBroker::new(context.clone()));
    broker.acquire().unwrap();

    let (stats, mut machine) = CountingMachine::new(&context);
    machine.fail_on_run = fail_on_run;

    let handle = scheduler::spawn(machine, broker.clone(), thread::current().id()).unwrap();
    broker.migrate(handle.thread_id().unwrap()).unwrap();
    handle.start();
    assert!(wait_until(TIMEOUT, || handle.run_state() == RunState::Idle));

    Session {
        context,
        broker,
        stats,
        handle,
    }
}

fn assert_alternating(notifications: &[Notification]) {
    let debug: Vec<_> = notifications
        .iter()
        .filter(|n| matches!(n, Notification::DebugModeEntered | Notification::DebugModeLeft))
        .collect();
    for pair in debug.windows(2) {
        assert_ne!(pair[0], pair[1], "repeated notification in {debug:?}");
    }
}

#[test]
fn pause_resume_cycles_notify_on_edges_only() {
    let mut s = start_session(None);

    for _ in 0..3 {
        let before = s.stats.runs();
        s.handle.set_running(true);
        assert!(wait_until(TIMEOUT, || s.stats.runs() > before + 2));
        s.handle.set_running(false);
        assert!(wait_until(TIMEOUT, || s.handle.run_state() == RunState::Idle));
    }

    s.handle.request_stop();
    s.handle.join().unwrap();

    let notifications = s.handle.drain_notifications();
    assert_alternating(&notifications);
    let count = |n: Notification| notifications.iter().filter(|x| **x == n).count();
    assert_eq!(count(Notification::DebugModeLeft), 3);
    assert_eq!(count(Notification::DebugModeEntered), 3);
    assert_eq!(notifications.last(), Some(&Notification::Stopped));
    assert!(!s.stats.ran_without_context.load(Ordering::SeqCst));
}

#[test]
fn idle_wait_does_not_spin() {
    let mut s = start_session(None);
    assert!(wait_until(TIMEOUT, || s.handle.wake_cycles() >= 1));

    let before = s.handle.wake_cycles();
    thread::sleep(Duration::from_millis(200));
    assert_eq!(s.handle.wake_cycles(), before);
    assert_eq!(s.stats.runs(), 0);
    assert_eq!(s.stats.steps(), 0);

    // a command that leaves the predicate false costs one wake, not a spin
    s.handle.set_running(false);
    assert!(wait_until(TIMEOUT, || s.handle.wake_cycles() == before + 1));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(s.handle.wake_cycles(), before + 1);

    s.handle.request_stop();
    s.handle.join().unwrap();
}

#[test]
fn every_observed_step_request_steps_exactly_once() {
    let mut s = start_session(None);

    for n in 1..=5 {
        s.handle.request_single_step();
        assert!(wait_until(TIMEOUT, || s.stats.steps() == n));
        assert!(wait_until(TIMEOUT, || s.handle.run_state() == RunState::Idle));
    }
    thread::sleep(Duration::from_millis(20));
    assert_eq!(s.stats.steps(), 5);
    assert_eq!(s.stats.runs(), 0);

    s.handle.request_stop();
    s.handle.join().unwrap();

    let notifications = s.handle.drain_notifications();
    assert_alternating(&notifications);
    assert_eq!(
        notifications
            .iter()
            .filter(|n| **n == Notification::DebugModeEntered)
            .count(),
        5
    );
}

#[test]
fn burst_of_step_requests_never_over_steps() {
    let mut s = start_session(None);

    for _ in 0..3 {
        s.handle.request_single_step();
    }
    assert!(wait_until(TIMEOUT, || s.stats.steps() >= 1));
    thread::sleep(Duration::from_millis(50));
    let steps = s.stats.steps();
    assert!((1..=3).contains(&steps), "{steps} steps for 3 requests");

    s.handle.request_stop();
    s.handle.join().unwrap();
}

#[test]
fn stop_shuts_down_once_and_returns_the_context() {
    let mut s = start_session(None);
    let home = thread::current().id();

    s.handle.set_running(true);
    assert!(wait_until(TIMEOUT, || s.stats.runs() > 0));
    s.handle.request_stop();
    s.handle.join().unwrap();

    assert_eq!(s.stats.shutdowns(), 1);
    assert_eq!(s.handle.run_state(), RunState::Stopped);
    assert_eq!(s.broker.owner(), home);
    assert_eq!(s.broker.current_on(), None);
    assert_eq!(s.context.current_on(), None);

    s.broker.acquire().unwrap();
    assert_eq!(s.context.current_on(), Some(home));
}

#[test]
fn machine_fault_is_terminal_and_surfaced() {
    let mut s = start_session(Some(3));
    let home = thread::current().id();

    s.handle.set_running(true);
    let err = s.handle.join().unwrap_err();
    let expected = SchedulerError::Machine(MachineError::Fault("fault on run 3".into()));

    assert_eq!(err, expected);
    assert_eq!(s.stats.runs(), 3);
    assert_eq!(s.stats.shutdowns(), 1);
    assert_eq!(s.broker.owner(), home);

    let notifications = s.handle.drain_notifications();
    assert_eq!(
        &notifications[notifications.len() - 2..],
        &[Notification::Faulted(expected), Notification::Stopped]
    );

    // commands after the session ended are ignored
    s.handle.set_running(true);
    s.handle.request_single_step();
}

#[test]
fn machine_panic_still_runs_the_exit_path() {
    init_logger();
    let context = TrackingContext::default();
    let broker = Arc::new(ContextBroker::new(context.clone()));
    broker.acquire().unwrap();
    let (stats, mut machine) = CountingMachine::new(&context);
    machine.panic_on_run = Some(2);
    let home = thread::current().id();

    let mut handle = scheduler::spawn(machine, broker.clone(), home).unwrap();
    broker.migrate(handle.thread_id().unwrap()).unwrap();
    handle.start();
    handle.set_running(true);
    let err = handle.join().unwrap_err();

    let expected = SchedulerError::Machine(MachineError::Fault(
        "machine panicked: crash on run 2".into(),
    ));
    assert_eq!(err, expected);
    assert_eq!(stats.shutdowns(), 1);
    assert_eq!(handle.run_state(), RunState::Stopped);
    assert_eq!(broker.owner(), home);
    assert_eq!(context.current_on(), None);

    let notifications = handle.drain_notifications();
    assert_eq!(
        &notifications[notifications.len() - 2..],
        &[Notification::Faulted(expected), Notification::Stopped]
    );
}

#[test]
fn start_without_context_is_an_ownership_violation() {
    init_logger();
    let context = TrackingContext::default();
    let broker = Arc::new(ContextBroker::new(context.clone()));
    broker.acquire().unwrap();
    let (stats, machine) = CountingMachine::new(&context);

    // context never migrated: the emulation thread must not be able to take it
    let mut handle = scheduler::spawn(machine, broker.clone(), thread::current().id()).unwrap();
    handle.start();
    let err = handle.join().unwrap_err();

    assert!(matches!(err, SchedulerError::Context(_)));
    assert_eq!(stats.runs(), 0);
    assert_eq!(stats.shutdowns(), 1);
    assert_eq!(broker.current_on(), Some(thread::current().id()));
}

#[test]
fn dropping_the_handle_stops_the_thread() {
    let s = start_session(None);
    let stats = s.stats.clone();
    s.handle.set_running(true);
    assert!(wait_until(TIMEOUT, || stats.runs() > 0));

    drop(s.handle);
    assert_eq!(stats.shutdowns(), 1);
}
