use crate::eventbus::EmulationListener;
use crate::scheduler::Notification;

/// A listener that writes every notification to the `log` facade.
///
/// Faults are logged at error level, everything else at info.
#[derive(Debug, Default)]
pub struct Logger;

impl Logger {
    pub fn new() -> Self {
        Logger
    }
}

impl EmulationListener for Logger {
    fn on_notification(&mut self, notification: &Notification) {
        match notification {
            Notification::Faulted(e) => log::error!("[Emu] faulted: {e}"),
            other => log::info!("[Emu] {other:?}"),
        }
    }
}
