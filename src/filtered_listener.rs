use crate::eventbus::EmulationListener;
use crate::scheduler::Notification;

/// Wraps a listener and forwards only notifications accepted by a user-supplied predicate.
///
/// Unlike [`NotificationFilter::Custom`](crate::eventbus::NotificationFilter::Custom), the
/// predicate may capture state.
pub struct FilteredListener {
    predicate: Box<dyn FnMut(&Notification) -> bool + Send>,
    inner: Box<dyn EmulationListener>,
}

impl FilteredListener {
    pub fn new(
        predicate: impl FnMut(&Notification) -> bool + Send + 'static,
        inner: impl EmulationListener + 'static,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            inner: Box::new(inner),
        }
    }
}

impl EmulationListener for FilteredListener {
    fn on_notification(&mut self, notification: &Notification) {
        if (self.predicate)(notification) {
            self.inner.on_notification(notification);
        }
    }
}
