use crate::scheduler::Notification;
use std::collections::HashMap;

/// Trait for reacting to emulation notifications on the presentation thread.
pub trait EmulationListener: Send {
    fn on_notification(&mut self, notification: &Notification);
}

impl<F> EmulationListener for F
where
    F: FnMut(&Notification) + Send,
{
    fn on_notification(&mut self, notification: &Notification) {
        self(notification)
    }
}

/// Determines which notifications a listener wants to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationFilter {
    All,
    /// `DebugModeEntered` / `DebugModeLeft` only.
    DebugMode,
    /// `Faulted` / `Stopped` only.
    Lifecycle,
    Custom(fn(&Notification) -> bool),
}

impl NotificationFilter {
    fn accepts(&self, notification: &Notification) -> bool {
        match self {
            NotificationFilter::All => true,
            NotificationFilter::DebugMode => matches!(
                notification,
                Notification::DebugModeEntered | Notification::DebugModeLeft
            ),
            NotificationFilter::Lifecycle => matches!(
                notification,
                Notification::Faulted(_) | Notification::Stopped
            ),
            NotificationFilter::Custom(f) => f(notification),
        }
    }
}

/// Registered listener with its filter and mute flag.
struct ListenerEntry {
    listener: Box<dyn EmulationListener>,
    enabled: bool,
    filter: NotificationFilter,
}

/// Fans scheduler notifications out to listeners, in registration order.
#[derive(Default)]
pub struct NotificationBus {
    next_id: u64,
    listeners: HashMap<u64, ListenerEntry>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener and returns its id.
    pub fn add_listener(
        &mut self,
        listener: impl EmulationListener + 'static,
        filter: NotificationFilter,
    ) -> u64 {
        let id = self.next_id;
        self.listeners.insert(
            id,
            ListenerEntry {
                listener: Box::new(listener),
                enabled: true,
                filter,
            },
        );
        self.next_id += 1;
        id
    }

    pub fn enable(&mut self, id: u64) {
        if let Some(entry) = self.listeners.get_mut(&id) {
            entry.enabled = true;
        }
    }

    /// Mutes a listener without removing it.
    pub fn disable(&mut self, id: u64) {
        if let Some(entry) = self.listeners.get_mut(&id) {
            entry.enabled = false;
        }
    }

    pub fn remove_listener(&mut self, id: u64) {
        self.listeners.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Delivers one notification to every enabled, matching listener.
    pub fn emit(&mut self, notification: &Notification) {
        let mut ids: Vec<u64> = self.listeners.keys().copied().collect();
        ids.sort_unstable();

        for id in ids {
            let Some(entry) = self.listeners.get_mut(&id) else {
                continue;
            };
            if entry.enabled && entry.filter.accepts(notification) {
                entry.listener.on_notification(notification);
            }
        }
    }

    pub fn emit_all(&mut self, notifications: &[Notification]) {
        for notification in notifications {
            self.emit(notification);
        }
    }
}
