//! Exclusive graphics context handoff.
//!
//! A graphics context can be current on at most one thread. [`ContextBroker`] tracks the
//! owning thread and whether the context is current there, and performs the
//! make-current / done-current / swap calls only when that bookkeeping allows them.
//!
//! Ownership moves only through [`ContextBroker::migrate`], which releases on the calling
//! thread and hands ownership to an explicit destination in one critical section. The
//! destination then calls [`ContextBroker::acquire`] from its own thread.

use crate::error::ContextError;
use parking_lot::Mutex;
use std::thread::{self, ThreadId};

/// The windowing layer's graphics context.
///
/// Every method acts on the calling thread, like the underlying GL/EGL calls.
pub trait GraphicsContext: Send + Sync {
    fn make_current(&self);
    fn done_current(&self);
    fn swap_buffers(&self);
}

#[derive(Debug, Clone, Copy)]
struct Ownership {
    owner: ThreadId,
    current: bool,
}

/// Single-writer guard around a [`GraphicsContext`].
pub struct ContextBroker {
    context: Box<dyn GraphicsContext>,
    ownership: Mutex<Ownership>,
}

impl ContextBroker {
    /// Wrap `context`, owned (but not current) on the calling thread.
    pub fn new(context: impl GraphicsContext + 'static) -> Self {
        Self {
            context: Box::new(context),
            ownership: Mutex::new(Ownership {
                owner: thread::current().id(),
                current: false,
            }),
        }
    }

    /// Thread currently allowed to use the context.
    pub fn owner(&self) -> ThreadId {
        self.ownership.lock().owner
    }

    /// Thread the context is current on, if any.
    pub fn current_on(&self) -> Option<ThreadId> {
        let own = self.ownership.lock();
        own.current.then_some(own.owner)
    }

    /// Make the context current on the calling thread.
    pub fn acquire(&self) -> Result<(), ContextError> {
        let caller = thread::current().id();
        let mut own = self.ownership.lock();
        Self::check_owner(&own, caller)?;
        if !own.current {
            self.context.make_current();
            own.current = true;
            log::trace!("context made current on {caller:?}");
        }
        Ok(())
    }

    /// Make the context not current on the calling thread.
    pub fn release(&self) -> Result<(), ContextError> {
        let caller = thread::current().id();
        let mut own = self.ownership.lock();
        Self::check_owner(&own, caller)?;
        if own.current {
            self.context.done_current();
            own.current = false;
            log::trace!("context released on {caller:?}");
        }
        Ok(())
    }

    /// Release on the calling thread and hand ownership to `to`.
    pub fn migrate(&self, to: ThreadId) -> Result<(), ContextError> {
        let caller = thread::current().id();
        let mut own = self.ownership.lock();
        Self::check_owner(&own, caller)?;
        if own.current {
            self.context.done_current();
            own.current = false;
        }
        own.owner = to;
        log::debug!("context migrated {caller:?} -> {to:?}");
        Ok(())
    }

    /// Swap buffers from the calling thread.
    ///
    /// Makes the context current first if it is not, since a migration may have happened
    /// since the last explicit acquire.
    pub fn swap_buffers(&self) -> Result<(), ContextError> {
        let caller = thread::current().id();
        let mut own = self.ownership.lock();
        Self::check_owner(&own, caller)?;
        if !own.current {
            self.context.make_current();
            own.current = true;
        }
        self.context.swap_buffers();
        Ok(())
    }

    fn check_owner(own: &Ownership, caller: ThreadId) -> Result<(), ContextError> {
        if own.owner == caller {
            return Ok(());
        }
        if own.current {
            Err(ContextError::AlreadyCurrent { holder: own.owner })
        } else {
            Err(ContextError::NotOwner {
                owner: own.owner,
                caller,
            })
        }
    }
}
