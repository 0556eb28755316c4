//! Single-slot deferred callback.
//!
//! Holds at most one pending `(callback, receiver)` pair. Registering again
//! replaces the previous pair; there is no queue. The receiver is held weakly
//! so a registration never keeps its owner alive.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Callback invoked with its receiver.
pub type Callback<R> = Arc<dyn Fn(&R) + Send + Sync>;

struct Registration<R> {
    callback: Callback<R>,
    receiver: Weak<R>,
}

impl<R> Clone for Registration<R> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
            receiver: Weak::clone(&self.receiver),
        }
    }
}

/// Stores one pending invocation and runs it on demand.
pub struct CallbackRegistry<R> {
    pending: Mutex<Option<Registration<R>>>,
}

impl<R> CallbackRegistry<R> {
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(None),
        }
    }

    /// Store `callback` bound to `receiver`, overwriting any previous registration.
    pub fn register(&self, callback: Callback<R>, receiver: &Arc<R>) {
        *self.pending.lock() = Some(Registration {
            callback,
            receiver: Arc::downgrade(receiver),
        });
    }

    /// Invoke the stored callback with its receiver.
    ///
    /// Returns false if nothing is registered or the receiver is gone. The
    /// registration stays in place, so `execute` can run it again.
    pub fn execute(&self) -> bool {
        // Clone out so the callback may re-register without deadlocking.
        let Some(registration) = self.pending.lock().clone() else {
            return false;
        };
        let Some(receiver) = registration.receiver.upgrade() else {
            return false;
        };
        (registration.callback)(&receiver);
        true
    }

    pub fn is_registered(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Drop the pending registration.
    pub fn clear(&self) {
        *self.pending.lock() = None;
    }
}

impl<R> Default for CallbackRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}
