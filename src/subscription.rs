//! Subscription handles and the trait shared by every subscribable store.

use std::fmt;

type Cancel = Box<dyn FnOnce() + Send + Sync>;

/// Handle returned by `subscribe`.
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    cancels: Vec<Cancel>,
}

impl Subscription {
    pub(crate) fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancels: vec![Box::new(cancel)],
        }
    }

    /// Merge several handles into one that cancels all of them.
    pub(crate) fn merge(subscriptions: Vec<Subscription>) -> Self {
        Self {
            cancels: subscriptions.into_iter().flat_map(|s| s.cancels).collect(),
        }
    }

    /// Remove the listener this handle was created for.
    pub fn unsubscribe(self) {
        for cancel in self.cancels {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("registrations", &self.cancels.len())
            .finish()
    }
}

/// Anything that hands out its current value and notifies listeners on change.
///
/// Implementors call a new listener once immediately with the current value
/// and then after every change.
pub trait Subscribable: Send + Sync {
    type Value;

    /// Register a listener.
    fn subscribe_boxed(&self, listener: Box<dyn Fn(&Self::Value) + Send + Sync>) -> Subscription;

    /// Owned copy of the current value.
    fn current(&self) -> Self::Value;

    /// Register a listener closure.
    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Self::Value) + Send + Sync + 'static,
        Self: Sized,
    {
        self.subscribe_boxed(Box::new(listener))
    }
}
