//! Subscribe-only views.

use crate::subscription::{Subscribable, Subscription};

/// Wraps any [`Subscribable`] and exposes only `subscribe` and `current`.
///
/// Hand one of these to code that should observe a store without being able
/// to write to it.
#[derive(Clone, Debug)]
pub struct Readable<S> {
    inner: S,
}

impl<S: Subscribable> Readable<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&S::Value) + Send + Sync + 'static,
    {
        self.inner.subscribe_boxed(Box::new(listener))
    }

    pub fn current(&self) -> S::Value {
        self.inner.current()
    }
}

impl<S: Subscribable> Subscribable for Readable<S> {
    type Value = S::Value;

    fn subscribe_boxed(&self, listener: Box<dyn Fn(&S::Value) + Send + Sync>) -> Subscription {
        self.inner.subscribe_boxed(listener)
    }

    fn current(&self) -> S::Value {
        self.inner.current()
    }
}
