//! Post-write hooks.
//!
//! A middleware runs after every write with the state before the write and a
//! mutable reference to the state after it. It may stamp fields on the next
//! state or return an error to report a rejected update.
//!
//! Built-ins:
//! - [`console_log`] - logs every transition
//! - [`timestamp`] - stamps `updated_at` on [`Timestamped`] states
//! - [`validation`] - checks [`ValidationCondition`]s against the next state
//! - [`debug`] - before/after callbacks
//! - [`throttle`] - warns about writes that arrive too close together
//! - [`persist`] - mirrors the state into a [`Storage`](crate::storage::Storage)

mod console_log;
mod debug;
mod persist;
mod throttle;
mod timestamp;
mod validation;

pub use console_log::{console_log, ConsoleLog};
pub use debug::{debug, DebugHooks};
pub use persist::{persist, Persist, PersistOptions};
pub use throttle::{throttle, Throttle};
pub use timestamp::{timestamp, Timestamp, Timestamped, UPDATED_AT};
pub use validation::{validation, Level, Validation, ValidationCondition};

pub(crate) use persist::rehydrate;

use crate::error::MiddlewareError;

/// A hook invoked after every write.
///
/// Middleware runs on a working copy while the store's write lock is free, so
/// it may read or subscribe to the store it is attached to. Reads see the state
/// before the write. Writing to that store from a middleware deadlocks.
pub trait Middleware<T>: Send + Sync {
    /// Inspect the transition from `prev` to `next`.
    fn call(&self, prev: &T, next: &mut T) -> Result<(), MiddlewareError>;

    /// Name used when logging errors from this middleware.
    fn name(&self) -> &str {
        "middleware"
    }
}

impl<T, F> Middleware<T> for F
where
    F: Fn(&T, &mut T) -> Result<(), MiddlewareError> + Send + Sync,
{
    fn call(&self, prev: &T, next: &mut T) -> Result<(), MiddlewareError> {
        self(prev, next)
    }
}
