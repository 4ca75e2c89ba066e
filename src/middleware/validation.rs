use std::fmt;

use tracing::{info, warn};

use super::Middleware;
use crate::error::MiddlewareError;

/// What a failed condition does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    /// Log the message at `info`.
    Log,
    /// Log the message at `warn`.
    Warn,
    /// Reject the update with [`MiddlewareError::Validation`].
    #[default]
    Error,
}

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// A predicate the next state must satisfy.
pub struct ValidationCondition<T> {
    predicate: Predicate<T>,
    message: String,
    level: Level,
}

impl<T> ValidationCondition<T> {
    /// An error-level condition.
    pub fn new<F>(predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
            message: message.into(),
            level: Level::default(),
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<T> fmt::Debug for ValidationCondition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationCondition")
            .field("message", &self.message)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

/// Checks a list of conditions against every next state.
#[derive(Debug)]
pub struct Validation<T> {
    conditions: Vec<ValidationCondition<T>>,
}

/// Create a middleware that checks `conditions` in order.
///
/// The first failing error-level condition stops the check and is returned
/// as the middleware's error.
pub fn validation<T>(conditions: Vec<ValidationCondition<T>>) -> Validation<T> {
    Validation { conditions }
}

impl<T> Middleware<T> for Validation<T> {
    fn call(&self, _prev: &T, next: &mut T) -> Result<(), MiddlewareError> {
        for condition in &self.conditions {
            if (condition.predicate)(next) {
                continue;
            }
            match condition.level {
                Level::Log => info!("{}", condition.message),
                Level::Warn => warn!("{}", condition.message),
                Level::Error => return Err(MiddlewareError::Validation(condition.message.clone())),
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "validation"
    }
}
