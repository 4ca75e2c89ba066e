use std::fmt;

use tracing::info;

use super::Middleware;
use crate::error::MiddlewareError;

/// Logs every transition at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleLog;

/// Create a middleware that logs the state before and after each write.
pub fn console_log() -> ConsoleLog {
    ConsoleLog
}

impl<T: fmt::Debug> Middleware<T> for ConsoleLog {
    fn call(&self, prev: &T, next: &mut T) -> Result<(), MiddlewareError> {
        info!(prev = ?prev, next = ?next, "State updated");
        Ok(())
    }

    fn name(&self) -> &str {
        "console_log"
    }
}
