use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::Middleware;
use crate::error::MiddlewareError;
use crate::lock::lock;

/// Warns when writes arrive faster than a threshold.
///
/// Writes are never blocked. A write that arrives too soon is reported and
/// does not reset the window.
#[derive(Debug)]
pub struct Throttle {
    threshold: Duration,
    last_update: Mutex<Option<Instant>>,
}

/// Create a middleware that warns about writes less than `threshold` apart.
pub fn throttle(threshold: Duration) -> Throttle {
    Throttle {
        threshold,
        last_update: Mutex::new(None),
    }
}

impl Throttle {
    /// Returns `true` if a write at `now` is outside the window.
    fn admit(&self, now: Instant) -> bool {
        let mut last_update = lock(&self.last_update);
        let previous = *last_update;
        match previous {
            Some(last) if now.duration_since(last) < self.threshold => {
                warn!(
                    elapsed_ms = now.duration_since(last).as_millis() as u64,
                    threshold_ms = self.threshold.as_millis() as u64,
                    "Throttle: update occurred too soon"
                );
                false
            }
            _ => {
                if let Some(last) = previous {
                    debug!(
                        elapsed_ms = now.duration_since(last).as_millis() as u64,
                        "Throttle: update allowed"
                    );
                }
                *last_update = Some(now);
                true
            }
        }
    }
}

impl<T> Middleware<T> for Throttle {
    fn call(&self, _prev: &T, _next: &mut T) -> Result<(), MiddlewareError> {
        self.admit(Instant::now());
        Ok(())
    }

    fn name(&self) -> &str {
        "throttle"
    }
}
