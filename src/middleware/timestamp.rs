use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use super::Middleware;
use crate::error::MiddlewareError;

/// Field name stamped on JSON object states.
pub const UPDATED_AT: &str = "updatedAt";

/// State that records when it was last written.
pub trait Timestamped {
    fn set_updated_at(&mut self, at: DateTime<Utc>);
}

/// JSON object states get an `updatedAt` ISO 8601 string; other JSON values
/// are left alone.
impl Timestamped for Value {
    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        if let Value::Object(fields) = self {
            fields.insert(
                UPDATED_AT.to_string(),
                Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }
    }
}

/// Stamps the current UTC time on the next state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timestamp;

/// Create a middleware that stamps `updated_at` on every write.
pub fn timestamp() -> Timestamp {
    Timestamp
}

impl<T: Timestamped> Middleware<T> for Timestamp {
    fn call(&self, _prev: &T, next: &mut T) -> Result<(), MiddlewareError> {
        next.set_updated_at(Utc::now());
        Ok(())
    }

    fn name(&self) -> &str {
        "timestamp"
    }
}
