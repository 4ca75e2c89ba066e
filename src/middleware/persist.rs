//! Mirroring store state into a [`Storage`] backend.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::Middleware;
use crate::error::MiddlewareError;
use crate::storage::Storage;

/// Where a store's state is persisted.
#[derive(Clone)]
pub struct PersistOptions {
    pub key: String,
    pub storage: Arc<dyn Storage>,
}

impl PersistOptions {
    pub fn new(key: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        Self {
            key: key.into(),
            storage,
        }
    }
}

impl fmt::Debug for PersistOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistOptions")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Serializes every next state to JSON and writes it under the configured key.
#[derive(Debug, Clone)]
pub struct Persist {
    options: PersistOptions,
}

/// Create a persist middleware.
///
/// [`StoreOptions::persist`](crate::StoreOptions::persist) appends one of these
/// after all other middleware and also rehydrates the store on creation, so
/// this is only needed when building a middleware chain by hand.
pub fn persist(options: PersistOptions) -> Persist {
    Persist { options }
}

impl<T: Serialize> Middleware<T> for Persist {
    fn call(&self, _prev: &T, next: &mut T) -> Result<(), MiddlewareError> {
        let key = &self.options.key;
        let json = serde_json::to_string(next).map_err(|source| MiddlewareError::Serialize {
            key: key.clone(),
            source,
        })?;
        self.options
            .storage
            .set_item(key, &json)
            .map_err(|source| MiddlewareError::Persist {
                key: key.clone(),
                source,
            })?;
        debug!(key = %key, bytes = json.len(), "persisted state");
        Ok(())
    }

    fn name(&self) -> &str {
        "persist"
    }
}

/// Load the persisted value for `options.key` on top of `initial`.
///
/// When both are JSON objects the stored keys overwrite the initial ones, so
/// fields added to the state since it was persisted keep their initial value.
/// Any failure is logged and `initial` is returned unchanged.
pub(crate) fn rehydrate<T>(options: &PersistOptions, initial: T) -> T
where
    T: Serialize + DeserializeOwned,
{
    let key = &options.key;
    let raw = match options.storage.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key = %key, "no persisted state");
            return initial;
        }
        Err(e) => {
            warn!(key = %key, error = %e, "failed to read persisted state");
            return initial;
        }
    };

    let stored: Value = match serde_json::from_str(&raw) {
        Ok(stored) => stored,
        Err(e) => {
            warn!(key = %key, error = %e, "persisted state is not valid JSON");
            return initial;
        }
    };

    match overlay(&initial, stored) {
        Ok(state) => {
            debug!(key = %key, "rehydrated state");
            state
        }
        Err(e) => {
            warn!(key = %key, error = %e, "persisted state does not match the state type");
            initial
        }
    }
}

fn overlay<T>(initial: &T, stored: Value) -> Result<T, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let merged = match (serde_json::to_value(initial)?, stored) {
        (Value::Object(mut base), Value::Object(fields)) => {
            base.extend(fields);
            Value::Object(base)
        }
        (_, stored) => stored,
    };
    serde_json::from_value(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde::Deserialize;
    use tracing_test::traced_test;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        age: u32,
        #[serde(default)]
        city: Option<String>,
    }

    fn john() -> Profile {
        Profile {
            name: "John Doe".to_string(),
            age: 30,
            city: Some("New York".to_string()),
        }
    }

    fn options(storage: &Arc<MemoryStorage>) -> PersistOptions {
        PersistOptions::new("profileStore", storage.clone())
    }

    #[test]
    fn writes_next_state_as_json() {
        let storage = Arc::new(MemoryStorage::new());
        let mut next = john();

        persist(options(&storage)).call(&john(), &mut next).unwrap();

        let raw = storage.get_item("profileStore").unwrap().unwrap();
        let stored: Profile = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored, john());
    }

    #[test]
    fn rehydrate_without_entry_keeps_initial() {
        let storage = Arc::new(MemoryStorage::new());
        assert_eq!(rehydrate(&options(&storage), john()), john());
    }

    #[test]
    fn rehydrate_overlays_stored_fields() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set_item("profileStore", r#"{"name":"Alice","age":41}"#)
            .unwrap();

        let state = rehydrate(&options(&storage), john());

        assert_eq!(state.name, "Alice");
        assert_eq!(state.age, 41);
        assert_eq!(state.city.as_deref(), Some("New York"));
    }

    #[test]
    fn rehydrate_replaces_non_object_state() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("count", "7").unwrap();

        let state = rehydrate(&PersistOptions::new("count", storage.clone()), 0i32);
        assert_eq!(state, 7);
    }

    #[test]
    #[traced_test]
    fn rehydrate_ignores_corrupt_entries() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("profileStore", "{not json").unwrap();
        assert_eq!(rehydrate(&options(&storage), john()), john());
        assert!(logs_contain("persisted state is not valid JSON"));

        storage.set_item("profileStore", r#"{"age":"old"}"#).unwrap();
        assert_eq!(rehydrate(&options(&storage), john()), john());
        assert!(logs_contain("does not match the state type"));
    }
}
