use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, trace};

use super::options::StoreOptions;
use crate::error::{MiddlewareError, StoreError};
use crate::lock::{lock, read, write};
use crate::middleware::{Middleware, PersistOptions};
use crate::readable::Readable;
use crate::subscription::{Subscribable, Subscription};

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Subscribers<T> = RwLock<Vec<(usize, Subscriber<T>)>>;

static NEXT_SUBSCRIBER_ID: AtomicUsize = AtomicUsize::new(0);

/// A thread-safe store for managing application state.
///
/// Every write goes through the same pipeline: the update is applied, the
/// middleware chain runs with the previous and next state, and then every
/// subscriber is notified in the order it subscribed.
///
/// Writes happen one at a time. The update and the middleware chain work on a
/// copy of the state, so middleware and updaters may read the store; the copy
/// replaces the live state once the chain has finished.
pub struct Store<T> {
    state: Arc<RwLock<T>>,
    writer: Arc<Mutex<()>>,
    subscribers: Arc<Subscribers<T>>,
    middleware: Arc<[Arc<dyn Middleware<T>>]>,
    persist: Option<PersistOptions>,
}

/// Borrowed view of the live state, holding the store's read lock.
///
/// Writing to the same store while a `StateRef` is alive deadlocks.
pub struct StateRef<'a, T>(RwLockReadGuard<'a, T>);

impl<T> Deref for StateRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// Outcome of a write: the errors returned by middleware, if any.
///
/// A middleware error never rolls the write back; subscribers are still
/// notified with the state the chain produced.
#[derive(Debug, Default)]
pub struct WriteReport {
    errors: Vec<(String, MiddlewareError)>,
}

impl WriteReport {
    /// `true` when every middleware accepted the update.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// `(middleware name, error)` pairs in chain order.
    pub fn errors(&self) -> &[(String, MiddlewareError)] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<(String, MiddlewareError)> {
        self.errors
    }
}

impl<T> Store<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new store with the given initial state and no middleware.
    pub fn new(initial: T) -> Self {
        Self::with_options(initial, StoreOptions::new())
    }

    /// Create a store with middleware and, optionally, persistence.
    ///
    /// With persistence configured the initial state is first overlaid with
    /// whatever the storage holds under the key.
    pub fn with_options(initial: T, options: StoreOptions<T>) -> Self {
        let StoreOptions {
            mut middleware,
            persistence,
        } = options;

        let (initial, persist) = match persistence {
            Some(persistence) => {
                let initial = (persistence.rehydrate)(&persistence.options, initial);
                middleware.push(persistence.middleware);
                (initial, Some(persistence.options))
            }
            None => (initial, None),
        };

        Self {
            state: Arc::new(RwLock::new(initial)),
            writer: Arc::new(Mutex::new(())),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            middleware: middleware.into(),
            persist,
        }
    }

    /// Borrow the live state.
    pub fn get_state(&self) -> StateRef<'_, T> {
        StateRef(read(&self.state))
    }

    /// Get an owned copy of the current state.
    pub fn get_raw(&self) -> T {
        read(&self.state).clone()
    }

    /// Read state through a function without cloning it.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let state = read(&self.state);
        f(&*state)
    }

    /// Update the state, then run middleware and notify subscribers.
    pub fn set_state<F>(&self, f: F) -> WriteReport
    where
        F: FnOnce(&mut T),
    {
        let (snapshot, report) = {
            let _writer = lock(&self.writer);
            let prev = self.get_raw();
            let mut next = prev.clone();
            f(&mut next);
            let report = self.run_middleware(&prev, &mut next);
            *write(&self.state) = next.clone();
            (next, report)
        };
        self.notify(&snapshot);
        report
    }

    /// Update the state with a fallible function.
    ///
    /// If `f` fails the state is left as it was and neither middleware nor
    /// subscribers run.
    pub fn try_set_state<F, E>(&self, f: F) -> Result<WriteReport, E>
    where
        F: FnOnce(&mut T) -> Result<(), E>,
    {
        let (snapshot, report) = {
            let _writer = lock(&self.writer);
            let prev = self.get_raw();
            let mut next = prev.clone();
            f(&mut next)?;
            let report = self.run_middleware(&prev, &mut next);
            *write(&self.state) = next.clone();
            (next, report)
        };
        self.notify(&snapshot);
        Ok(report)
    }

    /// Replace the whole state.
    pub fn replace(&self, next: T) -> WriteReport {
        self.set_state(move |state| *state = next)
    }

    /// Subscribe to state changes.
    ///
    /// The listener is called immediately with the current state and then
    /// after every write.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_arc(Arc::new(listener))
    }

    fn subscribe_arc(&self, listener: Subscriber<T>) -> Subscription {
        let id = NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed);
        let current = {
            // No write can land between registering and taking the snapshot.
            let state = read(&self.state);
            write(&self.subscribers).push((id, Arc::clone(&listener)));
            state.clone()
        };
        trace!(id, "subscriber added");
        listener(&current);

        let subscribers = Arc::downgrade(&self.subscribers);
        Subscription::new(move || {
            if let Some(subscribers) = subscribers.upgrade() {
                write(&subscribers).retain(|(existing, _)| *existing != id);
                trace!(id, "subscriber removed");
            }
        })
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        read(&self.subscribers).len()
    }

    /// A subscribe-only view of this store.
    pub fn readable(&self) -> Readable<Self> {
        Readable::new(self.clone())
    }

    fn run_middleware(&self, prev: &T, next: &mut T) -> WriteReport {
        let mut report = WriteReport::default();
        for middleware in self.middleware.iter() {
            if let Err(e) = middleware.call(prev, next) {
                error!(middleware = middleware.name(), error = %e, "Middleware error");
                report.errors.push((middleware.name().to_string(), e));
            }
        }
        report
    }

    /// Notify all subscribers of a state change.
    ///
    /// The list is copied first so listeners may subscribe, unsubscribe or
    /// write to the store while being notified.
    fn notify(&self, state: &T) {
        let subscribers: Vec<Subscriber<T>> = read(&self.subscribers)
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();
        debug!(subscribers = subscribers.len(), "notifying subscribers");
        for subscriber in subscribers {
            subscriber(state);
        }
    }
}

impl<T> Store<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    /// Shallow-merge a JSON object into the state.
    ///
    /// Each top-level key of `partial` overwrites the same key of the
    /// serialized state. If the result does not deserialize back into `T` the
    /// state is left untouched and nothing runs.
    pub fn patch(&self, partial: Value) -> Result<WriteReport, StoreError> {
        let Value::Object(fields) = partial else {
            return Err(StoreError::InvalidPatch(json_kind(&partial)));
        };

        self.try_set_state(|state| {
            let Value::Object(mut current) = serde_json::to_value(&*state)? else {
                return Err(StoreError::NotAnObject);
            };
            current.extend(fields);
            *state = serde_json::from_value(Value::Object(current))?;
            Ok(())
        })
    }

    /// Create a store that persists its state, see [`StoreOptions::persist`].
    pub fn persisted(initial: T, persist: PersistOptions) -> Self {
        Self::with_options(initial, StoreOptions::new().persist(persist))
    }

    /// Remove the persisted entry, if this store is persisted.
    pub fn clear_persisted(&self) -> Result<(), StoreError> {
        if let Some(persist) = &self.persist {
            persist.storage.remove_item(&persist.key)?;
            debug!(key = %persist.key, "cleared persisted state");
        }
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            writer: Arc::clone(&self.writer),
            subscribers: Arc::clone(&self.subscribers),
            middleware: Arc::clone(&self.middleware),
            persist: self.persist.clone(),
        }
    }
}

impl<T> Subscribable for Store<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Value = T;

    fn subscribe_boxed(&self, listener: Box<dyn Fn(&T) + Send + Sync>) -> Subscription {
        self.subscribe_arc(Arc::from(listener))
    }

    fn current(&self) -> T {
        self.get_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{console_log, timestamp, validation, Timestamped, ValidationCondition};
    use crate::error::StorageError;
    use crate::storage::{FileStorage, MemoryStorage, Storage};
    use chrono::{DateTime, Utc};
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, OnceLock};
    use tracing_test::traced_test;

    #[derive(Clone, Debug, PartialEq)]
    struct AppState {
        count: usize,
        name: String,
    }

    fn app_state() -> AppState {
        AppState {
            count: 0,
            name: "test".to_string(),
        }
    }

    #[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Counter {
        count: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_at: Option<DateTime<Utc>>,
    }

    impl Timestamped for Counter {
        fn set_updated_at(&mut self, at: DateTime<Utc>) {
            self.updated_at = Some(at);
        }
    }

    #[test]
    fn store_get_set() {
        let store = Store::new(app_state());

        assert_eq!(store.get_state().count, 0);

        store.replace(AppState {
            count: 42,
            name: "updated".to_string(),
        });

        assert_eq!(store.get_raw().count, 42);
        assert_eq!(store.get_state().name, "updated");
    }

    #[test]
    fn store_update() {
        let store = Store::new(app_state());

        store.set_state(|state| {
            state.count += 10;
        });

        assert_eq!(store.read(|s| s.count), 10);
    }

    #[test]
    fn get_raw_is_detached() {
        let store = Store::new(app_state());
        let mut raw = store.get_raw();
        raw.count = 99;

        assert_eq!(store.get_state().count, 0);
    }

    #[test]
    fn store_subscribe() {
        let store = Store::new(app_state());

        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        store.subscribe(move |_state| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        store.set_state(|state| state.count += 1);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);

        store.set_state(|state| state.count += 1);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unsubscribe_only_removes_that_listener() {
        let store = Store::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first_seen = seen.clone();
        let first = store.subscribe(move |n| first_seen.lock().unwrap().push(("first", *n)));
        let second_seen = seen.clone();
        let _second = store.subscribe(move |n| second_seen.lock().unwrap().push(("second", *n)));
        assert_eq!(store.subscriber_count(), 2);

        first.unsubscribe();
        store.set_state(|n| *n = 5);

        assert_eq!(store.subscriber_count(), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 0), ("second", 0), ("second", 5)]
        );
    }

    #[test]
    fn subscribers_see_state_after_middleware() {
        let stamp = |_prev: &i32, next: &mut i32| -> Result<(), MiddlewareError> {
            *next *= 10;
            Ok(())
        };
        let store = Store::with_options(1, StoreOptions::new().middleware(stamp));
        let last = Arc::new(AtomicUsize::new(0));
        let last_clone = last.clone();
        store.subscribe(move |n| last_clone.store(*n as usize, Ordering::SeqCst));

        store.set_state(|n| *n = 2);

        assert_eq!(store.get_raw(), 20);
        assert_eq!(last.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn middleware_runs_in_order_with_prev_and_next() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let first_calls = calls.clone();
        let second_calls = calls.clone();

        let options = StoreOptions::new()
            .middleware(move |prev: &i32, next: &mut i32| -> Result<(), MiddlewareError> {
                first_calls.lock().unwrap().push(("first", *prev, *next));
                Ok(())
            })
            .middleware(move |prev: &i32, next: &mut i32| -> Result<(), MiddlewareError> {
                second_calls.lock().unwrap().push(("second", *prev, *next));
                Ok(())
            });
        let store = Store::with_options(1, options);

        store.set_state(|n| *n += 1);

        assert_eq!(
            *calls.lock().unwrap(),
            vec![("first", 1, 2), ("second", 1, 2)]
        );
    }

    #[test]
    #[traced_test]
    fn middleware_error_is_logged_and_chain_continues() {
        let after = Arc::new(AtomicUsize::new(0));
        let after_clone = after.clone();

        let options = StoreOptions::new()
            .middleware(validation(vec![ValidationCondition::new(
                |n: &i32| *n >= 0,
                "Count must be non-negative",
            )]))
            .middleware(move |_prev: &i32, _next: &mut i32| -> Result<(), MiddlewareError> {
                after_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        let store = Store::with_options(0, options);

        let report = store.set_state(|n| *n -= 1);

        assert!(!report.is_ok());
        assert_eq!(report.errors().len(), 1);
        assert_eq!(report.errors()[0].0, "validation");
        assert_eq!(store.get_raw(), -1);
        assert_eq!(after.load(Ordering::SeqCst), 1);
        assert!(logs_contain("Middleware error"));
        assert!(logs_contain("Count must be non-negative"));
    }

    #[test]
    fn try_set_state_restores_on_error() {
        let store = Store::new(app_state());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        store.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let result: Result<WriteReport, &str> = store.try_set_state(|state| {
            state.count = 7;
            Err("nope")
        });

        assert_eq!(result.unwrap_err(), "nope");
        assert_eq!(store.get_raw(), app_state());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_may_write_to_the_store() {
        let store = Store::new(0);
        let inner = store.clone();
        store.subscribe(move |n| {
            if *n == 1 {
                inner.set_state(|n| *n = 2);
            }
        });

        store.replace(1);
        assert_eq!(store.get_raw(), 2);
    }

    #[test]
    fn middleware_may_read_its_own_store() {
        let handle: Arc<OnceLock<Store<i32>>> = Arc::new(OnceLock::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let middleware_handle = handle.clone();
        let middleware_seen = seen.clone();

        let options = StoreOptions::new().middleware(
            move |_prev: &i32, next: &mut i32| -> Result<(), MiddlewareError> {
                if let Some(store) = middleware_handle.get() {
                    middleware_seen.lock().unwrap().push((*store.get_state(), *next));
                }
                Ok(())
            },
        );
        let store = Store::with_options(0, options);
        handle.set(store.clone()).ok().unwrap();

        store.set_state(|n| *n = 1);
        store.set_state(|n| *n = 2);

        assert_eq!(store.get_raw(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn updater_may_read_the_store() {
        let store = Store::new(1);
        let reader = store.clone();

        store.set_state(|n| *n = reader.get_raw() + 1);
        let result: Result<WriteReport, String> = store.try_set_state(|n| {
            *n += reader.read(|current| *current);
            Ok(())
        });

        assert!(result.unwrap().is_ok());
        assert_eq!(store.get_raw(), 4);
    }

    #[test]
    fn subscribe_during_a_write_sees_committed_state_then_the_write() {
        let handle: Arc<OnceLock<Store<i32>>> = Arc::new(OnceLock::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let middleware_handle = handle.clone();
        let listener_seen = seen.clone();

        let options = StoreOptions::new().middleware(
            move |_prev: &i32, _next: &mut i32| -> Result<(), MiddlewareError> {
                if let Some(store) = middleware_handle.get() {
                    let listener_seen = listener_seen.clone();
                    store.subscribe(move |n| listener_seen.lock().unwrap().push(*n));
                }
                Ok(())
            },
        );
        let store = Store::with_options(0, options);
        handle.set(store.clone()).ok().unwrap();

        store.set_state(|n| *n = 7);

        assert_eq!(*seen.lock().unwrap(), vec![0, 7]);
    }

    #[test]
    fn closure_middleware_errors_are_returned_in_order() {
        let options = StoreOptions::new()
            .middleware(validation(vec![ValidationCondition::new(
                |n: &i32| *n < 10,
                "Count must stay below 10",
            )]))
            .middleware(|_prev: &i32, next: &mut i32| -> Result<(), MiddlewareError> {
                if *next % 2 == 0 {
                    return Err(MiddlewareError::other("even counts are not allowed"));
                }
                Ok(())
            });
        let store = Store::with_options(0, options);

        let errors = store.replace(12).into_errors();

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].0, "validation");
        assert!(matches!(&errors[0].1, MiddlewareError::Validation(m) if m == "Count must stay below 10"));
        assert_eq!(errors[1].0, "middleware");
        assert!(matches!(&errors[1].1, MiddlewareError::Other(m) if m == "even counts are not allowed"));
        assert_eq!(store.get_raw(), 12);
    }

    #[test]
    #[traced_test]
    fn persist_failure_is_reported_as_middleware_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path()));
        let store = Store::persisted(Counter::default(), PersistOptions::new("bad key", storage));

        let report = store.set_state(|s| s.count += 1);

        assert_eq!(report.errors().len(), 1);
        let (name, error) = &report.errors()[0];
        assert_eq!(name, "persist");
        assert!(matches!(
            error,
            MiddlewareError::Persist { key, source: StorageError::InvalidKey(_) } if key == "bad key"
        ));
        assert_eq!(store.get_state().count, 1);
        assert!(logs_contain("Middleware error"));
    }

    #[test]
    fn patch_merges_top_level_keys() {
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        struct Profile {
            name: String,
            age: u32,
        }

        let store = Store::new(Profile {
            name: "John Doe".to_string(),
            age: 30,
        });

        store.patch(serde_json::json!({ "name": "Alice" })).unwrap();
        assert_eq!(store.get_state().name, "Alice");
        assert_eq!(store.get_state().age, 30);

        let err = store.patch(serde_json::json!({ "age": "old" })).unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
        assert_eq!(store.get_state().age, 30);

        let err = store.patch(serde_json::json!([1, 2])).unwrap_err();
        assert!(matches!(err, StoreError::InvalidPatch("an array")));
    }

    #[test]
    fn persisted_store_writes_and_rehydrates() {
        let storage = Arc::new(MemoryStorage::new());
        let persist = PersistOptions::new("testMiddlewareStore", storage.clone());
        let options = StoreOptions::<Counter>::new()
            .middleware(console_log())
            .middleware(timestamp())
            .persist(persist.clone());

        let store = Store::with_options(Counter::default(), options);
        store.set_state(|s| s.count += 1);

        let raw = storage.get_item("testMiddlewareStore").unwrap().unwrap();
        let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored["count"], 1);
        assert!(stored["updatedAt"].is_string());

        let reloaded = Store::persisted(Counter::default(), persist);
        assert_eq!(reloaded.get_state().count, 1);
        assert!(reloaded.get_state().updated_at.is_some());

        reloaded.clear_persisted().unwrap();
        assert_eq!(storage.get_item("testMiddlewareStore").unwrap(), None);
    }
}
