//! Combining several stores into one subscribable view.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::error::StoreError;
use crate::lock::lock;
use crate::subscription::{Subscribable, Subscription};

/// Keyed snapshot of every member of a [`CombinedStore`].
pub type CombinedState = BTreeMap<String, Value>;

type OnChange = Box<dyn Fn(Result<Value, serde_json::Error>) + Send + Sync>;

/// Type-erased member: anything subscribable whose value serializes.
trait Member: Send + Sync {
    fn snapshot(&self) -> Result<Value, serde_json::Error>;

    fn watch(&self, on_change: OnChange) -> Subscription;
}

impl<S> Member for S
where
    S: Subscribable,
    S::Value: Serialize,
{
    fn snapshot(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self.current())
    }

    fn watch(&self, on_change: OnChange) -> Subscription {
        self.subscribe_boxed(Box::new(move |value: &S::Value| on_change(serde_json::to_value(value))))
    }
}

/// Several stores behind a single subscription.
///
/// Subscribers receive a [`CombinedState`] keyed by member name, once on
/// subscription and again whenever any member is written.
#[derive(Clone)]
pub struct CombinedStore {
    members: Arc<[(String, Arc<dyn Member>)]>,
}

/// Builder for [`CombinedStore`].
#[derive(Default)]
pub struct CombinedStoreBuilder {
    members: Vec<(String, Arc<dyn Member>)>,
}

impl CombinedStoreBuilder {
    /// Add a member under `name`. A later member with the same name replaces
    /// the earlier one.
    pub fn member<S>(mut self, name: impl Into<String>, store: S) -> Self
    where
        S: Subscribable + 'static,
        S::Value: Serialize,
    {
        let name = name.into();
        self.members.retain(|(existing, _)| *existing != name);
        let member: Arc<dyn Member> = Arc::new(store);
        self.members.push((name, member));
        self
    }

    pub fn build(self) -> CombinedStore {
        CombinedStore {
            members: self.members.into(),
        }
    }
}

impl CombinedStore {
    pub fn builder() -> CombinedStoreBuilder {
        CombinedStoreBuilder::default()
    }

    /// Member names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|(name, _)| name.as_str())
    }

    /// Snapshot every member.
    pub fn get_state(&self) -> Result<CombinedState, StoreError> {
        self.members
            .iter()
            .map(|(name, member)| Ok::<_, StoreError>((name.clone(), member.snapshot()?)))
            .collect()
    }

    /// Subscribe to every member.
    ///
    /// The listener runs once with the full snapshot after all members are
    /// subscribed, then after every member write. A notification is skipped
    /// while any member fails to serialize. The returned handle unsubscribes
    /// from all members.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CombinedState) + Send + Sync + 'static,
    {
        let listener: Arc<dyn Fn(&CombinedState) + Send + Sync> = Arc::new(listener);
        let cache = Arc::new(Mutex::new(CombinedState::new()));
        let primed = Arc::new(AtomicBool::new(false));
        let member_count = self.members.len();

        let subscriptions = self
            .members
            .iter()
            .map(|(name, member)| {
                let name = name.clone();
                let cache = Arc::clone(&cache);
                let primed = Arc::clone(&primed);
                let listener = Arc::clone(&listener);

                member.watch(Box::new(move |value| {
                    let value = match value {
                        Ok(value) => value,
                        Err(e) => {
                            // A stale value must not be reported as current.
                            lock(&cache).remove(&name);
                            error!(member = %name, error = %e, "failed to snapshot store");
                            return;
                        }
                    };
                    let snapshot = {
                        let mut cache = lock(&cache);
                        cache.insert(name.clone(), value);
                        if !primed.load(Ordering::Acquire) {
                            return;
                        }
                        if cache.len() != member_count {
                            error!(
                                members = member_count,
                                snapshotted = cache.len(),
                                "skipping incomplete combined snapshot"
                            );
                            return;
                        }
                        cache.clone()
                    };
                    listener(&snapshot);
                }))
            })
            .collect();

        primed.store(true, Ordering::Release);
        let snapshot = lock(&cache).clone();
        if snapshot.len() == self.members.len() {
            listener(&snapshot);
        } else {
            error!(
                members = self.members.len(),
                snapshotted = snapshot.len(),
                "skipping initial combined snapshot"
            );
        }

        Subscription::merge(subscriptions)
    }
}

impl Subscribable for CombinedStore {
    type Value = CombinedState;

    fn subscribe_boxed(&self, listener: Box<dyn Fn(&CombinedState) + Send + Sync>) -> Subscription {
        self.subscribe(listener)
    }

    /// Best-effort snapshot: members that fail to serialize are logged and
    /// left out.
    fn current(&self) -> CombinedState {
        let mut state = CombinedState::new();
        for (name, member) in self.members.iter() {
            match member.snapshot() {
                Ok(value) => {
                    state.insert(name.clone(), value);
                }
                Err(e) => error!(member = %name, error = %e, "failed to snapshot store"),
            }
        }
        state
    }
}

impl fmt::Debug for CombinedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedStore")
            .field("members", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
