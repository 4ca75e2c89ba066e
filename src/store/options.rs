use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::middleware::{self, Middleware, PersistOptions};

/// Construction-time configuration for a [`Store`](super::Store).
pub struct StoreOptions<T> {
    pub(crate) middleware: Vec<Arc<dyn Middleware<T>>>,
    pub(crate) persistence: Option<Persistence<T>>,
}

/// Persistence wiring captured while the serde bounds are known.
pub(crate) struct Persistence<T> {
    pub(crate) options: PersistOptions,
    pub(crate) rehydrate: fn(&PersistOptions, T) -> T,
    pub(crate) middleware: Arc<dyn Middleware<T>>,
}

impl<T> StoreOptions<T> {
    pub fn new() -> Self {
        Self {
            middleware: Vec::new(),
            persistence: None,
        }
    }

    /// Append a middleware to the chain.
    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<T> + 'static,
    {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Append an already shared middleware to the chain.
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware<T>>) -> Self {
        self.middleware.push(middleware);
        self
    }
}

impl<T> StoreOptions<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// Rehydrate the store from `options` on creation and write every new
    /// state back.
    ///
    /// The persist middleware always runs after the rest of the chain, so it
    /// stores whatever earlier middleware stamped on the state.
    pub fn persist(mut self, options: PersistOptions) -> Self {
        self.persistence = Some(Persistence {
            middleware: Arc::new(middleware::persist(options.clone())),
            rehydrate: middleware::rehydrate::<T>,
            options,
        });
        self
    }
}

impl<T> Default for StoreOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for StoreOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("middleware", &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("persist", &self.persistence.as_ref().map(|p| &p.options))
            .finish()
    }
}
