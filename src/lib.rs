//! # Astand
//!
//! Reactive state stores with a middleware pipeline.
//!
//! ## Store
//!
//! - `Store<T>` - thread-safe state container with subscribers
//! - Middleware run after every write with the previous and next state
//! - Optional persistence to a key-value [`storage::Storage`]
//!
//! ## Middleware
//!
//! Built-ins for logging, timestamping, validation, debug hooks, throttling
//! and persistence live in [`middleware`].
//!
//! ## Combination
//!
//! `CombinedStore` merges several stores into one subscription that yields a
//! snapshot keyed by member name.

pub mod combine;
pub mod error;
mod lock;
pub mod middleware;
pub mod readable;
pub mod storage;
pub mod store;
pub mod subscription;

// Re-export main types for convenience
pub use combine::{CombinedState, CombinedStore};
pub use error::{MiddlewareError, StorageError, StoreError};
pub use middleware::{Middleware, PersistOptions};
pub use readable::Readable;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{StateRef, Store, StoreOptions, WriteReport};
pub use subscription::{Subscribable, Subscription};
