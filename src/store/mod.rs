//! State management with stores.
//!
//! A store holds one state value, runs its middleware chain after every write
//! and then notifies its subscribers.

mod options;
mod store;

pub use options::StoreOptions;
pub use store::{StateRef, Store, WriteReport};
