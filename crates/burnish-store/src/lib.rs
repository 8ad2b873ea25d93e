//! Persistent key-value record store shared by the coordinator and views.
//!
//! Every mutation is published through the [`burnish_changebus`] bus, which
//! is how one process observes the other's writes.

pub mod error;
pub mod sqlite_impl;
pub mod store;

pub use error::StoreError;
pub use sqlite_impl::SqliteSharedStore;
pub use store::{SharedStore, SharedStoreExt};
