//! Byte-level key/value storage layer
//!
//! Content-addressed persistence for trie nodes and account payloads.
//! Values are opaque bytes; callers hash and encode on their side.

pub mod error;
pub mod memory;
pub mod sled_store;
pub mod traits;

pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use sled_store::SledStore;
pub use traits::{KeyValueStore, SharedStore};
