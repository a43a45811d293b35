//! Storage traits and interfaces

use crate::DbResult;
use std::sync::Arc;

/// Durable key→bytes mapping. Keys are content hashes, so writes never
/// overwrite a live value with different bytes.
pub trait KeyValueStore: Send + Sync {
    /// Get value by key, `None` when absent
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>>;

    /// Put key-value pair
    fn put(&self, key: &[u8], value: &[u8]) -> DbResult<()>;

    /// Check if key exists
    fn exists(&self, key: &[u8]) -> DbResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Shared store handle
pub type SharedStore = Arc<dyn KeyValueStore>;
