//! Durable store backed by sled

use crate::{DbError, DbResult, KeyValueStore};
use std::path::Path;

/// sled-backed store for single-node durable operation
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open (or create) a database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path).map_err(|e| DbError::Backend(e.to_string()))?;
        Ok(Self { db })
    }

    /// Flush dirty buffers to disk
    pub fn flush(&self) -> DbResult<()> {
        self.db
            .flush()
            .map(|_| ())
            .map_err(|e| DbError::Backend(e.to_string()))
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map(|value| value.map(|ivec| ivec.to_vec()))
            .map_err(|e| DbError::Backend(e.to_string()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.db
            .insert(key, value)
            .map(|_| ())
            .map_err(|e| DbError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            store.put(b"key", b"value").unwrap();
            store.flush().unwrap();
        }
        let store = SledStore::open(dir.path()).unwrap();
        assert_eq!(store.get(b"key").unwrap(), Some(b"value".to_vec()));
        assert_eq!(store.get(b"missing").unwrap(), None);
    }
}
