//! Thread-safe state handle

use crate::{StateResult, StateTrie};
use ledger_core::{Account, Address, Hash};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared reader–writer handle over the state trie.
///
/// Queries take the read lock and block production takes the write lock,
/// so concurrent readers always observe a fully-linked root rather than a
/// mid-mutation node graph.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<RwLock<StateTrie>>,
}

impl SharedState {
    /// Wrap a trie in a shared handle
    pub fn new(trie: StateTrie) -> Self {
        Self {
            inner: Arc::new(RwLock::new(trie)),
        }
    }

    /// Load an account (read lock)
    pub fn load(&self, address: &Address) -> StateResult<Account> {
        self.inner.read().load(address)
    }

    /// Upsert an account (write lock)
    pub fn store(&self, address: &Address, account: &Account) -> StateResult<()> {
        self.inner.write().store(address, account)
    }

    /// Current state root (read lock)
    pub fn root(&self) -> StateResult<Hash> {
        self.inner.read().root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_db::MemoryStore;

    #[test]
    fn test_shared_handles_see_the_same_trie() {
        let trie = StateTrie::new(Arc::new(MemoryStore::new()), Hash::zero()).unwrap();
        let state = SharedState::new(trie);
        let handle = state.clone();

        let address = Address::new([5u8; 20]);
        state.store(&address, &Account::with_balance(12)).unwrap();

        assert_eq!(handle.load(&address).unwrap().balance, 12);
        assert_eq!(handle.root().unwrap(), state.root().unwrap());
    }
}
