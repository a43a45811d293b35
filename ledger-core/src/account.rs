//! Account model

use crate::{CoreError, CoreResult, Hash};
use serde::{Deserialize, Serialize};

/// Account state as stored in the trie.
///
/// `code_hash` and `storage_root` are carried through serialization for
/// forward compatibility but are not used by the transfer logic.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Account {
    /// Account balance
    pub balance: u64,
    /// Number of transactions committed from this account
    pub nonce: u64,
    /// Code hash (zero for externally owned accounts)
    pub code_hash: Hash,
    /// Storage root hash
    pub storage_root: Hash,
}

impl Account {
    /// Create a new empty account
    pub fn new() -> Self {
        Self {
            balance: 0,
            nonce: 0,
            code_hash: Hash::zero(),
            storage_root: Hash::zero(),
        }
    }

    /// Create an account with an initial balance
    pub fn with_balance(balance: u64) -> Self {
        Self {
            balance,
            ..Self::new()
        }
    }

    /// Check if the account carries no state
    pub fn is_empty(&self) -> bool {
        self.balance == 0 && self.nonce == 0 && self.code_hash.is_zero()
    }

    /// Canonical encoding used for hashing and persistence
    pub fn to_bytes(&self) -> CoreResult<Vec<u8>> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| CoreError::Encode(e.to_string()))
    }

    /// Decode from the canonical encoding
    pub fn from_bytes(data: &[u8]) -> CoreResult<Self> {
        let (account, _) = bincode::decode_from_slice(data, bincode::config::standard())
            .map_err(|e| CoreError::Decode(e.to_string()))?;
        Ok(account)
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new()
    }
}
