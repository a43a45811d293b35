//! Block header, body and receipts

use crate::{Address, CoreError, CoreResult, Hash, Transaction};
use serde::{Deserialize, Serialize};

/// Block header
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Header {
    /// Root hash of the state trie after executing this block
    pub state_root: Hash,
    /// Hash of the parent header
    pub parent_hash: Hash,
    /// Block height
    pub height: u64,
    /// Beneficiary of the block reward
    pub coinbase: Address,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    /// Proof-of-work nonce
    pub nonce: u64,
}

impl Header {
    /// Genesis header over an existing state root
    pub fn genesis(state_root: Hash) -> Self {
        Self {
            state_root,
            parent_hash: Hash::zero(),
            height: 0,
            coinbase: Address::zero(),
            timestamp: 0,
            nonce: 0,
        }
    }

    /// Header extending `parent`: height + 1, parent hash linked, state
    /// root carried over until packing rewrites it
    pub fn child(parent: &Header) -> CoreResult<Self> {
        Ok(Self {
            state_root: parent.state_root,
            parent_hash: parent.hash()?,
            height: parent.height + 1,
            coinbase: Address::zero(),
            timestamp: 0,
            nonce: 0,
        })
    }

    /// Digest of the canonical encoding
    pub fn hash(&self) -> CoreResult<Hash> {
        let encoded = bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| CoreError::Encode(e.to_string()))?;
        Ok(Hash::digest(&encoded))
    }
}

/// Execution receipt, paired positionally with its transaction
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Receipt {
    /// Hash of the executed transaction
    pub tx_hash: Hash,
    /// Execution status (0 = success)
    pub status: u8,
}

impl Receipt {
    /// Successful receipt for a transaction hash
    pub fn success(tx_hash: Hash) -> Self {
        Self { tx_hash, status: 0 }
    }
}

/// Block body: transactions and their receipts in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    pub transactions: Vec<Transaction>,
    pub receipts: Vec<Receipt>,
}

impl Body {
    /// Create an empty body
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an executed transaction with its receipt
    pub fn push(&mut self, tx: Transaction, receipt: Receipt) {
        self.transactions.push(tx);
        self.receipts.push(receipt);
    }

    /// Number of transactions in the body
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the body holds no transactions
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_header() {
        let root = Hash::digest(b"state");
        let genesis = Header::genesis(root);
        assert_eq!(genesis.height, 0);
        assert_eq!(genesis.parent_hash, Hash::zero());
        assert_eq!(genesis.state_root, root);
    }

    #[test]
    fn test_child_links_parent() {
        let genesis = Header::genesis(Hash::digest(b"state"));
        let child = Header::child(&genesis).unwrap();
        assert_eq!(child.height, 1);
        assert_eq!(child.parent_hash, genesis.hash().unwrap());
        assert_eq!(child.state_root, genesis.state_root);
    }

    #[test]
    fn test_header_hash_changes_with_nonce() {
        let mut header = Header::genesis(Hash::zero());
        let h0 = header.hash().unwrap();
        header.nonce = 1;
        assert_ne!(header.hash().unwrap(), h0);
    }

    #[test]
    fn test_body_pairs_tx_and_receipt() {
        let mut body = Body::new();
        assert!(body.is_empty());

        let tx = Transaction::new(Address::zero(), Address::new([2u8; 20]), 1, 10, 0, 0);
        let receipt = Receipt::success(tx.hash().unwrap());
        body.push(tx, receipt);

        assert_eq!(body.len(), 1);
        assert_eq!(body.receipts[0].status, 0);
        assert_eq!(
            body.receipts[0].tx_hash,
            body.transactions[0].hash().unwrap()
        );
    }
}
