//! Compressed-path Merkle trie over account addresses

use crate::{StateError, StateResult};
use ledger_core::{Account, Address, CoreError, Hash};
use ledger_db::SharedStore;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Edge to a child node: compressed path segment plus the child's
/// content hash
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Edge {
    pub path: String,
    pub hash: Hash,
}

/// A single trie node.
///
/// `path` is this node's own compressed segment of hex nibbles; the
/// concatenation of segments along any root-to-leaf walk spells the full
/// 40-character address key. Children stay sorted by edge path so the
/// encoding, and therefore the node hash, is deterministic.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TrieNode {
    pub path: String,
    pub leaf: bool,
    pub value: Hash,
    pub children: Vec<Edge>,
}

impl TrieNode {
    /// Empty interior node
    pub fn empty() -> Self {
        Self {
            path: String::new(),
            leaf: false,
            value: Hash::zero(),
            children: Vec::new(),
        }
    }

    fn leaf(path: String, value: Hash) -> Self {
        Self {
            path,
            leaf: true,
            value,
            children: Vec::new(),
        }
    }

    /// Canonical encoding used for hashing and persistence
    pub fn to_bytes(&self) -> StateResult<Vec<u8>> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| StateError::Core(CoreError::Encode(e.to_string())))
    }

    /// Decode from the canonical encoding
    pub fn from_bytes(data: &[u8]) -> StateResult<Self> {
        let (node, _) = bincode::decode_from_slice(data, bincode::config::standard())
            .map_err(|e| StateError::Core(CoreError::Decode(e.to_string())))?;
        Ok(node)
    }

    /// Content hash; doubles as the node's storage key
    pub fn hash(&self) -> StateResult<Hash> {
        Ok(Hash::digest(&self.to_bytes()?))
    }

    fn sort_children(&mut self) {
        self.children.sort_by(|a, b| a.path.cmp(&b.path));
    }
}

/// Merkle state trie over a byte store.
///
/// Nodes are stored content-addressed and never mutated in place: a
/// logical update writes new node versions bottom-up and leaves the
/// superseded ones retrievable under their old hashes.
pub struct StateTrie {
    db: SharedStore,
    root: TrieNode,
}

/// Full trie key for an address: 40 lowercase hex nibbles
fn key_path(address: &Address) -> String {
    hex::encode(address.as_bytes())
}

/// Length of the shared prefix of two keys
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

impl StateTrie {
    /// Open a trie over `db`. A zero root bootstraps a fresh empty
    /// trie; any other root must resolve to a persisted node.
    pub fn new(db: SharedStore, root: Hash) -> StateResult<Self> {
        if root.is_zero() {
            let trie = Self {
                db,
                root: TrieNode::empty(),
            };
            trie.save_node(&trie.root)?;
            Ok(trie)
        } else {
            let data = db
                .get(root.as_bytes())?
                .ok_or(StateError::MissingRoot(root))?;
            let node = TrieNode::from_bytes(&data)?;
            Ok(Self { db, root: node })
        }
    }

    /// Hash of the current root node
    pub fn root(&self) -> StateResult<Hash> {
        self.root.hash()
    }

    /// Load the account stored under `address`.
    ///
    /// Succeeds only when the walk consumes the full key and ends on a
    /// leaf whose value bytes are present; anything else is `NotFound`.
    pub fn load(&self, address: &Address) -> StateResult<Account> {
        let path = key_path(address);
        let (fragments, hashes) = self.find_ancestors(&path)?;
        if fragments.concat() != path {
            return Err(StateError::NotFound);
        }

        let node = self.load_node(hashes.last().expect("walk starts at the root"))?;
        if !node.leaf {
            return Err(StateError::NotFound);
        }
        let data = self
            .db
            .get(node.value.as_bytes())?
            .ok_or(StateError::NotFound)?;
        Ok(Account::from_bytes(&data)?)
    }

    /// Upsert `account` under `address` and rehash the ancestor chain.
    pub fn store(&mut self, address: &Address, account: &Account) -> StateResult<()> {
        let value = account.to_bytes()?;
        let value_hash = Hash::digest(&value);
        self.db.put(value_hash.as_bytes(), &value)?;

        let path = key_path(address);
        let (fragments, hashes) = self.find_ancestors(&path)?;
        let matched = fragments.concat();
        let last_fragment = fragments.last().expect("ancestor walk is never empty");
        let mut node = self.load_node(hashes.last().expect("ancestor walk is never empty"))?;

        if matched == path {
            // Existing slot: overwrite the value in a new node version
            node.value = value_hash;
            node.leaf = true;
            self.save_node(&node)?;
            self.relink_ancestors(node, &hashes)?;
        } else if node.path == *last_fragment {
            // Clean stop at a node boundary: hang a new leaf off it
            let leaf = TrieNode::leaf(path[matched.len()..].to_string(), value_hash);
            let leaf_hash = self.save_node(&leaf)?;
            node.children.push(Edge {
                path: leaf.path,
                hash: leaf_hash,
            });
            node.sort_children();
            self.save_node(&node)?;
            self.relink_ancestors(node, &hashes)?;
        } else {
            // Stopped mid-edge: split the edge at the shared prefix
            let shared = last_fragment.clone();
            node.path = node.path[shared.len()..].to_string();
            let node_hash = self.save_node(&node)?;

            let leaf = TrieNode::leaf(path[matched.len()..].to_string(), value_hash);
            let leaf_hash = self.save_node(&leaf)?;

            let mut branch = TrieNode {
                path: shared,
                leaf: false,
                value: Hash::zero(),
                children: vec![
                    Edge {
                        path: node.path,
                        hash: node_hash,
                    },
                    Edge {
                        path: leaf.path,
                        hash: leaf_hash,
                    },
                ],
            };
            branch.sort_children();
            self.save_node(&branch)?;
            self.relink_ancestors(branch, &hashes)?;
        }

        trace!(address = %address, root = %self.root()?, "account stored");
        Ok(())
    }

    fn load_node(&self, hash: &Hash) -> StateResult<TrieNode> {
        let data = self
            .db
            .get(hash.as_bytes())?
            .ok_or(StateError::MissingRoot(*hash))?;
        TrieNode::from_bytes(&data)
    }

    fn save_node(&self, node: &TrieNode) -> StateResult<Hash> {
        let bytes = node.to_bytes()?;
        let hash = Hash::digest(&bytes);
        self.db.put(hash.as_bytes(), &bytes)?;
        Ok(hash)
    }

    /// Walk from the root matching the longest prefix of `path` against
    /// child edges. Returns the matched fragments and the node hashes
    /// along the walk; the first entries are the root's. When the walk
    /// stops mid-edge the last fragment is the partially matched piece
    /// of that edge.
    fn find_ancestors(&self, path: &str) -> StateResult<(Vec<String>, Vec<Hash>)> {
        let mut fragments = vec![String::new()];
        let mut hashes = vec![self.root()?];
        let mut current = self.root.clone();
        let mut prefix = String::new();

        'walk: loop {
            for edge in &current.children {
                let full = format!("{prefix}{}", edge.path);
                let matched = common_prefix_len(path, &full);
                if matched == full.len() {
                    // Whole edge matched, descend
                    fragments.push(edge.path.clone());
                    hashes.push(edge.hash);
                    current = self.load_node(&edge.hash)?;
                    prefix = full;
                    continue 'walk;
                } else if matched > prefix.len() {
                    // Mid-edge stop: record the shared piece and finish
                    let fragment = edge.path[..matched - prefix.len()].to_string();
                    fragments.push(fragment);
                    hashes.push(edge.hash);
                    return Ok((fragments, hashes));
                }
            }
            return Ok((fragments, hashes));
        }
    }

    /// Replace the superseded child edge at every ancestor, bottom-up,
    /// re-persisting each new version; the final ancestor becomes the
    /// new root. `node` must already be persisted.
    fn relink_ancestors(&mut self, node: TrieNode, hashes: &[Hash]) -> StateResult<()> {
        let mut child_hash = node.hash()?;
        let mut child_path = node.path.clone();
        let depth = hashes.len();
        if depth == 1 {
            self.root = node;
            return Ok(());
        }

        for i in (0..depth - 1).rev() {
            let mut current = self.load_node(&hashes[i])?;
            let stale = hashes[i + 1];
            if let Some(edge) = current.children.iter_mut().find(|e| e.hash == stale) {
                edge.hash = child_hash;
                edge.path = child_path.clone();
            }
            self.save_node(&current)?;
            child_hash = current.hash()?;
            child_path = current.path.clone();
            if i == 0 {
                self.root = current;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_db::MemoryStore;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn fresh_trie() -> StateTrie {
        StateTrie::new(Arc::new(MemoryStore::new()), Hash::zero()).unwrap()
    }

    fn addr(bytes: [u8; 20]) -> Address {
        Address::new(bytes)
    }

    #[test]
    fn test_empty_trie_load_is_not_found() {
        let trie = fresh_trie();
        assert!(matches!(
            trie.load(&addr([1u8; 20])),
            Err(StateError::NotFound)
        ));
    }

    #[test]
    fn test_store_load_roundtrip() {
        let mut trie = fresh_trie();
        let address = addr([0x9b; 20]);
        let account = Account::with_balance(300);

        trie.store(&address, &account).unwrap();
        assert_eq!(trie.load(&address).unwrap(), account);
    }

    #[test]
    fn test_store_changes_root() {
        let mut trie = fresh_trie();
        let before = trie.root().unwrap();
        trie.store(&addr([1u8; 20]), &Account::with_balance(1)).unwrap();
        let after = trie.root().unwrap();
        assert_ne!(before, after);

        trie.store(&addr([1u8; 20]), &Account::with_balance(2)).unwrap();
        assert_ne!(trie.root().unwrap(), after);
    }

    #[test]
    fn test_overwrite_keeps_single_slot() {
        let mut trie = fresh_trie();
        let address = addr([7u8; 20]);

        trie.store(&address, &Account::with_balance(10)).unwrap();
        trie.store(&address, &Account::with_balance(20)).unwrap();

        assert_eq!(trie.load(&address).unwrap().balance, 20);
    }

    #[test]
    fn test_split_on_shared_prefix() {
        let mut trie = fresh_trie();
        // Identical first byte forces a mid-edge split on the second
        let mut a = [0u8; 20];
        let mut b = [0u8; 20];
        a[0] = 0x12;
        a[1] = 0x34;
        b[0] = 0x12;
        b[1] = 0x78;

        trie.store(&addr(a), &Account::with_balance(1)).unwrap();
        trie.store(&addr(b), &Account::with_balance(2)).unwrap();

        assert_eq!(trie.load(&addr(a)).unwrap().balance, 1);
        assert_eq!(trie.load(&addr(b)).unwrap().balance, 2);
    }

    #[test]
    fn test_updates_below_a_split_keep_siblings() {
        let mut trie = fresh_trie();
        let mut a = [0u8; 20];
        let mut b = [0u8; 20];
        let mut c = [0u8; 20];
        a[0] = 0xab;
        b[0] = 0xab;
        b[1] = 0x01;
        c[0] = 0xcd;

        trie.store(&addr(a), &Account::with_balance(1)).unwrap();
        trie.store(&addr(b), &Account::with_balance(2)).unwrap();
        trie.store(&addr(c), &Account::with_balance(3)).unwrap();

        trie.store(&addr(b), &Account::with_balance(20)).unwrap();

        assert_eq!(trie.load(&addr(a)).unwrap().balance, 1);
        assert_eq!(trie.load(&addr(b)).unwrap().balance, 20);
        assert_eq!(trie.load(&addr(c)).unwrap().balance, 3);
    }

    #[test]
    fn test_root_is_order_independent() {
        let pairs = [
            (addr([0x11; 20]), Account::with_balance(1)),
            (addr([0x12; 20]), Account::with_balance(2)),
            (addr([0x21; 20]), Account::with_balance(3)),
        ];

        let mut forward = fresh_trie();
        for (address, account) in &pairs {
            forward.store(address, account).unwrap();
        }

        let mut backward = fresh_trie();
        for (address, account) in pairs.iter().rev() {
            backward.store(address, account).unwrap();
        }

        let mut rotated = fresh_trie();
        for (address, account) in pairs.iter().cycle().skip(1).take(pairs.len()) {
            rotated.store(address, account).unwrap();
        }

        assert_eq!(forward.root().unwrap(), backward.root().unwrap());
        assert_eq!(forward.root().unwrap(), rotated.root().unwrap());
    }

    #[test]
    fn test_reopen_from_retained_root() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let address = addr([0x42; 20]);

        let root = {
            let mut trie = StateTrie::new(store.clone(), Hash::zero()).unwrap();
            trie.store(&address, &Account::with_balance(99)).unwrap();
            trie.root().unwrap()
        };

        let reopened = StateTrie::new(store, root).unwrap();
        assert_eq!(reopened.load(&address).unwrap().balance, 99);
    }

    #[test]
    fn test_old_root_stays_readable() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let address = addr([0x42; 20]);

        let mut trie = StateTrie::new(store.clone(), Hash::zero()).unwrap();
        trie.store(&address, &Account::with_balance(1)).unwrap();
        let old_root = trie.root().unwrap();
        trie.store(&address, &Account::with_balance(2)).unwrap();

        // The superseded version is still reachable under its root
        let snapshot = StateTrie::new(store, old_root).unwrap();
        assert_eq!(snapshot.load(&address).unwrap().balance, 1);
        assert_eq!(trie.load(&address).unwrap().balance, 2);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let bogus = Hash::digest(b"nothing here");
        assert!(matches!(
            StateTrie::new(store, bogus),
            Err(StateError::MissingRoot(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_root_converges_for_any_insertion_order(
            entries in proptest::collection::hash_map(
                any::<[u8; 20]>(),
                any::<u64>(),
                1..16,
            )
        ) {
            let pairs: Vec<(Address, Account)> = entries
                .into_iter()
                .map(|(bytes, balance)| (Address::new(bytes), Account::with_balance(balance)))
                .collect();

            let mut forward = fresh_trie();
            for (address, account) in &pairs {
                forward.store(address, account).unwrap();
            }

            let mut backward = fresh_trie();
            for (address, account) in pairs.iter().rev() {
                backward.store(address, account).unwrap();
            }

            prop_assert_eq!(forward.root().unwrap(), backward.root().unwrap());
            for (address, account) in &pairs {
                prop_assert_eq!(&forward.load(address).unwrap(), account);
            }
        }
    }
}
