//! Merkle state trie
//!
//! Compressed-path, content-addressed trie over account addresses. Every
//! node is persisted under the hash of its canonical encoding; updates
//! allocate new node versions and relink ancestors, so any retained root
//! hash stays readable as a point-in-time snapshot.

pub mod error;
pub mod shared;
pub mod trie;

pub use error::{StateError, StateResult};
pub use shared::SharedState;
pub use trie::{StateTrie, TrieNode};
