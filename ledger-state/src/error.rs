//! State trie error types

use ledger_core::{CoreError, Hash};
use ledger_db::DbError;
use thiserror::Error;

/// State trie errors
#[derive(Error, Debug)]
pub enum StateError {
    /// No account stored under the requested address
    #[error("Not found")]
    NotFound,

    /// The configured root hash has no persisted node
    #[error("Missing trie root: {0}")]
    MissingRoot(Hash),

    #[error("Storage error: {0}")]
    Db(#[from] DbError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;
