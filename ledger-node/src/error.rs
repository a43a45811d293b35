//! Node error types

use ledger_core::CoreError;
use ledger_pool::PoolError;
use ledger_state::StateError;
use ledger_vm::VmError;
use thiserror::Error;

/// Node-level errors
#[derive(Error, Debug)]
pub enum NodeError {
    /// Signature did not recover to the declared sender
    #[error("Transaction verification failed")]
    Verification,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Execution error: {0}")]
    Vm(#[from] VmError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for node operations
pub type NodeResult<T> = Result<T, NodeError>;
