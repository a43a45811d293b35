//! Executor error types

use ledger_core::CoreError;
use ledger_state::StateError;
use thiserror::Error;

/// Executor faults. Rejected transactions are not errors; see
/// `ExecutionOutcome`.
#[derive(Error, Debug)]
pub enum VmError {
    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for executor operations
pub type VmResult<T> = Result<T, VmError>;
