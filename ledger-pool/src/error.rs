//! Pool error types

use ledger_state::StateError;
use thiserror::Error;

/// Pool faults. Discarded transactions are not errors; admission is
/// silent about them by design.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("State error: {0}")]
    State(#[from] StateError),
}

/// Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;
