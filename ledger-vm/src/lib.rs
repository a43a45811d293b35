//! Transaction execution engine
//!
//! The pure state-transition function applying one transaction against
//! the state trie. Business failures are values, not errors; only
//! storage faults propagate.

pub mod error;
pub mod executor;

pub use error::{VmError, VmResult};
pub use executor::{ExecutionOutcome, Executor, RejectReason, TX_GAS_CAP};
