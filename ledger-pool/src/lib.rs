//! Transaction admission pool
//!
//! Nonce-ordered admission with per-sender gap buffering and fee-keyed
//! extraction for block building. All mutation is serialized behind one
//! lock; the pool never exposes its internal sequences.

pub mod error;
pub mod pool;

pub use error::{PoolError, PoolResult};
pub use pool::TxPool;
