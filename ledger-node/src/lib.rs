//! Node orchestration
//!
//! Wires the state trie, transaction pool and executor into a running
//! node: a timed block-assembly/mining pipeline plus a line-delimited
//! TCP front end for submissions and account queries.

pub mod assembler;
pub mod config;
pub mod error;
pub mod ledger;
pub mod server;

pub use assembler::{AssemblerConfig, BlockAssembler, BLOCK_REWARD};
pub use config::{GenesisAccount, NodeConfig};
pub use error::{NodeError, NodeResult};
pub use ledger::Ledger;
