//! The state-transition function

use crate::VmResult;
use ledger_core::{Account, Receipt, Transaction};
use ledger_state::{SharedState, StateError};
use tracing::debug;

/// Gas charged per transaction is capped at this amount
pub const TX_GAS_CAP: u64 = 21_000;

/// Why a transaction was dropped instead of applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The sender has no account in state
    UnknownSender,
    /// The sender cannot cover value plus gas
    InsufficientFunds { required: u64, available: u64 },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSender => write!(f, "unknown sender"),
            Self::InsufficientFunds {
                required,
                available,
            } => write!(
                f,
                "insufficient funds: required {required}, available {available}"
            ),
        }
    }
}

/// Result of executing one transaction
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// State was mutated; the receipt pairs with the transaction
    Applied { receipt: Receipt, gas_used: u64 },
    /// State untouched, transaction consumed
    Rejected(RejectReason),
}

/// Deterministic single-transaction executor
#[derive(Debug, Default)]
pub struct Executor;

impl Executor {
    /// Create a new executor
    pub fn new() -> Self {
        Self
    }

    /// Apply `tx` against `state`.
    ///
    /// Debits value plus capped gas from the sender, bumps its nonce and
    /// credits the (possibly fresh) recipient. Gas is debited but not
    /// credited anywhere here; the block assembler folds it into the
    /// minter reward.
    pub fn execute(&self, state: &SharedState, tx: &Transaction) -> VmResult<ExecutionOutcome> {
        let gas_used = tx.gas.min(TX_GAS_CAP).saturating_mul(tx.gas_price);
        let cost = tx.value.saturating_add(gas_used);

        let mut sender = match state.load(&tx.sender) {
            Ok(account) => account,
            Err(StateError::NotFound) => {
                return Ok(ExecutionOutcome::Rejected(RejectReason::UnknownSender))
            }
            Err(e) => return Err(e.into()),
        };

        if sender.balance < cost {
            return Ok(ExecutionOutcome::Rejected(RejectReason::InsufficientFunds {
                required: cost,
                available: sender.balance,
            }));
        }

        sender.nonce += 1;
        sender.balance -= cost;
        state.store(&tx.sender, &sender)?;

        let mut recipient = match state.load(&tx.to) {
            Ok(account) => account,
            Err(StateError::NotFound) => Account::default(),
            Err(e) => return Err(e.into()),
        };
        recipient.balance = recipient.balance.saturating_add(tx.value);
        state.store(&tx.to, &recipient)?;

        let receipt = Receipt::success(tx.hash()?);
        debug!(tx = %receipt.tx_hash, gas_used, "transaction applied");
        Ok(ExecutionOutcome::Applied { receipt, gas_used })
    }
}
