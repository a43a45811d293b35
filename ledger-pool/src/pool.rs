//! Nonce-ordered transaction pool

use crate::PoolResult;
use ledger_core::{Account, Address, Transaction};
use ledger_state::{SharedState, StateError};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Transaction pool.
///
/// Each sender has a pending sequence (contiguous nonces starting right
/// after the on-chain nonce) and an overflow queue for gapped nonces.
/// A ready index orders senders ascending by fee key — the gas price of
/// the pending head — which makes `pop` lowest-fee-first. That order is
/// documented upstream behavior and pinned by a test here.
pub struct TxPool {
    state: SharedState,
    inner: Mutex<PoolInner>,
}

#[derive(Default)]
struct PoolInner {
    /// Contiguous runs ready for inclusion, nonce-ascending per sender
    pending: HashMap<Address, VecDeque<Transaction>>,
    /// Gapped transactions waiting for their predecessors, nonce-sorted
    overflow: HashMap<Address, Vec<Transaction>>,
    /// Senders with a non-empty pending sequence, ascending by fee key
    ready: Vec<Address>,
}

impl TxPool {
    /// Create a pool reading nonce baselines from `state`
    pub fn new(state: SharedState) -> Self {
        Self {
            state,
            inner: Mutex::new(PoolInner::default()),
        }
    }

    /// Admit a verified transaction.
    ///
    /// Relative to the sender's frontier (last pending nonce, or the
    /// on-chain nonce when nothing is pending): a gap buffers the
    /// transaction in overflow, the next contiguous nonce extends the
    /// pending sequence and promotes any now-contiguous overflow
    /// entries, and an already-covered nonce is only considered as a
    /// fee-bump replacement. Anything else is silently dropped.
    pub fn admit(&self, tx: Transaction) -> PoolResult<()> {
        let mut inner = self.inner.lock();

        let account = match self.state.load(&tx.sender) {
            Ok(account) => account,
            Err(StateError::NotFound) => Account::default(),
            Err(e) => return Err(e.into()),
        };
        let frontier = inner
            .pending
            .get(&tx.sender)
            .and_then(|seq| seq.back())
            .map(|t| t.nonce)
            .unwrap_or(account.nonce);

        if tx.nonce > frontier + 1 {
            debug!(sender = %tx.sender, nonce = tx.nonce, frontier, "gap, buffered in overflow");
            let queue = inner.overflow.entry(tx.sender).or_default();
            queue.push(tx);
            queue.sort_by_key(|t| t.nonce);
        } else if tx.nonce == frontier + 1 {
            debug!(sender = %tx.sender, nonce = tx.nonce, "admitted to pending");
            inner.push_pending(tx);
        } else {
            inner.replace_pending(tx);
        }
        Ok(())
    }

    /// Extract the head of the lowest-fee-key pending sequence
    pub fn pop(&self) -> Option<Transaction> {
        self.inner.lock().pop_lowest_fee()
    }

    /// Total transactions held, pending and overflow
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner.pending.values().map(|seq| seq.len()).sum::<usize>()
            + inner.overflow.values().map(|queue| queue.len()).sum::<usize>()
    }

    /// Whether the pool holds no transactions
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PoolInner {
    fn push_pending(&mut self, tx: Transaction) {
        let sender = tx.sender;
        self.pending.entry(sender).or_default().push_back(tx);
        if !self.ready.contains(&sender) {
            self.ready.push(sender);
        }
        self.promote(sender);
        self.sort_ready();
    }

    /// Move overflow entries into pending while they stay contiguous
    /// with the advancing frontier
    fn promote(&mut self, sender: Address) {
        while let Some(frontier) = self
            .pending
            .get(&sender)
            .and_then(|seq| seq.back())
            .map(|t| t.nonce)
        {
            let next = self.overflow.get_mut(&sender).and_then(|queue| {
                queue
                    .iter()
                    .position(|t| t.nonce == frontier + 1)
                    .map(|idx| queue.remove(idx))
            });
            match next {
                Some(tx) => {
                    debug!(sender = %sender, nonce = tx.nonce, "promoted from overflow");
                    if let Some(seq) = self.pending.get_mut(&sender) {
                        seq.push_back(tx);
                    }
                }
                None => break,
            }
        }
        if self.overflow.get(&sender).is_some_and(|queue| queue.is_empty()) {
            self.overflow.remove(&sender);
        }
    }

    /// Fee-bump path for a nonce at or below the frontier: replace the
    /// first pending entry with an equal-or-higher nonce and a strictly
    /// lower fee, then restore nonce order. No match discards the
    /// transaction.
    fn replace_pending(&mut self, tx: Transaction) {
        let Some(seq) = self.pending.get_mut(&tx.sender) else {
            debug!(sender = %tx.sender, nonce = tx.nonce, "stale nonce, discarded");
            return;
        };
        let Some(slot) = seq
            .iter_mut()
            .find(|t| t.nonce >= tx.nonce && t.gas_price < tx.gas_price)
        else {
            debug!(sender = %tx.sender, nonce = tx.nonce, "no replaceable slot, discarded");
            return;
        };
        debug!(sender = %tx.sender, nonce = tx.nonce, gas_price = tx.gas_price, "replaced pending slot");
        *slot = tx;
        seq.make_contiguous().sort_by_key(|t| t.nonce);
        self.sort_ready();
    }

    fn pop_lowest_fee(&mut self) -> Option<Transaction> {
        let sender = *self.ready.first()?;
        let seq = self.pending.get_mut(&sender)?;
        let tx = seq.pop_front()?;
        if seq.is_empty() {
            self.pending.remove(&sender);
            self.ready.retain(|a| *a != sender);
        } else {
            self.sort_ready();
        }
        Some(tx)
    }

    /// Re-key the ready index by each sender's pending-head gas price
    fn sort_ready(&mut self) {
        let pending = &self.pending;
        self.ready.sort_by_key(|sender| {
            pending
                .get(sender)
                .and_then(|seq| seq.front())
                .map(|t| t.gas_price)
                .unwrap_or(u64::MAX)
        });
    }
}
