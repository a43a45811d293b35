//! Chain head ownership and orchestration

use crate::{BlockAssembler, NodeError, NodeResult};
use ledger_core::{Account, Address, Header, Transaction};
use ledger_pool::TxPool;
use ledger_state::{SharedState, StateError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The single chain: current header plus the state, pool and assembler
/// behind it. Entry point for the front end and the production timer.
pub struct Ledger {
    state: SharedState,
    pool: Arc<TxPool>,
    assembler: BlockAssembler,
    head: Mutex<Header>,
}

impl Ledger {
    /// Boot a chain with a genesis header over the current state root
    pub fn new(
        state: SharedState,
        pool: Arc<TxPool>,
        assembler: BlockAssembler,
    ) -> NodeResult<Self> {
        let genesis = Header::genesis(state.root()?);
        info!(root = %genesis.state_root, "chain initialized at genesis");
        Ok(Self {
            state,
            pool,
            assembler,
            head: Mutex::new(genesis),
        })
    }

    /// Current chain head
    pub fn head(&self) -> Header {
        self.head.lock().clone()
    }

    /// Verify and admit a transaction from the front end
    pub fn submit_tx(&self, tx: Transaction) -> NodeResult<()> {
        if !tx.verify() {
            return Err(NodeError::Verification);
        }
        debug!(sender = %tx.sender, nonce = tx.nonce, "transaction submitted");
        self.pool.admit(tx)?;
        Ok(())
    }

    /// Account lookup for status queries; absent accounts read as zero
    pub fn account_status(&self, address: &Address) -> NodeResult<Account> {
        match self.state.load(address) {
            Ok(account) => Ok(account),
            Err(StateError::NotFound) => Ok(Account::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Run one pack/mine cycle and advance the head. A failed attempt
    /// leaves the previous head in place.
    pub fn produce_block(&self) -> NodeResult<()> {
        let head = self.head();
        let cancel = CancellationToken::new();
        let (header, body) = match self.assembler.pack_and_mint(&head, &cancel) {
            Ok(block) => block,
            Err(e) => {
                warn!(error = %e, "block production aborted");
                return Err(e);
            }
        };

        info!(
            hash = %header.hash()?,
            parent = %header.parent_hash,
            height = header.height,
            timestamp = header.timestamp,
            txs = body.len(),
            "block mined"
        );
        for (i, tx) in body.transactions.iter().enumerate() {
            debug!(index = i, tx = %tx.hash()?, "included");
        }

        *self.head.lock() = header;
        Ok(())
    }
}
