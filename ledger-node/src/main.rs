//! Node entrypoint

use anyhow::Context;
use clap::Parser;
use ledger_core::{Account, Address, Hash};
use ledger_db::{MemoryStore, SharedStore, SledStore};
use ledger_node::{
    server, AssemblerConfig, BlockAssembler, GenesisAccount, Ledger, NodeConfig,
};
use ledger_pool::TxPool;
use ledger_state::{SharedState, StateTrie};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ledger-node", about = "Single-node ledger with a Merkle state trie")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address override
    #[arg(long)]
    listen: Option<String>,

    /// sled database directory; in-memory when omitted
    #[arg(long)]
    db: Option<PathBuf>,

    /// Coinbase address override (hex)
    #[arg(long)]
    coinbase: Option<String>,

    /// Mining difficulty override (leading zero hex characters)
    #[arg(long)]
    difficulty: Option<usize>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => NodeConfig::default(),
        };
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(db) = self.db {
            config.db_path = Some(db);
        }
        if let Some(coinbase) = self.coinbase {
            config.coinbase = coinbase;
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        Ok(config)
    }
}

fn fund_genesis(state: &SharedState, accounts: &[GenesisAccount]) -> anyhow::Result<()> {
    for entry in accounts {
        let address = Address::from_hex(&entry.address)
            .with_context(|| format!("bad genesis address {}", entry.address))?;
        let account = Account {
            balance: entry.balance,
            nonce: entry.nonce,
            ..Account::default()
        };
        state.store(&address, &account)?;
        info!(%address, balance = entry.balance, "genesis account funded");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config()?;
    info!("initializing node");

    let store: SharedStore = match &config.db_path {
        Some(path) => Arc::new(SledStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    };
    let state = SharedState::new(StateTrie::new(store, Hash::zero())?);
    fund_genesis(&state, &config.genesis)?;

    let pool = Arc::new(TxPool::new(state.clone()));
    let assembler = BlockAssembler::new(
        state.clone(),
        pool.clone(),
        AssemblerConfig {
            coinbase: config.coinbase_address()?,
            difficulty: config.difficulty,
            pack_budget: Duration::from_millis(config.pack_budget_ms),
            max_block_txs: config.max_block_txs,
        },
    );
    let ledger = Arc::new(Ledger::new(state, pool, assembler)?);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            if let Err(e) = server::run(listener, ledger).await {
                warn!(error = %e, "front end stopped");
            }
        });
    }

    let mut interval = tokio::time::interval(Duration::from_secs(config.block_interval_secs));
    interval.tick().await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            _ = interval.tick() => {
                let ledger = ledger.clone();
                match tokio::task::spawn_blocking(move || ledger.produce_block()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(error = %e, "block production failed"),
                    Err(e) => warn!(error = %e, "block production task failed"),
                }
            }
        }
    }
    Ok(())
}
