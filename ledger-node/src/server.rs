//! Line-delimited TCP front end
//!
//! One line per request, no length framing. `GET_ACCOUNT_STATUS <hex>`
//! gets a JSON reply; any other line is parsed as a JSON transaction and
//! submitted fire-and-forget. Bad input is logged and dropped while the
//! connection stays open.

use crate::{Ledger, NodeError, NodeResult};
use ledger_core::{Address, CoreError, Signature, Transaction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Wire shape of a submitted transaction
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxRequest {
    from: String,
    to: String,
    nonce: u64,
    value: u64,
    gas: u64,
    gas_price: u64,
    #[serde(default)]
    #[allow(dead_code)]
    input: String,
    r: String,
    s: String,
    v: u8,
}

/// Wire shape of a status reply
#[derive(Debug, Serialize)]
struct AccountStatusResponse {
    balance: u64,
    nonce: u64,
}

/// Accept connections forever, one task per client
pub async fn run(listener: TcpListener, ledger: Arc<Ledger>) -> NodeResult<()> {
    info!(addr = %listener.local_addr()?, "listening for transactions");
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(socket, ledger).await {
                        debug!(%peer, error = %e, "connection error");
                    }
                });
            }
            Err(e) => warn!(error = %e, "failed to accept connection"),
        }
    }
}

async fn handle_connection(socket: TcpStream, ledger: Arc<Ledger>) -> NodeResult<()> {
    let peer = socket.peer_addr()?;
    debug!(%peer, "connection opened");

    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let request = line.trim();
        if request.is_empty() {
            continue;
        }
        if let Some(raw) = request.strip_prefix("GET_ACCOUNT_STATUS") {
            respond_account_status(&mut writer, &ledger, raw.trim()).await?;
        } else {
            submit_transaction(&ledger, request);
        }
    }

    debug!(%peer, "connection closed");
    Ok(())
}

async fn respond_account_status(
    writer: &mut OwnedWriteHalf,
    ledger: &Ledger,
    raw: &str,
) -> NodeResult<()> {
    let address = match Address::from_hex(raw) {
        Ok(address) => address,
        Err(e) => {
            warn!(error = %e, "bad address in status request");
            return Ok(());
        }
    };
    let account = ledger.account_status(&address)?;
    let mut payload = serde_json::to_vec(&AccountStatusResponse {
        balance: account.balance,
        nonce: account.nonce,
    })?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    Ok(())
}

/// Fire-and-forget submission; all failures are logged and swallowed
fn submit_transaction(ledger: &Ledger, request: &str) {
    let data: TxRequest = match serde_json::from_str(request) {
        Ok(data) => data,
        Err(e) => {
            warn!(error = %e, "malformed transaction request");
            return;
        }
    };
    match build_transaction(&data) {
        Ok(tx) => {
            if let Err(e) = ledger.submit_tx(tx) {
                warn!(error = %e, "transaction rejected");
            }
        }
        Err(e) => warn!(error = %e, "bad transaction fields"),
    }
}

fn build_transaction(data: &TxRequest) -> NodeResult<Transaction> {
    let sender = Address::from_hex(&data.from)?;
    let to = Address::from_hex(&data.to)?;
    let mut tx = Transaction::new(sender, to, data.nonce, data.value, data.gas, data.gas_price);
    tx.signature = Signature::new(
        parse_sig_word(&data.r)?,
        parse_sig_word(&data.s)?,
        data.v,
    );
    Ok(tx)
}

/// Big-endian hex signature component, left-padded to 32 bytes
fn parse_sig_word(raw: &str) -> NodeResult<[u8; 32]> {
    let s = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(s).map_err(|e| NodeError::Core(e.into()))?;
    if bytes.len() > 32 {
        return Err(NodeError::Core(CoreError::Decode(format!(
            "signature word too long: {} bytes",
            bytes.len()
        ))));
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(out)
}
