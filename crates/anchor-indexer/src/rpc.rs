//! JSON-RPC ledger client.
//!
//! Talks to a ledger node over HTTP (`eth_blockNumber`, `eth_getLogs`)
//! and converts wire logs into [`RawLog`] values for the decoder. A
//! polling watcher task turns the node's head into an `mpsc` stream of
//! block numbers for the synchronizer's tail loop.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use anchor_types::{Address, Hash32, RawLog, Word};

/// Errors from the ledger transport. These are fatal to the process;
/// unlike per-entry decode failures they indicate the node or the
/// connection is unusable.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP request failed.
    #[error("ledger HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The node returned a JSON-RPC error object.
    #[error("ledger RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// The node's response did not match the expected shape.
    #[error("malformed ledger response: {0}")]
    Malformed(String),
}

/// Read access to the ledger's log stream.
#[allow(async_fn_in_trait)]
pub trait LedgerClient {
    /// Current head block number.
    async fn block_number(&self) -> Result<u64, TransportError>;

    /// All logs emitted by `address` in blocks `from..=to`.
    async fn get_logs(
        &self,
        address: Address,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, TransportError>;
}

/// JSON-RPC implementation of [`LedgerClient`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    http: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// One log entry as returned by `eth_getLogs`.
#[derive(Debug, Deserialize)]
struct WireLog {
    address: String,
    topics: Vec<String>,
    data: String,
    #[serde(rename = "blockNumber")]
    block_number: String,
    #[serde(rename = "logIndex")]
    log_index: String,
    #[serde(rename = "transactionHash")]
    transaction_hash: String,
}

impl HttpLedgerClient {
    /// Create a client for the given JSON-RPC endpoint.
    pub fn new(url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_owned(),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, TransportError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response: RpcResponse<T> = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(TransportError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        response
            .result
            .ok_or_else(|| TransportError::Malformed(format!("{method}: missing result")))
    }
}

impl LedgerClient for HttpLedgerClient {
    async fn block_number(&self) -> Result<u64, TransportError> {
        let quantity: String = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&quantity)
    }

    async fn get_logs(
        &self,
        address: Address,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, TransportError> {
        let params = json!([{
            "address": address.to_hex(),
            "fromBlock": format!("0x{from:x}"),
            "toBlock": format!("0x{to:x}"),
        }]);
        let wire: Vec<WireLog> = self.call("eth_getLogs", params).await?;
        wire.iter().map(parse_log).collect()
    }
}

/// Parse a `0x`-prefixed hex quantity into a `u64`.
fn parse_quantity(quantity: &str) -> Result<u64, TransportError> {
    let digits = quantity.strip_prefix("0x").unwrap_or(quantity);
    u64::from_str_radix(digits, 16)
        .map_err(|e| TransportError::Malformed(format!("bad quantity {quantity}: {e}")))
}

fn parse_log(wire: &WireLog) -> Result<RawLog, TransportError> {
    let address = Address::from_hex(&wire.address)
        .map_err(|e| TransportError::Malformed(format!("bad log address: {e}")))?;
    let topics = wire
        .topics
        .iter()
        .map(|topic| {
            Word::from_hex(topic)
                .map_err(|e| TransportError::Malformed(format!("bad log topic: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let data = hex::decode(wire.data.strip_prefix("0x").unwrap_or(&wire.data))
        .map_err(|e| TransportError::Malformed(format!("bad log data: {e}")))?;
    let tx_hash = Hash32::from_hex(&wire.transaction_hash)
        .map_err(|e| TransportError::Malformed(format!("bad transaction hash: {e}")))?;

    Ok(RawLog {
        address,
        topics,
        data,
        block_number: parse_quantity(&wire.block_number)?,
        log_index: parse_quantity(&wire.log_index)?,
        tx_hash,
    })
}

/// Consecutive head-poll failures tolerated before the watcher gives up.
const MAX_CONSECUTIVE_POLL_FAILURES: u32 = 10;

/// Tracks consecutive head-poll failures against a fixed budget.
#[derive(Debug, Default)]
struct PollHealth {
    consecutive_failures: u32,
}

impl PollHealth {
    /// Record a successful poll, clearing the failure streak.
    const fn succeeded(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Record a failed poll. Returns `true` once the budget is exhausted
    /// and the watcher should stop.
    const fn failed(&mut self) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures >= MAX_CONSECUTIVE_POLL_FAILURES
    }
}

/// Spawn a task that polls the node head and sends each newly observed
/// block number on the returned channel, in order. The task stops when
/// the receiver is dropped. Transient poll failures are logged and
/// retried on the next interval, but a persistently unreachable node
/// exhausts a consecutive-failure budget, at which point the watcher
/// stops and closes the channel so the tail loop shuts down instead of
/// idling forever.
pub fn spawn_block_watcher(
    client: HttpLedgerClient,
    start_after: u64,
    poll_interval: Duration,
) -> mpsc::Receiver<u64> {
    let (tx, rx) = mpsc::channel(64);

    tokio::spawn(async move {
        let mut last_seen = start_after;
        let mut health = PollHealth::default();
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            match client.block_number().await {
                Ok(head) => {
                    health.succeeded();
                    while last_seen < head {
                        last_seen = last_seen.saturating_add(1);
                        if tx.send(last_seen).await.is_err() {
                            tracing::debug!("block watcher receiver dropped, stopping");
                            return;
                        }
                    }
                }
                Err(error) => {
                    if health.failed() {
                        tracing::error!(
                            %error,
                            failures = health.consecutive_failures,
                            "head poll failing persistently, stopping watcher"
                        );
                        return;
                    }
                    tracing::warn!(
                        %error,
                        failures = health.consecutive_failures,
                        "head poll failed, will retry"
                    );
                }
            }
        }
    });

    rx
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn quantities_parse_with_and_without_prefix() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x1a").unwrap(), 26);
        assert_eq!(parse_quantity("ff").unwrap(), 255);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn wire_log_converts_to_raw_log() {
        let wire = WireLog {
            address: "0x1111111111111111111111111111111111111111".to_owned(),
            topics: vec![format!("0x{:064x}", 7)],
            data: format!("0x{:064x}", 42),
            block_number: "0x10".to_owned(),
            log_index: "0x2".to_owned(),
            transaction_hash: format!("0x{:064x}", 0xdead_beef_u64),
        };

        let raw = parse_log(&wire).unwrap();
        assert_eq!(raw.block_number, 16);
        assert_eq!(raw.log_index, 2);
        assert_eq!(raw.topics.len(), 1);
        assert_eq!(raw.data.len(), 32);
        assert_eq!(raw.address.to_hex(), wire.address);
    }

    #[test]
    fn poll_failure_budget_is_consecutive() {
        let mut health = PollHealth::default();
        for _ in 1..MAX_CONSECUTIVE_POLL_FAILURES {
            assert!(!health.failed());
        }
        assert!(health.failed());

        // A single success clears the streak entirely.
        let mut health = PollHealth::default();
        for _ in 1..MAX_CONSECUTIVE_POLL_FAILURES {
            assert!(!health.failed());
        }
        health.succeeded();
        assert!(!health.failed());
    }

    #[test]
    fn malformed_topic_is_rejected() {
        let wire = WireLog {
            address: "0x1111111111111111111111111111111111111111".to_owned(),
            topics: vec!["0x1234".to_owned()],
            data: "0x".to_owned(),
            block_number: "0x1".to_owned(),
            log_index: "0x0".to_owned(),
            transaction_hash: format!("0x{:064x}", 1),
        };

        assert!(matches!(parse_log(&wire), Err(TransportError::Malformed(_))));
    }
}
