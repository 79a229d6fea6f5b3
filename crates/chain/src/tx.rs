//! Legacy-transaction submission for the redemption path.
//!
//! Redemption needs exactly one write primitive: sign a zero-value contract
//! call as a pre-EIP-1559 transaction and push it through
//! `eth_sendRawTransaction`. The RLP support below covers only that shape;
//! there is no decoder and no typed-transaction envelope.

use k256::ecdsa::SigningKey;
use reqwest::Client;
use serde::Deserialize;
use sha3::{Digest, Keccak256};
use std::time::Duration;
use tracing::{debug, info};

use crate::address::Address;
use crate::reader::ChainError;

// =============================================================================
// RLP encoding
// =============================================================================

const RLP_STR: u8 = 0x80;
const RLP_LIST: u8 = 0xc0;
const RLP_INLINE_MAX: usize = 55;

/// Accumulates the RLP-encoded fields of one transaction, then wraps them
/// into the enclosing list.
#[derive(Default)]
struct RlpBuf {
    bytes: Vec<u8>,
}

impl RlpBuf {
    /// Appends a byte-string item.
    fn push_bytes(&mut self, data: &[u8]) {
        if data.len() == 1 && data[0] < RLP_STR {
            self.bytes.push(data[0]);
        } else {
            push_header(&mut self.bytes, RLP_STR, data.len());
            self.bytes.extend_from_slice(data);
        }
    }

    /// Appends an unsigned integer as a minimal big-endian byte string.
    /// Zero becomes the empty string per the RLP integer rule.
    fn push_uint(&mut self, value: u128) {
        let raw = value.to_be_bytes();
        let first = raw.iter().position(|&b| b != 0).unwrap_or(raw.len());
        self.push_bytes(&raw[first..]);
    }

    /// Closes the buffer into a single RLP list.
    fn into_list(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bytes.len() + 4);
        push_header(&mut out, RLP_LIST, self.bytes.len());
        out.extend_from_slice(&self.bytes);
        out
    }
}

/// Writes a string or list header. Payloads up to 55 bytes carry their
/// length inside the tag; longer ones get a length-of-length prefix.
fn push_header(out: &mut Vec<u8>, base: u8, len: usize) {
    if len <= RLP_INLINE_MAX {
        out.push(base + len as u8);
    } else {
        let raw = (len as u64).to_be_bytes();
        let first = raw.iter().position(|&b| b != 0).unwrap_or(raw.len() - 1);
        out.push(base + RLP_INLINE_MAX as u8 + (raw.len() - first) as u8);
        out.extend_from_slice(&raw[first..]);
    }
}

// =============================================================================
// Contract call
// =============================================================================

/// A zero-value legacy contract call ready for signing.
pub struct ContractCall {
    /// Account nonce.
    pub nonce: u64,
    /// Gas price in wei.
    pub gas_price: u128,
    /// Gas limit.
    pub gas_limit: u64,
    /// Target contract.
    pub to: Address,
    /// ABI-encoded calldata.
    pub data: Vec<u8>,
}

/// What follows the six call fields in the RLP payload: the chain id for
/// the signing digest, or the recovered signature for broadcast.
enum Trailer {
    ChainId(u64),
    Signed { v: u64, r: Vec<u8>, s: Vec<u8> },
}

impl ContractCall {
    fn rlp(&self, trailer: &Trailer) -> Vec<u8> {
        let mut buf = RlpBuf::default();
        buf.push_uint(self.nonce.into());
        buf.push_uint(self.gas_price);
        buf.push_uint(self.gas_limit.into());
        buf.push_bytes(self.to.as_bytes());
        buf.push_uint(0); // value: redemption never attaches ether
        buf.push_bytes(&self.data);
        match trailer {
            Trailer::ChainId(chain_id) => {
                buf.push_uint(u128::from(*chain_id));
                buf.push_uint(0);
                buf.push_uint(0);
            }
            Trailer::Signed { v, r, s } => {
                buf.push_uint(u128::from(*v));
                buf.push_bytes(r);
                buf.push_bytes(s);
            }
        }
        buf.into_list()
    }

    /// Signs the call with EIP-155 replay protection, returning raw
    /// transaction bytes for `eth_sendRawTransaction`.
    ///
    /// # Errors
    /// [`ChainError::InvalidKey`] / [`ChainError::Signing`] on bad key
    /// material.
    pub fn sign(&self, chain_id: u64, private_key_hex: &str) -> Result<Vec<u8>, ChainError> {
        let stripped = private_key_hex
            .strip_prefix("0x")
            .unwrap_or(private_key_hex);
        let key_bytes =
            hex::decode(stripped).map_err(|e| ChainError::InvalidKey(e.to_string()))?;
        let key = SigningKey::from_slice(&key_bytes)
            .map_err(|e| ChainError::InvalidKey(e.to_string()))?;

        let digest = Keccak256::digest(self.rlp(&Trailer::ChainId(chain_id)));
        let (signature, recovery) = key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| ChainError::Signing(e.to_string()))?;

        let trim = |bytes: &[u8]| {
            let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
            bytes[start..].to_vec()
        };
        // EIP-155 folds the chain id into the recovery byte.
        let v = chain_id * 2 + 35 + u64::from(recovery.to_byte());

        Ok(self.rlp(&Trailer::Signed {
            v,
            r: trim(&signature.r().to_bytes()),
            s: trim(&signature.s().to_bytes()),
        }))
    }
}

// =============================================================================
// JSON-RPC helpers
// =============================================================================

#[derive(Debug, Deserialize)]
struct RpcReply {
    #[serde(default)]
    result: Option<serde_json::Value>,
    error: Option<RpcFault>,
}

#[derive(Debug, Deserialize)]
struct RpcFault {
    code: i64,
    message: String,
}

/// Issues one JSON-RPC request. `Ok(None)` means the node answered with a
/// null result (a pending receipt, for instance).
async fn rpc(
    http: &Client,
    rpc_url: &str,
    method: &str,
    params: serde_json::Value,
) -> Result<Option<serde_json::Value>, ChainError> {
    let reply: RpcReply = http
        .post(rpc_url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        }))
        .send()
        .await?
        .json()
        .await?;

    if let Some(fault) = reply.error {
        return Err(ChainError::Rpc {
            code: fault.code,
            message: fault.message,
        });
    }
    Ok(reply.result.filter(|value| !value.is_null()))
}

fn quantity(value: &serde_json::Value) -> Result<u128, ChainError> {
    let text = value
        .as_str()
        .ok_or_else(|| ChainError::Parse("quantity is not a string".to_string()))?;
    u128::from_str_radix(text.trim_start_matches("0x"), 16)
        .map_err(|e| ChainError::Parse(format!("bad quantity '{text}': {e}")))
}

/// Fetches the next nonce for an account.
pub(crate) async fn next_nonce(
    http: &Client,
    rpc_url: &str,
    owner: Address,
) -> Result<u64, ChainError> {
    let value = rpc(
        http,
        rpc_url,
        "eth_getTransactionCount",
        serde_json::json!([owner.to_string(), "latest"]),
    )
    .await?
    .ok_or_else(|| ChainError::Parse("eth_getTransactionCount: empty result".to_string()))?;
    Ok(quantity(&value)? as u64)
}

/// Fetches the spot gas price in wei.
pub(crate) async fn current_gas_price(http: &Client, rpc_url: &str) -> Result<u128, ChainError> {
    let value = rpc(http, rpc_url, "eth_gasPrice", serde_json::json!([]))
        .await?
        .ok_or_else(|| ChainError::Parse("eth_gasPrice: empty result".to_string()))?;
    quantity(&value)
}

/// Broadcasts signed transaction bytes, returning the hash.
pub(crate) async fn submit_raw(
    http: &Client,
    rpc_url: &str,
    raw: &[u8],
) -> Result<String, ChainError> {
    let params = serde_json::json!([format!("0x{}", hex::encode(raw))]);
    let value = rpc(http, rpc_url, "eth_sendRawTransaction", params)
        .await
        .map_err(|e| match e {
            ChainError::Rpc { message, .. } => ChainError::Rejected(message),
            other => other,
        })?
        .ok_or_else(|| ChainError::Parse("eth_sendRawTransaction: no hash".to_string()))?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ChainError::Parse("tx hash is not a string".to_string()))
}

/// Polls for the transaction receipt until it lands or `timeout` elapses.
/// Returns whether the transaction executed successfully.
///
/// # Errors
/// [`ChainError::Timeout`] when no receipt appears in time.
pub(crate) async fn confirm(
    http: &Client,
    rpc_url: &str,
    tx_hash: &str,
    timeout: Duration,
) -> Result<bool, ChainError> {
    const RECEIPT_POLL: Duration = Duration::from_secs(2);
    let mut waited = Duration::ZERO;

    loop {
        let receipt = rpc(
            http,
            rpc_url,
            "eth_getTransactionReceipt",
            serde_json::json!([tx_hash]),
        )
        .await?;

        if let Some(receipt) = receipt {
            let mined_ok = receipt.get("status").and_then(|s| s.as_str()) == Some("0x1");
            if mined_ok {
                info!(tx_hash, "redemption call mined");
            } else {
                debug!(tx_hash, "receipt reports revert");
            }
            return Ok(mined_ok);
        }

        if waited >= timeout {
            return Err(ChainError::Timeout);
        }
        tokio::time::sleep(RECEIPT_POLL).await;
        waited += RECEIPT_POLL;
    }
}

// =============================================================================
// Tests
// =============================================================================
