//! On-chain reads over JSON-RPC.
//!
//! The executor only needs a handful of views: ERC-20 collateral balances for
//! fill verification, ERC-1155 outcome-token balances and the CTF payout
//! denominator for redemption, and the gas price. [`RpcChainReader`] serves
//! them through `eth_call`; [`StaticChainReader`] is the in-memory double the
//! tests drive.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use cross_arb_core::types::ConditionId;

use crate::address::Address;
use crate::ctf;

// =============================================================================
// Errors
// =============================================================================

/// Errors from chain access.
#[derive(Debug, Error)]
pub enum ChainError {
    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON-RPC level error.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// Response missing or malformed.
    #[error("malformed RPC response: {0}")]
    Parse(String),

    /// Transaction was rejected at broadcast.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// Timed out waiting for a transaction receipt.
    #[error("timeout waiting for transaction receipt")]
    Timeout,

    /// Invalid private key material.
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    /// Transaction signing failed.
    #[error("signing failed: {0}")]
    Signing(String),
}

// =============================================================================
// Trait
// =============================================================================

/// Read-only chain views used by fill verification and redemption.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// ERC-20 `balanceOf(owner)` on `token`, in wei.
    async fn erc20_balance(&self, token: Address, owner: Address) -> Result<u128, ChainError>;

    /// ERC-1155 `balanceOf(owner, token_id)` on `contract`.
    async fn erc1155_balance(
        &self,
        contract: Address,
        owner: Address,
        token_id: [u8; 32],
    ) -> Result<u128, ChainError>;

    /// CTF `payoutDenominator(condition_id)`; nonzero once resolved.
    async fn payout_denominator(
        &self,
        ctf: Address,
        condition_id: ConditionId,
    ) -> Result<u128, ChainError>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> Result<u128, ChainError>;
}

// =============================================================================
// JSON-RPC implementation
// =============================================================================

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// [`ChainReader`] over an EVM JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcChainReader {
    client: Client,
    rpc_url: String,
}

impl RpcChainReader {
    /// Creates a reader against the given RPC endpoint.
    #[must_use]
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            rpc_url: rpc_url.into(),
        }
    }

    async fn eth_call(&self, to: Address, calldata: &[u8]) -> Result<Vec<u8>, ChainError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_call",
            "params": [{
                "to": to.to_string(),
                "data": format!("0x{}", hex::encode(calldata)),
            }, "latest"],
            "id": 1
        });

        let response: RpcResponse = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = response
            .result
            .ok_or_else(|| ChainError::Parse("no result in RPC response".to_string()))?;
        let stripped = result.strip_prefix("0x").unwrap_or(&result);
        hex::decode(stripped).map_err(|e| ChainError::Parse(e.to_string()))
    }

    async fn eth_call_u128(&self, to: Address, calldata: &[u8]) -> Result<u128, ChainError> {
        let data = self.eth_call(to, calldata).await?;
        parse_uint_word(&data)
    }
}

/// Parses a single 32-byte ABI word into `u128`, saturating on overflow.
fn parse_uint_word(data: &[u8]) -> Result<u128, ChainError> {
    if data.len() < 32 {
        return Err(ChainError::Parse(format!(
            "expected 32-byte word, got {} bytes",
            data.len()
        )));
    }
    if data[..16].iter().any(|&b| b != 0) {
        return Ok(u128::MAX);
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&data[16..32]);
    Ok(u128::from_be_bytes(low))
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn erc20_balance(&self, token: Address, owner: Address) -> Result<u128, ChainError> {
        let balance = self
            .eth_call_u128(token, &ctf::erc20_balance_of_calldata(owner))
            .await?;
        debug!(token = %token, owner = %owner, balance, "ERC-20 balance read");
        Ok(balance)
    }

    async fn erc1155_balance(
        &self,
        contract: Address,
        owner: Address,
        token_id: [u8; 32],
    ) -> Result<u128, ChainError> {
        self.eth_call_u128(contract, &ctf::erc1155_balance_of_calldata(owner, token_id))
            .await
    }

    async fn payout_denominator(
        &self,
        ctf: Address,
        condition_id: ConditionId,
    ) -> Result<u128, ChainError> {
        self.eth_call_u128(ctf, &ctf::payout_denominator_calldata(condition_id))
            .await
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_gasPrice",
            "params": [],
            "id": 1
        });

        let response: RpcResponse = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let result = response
            .result
            .ok_or_else(|| ChainError::Parse("no result in RPC response".to_string()))?;
        let stripped = result.strip_prefix("0x").unwrap_or(&result);
        u128::from_str_radix(stripped, 16).map_err(|e| ChainError::Parse(e.to_string()))
    }
}

// =============================================================================
// In-memory double
// =============================================================================

/// Programmable [`ChainReader`] used by tests and rehearsal runs.
#[derive(Debug, Default)]
pub struct StaticChainReader {
    erc20: Mutex<HashMap<(Address, Address), u128>>,
    erc20_scripts: Mutex<HashMap<(Address, Address), std::collections::VecDeque<u128>>>,
    erc1155: Mutex<HashMap<(Address, Address, [u8; 32]), u128>>,
    denominators: Mutex<HashMap<(Address, ConditionId), u128>>,
    gas_price: Mutex<u128>,
    fail_reads: Mutex<bool>,
}

impl StaticChainReader {
    /// Creates an empty reader; all balances read as zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an ERC-20 balance in wei.
    pub fn set_erc20_balance(&self, token: Address, owner: Address, wei: u128) {
        self.erc20.lock().insert((token, owner), wei);
    }

    /// Queues balances returned by successive ERC-20 reads of one account,
    /// ahead of the static value. Lets tests replay pre/post trade deltas.
    pub fn push_erc20_balance(&self, token: Address, owner: Address, wei: u128) {
        self.erc20_scripts
            .lock()
            .entry((token, owner))
            .or_default()
            .push_back(wei);
    }

    /// Sets an ERC-1155 balance.
    pub fn set_erc1155_balance(
        &self,
        contract: Address,
        owner: Address,
        token_id: [u8; 32],
        amount: u128,
    ) {
        self.erc1155.lock().insert((contract, owner, token_id), amount);
    }

    /// Sets a payout denominator.
    pub fn set_payout_denominator(&self, ctf: Address, condition_id: ConditionId, value: u128) {
        self.denominators.lock().insert((ctf, condition_id), value);
    }

    /// Sets the gas price.
    pub fn set_gas_price(&self, wei: u128) {
        *self.gas_price.lock() = wei;
    }

    /// Makes every subsequent read fail, simulating a dead RPC endpoint.
    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock() = fail;
    }

    fn check_failure(&self) -> Result<(), ChainError> {
        if *self.fail_reads.lock() {
            Err(ChainError::Parse("simulated RPC failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChainReader for StaticChainReader {
    async fn erc20_balance(&self, token: Address, owner: Address) -> Result<u128, ChainError> {
        self.check_failure()?;
        if let Some(queue) = self.erc20_scripts.lock().get_mut(&(token, owner)) {
            if let Some(wei) = queue.pop_front() {
                return Ok(wei);
            }
        }
        Ok(self.erc20.lock().get(&(token, owner)).copied().unwrap_or(0))
    }

    async fn erc1155_balance(
        &self,
        contract: Address,
        owner: Address,
        token_id: [u8; 32],
    ) -> Result<u128, ChainError> {
        self.check_failure()?;
        Ok(self
            .erc1155
            .lock()
            .get(&(contract, owner, token_id))
            .copied()
            .unwrap_or(0))
    }

    async fn payout_denominator(
        &self,
        ctf: Address,
        condition_id: ConditionId,
    ) -> Result<u128, ChainError> {
        self.check_failure()?;
        Ok(self
            .denominators
            .lock()
            .get(&(ctf, condition_id))
            .copied()
            .unwrap_or(0))
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        self.check_failure()?;
        Ok(*self.gas_price.lock())
    }
}

// =============================================================================
// Tests
// =============================================================================
