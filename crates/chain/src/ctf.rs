//! Conditional-token framework (CTF) calldata and the redemption path.
//!
//! YES and NO outcome shares live in an ERC-1155-shaped CTF contract per
//! venue chain. Once a condition's payout denominator turns nonzero the
//! market is resolved and held shares redeem for collateral via
//! `redeemPositions`. This module builds the calldata for those calls and
//! provides [`WalletAccount`], the signing seam the redeemer drives.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

use cross_arb_core::types::ConditionId;

use crate::address::Address;
use crate::reader::ChainError;
use crate::tx::{self, ContractCall};
use crate::wallet::Wallet;

// =============================================================================
// Function selectors
// =============================================================================

/// ERC-20 `balanceOf(address)`.
const ERC20_BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// ERC-1155 `balanceOf(address,uint256)`.
const ERC1155_BALANCE_OF_SELECTOR: [u8; 4] = [0x00, 0xfd, 0xd5, 0x8e];

/// CTF `payoutDenominator(bytes32)`.
const PAYOUT_DENOMINATOR_SELECTOR: [u8; 4] = [0xdd, 0x34, 0xde, 0x67];

/// CTF `redeemPositions(address,bytes32,bytes32,uint256[])`.
const REDEEM_POSITIONS_SELECTOR: [u8; 4] = [0x01, 0xb7, 0x03, 0x7c];

/// Gas limit for `redeemPositions` transactions.
const REDEEM_GAS_LIMIT: u64 = 300_000;

/// How long to wait for a redemption receipt.
const REDEEM_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

// =============================================================================
// Calldata builders
// =============================================================================

/// Builds ERC-20 `balanceOf(owner)` calldata.
#[must_use]
pub fn erc20_balance_of_calldata(owner: Address) -> Vec<u8> {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&ERC20_BALANCE_OF_SELECTOR);
    data.extend_from_slice(&owner.abi_word());
    data
}

/// Builds ERC-1155 `balanceOf(owner, token_id)` calldata.
#[must_use]
pub fn erc1155_balance_of_calldata(owner: Address, token_id: [u8; 32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(68);
    data.extend_from_slice(&ERC1155_BALANCE_OF_SELECTOR);
    data.extend_from_slice(&owner.abi_word());
    data.extend_from_slice(&token_id);
    data
}

/// Builds CTF `payoutDenominator(condition_id)` calldata.
#[must_use]
pub fn payout_denominator_calldata(condition_id: ConditionId) -> Vec<u8> {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&PAYOUT_DENOMINATOR_SELECTOR);
    data.extend_from_slice(condition_id.as_bytes());
    data
}

/// Builds CTF `redeemPositions(collateral, parent, condition_id, index_sets)`
/// calldata with the zero parent collection.
#[must_use]
pub fn redeem_positions_calldata(
    collateral: Address,
    condition_id: ConditionId,
    index_sets: &[u64],
) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32 * (5 + index_sets.len()));
    data.extend_from_slice(&REDEEM_POSITIONS_SELECTOR);
    data.extend_from_slice(&collateral.abi_word());
    data.extend_from_slice(&[0u8; 32]); // parentCollectionId
    data.extend_from_slice(condition_id.as_bytes());
    // dynamic array: offset, length, elements
    data.extend_from_slice(&uint_word(0x80));
    data.extend_from_slice(&uint_word(index_sets.len() as u64));
    for set in index_sets {
        data.extend_from_slice(&uint_word(*set));
    }
    data
}

fn uint_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Parses a venue-native token id (decimal or 0x-hex string) into a 32-byte
/// big-endian `uint256`.
///
/// # Errors
/// [`ChainError::Parse`] on malformed input or overflow.
pub fn token_id_to_u256(token_id: &str) -> Result<[u8; 32], ChainError> {
    let s = token_id.trim();
    if s.is_empty() {
        return Err(ChainError::Parse("empty token id".to_string()));
    }

    if let Some(hex_part) = s.strip_prefix("0x") {
        if hex_part.len() > 64 {
            return Err(ChainError::Parse(format!(
                "token id too wide: {} hex chars",
                hex_part.len()
            )));
        }
        let padded = format!("{hex_part:0>64}");
        let bytes = hex::decode(&padded).map_err(|e| ChainError::Parse(e.to_string()))?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        return Ok(out);
    }

    // Decimal big integer: repeated multiply-by-10 over the byte array.
    let mut out = [0u8; 32];
    for ch in s.chars() {
        let digit = ch
            .to_digit(10)
            .ok_or_else(|| ChainError::Parse(format!("non-decimal token id '{s}'")))?;
        let mut carry = digit as u32;
        for byte in out.iter_mut().rev() {
            let value = (*byte as u32) * 10 + carry;
            *byte = (value & 0xFF) as u8;
            carry = value >> 8;
        }
        if carry != 0 {
            return Err(ChainError::Parse(format!("token id overflows uint256: '{s}'")));
        }
    }
    Ok(out)
}

// =============================================================================
// Wallet account seam
// =============================================================================

/// A signing account able to submit contract calls.
///
/// The redeemer is written against this seam so tests can record calls
/// without touching a chain.
#[async_trait]
pub trait WalletAccount: Send + Sync {
    /// The account address holding the outcome tokens.
    fn address(&self) -> Address;

    /// Signs and submits a contract call, returning the transaction hash.
    async fn send_contract_call(&self, to: Address, calldata: Vec<u8>) -> Result<String, ChainError>;
}

/// [`WalletAccount`] backed by a local key and a JSON-RPC endpoint.
#[derive(Debug)]
pub struct SigningAccount {
    wallet: Wallet,
    rpc_url: String,
    http: Client,
}

impl SigningAccount {
    /// Creates a signing account for the given wallet and RPC endpoint.
    #[must_use]
    pub fn new(wallet: Wallet, rpc_url: impl Into<String>) -> Self {
        Self {
            wallet,
            rpc_url: rpc_url.into(),
            http: Client::new(),
        }
    }
}

#[async_trait]
impl WalletAccount for SigningAccount {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn send_contract_call(&self, to: Address, calldata: Vec<u8>) -> Result<String, ChainError> {
        let nonce = tx::next_nonce(&self.http, &self.rpc_url, self.wallet.address()).await?;
        let spot = tx::current_gas_price(&self.http, &self.rpc_url).await?;
        // 20% over spot
        let gas_price = spot + spot / 5;

        let call = ContractCall {
            nonce,
            gas_price,
            gas_limit: REDEEM_GAS_LIMIT,
            to,
            data: calldata,
        };
        let raw = call.sign(self.wallet.chain_id(), self.wallet.expose_private_key())?;

        let hash = tx::submit_raw(&self.http, &self.rpc_url, &raw).await?;
        info!(tx_hash = %hash, to = %to, "contract call sent");

        match tx::confirm(&self.http, &self.rpc_url, &hash, REDEEM_RECEIPT_TIMEOUT).await {
            Ok(true) => Ok(hash),
            Ok(false) => Err(ChainError::Rejected(format!("transaction {hash} reverted"))),
            Err(e) => {
                warn!(tx_hash = %hash, error = %e, "receipt wait failed");
                Err(e)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
