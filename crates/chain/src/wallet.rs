//! Secure wallet for on-chain redemption signing.
//!
//! Private keys are held in [`SecretString`], never appear in Debug output,
//! and are zeroized when the wallet drops. Keys load from an environment
//! variable chosen by [`WalletConfig`], never from code.

use k256::ecdsa::SigningKey;
use secrecy::{ExposeSecret, SecretString};
use sha3::{Digest, Keccak256};
use std::env;
use thiserror::Error;

use crate::address::Address;

/// Default environment variable holding the private key.
pub const DEFAULT_PRIVATE_KEY_ENV: &str = "ARB_WALLET_PRIVATE_KEY";

/// Expected length of a hex private key without the 0x prefix.
const PRIVATE_KEY_HEX_LEN: usize = 64;

/// Errors from wallet construction.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Environment variable not set or empty.
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    /// Private key has invalid format.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
}

/// Configuration for wallet initialization.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    private_key_env: String,
    chain_id: u64,
}

impl WalletConfig {
    /// Creates a wallet configuration for the given env var and chain.
    #[must_use]
    pub fn new(private_key_env: impl Into<String>, chain_id: u64) -> Self {
        Self {
            private_key_env: private_key_env.into(),
            chain_id,
        }
    }

    /// Polygon mainnet with the default key variable.
    #[must_use]
    pub fn polygon() -> Self {
        Self::new(DEFAULT_PRIVATE_KEY_ENV, 137)
    }
}

/// A signing wallet bound to one chain.
pub struct Wallet {
    private_key: SecretString,
    address: Address,
    chain_id: u64,
}

impl Wallet {
    /// Loads the wallet from the configured environment variable.
    ///
    /// # Errors
    /// [`WalletError`] when the variable is missing or the key malformed.
    pub fn from_env(config: WalletConfig) -> Result<Self, WalletError> {
        let raw = env::var(&config.private_key_env)
            .map_err(|_| WalletError::MissingEnvVar(config.private_key_env.clone()))?;
        if raw.trim().is_empty() {
            return Err(WalletError::MissingEnvVar(config.private_key_env));
        }
        Self::from_key(raw.trim(), config.chain_id)
    }

    /// Builds the wallet from hex key material.
    ///
    /// # Errors
    /// [`WalletError::InvalidPrivateKey`] on malformed keys.
    pub fn from_key(private_key_hex: &str, chain_id: u64) -> Result<Self, WalletError> {
        let stripped = private_key_hex
            .strip_prefix("0x")
            .unwrap_or(private_key_hex);
        if stripped.len() != PRIVATE_KEY_HEX_LEN {
            return Err(WalletError::InvalidPrivateKey(format!(
                "expected {} hex chars, got {}",
                PRIVATE_KEY_HEX_LEN,
                stripped.len()
            )));
        }
        let key_bytes =
            hex::decode(stripped).map_err(|e| WalletError::InvalidPrivateKey(e.to_string()))?;
        let signing_key = SigningKey::from_bytes(key_bytes.as_slice().into())
            .map_err(|e| WalletError::InvalidPrivateKey(e.to_string()))?;

        let address = derive_address(&signing_key);
        Ok(Self {
            private_key: SecretString::from(stripped.to_string()),
            address,
            chain_id,
        })
    }

    /// The wallet's public address.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// The chain this wallet signs for.
    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Exposes the raw private key for signing. Never log the result.
    #[must_use]
    pub fn expose_private_key(&self) -> &str {
        self.private_key.expose_secret()
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

/// Derives the EVM address from a secp256k1 key: last 20 bytes of
/// keccak256 of the uncompressed public key without its 0x04 tag.
fn derive_address(key: &SigningKey) -> Address {
    let public = key.verifying_key().to_encoded_point(false);
    let hash = Keccak256::digest(&public.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    Address(out)
}
