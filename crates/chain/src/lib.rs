//! On-chain access for the cross-venue arbitrage executor.
//!
//! The executor verifies fills by reading wallet balance deltas and redeems
//! resolved positions through the conditional-token framework (CTF) contract
//! on each venue's settlement chain. This crate supplies that plumbing:
//!
//! - [`reader`]: a [`ChainReader`] trait with a JSON-RPC `eth_call`
//!   implementation for ERC-20 / ERC-1155 / CTF reads, plus an in-memory
//!   double for tests.
//! - [`wallet`]: secure private-key handling and address derivation.
//! - [`tx`]: minimal legacy-transaction construction and broadcasting.
//! - [`ctf`]: calldata builders for the CTF contract and the
//!   [`WalletAccount`] redemption path.

pub mod address;
pub mod ctf;
pub mod reader;
pub mod tx;
pub mod wallet;

pub use address::{Address, AddressParseError};
pub use ctf::{token_id_to_u256, SigningAccount, WalletAccount};
pub use reader::{ChainError, ChainReader, RpcChainReader, StaticChainReader};
pub use tx::ContractCall;
pub use wallet::{Wallet, WalletConfig, WalletError};
