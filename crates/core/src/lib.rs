//! Core types for the cross-venue prediction-market arbitrage executor.
//!
//! This crate defines the data model shared between the execution engine and
//! its collaborators: the arbitrage opportunity handed in by the scan loop,
//! venue-resolved market metadata, the position record returned from every
//! execution attempt, and the executor's configuration surface.
//!
//! Amount conventions:
//!
//! - Prices are venue-native fractions in `(0, 1)` on a 3-decimal grid.
//! - Order sizes and liquidity figures are USDT amounts (`rust_decimal`).
//! - On-chain balances travel as `u128` wei (18 decimals) and are converted
//!   to `Decimal` exactly once at the read boundary ([`rounding::wei_to_usdt`]).

pub mod config;
pub mod rounding;
pub mod types;

pub use config::ExecutionConfig;
pub use types::{
    ArbOpportunity, ClobLeg, ClobPosition, ConditionId, MarketId, MarketMeta, OpportunityError,
    PositionStatus, Side,
};
