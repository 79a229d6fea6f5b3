//! Pre-flight trade sizing.
//!
//! Each venue receives an equal USDT amount. The initial size depends on
//! whether the two legs draw from one wallet or two, then gets clamped by
//! advertised liquidity and on-chain wallet balances. Balance caps floor to
//! 8 decimals so downstream rounding can never exceed the real balance.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use cross_arb_core::rounding::{floor_usdt, wei_to_usdt};

/// Fraction of advertised liquidity a leg may consume.
const LIQUIDITY_FRACTION: Decimal = dec!(0.90);

/// Inputs to the sizing pass.
#[derive(Debug, Clone)]
pub struct SizingInputs {
    /// Caller-supplied position cap in USDT.
    pub max_position_size: Decimal,

    /// Advertised liquidity behind the venue A ask (USDT).
    pub liquidity_a: Decimal,

    /// Advertised liquidity behind the venue B ask (USDT).
    pub liquidity_b: Decimal,

    /// EOA wallet USDT balance in wei, when readable.
    pub eoa_balance_wei: Option<u128>,

    /// Smart-account USDT balance in wei, when one funds the unreliable leg.
    pub smart_balance_wei: Option<u128>,

    /// Whether each wallet funds exactly one leg (EOA reliable,
    /// smart-account unreliable).
    pub separate_wallets: bool,

    /// Balance headroom multiplier (venue fees plus rounding).
    pub fee_buffer: Decimal,

    /// Minimum per-leg trade size.
    pub min_trade_size: Decimal,
}

/// Result of the sizing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sizing {
    /// Per-leg USDT amount to place on each venue.
    Sized(Decimal),

    /// The clamped size fell under the configured floor.
    BelowMin {
        /// Clamped size.
        size: Decimal,
        /// Configured floor.
        min: Decimal,
    },
}

/// Clamps the per-leg trade size by wallet funding, liquidity, and balances.
#[must_use]
pub fn size_per_leg(inputs: &SizingInputs) -> Sizing {
    // With separate wallets each wallet funds one leg; a single wallet
    // funds both.
    let mut size = if inputs.separate_wallets {
        inputs.max_position_size
    } else {
        inputs.max_position_size / dec!(2)
    };

    size = size
        .min(inputs.liquidity_a * LIQUIDITY_FRACTION)
        .min(inputs.liquidity_b * LIQUIDITY_FRACTION);

    let eoa_legs = if inputs.separate_wallets { dec!(1) } else { dec!(2) };
    if let Some(wei) = inputs.eoa_balance_wei {
        let balance = wei_to_usdt(wei);
        if balance < size * eoa_legs * inputs.fee_buffer {
            let capped = floor_usdt(balance / inputs.fee_buffer) / eoa_legs;
            debug!(%balance, %size, %capped, "EOA balance caps trade size");
            size = capped;
        }
    }

    if inputs.separate_wallets {
        if let Some(wei) = inputs.smart_balance_wei {
            let balance = wei_to_usdt(wei);
            if balance < size * inputs.fee_buffer {
                let capped = floor_usdt(balance / inputs.fee_buffer);
                debug!(%balance, %size, %capped, "smart-account balance caps trade size");
                size = capped;
            }
        }
    }

    if size < inputs.min_trade_size {
        Sizing::BelowMin {
            size,
            min: inputs.min_trade_size,
        }
    } else {
        Sizing::Sized(size)
    }
}
