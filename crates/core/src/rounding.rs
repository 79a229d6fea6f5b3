//! Amount conversions and grid rounding.
//!
//! Venue prices live on a 3-decimal grid; USDT sizes are tracked to 8
//! decimals so that chained size arithmetic can never overshoot an on-chain
//! balance. Chain balances are 18-decimal wei and cross into `Decimal`
//! exactly once, here.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimals of the tightest venue price grid.
pub const PRICE_DECIMALS: u32 = 3;

/// Decimals carried for USDT size arithmetic.
pub const USDT_DECIMALS: u32 = 8;

const WEI_PER_USDT: u128 = 1_000_000_000_000_000_000;
const WEI_PER_USDT_8DP: u128 = 10_000_000_000;

/// Rounds a price onto the 3-decimal venue grid (nearest, half away from zero).
#[must_use]
pub fn grid_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Truncates a USDT amount to 8 decimals, never rounding up.
#[must_use]
pub fn floor_usdt(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(USDT_DECIMALS, RoundingStrategy::ToZero)
}

/// Converts an 18-decimal wei balance into a USDT `Decimal`, exact to 8 dp.
#[must_use]
pub fn wei_to_usdt(wei: u128) -> Decimal {
    let whole = wei / WEI_PER_USDT;
    let frac_8dp = (wei % WEI_PER_USDT) / WEI_PER_USDT_8DP;
    let whole = Decimal::from_u128(whole).unwrap_or(Decimal::MAX);
    whole + Decimal::new(frac_8dp as i64, USDT_DECIMALS)
}

/// Converts a USDT amount to 18-decimal wei, truncating beyond 8 dp.
#[must_use]
pub fn usdt_to_wei(amount: Decimal) -> u128 {
    if amount <= Decimal::ZERO {
        return 0;
    }
    let units_8dp = (amount * Decimal::from(WEI_PER_USDT_8DP as u64)).trunc();
    units_8dp.to_u128().unwrap_or(0) * WEI_PER_USDT_8DP
}
