//! Balance-delta fill verification.
//!
//! Venue placement responses alone are not trusted: a FOK on the thin venue
//! can expire after an accepted placement. Verification cross-checks the
//! venue's own `filled_qty` (when present) against pre/post wallet balance
//! deltas read on-chain. The 50% threshold is deliberately loose so partial
//! fills still register as fills and get hedged or unwound rather than
//! ignored.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;

use cross_arb_chain::{Address, ChainReader};

/// Fraction of the expected spend a balance delta must exceed to count as a
/// fill. Loose on purpose; do not tighten without product sign-off.
pub const FILL_DELTA_DIVISOR: u128 = 2;

/// Pre- or post-trade wallet balances in wei. `None` marks an unreadable
/// balance (the verification blind spot).
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceSnapshot {
    /// EOA wallet USDT balance.
    pub eoa: Option<u128>,

    /// Smart-account USDT balance, when one is configured.
    pub smart: Option<u128>,
}

/// Reads both wallet balances, tolerating per-read failures.
pub async fn snapshot_balances(
    reader: &Arc<dyn ChainReader>,
    usdt: Address,
    eoa: Address,
    smart: Option<Address>,
) -> BalanceSnapshot {
    let eoa_balance = match reader.erc20_balance(usdt, eoa).await {
        Ok(wei) => Some(wei),
        Err(e) => {
            warn!(owner = %eoa, error = %e, "EOA balance read failed");
            None
        }
    };
    let smart_balance = match smart {
        Some(owner) => match reader.erc20_balance(usdt, owner).await {
            Ok(wei) => Some(wei),
            Err(e) => {
                warn!(owner = %owner, error = %e, "smart-account balance read failed");
                None
            }
        },
        None => None,
    };
    BalanceSnapshot {
        eoa: eoa_balance,
        smart: smart_balance,
    }
}

/// Verdict of a fill check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillVerdict {
    /// Evidence of a fill.
    Filled,
    /// Evidence of no fill.
    Unfilled,
    /// No evaluable signal (pre-balance unknown).
    Unknown,
}

impl FillVerdict {
    /// Resolves the blind spot conservatively: unknown reads as unfilled.
    /// Used for the unreliable venue, where a phantom fill would place an
    /// unhedged second leg.
    #[must_use]
    pub fn unfilled_when_unknown(self) -> bool {
        matches!(self, FillVerdict::Filled)
    }

    /// Resolves the blind spot optimistically: unknown reads as filled.
    /// Used for the reliable venue, where a missed fill would abandon a
    /// hedged position as PARTIAL.
    #[must_use]
    pub fn filled_when_unknown(self) -> bool {
        !matches!(self, FillVerdict::Unfilled)
    }
}

/// Classifies a fill from the first available signal: the venue's reported
/// `filled_qty`, else the wallet balance delta against half the expected
/// spend.
///
/// An explicit `filled_qty` of zero is a venue statement of no fill, not an
/// absent signal.
#[must_use]
pub fn classify_fill(
    api_filled_qty: Option<Decimal>,
    pre_wei: Option<u128>,
    post_wei: Option<u128>,
    expected_spend_wei: u128,
) -> FillVerdict {
    if let Some(qty) = api_filled_qty {
        return if qty > Decimal::ZERO {
            FillVerdict::Filled
        } else {
            FillVerdict::Unfilled
        };
    }

    match (pre_wei, post_wei) {
        (Some(pre), Some(post)) => {
            let spent = pre.saturating_sub(post);
            if spent > expected_spend_wei / FILL_DELTA_DIVISOR {
                FillVerdict::Filled
            } else {
                FillVerdict::Unfilled
            }
        }
        _ => FillVerdict::Unknown,
    }
}
