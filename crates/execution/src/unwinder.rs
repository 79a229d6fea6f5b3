//! Partial-fill unwinding.
//!
//! A filled single leg is a naked directional bet. The unwinder sells it
//! back with a progressive-discount ladder of resting GTC limit orders,
//! polling each attempt before discounting further. What it observes decides
//! whether the executor may resume trading: an order seen live on the book
//! means the failure was liquidity or timing (transient); orders that never
//! reach the book point at a wallet, approval, or code problem (systematic)
//! and keep the executor paused for manual intervention.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use cross_arb_core::rounding::{floor_usdt, grid_price};
use cross_arb_core::types::ClobLeg;
use cross_arb_core::ExecutionConfig;

use crate::shutdown::ShutdownSignal;
use crate::venue::{OrderRequest, OrderState, VenueClient};

/// Outcome of an unwind attempt over the full discount ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwindOutcome {
    /// A SELL filled; exposure is closed.
    Recovered,

    /// No SELL filled but at least one rested on the book. Safe to resume.
    Transient,

    /// No SELL was ever seen live. Manual intervention required.
    Systematic,

    /// The venue reported zero unlocked shares; nothing to sell.
    NothingToSell,
}

impl UnwindOutcome {
    /// Whether the executor may clear its pause after this outcome.
    #[must_use]
    pub fn clears_pause(&self) -> bool {
        matches!(self, UnwindOutcome::Recovered | UnwindOutcome::Transient)
    }
}

/// Sells a naked leg back through the discount ladder.
///
/// The initial SELL placement of each attempt always completes; only the
/// status polling honours cancellation.
pub async fn unwind_leg(
    venue: &Arc<dyn VenueClient>,
    leg: &ClobLeg,
    config: &ExecutionConfig,
    shutdown: &ShutdownSignal,
) -> UnwindOutcome {
    if leg.price <= Decimal::ZERO || leg.filled_size <= Decimal::ZERO {
        warn!(platform = %leg.platform, "unwind requested for leg without a fill");
        return UnwindOutcome::NothingToSell;
    }

    let mut shares = leg.filled_size / leg.price;

    match venue.available_balance(&leg.token_id).await {
        Ok(Some(available)) => {
            if available <= Decimal::ZERO {
                warn!(
                    platform = %leg.platform,
                    token = %leg.token_id,
                    "no unlocked shares to unwind"
                );
                return UnwindOutcome::NothingToSell;
            }
            if available < shares {
                shares = available;
            }
        }
        Ok(None) => {}
        Err(e) => {
            warn!(platform = %leg.platform, error = %e, "available-balance query failed");
        }
    }

    let mut reached_book = false;

    for (attempt, discount) in config.discount_ladder.iter().enumerate() {
        let sell_price = grid_price(leg.price * (Decimal::ONE - discount));
        // Size derives from price so that size / price equals the held
        // share count exactly; flooring keeps it under the holding.
        let sell_size = floor_usdt(shares * sell_price);

        info!(
            platform = %leg.platform,
            token = %leg.token_id,
            attempt = attempt + 1,
            %discount,
            %sell_price,
            %sell_size,
            %shares,
            "placing unwind SELL"
        );

        let response = match venue
            .place_order(OrderRequest::sell_gtc(&leg.token_id, sell_price, sell_size))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(platform = %leg.platform, error = %e, "unwind SELL transport failure");
                continue;
            }
        };

        let Some(order_id) = response.order_id.filter(|_| response.success) else {
            warn!(
                platform = %leg.platform,
                error = response.error.as_deref().unwrap_or("no order id"),
                "unwind SELL rejected at submission"
            );
            continue;
        };

        match poll_unwind_order(venue, &order_id, &leg.token_id, config, shutdown).await {
            PollResult::Filled => {
                info!(platform = %leg.platform, order_id, "unwind SELL filled");
                return UnwindOutcome::Recovered;
            }
            PollResult::SeenOnBook => reached_book = true,
            PollResult::NeverSeen => {}
        }

        if shutdown.is_cancelled() {
            break;
        }
    }

    if reached_book {
        info!(
            platform = %leg.platform,
            token = %leg.token_id,
            "unwind exhausted but orders reached the book; classifying transient"
        );
        UnwindOutcome::Transient
    } else {
        warn!(
            platform = %leg.platform,
            token = %leg.token_id,
            "no unwind order ever reached the book; classifying systematic"
        );
        UnwindOutcome::Systematic
    }
}

enum PollResult {
    Filled,
    SeenOnBook,
    NeverSeen,
}

/// Polls one resting SELL until fill, death, timeout, or cancellation.
/// Cancels the order before handing back to the ladder so successive
/// attempts never stack sell interest.
async fn poll_unwind_order(
    venue: &Arc<dyn VenueClient>,
    order_id: &str,
    token_id: &str,
    config: &ExecutionConfig,
    shutdown: &ShutdownSignal,
) -> PollResult {
    let deadline = tokio::time::Instant::now() + config.unwind_poll_timeout;
    let mut seen_on_book = false;

    loop {
        match venue.order_status(order_id).await {
            Ok(report) if report.state == OrderState::Filled => {
                return PollResult::Filled;
            }
            Ok(report) if report.state.is_on_book() => {
                seen_on_book = true;
            }
            Ok(report) if report.state.is_dead() => {
                return if seen_on_book {
                    PollResult::SeenOnBook
                } else {
                    PollResult::NeverSeen
                };
            }
            Ok(_) => {} // Unknown; keep polling
            Err(e) => {
                warn!(order_id, error = %e, "unwind status poll failed");
            }
        }

        if tokio::time::Instant::now() >= deadline || shutdown.is_cancelled() {
            break;
        }
        let interval = config
            .unwind_poll_interval
            .min(deadline - tokio::time::Instant::now());
        if interval == Duration::ZERO {
            break;
        }
        shutdown.sleep(interval).await;
    }

    if let Err(e) = venue.cancel_order(order_id, token_id).await {
        warn!(order_id, error = %e, "failed to cancel resting unwind SELL");
    }

    if seen_on_book {
        PollResult::SeenOnBook
    } else {
        PollResult::NeverSeen
    }
}
