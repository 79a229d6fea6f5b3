//! Executor configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Configuration for the arbitrage executor.
///
/// Controls sizing floors, verification timing, unwind behavior, and the
/// pause/cooldown policy. Values arrive fully constructed from the caller;
/// file loading is the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Place orders but skip balance verification; positions report FILLED.
    pub dry_run: bool,

    /// Interval between order-status polls in `poll_for_fills`.
    pub fill_poll_interval: Duration,

    /// Give-up deadline for `poll_for_fills`.
    pub fill_poll_timeout: Duration,

    /// Wait after placement before reading balances for fill verification.
    pub settle_wait: Duration,

    /// Smallest per-leg trade worth placing (USDT).
    pub min_trade_size: Decimal,

    /// Balance headroom multiplier covering worst-case venue fees plus
    /// rounding (1.02 covers a 1.75% fee).
    pub fee_buffer: Decimal,

    /// Oldest quote age still considered executable.
    pub max_quote_age: Duration,

    /// Cooldown after a placement rejection on a market.
    pub market_cooldown: Duration,

    /// Shorter cooldown after a first-leg FOK expiry.
    pub short_cooldown: Duration,

    /// Interval between status polls while an unwind SELL works the book.
    pub unwind_poll_interval: Duration,

    /// How long one unwind SELL may work the book before the next discount.
    pub unwind_poll_timeout: Duration,

    /// Progressive discounts applied to unwind SELL prices.
    pub discount_ladder: Vec<Decimal>,

    /// Venues classified as deep-liquidity / FOK-reliable. The leg on a venue
    /// outside this set is placed first.
    pub reliable_venues: HashSet<String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            fill_poll_interval: Duration::from_secs(2),
            fill_poll_timeout: Duration::from_secs(30),
            settle_wait: Duration::from_secs(3),
            min_trade_size: Decimal::TWO,
            fee_buffer: Decimal::new(102, 2), // 1.02
            max_quote_age: Duration::from_secs(15),
            market_cooldown: Duration::from_secs(30 * 60),
            short_cooldown: Duration::from_secs(5 * 60),
            unwind_poll_interval: Duration::from_secs(10),
            unwind_poll_timeout: Duration::from_secs(5 * 60),
            discount_ladder: vec![
                Decimal::new(5, 2),  // 0.05
                Decimal::new(10, 2), // 0.10
                Decimal::new(20, 2), // 0.20
            ],
            reliable_venues: HashSet::from(["predict".to_string()]),
        }
    }
}

impl ExecutionConfig {
    /// Enables or disables dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the fill-poll interval and timeout.
    #[must_use]
    pub fn with_fill_poll(mut self, interval: Duration, timeout: Duration) -> Self {
        self.fill_poll_interval = interval;
        self.fill_poll_timeout = timeout;
        self
    }

    /// Sets the post-placement settle wait.
    #[must_use]
    pub fn with_settle_wait(mut self, wait: Duration) -> Self {
        self.settle_wait = wait;
        self
    }

    /// Sets the minimum per-leg trade size.
    #[must_use]
    pub fn with_min_trade_size(mut self, min: Decimal) -> Self {
        self.min_trade_size = min;
        self
    }

    /// Sets the fee-buffer multiplier.
    #[must_use]
    pub fn with_fee_buffer(mut self, buffer: Decimal) -> Self {
        self.fee_buffer = buffer;
        self
    }

    /// Sets the maximum accepted quote age.
    #[must_use]
    pub fn with_max_quote_age(mut self, age: Duration) -> Self {
        self.max_quote_age = age;
        self
    }

    /// Sets the long (rejection) and short (non-fill) market cooldowns.
    #[must_use]
    pub fn with_cooldowns(mut self, market: Duration, short: Duration) -> Self {
        self.market_cooldown = market;
        self.short_cooldown = short;
        self
    }

    /// Sets the unwind poll interval and per-attempt timeout.
    #[must_use]
    pub fn with_unwind_poll(mut self, interval: Duration, timeout: Duration) -> Self {
        self.unwind_poll_interval = interval;
        self.unwind_poll_timeout = timeout;
        self
    }

    /// Replaces the unwind discount ladder.
    #[must_use]
    pub fn with_discount_ladder(mut self, ladder: Vec<Decimal>) -> Self {
        self.discount_ladder = ladder;
        self
    }

    /// Replaces the reliable-venue set.
    #[must_use]
    pub fn with_reliable_venues<I, S>(mut self, venues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reliable_venues = venues.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the named venue is classified reliable.
    #[must_use]
    pub fn is_reliable(&self, venue: &str) -> bool {
        self.reliable_venues.contains(venue)
    }
}
