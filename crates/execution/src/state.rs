//! Pause flag and per-market cooldowns.
//!
//! The only mutable state the executor owns. A single scan loop drives the
//! executor, so plain mutexes are sufficient; writes always happen after
//! concurrent venue calls join.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use cross_arb_core::types::MarketId;

/// Shared pause gate and cooldown map.
#[derive(Debug, Default)]
pub struct ExecutorState {
    paused: Mutex<bool>,
    cooldowns: Mutex<HashMap<MarketId, DateTime<Utc>>>,
}

impl ExecutorState {
    /// Creates unpaused state with the given restored cooldown map.
    #[must_use]
    pub fn with_cooldowns(cooldowns: HashMap<MarketId, DateTime<Utc>>) -> Self {
        Self {
            paused: Mutex::new(false),
            cooldowns: Mutex::new(cooldowns),
        }
    }

    /// Whether the executor is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    /// Sets the pause flag.
    pub fn set_paused(&self, paused: bool) {
        *self.paused.lock() = paused;
    }

    /// Remaining cooldown for a market at `now`, purging the entry when it
    /// has expired.
    #[must_use]
    pub fn cooldown_remaining(&self, market_id: &MarketId, now: DateTime<Utc>) -> Option<Duration> {
        let mut cooldowns = self.cooldowns.lock();
        match cooldowns.get(market_id) {
            Some(until) if *until > now => {
                let remaining = (*until - now).to_std().unwrap_or(Duration::ZERO);
                Some(remaining)
            }
            Some(_) => {
                cooldowns.remove(market_id);
                None
            }
            None => None,
        }
    }

    /// Starts (or extends) a cooldown for a market.
    pub fn set_cooldown(&self, market_id: MarketId, now: DateTime<Utc>, duration: Duration) {
        let until = now + chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
        self.cooldowns.lock().insert(market_id, until);
    }

    /// Copy of the live cooldown map, for the caller's persistence snapshots.
    #[must_use]
    pub fn cooldowns_snapshot(&self) -> HashMap<MarketId, DateTime<Utc>> {
        self.cooldowns.lock().clone()
    }
}
