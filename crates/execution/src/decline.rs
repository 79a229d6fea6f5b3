//! Typed pre-flight decline reasons.

use rust_decimal::Decimal;
use std::time::Duration;

use cross_arb_core::types::ClobPosition;

/// Why `execute_best` declined without side effects requiring unwind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclineReason {
    /// The executor is paused after an unresolved partial fill.
    Paused,

    /// The market is under cooldown.
    CooldownActive {
        /// Time until the cooldown expires.
        remaining: Duration,
    },

    /// The opportunity's quotes are older than the configured limit.
    StaleQuote {
        /// Quote age in milliseconds.
        age_ms: i64,
    },

    /// No client registered for a required protocol.
    UnknownVenue {
        /// The unregistered protocol name.
        venue: String,
    },

    /// A venue could not resolve metadata for the market.
    MissingMarketMeta {
        /// The venue lacking metadata.
        venue: String,
    },

    /// The clamped size fell below the minimum trade size.
    BelowMinSize {
        /// The clamped per-leg size.
        size: Decimal,
        /// The configured floor.
        min: Decimal,
    },

    /// The unreliable venue rejected the first leg outright.
    UnreliableRejected {
        /// The rejecting venue.
        venue: String,
        /// Venue-reported reason.
        reason: String,
    },
}

impl std::fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeclineReason::Paused => write!(f, "executor paused"),
            DeclineReason::CooldownActive { remaining } => {
                write!(f, "market cooldown active: {}s remaining", remaining.as_secs())
            }
            DeclineReason::StaleQuote { age_ms } => {
                write!(f, "quote stale: {age_ms}ms old")
            }
            DeclineReason::UnknownVenue { venue } => {
                write!(f, "no client registered for venue '{venue}'")
            }
            DeclineReason::MissingMarketMeta { venue } => {
                write!(f, "no market metadata on venue '{venue}'")
            }
            DeclineReason::BelowMinSize { size, min } => {
                write!(f, "sized {size} below minimum {min}")
            }
            DeclineReason::UnreliableRejected { venue, reason } => {
                write!(f, "venue '{venue}' rejected first leg: {reason}")
            }
        }
    }
}

/// Outcome of one `execute_best` invocation.
#[derive(Debug, Clone)]
pub enum ExecuteOutcome {
    /// No trade attempted or the first leg was rejected; no exposure.
    Declined(DeclineReason),

    /// A position record describing what happened on the books.
    Position(ClobPosition),
}

impl ExecuteOutcome {
    /// Whether the invocation declined.
    #[must_use]
    pub fn is_declined(&self) -> bool {
        matches!(self, ExecuteOutcome::Declined(_))
    }

    /// The position, when one was produced.
    #[must_use]
    pub fn position(&self) -> Option<&ClobPosition> {
        match self {
            ExecuteOutcome::Position(pos) => Some(pos),
            ExecuteOutcome::Declined(_) => None,
        }
    }

    /// The decline reason, when declined.
    #[must_use]
    pub fn decline_reason(&self) -> Option<&DeclineReason> {
        match self {
            ExecuteOutcome::Declined(reason) => Some(reason),
            ExecuteOutcome::Position(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn display_names_the_condition() {
        let cooldown = DeclineReason::CooldownActive {
            remaining: Duration::from_secs(90),
        };
        assert!(cooldown.to_string().contains("90s"));

        let size = DeclineReason::BelowMinSize {
            size: dec!(1.5),
            min: dec!(2),
        };
        assert!(size.to_string().contains("1.5"));

        let rejected = DeclineReason::UnreliableRejected {
            venue: "opinion".to_string(),
            reason: "crash".to_string(),
        };
        assert!(rejected.to_string().contains("opinion"));
        assert!(rejected.to_string().contains("crash"));
    }

    #[test]
    fn outcome_accessors() {
        let declined = ExecuteOutcome::Declined(DeclineReason::Paused);
        assert!(declined.is_declined());
        assert!(declined.position().is_none());
        assert_eq!(declined.decline_reason(), Some(&DeclineReason::Paused));
    }
}
