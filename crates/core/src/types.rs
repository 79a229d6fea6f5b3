//! Data model for cross-venue arbitrage execution.
//!
//! The types here mirror the hand-off boundary between the scan loop and the
//! executor: an [`ArbOpportunity`] comes in, a [`ClobPosition`] comes out.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// Identifiers
// =============================================================================

/// Error parsing a 32-byte hex identifier.
#[derive(Debug, Clone, Error)]
#[error("invalid 32-byte hex id '{input}': {reason}")]
pub struct IdParseError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: String,
}

fn parse_hex32(s: &str) -> Result<[u8; 32], IdParseError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped).map_err(|e| IdParseError {
        input: s.to_string(),
        reason: e.to_string(),
    })?;
    if bytes.len() != 32 {
        return Err(IdParseError {
            input: s.to_string(),
            reason: format!("expected 32 bytes, got {}", bytes.len()),
        });
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

macro_rules! hex32_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Raw 32-byte value.
            #[must_use]
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_hex32(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name), hex::encode(self.0))
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex32_id! {
    /// 32-byte market identifier shared by both venues for a matched market.
    MarketId
}

hex32_id! {
    /// 32-byte CTF condition identifier, native to one venue's chain contracts.
    ConditionId
}

// =============================================================================
// Order Side
// =============================================================================

/// Side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy outcome shares.
    Buy,
    /// Sell outcome shares (unwind path).
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

// =============================================================================
// Opportunity
// =============================================================================

/// Errors raised for malformed opportunities.
///
/// These are programmer errors from the detection layer; operational failures
/// never take this form.
#[derive(Debug, Clone, Error)]
pub enum OpportunityError {
    /// A leg price is zero or negative.
    #[error("non-positive leg price: venue A {price_a}, venue B {price_b}")]
    NonPositivePrice {
        /// Venue A leg price.
        price_a: Decimal,
        /// Venue B leg price.
        price_b: Decimal,
    },

    /// The summed ask prices leave no spread.
    #[error("no spread: {price_a} + {price_b} >= 1")]
    NoSpread {
        /// Venue A leg price.
        price_a: Decimal,
        /// Venue B leg price.
        price_b: Decimal,
    },
}

/// A detected cross-venue arbitrage opportunity.
///
/// Produced by the detection layer when complementary YES/NO asks on two
/// venues sum below one unit of payout. Prices arrive normalized to
/// fractions; the 18-decimal wire representation is the detector's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbOpportunity {
    /// Market identifier shared by both venues.
    pub market_id: MarketId,

    /// Venue name for leg A.
    pub protocol_a: String,

    /// Venue name for leg B.
    pub protocol_b: String,

    /// True when venue A buys YES and venue B buys NO; false for the flipped
    /// orientation.
    pub buy_yes_on_a: bool,

    /// Ask price for the venue A leg.
    pub yes_price_a: Decimal,

    /// Ask price for the venue B leg.
    pub no_price_b: Decimal,

    /// Summed cost of both legs per share pair.
    pub total_cost: Decimal,

    /// Spread in basis points.
    pub spread_bps: Decimal,

    /// Estimated profit at the quoted sizes.
    pub est_profit: Decimal,

    /// Advertised liquidity behind the venue A ask (USDT).
    pub liquidity_a: Decimal,

    /// Advertised liquidity behind the venue B ask (USDT).
    pub liquidity_b: Decimal,

    /// When the quotes backing this opportunity were taken.
    pub quoted_at: DateTime<Utc>,
}

impl ArbOpportunity {
    /// Validates the structural invariants of the opportunity.
    ///
    /// # Errors
    /// [`OpportunityError`] on zero/negative prices or a missing spread.
    pub fn validate(&self) -> Result<(), OpportunityError> {
        if self.yes_price_a <= Decimal::ZERO || self.no_price_b <= Decimal::ZERO {
            return Err(OpportunityError::NonPositivePrice {
                price_a: self.yes_price_a,
                price_b: self.no_price_b,
            });
        }
        if self.yes_price_a + self.no_price_b >= Decimal::ONE {
            return Err(OpportunityError::NoSpread {
                price_a: self.yes_price_a,
                price_b: self.no_price_b,
            });
        }
        Ok(())
    }

    /// Age of the backing quotes at `now`.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.quoted_at
    }
}

// =============================================================================
// Market Metadata
// =============================================================================

/// Venue-resolved metadata for a market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketMeta {
    /// CTF condition id on the venue's settlement chain.
    pub condition_id: ConditionId,

    /// Venue-native YES outcome token id.
    pub yes_token_id: String,

    /// Venue-native NO outcome token id.
    pub no_token_id: String,

    /// Optional venue-specific market identifier (slug, ticker).
    pub venue_market_id: Option<String>,
}

impl MarketMeta {
    /// Token id for the requested outcome.
    #[must_use]
    pub fn token_for(&self, yes: bool) -> &str {
        if yes {
            &self.yes_token_id
        } else {
            &self.no_token_id
        }
    }
}

// =============================================================================
// Position
// =============================================================================

/// Lifecycle status of an executed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    /// Orders placed, fills not yet confirmed.
    Open,
    /// Both legs filled; the position is hedged.
    Filled,
    /// Exactly one leg filled; a naked directional bet.
    Partial,
    /// No leg filled; no exposure.
    Expired,
    /// Redeemed after market resolution.
    Closed,
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionStatus::Open => write!(f, "OPEN"),
            PositionStatus::Filled => write!(f, "FILLED"),
            PositionStatus::Partial => write!(f, "PARTIAL"),
            PositionStatus::Expired => write!(f, "EXPIRED"),
            PositionStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

/// One of the two orders constituting a hedged position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClobLeg {
    /// Venue this leg was placed on.
    pub platform: String,

    /// Venue order id; empty when placement never occurred.
    pub order_id: String,

    /// Outcome token bought or sold.
    pub token_id: String,

    /// Order side.
    pub side: Side,

    /// Limit price as a fraction in `[0, 1]`.
    pub price: Decimal,

    /// Order size in USDT.
    pub size: Decimal,

    /// Whether the leg is confirmed filled.
    pub filled: bool,

    /// Filled amount in USDT.
    pub filled_size: Decimal,
}

impl ClobLeg {
    /// Creates a leg that has not been placed yet.
    #[must_use]
    pub fn unplaced(
        platform: impl Into<String>,
        token_id: impl Into<String>,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> Self {
        Self {
            platform: platform.into(),
            order_id: String::new(),
            token_id: token_id.into(),
            side,
            price,
            size,
            filled: false,
            filled_size: Decimal::ZERO,
        }
    }

    /// Marks the leg placed under the given order id.
    pub fn mark_placed(&mut self, order_id: impl Into<String>) {
        self.order_id = order_id.into();
    }

    /// Marks the leg filled for the given USDT amount.
    pub fn mark_filled(&mut self, filled_size: Decimal) {
        self.filled = true;
        self.filled_size = filled_size;
    }

    /// Number of outcome shares this leg holds when filled.
    #[must_use]
    pub fn shares(&self) -> Decimal {
        if self.price > Decimal::ZERO {
            self.filled_size / self.price
        } else {
            Decimal::ZERO
        }
    }
}

/// Outcome record of one execution attempt, handed back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClobPosition {
    /// Locally unique identifier.
    pub id: String,

    /// Market the position was opened in.
    pub market_id: MarketId,

    /// Current lifecycle status.
    pub status: PositionStatus,

    /// Venue A leg.
    pub leg_a: ClobLeg,

    /// Venue B leg.
    pub leg_b: ClobLeg,

    /// Combined USDT committed across both legs.
    pub total_cost: Decimal,

    /// Payout at resolution when both legs fill (shares of the thinner leg).
    pub expected_payout: Decimal,

    /// Spread captured, in basis points.
    pub spread_bps: Decimal,

    /// When execution started.
    pub opened_at: DateTime<Utc>,

    /// When the position was redeemed, if it has been.
    pub closed_at: Option<DateTime<Utc>>,
}

impl ClobPosition {
    /// Creates a position record from its two legs.
    #[must_use]
    pub fn new(
        market_id: MarketId,
        status: PositionStatus,
        leg_a: ClobLeg,
        leg_b: ClobLeg,
        spread_bps: Decimal,
    ) -> Self {
        let total_cost = leg_a.size + leg_b.size;
        let expected_payout = match (leg_a.price > Decimal::ZERO, leg_b.price > Decimal::ZERO) {
            (true, true) => (leg_a.size / leg_a.price).min(leg_b.size / leg_b.price),
            _ => Decimal::ZERO,
        };
        Self {
            id: Uuid::new_v4().to_string(),
            market_id,
            status,
            leg_a,
            leg_b,
            total_cost,
            expected_payout,
            spread_bps,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    /// The filled leg of a PARTIAL position, if exactly one leg filled.
    #[must_use]
    pub fn naked_leg(&self) -> Option<&ClobLeg> {
        match (self.leg_a.filled, self.leg_b.filled) {
            (true, false) => Some(&self.leg_a),
            (false, true) => Some(&self.leg_b),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn opportunity() -> ArbOpportunity {
        ArbOpportunity {
            market_id: MarketId([0x11; 32]),
            protocol_a: "predict".to_string(),
            protocol_b: "opinion".to_string(),
            buy_yes_on_a: true,
            yes_price_a: dec!(0.45),
            no_price_b: dec!(0.50),
            total_cost: dec!(0.95),
            spread_bps: dec!(500),
            est_profit: dec!(0.05),
            liquidity_a: dec!(1000),
            liquidity_b: dec!(400),
            quoted_at: Utc::now(),
        }
    }

    // ==================== Identifier Tests ====================

    #[test]
    fn market_id_round_trips_through_hex() {
        let id = MarketId([0xAB; 32]);
        let text = id.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 66);
        assert_eq!(text.parse::<MarketId>().unwrap(), id);
    }

    #[test]
    fn market_id_parses_without_prefix() {
        let hex = "ab".repeat(32);
        let id: MarketId = hex.parse().unwrap();
        assert_eq!(id, MarketId([0xAB; 32]));
    }

    #[test]
    fn market_id_rejects_wrong_length() {
        assert!("0x1234".parse::<MarketId>().is_err());
        assert!("zz".repeat(32).parse::<MarketId>().is_err());
    }

    #[test]
    fn market_id_serde_round_trip() {
        let id = MarketId([0x07; 32]);
        let json = serde_json::to_string(&id).unwrap();
        let back: MarketId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    // ==================== Opportunity Tests ====================

    #[test]
    fn valid_opportunity_passes() {
        assert!(opportunity().validate().is_ok());
    }

    #[test]
    fn zero_price_rejected() {
        let mut opp = opportunity();
        opp.yes_price_a = Decimal::ZERO;
        assert!(matches!(
            opp.validate(),
            Err(OpportunityError::NonPositivePrice { .. })
        ));
    }

    #[test]
    fn missing_spread_rejected() {
        let mut opp = opportunity();
        opp.yes_price_a = dec!(0.55);
        opp.no_price_b = dec!(0.45);
        assert!(matches!(opp.validate(), Err(OpportunityError::NoSpread { .. })));
    }

    #[test]
    fn opportunity_age() {
        let mut opp = opportunity();
        let now = Utc::now();
        opp.quoted_at = now - chrono::Duration::seconds(12);
        assert_eq!(opp.age(now).num_seconds(), 12);
    }

    // ==================== Leg Tests ====================

    #[test]
    fn leg_shares_from_fill() {
        let mut leg = ClobLeg::unplaced("opinion", "tok", Side::Buy, dec!(0.32), dec!(4));
        leg.mark_placed("ord-1");
        leg.mark_filled(dec!(4));
        assert_eq!(leg.shares(), dec!(12.5));
    }

    #[test]
    fn unplaced_leg_has_empty_order_id() {
        let leg = ClobLeg::unplaced("predict", "tok", Side::Buy, dec!(0.5), dec!(10));
        assert!(leg.order_id.is_empty());
        assert!(!leg.filled);
        assert_eq!(leg.shares(), Decimal::ZERO);
    }

    // ==================== Position Tests ====================

    #[test]
    fn position_expected_payout_is_thinner_leg_shares() {
        let leg_a = ClobLeg::unplaced("predict", "yes", Side::Buy, dec!(0.45), dec!(9));
        let leg_b = ClobLeg::unplaced("opinion", "no", Side::Buy, dec!(0.50), dec!(9));
        let pos = ClobPosition::new(
            MarketId([1; 32]),
            PositionStatus::Filled,
            leg_a,
            leg_b,
            dec!(500),
        );
        // 9 / 0.45 = 20 shares, 9 / 0.50 = 18 shares
        assert_eq!(pos.expected_payout, dec!(18));
        assert_eq!(pos.total_cost, dec!(18));
        assert!(pos.closed_at.is_none());
    }

    #[test]
    fn naked_leg_detection() {
        let mut leg_a = ClobLeg::unplaced("predict", "yes", Side::Buy, dec!(0.45), dec!(9));
        let leg_b = ClobLeg::unplaced("opinion", "no", Side::Buy, dec!(0.50), dec!(9));
        leg_a.mark_filled(dec!(9));
        let pos = ClobPosition::new(
            MarketId([1; 32]),
            PositionStatus::Partial,
            leg_a,
            leg_b,
            dec!(500),
        );
        assert_eq!(pos.naked_leg().unwrap().platform, "predict");
    }

    #[test]
    fn position_ids_are_unique() {
        let make = || {
            ClobPosition::new(
                MarketId([1; 32]),
                PositionStatus::Expired,
                ClobLeg::unplaced("a", "t", Side::Buy, dec!(0.5), dec!(1)),
                ClobLeg::unplaced("b", "t", Side::Buy, dec!(0.4), dec!(1)),
                dec!(100),
            )
        };
        assert_ne!(make().id, make().id);
    }

    #[test]
    fn status_display() {
        assert_eq!(PositionStatus::Partial.to_string(), "PARTIAL");
        assert_eq!(PositionStatus::Closed.to_string(), "CLOSED");
    }
}
