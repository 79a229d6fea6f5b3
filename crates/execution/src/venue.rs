//! Venue client abstraction.
//!
//! Each order-book venue is driven through [`VenueClient`], a capability set
//! the executor holds behind `Arc<dyn VenueClient>` keyed by protocol name.
//! Implementations own their transport, signing, and rate limiting; the
//! executor only sequences calls. `available_balance` is an optional
//! capability — venues without it fall back to the computed share count
//! during unwinds.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cross_arb_core::types::{MarketId, MarketMeta, Side};

// =============================================================================
// Errors
// =============================================================================

/// Transport-level venue failures.
///
/// Order rejections are not errors; they come back inside
/// [`PlaceOrderResponse`] with `success: false`.
#[derive(Debug, Clone, Error)]
pub enum VenueError {
    /// API-level failure.
    #[error("API error: {0}")]
    Api(String),

    /// Network/connection failure.
    #[error("network error: {0}")]
    Network(String),

    /// Authentication failure.
    #[error("authentication failed: {0}")]
    Auth(String),
}

// =============================================================================
// Order types
// =============================================================================

/// How long an order rests on the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Fill-or-kill: fills entirely and immediately, or cancels.
    Fok,
    /// Good-till-cancel limit order; rests on the book.
    Gtc,
}

impl std::fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeInForce::Fok => write!(f, "FOK"),
            TimeInForce::Gtc => write!(f, "GTC"),
        }
    }
}

/// Parameters for an order placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Venue-native outcome token id.
    pub token_id: String,

    /// Buy or sell.
    pub side: Side,

    /// Limit price as a fraction in `[0, 1]`.
    pub price: Decimal,

    /// Order size in USDT.
    pub size_usdt: Decimal,

    /// Market this order belongs to, when the venue wants it.
    pub market_id: Option<MarketId>,

    /// Resting behavior.
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    /// Creates a FOK BUY, the shape both arbitrage legs use.
    #[must_use]
    pub fn buy_fok(
        token_id: impl Into<String>,
        price: Decimal,
        size_usdt: Decimal,
        market_id: MarketId,
    ) -> Self {
        Self {
            token_id: token_id.into(),
            side: Side::Buy,
            price,
            size_usdt,
            market_id: Some(market_id),
            time_in_force: TimeInForce::Fok,
        }
    }

    /// Creates a GTC SELL, the shape unwind orders use.
    #[must_use]
    pub fn sell_gtc(token_id: impl Into<String>, price: Decimal, size_usdt: Decimal) -> Self {
        Self {
            token_id: token_id.into(),
            side: Side::Sell,
            price,
            size_usdt,
            market_id: None,
            time_in_force: TimeInForce::Gtc,
        }
    }

    /// Number of shares this order trades at its limit price.
    #[must_use]
    pub fn shares(&self) -> Decimal {
        if self.price > Decimal::ZERO {
            self.size_usdt / self.price
        } else {
            Decimal::ZERO
        }
    }
}

/// Venue-reported state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    /// Resting on the book, unfilled.
    Open,
    /// Partially filled, remainder on the book.
    Partial,
    /// Completely filled.
    Filled,
    /// Cancelled before completion.
    Cancelled,
    /// Expired (FOK that did not fill, or book-side expiry).
    Expired,
    /// Venue could not report a state.
    Unknown,
}

impl OrderState {
    /// Whether the state is terminal.
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Cancelled | OrderState::Expired
        )
    }

    /// Terminal without a complete fill.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        matches!(self, OrderState::Cancelled | OrderState::Expired)
    }

    /// Observed live on the book.
    #[must_use]
    pub fn is_on_book(&self) -> bool {
        matches!(self, OrderState::Open | OrderState::Partial)
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderState::Open => "OPEN",
            OrderState::Partial => "PARTIAL",
            OrderState::Filled => "FILLED",
            OrderState::Cancelled => "CANCELLED",
            OrderState::Expired => "EXPIRED",
            OrderState::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

/// Venue response to an order placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderResponse {
    /// Whether the venue accepted the order.
    pub success: bool,

    /// Assigned order id when accepted.
    pub order_id: Option<String>,

    /// Initial order state when reported.
    pub status: Option<OrderState>,

    /// Filled quantity (USDT) when the venue reports fills synchronously.
    /// `Some(0)` is an explicit statement of no fill, distinct from absent.
    pub filled_qty: Option<Decimal>,

    /// Rejection or error detail.
    pub error: Option<String>,
}

impl PlaceOrderResponse {
    /// An accepted order with the given id.
    #[must_use]
    pub fn accepted(order_id: impl Into<String>) -> Self {
        Self {
            success: true,
            order_id: Some(order_id.into()),
            status: Some(OrderState::Open),
            filled_qty: None,
            error: None,
        }
    }

    /// An accepted order the venue reports as immediately filled.
    #[must_use]
    pub fn filled(order_id: impl Into<String>, filled_qty: Decimal) -> Self {
        Self {
            success: true,
            order_id: Some(order_id.into()),
            status: Some(OrderState::Filled),
            filled_qty: Some(filled_qty),
            error: None,
        }
    }

    /// A rejected order.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            order_id: None,
            status: None,
            filled_qty: None,
            error: Some(reason.into()),
        }
    }
}

/// Snapshot of an order's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusReport {
    /// Current state.
    pub state: OrderState,

    /// Filled amount in USDT.
    pub filled_size: Decimal,

    /// Unfilled remainder in USDT.
    pub remaining_size: Decimal,
}

impl OrderStatusReport {
    /// A report in the given state with no fills.
    #[must_use]
    pub fn unfilled(state: OrderState) -> Self {
        Self {
            state,
            filled_size: Decimal::ZERO,
            remaining_size: Decimal::ZERO,
        }
    }

    /// A fully-filled report.
    #[must_use]
    pub fn filled(size: Decimal) -> Self {
        Self {
            state: OrderState::Filled,
            filled_size: size,
            remaining_size: Decimal::ZERO,
        }
    }
}

// =============================================================================
// Traits
// =============================================================================

/// Capability set the executor needs from each venue.
#[async_trait]
pub trait VenueClient: Send + Sync {
    /// Protocol name this client serves.
    fn name(&self) -> &str;

    /// Authenticates against the venue API. Called once at startup.
    async fn authenticate(&self) -> Result<(), VenueError>;

    /// Places an order.
    ///
    /// # Errors
    /// [`VenueError`] only for transport failures; rejections come back in
    /// the response.
    async fn place_order(&self, request: OrderRequest) -> Result<PlaceOrderResponse, VenueError>;

    /// Cancels an order, returning whether the venue acknowledged.
    async fn cancel_order(&self, order_id: &str, token_id: &str) -> Result<bool, VenueError>;

    /// Fetches the current status of an order.
    async fn order_status(&self, order_id: &str) -> Result<OrderStatusReport, VenueError>;

    /// Unlocked share balance for a token (shares not resting in open
    /// orders). Optional capability; the default reports none.
    async fn available_balance(&self, _token_id: &str) -> Result<Option<Decimal>, VenueError> {
        Ok(None)
    }

    /// Ensures on-chain approvals for trading are in place. Out-of-band
    /// bring-up; the default is a no-op.
    async fn ensure_approvals(&self) -> Result<(), VenueError> {
        Ok(())
    }
}

/// Resolves venue-native market metadata for a shared market id.
#[async_trait]
pub trait MarketMetaResolver: Send + Sync {
    /// Metadata for the market on this resolver's venue, if listed.
    async fn market_meta(&self, market_id: MarketId) -> Option<MarketMeta>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_state_terminality() {
        assert!(OrderState::Filled.is_final());
        assert!(OrderState::Cancelled.is_final());
        assert!(OrderState::Expired.is_final());
        assert!(!OrderState::Open.is_final());
        assert!(!OrderState::Partial.is_final());
        assert!(!OrderState::Unknown.is_final());
    }

    #[test]
    fn order_state_dead_and_on_book() {
        assert!(OrderState::Cancelled.is_dead());
        assert!(OrderState::Expired.is_dead());
        assert!(!OrderState::Filled.is_dead());

        assert!(OrderState::Open.is_on_book());
        assert!(OrderState::Partial.is_on_book());
        assert!(!OrderState::Expired.is_on_book());
    }

    #[test]
    fn buy_fok_shape() {
        let req = OrderRequest::buy_fok("tok", dec!(0.45), dec!(9), MarketId([1; 32]));
        assert_eq!(req.side, Side::Buy);
        assert_eq!(req.time_in_force, TimeInForce::Fok);
        assert_eq!(req.shares(), dec!(20));
    }

    #[test]
    fn sell_gtc_shape() {
        let req = OrderRequest::sell_gtc("tok", dec!(0.304), dec!(3.8));
        assert_eq!(req.side, Side::Sell);
        assert_eq!(req.time_in_force, TimeInForce::Gtc);
        assert!(req.market_id.is_none());
        assert_eq!(req.shares(), dec!(12.5));
    }

    #[test]
    fn place_response_constructors() {
        let ok = PlaceOrderResponse::accepted("o-1");
        assert!(ok.success);
        assert_eq!(ok.order_id.as_deref(), Some("o-1"));

        let rejected = PlaceOrderResponse::rejected("crash");
        assert!(!rejected.success);
        assert_eq!(rejected.error.as_deref(), Some("crash"));
        assert!(rejected.order_id.is_none());

        let filled = PlaceOrderResponse::filled("o-2", dec!(4));
        assert_eq!(filled.filled_qty, Some(dec!(4)));
        assert_eq!(filled.status, Some(OrderState::Filled));
    }

    #[test]
    fn serde_status_names() {
        assert_eq!(serde_json::to_string(&OrderState::Partial).unwrap(), "\"PARTIAL\"");
        assert_eq!(serde_json::to_string(&TimeInForce::Fok).unwrap(), "\"FOK\"");
    }
}
