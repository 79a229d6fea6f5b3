//! Simulated collaborators for tests and rehearsal runs.
//!
//! [`PaperVenue`] implements [`VenueClient`] without touching a real
//! exchange. Behavior layers, in order of precedence:
//!
//! 1. Scripted placement responses pushed with
//!    [`PaperVenue::push_place_response`], consumed FIFO.
//! 2. A fill mode: always fill, never fill, or a seeded random fill rate.
//!
//! Order statuses replay scripted sequences per order id, holding the last
//! report once a sequence drains. Every call is recorded for assertions.

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use cross_arb_chain::{Address, ChainError, WalletAccount};
use cross_arb_core::types::{MarketId, MarketMeta};

use crate::venue::{
    MarketMetaResolver, OrderRequest, OrderState, OrderStatusReport, PlaceOrderResponse,
    VenueClient, VenueError,
};

// =============================================================================
// Paper venue
// =============================================================================

/// Fill behavior when no scripted response is queued.
#[derive(Debug)]
enum FillMode {
    /// Every order fills at its full size.
    Always,
    /// Every order is rejected.
    Never,
    /// Orders fill with the given probability.
    Seeded { rate: f64, rng: Mutex<StdRng> },
}

/// A [`VenueClient`] double with scripted responses and recorded calls.
pub struct PaperVenue {
    name: String,
    mode: FillMode,
    next_order: AtomicU64,
    place_script: Mutex<VecDeque<PlaceOrderResponse>>,
    status_scripts: Mutex<HashMap<String, VecDeque<OrderStatusReport>>>,
    available_balance: Mutex<Option<Decimal>>,
    placed: Mutex<Vec<OrderRequest>>,
    cancelled: Mutex<Vec<String>>,
    auth_calls: AtomicU64,
    fail_auth: Mutex<bool>,
}

impl PaperVenue {
    /// Creates a venue that fills every order (the default mode).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_mode(name, FillMode::Always)
    }

    /// Creates a venue that rejects every order.
    #[must_use]
    pub fn never_fill(name: impl Into<String>) -> Self {
        Self::with_mode(name, FillMode::Never)
    }

    /// Creates a venue filling orders with probability `rate`, reproducibly.
    #[must_use]
    pub fn with_fill_rate(name: impl Into<String>, rate: f64, seed: u64) -> Self {
        Self::with_mode(
            name,
            FillMode::Seeded {
                rate: rate.clamp(0.0, 1.0),
                rng: Mutex::new(StdRng::seed_from_u64(seed)),
            },
        )
    }

    fn with_mode(name: impl Into<String>, mode: FillMode) -> Self {
        Self {
            name: name.into(),
            mode,
            next_order: AtomicU64::new(1),
            place_script: Mutex::new(VecDeque::new()),
            status_scripts: Mutex::new(HashMap::new()),
            available_balance: Mutex::new(None),
            placed: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            auth_calls: AtomicU64::new(0),
            fail_auth: Mutex::new(false),
        }
    }

    /// Queues an exact response for the next `place_order` call.
    pub fn push_place_response(&self, response: PlaceOrderResponse) {
        self.place_script.lock().push_back(response);
    }

    /// Scripts the status sequence for an order id. The final report holds
    /// once the sequence drains.
    pub fn script_status(&self, order_id: impl Into<String>, reports: Vec<OrderStatusReport>) {
        self.status_scripts
            .lock()
            .insert(order_id.into(), reports.into());
    }

    /// Sets the unlocked share balance reported by `available_balance`.
    pub fn set_available_balance(&self, shares: Decimal) {
        *self.available_balance.lock() = Some(shares);
    }

    /// Makes `authenticate` fail.
    pub fn fail_authentication(&self) {
        *self.fail_auth.lock() = true;
    }

    /// Orders placed so far, in call order.
    #[must_use]
    pub fn placed_orders(&self) -> Vec<OrderRequest> {
        self.placed.lock().clone()
    }

    /// Order ids cancelled so far.
    #[must_use]
    pub fn cancelled_orders(&self) -> Vec<String> {
        self.cancelled.lock().clone()
    }

    /// Number of `authenticate` calls.
    #[must_use]
    pub fn auth_calls(&self) -> u64 {
        self.auth_calls.load(Ordering::Relaxed)
    }

    fn next_order_id(&self) -> String {
        format!(
            "{}-{}",
            self.name,
            self.next_order.fetch_add(1, Ordering::Relaxed)
        )
    }
}

#[async_trait]
impl VenueClient for PaperVenue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn authenticate(&self) -> Result<(), VenueError> {
        self.auth_calls.fetch_add(1, Ordering::Relaxed);
        if *self.fail_auth.lock() {
            Err(VenueError::Auth("scripted failure".to_string()))
        } else {
            Ok(())
        }
    }

    async fn place_order(&self, request: OrderRequest) -> Result<PlaceOrderResponse, VenueError> {
        self.placed.lock().push(request.clone());

        if let Some(scripted) = self.place_script.lock().pop_front() {
            return Ok(scripted);
        }

        let response = match &self.mode {
            FillMode::Always => {
                PlaceOrderResponse::filled(self.next_order_id(), request.size_usdt)
            }
            FillMode::Never => PlaceOrderResponse::rejected("simulated rejection"),
            FillMode::Seeded { rate, rng } => {
                if rng.lock().gen_bool(*rate) {
                    PlaceOrderResponse::filled(self.next_order_id(), request.size_usdt)
                } else {
                    PlaceOrderResponse::rejected("simulated non-fill")
                }
            }
        };
        Ok(response)
    }

    async fn cancel_order(&self, order_id: &str, _token_id: &str) -> Result<bool, VenueError> {
        self.cancelled.lock().push(order_id.to_string());
        Ok(true)
    }

    async fn order_status(&self, order_id: &str) -> Result<OrderStatusReport, VenueError> {
        let mut scripts = self.status_scripts.lock();
        if let Some(queue) = scripts.get_mut(order_id) {
            if queue.len() > 1 {
                return Ok(queue.pop_front().unwrap_or_else(|| {
                    OrderStatusReport::unfilled(OrderState::Unknown)
                }));
            }
            if let Some(last) = queue.front() {
                return Ok(last.clone());
            }
        }
        Ok(OrderStatusReport::unfilled(OrderState::Unknown))
    }

    async fn available_balance(&self, _token_id: &str) -> Result<Option<Decimal>, VenueError> {
        Ok(*self.available_balance.lock())
    }
}

// =============================================================================
// Meta resolver double
// =============================================================================

/// [`MarketMetaResolver`] backed by a fixed map.
#[derive(Debug, Default)]
pub struct StaticMetaResolver {
    metas: Mutex<HashMap<MarketId, MarketMeta>>,
}

impl StaticMetaResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers metadata for a market.
    pub fn insert(&self, market_id: MarketId, meta: MarketMeta) {
        self.metas.lock().insert(market_id, meta);
    }
}

#[async_trait]
impl MarketMetaResolver for StaticMetaResolver {
    async fn market_meta(&self, market_id: MarketId) -> Option<MarketMeta> {
        self.metas.lock().get(&market_id).cloned()
    }
}

// =============================================================================
// Wallet double
// =============================================================================

/// [`WalletAccount`] double that records contract calls instead of signing.
#[derive(Debug)]
pub struct RecordingWallet {
    address: Address,
    calls: Mutex<Vec<(Address, Vec<u8>)>>,
    fail_calls: Mutex<bool>,
}

impl RecordingWallet {
    /// Creates a recording wallet with the given owner address.
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            calls: Mutex::new(Vec::new()),
            fail_calls: Mutex::new(false),
        }
    }

    /// Makes every subsequent call fail.
    pub fn fail_calls(&self, fail: bool) {
        *self.fail_calls.lock() = fail;
    }

    /// Recorded `(to, calldata)` pairs.
    #[must_use]
    pub fn calls(&self) -> Vec<(Address, Vec<u8>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl WalletAccount for RecordingWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_contract_call(&self, to: Address, calldata: Vec<u8>) -> Result<String, ChainError> {
        if *self.fail_calls.lock() {
            return Err(ChainError::Rejected("scripted failure".to_string()));
        }
        let mut calls = self.calls.lock();
        calls.push((to, calldata));
        Ok(format!("0x{:064x}", calls.len()))
    }
}

// =============================================================================
// Tests
// =============================================================================
