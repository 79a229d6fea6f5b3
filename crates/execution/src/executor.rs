//! The execution core.
//!
//! `Executor` coordinates two order-book venues with different reliability
//! profiles. The thin, FOK-flaky venue goes first; only after its fill is
//! verified against on-chain balance deltas does the deep venue's leg go
//! out. A filled single leg is never abandoned: the executor pauses itself,
//! cools the market down, and launches an unwind before returning.
//!
//! One scan loop owns an `Executor` and calls it sequentially; internal
//! venue calls may run concurrently but all writes to the pause flag and
//! cooldown map happen after those joins.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use cross_arb_chain::{Address, ChainReader, WalletAccount};
use cross_arb_core::rounding::usdt_to_wei;
use cross_arb_core::types::{
    ArbOpportunity, ClobLeg, ClobPosition, MarketId, MarketMeta, OpportunityError, PositionStatus,
    Side,
};
use cross_arb_core::ExecutionConfig;

use crate::decline::{DeclineReason, ExecuteOutcome};
use crate::redeemer::{self, RedeemContext, VenueContracts};
use crate::shutdown::ShutdownSignal;
use crate::sizer::{size_per_leg, Sizing, SizingInputs};
use crate::state::ExecutorState;
use crate::stats::ExecutionStats;
use crate::unwinder::{unwind_leg, UnwindOutcome};
use crate::venue::{
    MarketMetaResolver, OrderRequest, OrderState, PlaceOrderResponse, VenueClient, VenueError,
};
use crate::verifier::{classify_fill, snapshot_balances};

// =============================================================================
// Errors
// =============================================================================

/// Programmer errors surfaced by the executor. Operational failures are
/// encoded in [`ExecuteOutcome`] and position statuses instead.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// The opportunity is structurally invalid (zero prices, no spread).
    #[error("invalid opportunity: {0}")]
    InvalidOpportunity(#[from] OpportunityError),

    /// A position references a venue with no registered client.
    #[error("no client registered for venue '{0}'")]
    MissingVenue(String),

    /// Venue authentication failed at startup.
    #[error("venue authentication failed: {0}")]
    Auth(#[from] VenueError),

    /// Redemption requires a wallet account and none was configured.
    #[error("no wallet account configured for redemption")]
    WalletRequired,
}

// =============================================================================
// Construction
// =============================================================================

/// Wallets funding the two legs.
#[derive(Debug, Clone)]
pub struct FundingAccounts {
    /// EOA wallet funding the reliable leg (and both, absent a smart
    /// account).
    pub eoa: Address,

    /// Smart-account wallet funding the unreliable leg, when the venue
    /// trades through one.
    pub smart_account: Option<Address>,

    /// USDT token contract for balance reads.
    pub usdt: Address,
}

impl FundingAccounts {
    /// Whether each wallet funds exactly one leg.
    #[must_use]
    pub fn separate_wallets(&self) -> bool {
        self.smart_account.is_some()
    }
}

/// Injected collaborators, keyed by protocol name where per-venue.
pub struct Collaborators {
    /// Venue clients.
    pub venues: HashMap<String, Arc<dyn VenueClient>>,

    /// Market metadata resolvers.
    pub metas: HashMap<String, Arc<dyn MarketMetaResolver>>,

    /// On-chain reader for balances and CTF views.
    pub chain: Arc<dyn ChainReader>,

    /// Wallets funding the legs.
    pub funding: FundingAccounts,

    /// Per-venue settlement contracts, for redemption.
    pub contracts: HashMap<String, VenueContracts>,

    /// Signing account for redemption transactions.
    pub wallet: Option<Arc<dyn WalletAccount>>,
}

// =============================================================================
// Executor
// =============================================================================

/// Stateful execution core. One instance per agent; the caller serializes
/// `execute_best` invocations.
pub struct Executor {
    config: ExecutionConfig,
    venues: HashMap<String, Arc<dyn VenueClient>>,
    metas: HashMap<String, Arc<dyn MarketMetaResolver>>,
    chain: Arc<dyn ChainReader>,
    funding: FundingAccounts,
    contracts: HashMap<String, VenueContracts>,
    wallet: Option<Arc<dyn WalletAccount>>,
    state: ExecutorState,
    stats: parking_lot::Mutex<ExecutionStats>,
    shutdown: ShutdownSignal,
}

/// Execution plan for one leg.
struct LegPlan {
    venue: Arc<dyn VenueClient>,
    price: Decimal,
    token_id: String,
}

impl Executor {
    /// Creates an executor from its configuration and collaborators.
    #[must_use]
    pub fn new(config: ExecutionConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            venues: collaborators.venues,
            metas: collaborators.metas,
            chain: collaborators.chain,
            funding: collaborators.funding,
            contracts: collaborators.contracts,
            wallet: collaborators.wallet,
            state: ExecutorState::default(),
            stats: parking_lot::Mutex::new(ExecutionStats::default()),
            shutdown: ShutdownSignal::none(),
        }
    }

    /// Restores a cooldown map persisted by a previous run.
    #[must_use]
    pub fn with_initial_cooldowns(
        mut self,
        cooldowns: HashMap<MarketId, chrono::DateTime<Utc>>,
    ) -> Self {
        self.state = ExecutorState::with_cooldowns(cooldowns);
        self
    }

    /// Threads a caller-owned shutdown signal into every bounded wait.
    #[must_use]
    pub fn with_shutdown(mut self, rx: watch::Receiver<bool>) -> Self {
        self.shutdown = ShutdownSignal::from_watch(rx);
        self
    }

    /// Authenticates every registered venue client. Call once at startup.
    ///
    /// # Errors
    /// The first venue authentication failure.
    pub async fn authenticate_venues(&self) -> Result<(), ExecuteError> {
        for (name, venue) in &self.venues {
            venue.authenticate().await?;
            info!(venue = %name, "venue authenticated");
        }
        Ok(())
    }

    /// Whether the executor is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    /// Clears the pause gate. The operator's override after manual review.
    pub fn unpause(&self) {
        self.state.set_paused(false);
        info!("pause cleared by operator");
    }

    /// Copy of the live cooldown map for persistence snapshots.
    #[must_use]
    pub fn cooldowns_snapshot(&self) -> HashMap<MarketId, chrono::DateTime<Utc>> {
        self.state.cooldowns_snapshot()
    }

    /// Copy of the running execution counters.
    #[must_use]
    pub fn stats(&self) -> ExecutionStats {
        self.stats.lock().clone()
    }

    // =========================================================================
    // execute_best
    // =========================================================================

    /// Executes the best detected opportunity: sizes the trade, places the
    /// unreliable leg, verifies its fill on-chain, then hedges with the
    /// reliable leg.
    ///
    /// Declines carry no side effects. A returned PARTIAL position has had
    /// its unwind attempt launched (and awaited) before this returns.
    ///
    /// # Errors
    /// [`ExecuteError::InvalidOpportunity`] for malformed input; operational
    /// failures come back in the outcome.
    pub async fn execute_best(
        &self,
        opp: &ArbOpportunity,
        max_position_size: Decimal,
    ) -> Result<ExecuteOutcome, ExecuteError> {
        opp.validate()?;
        self.stats.lock().opportunities_evaluated += 1;
        let now = Utc::now();

        // Pre-flight gates, cheapest first.
        if self.state.is_paused() {
            self.stats.lock().declined_paused += 1;
            return Ok(self.decline(opp, DeclineReason::Paused));
        }

        if let Some(remaining) = self.state.cooldown_remaining(&opp.market_id, now) {
            self.stats.lock().declined_cooldown += 1;
            return Ok(self.decline(opp, DeclineReason::CooldownActive { remaining }));
        }

        let age = opp.age(now);
        let max_age = chrono::Duration::from_std(self.config.max_quote_age)
            .unwrap_or_else(|_| chrono::Duration::seconds(15));
        if age > max_age {
            self.stats.lock().declined_stale += 1;
            return Ok(self.decline(
                opp,
                DeclineReason::StaleQuote {
                    age_ms: age.num_milliseconds(),
                },
            ));
        }

        let Some(venue_a) = self.venues.get(&opp.protocol_a).cloned() else {
            self.stats.lock().declined_missing += 1;
            return Ok(self.decline(opp, DeclineReason::UnknownVenue { venue: opp.protocol_a.clone() }));
        };
        let Some(venue_b) = self.venues.get(&opp.protocol_b).cloned() else {
            self.stats.lock().declined_missing += 1;
            return Ok(self.decline(opp, DeclineReason::UnknownVenue { venue: opp.protocol_b.clone() }));
        };

        let Some(meta_a) = self.resolve_meta(&opp.protocol_a, opp.market_id).await else {
            self.stats.lock().declined_missing += 1;
            return Ok(self.decline(opp, DeclineReason::MissingMarketMeta { venue: opp.protocol_a.clone() }));
        };
        let Some(meta_b) = self.resolve_meta(&opp.protocol_b, opp.market_id).await else {
            self.stats.lock().declined_missing += 1;
            return Ok(self.decline(opp, DeclineReason::MissingMarketMeta { venue: opp.protocol_b.clone() }));
        };

        // Sizing, with on-chain balance caps.
        let pre_balances = snapshot_balances(
            &self.chain,
            self.funding.usdt,
            self.funding.eoa,
            self.funding.smart_account,
        )
        .await;

        let sizing = size_per_leg(&SizingInputs {
            max_position_size,
            liquidity_a: opp.liquidity_a,
            liquidity_b: opp.liquidity_b,
            eoa_balance_wei: pre_balances.eoa,
            smart_balance_wei: pre_balances.smart,
            separate_wallets: self.funding.separate_wallets(),
            fee_buffer: self.config.fee_buffer,
            min_trade_size: self.config.min_trade_size,
        });
        let size = match sizing {
            Sizing::Sized(size) => size,
            Sizing::BelowMin { size, min } => {
                self.stats.lock().declined_size += 1;
                return Ok(self.decline(opp, DeclineReason::BelowMinSize { size, min }));
            }
        };

        // The chosen (condition, token) pairs; cross-venue mismatches
        // surface in this log line.
        let token_a = meta_a.token_for(opp.buy_yes_on_a).to_string();
        let token_b = meta_b.token_for(!opp.buy_yes_on_a).to_string();
        info!(
            market = %opp.market_id,
            venue_a = %opp.protocol_a,
            condition_a = %meta_a.condition_id,
            token_a = %token_a,
            venue_b = %opp.protocol_b,
            condition_b = %meta_b.condition_id,
            token_b = %token_b,
            %size,
            "resolved execution targets"
        );

        let mut legs = [
            ClobLeg::unplaced(&opp.protocol_a, &token_a, Side::Buy, opp.yes_price_a, size),
            ClobLeg::unplaced(&opp.protocol_b, &token_b, Side::Buy, opp.no_price_b, size),
        ];
        let plans = [
            LegPlan {
                venue: venue_a,
                price: opp.yes_price_a,
                token_id: token_a,
            },
            LegPlan {
                venue: venue_b,
                price: opp.no_price_b,
                token_id: token_b,
            },
        ];

        let unreliable_idx = self.unreliable_leg_index(opp);
        let reliable_idx = 1 - unreliable_idx;

        if self.config.dry_run {
            return Ok(self.execute_dry_run(opp, legs, &plans, unreliable_idx, size).await);
        }

        // Live path: unreliable leg first.
        let expected_spend_wei = usdt_to_wei(size);
        let unreliable = &plans[unreliable_idx];
        let response = match unreliable
            .venue
            .place_order(OrderRequest::buy_fok(
                &unreliable.token_id,
                unreliable.price,
                size,
                opp.market_id,
            ))
            .await
        {
            Ok(response) => response,
            Err(e) => PlaceOrderResponse::rejected(e.to_string()),
        };

        if !response.success {
            // FOK rejections on this venue strongly predict recurrence.
            let reason = response.error.unwrap_or_else(|| "unknown".to_string());
            self.state
                .set_cooldown(opp.market_id, now, self.config.market_cooldown);
            self.stats.lock().unreliable_rejected += 1;
            warn!(
                market = %opp.market_id,
                venue = %legs[unreliable_idx].platform,
                %reason,
                "unreliable leg rejected; market cooled down"
            );
            return Ok(ExecuteOutcome::Declined(DeclineReason::UnreliableRejected {
                venue: legs[unreliable_idx].platform.clone(),
                reason,
            }));
        }
        if let Some(order_id) = &response.order_id {
            legs[unreliable_idx].mark_placed(order_id.clone());
        }

        if self.shutdown.sleep(self.config.settle_wait).await {
            debug!("settle wait cancelled; continuing verification");
        }

        // Verify the unreliable fill: venue-reported quantity first, then
        // the funding wallet's balance delta. Unknown reads as unfilled.
        let unreliable_wallet = self.funding.smart_account.unwrap_or(self.funding.eoa);
        let unreliable_pre = if self.funding.separate_wallets() {
            pre_balances.smart
        } else {
            pre_balances.eoa
        };
        let unreliable_post = self.read_balance(unreliable_wallet).await;
        let verdict = classify_fill(
            response.filled_qty,
            unreliable_pre,
            unreliable_post,
            expected_spend_wei,
        );
        if !verdict.unfilled_when_unknown() {
            self.state
                .set_cooldown(opp.market_id, now, self.config.short_cooldown);
            self.stats.lock().expired += 1;
            info!(
                market = %opp.market_id,
                venue = %legs[unreliable_idx].platform,
                ?verdict,
                "unreliable leg did not fill; short cooldown"
            );
            let [leg_a, leg_b] = legs;
            return Ok(ExecuteOutcome::Position(ClobPosition::new(
                opp.market_id,
                PositionStatus::Expired,
                leg_a,
                leg_b,
                opp.spread_bps,
            )));
        }
        legs[unreliable_idx].mark_filled(size);

        // The unreliable leg is live exposure from here on. Hedge it.
        let reliable = &plans[reliable_idx];
        let reliable_response = match reliable
            .venue
            .place_order(OrderRequest::buy_fok(
                &reliable.token_id,
                reliable.price,
                size,
                opp.market_id,
            ))
            .await
        {
            Ok(response) => response,
            Err(e) => PlaceOrderResponse::rejected(e.to_string()),
        };

        if !reliable_response.success {
            warn!(
                market = %opp.market_id,
                venue = %legs[reliable_idx].platform,
                error = reliable_response.error.as_deref().unwrap_or("unknown"),
                "reliable leg rejected after unreliable fill"
            );
            return Ok(self
                .finish_partial(opp, legs, &plans, unreliable_idx, now)
                .await);
        }
        if let Some(order_id) = &reliable_response.order_id {
            legs[reliable_idx].mark_placed(order_id.clone());
        }

        if self.shutdown.sleep(self.config.settle_wait).await {
            debug!("settle wait cancelled; continuing verification");
        }

        // Reliable verification is EOA-delta only, optimistic on a missing
        // baseline: this venue's FOK is trustworthy and a false PARTIAL
        // would trigger a needless unwind.
        let reliable_pre = if self.funding.separate_wallets() {
            pre_balances.eoa
        } else {
            unreliable_post
        };
        let reliable_post = self.read_balance(self.funding.eoa).await;
        let reliable_verdict =
            classify_fill(None, reliable_pre, reliable_post, expected_spend_wei);

        if reliable_verdict.filled_when_unknown() {
            legs[reliable_idx].mark_filled(size);
            self.stats.lock().filled += 1;
            let [leg_a, leg_b] = legs;
            let position = ClobPosition::new(
                opp.market_id,
                PositionStatus::Filled,
                leg_a,
                leg_b,
                opp.spread_bps,
            );
            info!(
                market = %opp.market_id,
                position = %position.id,
                total_cost = %position.total_cost,
                expected_payout = %position.expected_payout,
                "both legs filled"
            );
            return Ok(ExecuteOutcome::Position(position));
        }

        warn!(
            market = %opp.market_id,
            venue = %legs[reliable_idx].platform,
            ?reliable_verdict,
            "reliable leg did not fill"
        );
        Ok(self
            .finish_partial(opp, legs, &plans, unreliable_idx, now)
            .await)
    }

    /// PARTIAL epilogue: pause before anything else so no re-entry can slip
    /// through while the unwind is in flight, cool the market down, then
    /// unwind the naked leg synchronously.
    async fn finish_partial(
        &self,
        opp: &ArbOpportunity,
        legs: [ClobLeg; 2],
        plans: &[LegPlan; 2],
        unreliable_idx: usize,
        now: chrono::DateTime<Utc>,
    ) -> ExecuteOutcome {
        self.state.set_paused(true);
        self.state
            .set_cooldown(opp.market_id, now, self.config.market_cooldown);
        self.stats.lock().partial += 1;

        let outcome = unwind_leg(
            &plans[unreliable_idx].venue,
            &legs[unreliable_idx],
            &self.config,
            &self.shutdown,
        )
        .await;
        self.apply_unwind_outcome(outcome);

        let [leg_a, leg_b] = legs;
        let position = ClobPosition::new(
            opp.market_id,
            PositionStatus::Partial,
            leg_a,
            leg_b,
            opp.spread_bps,
        );
        warn!(
            market = %opp.market_id,
            position = %position.id,
            ?outcome,
            paused = self.state.is_paused(),
            "partial fill handled"
        );
        ExecuteOutcome::Position(position)
    }

    fn apply_unwind_outcome(&self, outcome: UnwindOutcome) {
        {
            let mut stats = self.stats.lock();
            match outcome {
                UnwindOutcome::Recovered => stats.unwinds_recovered += 1,
                UnwindOutcome::Transient => stats.unwinds_transient += 1,
                UnwindOutcome::Systematic | UnwindOutcome::NothingToSell => {
                    stats.unwinds_systematic += 1;
                }
            }
        }
        if outcome.clears_pause() {
            self.state.set_paused(false);
        }
    }

    /// Dry-run path: place both orders, skip verification, report FILLED.
    async fn execute_dry_run(
        &self,
        opp: &ArbOpportunity,
        mut legs: [ClobLeg; 2],
        plans: &[LegPlan; 2],
        unreliable_idx: usize,
        size: Decimal,
    ) -> ExecuteOutcome {
        for idx in [unreliable_idx, 1 - unreliable_idx] {
            let plan = &plans[idx];
            match plan
                .venue
                .place_order(OrderRequest::buy_fok(
                    &plan.token_id,
                    plan.price,
                    size,
                    opp.market_id,
                ))
                .await
            {
                Ok(response) => {
                    if let Some(order_id) = response.order_id {
                        legs[idx].mark_placed(order_id);
                    }
                }
                Err(e) => {
                    warn!(venue = %legs[idx].platform, error = %e, "dry-run placement failed");
                }
            }
            legs[idx].mark_filled(size);
        }

        self.stats.lock().filled += 1;
        let [leg_a, leg_b] = legs;
        let position = ClobPosition::new(
            opp.market_id,
            PositionStatus::Filled,
            leg_a,
            leg_b,
            opp.spread_bps,
        );
        info!(market = %opp.market_id, position = %position.id, "dry-run trade recorded");
        ExecuteOutcome::Position(position)
    }

    // =========================================================================
    // poll_for_fills
    // =========================================================================

    /// Polls both legs' order statuses until terminal states or timeout,
    /// updating the position in place and returning its final status.
    ///
    /// Used when placement returned OPEN (non-FOK ladders, or verification
    /// bypassed).
    ///
    /// # Errors
    /// [`ExecuteError::MissingVenue`] when a leg references an unregistered
    /// venue.
    pub async fn poll_for_fills(
        &self,
        position: &mut ClobPosition,
    ) -> Result<PositionStatus, ExecuteError> {
        let venue_a = self.venue_for(&position.leg_a)?;
        let venue_b = self.venue_for(&position.leg_b)?;
        let deadline = tokio::time::Instant::now() + self.config.fill_poll_timeout;

        loop {
            let (state_a, state_b) = tokio::join!(
                leg_state(&venue_a, &position.leg_a),
                leg_state(&venue_b, &position.leg_b),
            );

            if let Some(status) = self
                .classify_poll_states(position, state_a, state_b)
                .await
            {
                return Ok(status);
            }

            let now = tokio::time::Instant::now();
            if now >= deadline || self.shutdown.is_cancelled() {
                break;
            }
            let interval = self.config.fill_poll_interval.min(deadline - now);
            if self.shutdown.sleep(interval).await {
                break;
            }
        }

        // Timeout: one final look, then take resting orders off the book and
        // classify what remains.
        let (state_a, state_b) = tokio::join!(
            leg_state(&venue_a, &position.leg_a),
            leg_state(&venue_b, &position.leg_b),
        );
        if state_a != OrderState::Filled && !state_a.is_dead() && !position.leg_a.order_id.is_empty()
        {
            let _ = venue_a
                .cancel_order(&position.leg_a.order_id, &position.leg_a.token_id)
                .await;
        }
        if state_b != OrderState::Filled && !state_b.is_dead() && !position.leg_b.order_id.is_empty()
        {
            let _ = venue_b
                .cancel_order(&position.leg_b.order_id, &position.leg_b.token_id)
                .await;
        }

        let a_filled = state_a == OrderState::Filled;
        let b_filled = state_b == OrderState::Filled;
        let status = match (a_filled, b_filled) {
            (true, true) => {
                position.leg_a.mark_filled(position.leg_a.size);
                position.leg_b.mark_filled(position.leg_b.size);
                self.stats.lock().filled += 1;
                PositionStatus::Filled
            }
            (true, false) => {
                position.leg_a.mark_filled(position.leg_a.size);
                self.poll_partial(position, true).await
            }
            (false, true) => {
                position.leg_b.mark_filled(position.leg_b.size);
                self.poll_partial(position, false).await
            }
            (false, false) => {
                self.stats.lock().expired += 1;
                PositionStatus::Expired
            }
        };
        position.status = status;
        Ok(status)
    }

    /// Applies the fill-poll transition table. `None` means keep polling.
    async fn classify_poll_states(
        &self,
        position: &mut ClobPosition,
        state_a: OrderState,
        state_b: OrderState,
    ) -> Option<PositionStatus> {
        let status = match (state_a, state_b) {
            (OrderState::Filled, OrderState::Filled) => {
                position.leg_a.mark_filled(position.leg_a.size);
                position.leg_b.mark_filled(position.leg_b.size);
                self.stats.lock().filled += 1;
                PositionStatus::Filled
            }
            (a, b) if a.is_dead() && b.is_dead() => {
                self.stats.lock().expired += 1;
                PositionStatus::Expired
            }
            (OrderState::Filled, b) if b.is_dead() => {
                position.leg_a.mark_filled(position.leg_a.size);
                self.poll_partial(position, true).await
            }
            (a, OrderState::Filled) if a.is_dead() => {
                position.leg_b.mark_filled(position.leg_b.size);
                self.poll_partial(position, false).await
            }
            _ => return None,
        };
        position.status = status;
        Some(status)
    }

    /// Pause, unwind the filled side, report PARTIAL.
    async fn poll_partial(&self, position: &ClobPosition, a_filled: bool) -> PositionStatus {
        self.state.set_paused(true);
        self.stats.lock().partial += 1;

        let leg = if a_filled { &position.leg_a } else { &position.leg_b };
        match self.venue_for(leg) {
            Ok(venue) => {
                let outcome = unwind_leg(&venue, leg, &self.config, &self.shutdown).await;
                self.apply_unwind_outcome(outcome);
            }
            Err(e) => warn!(platform = %leg.platform, error = %e, "cannot unwind filled leg"),
        }
        PositionStatus::Partial
    }

    // =========================================================================
    // close_resolved
    // =========================================================================

    /// Redeems legs of FILLED positions whose markets have resolved
    /// on-chain, marking them CLOSED. Returns how many positions closed.
    ///
    /// Idempotent: already-CLOSED positions produce zero on-chain writes.
    ///
    /// # Errors
    /// [`ExecuteError::WalletRequired`] when no signing wallet was injected.
    pub async fn close_resolved(
        &self,
        positions: &mut [ClobPosition],
    ) -> Result<usize, ExecuteError> {
        let wallet = self.wallet.as_ref().ok_or(ExecuteError::WalletRequired)?;
        let ctx = RedeemContext {
            metas: &self.metas,
            contracts: &self.contracts,
            chain: &self.chain,
            wallet,
        };
        let closed = redeemer::close_resolved(&ctx, positions).await;
        self.stats.lock().positions_redeemed += closed as u64;
        Ok(closed)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn decline(&self, opp: &ArbOpportunity, reason: DeclineReason) -> ExecuteOutcome {
        debug!(market = %opp.market_id, %reason, "opportunity declined");
        ExecuteOutcome::Declined(reason)
    }

    async fn resolve_meta(&self, protocol: &str, market_id: MarketId) -> Option<MarketMeta> {
        self.metas.get(protocol)?.market_meta(market_id).await
    }

    fn venue_for(&self, leg: &ClobLeg) -> Result<Arc<dyn VenueClient>, ExecuteError> {
        self.venues
            .get(&leg.platform)
            .cloned()
            .ok_or_else(|| ExecuteError::MissingVenue(leg.platform.clone()))
    }

    /// Index (0 = venue A, 1 = venue B) of the leg placed first. The venue
    /// outside the reliable set goes first; when the configuration cannot
    /// disambiguate, venue A is treated as unreliable.
    fn unreliable_leg_index(&self, opp: &ArbOpportunity) -> usize {
        let a_reliable = self.config.is_reliable(&opp.protocol_a);
        let b_reliable = self.config.is_reliable(&opp.protocol_b);
        match (a_reliable, b_reliable) {
            (true, false) => 1,
            (false, true) => 0,
            _ => {
                debug!(
                    venue_a = %opp.protocol_a,
                    venue_b = %opp.protocol_b,
                    "reliable-venue set does not disambiguate; placing venue A first"
                );
                0
            }
        }
    }

    async fn read_balance(&self, owner: Address) -> Option<u128> {
        match self.chain.erc20_balance(self.funding.usdt, owner).await {
            Ok(wei) => Some(wei),
            Err(e) => {
                warn!(%owner, error = %e, "post-trade balance read failed");
                None
            }
        }
    }
}

/// Fetches a leg's order state, mapping transport failures and never-placed
/// legs to poll-table inputs.
async fn leg_state(venue: &Arc<dyn VenueClient>, leg: &ClobLeg) -> OrderState {
    if leg.order_id.is_empty() {
        return OrderState::Expired;
    }
    match venue.order_status(&leg.order_id).await {
        Ok(report) => report.state,
        Err(e) => {
            warn!(order_id = %leg.order_id, error = %e, "order status query failed");
            OrderState::Unknown
        }
    }
}
