//! End-to-end executor scenarios over simulated collaborators.
//!
//! Covers the core flows: dry-run happy path,
//! first-leg rejection and expiry, partial fills with systematic and
//! transient unwind classification, balance-capped sizing, fill polling
//! transitions, and redemption of resolved markets.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal_macros::dec;

use cross_arb_chain::{Address, ChainReader, StaticChainReader, WalletAccount};
use cross_arb_core::rounding::usdt_to_wei;
use cross_arb_core::types::{
    ArbOpportunity, ClobLeg, ClobPosition, ConditionId, MarketId, MarketMeta, PositionStatus, Side,
};
use cross_arb_core::ExecutionConfig;
use cross_arb_execution::executor::{Collaborators, ExecuteError, Executor, FundingAccounts};
use cross_arb_execution::paper::{PaperVenue, RecordingWallet, StaticMetaResolver};
use cross_arb_execution::venue::{
    MarketMetaResolver, OrderState, OrderStatusReport, PlaceOrderResponse, VenueClient,
};
use cross_arb_execution::{DeclineReason, ExecuteOutcome, VenueContracts};

// =============================================================================
// Fixtures
// =============================================================================

const MARKET: MarketId = MarketId([0xAA; 32]);
const USDT: Address = Address([0x01; 20]);
const EOA: Address = Address([0xEE; 20]);
const SMART: Address = Address([0x5A; 20]);
const WALLET_OWNER: Address = Address([0xEE; 20]);
const PREDICT_CTF: Address = Address([0xC1; 20]);
const OPINION_CTF: Address = Address([0xC2; 20]);

struct Harness {
    predict: Arc<PaperVenue>,
    opinion: Arc<PaperVenue>,
    chain: Arc<StaticChainReader>,
    wallet: Arc<RecordingWallet>,
    executor: Executor,
}

/// Builds an executor wired to paper venues. `predict` is the reliable deep
/// venue, `opinion` the thin one whose leg goes first. The EOA starts with
/// 100 USDT.
fn harness(config: ExecutionConfig, smart_account: bool) -> Harness {
    let predict = Arc::new(PaperVenue::new("predict"));
    let opinion = Arc::new(PaperVenue::new("opinion"));

    let predict_meta = Arc::new(StaticMetaResolver::new());
    predict_meta.insert(
        MARKET,
        MarketMeta {
            condition_id: ConditionId([0xF1; 32]),
            yes_token_id: "101".to_string(),
            no_token_id: "102".to_string(),
            venue_market_id: Some("btc-above-100k".to_string()),
        },
    );
    let opinion_meta = Arc::new(StaticMetaResolver::new());
    opinion_meta.insert(
        MARKET,
        MarketMeta {
            condition_id: ConditionId([0xF2; 32]),
            yes_token_id: "201".to_string(),
            no_token_id: "202".to_string(),
            venue_market_id: None,
        },
    );

    let chain = Arc::new(StaticChainReader::new());
    chain.set_erc20_balance(USDT, EOA, usdt_to_wei(dec!(100)));

    let wallet = Arc::new(RecordingWallet::new(WALLET_OWNER));

    let venues: HashMap<String, Arc<dyn VenueClient>> = HashMap::from([
        ("predict".to_string(), predict.clone() as Arc<dyn VenueClient>),
        ("opinion".to_string(), opinion.clone() as Arc<dyn VenueClient>),
    ]);
    let metas: HashMap<String, Arc<dyn MarketMetaResolver>> = HashMap::from([
        (
            "predict".to_string(),
            predict_meta as Arc<dyn MarketMetaResolver>,
        ),
        (
            "opinion".to_string(),
            opinion_meta as Arc<dyn MarketMetaResolver>,
        ),
    ]);
    let contracts = HashMap::from([
        (
            "predict".to_string(),
            VenueContracts {
                ctf: PREDICT_CTF,
                collateral: USDT,
            },
        ),
        (
            "opinion".to_string(),
            VenueContracts {
                ctf: OPINION_CTF,
                collateral: USDT,
            },
        ),
    ]);

    let executor = Executor::new(
        config,
        Collaborators {
            venues,
            metas,
            chain: chain.clone() as Arc<dyn ChainReader>,
            funding: FundingAccounts {
                eoa: EOA,
                smart_account: smart_account.then_some(SMART),
                usdt: USDT,
            },
            contracts,
            wallet: Some(wallet.clone() as Arc<dyn WalletAccount>),
        },
    );

    Harness {
        predict,
        opinion,
        chain,
        wallet,
        executor,
    }
}

fn opportunity() -> ArbOpportunity {
    ArbOpportunity {
        market_id: MARKET,
        protocol_a: "predict".to_string(),
        protocol_b: "opinion".to_string(),
        buy_yes_on_a: true,
        yes_price_a: dec!(0.45),
        no_price_b: dec!(0.50),
        total_cost: dec!(0.95),
        spread_bps: dec!(500),
        est_profit: dec!(0.05),
        liquidity_a: dec!(1000),
        liquidity_b: dec!(1000),
        quoted_at: Utc::now(),
    }
}

fn position_outcome(outcome: ExecuteOutcome) -> ClobPosition {
    match outcome {
        ExecuteOutcome::Position(pos) => pos,
        ExecuteOutcome::Declined(reason) => panic!("expected position, declined: {reason}"),
    }
}

fn cooldown_remaining(executor: &Executor) -> chrono::Duration {
    let snapshot = executor.cooldowns_snapshot();
    let until = snapshot
        .get(&MARKET)
        .copied()
        .expect("cooldown entry for market");
    until - Utc::now()
}

// =============================================================================
// Dry-run happy path
// =============================================================================

#[tokio::test(start_paused = true)]
async fn dry_run_places_both_legs_and_reports_filled() {
    let h = harness(ExecutionConfig::default().with_dry_run(true), false);

    let outcome = h.executor.execute_best(&opportunity(), dec!(10)).await.unwrap();
    let position = position_outcome(outcome);

    assert_eq!(position.status, PositionStatus::Filled);
    assert!(!h.executor.is_paused());
    assert_eq!(h.predict.placed_orders().len(), 1);
    assert_eq!(h.opinion.placed_orders().len(), 1);
    // Equal per-leg sizing: one wallet funds both legs, so each gets half.
    assert_eq!(h.predict.placed_orders()[0].size_usdt, dec!(5));
    assert_eq!(h.opinion.placed_orders()[0].size_usdt, dec!(5));
    assert!(position.leg_a.filled && position.leg_b.filled);
    assert_eq!(h.executor.stats().filled, 1);
}

// =============================================================================
// Unreliable leg rejected
// =============================================================================

#[tokio::test(start_paused = true)]
async fn unreliable_rejection_cools_market_and_declines() {
    let h = harness(ExecutionConfig::default(), false);
    h.opinion
        .push_place_response(PlaceOrderResponse::rejected("crash"));

    let outcome = h.executor.execute_best(&opportunity(), dec!(10)).await.unwrap();

    match outcome {
        ExecuteOutcome::Declined(DeclineReason::UnreliableRejected { venue, reason }) => {
            assert_eq!(venue, "opinion");
            assert_eq!(reason, "crash");
        }
        other => panic!("expected UnreliableRejected, got {other:?}"),
    }

    // The reliable venue was never touched: the unreliable leg goes first.
    assert!(h.predict.placed_orders().is_empty());
    assert_eq!(h.opinion.placed_orders().len(), 1);

    let remaining = cooldown_remaining(&h.executor);
    assert!(remaining > chrono::Duration::minutes(29));
    assert!(remaining <= chrono::Duration::minutes(30));
    assert!(!h.executor.is_paused());
}

#[tokio::test(start_paused = true)]
async fn cooled_market_blocks_all_venue_calls() {
    let h = harness(ExecutionConfig::default(), false);
    h.opinion
        .push_place_response(PlaceOrderResponse::rejected("crash"));
    let _ = h.executor.execute_best(&opportunity(), dec!(10)).await.unwrap();
    let calls_after_first = h.opinion.placed_orders().len();

    let outcome = h.executor.execute_best(&opportunity(), dec!(10)).await.unwrap();
    assert!(matches!(
        outcome,
        ExecuteOutcome::Declined(DeclineReason::CooldownActive { .. })
    ));
    assert_eq!(h.opinion.placed_orders().len(), calls_after_first);
    assert!(h.predict.placed_orders().is_empty());
}

// =============================================================================
// Unreliable leg placed but never filled
// =============================================================================

#[tokio::test(start_paused = true)]
async fn unfilled_first_leg_returns_expired_with_short_cooldown() {
    let h = harness(ExecutionConfig::default(), true);
    h.chain.set_erc20_balance(USDT, SMART, usdt_to_wei(dec!(10)));
    // Accepted without a reported fill; the smart-account balance never moves.
    h.opinion
        .push_place_response(PlaceOrderResponse::accepted("op-1"));

    let outcome = h.executor.execute_best(&opportunity(), dec!(4)).await.unwrap();
    let position = position_outcome(outcome);

    assert_eq!(position.status, PositionStatus::Expired);
    assert!(h.predict.placed_orders().is_empty());
    assert!(!position.leg_a.filled && !position.leg_b.filled);
    // Leg B carries the placed-but-expired order id; leg A was never placed.
    assert_eq!(position.leg_b.order_id, "op-1");
    assert!(position.leg_a.order_id.is_empty());

    let remaining = cooldown_remaining(&h.executor);
    assert!(remaining > chrono::Duration::minutes(4));
    assert!(remaining <= chrono::Duration::minutes(5));
    assert!(!h.executor.is_paused());
    assert_eq!(h.executor.stats().expired, 1);
}

// =============================================================================
// Partial fill with systematic unwind
// =============================================================================

#[tokio::test(start_paused = true)]
async fn partial_with_all_sells_rejected_stays_paused() {
    let h = harness(ExecutionConfig::default(), true);
    // Smart-account delta of 2 USDT on an initial 10 proves the first leg
    // filled (size 3.9 expects > 1.95).
    h.chain.push_erc20_balance(USDT, SMART, usdt_to_wei(dec!(10)));
    h.chain.push_erc20_balance(USDT, SMART, usdt_to_wei(dec!(8)));
    h.opinion
        .push_place_response(PlaceOrderResponse::accepted("op-1"));
    // Reliable placement succeeds but the EOA balance never moves.
    // All three unwind SELLs are rejected outright.
    for _ in 0..3 {
        h.opinion
            .push_place_response(PlaceOrderResponse::rejected("sell refused"));
    }

    let outcome = h.executor.execute_best(&opportunity(), dec!(3.9)).await.unwrap();
    let position = position_outcome(outcome);

    assert_eq!(position.status, PositionStatus::Partial);
    assert!(h.executor.is_paused(), "systematic unwind must keep the pause");
    assert!(cooldown_remaining(&h.executor) > chrono::Duration::minutes(29));

    // 1 BUY + 3 SELL attempts on the unreliable venue, 1 BUY on the reliable.
    assert_eq!(h.opinion.placed_orders().len(), 4);
    assert_eq!(h.predict.placed_orders().len(), 1);
    let sells: Vec<_> = h
        .opinion
        .placed_orders()
        .into_iter()
        .filter(|order| order.side == Side::Sell)
        .collect();
    assert_eq!(sells.len(), 3);

    let stats = h.executor.stats();
    assert_eq!(stats.partial, 1);
    assert_eq!(stats.unwinds_systematic, 1);
}

// =============================================================================
// Partial fill with transient unwind
// =============================================================================

#[tokio::test(start_paused = true)]
async fn partial_with_book_sighted_sells_auto_unpauses() {
    let h = harness(ExecutionConfig::default(), true);
    h.chain.push_erc20_balance(USDT, SMART, usdt_to_wei(dec!(10)));
    h.chain.push_erc20_balance(USDT, SMART, usdt_to_wei(dec!(8)));
    h.opinion
        .push_place_response(PlaceOrderResponse::accepted("op-1"));
    for i in 1..=3 {
        let id = format!("unwind-{i}");
        h.opinion
            .push_place_response(PlaceOrderResponse::accepted(&id));
        h.opinion.script_status(
            &id,
            vec![
                OrderStatusReport::unfilled(OrderState::Open),
                OrderStatusReport::unfilled(OrderState::Expired),
            ],
        );
    }

    let outcome = h.executor.execute_best(&opportunity(), dec!(3.9)).await.unwrap();
    let position = position_outcome(outcome);

    assert_eq!(position.status, PositionStatus::Partial);
    assert!(
        !h.executor.is_paused(),
        "orders reached the book; the pause must clear"
    );
    assert_eq!(h.executor.stats().unwinds_transient, 1);
}

// =============================================================================
// Smart-account balance caps sizing
// =============================================================================

#[tokio::test(start_paused = true)]
async fn smart_account_balance_caps_trade_size() {
    let h = harness(
        ExecutionConfig::default().with_min_trade_size(dec!(1)),
        true,
    );
    h.chain.set_erc20_balance(USDT, SMART, usdt_to_wei(dec!(2)));
    // EOA delta after the reliable leg confirms its fill.
    h.chain.push_erc20_balance(USDT, EOA, usdt_to_wei(dec!(100)));
    h.chain.push_erc20_balance(USDT, EOA, usdt_to_wei(dec!(97)));

    let outcome = h.executor.execute_best(&opportunity(), dec!(6)).await.unwrap();
    let position = position_outcome(outcome);

    assert_eq!(position.status, PositionStatus::Filled);
    let opinion_orders = h.opinion.placed_orders();
    assert_eq!(opinion_orders.len(), 1);
    // floor(2 / 1.02, 8dp)
    assert_eq!(opinion_orders[0].size_usdt, dec!(1.96078431));
    assert_eq!(h.predict.placed_orders()[0].size_usdt, dec!(1.96078431));
}

// =============================================================================
// Pre-flight gates
// =============================================================================

#[tokio::test(start_paused = true)]
async fn paused_executor_declines_everything() {
    let h = harness(ExecutionConfig::default(), false);
    // Force a pause through a partial fill, then observe the gate.
    h.chain.push_erc20_balance(USDT, EOA, usdt_to_wei(dec!(10)));
    h.chain.push_erc20_balance(USDT, EOA, usdt_to_wei(dec!(7.5)));
    h.chain.push_erc20_balance(USDT, EOA, usdt_to_wei(dec!(7.5)));
    h.opinion
        .push_place_response(PlaceOrderResponse::accepted("op-1"));
    for _ in 0..3 {
        h.opinion
            .push_place_response(PlaceOrderResponse::rejected("sell refused"));
    }
    let first = h.executor.execute_best(&opportunity(), dec!(8)).await.unwrap();
    assert_eq!(
        position_outcome(first).status,
        PositionStatus::Partial
    );
    assert!(h.executor.is_paused());

    let calls = h.opinion.placed_orders().len();
    let second = h.executor.execute_best(&opportunity(), dec!(8)).await.unwrap();
    assert!(matches!(
        second,
        ExecuteOutcome::Declined(DeclineReason::Paused)
    ));
    assert_eq!(h.opinion.placed_orders().len(), calls);

    // Operator override reopens the gate.
    h.executor.unpause();
    assert!(!h.executor.is_paused());
}

#[tokio::test(start_paused = true)]
async fn stale_quote_declines_without_venue_calls() {
    let h = harness(ExecutionConfig::default().with_dry_run(true), false);
    let mut opp = opportunity();
    opp.quoted_at = Utc::now() - chrono::Duration::milliseconds(15_200);

    let outcome = h.executor.execute_best(&opp, dec!(10)).await.unwrap();
    assert!(matches!(
        outcome,
        ExecuteOutcome::Declined(DeclineReason::StaleQuote { .. })
    ));
    assert!(h.opinion.placed_orders().is_empty());
    assert!(h.predict.placed_orders().is_empty());
}

#[tokio::test(start_paused = true)]
async fn nearly_stale_quote_still_executes() {
    let h = harness(ExecutionConfig::default().with_dry_run(true), false);
    let mut opp = opportunity();
    opp.quoted_at = Utc::now() - chrono::Duration::milliseconds(14_800);

    let outcome = h.executor.execute_best(&opp, dec!(10)).await.unwrap();
    assert!(outcome.position().is_some());
}

#[tokio::test(start_paused = true)]
async fn unknown_venue_declines() {
    let h = harness(ExecutionConfig::default(), false);
    let mut opp = opportunity();
    opp.protocol_b = "ghost".to_string();

    let outcome = h.executor.execute_best(&opp, dec!(10)).await.unwrap();
    assert!(matches!(
        outcome,
        ExecuteOutcome::Declined(DeclineReason::UnknownVenue { venue }) if venue == "ghost"
    ));
}

#[tokio::test(start_paused = true)]
async fn missing_market_meta_declines() {
    let h = harness(ExecutionConfig::default(), false);
    let mut opp = opportunity();
    opp.market_id = MarketId([0xBB; 32]); // not registered with resolvers

    let outcome = h.executor.execute_best(&opp, dec!(10)).await.unwrap();
    assert!(matches!(
        outcome,
        ExecuteOutcome::Declined(DeclineReason::MissingMarketMeta { .. })
    ));
    assert!(h.opinion.placed_orders().is_empty());
}

#[tokio::test(start_paused = true)]
async fn size_at_minimum_proceeds_and_below_declines() {
    // max 4 across one wallet splits to exactly the 2 USDT floor
    let h = harness(ExecutionConfig::default().with_dry_run(true), false);
    let outcome = h.executor.execute_best(&opportunity(), dec!(4)).await.unwrap();
    assert!(outcome.position().is_some());

    let h = harness(ExecutionConfig::default().with_dry_run(true), false);
    let outcome = h.executor.execute_best(&opportunity(), dec!(3.9)).await.unwrap();
    assert!(matches!(
        outcome,
        ExecuteOutcome::Declined(DeclineReason::BelowMinSize { .. })
    ));
    assert!(h.opinion.placed_orders().is_empty());
    assert!(h.predict.placed_orders().is_empty());
}

#[tokio::test(start_paused = true)]
async fn zero_price_opportunity_is_a_programmer_error() {
    let h = harness(ExecutionConfig::default(), false);
    let mut opp = opportunity();
    opp.no_price_b = dec!(0);

    let err = h.executor.execute_best(&opp, dec!(10)).await.unwrap_err();
    assert!(matches!(err, ExecuteError::InvalidOpportunity(_)));
}

// =============================================================================
// poll_for_fills transitions
// =============================================================================

fn open_position(size: rust_decimal::Decimal) -> ClobPosition {
    let mut leg_a = ClobLeg::unplaced("predict", "101", Side::Buy, dec!(0.45), size);
    leg_a.mark_placed("a-1");
    let mut leg_b = ClobLeg::unplaced("opinion", "202", Side::Buy, dec!(0.50), size);
    leg_b.mark_placed("b-1");
    ClobPosition::new(MARKET, PositionStatus::Open, leg_a, leg_b, dec!(500))
}

#[tokio::test(start_paused = true)]
async fn poll_both_filled_reports_filled() {
    let h = harness(ExecutionConfig::default(), false);
    h.predict
        .script_status("a-1", vec![OrderStatusReport::filled(dec!(5))]);
    h.opinion
        .script_status("b-1", vec![OrderStatusReport::filled(dec!(5))]);

    let mut position = open_position(dec!(5));
    let status = h.executor.poll_for_fills(&mut position).await.unwrap();

    assert_eq!(status, PositionStatus::Filled);
    assert_eq!(position.status, PositionStatus::Filled);
    assert!(position.leg_a.filled && position.leg_b.filled);
    assert!(!h.executor.is_paused());
}

#[tokio::test(start_paused = true)]
async fn poll_both_dead_reports_expired() {
    let h = harness(ExecutionConfig::default(), false);
    h.predict
        .script_status("a-1", vec![OrderStatusReport::unfilled(OrderState::Expired)]);
    h.opinion
        .script_status("b-1", vec![OrderStatusReport::unfilled(OrderState::Cancelled)]);

    let mut position = open_position(dec!(5));
    let status = h.executor.poll_for_fills(&mut position).await.unwrap();

    assert_eq!(status, PositionStatus::Expired);
    assert!(!h.executor.is_paused());
}

#[tokio::test(start_paused = true)]
async fn poll_split_fill_pauses_and_unwinds_filled_side() {
    let h = harness(ExecutionConfig::default(), false);
    h.predict
        .script_status("a-1", vec![OrderStatusReport::filled(dec!(5))]);
    h.opinion
        .script_status("b-1", vec![OrderStatusReport::unfilled(OrderState::Expired)]);
    // The filled side's unwind SELLs never reach the book.
    for _ in 0..3 {
        h.predict
            .push_place_response(PlaceOrderResponse::rejected("sell refused"));
    }

    let mut position = open_position(dec!(5));
    let status = h.executor.poll_for_fills(&mut position).await.unwrap();

    assert_eq!(status, PositionStatus::Partial);
    assert!(h.executor.is_paused());
    // Unwind hit the venue holding the naked leg, not the other one.
    let predict_sells = h
        .predict
        .placed_orders()
        .into_iter()
        .filter(|order| order.side == Side::Sell)
        .count();
    assert_eq!(predict_sells, 3);
    assert!(h.opinion.placed_orders().is_empty());
}

#[tokio::test(start_paused = true)]
async fn poll_timeout_cancels_resting_orders() {
    let config = ExecutionConfig::default()
        .with_fill_poll(Duration::from_millis(50), Duration::from_millis(200));
    let h = harness(config, false);
    h.predict
        .script_status("a-1", vec![OrderStatusReport::unfilled(OrderState::Open)]);
    h.opinion
        .script_status("b-1", vec![OrderStatusReport::unfilled(OrderState::Open)]);

    let mut position = open_position(dec!(5));
    let status = h.executor.poll_for_fills(&mut position).await.unwrap();

    assert_eq!(status, PositionStatus::Expired);
    assert_eq!(h.predict.cancelled_orders(), vec!["a-1".to_string()]);
    assert_eq!(h.opinion.cancelled_orders(), vec!["b-1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn poll_timeout_with_one_fill_unwinds_it() {
    let config = ExecutionConfig::default()
        .with_fill_poll(Duration::from_millis(50), Duration::from_millis(200));
    let h = harness(config, false);
    h.predict
        .script_status("a-1", vec![OrderStatusReport::unfilled(OrderState::Open)]);
    h.opinion
        .script_status("b-1", vec![OrderStatusReport::filled(dec!(5))]);
    for _ in 0..3 {
        h.opinion
            .push_place_response(PlaceOrderResponse::rejected("sell refused"));
    }

    let mut position = open_position(dec!(5));
    let status = h.executor.poll_for_fills(&mut position).await.unwrap();

    assert_eq!(status, PositionStatus::Partial);
    assert!(h.executor.is_paused());
    // The unfilled resting order was taken off the book.
    assert_eq!(h.predict.cancelled_orders(), vec!["a-1".to_string()]);
}

// =============================================================================
// close_resolved
// =============================================================================

fn filled_position() -> ClobPosition {
    let mut leg_a = ClobLeg::unplaced("predict", "101", Side::Buy, dec!(0.45), dec!(5));
    leg_a.mark_placed("a-1");
    leg_a.mark_filled(dec!(5));
    let mut leg_b = ClobLeg::unplaced("opinion", "202", Side::Buy, dec!(0.50), dec!(5));
    leg_b.mark_placed("b-1");
    leg_b.mark_filled(dec!(5));
    ClobPosition::new(MARKET, PositionStatus::Filled, leg_a, leg_b, dec!(500))
}

fn token_word(id: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&id.to_be_bytes());
    word
}

#[tokio::test(start_paused = true)]
async fn unresolved_market_redeems_nothing() {
    let h = harness(ExecutionConfig::default(), false);
    let mut positions = vec![filled_position()];

    let closed = h.executor.close_resolved(&mut positions).await.unwrap();
    assert_eq!(closed, 0);
    assert_eq!(positions[0].status, PositionStatus::Filled);
    assert!(h.wallet.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn resolved_market_redeems_held_legs_and_closes() {
    let h = harness(ExecutionConfig::default(), false);
    h.chain
        .set_payout_denominator(PREDICT_CTF, ConditionId([0xF1; 32]), 1);
    h.chain
        .set_erc1155_balance(PREDICT_CTF, WALLET_OWNER, token_word(101), 11);
    h.chain
        .set_erc1155_balance(OPINION_CTF, WALLET_OWNER, token_word(202), 10);

    let mut positions = vec![filled_position()];
    let closed = h.executor.close_resolved(&mut positions).await.unwrap();

    assert_eq!(closed, 1);
    assert_eq!(positions[0].status, PositionStatus::Closed);
    assert!(positions[0].closed_at.is_some());

    let calls = h.wallet.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, PREDICT_CTF);
    assert_eq!(calls[1].0, OPINION_CTF);
    // Leg A holds the YES token (index set 1), leg B the NO token (2).
    assert_eq!(calls[0].1[4 + 32 * 5 + 31], 1);
    assert_eq!(calls[1].1[4 + 32 * 5 + 31], 2);
    assert_eq!(h.executor.stats().positions_redeemed, 1);
}

#[tokio::test(start_paused = true)]
async fn close_resolved_is_idempotent_on_closed_positions() {
    let h = harness(ExecutionConfig::default(), false);
    h.chain
        .set_payout_denominator(PREDICT_CTF, ConditionId([0xF1; 32]), 1);
    h.chain
        .set_erc1155_balance(PREDICT_CTF, WALLET_OWNER, token_word(101), 11);

    let mut positions = vec![filled_position()];
    let first = h.executor.close_resolved(&mut positions).await.unwrap();
    assert_eq!(first, 1);
    let calls_after_first = h.wallet.calls().len();

    let second = h.executor.close_resolved(&mut positions).await.unwrap();
    assert_eq!(second, 0);
    assert_eq!(h.wallet.calls().len(), calls_after_first);
}

#[tokio::test(start_paused = true)]
async fn redemption_failure_keeps_position_open() {
    let h = harness(ExecutionConfig::default(), false);
    h.chain
        .set_payout_denominator(PREDICT_CTF, ConditionId([0xF1; 32]), 1);
    h.chain
        .set_erc1155_balance(PREDICT_CTF, WALLET_OWNER, token_word(101), 11);
    h.wallet.fail_calls(true);

    let mut positions = vec![filled_position()];
    let closed = h.executor.close_resolved(&mut positions).await.unwrap();

    assert_eq!(closed, 0);
    assert_eq!(positions[0].status, PositionStatus::Filled);
}

#[tokio::test(start_paused = true)]
async fn legs_without_held_tokens_are_skipped() {
    let h = harness(ExecutionConfig::default(), false);
    h.chain
        .set_payout_denominator(PREDICT_CTF, ConditionId([0xF1; 32]), 1);
    // Only leg A's token is held; leg B redeems nothing but does not block.
    h.chain
        .set_erc1155_balance(PREDICT_CTF, WALLET_OWNER, token_word(101), 11);

    let mut positions = vec![filled_position()];
    let closed = h.executor.close_resolved(&mut positions).await.unwrap();

    assert_eq!(closed, 1);
    assert_eq!(h.wallet.calls().len(), 1);
    assert_eq!(h.wallet.calls()[0].0, PREDICT_CTF);
}

// =============================================================================
// Startup
// =============================================================================

#[tokio::test(start_paused = true)]
async fn authenticate_venues_hits_every_client_once() {
    let h = harness(ExecutionConfig::default(), false);
    h.executor.authenticate_venues().await.unwrap();
    assert_eq!(h.predict.auth_calls(), 1);
    assert_eq!(h.opinion.auth_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_authentication_surfaces() {
    let h = harness(ExecutionConfig::default(), false);
    h.opinion.fail_authentication();
    assert!(h.executor.authenticate_venues().await.is_err());
}

// =============================================================================
// Restored cooldowns
// =============================================================================

#[tokio::test(start_paused = true)]
async fn restored_cooldown_map_blocks_execution() {
    let predict = Arc::new(PaperVenue::new("predict"));
    let opinion = Arc::new(PaperVenue::new("opinion"));
    let chain = Arc::new(StaticChainReader::new());
    chain.set_erc20_balance(USDT, EOA, usdt_to_wei(dec!(100)));

    let venues: HashMap<String, Arc<dyn VenueClient>> = HashMap::from([
        ("predict".to_string(), predict.clone() as Arc<dyn VenueClient>),
        ("opinion".to_string(), opinion.clone() as Arc<dyn VenueClient>),
    ]);
    let executor = Executor::new(
        ExecutionConfig::default(),
        Collaborators {
            venues,
            metas: HashMap::new(),
            chain: chain as Arc<dyn ChainReader>,
            funding: FundingAccounts {
                eoa: EOA,
                smart_account: None,
                usdt: USDT,
            },
            contracts: HashMap::new(),
            wallet: None,
        },
    )
    .with_initial_cooldowns(HashMap::from([(
        MARKET,
        Utc::now() + chrono::Duration::minutes(10),
    )]));

    let outcome = executor.execute_best(&opportunity(), dec!(10)).await.unwrap();
    assert!(matches!(
        outcome,
        ExecuteOutcome::Declined(DeclineReason::CooldownActive { .. })
    ));
    assert!(opinion.placed_orders().is_empty());
}
