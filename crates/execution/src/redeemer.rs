//! Market-resolution redemption.
//!
//! FILLED positions eventually resolve on-chain: the CTF payout denominator
//! for the condition turns nonzero. Each leg's held outcome tokens then
//! redeem for collateral via `redeemPositions`. Redemption is best-effort
//! per leg; one leg failing never blocks its sibling, and the position only
//! closes once at least one leg redeemed.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use chrono::Utc;
use cross_arb_chain::{ctf, Address, ChainReader, WalletAccount};
use cross_arb_core::types::{ClobLeg, ClobPosition, MarketMeta, PositionStatus};

use crate::venue::MarketMetaResolver;

/// Per-venue settlement-chain contract addresses.
#[derive(Debug, Clone, Copy)]
pub struct VenueContracts {
    /// Conditional-token framework contract holding outcome shares.
    pub ctf: Address,

    /// Collateral token the CTF pays out in.
    pub collateral: Address,
}

/// YES outcome index set in the CTF partition.
const YES_INDEX_SET: u64 = 1;

/// NO outcome index set in the CTF partition.
const NO_INDEX_SET: u64 = 2;

pub(crate) struct RedeemContext<'a> {
    pub metas: &'a HashMap<String, Arc<dyn MarketMetaResolver>>,
    pub contracts: &'a HashMap<String, VenueContracts>,
    pub chain: &'a Arc<dyn ChainReader>,
    pub wallet: &'a Arc<dyn WalletAccount>,
}

/// Scans FILLED positions for resolved markets and redeems their legs.
/// Returns how many positions were closed.
pub(crate) async fn close_resolved(
    ctx: &RedeemContext<'_>,
    positions: &mut [ClobPosition],
) -> usize {
    let mut closed = 0;

    for position in positions.iter_mut() {
        if position.status != PositionStatus::Filled {
            continue;
        }

        let meta_a = leg_meta(ctx, position, &position.leg_a).await;
        let meta_b = leg_meta(ctx, position, &position.leg_b).await;

        if !market_resolved(ctx, &position.leg_a, meta_a.as_ref()).await
            && !market_resolved(ctx, &position.leg_b, meta_b.as_ref()).await
        {
            continue;
        }

        info!(
            market = %position.market_id,
            position = %position.id,
            "market resolved; redeeming legs"
        );

        let mut redeemed_any = false;
        for (leg, meta) in [(&position.leg_a, &meta_a), (&position.leg_b, &meta_b)] {
            let Some(meta) = meta else {
                debug!(platform = %leg.platform, "no metadata for leg; skipping redemption");
                continue;
            };
            if redeem_leg(ctx, leg, meta).await {
                redeemed_any = true;
            }
        }

        if redeemed_any {
            position.status = PositionStatus::Closed;
            position.closed_at = Some(Utc::now());
            closed += 1;
        }
    }

    closed
}

async fn leg_meta(
    ctx: &RedeemContext<'_>,
    position: &ClobPosition,
    leg: &ClobLeg,
) -> Option<MarketMeta> {
    let resolver = ctx.metas.get(&leg.platform)?;
    resolver.market_meta(position.market_id).await
}

async fn market_resolved(
    ctx: &RedeemContext<'_>,
    leg: &ClobLeg,
    meta: Option<&MarketMeta>,
) -> bool {
    let Some(meta) = meta else { return false };
    let Some(contracts) = ctx.contracts.get(&leg.platform) else {
        return false;
    };
    match ctx
        .chain
        .payout_denominator(contracts.ctf, meta.condition_id)
        .await
    {
        Ok(denominator) => denominator > 0,
        Err(e) => {
            warn!(platform = %leg.platform, error = %e, "payout denominator read failed");
            false
        }
    }
}

/// Redeems one leg's held tokens. Returns whether a redemption succeeded.
async fn redeem_leg(ctx: &RedeemContext<'_>, leg: &ClobLeg, meta: &MarketMeta) -> bool {
    let Some(contracts) = ctx.contracts.get(&leg.platform) else {
        debug!(platform = %leg.platform, "no contracts configured for leg; skipping");
        return false;
    };

    let token_word = match ctf::token_id_to_u256(&leg.token_id) {
        Ok(word) => word,
        Err(e) => {
            warn!(platform = %leg.platform, token = %leg.token_id, error = %e, "unparseable token id");
            return false;
        }
    };

    let held = match ctx
        .chain
        .erc1155_balance(contracts.ctf, ctx.wallet.address(), token_word)
        .await
    {
        Ok(held) => held,
        Err(e) => {
            warn!(platform = %leg.platform, error = %e, "outcome token balance read failed");
            return false;
        }
    };
    if held == 0 {
        debug!(platform = %leg.platform, token = %leg.token_id, "no tokens held; nothing to redeem");
        return false;
    }

    let index_set = if leg.token_id == meta.yes_token_id {
        YES_INDEX_SET
    } else {
        NO_INDEX_SET
    };
    let calldata =
        ctf::redeem_positions_calldata(contracts.collateral, meta.condition_id, &[index_set]);

    match ctx.wallet.send_contract_call(contracts.ctf, calldata).await {
        Ok(tx_hash) => {
            info!(
                platform = %leg.platform,
                token = %leg.token_id,
                index_set,
                %tx_hash,
                "leg redeemed"
            );
            true
        }
        Err(e) => {
            warn!(platform = %leg.platform, token = %leg.token_id, error = %e, "redemption failed");
            false
        }
    }
}
