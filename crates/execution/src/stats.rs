//! Execution counters.

use serde::Serialize;

/// Running counters over an executor's lifetime. Purely observational.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ExecutionStats {
    /// Opportunities handed to `execute_best`.
    pub opportunities_evaluated: u64,
    /// Declines at the pause gate.
    pub declined_paused: u64,
    /// Declines from an active cooldown.
    pub declined_cooldown: u64,
    /// Declines from stale quotes.
    pub declined_stale: u64,
    /// Declines from missing clients or metadata.
    pub declined_missing: u64,
    /// Declines from sizing below the minimum.
    pub declined_size: u64,
    /// First-leg rejections on the unreliable venue.
    pub unreliable_rejected: u64,
    /// Positions returned EXPIRED (first leg did not fill).
    pub expired: u64,
    /// Positions returned FILLED.
    pub filled: u64,
    /// Positions returned PARTIAL.
    pub partial: u64,
    /// Unwinds where the SELL itself filled.
    pub unwinds_recovered: u64,
    /// Unwinds classified transient (order seen on book, never filled).
    pub unwinds_transient: u64,
    /// Unwinds classified systematic (never reached the book).
    pub unwinds_systematic: u64,
    /// Positions redeemed by `close_resolved`.
    pub positions_redeemed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zeroed() {
        let stats = ExecutionStats::default();
        assert_eq!(stats.opportunities_evaluated, 0);
        assert_eq!(stats.filled, 0);
        assert_eq!(stats.unwinds_systematic, 0);
    }
}
