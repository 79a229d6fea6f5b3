//! Execution core for a cross-venue prediction-market arbitrage agent.
//!
//! Given a detected opportunity — complementary YES/NO asks on two
//! order-book venues summing below one unit of payout — the executor places
//! the two BUY legs with correct sizing, verifies fills against on-chain
//! balance deltas, unwinds naked single legs at bounded loss, and enforces
//! per-market cooldowns plus a global pause gate so a broken configuration
//! cannot compound losses.
//!
//! # Execution discipline
//!
//! The two venues have different reliability profiles. The thin venue's FOK
//! orders expire often, so its leg goes **first**: a fill there is verified
//! (venue-reported quantity, then wallet balance delta) before the deep
//! venue is asked to hedge. A hedge failure flips the executor into the
//! paused state, cools the market down, and launches a progressive-discount
//! SELL unwind. Whether the unwind's orders were ever observed on the book
//! decides if the pause auto-clears (transient liquidity miss) or sticks
//! until an operator intervenes (systematic fault).
//!
//! # Modules
//!
//! - [`venue`]: the injected venue-client capability set
//! - [`executor`]: the stateful core (`execute_best`, `poll_for_fills`,
//!   `close_resolved`)
//! - [`sizer`] / [`verifier`]: pure sizing and fill-classification passes
//! - [`unwinder`]: discount-ladder unwinding and failure classification
//! - [`state`]: pause flag and cooldown map
//! - [`paper`]: simulated collaborators for tests and rehearsal runs
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use cross_arb_chain::StaticChainReader;
//! use cross_arb_core::ExecutionConfig;
//! use cross_arb_execution::executor::{Collaborators, Executor, FundingAccounts};
//! use cross_arb_execution::paper::{PaperVenue, StaticMetaResolver};
//!
//! # fn main() {
//! let venues: HashMap<String, Arc<dyn cross_arb_execution::venue::VenueClient>> =
//!     HashMap::from([
//!         ("predict".to_string(), Arc::new(PaperVenue::new("predict")) as _),
//!         ("opinion".to_string(), Arc::new(PaperVenue::new("opinion")) as _),
//!     ]);
//! let metas = HashMap::from([
//!     ("predict".to_string(), Arc::new(StaticMetaResolver::new()) as _),
//!     ("opinion".to_string(), Arc::new(StaticMetaResolver::new()) as _),
//! ]);
//! let executor = Executor::new(
//!     ExecutionConfig::default().with_dry_run(true),
//!     Collaborators {
//!         venues,
//!         metas,
//!         chain: Arc::new(StaticChainReader::new()),
//!         funding: FundingAccounts {
//!             eoa: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap(),
//!             smart_account: None,
//!             usdt: "0x2791bca1f2de4661ed88a30c99a7a9449aa84174".parse().unwrap(),
//!         },
//!         contracts: HashMap::new(),
//!         wallet: None,
//!     },
//! );
//! # let _ = executor;
//! # }
//! ```

pub mod decline;
pub mod executor;
pub mod paper;
pub mod redeemer;
pub mod shutdown;
pub mod sizer;
pub mod state;
pub mod stats;
pub mod unwinder;
pub mod venue;
pub mod verifier;

pub use decline::{DeclineReason, ExecuteOutcome};
pub use executor::{Collaborators, ExecuteError, Executor, FundingAccounts};
pub use redeemer::VenueContracts;
pub use shutdown::ShutdownSignal;
pub use sizer::{size_per_leg, Sizing, SizingInputs};
pub use state::ExecutorState;
pub use stats::ExecutionStats;
pub use unwinder::UnwindOutcome;
pub use venue::{
    MarketMetaResolver, OrderRequest, OrderState, OrderStatusReport, PlaceOrderResponse,
    TimeInForce, VenueClient, VenueError,
};
pub use verifier::{classify_fill, BalanceSnapshot, FillVerdict};
