//! # Liquidity Keeper - Batched AMM Ledger and Settlement
//!
//! ## Purpose
//!
//! Owns the state of the batched liquidity module: the pool registry, one batch
//! per pool with its deposit, withdrawal and swap queues, and the escrow that
//! holds requested coins until they settle. Requests are queued during the block;
//! at each settlement instant the whole batch clears at once, so every order in
//! an interval sees the same price.
//!
//! ## Integration Points
//!
//! - **Host seams**: [`KvStore`] for persistence, [`BankKeeper`] for balances and
//!   supply; [`MemStore`] and [`MemBank`] are the in-memory versions
//! - **Matching**: clearing price and fill allocation come from the `amm` crate
//! - **Configuration**: [`Keeper::with_config`] takes a `liquidity-config` snapshot
//! - **Lifecycle**: [`LiquidityApp`] implements [`Stateful`] over [`BlockEvent`]s
//!
//! ## Architecture Role
//!
//! ```text
//! Deliver(msg) ──► validate ──► escrow ──► queue record (executed = false)
//!                                              │
//! EndBlock ─────► swaps ─► deposits ─► withdrawals ─► batch.executed = true
//!                   │          │            │
//!                   └── one multi-send per step, refunds on failure
//!                                              │
//! BeginBlock ───► reset partial fills ─► purge finished ─► next batch index
//! ```
//!
//! ## Failure Model
//!
//! Rejections return before any state changes. Settlement failures refund the
//! escrowed coins and mark the record for deletion. Broken invariants surface as
//! `LiquidityError::InvariantBroken` and abort the block step.

pub mod app;
pub mod bank;
pub mod coordinator;
pub mod escrow;
pub mod genesis;
pub mod invariants;
pub mod keeper;
pub mod ledger;
pub mod registry;
pub mod settlement;
pub mod store;
pub mod swap;
pub mod telemetry;
pub mod traits;

pub use app::{AppError, BlockEvent, LiquidityApp, MsgResponse};
pub use bank::MemBank;
pub use escrow::TransferBatch;
pub use keeper::{Keeper, COMMUNITY_POOL_ACCOUNT, ESCROW_ACCOUNT};
pub use store::MemStore;
pub use telemetry::init_tracing;
pub use traits::{BankKeeper, KvStore, Stateful};
