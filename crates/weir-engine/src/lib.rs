//! # weir-engine — Stateful incentive accounting.
//!
//! Composes three independent content-addressed stores behind one façade:
//! - [`registry::IncentiveRegistry`] — per-incentive ledger (budget,
//!   accumulator, staked liquidity) with lazy settle-on-touch accrual.
//! - [`ledger::StakeLedger`] — deposit custody records and per-incentive
//!   stake records.
//! - [`vault::RewardVault`] — per-token, per-owner claimable balances.
//!
//! [`engine::StakerEngine`] wires the stores to the host-supplied
//! collaborators (token transfers, position custody, range oracle, caller
//! environment) and serializes every public operation behind a single
//! lock, reproducing the atomic-transaction execution model the
//! accounting rules assume.

pub mod engine;
pub mod ledger;
pub mod registry;
pub mod vault;

pub use engine::{RewardView, StakerEngine};
