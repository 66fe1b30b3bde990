//! # weir-accrual — Pure reward accrual and penalty math.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! Two calculators, both stateless and pure:
//! - **Pro-rata accrual**: the remaining reward budget is spread over the
//!   remaining program duration, so topping up a live incentive changes
//!   only the future rate, never the past.
//! - **Half-life penalty**: the liquidation penalty halves per decay
//!   period, with linear interpolation inside the partial period and a
//!   basis-point floor, then splits between liquidator and pool.

pub mod accrual;
pub mod penalty;

pub use accrual::ProRataAccrual;
pub use penalty::HalfLifePenalty;
