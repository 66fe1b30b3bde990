//! Engine constants. All reward amounts are in the reward token's base units.

/// Fixed-point scale for the reward-per-liquidity accumulator.
///
/// `reward_per_liquidity` stores reward-per-unit-liquidity multiplied by
/// this constant so that small per-unit amounts survive integer division.
pub const REWARD_PRECISION: u128 = 1_000_000_000_000;

/// Basis-point denominator: 10,000 bips = 100%.
pub const BPS_PRECISION: u64 = 10_000;

/// Maximum allowed gap between "now" and an incentive's start time at
/// creation (30 days of seconds). Prevents parking funds in far-future
/// programs.
pub const MAX_INCENTIVE_START_LEAD: u64 = 30 * 24 * 60 * 60;

/// Maximum allowed incentive duration (2 years of seconds).
pub const MAX_INCENTIVE_DURATION: u64 = 2 * 365 * 24 * 60 * 60;
