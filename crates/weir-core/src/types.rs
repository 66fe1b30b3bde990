//! Core engine types: incentives, deposits, stakes, reward splits.
//!
//! Reward amounts use u64 in the reward token's base units. Position
//! liquidity and the reward-per-liquidity accumulator use u128: the
//! accumulator carries a 1e12 fixed-point scale
//! ([`REWARD_PRECISION`](crate::constants::REWARD_PRECISION)).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{BPS_PRECISION, MAX_INCENTIVE_DURATION, MAX_INCENTIVE_START_LEAD};
use crate::error::{IncentiveError, MathError};

/// An opaque 32-byte account, contract, pool, or token identifier.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The zero address. Never a valid recipient.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create an Address from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Deterministic incentive identifier: BLAKE3 hash of the canonical
/// encoding of an [`IncentiveKey`].
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct IncentiveId(pub [u8; 32]);

impl IncentiveId {
    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for IncentiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// The five fields that uniquely identify an incentive program.
///
/// Two calls with the same key always address the same incentive; changing
/// any field produces a distinct program.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash,
    bincode::Encode, bincode::Decode,
)]
pub struct IncentiveKey {
    /// Token the reward budget is denominated in.
    pub reward_token: Address,
    /// Pool whose positions are eligible to stake.
    pub pool: Address,
    /// Unix time at which accrual begins.
    pub start_time: u64,
    /// Unix time at which accrual stops.
    pub end_time: u64,
    /// Recipient of the unaccrued budget when the incentive is ended.
    pub refundee: Address,
}

impl IncentiveKey {
    /// Compute the incentive ID (BLAKE3 hash of the canonical encoding).
    ///
    /// Uses bincode with standard config for deterministic serialization.
    pub fn id(&self) -> Result<IncentiveId, MathError> {
        let encoded = bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| MathError::Serialization(e.to_string()))?;
        Ok(IncentiveId(blake3::hash(&encoded).into()))
    }

    /// Duration of the program in seconds.
    ///
    /// Zero when `end_time <= start_time` (rejected at creation).
    pub fn duration(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }

    /// Validate the time window for a program being created at `now`.
    pub fn validate_schedule(&self, now: u64) -> Result<(), IncentiveError> {
        if self.start_time < now {
            return Err(IncentiveError::StartInPast { start: self.start_time, now });
        }
        if self.start_time - now > MAX_INCENTIVE_START_LEAD {
            return Err(IncentiveError::StartTooFarAhead { start: self.start_time, now });
        }
        if self.end_time <= self.start_time {
            return Err(IncentiveError::EndNotAfterStart {
                start: self.start_time,
                end: self.end_time,
            });
        }
        let duration = self.duration();
        if duration > MAX_INCENTIVE_DURATION {
            return Err(IncentiveError::DurationTooLong { duration, max: MAX_INCENTIVE_DURATION });
        }
        Ok(())
    }
}

/// Per-incentive policy knobs, set by the operator.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct IncentiveConfig {
    /// Minimum `tick_upper - tick_lower` for a position to be eligible.
    pub min_tick_width: u32,
    /// Half-life of the liquidation penalty, in seconds.
    pub penalty_decay_period: u64,
    /// Floor of the penalty as bips of the raw reward.
    pub min_penalty_bips: u64,
    /// Minimum holding time before an in-range voluntary exit, in seconds.
    pub min_exit_duration: u64,
    /// Liquidator's share of the penalty, in bips.
    pub liquidation_bonus_bips: u64,
    /// Averaging window for the range oracle; 0 selects the spot tick.
    pub twap_seconds: u64,
}

impl IncentiveConfig {
    /// Validate policy bounds.
    pub fn validate(&self) -> Result<(), IncentiveError> {
        if self.min_tick_width == 0 {
            return Err(IncentiveError::ZeroMinTickWidth);
        }
        if self.penalty_decay_period == 0 {
            return Err(IncentiveError::ZeroPenaltyDecayPeriod);
        }
        if self.min_penalty_bips > BPS_PRECISION {
            return Err(IncentiveError::BipsOutOfRange { value: self.min_penalty_bips });
        }
        if self.liquidation_bonus_bips > BPS_PRECISION {
            return Err(IncentiveError::BipsOutOfRange { value: self.liquidation_bonus_bips });
        }
        Ok(())
    }
}

/// Ledger state of one incentive program.
///
/// Conservation: reward enters only via funding, moves from
/// `remaining_reward` to `accounted_reward` as it accrues, and leaves only
/// through unstake payouts or the end-of-program refund.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Incentive {
    /// Budget not yet accrued to any stake.
    pub remaining_reward: u64,
    /// Budget accrued to stakes but not yet paid out or refunded.
    pub accounted_reward: u64,
    /// Monotonic reward-per-unit-liquidity accumulator, scaled by
    /// [`REWARD_PRECISION`](crate::constants::REWARD_PRECISION).
    pub reward_per_liquidity: u128,
    /// Sum of the liquidity of all live stakes.
    pub total_liquidity_staked: u128,
    /// Timestamp the accumulator was last settled to. Capped at `end_time`.
    pub last_accrue_time: u64,
}

impl Incentive {
    /// Total reward still held for this program (unaccrued + accrued-unpaid).
    pub fn total_unclaimed(&self) -> u64 {
        // Funding caps at u64::MAX; both parts originate from one budget.
        self.remaining_reward.saturating_add(self.accounted_reward)
    }
}

/// Custody record for one deposited position token.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Deposit {
    /// Sole authority to stake, withdraw, or transfer this deposit.
    pub owner: Address,
    /// Number of incentives this token is currently staked in.
    pub number_of_stakes: u64,
    /// Lower tick of the position, snapshotted at deposit time.
    pub tick_lower: i32,
    /// Upper tick of the position, snapshotted at deposit time.
    pub tick_upper: i32,
}

impl Deposit {
    /// Width of the deposited position's range in ticks.
    pub fn tick_width(&self) -> u32 {
        (self.tick_upper as i64 - self.tick_lower as i64).max(0) as u32
    }

    /// Whether `tick` falls inside the position's half-open range.
    pub fn contains_tick(&self, tick: i32) -> bool {
        self.tick_lower <= tick && tick < self.tick_upper
    }
}

/// One position's participation in one incentive.
///
/// Created on stake, deleted on unstake. `liquidity` is a snapshot and
/// never changes for the life of the stake.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Stake {
    /// Accumulator value at stake time.
    pub last_reward_per_liquidity: u128,
    /// Position liquidity snapshot.
    pub liquidity: u128,
    /// Unix time the stake was created.
    pub staked_since: u64,
}

/// Position data returned by the position-info collaborator.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionInfo {
    /// Pool the position provides liquidity to.
    pub pool: Address,
    /// Lower tick of the range.
    pub tick_lower: i32,
    /// Upper tick of the range.
    pub tick_upper: i32,
    /// Current position liquidity.
    pub liquidity: u128,
}

impl PositionInfo {
    /// Width of the position's range in ticks.
    pub fn tick_width(&self) -> u32 {
        (self.tick_upper as i64 - self.tick_lower as i64).max(0) as u32
    }

    /// Whether `tick` falls inside the half-open range `[lower, upper)`.
    pub fn contains_tick(&self, tick: i32) -> bool {
        self.tick_lower <= tick && tick < self.tick_upper
    }
}

/// Result of settling an incentive's accumulator forward to `settled_to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Accrual {
    /// Increment to apply to `reward_per_liquidity`.
    pub per_liquidity_delta: u128,
    /// Reward moved from `remaining_reward` to `accounted_reward`.
    pub reward_delta: u64,
    /// New `last_accrue_time` (input time clamped to `end_time`).
    pub settled_to: u64,
}

/// Three-way division of a stake's accrued reward on exit.
///
/// The parts always sum to the raw reward. On a voluntary exit the split is
/// trivially `(reward, 0, 0)`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RewardSplit {
    /// Paid to the position owner.
    pub owner_earning: u64,
    /// Paid to the liquidating caller (zero unless a liquidation).
    pub liquidator_earning: u64,
    /// Returned to the incentive's remaining budget.
    pub refunded: u64,
}

impl RewardSplit {
    /// A voluntary-exit split: the whole reward goes to the owner.
    pub fn all_to_owner(reward: u64) -> Self {
        Self { owner_earning: reward, liquidator_earning: 0, refunded: 0 }
    }

    /// Sum of all three parts. `None` on overflow.
    pub fn total(&self) -> Option<u64> {
        self.owner_earning
            .checked_add(self.liquidator_earning)?
            .checked_add(self.refunded)
    }
}
