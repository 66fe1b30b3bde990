//! Accrual engine implementing the [`AccrualCalculator`] trait.
//!
//! Converts a fixed reward budget into a continuously-accruing
//! reward-per-unit-liquidity accumulator using lazy, pull-based settlement:
//! every state-mutating operation settles the touched incentive forward
//! from its `last_accrue_time` before reading or writing the accumulator.
//! All arithmetic is integer-only with u128 intermediates.

use weir_core::constants::REWARD_PRECISION;
use weir_core::error::MathError;
use weir_core::traits::AccrualCalculator;
use weir_core::types::Accrual;

/// The production accrual calculator.
///
/// Implements [`AccrualCalculator`] with pro-rata distribution of the
/// *remaining* budget over the *remaining* duration:
///
/// `reward_delta = remaining * (now - last) / (end - last)`
///
/// This makes the schedule self-correcting: funding a live incentive
/// changes only the future rate. Division truncates toward zero; the
/// resulting dust stays in `remaining_reward` and is reclaimable when the
/// incentive ends.
#[derive(Debug, Clone, Default)]
pub struct ProRataAccrual;

impl ProRataAccrual {
    /// Create a new ProRataAccrual.
    pub fn new() -> Self {
        Self
    }
}

impl AccrualCalculator for ProRataAccrual {
    fn accrue(
        &self,
        remaining_reward: u64,
        total_liquidity: u128,
        end_time: u64,
        last_accrue_time: u64,
        now: u64,
    ) -> Result<Accrual, MathError> {
        let now = now.min(end_time);

        // Nothing elapsed after clamping: no-op, time does not move backwards.
        if now <= last_accrue_time {
            return Ok(Accrual {
                per_liquidity_delta: 0,
                reward_delta: 0,
                settled_to: last_accrue_time,
            });
        }

        // No staked liquidity: the interval burns but the budget is kept.
        // Advancing `settled_to` stretches the remaining budget over the
        // remaining duration once liquidity returns.
        if total_liquidity == 0 {
            return Ok(Accrual { per_liquidity_delta: 0, reward_delta: 0, settled_to: now });
        }

        // now > last and now <= end, so the denominator is positive.
        let elapsed = (now - last_accrue_time) as u128;
        let denom = (end_time - last_accrue_time) as u128;

        let reward_delta = (remaining_reward as u128)
            .checked_mul(elapsed)
            .ok_or(MathError::ArithmeticOverflow)?
            / denom;

        let per_liquidity_delta = reward_delta
            .checked_mul(REWARD_PRECISION)
            .ok_or(MathError::ArithmeticOverflow)?
            / total_liquidity;

        // elapsed <= denom, so reward_delta <= remaining_reward fits u64.
        Ok(Accrual {
            per_liquidity_delta,
            reward_delta: reward_delta as u64,
            settled_to: now,
        })
    }
}
