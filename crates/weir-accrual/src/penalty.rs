//! Liquidation penalty curve implementing the [`PenaltyCalculator`] trait.
//!
//! The penalty on a liquidated stake's reward decays with the stake's age:
//! exponential half-life decay per full decay period (a right-shift),
//! linear interpolation inside the partial period, and a basis-point floor.
//! The penalty then splits between the liquidating caller and the pool;
//! whatever is not penalty goes to the position owner.

use weir_core::constants::BPS_PRECISION;
use weir_core::error::MathError;
use weir_core::traits::PenaltyCalculator;
use weir_core::types::RewardSplit;

/// The production penalty calculator.
///
/// `penalty0 = reward >> (elapsed / period)` halves the penalty once per
/// full period; the partial period interpolates linearly toward the next
/// halving:
///
/// `penalty = penalty0 - (penalty0 * rem / period) / 2`
///
/// Two cheap integer operations approximate continuous exponential decay.
/// The floor `reward * min_penalty_bips / 10000` keeps a residual
/// deterrent no matter how old the stake is.
#[derive(Debug, Clone, Default)]
pub struct HalfLifePenalty;

impl HalfLifePenalty {
    /// Create a new HalfLifePenalty.
    pub fn new() -> Self {
        Self
    }
}

impl PenaltyCalculator for HalfLifePenalty {
    fn distribute(
        &self,
        reward: u64,
        staked_since: u64,
        now: u64,
        penalty_decay_period: u64,
        min_penalty_bips: u64,
        liquidation_bonus_bips: u64,
    ) -> Result<RewardSplit, MathError> {
        if penalty_decay_period == 0 {
            // Rejected at configuration time; treated as overflow if reached.
            return Err(MathError::ArithmeticOverflow);
        }

        let elapsed = now.saturating_sub(staked_since);

        // Exponential half-life decay: one halving per full period.
        let periods = elapsed / penalty_decay_period;
        let penalty0 = if periods >= 64 { 0 } else { reward >> periods };

        // Linear interpolation across the partial period: halves once more,
        // linearly, between this halving boundary and the next.
        let rem = elapsed % penalty_decay_period;
        let interp = ((penalty0 as u128) * (rem as u128) / (penalty_decay_period as u128) / 2) as u64;
        let decayed = penalty0 - interp;

        // Floor in bips of the raw reward. Bips fields are validated to
        // <= BPS_PRECISION upstream; cap here so the split stays conserving
        // even on bad inputs.
        let floor = ((reward as u128) * (min_penalty_bips.min(BPS_PRECISION) as u128)
            / (BPS_PRECISION as u128)) as u64;
        let penalty = decayed.max(floor).min(reward);

        let liquidator_earning = ((penalty as u128)
            * (liquidation_bonus_bips.min(BPS_PRECISION) as u128)
            / (BPS_PRECISION as u128)) as u64;

        Ok(RewardSplit {
            owner_earning: reward - penalty,
            liquidator_earning,
            refunded: penalty - liquidator_earning,
        })
    }
}
