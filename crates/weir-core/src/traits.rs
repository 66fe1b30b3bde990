//! Trait interfaces for the Weir engine.
//!
//! These traits define the contracts between crates and toward the hosting
//! environment:
//! - [`AccrualCalculator`] / [`PenaltyCalculator`] — pure reward math
//!   (weir-accrual implements)
//! - [`TokenTransfer`] — fungible token value transfers (host supplies)
//! - [`PositionSource`] — position range/liquidity lookups (host supplies)
//! - [`PositionCustodian`] — NFT custody release on withdrawal (host supplies)
//! - [`RangeOracle`] — spot or time-weighted tick queries (host supplies)
//! - [`CallerEnv`] — caller identity capabilities (host supplies)

use crate::constants::REWARD_PRECISION;
use crate::error::{CustodyError, MathError, OracleError, TransferError};
use crate::types::{Accrual, Address, PositionInfo, RewardSplit};

/// Pure computation of reward accrual deltas.
///
/// All math uses integer arithmetic with truncating division; dust left by
/// truncation stays in the incentive's remaining budget.
pub trait AccrualCalculator: Send + Sync {
    /// Settle an incentive forward from `last_accrue_time` to `now`.
    ///
    /// `now` is clamped to `end_time`. Returns a zero [`Accrual`] when no
    /// time has elapsed after clamping or when `total_liquidity` is zero
    /// (the budget is preserved, not lost).
    fn accrue(
        &self,
        remaining_reward: u64,
        total_liquidity: u128,
        end_time: u64,
        last_accrue_time: u64,
        now: u64,
    ) -> Result<Accrual, MathError>;

    /// Reward owed to a stake given its liquidity and accumulator snapshot.
    ///
    /// `liquidity * (current - last) / REWARD_PRECISION`, truncating.
    /// Default implementation; the accumulator is monotonic, so
    /// `current < last` indicates caller error and surfaces as overflow.
    fn reward_amount(&self, liquidity: u128, last: u128, current: u128) -> Result<u64, MathError> {
        let delta = current.checked_sub(last).ok_or(MathError::ArithmeticOverflow)?;
        let amount = liquidity
            .checked_mul(delta)
            .ok_or(MathError::ArithmeticOverflow)?
            / REWARD_PRECISION;
        u64::try_from(amount).map_err(|_| MathError::ArithmeticOverflow)
    }
}

/// Pure computation of the liquidation penalty split.
pub trait PenaltyCalculator: Send + Sync {
    /// Split `reward` between owner, liquidator, and refund under the
    /// time-decaying penalty policy.
    ///
    /// The three parts always sum to `reward` exactly. Voluntary exits
    /// bypass this entirely ([`RewardSplit::all_to_owner`]).
    fn distribute(
        &self,
        reward: u64,
        staked_since: u64,
        now: u64,
        penalty_decay_period: u64,
        min_penalty_bips: u64,
        liquidation_bonus_bips: u64,
    ) -> Result<RewardSplit, MathError>;
}

/// Fungible token value transfers, with success/failure signaling.
pub trait TokenTransfer: Send + Sync {
    /// Move `amount` of `token` from the engine to `to`.
    fn transfer(&self, token: Address, to: Address, amount: u64) -> Result<(), TransferError>;

    /// Move `amount` of `token` from `from` into the engine.
    fn transfer_from(
        &self,
        token: Address,
        from: Address,
        amount: u64,
    ) -> Result<(), TransferError>;
}

/// Position metadata lookups by token id.
pub trait PositionSource: Send + Sync {
    /// Pool, range, and liquidity of a position. `None` if unknown.
    fn position_info(&self, token_id: u64) -> Result<Option<PositionInfo>, CustodyError>;
}

/// Custody of position tokens held by the engine.
///
/// The custodian notifies the engine when a token arrives (the engine's
/// deposit hook); the engine instructs the custodian to hand the token
/// back on withdrawal.
pub trait PositionCustodian: Send + Sync {
    /// Release a held position token to `to`.
    fn release(&self, token_id: u64, to: Address) -> Result<(), CustodyError>;
}

/// Tick queries against a pool, spot or time-weighted.
pub trait RangeOracle: Send + Sync {
    /// Current tick of `pool`. `twap_seconds == 0` means the spot tick;
    /// otherwise the time-weighted average over that window.
    fn tick(&self, pool: Address, twap_seconds: u64) -> Result<i32, OracleError>;
}

/// Caller identity capabilities supplied by the hosting environment.
pub trait CallerEnv: Send + Sync {
    /// Whether `caller` is an originating external account rather than a
    /// contract acting within a composed transaction.
    ///
    /// Gates permissionless liquidation to discourage atomic
    /// manipulate-then-liquidate patterns. The precise mechanism is
    /// environment-dependent and is known to be a heuristic.
    fn is_originating_external_caller(&self, caller: &Address) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // ------------------------------------------------------------------
    // Mock: AccrualCalculator (flat-rate accrual)
    // ------------------------------------------------------------------

    struct MockAccrual;

    impl AccrualCalculator for MockAccrual {
        fn accrue(
            &self,
            remaining_reward: u64,
            total_liquidity: u128,
            end_time: u64,
            last_accrue_time: u64,
            now: u64,
        ) -> Result<Accrual, MathError> {
            let now = now.min(end_time);
            if total_liquidity == 0 || now <= last_accrue_time {
                return Ok(Accrual { settled_to: now.max(last_accrue_time), ..Default::default() });
            }
            // Flat: 1 reward unit per second, capped at the budget.
            let reward_delta = (now - last_accrue_time).min(remaining_reward);
            let per_liquidity_delta =
                (reward_delta as u128) * REWARD_PRECISION / total_liquidity;
            Ok(Accrual { per_liquidity_delta, reward_delta, settled_to: now })
        }
    }

    // ------------------------------------------------------------------
    // Mock: PenaltyCalculator (fixed halving)
    // ------------------------------------------------------------------

    struct MockPenalty;

    impl PenaltyCalculator for MockPenalty {
        fn distribute(
            &self,
            reward: u64,
            _staked_since: u64,
            _now: u64,
            _penalty_decay_period: u64,
            _min_penalty_bips: u64,
            liquidation_bonus_bips: u64,
        ) -> Result<RewardSplit, MathError> {
            let penalty = reward / 2;
            let liquidator_earning = penalty * liquidation_bonus_bips / 10_000;
            Ok(RewardSplit {
                owner_earning: reward - penalty,
                liquidator_earning,
                refunded: penalty - liquidator_earning,
            })
        }
    }

    // ------------------------------------------------------------------
    // Mock: TokenTransfer (in-memory balances)
    // ------------------------------------------------------------------

    struct MockTokenTransfer {
        sent: Mutex<Vec<(Address, Address, u64)>>,
    }

    impl MockTokenTransfer {
        fn new() -> Self {
            Self { sent: Mutex::new(Vec::new()) }
        }
    }

    impl TokenTransfer for MockTokenTransfer {
        fn transfer(&self, token: Address, to: Address, amount: u64) -> Result<(), TransferError> {
            if to.is_zero() {
                return Err(TransferError::Failed("zero recipient".into()));
            }
            self.sent.lock().unwrap().push((token, to, amount));
            Ok(())
        }

        fn transfer_from(
            &self,
            _token: Address,
            _from: Address,
            _amount: u64,
        ) -> Result<(), TransferError> {
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Mock: PositionSource / PositionCustodian / RangeOracle / CallerEnv
    // ------------------------------------------------------------------

    struct MockPositions {
        positions: HashMap<u64, PositionInfo>,
    }

    impl PositionSource for MockPositions {
        fn position_info(&self, token_id: u64) -> Result<Option<PositionInfo>, CustodyError> {
            Ok(self.positions.get(&token_id).copied())
        }
    }

    impl PositionCustodian for MockPositions {
        fn release(&self, token_id: u64, _to: Address) -> Result<(), CustodyError> {
            if self.positions.contains_key(&token_id) {
                Ok(())
            } else {
                Err(CustodyError::ReleaseFailed(format!("unknown token {token_id}")))
            }
        }
    }

    struct MockOracle {
        tick: i32,
    }

    impl RangeOracle for MockOracle {
        fn tick(&self, _pool: Address, _twap_seconds: u64) -> Result<i32, OracleError> {
            Ok(self.tick)
        }
    }

    struct MockCallerEnv {
        contracts: Vec<Address>,
    }

    impl CallerEnv for MockCallerEnv {
        fn is_originating_external_caller(&self, caller: &Address) -> bool {
            !self.contracts.contains(caller)
        }
    }

    fn addr(seed: u8) -> Address {
        Address([seed; 32])
    }

    // ------------------------------------------------------------------
    // AccrualCalculator tests
    // ------------------------------------------------------------------

    #[test]
    fn accrual_zero_liquidity_is_noop() {
        let a = MockAccrual;
        let out = a.accrue(1_000, 0, 200, 100, 150).unwrap();
        assert_eq!(out.reward_delta, 0);
        assert_eq!(out.per_liquidity_delta, 0);
    }

    #[test]
    fn accrual_clamps_to_end_time() {
        let a = MockAccrual;
        let out = a.accrue(1_000, 10, 200, 100, 500).unwrap();
        assert_eq!(out.settled_to, 200);
    }

    #[test]
    fn reward_amount_default_impl() {
        let a = MockAccrual;
        // liquidity 100, accumulator delta 2e12 => 200
        let amount = a
            .reward_amount(100, REWARD_PRECISION, 3 * REWARD_PRECISION)
            .unwrap();
        assert_eq!(amount, 200);
    }

    #[test]
    fn reward_amount_rejects_backwards_accumulator() {
        let a = MockAccrual;
        let err = a.reward_amount(100, 5, 3).unwrap_err();
        assert_eq!(err, MathError::ArithmeticOverflow);
    }

    #[test]
    fn accrual_calculator_as_dyn() {
        let a = MockAccrual;
        let dyn_a: &dyn AccrualCalculator = &a;
        assert_eq!(dyn_a.accrue(0, 0, 0, 0, 0).unwrap().reward_delta, 0);
    }

    // ------------------------------------------------------------------
    // PenaltyCalculator tests
    // ------------------------------------------------------------------

    #[test]
    fn penalty_split_conserves_reward() {
        let p = MockPenalty;
        let split = p.distribute(1_001, 0, 0, 86_400, 100, 2_000).unwrap();
        assert_eq!(split.total(), Some(1_001));
    }

    #[test]
    fn penalty_calculator_as_dyn() {
        let p = MockPenalty;
        let dyn_p: &dyn PenaltyCalculator = &p;
        let split = dyn_p.distribute(100, 0, 0, 1, 0, 0).unwrap();
        assert_eq!(split.total(), Some(100));
    }

    // ------------------------------------------------------------------
    // Collaborator mock tests
    // ------------------------------------------------------------------

    #[test]
    fn token_transfer_records_sends() {
        let t = MockTokenTransfer::new();
        t.transfer(addr(1), addr(2), 500).unwrap();
        assert_eq!(t.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn token_transfer_rejects_zero_recipient() {
        let t = MockTokenTransfer::new();
        assert!(t.transfer(addr(1), Address::ZERO, 500).is_err());
    }

    #[test]
    fn position_source_lookup() {
        let mut positions = HashMap::new();
        positions.insert(
            7,
            PositionInfo { pool: addr(2), tick_lower: -60, tick_upper: 60, liquidity: 100 },
        );
        let src = MockPositions { positions };
        assert!(src.position_info(7).unwrap().is_some());
        assert!(src.position_info(8).unwrap().is_none());
    }

    #[test]
    fn custodian_release_unknown_token_fails() {
        let src = MockPositions { positions: HashMap::new() };
        assert!(src.release(1, addr(1)).is_err());
    }

    #[test]
    fn oracle_returns_tick() {
        let o = MockOracle { tick: -42 };
        assert_eq!(o.tick(addr(2), 0).unwrap(), -42);
        assert_eq!(o.tick(addr(2), 600).unwrap(), -42);
    }

    #[test]
    fn caller_env_distinguishes_contracts() {
        let env = MockCallerEnv { contracts: vec![addr(9)] };
        assert!(env.is_originating_external_caller(&addr(1)));
        assert!(!env.is_originating_external_caller(&addr(9)));
    }

    // ------------------------------------------------------------------
    // Object safety: verify each trait is dyn-compatible
    // ------------------------------------------------------------------

    fn _assert_token_transfer_object_safe(t: &dyn TokenTransfer) {
        let _ = t.transfer(Address::ZERO, Address::ZERO, 0);
    }

    fn _assert_position_source_object_safe(p: &dyn PositionSource) {
        let _ = p.position_info(0);
    }

    fn _assert_oracle_object_safe(o: &dyn RangeOracle) {
        let _ = o.tick(Address::ZERO, 0);
    }

    fn _assert_caller_env_object_safe(c: &dyn CallerEnv) {
        let _ = c.is_originating_external_caller(&Address::ZERO);
    }
}
