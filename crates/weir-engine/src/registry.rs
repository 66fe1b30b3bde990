//! Per-incentive ledger: creation, funding, settlement, and ending.
//!
//! The registry owns the `IncentiveId → record` map. Mutating operations
//! are two-phase: a `prepare_*` method validates against current state
//! without touching it, and a `commit_*` method applies the pre-validated
//! change. The façade runs external transfers between the two phases so a
//! failed transfer leaves the registry unchanged.

use std::collections::HashMap;

use weir_core::error::{EngineError, IncentiveError, MathError};
use weir_core::traits::AccrualCalculator;
use weir_core::types::{Accrual, Address, Incentive, IncentiveConfig, IncentiveId, IncentiveKey};

/// One incentive program: identity, policy, operator, and ledger state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncentiveRecord {
    /// The key this record was created under.
    pub key: IncentiveKey,
    /// Operator-set policy.
    pub config: IncentiveConfig,
    /// Sole authority for funding and reconfiguration (the creator).
    pub operator: Address,
    /// Budget and accumulator state.
    pub state: Incentive,
}

/// Registry of all incentive programs, keyed by deterministic id.
#[derive(Default)]
pub struct IncentiveRegistry {
    records: HashMap<IncentiveId, IncentiveRecord>,
}

impl IncentiveRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { records: HashMap::new() }
    }

    /// Look up a record by id.
    pub fn get(&self, id: &IncentiveId) -> Option<&IncentiveRecord> {
        self.records.get(id)
    }

    /// Look up a record by id, or fail with the lifecycle error.
    pub fn require(&self, id: &IncentiveId) -> Result<&IncentiveRecord, EngineError> {
        self.records
            .get(id)
            .ok_or_else(|| IncentiveError::NotFound(id.to_string()).into())
    }

    /// Number of programs ever created (ended programs remain).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no programs exist.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Validate a create-or-fund call without changing state.
    ///
    /// First call for an id validates the schedule and requires a positive
    /// reward; later calls require the operator and allow `reward == 0`
    /// (config-only update). Also guards the budget against u64 overflow
    /// so commit cannot fail.
    pub fn prepare_create_or_fund(
        &self,
        caller: Address,
        key: &IncentiveKey,
        config: &IncentiveConfig,
        reward: u64,
        now: u64,
    ) -> Result<IncentiveId, EngineError> {
        let id = key.id()?;
        config.validate()?;

        match self.records.get(&id) {
            Some(record) => {
                if record.operator != caller {
                    return Err(IncentiveError::NotOperator.into());
                }
                record
                    .state
                    .total_unclaimed()
                    .checked_add(reward)
                    .ok_or(MathError::ArithmeticOverflow)?;
            }
            None => {
                key.validate_schedule(now)?;
                if reward == 0 {
                    return Err(IncentiveError::ZeroInitialReward.into());
                }
            }
        }
        Ok(id)
    }

    /// Apply a prepared create-or-fund. Returns `true` when the record was
    /// newly created.
    pub fn commit_create_or_fund(
        &mut self,
        id: IncentiveId,
        caller: Address,
        key: IncentiveKey,
        config: IncentiveConfig,
        reward: u64,
    ) -> bool {
        match self.records.get_mut(&id) {
            Some(record) => {
                record.config = config;
                // Overflow excluded by prepare_create_or_fund.
                record.state.remaining_reward = record.state.remaining_reward.saturating_add(reward);
                false
            }
            None => {
                self.records.insert(
                    id,
                    IncentiveRecord {
                        key,
                        config,
                        operator: caller,
                        state: Incentive {
                            remaining_reward: reward,
                            last_accrue_time: key.start_time,
                            ..Default::default()
                        },
                    },
                );
                true
            }
        }
    }

    /// Operator-only config update without funding.
    pub fn reconfigure(
        &mut self,
        caller: Address,
        id: &IncentiveId,
        config: IncentiveConfig,
    ) -> Result<(), EngineError> {
        config.validate()?;
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| IncentiveError::NotFound(id.to_string()))?;
        if record.operator != caller {
            return Err(IncentiveError::NotOperator.into());
        }
        record.config = config;
        Ok(())
    }

    /// Compute the settlement for a record at `now` without mutating.
    ///
    /// Returns the accrual delta and the record's post-settlement state.
    /// Callers that commit must pass the same delta to [`apply_accrual`]
    /// in the same atomic step.
    ///
    /// [`apply_accrual`]: IncentiveRegistry::apply_accrual
    pub fn settled_view(
        &self,
        id: &IncentiveId,
        calc: &dyn AccrualCalculator,
        now: u64,
    ) -> Result<(Accrual, Incentive), EngineError> {
        let record = self.require(id)?;
        let s = record.state;
        let accrual = calc.accrue(
            s.remaining_reward,
            s.total_liquidity_staked,
            record.key.end_time,
            s.last_accrue_time,
            now,
        )?;
        let settled = Incentive {
            remaining_reward: s.remaining_reward - accrual.reward_delta,
            accounted_reward: s.accounted_reward.saturating_add(accrual.reward_delta),
            reward_per_liquidity: s.reward_per_liquidity + accrual.per_liquidity_delta,
            total_liquidity_staked: s.total_liquidity_staked,
            last_accrue_time: accrual.settled_to,
        };
        Ok((accrual, settled))
    }

    /// Commit a settlement produced by [`settled_view`].
    ///
    /// [`settled_view`]: IncentiveRegistry::settled_view
    pub fn apply_accrual(&mut self, id: &IncentiveId, accrual: &Accrual) {
        if let Some(record) = self.records.get_mut(id) {
            record.state.remaining_reward -= accrual.reward_delta;
            record.state.accounted_reward =
                record.state.accounted_reward.saturating_add(accrual.reward_delta);
            record.state.reward_per_liquidity += accrual.per_liquidity_delta;
            record.state.last_accrue_time = accrual.settled_to;
        }
    }

    /// Mutable access for the façade's stake/unstake bookkeeping.
    pub(crate) fn get_mut(&mut self, id: &IncentiveId) -> Option<&mut IncentiveRecord> {
        self.records.get_mut(id)
    }

    /// Validate ending an incentive; returns the refund amount.
    pub fn prepare_end(&self, id: &IncentiveId, now: u64) -> Result<u64, EngineError> {
        let record = self.require(id)?;
        if now < record.key.end_time {
            return Err(IncentiveError::NotYetEnded {
                id: id.to_string(),
                end: record.key.end_time,
            }
            .into());
        }
        if record.state.total_liquidity_staked > 0 {
            return Err(IncentiveError::LiquidityStillStaked {
                liquidity: record.state.total_liquidity_staked,
            }
            .into());
        }
        let refund = record.state.total_unclaimed();
        if refund == 0 {
            return Err(IncentiveError::NothingToRefund.into());
        }
        Ok(refund)
    }

    /// Zero out an ended incentive's budget. The record itself persists so
    /// the program's history stays addressable.
    pub fn commit_end(&mut self, id: &IncentiveId) {
        if let Some(record) = self.records.get_mut(id) {
            record.state.remaining_reward = 0;
            record.state.accounted_reward = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weir_accrual::ProRataAccrual;

    fn addr(seed: u8) -> Address {
        Address([seed; 32])
    }

    fn key() -> IncentiveKey {
        IncentiveKey {
            reward_token: addr(1),
            pool: addr(2),
            start_time: 1_000,
            end_time: 2_000,
            refundee: addr(3),
        }
    }

    fn config() -> IncentiveConfig {
        IncentiveConfig {
            min_tick_width: 10,
            penalty_decay_period: 86_400,
            min_penalty_bips: 100,
            min_exit_duration: 0,
            liquidation_bonus_bips: 2_000,
            twap_seconds: 0,
        }
    }

    fn create(reg: &mut IncentiveRegistry, reward: u64) -> IncentiveId {
        let id = reg
            .prepare_create_or_fund(addr(9), &key(), &config(), reward, 1_000)
            .unwrap();
        assert!(reg.commit_create_or_fund(id, addr(9), key(), config(), reward));
        id
    }

    #[test]
    fn create_initializes_accrue_time_to_start() {
        let mut reg = IncentiveRegistry::new();
        let id = create(&mut reg, 1_000);
        let record = reg.get(&id).unwrap();
        assert_eq!(record.state.last_accrue_time, 1_000);
        assert_eq!(record.state.remaining_reward, 1_000);
        assert_eq!(record.operator, addr(9));
    }

    #[test]
    fn len_counts_records_and_keeps_ended_programs() {
        let mut reg = IncentiveRegistry::new();
        assert!(reg.is_empty());
        let id = create(&mut reg, 1_000);
        assert_eq!(reg.len(), 1);

        assert_eq!(reg.prepare_end(&id, 2_000).unwrap(), 1_000);
        reg.commit_end(&id);
        assert!(!reg.is_empty());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn zero_initial_reward_rejected() {
        let reg = IncentiveRegistry::new();
        let err = reg
            .prepare_create_or_fund(addr(9), &key(), &config(), 0, 1_000)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Incentive(IncentiveError::ZeroInitialReward)
        ));
    }

    #[test]
    fn second_funding_requires_operator() {
        let mut reg = IncentiveRegistry::new();
        create(&mut reg, 1_000);
        let err = reg
            .prepare_create_or_fund(addr(8), &key(), &config(), 500, 1_000)
            .unwrap_err();
        assert!(matches!(err, EngineError::Incentive(IncentiveError::NotOperator)));
    }

    #[test]
    fn operator_can_fund_with_zero_reward() {
        let mut reg = IncentiveRegistry::new();
        let id = create(&mut reg, 1_000);
        let mut new_config = config();
        new_config.min_tick_width = 60;
        let prepared = reg
            .prepare_create_or_fund(addr(9), &key(), &new_config, 0, 1_500)
            .unwrap();
        assert_eq!(prepared, id);
        assert!(!reg.commit_create_or_fund(id, addr(9), key(), new_config, 0));
        let record = reg.get(&id).unwrap();
        assert_eq!(record.config.min_tick_width, 60);
        assert_eq!(record.state.remaining_reward, 1_000);
    }

    #[test]
    fn funding_overflow_rejected() {
        let mut reg = IncentiveRegistry::new();
        create(&mut reg, u64::MAX - 10);
        let err = reg
            .prepare_create_or_fund(addr(9), &key(), &config(), 11, 1_000)
            .unwrap_err();
        assert!(matches!(err, EngineError::Math(MathError::ArithmeticOverflow)));
    }

    #[test]
    fn schedule_validated_only_on_creation() {
        let mut reg = IncentiveRegistry::new();
        create(&mut reg, 1_000);
        // Funding later, after start has passed, is fine.
        assert!(
            reg.prepare_create_or_fund(addr(9), &key(), &config(), 500, 1_800)
                .is_ok()
        );
    }

    #[test]
    fn reconfigure_requires_operator_and_valid_config() {
        let mut reg = IncentiveRegistry::new();
        let id = create(&mut reg, 1_000);

        let err = reg.reconfigure(addr(8), &id, config()).unwrap_err();
        assert!(matches!(err, EngineError::Incentive(IncentiveError::NotOperator)));

        let mut bad = config();
        bad.min_tick_width = 0;
        assert!(reg.reconfigure(addr(9), &id, bad).is_err());

        let mut good = config();
        good.min_exit_duration = 500;
        reg.reconfigure(addr(9), &id, good).unwrap();
        assert_eq!(reg.get(&id).unwrap().config.min_exit_duration, 500);
    }

    #[test]
    fn settled_view_then_apply_matches() {
        let mut reg = IncentiveRegistry::new();
        let id = create(&mut reg, 1_000);
        reg.get_mut(&id).unwrap().state.total_liquidity_staked = 100;

        let calc = ProRataAccrual::new();
        let (accrual, settled) = reg.settled_view(&id, &calc, 1_200).unwrap();
        assert_eq!(accrual.reward_delta, 200);

        reg.apply_accrual(&id, &accrual);
        assert_eq!(reg.get(&id).unwrap().state, settled);
        assert_eq!(settled.remaining_reward, 800);
        assert_eq!(settled.accounted_reward, 200);
        assert_eq!(settled.last_accrue_time, 1_200);
    }

    #[test]
    fn settlement_is_idempotent_at_same_instant() {
        let mut reg = IncentiveRegistry::new();
        let id = create(&mut reg, 1_000);
        reg.get_mut(&id).unwrap().state.total_liquidity_staked = 100;

        let calc = ProRataAccrual::new();
        let (a1, _) = reg.settled_view(&id, &calc, 1_500).unwrap();
        reg.apply_accrual(&id, &a1);
        let (a2, _) = reg.settled_view(&id, &calc, 1_500).unwrap();
        assert_eq!(a2.reward_delta, 0);
        assert_eq!(a2.per_liquidity_delta, 0);
    }

    #[test]
    fn end_requires_end_time_reached() {
        let mut reg = IncentiveRegistry::new();
        let id = create(&mut reg, 1_000);
        let err = reg.prepare_end(&id, 1_999).unwrap_err();
        assert!(matches!(err, EngineError::Incentive(IncentiveError::NotYetEnded { .. })));
        assert_eq!(reg.prepare_end(&id, 2_000).unwrap(), 1_000);
    }

    #[test]
    fn end_blocked_while_liquidity_staked() {
        let mut reg = IncentiveRegistry::new();
        let id = create(&mut reg, 1_000);
        reg.get_mut(&id).unwrap().state.total_liquidity_staked = 5;
        let err = reg.prepare_end(&id, 3_000).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Incentive(IncentiveError::LiquidityStillStaked { liquidity: 5 })
        ));
    }

    #[test]
    fn end_refunds_remaining_plus_accounted() {
        let mut reg = IncentiveRegistry::new();
        let id = create(&mut reg, 1_000);
        {
            let state = &mut reg.get_mut(&id).unwrap().state;
            state.remaining_reward = 700;
            state.accounted_reward = 42;
        }
        assert_eq!(reg.prepare_end(&id, 2_000).unwrap(), 742);
        reg.commit_end(&id);
        let state = reg.get(&id).unwrap().state;
        assert_eq!(state.total_unclaimed(), 0);
        // Record persists; a second end finds nothing to refund.
        let err = reg.prepare_end(&id, 2_000).unwrap_err();
        assert!(matches!(err, EngineError::Incentive(IncentiveError::NothingToRefund)));
    }

    #[test]
    fn end_of_unknown_incentive_fails() {
        let reg = IncentiveRegistry::new();
        let err = reg.prepare_end(&IncentiveId([1; 32]), 2_000).unwrap_err();
        assert!(matches!(err, EngineError::Incentive(IncentiveError::NotFound(_))));
    }
}
