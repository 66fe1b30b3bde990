//! The engine façade: public operations over the three stores.
//!
//! `StakerEngine` composes the registry, ledger, and vault behind a single
//! `RwLock`, so every public operation runs as one atomic step: validate,
//! run any external transfer, then commit. A failed step leaves all three
//! stores exactly as they were.
//!
//! Collaborators supplied by the hosting environment are type parameters;
//! the two calculators default to the weir-accrual implementations and can
//! be swapped for tests.

use parking_lot::RwLock;
use tracing::{debug, info};

use weir_accrual::{HalfLifePenalty, ProRataAccrual};
use weir_core::error::{DepositError, EngineError, IncentiveError, MathError, StakeError};
use weir_core::events::Event;
use weir_core::traits::{
    AccrualCalculator, CallerEnv, PenaltyCalculator, PositionCustodian, PositionSource,
    RangeOracle, TokenTransfer,
};
use weir_core::types::{
    Accrual, Address, Deposit, Incentive, IncentiveConfig, IncentiveId, IncentiveKey,
    PositionInfo, RewardSplit, Stake,
};

use crate::ledger::StakeLedger;
use crate::registry::IncentiveRegistry;
use crate::vault::RewardVault;

/// What `unstake` would produce at a given instant, without mutating.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardView {
    /// Raw accrued reward, before any penalty.
    pub reward: u64,
    /// Division of the reward between owner, liquidator, and refund.
    pub split: RewardSplit,
    /// Whether an exit right now would be a liquidation.
    pub liquidation: bool,
}

/// Mutable engine state, guarded by one lock.
struct EngineState {
    registry: IncentiveRegistry,
    ledger: StakeLedger,
    vault: RewardVault,
    events: Vec<Event>,
}

/// A fully validated stake, ready to commit.
struct StakePlan {
    id: IncentiveId,
    accrual: Accrual,
    stake: Stake,
}

/// The incentive staking engine.
///
/// Generic over the host collaborators: `T` moves fungible tokens, `P`
/// provides position data and custody, `O` answers tick queries, `C`
/// classifies callers for the liquidation gate.
pub struct StakerEngine<T, P, O, C>
where
    T: TokenTransfer,
    P: PositionSource + PositionCustodian,
    O: RangeOracle,
    C: CallerEnv,
{
    self_address: Address,
    tokens: T,
    positions: P,
    oracle: O,
    caller_env: C,
    accrual: Box<dyn AccrualCalculator>,
    penalty: Box<dyn PenaltyCalculator>,
    state: RwLock<EngineState>,
}

impl<T, P, O, C> StakerEngine<T, P, O, C>
where
    T: TokenTransfer,
    P: PositionSource + PositionCustodian,
    O: RangeOracle,
    C: CallerEnv,
{
    /// Create an engine with the production calculators.
    pub fn new(self_address: Address, tokens: T, positions: P, oracle: O, caller_env: C) -> Self {
        Self::with_calculators(
            self_address,
            tokens,
            positions,
            oracle,
            caller_env,
            Box::new(ProRataAccrual::new()),
            Box::new(HalfLifePenalty::new()),
        )
    }

    /// Create an engine with explicit calculators.
    pub fn with_calculators(
        self_address: Address,
        tokens: T,
        positions: P,
        oracle: O,
        caller_env: C,
        accrual: Box<dyn AccrualCalculator>,
        penalty: Box<dyn PenaltyCalculator>,
    ) -> Self {
        Self {
            self_address,
            tokens,
            positions,
            oracle,
            caller_env,
            accrual,
            penalty,
            state: RwLock::new(EngineState {
                registry: IncentiveRegistry::new(),
                ledger: StakeLedger::new(),
                vault: RewardVault::new(),
                events: Vec::new(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Incentive lifecycle
    // ------------------------------------------------------------------

    /// Create an incentive, or top up and reconfigure an existing one.
    ///
    /// Pulls `reward` from the caller between validation and commit, so a
    /// failed transfer changes nothing.
    pub fn create_or_fund(
        &self,
        caller: Address,
        key: IncentiveKey,
        config: IncentiveConfig,
        reward: u64,
        now: u64,
    ) -> Result<IncentiveId, EngineError> {
        let mut state = self.state.write();
        let id = state
            .registry
            .prepare_create_or_fund(caller, &key, &config, reward, now)?;
        // Settle a live incentive first so new funds only change the rate
        // from `now` onward, never retroactively.
        let settlement = if state.registry.get(&id).is_some() {
            Some(state.registry.settled_view(&id, self.accrual.as_ref(), now)?.0)
        } else {
            None
        };
        if reward > 0 {
            self.tokens.transfer_from(key.reward_token, caller, reward)?;
        }
        if let Some(accrual) = settlement {
            state.registry.apply_accrual(&id, &accrual);
        }
        let created = state.registry.commit_create_or_fund(id, caller, key, config, reward);
        if reward > 0 {
            state.events.push(Event::IncentiveCreated { id, key, reward });
        }
        info!(%id, reward, created, "incentive funded");
        Ok(id)
    }

    /// Operator-only config update without funding.
    pub fn reconfigure(
        &self,
        caller: Address,
        id: &IncentiveId,
        config: IncentiveConfig,
    ) -> Result<(), EngineError> {
        let mut state = self.state.write();
        state.registry.reconfigure(caller, id, config)?;
        info!(%id, "incentive reconfigured");
        Ok(())
    }

    /// End an incentive after its end time and refund the unclaimed budget
    /// to the key's refundee. Permissionless.
    pub fn end_incentive(&self, id: &IncentiveId, now: u64) -> Result<u64, EngineError> {
        let mut state = self.state.write();
        let refund = state.registry.prepare_end(id, now)?;
        let record = state.registry.require(id)?;
        let (reward_token, refundee) = (record.key.reward_token, record.key.refundee);
        self.tokens.transfer(reward_token, refundee, refund)?;
        state.registry.commit_end(id);
        state.events.push(Event::IncentiveEnded { id: *id, refund });
        info!(%id, refund, "incentive ended");
        Ok(refund)
    }

    // ------------------------------------------------------------------
    // Deposit custody
    // ------------------------------------------------------------------

    /// Hook called by the custodian when a position token arrives.
    ///
    /// Records the deposit under `from` and optionally stakes it into the
    /// given incentives in the same atomic step. All keys are validated
    /// before any state changes, so one bad key rejects the whole call.
    pub fn on_position_received(
        &self,
        from: Address,
        token_id: u64,
        auto_stake: &[IncentiveKey],
        now: u64,
    ) -> Result<(), EngineError> {
        let mut state = self.state.write();
        if state.ledger.deposit(token_id).is_some() {
            return Err(DepositError::AlreadyExists(token_id).into());
        }
        let info = self
            .positions
            .position_info(token_id)?
            .ok_or(DepositError::PositionNotFound(token_id))?;
        let deposit = Deposit {
            owner: from,
            number_of_stakes: 0,
            tick_lower: info.tick_lower,
            tick_upper: info.tick_upper,
        };

        let mut plans = Vec::with_capacity(auto_stake.len());
        let mut seen = Vec::with_capacity(auto_stake.len());
        for key in auto_stake {
            let plan = self.plan_stake(&state, from, key, token_id, &deposit, &info, now)?;
            if seen.contains(&plan.id) {
                return Err(StakeError::DuplicateAutoStakeKey.into());
            }
            seen.push(plan.id);
            plans.push(plan);
        }

        state.ledger.create_deposit(token_id, deposit)?;
        for plan in plans {
            Self::commit_stake(&mut state, token_id, plan)?;
        }
        info!(token_id, owner = %from, stakes = auto_stake.len(), "deposit received");
        Ok(())
    }

    /// Reassign a deposit to a new owner. Live stakes are unaffected.
    pub fn transfer_deposit(
        &self,
        caller: Address,
        token_id: u64,
        new_owner: Address,
    ) -> Result<(), EngineError> {
        let mut state = self.state.write();
        let old_owner = state.ledger.transfer_owner(caller, token_id, new_owner)?;
        state.events.push(Event::DepositTransferred { token_id, old_owner, new_owner });
        info!(token_id, %new_owner, "deposit transferred");
        Ok(())
    }

    /// Release a fully unstaked position token back to `to`.
    pub fn withdraw_deposit(
        &self,
        caller: Address,
        token_id: u64,
        to: Address,
    ) -> Result<(), EngineError> {
        let mut state = self.state.write();
        let deposit = *state.ledger.require_deposit(token_id)?;
        if deposit.owner != caller {
            return Err(DepositError::NotOwner.into());
        }
        if to.is_zero() {
            return Err(DepositError::ZeroRecipient.into());
        }
        if to == self.self_address {
            return Err(DepositError::WithdrawToEngine.into());
        }
        if deposit.number_of_stakes > 0 {
            return Err(DepositError::StakesOutstanding {
                token_id,
                count: deposit.number_of_stakes,
            }
            .into());
        }
        self.positions.release(token_id, to)?;
        state.ledger.remove_deposit(token_id)?;
        info!(token_id, %to, "deposit withdrawn");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Staking
    // ------------------------------------------------------------------

    /// Stake a deposited position into an incentive.
    pub fn stake(
        &self,
        caller: Address,
        key: &IncentiveKey,
        token_id: u64,
        now: u64,
    ) -> Result<(), EngineError> {
        let mut state = self.state.write();
        let deposit = *state.ledger.require_deposit(token_id)?;
        if deposit.owner != caller {
            return Err(DepositError::NotOwner.into());
        }
        let info = self
            .positions
            .position_info(token_id)?
            .ok_or(DepositError::PositionNotFound(token_id))?;
        let plan = self.plan_stake(&state, caller, key, token_id, &deposit, &info, now)?;
        Self::commit_stake(&mut state, token_id, plan)
    }

    /// Exit a stake, voluntarily or as a liquidation.
    ///
    /// Settles the incentive, splits the accrued reward, credits the vault,
    /// and deletes the stake record. The liquidation decision and its
    /// authorization gates follow the staked range and the current tick.
    pub fn unstake(
        &self,
        caller: Address,
        key: &IncentiveKey,
        token_id: u64,
        now: u64,
    ) -> Result<RewardSplit, EngineError> {
        let mut state = self.state.write();
        let id = key.id()?;
        let deposit = *state.ledger.require_deposit(token_id)?;
        let stake = *state.ledger.require_stake(token_id, &id)?;
        let config = state.registry.require(&id)?.config;

        let liquidation = self.authorize_exit(caller, key, &config, &deposit, &stake, now)?;

        let (accrual, settled) = state.registry.settled_view(&id, self.accrual.as_ref(), now)?;
        let reward = self
            .accrual
            .reward_amount(
                stake.liquidity,
                stake.last_reward_per_liquidity,
                settled.reward_per_liquidity,
            )?
            .min(settled.accounted_reward);
        let split = if liquidation {
            self.penalty.distribute(
                reward,
                stake.staked_since,
                now,
                config.penalty_decay_period,
                config.min_penalty_bips,
                config.liquidation_bonus_bips,
            )?
        } else {
            RewardSplit::all_to_owner(reward)
        };
        let paid_out = split.total().ok_or(MathError::ArithmeticOverflow)?;
        debug!(%id, token_id, reward, liquidation, "unstake settlement");

        state.registry.apply_accrual(&id, &accrual);
        if let Some(record) = state.registry.get_mut(&id) {
            record.state.total_liquidity_staked -= stake.liquidity;
            record.state.accounted_reward -= paid_out;
            record.state.remaining_reward =
                record.state.remaining_reward.saturating_add(split.refunded);
        }
        state.vault.credit(key.reward_token, deposit.owner, split.owner_earning)?;
        if liquidation {
            state.vault.credit(key.reward_token, caller, split.liquidator_earning)?;
        }
        state.ledger.remove_stake(token_id, &id)?;
        state.events.push(Event::TokenUnstaked {
            id,
            token_id,
            owner_earning: split.owner_earning,
            liquidator_earning: split.liquidator_earning,
            refunded: split.refunded,
            liquidator: liquidation.then_some(caller),
        });
        info!(%id, token_id, owner_earning = split.owner_earning, liquidation, "unstaked");
        Ok(split)
    }

    /// What `unstake` would yield at `now`, without mutating.
    ///
    /// Replays the same settlement and split arithmetic, so the result is
    /// bit-identical to an exit at the same instant.
    pub fn get_reward_info(
        &self,
        key: &IncentiveKey,
        token_id: u64,
        now: u64,
    ) -> Result<RewardView, EngineError> {
        let state = self.state.read();
        let id = key.id()?;
        let deposit = *state.ledger.require_deposit(token_id)?;
        let stake = *state.ledger.require_stake(token_id, &id)?;
        let record = state.registry.require(&id)?;

        let liquidation = if now >= key.end_time {
            false
        } else {
            let tick = self.oracle.tick(key.pool, record.config.twap_seconds)?;
            !deposit.contains_tick(tick)
        };

        let (_, settled) = state.registry.settled_view(&id, self.accrual.as_ref(), now)?;
        let reward = self
            .accrual
            .reward_amount(
                stake.liquidity,
                stake.last_reward_per_liquidity,
                settled.reward_per_liquidity,
            )?
            .min(settled.accounted_reward);
        let split = if liquidation {
            self.penalty.distribute(
                reward,
                stake.staked_since,
                now,
                record.config.penalty_decay_period,
                record.config.min_penalty_bips,
                record.config.liquidation_bonus_bips,
            )?
        } else {
            RewardSplit::all_to_owner(reward)
        };
        Ok(RewardView { reward, split, liquidation })
    }

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    /// Pay accrued reward out of the caller's vault balance to `to`.
    ///
    /// `requested == 0` claims the full balance. Returns the amount paid;
    /// a zero payout is a no-op, not an error.
    pub fn claim(
        &self,
        caller: Address,
        reward_token: Address,
        to: Address,
        requested: u64,
    ) -> Result<u64, EngineError> {
        let mut state = self.state.write();
        let paid = state.vault.peek(reward_token, caller, requested);
        if paid == 0 {
            return Ok(0);
        }
        self.tokens.transfer(reward_token, to, paid)?;
        state.vault.debit(reward_token, caller, paid);
        state.events.push(Event::RewardClaimed { reward_token, to, amount: paid });
        info!(%reward_token, %to, paid, "reward claimed");
        Ok(paid)
    }

    // ------------------------------------------------------------------
    // Read-only views
    // ------------------------------------------------------------------

    /// Ledger state of an incentive.
    pub fn incentive(&self, id: &IncentiveId) -> Option<Incentive> {
        self.state.read().registry.get(id).map(|r| r.state)
    }

    /// Policy config of an incentive.
    pub fn config(&self, id: &IncentiveId) -> Option<IncentiveConfig> {
        self.state.read().registry.get(id).map(|r| r.config)
    }

    /// Custody record of a deposited token.
    pub fn deposit(&self, token_id: u64) -> Option<Deposit> {
        self.state.read().ledger.deposit(token_id).copied()
    }

    /// Stake record for a token in an incentive.
    pub fn stake_record(&self, key: &IncentiveKey, token_id: u64) -> Option<Stake> {
        let id = key.id().ok()?;
        self.state.read().ledger.stake(token_id, &id).copied()
    }

    /// Claimable balance for `owner` in `reward_token`.
    pub fn reward_balance(&self, reward_token: Address, owner: Address) -> u64 {
        self.state.read().vault.balance(reward_token, owner)
    }

    /// Snapshot of the event log.
    pub fn events(&self) -> Vec<Event> {
        self.state.read().events.clone()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Validate one stake against current state, producing a commit plan.
    ///
    /// `deposit` is passed explicitly so the deposit hook can validate
    /// against a record it has not inserted yet.
    fn plan_stake(
        &self,
        state: &EngineState,
        caller: Address,
        key: &IncentiveKey,
        token_id: u64,
        deposit: &Deposit,
        info: &PositionInfo,
        now: u64,
    ) -> Result<StakePlan, EngineError> {
        let id = key.id()?;
        let record = state.registry.require(&id)?;
        if deposit.owner != caller {
            return Err(DepositError::NotOwner.into());
        }
        if now < key.start_time {
            return Err(IncentiveError::NotStarted(id.to_string()).into());
        }
        if now >= key.end_time {
            return Err(IncentiveError::Ended(id.to_string()).into());
        }
        // A drained budget means the program was ended; treat as absent.
        if record.state.remaining_reward == 0 {
            return Err(IncentiveError::NotFound(id.to_string()).into());
        }
        if state.ledger.stake(token_id, &id).is_some() {
            return Err(StakeError::AlreadyStaked { token_id, incentive: id.to_string() }.into());
        }
        if info.pool != key.pool {
            return Err(StakeError::PoolMismatch.into());
        }
        if info.liquidity == 0 {
            return Err(StakeError::ZeroLiquidity.into());
        }
        let width = info.tick_width();
        if width < record.config.min_tick_width {
            return Err(StakeError::RangeTooNarrow {
                width,
                min: record.config.min_tick_width,
            }
            .into());
        }
        // Eligibility uses the spot tick; the averaging window only ever
        // softens the liquidation decision.
        let tick = self.oracle.tick(key.pool, 0)?;
        if !info.contains_tick(tick) {
            return Err(StakeError::OutOfRange {
                tick,
                lower: info.tick_lower,
                upper: info.tick_upper,
            }
            .into());
        }

        let (accrual, settled) = state.registry.settled_view(&id, self.accrual.as_ref(), now)?;
        settled
            .total_liquidity_staked
            .checked_add(info.liquidity)
            .ok_or(MathError::ArithmeticOverflow)?;
        Ok(StakePlan {
            id,
            accrual,
            stake: Stake {
                last_reward_per_liquidity: settled.reward_per_liquidity,
                liquidity: info.liquidity,
                staked_since: now,
            },
        })
    }

    /// Apply a validated stake plan.
    fn commit_stake(
        state: &mut EngineState,
        token_id: u64,
        plan: StakePlan,
    ) -> Result<(), EngineError> {
        state.registry.apply_accrual(&plan.id, &plan.accrual);
        if let Some(record) = state.registry.get_mut(&plan.id) {
            // Overflow excluded by plan_stake.
            record.state.total_liquidity_staked = record
                .state
                .total_liquidity_staked
                .saturating_add(plan.stake.liquidity);
        }
        state.ledger.insert_stake(token_id, &plan.id, plan.stake)?;
        state.events.push(Event::TokenStaked {
            id: plan.id,
            token_id,
            liquidity: plan.stake.liquidity,
        });
        info!(id = %plan.id, token_id, liquidity = plan.stake.liquidity, "staked");
        Ok(())
    }

    /// Decide whether this exit is a liquidation, enforcing the gates.
    fn authorize_exit(
        &self,
        caller: Address,
        key: &IncentiveKey,
        config: &IncentiveConfig,
        deposit: &Deposit,
        stake: &Stake,
        now: u64,
    ) -> Result<bool, EngineError> {
        // After end time the program is over: anyone may exit, no penalty.
        if now >= key.end_time {
            return Ok(false);
        }
        let tick = self.oracle.tick(key.pool, config.twap_seconds)?;
        if deposit.contains_tick(tick) {
            if caller != deposit.owner {
                return Err(StakeError::InRangeNotOwner.into());
            }
            let elapsed = now.saturating_sub(stake.staked_since);
            if elapsed < config.min_exit_duration {
                return Err(StakeError::ExitTooEarly {
                    elapsed,
                    min: config.min_exit_duration,
                }
                .into());
            }
            Ok(false)
        } else {
            if !self.caller_env.is_originating_external_caller(&caller) {
                return Err(StakeError::ContractCaller.into());
            }
            Ok(true)
        }
    }
}
