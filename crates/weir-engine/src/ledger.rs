//! Deposit custody records and per-incentive stake records.
//!
//! The ledger tracks which position tokens the engine holds, who owns
//! each one, and which incentives each token is staked in. A deposit's
//! `number_of_stakes` counter is maintained here and nowhere else, so a
//! token can only be withdrawn once the counter reads zero.

use std::collections::HashMap;

use weir_core::error::{DepositError, EngineError, StakeError};
use weir_core::types::{Address, Deposit, IncentiveId, Stake};

/// Custody and stake ledger for deposited position tokens.
#[derive(Default)]
pub struct StakeLedger {
    deposits: HashMap<u64, Deposit>,
    stakes: HashMap<(u64, IncentiveId), Stake>,
}

impl StakeLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            deposits: HashMap::new(),
            stakes: HashMap::new(),
        }
    }

    /// Look up a deposit by token id.
    pub fn deposit(&self, token_id: u64) -> Option<&Deposit> {
        self.deposits.get(&token_id)
    }

    /// Look up a deposit by token id, or fail.
    pub fn require_deposit(&self, token_id: u64) -> Result<&Deposit, EngineError> {
        self.deposits
            .get(&token_id)
            .ok_or_else(|| DepositError::NotFound(token_id).into())
    }

    /// Look up a stake record.
    pub fn stake(&self, token_id: u64, id: &IncentiveId) -> Option<&Stake> {
        self.stakes.get(&(token_id, *id))
    }

    /// Look up a stake record, or fail.
    pub fn require_stake(&self, token_id: u64, id: &IncentiveId) -> Result<&Stake, EngineError> {
        self.stakes
            .get(&(token_id, *id))
            .ok_or_else(|| {
                StakeError::NotStaked { token_id, incentive: id.to_string() }.into()
            })
    }

    /// Number of live deposits.
    pub fn deposit_count(&self) -> usize {
        self.deposits.len()
    }

    /// Number of live stakes across all deposits.
    pub fn stake_count(&self) -> usize {
        self.stakes.len()
    }

    /// Record custody of a newly received position token.
    pub fn create_deposit(&mut self, token_id: u64, deposit: Deposit) -> Result<(), EngineError> {
        if self.deposits.contains_key(&token_id) {
            return Err(DepositError::AlreadyExists(token_id).into());
        }
        self.deposits.insert(token_id, deposit);
        Ok(())
    }

    /// Reassign a deposit to a new owner. Stakes ride along untouched.
    pub fn transfer_owner(
        &mut self,
        caller: Address,
        token_id: u64,
        new_owner: Address,
    ) -> Result<Address, EngineError> {
        if new_owner.is_zero() {
            return Err(DepositError::ZeroRecipient.into());
        }
        let deposit = self
            .deposits
            .get_mut(&token_id)
            .ok_or(DepositError::NotFound(token_id))?;
        if deposit.owner != caller {
            return Err(DepositError::NotOwner.into());
        }
        let old_owner = deposit.owner;
        deposit.owner = new_owner;
        Ok(old_owner)
    }

    /// Drop a deposit record once custody leaves the engine. Fails while
    /// any stake still references the token.
    pub fn remove_deposit(&mut self, token_id: u64) -> Result<Deposit, EngineError> {
        let deposit = *self
            .deposits
            .get(&token_id)
            .ok_or(DepositError::NotFound(token_id))?;
        if deposit.number_of_stakes > 0 {
            return Err(DepositError::StakesOutstanding {
                token_id,
                count: deposit.number_of_stakes,
            }
            .into());
        }
        self.deposits.remove(&token_id);
        Ok(deposit)
    }

    /// Record a new stake and bump the deposit's counter.
    pub fn insert_stake(
        &mut self,
        token_id: u64,
        id: &IncentiveId,
        stake: Stake,
    ) -> Result<(), EngineError> {
        if self.stakes.contains_key(&(token_id, *id)) {
            return Err(StakeError::AlreadyStaked { token_id, incentive: id.to_string() }.into());
        }
        let deposit = self
            .deposits
            .get_mut(&token_id)
            .ok_or(DepositError::NotFound(token_id))?;
        deposit.number_of_stakes += 1;
        self.stakes.insert((token_id, *id), stake);
        Ok(())
    }

    /// Delete a stake and decrement the deposit's counter.
    pub fn remove_stake(&mut self, token_id: u64, id: &IncentiveId) -> Result<Stake, EngineError> {
        let stake = self
            .stakes
            .remove(&(token_id, *id))
            .ok_or_else(|| StakeError::NotStaked { token_id, incentive: id.to_string() })?;
        if let Some(deposit) = self.deposits.get_mut(&token_id) {
            deposit.number_of_stakes = deposit.number_of_stakes.saturating_sub(1);
        }
        Ok(stake)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(seed: u8) -> Address {
        Address([seed; 32])
    }

    fn deposit(owner: u8) -> Deposit {
        Deposit {
            owner: addr(owner),
            number_of_stakes: 0,
            tick_lower: -60,
            tick_upper: 60,
        }
    }

    fn stake() -> Stake {
        Stake {
            last_reward_per_liquidity: 0,
            liquidity: 100,
            staked_since: 1_000,
        }
    }

    #[test]
    fn create_and_lookup_deposit() {
        let mut ledger = StakeLedger::new();
        ledger.create_deposit(7, deposit(1)).unwrap();
        assert_eq!(ledger.deposit(7).unwrap().owner, addr(1));
        assert_eq!(ledger.deposit_count(), 1);
    }

    #[test]
    fn duplicate_deposit_rejected() {
        let mut ledger = StakeLedger::new();
        ledger.create_deposit(7, deposit(1)).unwrap();
        let err = ledger.create_deposit(7, deposit(2)).unwrap_err();
        assert!(matches!(err, EngineError::Deposit(DepositError::AlreadyExists(7))));
    }

    #[test]
    fn transfer_requires_owner_and_nonzero_recipient() {
        let mut ledger = StakeLedger::new();
        ledger.create_deposit(7, deposit(1)).unwrap();

        let err = ledger.transfer_owner(addr(2), 7, addr(3)).unwrap_err();
        assert!(matches!(err, EngineError::Deposit(DepositError::NotOwner)));

        let err = ledger.transfer_owner(addr(1), 7, Address::ZERO).unwrap_err();
        assert!(matches!(err, EngineError::Deposit(DepositError::ZeroRecipient)));

        let old = ledger.transfer_owner(addr(1), 7, addr(3)).unwrap();
        assert_eq!(old, addr(1));
        assert_eq!(ledger.deposit(7).unwrap().owner, addr(3));
    }

    #[test]
    fn stake_counter_tracks_inserts_and_removes() {
        let mut ledger = StakeLedger::new();
        ledger.create_deposit(7, deposit(1)).unwrap();

        let a = IncentiveId([1; 32]);
        let b = IncentiveId([2; 32]);
        ledger.insert_stake(7, &a, stake()).unwrap();
        ledger.insert_stake(7, &b, stake()).unwrap();
        assert_eq!(ledger.deposit(7).unwrap().number_of_stakes, 2);
        assert_eq!(ledger.stake_count(), 2);

        ledger.remove_stake(7, &a).unwrap();
        assert_eq!(ledger.deposit(7).unwrap().number_of_stakes, 1);
        assert!(ledger.stake(7, &a).is_none());
        assert!(ledger.stake(7, &b).is_some());
    }

    #[test]
    fn double_stake_in_same_incentive_rejected() {
        let mut ledger = StakeLedger::new();
        ledger.create_deposit(7, deposit(1)).unwrap();
        let a = IncentiveId([1; 32]);
        ledger.insert_stake(7, &a, stake()).unwrap();
        let err = ledger.insert_stake(7, &a, stake()).unwrap_err();
        assert!(matches!(err, EngineError::Stake(StakeError::AlreadyStaked { .. })));
        assert_eq!(ledger.deposit(7).unwrap().number_of_stakes, 1);
    }

    #[test]
    fn remove_unknown_stake_fails() {
        let mut ledger = StakeLedger::new();
        ledger.create_deposit(7, deposit(1)).unwrap();
        let err = ledger.remove_stake(7, &IncentiveId([1; 32])).unwrap_err();
        assert!(matches!(err, EngineError::Stake(StakeError::NotStaked { .. })));
    }

    #[test]
    fn withdraw_blocked_while_staked() {
        let mut ledger = StakeLedger::new();
        ledger.create_deposit(7, deposit(1)).unwrap();
        let a = IncentiveId([1; 32]);
        ledger.insert_stake(7, &a, stake()).unwrap();

        let err = ledger.remove_deposit(7).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Deposit(DepositError::StakesOutstanding { token_id: 7, count: 1 })
        ));

        ledger.remove_stake(7, &a).unwrap();
        let removed = ledger.remove_deposit(7).unwrap();
        assert_eq!(removed.owner, addr(1));
        assert!(ledger.deposit(7).is_none());
    }
}
