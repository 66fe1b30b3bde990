//! Accrued-reward balances awaiting claim.
//!
//! Unstaking credits the vault; `claim` debits it and triggers the actual
//! token transfer. Balances are keyed `(reward_token, beneficiary)` so one
//! address can hold claims in several reward tokens at once.

use std::collections::HashMap;

use weir_core::error::{EngineError, MathError};
use weir_core::types::Address;

/// In-engine balances owed to stakers and liquidators.
#[derive(Default)]
pub struct RewardVault {
    balances: HashMap<(Address, Address), u64>,
}

impl RewardVault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self { balances: HashMap::new() }
    }

    /// Current claimable balance for `to` in `reward_token`.
    pub fn balance(&self, reward_token: Address, to: Address) -> u64 {
        self.balances.get(&(reward_token, to)).copied().unwrap_or(0)
    }

    /// Add `amount` to a beneficiary's balance. Zero amounts are dropped
    /// without creating an entry.
    pub fn credit(
        &mut self,
        reward_token: Address,
        to: Address,
        amount: u64,
    ) -> Result<(), EngineError> {
        if amount == 0 {
            return Ok(());
        }
        let entry = self.balances.entry((reward_token, to)).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or(MathError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Amount a debit of `requested` would pay out, without mutating.
    ///
    /// `requested == 0` means "the full balance"; otherwise the payout is
    /// capped at what is actually owed. A zero payout is a no-op claim,
    /// not an error.
    pub fn peek(&self, reward_token: Address, to: Address, requested: u64) -> u64 {
        let balance = self.balance(reward_token, to);
        if requested == 0 {
            balance
        } else {
            requested.min(balance)
        }
    }

    /// Deduct `amount` from a beneficiary's balance. Drained entries are
    /// removed so the map does not accumulate dust keys.
    pub fn debit(&mut self, reward_token: Address, to: Address, amount: u64) {
        if amount == 0 {
            return;
        }
        if let Some(entry) = self.balances.get_mut(&(reward_token, to)) {
            *entry = entry.saturating_sub(amount);
            if *entry == 0 {
                self.balances.remove(&(reward_token, to));
            }
        }
    }

    /// Number of non-zero balance entries.
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// Whether the vault holds no balances at all.
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}
