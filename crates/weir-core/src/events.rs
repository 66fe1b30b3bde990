//! Append-only event log entries for off-chain indexing.
//!
//! The engine records one event per successful state-changing operation
//! that external indexers care about. Events are serde-serializable and
//! carry the ids and amounts of the operation that produced them.

use serde::{Deserialize, Serialize};

use crate::types::{Address, IncentiveId, IncentiveKey};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// An incentive was created or topped up with additional reward.
    /// Emitted only when the funded amount is positive.
    IncentiveCreated {
        id: IncentiveId,
        key: IncentiveKey,
        reward: u64,
    },
    /// An incentive was ended and its leftover budget refunded.
    IncentiveEnded { id: IncentiveId, refund: u64 },
    /// Ownership of a deposit changed hands.
    DepositTransferred {
        token_id: u64,
        old_owner: Address,
        new_owner: Address,
    },
    /// A position was staked into an incentive.
    TokenStaked {
        id: IncentiveId,
        token_id: u64,
        liquidity: u128,
    },
    /// A position exited an incentive, voluntarily or by liquidation.
    TokenUnstaked {
        id: IncentiveId,
        token_id: u64,
        owner_earning: u64,
        liquidator_earning: u64,
        refunded: u64,
        /// Set when the exit was a liquidation.
        liquidator: Option<Address>,
    },
    /// Accrued reward was paid out of the vault.
    RewardClaimed {
        reward_token: Address,
        to: Address,
        amount: u64,
    },
}
