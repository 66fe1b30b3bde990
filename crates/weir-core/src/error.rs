//! Error types for the Weir engine.
//!
//! Every operation fails fast: an error means no state was changed.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IncentiveError {
    #[error("zero reward on first funding")] ZeroInitialReward,
    #[error("start time {start} is before now {now}")] StartInPast { start: u64, now: u64 },
    #[error("start time {start} exceeds max lead from now {now}")] StartTooFarAhead { start: u64, now: u64 },
    #[error("end time {end} not after start time {start}")] EndNotAfterStart { start: u64, end: u64 },
    #[error("duration {duration} exceeds maximum {max}")] DurationTooLong { duration: u64, max: u64 },
    #[error("minimum tick width must be positive")] ZeroMinTickWidth,
    #[error("penalty decay period must be positive")] ZeroPenaltyDecayPeriod,
    #[error("bips value {value} exceeds 10000")] BipsOutOfRange { value: u64 },
    #[error("incentive not found: {0}")] NotFound(String),
    #[error("incentive {0} has not started")] NotStarted(String),
    #[error("incentive {0} has ended")] Ended(String),
    #[error("caller is not the incentive operator")] NotOperator,
    #[error("incentive {id} cannot end before {end}")] NotYetEnded { id: String, end: u64 },
    #[error("no reward available to refund")] NothingToRefund,
    #[error("cannot end with {liquidity} liquidity still staked")] LiquidityStillStaked { liquidity: u128 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DepositError {
    #[error("deposit not found for token {0}")] NotFound(u64),
    #[error("caller is not the deposit owner")] NotOwner,
    #[error("position not found for token {0}")] PositionNotFound(u64),
    #[error("deposit for token {0} already exists")] AlreadyExists(u64),
    #[error("recipient is the zero address")] ZeroRecipient,
    #[error("cannot withdraw to the engine itself")] WithdrawToEngine,
    #[error("token {token_id} still staked in {count} incentive(s)")] StakesOutstanding { token_id: u64, count: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakeError {
    #[error("token {token_id} already staked in incentive {incentive}")] AlreadyStaked { token_id: u64, incentive: String },
    #[error("token {token_id} not staked in incentive {incentive}")] NotStaked { token_id: u64, incentive: String },
    #[error("position pool does not match incentive pool")] PoolMismatch,
    #[error("position has zero liquidity")] ZeroLiquidity,
    #[error("position width {width} below minimum {min}")] RangeTooNarrow { width: u32, min: u32 },
    #[error("tick {tick} outside position range [{lower}, {upper})")] OutOfRange { tick: i32, lower: i32, upper: i32 },
    #[error("in-range stake may only be exited by the deposit owner")] InRangeNotOwner,
    #[error("stake held {elapsed}s, minimum exit duration is {min}s")] ExitTooEarly { elapsed: u64, min: u64 },
    #[error("liquidation caller must be an external account")] ContractCaller,
    #[error("duplicate incentive key in auto-stake list")] DuplicateAutoStakeKey,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("serialization: {0}")] Serialization(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("token transfer failed: {0}")] Failed(String),
    #[error("insufficient funds: have {have}, need {need}")] InsufficientFunds { have: u64, need: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    #[error("position release failed: {0}")] ReleaseFailed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("unknown pool: {0}")] UnknownPool(String),
    #[error("oracle unavailable: {0}")] Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)] Incentive(#[from] IncentiveError),
    #[error(transparent)] Deposit(#[from] DepositError),
    #[error(transparent)] Stake(#[from] StakeError),
    #[error(transparent)] Math(#[from] MathError),
    #[error(transparent)] Transfer(#[from] TransferError),
    #[error(transparent)] Custody(#[from] CustodyError),
    #[error(transparent)] Oracle(#[from] OracleError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incentive_error_display() {
        let e = IncentiveError::DurationTooLong { duration: 100, max: 50 };
        assert_eq!(e.to_string(), "duration 100 exceeds maximum 50");
    }

    #[test]
    fn stake_error_display() {
        let e = StakeError::RangeTooNarrow { width: 5, min: 10 };
        assert_eq!(e.to_string(), "position width 5 below minimum 10");
    }

    #[test]
    fn engine_error_is_transparent() {
        let inner = StakeError::ContractCaller;
        let outer: EngineError = inner.clone().into();
        assert_eq!(outer.to_string(), inner.to_string());
    }

    #[test]
    fn engine_error_from_math() {
        let outer: EngineError = MathError::ArithmeticOverflow.into();
        assert!(matches!(outer, EngineError::Math(MathError::ArithmeticOverflow)));
    }
}
