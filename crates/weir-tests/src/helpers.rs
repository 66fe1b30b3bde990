//! Shared test harness: in-memory collaborators and scenario builders.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};

use weir_core::error::{CustodyError, OracleError, TransferError};
use weir_core::traits::{
    CallerEnv, PositionCustodian, PositionSource, RangeOracle, TokenTransfer,
};
use weir_accrual::{HalfLifePenalty, ProRataAccrual};
use weir_core::types::{Address, IncentiveConfig, IncentiveKey, PositionInfo};
use weir_engine::StakerEngine;

/// Address from a seed byte.
pub fn addr(seed: u8) -> Address {
    Address([seed; 32])
}

/// The engine's own address in every harness.
pub fn engine_addr() -> Address {
    addr(0xEE)
}

/// An address the caller environment classifies as a contract.
pub fn contract_addr() -> Address {
    addr(0xCC)
}

/// Token-transfer collaborator that records every movement.
pub struct LedgerTokens {
    /// `(token, to, amount)` for transfers out of the engine.
    pub sent: Arc<Mutex<Vec<(Address, Address, u64)>>>,
    /// `(token, from, amount)` for transfers into the engine.
    pub pulled: Arc<Mutex<Vec<(Address, Address, u64)>>>,
}

impl TokenTransfer for LedgerTokens {
    fn transfer(&self, token: Address, to: Address, amount: u64) -> Result<(), TransferError> {
        if to.is_zero() {
            return Err(TransferError::Failed("zero recipient".into()));
        }
        self.sent.lock().unwrap().push((token, to, amount));
        Ok(())
    }

    fn transfer_from(
        &self,
        token: Address,
        from: Address,
        amount: u64,
    ) -> Result<(), TransferError> {
        self.pulled.lock().unwrap().push((token, from, amount));
        Ok(())
    }
}

/// Position provider backed by a shared map, mutable mid-test.
pub struct SharedPositions {
    pub positions: Arc<Mutex<HashMap<u64, PositionInfo>>>,
}

impl PositionSource for SharedPositions {
    fn position_info(&self, token_id: u64) -> Result<Option<PositionInfo>, CustodyError> {
        Ok(self.positions.lock().unwrap().get(&token_id).copied())
    }
}

impl PositionCustodian for SharedPositions {
    fn release(&self, token_id: u64, _to: Address) -> Result<(), CustodyError> {
        if self.positions.lock().unwrap().contains_key(&token_id) {
            Ok(())
        } else {
            Err(CustodyError::ReleaseFailed(format!("unknown token {token_id}")))
        }
    }
}

/// Oracle returning a shared, settable tick. Records the averaging window
/// of every query so tests can assert which strategy an operation used.
pub struct SharedOracle {
    pub tick: Arc<AtomicI32>,
    pub windows: Arc<Mutex<Vec<u64>>>,
}

impl RangeOracle for SharedOracle {
    fn tick(&self, _pool: Address, twap_seconds: u64) -> Result<i32, OracleError> {
        self.windows.lock().unwrap().push(twap_seconds);
        Ok(self.tick.load(Ordering::Relaxed))
    }
}

/// Caller environment treating [`contract_addr`] as a contract.
pub struct OneContract;

impl CallerEnv for OneContract {
    fn is_originating_external_caller(&self, caller: &Address) -> bool {
        *caller != contract_addr()
    }
}

/// The engine type every harness test runs against.
pub type Engine = StakerEngine<LedgerTokens, SharedPositions, SharedOracle, OneContract>;

/// An engine wired to shared mocks, with handles to drive them mid-test.
pub struct Harness {
    pub engine: Engine,
    /// Spot/TWAP tick the oracle reports.
    pub tick: Arc<AtomicI32>,
    /// Position registry; insert or mutate entries to simulate the pool.
    pub positions: Arc<Mutex<HashMap<u64, PositionInfo>>>,
    /// Outbound transfer log.
    pub sent: Arc<Mutex<Vec<(Address, Address, u64)>>>,
    /// Inbound transfer log.
    pub pulled: Arc<Mutex<Vec<(Address, Address, u64)>>>,
    /// Averaging window of each oracle query, in call order.
    pub oracle_windows: Arc<Mutex<Vec<u64>>>,
}

impl Harness {
    /// Build a harness with the given positions, oracle tick at 0.
    pub fn new(entries: &[(u64, PositionInfo)]) -> Self {
        let tick = Arc::new(AtomicI32::new(0));
        let positions = Arc::new(Mutex::new(entries.iter().copied().collect::<HashMap<_, _>>()));
        let sent = Arc::new(Mutex::new(Vec::new()));
        let pulled = Arc::new(Mutex::new(Vec::new()));
        let oracle_windows = Arc::new(Mutex::new(Vec::new()));
        let engine = StakerEngine::with_calculators(
            engine_addr(),
            LedgerTokens { sent: Arc::clone(&sent), pulled: Arc::clone(&pulled) },
            SharedPositions { positions: Arc::clone(&positions) },
            SharedOracle { tick: Arc::clone(&tick), windows: Arc::clone(&oracle_windows) },
            OneContract,
            Box::new(ProRataAccrual::new()),
            Box::new(HalfLifePenalty::new()),
        );
        Self { engine, tick, positions, sent, pulled, oracle_windows }
    }

    /// Move the reported tick.
    pub fn set_tick(&self, tick: i32) {
        self.tick.store(tick, Ordering::Relaxed);
    }

    /// Averaging windows queried since the last call, draining the log.
    pub fn drain_oracle_windows(&self) -> Vec<u64> {
        self.oracle_windows.lock().unwrap().drain(..).collect()
    }

    /// Total `token` amount the engine has transferred out.
    pub fn total_sent(&self, token: Address) -> u64 {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _, _)| *t == token)
            .map(|(_, _, amount)| amount)
            .sum()
    }
}

/// Incentive key over `[1_000, 2_000)` on the default pool.
pub fn default_key() -> IncentiveKey {
    IncentiveKey {
        reward_token: addr(1),
        pool: addr(2),
        start_time: 1_000,
        end_time: 2_000,
        refundee: addr(3),
    }
}

/// Default policy: wide eligibility, 1-day penalty half-life, 1% penalty
/// floor, 20% liquidator bonus, spot-tick oracle.
pub fn default_config() -> IncentiveConfig {
    IncentiveConfig {
        min_tick_width: 10,
        penalty_decay_period: 86_400,
        min_penalty_bips: 100,
        min_exit_duration: 0,
        liquidation_bonus_bips: 2_000,
        twap_seconds: 0,
    }
}

/// Position on the default pool with range `[-60, 60)`.
pub fn position(liquidity: u128) -> PositionInfo {
    PositionInfo { pool: addr(2), tick_lower: -60, tick_upper: 60, liquidity }
}
