// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::{BandId, BandLevelId, PoolId};

/// Errors surfaced by ledger operations. A command that fails leaves the state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakingError {
    #[error("Invalid band level {0}: level is not set or has no accessible pools")]
    InvalidBandLevel(BandLevelId),

    #[error("Pool {pool_id} is out of range (total pools: {total_pools})")]
    PoolOutOfRange { pool_id: PoolId, total_pools: usize },

    #[error("Length mismatch: expected {expected} entries, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Sync timestamp {now} is earlier than the last sync at {last_sync}")]
    NonMonotonicSync { now: u64, last_sync: u64 },

    #[error("Fixed staking period of {months} months is outside the accrual table (1..={max})")]
    InvalidFixedMonths { months: u16, max: usize },

    #[error("Band {0} already exists")]
    BandAlreadyExists(BandId),

    #[error("Band {0} not found")]
    BandNotFound(BandId),

    #[error("Band {band_id} is owned by {owner}, not {caller}")]
    NotBandOwner { band_id: BandId, owner: Address, caller: Address },

    #[error("Band {band_id} is at level {actual}, event expected level {expected}")]
    BandLevelMismatch { band_id: BandId, expected: BandLevelId, actual: BandLevelId },

    #[error("Band {band_id} cannot move from level {from} to level {to}")]
    InvalidLevelChange { band_id: BandId, from: BandLevelId, to: BandLevelId },

    #[error("No pending distribution for token {0}")]
    NoPendingDistribution(Address),

    #[error("Staker {staker} cannot claim {requested} of token {token}: {available} unclaimed")]
    InsufficientRewards { staker: Address, token: Address, requested: U256, available: U256 },

    #[error("Arithmetic overflow while computing {0}")]
    ArithmeticOverflow(&'static str),

    #[error("Share accounting underflow in {0}")]
    ShareUnderflow(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StakingError {
    /// Whether the same command may succeed if delivered again in the right order.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StakingError::NonMonotonicSync { .. })
    }
}
