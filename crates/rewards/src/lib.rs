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

//! Share accrual, flexible share synchronization and proportional reward allocation for band
//! staking.
//!
//! The crate is host agnostic. Event driven hosts feed [Command]s into
//! [StakingState::apply]; pull based hosts implement [StakingSource] and call
//! [compute_distribution].

// Declare modules
pub mod accrual;
pub mod allocator;
pub mod cache;
pub mod commands;
pub mod config;
pub mod distribution;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod snapshot;
pub mod state;
pub mod sync;

// Re-export commonly used types
pub use accrual::{months_elapsed, AccrualTable};
pub use allocator::{allocate, pool_allocations, Allocation};
pub use cache::{build_staking_state, compute_distribution, BandRecord, StakingSource};
pub use commands::{ApplyReport, Command};
pub use config::StakingConfig;
pub use distribution::{Distribution, StakerRewards};
pub use error::StakingError;
pub use ledger::{Band, CommitmentKind, PoolShares, PoolTotals, ShareLedger, Staker};
pub use registry::{BandLevel, BandLevelRegistry, PoolRegistry};
pub use snapshot::{LedgerSnapshot, Pool, StakerRewardsRow, StakerView};
pub use state::StakingState;
pub use sync::SharesSnapshot;

/// 1-based identifier of a reward pool.
pub type PoolId = u16;
/// 1-based identifier of a band level.
pub type BandLevelId = u16;
/// Identifier of a staked band, assigned by the staking contract.
pub type BandId = u64;

/// Length of an accrual month. Calendar months are not modelled.
pub const SECONDS_PER_MONTH: u64 = 30 * 24 * 60 * 60;
/// Minimum time between two flexible share synchronizations.
pub const DEFAULT_SYNC_INTERVAL: u64 = 12 * 60 * 60;
/// Denominator of pool distribution percentages (100% == 1e8).
pub const DEFAULT_PERCENTAGE_PRECISION: u64 = 100_000_000;
