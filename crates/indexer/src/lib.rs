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

//! Host adapters around the `band-rewards` ledger: an incremental indexer that replays a command
//! log and a pull-based source for one-off distribution runs.

use band_rewards::StakingConfig;
use clap::Args;

pub mod service;
pub mod source;
pub mod store;

pub use service::{RewardsIndexerService, RewardsIndexerServiceConfig, RunSummary};
pub use source::{JsonStateSource, StateDump};
pub use store::{Checkpoint, FileStore, PendingPayouts, RewardsIndexerStore, StoreError, StoreObj};

/// Staking constants shared by both binaries.
#[derive(Args, Debug, Clone)]
pub struct StakingArgs {
    /// Length of a month in seconds for share accrual.
    #[clap(long, env, default_value_t = band_rewards::SECONDS_PER_MONTH)]
    pub seconds_per_month: u64,

    /// Minimum number of seconds between two flexible share syncs.
    #[clap(long, env, default_value_t = band_rewards::DEFAULT_SYNC_INTERVAL)]
    pub sync_interval: u64,

    /// Denominator of the pool distribution percentages.
    #[clap(long, env, default_value_t = band_rewards::DEFAULT_PERCENTAGE_PRECISION)]
    pub percentage_precision: u64,
}

impl From<StakingArgs> for StakingConfig {
    fn from(args: StakingArgs) -> Self {
        StakingConfig {
            seconds_per_month: args.seconds_per_month,
            sync_interval: args.sync_interval,
            percentage_precision: args.percentage_precision,
        }
    }
}
