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

//! The state every operation is threaded through.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    allocator::{allocate, Allocation},
    AccrualTable, BandLevelRegistry, Distribution, PoolRegistry, ShareLedger, SharesSnapshot,
    StakerRewards, StakingConfig, StakingError,
};

/// Registries, share ledger, distributions and reward book of one staking contract.
///
/// Mutate it through [StakingState::apply]; the sync entry points are also public.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingState {
    pub(crate) config: StakingConfig,
    pub(crate) shares_in_month: AccrualTable,
    pub(crate) pools: PoolRegistry,
    pub(crate) band_levels: BandLevelRegistry,
    pub(crate) ledger: ShareLedger,
    pub(crate) last_sync_timestamp: u64,
    pub(crate) next_distribution_id: u64,
    pub(crate) distributions: Vec<Distribution>,
    /// Staker -> token -> balance. Outlives the staker's bands.
    pub(crate) rewards: BTreeMap<Address, BTreeMap<Address, StakerRewards>>,
}

impl StakingState {
    pub fn new(config: StakingConfig) -> Self {
        Self {
            config,
            shares_in_month: AccrualTable::default(),
            pools: PoolRegistry::default(),
            band_levels: BandLevelRegistry::default(),
            ledger: ShareLedger::default(),
            last_sync_timestamp: 0,
            next_distribution_id: 0,
            distributions: Vec::new(),
            rewards: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &StakingConfig {
        &self.config
    }

    pub fn shares_in_month(&self) -> &AccrualTable {
        &self.shares_in_month
    }

    pub fn pools(&self) -> &PoolRegistry {
        &self.pools
    }

    pub fn band_levels(&self) -> &BandLevelRegistry {
        &self.band_levels
    }

    pub fn ledger(&self) -> &ShareLedger {
        &self.ledger
    }

    pub fn last_sync_timestamp(&self) -> u64 {
        self.last_sync_timestamp
    }

    pub fn next_distribution_id(&self) -> u64 {
        self.next_distribution_id
    }

    pub fn distributions(&self) -> &[Distribution] {
        &self.distributions
    }

    pub fn distribution(&self, id: u64) -> Option<&Distribution> {
        self.distributions.iter().find(|distribution| distribution.id == id)
    }

    /// Oldest distribution of `token` that has not been executed yet.
    pub fn pending_distribution(&self, token: Address) -> Option<&Distribution> {
        self.distributions.iter().find(|d| d.token == token && d.is_pending())
    }

    pub fn pending_distributions(&self) -> impl Iterator<Item = &Distribution> {
        self.distributions.iter().filter(|d| d.is_pending())
    }

    pub fn staker_rewards(&self, staker: Address, token: Address) -> StakerRewards {
        self.rewards
            .get(&staker)
            .and_then(|tokens| tokens.get(&token))
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn reward_rows(
        &self,
    ) -> impl Iterator<Item = (Address, Address, StakerRewards)> + '_ {
        self.rewards.iter().flat_map(|(staker, tokens)| {
            tokens.iter().map(move |(token, rewards)| (*staker, *token, *rewards))
        })
    }

    /// Unclaimed rewards of `staker` summed over every token.
    pub fn total_unclaimed_rewards(&self, staker: Address) -> U256 {
        self.rewards.get(&staker).map_or(U256::ZERO, |tokens| {
            tokens.values().fold(U256::ZERO, |acc, row| acc.saturating_add(row.unclaimed))
        })
    }

    /// Claimed rewards of `staker` summed over every token.
    pub fn total_claimed_rewards(&self, staker: Address) -> U256 {
        self.rewards.get(&staker).map_or(U256::ZERO, |tokens| {
            tokens.values().fold(U256::ZERO, |acc, row| acc.saturating_add(row.claimed))
        })
    }

    /// Shares as the allocator would read them right now, without syncing.
    pub fn shares_snapshot(&self) -> Result<SharesSnapshot, StakingError> {
        SharesSnapshot::from_ledger(&self.ledger)
    }

    /// Allocate `amount` against the current ledger, without syncing.
    pub fn allocate(&self, amount: U256) -> Result<Allocation, StakingError> {
        allocate(
            amount,
            self.pools.percentages(),
            self.config.percentage_precision,
            &self.shares_snapshot()?,
        )
    }
}
