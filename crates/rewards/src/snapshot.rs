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

//! Read-only, serializable view of a [StakingState] for query layers.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{Band, BandId, BandLevel, Distribution, PoolId, StakingState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub distribution_percentage: u32,
    pub total_fixed_shares: U256,
    pub total_flexible_shares: U256,
    pub isolated_fixed_shares: U256,
    pub isolated_flexible_shares: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakerView {
    pub address: Address,
    pub fixed_bands: Vec<BandId>,
    pub flexible_bands: Vec<BandId>,
    pub staked_amount: U256,
    pub fixed_shares_per_pool: Vec<U256>,
    pub flexible_shares_per_pool: Vec<U256>,
    pub isolated_fixed_shares_per_pool: Vec<U256>,
    pub isolated_flexible_shares_per_pool: Vec<U256>,
    pub total_unclaimed_rewards: U256,
    pub total_claimed_rewards: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakerRewardsRow {
    pub staker: Address,
    pub token: Address,
    pub unclaimed: U256,
    pub claimed: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub shares_in_month: Vec<U256>,
    pub total_pools: usize,
    pub total_band_levels: u16,
    pub last_sync_timestamp: u64,
    pub total_staked: U256,
    pub next_distribution_id: u64,
    /// Active stakers in first-stake order.
    pub all_staker_ids: Vec<Address>,
    pub pools: Vec<Pool>,
    pub band_levels: Vec<BandLevel>,
    pub stakers: Vec<StakerView>,
    pub bands: Vec<Band>,
    pub rewards: Vec<StakerRewardsRow>,
    pub distributions: Vec<Distribution>,
}

impl StakingState {
    pub fn snapshot(&self) -> LedgerSnapshot {
        let ledger = self.ledger();
        let pools = self
            .pools()
            .iter()
            .zip(ledger.all_pool_totals())
            .map(|((id, distribution_percentage), totals)| Pool {
                id,
                distribution_percentage,
                total_fixed_shares: totals.total_fixed_shares,
                total_flexible_shares: totals.total_flexible_shares,
                isolated_fixed_shares: totals.isolated_fixed_shares,
                isolated_flexible_shares: totals.isolated_flexible_shares,
            })
            .collect();
        let stakers = ledger
            .stakers()
            .map(|staker| StakerView {
                address: staker.address,
                fixed_bands: staker.fixed_bands.iter().copied().collect(),
                flexible_bands: staker.flexible_bands.iter().copied().collect(),
                staked_amount: staker.staked_amount,
                fixed_shares_per_pool: staker.fixed_shares_per_pool.as_slice().to_vec(),
                flexible_shares_per_pool: staker.flexible_shares_per_pool.as_slice().to_vec(),
                isolated_fixed_shares_per_pool: staker
                    .isolated_fixed_shares_per_pool
                    .as_slice()
                    .to_vec(),
                isolated_flexible_shares_per_pool: staker
                    .isolated_flexible_shares_per_pool
                    .as_slice()
                    .to_vec(),
                total_unclaimed_rewards: self.total_unclaimed_rewards(staker.address),
                total_claimed_rewards: self.total_claimed_rewards(staker.address),
            })
            .collect();
        let rewards = self
            .reward_rows()
            .map(|(staker, token, row)| StakerRewardsRow {
                staker,
                token,
                unclaimed: row.unclaimed,
                claimed: row.claimed,
            })
            .collect();

        LedgerSnapshot {
            shares_in_month: self.shares_in_month().as_slice().to_vec(),
            total_pools: self.pools().total_pools(),
            total_band_levels: self.band_levels().total_band_levels(),
            last_sync_timestamp: self.last_sync_timestamp(),
            total_staked: ledger.total_staked(),
            next_distribution_id: self.next_distribution_id(),
            all_staker_ids: ledger.staker_ids().to_vec(),
            pools,
            band_levels: self.band_levels().iter().cloned().collect(),
            stakers,
            bands: ledger.bands().cloned().collect(),
            rewards,
            distributions: self.distributions().to_vec(),
        }
    }
}
