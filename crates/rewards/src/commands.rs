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

//! Commands that drive a [StakingState], one per staking contract event.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    AccrualTable, Band, BandId, BandLevel, BandLevelId, CommitmentKind, Distribution, PoolId,
    StakingError, StakingState,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Command {
    SetSharesInMonth {
        shares_in_month: Vec<U256>,
    },
    SetTotalPools {
        total_pools: u16,
    },
    SetPool {
        pool_id: PoolId,
        distribution_percentage: u32,
    },
    SetTotalBandLevels {
        total_band_levels: u16,
    },
    SetBandLevel {
        band_level: BandLevelId,
        price: U256,
        accessible_pools: Vec<PoolId>,
    },
    Staked {
        owner: Address,
        band_id: BandId,
        band_level: BandLevelId,
        kind: CommitmentKind,
        #[serde(default)]
        vested: bool,
        timestamp: u64,
    },
    Unstaked {
        owner: Address,
        band_id: BandId,
        timestamp: u64,
    },
    BandUpgraded {
        owner: Address,
        band_id: BandId,
        old_level: BandLevelId,
        new_level: BandLevelId,
        timestamp: u64,
    },
    BandDowngraded {
        owner: Address,
        band_id: BandId,
        old_level: BandLevelId,
        new_level: BandLevelId,
        timestamp: u64,
    },
    /// Removes every band of `owner` together with its reward book.
    VestingUserDeleted {
        owner: Address,
        timestamp: u64,
    },
    SharesSyncTriggered {
        timestamp: u64,
    },
    DistributionRequested {
        token: Address,
        amount: U256,
        timestamp: u64,
    },
    DistributionExecuted {
        token: Address,
        timestamp: u64,
    },
    RewardsClaimed {
        owner: Address,
        token: Address,
        amount: U256,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetSharesInMonth { .. } => "SetSharesInMonth",
            Command::SetTotalPools { .. } => "SetTotalPools",
            Command::SetPool { .. } => "SetPool",
            Command::SetTotalBandLevels { .. } => "SetTotalBandLevels",
            Command::SetBandLevel { .. } => "SetBandLevel",
            Command::Staked { .. } => "Staked",
            Command::Unstaked { .. } => "Unstaked",
            Command::BandUpgraded { .. } => "BandUpgraded",
            Command::BandDowngraded { .. } => "BandDowngraded",
            Command::VestingUserDeleted { .. } => "VestingUserDeleted",
            Command::SharesSyncTriggered { .. } => "SharesSyncTriggered",
            Command::DistributionRequested { .. } => "DistributionRequested",
            Command::DistributionExecuted { .. } => "DistributionExecuted",
            Command::RewardsClaimed { .. } => "RewardsClaimed",
        }
    }
}

/// What a successfully applied command did besides its own mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// A flexible share sync ran as part of the command.
    pub synced: bool,
    /// Id of the distribution created by a `DistributionRequested` command.
    pub distribution_id: Option<u64>,
}

#[derive(Clone, Copy)]
enum LevelChange {
    Upgrade,
    Downgrade,
}

impl StakingState {
    /// Apply one command. On error the state is left exactly as it was.
    pub fn apply(&mut self, command: &Command) -> Result<ApplyReport, StakingError> {
        let mut staged = self.clone();
        let report = staged.apply_staged(command).inspect_err(|err| {
            tracing::debug!("Rejected {} command: {err}", command.name());
        })?;
        *self = staged;
        Ok(report)
    }

    fn apply_staged(&mut self, command: &Command) -> Result<ApplyReport, StakingError> {
        match command {
            Command::SetSharesInMonth { shares_in_month } => {
                self.set_shares_in_month(shares_in_month.clone())
            }
            Command::SetTotalPools { total_pools } => self.set_total_pools(*total_pools),
            Command::SetPool { pool_id, distribution_percentage } => {
                self.pools.set_percentage(*pool_id, *distribution_percentage)?;
                Ok(ApplyReport::default())
            }
            Command::SetTotalBandLevels { total_band_levels } => {
                self.band_levels.set_total_band_levels(*total_band_levels);
                Ok(ApplyReport::default())
            }
            Command::SetBandLevel { band_level, price, accessible_pools } => {
                let level = BandLevel {
                    id: *band_level,
                    price: *price,
                    accessible_pools: accessible_pools.clone(),
                };
                self.band_levels.set(level, &self.pools)?;
                Ok(ApplyReport::default())
            }
            Command::Staked { owner, band_id, band_level, kind, vested, timestamp } => {
                self.stake(*owner, *band_id, *band_level, *kind, *vested, *timestamp)
            }
            Command::Unstaked { owner, band_id, timestamp } => {
                self.unstake(*owner, *band_id, *timestamp)
            }
            Command::BandUpgraded { owner, band_id, old_level, new_level, timestamp } => self
                .change_level(
                    LevelChange::Upgrade,
                    *owner,
                    *band_id,
                    *old_level,
                    *new_level,
                    *timestamp,
                ),
            Command::BandDowngraded { owner, band_id, old_level, new_level, timestamp } => self
                .change_level(
                    LevelChange::Downgrade,
                    *owner,
                    *band_id,
                    *old_level,
                    *new_level,
                    *timestamp,
                ),
            Command::VestingUserDeleted { owner, timestamp } => {
                self.delete_vesting_user(*owner, *timestamp)
            }
            Command::SharesSyncTriggered { timestamp } => {
                Ok(ApplyReport { synced: self.try_sync(*timestamp)?, distribution_id: None })
            }
            Command::DistributionRequested { token, amount, timestamp } => {
                self.request_distribution(*token, *amount, *timestamp)
            }
            Command::DistributionExecuted { token, timestamp } => {
                self.execute_distribution(*token, *timestamp)
            }
            Command::RewardsClaimed { owner, token, amount } => {
                self.claim_rewards(*owner, *token, *amount)
            }
        }
    }

    fn set_shares_in_month(
        &mut self,
        shares_in_month: Vec<U256>,
    ) -> Result<ApplyReport, StakingError> {
        let table = AccrualTable::new(shares_in_month);
        if !table.is_non_decreasing() {
            tracing::warn!(
                "Accrual table is not non-decreasing; flexible shares may shrink over time"
            );
        }
        tracing::debug!("Accrual table set for {} months", table.len());
        self.shares_in_month = table;
        Ok(ApplyReport::default())
    }

    fn set_total_pools(&mut self, total_pools: u16) -> Result<ApplyReport, StakingError> {
        // Every live band must still resolve its current level at the next sync.
        if let Some(pool_id) = self
            .ledger
            .bands()
            .filter_map(|band| self.band_levels.get(band.band_level))
            .flat_map(|level| level.accessible_pools.iter().copied())
            .find(|pool_id| *pool_id > total_pools)
        {
            return Err(StakingError::PoolOutOfRange {
                pool_id,
                total_pools: usize::from(total_pools),
            });
        }
        self.ledger.resize_pools(usize::from(total_pools))?;
        self.pools.resize(total_pools);
        if let Some(level) = self
            .band_levels
            .iter()
            .find(|level| level.accessible_pools.iter().any(|pool| *pool > total_pools))
        {
            tracing::warn!(
                "Band level {} references pools beyond the new total of {total_pools}",
                level.id
            );
        }
        Ok(ApplyReport::default())
    }

    fn stake(
        &mut self,
        owner: Address,
        band_id: BandId,
        band_level: BandLevelId,
        kind: CommitmentKind,
        vested: bool,
        timestamp: u64,
    ) -> Result<ApplyReport, StakingError> {
        if self.ledger.band(band_id).is_some() {
            return Err(StakingError::BandAlreadyExists(band_id));
        }
        let level = self.band_levels.resolve(band_level, &self.pools)?.clone();
        let shares = match kind {
            CommitmentKind::Fixed { months } => self.shares_in_month.fixed_shares(months)?,
            CommitmentKind::Flexible => U256::ZERO,
        };

        let synced = self.try_sync(timestamp)?;
        self.ledger.open_band(Band {
            id: band_id,
            owner,
            start_timestamp: timestamp,
            band_level,
            kind,
            vested,
            shares,
            staked_price: level.price,
            accounted_pools: level.accessible_pools,
        })?;
        tracing::debug!(
            "Band {band_id} staked by {owner} at level {band_level} with {shares} shares"
        );
        Ok(ApplyReport { synced, distribution_id: None })
    }

    fn owned_band(&self, owner: Address, band_id: BandId) -> Result<&Band, StakingError> {
        let band = self.ledger.band(band_id).ok_or(StakingError::BandNotFound(band_id))?;
        if band.owner != owner {
            return Err(StakingError::NotBandOwner { band_id, owner: band.owner, caller: owner });
        }
        Ok(band)
    }

    fn unstake(
        &mut self,
        owner: Address,
        band_id: BandId,
        timestamp: u64,
    ) -> Result<ApplyReport, StakingError> {
        self.owned_band(owner, band_id)?;
        let synced = self.try_sync(timestamp)?;
        let band = self.ledger.close_band(band_id)?;
        tracing::debug!("Band {band_id} unstaked by {owner}, released {} shares", band.shares);
        Ok(ApplyReport { synced, distribution_id: None })
    }

    fn change_level(
        &mut self,
        change: LevelChange,
        owner: Address,
        band_id: BandId,
        old_level: BandLevelId,
        new_level: BandLevelId,
        timestamp: u64,
    ) -> Result<ApplyReport, StakingError> {
        let band = self.owned_band(owner, band_id)?;
        if band.band_level != old_level {
            return Err(StakingError::BandLevelMismatch {
                band_id,
                expected: old_level,
                actual: band.band_level,
            });
        }
        let valid = match change {
            LevelChange::Upgrade => new_level > old_level,
            LevelChange::Downgrade => new_level < old_level,
        };
        if !valid {
            return Err(StakingError::InvalidLevelChange {
                band_id,
                from: old_level,
                to: new_level,
            });
        }
        let level = self.band_levels.resolve(new_level, &self.pools)?.clone();

        let synced = self.try_sync(timestamp)?;
        self.ledger.change_band_level(band_id, &level)?;
        tracing::debug!("Band {band_id} moved from level {old_level} to {new_level}");
        Ok(ApplyReport { synced, distribution_id: None })
    }

    fn delete_vesting_user(
        &mut self,
        owner: Address,
        timestamp: u64,
    ) -> Result<ApplyReport, StakingError> {
        let synced = self.try_sync(timestamp)?;
        let band_ids: Vec<BandId> = self
            .ledger
            .staker(&owner)
            .map(|staker| {
                staker.fixed_bands.iter().chain(&staker.flexible_bands).copied().collect()
            })
            .unwrap_or_default();
        for band_id in &band_ids {
            self.ledger.close_band(*band_id)?;
        }
        let reward_rows = self.rewards.remove(&owner).map_or(0, |tokens| tokens.len());
        tracing::info!(
            "Deleted vesting user {owner}: {} bands, {reward_rows} reward rows",
            band_ids.len()
        );
        Ok(ApplyReport { synced, distribution_id: None })
    }

    fn request_distribution(
        &mut self,
        token: Address,
        amount: U256,
        timestamp: u64,
    ) -> Result<ApplyReport, StakingError> {
        self.force_sync(timestamp)?;
        let allocation = self.allocate(amount)?;

        let id = self.next_distribution_id;
        self.next_distribution_id += 1;
        let distribution = Distribution {
            id,
            token,
            amount,
            created_at: timestamp,
            distributed_at: None,
            stakers: allocation.stakers,
            rewards: allocation.rewards,
        };
        tracing::info!(
            "Distribution {id} of {amount} {token} allocated to {} stakers, dust {}",
            distribution.stakers.len(),
            distribution.dust()
        );
        self.distributions.push(distribution);
        Ok(ApplyReport { synced: true, distribution_id: Some(id) })
    }

    fn execute_distribution(
        &mut self,
        token: Address,
        timestamp: u64,
    ) -> Result<ApplyReport, StakingError> {
        let distribution = self
            .distributions
            .iter_mut()
            .find(|d| d.token == token && d.is_pending())
            .ok_or(StakingError::NoPendingDistribution(token))?;
        distribution.distributed_at = Some(timestamp);

        for (staker, reward) in distribution.payouts() {
            if reward.is_zero() {
                continue;
            }
            let row = self.rewards.entry(staker).or_default().entry(token).or_default();
            row.unclaimed = row
                .unclaimed
                .checked_add(reward)
                .ok_or(StakingError::ArithmeticOverflow("unclaimed rewards"))?;
        }
        tracing::info!("Distribution {} of {token} executed at {timestamp}", distribution.id);
        Ok(ApplyReport { synced: false, distribution_id: Some(distribution.id) })
    }

    fn claim_rewards(
        &mut self,
        owner: Address,
        token: Address,
        amount: U256,
    ) -> Result<ApplyReport, StakingError> {
        if amount.is_zero() {
            return Ok(ApplyReport::default());
        }
        let available = self.staker_rewards(owner, token).unclaimed;
        if amount > available {
            return Err(StakingError::InsufficientRewards {
                staker: owner,
                token,
                requested: amount,
                available,
            });
        }
        let row = self.rewards.entry(owner).or_default().entry(token).or_default();
        row.unclaimed -= amount;
        row.claimed = row
            .claimed
            .checked_add(amount)
            .ok_or(StakingError::ArithmeticOverflow("claimed rewards"))?;
        tracing::debug!("{owner} claimed {amount} of {token}");
        Ok(ApplyReport::default())
    }
}
