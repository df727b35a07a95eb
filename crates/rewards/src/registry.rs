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

//! Pool and band level registries.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::{BandLevelId, PoolId, StakingError};

/// Distribution percentage of every pool, indexed by `pool_id - 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRegistry {
    percentages: Vec<u32>,
}

impl PoolRegistry {
    pub fn new(total_pools: u16) -> Self {
        Self { percentages: vec![0; usize::from(total_pools)] }
    }

    pub fn total_pools(&self) -> usize {
        self.percentages.len()
    }

    /// Index of `pool_id` into per-pool vectors, or [StakingError::PoolOutOfRange].
    pub fn check_pool(&self, pool_id: PoolId) -> Result<usize, StakingError> {
        pool_index(pool_id, self.percentages.len())
    }

    pub fn percentage(&self, pool_id: PoolId) -> Result<u32, StakingError> {
        Ok(self.percentages[self.check_pool(pool_id)?])
    }

    pub fn set_percentage(&mut self, pool_id: PoolId, percentage: u32) -> Result<(), StakingError> {
        let index = self.check_pool(pool_id)?;
        self.percentages[index] = percentage;
        Ok(())
    }

    /// Grow or shrink the registry. New pools start at zero percent.
    pub(crate) fn resize(&mut self, total_pools: u16) {
        self.percentages.resize(usize::from(total_pools), 0);
    }

    pub fn percentages(&self) -> &[u32] {
        &self.percentages
    }

    /// `(pool_id, percentage)` in pool order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolId, u32)> + '_ {
        (1..).zip(self.percentages.iter().copied())
    }

    /// Sum of all percentages, widened so it cannot overflow.
    pub fn total_percentage(&self) -> u64 {
        self.percentages.iter().map(|p| u64::from(*p)).sum()
    }
}

/// Maps a 1-based pool id onto a vector index.
pub(crate) fn pool_index(pool_id: PoolId, total_pools: usize) -> Result<usize, StakingError> {
    let index = usize::from(pool_id);
    if index == 0 || index > total_pools {
        return Err(StakingError::PoolOutOfRange { pool_id, total_pools });
    }
    Ok(index - 1)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandLevel {
    pub id: BandLevelId,
    pub price: U256,
    /// Pools a band at this level books shares in. Order is preserved as configured.
    pub accessible_pools: Vec<PoolId>,
}

impl BandLevel {
    /// Highest accessible pool, the one receiving isolated shares.
    pub fn isolated_pool(&self) -> Option<PoolId> {
        self.accessible_pools.iter().copied().max()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandLevelRegistry {
    total_band_levels: u16,
    levels: BTreeMap<BandLevelId, BandLevel>,
}

impl BandLevelRegistry {
    pub fn total_band_levels(&self) -> u16 {
        self.total_band_levels
    }

    pub(crate) fn set_total_band_levels(&mut self, total: u16) {
        self.total_band_levels = total;
    }

    pub fn get(&self, id: BandLevelId) -> Option<&BandLevel> {
        self.levels.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BandLevel> {
        self.levels.values()
    }

    /// Insert or replace a level after bounds checking its pools. A pool may appear only once.
    pub fn set(&mut self, level: BandLevel, pools: &PoolRegistry) -> Result<(), StakingError> {
        if level.id == 0 {
            return Err(StakingError::InvalidBandLevel(level.id));
        }
        let mut seen = BTreeSet::new();
        if !level.accessible_pools.iter().all(|pool_id| seen.insert(*pool_id)) {
            return Err(StakingError::InvalidBandLevel(level.id));
        }
        for pool_id in &level.accessible_pools {
            pools.check_pool(*pool_id)?;
        }
        if level.id > self.total_band_levels {
            tracing::warn!(
                "Band level {} is above the configured total of {} levels",
                level.id,
                self.total_band_levels
            );
        }
        self.levels.insert(level.id, level);
        Ok(())
    }

    /// Look up a level that a band may be placed at.
    ///
    /// Fails with [StakingError::InvalidBandLevel] when the level is unknown or has no pools,
    /// and with [StakingError::PoolOutOfRange] when one of its pools no longer exists.
    pub fn resolve(
        &self,
        id: BandLevelId,
        pools: &PoolRegistry,
    ) -> Result<&BandLevel, StakingError> {
        let level = self
            .levels
            .get(&id)
            .filter(|level| !level.accessible_pools.is_empty())
            .ok_or(StakingError::InvalidBandLevel(id))?;
        for pool_id in &level.accessible_pools {
            pools.check_pool(*pool_id)?;
        }
        Ok(level)
    }
}
