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

//! [StakingSource] backed by a JSON dump of the staking contract storage.

use std::{collections::BTreeMap, path::Path};

use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use async_trait::async_trait;
use band_rewards::{BandId, BandLevel, BandLevelId, BandRecord, PoolId, StakingSource};
use serde::{Deserialize, Serialize};

/// Full contract storage as exported by a chain reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDump {
    pub shares_in_month: Vec<U256>,
    /// Distribution percentage of pool `i + 1`.
    pub pools: Vec<u32>,
    /// Level `i + 1`.
    pub band_levels: Vec<BandLevel>,
    /// Stakers in first-stake order.
    pub stakers: Vec<Address>,
    pub bands: BTreeMap<BandId, BandRecord>,
}

#[derive(Debug, Clone)]
pub struct JsonStateSource {
    dump: StateDump,
}

impl JsonStateSource {
    pub fn new(dump: StateDump) -> Self {
        Self { dump }
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read state dump {}", path.display()))?;
        let dump = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse state dump {}", path.display()))?;
        Ok(Self { dump })
    }
}

#[async_trait]
impl StakingSource for JsonStateSource {
    async fn shares_in_month(&self) -> Result<Vec<U256>> {
        Ok(self.dump.shares_in_month.clone())
    }

    async fn total_pools(&self) -> Result<u16> {
        u16::try_from(self.dump.pools.len()).context("Too many pools in state dump")
    }

    async fn pool_percentage(&self, pool_id: PoolId) -> Result<u32> {
        usize::from(pool_id)
            .checked_sub(1)
            .and_then(|index| self.dump.pools.get(index))
            .copied()
            .with_context(|| format!("Pool {pool_id} missing from state dump"))
    }

    async fn total_band_levels(&self) -> Result<u16> {
        u16::try_from(self.dump.band_levels.len()).context("Too many band levels in state dump")
    }

    async fn band_level(&self, band_level: BandLevelId) -> Result<BandLevel> {
        let level = usize::from(band_level)
            .checked_sub(1)
            .and_then(|index| self.dump.band_levels.get(index))
            .with_context(|| format!("Band level {band_level} missing from state dump"))?;
        if level.id != band_level {
            anyhow::bail!("Band level at position {band_level} has id {}", level.id);
        }
        Ok(level.clone())
    }

    async fn stakers(&self) -> Result<Vec<Address>> {
        Ok(self.dump.stakers.clone())
    }

    async fn staker_bands(&self, staker: Address) -> Result<Vec<BandId>> {
        Ok(self
            .dump
            .bands
            .iter()
            .filter(|(_, band)| band.owner == staker)
            .map(|(band_id, _)| *band_id)
            .collect())
    }

    async fn band(&self, band_id: BandId) -> Result<BandRecord> {
        self.dump
            .bands
            .get(&band_id)
            .cloned()
            .with_context(|| format!("Band {band_id} missing from state dump"))
    }
}
