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

//! Flexible share synchronization.
//!
//! A sync recomputes the shares of every flexible band from its start timestamp and rebuilds
//! the flexible and isolated flexible columns of every staker and pool from scratch. The whole
//! pass is computed before anything is written back, so a failing pass leaves the state as it
//! was.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    ledger::{PoolShares, ShareLedger},
    registry::pool_index,
    BandId, PoolId, StakingError, StakingState,
};

/// Result of a flexible recount, not yet applied to the ledger.
struct FlexibleRecount {
    bands: Vec<(BandId, U256, Vec<PoolId>)>,
    stakers: BTreeMap<Address, (PoolShares, PoolShares)>,
    pools: Vec<(U256, U256)>,
}

impl FlexibleRecount {
    fn commit(self, ledger: &mut ShareLedger) {
        for (band_id, shares, pools) in self.bands {
            if let Some(band) = ledger.bands.get_mut(&band_id) {
                band.shares = shares;
                band.accounted_pools = pools;
            }
        }
        for (address, (flexible, isolated)) in self.stakers {
            if let Some(staker) = ledger.stakers.get_mut(&address) {
                staker.flexible_shares_per_pool = flexible;
                staker.isolated_flexible_shares_per_pool = isolated;
            }
        }
        for (totals, (flexible, isolated)) in ledger.pool_totals.iter_mut().zip(self.pools) {
            totals.total_flexible_shares = flexible;
            totals.isolated_flexible_shares = isolated;
        }
    }
}

fn add_to(total: &mut U256, shares: U256) -> Result<(), StakingError> {
    *total = total.checked_add(shares).ok_or(StakingError::ArithmeticOverflow("flexible shares"))?;
    Ok(())
}

impl StakingState {
    /// Sync flexible shares if at least `sync_interval` seconds passed since the last sync.
    ///
    /// Returns whether a sync ran. A gated call changes nothing.
    pub fn try_sync(&mut self, now: u64) -> Result<bool, StakingError> {
        if now < self.last_sync_timestamp {
            return Err(StakingError::NonMonotonicSync { now, last_sync: self.last_sync_timestamp });
        }
        if now - self.last_sync_timestamp < self.config.sync_interval {
            tracing::trace!(
                "Skipping sync at {now}: last sync at {} is within the interval",
                self.last_sync_timestamp
            );
            return Ok(false);
        }
        self.force_sync(now)?;
        Ok(true)
    }

    /// Sync flexible shares regardless of the interval. Still refuses to go back in time.
    pub fn force_sync(&mut self, now: u64) -> Result<(), StakingError> {
        if now < self.last_sync_timestamp {
            return Err(StakingError::NonMonotonicSync { now, last_sync: self.last_sync_timestamp });
        }
        let recount = self.recount_flexible(now)?;
        let bands = recount.bands.len();
        recount.commit(&mut self.ledger);
        self.last_sync_timestamp = now;
        tracing::info!("Synced {bands} flexible bands at {now}");
        Ok(())
    }

    fn recount_flexible(&self, now: u64) -> Result<FlexibleRecount, StakingError> {
        let total_pools = self.ledger.total_pools();
        let mut recount = FlexibleRecount {
            bands: Vec::new(),
            stakers: BTreeMap::new(),
            pools: vec![(U256::ZERO, U256::ZERO); total_pools],
        };

        for staker in self.ledger.stakers() {
            let mut flexible = PoolShares::zeroed(total_pools);
            let mut isolated = PoolShares::zeroed(total_pools);

            for band_id in &staker.flexible_bands {
                let band = self.ledger.band(*band_id).ok_or(StakingError::BandNotFound(*band_id))?;
                let level = self.band_levels.resolve(band.band_level, &self.pools)?;
                let shares = self.shares_in_month.flexible_shares(
                    band.start_timestamp,
                    now,
                    self.config.seconds_per_month,
                );

                for pool_id in &level.accessible_pools {
                    flexible.add(*pool_id, shares)?;
                    add_to(&mut recount.pools[pool_index(*pool_id, total_pools)?].0, shares)?;
                }
                if let Some(pool_id) = level.isolated_pool() {
                    isolated.add(pool_id, shares)?;
                    add_to(&mut recount.pools[pool_index(pool_id, total_pools)?].1, shares)?;
                }
                recount.bands.push((*band_id, shares, level.accessible_pools.clone()));
            }
            recount.stakers.insert(staker.address, (flexible, isolated));
        }
        Ok(recount)
    }
}

/// Per staker and per pool shares an allocation pass reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharesSnapshot {
    /// Stakers in allocation order.
    pub stakers: Vec<Address>,
    /// `shares_for_stakers[s][p]` is the fixed plus flexible shares of `stakers[s]` in pool `p + 1`.
    pub shares_for_stakers: Vec<Vec<U256>>,
    /// Fixed plus flexible total of each pool.
    pub shares_for_pools: Vec<U256>,
}

impl SharesSnapshot {
    pub fn from_ledger(ledger: &ShareLedger) -> Result<Self, StakingError> {
        let total_pools = ledger.total_pools();
        let mut snapshot = Self::default();
        for staker in ledger.stakers() {
            let shares = (1..=total_pools)
                .map(|pool| {
                    let pool_id = PoolId::try_from(pool).map_err(|_| {
                        StakingError::PoolOutOfRange { pool_id: PoolId::MAX, total_pools }
                    })?;
                    staker.shares_in_pool(pool_id)
                })
                .collect::<Result<Vec<_>, _>>()?;
            snapshot.stakers.push(staker.address);
            snapshot.shares_for_stakers.push(shares);
        }
        snapshot.shares_for_pools = ledger
            .all_pool_totals()
            .iter()
            .map(|totals| totals.total_shares())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(snapshot)
    }
}
