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

//! Bands, stakers and the per-pool share totals they feed.
//!
//! Every mutation here keeps `pool.total_*_shares == Σ staker.*_shares_per_pool` for each pool.
//! Methods take `&mut self` and may leave the ledger half updated when they fail, so callers
//! run them against a staged copy (see [crate::StakingState::apply]).

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    registry::{pool_index, BandLevel},
    BandId, BandLevelId, PoolId, StakingError,
};

/// Share values indexed by `pool_id - 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolShares(Vec<U256>);

impl PoolShares {
    pub fn zeroed(total_pools: usize) -> Self {
        Self(vec![U256::ZERO; total_pools])
    }

    pub fn get(&self, pool_id: PoolId) -> U256 {
        pool_index(pool_id, self.0.len()).map(|i| self.0[i]).unwrap_or_default()
    }

    pub fn as_slice(&self) -> &[U256] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|value| value.is_zero())
    }

    pub(crate) fn add(&mut self, pool_id: PoolId, amount: U256) -> Result<(), StakingError> {
        let index = pool_index(pool_id, self.0.len())?;
        self.0[index] = self.0[index]
            .checked_add(amount)
            .ok_or(StakingError::ArithmeticOverflow("pool shares"))?;
        Ok(())
    }

    pub(crate) fn sub(&mut self, pool_id: PoolId, amount: U256) -> Result<(), StakingError> {
        let index = pool_index(pool_id, self.0.len())?;
        self.0[index] = self.0[index]
            .checked_sub(amount)
            .ok_or(StakingError::ShareUnderflow("staker pool shares"))?;
        Ok(())
    }

    pub(crate) fn resize(&mut self, total_pools: usize) {
        self.0.resize(total_pools, U256::ZERO);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommitmentKind {
    /// Shares fixed at stake time from the declared number of months.
    Fixed { months: u16 },
    /// Shares accrue with elapsed time and are refreshed by syncs.
    Flexible,
}

impl CommitmentKind {
    pub fn is_fixed(&self) -> bool {
        matches!(self, CommitmentKind::Fixed { .. })
    }

    pub fn is_flexible(&self) -> bool {
        matches!(self, CommitmentKind::Flexible)
    }
}

/// One staking position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub id: BandId,
    pub owner: Address,
    pub start_timestamp: u64,
    pub band_level: BandLevelId,
    pub kind: CommitmentKind,
    pub vested: bool,
    /// Shares currently booked for this band in every pool of `accounted_pools`.
    pub shares: U256,
    /// Price of `band_level` at the time the band was staked or last changed level.
    pub staked_price: U256,
    /// Pools `shares` are booked in. Lags behind `band_level` for flexible bands until the
    /// next sync.
    pub accounted_pools: Vec<PoolId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staker {
    pub address: Address,
    pub fixed_bands: BTreeSet<BandId>,
    pub flexible_bands: BTreeSet<BandId>,
    pub staked_amount: U256,
    pub fixed_shares_per_pool: PoolShares,
    pub flexible_shares_per_pool: PoolShares,
    pub isolated_fixed_shares_per_pool: PoolShares,
    pub isolated_flexible_shares_per_pool: PoolShares,
}

impl Staker {
    fn new(address: Address, total_pools: usize) -> Self {
        Self {
            address,
            fixed_bands: BTreeSet::new(),
            flexible_bands: BTreeSet::new(),
            staked_amount: U256::ZERO,
            fixed_shares_per_pool: PoolShares::zeroed(total_pools),
            flexible_shares_per_pool: PoolShares::zeroed(total_pools),
            isolated_fixed_shares_per_pool: PoolShares::zeroed(total_pools),
            isolated_flexible_shares_per_pool: PoolShares::zeroed(total_pools),
        }
    }

    pub fn band_count(&self) -> usize {
        self.fixed_bands.len() + self.flexible_bands.len()
    }

    /// Fixed plus flexible shares in one pool.
    pub fn shares_in_pool(&self, pool_id: PoolId) -> Result<U256, StakingError> {
        self.fixed_shares_per_pool
            .get(pool_id)
            .checked_add(self.flexible_shares_per_pool.get(pool_id))
            .ok_or(StakingError::ArithmeticOverflow("staker shares"))
    }

    fn columns_mut(&mut self, kind: CommitmentKind) -> (&mut PoolShares, &mut PoolShares) {
        match kind {
            CommitmentKind::Fixed { .. } => {
                (&mut self.fixed_shares_per_pool, &mut self.isolated_fixed_shares_per_pool)
            }
            CommitmentKind::Flexible => {
                (&mut self.flexible_shares_per_pool, &mut self.isolated_flexible_shares_per_pool)
            }
        }
    }
}

/// Aggregate shares of one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTotals {
    pub total_fixed_shares: U256,
    pub total_flexible_shares: U256,
    pub isolated_fixed_shares: U256,
    pub isolated_flexible_shares: U256,
}

impl PoolTotals {
    /// Denominator used when splitting this pool's allocation.
    pub fn total_shares(&self) -> Result<U256, StakingError> {
        self.total_fixed_shares
            .checked_add(self.total_flexible_shares)
            .ok_or(StakingError::ArithmeticOverflow("pool shares"))
    }

    pub fn is_zero(&self) -> bool {
        self.total_fixed_shares.is_zero()
            && self.total_flexible_shares.is_zero()
            && self.isolated_fixed_shares.is_zero()
            && self.isolated_flexible_shares.is_zero()
    }

    fn columns_mut(&mut self, kind: CommitmentKind) -> (&mut U256, &mut U256) {
        match kind {
            CommitmentKind::Fixed { .. } => {
                (&mut self.total_fixed_shares, &mut self.isolated_fixed_shares)
            }
            CommitmentKind::Flexible => {
                (&mut self.total_flexible_shares, &mut self.isolated_flexible_shares)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLedger {
    pub(crate) pool_totals: Vec<PoolTotals>,
    pub(crate) stakers: BTreeMap<Address, Staker>,
    /// Active stakers in the order they first staked.
    pub(crate) staker_order: Vec<Address>,
    pub(crate) bands: BTreeMap<BandId, Band>,
    pub(crate) total_staked: U256,
}

impl ShareLedger {
    pub fn new(total_pools: usize) -> Self {
        Self { pool_totals: vec![PoolTotals::default(); total_pools], ..Default::default() }
    }

    pub fn total_pools(&self) -> usize {
        self.pool_totals.len()
    }

    pub fn pool_totals(&self, pool_id: PoolId) -> Result<&PoolTotals, StakingError> {
        Ok(&self.pool_totals[pool_index(pool_id, self.pool_totals.len())?])
    }

    pub fn all_pool_totals(&self) -> &[PoolTotals] {
        &self.pool_totals
    }

    pub fn staker(&self, address: &Address) -> Option<&Staker> {
        self.stakers.get(address)
    }

    /// Active stakers in first-stake order.
    pub fn stakers(&self) -> impl Iterator<Item = &Staker> {
        self.staker_order.iter().filter_map(|address| self.stakers.get(address))
    }

    pub fn staker_ids(&self) -> &[Address] {
        &self.staker_order
    }

    pub fn band(&self, band_id: BandId) -> Option<&Band> {
        self.bands.get(&band_id)
    }

    pub fn bands(&self) -> impl Iterator<Item = &Band> {
        self.bands.values()
    }

    pub fn total_staked(&self) -> U256 {
        self.total_staked
    }

    /// Book `shares` for `owner` in every pool of `pools`, plus the isolated column of the
    /// highest pool.
    fn credit(
        &mut self,
        owner: Address,
        kind: CommitmentKind,
        pools: &[PoolId],
        shares: U256,
    ) -> Result<(), StakingError> {
        if shares.is_zero() {
            return Ok(());
        }
        let total_pools = self.pool_totals.len();
        let staker =
            self.stakers.get_mut(&owner).ok_or(StakingError::ShareUnderflow("missing staker"))?;
        let pool_totals = &mut self.pool_totals;
        let (column, isolated_column) = staker.columns_mut(kind);
        for pool_id in pools {
            column.add(*pool_id, shares)?;
            let (total, _) = pool_totals[pool_index(*pool_id, total_pools)?].columns_mut(kind);
            *total =
                total.checked_add(shares).ok_or(StakingError::ArithmeticOverflow("pool shares"))?;
        }
        if let Some(isolated) = pools.iter().copied().max() {
            isolated_column.add(isolated, shares)?;
            let (_, total) = pool_totals[pool_index(isolated, total_pools)?].columns_mut(kind);
            *total = total
                .checked_add(shares)
                .ok_or(StakingError::ArithmeticOverflow("isolated pool shares"))?;
        }
        Ok(())
    }

    /// Inverse of [Self::credit].
    fn debit(
        &mut self,
        owner: Address,
        kind: CommitmentKind,
        pools: &[PoolId],
        shares: U256,
    ) -> Result<(), StakingError> {
        if shares.is_zero() {
            return Ok(());
        }
        let total_pools = self.pool_totals.len();
        let staker =
            self.stakers.get_mut(&owner).ok_or(StakingError::ShareUnderflow("missing staker"))?;
        let pool_totals = &mut self.pool_totals;
        let (column, isolated_column) = staker.columns_mut(kind);
        for pool_id in pools {
            column.sub(*pool_id, shares)?;
            let (total, _) = pool_totals[pool_index(*pool_id, total_pools)?].columns_mut(kind);
            *total = total.checked_sub(shares).ok_or(StakingError::ShareUnderflow("pool shares"))?;
        }
        if let Some(isolated) = pools.iter().copied().max() {
            isolated_column.sub(isolated, shares)?;
            let (_, total) = pool_totals[pool_index(isolated, total_pools)?].columns_mut(kind);
            *total = total
                .checked_sub(shares)
                .ok_or(StakingError::ShareUnderflow("isolated pool shares"))?;
        }
        Ok(())
    }

    /// Insert a new band, creating its staker on first stake, and book its shares in
    /// `band.accounted_pools`.
    pub(crate) fn open_band(&mut self, band: Band) -> Result<(), StakingError> {
        if self.bands.contains_key(&band.id) {
            return Err(StakingError::BandAlreadyExists(band.id));
        }
        let total_pools = self.pool_totals.len();
        if !self.stakers.contains_key(&band.owner) {
            self.stakers.insert(band.owner, Staker::new(band.owner, total_pools));
            self.staker_order.push(band.owner);
            tracing::debug!("New staker {}", band.owner);
        }
        let staker = self.stakers.get_mut(&band.owner).ok_or(StakingError::BandNotFound(band.id))?;
        match band.kind {
            CommitmentKind::Fixed { .. } => staker.fixed_bands.insert(band.id),
            CommitmentKind::Flexible => staker.flexible_bands.insert(band.id),
        };
        staker.staked_amount = staker
            .staked_amount
            .checked_add(band.staked_price)
            .ok_or(StakingError::ArithmeticOverflow("staked amount"))?;
        self.total_staked = self
            .total_staked
            .checked_add(band.staked_price)
            .ok_or(StakingError::ArithmeticOverflow("total staked"))?;
        self.credit(band.owner, band.kind, &band.accounted_pools, band.shares)?;
        self.bands.insert(band.id, band);
        Ok(())
    }

    /// Remove a band and its contribution. Drops the staker with its last band.
    pub(crate) fn close_band(&mut self, band_id: BandId) -> Result<Band, StakingError> {
        let band = self.bands.remove(&band_id).ok_or(StakingError::BandNotFound(band_id))?;
        self.debit(band.owner, band.kind, &band.accounted_pools, band.shares)?;
        self.total_staked = self
            .total_staked
            .checked_sub(band.staked_price)
            .ok_or(StakingError::ShareUnderflow("total staked"))?;

        let staker = self.stakers.get_mut(&band.owner).ok_or(StakingError::BandNotFound(band_id))?;
        staker.fixed_bands.remove(&band_id);
        staker.flexible_bands.remove(&band_id);
        staker.staked_amount = staker
            .staked_amount
            .checked_sub(band.staked_price)
            .ok_or(StakingError::ShareUnderflow("staked amount"))?;

        if staker.band_count() == 0 {
            self.remove_staker(band.owner)?;
        }
        Ok(band)
    }

    /// Drop an empty staker, zeroing whatever it still contributes to the pools.
    fn remove_staker(&mut self, address: Address) -> Result<(), StakingError> {
        let Some(staker) = self.stakers.remove(&address) else {
            return Ok(());
        };
        self.staker_order.retain(|id| *id != address);

        let residual = [
            &staker.fixed_shares_per_pool,
            &staker.flexible_shares_per_pool,
            &staker.isolated_fixed_shares_per_pool,
            &staker.isolated_flexible_shares_per_pool,
        ];
        if residual.iter().all(|column| column.is_zero()) {
            tracing::debug!("Removed staker {address}");
            return Ok(());
        }
        tracing::warn!("Removing staker {address} with residual pool shares");
        for (index, totals) in self.pool_totals.iter_mut().enumerate() {
            let sub = |total: &mut U256, column: &PoolShares| -> Result<(), StakingError> {
                let value = column.as_slice().get(index).copied().unwrap_or_default();
                *total = total
                    .checked_sub(value)
                    .ok_or(StakingError::ShareUnderflow("residual shares"))?;
                Ok(())
            };
            sub(&mut totals.total_fixed_shares, &staker.fixed_shares_per_pool)?;
            sub(&mut totals.total_flexible_shares, &staker.flexible_shares_per_pool)?;
            sub(&mut totals.isolated_fixed_shares, &staker.isolated_fixed_shares_per_pool)?;
            sub(&mut totals.isolated_flexible_shares, &staker.isolated_flexible_shares_per_pool)?;
        }
        Ok(())
    }

    /// Move a band to `level`, adjusting staked price and, for fixed bands, relocating the
    /// booked shares to the new level's pools. Flexible shares move on the next sync.
    pub(crate) fn change_band_level(
        &mut self,
        band_id: BandId,
        level: &BandLevel,
    ) -> Result<(), StakingError> {
        let band = self.bands.get(&band_id).ok_or(StakingError::BandNotFound(band_id))?.clone();

        if band.kind.is_fixed() {
            self.debit(band.owner, band.kind, &band.accounted_pools, band.shares)?;
            self.credit(band.owner, band.kind, &level.accessible_pools, band.shares)?;
        }

        let staker = self.stakers.get_mut(&band.owner).ok_or(StakingError::BandNotFound(band_id))?;
        staker.staked_amount = staker
            .staked_amount
            .checked_sub(band.staked_price)
            .and_then(|amount| amount.checked_add(level.price))
            .ok_or(StakingError::ArithmeticOverflow("staked amount"))?;
        self.total_staked = self
            .total_staked
            .checked_sub(band.staked_price)
            .and_then(|amount| amount.checked_add(level.price))
            .ok_or(StakingError::ArithmeticOverflow("total staked"))?;

        let stored = self.bands.get_mut(&band_id).ok_or(StakingError::BandNotFound(band_id))?;
        stored.band_level = level.id;
        stored.staked_price = level.price;
        if band.kind.is_fixed() {
            stored.accounted_pools = level.accessible_pools.clone();
        }
        Ok(())
    }

    /// Change the number of pools.
    ///
    /// Shrinking is refused while a removed pool still carries shares or a band still has
    /// shares booked in it.
    pub(crate) fn resize_pools(&mut self, total_pools: usize) -> Result<(), StakingError> {
        if total_pools < self.pool_totals.len() {
            let in_use = self.pool_totals[total_pools..]
                .iter()
                .position(|totals| !totals.is_zero())
                .map(|offset| total_pools + offset + 1)
                .or_else(|| {
                    self.bands
                        .values()
                        .flat_map(|band| band.accounted_pools.iter())
                        .map(|pool_id| usize::from(*pool_id))
                        .find(|pool| *pool > total_pools)
                });
            if let Some(pool) = in_use {
                return Err(StakingError::PoolOutOfRange {
                    pool_id: PoolId::try_from(pool).unwrap_or(PoolId::MAX),
                    total_pools,
                });
            }
        }
        self.pool_totals.resize(total_pools, PoolTotals::default());
        for staker in self.stakers.values_mut() {
            staker.fixed_shares_per_pool.resize(total_pools);
            staker.flexible_shares_per_pool.resize(total_pools);
            staker.isolated_fixed_shares_per_pool.resize(total_pools);
            staker.isolated_flexible_shares_per_pool.resize(total_pools);
        }
        Ok(())
    }

    /// Recompute every pool total from the staker rows and compare.
    pub fn check_consistency(&self) -> bool {
        let mut expected = vec![PoolTotals::default(); self.pool_totals.len()];
        for staker in self.stakers.values() {
            for (index, totals) in expected.iter_mut().enumerate() {
                let at = |column: &PoolShares| {
                    column.as_slice().get(index).copied().unwrap_or_default()
                };
                totals.total_fixed_shares += at(&staker.fixed_shares_per_pool);
                totals.total_flexible_shares += at(&staker.flexible_shares_per_pool);
                totals.isolated_fixed_shares += at(&staker.isolated_fixed_shares_per_pool);
                totals.isolated_flexible_shares += at(&staker.isolated_flexible_shares_per_pool);
            }
        }
        expected == self.pool_totals
    }
}
