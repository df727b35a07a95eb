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

//! Full-state prefetching for hosts that read the staking contract directly instead of
//! replaying its events.

use alloy_primitives::{Address, U256};
use anyhow::Context;
use async_trait::async_trait;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::{
    Allocation, Band, BandId, BandLevel, BandLevelId, Command, CommitmentKind, PoolId,
    StakingConfig, StakingError, StakingState,
};

/// A band as stored by the staking contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandRecord {
    pub owner: Address,
    pub start_timestamp: u64,
    pub band_level: BandLevelId,
    pub kind: CommitmentKind,
    #[serde(default)]
    pub vested: bool,
}

/// Read accessors of the staking contract.
#[async_trait]
pub trait StakingSource: Send + Sync {
    async fn shares_in_month(&self) -> anyhow::Result<Vec<U256>>;
    async fn total_pools(&self) -> anyhow::Result<u16>;
    async fn pool_percentage(&self, pool_id: PoolId) -> anyhow::Result<u32>;
    async fn total_band_levels(&self) -> anyhow::Result<u16>;
    async fn band_level(&self, band_level: BandLevelId) -> anyhow::Result<BandLevel>;
    async fn stakers(&self) -> anyhow::Result<Vec<Address>>;
    async fn staker_bands(&self, staker: Address) -> anyhow::Result<Vec<BandId>>;
    async fn band(&self, band_id: BandId) -> anyhow::Result<BandRecord>;
}

impl StakingState {
    /// Insert a band read from the contract without syncing. Flexible bands start at zero
    /// shares until the next sync.
    pub(crate) fn restore_band(
        &mut self,
        band_id: BandId,
        record: BandRecord,
    ) -> Result<(), StakingError> {
        let level = self.band_levels.resolve(record.band_level, &self.pools)?.clone();
        let shares = match record.kind {
            CommitmentKind::Fixed { months } => self.shares_in_month.fixed_shares(months)?,
            CommitmentKind::Flexible => U256::ZERO,
        };
        self.ledger.open_band(Band {
            id: band_id,
            owner: record.owner,
            start_timestamp: record.start_timestamp,
            band_level: record.band_level,
            kind: record.kind,
            vested: record.vested,
            shares,
            staked_price: level.price,
            accounted_pools: level.accessible_pools,
        })
    }
}

/// Prefetch registries, stakers and bands from `source` into a fresh [StakingState].
///
/// Flexible shares are left unsynced; call [StakingState::force_sync] before allocating.
pub async fn build_staking_state<S: StakingSource + ?Sized>(
    source: &S,
    config: StakingConfig,
) -> anyhow::Result<StakingState> {
    config.validate()?;
    let mut state = StakingState::new(config);

    let (shares_in_month, total_pools, total_band_levels) = futures_util::try_join!(
        source.shares_in_month(),
        source.total_pools(),
        source.total_band_levels()
    )
    .context("Failed to fetch staking configuration")?;

    tracing::debug!("Fetching {total_pools} pools and {total_band_levels} band levels");
    let percentages =
        try_join_all((1..=total_pools).map(|pool_id| source.pool_percentage(pool_id)))
            .await
            .context("Failed to fetch pools")?;
    let band_levels =
        try_join_all((1..=total_band_levels).map(|band_level| source.band_level(band_level)))
            .await
            .context("Failed to fetch band levels")?;

    let mut setup = vec![
        Command::SetSharesInMonth { shares_in_month },
        Command::SetTotalPools { total_pools },
        Command::SetTotalBandLevels { total_band_levels },
    ];
    setup.extend((1..=total_pools).zip(percentages).map(|(pool_id, distribution_percentage)| {
        Command::SetPool { pool_id, distribution_percentage }
    }));
    setup.extend(band_levels.into_iter().map(|level| Command::SetBandLevel {
        band_level: level.id,
        price: level.price,
        accessible_pools: level.accessible_pools,
    }));
    for command in &setup {
        state.apply(command).with_context(|| format!("Failed to apply {}", command.name()))?;
    }

    let stakers = source.stakers().await.context("Failed to fetch stakers")?;
    let band_ids = try_join_all(stakers.iter().map(|staker| source.staker_bands(*staker)))
        .await
        .context("Failed to fetch staker bands")?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();
    tracing::debug!("Fetching {} bands for {} stakers", band_ids.len(), stakers.len());
    let records = try_join_all(band_ids.iter().map(|band_id| source.band(*band_id)))
        .await
        .context("Failed to fetch bands")?;

    for (band_id, record) in band_ids.into_iter().zip(records) {
        state
            .restore_band(band_id, record)
            .with_context(|| format!("Failed to load band {band_id}"))?;
    }

    tracing::info!(
        "Built staking state: {} pools, {} band levels, {} stakers, {} bands",
        state.pools().total_pools(),
        state.band_levels().total_band_levels(),
        state.ledger().staker_ids().len(),
        state.ledger().bands().count()
    );
    Ok(state)
}

/// Compute the payout of a distribution of `amount` at `now` from a full read of `source`.
pub async fn compute_distribution<S: StakingSource + ?Sized>(
    source: &S,
    amount: U256,
    now: u64,
    config: StakingConfig,
) -> anyhow::Result<Allocation> {
    let mut state = build_staking_state(source, config).await?;
    state.force_sync(now).context("Failed to sync flexible shares")?;
    let allocation = state.allocate(amount).context("Failed to allocate distribution")?;
    tracing::info!(
        "Allocated {} of {amount} to {} stakers",
        allocation.total_rewards(),
        allocation.stakers.len()
    );
    Ok(allocation)
}
