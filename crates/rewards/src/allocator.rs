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

//! Proportional reward allocation.
//!
//! Both divisions truncate, so the paid total never exceeds the distribution amount. The
//! remainder is left unallocated.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{StakingError, SharesSnapshot};

/// Output of one allocation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Stakers in snapshot order.
    pub stakers: Vec<Address>,
    /// Reward of `stakers[i]`, summed over every pool.
    pub rewards: Vec<U256>,
    /// Amount assigned to each pool before it is split among stakers.
    pub pool_allocations: Vec<U256>,
}

impl Allocation {
    pub fn total_rewards(&self) -> U256 {
        self.rewards.iter().fold(U256::ZERO, |acc, reward| acc.saturating_add(*reward))
    }

    /// `(staker, amount)` pairs in allocation order.
    pub fn payouts(&self) -> impl Iterator<Item = (Address, U256)> + '_ {
        self.stakers.iter().copied().zip(self.rewards.iter().copied())
    }
}

/// `amount * percentage / precision` for every pool, truncated.
pub fn pool_allocations(
    amount: U256,
    percentages: &[u32],
    precision: u64,
) -> Result<Vec<U256>, StakingError> {
    if precision == 0 {
        return Err(StakingError::InvalidConfig("percentage_precision must be non-zero".into()));
    }
    let total: u64 = percentages.iter().map(|p| u64::from(*p)).sum();
    if total > precision {
        tracing::warn!(
            "Pool percentages sum to {total}, above the precision of {precision}; distribution will overpay"
        );
    }
    percentages
        .iter()
        .map(|percentage| {
            amount
                .checked_mul(U256::from(*percentage))
                .map(|scaled| scaled / U256::from(precision))
                .ok_or(StakingError::ArithmeticOverflow("pool allocation"))
        })
        .collect()
}

/// Split `amount` across pools by percentage, then across stakers by their share of each pool.
pub fn allocate(
    amount: U256,
    percentages: &[u32],
    precision: u64,
    shares: &SharesSnapshot,
) -> Result<Allocation, StakingError> {
    if shares.shares_for_stakers.len() != shares.stakers.len() {
        return Err(StakingError::LengthMismatch {
            expected: shares.stakers.len(),
            actual: shares.shares_for_stakers.len(),
        });
    }
    if shares.shares_for_pools.len() != percentages.len() {
        return Err(StakingError::LengthMismatch {
            expected: percentages.len(),
            actual: shares.shares_for_pools.len(),
        });
    }
    if let Some(row) = shares.shares_for_stakers.iter().find(|row| row.len() != percentages.len()) {
        return Err(StakingError::LengthMismatch { expected: percentages.len(), actual: row.len() });
    }

    let pool_allocations = pool_allocations(amount, percentages, precision)?;
    if shares.stakers.is_empty() {
        tracing::debug!("No active stakers, nothing to allocate");
        return Ok(Allocation { pool_allocations, ..Default::default() });
    }

    let mut rewards = vec![U256::ZERO; shares.stakers.len()];
    for (pool, (allocation, pool_shares)) in
        pool_allocations.iter().zip(&shares.shares_for_pools).enumerate()
    {
        if pool_shares.is_zero() || allocation.is_zero() {
            continue;
        }
        for (reward, staker_shares) in rewards.iter_mut().zip(&shares.shares_for_stakers) {
            let staker_shares = staker_shares[pool];
            if staker_shares.is_zero() {
                continue;
            }
            let pool_reward = allocation
                .checked_mul(staker_shares)
                .map(|scaled| scaled / *pool_shares)
                .ok_or(StakingError::ArithmeticOverflow("staker pool reward"))?;
            *reward = reward
                .checked_add(pool_reward)
                .ok_or(StakingError::ArithmeticOverflow("staker reward"))?;
        }
    }

    Ok(Allocation { stakers: shares.stakers.clone(), rewards, pool_allocations })
}
