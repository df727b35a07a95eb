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

use alloy_primitives::{Address, U256};
use band_rewards::{allocate, SharesSnapshot};
use proptest::prelude::*;

const PRECISION: u64 = 100_000_000;

/// Snapshot of `stakers x pools` random shares with pool totals summed from the rows.
fn snapshot(pools: usize) -> impl Strategy<Value = SharesSnapshot> {
    prop::collection::vec(prop::collection::vec(0..1_000_000_000_000u64, pools), 1..8).prop_map(
        move |rows| {
            let shares_for_stakers: Vec<Vec<U256>> =
                rows.into_iter().map(|row| row.into_iter().map(U256::from).collect()).collect();
            let shares_for_pools = (0..pools)
                .map(|pool| shares_for_stakers.iter().fold(U256::ZERO, |acc, row| acc + row[pool]))
                .collect();
            SharesSnapshot {
                stakers: (0..shares_for_stakers.len())
                    .map(|i| Address::repeat_byte(i as u8))
                    .collect(),
                shares_for_stakers,
                shares_for_pools,
            }
        },
    )
}

/// Percentages for `pools` pools summing to at most the precision.
fn percentages(pools: usize) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0..=(PRECISION / pools as u64) as u32, pools)
}

fn case() -> impl Strategy<Value = (Vec<u32>, SharesSnapshot)> {
    (1..6usize).prop_flat_map(|pools| (percentages(pools), snapshot(pools)))
}

proptest! {
    #[test]
    fn prop_allocation_never_exceeds_amount(
        (percentages, shares) in case(),
        amount in 0..u128::MAX / 2,
    ) {
        let amount = U256::from(amount);
        let allocation = allocate(amount, &percentages, PRECISION, &shares).unwrap();
        prop_assert!(allocation.total_rewards() <= amount);
        for (pool, allocated) in allocation.pool_allocations.iter().enumerate() {
            let total = shares.shares_for_pools[pool];
            if total.is_zero() {
                continue;
            }
            let paid = shares
                .shares_for_stakers
                .iter()
                .fold(U256::ZERO, |acc, row| acc + *allocated * row[pool] / total);
            prop_assert!(paid <= *allocated);
        }
    }

    /// Each staker loses less than one unit to truncation, so a pool's dust stays below the
    /// number of stakers holding shares in it.
    #[test]
    fn prop_single_pool_dust_is_bounded(shares in snapshot(1), amount in 0..u64::MAX) {
        let amount = U256::from(amount);
        let allocation = allocate(amount, &[PRECISION as u32], PRECISION, &shares).unwrap();
        let holders = shares.shares_for_stakers.iter().filter(|row| !row[0].is_zero()).count();
        if holders > 0 {
            prop_assert!(amount - allocation.total_rewards() < U256::from(holders));
        } else {
            prop_assert_eq!(allocation.total_rewards(), U256::ZERO);
        }
    }

    /// More shares in every pool never means a smaller reward.
    #[test]
    fn prop_rewards_follow_shares((percentages, shares) in case(), amount in 0..u64::MAX) {
        let allocation = allocate(U256::from(amount), &percentages, PRECISION, &shares).unwrap();
        let rows = &shares.shares_for_stakers;
        for (i, left) in rows.iter().enumerate() {
            for (j, right) in rows.iter().enumerate() {
                if left.iter().zip(right).all(|(l, r)| l >= r) {
                    prop_assert!(allocation.rewards[i] >= allocation.rewards[j]);
                }
            }
        }
    }
}
