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

use alloy_primitives::U256;
use band_rewards::{months_elapsed, AccrualTable, SECONDS_PER_MONTH};
use proptest::prelude::*;

/// Non-decreasing tables built from running sums of increments.
fn table() -> impl Strategy<Value = AccrualTable> {
    prop::collection::vec(0..1_000_000u64, 1..30).prop_map(|steps| {
        let mut total = 0u64;
        AccrualTable::new(
            steps
                .into_iter()
                .map(|step| {
                    total += step;
                    U256::from(total)
                })
                .collect(),
        )
    })
}

proptest! {
    #[test]
    fn prop_flexible_shares_never_decrease(
        table in table(),
        start in 1_700_000_000u64..1_800_000_000,
        first in 0u64..40 * SECONDS_PER_MONTH,
        extra in 0u64..40 * SECONDS_PER_MONTH,
    ) {
        let earlier = table.flexible_shares(start, start + first, SECONDS_PER_MONTH);
        let later = table.flexible_shares(start, start + first + extra, SECONDS_PER_MONTH);
        prop_assert!(earlier <= later);
    }

    #[test]
    fn prop_months_past_the_table_use_the_last_entry(table in table(), beyond in 0u64..1_000) {
        let last = *table.as_slice().last().unwrap();
        prop_assert_eq!(table.shares_for_months(table.len() as u64 + beyond), last);
    }

    #[test]
    fn prop_fixed_shares_match_the_table(table in table(), index in any::<prop::sample::Index>()) {
        let months = index.index(table.len()) + 1;
        prop_assert_eq!(
            table.fixed_shares(months as u16).unwrap(),
            table.as_slice()[months - 1]
        );
        prop_assert!(table.fixed_shares(table.len() as u16 + 1).is_err());
    }

    #[test]
    fn prop_months_elapsed_is_floored(
        start in 0u64..1_800_000_000,
        months in 0u64..100,
        rest in 0u64..SECONDS_PER_MONTH,
    ) {
        let end = start + months * SECONDS_PER_MONTH + rest;
        prop_assert_eq!(months_elapsed(start, end, SECONDS_PER_MONTH), months);
        // An end before the start counts as no time at all.
        prop_assert_eq!(months_elapsed(end, start, SECONDS_PER_MONTH), 0);
    }
}
