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
use band_rewards::{CommitmentKind, StakingState};
use proptest::prelude::*;

use super::driver::{scenario, Driver};

fn staked_total(state: &StakingState) -> U256 {
    state.ledger().bands().fold(U256::ZERO, |acc, band| acc + band.staked_price)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Pool totals always equal the sum of the staker rows.
    #[test]
    fn prop_ledger_stays_consistent(steps in scenario()) {
        let mut driver = Driver::new();
        for (advance, op) in &steps {
            driver.step(*advance, op);
            prop_assert!(driver.state.ledger().check_consistency(), "inconsistent after {op:?}");
            prop_assert_eq!(driver.state.ledger().total_staked(), staked_total(&driver.state));
            for address in driver.state.ledger().staker_ids() {
                let staker = driver.state.ledger().staker(address).unwrap();
                prop_assert!(staker.band_count() > 0);
            }
        }
    }

    /// A rejected command leaves the whole state untouched.
    #[test]
    fn prop_failed_commands_change_nothing(steps in scenario()) {
        let mut driver = Driver::new();
        for (advance, op) in &steps {
            let before = driver.state.clone();
            if let Some(Err(err)) = driver.step(*advance, op) {
                prop_assert_eq!(
                    &driver.state,
                    &before,
                    "{:?} failed with {} but mutated state",
                    op,
                    err
                );
            }
        }
    }

    /// Syncing twice at one instant is the same as syncing once, and leaves every flexible band
    /// with the shares the table gives for its elapsed months.
    #[test]
    fn prop_sync_is_idempotent(steps in scenario()) {
        let mut driver = Driver::new();
        for (advance, op) in &steps {
            driver.step(*advance, op);
        }
        let now = driver.now;
        let mut state = driver.state;
        state.force_sync(now).unwrap();
        let once = state.clone();
        state.force_sync(now).unwrap();
        prop_assert_eq!(&state, &once);

        let spm = state.config().seconds_per_month;
        for band in state.ledger().bands().filter(|band| band.kind.is_flexible()) {
            let expected = state.shares_in_month().flexible_shares(band.start_timestamp, now, spm);
            prop_assert_eq!(band.shares, expected);
            let level = state.band_levels().get(band.band_level).unwrap();
            prop_assert_eq!(&band.accounted_pools, &level.accessible_pools);
        }
        prop_assert!(state.ledger().check_consistency());
    }

    /// Fixed bands keep the table entry for their committed months whatever happens around them.
    #[test]
    fn prop_fixed_shares_never_change(steps in scenario()) {
        let mut driver = Driver::new();
        for (advance, op) in &steps {
            driver.step(*advance, op);
            let state = &driver.state;
            for band in state.ledger().bands() {
                if let CommitmentKind::Fixed { months } = band.kind {
                    let expected = state.shares_in_month().fixed_shares(months).unwrap();
                    prop_assert_eq!(band.shares, expected);
                }
            }
        }
    }

    /// No distribution pays out more than it was given, and ids count up from zero.
    #[test]
    fn prop_distributions_never_overpay(steps in scenario()) {
        let mut driver = Driver::new();
        for (advance, op) in &steps {
            driver.step(*advance, op);
        }
        for (index, distribution) in driver.state.distributions().iter().enumerate() {
            prop_assert_eq!(distribution.id, index as u64);
            prop_assert!(distribution.total_rewards() <= distribution.amount);
            prop_assert_eq!(distribution.stakers.len(), distribution.rewards.len());
        }
        let count = driver.state.distributions().len() as u64;
        prop_assert_eq!(driver.state.next_distribution_id(), count);
    }
}
