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

#![allow(dead_code)]

use alloy_primitives::{address, Address, U256};
use band_rewards::{
    BandId, BandLevelId, Command, CommitmentKind, PoolId, StakingConfig, StakingState,
    SECONDS_PER_MONTH,
};

pub const ALICE: Address = address!("0x0000000000000000000000000000000000000100");
pub const BOB: Address = address!("0x0000000000000000000000000000000000000101");
pub const CHARLIE: Address = address!("0x0000000000000000000000000000000000000102");

pub const USDT: Address = address!("0x0000000000000000000000000000000000000010");
pub const USDC: Address = address!("0x0000000000000000000000000000000000000011");

/// Sat Mar 09 2024 16:00:00 GMT+0000
pub const INIT_DATE: u64 = 1_710_000_000;
pub const DAY: u64 = 24 * 60 * 60;

pub const USD: u64 = 1_000_000;

pub const POOL_PERCENTAGES: [u32; 9] = [
    1_300_000, 1_700_000, 3_400_000, 6_400_000, 15_600_000, 14_600_000, 24_000_000, 19_000_000,
    14_000_000,
];

pub const SHARES_IN_MONTH: [u64; 24] = [
    1_000_000, 2_000_000, 2_500_000, 3_000_000, 3_500_000, 4_000_000, 4_500_000, 5_000_000,
    5_500_000, 6_000_000, 6_125_000, 8_250_000, 8_375_000, 8_500_000, 8_625_000, 8_750_000,
    8_875_000, 9_000_000, 9_125_000, 9_250_000, 9_375_000, 9_500_000, 9_625_000, 12_000_000,
];

const LEVEL_PRICES: [u64; 9] =
    [1_000, 3_000, 10_000, 30_000, 100_000, 200_000, 500_000, 1_000_000, 2_000_000];

pub fn months_after_init(months: u64) -> u64 {
    INIT_DATE + months * SECONDS_PER_MONTH
}

pub fn shares(months: usize) -> U256 {
    U256::from(SHARES_IN_MONTH[months - 1])
}

pub fn usd(amount: u64) -> U256 {
    U256::from(amount) * U256::from(USD)
}

pub fn level_price(level: BandLevelId) -> U256 {
    U256::from(LEVEL_PRICES[usize::from(level) - 1]) * U256::from(10u64).pow(U256::from(18))
}

/// Nine pools and nine band levels, level `n` reaching pools `1..=n`.
pub fn setup_commands() -> Vec<Command> {
    let mut commands = vec![
        Command::SetSharesInMonth {
            shares_in_month: SHARES_IN_MONTH.iter().copied().map(U256::from).collect(),
        },
        Command::SetTotalPools { total_pools: 9 },
        Command::SetTotalBandLevels { total_band_levels: 9 },
    ];
    commands.extend((1..=9).zip(POOL_PERCENTAGES).map(|(pool_id, distribution_percentage)| {
        Command::SetPool { pool_id, distribution_percentage }
    }));
    commands.extend((1..=9u16).map(|band_level| Command::SetBandLevel {
        band_level,
        price: level_price(band_level),
        accessible_pools: (1..=band_level).collect(),
    }));
    commands
}

pub fn setup_state() -> StakingState {
    let mut state = StakingState::new(StakingConfig::default());
    for command in setup_commands() {
        state.apply(&command).unwrap();
    }
    state
}

/// Single pool holding 100% of each distribution and two levels, `{1}` and `{1, 2}`.
pub fn single_pool_state() -> StakingState {
    let mut state = StakingState::new(StakingConfig::default());
    for command in [
        Command::SetSharesInMonth {
            shares_in_month: [1_000_000u64, 2_000_000, 2_500_000, 3_000_000]
                .into_iter()
                .map(U256::from)
                .collect(),
        },
        Command::SetTotalPools { total_pools: 2 },
        Command::SetPool { pool_id: 1, distribution_percentage: 100_000_000 },
        Command::SetTotalBandLevels { total_band_levels: 2 },
        Command::SetBandLevel { band_level: 1, price: U256::from(1000), accessible_pools: vec![1] },
        Command::SetBandLevel {
            band_level: 2,
            price: U256::from(3000),
            accessible_pools: vec![1, 2],
        },
    ] {
        state.apply(&command).unwrap();
    }
    state
}

pub fn stake_fixed(
    owner: Address,
    band_level: BandLevelId,
    band_id: BandId,
    months: u16,
    timestamp: u64,
) -> Command {
    Command::Staked {
        owner,
        band_id,
        band_level,
        kind: CommitmentKind::Fixed { months },
        vested: false,
        timestamp,
    }
}

pub fn stake_flexible(
    owner: Address,
    band_level: BandLevelId,
    band_id: BandId,
    timestamp: u64,
) -> Command {
    Command::Staked {
        owner,
        band_id,
        band_level,
        kind: CommitmentKind::Flexible,
        vested: false,
        timestamp,
    }
}

pub fn distribute(token: Address, amount: U256, timestamp: u64) -> Command {
    Command::DistributionRequested { token, amount, timestamp }
}

/// Per pool vector with `value` in pools `from..=to` and zero elsewhere.
pub fn filled(value: U256, from: PoolId, to: PoolId) -> Vec<U256> {
    (1..=9u16).map(|pool| if (from..=to).contains(&pool) { value } else { U256::ZERO }).collect()
}
