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
use serde::{Deserialize, Serialize};

/// A reward payout computed at request time and made payable when executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub id: u64,
    pub token: Address,
    pub amount: U256,
    pub created_at: u64,
    /// Set once the payout has been executed.
    pub distributed_at: Option<u64>,
    pub stakers: Vec<Address>,
    pub rewards: Vec<U256>,
}

impl Distribution {
    pub fn is_pending(&self) -> bool {
        self.distributed_at.is_none()
    }

    pub fn payouts(&self) -> impl Iterator<Item = (Address, U256)> + '_ {
        self.stakers.iter().copied().zip(self.rewards.iter().copied())
    }

    pub fn total_rewards(&self) -> U256 {
        self.rewards.iter().fold(U256::ZERO, |acc, reward| acc.saturating_add(*reward))
    }

    /// Part of `amount` lost to truncation. Never swept into a later distribution.
    pub fn dust(&self) -> U256 {
        self.amount.saturating_sub(self.total_rewards())
    }
}

/// Reward balance of one staker in one token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakerRewards {
    pub unclaimed: U256,
    pub claimed: U256,
}
