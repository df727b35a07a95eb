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

//! Month indexed share table.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::StakingError;

/// Shares earned after `n` completed months, stored at index `n - 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccrualTable(Vec<U256>);

impl AccrualTable {
    pub fn new(shares_in_month: Vec<U256>) -> Self {
        Self(shares_in_month)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[U256] {
        &self.0
    }

    /// Whether shares never decrease from one month to the next.
    pub fn is_non_decreasing(&self) -> bool {
        self.0.windows(2).all(|pair| pair[0] <= pair[1])
    }

    /// Shares for a number of completed months.
    ///
    /// Zero months yields zero shares. Past the end of the table the last entry applies.
    pub fn shares_for_months(&self, months_elapsed: u64) -> U256 {
        if months_elapsed == 0 {
            return U256::ZERO;
        }
        let Some(last) = self.0.last() else {
            return U256::ZERO;
        };
        usize::try_from(months_elapsed - 1)
            .ok()
            .and_then(|index| self.0.get(index))
            .copied()
            .unwrap_or(*last)
    }

    /// Shares granted up front to a fixed band committed for `months`.
    pub fn fixed_shares(&self, months: u16) -> Result<U256, StakingError> {
        let index = usize::from(months)
            .checked_sub(1)
            .ok_or(StakingError::InvalidFixedMonths { months, max: self.0.len() })?;
        self.0
            .get(index)
            .copied()
            .ok_or(StakingError::InvalidFixedMonths { months, max: self.0.len() })
    }

    /// Shares accrued by a flexible band between `start` and `now`.
    pub fn flexible_shares(&self, start: u64, now: u64, seconds_per_month: u64) -> U256 {
        self.shares_for_months(months_elapsed(start, now, seconds_per_month))
    }
}

/// Completed months between two timestamps, `floor((end - start) / seconds_per_month)`.
pub fn months_elapsed(start: u64, end: u64, seconds_per_month: u64) -> u64 {
    end.saturating_sub(start).checked_div(seconds_per_month).unwrap_or_default()
}
