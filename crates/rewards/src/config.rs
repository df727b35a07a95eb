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

use serde::{Deserialize, Serialize};

use crate::{
    StakingError, DEFAULT_PERCENTAGE_PRECISION, DEFAULT_SYNC_INTERVAL, SECONDS_PER_MONTH,
};

/// Tunables shared by every operation on a [crate::StakingState].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingConfig {
    /// Length of an accrual month in seconds.
    pub seconds_per_month: u64,
    /// Minimum number of seconds between two flexible share syncs.
    pub sync_interval: u64,
    /// Denominator of the pool distribution percentages.
    pub percentage_precision: u64,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            seconds_per_month: SECONDS_PER_MONTH,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            percentage_precision: DEFAULT_PERCENTAGE_PRECISION,
        }
    }
}

impl StakingConfig {
    pub fn validate(&self) -> Result<(), StakingError> {
        if self.seconds_per_month == 0 {
            return Err(StakingError::InvalidConfig("seconds_per_month must be non-zero".into()));
        }
        if self.percentage_precision == 0 {
            return Err(StakingError::InvalidConfig(
                "percentage_precision must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
