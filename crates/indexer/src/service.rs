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

use std::path::PathBuf;

use anyhow::{Context, Result};
use band_rewards::{Command, StakingConfig, StakingState};

use crate::store::{Checkpoint, PendingPayouts, StoreObj};

#[derive(Clone)]
pub struct RewardsIndexerServiceConfig {
    /// Newline-delimited JSON [Command] log, appended to by the event reader.
    pub command_log: PathBuf,
    /// Used only when the store holds no checkpoint yet.
    pub staking: StakingConfig,
}

/// Counters of one indexer pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub applied: u64,
    pub rejected: u64,
    /// Lines of the command log consumed after the pass.
    pub offset: u64,
}

pub struct RewardsIndexerService {
    store: StoreObj,
    config: RewardsIndexerServiceConfig,
    state: StakingState,
    offset: u64,
}

impl RewardsIndexerService {
    /// Resume from the store's checkpoint, or start from an empty state.
    pub async fn new(store: StoreObj, config: RewardsIndexerServiceConfig) -> Result<Self> {
        config.staking.validate()?;
        let (state, offset) = match store.load_checkpoint().await? {
            Some(Checkpoint { offset, state }) => {
                tracing::info!("Resuming from line {offset} of {}", config.command_log.display());
                (state, offset)
            }
            None => {
                tracing::info!("No checkpoint found, starting from an empty state");
                (StakingState::new(config.staking), 0)
            }
        };
        Ok(Self { store, config, state, offset })
    }

    pub fn state(&self) -> &StakingState {
        &self.state
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Apply every complete line appended since the last pass, then persist.
    ///
    /// Commands the ledger rejects are logged and skipped. An unparsable line fails the whole
    /// pass and leaves the service at its previous offset.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let start_time = std::time::Instant::now();
        let log = tokio::fs::read_to_string(&self.config.command_log).await.with_context(|| {
            format!("Failed to read command log {}", self.config.command_log.display())
        })?;

        // A trailing line without a newline is still being written.
        let complete = log.rfind('\n').map_or("", |end| &log[..=end]);
        let total_lines = complete.lines().count() as u64;
        if total_lines < self.offset {
            anyhow::bail!(
                "Command log has {total_lines} lines, fewer than the checkpoint offset {}",
                self.offset
            );
        }
        let mut summary = RunSummary { offset: self.offset, ..Default::default() };
        let skip = usize::try_from(self.offset).context("Offset out of range")?;
        let mut state = self.state.clone();

        for (index, line) in complete.lines().enumerate().skip(skip) {
            let line_number = index + 1;
            summary.offset = line_number as u64;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let command: Command = serde_json::from_str(line)
                .with_context(|| format!("Failed to parse command on line {line_number}"))?;
            match state.apply(&command) {
                Ok(report) => {
                    summary.applied += 1;
                    if let Some(id) = report.distribution_id {
                        tracing::debug!(
                            "Line {line_number}: {} created distribution {id}",
                            command.name()
                        );
                    }
                }
                Err(err) => {
                    summary.rejected += 1;
                    tracing::warn!("Skipping {} on line {line_number}: {err}", command.name());
                }
            }
        }

        if summary.offset == self.offset {
            tracing::debug!("No new commands since line {}", self.offset);
            return Ok(summary);
        }
        self.state = state;
        self.offset = summary.offset;
        self.persist().await?;

        tracing::info!(
            "Indexed {} commands ({} rejected) up to line {} in {:.2}s",
            summary.applied,
            summary.rejected,
            summary.offset,
            start_time.elapsed().as_secs_f64()
        );
        Ok(summary)
    }

    async fn persist(&self) -> Result<()> {
        let checkpoint = Checkpoint { offset: self.offset, state: self.state.clone() };
        self.store.save_checkpoint(&checkpoint).await.context("Failed to save checkpoint")?;
        self.store
            .write_snapshot(&self.state.snapshot())
            .await
            .context("Failed to write ledger snapshot")?;
        let pending: Vec<PendingPayouts> = self
            .state
            .pending_distributions()
            .map(|distribution| PendingPayouts {
                distribution_id: distribution.id,
                token: distribution.token,
                amount: distribution.amount,
                created_at: distribution.created_at,
                payouts: distribution.payouts().collect(),
            })
            .collect();
        self.store
            .write_pending_payouts(&pending)
            .await
            .context("Failed to write pending payouts")?;
        Ok(())
    }
}
