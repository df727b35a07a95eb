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

use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use band_rewards::compute_distribution;
use band_rewards_indexer::{JsonStateSource, StakingArgs};
use clap::Parser;
use serde::Serialize;

/// Computes the payouts of one reward distribution from a full staking state dump.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct DistributionCalculatorArgs {
    /// JSON dump of the staking contract storage.
    #[clap(long, env)]
    state_file: PathBuf,

    /// Reward token, echoed in the output.
    #[clap(long, env)]
    token: Address,

    /// Amount to distribute, in token base units.
    #[clap(long)]
    amount: U256,

    /// Unix timestamp to sync flexible shares at. Defaults to now.
    #[clap(long)]
    timestamp: Option<u64>,

    /// Write the payouts to this file instead of stdout.
    #[clap(long)]
    output: Option<PathBuf>,

    /// Whether to log in JSON format.
    #[clap(long, env, default_value_t = false)]
    log_json: bool,

    #[clap(flatten)]
    staking: StakingArgs,
}

#[derive(Serialize)]
struct DistributionOutput {
    token: Address,
    amount: U256,
    timestamp: u64,
    total_rewards: U256,
    payouts: Vec<(Address, U256)>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = DistributionCalculatorArgs::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();

    if args.log_json {
        tracing_subscriber::fmt()
            .with_ansi(false)
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }

    if let Err(err) = run(args).await {
        tracing::error!("Distribution calculation failed: {err:?}");
        return Err(err);
    }
    Ok(())
}

async fn run(args: DistributionCalculatorArgs) -> Result<()> {
    let timestamp = match args.timestamp {
        Some(timestamp) => timestamp,
        None => SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs(),
    };
    let source = JsonStateSource::from_file(&args.state_file).await?;
    let allocation = compute_distribution(&source, args.amount, timestamp, args.staking.into())
        .await
        .context("Failed to compute distribution")?;

    let output = DistributionOutput {
        token: args.token,
        amount: args.amount,
        timestamp,
        total_rewards: allocation.total_rewards(),
        payouts: allocation.payouts().collect(),
    };
    let json = serde_json::to_string_pretty(&output)?;
    match args.output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {} payouts to {}", output.payouts.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
