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

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Result};
use band_rewards_indexer::{
    FileStore, RewardsIndexerService, RewardsIndexerServiceConfig, StakingArgs, StoreObj,
};
use clap::Parser;

/// Arguments for the rewards indexer.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct RewardsIndexerArgs {
    /// Newline-delimited JSON log of staking contract events.
    #[clap(long, env)]
    command_log: PathBuf,

    /// Directory holding the checkpoint, ledger snapshot and pending payouts.
    #[clap(long, env)]
    state_dir: PathBuf,

    /// Process the log once and exit.
    #[clap(long, default_value_t = false)]
    once: bool,

    /// Interval in seconds between checking for new commands.
    #[clap(long, default_value = "60")]
    interval: u64,

    /// Number of retries before quitting after an error.
    #[clap(long, default_value = "3")]
    retries: u32,

    /// Whether to log in JSON format.
    #[clap(long, env, default_value_t = false)]
    log_json: bool,

    #[clap(flatten)]
    staking: StakingArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = RewardsIndexerArgs::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();

    if args.log_json {
        tracing_subscriber::fmt().with_ansi(false).json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_ansi(false).with_env_filter(filter).init();
    }

    let store: StoreObj = Arc::new(FileStore::new(&args.state_dir).await?);
    let config = RewardsIndexerServiceConfig {
        command_log: args.command_log,
        staking: args.staking.into(),
    };
    let mut service = RewardsIndexerService::new(store, config).await?;

    if args.once {
        tracing::info!("Running indexer once");
        let summary = service.run().await?;
        tracing::info!("Indexer completed at line {}", summary.offset);
        return Ok(());
    }

    let mut failures = 0u32;
    loop {
        match service.run().await {
            Ok(_) => {
                failures = 0;
                tracing::debug!("Sleeping for {} seconds", args.interval);
                tokio::time::sleep(Duration::from_secs(args.interval)).await;
            }
            Err(e) => {
                failures += 1;
                tracing::error!("Error running rewards indexer: {:?}", e);
                if failures >= args.retries {
                    bail!("Maximum retries reached");
                }
                tracing::info!("Retrying in {} seconds", args.interval);
                tokio::time::sleep(Duration::from_secs(args.interval)).await;
            }
        }
    }
}
