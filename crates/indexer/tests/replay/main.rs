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

use std::{io::Write, path::Path, sync::Arc};

use alloy_primitives::{address, Address, U256};
use band_rewards::{Command, CommitmentKind, LedgerSnapshot, StakingConfig};
use band_rewards_indexer::{
    FileStore, PendingPayouts, RewardsIndexerService, RewardsIndexerServiceConfig, StoreObj,
};
use tempfile::TempDir;

const ALICE: Address = address!("0x0000000000000000000000000000000000000100");
const BOB: Address = address!("0x0000000000000000000000000000000000000101");
const USDT: Address = address!("0x0000000000000000000000000000000000000010");
const START: u64 = 1_710_000_000;

struct Harness {
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        let harness = Self { dir: tempfile::tempdir().unwrap() };
        std::fs::write(harness.log_path(), "").unwrap();
        harness
    }

    fn log_path(&self) -> std::path::PathBuf {
        self.dir.path().join("commands.jsonl")
    }

    fn state_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("state")
    }

    fn append(&self, commands: &[Command]) {
        let mut file = std::fs::OpenOptions::new().append(true).open(self.log_path()).unwrap();
        for command in commands {
            writeln!(file, "{}", serde_json::to_string(command).unwrap()).unwrap();
        }
    }

    fn append_raw(&self, text: &str) {
        let mut file = std::fs::OpenOptions::new().append(true).open(self.log_path()).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    async fn service(&self) -> RewardsIndexerService {
        let store: StoreObj = Arc::new(FileStore::new(self.state_dir()).await.unwrap());
        let config = RewardsIndexerServiceConfig {
            command_log: self.log_path(),
            staking: StakingConfig::default(),
        };
        RewardsIndexerService::new(store, config).await.unwrap()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> T {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

/// One pool taking every distribution, one level reaching it.
fn setup() -> Vec<Command> {
    vec![
        Command::SetSharesInMonth {
            shares_in_month: vec![U256::from(1_000_000), U256::from(2_000_000)],
        },
        Command::SetTotalPools { total_pools: 1 },
        Command::SetPool { pool_id: 1, distribution_percentage: 100_000_000 },
        Command::SetTotalBandLevels { total_band_levels: 1 },
        Command::SetBandLevel { band_level: 1, price: U256::from(1000), accessible_pools: vec![1] },
    ]
}

fn stake(owner: Address, band_id: u64, months: u16, timestamp: u64) -> Command {
    Command::Staked {
        owner,
        band_id,
        band_level: 1,
        kind: CommitmentKind::Fixed { months },
        vested: false,
        timestamp,
    }
}

#[tokio::test]
async fn replays_log_and_writes_outputs() {
    let harness = Harness::new();
    let mut commands = setup();
    commands.push(stake(ALICE, 1, 2, START));
    commands.push(stake(BOB, 2, 2, START));
    commands.push(Command::DistributionRequested {
        token: USDT,
        amount: U256::from(1_000),
        timestamp: START,
    });
    harness.append(&commands);

    let mut service = harness.service().await;
    let summary = service.run().await.unwrap();
    assert_eq!((summary.applied, summary.rejected, summary.offset), (8, 0, 8));

    let snapshot: LedgerSnapshot = read_json(&harness.state_dir().join("snapshot.json"));
    assert_eq!(snapshot.all_staker_ids, vec![ALICE, BOB]);
    assert_eq!(snapshot.total_staked, U256::from(2000));
    assert_eq!(snapshot.pools[0].total_fixed_shares, U256::from(4_000_000));

    let pending: Vec<PendingPayouts> = read_json(&harness.state_dir().join("pending-payouts.json"));
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].payouts, vec![(ALICE, U256::from(500)), (BOB, U256::from(500))]);

    harness.append(&[Command::DistributionExecuted { token: USDT, timestamp: START + 1 }]);
    service.run().await.unwrap();
    let pending: Vec<PendingPayouts> = read_json(&harness.state_dir().join("pending-payouts.json"));
    assert!(pending.is_empty());
    assert_eq!(service.state().total_unclaimed_rewards(ALICE), U256::from(500));
}

#[tokio::test]
async fn restarted_service_resumes_from_checkpoint() {
    let harness = Harness::new();
    harness.append(&setup());
    harness.append(&[stake(ALICE, 1, 1, START)]);
    harness.service().await.run().await.unwrap();

    harness.append(&[stake(BOB, 2, 2, START + 60)]);
    let mut service = harness.service().await;
    assert_eq!(service.offset(), 6);
    let summary = service.run().await.unwrap();
    assert_eq!((summary.applied, summary.offset), (1, 7));
    assert_eq!(service.state().ledger().staker_ids(), &[ALICE, BOB]);

    let idle = service.run().await.unwrap();
    assert_eq!((idle.applied, idle.offset), (0, 7));
}

#[tokio::test]
async fn unterminated_line_waits_for_its_newline() {
    let harness = Harness::new();
    harness.append(&setup());
    let line = serde_json::to_string(&stake(ALICE, 1, 1, START)).unwrap();
    harness.append_raw(&line);

    let mut service = harness.service().await;
    assert_eq!(service.run().await.unwrap().offset, 5);
    assert!(service.state().ledger().staker_ids().is_empty());

    harness.append_raw("\n");
    let summary = service.run().await.unwrap();
    assert_eq!((summary.applied, summary.offset), (1, 6));
}

#[tokio::test]
async fn rejected_commands_are_skipped() {
    let harness = Harness::new();
    harness.append(&setup());
    harness.append(&[stake(ALICE, 1, 9, START), stake(ALICE, 2, 1, START)]);

    let mut service = harness.service().await;
    let summary = service.run().await.unwrap();
    assert_eq!((summary.applied, summary.rejected, summary.offset), (6, 1, 7));
    assert!(service.state().ledger().band(1).is_none());
    assert!(service.state().ledger().band(2).is_some());
}

#[tokio::test]
async fn unparsable_line_fails_the_pass() {
    let harness = Harness::new();
    harness.append(&setup());
    harness.append_raw("{\"event\":\"Unknown\"}\n");

    let mut service = harness.service().await;
    let before = service.state().clone();
    let err = service.run().await.unwrap_err();
    assert!(format!("{err:#}").contains("line 6"));
    assert_eq!(service.offset(), 0);
    assert_eq!(service.state(), &before);
    assert!(!harness.state_dir().join("state.json").exists());
}
