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
    path::{Path, PathBuf},
    sync::Arc,
};

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use band_rewards::{LedgerSnapshot, StakingState};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

const STATE_FILE: &str = "state.json";
const SNAPSHOT_FILE: &str = "snapshot.json";
const PAYOUTS_FILE: &str = "pending-payouts.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("JSON error on {path}: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
}

/// Replay progress: the state after consuming the first `offset` lines of the command log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub offset: u64,
    pub state: StakingState,
}

/// Payouts of a distribution that has been requested but not executed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPayouts {
    pub distribution_id: u64,
    pub token: Address,
    pub amount: U256,
    pub created_at: u64,
    pub payouts: Vec<(Address, U256)>,
}

#[async_trait]
pub trait RewardsIndexerStore {
    /// Last saved checkpoint, `None` on a fresh store.
    async fn load_checkpoint(&self) -> Result<Option<Checkpoint>, StoreError>;

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), StoreError>;

    async fn write_snapshot(&self, snapshot: &LedgerSnapshot) -> Result<(), StoreError>;

    async fn write_pending_payouts(&self, payouts: &[PendingPayouts]) -> Result<(), StoreError>;
}

pub type StoreObj = Arc<dyn RewardsIndexerStore + Send + Sync>;

/// Store keeping one JSON document per concern in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io { path: dir.clone(), source })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    pub fn pending_payouts_path(&self) -> PathBuf {
        self.dir.join(PAYOUTS_FILE)
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        let path = self.dir.join(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Json { path, source })
    }

    /// Written through a temporary file and renamed into place.
    async fn write_json<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let path = self.dir.join(name);
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|source| StoreError::Json { path: path.clone(), source })?;
        let tmp = self.dir.join(format!("{name}.tmp"));
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|source| StoreError::Io { path, source })
    }
}

#[async_trait]
impl RewardsIndexerStore for FileStore {
    async fn load_checkpoint(&self) -> Result<Option<Checkpoint>, StoreError> {
        self.read_json(STATE_FILE).await
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        self.write_json(STATE_FILE, checkpoint).await
    }

    async fn write_snapshot(&self, snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
        self.write_json(SNAPSHOT_FILE, snapshot).await
    }

    async fn write_pending_payouts(&self, payouts: &[PendingPayouts]) -> Result<(), StoreError> {
        self.write_json(PAYOUTS_FILE, payouts).await
    }
}
