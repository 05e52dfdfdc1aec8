//! Battle persistence.
//!
//! A battle is stored as one [`BattleRecord`] holding the serialized state and
//! an optimistic `version`, plus an append-only log of the actions applied to it.

use crate::battle::action::BattleAction;
use crate::battle::state::{BattleState, Side, Winner};
use crate::errors::RepositoryError;
use async_trait::async_trait;
use schema::Difficulty;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BattleStatus {
    Active,
    Won,
    Lost,
    Abandoned,
}

impl BattleStatus {
    /// Status a finished battle is stored with, from the player's point of view.
    pub fn from_winner(winner: Winner) -> Self {
        match winner {
            Winner::Player => BattleStatus::Won,
            Winner::Ai => BattleStatus::Lost,
            Winner::Draw => BattleStatus::Abandoned,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BattleRecord {
    pub id: String,
    pub user_id: String,
    pub opponent_id: String,
    pub difficulty: Difficulty,
    pub status: BattleStatus,
    pub winner: Option<Winner>,
    /// `BattleState` as JSON.
    pub state: String,
    /// Bumped by every successful save.
    pub version: u64,
    /// Unix seconds.
    pub created_at: u64,
    pub updated_at: u64,
    pub ended_at: Option<u64>,
}

impl BattleRecord {
    pub fn new(
        user_id: String,
        opponent_id: String,
        difficulty: Difficulty,
        state: &BattleState,
    ) -> Result<Self, RepositoryError> {
        let now = unix_now();
        Ok(Self {
            id: state.battle_id.clone(),
            user_id,
            opponent_id,
            difficulty,
            status: BattleStatus::Active,
            winner: None,
            state: encode_state(state)?,
            version: 0,
            created_at: now,
            updated_at: now,
            ended_at: None,
        })
    }

    /// Replaces the stored state, stamping the outcome once the battle is over.
    pub fn set_state(&mut self, state: &BattleState) -> Result<(), RepositoryError> {
        self.state = encode_state(state)?;
        self.updated_at = unix_now();
        if let Some(winner) = state.winner {
            self.winner = Some(winner);
            self.status = BattleStatus::from_winner(winner);
            self.ended_at.get_or_insert(self.updated_at);
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActionLogEntry {
    pub turn: u32,
    pub actor: Side,
    pub action: BattleAction,
}

fn encode_state(state: &BattleState) -> Result<String, RepositoryError> {
    serde_json::to_string(state).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Storage for battle records and their action logs.
#[async_trait]
pub trait BattleRepository: Send + Sync {
    /// Stores a new record. Fails if the id is taken.
    async fn insert(&self, record: BattleRecord) -> Result<(), RepositoryError>;

    async fn load(&self, battle_id: &str) -> Result<Option<BattleRecord>, RepositoryError>;

    /// Saves `record` if the stored version still equals `expected_version`.
    ///
    /// Returns the new version. A mismatch means another writer got there
    /// first and nothing is written.
    async fn save(&self, record: &BattleRecord, expected_version: u64)
        -> Result<u64, RepositoryError>;

    async fn append_actions(
        &self,
        battle_id: &str,
        entries: Vec<ActionLogEntry>,
    ) -> Result<(), RepositoryError>;

    async fn action_log(&self, battle_id: &str) -> Result<Vec<ActionLogEntry>, RepositoryError>;
}

/// In-memory implementation of BattleRepository.
///
/// For tests, demos and single-process servers.
#[derive(Default)]
pub struct InMemoryBattleRepository {
    records: RwLock<HashMap<String, BattleRecord>>,
    logs: RwLock<HashMap<String, Vec<ActionLogEntry>>>,
}

impl InMemoryBattleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BattleRepository for InMemoryBattleRepository {
    async fn insert(&self, record: BattleRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(RepositoryError::AlreadyExists(record.id));
        }
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn load(&self, battle_id: &str) -> Result<Option<BattleRecord>, RepositoryError> {
        Ok(self.records.read().await.get(battle_id).cloned())
    }

    async fn save(
        &self,
        record: &BattleRecord,
        expected_version: u64,
    ) -> Result<u64, RepositoryError> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(&record.id)
            .ok_or_else(|| RepositoryError::NotFound(record.id.clone()))?;
        if stored.version != expected_version {
            return Err(RepositoryError::VersionConflict {
                battle_id: record.id.clone(),
                expected: expected_version,
                found: stored.version,
            });
        }
        let mut updated = record.clone();
        updated.version = expected_version + 1;
        *stored = updated;
        Ok(expected_version + 1)
    }

    async fn append_actions(
        &self,
        battle_id: &str,
        entries: Vec<ActionLogEntry>,
    ) -> Result<(), RepositoryError> {
        if !self.records.read().await.contains_key(battle_id) {
            return Err(RepositoryError::NotFound(battle_id.to_string()));
        }
        self.logs
            .write()
            .await
            .entry(battle_id.to_string())
            .or_default()
            .extend(entries);
        Ok(())
    }

    async fn action_log(&self, battle_id: &str) -> Result<Vec<ActionLogEntry>, RepositoryError> {
        Ok(self
            .logs
            .read()
            .await
            .get(battle_id)
            .cloned()
            .unwrap_or_default())
    }
}
