use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;

use crate::decision::Decision;
use crate::domain::{AppName, BehaviourTraits};

use super::{DecisionStore, StoreError, StoreResult};

const DECISION_SCHEMA: &str = include_str!("../../../sql/decisions.sql");

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;\n\
         PRAGMA synchronous = NORMAL;\n\
         PRAGMA temp_store = MEMORY;\n\
         PRAGMA busy_timeout = 5000;\n",
    )
}

#[derive(Debug, Clone)]
pub struct SqliteStoreBuilder {
    path: Option<PathBuf>,
    create_if_missing: bool,
}

impl Default for SqliteStoreBuilder {
    fn default() -> Self {
        Self {
            path: None,
            create_if_missing: true,
        }
    }
}

impl SqliteStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    pub fn build(self) -> StoreResult<SqliteStore> {
        let path = self.path.ok_or(StoreError::MissingPath)?;
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE;
        if self.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        Ok(SqliteStore { path, flags })
    }
}

/// One persisted decision row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredDecision {
    pub profile_key: Option<String>,
    pub app: String,
    pub policy_name: String,
    pub action_kind: String,
    pub action_message: Option<String>,
    pub score: i64,
    pub reason: String,
}

/// SQLite-backed [`DecisionStore`]; each operation opens its own connection.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    flags: OpenFlags,
}

impl SqliteStore {
    pub fn builder() -> SqliteStoreBuilder {
        SqliteStoreBuilder::new()
    }

    /// Opens (creating if needed) the database at `path` and applies the schema.
    pub fn open_path(path: impl AsRef<Path>) -> StoreResult<Self> {
        let store = SqliteStoreBuilder::new().path(path).build()?;
        store.initialize()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> StoreResult<Connection> {
        let conn = Connection::open_with_flags(&self.path, self.flags).map_err(|source| {
            StoreError::OpenDatabase {
                path: self.path.clone(),
                source,
            }
        })?;
        configure_connection(&conn).map_err(|source| StoreError::OpenDatabase {
            path: self.path.clone(),
            source,
        })?;
        Ok(conn)
    }

    pub fn initialize(&self) -> StoreResult<()> {
        let conn = self.open()?;
        conn.execute_batch(DECISION_SCHEMA)?;
        Ok(())
    }

    pub fn insert_behaviour(
        &self,
        profile_key: &str,
        app: AppName,
        traits: &BehaviourTraits,
    ) -> StoreResult<()> {
        let conn = self.open()?;
        let payload = serde_json::to_string(traits)?;
        conn.execute(
            "INSERT INTO behaviour_traits (profile_key, app, traits) VALUES (?1, ?2, ?3)",
            params![non_empty(profile_key), app.as_str(), payload],
        )?;
        Ok(())
    }

    pub fn insert_decision(&self, profile_key: &str, decision: &Decision) -> StoreResult<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO decisions (profile_key, app, policy_name, action_kind, action_message, score, reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                non_empty(profile_key),
                decision.app.as_str(),
                decision.policy_name,
                decision.action.kind.as_str(),
                decision.action.message.as_deref().filter(|m| !m.is_empty()),
                i64::from(decision.score),
                decision.reason,
            ],
        )?;
        Ok(())
    }

    pub fn behaviour_for(&self, profile_key: &str) -> StoreResult<Vec<BehaviourTraits>> {
        let conn = self.open()?;
        let mut stmt =
            conn.prepare("SELECT traits FROM behaviour_traits WHERE profile_key = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![profile_key], |row| row.get::<_, String>(0))?;
        let mut traits = Vec::new();
        for row in rows {
            traits.push(serde_json::from_str(&row?)?);
        }
        Ok(traits)
    }

    pub fn recent_decisions(&self, limit: usize) -> StoreResult<Vec<StoredDecision>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT profile_key, app, policy_name, action_kind, action_message, score, reason
             FROM decisions ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(StoredDecision {
                profile_key: row.get(0)?,
                app: row.get(1)?,
                policy_name: row.get(2)?,
                action_kind: row.get(3)?,
                action_message: row.get(4)?,
                score: row.get(5)?,
                reason: row.get(6)?,
            })
        })?;
        let mut decisions = Vec::new();
        for row in rows {
            decisions.push(row?);
        }
        Ok(decisions)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[async_trait]
impl DecisionStore for SqliteStore {
    async fn save_behaviour(
        &self,
        profile_key: &str,
        app: AppName,
        traits: &BehaviourTraits,
    ) -> StoreResult<()> {
        let store = self.clone();
        let profile_key = profile_key.to_string();
        let traits = traits.clone();
        tokio::task::spawn_blocking(move || store.insert_behaviour(&profile_key, app, &traits))
            .await?
    }

    async fn save_decision(&self, profile_key: &str, decision: &Decision) -> StoreResult<()> {
        let store = self.clone();
        let profile_key = profile_key.to_string();
        let decision = decision.clone();
        tokio::task::spawn_blocking(move || store.insert_decision(&profile_key, &decision)).await?
    }

    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}
