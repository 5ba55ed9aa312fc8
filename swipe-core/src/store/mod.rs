//! Optional persistence of extracted traits and decisions.

mod sqlite;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::decision::Decision;
use crate::domain::{AppName, BehaviourTraits};

pub use sqlite::{SqliteStore, SqliteStoreBuilder, StoredDecision};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store path not configured")]
    MissingPath,
    #[error("failed to open database at {path}: {source}")]
    OpenDatabase {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("store task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Task(err.to_string())
    }
}

#[async_trait]
pub trait DecisionStore: Send + Sync {
    async fn save_behaviour(
        &self,
        profile_key: &str,
        app: AppName,
        traits: &BehaviourTraits,
    ) -> StoreResult<()>;

    async fn save_decision(&self, profile_key: &str, decision: &Decision) -> StoreResult<()>;

    async fn close(&self) -> StoreResult<()>;
}

/// Drops every write; used when persistence is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

#[async_trait]
impl DecisionStore for NoopStore {
    async fn save_behaviour(
        &self,
        _profile_key: &str,
        _app: AppName,
        _traits: &BehaviourTraits,
    ) -> StoreResult<()> {
        Ok(())
    }

    async fn save_decision(&self, _profile_key: &str, _decision: &Decision) -> StoreResult<()> {
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}
