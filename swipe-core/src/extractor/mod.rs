//! Boundary to the service that turns profile screenshots into traits.

mod mapped;
mod mapping;
mod noop;

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cancel::{CancelSignal, Cancelled};
use crate::domain::BehaviourTraits;

pub use mapped::{
    MappingExtractor, TraitsSource, DEFAULT_EXTRACT_ATTEMPTS, DEFAULT_EXTRACT_DELAY,
};
pub use mapping::{map_photos_to_persona_bundle, map_to_behaviour_traits};
pub use noop::{NoopExtractor, SelectiveNoopExtractor};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("image not found: {}", path.display())]
    MissingImage { path: PathBuf },
    #[error("extraction failed: {0}")]
    Failed(String),
}

/// Raw output of one extraction call, before it is mapped into domain traits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTraits {
    #[serde(default)]
    pub global_confidence: i32,
    #[serde(default)]
    pub traits: BTreeMap<String, TraitCategory>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitCategory {
    #[serde(default)]
    pub confidence: i32,
    #[serde(default)]
    pub signals: Vec<String>,
    #[serde(default)]
    pub signals_by_key: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub summary: String,
}

/// Opaque, possibly slow trait extraction. Implementations may retry internally.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract_behaviour(
        &self,
        cancel: &CancelSignal,
        profile_key: &str,
        image_paths: &[PathBuf],
    ) -> Result<BehaviourTraits, ExtractError>;

    async fn extract_photo_persona(
        &self,
        cancel: &CancelSignal,
        profile_key: &str,
        image_paths: &[PathBuf],
    ) -> Result<ExtractedTraits, ExtractError>;
}
