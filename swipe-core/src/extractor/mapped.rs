use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::cancel::CancelSignal;
use crate::domain::BehaviourTraits;

use super::{map_to_behaviour_traits, ExtractError, ExtractedTraits, Extractor};

pub const DEFAULT_EXTRACT_ATTEMPTS: u32 = 3;
pub const DEFAULT_EXTRACT_DELAY: Duration = Duration::from_millis(250);

/// Raw image-to-traits backend, e.g. a vision model call.
#[async_trait]
pub trait TraitsSource: Send + Sync {
    async fn extract_from_paths(
        &self,
        cancel: &CancelSignal,
        image_paths: &[PathBuf],
    ) -> Result<ExtractedTraits, ExtractError>;
}

/// [`Extractor`] over two raw sources: checks that every image exists, retries
/// failed calls with a fixed delay and maps behaviour output into
/// [`BehaviourTraits`]. Persona output is returned unmapped.
#[derive(Clone)]
pub struct MappingExtractor {
    behaviour: Arc<dyn TraitsSource>,
    persona: Arc<dyn TraitsSource>,
    attempts: u32,
    delay: Duration,
}

impl MappingExtractor {
    pub fn new(behaviour: Arc<dyn TraitsSource>, persona: Arc<dyn TraitsSource>) -> Self {
        Self {
            behaviour,
            persona,
            attempts: DEFAULT_EXTRACT_ATTEMPTS,
            delay: DEFAULT_EXTRACT_DELAY,
        }
    }

    /// Zero attempts is treated as one.
    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.delay = delay;
        self
    }

    async fn extract_with_retry(
        &self,
        source: &dyn TraitsSource,
        cancel: &CancelSignal,
        profile_key: &str,
        image_paths: &[PathBuf],
    ) -> Result<ExtractedTraits, ExtractError> {
        ensure_images_exist(image_paths).await?;

        let mut attempt = 1;
        loop {
            cancel.check()?;
            match source.extract_from_paths(cancel, image_paths).await {
                Ok(traits) => return Ok(traits),
                Err(err @ ExtractError::Cancelled(_)) => return Err(err),
                Err(err) if attempt >= self.attempts => return Err(err),
                Err(err) => {
                    warn!(
                        target: "extractor",
                        profile_key,
                        attempt,
                        error = %err,
                        "trait extraction failed, retrying"
                    );
                    cancel.sleep(self.delay).await?;
                    attempt += 1;
                }
            }
        }
    }
}

async fn ensure_images_exist(image_paths: &[PathBuf]) -> Result<(), ExtractError> {
    for path in image_paths {
        if !is_file(path).await {
            return Err(ExtractError::MissingImage { path: path.clone() });
        }
    }
    Ok(())
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

#[async_trait]
impl Extractor for MappingExtractor {
    async fn extract_behaviour(
        &self,
        cancel: &CancelSignal,
        profile_key: &str,
        image_paths: &[PathBuf],
    ) -> Result<BehaviourTraits, ExtractError> {
        let raw = self
            .extract_with_retry(self.behaviour.as_ref(), cancel, profile_key, image_paths)
            .await?;
        Ok(map_to_behaviour_traits(&raw))
    }

    async fn extract_photo_persona(
        &self,
        cancel: &CancelSignal,
        profile_key: &str,
        image_paths: &[PathBuf],
    ) -> Result<ExtractedTraits, ExtractError> {
        self.extract_with_retry(self.persona.as_ref(), cancel, profile_key, image_paths)
            .await
    }
}
