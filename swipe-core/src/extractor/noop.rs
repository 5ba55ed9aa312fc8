use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::cancel::CancelSignal;
use crate::domain::BehaviourTraits;

use super::{ExtractError, ExtractedTraits, Extractor};

/// Picks a latency in `[delay, 2 * delay]`.
fn simulated_latency(delay: Duration) -> Duration {
    if delay.is_zero() {
        return Duration::ZERO;
    }
    let base = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX / 2);
    Duration::from_millis(rand::thread_rng().gen_range(base..=base.saturating_mul(2)))
}

async fn simulate(cancel: &CancelSignal, delay: Duration) -> Result<(), ExtractError> {
    let latency = simulated_latency(delay);
    cancel.sleep(latency).await?;
    Ok(())
}

/// Returns empty traits after a simulated latency.
#[derive(Debug, Clone, Default)]
pub struct NoopExtractor {
    delay: Duration,
}

impl NoopExtractor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Extractor for NoopExtractor {
    async fn extract_behaviour(
        &self,
        cancel: &CancelSignal,
        _profile_key: &str,
        _image_paths: &[PathBuf],
    ) -> Result<BehaviourTraits, ExtractError> {
        simulate(cancel, self.delay).await?;
        Ok(BehaviourTraits::default())
    }

    async fn extract_photo_persona(
        &self,
        cancel: &CancelSignal,
        _profile_key: &str,
        _image_paths: &[PathBuf],
    ) -> Result<ExtractedTraits, ExtractError> {
        simulate(cancel, self.delay).await?;
        Ok(ExtractedTraits::default())
    }
}

/// Wraps a real extractor and no-ops one or both of its calls.
#[derive(Clone)]
pub struct SelectiveNoopExtractor {
    inner: Arc<dyn Extractor>,
    delay: Duration,
    behaviour_noop: bool,
    persona_noop: bool,
}

impl SelectiveNoopExtractor {
    pub fn new(
        inner: Arc<dyn Extractor>,
        delay: Duration,
        behaviour_noop: bool,
        persona_noop: bool,
    ) -> Self {
        Self {
            inner,
            delay,
            behaviour_noop,
            persona_noop,
        }
    }
}

#[async_trait]
impl Extractor for SelectiveNoopExtractor {
    async fn extract_behaviour(
        &self,
        cancel: &CancelSignal,
        profile_key: &str,
        image_paths: &[PathBuf],
    ) -> Result<BehaviourTraits, ExtractError> {
        if self.behaviour_noop {
            simulate(cancel, self.delay).await?;
            return Ok(BehaviourTraits::default());
        }
        self.inner
            .extract_behaviour(cancel, profile_key, image_paths)
            .await
    }

    async fn extract_photo_persona(
        &self,
        cancel: &CancelSignal,
        profile_key: &str,
        image_paths: &[PathBuf],
    ) -> Result<ExtractedTraits, ExtractError> {
        if self.persona_noop {
            simulate(cancel, self.delay).await?;
            return Ok(ExtractedTraits::default());
        }
        self.inner
            .extract_photo_persona(cancel, profile_key, image_paths)
            .await
    }
}
