use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analytics::{AnalyticsSink, JsonLinesSink, Session, SessionSnapshot, TracingSink};
use crate::apps::{adapter_for, AppClient};
use crate::browser::{BrowserError, InteractionDriver, UiTransport};
use crate::cancel::{CancelCause, CancelSignal, Cancelled};
use crate::config::{RunSection, SwipeConfig};
use crate::decision::{Decision, DecisionContext, DecisionEngine, DecisionError, PolicyRegistry};
use crate::domain::AppName;
use crate::error::ConfigError;
use crate::extractor::{map_photos_to_persona_bundle, ExtractError, Extractor, NoopExtractor};
use crate::store::{DecisionStore, NoopStore, SqliteStore, StoreError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{context}: {source}")]
    Browser {
        context: String,
        #[source]
        source: BrowserError,
    },
    #[error("{context}: {source}")]
    Extract {
        context: String,
        #[source]
        source: ExtractError,
    },
    #[error("{context}: decision engine: {source}")]
    Decision {
        context: String,
        #[source]
        source: DecisionError,
    },
    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },
    #[error("profile {profile}: no screenshots captured")]
    NoScreenshots { profile: u32 },
    #[error("failed to read screenshot {path}: {source}")]
    Screenshot {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl PipelineError {
    /// Cancellation cause buried anywhere in the error, if any.
    pub fn cancel_cause(&self) -> Option<CancelCause> {
        match self {
            PipelineError::Cancelled(cancelled) => Some(cancelled.cause),
            PipelineError::Browser { source, .. } => browser_cancel_cause(source),
            PipelineError::Extract {
                source: ExtractError::Cancelled(cancelled),
                ..
            } => Some(cancelled.cause),
            PipelineError::Decision {
                source: DecisionError::Cancelled(cancelled),
                ..
            } => Some(cancelled.cause),
            _ => None,
        }
    }
}

fn browser_cancel_cause(err: &BrowserError) -> Option<CancelCause> {
    match err {
        BrowserError::Cancelled(cancelled) => Some(cancelled.cause),
        BrowserError::Exhausted { source, .. } => browser_cancel_cause(source),
        _ => None,
    }
}

fn browser(context: impl Into<String>) -> impl FnOnce(BrowserError) -> PipelineError {
    let context = context.into();
    move |source| PipelineError::Browser { context, source }
}

/// Loop parameters resolved from `[run]`.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub app: AppName,
    pub profiles: u32,
    pub shots_per_profile: u32,
    pub screenshot_dir: PathBuf,
    pub dry_run: bool,
    pub settle_delay: std::time::Duration,
    pub between_shots: std::time::Duration,
    pub between_profiles: std::time::Duration,
}

impl RunSettings {
    pub fn from_section(run: &RunSection) -> Result<Self, ConfigError> {
        Ok(Self {
            app: run.app_name()?,
            profiles: run.profiles,
            shots_per_profile: run.shots_per_profile.max(1),
            screenshot_dir: run.screenshot_dir.clone(),
            dry_run: run.dry_run,
            settle_delay: run.settle_delay(),
            between_shots: run.between_shots(),
            between_profiles: run.between_profiles(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProfileOutcome {
    pub index: u32,
    pub profile_key: String,
    pub screenshots: Vec<PathBuf>,
    pub decision: Decision,
    pub applied: bool,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub profiles: Vec<ProfileOutcome>,
    pub snapshot: Option<SessionSnapshot>,
}

/// `sha256:<hex>` digest of a screenshot file.
pub async fn profile_key_for(path: &Path) -> Result<String, PipelineError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| PipelineError::Screenshot {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(format!("sha256:{}", hex::encode(Sha256::digest(&bytes))))
}

/// Drives one end-to-end session: capture, extract, decide and act per profile.
pub struct Orchestrator {
    client: AppClient,
    engine: DecisionEngine,
    extractor: Arc<dyn Extractor>,
    store: Arc<dyn DecisionStore>,
    session: Arc<Session>,
    settings: RunSettings,
}

impl Orchestrator {
    pub fn new(
        client: AppClient,
        engine: DecisionEngine,
        extractor: Arc<dyn Extractor>,
        store: Arc<dyn DecisionStore>,
        session: Arc<Session>,
        settings: RunSettings,
    ) -> Self {
        Self {
            client,
            engine,
            extractor,
            store,
            session,
            settings,
        }
    }

    /// Wires every collaborator from configuration around `transport`.
    ///
    /// The extractor is the no-op extractor; use [`Orchestrator::new`] to plug in a real one.
    pub fn from_config(
        config: &SwipeConfig,
        transport: Box<dyn UiTransport>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let settings = RunSettings::from_section(&config.run)?;
        let policy = config.run.policy_kind()?;

        let registry =
            PolicyRegistry::with_defaults(&config.policies).map_err(|source| {
                PipelineError::Decision {
                    context: "init policies".into(),
                    source,
                }
            })?;
        let engine = DecisionEngine::new(Arc::new(registry), policy);

        let driver = InteractionDriver::new(transport, &config.driver);
        let client = AppClient::new(
            adapter_for(settings.app, &config.selectors),
            Box::new(driver),
        )
        .with_entry_url(config.run.entry_url.clone());

        let store: Arc<dyn DecisionStore> = match &config.run.db_path {
            Some(path) => Arc::new(SqliteStore::open_path(path).map_err(|source| {
                PipelineError::Store {
                    context: "init store".into(),
                    source,
                }
            })?),
            None => Arc::new(NoopStore),
        };

        let mut sinks: Vec<Arc<dyn AnalyticsSink>> = Vec::new();
        if config.analytics.log_sink {
            sinks.push(Arc::new(TracingSink));
        }
        if let Some(path) = &config.analytics.jsonl_path {
            sinks.push(Arc::new(JsonLinesSink::new(path)));
        }
        let session = Arc::new(Session::new(settings.app, policy.as_str(), sinks));

        let extractor = Arc::new(NoopExtractor::new(config.run.extractor_delay()));

        Ok(Self::new(client, engine, extractor, store, session, settings))
    }

    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    /// Runs the profile loop, then closes the client, the store and the session.
    pub async fn run(&mut self, cancel: &CancelSignal) -> Result<RunSummary, PipelineError> {
        info!(
            app = %self.settings.app,
            policy = %self.engine.selected(),
            profiles = self.settings.profiles,
            dry_run = self.settings.dry_run,
            "starting decision run"
        );
        let mut outcomes = Vec::new();
        let result = self.run_profiles(cancel, &mut outcomes).await;

        let metrics = self.client.metrics();
        for (name, value) in metrics.counters() {
            self.session.inc(name, value);
        }
        if let Err(err) = self.client.close().await {
            warn!(error = %err, "failed to close app client");
        }
        if let Err(err) = self.store.close().await {
            warn!(error = %err, "failed to close decision store");
        }

        let result = match result {
            Err(err)
                if self.settings.profiles == 0
                    && !outcomes.is_empty()
                    && err.cancel_cause() == Some(CancelCause::DeadlineExceeded) =>
            {
                info!(completed = outcomes.len(), "run deadline reached");
                Ok(())
            }
            other => other,
        };

        let snapshot = self
            .session
            .close(result.as_ref().err().map(|err| err.to_string()))
            .await;
        info!(
            completed = outcomes.len(),
            click_retry_rate = metrics.click_retry_rate(),
            "decision run finished"
        );
        result.map(|()| RunSummary {
            profiles: outcomes,
            snapshot,
        })
    }

    async fn run_profiles(
        &mut self,
        cancel: &CancelSignal,
        outcomes: &mut Vec<ProfileOutcome>,
    ) -> Result<(), PipelineError> {
        self.client
            .open(cancel)
            .await
            .map_err(browser("open app"))?;
        cancel.sleep(self.settings.settle_delay).await?;

        let mut index = 1u32;
        loop {
            if self.settings.profiles > 0 && index > self.settings.profiles {
                return Ok(());
            }
            cancel.check()?;
            if index > 1 {
                cancel.sleep(self.settings.between_profiles).await?;
            }

            self.session.profile_attempt();
            let outcome = self.process_profile(cancel, index).await?;
            self.session.profile_complete();
            outcomes.push(outcome);
            index += 1;
        }
    }

    async fn process_profile(
        &self,
        cancel: &CancelSignal,
        index: u32,
    ) -> Result<ProfileOutcome, PipelineError> {
        let started = Instant::now();
        let screenshots = self.capture(cancel, index).await?;
        self.session.observe("timer.capture", started.elapsed());
        let Some(first) = screenshots.first() else {
            return Err(PipelineError::NoScreenshots { profile: index });
        };
        self.session.add_screenshots(screenshots.len() as u64);
        let profile_key = profile_key_for(first).await?;
        let app = self.settings.app;

        let started = Instant::now();
        let behaviour = self
            .extractor
            .extract_behaviour(cancel, &profile_key, &screenshots)
            .await
            .map_err(|source| PipelineError::Extract {
                context: format!("profile {index}: extract behaviour"),
                source,
            })?;
        self.store
            .save_behaviour(&profile_key, app, &behaviour)
            .await
            .map_err(|source| PipelineError::Store {
                context: format!("profile {index}: store behaviour traits"),
                source,
            })?;
        let persona = self
            .extractor
            .extract_photo_persona(cancel, &profile_key, &screenshots[..1])
            .await
            .map_err(|source| PipelineError::Extract {
                context: format!("profile {index}: extract photo persona"),
                source,
            })?;
        self.session.observe("timer.extract", started.elapsed());

        let ctx = DecisionContext::new(app)
            .with_behaviour(behaviour)
            .with_photo_persona(map_photos_to_persona_bundle(std::slice::from_ref(&persona)))
            .with_profile_key(profile_key.clone());

        let started = Instant::now();
        let decision = self
            .engine
            .decide(cancel, &ctx)
            .map_err(|source| PipelineError::Decision {
                context: format!("profile {index}"),
                source,
            })?;
        self.session.observe("timer.decide", started.elapsed());
        self.session.record_action(decision.action.kind);
        self.store
            .save_decision(&profile_key, &decision)
            .await
            .map_err(|source| PipelineError::Store {
                context: format!("profile {index}: store decision"),
                source,
            })?;
        info!(
            profile = index,
            key = %profile_key,
            action = %decision.action.kind,
            score = decision.score,
            policy = %decision.policy_name,
            reason = %decision.reason,
            "decision made"
        );

        let applied = if self.settings.dry_run {
            false
        } else {
            let started = Instant::now();
            self.client
                .act(cancel, &decision.action)
                .await
                .map_err(browser(format!("profile {index}: apply action")))?;
            self.session.observe("timer.act", started.elapsed());
            info!(profile = index, action = %decision.action.kind, "action applied");
            true
        };

        Ok(ProfileOutcome {
            index,
            profile_key,
            screenshots,
            decision,
            applied,
        })
    }

    async fn capture(&self, cancel: &CancelSignal, index: u32) -> Result<Vec<PathBuf>, PipelineError> {
        let shots = self.settings.shots_per_profile;
        let mut paths = Vec::with_capacity(shots as usize);
        for shot in 1..=shots {
            cancel.check()?;
            let path = self
                .settings
                .screenshot_dir
                .join(format!("profile_{index:02}_img_{shot:02}.png"));
            self.client
                .screenshot(cancel, &path)
                .await
                .map_err(browser(format!("profile {index}: capture screenshot {shot}")))?;
            debug!(profile = index, path = %path.display(), "saved screenshot");
            paths.push(path);

            if shot < shots {
                if let Err(err) = self.client.next_media(cancel).await {
                    if err.is_cancelled() {
                        return Err(browser(format!("profile {index}: next media"))(err));
                    }
                    info!(profile = index, shots = shot, error = %err, "next media stopped");
                    break;
                }
                cancel.sleep(self.settings.between_shots).await?;
            }
        }
        Ok(paths)
    }
}
