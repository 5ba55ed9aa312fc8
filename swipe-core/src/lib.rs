pub mod analytics;
pub mod apps;
pub mod browser;
pub mod cancel;
pub mod config;
pub mod decision;
pub mod domain;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod store;

pub use analytics::{AnalyticsSink, JsonLinesSink, Session, SessionSnapshot, SessionStatus, TracingSink};
pub use apps::{adapter_for, AppAdapter, AppClient, BumbleAdapter, SelectorList};
pub use browser::{
    BrowserError, BrowserResult, ChromiumTransport, Driver, InteractionDriver, InteractionMetrics,
    RetryPolicy, UiElement, UiPage, UiTransport,
};
pub use cancel::{CancelCause, CancelSignal, Cancelled};
pub use config::{
    load_swipe_config, AnalyticsSection, ChromiumSection, DriverSection, PoliciesSection,
    RetrySection, RunSection, SelectorsSection, SwipeConfig,
};
pub use decision::{
    Decision, DecisionContext, DecisionEngine, DecisionError, DecisionResult, Policy, PolicyKind,
    PolicyRegistry,
};
pub use domain::{Action, ActionKind, AppName, BehaviourTraits, PhotoPersonaBundle};
pub use error::{ConfigError, Result};
pub use extractor::{
    ExtractError, ExtractedTraits, Extractor, MappingExtractor, NoopExtractor,
    SelectiveNoopExtractor, TraitsSource,
};
pub use pipeline::{Orchestrator, PipelineError, ProfileOutcome, RunSettings, RunSummary};
pub use store::{DecisionStore, NoopStore, SqliteStore, SqliteStoreBuilder, StoreError, StoredDecision};
