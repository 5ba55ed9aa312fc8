use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use swipe_core::{
    load_swipe_config, BrowserError, CancelSignal, ChromiumTransport, ConfigError, Decision,
    DecisionContext, DecisionEngine, DecisionError, Orchestrator, PipelineError, PolicyKind,
    PolicyRegistry, SqliteStore, StoreError, StoredDecision, SwipeConfig,
};
use thiserror::Error;
use tracing::{debug, info, warn};

pub type Result<T> = std::result::Result<T, AppError>;

const DEFAULT_CONFIG: &str = "configs/swipe.toml";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),
    #[error("decision error: {0}")]
    Decision(#[from] DecisionError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("run failed: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("failed to read context {path}: {source}")]
    Context {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("required resource missing: {0}")]
    MissingResource(String),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Swipe automation control interface", long_about = None)]
pub struct Cli {
    /// Path to swipe.toml
    #[arg(long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive the app: capture, decide and act on each profile
    Run(RunArgs),
    /// Evaluate a policy offline against a context JSON file
    Decide(DecideArgs),
    /// List registered decision policies
    Policies,
    /// Show the most recent persisted decisions
    Decisions(DecisionsArgs),
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    #[arg(long)]
    pub app: Option<String>,
    #[arg(long)]
    pub policy: Option<String>,
    /// Number of profiles; 0 runs until the timeout
    #[arg(long)]
    pub profiles: Option<u32>,
    #[arg(long)]
    pub shots_per_profile: Option<u32>,
    #[arg(long, default_value_t = false)]
    pub headless: bool,
    /// DevTools websocket URL of an already running browser
    #[arg(long)]
    pub control_url: Option<String>,
    #[arg(long)]
    pub entry_url: Option<String>,
    /// Decide without clicking any action
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
    #[arg(long)]
    pub timeout_secs: Option<u64>,
    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

impl RunArgs {
    fn apply(&self, config: &mut SwipeConfig) {
        let run = &mut config.run;
        if let Some(app) = &self.app {
            run.app = app.clone();
        }
        if let Some(policy) = &self.policy {
            run.policy = policy.clone();
        }
        if let Some(profiles) = self.profiles {
            run.profiles = profiles;
        }
        if let Some(shots) = self.shots_per_profile {
            run.shots_per_profile = shots;
        }
        if let Some(url) = &self.entry_url {
            run.entry_url = Some(url.clone());
        }
        if let Some(timeout) = self.timeout_secs {
            run.timeout_secs = timeout;
        }
        if let Some(path) = &self.db_path {
            run.db_path = Some(path.clone());
        }
        run.dry_run |= self.dry_run;
        if self.headless {
            config.chromium.headless = true;
        }
        if let Some(url) = &self.control_url {
            config.chromium.control_url = Some(url.clone());
        }
    }
}

#[derive(Args, Debug)]
pub struct DecideArgs {
    /// JSON file holding a decision context
    #[arg(long)]
    pub context: PathBuf,
    /// Policy name; defaults to run.policy from the config
    #[arg(long)]
    pub policy: Option<String>,
    /// Evaluate the same context several times (stateful policies advance)
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,
}

#[derive(Args, Debug)]
pub struct DecisionsArgs {
    /// SQLite database; defaults to run.db_path from the config
    #[arg(long)]
    pub db: Option<PathBuf>,
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

pub fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli.config)?;

    match &cli.command {
        Commands::Run(args) => {
            args.apply(&mut config);
            config.validate()?;
            let report = run_session(&config)?;
            render(&report, cli.format)?;
        }
        Commands::Decide(args) => {
            let decisions = decide(&config, args)?;
            render(&decisions, cli.format)?;
        }
        Commands::Policies => {
            let policies = list_policies(&config)?;
            render(&policies, cli.format)?;
        }
        Commands::Decisions(args) => {
            let decisions = recent_decisions(&config, args)?;
            render(&decisions, cli.format)?;
        }
    }

    Ok(())
}

/// Loads the config file; a missing file at the default location falls back to defaults.
fn load_config(path: &Path) -> Result<SwipeConfig> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        debug!(path = %path.display(), "config not found, using defaults");
        return Ok(SwipeConfig::default());
    }
    Ok(load_swipe_config(path)?)
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

#[derive(Debug, Serialize)]
struct RunReport {
    session_id: Option<String>,
    status: String,
    profiles: Vec<ProfileLine>,
}

#[derive(Debug, Serialize)]
struct ProfileLine {
    index: u32,
    profile_key: String,
    action: String,
    score: u8,
    applied: bool,
    reason: String,
}

impl DisplayFallback for RunReport {
    fn display(&self) -> String {
        let mut out = format!(
            "session {} ({})\n",
            self.session_id.as_deref().unwrap_or("-"),
            self.status
        );
        for line in &self.profiles {
            let _ = writeln!(
                out,
                "#{:<3} {:<10} score={:<3} applied={:<5} {}",
                line.index, line.action, line.score, line.applied, line.reason
            );
        }
        out.trim_end().to_string()
    }
}

fn run_session(config: &SwipeConfig) -> Result<RunReport> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(drive(config))
}

async fn drive(config: &SwipeConfig) -> Result<RunReport> {
    let transport = ChromiumTransport::start(&config.chromium).await?;
    let mut orchestrator = Orchestrator::from_config(config, Box::new(transport))?;

    let cancel = CancelSignal::with_timeout(config.run.timeout());
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping run");
            interrupt.cancel();
        }
    });

    let summary = orchestrator.run(&cancel).await?;
    info!(profiles = summary.profiles.len(), "run complete");
    Ok(RunReport {
        session_id: summary
            .snapshot
            .as_ref()
            .map(|snapshot| snapshot.session_id.to_string()),
        status: summary
            .snapshot
            .as_ref()
            .map(|snapshot| snapshot.status.to_string())
            .unwrap_or_else(|| "closed".to_string()),
        profiles: summary
            .profiles
            .into_iter()
            .map(|outcome| ProfileLine {
                index: outcome.index,
                profile_key: outcome.profile_key,
                action: outcome.decision.action.kind.to_string(),
                score: outcome.decision.score,
                applied: outcome.applied,
                reason: outcome.decision.reason,
            })
            .collect(),
    })
}

impl DisplayFallback for Vec<Decision> {
    fn display(&self) -> String {
        if self.is_empty() {
            return "No decisions".to_string();
        }
        self.iter()
            .map(|decision| {
                format!(
                    "{:<10} score={:<3} {:<32} {}",
                    decision.action.kind, decision.score, decision.policy_name, decision.reason
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn decide(config: &SwipeConfig, args: &DecideArgs) -> Result<Vec<Decision>> {
    let raw = fs::read_to_string(&args.context)?;
    let ctx: DecisionContext =
        serde_json::from_str(&raw).map_err(|source| AppError::Context {
            path: args.context.clone(),
            source,
        })?;
    let kind: PolicyKind = match &args.policy {
        Some(name) => name.parse()?,
        None => config.run.policy_kind()?,
    };
    let registry = PolicyRegistry::with_defaults(&config.policies)?;
    let engine = DecisionEngine::new(Arc::new(registry), kind);
    let cancel = CancelSignal::new();
    let mut decisions = Vec::with_capacity(args.repeat as usize);
    for _ in 0..args.repeat.max(1) {
        decisions.push(engine.decide(&cancel, &ctx)?);
    }
    Ok(decisions)
}

#[derive(Debug, Serialize)]
struct PolicyEntry {
    name: &'static str,
    selected: bool,
}

impl DisplayFallback for Vec<PolicyEntry> {
    fn display(&self) -> String {
        self.iter()
            .map(|entry| {
                let marker = if entry.selected { "*" } else { " " };
                format!("{marker} {}", entry.name)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn list_policies(config: &SwipeConfig) -> Result<Vec<PolicyEntry>> {
    let registry = PolicyRegistry::with_defaults(&config.policies)?;
    let selected = config.run.policy_kind().ok();
    Ok(registry
        .kinds()
        .into_iter()
        .map(|kind| PolicyEntry {
            name: kind.as_str(),
            selected: Some(kind) == selected,
        })
        .collect())
}

impl DisplayFallback for Vec<StoredDecision> {
    fn display(&self) -> String {
        if self.is_empty() {
            return "No stored decisions".to_string();
        }
        self.iter()
            .map(|row| {
                format!(
                    "{:<10} score={:<3} {:<32} {}",
                    row.action_kind,
                    row.score,
                    row.policy_name,
                    row.profile_key.as_deref().unwrap_or("-")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn recent_decisions(config: &SwipeConfig, args: &DecisionsArgs) -> Result<Vec<StoredDecision>> {
    let path = args
        .db
        .clone()
        .or_else(|| config.run.db_path.clone())
        .ok_or_else(|| AppError::MissingResource("no decision database configured".into()))?;
    if !path.exists() {
        return Err(AppError::MissingResource(format!(
            "decision database not found at {}",
            path.display()
        )));
    }
    let store = SqliteStore::builder()
        .path(&path)
        .create_if_missing(false)
        .build()?;
    Ok(store.recent_decisions(args.limit)?)
}
