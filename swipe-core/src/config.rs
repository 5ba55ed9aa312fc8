use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::apps::BumbleSelectors;
use crate::decision::{ApparentGenderConfig, PolicyKind, ProbabilisticRatioConfig, QaCycleConfig};
use crate::domain::AppName;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SwipeConfig {
    pub driver: DriverSection,
    pub chromium: ChromiumSection,
    pub run: RunSection,
    pub policies: PoliciesSection,
    pub analytics: AnalyticsSection,
    pub selectors: SelectorsSection,
}

impl SwipeConfig {
    /// Checks values serde cannot express; call after applying overrides.
    pub fn validate(&self) -> Result<()> {
        self.run.app_name()?;
        self.run.policy_kind()?;
        if self.run.shots_per_profile == 0 {
            return Err(ConfigError::invalid(
                "run.shots_per_profile",
                "at least one screenshot per profile is required",
            ));
        }
        if self.run.timeout_secs == 0 {
            return Err(ConfigError::invalid("run.timeout_secs", "must be > 0"));
        }
        if self.driver.step_timeout_ms == 0 {
            return Err(ConfigError::invalid("driver.step_timeout_ms", "must be > 0"));
        }
        if self.driver.probe_timeout_ms == 0 {
            return Err(ConfigError::invalid("driver.probe_timeout_ms", "must be > 0"));
        }
        if self.driver.poll_interval_ms == 0 {
            return Err(ConfigError::invalid("driver.poll_interval_ms", "must be > 0"));
        }
        if self.driver.poll_interval_ms >= self.driver.step_timeout_ms {
            return Err(ConfigError::invalid(
                "driver.poll_interval_ms",
                format!(
                    "must be below driver.step_timeout_ms ({})",
                    self.driver.step_timeout_ms
                ),
            ));
        }
        if self.driver.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("driver.retry.max_attempts", "must be >= 1"));
        }
        if self.chromium.window[0] == 0 || self.chromium.window[1] == 0 {
            return Err(ConfigError::invalid(
                "chromium.window",
                "width and height must be > 0",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriverSection {
    pub step_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub retry: RetrySection,
}

impl Default for DriverSection {
    fn default() -> Self {
        Self {
            step_timeout_ms: 6_000,
            probe_timeout_ms: 600,
            poll_interval_ms: 120,
            retry: RetrySection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: usize,
    pub delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChromiumSection {
    pub executable_path: Option<String>,
    /// DevTools websocket URL of an already running browser.
    pub control_url: Option<String>,
    pub headless: bool,
    pub sandbox: bool,
    pub disable_gpu: bool,
    pub window: [u32; 2],
    pub user_agent: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for ChromiumSection {
    fn default() -> Self {
        Self {
            executable_path: None,
            control_url: None,
            headless: false,
            sandbox: true,
            disable_gpu: false,
            window: [1366, 768],
            user_agent: None,
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub app: String,
    pub entry_url: Option<String>,
    pub policy: String,
    /// Zero runs until the timeout expires.
    pub profiles: u32,
    pub shots_per_profile: u32,
    pub screenshot_dir: PathBuf,
    pub timeout_secs: u64,
    pub dry_run: bool,
    pub settle_delay_ms: u64,
    pub between_shots_ms: u64,
    pub between_profiles_ms: u64,
    pub db_path: Option<PathBuf>,
    pub extractor_delay_ms: u64,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            app: AppName::Bumble.as_str().to_string(),
            entry_url: None,
            policy: PolicyKind::QaCycle.as_str().to_string(),
            profiles: 0,
            shots_per_profile: 1,
            screenshot_dir: PathBuf::from("out/decision_engine"),
            timeout_secs: 600,
            dry_run: false,
            settle_delay_ms: 5_000,
            between_shots_ms: 500,
            between_profiles_ms: 3_000,
            db_path: None,
            extractor_delay_ms: 5_000,
        }
    }
}

impl RunSection {
    pub fn app_name(&self) -> Result<AppName> {
        self.app
            .parse()
            .map_err(|reason: String| ConfigError::invalid("run.app", reason))
    }

    pub fn policy_kind(&self) -> Result<PolicyKind> {
        self.policy
            .parse()
            .map_err(|err: crate::decision::DecisionError| {
                ConfigError::invalid("run.policy", err.to_string())
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn between_shots(&self) -> Duration {
        Duration::from_millis(self.between_shots_ms)
    }

    pub fn between_profiles(&self) -> Duration {
        Duration::from_millis(self.between_profiles_ms)
    }

    pub fn extractor_delay(&self) -> Duration {
        Duration::from_millis(self.extractor_delay_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PoliciesSection {
    pub qa_cycle: QaCycleConfig,
    pub probabilistic_ratio: ProbabilisticRatioConfig,
    pub apparent_gender: ApparentGenderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsSection {
    pub log_sink: bool,
    pub jsonl_path: Option<PathBuf>,
}

impl Default for AnalyticsSection {
    fn default() -> Self {
        Self {
            log_sink: true,
            jsonl_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SelectorsSection {
    pub bumble: BumbleSelectors,
}

pub fn load_swipe_config<P: AsRef<Path>>(path: P) -> Result<SwipeConfig> {
    let config: SwipeConfig = load_toml(path)?;
    config.validate()?;
    Ok(config)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_fixture_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/swipe.toml");
        let config = load_swipe_config(path).expect("fixture config should parse");
        assert_eq!(config.run.app_name().unwrap(), AppName::Bumble);
        assert_eq!(config.run.policy_kind().unwrap(), PolicyKind::QaCycle);
        assert_eq!(config.driver.retry.max_attempts, 3);
        assert_eq!(config.policies.probabilistic_ratio.like_weight, 5);
        assert_eq!(config.policies.apparent_gender.unknown_pass_weight, 6);
        assert!(config.analytics.log_sink);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config: SwipeConfig = toml::from_str("").unwrap();
        config.validate().unwrap();
        assert_eq!(config.driver.step_timeout_ms, 6_000);
        assert_eq!(config.driver.poll_interval_ms, 120);
        assert_eq!(config.run.timeout(), Duration::from_secs(600));
        assert_eq!(config.chromium.window, [1366, 768]);
        assert_eq!(config.policies.qa_cycle.likes_before_pass, 3);
    }

    #[test]
    fn unknown_policy_name_is_rejected() {
        let config: SwipeConfig = toml::from_str("[run]\npolicy = \"vibes_v1\"\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "run.policy", .. }));
    }

    #[test]
    fn poll_interval_must_fit_inside_step_timeout() {
        let zero: SwipeConfig = toml::from_str("[driver]\npoll_interval_ms = 0\n").unwrap();
        assert!(matches!(
            zero.validate().unwrap_err(),
            ConfigError::Invalid { field: "driver.poll_interval_ms", .. }
        ));

        let single_pass: SwipeConfig = toml::from_str(
            "[driver]\nstep_timeout_ms = 500\npoll_interval_ms = 500\n",
        )
        .unwrap();
        assert!(matches!(
            single_pass.validate().unwrap_err(),
            ConfigError::Invalid { field: "driver.poll_interval_ms", .. }
        ));

        let ok: SwipeConfig = toml::from_str(
            "[driver]\nstep_timeout_ms = 500\npoll_interval_ms = 499\n",
        )
        .unwrap();
        ok.validate().unwrap();
    }

    #[test]
    fn negative_weights_fail_to_parse() {
        let parsed = toml::from_str::<SwipeConfig>(
            "[policies.probabilistic_ratio]\nlike_weight = -1\n",
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn empty_selector_override_fails_to_parse() {
        let parsed = toml::from_str::<SwipeConfig>("[selectors.bumble]\nlike = []\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_swipe_config("/definitely/not/here.toml").unwrap_err();
        match err {
            ConfigError::Io { path, .. } => assert!(path.ends_with("here.toml")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
