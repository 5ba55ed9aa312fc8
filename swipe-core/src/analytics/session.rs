use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::{ActionKind, AppName};

use super::duration_ms;
use super::sinks::AnalyticsSink;
use super::store::{MetricsStore, TimerAggregate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Success,
    Error,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionStatus::Success => "success",
            SessionStatus::Error => "error",
        })
    }
}

/// Immutable summary of one run, produced once when the session closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub app: AppName,
    pub policy: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "runtime_ms", with = "duration_ms")]
    pub runtime: Duration,
    pub counters: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub timers: BTreeMap<String, TimerAggregate>,
}

/// Run-scoped analytics: counters and timers plus a single final emission.
pub struct Session {
    id: Uuid,
    app: AppName,
    policy: String,
    started_at: DateTime<Utc>,
    started: Instant,
    store: MetricsStore,
    sinks: Vec<Arc<dyn AnalyticsSink>>,
    closed: AtomicBool,
}

impl Session {
    pub fn new(app: AppName, policy: impl Into<String>, sinks: Vec<Arc<dyn AnalyticsSink>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            app,
            policy: policy.into(),
            started_at: Utc::now(),
            started: Instant::now(),
            store: MetricsStore::new(),
            sinks,
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn store(&self) -> &MetricsStore {
        &self.store
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn inc(&self, name: &str, delta: u64) {
        self.store.inc(name, delta);
    }

    pub fn observe(&self, name: &str, duration: Duration) {
        self.store.observe(name, duration);
    }

    pub fn profile_attempt(&self) {
        self.inc("profile_attempts", 1);
    }

    pub fn profile_complete(&self) {
        self.inc("profiles_completed", 1);
    }

    pub fn add_screenshots(&self, count: u64) {
        self.inc("screenshots", count);
    }

    pub fn record_action(&self, kind: ActionKind) {
        self.inc(&format!("action.{kind}"), 1);
    }

    /// Takes the snapshot and hands it to every sink.
    ///
    /// Only the first call does any work and returns the snapshot; later or
    /// concurrent calls return `None`. Sink failures are logged and dropped.
    pub async fn close(&self, error: Option<String>) -> Option<SessionSnapshot> {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let snapshot = SessionSnapshot {
            session_id: self.id,
            app: self.app,
            policy: self.policy.clone(),
            status: if error.is_some() {
                SessionStatus::Error
            } else {
                SessionStatus::Success
            },
            error,
            started_at: self.started_at,
            runtime: self.started.elapsed(),
            counters: self.store.counters(),
            timers: self.store.timers(),
        };

        for sink in &self.sinks {
            if let Err(err) = sink.emit(&snapshot).await {
                warn!(sink = sink.name(), error = %err, "analytics sink failed");
            }
        }
        Some(snapshot)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("app", &self.app)
            .field("policy", &self.policy)
            .field("sinks", &self.sinks.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::analytics::SinkError;

    #[derive(Default)]
    struct RecordingSink {
        emitted: Mutex<Vec<SessionSnapshot>>,
    }

    #[async_trait]
    impl AnalyticsSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn emit(&self, snapshot: &SessionSnapshot) -> Result<(), SinkError> {
            self.emitted.lock().unwrap().push(snapshot.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl AnalyticsSink for FailingSink {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn emit(&self, _snapshot: &SessionSnapshot) -> Result<(), SinkError> {
            Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }
    }

    #[tokio::test]
    async fn close_emits_once_and_ignores_later_counters() {
        let sink = Arc::new(RecordingSink::default());
        let session = Session::new(AppName::Bumble, "qa_cycle_v1", vec![sink.clone()]);
        session.profile_attempt();
        session.record_action(ActionKind::SuperLike);
        session.add_screenshots(3);

        let snapshot = session.close(None).await.unwrap();
        session.profile_attempt();
        assert!(session.close(Some("late".into())).await.is_none());

        let emitted = sink.emitted.lock().unwrap();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0], snapshot);
        assert_eq!(snapshot.status, SessionStatus::Success);
        assert_eq!(snapshot.counters["profile_attempts"], 1);
        assert_eq!(snapshot.counters["action.SUPER_LIKE"], 1);
        assert_eq!(snapshot.counters["screenshots"], 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_close_emits_exactly_once() {
        let sink = Arc::new(RecordingSink::default());
        let session = Arc::new(Session::new(
            AppName::Bumble,
            "probabilistic_ratio_v1",
            vec![sink.clone()],
        ));
        let closers: Vec<_> = (0..16)
            .map(|i| {
                let session = Arc::clone(&session);
                tokio::spawn(async move { session.close(Some(format!("closer {i}"))).await })
            })
            .collect();
        let mut produced = 0;
        for closer in closers {
            if closer.await.unwrap().is_some() {
                produced += 1;
            }
        }
        assert_eq!(produced, 1);
        assert_eq!(sink.emitted.lock().unwrap().len(), 1);
        assert_eq!(sink.emitted.lock().unwrap()[0].status, SessionStatus::Error);
    }

    #[tokio::test]
    async fn sink_failures_do_not_reach_the_caller() {
        let recording = Arc::new(RecordingSink::default());
        let session = Session::new(
            AppName::Bumble,
            "qa_cycle_v1",
            vec![Arc::new(FailingSink), recording.clone()],
        );
        let snapshot = session.close(Some("boom".into())).await.unwrap();
        assert_eq!(snapshot.error.as_deref(), Some("boom"));
        assert_eq!(recording.emitted.lock().unwrap().len(), 1);
    }

    #[test]
    fn snapshot_serializes_durations_as_millis() {
        let mut timers = BTreeMap::new();
        timers.insert(
            "timer.decide".to_string(),
            TimerAggregate {
                count: 2,
                total: Duration::from_millis(30),
                min: Duration::from_millis(10),
                max: Duration::from_millis(20),
            },
        );
        let snapshot = SessionSnapshot {
            session_id: Uuid::nil(),
            app: AppName::Bumble,
            policy: "qa_cycle_v1".into(),
            status: SessionStatus::Success,
            error: None,
            started_at: Utc::now(),
            runtime: Duration::from_millis(1500),
            counters: BTreeMap::new(),
            timers,
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["runtime_ms"], 1500);
        assert_eq!(value["timers"]["timer.decide"]["min_ms"], 10);
        assert!(value.get("error").is_none());
    }
}
