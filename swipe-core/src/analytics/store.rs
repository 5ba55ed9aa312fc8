use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::duration_ms;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerAggregate {
    pub count: u64,
    #[serde(rename = "total_ms", with = "duration_ms")]
    pub total: Duration,
    #[serde(rename = "min_ms", with = "duration_ms")]
    pub min: Duration,
    #[serde(rename = "max_ms", with = "duration_ms")]
    pub max: Duration,
}

impl TimerAggregate {
    fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total = self.total.saturating_add(duration);
        if self.count == 1 || duration < self.min {
            self.min = duration;
        }
        if duration > self.max {
            self.max = duration;
        }
    }

    pub fn mean(&self) -> Duration {
        match u32::try_from(self.count) {
            Ok(0) => Duration::ZERO,
            Ok(count) => self.total / count,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.count as f64),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    counters: BTreeMap<String, u64>,
    timers: BTreeMap<String, TimerAggregate>,
}

/// Named counters and duration aggregates, safe to share across tasks.
#[derive(Debug, Default)]
pub struct MetricsStore {
    inner: Mutex<Inner>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// No-op for an empty name or a zero delta.
    pub fn inc(&self, name: &str, delta: u64) {
        if name.is_empty() || delta == 0 {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = inner.counters.entry(name.to_string()).or_default();
        *counter = counter.saturating_add(delta);
    }

    /// No-op for an empty name. The first observation seeds both min and max.
    pub fn observe(&self, name: &str, duration: Duration) {
        if name.is_empty() {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .timers
            .entry(name.to_string())
            .or_default()
            .record(duration);
    }

    pub fn counter(&self, name: &str) -> u64 {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.counters.get(name).copied().unwrap_or(0)
    }

    pub fn counters(&self) -> BTreeMap<String, u64> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.counters.clone()
    }

    pub fn timers(&self) -> BTreeMap<String, TimerAggregate> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.timers.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn zero_delta_and_empty_name_are_ignored() {
        let store = MetricsStore::new();
        store.inc("x", 0);
        store.inc("", 5);
        store.observe("", Duration::from_millis(3));
        assert!(store.counters().is_empty());
        assert!(store.timers().is_empty());
    }

    #[test]
    fn first_observation_sets_min_and_max() {
        let store = MetricsStore::new();
        store.observe("timer.act", Duration::from_millis(40));
        let first = store.timers()["timer.act"];
        assert_eq!(first.min, Duration::from_millis(40));
        assert_eq!(first.max, Duration::from_millis(40));

        store.observe("timer.act", Duration::from_millis(10));
        store.observe("timer.act", Duration::from_millis(70));
        let agg = store.timers()["timer.act"];
        assert_eq!(agg.count, 3);
        assert_eq!(agg.total, Duration::from_millis(120));
        assert_eq!(agg.min, Duration::from_millis(10));
        assert_eq!(agg.max, Duration::from_millis(70));
        assert_eq!(agg.mean(), Duration::from_millis(40));
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let store = Arc::new(MetricsStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        store.inc("profile_attempts", 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.counter("profile_attempts"), 8000);
    }
}
