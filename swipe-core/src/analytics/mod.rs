mod session;
mod sinks;
mod store;

pub use session::{Session, SessionSnapshot, SessionStatus};
pub use sinks::{AnalyticsSink, JsonLinesSink, SinkError, TracingSink};
pub use store::{MetricsStore, TimerAggregate};

pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
