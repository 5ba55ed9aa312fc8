use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cancel::CancelSignal;

use super::context::{Decision, DecisionContext};
use super::error::{DecisionError, DecisionResult};

/// Every policy the registry knows how to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PolicyKind {
    #[serde(rename = "qa_cycle_v1")]
    QaCycle,
    #[serde(rename = "probabilistic_ratio_v1")]
    ProbabilisticRatio,
    #[serde(rename = "apparent_gender_probability_v1")]
    ApparentGender,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 3] = [
        PolicyKind::QaCycle,
        PolicyKind::ProbabilisticRatio,
        PolicyKind::ApparentGender,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::QaCycle => "qa_cycle_v1",
            PolicyKind::ProbabilisticRatio => "probabilistic_ratio_v1",
            PolicyKind::ApparentGender => "apparent_gender_probability_v1",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = DecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        PolicyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| DecisionError::UnknownPolicy(name.to_string()))
    }
}

/// A stateful decision strategy.
///
/// Implementations guard their own state and hold the lock only for the
/// state transition or the random draw, so one instance may serve concurrent
/// callers.
pub trait Policy: Send + Sync {
    fn kind(&self) -> PolicyKind;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Fails with [`DecisionError::Cancelled`] before touching any state when
    /// `cancel` has already fired.
    fn decide(&self, cancel: &CancelSignal, ctx: &DecisionContext) -> DecisionResult<Decision>;
}
