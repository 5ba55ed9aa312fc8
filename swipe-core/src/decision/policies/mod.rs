mod apparent_gender;
mod probabilistic_ratio;
mod qa_cycle;

pub use apparent_gender::{ApparentGender, ApparentGenderConfig, ApparentGenderPolicy};
pub use probabilistic_ratio::{ProbabilisticRatioConfig, ProbabilisticRatioPolicy};
pub use qa_cycle::{QaCycleConfig, QaCyclePolicy};

use super::error::{DecisionError, DecisionResult};

pub(crate) const DEFAULT_SCORE_LIKE: u8 = 70;
pub(crate) const DEFAULT_SCORE_PASS: u8 = 40;

pub(crate) fn default_score_like() -> u8 {
    DEFAULT_SCORE_LIKE
}

pub(crate) fn default_score_pass() -> u8 {
    DEFAULT_SCORE_PASS
}

fn validate_score(field: &'static str, value: u8) -> DecisionResult<u8> {
    if value > 100 {
        return Err(DecisionError::InvalidScore { field, value });
    }
    Ok(value)
}
