use thiserror::Error;

use crate::cancel::Cancelled;

use super::policy::PolicyKind;

pub type DecisionResult<T> = Result<T, DecisionError>;

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("no decision policy registered for name={0}")]
    PolicyNotFound(PolicyKind),
    #[error("unknown decision policy name {0:?}")]
    UnknownPolicy(String),
    #[error("{label} like and pass weights must both be > 0 (got like={like}, pass={pass})")]
    InvalidWeights {
        label: &'static str,
        like: u32,
        pass: u32,
    },
    #[error("{field} must be within 0..=100 (got {value})")]
    InvalidScore { field: &'static str, value: u8 },
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl DecisionError {
    pub fn is_configuration(&self) -> bool {
        !matches!(self, DecisionError::Cancelled(_))
    }
}
