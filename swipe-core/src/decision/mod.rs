mod context;
mod engine;
mod error;
pub mod policies;
mod policy;
mod random;
mod registry;

pub use context::{Decision, DecisionContext};
pub use engine::DecisionEngine;
pub use error::{DecisionError, DecisionResult};
pub use policies::{
    ApparentGender, ApparentGenderConfig, ApparentGenderPolicy, ProbabilisticRatioConfig,
    ProbabilisticRatioPolicy, QaCycleConfig, QaCyclePolicy,
};
pub use policy::{Policy, PolicyKind};
pub use random::{seeded_source, LikePassWeights, LockedRandom, RandomSource};
pub use registry::PolicyRegistry;
