use serde::{Deserialize, Serialize};

use crate::cancel::CancelSignal;
use crate::decision::context::{Decision, DecisionContext};
use crate::decision::error::DecisionResult;
use crate::decision::policy::{Policy, PolicyKind};
use crate::decision::random::{seeded_source, LikePassWeights, LockedRandom, RandomSource};
use crate::domain::Action;

use super::{default_score_like, default_score_pass, validate_score};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbabilisticRatioConfig {
    #[serde(default = "default_like_weight")]
    pub like_weight: u32,
    #[serde(default = "default_pass_weight")]
    pub pass_weight: u32,
    #[serde(default = "default_score_like")]
    pub score_like: u8,
    #[serde(default = "default_score_pass")]
    pub score_pass: u8,
    /// Fixed seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_like_weight() -> u32 {
    5
}

fn default_pass_weight() -> u32 {
    2
}

impl Default for ProbabilisticRatioConfig {
    fn default() -> Self {
        Self {
            like_weight: default_like_weight(),
            pass_weight: default_pass_weight(),
            score_like: default_score_like(),
            score_pass: default_score_pass(),
            seed: None,
        }
    }
}

/// Likes with probability `like_weight / (like_weight + pass_weight)`.
#[derive(Debug)]
pub struct ProbabilisticRatioPolicy {
    weights: LikePassWeights,
    score_like: u8,
    score_pass: u8,
    random: LockedRandom,
}

impl ProbabilisticRatioPolicy {
    pub fn new(config: ProbabilisticRatioConfig) -> DecisionResult<Self> {
        let source = seeded_source(config.seed);
        Self::with_random(config, source)
    }

    pub fn with_random(
        config: ProbabilisticRatioConfig,
        source: Box<dyn RandomSource>,
    ) -> DecisionResult<Self> {
        let weights =
            LikePassWeights::new("probabilistic_ratio", config.like_weight, config.pass_weight)?;
        Ok(Self {
            weights,
            score_like: validate_score("probabilistic_ratio score_like", config.score_like)?,
            score_pass: validate_score("probabilistic_ratio score_pass", config.score_pass)?,
            random: LockedRandom::new(source),
        })
    }

    pub fn weights(&self) -> LikePassWeights {
        self.weights
    }
}

impl Policy for ProbabilisticRatioPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::ProbabilisticRatio
    }

    fn decide(&self, cancel: &CancelSignal, ctx: &DecisionContext) -> DecisionResult<Decision> {
        cancel.check()?;
        let (action, score) = if self.random.draw_like(self.weights) {
            (Action::like(), self.score_like)
        } else {
            (Action::pass(), self.score_pass)
        };
        Ok(Decision {
            app: ctx.app,
            action,
            score,
            reason: format!(
                "Randomized decision using like:pass ratio {}:{}",
                self.weights.like(),
                self.weights.pass()
            ),
            policy_name: self.name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::random::testing::{ForbiddenRandom, ScriptedRandom};
    use crate::decision::DecisionError;
    use crate::domain::{ActionKind, AppName};

    fn config(like_weight: u32, pass_weight: u32) -> ProbabilisticRatioConfig {
        ProbabilisticRatioConfig {
            like_weight,
            pass_weight,
            ..ProbabilisticRatioConfig::default()
        }
    }

    #[test]
    fn like_fraction_converges_to_ratio() {
        let policy = ProbabilisticRatioPolicy::new(config(3, 2)).unwrap();
        let ctx = DecisionContext::new(AppName::Bumble);
        let cancel = CancelSignal::new();
        let likes = (0..1000)
            .filter(|_| policy.decide(&cancel, &ctx).unwrap().action.kind == ActionKind::Like)
            .count();
        let fraction = likes as f64 / 1000.0;
        assert!((fraction - 0.6).abs() <= 0.05, "like fraction {fraction}");
    }

    #[test]
    fn scripted_rolls_map_to_actions_and_scores() {
        let policy = ProbabilisticRatioPolicy::with_random(
            config(3, 2),
            Box::new(ScriptedRandom::new(&[2, 3])),
        )
        .unwrap();
        let ctx = DecisionContext::new(AppName::Bumble);
        let cancel = CancelSignal::new();

        let liked = policy.decide(&cancel, &ctx).unwrap();
        assert_eq!(liked.action.kind, ActionKind::Like);
        assert_eq!(liked.score, 70);
        assert_eq!(liked.reason, "Randomized decision using like:pass ratio 3:2");
        assert_eq!(liked.policy_name, "probabilistic_ratio_v1");

        let passed = policy.decide(&cancel, &ctx).unwrap();
        assert_eq!(passed.action.kind, ActionKind::Pass);
        assert_eq!(passed.score, 40);
    }

    #[test]
    fn zero_weight_fails_construction() {
        let err = ProbabilisticRatioPolicy::new(config(0, 2)).unwrap_err();
        assert!(matches!(err, DecisionError::InvalidWeights { like: 0, pass: 2, .. }));
    }

    #[test]
    fn cancellation_is_checked_before_drawing() {
        let policy =
            ProbabilisticRatioPolicy::with_random(config(1, 1), Box::new(ForbiddenRandom)).unwrap();
        let cancel = CancelSignal::new();
        cancel.cancel();
        let err = policy
            .decide(&cancel, &DecisionContext::new(AppName::Bumble))
            .unwrap_err();
        assert!(matches!(err, DecisionError::Cancelled(_)));
    }

    /// Counts draws handed out by a seeded generator.
    struct CountingRandom {
        inner: Box<dyn RandomSource>,
        draws: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    impl RandomSource for CountingRandom {
        fn below(&mut self, upper: u32) -> u32 {
            self.draws
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.below(upper)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_draws_consume_the_seeded_sequence_exactly_once() {
        const TASKS: usize = 8;
        const DECIDES_PER_TASK: usize = 125;
        let draws = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let policy = std::sync::Arc::new(
            ProbabilisticRatioPolicy::with_random(
                config(3, 2),
                Box::new(CountingRandom {
                    inner: seeded_source(Some(42)),
                    draws: draws.clone(),
                }),
            )
            .unwrap(),
        );

        let handles: Vec<_> = (0..TASKS)
            .map(|_| {
                let policy = policy.clone();
                tokio::spawn(async move {
                    let ctx = DecisionContext::new(AppName::Bumble);
                    let cancel = CancelSignal::new();
                    (0..DECIDES_PER_TASK)
                        .filter(|_| {
                            policy.decide(&cancel, &ctx).unwrap().action.kind == ActionKind::Like
                        })
                        .count()
                })
            })
            .collect();
        let mut concurrent_likes = 0;
        for handle in handles {
            concurrent_likes += handle.await.unwrap();
        }

        let total = TASKS * DECIDES_PER_TASK;
        assert_eq!(draws.load(std::sync::atomic::Ordering::SeqCst), total);

        // Draws are serialized by the lock, so together they consume the
        // seeded sequence in order, exactly as one caller would.
        let replay = LockedRandom::new(seeded_source(Some(42)));
        let weights = LikePassWeights::new("replay", 3, 2).unwrap();
        let sequential_likes = (0..total).filter(|_| replay.draw_like(weights)).count();
        assert_eq!(concurrent_likes, sequential_likes);
    }

    #[test]
    fn seeded_policies_repeat_their_choices() {
        let seeded = || {
            ProbabilisticRatioPolicy::new(ProbabilisticRatioConfig {
                seed: Some(11),
                ..config(1, 1)
            })
            .unwrap()
        };
        let (a, b) = (seeded(), seeded());
        let ctx = DecisionContext::new(AppName::Bumble);
        let cancel = CancelSignal::new();
        for _ in 0..20 {
            assert_eq!(
                a.decide(&cancel, &ctx).unwrap().action,
                b.decide(&cancel, &ctx).unwrap().action
            );
        }
    }
}
