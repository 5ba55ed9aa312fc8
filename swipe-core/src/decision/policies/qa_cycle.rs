use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::cancel::CancelSignal;
use crate::decision::context::{Decision, DecisionContext};
use crate::decision::error::DecisionResult;
use crate::decision::policy::{Policy, PolicyKind};
use crate::domain::Action;

use super::{default_score_like, default_score_pass, validate_score};

/// Profiles with fewer answered questions than this are always passed.
pub const MIN_QUESTIONS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaCycleConfig {
    #[serde(default = "default_likes_before_pass")]
    pub likes_before_pass: u32,
    #[serde(default = "default_score_like")]
    pub score_like: u8,
    #[serde(default = "default_score_pass")]
    pub score_pass: u8,
}

fn default_likes_before_pass() -> u32 {
    3
}

impl Default for QaCycleConfig {
    fn default() -> Self {
        Self {
            likes_before_pass: default_likes_before_pass(),
            score_like: default_score_like(),
            score_pass: default_score_pass(),
        }
    }
}

/// Likes `likes_before_pass` question-rich profiles in a row, then passes one.
///
/// A profile below [`MIN_QUESTIONS`] is passed and restarts the cycle.
#[derive(Debug)]
pub struct QaCyclePolicy {
    config: QaCycleConfig,
    like_count: Mutex<u32>,
}

impl QaCyclePolicy {
    pub fn new(config: QaCycleConfig) -> DecisionResult<Self> {
        validate_score("qa_cycle score_like", config.score_like)?;
        validate_score("qa_cycle score_pass", config.score_pass)?;
        Ok(Self {
            config,
            like_count: Mutex::new(0),
        })
    }

    pub fn likes_issued(&self) -> u32 {
        *self.like_count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn decision(&self, ctx: &DecisionContext, action: Action, score: u8, reason: String) -> Decision {
        Decision {
            app: ctx.app,
            action,
            score,
            reason,
            policy_name: self.name().to_string(),
        }
    }
}

impl Policy for QaCyclePolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::QaCycle
    }

    fn decide(&self, cancel: &CancelSignal, ctx: &DecisionContext) -> DecisionResult<Decision> {
        cancel.check()?;
        let questions = ctx
            .behaviour_traits
            .as_ref()
            .map(|traits| traits.qa_count())
            .unwrap_or(0);
        let threshold = self.config.likes_before_pass;

        if questions < MIN_QUESTIONS {
            *self.like_count.lock().unwrap_or_else(PoisonError::into_inner) = 0;
            return Ok(self.decision(
                ctx,
                Action::pass(),
                self.config.score_pass,
                format!(
                    "Less than {MIN_QUESTIONS} Q&A questions detected ({questions}); passing and restarting cycle."
                ),
            ));
        }

        let liked = {
            let mut count = self.like_count.lock().unwrap_or_else(PoisonError::into_inner);
            if *count < threshold {
                *count += 1;
                true
            } else {
                *count = 0;
                false
            }
        };

        if liked {
            Ok(self.decision(
                ctx,
                Action::like(),
                self.config.score_like,
                format!(
                    "Q&A has {questions} questions; following cycle of {threshold} like(s) then pass."
                ),
            ))
        } else {
            Ok(self.decision(
                ctx,
                Action::pass(),
                self.config.score_pass,
                format!(
                    "Q&A has {questions} questions; cycle reached pass step after {threshold} like(s)."
                ),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::decision::DecisionError;
    use crate::domain::{ActionKind, AppName, BehaviourTraits, QaSectionsBlock};

    fn ctx_with_questions(count: usize) -> DecisionContext {
        let qa: BTreeMap<String, Vec<String>> = (0..count)
            .map(|i| (format!("question {i}"), vec![format!("answer {i}")]))
            .collect();
        DecisionContext::new(AppName::Bumble).with_behaviour(BehaviourTraits {
            qa_sections: Some(QaSectionsBlock { confidence: 90, qa }),
            ..BehaviourTraits::default()
        })
    }

    fn policy(likes_before_pass: u32) -> QaCyclePolicy {
        QaCyclePolicy::new(QaCycleConfig {
            likes_before_pass,
            ..QaCycleConfig::default()
        })
        .unwrap()
    }

    fn kinds(policy: &QaCyclePolicy, ctx: &DecisionContext, n: usize) -> Vec<ActionKind> {
        let cancel = CancelSignal::new();
        (0..n)
            .map(|_| policy.decide(&cancel, ctx).unwrap().action.kind)
            .collect()
    }

    #[test]
    fn cycles_like_like_pass() {
        use ActionKind::{Like, Pass};
        let policy = policy(2);
        let ctx = ctx_with_questions(3);
        assert_eq!(kinds(&policy, &ctx, 6), vec![Like, Like, Pass, Like, Like, Pass]);
    }

    #[test]
    fn sparse_profile_passes_and_restarts_cycle() {
        use ActionKind::{Like, Pass};
        let policy = policy(2);
        let rich = ctx_with_questions(2);
        let sparse = ctx_with_questions(1);
        let cancel = CancelSignal::new();

        assert_eq!(policy.decide(&cancel, &rich).unwrap().action.kind, Like);
        let passed = policy.decide(&cancel, &sparse).unwrap();
        assert_eq!(passed.action.kind, Pass);
        assert_eq!(passed.score, 40);
        assert!(passed.reason.contains("restarting cycle"));
        assert_eq!(policy.likes_issued(), 0);
        assert_eq!(kinds(&policy, &rich, 3), vec![Like, Like, Pass]);
    }

    #[test]
    fn missing_traits_count_as_zero_questions() {
        let policy = policy(3);
        let decision = policy
            .decide(&CancelSignal::new(), &DecisionContext::new(AppName::Bumble))
            .unwrap();
        assert_eq!(decision.action.kind, ActionKind::Pass);
        assert_eq!(decision.policy_name, "qa_cycle_v1");
    }

    #[test]
    fn cancelled_signal_leaves_state_untouched() {
        let policy = policy(3);
        let ctx = ctx_with_questions(4);
        policy.decide(&CancelSignal::new(), &ctx).unwrap();
        let cancel = CancelSignal::new();
        cancel.cancel();
        let err = policy.decide(&cancel, &ctx).unwrap_err();
        assert!(matches!(err, DecisionError::Cancelled(_)));
        assert_eq!(policy.likes_issued(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shared_policy_keeps_the_cycle_under_concurrent_callers() {
        const TASKS: usize = 8;
        const DECIDES_PER_TASK: usize = 50;
        let likes_before_pass = 3u32;
        let policy = std::sync::Arc::new(policy(likes_before_pass));
        let ctx = std::sync::Arc::new(ctx_with_questions(2));

        let handles: Vec<_> = (0..TASKS)
            .map(|_| {
                let policy = policy.clone();
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    let cancel = CancelSignal::new();
                    (0..DECIDES_PER_TASK)
                        .map(|_| policy.decide(&cancel, &ctx).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut decisions = Vec::new();
        for handle in handles {
            decisions.extend(handle.await.unwrap());
        }

        let total = TASKS * DECIDES_PER_TASK;
        let cycle = likes_before_pass as usize + 1;
        let passes: Vec<_> = decisions
            .iter()
            .filter(|d| d.action.kind == ActionKind::Pass)
            .collect();
        let likes: Vec<_> = decisions
            .iter()
            .filter(|d| d.action.kind == ActionKind::Like)
            .collect();
        assert_eq!(decisions.len(), total);
        assert_eq!(passes.len(), total / cycle);
        assert_eq!(likes.len(), total - total / cycle);
        assert!(likes
            .iter()
            .all(|d| d.reason.contains("following cycle of 3 like(s) then pass")));
        assert!(passes
            .iter()
            .all(|d| d.reason.contains("cycle reached pass step")));
        assert_eq!(policy.likes_issued() as usize, total % cycle);
    }

    #[test]
    fn out_of_range_score_is_rejected() {
        let err = QaCyclePolicy::new(QaCycleConfig {
            score_like: 101,
            ..QaCycleConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, DecisionError::InvalidScore { value: 101, .. }));
    }
}
