use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cancel::CancelSignal;
use crate::decision::context::{Decision, DecisionContext};
use crate::decision::error::DecisionResult;
use crate::decision::policy::{Policy, PolicyKind};
use crate::decision::random::{seeded_source, LikePassWeights, LockedRandom, RandomSource};
use crate::domain::{Action, PhotoPersonaBundle};

use super::{default_score_like, default_score_pass, validate_score};

pub const APPARENT_GENDER_TRAIT: &str = "apparent_gender";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApparentGenderConfig {
    #[serde(default = "default_female_like_weight")]
    pub female_like_weight: u32,
    #[serde(default = "default_female_pass_weight")]
    pub female_pass_weight: u32,
    #[serde(default = "default_unknown_like_weight")]
    pub unknown_like_weight: u32,
    #[serde(default = "default_unknown_pass_weight")]
    pub unknown_pass_weight: u32,
    #[serde(default = "default_score_like")]
    pub score_like: u8,
    #[serde(default = "default_score_pass")]
    pub score_pass: u8,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_female_like_weight() -> u32 {
    9
}

fn default_female_pass_weight() -> u32 {
    2
}

fn default_unknown_like_weight() -> u32 {
    4
}

fn default_unknown_pass_weight() -> u32 {
    6
}

impl Default for ApparentGenderConfig {
    fn default() -> Self {
        Self {
            female_like_weight: default_female_like_weight(),
            female_pass_weight: default_female_pass_weight(),
            unknown_like_weight: default_unknown_like_weight(),
            unknown_pass_weight: default_unknown_pass_weight(),
            score_like: default_score_like(),
            score_pass: default_score_pass(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApparentGender {
    Female,
    Male,
    Unknown,
}

impl ApparentGender {
    /// First recognised `apparent_gender` signal, scanning images in key order.
    pub fn from_bundle(bundle: Option<&PhotoPersonaBundle>) -> Self {
        let Some(bundle) = bundle else {
            return ApparentGender::Unknown;
        };
        bundle
            .images
            .values()
            .filter_map(|profile| profile.traits.get(APPARENT_GENDER_TRAIT))
            .flat_map(|signals| signals.iter())
            .find_map(|signal| match signal.trim().to_ascii_lowercase().as_str() {
                "female" => Some(ApparentGender::Female),
                "male" => Some(ApparentGender::Male),
                _ => None,
            })
            .unwrap_or(ApparentGender::Unknown)
    }
}

impl fmt::Display for ApparentGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApparentGender::Female => "female",
            ApparentGender::Male => "male",
            ApparentGender::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Always passes apparent men; otherwise draws with a female or a fallback ratio.
#[derive(Debug)]
pub struct ApparentGenderPolicy {
    female: LikePassWeights,
    unknown: LikePassWeights,
    score_like: u8,
    score_pass: u8,
    female_random: LockedRandom,
    unknown_random: LockedRandom,
}

impl ApparentGenderPolicy {
    pub fn new(config: ApparentGenderConfig) -> DecisionResult<Self> {
        let female = seeded_source(config.seed);
        let unknown = seeded_source(config.seed.map(|seed| seed.wrapping_add(1)));
        Self::with_random(config, female, unknown)
    }

    pub fn with_random(
        config: ApparentGenderConfig,
        female_source: Box<dyn RandomSource>,
        unknown_source: Box<dyn RandomSource>,
    ) -> DecisionResult<Self> {
        Ok(Self {
            female: LikePassWeights::new(
                "apparent_gender female",
                config.female_like_weight,
                config.female_pass_weight,
            )?,
            unknown: LikePassWeights::new(
                "apparent_gender unknown",
                config.unknown_like_weight,
                config.unknown_pass_weight,
            )?,
            score_like: validate_score("apparent_gender score_like", config.score_like)?,
            score_pass: validate_score("apparent_gender score_pass", config.score_pass)?,
            female_random: LockedRandom::new(female_source),
            unknown_random: LockedRandom::new(unknown_source),
        })
    }

    fn weighted(
        &self,
        ctx: &DecisionContext,
        random: &LockedRandom,
        weights: LikePassWeights,
        reason: String,
    ) -> Decision {
        let (action, score) = if random.draw_like(weights) {
            (Action::like(), self.score_like)
        } else {
            (Action::pass(), self.score_pass)
        };
        Decision {
            app: ctx.app,
            action,
            score,
            reason,
            policy_name: self.name().to_string(),
        }
    }
}

impl Policy for ApparentGenderPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::ApparentGender
    }

    fn decide(&self, cancel: &CancelSignal, ctx: &DecisionContext) -> DecisionResult<Decision> {
        cancel.check()?;
        match ApparentGender::from_bundle(ctx.photo_persona.as_ref()) {
            ApparentGender::Male => Ok(Decision {
                app: ctx.app,
                action: Action::pass(),
                score: self.score_pass,
                reason: "apparent_gender indicates male; always passing.".to_string(),
                policy_name: self.name().to_string(),
            }),
            ApparentGender::Female => Ok(self.weighted(
                ctx,
                &self.female_random,
                self.female,
                format!(
                    "apparent_gender indicates female; randomizing with like:pass ratio {}:{}.",
                    self.female.like(),
                    self.female.pass()
                ),
            )),
            ApparentGender::Unknown => Ok(self.weighted(
                ctx,
                &self.unknown_random,
                self.unknown,
                format!(
                    "apparent_gender missing or unknown; fallback like:pass ratio {}:{}.",
                    self.unknown.like(),
                    self.unknown.pass()
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::decision::random::testing::{ForbiddenRandom, ScriptedRandom};
    use crate::decision::DecisionError;
    use crate::domain::{ActionKind, AppName, PhotoPersonaProfile};

    fn bundle(images: &[(&str, &[&str])]) -> PhotoPersonaBundle {
        let images = images
            .iter()
            .map(|(key, signals)| {
                let mut traits = BTreeMap::new();
                if !signals.is_empty() {
                    traits.insert(
                        APPARENT_GENDER_TRAIT.to_string(),
                        signals.iter().map(|s| s.to_string()).collect(),
                    );
                }
                (
                    key.to_string(),
                    PhotoPersonaProfile {
                        traits,
                        ..PhotoPersonaProfile::default()
                    },
                )
            })
            .collect();
        PhotoPersonaBundle { images }
    }

    fn ctx(bundle: PhotoPersonaBundle) -> DecisionContext {
        DecisionContext::new(AppName::Bumble).with_photo_persona(bundle)
    }

    #[test]
    fn gender_comes_from_first_image_in_key_order() {
        let mixed = bundle(&[("image_2", &["female"]), ("image_1", &["unsure", " MALE "])]);
        assert_eq!(ApparentGender::from_bundle(Some(&mixed)), ApparentGender::Male);
        let none = bundle(&[("image_1", &[]), ("image_2", &["unknown"])]);
        assert_eq!(ApparentGender::from_bundle(Some(&none)), ApparentGender::Unknown);
        assert_eq!(ApparentGender::from_bundle(None), ApparentGender::Unknown);
    }

    #[test]
    fn male_always_passes_without_drawing() {
        let policy = ApparentGenderPolicy::with_random(
            ApparentGenderConfig::default(),
            Box::new(ForbiddenRandom),
            Box::new(ForbiddenRandom),
        )
        .unwrap();
        let ctx = ctx(bundle(&[("image_1", &["male"])]));
        let cancel = CancelSignal::new();
        for _ in 0..50 {
            let decision = policy.decide(&cancel, &ctx).unwrap();
            assert_eq!(decision.action.kind, ActionKind::Pass);
            assert_eq!(decision.score, 40);
        }
    }

    #[test]
    fn female_with_even_weights_splits_evenly() {
        let config = ApparentGenderConfig {
            female_like_weight: 1,
            female_pass_weight: 1,
            ..ApparentGenderConfig::default()
        };
        let policy = ApparentGenderPolicy::with_random(
            config,
            Box::new(ScriptedRandom::new(&[0, 1])),
            Box::new(ForbiddenRandom),
        )
        .unwrap();
        let ctx = ctx(bundle(&[("image_1", &["Female"])]));
        let cancel = CancelSignal::new();
        let likes = (0..100)
            .filter(|_| policy.decide(&cancel, &ctx).unwrap().action.kind == ActionKind::Like)
            .count();
        assert_eq!(likes, 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_the_female_source_without_losing_draws() {
        const TASKS: usize = 6;
        const DECIDES_PER_TASK: usize = 40;
        let config = ApparentGenderConfig {
            female_like_weight: 1,
            female_pass_weight: 1,
            ..ApparentGenderConfig::default()
        };
        let policy = std::sync::Arc::new(
            ApparentGenderPolicy::with_random(
                config,
                Box::new(ScriptedRandom::new(&[0, 1])),
                Box::new(ForbiddenRandom),
            )
            .unwrap(),
        );

        let handles: Vec<_> = (0..TASKS)
            .map(|task| {
                let policy = policy.clone();
                let gender = if task % 2 == 0 { "female" } else { "male" };
                tokio::spawn(async move {
                    let ctx = ctx(bundle(&[("image_1", &[gender])]));
                    let cancel = CancelSignal::new();
                    (0..DECIDES_PER_TASK)
                        .map(|_| policy.decide(&cancel, &ctx).unwrap().action.kind)
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut female_likes = 0;
        for (task, handle) in handles.into_iter().enumerate() {
            let kinds = handle.await.unwrap();
            assert_eq!(kinds.len(), DECIDES_PER_TASK);
            if task % 2 == 0 {
                female_likes += kinds.iter().filter(|k| **k == ActionKind::Like).count();
            } else {
                assert!(kinds.iter().all(|k| *k == ActionKind::Pass));
            }
        }
        // Alternating rolls split the serialized female draws exactly in half.
        assert_eq!(female_likes, (TASKS / 2) * DECIDES_PER_TASK / 2);
    }

    #[test]
    fn missing_signal_uses_fallback_weights() {
        // With 4:6, a roll of 3 likes and a roll of 4 passes.
        let policy = ApparentGenderPolicy::with_random(
            ApparentGenderConfig::default(),
            Box::new(ForbiddenRandom),
            Box::new(ScriptedRandom::new(&[3, 4])),
        )
        .unwrap();
        let ctx = DecisionContext::new(AppName::Bumble);
        let cancel = CancelSignal::new();
        let first = policy.decide(&cancel, &ctx).unwrap();
        assert_eq!(first.action.kind, ActionKind::Like);
        assert!(first.reason.contains("4:6"));
        assert_eq!(policy.decide(&cancel, &ctx).unwrap().action.kind, ActionKind::Pass);
    }

    #[test]
    fn every_weight_is_validated() {
        let cases = [
            ApparentGenderConfig {
                female_like_weight: 0,
                ..ApparentGenderConfig::default()
            },
            ApparentGenderConfig {
                female_pass_weight: 0,
                ..ApparentGenderConfig::default()
            },
            ApparentGenderConfig {
                unknown_like_weight: 0,
                ..ApparentGenderConfig::default()
            },
            ApparentGenderConfig {
                unknown_pass_weight: 0,
                ..ApparentGenderConfig::default()
            },
        ];
        for config in cases {
            let err = ApparentGenderPolicy::new(config).unwrap_err();
            assert!(matches!(err, DecisionError::InvalidWeights { .. }));
        }
    }
}
