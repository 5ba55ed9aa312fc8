use serde::{Deserialize, Serialize};

use crate::domain::{Action, AppName, BehaviourTraits, PhotoPersonaBundle};

/// Everything a policy may look at for one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionContext {
    pub app: AppName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behaviour_traits: Option<BehaviourTraits>,
    #[serde(
        default,
        rename = "photo_persona_bundle",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo_persona: Option<PhotoPersonaBundle>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub profile_key: String,
}

impl DecisionContext {
    pub fn new(app: AppName) -> Self {
        Self {
            app,
            behaviour_traits: None,
            photo_persona: None,
            profile_key: String::new(),
        }
    }

    pub fn with_behaviour(mut self, traits: BehaviourTraits) -> Self {
        self.behaviour_traits = Some(traits);
        self
    }

    pub fn with_photo_persona(mut self, bundle: PhotoPersonaBundle) -> Self {
        self.photo_persona = Some(bundle);
        self
    }

    pub fn with_profile_key(mut self, key: impl Into<String>) -> Self {
        self.profile_key = key.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub app: AppName,
    pub action: Action,
    /// 0..=100; only meaningful to analytics.
    pub score: u8,
    pub reason: String,
    pub policy_name: String,
}
