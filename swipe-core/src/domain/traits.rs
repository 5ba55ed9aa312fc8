use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Structured signals read from the on-screen text of a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviourTraits {
    #[serde(default)]
    pub global_confidence: i32,
    #[serde(default)]
    pub raw_text: Option<RawTextBlock>,
    #[serde(default)]
    pub qa_sections: Option<QaSectionsBlock>,
    #[serde(default)]
    pub profile_tags: Option<ProfileTagsBlock>,
}

impl BehaviourTraits {
    /// Number of question entries, zero when the block is absent.
    pub fn qa_count(&self) -> usize {
        self.qa_sections
            .as_ref()
            .map(|block| block.qa.len())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTextBlock {
    #[serde(default)]
    pub confidence: i32,
    #[serde(default)]
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QaSectionsBlock {
    #[serde(default)]
    pub confidence: i32,
    /// question -> answers
    #[serde(default)]
    pub qa: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileTagsBlock {
    #[serde(default)]
    pub confidence: i32,
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw: Vec<String>,
}

/// Per-image persona signals, keyed `image_1`, `image_2`, ...
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoPersonaBundle {
    #[serde(default)]
    pub images: BTreeMap<String, PhotoPersonaProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoPersonaProfile {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub traits: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statements: Vec<String>,
}
