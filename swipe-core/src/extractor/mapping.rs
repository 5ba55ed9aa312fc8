use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{
    BehaviourTraits, PhotoPersonaBundle, PhotoPersonaProfile, ProfileTagsBlock, QaSectionsBlock,
    RawTextBlock,
};

use super::ExtractedTraits;

const FREE_TEXT: &str = "ui_free_text";
const SECTIONS: &str = "ui_sections";
const TAGS: &str = "ui_tags";
const UNKNOWN: &str = "unknown";

fn trim_keep_order(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn trimmed_entries(by_key: &BTreeMap<String, Vec<String>>) -> impl Iterator<Item = (&str, Vec<String>)> {
    by_key.iter().filter_map(|(key, values)| {
        let key = key.trim();
        (!key.is_empty()).then(|| (key, trim_keep_order(values)))
    })
}

/// Lower-cased, trimmed, de-duplicated and sorted signals.
fn normalize_signals(signals: &[String]) -> BTreeSet<String> {
    signals
        .iter()
        .map(|signal| signal.trim().to_lowercase())
        .filter(|signal| !signal.is_empty())
        .collect()
}

/// Converts the text-oriented extractor output into [`BehaviourTraits`].
pub fn map_to_behaviour_traits(extracted: &ExtractedTraits) -> BehaviourTraits {
    let mut out = BehaviourTraits {
        global_confidence: extracted.global_confidence,
        ..BehaviourTraits::default()
    };

    if let Some(category) = extracted.traits.get(FREE_TEXT) {
        let lines = match category.signals_by_key.get("lines") {
            Some(lines) if !lines.is_empty() => trim_keep_order(lines),
            _ => trim_keep_order(&category.signals),
        };
        out.raw_text = Some(RawTextBlock {
            confidence: category.confidence,
            lines,
        });
    }

    if let Some(category) = extracted.traits.get(SECTIONS) {
        out.qa_sections = Some(QaSectionsBlock {
            confidence: category.confidence,
            qa: trimmed_entries(&category.signals_by_key)
                .map(|(key, values)| (key.to_string(), values))
                .collect(),
        });
    }

    if let Some(category) = extracted.traits.get(TAGS) {
        let mut block = ProfileTagsBlock {
            confidence: category.confidence,
            ..ProfileTagsBlock::default()
        };
        for (key, values) in trimmed_entries(&category.signals_by_key) {
            if key == "raw" {
                block.raw = values;
            } else {
                block.tags.insert(key.to_string(), values);
            }
        }
        out.profile_tags = Some(block);
    }

    out
}

fn is_informative(photo: &ExtractedTraits) -> bool {
    photo.traits.values().any(|category| {
        normalize_signals(&category.signals)
            .iter()
            .any(|signal| signal != UNKNOWN)
    })
}

fn map_single_photo(photo: &ExtractedTraits) -> PhotoPersonaProfile {
    let mut tags = BTreeSet::new();
    let mut statements = BTreeSet::new();
    let mut traits = BTreeMap::new();

    for (key, category) in &photo.traits {
        let mut signals = normalize_signals(&category.signals);
        signals.remove(UNKNOWN);
        if signals.is_empty() {
            continue;
        }
        tags.extend(signals.iter().cloned());
        let summary = category.summary.trim();
        if !summary.is_empty() {
            statements.insert(summary.to_string());
        }
        traits.insert(key.clone(), signals.into_iter().collect());
    }

    PhotoPersonaProfile {
        tags: tags.into_iter().collect(),
        traits,
        statements: statements.into_iter().collect(),
    }
}

/// Builds a persona bundle from per-photo extractions.
///
/// Photos carrying no signal other than `unknown` are dropped; kept photos are
/// keyed `image_1`, `image_2`, ... in input order.
pub fn map_photos_to_persona_bundle(photos: &[ExtractedTraits]) -> PhotoPersonaBundle {
    let images = photos
        .iter()
        .filter(|photo| is_informative(photo))
        .enumerate()
        .map(|(index, photo)| (format!("image_{}", index + 1), map_single_photo(photo)))
        .collect();
    PhotoPersonaBundle { images }
}
