use std::fmt;

use serde::{Deserialize, Serialize};

use crate::browser::{BrowserError, BrowserResult};

/// Ordered, non-empty list of selectors addressing one logical control.
///
/// The primary selector comes first and fallbacks follow; lookups stop at the
/// first visible match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct SelectorList(Vec<String>);

impl SelectorList {
    pub fn new(selectors: Vec<String>) -> BrowserResult<Self> {
        let selectors: Vec<String> = selectors
            .into_iter()
            .map(|selector| selector.trim().to_string())
            .filter(|selector| !selector.is_empty())
            .collect();
        if selectors.is_empty() {
            return Err(BrowserError::Configuration(
                "selector list must contain at least one selector".into(),
            ));
        }
        Ok(Self(selectors))
    }

    pub fn single(selector: impl Into<String>) -> BrowserResult<Self> {
        Self::new(vec![selector.into()])
    }

    pub fn from_static(selectors: &[&str]) -> BrowserResult<Self> {
        Self::new(selectors.iter().map(|s| s.to_string()).collect())
    }

    /// Built-in selector tables; callers pass non-empty literals.
    pub(super) fn builtin(selectors: &[&str]) -> Self {
        debug_assert!(!selectors.is_empty());
        Self(selectors.iter().map(|s| s.to_string()).collect())
    }

    pub fn primary(&self) -> &str {
        &self.0[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}

impl TryFrom<Vec<String>> for SelectorList {
    type Error = BrowserError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        SelectorList::new(value)
    }
}

impl From<SelectorList> for Vec<String> {
    fn from(value: SelectorList) -> Self {
        value.0
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" | "))
    }
}
