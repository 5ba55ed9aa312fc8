use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppName {
    Bumble,
}

impl AppName {
    pub const ALL: [AppName; 1] = [AppName::Bumble];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppName::Bumble => "BUMBLE",
        }
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUMBLE" => Ok(AppName::Bumble),
            other => Err(format!("unknown app: {other}")),
        }
    }
}

/// The closed set of actions a policy may choose for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Pass,
    Like,
    #[serde(alias = "SUPERSWIPE")]
    SuperLike,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Pass => "PASS",
            ActionKind::Like => "LIKE",
            ActionKind::SuperLike => "SUPER_LIKE",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASS" => Ok(ActionKind::Pass),
            "LIKE" => Ok(ActionKind::Like),
            "SUPER_LIKE" | "SUPERSWIPE" => Ok(ActionKind::SuperLike),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    pub fn pass() -> Self {
        Self::new(ActionKind::Pass)
    }

    pub fn like() -> Self {
        Self::new(ActionKind::Like)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
