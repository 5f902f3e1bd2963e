use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One note. Text is trimmed and never blank; the timestamp is kept at
/// whole-second resolution so it survives the epoch-seconds encoding.
///
/// Decoding goes through [`crate::codec`], which re-validates via
/// [`Entry::new`], so there is no `Deserialize` impl here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    text: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    timestamp: DateTime<Utc>,
}

impl Entry {
    /// Returns `None` when `text` is blank or whitespace-only.
    pub fn new(text: &str, timestamp: DateTime<Utc>) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            timestamp: truncate_to_seconds(timestamp),
        })
    }

    pub fn now(text: &str) -> Option<Self> {
        Self::new(text, Utc::now())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

pub fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.timestamp(), 0).unwrap_or(ts)
}

/// Which sequence of a person's record an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Eternal,
    Transient,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eternal => write!(f, "eternal"),
            Self::Transient => write!(f, "transient"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eternal" | "e" => Ok(Self::Eternal),
            "transient" | "t" => Ok(Self::Transient),
            _ => Err(format!("invalid command: {s}")),
        }
    }
}
