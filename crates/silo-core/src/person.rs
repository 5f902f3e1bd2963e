use std::fmt;

use crate::entry::{Category, Entry};
use crate::error::SiloError;

// ---------------------------------------------------------------------------
// PersonId
// ---------------------------------------------------------------------------

/// A person's identifier: one or more ASCII letters. Doubles as the record's
/// file stem, so the charset keeps it path-safe.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PersonId(String);

impl PersonId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(s: &str) -> bool {
        !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PersonId {
    type Err = SiloError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(SiloError::Validation(format!(
                "invalid person name {s:?}: only letters a-z and A-Z are allowed"
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// PersonRecord
// ---------------------------------------------------------------------------

/// Both note histories for one person, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonRecord {
    pub eternal: Vec<Entry>,
    pub transient: Vec<Entry>,
}

impl PersonRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the front; newest-first is the stored order.
    pub fn prepend(&mut self, category: Category, entry: Entry) {
        let list = match category {
            Category::Eternal => &mut self.eternal,
            Category::Transient => &mut self.transient,
        };
        list.insert(0, entry);
    }

    /// The current eternal note.
    pub fn latest_eternal(&self) -> Option<&Entry> {
        self.eternal.first()
    }

    pub fn is_empty(&self) -> bool {
        self.eternal.is_empty() && self.transient.is_empty()
    }

    pub fn len(&self) -> usize {
        self.eternal.len() + self.transient.len()
    }
}
