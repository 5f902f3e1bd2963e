use crate::entry::Category;
use crate::error::SiloResult;
use crate::person::{PersonId, PersonRecord};

/// Whether an add changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Prepended and flushed to durable storage.
    Saved,
    /// Blank text; nothing stored, nothing written.
    IgnoredBlank,
}

pub trait NoteStore {
    // Mutation. Every successful add is durable before returning.
    fn add(&mut self, person: &PersonId, category: Category, text: &str)
        -> SiloResult<AddOutcome>;

    fn add_eternal(&mut self, person: &PersonId, text: &str) -> SiloResult<AddOutcome> {
        self.add(person, Category::Eternal, text)
    }

    fn add_transient(&mut self, person: &PersonId, text: &str) -> SiloResult<AddOutcome> {
        self.add(person, Category::Transient, text)
    }

    // Query
    /// Unknown people are `None`, never an error.
    fn person(&self, person: &PersonId) -> Option<&PersonRecord>;
    /// Every known person exactly once, ascending.
    fn people(&self) -> Vec<PersonId>;

    /// Entry counts across everyone, for diagnostics.
    fn count(&self) -> usize {
        self.people()
            .iter()
            .filter_map(|p| self.person(p))
            .map(PersonRecord::len)
            .sum()
    }
}

