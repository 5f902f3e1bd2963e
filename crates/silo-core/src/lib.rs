pub mod codec;
pub mod entry;
pub mod error;
pub mod person;
pub mod store;

pub use codec::RecordFormat;
pub use entry::{Category, Entry};
pub use error::{SiloError, SiloResult};
pub use person::{PersonId, PersonRecord};
pub use store::{AddOutcome, NoteStore};
