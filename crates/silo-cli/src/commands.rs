use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::{Local, TimeZone};

use silo_core::{AddOutcome, Category, NoteStore, PersonId, PersonRecord};

const NO_DATA: &str = ":(";
const OK: &str = ":)";

pub fn cmd_list(store: &impl NoteStore, out: &mut impl Write) -> Result<()> {
    let people = store.people();
    if people.is_empty() {
        writeln!(out, "  {NO_DATA}")?;
        return Ok(());
    }
    for person in &people {
        writeln!(out, "  - {person}")?;
    }
    Ok(())
}

pub fn cmd_show(store: &impl NoteStore, person: &PersonId, out: &mut impl Write) -> Result<()> {
    print_person(store.person(person), &Local, out)
}

/// Add a note, then show the person's updated view. Blank text prints the
/// no-data marker and leaves everything untouched.
pub fn cmd_add(
    store: &mut impl NoteStore,
    person: &PersonId,
    category: Category,
    text: &str,
    out: &mut impl Write,
) -> Result<()> {
    match store.add(person, category, text)? {
        AddOutcome::IgnoredBlank => writeln!(out, "{NO_DATA}")?,
        AddOutcome::Saved => {
            writeln!(out, "{OK}")?;
            cmd_show(&*store, person, out)?;
        }
    }
    Ok(())
}

pub fn print_usage(out: &mut impl Write) -> Result<()> {
    write!(
        out,
        "\
Usage:
  silo
  silo <person>
  silo <person> <command> <entry>
Commands:
  eternal, e   Edit eternal info
  transient, t Add transient entry
"
    )?;
    Ok(())
}

/// Latest eternal note on one line, then every transient note newest first.
fn print_person<Tz>(record: Option<&PersonRecord>, tz: &Tz, out: &mut impl Write) -> Result<()>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match record.and_then(PersonRecord::latest_eternal) {
        Some(entry) => writeln!(out, "Eternal: {}", entry.text())?,
        None => writeln!(out, "Eternal: {NO_DATA}")?,
    }

    writeln!(out, "Transient: ")?;
    let transient = record.map(|r| r.transient.as_slice()).unwrap_or_default();
    if transient.is_empty() {
        writeln!(out, " {NO_DATA}")?;
    }
    for entry in transient {
        let day = entry.timestamp().with_timezone(tz).format("%Y-%m-%d");
        writeln!(out, "  {day}: {}", entry.text())?;
    }
    Ok(())
}
