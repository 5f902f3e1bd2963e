//! Record codecs.
//!
//! Current format (`<person>.json`):
//!
//! ```json
//! { "eternal":   [ { "text": "...", "timestamp": 1700000000 } ],
//!   "transient": [ { "text": "...", "timestamp": 1700000000 } ] }
//! ```
//!
//! Legacy format (`<person>.txt`): eternal lines, a blank line, then
//! transient lines. No timestamps. Read-only; the store rewrites these as
//! JSON on the next save.
//!
//! Both lists are newest first and order is preserved as-is on both paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entry::{truncate_to_seconds, Category, Entry};
use crate::error::{SiloError, SiloResult};
use crate::person::PersonRecord;

pub const RECORD_EXTENSION: &str = "json";
pub const LEGACY_EXTENSION: &str = "txt";

/// On-disk record format, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Json,
    LegacyText,
}

impl RecordFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            RECORD_EXTENSION => Some(Self::Json),
            LEGACY_EXTENSION => Some(Self::LegacyText),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => RECORD_EXTENSION,
            Self::LegacyText => LEGACY_EXTENSION,
        }
    }
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RecordDoc<'a> {
    eternal: &'a [Entry],
    transient: &'a [Entry],
}

/// Encode a record in the current (JSON) format.
pub fn encode(record: &PersonRecord) -> SiloResult<Vec<u8>> {
    let doc = RecordDoc {
        eternal: &record.eternal,
        transient: &record.transient,
    };
    let mut bytes = serde_json::to_vec_pretty(&doc)?;
    bytes.push(b'\n');
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode bytes written in `format`. `written_at` stamps legacy entries,
/// which carry no time of their own; it is ignored for JSON.
pub fn decode_as(
    format: RecordFormat,
    bytes: &[u8],
    written_at: DateTime<Utc>,
) -> SiloResult<PersonRecord> {
    match format {
        RecordFormat::Json => decode(bytes),
        RecordFormat::LegacyText => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| SiloError::Decode(format!("legacy record is not UTF-8: {e}")))?;
            Ok(decode_legacy(text, written_at))
        }
    }
}

/// Decode a JSON record.
///
/// The document itself must be a JSON object. A missing or non-list
/// category decodes as empty, and individual malformed entries are dropped.
pub fn decode(bytes: &[u8]) -> SiloResult<PersonRecord> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| SiloError::Decode(e.to_string()))?;
    let Value::Object(doc) = value else {
        return Err(SiloError::Decode(format!(
            "expected a JSON object, found {}",
            kind(&value)
        )));
    };

    Ok(PersonRecord {
        eternal: decode_category(&doc, Category::Eternal),
        transient: decode_category(&doc, Category::Transient),
    })
}

#[derive(Deserialize)]
struct RawEntry {
    text: String,
    timestamp: i64,
}

fn decode_category(doc: &Map<String, Value>, category: Category) -> Vec<Entry> {
    match doc.get(category.to_string().as_str()) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                let entry = decode_entry(item);
                if entry.is_none() {
                    tracing::warn!(%category, index = i, "dropping malformed entry");
                }
                entry
            })
            .collect(),
        Some(other) => {
            tracing::warn!(
                %category,
                found = kind(other),
                "category is not a list, treating as empty"
            );
            Vec::new()
        }
    }
}

fn decode_entry(item: &Value) -> Option<Entry> {
    let raw = RawEntry::deserialize(item).ok()?;
    let timestamp = DateTime::from_timestamp(raw.timestamp, 0)?;
    Entry::new(&raw.text, timestamp)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decode the legacy text format. The first empty line switches from
/// eternal to transient; later empty and whitespace-only lines are skipped.
pub fn decode_legacy(text: &str, written_at: DateTime<Utc>) -> PersonRecord {
    let written_at = truncate_to_seconds(written_at);
    let mut record = PersonRecord::new();
    let mut in_transient = false;

    for line in text.lines() {
        if line.is_empty() {
            in_transient = true;
            continue;
        }
        let Some(entry) = Entry::new(line, written_at) else {
            continue;
        };
        if in_transient {
            record.transient.push(entry);
        } else {
            record.eternal.push(entry);
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn make_entry(text: &str, secs: i64) -> Entry {
        Entry::new(text, at(secs)).unwrap()
    }

    fn texts(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(Entry::text).collect()
    }

    #[test]
    fn test_round_trip() {
        let record = PersonRecord {
            eternal: vec![make_entry("moved to Berlin", 200), make_entry("likes tea", 100)],
            transient: vec![make_entry("birthday next week", 300)],
        };
        let decoded = decode(&encode(&record).unwrap()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_round_trip_empty() {
        let record = PersonRecord::new();
        let decoded = decode(&encode(&record).unwrap()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_encode_layout() {
        let record = PersonRecord {
            eternal: vec![make_entry("likes tea", 1_700_000_000)],
            transient: vec![],
        };
        let value: Value = serde_json::from_slice(&encode(&record).unwrap()).unwrap();
        assert_eq!(value["eternal"][0]["text"], "likes tea");
        assert_eq!(value["eternal"][0]["timestamp"], 1_700_000_000);
        assert_eq!(value["transient"], Value::Array(vec![]));
    }

    #[test]
    fn test_decode_preserves_order() {
        let json = r#"{
            "eternal": [
                {"text": "older", "timestamp": 100},
                {"text": "newer", "timestamp": 200}
            ],
            "transient": []
        }"#;
        let rec = decode(json.as_bytes()).unwrap();
        assert_eq!(texts(&rec.eternal), ["older", "newer"]);
    }

    #[test]
    fn test_decode_missing_category() {
        let rec = decode(br#"{"eternal": [{"text": "a", "timestamp": 1}]}"#).unwrap();
        assert_eq!(rec.eternal.len(), 1);
        assert!(rec.transient.is_empty());
    }

    #[test]
    fn test_decode_malformed_category() {
        let json = r#"{"eternal": "oops", "transient": [{"text": "b", "timestamp": 2}]}"#;
        let rec = decode(json.as_bytes()).unwrap();
        assert!(rec.eternal.is_empty());
        assert_eq!(texts(&rec.transient), ["b"]);
    }

    #[test]
    fn test_decode_drops_bad_entries() {
        let json = r#"{"transient": [
            {"text": "ok", "timestamp": 5},
            {"text": "no timestamp"},
            {"text": "   ", "timestamp": 6},
            42
        ]}"#;
        let rec = decode(json.as_bytes()).unwrap();
        assert_eq!(texts(&rec.transient), ["ok"]);
    }

    #[test]
    fn test_decode_invalid_json_is_error() {
        assert!(matches!(decode(b"{not json"), Err(SiloError::Decode(_))));
        assert!(matches!(decode(b""), Err(SiloError::Decode(_))));
    }

    #[test]
    fn test_decode_non_object_is_error() {
        assert!(matches!(decode(b"[]"), Err(SiloError::Decode(_))));
        assert!(matches!(decode(b"\"text\""), Err(SiloError::Decode(_))));
    }

    #[test]
    fn test_decode_legacy() {
        let text = "moved to Berlin\nlikes tea\n\n\ncalled today\nsent a card\n";
        let rec = decode_legacy(text, at(1_000));
        assert_eq!(texts(&rec.eternal), ["moved to Berlin", "likes tea"]);
        assert_eq!(texts(&rec.transient), ["called today", "sent a card"]);
        assert!(rec.eternal.iter().all(|e| e.timestamp() == at(1_000)));
    }

    #[test]
    fn test_decode_legacy_no_eternal() {
        let rec = decode_legacy("\n\nonly transient\n", at(0));
        assert!(rec.eternal.is_empty());
        assert_eq!(texts(&rec.transient), ["only transient"]);
    }

    #[test]
    fn test_decode_legacy_whitespace_line_is_not_a_separator() {
        let rec = decode_legacy("a\n   \nb\n\nc\n", at(0));
        assert_eq!(texts(&rec.eternal), ["a", "b"]);
        assert_eq!(texts(&rec.transient), ["c"]);
    }

    #[test]
    fn test_decode_legacy_no_separator() {
        let rec = decode_legacy("a\nb\n", at(0));
        assert_eq!(texts(&rec.eternal), ["a", "b"]);
        assert!(rec.transient.is_empty());
    }

    #[test]
    fn test_decode_as_dispatches_on_format() {
        let json = encode(&PersonRecord {
            eternal: vec![make_entry("j", 10)],
            transient: vec![],
        })
        .unwrap();
        let rec = decode_as(RecordFormat::Json, &json, at(0)).unwrap();
        assert_eq!(texts(&rec.eternal), ["j"]);

        let rec = decode_as(RecordFormat::LegacyText, b"x\n\ny\n", at(0)).unwrap();
        assert_eq!(texts(&rec.eternal), ["x"]);
        assert_eq!(texts(&rec.transient), ["y"]);

        assert!(decode_as(RecordFormat::LegacyText, &[0xff, 0xfe], at(0)).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(RecordFormat::from_extension("json"), Some(RecordFormat::Json));
        assert_eq!(RecordFormat::from_extension("txt"), Some(RecordFormat::LegacyText));
        assert_eq!(RecordFormat::from_extension("bak"), None);
        assert_eq!(RecordFormat::Json.extension(), "json");
    }
}
