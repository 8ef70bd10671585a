//! Statement records and their parse lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::ParsedEntry;

/// Outcome of running the parser over a statement's extracted text.
///
/// `NotRun` means extraction or parsing failed (or has not happened yet);
/// `Parsed(vec![])` means parsing ran and recognized nothing. The two are
/// distinct states: a statement with an empty run still counts as processed.
/// Serializes as `null` vs a JSON array, so the stored record shape stays
/// `ParsedEntry[] | null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<Vec<ParsedEntry>>", into = "Option<Vec<ParsedEntry>>")]
pub enum ParseState {
    #[default]
    NotRun,
    Parsed(Vec<ParsedEntry>),
}

impl From<Option<Vec<ParsedEntry>>> for ParseState {
    fn from(v: Option<Vec<ParsedEntry>>) -> Self {
        match v {
            Some(entries) => ParseState::Parsed(entries),
            None => ParseState::NotRun,
        }
    }
}

impl From<ParseState> for Option<Vec<ParsedEntry>> {
    fn from(s: ParseState) -> Self {
        match s {
            ParseState::Parsed(entries) => Some(entries),
            ParseState::NotRun => None,
        }
    }
}

impl ParseState {
    /// Entries if parsing ran, regardless of how many were recognized.
    pub fn entries(&self) -> Option<&[ParsedEntry]> {
        match self {
            ParseState::Parsed(entries) => Some(entries),
            ParseState::NotRun => None,
        }
    }

    pub fn ran(&self) -> bool {
        matches!(self, ParseState::Parsed(_))
    }
}

/// Parsed entries for one statement, as consumed by the aggregation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedStatementGroup {
    pub statement_id: String,
    pub statement_name: String,
    pub bank_id: String,
    pub parsed: ParseState,
}

/// Persisted statement metadata, owned by the storage collaborator.
///
/// When `raw_text` is present the pipeline reparses it directly instead of
/// re-extracting from the stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRecord {
    pub id: String,
    pub bank_id: String,
    pub name: String,
    pub file_path: String,
    pub upload_date: DateTime<Utc>,
    pub processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state_serde_tri_state() {
        let not_run: ParseState = serde_json::from_str("null").unwrap();
        assert_eq!(not_run, ParseState::NotRun);
        assert!(!not_run.ran());

        let empty: ParseState = serde_json::from_str("[]").unwrap();
        assert_eq!(empty, ParseState::Parsed(vec![]));
        assert!(empty.ran());
        assert_eq!(empty.entries(), Some(&[][..]));

        // The two must not collapse into each other on the way back out.
        assert_eq!(serde_json::to_string(&not_run).unwrap(), "null");
        assert_eq!(serde_json::to_string(&empty).unwrap(), "[]");
    }

    #[test]
    fn test_parse_state_round_trips_entries() {
        let state = ParseState::Parsed(vec![ParsedEntry::new(
            "2024-01-01",
            50.0,
            true,
            "Coffee",
        )]);
        let json = serde_json::to_string(&state).unwrap();
        let back: ParseState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_group_serde_keeps_null_for_not_run() {
        let group = ParsedStatementGroup {
            statement_id: "st-1".into(),
            statement_name: "january.pdf".into(),
            bank_id: "bank-1".into(),
            parsed: ParseState::NotRun,
        };
        let json = serde_json::to_value(&group).unwrap();
        assert!(json["parsed"].is_null());
    }
}
