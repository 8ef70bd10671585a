//! File-backed statement store: the persistence collaborator boundary.
//!
//! One JSON file under the home dir holds every statement record together
//! with its parse outcome. The dashboard only ever sees the derived
//! [`ParsedStatementGroup`] view.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use spendsense_core::{ParseState, ParsedStatementGroup, StatementRecord};

/// One stored statement: its record plus the parse outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredStatement {
    pub record: StatementRecord,
    pub parsed: ParseState,
}

#[derive(Debug)]
pub struct StatementStore {
    path: PathBuf,
    statements: Vec<StoredStatement>,
}

impl StatementStore {
    /// Load the store, starting empty when the file is missing. A corrupt
    /// file is surfaced as a warning and treated as empty rather than
    /// crashing the command.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                statements: Vec::new(),
            });
        }

        let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let statements = match serde_json::from_str(&raw) {
            Ok(statements) => statements,
            Err(e) => {
                eprintln!(
                    "warning: statement store {} is corrupt ({e}); starting empty",
                    path.display()
                );
                Vec::new()
            }
        };
        Ok(Self { path, statements })
    }

    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.statements)?;
        fs::write(&self.path, json).with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }

    /// Insert or replace by record id.
    pub fn upsert(&mut self, stored: StoredStatement) {
        match self
            .statements
            .iter_mut()
            .find(|s| s.record.id == stored.record.id)
        {
            Some(slot) => *slot = stored,
            None => self.statements.push(stored),
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.statements.len();
        self.statements.retain(|s| s.record.id != id);
        self.statements.len() != before
    }

    pub fn find_by_path(&self, file_path: &str) -> Option<&StoredStatement> {
        self.statements
            .iter()
            .find(|s| s.record.file_path == file_path)
    }

    pub fn statements(&self) -> &[StoredStatement] {
        &self.statements
    }

    /// Dashboard input: every stored statement as a parsed group.
    pub fn groups(&self) -> Vec<ParsedStatementGroup> {
        self.statements
            .iter()
            .map(|s| ParsedStatementGroup {
                statement_id: s.record.id.clone(),
                statement_name: s.record.name.clone(),
                bank_id: s.record.bank_id.clone(),
                parsed: s.parsed.clone(),
            })
            .collect()
    }
}
