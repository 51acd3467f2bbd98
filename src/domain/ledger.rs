//! Field-keyed ledger batches.
//!
//! A batch is one export file: a header row naming the fields, and the raw
//! string cells of every data row. Engines resolve the field names they need
//! once, up front, so a missing column is reported before any row is touched.

use crate::domain::error::TallyError;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct LedgerBatch {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl LedgerBatch {
    pub fn new(headers: Vec<String>) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(pos, name)| (name.clone(), pos))
            .collect();
        Self {
            headers,
            index,
            rows: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a data row, padded or truncated to the header width.
    pub fn push_row(&mut self, mut cells: Vec<String>) {
        cells.resize(self.headers.len(), String::new());
        self.rows.push(cells);
    }

    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(|row| row.as_slice())
    }

    /// Resolve field names to column positions. All-or-nothing: every missing
    /// name is reported in a single error.
    pub fn resolve(&self, fields: &[&str]) -> Result<Vec<usize>, TallyError> {
        let mut positions = Vec::with_capacity(fields.len());
        let mut missing = Vec::new();
        for &field in fields {
            match self.index.get(field) {
                Some(&pos) => positions.push(pos),
                None => missing.push(field.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(positions)
        } else {
            Err(TallyError::MissingFields { fields: missing })
        }
    }
}
