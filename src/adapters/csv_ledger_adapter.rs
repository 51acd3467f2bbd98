//! CSV ledger file adapter.

use crate::domain::error::TallyError;
use crate::domain::ledger::LedgerBatch;
use crate::ports::ledger_port::LedgerPort;
use std::fs;
use std::path::PathBuf;

pub struct CsvLedgerAdapter {
    path: PathBuf,
}

impl CsvLedgerAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl LedgerPort for CsvLedgerAdapter {
    fn load_batch(&self) -> Result<LedgerBatch, TallyError> {
        let content = fs::read_to_string(&self.path).map_err(|e| TallyError::LedgerRead {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        // venue exports are written with a UTF-8 BOM
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| TallyError::LedgerRead {
                reason: format!("CSV parse error: {}", e),
            })?
            .iter()
            // the export carries trailing spaces in some header cells
            .map(|name| name.trim().to_string())
            .collect();

        let mut batch = LedgerBatch::new(headers);
        for result in rdr.records() {
            let record = result.map_err(|e| TallyError::LedgerRead {
                reason: format!("CSV parse error: {}", e),
            })?;
            let cells: Vec<String> = record.iter().map(|cell| cell.to_string()).collect();
            // concatenated exports repeat the header row mid-file
            if cells
                .iter()
                .map(|cell| cell.trim())
                .eq(batch.headers().iter().map(|name| name.as_str()))
            {
                continue;
            }
            batch.push_row(cells);
        }
        Ok(batch)
    }
}
