//! Ledger source port trait.

use crate::domain::error::TallyError;
use crate::domain::ledger::LedgerBatch;

/// Supplies one fully materialized batch of raw order rows. The engines
/// never touch files; everything they see comes through here.
pub trait LedgerPort {
    fn load_batch(&self) -> Result<LedgerBatch, TallyError>;
}
