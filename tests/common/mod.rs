#![allow(dead_code)]

use tradetally::domain::error::TallyError;
use tradetally::domain::ledger::LedgerBatch;
use tradetally::ports::ledger_port::LedgerPort;

/// Header of the exchange export the engines are built around, in the
/// column order the venue uses.
pub const EXPORT_HEADER: [&str; 7] = [
    "合约",
    "委托时间(UTC)",
    "买卖",
    "成交量",
    "成交均价",
    "成交额",
    "已实现盈亏",
];

pub struct MockLedgerPort {
    pub batch: LedgerBatch,
    pub error: Option<String>,
}

impl MockLedgerPort {
    pub fn new(batch: LedgerBatch) -> Self {
        Self { batch, error: None }
    }

    pub fn with_error(reason: &str) -> Self {
        Self {
            batch: LedgerBatch::new(Vec::new()),
            error: Some(reason.to_string()),
        }
    }
}

impl LedgerPort for MockLedgerPort {
    fn load_batch(&self) -> Result<LedgerBatch, TallyError> {
        if let Some(reason) = &self.error {
            return Err(TallyError::LedgerRead {
                reason: reason.clone(),
            });
        }
        Ok(self.batch.clone())
    }
}

/// Build a batch in the standard export shape.
pub fn export_batch(rows: &[[&str; 7]]) -> LedgerBatch {
    let mut batch = LedgerBatch::new(EXPORT_HEADER.iter().map(|h| h.to_string()).collect());
    for row in rows {
        batch.push_row(row.iter().map(|cell| cell.to_string()).collect());
    }
    batch
}

/// One export row: an opening execution with zero realized P&L.
pub fn open_row<'a>(
    contract: &'a str,
    time: &'a str,
    side: &'a str,
    qty: &'a str,
    price: &'a str,
    notional: &'a str,
) -> [&'a str; 7] {
    [contract, time, side, qty, price, notional, "0"]
}
