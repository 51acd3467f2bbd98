//! Cost/profit netting over ledger rows.
//!
//! One pass over the batch: a row whose realized-P&L cell is exactly zero
//! contributes its notional to the contract's cost, any other row contributes
//! the realized P&L to profit. Contracts keep first-seen order.

use crate::domain::error::TallyError;
use crate::domain::ledger::LedgerBatch;
use crate::domain::numeric::{parse_decimal_or_zero, ratio_or_zero};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Field names the netting engine reads from a batch.
#[derive(Debug, Clone)]
pub struct NettingFields {
    pub contract: String,
    pub notional: String,
    pub realized_pnl: String,
}

impl Default for NettingFields {
    /// Column names of the exchange export this tool was built around.
    fn default() -> Self {
        Self {
            contract: "合约".into(),
            notional: "成交额".into(),
            realized_pnl: "已实现盈亏".into(),
        }
    }
}

/// Running totals for one contract. Cost and profit only ever grow over a
/// batch; rounding is the renderer's job, never done here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractAggregate {
    pub contract: String,
    pub cost: Decimal,
    pub profit: Decimal,
}

impl ContractAggregate {
    fn new(contract: String) -> Self {
        Self {
            contract,
            cost: Decimal::ZERO,
            profit: Decimal::ZERO,
        }
    }

    /// profit / cost, or zero for a contract with zero cost basis.
    pub fn yield_ratio(&self) -> Decimal {
        ratio_or_zero(self.profit, self.cost)
    }
}

/// Net a batch into per-contract totals.
///
/// A non-zero realized-P&L cell marks a settlement event; everything else is
/// capital deployed. Unparseable numeric cells count as exact zero, so a
/// malformed row degrades instead of aborting the batch. Rows with a blank
/// contract cell are dropped.
pub fn aggregate_contracts(
    batch: &LedgerBatch,
    fields: &NettingFields,
) -> Result<Vec<ContractAggregate>, TallyError> {
    let positions = batch.resolve(&[
        fields.contract.as_str(),
        fields.notional.as_str(),
        fields.realized_pnl.as_str(),
    ])?;
    let (contract_pos, notional_pos, pnl_pos) = (positions[0], positions[1], positions[2]);

    let mut totals: Vec<ContractAggregate> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for row in batch.rows() {
        let contract = row[contract_pos].trim();
        if contract.is_empty() {
            continue;
        }

        let pnl = parse_decimal_or_zero(&row[pnl_pos]);
        let notional = parse_decimal_or_zero(&row[notional_pos]);

        let slot = *slots.entry(contract.to_string()).or_insert_with(|| {
            totals.push(ContractAggregate::new(contract.to_string()));
            totals.len() - 1
        });

        if pnl.is_zero() {
            totals[slot].cost += notional;
        } else {
            totals[slot].profit += pnl;
        }
    }

    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn batch(rows: &[[&str; 3]]) -> LedgerBatch {
        let mut batch =
            LedgerBatch::new(vec!["合约".into(), "成交额".into(), "已实现盈亏".into()]);
        for row in rows {
            batch.push_row(row.iter().map(|cell| cell.to_string()).collect());
        }
        batch
    }

    fn aggregate(rows: &[[&str; 3]]) -> Vec<ContractAggregate> {
        aggregate_contracts(&batch(rows), &NettingFields::default()).unwrap()
    }

    #[test]
    fn zero_pnl_rows_feed_cost_others_feed_profit() {
        let totals = aggregate(&[["BTC", "100", "0"], ["BTC", "0", "50"]]);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].cost, dec("100"));
        assert_eq!(totals[0].profit, dec("50"));
        assert_eq!(totals[0].yield_ratio(), dec("0.5"));
    }

    #[test]
    fn settlement_row_notional_never_reaches_cost() {
        // the notional on a pnl-carrying row is ignored entirely
        let totals = aggregate(&[["BTC", "999", "-25"]]);
        assert_eq!(totals[0].cost, Decimal::ZERO);
        assert_eq!(totals[0].profit, dec("-25"));
    }

    #[test]
    fn contracts_keep_first_seen_order() {
        let totals = aggregate(&[
            ["ETH", "10", "0"],
            ["BTC", "20", "0"],
            ["ETH", "30", "0"],
            ["SOL", "40", "0"],
        ]);
        let names: Vec<&str> = totals.iter().map(|t| t.contract.as_str()).collect();
        assert_eq!(names, ["ETH", "BTC", "SOL"]);
        assert_eq!(totals[0].cost, dec("40"));
    }

    #[test]
    fn blank_contract_rows_are_dropped() {
        let totals = aggregate(&[["", "100", "0"], ["  ", "100", "0"], ["BTC", "7", "0"]]);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].contract, "BTC");
    }

    #[test]
    fn contract_cell_is_trimmed_before_grouping() {
        let totals = aggregate(&[[" BTC ", "1", "0"], ["BTC", "2", "0"]]);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].cost, dec("3"));
    }

    #[test]
    fn malformed_cells_degrade_to_zero() {
        let totals = aggregate(&[
            ["BTC", "not-a-number", "0"],
            ["BTC", "1,234.5", ""],
            ["BTC", "10", "oops"],
        ]);
        // garbage notional counts as zero cost; garbage pnl counts as zero,
        // so the third row is a cost row
        assert_eq!(totals[0].cost, dec("1244.5"));
        assert_eq!(totals[0].profit, Decimal::ZERO);
    }

    #[test]
    fn yield_is_zero_when_cost_is_zero() {
        let totals = aggregate(&[["BTC", "0", "50"]]);
        assert_eq!(totals[0].yield_ratio(), Decimal::ZERO);
    }

    #[test]
    fn missing_fields_fail_before_any_row() {
        let mut batch = LedgerBatch::new(vec!["合约".into()]);
        batch.push_row(vec!["BTC".into()]);
        let err = aggregate_contracts(&batch, &NettingFields::default()).unwrap_err();
        match err {
            TallyError::MissingFields { fields } => {
                assert_eq!(fields, vec!["成交额".to_string(), "已实现盈亏".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn renamed_fields_resolve_against_custom_headers() {
        let mut batch =
            LedgerBatch::new(vec!["symbol".into(), "amount".into(), "realized".into()]);
        batch.push_row(vec!["BTC".into(), "100".into(), "0".into()]);
        let fields = NettingFields {
            contract: "symbol".into(),
            notional: "amount".into(),
            realized_pnl: "realized".into(),
        };
        let totals = aggregate_contracts(&batch, &fields).unwrap();
        assert_eq!(totals[0].cost, dec("100"));
    }
}
