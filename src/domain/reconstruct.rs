//! Position reconstruction: opening and closing legs per contract.
//!
//! Per contract the pipeline is linear: filter out rows without a strictly
//! positive notional, fix the direction from the first remaining row,
//! partition the rest into opening and closing legs by side label, reduce
//! each leg to a volume-weighted average price and a notional total. A
//! contract either yields exactly one summary or nothing.

use crate::domain::error::TallyError;
use crate::domain::ledger::LedgerBatch;
use crate::domain::numeric::{format_fixed, parse_decimal, ratio_or_zero};
use crate::domain::side::{Direction, SideTag};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Field names the reconstruction engine reads from a batch.
#[derive(Debug, Clone)]
pub struct ReconstructFields {
    pub contract: String,
    pub timestamp: String,
    pub side: String,
    pub quantity: String,
    pub avg_price: String,
    pub notional: String,
}

impl Default for ReconstructFields {
    /// Column names of the exchange export this tool was built around.
    fn default() -> Self {
        Self {
            contract: "合约".into(),
            timestamp: "委托时间(UTC)".into(),
            side: "买卖".into(),
            quantity: "成交量".into(),
            avg_price: "成交均价".into(),
            notional: "成交额".into(),
        }
    }
}

/// One execution, typed for reconstruction.
///
/// Quantity and price stay optional: an unparseable cell excludes the row
/// from the weighted-average computation rather than polluting it with a
/// bogus zero term.
#[derive(Debug, Clone)]
struct OrderRow {
    timestamp: NaiveDateTime,
    side: SideTag,
    quantity: Option<Decimal>,
    avg_price: Option<Decimal>,
    notional: Decimal,
}

/// Reconstructed position for one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSummary {
    pub contract: String,
    pub direction: Direction,
    /// Earliest opening execution; `None` when no row opened the position.
    pub opened_at: Option<NaiveDateTime>,
    /// Latest closing execution, defaulting to `opened_at` for a position
    /// that was never closed.
    pub closed_at: Option<NaiveDateTime>,
    pub open_avg_price: Decimal,
    pub open_total: Decimal,
    pub close_avg_price: Decimal,
    pub close_total: Decimal,
    pub profit: Decimal,
    /// Percentage of `open_total`, rendered with two fractional digits.
    pub profit_rate: String,
}

/// Timestamp formats accepted in the export, most common first.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Reconstruct one position summary per contract, first-seen contract order.
///
/// Rows without a strictly positive notional, or without a readable
/// timestamp, are excluded up front; a contract with no rows left after that
/// produces no summary at all.
pub fn reconstruct_positions(
    batch: &LedgerBatch,
    fields: &ReconstructFields,
) -> Result<Vec<PositionSummary>, TallyError> {
    let positions = batch.resolve(&[
        fields.contract.as_str(),
        fields.timestamp.as_str(),
        fields.side.as_str(),
        fields.quantity.as_str(),
        fields.avg_price.as_str(),
        fields.notional.as_str(),
    ])?;
    let (contract_pos, ts_pos, side_pos, qty_pos, price_pos, notional_pos) = (
        positions[0],
        positions[1],
        positions[2],
        positions[3],
        positions[4],
        positions[5],
    );

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<OrderRow>> = HashMap::new();

    for row in batch.rows() {
        let contract = row[contract_pos].trim();
        if contract.is_empty() {
            continue;
        }
        // group membership is decided before validity, so contract order
        // follows raw appearance even when early rows are unusable
        let group = groups.entry(contract.to_string()).or_insert_with(|| {
            order.push(contract.to_string());
            Vec::new()
        });

        let Some(notional) = parse_decimal(&row[notional_pos]) else {
            continue;
        };
        if notional <= Decimal::ZERO {
            continue;
        }
        let Some(timestamp) = parse_timestamp(&row[ts_pos]) else {
            continue;
        };

        group.push(OrderRow {
            timestamp,
            side: SideTag::parse(&row[side_pos]),
            quantity: parse_decimal(&row[qty_pos]),
            avg_price: parse_decimal(&row[price_pos]),
            notional,
        });
    }

    let mut summaries = Vec::new();
    for contract in order {
        let mut rows = groups.remove(&contract).unwrap_or_default();
        rows.sort_by_key(|row| row.timestamp);
        if let Some(summary) = summarize(contract, &rows) {
            summaries.push(summary);
        }
    }
    Ok(summaries)
}

/// Volume-weighted average price and notional total of one leg, over the
/// rows where both price and quantity parsed.
fn reduce_leg(rows: &[&OrderRow]) -> (Decimal, Decimal) {
    let mut quantity_sum = Decimal::ZERO;
    let mut weighted_sum = Decimal::ZERO;
    let mut total = Decimal::ZERO;
    for row in rows {
        if let (Some(quantity), Some(price)) = (row.quantity, row.avg_price) {
            quantity_sum += quantity;
            weighted_sum += price * quantity;
            total += row.notional;
        }
    }
    (ratio_or_zero(weighted_sum, quantity_sum), total)
}

fn summarize(contract: String, rows: &[OrderRow]) -> Option<PositionSummary> {
    let first = rows.first()?;
    // the first valid order fixes the direction for the whole contract
    let direction = first.side.infer_direction();

    let opening: Vec<&OrderRow> = rows.iter().filter(|row| row.side.opens(direction)).collect();
    let closing: Vec<&OrderRow> = rows.iter().filter(|row| row.side.closes(direction)).collect();

    let opened_at = opening.iter().map(|row| row.timestamp).min();
    let (open_avg_price, open_total) = reduce_leg(&opening);

    let closed_at = closing.iter().map(|row| row.timestamp).max().or(opened_at);
    let (close_avg_price, close_total) = reduce_leg(&closing);

    let profit = match direction {
        Direction::Long => close_total - open_total,
        Direction::Short => open_total - close_total,
    };
    let rate = ratio_or_zero(profit, open_total) * Decimal::ONE_HUNDRED;

    Some(PositionSummary {
        contract,
        direction,
        opened_at,
        closed_at,
        open_avg_price,
        open_total,
        close_avg_price,
        close_total,
        profit,
        profit_rate: format!("{}%", format_fixed(rate, 2)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    fn batch(rows: &[[&str; 6]]) -> LedgerBatch {
        let mut batch = LedgerBatch::new(vec![
            "合约".into(),
            "委托时间(UTC)".into(),
            "买卖".into(),
            "成交量".into(),
            "成交均价".into(),
            "成交额".into(),
        ]);
        for row in rows {
            batch.push_row(row.iter().map(|cell| cell.to_string()).collect());
        }
        batch
    }

    fn reconstruct(rows: &[[&str; 6]]) -> Vec<PositionSummary> {
        reconstruct_positions(&batch(rows), &ReconstructFields::default()).unwrap()
    }

    #[test]
    fn long_round_trip() {
        let summaries = reconstruct(&[
            ["ETH", "2024-03-01 10:00:00", "买", "1", "100", "100"],
            ["ETH", "2024-03-01 11:00:00", "卖", "1", "110", "110"],
        ]);
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.direction, Direction::Long);
        assert_eq!(s.opened_at, Some(ts("2024-03-01 10:00:00")));
        assert_eq!(s.closed_at, Some(ts("2024-03-01 11:00:00")));
        assert_eq!(s.open_avg_price, dec("100"));
        assert_eq!(s.open_total, dec("100"));
        assert_eq!(s.close_avg_price, dec("110"));
        assert_eq!(s.close_total, dec("110"));
        assert_eq!(s.profit, dec("10"));
        assert_eq!(s.profit_rate, "10.00%");
    }

    #[test]
    fn short_profit_is_reversed() {
        let summaries = reconstruct(&[
            ["BTC", "2024-03-01 10:00:00", "卖", "1", "110", "110"],
            ["BTC", "2024-03-01 11:00:00", "买", "1", "100", "100"],
        ]);
        let s = &summaries[0];
        assert_eq!(s.direction, Direction::Short);
        assert_eq!(s.profit, dec("10"));
        assert_eq!(s.profit_rate, "9.09%");
    }

    #[test]
    fn buy_only_contract_has_empty_close_leg() {
        let summaries = reconstruct(&[
            ["ETH", "2024-03-01 10:00:00", "买", "2", "100", "200"],
            ["ETH", "2024-03-02 10:00:00", "买", "1", "130", "130"],
        ]);
        let s = &summaries[0];
        assert_eq!(s.direction, Direction::Long);
        assert_eq!(s.close_avg_price, Decimal::ZERO);
        assert_eq!(s.close_total, Decimal::ZERO);
        // never closed, so the close time falls back to the open time
        assert_eq!(s.closed_at, s.opened_at);
        assert_eq!(s.profit, dec("-330"));
    }

    #[test]
    fn weighted_average_uses_quantity_weights() {
        let summaries = reconstruct(&[
            ["ETH", "2024-03-01 10:00:00", "买", "2", "10", "20"],
            ["ETH", "2024-03-01 10:05:00", "买", "1", "20", "20"],
        ]);
        // (10*2 + 20*1) / 3
        assert_eq!(summaries[0].open_avg_price, dec("40") / dec("3"));
    }

    #[test]
    fn unparseable_quantity_excludes_row_from_averages() {
        let summaries = reconstruct(&[
            ["ETH", "2024-03-01 10:00:00", "买", "2", "10", "20"],
            ["ETH", "2024-03-01 10:05:00", "买", "", "999", "30"],
        ]);
        let s = &summaries[0];
        // the second row is excluded from both the average and the total
        assert_eq!(s.open_avg_price, dec("10"));
        assert_eq!(s.open_total, dec("20"));
    }

    #[test]
    fn leg_with_no_measurable_rows_reduces_to_zero() {
        let summaries = reconstruct(&[
            ["ETH", "2024-03-01 10:00:00", "买", "", "", "20"],
            ["ETH", "2024-03-01 10:05:00", "买", "x", "y", "30"],
        ]);
        let s = &summaries[0];
        assert_eq!(s.open_avg_price, Decimal::ZERO);
        assert_eq!(s.open_total, Decimal::ZERO);
        // the rows still anchor the open timestamp
        assert_eq!(s.opened_at, Some(ts("2024-03-01 10:00:00")));
    }

    #[test]
    fn non_positive_notional_rows_are_discarded() {
        let summaries = reconstruct(&[
            ["ETH", "2024-03-01 09:00:00", "卖", "1", "100", "0"],
            ["ETH", "2024-03-01 10:00:00", "买", "1", "100", "100"],
        ]);
        // the zero-notional sell is gone, so the buy decides the direction
        assert_eq!(summaries[0].direction, Direction::Long);
    }

    #[test]
    fn contract_with_no_valid_rows_yields_nothing() {
        let summaries = reconstruct(&[
            ["DOGE", "2024-03-01 10:00:00", "买", "1", "1", "0"],
            ["DOGE", "2024-03-01 11:00:00", "买", "1", "1", "-5"],
            ["ETH", "2024-03-01 10:00:00", "买", "1", "100", "100"],
        ]);
        let names: Vec<&str> = summaries.iter().map(|s| s.contract.as_str()).collect();
        assert_eq!(names, ["ETH"]);
    }

    #[test]
    fn direction_comes_from_earliest_row_after_sorting() {
        // rows arrive out of order; the 09:00 sell is the real first order
        let summaries = reconstruct(&[
            ["BTC", "2024-03-01 10:00:00", "买", "1", "100", "100"],
            ["BTC", "2024-03-01 09:00:00", "卖", "1", "110", "110"],
        ]);
        assert_eq!(summaries[0].direction, Direction::Short);
    }

    #[test]
    fn compound_close_label_counts_in_both_short_legs() {
        let summaries = reconstruct(&[
            ["BTC", "2024-03-01 09:00:00", "开空", "1", "100", "100"],
            ["BTC", "2024-03-01 10:00:00", "卖出平多", "1", "105", "105"],
        ]);
        let s = &summaries[0];
        assert_eq!(s.direction, Direction::Short);
        // the compound label opens (卖) and closes (平) at the same time
        assert_eq!(s.open_total, dec("205"));
        assert_eq!(s.close_total, dec("105"));
        assert_eq!(s.profit, dec("100"));
    }

    #[test]
    fn unreadable_timestamp_excludes_the_row() {
        let summaries = reconstruct(&[
            ["ETH", "not a time", "买", "1", "90", "90"],
            ["ETH", "2024-03-01 10:00:00", "买", "1", "100", "100"],
        ]);
        let s = &summaries[0];
        assert_eq!(s.open_total, dec("100"));
        assert_eq!(s.opened_at, Some(ts("2024-03-01 10:00:00")));
    }

    #[test]
    fn contracts_keep_first_seen_order() {
        let summaries = reconstruct(&[
            ["SOL", "2024-03-01 10:00:00", "买", "1", "10", "10"],
            ["BTC", "2024-03-01 09:00:00", "买", "1", "50000", "50000"],
        ]);
        let names: Vec<&str> = summaries.iter().map(|s| s.contract.as_str()).collect();
        assert_eq!(names, ["SOL", "BTC"]);
    }

    #[test]
    fn timestamp_formats_cover_the_export_variants() {
        assert!(parse_timestamp("2024-03-01 10:00:00").is_some());
        assert!(parse_timestamp("2024-03-01 10:00:00.123").is_some());
        assert!(parse_timestamp("2024-03-01T10:00:00").is_some());
        assert!(parse_timestamp("2024/03/01 10:00:00").is_some());
        assert!(parse_timestamp("2024-03-01 10:00").is_some());
        assert!(parse_timestamp("2024-03-01").is_some());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("soon").is_none());
    }

    #[test]
    fn missing_fields_fail_before_any_row() {
        let mut batch = LedgerBatch::new(vec!["合约".into(), "成交额".into()]);
        batch.push_row(vec!["BTC".into(), "1".into()]);
        let err = reconstruct_positions(&batch, &ReconstructFields::default()).unwrap_err();
        match err {
            TallyError::MissingFields { fields } => {
                assert_eq!(
                    fields,
                    vec![
                        "委托时间(UTC)".to_string(),
                        "买卖".to_string(),
                        "成交量".to_string(),
                        "成交均价".to_string(),
                    ]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
