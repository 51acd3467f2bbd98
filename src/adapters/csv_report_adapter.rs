//! CSV report writer for netting totals and position summaries.
//!
//! Output columns use the venue's own vocabulary, so the reports drop into
//! the same spreadsheets the raw exports came from.

use crate::domain::error::TallyError;
use crate::domain::netting::ContractAggregate;
use crate::domain::numeric::format_fixed;
use crate::domain::reconstruct::PositionSummary;
use crate::domain::side::Direction;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDateTime;
use std::path::Path;

const NETTING_HEADER: [&str; 4] = ["合约", "总成本", "总利润", "收益率"];
const POSITION_HEADER: [&str; 10] = [
    "币种",
    "开始",
    "结束",
    "多/空",
    "均价",
    "总额",
    "平仓均价",
    "平仓总额",
    "收益率",
    "收益总额",
];

pub struct CsvReportAdapter;

fn format_time(timestamp: Option<NaiveDateTime>) -> String {
    timestamp
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Long => "多",
        Direction::Short => "空",
    }
}

fn write_error(path: &Path, err: csv::Error) -> TallyError {
    TallyError::ReportWrite {
        reason: format!("failed to write {}: {}", path.display(), err),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_netting(
        &self,
        totals: &[ContractAggregate],
        digits: u32,
        output: &Path,
    ) -> Result<(), TallyError> {
        let mut writer = csv::Writer::from_path(output).map_err(|e| write_error(output, e))?;
        writer
            .write_record(NETTING_HEADER)
            .map_err(|e| write_error(output, e))?;
        for entry in totals {
            let cost = format_fixed(entry.cost, digits);
            let profit = format_fixed(entry.profit, digits);
            let yield_ratio = format_fixed(entry.yield_ratio(), digits);
            writer
                .write_record([
                    entry.contract.as_str(),
                    cost.as_str(),
                    profit.as_str(),
                    yield_ratio.as_str(),
                ])
                .map_err(|e| write_error(output, e))?;
        }
        writer.flush().map_err(|e| TallyError::ReportWrite {
            reason: format!("failed to write {}: {}", output.display(), e),
        })
    }

    fn write_positions(
        &self,
        summaries: &[PositionSummary],
        digits: u32,
        output: &Path,
    ) -> Result<(), TallyError> {
        let mut writer = csv::Writer::from_path(output).map_err(|e| write_error(output, e))?;
        writer
            .write_record(POSITION_HEADER)
            .map_err(|e| write_error(output, e))?;
        for summary in summaries {
            let opened = format_time(summary.opened_at);
            let closed = format_time(summary.closed_at);
            let open_avg = format_fixed(summary.open_avg_price, digits);
            let open_total = format_fixed(summary.open_total, digits);
            let close_avg = format_fixed(summary.close_avg_price, digits);
            let close_total = format_fixed(summary.close_total, digits);
            let profit = format_fixed(summary.profit, digits);
            writer
                .write_record([
                    summary.contract.as_str(),
                    opened.as_str(),
                    closed.as_str(),
                    direction_label(summary.direction),
                    open_avg.as_str(),
                    open_total.as_str(),
                    close_avg.as_str(),
                    close_total.as_str(),
                    summary.profit_rate.as_str(),
                    profit.as_str(),
                ])
                .map_err(|e| write_error(output, e))?;
        }
        writer.flush().map_err(|e| TallyError::ReportWrite {
            reason: format!("failed to write {}: {}", output.display(), e),
        })
    }
}
