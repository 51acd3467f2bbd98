//! CLI definition and dispatch.
//!
//! All path-search policy lives here: the engines receive already-loaded
//! batches and hand back in-memory results. Precedence for every setting is
//! command line, then config file, then built-in default.

use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_ledger_adapter::CsvLedgerAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::error::TallyError;
use crate::domain::ledger::LedgerBatch;
use crate::domain::netting::{aggregate_contracts, NettingFields};
use crate::domain::reconstruct::{reconstruct_positions, ReconstructFields};
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::report_port::ReportPort;

/// Input locations probed when no path is given anywhere.
const DEFAULT_INPUT_CANDIDATES: [&str; 2] = ["/in/trades.csv", "in/trades.csv"];
/// Output directories tried, in order, for the default report location.
const DEFAULT_OUTPUT_BASES: [&str; 2] = ["/out", "out"];

const NETTING_REPORT_NAME: &str = "contract_summary.csv";
const POSITION_REPORT_NAME: &str = "position_summary.csv";
const DEFAULT_DIGITS: i64 = 6;

#[derive(Parser, Debug)]
#[command(
    name = "tradetally",
    about = "Per-contract cost, profit and position aggregation for trading exports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Net per-contract cost and profit from a ledger export
    Net {
        /// Input CSV (defaults to the first existing standard location)
        input: Option<PathBuf>,
        /// Output CSV (defaults to contract_summary.csv in the standard output dir)
        output: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Fractional digits for rendered amounts
        #[arg(long)]
        digits: Option<u32>,
    },
    /// Reconstruct per-contract open/close legs and profitability
    Positions {
        /// Input CSV (defaults to the first existing standard location)
        input: Option<PathBuf>,
        /// Output CSV (defaults to position_summary.csv in the standard output dir)
        output: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Fractional digits for rendered amounts
        #[arg(long)]
        digits: Option<u32>,
    },
    /// Show the columns and row counts of a ledger export
    Inspect {
        /// Input CSV (defaults to the first existing standard location)
        input: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Net {
            input,
            output,
            config,
            digits,
        } => run_net(input, output, config.as_ref(), digits),
        Command::Positions {
            input,
            output,
            config,
            digits,
        } => run_positions(input, output, config.as_ref(), digits),
        Command::Inspect { input, config } => run_inspect(input, config.as_ref()),
    }
}

fn load_optional_config(path: Option<&PathBuf>) -> Result<Option<FileConfigAdapter>, ExitCode> {
    let Some(path) = path else {
        return Ok(None);
    };
    match FileConfigAdapter::from_file(path) {
        Ok(adapter) => Ok(Some(adapter)),
        Err(e) => {
            let err = TallyError::ConfigParse {
                file: path.display().to_string(),
                reason: e.to_string(),
            };
            eprintln!("error: {err}");
            Err(ExitCode::from(&err))
        }
    }
}

fn config_string(config: Option<&dyn ConfigPort>, section: &str, key: &str) -> Option<String> {
    config.and_then(|c| c.get_string(section, key))
}

pub fn build_netting_fields(config: Option<&dyn ConfigPort>) -> NettingFields {
    let mut fields = NettingFields::default();
    if let Some(name) = config_string(config, "fields", "contract") {
        fields.contract = name;
    }
    if let Some(name) = config_string(config, "fields", "notional") {
        fields.notional = name;
    }
    if let Some(name) = config_string(config, "fields", "realized_pnl") {
        fields.realized_pnl = name;
    }
    fields
}

pub fn build_reconstruct_fields(config: Option<&dyn ConfigPort>) -> ReconstructFields {
    let mut fields = ReconstructFields::default();
    if let Some(name) = config_string(config, "fields", "contract") {
        fields.contract = name;
    }
    if let Some(name) = config_string(config, "fields", "timestamp") {
        fields.timestamp = name;
    }
    if let Some(name) = config_string(config, "fields", "side") {
        fields.side = name;
    }
    if let Some(name) = config_string(config, "fields", "quantity") {
        fields.quantity = name;
    }
    if let Some(name) = config_string(config, "fields", "avg_price") {
        fields.avg_price = name;
    }
    if let Some(name) = config_string(config, "fields", "notional") {
        fields.notional = name;
    }
    fields
}

pub fn resolve_digits(
    override_digits: Option<u32>,
    config: Option<&dyn ConfigPort>,
) -> Result<u32, TallyError> {
    let digits = match override_digits {
        Some(digits) => i64::from(digits),
        None => config
            .map(|c| c.get_int("output", "digits", DEFAULT_DIGITS))
            .unwrap_or(DEFAULT_DIGITS),
    };
    // rust_decimal carries at most 28 fractional digits
    if !(0..=28).contains(&digits) {
        return Err(TallyError::ConfigInvalid {
            section: "output".into(),
            key: "digits".into(),
            reason: format!("{digits} is outside 0..=28"),
        });
    }
    Ok(digits as u32)
}

/// Pick the input file: explicit argument, then config, then the first
/// existing default candidate. An explicit path must exist.
pub fn resolve_input_path(
    explicit: Option<PathBuf>,
    config: Option<&dyn ConfigPort>,
) -> Result<PathBuf, TallyError> {
    let chosen = explicit.or_else(|| config_string(config, "input", "path").map(PathBuf::from));
    if let Some(path) = chosen {
        if !path.exists() {
            return Err(TallyError::InputNotFound {
                candidates: vec![path.display().to_string()],
            });
        }
        return Ok(path);
    }

    for candidate in DEFAULT_INPUT_CANDIDATES {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Ok(path);
        }
    }
    Err(TallyError::InputNotFound {
        candidates: DEFAULT_INPUT_CANDIDATES
            .iter()
            .map(|c| c.to_string())
            .collect(),
    })
}

/// Pick the output file: explicit argument, then config, then `file_name`
/// under the first usable default base directory. Parent directories are
/// created for a chosen path.
pub fn resolve_output_path(
    explicit: Option<PathBuf>,
    config: Option<&dyn ConfigPort>,
    file_name: &str,
) -> Result<PathBuf, TallyError> {
    let chosen = explicit.or_else(|| config_string(config, "output", "path").map(PathBuf::from));
    if let Some(path) = chosen {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        return Ok(path);
    }

    for base in DEFAULT_OUTPUT_BASES {
        let dir = PathBuf::from(base);
        if fs::create_dir_all(&dir).is_ok() && dir.exists() {
            return Ok(dir.join(file_name));
        }
    }
    Err(TallyError::OutputUnavailable {
        candidates: DEFAULT_OUTPUT_BASES.iter().map(|c| c.to_string()).collect(),
    })
}

fn load_ledger(
    input: Option<PathBuf>,
    config: Option<&dyn ConfigPort>,
) -> Result<LedgerBatch, TallyError> {
    let input_path = resolve_input_path(input, config)?;
    eprintln!("Loading ledger from {}", input_path.display());
    let batch = CsvLedgerAdapter::new(input_path).load_batch()?;
    eprintln!("  {} rows", batch.len());
    Ok(batch)
}

fn run_net(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    config_path: Option<&PathBuf>,
    digits_override: Option<u32>,
) -> ExitCode {
    let config = match load_optional_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let config_port = config.as_ref().map(|c| c as &dyn ConfigPort);

    let digits = match resolve_digits(digits_override, config_port) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let output_path = match resolve_output_path(output, config_port, NETTING_REPORT_NAME) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let batch = match load_ledger(input, config_port) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let fields = build_netting_fields(config_port);
    let totals = match aggregate_contracts(&batch, &fields) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Netted {} contracts", totals.len());

    if let Err(e) = CsvReportAdapter.write_netting(&totals, digits, &output_path) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("Summary written to: {}", output_path.display());
    ExitCode::SUCCESS
}

fn run_positions(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    config_path: Option<&PathBuf>,
    digits_override: Option<u32>,
) -> ExitCode {
    let config = match load_optional_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let config_port = config.as_ref().map(|c| c as &dyn ConfigPort);

    let digits = match resolve_digits(digits_override, config_port) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let output_path = match resolve_output_path(output, config_port, POSITION_REPORT_NAME) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let batch = match load_ledger(input, config_port) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let fields = build_reconstruct_fields(config_port);
    let summaries = match reconstruct_positions(&batch, &fields) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Reconstructed {} positions", summaries.len());

    if let Err(e) = CsvReportAdapter.write_positions(&summaries, digits, &output_path) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("Summary written to: {}", output_path.display());
    ExitCode::SUCCESS
}

fn run_inspect(input: Option<PathBuf>, config_path: Option<&PathBuf>) -> ExitCode {
    let config = match load_optional_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let config_port = config.as_ref().map(|c| c as &dyn ConfigPort);

    let batch = match load_ledger(input, config_port) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    println!(
        "{} columns: {}",
        batch.headers().len(),
        batch.headers().join(", ")
    );
    println!("{} rows", batch.len());

    let fields = build_netting_fields(config_port);
    if let Ok(positions) = batch.resolve(&[fields.contract.as_str()]) {
        let contracts = count_contracts(&batch, positions[0]);
        println!("{} contracts", contracts);
    }
    ExitCode::SUCCESS
}

fn count_contracts(batch: &LedgerBatch, contract_pos: usize) -> usize {
    let mut seen: HashSet<&str> = HashSet::new();
    for row in batch.rows() {
        let contract = row[contract_pos].trim();
        if !contract.is_empty() {
            seen.insert(contract);
        }
    }
    seen.len()
}
