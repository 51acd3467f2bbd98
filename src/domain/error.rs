//! Domain error types.

/// Top-level error type for tradetally.
#[derive(Debug, thiserror::Error)]
pub enum TallyError {
    #[error("ledger read error: {reason}")]
    LedgerRead { reason: String },

    #[error("report write error: {reason}")]
    ReportWrite { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("input is missing required fields: {}", .fields.join(", "))]
    MissingFields { fields: Vec<String> },

    #[error("no input file found; checked: {}", .candidates.join(", "))]
    InputNotFound { candidates: Vec<String> },

    #[error("unable to create any output directory; tried: {}", .candidates.join(", "))]
    OutputUnavailable { candidates: Vec<String> },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TallyError> for std::process::ExitCode {
    fn from(err: &TallyError) -> Self {
        let code: u8 = match err {
            TallyError::Io(_) => 1,
            TallyError::ConfigParse { .. } | TallyError::ConfigInvalid { .. } => 2,
            TallyError::LedgerRead { .. } | TallyError::ReportWrite { .. } => 3,
            TallyError::MissingFields { .. } => 4,
            TallyError::InputNotFound { .. } | TallyError::OutputUnavailable { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
