//! Domain error types.

/// Top-level error type for fxtrader.
#[derive(Debug, thiserror::Error)]
pub enum FxError {
    #[error("malformed series at bar {index}: {reason}")]
    MalformedSeries { index: usize, reason: String },

    #[error("insufficient history: have {bars} bars, need {minimum}")]
    InsufficientHistory { bars: usize, minimum: usize },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FxError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        FxError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&FxError> for std::process::ExitCode {
    fn from(err: &FxError) -> Self {
        let code: u8 = match err {
            FxError::Io(_) | FxError::Report { .. } => 1,
            FxError::ConfigParse { .. }
            | FxError::ConfigMissing { .. }
            | FxError::ConfigInvalid { .. } => 2,
            FxError::Data { .. } | FxError::MalformedSeries { .. } => 3,
            FxError::InsufficientHistory { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
