//! Domain error types.
//!
//! Variants fall into two families: data errors reject the input series,
//! configuration errors reject a parameter set before any computation runs.

use chrono::NaiveDate;

/// Top-level error type for sigtrader.
#[derive(Debug, thiserror::Error)]
pub enum SigtraderError {
    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("timestamps not strictly increasing at bar {index}: {previous} then {current}")]
    NonMonotonicTimestamps {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: String },

    #[error("position timeline has {positions} bars, series has {bars}")]
    LengthMismatch { positions: usize, bars: usize },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

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

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SigtraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SigtraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors that reject the input series.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            SigtraderError::InsufficientData { .. }
                | SigtraderError::NonMonotonicTimestamps { .. }
                | SigtraderError::InvalidBar { .. }
                | SigtraderError::LengthMismatch { .. }
                | SigtraderError::DataSource { .. }
        )
    }

    /// True for errors that reject a configuration or parameter set.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SigtraderError::ConfigParse { .. }
                | SigtraderError::ConfigMissing { .. }
                | SigtraderError::ConfigInvalid { .. }
        )
    }
}

impl From<&SigtraderError> for std::process::ExitCode {
    fn from(err: &SigtraderError) -> Self {
        let code: u8 = match err {
            SigtraderError::Io(_) => 1,
            SigtraderError::ConfigParse { .. }
            | SigtraderError::ConfigMissing { .. }
            | SigtraderError::ConfigInvalid { .. } => 2,
            SigtraderError::DataSource { .. } => 3,
            SigtraderError::InsufficientData { .. }
            | SigtraderError::NonMonotonicTimestamps { .. }
            | SigtraderError::InvalidBar { .. }
            | SigtraderError::LengthMismatch { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_data_errors() {
        let err = SigtraderError::InsufficientData {
            bars: 3,
            minimum: 51,
        };
        assert!(err.is_data_error());
        assert!(!err.is_config_error());
        assert_eq!(err.to_string(), "insufficient data: have 3 bars, need 51");
    }

    #[test]
    fn classifies_config_errors() {
        let err = SigtraderError::invalid("strategy", "ma_fast", "must be at least 1");
        assert!(err.is_config_error());
        assert!(!err.is_data_error());
        assert_eq!(
            err.to_string(),
            "invalid config value [strategy] ma_fast: must be at least 1"
        );
    }

    #[test]
    fn length_mismatch_is_data_not_source() {
        let err = SigtraderError::LengthMismatch {
            positions: 1,
            bars: 2,
        };
        assert!(err.is_data_error());
        let code = std::process::ExitCode::from(&err);
        assert_eq!(format!("{code:?}"), format!("{:?}", std::process::ExitCode::from(5)));
        assert_eq!(err.to_string(), "position timeline has 1 bars, series has 2");
    }

    #[test]
    fn io_is_neither() {
        let err = SigtraderError::from(std::io::Error::other("boom"));
        assert!(!err.is_data_error());
        assert!(!err.is_config_error());
    }
}
