//! Domain error types.

/// Top-level error type for signalbench.
#[derive(Debug, thiserror::Error)]
pub enum SignalbenchError {
    #[error("malformed series at bar {index}: {reason}")]
    MalformedSeries { index: usize, reason: String },

    #[error("length mismatch: series has {series} bars, {what} has {other}")]
    LengthMismatch {
        what: String,
        series: usize,
        other: usize,
    },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("position {value} at bar {index} is outside [-1, 1]")]
    PositionOutOfRange { index: usize, value: i64 },

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

    #[error("model metadata error in {file}: {reason}")]
    Metadata { file: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SignalbenchError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        SignalbenchError::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        SignalbenchError::MalformedSeries {
            index,
            reason: reason.into(),
        }
    }
}

impl From<&SignalbenchError> for std::process::ExitCode {
    fn from(err: &SignalbenchError) -> Self {
        let code: u8 = match err {
            SignalbenchError::Io(_) => 1,
            SignalbenchError::ConfigParse { .. }
            | SignalbenchError::ConfigMissing { .. }
            | SignalbenchError::ConfigInvalid { .. }
            | SignalbenchError::Configuration { .. }
            | SignalbenchError::Metadata { .. } => 2,
            SignalbenchError::Data { .. } => 3,
            SignalbenchError::MalformedSeries { .. }
            | SignalbenchError::LengthMismatch { .. }
            | SignalbenchError::PositionOutOfRange { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_series_message() {
        let err = SignalbenchError::malformed(3, "timestamps not strictly increasing");
        assert_eq!(
            err.to_string(),
            "malformed series at bar 3: timestamps not strictly increasing"
        );
    }

    #[test]
    fn length_mismatch_message() {
        let err = SignalbenchError::LengthMismatch {
            what: "positions".into(),
            series: 10,
            other: 9,
        };
        assert_eq!(
            err.to_string(),
            "length mismatch: series has 10 bars, positions has 9"
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SignalbenchError = io.into();
        assert!(matches!(err, SignalbenchError::Io(_)));
    }
}
