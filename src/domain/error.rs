//! Domain error types.

/// Top-level error type for quantlab.
#[derive(Debug, thiserror::Error)]
pub enum QuantError {
    #[error("invalid parameter {name} for {strategy}: {reason}")]
    InvalidParameter {
        strategy: String,
        name: String,
        reason: String,
    },

    #[error("unknown parameter {name} for {strategy}")]
    UnknownParameter { strategy: String, name: String },

    #[error("paired series must have the same length (got {left} and {right})")]
    SeriesLengthMismatch { left: usize, right: usize },

    #[error("price series must contain at least one observation")]
    EmptySeries,

    #[error("signal series of length {signals} does not fit price series of length {prices}")]
    SignalLengthMismatch { prices: usize, signals: usize },

    #[error("unsupported key: {key}")]
    UnsupportedMetric { key: String },

    #[error("{strategy} does not support {operation}")]
    UnsupportedOperation { strategy: String, operation: String },

    #[error("unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("dimension mismatch: {reason}")]
    DimensionMismatch { reason: String },

    #[error("no backtest records available")]
    NoRecords,

    #[error("singular covariance matrix")]
    SingularCovariance,

    #[error("singular system: expected returns do not span a frontier")]
    SingularSystem,

    #[error("degenerate option inputs: {reason}")]
    DegenerateOption { reason: String },

    #[error("solver failure: {reason}")]
    Solver { reason: String },

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

    #[error("data load error: {reason}")]
    DataLoad { reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuantError {
    pub(crate) fn invalid_parameter(strategy: &str, name: &str, reason: impl Into<String>) -> Self {
        QuantError::InvalidParameter {
            strategy: strategy.to_string(),
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(strategy: &str, operation: &str) -> Self {
        QuantError::UnsupportedOperation {
            strategy: strategy.to_string(),
            operation: operation.to_string(),
        }
    }
}

impl From<&QuantError> for std::process::ExitCode {
    fn from(err: &QuantError) -> Self {
        let code: u8 = match err {
            QuantError::Io(_) => 1,
            QuantError::ConfigParse { .. }
            | QuantError::ConfigMissing { .. }
            | QuantError::ConfigInvalid { .. } => 2,
            QuantError::Database { .. }
            | QuantError::DatabaseQuery { .. }
            | QuantError::Serialization(_) => 3,
            QuantError::InvalidParameter { .. }
            | QuantError::UnknownParameter { .. }
            | QuantError::UnsupportedMetric { .. }
            | QuantError::UnsupportedOperation { .. }
            | QuantError::UnknownStrategy { .. } => 4,
            QuantError::SeriesLengthMismatch { .. }
            | QuantError::EmptySeries
            | QuantError::SignalLengthMismatch { .. }
            | QuantError::DimensionMismatch { .. }
            | QuantError::NoRecords
            | QuantError::DataLoad { .. } => 5,
            QuantError::SingularCovariance
            | QuantError::SingularSystem
            | QuantError::DegenerateOption { .. }
            | QuantError::Solver { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_message() {
        let err = QuantError::invalid_parameter("mean_reversion", "lookback", "must be greater than 1");
        assert_eq!(
            err.to_string(),
            "invalid parameter lookback for mean_reversion: must be greater than 1"
        );
    }

    #[test]
    fn length_mismatch_message() {
        let err = QuantError::SeriesLengthMismatch { left: 3, right: 4 };
        assert_eq!(
            err.to_string(),
            "paired series must have the same length (got 3 and 4)"
        );
    }

    #[test]
    fn exit_codes_by_family() {
        use std::process::ExitCode;
        assert_eq!(
            ExitCode::from(&QuantError::ConfigMissing {
                section: "backtest".into(),
                key: "prices".into(),
            }),
            ExitCode::from(2)
        );
        assert_eq!(ExitCode::from(&QuantError::SingularCovariance), ExitCode::from(6));
        assert_eq!(ExitCode::from(&QuantError::EmptySeries), ExitCode::from(5));
        assert_eq!(
            ExitCode::from(&QuantError::unsupported("black_scholes", "generate_signals")),
            ExitCode::from(4)
        );
    }
}
