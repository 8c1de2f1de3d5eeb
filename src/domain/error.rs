//! Domain error types.

/// Top-level error type for quantcore.
#[derive(Debug, thiserror::Error)]
pub enum QuantError {
    #[error("not enough history for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("no positions supplied for risk analytics")]
    NoPositions,

    #[error("invalid config value {key}: {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuantError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        QuantError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn invalid_config(key: &str, reason: impl Into<String>) -> Self {
        QuantError::InvalidConfig {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&QuantError> for std::process::ExitCode {
    fn from(err: &QuantError) -> Self {
        let code: u8 = match err {
            QuantError::Io(_) => 1,
            QuantError::ConfigParse { .. } | QuantError::InvalidConfig { .. } => 2,
            QuantError::DataSource { .. } => 3,
            QuantError::InvalidInput { .. } => 4,
            QuantError::InsufficientData { .. } | QuantError::NoPositions => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message_names_symbol() {
        let err = QuantError::InsufficientData {
            symbol: "AAPL".into(),
            bars: 12,
            minimum: 50,
        };
        assert_eq!(
            err.to_string(),
            "not enough history for AAPL: have 12 bars, need 50"
        );
    }

    #[test]
    fn invalid_config_helper() {
        let err = QuantError::invalid_config("ema_fast", "must be positive");
        assert_eq!(err.to_string(), "invalid config value ema_fast: must be positive");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: QuantError = io.into();
        assert!(matches!(err, QuantError::Io(_)));
    }
}
