//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for contango.
///
/// Data absence (no trading day, no dominant contract, too few ranked
/// instruments) is never an error; it travels as `Option::None` or an empty
/// table. Everything here aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum ContangoError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

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

    #[error("strategy {name} is already registered")]
    DuplicateStrategy { name: String },

    #[error("event references unregistered strategy {name}")]
    UnregisteredStrategy { name: String },

    #[error("price field {field:?} missing from latest {symbol} record")]
    MissingPriceField { symbol: String, field: String },

    #[error("unknown rollover rule {value:?}")]
    UnknownRule { value: String },

    #[error("no market data seen for {symbol} on {trading_day}")]
    NoMarketData {
        symbol: String,
        trading_day: NaiveDate,
    },

    #[error("fill references unknown order #{index}")]
    UnknownOrder { index: u64 },

    #[error("unknown signal kind {value:?}")]
    UnknownSignal { value: String },

    #[error(
        "close fill of {quantity} for {strategy}/{symbol} exceeds held {held} (order #{index})"
    )]
    PositionUnderflow {
        strategy: String,
        symbol: String,
        index: u64,
        quantity: u64,
        held: u64,
    },

    #[error("fill for order #{index} is {actual}, order is {expected}")]
    FillMismatch {
        index: u64,
        expected: String,
        actual: String,
    },

    #[error("fill of {quantity} overfills order #{index}: {filled} of {ordered} already filled")]
    Overfill {
        index: u64,
        quantity: u64,
        filled: u64,
        ordered: u64,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ContangoError {
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            ContangoError::ConfigParse { .. }
                | ContangoError::ConfigMissing { .. }
                | ContangoError::ConfigInvalid { .. }
                | ContangoError::DuplicateStrategy { .. }
                | ContangoError::UnregisteredStrategy { .. }
                | ContangoError::MissingPriceField { .. }
                | ContangoError::UnknownRule { .. }
        )
    }

    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            ContangoError::NoMarketData { .. }
                | ContangoError::UnknownOrder { .. }
                | ContangoError::UnknownSignal { .. }
                | ContangoError::PositionUnderflow { .. }
                | ContangoError::FillMismatch { .. }
                | ContangoError::Overfill { .. }
        )
    }
}

impl From<&ContangoError> for std::process::ExitCode {
    fn from(err: &ContangoError) -> Self {
        let code: u8 = match err {
            ContangoError::Io(_) => 1,
            ContangoError::ConfigParse { .. }
            | ContangoError::ConfigMissing { .. }
            | ContangoError::ConfigInvalid { .. }
            | ContangoError::DuplicateStrategy { .. }
            | ContangoError::UnregisteredStrategy { .. }
            | ContangoError::MissingPriceField { .. }
            | ContangoError::UnknownRule { .. } => 2,
            ContangoError::Database { .. } | ContangoError::DatabaseQuery { .. } => 3,
            ContangoError::NoMarketData { .. }
            | ContangoError::UnknownOrder { .. }
            | ContangoError::UnknownSignal { .. }
            | ContangoError::PositionUnderflow { .. }
            | ContangoError::FillMismatch { .. }
            | ContangoError::Overfill { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_classified() {
        let err = ContangoError::DuplicateStrategy { name: "ma".into() };
        assert!(err.is_config());
        assert!(!err.is_protocol_violation());
    }

    #[test]
    fn protocol_violations_are_classified() {
        let err = ContangoError::UnknownOrder { index: 7 };
        assert!(err.is_protocol_violation());
        assert!(!err.is_config());
        assert_eq!(err.to_string(), "fill references unknown order #7");
    }

    #[test]
    fn overfill_message_carries_quantities() {
        let err = ContangoError::Overfill {
            index: 3,
            quantity: 50,
            filled: 1,
            ordered: 2,
        };
        assert!(err.is_protocol_violation());
        assert_eq!(
            err.to_string(),
            "fill of 50 overfills order #3: 1 of 2 already filled"
        );
    }

    #[test]
    fn missing_price_field_message() {
        let err = ContangoError::MissingPriceField {
            symbol: "rb1705".into(),
            field: "settle".into(),
        };
        assert_eq!(
            err.to_string(),
            "price field \"settle\" missing from latest rb1705 record"
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::other("boom");
        let err: ContangoError = io.into();
        assert!(matches!(err, ContangoError::Io(_)));
    }
}
