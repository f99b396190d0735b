//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for the backtester.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("insufficient funds to buy {ticker}: cost {cost:.6} exceeds BASE balance {available:.6}")]
    InsufficientFunds {
        ticker: String,
        cost: f64,
        available: f64,
    },

    #[error("insufficient {ticker} to sell: requested {requested:.6}, held {available:.6}")]
    InsufficientAsset {
        ticker: String,
        requested: f64,
        available: f64,
    },

    #[error("invalid trade action `{action}`: must be BUY or SELL")]
    InvalidTradeRecord { action: String },

    #[error("invalid order: {reason}")]
    InvalidOrder { reason: String },

    #[error("data load error: {reason}")]
    DataLoad { reason: String },

    #[error("no data in {source_name}")]
    NoData { source_name: String },

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

impl BacktestError {
    /// Trade-legality violations raised by the ledger.
    pub fn is_solvency_violation(&self) -> bool {
        matches!(
            self,
            BacktestError::InsufficientFunds { .. } | BacktestError::InsufficientAsset { .. }
        )
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) => 1,
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::ConfigInvalid { .. } => 2,
            BacktestError::DataLoad { .. } | BacktestError::NoData { .. } => 3,
            BacktestError::InvalidDateRange { .. } => 4,
            BacktestError::InsufficientFunds { .. }
            | BacktestError::InsufficientAsset { .. }
            | BacktestError::InvalidTradeRecord { .. }
            | BacktestError::InvalidOrder { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn date_range_message_names_both_bounds() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let err = BacktestError::InvalidDateRange { start, end };
        let msg = err.to_string();
        assert!(msg.contains("2024-02-01"));
        assert!(msg.contains("2024-01-01"));
    }

    #[test]
    fn solvency_violations_are_classified() {
        let funds = BacktestError::InsufficientFunds {
            ticker: "X".into(),
            cost: 2000.0,
            available: 1000.0,
        };
        let asset = BacktestError::InsufficientAsset {
            ticker: "X".into(),
            requested: 5.0,
            available: 1.0,
        };
        let order = BacktestError::InvalidOrder {
            reason: "price must be positive".into(),
        };
        assert!(funds.is_solvency_violation());
        assert!(asset.is_solvency_violation());
        assert!(!order.is_solvency_violation());
    }

    #[test]
    fn trade_record_message_quotes_action() {
        let err = BacktestError::InvalidTradeRecord {
            action: "HOLD".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid trade action `HOLD`: must be BUY or SELL"
        );
    }
}
