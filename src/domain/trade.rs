//! Executed trade records.

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

use super::error::BacktestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = BacktestError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            _ => Err(BacktestError::InvalidTradeRecord {
                action: s.to_string(),
            }),
        }
    }
}

/// One executed buy or sell. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    ticker: String,
    action: Action,
    price: f64,
    amount: f64,
    timestamp: NaiveDateTime,
}

impl TradeRecord {
    /// Build a record from a textual action such as `"buy"` or `"SELL"`.
    pub fn new(
        ticker: impl Into<String>,
        action: &str,
        price: f64,
        amount: f64,
        timestamp: NaiveDateTime,
    ) -> Result<Self, BacktestError> {
        let action = action.parse::<Action>()?;
        Self::with_action(ticker, action, price, amount, timestamp)
    }

    /// Price and amount must both be finite and positive.
    pub fn with_action(
        ticker: impl Into<String>,
        action: Action,
        price: f64,
        amount: f64,
        timestamp: NaiveDateTime,
    ) -> Result<Self, BacktestError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(BacktestError::InvalidOrder {
                reason: format!("trade price must be positive, got {price}"),
            });
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(BacktestError::InvalidOrder {
                reason: format!("trade amount must be positive, got {amount}"),
            });
        }
        Ok(TradeRecord {
            ticker: ticker.into(),
            action,
            price,
            amount,
            timestamp,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// price * amount
    pub fn notional(&self) -> f64 {
        self.price * self.amount
    }

    /// Row for the CSV trade log: timestamp, action, ticker, amount, price.
    pub fn to_row(&self) -> [String; 5] {
        [
            self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            self.action.to_string(),
            self.ticker.clone(),
            format!("{}", self.amount),
            format!("{}", self.price),
        ]
    }
}

impl fmt::Display for TradeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {:.3} {} @ ${:.3}",
            self.timestamp, self.action, self.amount, self.ticker, self.price
        )
    }
}
