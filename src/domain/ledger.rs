//! Asset balances, trade legality and valuation.
//!
//! Balances are keyed by ticker with [`BASE`] holding the settlement
//! currency. Every mutation either applies fully or leaves the ledger
//! untouched, so no balance is ever negative.

use std::collections::BTreeMap;

use super::error::BacktestError;

/// Reserved symbol for the quote/settlement currency.
pub const BASE: &str = "BASE";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ledger {
    balances: BTreeMap<String, f64>,
    last_prices: BTreeMap<String, f64>,
}

impl Ledger {
    /// Empty ledger with a zero last price recorded for every known ticker.
    pub fn new<I, S>(tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut balances = BTreeMap::new();
        balances.insert(BASE.to_string(), 0.0);
        let last_prices = tickers
            .into_iter()
            .map(Into::into)
            .filter(|t: &String| t != BASE)
            .map(|t| (t, 0.0))
            .collect();
        Ledger {
            balances,
            last_prices,
        }
    }

    /// Ledger seeded with `capital` in [`BASE`].
    pub fn with_capital<I, S>(capital: f64, tickers: I) -> Result<Self, BacktestError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ledger = Self::new(tickers);
        ledger.deposit_base(capital)?;
        Ok(ledger)
    }

    pub fn deposit_base(&mut self, amount: f64) -> Result<(), BacktestError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(BacktestError::InvalidOrder {
                reason: format!("deposit must be a non-negative finite amount, got {amount}"),
            });
        }
        *self.balances.entry(BASE.to_string()).or_insert(0.0) += amount;
        Ok(())
    }

    /// Spend `price * amount` of [`BASE`] for `amount` units of `ticker`.
    pub fn apply_buy(&mut self, ticker: &str, price: f64, amount: f64) -> Result<(), BacktestError> {
        validate_order(ticker, price, amount)?;
        let cost = price * amount;
        let available = self.balance(BASE);
        if cost > available {
            return Err(BacktestError::InsufficientFunds {
                ticker: ticker.to_string(),
                cost,
                available,
            });
        }
        self.balances.insert(BASE.to_string(), available - cost);
        *self.balances.entry(ticker.to_string()).or_insert(0.0) += amount;
        Ok(())
    }

    /// Sell `amount` units of `ticker` for `price * amount` of [`BASE`].
    pub fn apply_sell(&mut self, ticker: &str, price: f64, amount: f64) -> Result<(), BacktestError> {
        validate_order(ticker, price, amount)?;
        let available = self.balance(ticker);
        if amount > available {
            return Err(BacktestError::InsufficientAsset {
                ticker: ticker.to_string(),
                requested: amount,
                available,
            });
        }
        self.balances.insert(ticker.to_string(), available - amount);
        *self.balances.entry(BASE.to_string()).or_insert(0.0) += price * amount;
        Ok(())
    }

    /// Record the latest observed price. Valuation only; never consulted for
    /// trade legality.
    pub fn mark_price(&mut self, ticker: &str, price: f64) {
        if ticker == BASE {
            return;
        }
        self.last_prices.insert(ticker.to_string(), price);
    }

    /// Zero out a holding without proceeds. Returns the amount removed.
    pub fn write_off(&mut self, ticker: &str) -> f64 {
        if ticker == BASE {
            return 0.0;
        }
        match self.balances.get_mut(ticker) {
            Some(balance) => std::mem::replace(balance, 0.0),
            None => 0.0,
        }
    }

    pub fn balance(&self, ticker: &str) -> f64 {
        self.balances.get(ticker).copied().unwrap_or(0.0)
    }

    pub fn base_balance(&self) -> f64 {
        self.balance(BASE)
    }

    /// Last marked price; unmarked tickers are valued at 0.
    pub fn last_price(&self, ticker: &str) -> f64 {
        self.last_prices.get(ticker).copied().unwrap_or(0.0)
    }

    /// All balances including [`BASE`], in ticker order.
    pub fn balances(&self) -> &BTreeMap<String, f64> {
        &self.balances
    }

    /// Non-BASE tickers with a positive balance, in ticker order.
    pub fn holdings(&self) -> Vec<(String, f64)> {
        self.balances
            .iter()
            .filter(|(ticker, amount)| ticker.as_str() != BASE && **amount > 0.0)
            .map(|(ticker, amount)| (ticker.clone(), *amount))
            .collect()
    }

    pub fn net_worth(&self) -> f64 {
        let holdings_value: f64 = self
            .balances
            .iter()
            .filter(|(ticker, _)| ticker.as_str() != BASE)
            .map(|(ticker, amount)| amount * self.last_price(ticker))
            .sum();
        self.base_balance() + holdings_value
    }
}

fn validate_order(ticker: &str, price: f64, amount: f64) -> Result<(), BacktestError> {
    if ticker == BASE {
        return Err(BacktestError::InvalidOrder {
            reason: format!("{BASE} cannot be traded against itself"),
        });
    }
    if !price.is_finite() || price <= 0.0 {
        return Err(BacktestError::InvalidOrder {
            reason: format!("price must be positive, got {price}"),
        });
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(BacktestError::InvalidOrder {
            reason: format!("amount must be positive, got {amount}"),
        });
    }
    Ok(())
}
