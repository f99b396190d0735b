//! Decision-hook trait implemented by every concrete strategy.

use super::error::BacktestError;
use super::ledger::Ledger;
use super::observation::Observation;
use super::trade::{Action, TradeRecord};

/// A strategy maps each observation to zero or more trades.
///
/// Trades are placed through the [`TradeContext`], which applies them to the
/// ledger immediately; a later decision in the same call sees the updated
/// balances. The returned records are what the caller is shown for the step.
pub trait Strategy {
    fn name(&self) -> &str;

    fn on_observation(
        &mut self,
        observation: &Observation,
        ctx: &mut TradeContext<'_>,
    ) -> Result<Vec<TradeRecord>, BacktestError>;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn on_observation(
        &mut self,
        observation: &Observation,
        ctx: &mut TradeContext<'_>,
    ) -> Result<Vec<TradeRecord>, BacktestError> {
        (**self).on_observation(observation, ctx)
    }
}

/// What a strategy may see and do during one step.
pub struct TradeContext<'a> {
    ledger: &'a mut Ledger,
    tickers: &'a [String],
}

impl<'a> TradeContext<'a> {
    pub fn new(ledger: &'a mut Ledger, tickers: &'a [String]) -> Self {
        TradeContext { ledger, tickers }
    }

    /// Every symbol known to the data source.
    pub fn tickers(&self) -> &[String] {
        self.tickers
    }

    pub fn ledger(&self) -> &Ledger {
        &*self.ledger
    }

    pub fn balance(&self, ticker: &str) -> f64 {
        self.ledger.balance(ticker)
    }

    pub fn base_balance(&self) -> f64 {
        self.ledger.base_balance()
    }

    pub fn buy(
        &mut self,
        ticker: &str,
        price: f64,
        amount: f64,
        observation: &Observation,
    ) -> Result<TradeRecord, BacktestError> {
        self.ledger.apply_buy(ticker, price, amount)?;
        TradeRecord::with_action(ticker, Action::Buy, price, amount, observation.timestamp)
    }

    pub fn sell(
        &mut self,
        ticker: &str,
        price: f64,
        amount: f64,
        observation: &Observation,
    ) -> Result<TradeRecord, BacktestError> {
        self.ledger.apply_sell(ticker, price, amount)?;
        TradeRecord::with_action(ticker, Action::Sell, price, amount, observation.timestamp)
    }
}
