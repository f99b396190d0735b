//! Backtest engine and replay loop.
//!
//! A [`Backtest`] is created with a strategy, a shared data source and an
//! initial capital. [`Backtest::execute`] consumes it and returns an
//! [`Execution`], a pull-based iterator yielding one [`Progress`] per
//! observation followed by a final liquidation record. A run cannot be
//! restarted; replaying requires a fresh `Backtest`.

use chrono::NaiveDateTime;
use log::{debug, error, info, warn};

use super::error::BacktestError;
use super::ledger::Ledger;
use super::observation::Observation;
use super::strategy::{Strategy, TradeContext};
use super::trade::{Action, TradeRecord};
use crate::ports::data_port::DataPort;

pub const DEFAULT_CAPITAL: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub capital: f64,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            capital: DEFAULT_CAPITAL,
            start: None,
            end: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Created,
    Running,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// One observation was processed.
    Step,
    /// End-of-run forced sale of every holding.
    Liquidation,
}

/// Emitted once per processed observation, then once for liquidation.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub index: usize,
    pub total: usize,
    pub trades: Vec<TradeRecord>,
    pub timestamp: NaiveDateTime,
    pub net_worth: f64,
    pub phase: Phase,
}

pub struct Backtest<'a, S> {
    strategy: S,
    ledger: Ledger,
    source: &'a dyn DataPort,
    tickers: Vec<String>,
}

impl<'a, S: Strategy> Backtest<'a, S> {
    pub fn new(strategy: S, source: &'a dyn DataPort, capital: f64) -> Result<Self, BacktestError> {
        let tickers = source.tickers();
        let ledger = Ledger::with_capital(capital, tickers.iter().cloned())?;
        Ok(Backtest {
            strategy,
            ledger,
            source,
            tickers,
        })
    }

    pub fn from_config(
        strategy: S,
        source: &'a dyn DataPort,
        config: &BacktestConfig,
    ) -> Result<Execution<S>, BacktestError> {
        Self::new(strategy, source, config.capital)?.execute(config.start, config.end)
    }

    pub fn state(&self) -> RunState {
        RunState::Created
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Start the run over `[start, end]`. Fails before anything is yielded
    /// if the window is inverted.
    pub fn execute(
        self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Execution<S>, BacktestError> {
        let mut observations = self.source.range(start, end)?;
        if !observations.is_sorted_by_key(|o| o.timestamp) {
            warn!("data source returned unordered observations; sorting by timestamp");
            observations.sort_by_key(|o| o.timestamp);
        }

        let total = observations.len();
        info!(
            "starting {} over {} observations ({} tickers, capital {:.2})",
            self.strategy.name(),
            total,
            self.tickers.len(),
            self.ledger.base_balance()
        );
        if total == 0 {
            warn!("selected window contains no observations");
        }

        Ok(Execution {
            strategy: self.strategy,
            ledger: self.ledger,
            tickers: self.tickers,
            observations: observations.into_iter(),
            index: 0,
            total,
            last_timestamp: None,
            state: RunState::Running,
        })
    }
}

/// A running backtest. Iterating drives the replay; dropping it early is
/// safe and leaves the ledger in its last consistent state.
pub struct Execution<S> {
    strategy: S,
    ledger: Ledger,
    tickers: Vec<String>,
    observations: std::vec::IntoIter<Observation>,
    index: usize,
    total: usize,
    last_timestamp: Option<NaiveDateTime>,
    state: RunState,
}

impl<S: Strategy> Execution<S> {
    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Drain the remaining steps, stopping at the first fatal error.
    pub fn finish(mut self) -> Result<Ledger, BacktestError> {
        for progress in self.by_ref() {
            progress?;
        }
        Ok(self.ledger)
    }

    fn step(&mut self, observation: Observation) -> Result<Progress, BacktestError> {
        let trades = {
            let mut ctx = TradeContext::new(&mut self.ledger, &self.tickers);
            self.strategy.on_observation(&observation, &mut ctx)?
        };
        self.ledger.mark_price(&observation.symbol, observation.close);
        self.last_timestamp = Some(observation.timestamp);

        let progress = Progress {
            index: self.index,
            total: self.total,
            trades,
            timestamp: observation.timestamp,
            net_worth: self.ledger.net_worth(),
            phase: Phase::Step,
        };
        self.index += 1;
        Ok(progress)
    }

    fn liquidate(&mut self, timestamp: NaiveDateTime) -> Result<Progress, BacktestError> {
        let mut trades = Vec::new();
        for (ticker, amount) in self.ledger.holdings() {
            let price = self.ledger.last_price(&ticker);
            if price > 0.0 {
                self.ledger.apply_sell(&ticker, price, amount)?;
                trades.push(TradeRecord::with_action(
                    ticker,
                    Action::Sell,
                    price,
                    amount,
                    timestamp,
                )?);
            } else {
                let removed = self.ledger.write_off(&ticker);
                warn!("writing off {removed} {ticker}: no observed price to liquidate at");
            }
        }

        let net_worth = self.ledger.net_worth();
        info!(
            "liquidated {} holdings; final net worth {:.2}",
            trades.len(),
            net_worth
        );
        Ok(Progress {
            index: self.total,
            total: self.total,
            trades,
            timestamp,
            net_worth,
            phase: Phase::Liquidation,
        })
    }
}

impl<S: Strategy> Iterator for Execution<S> {
    type Item = Result<Progress, BacktestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == RunState::Completed {
            return None;
        }

        let result = match self.observations.next() {
            Some(observation) => {
                debug!("step {}/{} {}", self.index + 1, self.total, observation.timestamp);
                self.step(observation)
            }
            None => {
                self.state = RunState::Completed;
                let timestamp = self.last_timestamp?;
                self.liquidate(timestamp)
            }
        };

        if let Err(ref e) = result {
            error!("{} aborted at step {}: {e}", self.strategy.name(), self.index);
            self.state = RunState::Completed;
        }
        Some(result)
    }
}

impl<S: Strategy> std::iter::FusedIterator for Execution<S> {}
