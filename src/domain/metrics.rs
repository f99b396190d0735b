//! Run summary statistics built from progress records.

use super::backtest::{Phase, Progress};
use super::trade::Action;

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub initial_capital: f64,
    pub final_net_worth: f64,
    pub peak_net_worth: f64,
    pub max_drawdown: f64,
    pub steps: usize,
    pub buys: usize,
    pub sells: usize,
    pub liquidation_sells: usize,
}

impl RunSummary {
    pub fn new(initial_capital: f64) -> Self {
        RunSummary {
            initial_capital,
            final_net_worth: initial_capital,
            peak_net_worth: initial_capital,
            max_drawdown: 0.0,
            steps: 0,
            buys: 0,
            sells: 0,
            liquidation_sells: 0,
        }
    }

    pub fn from_progress<'a, I>(initial_capital: f64, records: I) -> Self
    where
        I: IntoIterator<Item = &'a Progress>,
    {
        let mut summary = Self::new(initial_capital);
        for progress in records {
            summary.record(progress);
        }
        summary
    }

    pub fn record(&mut self, progress: &Progress) {
        match progress.phase {
            Phase::Step => {
                self.steps += 1;
                for trade in &progress.trades {
                    match trade.action() {
                        Action::Buy => self.buys += 1,
                        Action::Sell => self.sells += 1,
                    }
                }
            }
            Phase::Liquidation => self.liquidation_sells += progress.trades.len(),
        }

        let equity = progress.net_worth;
        self.final_net_worth = equity;
        if equity > self.peak_net_worth {
            self.peak_net_worth = equity;
        }
        if self.peak_net_worth > 0.0 {
            let drawdown = (self.peak_net_worth - equity) / self.peak_net_worth;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }
    }

    /// (final - initial) / initial
    pub fn total_return(&self) -> f64 {
        if self.initial_capital > 0.0 {
            (self.final_net_worth - self.initial_capital) / self.initial_capital
        } else {
            0.0
        }
    }

    pub fn total_trades(&self) -> usize {
        self.buys + self.sells + self.liquidation_sells
    }
}
