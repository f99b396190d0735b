//! Random-trading baseline.
//!
//! On each observation, with probability `buy_probability` it spends a random
//! fraction of the BASE balance on a random known ticker; otherwise it sells a
//! random fraction of every holding. All fills are at the observation's close.
//! Useful as a plumbing check and as a lower-bound benchmark.

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::domain::error::BacktestError;
use crate::domain::observation::Observation;
use crate::domain::strategy::{Strategy, TradeContext};
use crate::domain::trade::TradeRecord;

pub const DEFAULT_BUY_PROBABILITY: f64 = 0.5;

pub struct DrunkMonkey<R = StdRng> {
    rng: R,
    buy_probability: f64,
}

impl DrunkMonkey<StdRng> {
    pub fn new(buy_probability: f64) -> Result<Self, BacktestError> {
        Self::with_rng(StdRng::from_entropy(), buy_probability)
    }

    /// Reproducible runs: the same seed over the same data yields the same trades.
    pub fn seeded(buy_probability: f64, seed: u64) -> Result<Self, BacktestError> {
        Self::with_rng(StdRng::seed_from_u64(seed), buy_probability)
    }
}

impl<R: Rng> DrunkMonkey<R> {
    pub fn with_rng(rng: R, buy_probability: f64) -> Result<Self, BacktestError> {
        if !(0.0..=1.0).contains(&buy_probability) {
            return Err(BacktestError::ConfigInvalid {
                section: "strategy".into(),
                key: "buy_probability".into(),
                reason: format!("must be between 0 and 1, got {buy_probability}"),
            });
        }
        Ok(DrunkMonkey {
            rng,
            buy_probability,
        })
    }

    pub fn buy_probability(&self) -> f64 {
        self.buy_probability
    }

    fn buy_random(
        &mut self,
        observation: &Observation,
        ctx: &mut TradeContext<'_>,
    ) -> Result<Option<TradeRecord>, BacktestError> {
        let base = ctx.base_balance();
        if base <= 0.0 {
            return Ok(None);
        }
        let Some(ticker) = ctx.tickers().choose(&mut self.rng).cloned() else {
            return Ok(None);
        };

        let price = observation.close;
        let fraction: f64 = self.rng.r#gen();
        let mut amount = fraction * base / price;
        if price * amount > base {
            amount = base / price;
        }
        if amount <= 0.0 || price * amount > base {
            debug!("skipping buy of {ticker}: amount {amount} not fillable");
            return Ok(None);
        }
        ctx.buy(&ticker, price, amount, observation).map(Some)
    }

    fn sell_random(
        &mut self,
        observation: &Observation,
        ctx: &mut TradeContext<'_>,
    ) -> Result<Vec<TradeRecord>, BacktestError> {
        let mut trades = Vec::new();
        for (ticker, held) in ctx.ledger().holdings() {
            let amount = self.rng.r#gen::<f64>() * held;
            if amount <= 0.0 {
                debug!("skipping zero-size sell of {ticker}");
                continue;
            }
            trades.push(ctx.sell(&ticker, observation.close, amount, observation)?);
        }
        Ok(trades)
    }
}

impl<R: Rng> Strategy for DrunkMonkey<R> {
    fn name(&self) -> &str {
        "drunk_monkey"
    }

    fn on_observation(
        &mut self,
        observation: &Observation,
        ctx: &mut TradeContext<'_>,
    ) -> Result<Vec<TradeRecord>, BacktestError> {
        if self.rng.gen_bool(self.buy_probability) {
            Ok(self.buy_random(observation, ctx)?.into_iter().collect())
        } else {
            self.sell_random(observation, ctx)
        }
    }
}
