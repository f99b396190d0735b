//! In-memory data adapter.
//!
//! Also the normalized store behind [`CsvAdapter`](super::csv_adapter::CsvAdapter):
//! observations are validated, sorted by `(timestamp, symbol)` and
//! de-duplicated once, after which every query is a slice lookup.

use crate::domain::error::BacktestError;
use crate::domain::ledger::BASE;
use crate::domain::observation::Observation;
use crate::ports::data_port::{check_range, DataPort};
use chrono::NaiveDateTime;
use log::{info, warn};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    observations: Vec<Observation>,
    tickers: Vec<String>,
}

impl MemoryAdapter {
    pub fn new(observations: Vec<Observation>) -> Result<Self, BacktestError> {
        for obs in &observations {
            validate_observation(obs)?;
        }

        let mut observations = observations;
        observations.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });

        let before = observations.len();
        observations.dedup_by(|later, earlier| {
            later.timestamp == earlier.timestamp && later.symbol == earlier.symbol
        });
        let dropped = before - observations.len();
        if dropped > 0 {
            warn!("dropped {dropped} duplicate (symbol, timestamp) rows");
        }

        let tickers: BTreeSet<String> = observations.iter().map(|o| o.symbol.clone()).collect();
        info!(
            "loaded {} observations across {} tickers",
            observations.len(),
            tickers.len()
        );

        Ok(MemoryAdapter {
            observations,
            tickers: tickers.into_iter().collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// The full normalized dataset.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }
}

fn validate_observation(obs: &Observation) -> Result<(), BacktestError> {
    if obs.symbol.trim().is_empty() {
        return Err(BacktestError::DataLoad {
            reason: format!("empty symbol at {}", obs.timestamp),
        });
    }
    if obs.symbol == BASE {
        return Err(BacktestError::DataLoad {
            reason: format!("symbol {BASE} is reserved for the settlement currency"),
        });
    }
    if !obs.close.is_finite() || obs.close <= 0.0 {
        return Err(BacktestError::DataLoad {
            reason: format!(
                "close for {} at {} must be positive, got {}",
                obs.symbol, obs.timestamp, obs.close
            ),
        });
    }
    Ok(())
}

impl DataPort for MemoryAdapter {
    fn tickers(&self) -> Vec<String> {
        self.tickers.clone()
    }

    fn range(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Observation>, BacktestError> {
        check_range(start, end)?;
        let Some((first, last, _)) = self.span() else {
            return Ok(Vec::new());
        };
        let start = start.unwrap_or(first);
        let end = end.unwrap_or(last);

        let lo = self.observations.partition_point(|o| o.timestamp < start);
        let hi = self.observations.partition_point(|o| o.timestamp <= end);
        if lo >= hi {
            return Ok(Vec::new());
        }
        Ok(self.observations[lo..hi].to_vec())
    }

    fn span(&self) -> Option<(NaiveDateTime, NaiveDateTime, usize)> {
        let first = self.observations.first()?;
        let last = self.observations.last()?;
        Some((first.timestamp, last.timestamp, self.observations.len()))
    }
}
