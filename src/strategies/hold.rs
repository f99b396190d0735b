//! Never trades. Net worth stays at the deposited capital.

use crate::domain::error::BacktestError;
use crate::domain::observation::Observation;
use crate::domain::strategy::{Strategy, TradeContext};
use crate::domain::trade::TradeRecord;

#[derive(Debug, Clone, Copy, Default)]
pub struct Hold;

impl Strategy for Hold {
    fn name(&self) -> &str {
        "hold"
    }

    fn on_observation(
        &mut self,
        _observation: &Observation,
        _ctx: &mut TradeContext<'_>,
    ) -> Result<Vec<TradeRecord>, BacktestError> {
        Ok(Vec::new())
    }
}
