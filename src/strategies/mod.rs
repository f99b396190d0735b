//! Concrete decision-hook implementations.

pub mod drunk_monkey;
pub mod hold;

use std::str::FromStr;

use crate::domain::error::BacktestError;
use crate::domain::strategy::Strategy;
use drunk_monkey::{DrunkMonkey, DEFAULT_BUY_PROBABILITY};
use hold::Hold;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    #[default]
    DrunkMonkey,
    Hold,
}

impl FromStr for StrategyKind {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "drunk_monkey" | "monkey" | "random" => Ok(StrategyKind::DrunkMonkey),
            "hold" => Ok(StrategyKind::Hold),
            other => Err(BacktestError::ConfigInvalid {
                section: "strategy".into(),
                key: "name".into(),
                reason: format!("unknown strategy `{other}` (expected drunk_monkey or hold)"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategySettings {
    pub kind: StrategyKind,
    pub buy_probability: f64,
    pub seed: Option<u64>,
}

impl Default for StrategySettings {
    fn default() -> Self {
        StrategySettings {
            kind: StrategyKind::DrunkMonkey,
            buy_probability: DEFAULT_BUY_PROBABILITY,
            seed: None,
        }
    }
}

pub fn build_strategy(settings: &StrategySettings) -> Result<Box<dyn Strategy>, BacktestError> {
    match settings.kind {
        StrategyKind::DrunkMonkey => {
            let monkey = match settings.seed {
                Some(seed) => DrunkMonkey::seeded(settings.buy_probability, seed)?,
                None => DrunkMonkey::new(settings.buy_probability)?,
            };
            Ok(Box::new(monkey))
        }
        StrategyKind::Hold => Ok(Box::new(Hold)),
    }
}
