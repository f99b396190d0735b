//! Core engine types and logic.

pub mod observation;
pub mod trade;
pub mod ledger;
pub mod strategy;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
