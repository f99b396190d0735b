//! backtester — event-driven replay of trading strategies over historical data.
//!
//! Hexagonal architecture: engine logic in [`domain`], port traits in [`ports`],
//! concrete data and config sources in [`adapters`], decision hooks in
//! [`strategies`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod strategies;
pub mod cli;
