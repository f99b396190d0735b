//! Trait seams between the engine and its data/config sources.

pub mod data_port;
pub mod config_port;
