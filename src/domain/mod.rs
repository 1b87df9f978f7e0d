//! Core domain types and logic.

pub mod backtest;
pub mod black_scholes;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod linalg;
pub mod mean_reversion;
pub mod metrics;
pub mod optimizer;
pub mod parameters;
pub mod rolling;
pub mod series;
pub mod simulator;
pub mod stat_arb;
pub mod strategy;
