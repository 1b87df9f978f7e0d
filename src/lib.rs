//! quantlab: quantitative analytics for strategy backtests, parameter sweeps,
//! pairs trading, mean-variance allocation and option pricing.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], and the command-line front end
//! in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
