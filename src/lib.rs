//! A parallel simulation of the Monty Hall problem.
//!
//! Workers play independent trials with a player that always switches doors, flushing their
//! tallies into shared atomic counters while a telemetry loop samples them to report throughput
//! and convergence towards the expected 2/3 win rate.

pub mod config;
pub mod entropy;
pub mod error;
pub mod execution;
pub mod runner;
pub mod storage;
pub mod telemetry;
pub mod trial;

pub use config::SimConfig;
pub use error::{Result, SimErr};
pub use runner::{RunSummary, run};
