//! Command line administration for the Swiss tournament engine.

pub mod cli;
pub mod config;
pub mod logging;
