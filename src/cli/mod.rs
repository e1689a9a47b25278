//! Command-line interface wiring: argument parsing, telemetry setup,
//! and dispatch into the server action.

pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod start;
pub mod telemetry;

pub use start::start;
