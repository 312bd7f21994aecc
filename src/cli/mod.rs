//! CLI layering: `commands` declare the arguments, `dispatch` maps parsed
//! matches to an `Action`, and `start` wires parsing, telemetry, and
//! dispatch together for the binary.

pub mod actions;
pub mod commands;
pub mod dispatch;
mod start;
pub mod telemetry;

pub use start::start;
