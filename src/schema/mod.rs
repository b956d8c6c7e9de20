//! Schema module - Configuration and result types for the MOCMA optimizer.

mod config;
mod problem;
mod solution;

pub use config::*;
pub use problem::*;
pub use solution::*;
