//! Compute module - Mutation distributions, selection and the MOCMA engine.

mod chromosome;
mod distribution;
mod error;
mod mocma;

pub mod indicator;

pub use chromosome::*;
pub use distribution::*;
pub use error::*;
pub use indicator::{HypervolumeIndicator, Indicator, Ranking, SelectionError};
pub use mocma::*;
