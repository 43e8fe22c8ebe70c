//! Unit conversion service
//!
//! Mass/volume conversion and cost-per-unit rebasing.

pub mod converter;
pub mod units;

pub use converter::{convert, convert_str, same_dimension, same_dimension_str, unit_cost_in};
pub use units::{ConversionError, Dimension, Unit};
