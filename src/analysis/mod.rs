//! Analysis modules.
//!
//! Statistics, size categories and rankings over the cleaned table.

pub mod aggregator;

pub use aggregator::*;
