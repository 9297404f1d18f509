//! Analysis modules.
//!
//! Merge, duplicate detection, throughput and timeline computation over
//! loaded result tables.

pub mod aggregator;

pub use aggregator::*;
