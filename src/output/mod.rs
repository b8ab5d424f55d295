//! Output module for reporting sweep state
//!
//! Reads aggregate numbers back out of the stores for the `--stats` mode.

mod stats;

pub use stats::{load_statistics, print_statistics, SweepStatistics};
