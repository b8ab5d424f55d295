//! Statistics generation from the sweep database

use crate::storage::SqliteStore;
use crate::SweepError;

/// Sweep statistics summary
#[derive(Debug, Clone)]
pub struct SweepStatistics {
    /// Total settled (provider, url) verdicts
    pub total_results: u64,

    /// Settled verdicts that are expired
    pub expired_results: u64,

    /// Per-provider breakdown: (provider, total, expired)
    pub by_provider: Vec<(String, u64, u64)>,

    /// Completed (keyword, provider) pairs
    pub done_pairs: u64,
}

/// Loads statistics from the store
pub fn load_statistics(store: &SqliteStore) -> Result<SweepStatistics, SweepError> {
    Ok(SweepStatistics {
        total_results: store.count_results(false)?,
        expired_results: store.count_results(true)?,
        by_provider: store.results_by_provider()?,
        done_pairs: store.count_done_pairs()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &SweepStatistics) {
    println!("=== Sweep Statistics ===\n");

    println!("Overview:");
    println!("  Settled results: {}", stats.total_results);
    println!("  Expired results: {}", stats.expired_results);
    println!("  Completed (keyword, provider) pairs: {}", stats.done_pairs);
    println!();

    if !stats.by_provider.is_empty() {
        println!("By Provider:");
        for (provider, total, expired) in &stats.by_provider {
            let percentage = if *total > 0 {
                (*expired as f64 / *total as f64) * 100.0
            } else {
                0.0
            };
            println!(
                "  {}: {} settled, {} expired ({:.1}%)",
                provider, total, expired, percentage
            );
        }
        println!();
    }
}
