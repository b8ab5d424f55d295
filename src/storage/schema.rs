//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the stalesweep database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Completion state per (keyword, provider) pair
CREATE TABLE IF NOT EXISTS progress (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword TEXT NOT NULL,
    provider TEXT NOT NULL,
    is_done INTEGER NOT NULL DEFAULT 0,
    last_updated TEXT NOT NULL,
    UNIQUE(keyword, provider)
);

-- One liveness verdict per (provider, url); never deleted
CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword TEXT NOT NULL,
    provider TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    is_expired INTEGER NOT NULL,
    last_updated TEXT NOT NULL,
    UNIQUE(provider, url)
);

CREATE INDEX IF NOT EXISTS idx_results_provider_url ON results(provider, url);
CREATE INDEX IF NOT EXISTS idx_results_keyword_title ON results(provider, keyword, title);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
