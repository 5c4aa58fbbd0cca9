//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `donors` - Donor operations (resolution, merge, discard)
//! - `donations` - Donation operations (charge-id lookup, upsert, review queue)

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod donations;
mod donors;


pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool, running migrations
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because each
    /// pooled connection would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!(
            "{}/alms_test_{}_{}.db",
            std::env::temp_dir().display(),
            std::process::id(),
            id
        );

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;

            -- Cache size: ~8MB (2000 pages * 4KB default page size)
            PRAGMA cache_size = 2000;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Store temp tables in memory
            PRAGMA temp_store = MEMORY;

            -- Donors (giving entities, identified by email)
            CREATE TABLE IF NOT EXISTS donors (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,  -- stored lowercase
                name TEXT,
                merged_into INTEGER REFERENCES donors(id),  -- canonical donor after merge
                discarded_at DATETIME,                      -- soft-discard marker
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_donors_merged_into ON donors(merged_into);

            -- Donations (one row per processor charge)
            CREATE TABLE IF NOT EXISTS donations (
                id INTEGER PRIMARY KEY,
                donor_id INTEGER NOT NULL REFERENCES donors(id),
                amount_cents INTEGER NOT NULL CHECK (amount_cents >= 0),
                date DATE NOT NULL,
                status TEXT NOT NULL DEFAULT 'succeeded',
                description TEXT,
                charge_id TEXT UNIQUE,                      -- idempotency key for re-imports
                subscription_id TEXT,
                customer_id TEXT,
                invoice_id TEXT,
                period_start DATE,                          -- subscription billing period
                period_end DATE,
                attention_reason TEXT,                      -- set when flagged for review
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_donations_donor ON donations(donor_id);
            CREATE INDEX IF NOT EXISTS idx_donations_charge ON donations(charge_id);
            CREATE INDEX IF NOT EXISTS idx_donations_subscription ON donations(subscription_id);
            CREATE INDEX IF NOT EXISTS idx_donations_date ON donations(date);
            CREATE INDEX IF NOT EXISTS idx_donations_status ON donations(status);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
