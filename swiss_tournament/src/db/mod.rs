//! Database module providing PostgreSQL connection pooling and the tournament stores.
//!
//! The engine talks to its store only through [`TournamentStore`]; one call to
//! [`TournamentStore::begin`] is one atomic unit of work.

use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod config;
pub mod memory;
pub mod store;
pub mod timeouts;

pub use config::DatabaseConfig;
pub use memory::MemoryTournamentStore;
pub use store::{LockMode, PgTournamentStore, StoreTransaction, TournamentStore};

const SCHEMA: &str = include_str!("schema.sql");

/// Connection pool plus the per-query deadline handed to stores
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    query_timeout: Duration,
}

impl Database {
    /// Open a pool sized and timed by `config`
    ///
    /// ```no_run
    /// use swiss_tournament::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let db = Database::new(&DatabaseConfig::from_env()).await?;
    ///     db.apply_schema().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        log::info!(
            "Connecting to {} (pool {}..={})",
            redact_url(&config.database_url),
            config.min_connections,
            config.max_connections
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self {
            pool,
            query_timeout: config.query_timeout(),
        })
    }

    /// Underlying pool, for statements outside the store
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Tournament store backed by this pool
    pub fn store(&self) -> PgTournamentStore {
        PgTournamentStore::new(Arc::new(self.pool.clone()), self.query_timeout)
    }

    /// Create the tournament tables if they do not exist yet
    pub async fn apply_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        log::info!("Tournament schema applied");
        Ok(())
    }

    /// Whether the tournament tables exist
    pub async fn schema_present(&self) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT to_regclass('match_results') IS NOT NULL AS present")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("present"))
    }

    /// Round-trip a trivial query, returning its latency
    pub async fn health_check(&self) -> Result<Duration, sqlx::Error> {
        let started = Instant::now();
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(started.elapsed())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Connection URL with any password replaced, for logging
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.split_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            if credentials.contains(':') {
                format!("{scheme}://{user}:***@{host}")
            } else {
                format!("{scheme}://{user}@{host}")
            }
        }
        None => url.to_string(),
    }
}
