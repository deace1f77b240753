//! Query deadlines for the PostgreSQL store.
//!
//! Each round-trip is labelled with the store operation it belongs to, so a
//! stuck lock shows up in the logs by name.

use log::warn;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Default deadline for a single query (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Label used for transaction commits
pub const COMMIT_OPERATION: &str = "commit";

/// Error type for bounded queries
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    /// Deadline passed before the query finished
    #[error("Database operation {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Query finished with an error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for bounded queries
pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Run `future` with a deadline
///
/// `operation` names the store call for logs and errors.
pub async fn with_timeout<F, T>(
    deadline: Duration,
    operation: &'static str,
    future: F,
) -> TimeoutResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(deadline, future).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            warn!("Store operation {operation} exceeded {deadline:?}");
            Err(TimeoutError::Timeout {
                operation,
                after: deadline,
            })
        }
    }
}
