//! Tournament error types.

use super::models::{PlayerId, TournamentId};
use crate::db::timeouts::{COMMIT_OPERATION, TimeoutError};
use std::time::Duration;
use thiserror::Error;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Tournament does not exist
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    /// Player does not exist
    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),

    /// Player is not attached to the tournament
    #[error("Player {player_id} is not registered in tournament {tournament_id}")]
    MembershipNotFound {
        tournament_id: TournamentId,
        player_id: PlayerId,
    },

    /// Player is already attached to the tournament
    #[error("Player {player_id} is already registered in tournament {tournament_id}")]
    AlreadyAttached {
        tournament_id: TournamentId,
        player_id: PlayerId,
    },

    /// Player already holds a bye while others are still eligible
    #[error("Player {0} has already received a bye")]
    ByeAlreadyAwarded(PlayerId),

    /// Every active player holds a bye and the policy forbids repeats
    #[error("No active player in tournament {0} is eligible for a bye")]
    NoByeEligible(TournamentId),

    /// A match needs two different players
    #[error("A player cannot be matched against themselves: {0}")]
    SamePlayer(PlayerId),

    /// Name empty after sanitization
    #[error("Invalid player name: {0}")]
    InvalidName(String),

    /// Logic defect detected; nothing was persisted
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// Store error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store did not answer in time
    #[error("Database operation {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Commit was sent but no answer arrived; the work may or may not be stored
    #[error("Commit outcome unknown after {0:?}")]
    CommitOutcomeUnknown(Duration),
}

impl From<TimeoutError> for TournamentError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout {
                operation: COMMIT_OPERATION,
                after,
            } => TournamentError::CommitOutcomeUnknown(after),
            TimeoutError::Timeout { operation, after } => {
                TournamentError::Timeout { operation, after }
            }
            TimeoutError::Database(e) => TournamentError::Database(e),
        }
    }
}

impl TournamentError {
    /// Whether the failure came from the store and the whole operation may be retried
    ///
    /// Retrying is left to the caller. A commit that timed out is never
    /// transient: replaying it could record the same result twice.
    pub fn is_transient(&self) -> bool {
        match self {
            TournamentError::Timeout { .. } => true,
            TournamentError::CommitOutcomeUnknown(_) => false,
            TournamentError::Database(e) => match e {
                sqlx::Error::Io(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::WorkerCrashed => true,
                // serialization_failure, deadlock_detected, lock_not_available
                sqlx::Error::Database(db) => matches!(
                    db.code().as_deref(),
                    Some("40001") | Some("40P01") | Some("55P03")
                ),
                _ => false,
            },
            _ => false,
        }
    }

    /// Whether the caller asked for something that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TournamentError::TournamentNotFound(_)
                | TournamentError::PlayerNotFound(_)
                | TournamentError::MembershipNotFound { .. }
        )
    }

    /// Get a client-safe error message that doesn't leak store internals
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_) => "Internal server error".to_string(),
            TournamentError::InvariantViolation(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
