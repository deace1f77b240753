//! # Swiss Tournament
//!
//! A Swiss-system tournament engine: it ranks competitors, resolves ties,
//! assigns byes fairly and pairs successive rounds, with any number of
//! tournaments kept apart in one store.
//!
//! ## Core Modules
//!
//! - [`tournament`]: models, standings, bye allocation, pairing and the
//!   [`TournamentManager`] exposing every operation
//! - [`db`]: the store abstraction, with PostgreSQL and in-memory stores
//! - [`security`]: sanitization of player names
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use swiss_tournament::{MemoryTournamentStore, TournamentManager};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), swiss_tournament::TournamentError> {
//! let manager = TournamentManager::new(Arc::new(MemoryTournamentStore::new()));
//! let tournament = manager.create_tournament().await?;
//! manager.register_player("Ramza", Some(tournament)).await?;
//! assert_eq!(manager.count_active_players(Some(tournament)).await?, 1);
//! # Ok(())
//! # }
//! ```

/// Store abstraction, PostgreSQL pool and configuration.
pub mod db;
pub use db::{Database, DatabaseConfig, MemoryTournamentStore, PgTournamentStore};

/// Input sanitization.
pub mod security;

/// Tournament logic and models.
pub mod tournament;
pub use tournament::{
    ByePolicy, EngineConfig, Pairing, PlayerId, Standing, TournamentError, TournamentId,
    TournamentManager, TournamentResult,
};
