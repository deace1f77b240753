//! Swiss-system tournament module.
//!
//! This module provides:
//! - Tournament creation and default-tournament resolution
//! - Player registration, attachment and deactivation
//! - An append-only match log (wins, draws, byes)
//! - Standings with an opponent-strength tie-break
//! - Bye allocation and adjacent-rank pairing
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use swiss_tournament::db::MemoryTournamentStore;
//! use swiss_tournament::tournament::TournamentManager;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TournamentManager::new(Arc::new(MemoryTournamentStore::new()));
//!
//!     let bruno = manager.register_player("Bruno Walton", None).await?;
//!     let boots = manager.register_player("Boots O'Neal", None).await?;
//!     manager.report_match(bruno, boots, None).await?;
//!
//!     let standings = manager.standings(None).await?;
//!     assert_eq!(standings[0].player_id, bruno);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod history;
pub mod manager;
pub mod models;
pub mod pairing;
pub mod standings;

pub use errors::{TournamentError, TournamentResult};
pub use manager::TournamentManager;
pub use models::{
    ByePolicy, DRAW_POINTS, EngineConfig, LOSS_POINTS, MatchId, MatchOutcome, MatchResult,
    Membership, Pairing, Player, PlayerId, RecordedMatch, RosterEntry, Standing, TournamentId,
    TournamentInfo, WIN_POINTS,
};
