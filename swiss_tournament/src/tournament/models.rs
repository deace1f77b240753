//! Tournament data models: identifiers, roster entries, recorded matches and standings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tournament ID type (creation-ordered)
pub type TournamentId = i64;

/// Player ID type
pub type PlayerId = i64;

/// Match ID type (creation-ordered)
pub type MatchId = i64;

/// Points awarded for a win (a bye scores as a win)
pub const WIN_POINTS: i32 = 3;

/// Points awarded to each side of a draw
pub const DRAW_POINTS: i32 = 1;

/// Points awarded for a loss
pub const LOSS_POINTS: i32 = 0;

/// A globally registered player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

/// A player's membership in one tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    /// Eligible for standings and pairing in the current round
    pub active: bool,
    /// Set the first time the player receives a bye; never reset
    pub bye_awarded: bool,
}

/// Roster row: membership joined with the player's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub active: bool,
    pub bye_awarded: bool,
}

/// One scored row of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    pub points_awarded: i32,
}

/// Outcome to be appended to a tournament's match log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Head-to-head game with a winner
    Win { winner: PlayerId, loser: PlayerId },
    /// Head-to-head game ending level
    Draw { player_a: PlayerId, player_b: PlayerId },
    /// Automatic win with no opponent
    Bye { player: PlayerId },
}

impl MatchOutcome {
    /// The result rows this outcome produces, as `(player, points)` pairs
    pub fn scores(&self) -> Vec<(PlayerId, i32)> {
        match *self {
            MatchOutcome::Win { winner, loser } => {
                vec![(winner, WIN_POINTS), (loser, LOSS_POINTS)]
            }
            MatchOutcome::Draw { player_a, player_b } => {
                vec![(player_a, DRAW_POINTS), (player_b, DRAW_POINTS)]
            }
            MatchOutcome::Bye { player } => vec![(player, WIN_POINTS)],
        }
    }

    /// Players taking part in the match
    pub fn players(&self) -> Vec<PlayerId> {
        self.scores().into_iter().map(|(player, _)| player).collect()
    }
}

/// A match from the log, decoded back into its outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedMatch {
    pub match_id: MatchId,
    pub outcome: MatchOutcome,
}

/// Summary of a tournament for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentInfo {
    pub id: TournamentId,
    pub created_at: DateTime<Utc>,
    pub active_count: usize,
    pub match_count: usize,
}

/// One row of the standings table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub player_id: PlayerId,
    pub name: String,
    /// Sum of points awarded across the tournament
    pub points: i32,
    /// Number of matches (byes included) the player appears in
    pub matches: u32,
    /// Mean match points of the opponents faced; byes excluded
    pub tie_break: f64,
}

impl Standing {
    /// Match points expressed in wins, so a draw contributes 1/3
    pub fn win_fraction(&self) -> f64 {
        f64::from(self.points) / f64::from(WIN_POINTS)
    }
}

/// Two players meeting in the next round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub player_a: PlayerId,
    pub name_a: String,
    pub player_b: PlayerId,
    pub name_b: String,
}

/// How a bye is assigned once every active player already holds one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByePolicy {
    /// Give another bye to the player whose last bye is the oldest
    #[default]
    Cycle,
    /// Refuse to pair the round
    Strict,
}

impl std::str::FromStr for ByePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cycle" => Ok(ByePolicy::Cycle),
            "strict" => Ok(ByePolicy::Strict),
            other => Err(format!("unknown bye policy: {other}")),
        }
    }
}

/// Engine settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub bye_policy: ByePolicy,
}

impl EngineConfig {
    /// Read settings from the environment
    ///
    /// - `SWISS_BYE_POLICY`: `cycle` (default) or `strict`
    ///
    /// A value that is set but not a known policy is an error rather than a
    /// fallback, since it changes who receives byes.
    pub fn from_env() -> Result<Self, String> {
        Self::from_bye_policy_var(std::env::var("SWISS_BYE_POLICY").ok().as_deref())
    }

    fn from_bye_policy_var(raw: Option<&str>) -> Result<Self, String> {
        let bye_policy = match raw {
            Some(raw) => raw.parse()?,
            None => ByePolicy::default(),
        };
        Ok(Self { bye_policy })
    }
}
