//! Decoding the stored match log back into outcomes.

use super::errors::{TournamentError, TournamentResult};
use super::models::{DRAW_POINTS, LOSS_POINTS, MatchOutcome, MatchResult, RecordedMatch, WIN_POINTS};
use super::standings::group_by_match;

/// Turn result rows into typed outcomes, in match creation order
pub fn decode_matches(results: &[MatchResult]) -> TournamentResult<Vec<RecordedMatch>> {
    group_by_match(results)?
        .into_iter()
        .map(|(match_id, rows)| {
            let outcome = match rows.as_slice() {
                [bye] if bye.points_awarded == WIN_POINTS => MatchOutcome::Bye {
                    player: bye.player_id,
                },
                [a, b] => match (a.points_awarded, b.points_awarded) {
                    (WIN_POINTS, LOSS_POINTS) => MatchOutcome::Win {
                        winner: a.player_id,
                        loser: b.player_id,
                    },
                    (LOSS_POINTS, WIN_POINTS) => MatchOutcome::Win {
                        winner: b.player_id,
                        loser: a.player_id,
                    },
                    (DRAW_POINTS, DRAW_POINTS) => MatchOutcome::Draw {
                        player_a: a.player_id,
                        player_b: b.player_id,
                    },
                    (x, y) => {
                        return Err(TournamentError::InvariantViolation(format!(
                            "match {match_id} scored {x}-{y}"
                        )));
                    }
                },
                _ => {
                    return Err(TournamentError::InvariantViolation(format!(
                        "match {match_id} is not a bye, draw or win"
                    )));
                }
            };

            Ok(RecordedMatch { match_id, outcome })
        })
        .collect()
}
