//! Bye allocation and adjacent-rank pairing.

use super::errors::{TournamentError, TournamentResult};
use super::models::{
    ByePolicy, MatchId, MatchResult, Pairing, PlayerId, RosterEntry, Standing, TournamentId,
};
use super::standings::group_by_match;
use std::collections::HashMap;

/// Decide who sits out this round, if anyone
///
/// `standings` must be the ranked active players. With an even count nobody
/// gets a bye. Otherwise the lowest-ranked player without a bye receives it.
/// When every active player already holds one, `policy` decides.
pub fn select_bye(
    tournament_id: TournamentId,
    standings: &[Standing],
    roster: &[RosterEntry],
    results: &[MatchResult],
    policy: ByePolicy,
) -> TournamentResult<Option<PlayerId>> {
    if standings.len() % 2 == 0 {
        return Ok(None);
    }

    let bye_awarded: HashMap<PlayerId, bool> = roster
        .iter()
        .map(|entry| (entry.player_id, entry.bye_awarded))
        .collect();

    let eligible = standings
        .iter()
        .rev()
        .find(|s| !bye_awarded.get(&s.player_id).copied().unwrap_or(false));
    if let Some(standing) = eligible {
        return Ok(Some(standing.player_id));
    }

    match policy {
        ByePolicy::Strict => Err(TournamentError::NoByeEligible(tournament_id)),
        ByePolicy::Cycle => {
            let last_bye = last_bye_matches(results)?;
            Ok(standings
                .iter()
                .rev()
                .min_by_key(|s| last_bye.get(&s.player_id).copied())
                .map(|s| s.player_id))
        }
    }
}

/// Most recent bye match per player
fn last_bye_matches(results: &[MatchResult]) -> TournamentResult<HashMap<PlayerId, MatchId>> {
    let mut last = HashMap::new();
    for (match_id, rows) in group_by_match(results)? {
        if let [row] = rows.as_slice() {
            last.insert(row.player_id, match_id);
        }
    }
    Ok(last)
}

/// Pair ranked players two at a time: first with second, third with fourth, and so on
///
/// Rematches are not avoided.
pub fn pair_adjacent(standings: &[Standing]) -> TournamentResult<Vec<Pairing>> {
    if standings.len() % 2 != 0 {
        return Err(TournamentError::InvariantViolation(format!(
            "cannot pair an odd number of players ({})",
            standings.len()
        )));
    }

    Ok(standings
        .chunks_exact(2)
        .map(|pair| Pairing {
            player_a: pair[0].player_id,
            name_a: pair[0].name.clone(),
            player_b: pair[1].player_id,
            name_b: pair[1].name.clone(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(player_id: PlayerId, points: i32) -> Standing {
        Standing {
            player_id,
            name: format!("player{player_id}"),
            points,
            matches: 0,
            tie_break: 0.0,
        }
    }

    fn entry(player_id: PlayerId, bye_awarded: bool) -> RosterEntry {
        RosterEntry {
            player_id,
            name: format!("player{player_id}"),
            active: true,
            bye_awarded,
        }
    }

    fn bye(match_id: MatchId, player_id: PlayerId) -> MatchResult {
        MatchResult {
            match_id,
            player_id,
            points_awarded: 3,
        }
    }

    #[test]
    fn test_even_count_has_no_bye() {
        let standings = vec![standing(1, 3), standing(2, 0)];
        let roster = vec![entry(1, false), entry(2, false)];
        let bye = select_bye(1, &standings, &roster, &[], ByePolicy::Cycle).unwrap();
        assert_eq!(bye, None);
    }

    #[test]
    fn test_lowest_ranked_eligible_gets_bye() {
        let standings = vec![standing(1, 6), standing(2, 3), standing(3, 0)];
        let roster = vec![entry(1, false), entry(2, false), entry(3, true)];
        let bye = select_bye(1, &standings, &roster, &[], ByePolicy::Cycle).unwrap();
        assert_eq!(bye, Some(2));
    }

    #[test]
    fn test_strict_policy_refuses_repeat_bye() {
        let standings = vec![standing(1, 3)];
        let roster = vec![entry(1, true)];
        let err = select_bye(9, &standings, &roster, &[bye(1, 1)], ByePolicy::Strict).unwrap_err();
        assert!(matches!(err, TournamentError::NoByeEligible(9)));
    }

    #[test]
    fn test_cycle_policy_picks_oldest_bye() {
        let standings = vec![standing(1, 9), standing(2, 6), standing(3, 3)];
        let roster = vec![entry(1, true), entry(2, true), entry(3, true)];
        let results = vec![bye(4, 3), bye(2, 1), bye(7, 2)];
        let pick = select_bye(1, &standings, &roster, &results, ByePolicy::Cycle).unwrap();
        assert_eq!(pick, Some(1));
    }

    #[test]
    fn test_pair_adjacent() {
        let standings = vec![standing(1, 3), standing(3, 3), standing(2, 0), standing(4, 0)];
        let pairs = pair_adjacent(&standings).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!((pairs[0].player_a, pairs[0].player_b), (1, 3));
        assert_eq!((pairs[1].player_a, pairs[1].player_b), (2, 4));
        assert_eq!(pairs[1].name_b, "player4");
    }

    #[test]
    fn test_pair_adjacent_rejects_odd_leftover() {
        let standings = vec![standing(1, 3), standing(2, 3), standing(3, 0)];
        let err = pair_adjacent(&standings).unwrap_err();
        assert!(matches!(err, TournamentError::InvariantViolation(_)));
    }
}
