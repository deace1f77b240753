//! Standings calculation.
//!
//! Standings are always a fold over the complete match log of a tournament;
//! there is no running total to keep in sync. The order is:
//!
//! 1. match points, descending
//! 2. tie-break (mean match points of the opponents faced), descending
//! 3. player id, ascending

use super::errors::{TournamentError, TournamentResult};
use super::models::{MatchId, MatchResult, PlayerId, RosterEntry, Standing};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Total order used for ranking; `Ordering::Less` means `a` ranks higher
pub fn rank_order(a: &Standing, b: &Standing) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.tie_break.total_cmp(&a.tie_break))
        .then_with(|| a.player_id.cmp(&b.player_id))
}

/// Group result rows by match, rejecting matches that are neither a bye nor a game
pub fn group_by_match(
    results: &[MatchResult],
) -> TournamentResult<BTreeMap<MatchId, Vec<MatchResult>>> {
    let mut matches: BTreeMap<MatchId, Vec<MatchResult>> = BTreeMap::new();
    for result in results {
        matches.entry(result.match_id).or_default().push(*result);
    }

    for (match_id, rows) in &matches {
        match rows.as_slice() {
            [_] => {}
            [a, b] if a.player_id != b.player_id => {}
            _ => {
                return Err(TournamentError::InvariantViolation(format!(
                    "match {match_id} has {} results",
                    rows.len()
                )));
            }
        }
    }

    Ok(matches)
}

/// Compute ordered standings for the active members of `roster`
///
/// Opponent points are taken from the whole log, so an opponent who has since
/// been deactivated still counts towards the tie-break.
pub fn compute_standings(
    roster: &[RosterEntry],
    results: &[MatchResult],
) -> TournamentResult<Vec<Standing>> {
    let matches = group_by_match(results)?;

    let mut points: HashMap<PlayerId, i32> = HashMap::new();
    for result in results {
        *points.entry(result.player_id).or_default() += result.points_awarded;
    }

    let mut played: HashMap<PlayerId, u32> = HashMap::new();
    let mut opponent_points: HashMap<PlayerId, Vec<i32>> = HashMap::new();
    for rows in matches.values() {
        for row in rows {
            *played.entry(row.player_id).or_default() += 1;
        }
        if let [a, b] = rows.as_slice() {
            let points_of = |id: PlayerId| points.get(&id).copied().unwrap_or(0);
            opponent_points
                .entry(a.player_id)
                .or_default()
                .push(points_of(b.player_id));
            opponent_points
                .entry(b.player_id)
                .or_default()
                .push(points_of(a.player_id));
        }
    }

    let mut standings: Vec<Standing> = roster
        .iter()
        .filter(|entry| entry.active)
        .map(|entry| {
            let tie_break = match opponent_points.get(&entry.player_id) {
                Some(faced) if !faced.is_empty() => {
                    faced.iter().map(|&p| f64::from(p)).sum::<f64>() / faced.len() as f64
                }
                _ => 0.0,
            };

            Standing {
                player_id: entry.player_id,
                name: entry.name.clone(),
                points: points.get(&entry.player_id).copied().unwrap_or(0),
                matches: played.get(&entry.player_id).copied().unwrap_or(0),
                tie_break,
            }
        })
        .collect();

    standings.sort_by(rank_order);
    Ok(standings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::MatchOutcome;

    fn roster(names: &[&str]) -> Vec<RosterEntry> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| RosterEntry {
                player_id: i as PlayerId + 1,
                name: (*name).to_string(),
                active: true,
                bye_awarded: false,
            })
            .collect()
    }

    fn log(outcomes: &[MatchOutcome]) -> Vec<MatchResult> {
        outcomes
            .iter()
            .enumerate()
            .flat_map(|(i, outcome)| {
                outcome
                    .scores()
                    .into_iter()
                    .map(move |(player_id, points_awarded)| MatchResult {
                        match_id: i as MatchId + 1,
                        player_id,
                        points_awarded,
                    })
            })
            .collect()
    }

    #[test]
    fn test_no_matches_everyone_zero() {
        let standings = compute_standings(&roster(&["Melpomene", "Randy"]), &[]).unwrap();
        assert_eq!(standings.len(), 2);
        for row in &standings {
            assert_eq!(row.points, 0);
            assert_eq!(row.matches, 0);
            assert_eq!(row.tie_break, 0.0);
        }
        // falls back to player id
        assert_eq!(standings[0].player_id, 1);
    }

    #[test]
    fn test_winners_rank_above_losers() {
        let results = log(&[
            MatchOutcome::Win {
                winner: 1,
                loser: 2,
            },
            MatchOutcome::Win {
                winner: 3,
                loser: 4,
            },
        ]);
        let standings =
            compute_standings(&roster(&["Bruno", "Boots", "Cathy", "Diane"]), &results).unwrap();

        let top: Vec<PlayerId> = standings[..2].iter().map(|s| s.player_id).collect();
        assert!(top.contains(&1) && top.contains(&3));
        assert!(standings.iter().all(|s| s.matches == 1));
        assert_eq!(standings[0].points, 3);
        assert_eq!(standings[3].points, 0);
    }

    #[test]
    fn test_tie_break_prefers_stronger_opponents() {
        // 1 beats 3, 2 beats 4, 1 beats 2: 3 and 4 are tied on zero points,
        // 3 lost to a 6-point player, 4 to a 3-point player.
        let mut outcomes = vec![
            MatchOutcome::Win {
                winner: 1,
                loser: 3,
            },
            MatchOutcome::Win {
                winner: 2,
                loser: 4,
            },
            MatchOutcome::Win {
                winner: 1,
                loser: 2,
            },
        ];
        let players = roster(&["Saber", "Lancer", "Assassin", "Rider"]);
        let standings = compute_standings(&players, &log(&outcomes)).unwrap();
        let rank = |id: PlayerId| standings.iter().position(|s| s.player_id == id).unwrap();
        assert!(rank(3) < rank(4));

        outcomes.push(MatchOutcome::Win {
            winner: 2,
            loser: 1,
        });
        outcomes.push(MatchOutcome::Win {
            winner: 2,
            loser: 1,
        });
        let standings = compute_standings(&players, &log(&outcomes)).unwrap();
        let rank = |id: PlayerId| standings.iter().position(|s| s.player_id == id).unwrap();
        assert!(rank(4) < rank(3));
    }

    #[test]
    fn test_bye_counts_as_match_but_not_tie_break() {
        let results = log(&[MatchOutcome::Bye { player: 1 }]);
        let standings = compute_standings(&roster(&["Ramza", "Agrias"]), &results).unwrap();
        assert_eq!(standings[0].player_id, 1);
        assert_eq!(standings[0].points, 3);
        assert_eq!(standings[0].matches, 1);
        assert_eq!(standings[0].tie_break, 0.0);
    }

    #[test]
    fn test_inactive_members_are_excluded_but_still_count_as_opponents() {
        let mut players = roster(&["Frodo", "Sam"]);
        players[1].active = false;
        let results = log(&[MatchOutcome::Win {
            winner: 2,
            loser: 1,
        }]);
        let standings = compute_standings(&players, &results).unwrap();
        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].player_id, 1);
        assert_eq!(standings[0].tie_break, 3.0);
    }

    #[test]
    fn test_match_with_three_results_is_rejected() {
        let results = vec![
            MatchResult {
                match_id: 1,
                player_id: 1,
                points_awarded: 3,
            },
            MatchResult {
                match_id: 1,
                player_id: 2,
                points_awarded: 0,
            },
            MatchResult {
                match_id: 1,
                player_id: 3,
                points_awarded: 0,
            },
        ];
        let err = compute_standings(&roster(&["a", "b", "c"]), &results).unwrap_err();
        assert!(matches!(err, TournamentError::InvariantViolation(_)));
    }
}
