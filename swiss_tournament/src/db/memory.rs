//! In-process tournament store.
//!
//! A transaction holds the store lock for its whole lifetime and works on a
//! private copy of the state, which replaces the shared state on commit.
//! Transactions are therefore fully serialized and a dropped transaction
//! leaves no trace.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::{Mutex, MutexGuard};

use super::store::{LockMode, StoreTransaction, TournamentStore};
use crate::tournament::{
    Membership, MatchId, MatchResult, Player, PlayerId, RosterEntry, TournamentError,
    TournamentId, TournamentInfo, TournamentResult,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_tournament_id: TournamentId,
    last_player_id: PlayerId,
    last_match_id: MatchId,
    tournaments: BTreeMap<TournamentId, DateTime<Utc>>,
    players: BTreeMap<PlayerId, String>,
    memberships: BTreeMap<(TournamentId, PlayerId), Membership>,
    matches: BTreeMap<MatchId, TournamentId>,
    results: BTreeMap<(MatchId, PlayerId), i32>,
}

/// Tournament store kept in memory
#[derive(Debug, Default)]
pub struct MemoryTournamentStore {
    state: Mutex<MemoryState>,
}

impl MemoryTournamentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentStore for MemoryTournamentStore {
    async fn begin<'a>(&'a self) -> TournamentResult<Box<dyn StoreTransaction + 'a>> {
        let guard = self.state.lock().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

struct MemoryTransaction<'a> {
    guard: MutexGuard<'a, MemoryState>,
    working: MemoryState,
}

impl MemoryTransaction<'_> {
    fn membership_mut(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<&mut Membership> {
        self.working
            .memberships
            .get_mut(&(tournament_id, player_id))
            .ok_or(TournamentError::MembershipNotFound {
                tournament_id,
                player_id,
            })
    }
}

#[async_trait]
impl<'a> StoreTransaction for MemoryTransaction<'a> {
    async fn create_tournament(&mut self) -> TournamentResult<TournamentId> {
        self.working.last_tournament_id += 1;
        let id = self.working.last_tournament_id;
        self.working.tournaments.insert(id, Utc::now());
        Ok(id)
    }

    async fn latest_tournament(&mut self) -> TournamentResult<Option<TournamentId>> {
        Ok(self.working.tournaments.keys().next_back().copied())
    }

    async fn lock_tournament_creation(&mut self) -> TournamentResult<()> {
        Ok(())
    }

    async fn list_tournaments(&mut self) -> TournamentResult<Vec<TournamentInfo>> {
        let state = &self.working;
        Ok(state
            .tournaments
            .iter()
            .map(|(&id, &created_at)| TournamentInfo {
                id,
                created_at,
                active_count: state
                    .memberships
                    .values()
                    .filter(|m| m.tournament_id == id && m.active)
                    .count(),
                match_count: state.matches.values().filter(|&&t| t == id).count(),
            })
            .collect())
    }

    async fn lock_tournament(&mut self, id: TournamentId, _mode: LockMode) -> TournamentResult<()> {
        if self.working.tournaments.contains_key(&id) {
            Ok(())
        } else {
            Err(TournamentError::TournamentNotFound(id))
        }
    }

    async fn insert_player(&mut self, name: &str) -> TournamentResult<PlayerId> {
        self.working.last_player_id += 1;
        let id = self.working.last_player_id;
        self.working.players.insert(id, name.to_string());
        Ok(id)
    }

    async fn find_player(&mut self, id: PlayerId) -> TournamentResult<Option<Player>> {
        Ok(self.working.players.get(&id).map(|name| Player {
            id,
            name: name.clone(),
        }))
    }

    async fn find_membership(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Option<Membership>> {
        Ok(self
            .working
            .memberships
            .get(&(tournament_id, player_id))
            .cloned())
    }

    async fn insert_membership(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<()> {
        if !self.working.tournaments.contains_key(&tournament_id) {
            return Err(TournamentError::TournamentNotFound(tournament_id));
        }
        if !self.working.players.contains_key(&player_id) {
            return Err(TournamentError::PlayerNotFound(player_id));
        }
        if self
            .working
            .memberships
            .contains_key(&(tournament_id, player_id))
        {
            return Err(TournamentError::AlreadyAttached {
                tournament_id,
                player_id,
            });
        }

        self.working.memberships.insert(
            (tournament_id, player_id),
            Membership {
                tournament_id,
                player_id,
                active: true,
                bye_awarded: false,
            },
        );
        Ok(())
    }

    async fn set_active(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        active: bool,
    ) -> TournamentResult<()> {
        self.membership_mut(tournament_id, player_id)?.active = active;
        Ok(())
    }

    async fn deactivate_all(&mut self, tournament_id: TournamentId) -> TournamentResult<u64> {
        let mut changed = 0;
        for membership in self.working.memberships.values_mut() {
            if membership.tournament_id == tournament_id && membership.active {
                membership.active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn count_active(&mut self, tournament_id: TournamentId) -> TournamentResult<usize> {
        Ok(self
            .working
            .memberships
            .values()
            .filter(|m| m.tournament_id == tournament_id && m.active)
            .count())
    }

    async fn insert_match(&mut self, tournament_id: TournamentId) -> TournamentResult<MatchId> {
        if !self.working.tournaments.contains_key(&tournament_id) {
            return Err(TournamentError::TournamentNotFound(tournament_id));
        }
        self.working.last_match_id += 1;
        let id = self.working.last_match_id;
        self.working.matches.insert(id, tournament_id);
        Ok(id)
    }

    async fn insert_result(&mut self, result: MatchResult) -> TournamentResult<()> {
        if !self.working.matches.contains_key(&result.match_id) {
            return Err(TournamentError::InvariantViolation(format!(
                "result for unknown match {}",
                result.match_id
            )));
        }
        if !self.working.players.contains_key(&result.player_id) {
            return Err(TournamentError::PlayerNotFound(result.player_id));
        }
        let key = (result.match_id, result.player_id);
        if self.working.results.contains_key(&key) {
            return Err(TournamentError::InvariantViolation(format!(
                "duplicate result for player {} in match {}",
                result.player_id, result.match_id
            )));
        }

        self.working.results.insert(key, result.points_awarded);
        Ok(())
    }

    async fn mark_bye_awarded(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<()> {
        self.membership_mut(tournament_id, player_id)?.bye_awarded = true;
        Ok(())
    }

    async fn roster(&mut self, tournament_id: TournamentId) -> TournamentResult<Vec<RosterEntry>> {
        let state = &self.working;
        Ok(state
            .memberships
            .range((tournament_id, PlayerId::MIN)..=(tournament_id, PlayerId::MAX))
            .map(|(&(_, player_id), membership)| RosterEntry {
                player_id,
                name: state.players.get(&player_id).cloned().unwrap_or_default(),
                active: membership.active,
                bye_awarded: membership.bye_awarded,
            })
            .collect())
    }

    async fn match_results(
        &mut self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<MatchResult>> {
        let state = &self.working;
        let mut results: Vec<MatchResult> = state
            .results
            .iter()
            .filter(|((match_id, _), _)| state.matches.get(match_id) == Some(&tournament_id))
            .map(|(&(match_id, player_id), &points_awarded)| MatchResult {
                match_id,
                player_id,
                points_awarded,
            })
            .collect();
        results.sort_by(|a, b| {
            a.match_id
                .cmp(&b.match_id)
                .then(b.points_awarded.cmp(&a.points_awarded))
                .then(a.player_id.cmp(&b.player_id))
        });
        Ok(results)
    }

    async fn delete_matches(&mut self, tournament_id: TournamentId) -> TournamentResult<u64> {
        let state = &mut self.working;
        let before = state.matches.len();
        state.matches.retain(|_, t| *t != tournament_id);
        let deleted = (before - state.matches.len()) as u64;

        let matches = &state.matches;
        state
            .results
            .retain(|(match_id, _), _| matches.contains_key(match_id));
        for membership in state.memberships.values_mut() {
            if membership.tournament_id == tournament_id {
                membership.bye_awarded = false;
            }
        }

        Ok(deleted)
    }

    async fn delete_all_players(&mut self) -> TournamentResult<u64> {
        let state = &mut self.working;
        let deleted = state.players.len() as u64;
        state.players.clear();
        state.memberships.clear();
        state.matches.clear();
        state.results.clear();
        Ok(deleted)
    }

    async fn commit(self: Box<Self>) -> TournamentResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
