//! Failure injection for multi-write operations.
//!
//! The wrapper store delegates to the in-memory store but fails when a bye
//! flag is set, after the bye's match and result rows were already written.
//! Nothing of the bye may survive the failed transaction.

use async_trait::async_trait;
use std::sync::Arc;
use swiss_tournament::db::{LockMode, MemoryTournamentStore, StoreTransaction, TournamentStore};
use swiss_tournament::tournament::{
    MatchId, MatchResult, Membership, Player, PlayerId, RosterEntry, TournamentError,
    TournamentId, TournamentInfo, TournamentManager, TournamentResult,
};

#[derive(Default)]
struct ByeFlagFailingStore {
    inner: MemoryTournamentStore,
}

#[async_trait]
impl TournamentStore for ByeFlagFailingStore {
    async fn begin<'a>(&'a self) -> TournamentResult<Box<dyn StoreTransaction + 'a>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(ByeFlagFailingTransaction { inner }))
    }
}

struct ByeFlagFailingTransaction<'a> {
    inner: Box<dyn StoreTransaction + 'a>,
}

#[async_trait]
impl<'a> StoreTransaction for ByeFlagFailingTransaction<'a> {
    async fn create_tournament(&mut self) -> TournamentResult<TournamentId> {
        self.inner.create_tournament().await
    }

    async fn latest_tournament(&mut self) -> TournamentResult<Option<TournamentId>> {
        self.inner.latest_tournament().await
    }

    async fn lock_tournament_creation(&mut self) -> TournamentResult<()> {
        self.inner.lock_tournament_creation().await
    }

    async fn list_tournaments(&mut self) -> TournamentResult<Vec<TournamentInfo>> {
        self.inner.list_tournaments().await
    }

    async fn lock_tournament(&mut self, id: TournamentId, mode: LockMode) -> TournamentResult<()> {
        self.inner.lock_tournament(id, mode).await
    }

    async fn insert_player(&mut self, name: &str) -> TournamentResult<PlayerId> {
        self.inner.insert_player(name).await
    }

    async fn find_player(&mut self, id: PlayerId) -> TournamentResult<Option<Player>> {
        self.inner.find_player(id).await
    }

    async fn find_membership(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Option<Membership>> {
        self.inner.find_membership(tournament_id, player_id).await
    }

    async fn insert_membership(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<()> {
        self.inner.insert_membership(tournament_id, player_id).await
    }

    async fn set_active(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        active: bool,
    ) -> TournamentResult<()> {
        self.inner.set_active(tournament_id, player_id, active).await
    }

    async fn deactivate_all(&mut self, tournament_id: TournamentId) -> TournamentResult<u64> {
        self.inner.deactivate_all(tournament_id).await
    }

    async fn count_active(&mut self, tournament_id: TournamentId) -> TournamentResult<usize> {
        self.inner.count_active(tournament_id).await
    }

    async fn insert_match(&mut self, tournament_id: TournamentId) -> TournamentResult<MatchId> {
        self.inner.insert_match(tournament_id).await
    }

    async fn insert_result(&mut self, result: MatchResult) -> TournamentResult<()> {
        self.inner.insert_result(result).await
    }

    async fn mark_bye_awarded(
        &mut self,
        _tournament_id: TournamentId,
        _player_id: PlayerId,
    ) -> TournamentResult<()> {
        Err(TournamentError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn roster(&mut self, tournament_id: TournamentId) -> TournamentResult<Vec<RosterEntry>> {
        self.inner.roster(tournament_id).await
    }

    async fn match_results(
        &mut self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<MatchResult>> {
        self.inner.match_results(tournament_id).await
    }

    async fn delete_matches(&mut self, tournament_id: TournamentId) -> TournamentResult<u64> {
        self.inner.delete_matches(tournament_id).await
    }

    async fn delete_all_players(&mut self) -> TournamentResult<u64> {
        self.inner.delete_all_players().await
    }

    async fn commit(self: Box<Self>) -> TournamentResult<()> {
        self.inner.commit().await
    }
}

fn manager() -> TournamentManager {
    TournamentManager::new(Arc::new(ByeFlagFailingStore::default()))
}

async fn assert_no_bye_recorded(manager: &TournamentManager) {
    assert!(manager.match_history(None).await.unwrap().is_empty());
    let roster = manager.roster(None).await.unwrap();
    assert!(roster.iter().all(|e| !e.bye_awarded));
    let standings = manager.standings(None).await.unwrap();
    assert!(standings.iter().all(|s| s.points == 0 && s.matches == 0));
}

#[tokio::test]
async fn test_failed_bye_flag_rolls_back_the_bye_result() {
    let manager = manager();
    let frodo = manager.register_player("Frodo", None).await.unwrap();
    manager.register_player("Sam", None).await.unwrap();

    let err = manager.report_bye(frodo, None).await.unwrap_err();
    assert!(matches!(err, TournamentError::Database(_)));
    assert!(err.is_transient());

    assert_no_bye_recorded(&manager).await;
}

#[tokio::test]
async fn test_failed_bye_flag_during_pairing_records_nothing() {
    let manager = manager();
    for name in ["Frodo", "Sam", "Merry"] {
        manager.register_player(name, None).await.unwrap();
    }

    assert!(manager.pairings(None).await.is_err());

    assert_no_bye_recorded(&manager).await;
}

#[tokio::test]
async fn test_other_results_are_unaffected() {
    let manager = manager();
    let frodo = manager.register_player("Frodo", None).await.unwrap();
    let sam = manager.register_player("Sam", None).await.unwrap();

    manager.report_match(frodo, sam, None).await.unwrap();
    assert_eq!(manager.match_history(None).await.unwrap().len(), 1);
}
