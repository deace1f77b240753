//! Store trait definitions and the PostgreSQL implementation.
//!
//! The tournament logic is written once against [`StoreTransaction`]; a store
//! only has to provide typed primitive reads and writes inside a transaction.
//! Dropping a transaction without calling [`StoreTransaction::commit`] rolls
//! it back.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use std::time::Duration;

use super::timeouts::{COMMIT_OPERATION, with_timeout};
use crate::tournament::{
    Membership, MatchId, MatchResult, Player, PlayerId, RosterEntry, TournamentError,
    TournamentId, TournamentInfo, TournamentResult,
};

/// Row lock taken on a tournament for the rest of the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Readers: wait for in-flight writers, admit other readers
    Shared,
    /// Writers: exclusive per tournament
    Exclusive,
}

/// Source of atomic units of work
#[async_trait]
pub trait TournamentStore: Send + Sync {
    /// Open a transaction
    async fn begin<'a>(&'a self) -> TournamentResult<Box<dyn StoreTransaction + 'a>>;
}

/// Primitive operations available inside one transaction
#[async_trait]
pub trait StoreTransaction: Send {
    /// Insert a tournament with no members
    async fn create_tournament(&mut self) -> TournamentResult<TournamentId>;

    /// Highest tournament id, if any tournament exists
    async fn latest_tournament(&mut self) -> TournamentResult<Option<TournamentId>>;

    /// Block tournament creation by other transactions until this one ends
    async fn lock_tournament_creation(&mut self) -> TournamentResult<()>;

    /// All tournaments in creation order
    async fn list_tournaments(&mut self) -> TournamentResult<Vec<TournamentInfo>>;

    /// Lock a tournament row; fails with `TournamentNotFound` if it does not exist
    async fn lock_tournament(&mut self, id: TournamentId, mode: LockMode) -> TournamentResult<()>;

    /// Insert a global player record
    async fn insert_player(&mut self, name: &str) -> TournamentResult<PlayerId>;

    /// Find a player by id
    async fn find_player(&mut self, id: PlayerId) -> TournamentResult<Option<Player>>;

    /// Find a membership
    async fn find_membership(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Option<Membership>>;

    /// Insert an active membership without a bye
    async fn insert_membership(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<()>;

    /// Flip the active flag of one membership
    async fn set_active(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        active: bool,
    ) -> TournamentResult<()>;

    /// Deactivate every membership of a tournament, returning how many changed
    async fn deactivate_all(&mut self, tournament_id: TournamentId) -> TournamentResult<u64>;

    /// Number of active memberships
    async fn count_active(&mut self, tournament_id: TournamentId) -> TournamentResult<usize>;

    /// Append a match to the tournament's log
    async fn insert_match(&mut self, tournament_id: TournamentId) -> TournamentResult<MatchId>;

    /// Append a result row to a match
    async fn insert_result(&mut self, result: MatchResult) -> TournamentResult<()>;

    /// Set the bye flag of a membership
    async fn mark_bye_awarded(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<()>;

    /// Every membership (active or not) with player names, ordered by player id
    async fn roster(&mut self, tournament_id: TournamentId) -> TournamentResult<Vec<RosterEntry>>;

    /// Every result row of the tournament, ordered by match id
    async fn match_results(
        &mut self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<MatchResult>>;

    /// Delete the tournament's matches and clear its bye flags
    async fn delete_matches(&mut self, tournament_id: TournamentId) -> TournamentResult<u64>;

    /// Delete every player, membership and match in the store
    ///
    /// Every tournament is locked exclusively before anything is deleted.
    async fn delete_all_players(&mut self) -> TournamentResult<u64>;

    /// Make every write of this transaction visible
    async fn commit(self: Box<Self>) -> TournamentResult<()>;
}

/// PostgreSQL implementation of `TournamentStore`
#[derive(Clone)]
pub struct PgTournamentStore {
    pool: Arc<PgPool>,
    query_timeout: Duration,
}

impl PgTournamentStore {
    pub fn new(pool: Arc<PgPool>, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }
}

#[async_trait]
impl TournamentStore for PgTournamentStore {
    async fn begin<'a>(&'a self) -> TournamentResult<Box<dyn StoreTransaction + 'a>> {
        let tx = with_timeout(self.query_timeout, "begin", self.pool.begin()).await?;
        Ok(Box::new(PgStoreTransaction {
            tx,
            query_timeout: self.query_timeout,
        }))
    }
}

/// One open PostgreSQL transaction
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
    query_timeout: Duration,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn create_tournament(&mut self) -> TournamentResult<TournamentId> {
        let row = with_timeout(
            self.query_timeout,
            "create_tournament",
            sqlx::query("INSERT INTO tournaments DEFAULT VALUES RETURNING id")
                .fetch_one(&mut *self.tx),
        )
        .await?;

        Ok(row.get("id"))
    }

    async fn latest_tournament(&mut self) -> TournamentResult<Option<TournamentId>> {
        let row = with_timeout(
            self.query_timeout,
            "latest_tournament",
            sqlx::query("SELECT id FROM tournaments ORDER BY id DESC LIMIT 1")
                .fetch_optional(&mut *self.tx),
        )
        .await?;

        Ok(row.map(|r| r.get("id")))
    }

    async fn lock_tournament_creation(&mut self) -> TournamentResult<()> {
        // conflicts with itself and with the ROW EXCLUSIVE lock taken by INSERT
        with_timeout(
            self.query_timeout,
            "lock_tournament_creation",
            sqlx::query("LOCK TABLE tournaments IN SHARE ROW EXCLUSIVE MODE")
                .execute(&mut *self.tx),
        )
        .await?;

        Ok(())
    }

    async fn list_tournaments(&mut self) -> TournamentResult<Vec<TournamentInfo>> {
        let rows = with_timeout(
            self.query_timeout,
            "list_tournaments",
            sqlx::query(
                r#"
                SELECT t.id, t.created_at,
                       (SELECT COUNT(*) FROM tournament_players tp
                         WHERE tp.tournament_id = t.id AND tp.active) AS active_count,
                       (SELECT COUNT(*) FROM matches m
                         WHERE m.tournament_id = t.id) AS match_count
                FROM tournaments t
                ORDER BY t.id
                "#,
            )
            .fetch_all(&mut *self.tx),
        )
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TournamentInfo {
                id: row.get("id"),
                created_at: row.get("created_at"),
                active_count: row.get::<i64, _>("active_count") as usize,
                match_count: row.get::<i64, _>("match_count") as usize,
            })
            .collect())
    }

    async fn lock_tournament(&mut self, id: TournamentId, mode: LockMode) -> TournamentResult<()> {
        let sql = match mode {
            LockMode::Shared => "SELECT id FROM tournaments WHERE id = $1 FOR SHARE",
            LockMode::Exclusive => "SELECT id FROM tournaments WHERE id = $1 FOR UPDATE",
        };

        with_timeout(
            self.query_timeout,
            "lock_tournament",
            sqlx::query(sql).bind(id).fetch_optional(&mut *self.tx),
        )
        .await?
        .ok_or(TournamentError::TournamentNotFound(id))?;

        Ok(())
    }

    async fn insert_player(&mut self, name: &str) -> TournamentResult<PlayerId> {
        let row = with_timeout(
            self.query_timeout,
            "insert_player",
            sqlx::query("INSERT INTO players (name) VALUES ($1) RETURNING id")
                .bind(name)
                .fetch_one(&mut *self.tx),
        )
        .await?;

        Ok(row.get("id"))
    }

    async fn find_player(&mut self, id: PlayerId) -> TournamentResult<Option<Player>> {
        let row = with_timeout(
            self.query_timeout,
            "find_player",
            sqlx::query("SELECT id, name FROM players WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self.tx),
        )
        .await?;

        Ok(row.map(|r| Player {
            id: r.get("id"),
            name: r.get("name"),
        }))
    }

    async fn find_membership(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Option<Membership>> {
        let row = with_timeout(
            self.query_timeout,
            "find_membership",
            sqlx::query(
                "SELECT tournament_id, player_id, active, bye_awarded
                 FROM tournament_players WHERE tournament_id = $1 AND player_id = $2",
            )
            .bind(tournament_id)
            .bind(player_id)
            .fetch_optional(&mut *self.tx),
        )
        .await?;

        Ok(row.map(|r| Membership {
            tournament_id: r.get("tournament_id"),
            player_id: r.get("player_id"),
            active: r.get("active"),
            bye_awarded: r.get("bye_awarded"),
        }))
    }

    async fn insert_membership(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<()> {
        let result = with_timeout(
            self.query_timeout,
            "insert_membership",
            sqlx::query("INSERT INTO tournament_players (tournament_id, player_id) VALUES ($1, $2)")
                .bind(tournament_id)
                .bind(player_id)
                .execute(&mut *self.tx),
        )
        .await;

        match result.map_err(TournamentError::from) {
            Ok(_) => Ok(()),
            Err(TournamentError::Database(e)) if is_unique_violation(&e) => {
                Err(TournamentError::AlreadyAttached {
                    tournament_id,
                    player_id,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn set_active(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        active: bool,
    ) -> TournamentResult<()> {
        let result = with_timeout(
            self.query_timeout,
            "set_active",
            sqlx::query(
                r#"
                UPDATE tournament_players SET active = $3
                WHERE tournament_id = $1 AND player_id = $2
                "#,
            )
            .bind(tournament_id)
            .bind(player_id)
            .bind(active)
            .execute(&mut *self.tx),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(TournamentError::MembershipNotFound {
                tournament_id,
                player_id,
            });
        }

        Ok(())
    }

    async fn deactivate_all(&mut self, tournament_id: TournamentId) -> TournamentResult<u64> {
        let result = with_timeout(
            self.query_timeout,
            "deactivate_all",
            sqlx::query(
                "UPDATE tournament_players SET active = FALSE WHERE tournament_id = $1 AND active",
            )
            .bind(tournament_id)
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_active(&mut self, tournament_id: TournamentId) -> TournamentResult<usize> {
        let row = with_timeout(
            self.query_timeout,
            "count_active",
            sqlx::query(
                r#"
                SELECT COUNT(*) AS count FROM tournament_players
                WHERE tournament_id = $1 AND active
                "#,
            )
            .bind(tournament_id)
            .fetch_one(&mut *self.tx),
        )
        .await?;

        Ok(row.get::<i64, _>("count") as usize)
    }

    async fn insert_match(&mut self, tournament_id: TournamentId) -> TournamentResult<MatchId> {
        let row = with_timeout(
            self.query_timeout,
            "insert_match",
            sqlx::query("INSERT INTO matches (tournament_id) VALUES ($1) RETURNING id")
                .bind(tournament_id)
                .fetch_one(&mut *self.tx),
        )
        .await?;

        Ok(row.get("id"))
    }

    async fn insert_result(&mut self, result: MatchResult) -> TournamentResult<()> {
        with_timeout(
            self.query_timeout,
            "insert_result",
            sqlx::query(
                r#"
                INSERT INTO match_results (match_id, player_id, points_awarded)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(result.match_id)
            .bind(result.player_id)
            .bind(result.points_awarded)
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(())
    }

    async fn mark_bye_awarded(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<()> {
        let result = with_timeout(
            self.query_timeout,
            "mark_bye_awarded",
            sqlx::query(
                "UPDATE tournament_players SET bye_awarded = TRUE
                 WHERE tournament_id = $1 AND player_id = $2",
            )
            .bind(tournament_id)
            .bind(player_id)
            .execute(&mut *self.tx),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(TournamentError::MembershipNotFound {
                tournament_id,
                player_id,
            });
        }

        Ok(())
    }

    async fn roster(&mut self, tournament_id: TournamentId) -> TournamentResult<Vec<RosterEntry>> {
        let rows = with_timeout(
            self.query_timeout,
            "roster",
            sqlx::query(
                r#"
                SELECT tp.player_id, p.name, tp.active, tp.bye_awarded
                FROM tournament_players tp
                JOIN players p ON p.id = tp.player_id
                WHERE tp.tournament_id = $1
                ORDER BY tp.player_id
                "#,
            )
            .bind(tournament_id)
            .fetch_all(&mut *self.tx),
        )
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RosterEntry {
                player_id: row.get("player_id"),
                name: row.get("name"),
                active: row.get("active"),
                bye_awarded: row.get("bye_awarded"),
            })
            .collect())
    }

    async fn match_results(
        &mut self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<MatchResult>> {
        let rows = with_timeout(
            self.query_timeout,
            "match_results",
            sqlx::query(
                r#"
                SELECT r.match_id, r.player_id, r.points_awarded
                FROM match_results r
                JOIN matches m ON m.id = r.match_id
                WHERE m.tournament_id = $1
                ORDER BY r.match_id, r.points_awarded DESC, r.player_id
                "#,
            )
            .bind(tournament_id)
            .fetch_all(&mut *self.tx),
        )
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| MatchResult {
                match_id: row.get("match_id"),
                player_id: row.get("player_id"),
                points_awarded: row.get("points_awarded"),
            })
            .collect())
    }

    async fn delete_matches(&mut self, tournament_id: TournamentId) -> TournamentResult<u64> {
        let deleted = with_timeout(
            self.query_timeout,
            "delete_matches",
            sqlx::query("DELETE FROM matches WHERE tournament_id = $1")
                .bind(tournament_id)
                .execute(&mut *self.tx),
        )
        .await?;

        with_timeout(
            self.query_timeout,
            "delete_matches",
            sqlx::query(
                "UPDATE tournament_players SET bye_awarded = FALSE WHERE tournament_id = $1",
            )
            .bind(tournament_id)
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(deleted.rows_affected())
    }

    async fn delete_all_players(&mut self) -> TournamentResult<u64> {
        with_timeout(
            self.query_timeout,
            "delete_all_players",
            sqlx::query("SELECT id FROM tournaments ORDER BY id FOR UPDATE")
                .fetch_all(&mut *self.tx),
        )
        .await?;

        with_timeout(
            self.query_timeout,
            "delete_all_players",
            sqlx::query("DELETE FROM matches").execute(&mut *self.tx),
        )
        .await?;

        let deleted = with_timeout(
            self.query_timeout,
            "delete_all_players",
            sqlx::query("DELETE FROM players").execute(&mut *self.tx),
        )
        .await?;

        Ok(deleted.rows_affected())
    }

    async fn commit(self: Box<Self>) -> TournamentResult<()> {
        let query_timeout = self.query_timeout;
        with_timeout(query_timeout, COMMIT_OPERATION, self.tx.commit()).await?;
        Ok(())
    }
}
