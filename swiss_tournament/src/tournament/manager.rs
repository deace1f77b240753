//! Tournament manager: the public operations of the engine.
//!
//! Every method runs as one store transaction. Operations taking an optional
//! tournament id resolve `None` to the most recently created tournament,
//! creating one when the store is empty.

use super::errors::{TournamentError, TournamentResult};
use super::history::decode_matches;
use super::models::{
    ByePolicy, EngineConfig, MatchId, MatchOutcome, MatchResult, Pairing, PlayerId, RecordedMatch,
    RosterEntry, Standing, TournamentId, TournamentInfo, WIN_POINTS,
};
use super::pairing::{pair_adjacent, select_bye};
use super::standings::compute_standings;
use crate::db::{LockMode, StoreTransaction, TournamentStore};
use crate::security::sanitize_name;
use log::{debug, info, warn};
use std::sync::Arc;

type Tx<'a> = Box<dyn StoreTransaction + 'a>;

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    store: Arc<dyn TournamentStore>,
    config: EngineConfig,
}

impl TournamentManager {
    /// Create a manager with default engine settings
    pub fn new(store: Arc<dyn TournamentStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    /// Create a manager with explicit engine settings
    pub fn with_config(store: Arc<dyn TournamentStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Create a new tournament with no members
    pub async fn create_tournament(&self) -> TournamentResult<TournamentId> {
        let mut tx = self.store.begin().await?;
        let id = tx.create_tournament().await?;
        tx.commit().await?;

        info!("Created tournament {id}");
        Ok(id)
    }

    /// Resolve an optional tournament reference
    ///
    /// An explicit id is returned as is. `None` means the most recently
    /// created tournament, which is created if none exists yet.
    pub async fn resolve_tournament(
        &self,
        tournament: Option<TournamentId>,
    ) -> TournamentResult<TournamentId> {
        if let Some(id) = tournament {
            return Ok(id);
        }

        let mut tx = self.store.begin().await?;
        let id = resolve_in(&mut tx).await?;
        tx.commit().await?;
        Ok(id)
    }

    /// All tournaments in creation order
    pub async fn list_tournaments(&self) -> TournamentResult<Vec<TournamentInfo>> {
        let mut tx = self.store.begin().await?;
        let tournaments = tx.list_tournaments().await?;
        tx.commit().await?;
        Ok(tournaments)
    }

    /// Register a new player and attach them, active, to the tournament
    ///
    /// The name is sanitized before storage.
    pub async fn register_player(
        &self,
        name: &str,
        tournament: Option<TournamentId>,
    ) -> TournamentResult<PlayerId> {
        let name = sanitize_name(name)?;

        let mut tx = self.store.begin().await?;
        let tournament_id = target(&mut tx, tournament, LockMode::Exclusive).await?;
        let player_id = tx.insert_player(&name).await?;
        tx.insert_membership(tournament_id, player_id).await?;
        tx.commit().await?;

        info!("Registered player {player_id} ({name}) in tournament {tournament_id}");
        Ok(player_id)
    }

    /// Attach an existing player to another tournament
    pub async fn attach_player(
        &self,
        player_id: PlayerId,
        tournament: Option<TournamentId>,
    ) -> TournamentResult<()> {
        let mut tx = self.store.begin().await?;
        let tournament_id = target(&mut tx, tournament, LockMode::Exclusive).await?;

        tx.find_player(player_id)
            .await?
            .ok_or(TournamentError::PlayerNotFound(player_id))?;

        if tx.find_membership(tournament_id, player_id).await?.is_some() {
            warn!("Player {player_id} is already attached to tournament {tournament_id}");
            return Err(TournamentError::AlreadyAttached {
                tournament_id,
                player_id,
            });
        }

        tx.insert_membership(tournament_id, player_id).await?;
        tx.commit().await?;

        info!("Attached player {player_id} to tournament {tournament_id}");
        Ok(())
    }

    /// Take a player out of standings and pairing; their history is kept
    pub async fn deactivate_player(
        &self,
        player_id: PlayerId,
        tournament: Option<TournamentId>,
    ) -> TournamentResult<()> {
        let mut tx = self.store.begin().await?;
        let tournament_id = target(&mut tx, tournament, LockMode::Exclusive).await?;
        tx.set_active(tournament_id, player_id, false).await?;
        tx.commit().await?;

        info!("Deactivated player {player_id} in tournament {tournament_id}");
        Ok(())
    }

    /// Deactivate every member of the tournament, returning how many changed
    pub async fn deactivate_all_players(
        &self,
        tournament: Option<TournamentId>,
    ) -> TournamentResult<u64> {
        let mut tx = self.store.begin().await?;
        let tournament_id = target(&mut tx, tournament, LockMode::Exclusive).await?;
        let changed = tx.deactivate_all(tournament_id).await?;
        tx.commit().await?;

        info!("Deactivated {changed} player(s) in tournament {tournament_id}");
        Ok(changed)
    }

    /// Number of active members
    pub async fn count_active_players(
        &self,
        tournament: Option<TournamentId>,
    ) -> TournamentResult<usize> {
        let mut tx = self.store.begin().await?;
        let tournament_id = target(&mut tx, tournament, LockMode::Shared).await?;
        let count = tx.count_active(tournament_id).await?;
        tx.commit().await?;
        Ok(count)
    }

    /// Every membership of the tournament, inactive ones included
    pub async fn roster(
        &self,
        tournament: Option<TournamentId>,
    ) -> TournamentResult<Vec<RosterEntry>> {
        let mut tx = self.store.begin().await?;
        let tournament_id = target(&mut tx, tournament, LockMode::Shared).await?;
        let roster = tx.roster(tournament_id).await?;
        tx.commit().await?;
        Ok(roster)
    }

    /// Record a win for `winner` over `loser`
    pub async fn report_match(
        &self,
        winner: PlayerId,
        loser: PlayerId,
        tournament: Option<TournamentId>,
    ) -> TournamentResult<MatchId> {
        self.record(MatchOutcome::Win { winner, loser }, tournament)
            .await
    }

    /// Record a draw between two players
    pub async fn report_draw(
        &self,
        player_a: PlayerId,
        player_b: PlayerId,
        tournament: Option<TournamentId>,
    ) -> TournamentResult<MatchId> {
        self.record(MatchOutcome::Draw { player_a, player_b }, tournament)
            .await
    }

    /// Record a bye and flag the player as having received one
    pub async fn report_bye(
        &self,
        player: PlayerId,
        tournament: Option<TournamentId>,
    ) -> TournamentResult<MatchId> {
        self.record(MatchOutcome::Bye { player }, tournament).await
    }

    async fn record(
        &self,
        outcome: MatchOutcome,
        tournament: Option<TournamentId>,
    ) -> TournamentResult<MatchId> {
        let mut tx = self.store.begin().await?;
        let tournament_id = target(&mut tx, tournament, LockMode::Exclusive).await?;

        let mut memberships = Vec::new();
        for player_id in outcome.players() {
            let membership = tx
                .find_membership(tournament_id, player_id)
                .await?
                .ok_or(TournamentError::MembershipNotFound {
                    tournament_id,
                    player_id,
                })?;
            memberships.push(membership);
        }

        match outcome {
            MatchOutcome::Win { winner: a, loser: b }
            | MatchOutcome::Draw {
                player_a: a,
                player_b: b,
            } if a == b => return Err(TournamentError::SamePlayer(a)),
            MatchOutcome::Bye { player } if memberships.iter().any(|m| m.bye_awarded) => {
                let others_eligible = tx
                    .roster(tournament_id)
                    .await?
                    .iter()
                    .any(|entry| entry.active && !entry.bye_awarded);
                if others_eligible || self.config.bye_policy == ByePolicy::Strict {
                    warn!("Rejected second bye for player {player} in tournament {tournament_id}");
                    return Err(TournamentError::ByeAlreadyAwarded(player));
                }
            }
            _ => {}
        }

        let match_id = append_outcome(&mut tx, tournament_id, outcome).await?;
        tx.commit().await?;

        info!("Recorded match {match_id} in tournament {tournament_id}: {outcome:?}");
        Ok(match_id)
    }

    /// Ranked standings of the active members
    pub async fn standings(
        &self,
        tournament: Option<TournamentId>,
    ) -> TournamentResult<Vec<Standing>> {
        let mut tx = self.store.begin().await?;
        let tournament_id = target(&mut tx, tournament, LockMode::Shared).await?;
        let roster = tx.roster(tournament_id).await?;
        let results = tx.match_results(tournament_id).await?;
        tx.commit().await?;

        debug!(
            "Computing standings for tournament {tournament_id} from {} result(s)",
            results.len()
        );
        compute_standings(&roster, &results)
    }

    /// The tournament's match log as typed outcomes, oldest first
    pub async fn match_history(
        &self,
        tournament: Option<TournamentId>,
    ) -> TournamentResult<Vec<RecordedMatch>> {
        let mut tx = self.store.begin().await?;
        let tournament_id = target(&mut tx, tournament, LockMode::Shared).await?;
        let results = tx.match_results(tournament_id).await?;
        tx.commit().await?;

        decode_matches(&results)
    }

    /// Pair the next round
    ///
    /// With an odd number of active players a bye is awarded and recorded
    /// first, in the same transaction. The remaining players are paired by
    /// adjacent rank.
    pub async fn pairings(
        &self,
        tournament: Option<TournamentId>,
    ) -> TournamentResult<Vec<Pairing>> {
        let mut tx = self.store.begin().await?;
        let tournament_id = target(&mut tx, tournament, LockMode::Exclusive).await?;
        let roster = tx.roster(tournament_id).await?;
        let mut results = tx.match_results(tournament_id).await?;

        let standings = compute_standings(&roster, &results)?;
        let bye = select_bye(
            tournament_id,
            &standings,
            &roster,
            &results,
            self.config.bye_policy,
        )?;

        if let Some(player_id) = bye {
            let match_id =
                append_outcome(&mut tx, tournament_id, MatchOutcome::Bye { player: player_id })
                    .await?;
            results.push(MatchResult {
                match_id,
                player_id,
                points_awarded: WIN_POINTS,
            });
            info!("Awarded bye to player {player_id} in tournament {tournament_id}");
        }

        let remaining: Vec<Standing> = compute_standings(&roster, &results)?
            .into_iter()
            .filter(|s| Some(s.player_id) != bye)
            .collect();
        let pairings = pair_adjacent(&remaining)?;
        tx.commit().await?;

        debug!(
            "Paired {} match(es) in tournament {tournament_id}",
            pairings.len()
        );
        Ok(pairings)
    }

    /// Delete every match of the tournament and clear its bye flags
    pub async fn wipe_matches(&self, tournament: Option<TournamentId>) -> TournamentResult<u64> {
        let mut tx = self.store.begin().await?;
        let tournament_id = target(&mut tx, tournament, LockMode::Exclusive).await?;
        let deleted = tx.delete_matches(tournament_id).await?;
        tx.commit().await?;

        warn!("Deleted {deleted} match(es) from tournament {tournament_id}");
        Ok(deleted)
    }

    /// Delete every player in every tournament, along with all match history
    pub async fn wipe_all_players(&self) -> TournamentResult<u64> {
        let mut tx = self.store.begin().await?;
        let deleted = tx.delete_all_players().await?;
        tx.commit().await?;

        warn!("Deleted {deleted} player(s) and all match history");
        Ok(deleted)
    }
}

/// Most recent tournament, created if the store has none
///
/// The empty case is checked again under the creation lock, so concurrent
/// callers agree on a single new tournament.
async fn resolve_in(tx: &mut Tx<'_>) -> TournamentResult<TournamentId> {
    if let Some(id) = tx.latest_tournament().await? {
        return Ok(id);
    }

    tx.lock_tournament_creation().await?;
    if let Some(id) = tx.latest_tournament().await? {
        return Ok(id);
    }

    let id = tx.create_tournament().await?;
    info!("No tournament found, created tournament {id}");
    Ok(id)
}

/// Resolve the tournament and lock it for the rest of the transaction
async fn target(
    tx: &mut Tx<'_>,
    tournament: Option<TournamentId>,
    mode: LockMode,
) -> TournamentResult<TournamentId> {
    let id = match tournament {
        Some(id) => id,
        None => resolve_in(tx).await?,
    };
    tx.lock_tournament(id, mode).await?;
    Ok(id)
}

/// Write one match and its results; a bye also sets the membership flag
async fn append_outcome(
    tx: &mut Tx<'_>,
    tournament_id: TournamentId,
    outcome: MatchOutcome,
) -> TournamentResult<MatchId> {
    let match_id = tx.insert_match(tournament_id).await?;
    for (player_id, points_awarded) in outcome.scores() {
        tx.insert_result(MatchResult {
            match_id,
            player_id,
            points_awarded,
        })
        .await?;
    }

    if let MatchOutcome::Bye { player } = outcome {
        tx.mark_bye_awarded(tournament_id, player).await?;
    }

    Ok(match_id)
}
