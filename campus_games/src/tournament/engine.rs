//! Tournament engine: schedule generation and the score → winner → standings cascade.

use super::{
    errors::{EngineError, EngineResult},
    locks::EventLocks,
    models::{
        ClearedSchedule, EventId, Game, GameId, GameStatus, GeneratedSchedule, LeaderboardEntry,
        Matchup, MatchupId, NewGame, NewMatchup, ParticipantId, Schedule, ScoreSubmission,
    },
    results::{OutcomeDecision, derive_outcome, resolve_winner},
    schedule::round_robin,
    standings::compute_standings,
};
use crate::db::{EventTransaction, ParticipantScope, TournamentStore};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Tournament engine configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Which participants a schedule is generated for
    pub participant_scope: ParticipantScope,
    /// Fixed seed for the participant shuffle (random when `None`)
    pub shuffle_seed: Option<u64>,
}

/// Tournament engine
///
/// Every write runs inside one event-scoped store transaction while holding
/// the event's in-process lock, so readers never observe a partial schedule
/// or a half-rewritten leaderboard.
pub struct TournamentEngine<S: TournamentStore> {
    store: Arc<S>,
    config: EngineConfig,
    event_locks: EventLocks,
}

impl<S: TournamentStore> Clone for TournamentEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
            event_locks: self.event_locks.clone(),
        }
    }
}

impl<S: TournamentStore> TournamentEngine<S> {
    /// Create a new tournament engine
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            event_locks: EventLocks::new(),
        }
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generate and persist the round-robin schedule for an event
    ///
    /// Creates one matchup per pair with `required_games` and seeds a zeroed
    /// leaderboard row for every participant, all in one transaction.
    ///
    /// # Errors
    ///
    /// * `EngineError::InvalidRequiredGames` - `required_games` below one
    /// * `EngineError::InsufficientParticipants` - Fewer than two participants
    /// * `EngineError::DuplicateScheduleConflict` - Event already has matchups
    pub async fn generate_schedule(
        &self,
        event_id: EventId,
        required_games: i32,
    ) -> EngineResult<GeneratedSchedule> {
        if required_games < 1 {
            return Err(EngineError::InvalidRequiredGames(required_games));
        }

        let participants = self
            .store
            .list_participants(self.config.participant_scope, event_id)
            .await?;
        let schedule = self.build_schedule(&participants)?;

        let _guard = self.event_locks.acquire(event_id).await;
        let mut tx = self.store.begin(event_id).await?;

        if tx.has_schedule(event_id).await? {
            return Err(EngineError::DuplicateScheduleConflict(event_id));
        }

        let seeded: BTreeSet<ParticipantId> = participants.iter().copied().collect();
        let mut leaderboard = Vec::with_capacity(seeded.len());
        for participant_id in seeded {
            let entry = LeaderboardEntry::seed(event_id, participant_id);
            tx.insert_leaderboard_entry(&entry).await?;
            leaderboard.push(entry);
        }

        let mut matchups = Vec::with_capacity(schedule.pair_count());
        for round in &schedule.rounds {
            for &(participant_a, participant_b) in &round.pairs {
                if tx
                    .matchup_exists(event_id, participant_a, participant_b)
                    .await?
                {
                    return Err(EngineError::DuplicateScheduleConflict(event_id));
                }

                let matchup = tx
                    .insert_matchup(&NewMatchup {
                        event_id,
                        participant_a,
                        participant_b,
                        required_games,
                        round: round.index,
                    })
                    .await?;
                matchups.push(matchup);
            }
        }

        tx.commit().await?;

        log::info!(
            "Generated schedule for event {}: {} participants, {} rounds, {} matchups (best of {})",
            event_id,
            leaderboard.len(),
            schedule.rounds.len(),
            matchups.len(),
            required_games
        );

        Ok(GeneratedSchedule {
            event_id,
            schedule,
            matchups,
            leaderboard,
        })
    }

    /// Record the final score of a game and cascade the result
    ///
    /// Derives the game outcome, extends the matchup on a draw, resolves the
    /// matchup winner and, when the winner changed, recomputes the event
    /// standings. Everything commits together or not at all.
    ///
    /// # Errors
    ///
    /// * `EngineError::GameNotFound` - Game doesn't exist
    /// * `EngineError::MatchupNotFound` - Game's matchup doesn't exist
    pub async fn submit_game_score(
        &self,
        game_id: GameId,
        score_a: i32,
        score_b: i32,
    ) -> EngineResult<ScoreSubmission> {
        let event_id = self.event_of_game(game_id).await?;

        let _guard = self.event_locks.acquire(event_id).await;
        let mut tx = self.store.begin(event_id).await?;

        let mut game = tx
            .find_game(game_id)
            .await?
            .ok_or(EngineError::GameNotFound(game_id))?;
        let mut matchup = tx
            .find_matchup(game.matchup_id)
            .await?
            .ok_or(EngineError::MatchupNotFound(game.matchup_id))?;

        let was_drawn = game.is_drawn();
        let decision = derive_outcome(Some(score_a), Some(score_b));
        let (outcome_a, outcome_b) = decision.outcomes();
        game.score_a = Some(score_a);
        game.score_b = Some(score_b);
        game.outcome_a = outcome_a;
        game.outcome_b = outcome_b;
        game.status = GameStatus::Ended;
        tx.update_game(&game).await?;

        let mut matchup_changed = false;
        if decision == OutcomeDecision::Drawn && !was_drawn {
            matchup.required_games += 1;
            matchup_changed = true;
            log::info!(
                "Game {} of matchup {} drawn, matchup now requires {} games",
                game.game_number,
                matchup.id,
                matchup.required_games
            );
        }

        let games = tx.list_games(matchup.id).await?;
        let winner = resolve_winner(&matchup, &games);
        let standings_changed = winner != matchup.winner;
        if standings_changed {
            log::info!(
                "Matchup {} winner changed from {:?} to {:?}",
                matchup.id,
                matchup.winner,
                winner
            );
            matchup.winner = winner;
            matchup_changed = true;
        }

        if matchup_changed {
            tx.update_matchup(&matchup).await?;
        }

        let recomputed = if standings_changed {
            Some(recompute_in(&mut tx, event_id).await?)
        } else {
            None
        };

        tx.commit().await?;

        let leaderboard = match recomputed {
            Some(rows) => rows,
            None => self.store.get_leaderboard(event_id).await?,
        };

        log::debug!(
            "Recorded {}-{} for game {} (matchup {}, event {})",
            score_a,
            score_b,
            game_id,
            matchup.id,
            event_id
        );

        Ok(ScoreSubmission {
            game,
            matchup,
            leaderboard,
            standings_changed,
        })
    }

    /// Re-resolve a matchup's winner from its recorded games
    ///
    /// Idempotent; recomputes standings only when the winner changed.
    ///
    /// # Errors
    ///
    /// * `EngineError::MatchupNotFound` - Matchup doesn't exist
    pub async fn resolve_matchup(&self, matchup_id: MatchupId) -> EngineResult<Option<ParticipantId>> {
        let event_id = self.get_matchup(matchup_id).await?.event_id;

        let _guard = self.event_locks.acquire(event_id).await;
        let mut tx = self.store.begin(event_id).await?;

        let mut matchup = tx
            .find_matchup(matchup_id)
            .await?
            .ok_or(EngineError::MatchupNotFound(matchup_id))?;
        let games = tx.list_games(matchup_id).await?;
        let winner = resolve_winner(&matchup, &games);

        if winner != matchup.winner {
            matchup.winner = winner;
            tx.update_matchup(&matchup).await?;
            recompute_in(&mut tx, event_id).await?;
            tx.commit().await?;
            log::info!("Matchup {} resolved to winner {:?}", matchup_id, winner);
        }

        Ok(winner)
    }

    /// Recompute and replace the whole leaderboard of an event
    pub async fn recompute_standings(&self, event_id: EventId) -> EngineResult<Vec<LeaderboardEntry>> {
        let _guard = self.event_locks.acquire(event_id).await;
        let mut tx = self.store.begin(event_id).await?;
        let leaderboard = recompute_in(&mut tx, event_id).await?;
        tx.commit().await?;
        Ok(leaderboard)
    }

    /// Current leaderboard of an event ordered by rank
    pub async fn get_standings(&self, event_id: EventId) -> EngineResult<Vec<LeaderboardEntry>> {
        self.store.get_leaderboard(event_id).await
    }

    /// Create a game inside a matchup
    ///
    /// # Errors
    ///
    /// * `EngineError::MatchupNotFound` - Matchup doesn't exist
    /// * `EngineError::InvalidGameNumber` - Number outside `1..=required_games`
    /// * `EngineError::DuplicateGameNumber` - Matchup already has this game number
    pub async fn create_game(&self, new_game: NewGame) -> EngineResult<Game> {
        let event_id = self.get_matchup(new_game.matchup_id).await?.event_id;

        let _guard = self.event_locks.acquire(event_id).await;
        let mut tx = self.store.begin(event_id).await?;

        let matchup = tx
            .find_matchup(new_game.matchup_id)
            .await?
            .ok_or(EngineError::MatchupNotFound(new_game.matchup_id))?;

        if new_game.game_number < 1 || new_game.game_number > matchup.required_games {
            return Err(EngineError::InvalidGameNumber {
                game_number: new_game.game_number,
                required_games: matchup.required_games,
            });
        }

        if tx
            .find_game_by_number(matchup.id, new_game.game_number)
            .await?
            .is_some()
        {
            return Err(EngineError::DuplicateGameNumber {
                matchup_id: matchup.id,
                game_number: new_game.game_number,
            });
        }

        let game = tx.insert_game(&new_game).await?;
        tx.commit().await?;

        log::debug!("Created game {} (#{}) in matchup {}", game.id, game.game_number, matchup.id);

        Ok(game)
    }

    /// Remove every game, matchup and leaderboard row of an event
    pub async fn clear_schedule(&self, event_id: EventId) -> EngineResult<ClearedSchedule> {
        let _guard = self.event_locks.acquire(event_id).await;
        let mut tx = self.store.begin(event_id).await?;
        let cleared = tx.clear_event(event_id).await?;
        tx.commit().await?;

        log::warn!(
            "Cleared schedule for event {}: {} matchups, {} games, {} leaderboard rows",
            event_id,
            cleared.matchups,
            cleared.games,
            cleared.leaderboard_rows
        );

        Ok(cleared)
    }

    /// Get matchup by ID
    pub async fn get_matchup(&self, matchup_id: MatchupId) -> EngineResult<Matchup> {
        self.store
            .find_matchup(matchup_id)
            .await?
            .ok_or(EngineError::MatchupNotFound(matchup_id))
    }

    /// List matchups of an event
    pub async fn list_matchups(&self, event_id: EventId) -> EngineResult<Vec<Matchup>> {
        self.store.list_matchups(event_id).await
    }

    /// Get game by ID
    pub async fn get_game(&self, game_id: GameId) -> EngineResult<Game> {
        self.store
            .find_game(game_id)
            .await?
            .ok_or(EngineError::GameNotFound(game_id))
    }

    /// List games of a matchup
    pub async fn list_games(&self, matchup_id: MatchupId) -> EngineResult<Vec<Game>> {
        self.store.list_games(matchup_id).await
    }

    fn build_schedule(&self, participants: &[ParticipantId]) -> EngineResult<Schedule> {
        match self.config.shuffle_seed {
            Some(seed) => round_robin(participants, &mut StdRng::seed_from_u64(seed)),
            None => round_robin(participants, &mut rand::rng()),
        }
    }

    async fn event_of_game(&self, game_id: GameId) -> EngineResult<EventId> {
        let game = self.get_game(game_id).await?;
        Ok(self.get_matchup(game.matchup_id).await?.event_id)
    }
}

/// Recompute standings inside an open transaction and write them
async fn recompute_in<T: EventTransaction>(
    tx: &mut T,
    event_id: EventId,
) -> EngineResult<Vec<LeaderboardEntry>> {
    let matchups = tx.list_matchups(event_id).await?;
    let rank_points = tx.rank_points(event_id).await?;
    let leaderboard = compute_standings(event_id, &matchups, &rank_points);
    tx.replace_leaderboard(event_id, &leaderboard).await?;

    log::debug!(
        "Recomputed standings for event {} ({} rows)",
        event_id,
        leaderboard.len()
    );

    Ok(leaderboard)
}
