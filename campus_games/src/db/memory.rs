//! In-memory tournament store.
//!
//! Used by tests, benchmarks and embedders without a database. A transaction
//! locks the whole store and works on a copy of it; commit swaps the copy in,
//! dropping the transaction discards it.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::repository::{EventTransaction, ParticipantScope, TournamentStore};
use crate::tournament::{
    ClearedSchedule, EngineError, EngineResult, EventId, Game, GameId, LeaderboardEntry, Matchup,
    MatchupId, NewGame, NewMatchup, Outcome, ParticipantId, RankPoints,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    participants: BTreeSet<ParticipantId>,
    registrations: HashMap<EventId, BTreeSet<ParticipantId>>,
    rank_points: HashMap<EventId, RankPoints>,
    matchups: BTreeMap<MatchupId, Matchup>,
    games: BTreeMap<GameId, Game>,
    leaderboards: HashMap<EventId, BTreeMap<ParticipantId, LeaderboardEntry>>,
    next_matchup_id: MatchupId,
    next_game_id: GameId,
}

impl MemoryState {
    fn games_of(&self, matchup_id: MatchupId) -> Vec<Game> {
        let mut games: Vec<Game> = self
            .games
            .values()
            .filter(|g| g.matchup_id == matchup_id)
            .cloned()
            .collect();
        games.sort_by_key(|g| g.game_number);
        games
    }

    fn matchups_of(&self, event_id: EventId) -> Vec<Matchup> {
        self.matchups
            .values()
            .filter(|m| m.event_id == event_id)
            .cloned()
            .collect()
    }

    fn leaderboard_of(&self, event_id: EventId) -> Vec<LeaderboardEntry> {
        let mut rows: Vec<LeaderboardEntry> = self
            .leaderboards
            .get(&event_id)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default();
        rows.sort_by_key(|e| (e.rank, e.participant_id));
        rows
    }
}

/// In-memory implementation of `TournamentStore`
#[derive(Clone, Default)]
pub struct MemoryTournamentStore {
    state: Arc<Mutex<MemoryState>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryTournamentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register participants for an event (also makes them globally known)
    pub async fn register_participants(&self, event_id: EventId, participants: &[ParticipantId]) {
        let mut state = self.state.lock().await;
        state.participants.extend(participants.iter().copied());
        state
            .registrations
            .entry(event_id)
            .or_default()
            .extend(participants.iter().copied());
    }

    /// Add participants that are not registered for any event
    pub async fn add_participants(&self, participants: &[ParticipantId]) {
        let mut state = self.state.lock().await;
        state.participants.extend(participants.iter().copied());
    }

    /// Configure rank points for an event
    pub async fn set_rank_points(&self, event_id: EventId, points: RankPoints) {
        self.state.lock().await.rank_points.insert(event_id, points);
    }

    /// Make the next commit fail with a store error (the transaction rolls back)
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TournamentStore for MemoryTournamentStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self, _event_id: EventId) -> EngineResult<MemoryTransaction> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTransaction {
            guard,
            working,
            fail_commit: self.fail_next_commit.swap(false, Ordering::SeqCst),
        })
    }

    async fn list_participants(
        &self,
        scope: ParticipantScope,
        event_id: EventId,
    ) -> EngineResult<Vec<ParticipantId>> {
        let state = self.state.lock().await;
        let participants: Vec<ParticipantId> = match scope {
            ParticipantScope::EventFiltered => state
                .registrations
                .get(&event_id)
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default(),
            ParticipantScope::Global => state.participants.iter().copied().collect(),
        };
        Ok(participants)
    }

    async fn find_game(&self, game_id: GameId) -> EngineResult<Option<Game>> {
        Ok(self.state.lock().await.games.get(&game_id).cloned())
    }

    async fn find_matchup(&self, matchup_id: MatchupId) -> EngineResult<Option<Matchup>> {
        Ok(self.state.lock().await.matchups.get(&matchup_id).cloned())
    }

    async fn list_matchups(&self, event_id: EventId) -> EngineResult<Vec<Matchup>> {
        Ok(self.state.lock().await.matchups_of(event_id))
    }

    async fn list_games(&self, matchup_id: MatchupId) -> EngineResult<Vec<Game>> {
        Ok(self.state.lock().await.games_of(matchup_id))
    }

    async fn get_leaderboard(&self, event_id: EventId) -> EngineResult<Vec<LeaderboardEntry>> {
        Ok(self.state.lock().await.leaderboard_of(event_id))
    }
}

/// In-memory event transaction
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_commit: bool,
}

#[async_trait]
impl EventTransaction for MemoryTransaction {
    async fn has_schedule(&mut self, event_id: EventId) -> EngineResult<bool> {
        Ok(self
            .working
            .matchups
            .values()
            .any(|m| m.event_id == event_id))
    }

    async fn matchup_exists(
        &mut self,
        event_id: EventId,
        first: ParticipantId,
        second: ParticipantId,
    ) -> EngineResult<bool> {
        Ok(self
            .working
            .matchups
            .values()
            .any(|m| m.event_id == event_id && m.involves(first) && m.involves(second)))
    }

    async fn insert_matchup(&mut self, matchup: &NewMatchup) -> EngineResult<Matchup> {
        if self
            .matchup_exists(matchup.event_id, matchup.participant_a, matchup.participant_b)
            .await?
        {
            return Err(EngineError::DuplicateScheduleConflict(matchup.event_id));
        }

        self.working.next_matchup_id += 1;
        let inserted = Matchup {
            id: self.working.next_matchup_id,
            event_id: matchup.event_id,
            participant_a: matchup.participant_a,
            participant_b: matchup.participant_b,
            required_games: matchup.required_games,
            winner: None,
        };
        self.working.matchups.insert(inserted.id, inserted.clone());
        Ok(inserted)
    }

    async fn insert_leaderboard_entry(&mut self, entry: &LeaderboardEntry) -> EngineResult<()> {
        let rows = self.working.leaderboards.entry(entry.event_id).or_default();
        if rows.contains_key(&entry.participant_id) {
            return Err(EngineError::DuplicateScheduleConflict(entry.event_id));
        }
        rows.insert(entry.participant_id, entry.clone());
        Ok(())
    }

    async fn find_game(&mut self, game_id: GameId) -> EngineResult<Option<Game>> {
        Ok(self.working.games.get(&game_id).cloned())
    }

    async fn find_game_by_number(
        &mut self,
        matchup_id: MatchupId,
        game_number: i32,
    ) -> EngineResult<Option<Game>> {
        Ok(self
            .working
            .games
            .values()
            .find(|g| g.matchup_id == matchup_id && g.game_number == game_number)
            .cloned())
    }

    async fn find_matchup(&mut self, matchup_id: MatchupId) -> EngineResult<Option<Matchup>> {
        Ok(self.working.matchups.get(&matchup_id).cloned())
    }

    async fn list_matchups(&mut self, event_id: EventId) -> EngineResult<Vec<Matchup>> {
        Ok(self.working.matchups_of(event_id))
    }

    async fn list_games(&mut self, matchup_id: MatchupId) -> EngineResult<Vec<Game>> {
        Ok(self.working.games_of(matchup_id))
    }

    async fn insert_game(&mut self, game: &NewGame) -> EngineResult<Game> {
        self.working.next_game_id += 1;
        let inserted = Game {
            id: self.working.next_game_id,
            matchup_id: game.matchup_id,
            game_number: game.game_number,
            score_a: None,
            score_b: None,
            status: game.status,
            outcome_a: Outcome::Unknown,
            outcome_b: Outcome::Unknown,
            scheduled_at: game.scheduled_at,
        };
        self.working.games.insert(inserted.id, inserted.clone());
        Ok(inserted)
    }

    async fn update_game(&mut self, game: &Game) -> EngineResult<()> {
        if let Some(stored) = self.working.games.get_mut(&game.id) {
            *stored = game.clone();
        }
        Ok(())
    }

    async fn update_matchup(&mut self, matchup: &Matchup) -> EngineResult<()> {
        if let Some(stored) = self.working.matchups.get_mut(&matchup.id) {
            stored.required_games = matchup.required_games;
            stored.winner = matchup.winner;
        }
        Ok(())
    }

    async fn rank_points(&mut self, event_id: EventId) -> EngineResult<RankPoints> {
        Ok(self
            .working
            .rank_points
            .get(&event_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_leaderboard(
        &mut self,
        event_id: EventId,
        entries: &[LeaderboardEntry],
    ) -> EngineResult<()> {
        let rows = entries
            .iter()
            .map(|e| (e.participant_id, e.clone()))
            .collect();
        self.working.leaderboards.insert(event_id, rows);
        Ok(())
    }

    async fn clear_event(&mut self, event_id: EventId) -> EngineResult<ClearedSchedule> {
        let matchup_ids: BTreeSet<MatchupId> = self
            .working
            .matchups
            .values()
            .filter(|m| m.event_id == event_id)
            .map(|m| m.id)
            .collect();

        let games_before = self.working.games.len();
        self.working
            .games
            .retain(|_, g| !matchup_ids.contains(&g.matchup_id));
        let games = (games_before - self.working.games.len()) as u64;

        self.working
            .matchups
            .retain(|id, _| !matchup_ids.contains(id));

        let leaderboard_rows = self
            .working
            .leaderboards
            .remove(&event_id)
            .map(|rows| rows.len() as u64)
            .unwrap_or(0);

        Ok(ClearedSchedule {
            games,
            matchups: matchup_ids.len() as u64,
            leaderboard_rows,
        })
    }

    async fn commit(mut self) -> EngineResult<()> {
        if self.fail_commit {
            return Err(EngineError::StoreUnavailable(sqlx::Error::PoolTimedOut));
        }
        *self.guard = self.working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_matchup(a: ParticipantId, b: ParticipantId) -> NewMatchup {
        NewMatchup {
            event_id: 1,
            participant_a: a,
            participant_b: b,
            required_games: 3,
            round: 0,
        }
    }

    #[tokio::test]
    async fn test_uncommitted_transaction_rolls_back() {
        let store = MemoryTournamentStore::new();

        {
            let mut tx = store.begin(1).await.unwrap();
            tx.insert_matchup(&new_matchup(1, 2)).await.unwrap();
            // dropped without commit
        }

        assert!(store.list_matchups(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryTournamentStore::new();

        let mut tx = store.begin(1).await.unwrap();
        let matchup = tx.insert_matchup(&new_matchup(1, 2)).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.find_matchup(matchup.id).await.unwrap(), Some(matchup));
    }

    #[tokio::test]
    async fn test_unordered_pair_is_unique() {
        let store = MemoryTournamentStore::new();
        let mut tx = store.begin(1).await.unwrap();
        tx.insert_matchup(&new_matchup(1, 2)).await.unwrap();

        assert!(tx.matchup_exists(1, 2, 1).await.unwrap());
        let err = tx.insert_matchup(&new_matchup(2, 1)).await.unwrap_err();
        assert!(matches!(err, EngineError::DuplicateScheduleConflict(1)));
    }

    #[tokio::test]
    async fn test_failed_commit_discards_writes() {
        let store = MemoryTournamentStore::new();
        store.fail_next_commit();

        let mut tx = store.begin(1).await.unwrap();
        tx.insert_matchup(&new_matchup(1, 2)).await.unwrap();
        assert!(tx.commit().await.is_err());

        assert!(store.list_matchups(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_participant_scopes() {
        let store = MemoryTournamentStore::new();
        store.register_participants(1, &[3, 1]).await;
        store.register_participants(2, &[2]).await;
        store.add_participants(&[9]).await;

        let event = store
            .list_participants(ParticipantScope::EventFiltered, 1)
            .await
            .unwrap();
        assert_eq!(event, vec![1, 3]);

        let global = store
            .list_participants(ParticipantScope::Global, 1)
            .await
            .unwrap();
        assert_eq!(global, vec![1, 2, 3, 9]);

        let unknown = store
            .list_participants(ParticipantScope::EventFiltered, 5)
            .await
            .unwrap();
        assert!(unknown.is_empty());
    }
}
