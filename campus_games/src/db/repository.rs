//! Store traits for the tournament engine and their PostgreSQL implementation.
//!
//! Reads that do not need isolation go through [`TournamentStore`]. Every
//! read-modify-write runs inside an [`EventTransaction`], which is scoped to a
//! single event and serialized against other transactions on that event.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::tournament::{
    ClearedSchedule, EngineError, EngineResult, EventId, Game, GameId, GameStatus,
    LeaderboardEntry, Matchup, MatchupId, NewGame, NewMatchup, Outcome, ParticipantId,
    RankPoints,
};

/// Where participant IDs for schedule generation come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantScope {
    /// Participants registered for the event
    #[default]
    EventFiltered,
    /// Every known participant
    Global,
}

impl std::str::FromStr for ParticipantScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "event" | "event_filtered" | "event-filtered" => Ok(ParticipantScope::EventFiltered),
            "global" | "all" => Ok(ParticipantScope::Global),
            other => Err(format!("unknown participant scope: {other}")),
        }
    }
}

/// Trait for tournament store operations outside a transaction
#[async_trait]
pub trait TournamentStore: Send + Sync {
    /// Transaction handle returned by [`TournamentStore::begin`]
    type Transaction: EventTransaction;

    /// Begin a transaction scoped to one event
    ///
    /// Implementations must serialize transactions on the same event.
    async fn begin(&self, event_id: EventId) -> EngineResult<Self::Transaction>;

    /// List participant IDs for schedule generation
    async fn list_participants(
        &self,
        scope: ParticipantScope,
        event_id: EventId,
    ) -> EngineResult<Vec<ParticipantId>>;

    /// Find game by ID
    async fn find_game(&self, game_id: GameId) -> EngineResult<Option<Game>>;

    /// Find matchup by ID
    async fn find_matchup(&self, matchup_id: MatchupId) -> EngineResult<Option<Matchup>>;

    /// List matchups of an event
    async fn list_matchups(&self, event_id: EventId) -> EngineResult<Vec<Matchup>>;

    /// List games of a matchup ordered by game number
    async fn list_games(&self, matchup_id: MatchupId) -> EngineResult<Vec<Game>>;

    /// Leaderboard of an event ordered by rank, then participant
    async fn get_leaderboard(&self, event_id: EventId) -> EngineResult<Vec<LeaderboardEntry>>;
}

/// Trait for operations inside an event-scoped transaction
///
/// Dropping the transaction without calling [`EventTransaction::commit`]
/// rolls every write back.
#[async_trait]
pub trait EventTransaction: Send {
    /// Whether the event has any matchup
    async fn has_schedule(&mut self, event_id: EventId) -> EngineResult<bool>;

    /// Whether a matchup exists for the unordered pair within the event
    async fn matchup_exists(
        &mut self,
        event_id: EventId,
        first: ParticipantId,
        second: ParticipantId,
    ) -> EngineResult<bool>;

    /// Insert a matchup without a winner
    async fn insert_matchup(&mut self, matchup: &NewMatchup) -> EngineResult<Matchup>;

    /// Insert a leaderboard row
    async fn insert_leaderboard_entry(&mut self, entry: &LeaderboardEntry) -> EngineResult<()>;

    /// Find game by ID
    async fn find_game(&mut self, game_id: GameId) -> EngineResult<Option<Game>>;

    /// Find a matchup's game by its number
    async fn find_game_by_number(
        &mut self,
        matchup_id: MatchupId,
        game_number: i32,
    ) -> EngineResult<Option<Game>>;

    /// Find matchup by ID
    async fn find_matchup(&mut self, matchup_id: MatchupId) -> EngineResult<Option<Matchup>>;

    /// List matchups of an event
    async fn list_matchups(&mut self, event_id: EventId) -> EngineResult<Vec<Matchup>>;

    /// List games of a matchup ordered by game number
    async fn list_games(&mut self, matchup_id: MatchupId) -> EngineResult<Vec<Game>>;

    /// Insert a game with no scores
    async fn insert_game(&mut self, game: &NewGame) -> EngineResult<Game>;

    /// Persist scores, status and outcome codes of a game
    async fn update_game(&mut self, game: &Game) -> EngineResult<()>;

    /// Persist required games and winner of a matchup
    async fn update_matchup(&mut self, matchup: &Matchup) -> EngineResult<()>;

    /// Rank points configured for the event
    async fn rank_points(&mut self, event_id: EventId) -> EngineResult<RankPoints>;

    /// Replace every leaderboard row of the event
    async fn replace_leaderboard(
        &mut self,
        event_id: EventId,
        entries: &[LeaderboardEntry],
    ) -> EngineResult<()>;

    /// Delete games, matchups and leaderboard rows of the event
    async fn clear_event(&mut self, event_id: EventId) -> EngineResult<ClearedSchedule>;

    /// Commit all writes
    async fn commit(self) -> EngineResult<()>;
}

const MATCHUP_COLUMNS: &str =
    "id, event_id, participant_a_id, participant_b_id, required_games, winner_id";

const GAME_COLUMNS: &str = "id, matchup_id, game_number, participant_a_score, participant_b_score, \
     status, participant_a_outcome, participant_b_outcome, scheduled_at";

fn matchup_from_row(row: &PgRow) -> Result<Matchup, sqlx::Error> {
    Ok(Matchup {
        id: row.try_get("id")?,
        event_id: row.try_get("event_id")?,
        participant_a: row.try_get("participant_a_id")?,
        participant_b: row.try_get("participant_b_id")?,
        required_games: row.try_get("required_games")?,
        winner: row.try_get("winner_id")?,
    })
}

fn game_from_row(row: &PgRow) -> Result<Game, sqlx::Error> {
    Ok(Game {
        id: row.try_get("id")?,
        matchup_id: row.try_get("matchup_id")?,
        game_number: row.try_get("game_number")?,
        score_a: row.try_get("participant_a_score")?,
        score_b: row.try_get("participant_b_score")?,
        status: GameStatus::from_code(row.try_get("status")?),
        outcome_a: Outcome::from_code(row.try_get("participant_a_outcome")?),
        outcome_b: Outcome::from_code(row.try_get("participant_b_outcome")?),
        scheduled_at: row
            .try_get::<Option<chrono::NaiveDateTime>, _>("scheduled_at")?
            .map(|dt| dt.and_utc()),
    })
}

fn leaderboard_from_row(row: &PgRow) -> Result<LeaderboardEntry, sqlx::Error> {
    Ok(LeaderboardEntry {
        event_id: row.try_get("event_id")?,
        participant_id: row.try_get("participant_id")?,
        rank: row.try_get::<i32, _>("rank")? as u32,
        points: row.try_get("points")?,
    })
}

/// Default PostgreSQL implementation of `TournamentStore`
#[derive(Clone)]
pub struct PgTournamentStore {
    pool: PgPool,
}

impl PgTournamentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TournamentStore for PgTournamentStore {
    type Transaction = PgEventTransaction;

    async fn begin(&self, event_id: EventId) -> EngineResult<PgEventTransaction> {
        let mut tx = self.pool.begin().await?;

        // Held until commit or rollback; serializes writers on this event
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;

        Ok(PgEventTransaction { tx })
    }

    async fn list_participants(
        &self,
        scope: ParticipantScope,
        event_id: EventId,
    ) -> EngineResult<Vec<ParticipantId>> {
        let rows = match scope {
            ParticipantScope::EventFiltered => {
                sqlx::query(
                    "SELECT DISTINCT participant_id AS id FROM event_registrations
                     WHERE event_id = $1 ORDER BY id",
                )
                .bind(event_id)
                .fetch_all(&self.pool)
                .await?
            }
            ParticipantScope::Global => {
                sqlx::query("SELECT id FROM participants ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows
            .iter()
            .map(|row| row.try_get("id"))
            .collect::<Result<_, _>>()?)
    }

    async fn find_game(&self, game_id: GameId) -> EngineResult<Option<Game>> {
        let row = sqlx::query(&format!("SELECT {GAME_COLUMNS} FROM games WHERE id = $1"))
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(game_from_row).transpose()?)
    }

    async fn find_matchup(&self, matchup_id: MatchupId) -> EngineResult<Option<Matchup>> {
        let row = sqlx::query(&format!(
            "SELECT {MATCHUP_COLUMNS} FROM matchups WHERE id = $1"
        ))
        .bind(matchup_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(matchup_from_row).transpose()?)
    }

    async fn list_matchups(&self, event_id: EventId) -> EngineResult<Vec<Matchup>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCHUP_COLUMNS} FROM matchups WHERE event_id = $1 ORDER BY id"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(matchup_from_row)
            .collect::<Result<_, _>>()?)
    }

    async fn list_games(&self, matchup_id: MatchupId) -> EngineResult<Vec<Game>> {
        let rows = sqlx::query(&format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE matchup_id = $1 ORDER BY game_number"
        ))
        .bind(matchup_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(game_from_row).collect::<Result<_, _>>()?)
    }

    async fn get_leaderboard(&self, event_id: EventId) -> EngineResult<Vec<LeaderboardEntry>> {
        let rows = sqlx::query(
            "SELECT event_id, participant_id, rank, points FROM event_leaderboards
             WHERE event_id = $1 ORDER BY rank, participant_id",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(leaderboard_from_row)
            .collect::<Result<_, _>>()?)
    }
}

/// PostgreSQL event transaction
pub struct PgEventTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl EventTransaction for PgEventTransaction {
    async fn has_schedule(&mut self, event_id: EventId) -> EngineResult<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM matchups WHERE event_id = $1) AS found")
            .bind(event_id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(row.try_get("found")?)
    }

    async fn matchup_exists(
        &mut self,
        event_id: EventId,
        first: ParticipantId,
        second: ParticipantId,
    ) -> EngineResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(
                SELECT 1 FROM matchups
                WHERE event_id = $1
                  AND LEAST(participant_a_id, participant_b_id) = LEAST($2::BIGINT, $3::BIGINT)
                  AND GREATEST(participant_a_id, participant_b_id) = GREATEST($2::BIGINT, $3::BIGINT)
             ) AS found",
        )
        .bind(event_id)
        .bind(first)
        .bind(second)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.try_get("found")?)
    }

    async fn insert_matchup(&mut self, matchup: &NewMatchup) -> EngineResult<Matchup> {
        let row = sqlx::query(&format!(
            "INSERT INTO matchups (event_id, participant_a_id, participant_b_id, required_games, round_index)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {MATCHUP_COLUMNS}"
        ))
        .bind(matchup.event_id)
        .bind(matchup.participant_a)
        .bind(matchup.participant_b)
        .bind(matchup.required_games)
        .bind(matchup.round as i32)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| EngineError::from_schedule_insert(e, matchup.event_id))?;

        Ok(matchup_from_row(&row)?)
    }

    async fn insert_leaderboard_entry(&mut self, entry: &LeaderboardEntry) -> EngineResult<()> {
        sqlx::query(
            "INSERT INTO event_leaderboards (event_id, participant_id, rank, points)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(entry.event_id)
        .bind(entry.participant_id)
        .bind(entry.rank as i32)
        .bind(entry.points)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| EngineError::from_schedule_insert(e, entry.event_id))?;

        Ok(())
    }

    async fn find_game(&mut self, game_id: GameId) -> EngineResult<Option<Game>> {
        let row = sqlx::query(&format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE id = $1 FOR UPDATE"
        ))
        .bind(game_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(game_from_row).transpose()?)
    }

    async fn find_game_by_number(
        &mut self,
        matchup_id: MatchupId,
        game_number: i32,
    ) -> EngineResult<Option<Game>> {
        let row = sqlx::query(&format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE matchup_id = $1 AND game_number = $2"
        ))
        .bind(matchup_id)
        .bind(game_number)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(game_from_row).transpose()?)
    }

    async fn find_matchup(&mut self, matchup_id: MatchupId) -> EngineResult<Option<Matchup>> {
        let row = sqlx::query(&format!(
            "SELECT {MATCHUP_COLUMNS} FROM matchups WHERE id = $1 FOR UPDATE"
        ))
        .bind(matchup_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(matchup_from_row).transpose()?)
    }

    async fn list_matchups(&mut self, event_id: EventId) -> EngineResult<Vec<Matchup>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCHUP_COLUMNS} FROM matchups WHERE event_id = $1 ORDER BY id"
        ))
        .bind(event_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .iter()
            .map(matchup_from_row)
            .collect::<Result<_, _>>()?)
    }

    async fn list_games(&mut self, matchup_id: MatchupId) -> EngineResult<Vec<Game>> {
        let rows = sqlx::query(&format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE matchup_id = $1 ORDER BY game_number"
        ))
        .bind(matchup_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.iter().map(game_from_row).collect::<Result<_, _>>()?)
    }

    async fn insert_game(&mut self, game: &NewGame) -> EngineResult<Game> {
        let row = sqlx::query(&format!(
            "INSERT INTO games (matchup_id, game_number, status, scheduled_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {GAME_COLUMNS}"
        ))
        .bind(game.matchup_id)
        .bind(game.game_number)
        .bind(game.status.code())
        .bind(game.scheduled_at.map(|dt| dt.naive_utc()))
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(game_from_row(&row)?)
    }

    async fn update_game(&mut self, game: &Game) -> EngineResult<()> {
        sqlx::query(
            "UPDATE games
             SET participant_a_score = $1, participant_b_score = $2, status = $3,
                 participant_a_outcome = $4, participant_b_outcome = $5, updated_at = NOW()
             WHERE id = $6",
        )
        .bind(game.score_a)
        .bind(game.score_b)
        .bind(game.status.code())
        .bind(game.outcome_a.code())
        .bind(game.outcome_b.code())
        .bind(game.id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_matchup(&mut self, matchup: &Matchup) -> EngineResult<()> {
        sqlx::query(
            "UPDATE matchups SET required_games = $1, winner_id = $2, updated_at = NOW()
             WHERE id = $3",
        )
        .bind(matchup.required_games)
        .bind(matchup.winner)
        .bind(matchup.id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn rank_points(&mut self, event_id: EventId) -> EngineResult<RankPoints> {
        let rows = sqlx::query("SELECT rank, points FROM event_rank_points WHERE event_id = $1")
            .bind(event_id)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows
            .iter()
            .map(|row| -> Result<(u32, i32), sqlx::Error> {
                Ok((row.try_get::<i32, _>("rank")? as u32, row.try_get("points")?))
            })
            .collect::<Result<_, _>>()?)
    }

    async fn replace_leaderboard(
        &mut self,
        event_id: EventId,
        entries: &[LeaderboardEntry],
    ) -> EngineResult<()> {
        sqlx::query("DELETE FROM event_leaderboards WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *self.tx)
            .await?;

        for entry in entries {
            sqlx::query(
                "INSERT INTO event_leaderboards (event_id, participant_id, rank, points)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(event_id)
            .bind(entry.participant_id)
            .bind(entry.rank as i32)
            .bind(entry.points)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn clear_event(&mut self, event_id: EventId) -> EngineResult<ClearedSchedule> {
        let games = sqlx::query(
            "DELETE FROM games WHERE matchup_id IN (SELECT id FROM matchups WHERE event_id = $1)",
        )
        .bind(event_id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        let matchups = sqlx::query("DELETE FROM matchups WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        let leaderboard_rows = sqlx::query("DELETE FROM event_leaderboards WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(ClearedSchedule {
            games,
            matchups,
            leaderboard_rows,
        })
    }

    async fn commit(self) -> EngineResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
