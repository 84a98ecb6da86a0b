//! Tournament engine error types.

use super::models::{EventId, GameId, MatchupId};
use thiserror::Error;

/// PostgreSQL unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Tournament engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Fewer than two participants to schedule
    #[error("Insufficient participants: need {needed}, have {current}")]
    InsufficientParticipants { needed: usize, current: usize },

    /// Game not found
    #[error("Game not found: {0}")]
    GameNotFound(GameId),

    /// Matchup not found
    #[error("Matchup not found: {0}")]
    MatchupNotFound(MatchupId),

    /// Event already has a schedule (clear it before regenerating)
    #[error("Schedule already exists for event {0}")]
    DuplicateScheduleConflict(EventId),

    /// Required game count must be at least one
    #[error("Invalid required games: {0}")]
    InvalidRequiredGames(i32),

    /// Game number outside `1..=required_games`
    #[error("Invalid game number {game_number}: matchup requires {required_games} games")]
    InvalidGameNumber {
        game_number: i32,
        required_games: i32,
    },

    /// Matchup already has a game with this number
    #[error("Game number {game_number} already exists for matchup {matchup_id}")]
    DuplicateGameNumber {
        matchup_id: MatchupId,
        game_number: i32,
    },

    /// Store could not be reached or the transaction failed
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

impl EngineError {
    /// Whether retrying the whole operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::StoreUnavailable(_))
    }

    /// Client-safe message that doesn't leak store internals
    pub fn client_message(&self) -> String {
        match self {
            EngineError::StoreUnavailable(_) => "Store temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }

    /// Map a unique violation raised while inserting an event's matchups
    pub(crate) fn from_schedule_insert(err: sqlx::Error, event_id: EventId) -> Self {
        let is_unique_violation = err
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .is_some_and(|code| code == UNIQUE_VIOLATION);

        if is_unique_violation {
            EngineError::DuplicateScheduleConflict(event_id)
        } else {
            EngineError::StoreUnavailable(err)
        }
    }
}

/// Result type for tournament engine operations
pub type EngineResult<T> = Result<T, EngineError>;
