//! Tournament data models: matchups, games and leaderboard rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Event ID type
pub type EventId = i64;

/// Participant ID type (a department or team)
pub type ParticipantId = i64;

/// Matchup ID type
pub type MatchupId = i64;

/// Game ID type
pub type GameId = i64;

/// Game status code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    /// Not started yet
    #[default]
    Pending,
    /// In progress
    Ongoing,
    /// Finished
    Ended,
}

impl GameStatus {
    /// Storage code for this status
    pub fn code(self) -> i16 {
        match self {
            GameStatus::Pending => 0,
            GameStatus::Ongoing => 1,
            GameStatus::Ended => 2,
        }
    }

    /// Parse a storage code, falling back to `Pending` for unknown codes
    pub fn from_code(code: i16) -> Self {
        match code {
            1 => GameStatus::Ongoing,
            2 => GameStatus::Ended,
            _ => GameStatus::Pending,
        }
    }
}

impl std::str::FromStr for GameStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" | "0" => Ok(GameStatus::Pending),
            "ongoing" | "1" => Ok(GameStatus::Ongoing),
            "ended" | "2" => Ok(GameStatus::Ended),
            other => Err(format!("unknown game status: {other}")),
        }
    }
}

/// Per-side game outcome code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// No decisive result recorded
    #[default]
    Unknown,
    Win,
    Loss,
}

impl Outcome {
    /// Storage code for this outcome
    pub fn code(self) -> i16 {
        match self {
            Outcome::Unknown => 0,
            Outcome::Win => 1,
            Outcome::Loss => 2,
        }
    }

    /// Parse a storage code, falling back to `Unknown` for unknown codes
    pub fn from_code(code: i16) -> Self {
        match code {
            1 => Outcome::Win,
            2 => Outcome::Loss,
            _ => Outcome::Unknown,
        }
    }
}

/// Best-of-N pairing between two participants within one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matchup {
    #[serde(rename = "MatchupID")]
    pub id: MatchupId,
    #[serde(rename = "EventID")]
    pub event_id: EventId,
    #[serde(rename = "ParticipantAID")]
    pub participant_a: ParticipantId,
    #[serde(rename = "ParticipantBID")]
    pub participant_b: ParticipantId,
    /// Games that must be played (grows by one per drawn game)
    #[serde(rename = "RequiredGames")]
    pub required_games: i32,
    #[serde(rename = "WinnerID")]
    pub winner: Option<ParticipantId>,
}

impl Matchup {
    /// Number of won games needed to clinch the matchup
    pub fn wins_needed(&self) -> i32 {
        (self.required_games + 1) / 2
    }

    /// Whether the participant plays in this matchup
    pub fn involves(&self, participant: ParticipantId) -> bool {
        self.participant_a == participant || self.participant_b == participant
    }
}

/// Matchup about to be inserted by schedule generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewMatchup {
    pub event_id: EventId,
    pub participant_a: ParticipantId,
    pub participant_b: ParticipantId,
    pub required_games: i32,
    /// Zero-based round the pair was scheduled in
    pub round: usize,
}

/// One contest within a matchup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    #[serde(rename = "GameID")]
    pub id: GameId,
    #[serde(rename = "MatchupID")]
    pub matchup_id: MatchupId,
    #[serde(rename = "GameNumber")]
    pub game_number: i32,
    #[serde(rename = "ParticipantAScore")]
    pub score_a: Option<i32>,
    #[serde(rename = "ParticipantBScore")]
    pub score_b: Option<i32>,
    #[serde(rename = "Status")]
    pub status: GameStatus,
    #[serde(rename = "ParticipantAOutcome")]
    pub outcome_a: Outcome,
    #[serde(rename = "ParticipantBOutcome")]
    pub outcome_b: Outcome,
    #[serde(rename = "ScheduledAt")]
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl Game {
    /// Both scores recorded and equal
    pub fn is_drawn(&self) -> bool {
        matches!((self.score_a, self.score_b), (Some(a), Some(b)) if a == b)
    }
}

/// Request to create a game inside a matchup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGame {
    pub matchup_id: MatchupId,
    pub game_number: i32,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Leaderboard row for one participant in one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(rename = "EventID")]
    pub event_id: EventId,
    #[serde(rename = "ParticipantID")]
    pub participant_id: ParticipantId,
    #[serde(rename = "Rank")]
    pub rank: u32,
    #[serde(rename = "Points")]
    pub points: i32,
}

impl LeaderboardEntry {
    /// Zeroed row seeded at schedule generation
    pub fn seed(event_id: EventId, participant_id: ParticipantId) -> Self {
        Self {
            event_id,
            participant_id,
            rank: 0,
            points: 0,
        }
    }
}

/// Points awarded per rank for one event. Ranks without an entry are worth zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankPoints {
    points: HashMap<u32, i32>,
}

impl RankPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the points for a rank
    pub fn with_rank(mut self, rank: u32, points: i32) -> Self {
        self.points.insert(rank, points);
        self
    }

    /// Points for a rank, zero when unconfigured
    pub fn points_for_rank(&self, rank: u32) -> i32 {
        self.points.get(&rank).copied().unwrap_or(0)
    }
}

impl FromIterator<(u32, i32)> for RankPoints {
    fn from_iter<I: IntoIterator<Item = (u32, i32)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// One round of a generated schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Zero-based round index
    pub index: usize,
    /// Pairs playing in this round, in pairing order
    pub pairs: Vec<(ParticipantId, ParticipantId)>,
}

/// Complete round-robin schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub rounds: Vec<Round>,
}

impl Schedule {
    /// Every pair in generation order
    pub fn pairs(&self) -> impl Iterator<Item = (ParticipantId, ParticipantId)> + '_ {
        self.rounds.iter().flat_map(|round| round.pairs.iter().copied())
    }

    /// Total number of pairs across all rounds
    pub fn pair_count(&self) -> usize {
        self.rounds.iter().map(|round| round.pairs.len()).sum()
    }
}

/// Result of a generated and persisted schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSchedule {
    pub event_id: EventId,
    pub schedule: Schedule,
    pub matchups: Vec<Matchup>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Everything touched by a score submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub game: Game,
    pub matchup: Matchup,
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Whether the matchup winner changed and standings were recomputed
    pub standings_changed: bool,
}

/// Rows removed by clearing an event's schedule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearedSchedule {
    pub games: u64,
    pub matchups: u64,
    pub leaderboard_rows: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matchup(required_games: i32) -> Matchup {
        Matchup {
            id: 1,
            event_id: 1,
            participant_a: 10,
            participant_b: 20,
            required_games,
            winner: None,
        }
    }

    #[test]
    fn test_wins_needed_is_majority() {
        assert_eq!(matchup(1).wins_needed(), 1);
        assert_eq!(matchup(2).wins_needed(), 1);
        assert_eq!(matchup(3).wins_needed(), 2);
        assert_eq!(matchup(4).wins_needed(), 2);
        assert_eq!(matchup(5).wins_needed(), 3);
    }

    #[test]
    fn test_status_and_outcome_codes() {
        for status in [GameStatus::Pending, GameStatus::Ongoing, GameStatus::Ended] {
            assert_eq!(GameStatus::from_code(status.code()), status);
        }
        assert_eq!(Outcome::from_code(1), Outcome::Win);
        assert_eq!(Outcome::from_code(2), Outcome::Loss);
        assert_eq!(Outcome::from_code(7), Outcome::Unknown);
        assert_eq!("ended".parse::<GameStatus>(), Ok(GameStatus::Ended));
        assert!("paused".parse::<GameStatus>().is_err());
    }

    #[test]
    fn test_rank_points_default_zero() {
        let table = RankPoints::new().with_rank(1, 10).with_rank(2, 6);
        assert_eq!(table.points_for_rank(1), 10);
        assert_eq!(table.points_for_rank(2), 6);
        assert_eq!(table.points_for_rank(3), 0);
    }

    #[test]
    fn test_matchup_serializes_canonical_names() {
        let json = serde_json::to_value(matchup(3)).unwrap();
        assert_eq!(json["MatchupID"], 1);
        assert_eq!(json["ParticipantAID"], 10);
        assert_eq!(json["RequiredGames"], 3);
        assert!(json["WinnerID"].is_null());
    }
}
