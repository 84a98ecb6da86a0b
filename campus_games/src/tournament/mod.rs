//! Tournament module for round-robin inter-department events.
//!
//! This module provides:
//! - Round-robin schedule generation (circle method with a bye slot)
//! - Game outcome derivation and best-of-N matchup resolution
//! - Draw handling (a drawn game extends its matchup by one game)
//! - Competition-ranked standings with per-rank points
//!
//! ## Example
//!
//! ```no_run
//! use campus_games::db::{Database, DatabaseConfig};
//! use campus_games::tournament::{EngineConfig, TournamentEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()?).await?;
//!     let engine = TournamentEngine::new(Arc::new(db.tournament_store()), EngineConfig::default());
//!
//!     // Best-of-3 matchups between every pair of registered participants
//!     let generated = engine.generate_schedule(1, 3).await?;
//!     println!("Created {} matchups", generated.matchups.len());
//!
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod errors;
pub mod locks;
pub mod models;
pub mod results;
pub mod schedule;
pub mod standings;

pub use engine::{EngineConfig, TournamentEngine};
pub use errors::{EngineError, EngineResult};
pub use locks::EventLocks;
pub use models::{
    ClearedSchedule, EventId, Game, GameId, GameStatus, GeneratedSchedule, LeaderboardEntry,
    Matchup, MatchupId, NewGame, NewMatchup, Outcome, ParticipantId, RankPoints, Round, Schedule,
    ScoreSubmission,
};
pub use results::{OutcomeDecision, derive_outcome, resolve_winner};
pub use schedule::round_robin;
pub use standings::compute_standings;
