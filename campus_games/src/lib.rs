//! # Campus Games
//!
//! Round-robin scheduling and result tracking for inter-department campus events.
//!
//! Every participant of an event meets every other participant exactly once in
//! a best-of-N matchup. Game scores flow through a fixed cascade: the game
//! outcome is derived from the scores, a drawn game extends its matchup by one
//! game, the matchup winner is resolved by majority, and the event standings
//! are recomputed whenever a winner changes.
//!
//! ## Core Modules
//!
//! - [`tournament`]: Schedule generation, winner resolution, standings and the engine
//! - [`db`]: PostgreSQL pool, store traits and the in-memory store
//!
//! ## Example
//!
//! ```
//! use campus_games::tournament::schedule::round_robin;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let schedule = round_robin(&[1, 2, 3, 4], &mut StdRng::seed_from_u64(1)).unwrap();
//! assert_eq!(schedule.rounds.len(), 3);
//! assert_eq!(schedule.pair_count(), 6);
//! ```

/// Database pool, store traits and implementations.
pub mod db;

/// Scheduling, results, standings and the tournament engine.
pub mod tournament;

pub use db::{Database, DatabaseConfig, MemoryTournamentStore, PgTournamentStore};
pub use tournament::{EngineConfig, EngineError, EngineResult, TournamentEngine};
