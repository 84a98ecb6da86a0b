//! Per-game outcome derivation and matchup winner resolution.

use super::models::{Game, Matchup, Outcome, ParticipantId};

/// Decision derived from a pair of scores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeDecision {
    /// At least one score is missing
    Pending,
    /// One side won the game
    Decisive { a: Outcome, b: Outcome },
    /// Equal scores: no outcome, the matchup needs one more game
    Drawn,
}

impl OutcomeDecision {
    /// Outcome codes to store on the game
    pub fn outcomes(self) -> (Outcome, Outcome) {
        match self {
            OutcomeDecision::Decisive { a, b } => (a, b),
            OutcomeDecision::Pending | OutcomeDecision::Drawn => {
                (Outcome::Unknown, Outcome::Unknown)
            }
        }
    }
}

/// Derive the per-side outcome of a game from its scores
pub fn derive_outcome(score_a: Option<i32>, score_b: Option<i32>) -> OutcomeDecision {
    match (score_a, score_b) {
        (Some(a), Some(b)) if a > b => OutcomeDecision::Decisive {
            a: Outcome::Win,
            b: Outcome::Loss,
        },
        (Some(a), Some(b)) if a < b => OutcomeDecision::Decisive {
            a: Outcome::Loss,
            b: Outcome::Win,
        },
        (Some(_), Some(_)) => OutcomeDecision::Drawn,
        _ => OutcomeDecision::Pending,
    }
}

/// Decisive game wins per side: `(a_wins, b_wins)`
pub fn count_wins(games: &[Game]) -> (i32, i32) {
    games
        .iter()
        .fold((0, 0), |(a, b), game| match (game.score_a, game.score_b) {
            (Some(sa), Some(sb)) if sa > sb => (a + 1, b),
            (Some(sa), Some(sb)) if sa < sb => (a, b + 1),
            _ => (a, b),
        })
}

/// Decide the matchup winner from its recorded games
///
/// Uses the matchup's current `required_games` for the majority threshold.
/// When nobody has reached the threshold the current winner is kept, so a
/// decided matchup never regresses to undecided.
pub fn resolve_winner(matchup: &Matchup, games: &[Game]) -> Option<ParticipantId> {
    let (a_wins, b_wins) = count_wins(games);
    let needed = matchup.wins_needed();

    if a_wins >= needed {
        Some(matchup.participant_a)
    } else if b_wins >= needed {
        Some(matchup.participant_b)
    } else {
        matchup.winner
    }
}
