//! Leaderboard computation with standard competition ranking.

use super::models::{EventId, LeaderboardEntry, Matchup, ParticipantId, RankPoints};
use std::collections::BTreeMap;

/// Matchup wins per participant in the event
///
/// Every participant of any matchup is present, with zero wins if needed.
pub fn total_wins(matchups: &[Matchup]) -> BTreeMap<ParticipantId, u32> {
    let mut wins = BTreeMap::new();
    for matchup in matchups {
        wins.entry(matchup.participant_a).or_insert(0);
        wins.entry(matchup.participant_b).or_insert(0);
    }
    for winner in matchups.iter().filter_map(|m| m.winner) {
        *wins.entry(winner).or_insert(0) += 1;
    }
    wins
}

/// Competition ranks (`1224` style) for win counts sorted descending
pub fn competition_ranks(sorted_wins: &[u32]) -> Vec<u32> {
    let mut ranks = Vec::with_capacity(sorted_wins.len());
    let mut current_rank = 1;
    let mut previous = None;

    for (position, &wins) in sorted_wins.iter().enumerate() {
        if previous != Some(wins) {
            previous = Some(wins);
            current_rank = position as u32 + 1;
        }
        ranks.push(current_rank);
    }

    ranks
}

/// Compute the full leaderboard for an event
///
/// Rows come back ordered by rank, ties ordered by participant ID.
pub fn compute_standings(
    event_id: EventId,
    matchups: &[Matchup],
    rank_points: &RankPoints,
) -> Vec<LeaderboardEntry> {
    let mut table: Vec<(ParticipantId, u32)> = total_wins(matchups).into_iter().collect();
    table.sort_by(|(id_a, wins_a), (id_b, wins_b)| wins_b.cmp(wins_a).then(id_a.cmp(id_b)));

    let wins: Vec<u32> = table.iter().map(|&(_, wins)| wins).collect();
    let ranks = competition_ranks(&wins);

    table
        .into_iter()
        .zip(ranks)
        .map(|((participant_id, _), rank)| LeaderboardEntry {
            event_id,
            participant_id,
            rank,
            points: rank_points.points_for_rank(rank),
        })
        .collect()
}
