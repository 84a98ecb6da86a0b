//! Round-robin schedule generation using the circle method.
//!
//! Participants are shuffled once, padded with a bye slot when their count is
//! odd, and then every round is derived from the fixed order by index
//! arithmetic: position 0 stays put while the remaining positions rotate by
//! one slot per round. Position `i` plays position `len - 1 - i`.

use super::errors::{EngineError, EngineResult};
use super::models::{ParticipantId, Round, Schedule};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;

/// Minimum number of participants for a schedule
pub const MIN_PARTICIPANTS: usize = 2;

/// Shuffle the participants and build the complete round-robin schedule
///
/// # Arguments
///
/// * `participants` - Participant IDs (duplicates are collapsed)
/// * `rng` - Source of randomness for the initial shuffle
///
/// # Errors
///
/// * `EngineError::InsufficientParticipants` - Fewer than two distinct participants
pub fn round_robin<R: Rng + ?Sized>(
    participants: &[ParticipantId],
    rng: &mut R,
) -> EngineResult<Schedule> {
    let unique: BTreeSet<ParticipantId> = participants.iter().copied().collect();
    if unique.len() < MIN_PARTICIPANTS {
        return Err(EngineError::InsufficientParticipants {
            needed: MIN_PARTICIPANTS,
            current: unique.len(),
        });
    }

    let mut order: Vec<Option<ParticipantId>> = unique.into_iter().map(Some).collect();
    order.shuffle(rng);
    if order.len() % 2 != 0 {
        order.push(None);
    }

    let rounds = (0..round_count(order.len()))
        .map(|index| Round {
            index,
            pairs: round_pairs(&order, index),
        })
        .collect();

    Ok(Schedule { rounds })
}

/// Number of rounds for a padded (even) slot count
pub fn round_count(slots: usize) -> usize {
    slots.saturating_sub(1)
}

/// Pairs for one round, skipping any pair that contains the bye slot
///
/// `order` is the fixed slot order (already shuffled and padded to an even
/// length, `None` being the bye).
pub fn round_pairs(
    order: &[Option<ParticipantId>],
    round: usize,
) -> Vec<(ParticipantId, ParticipantId)> {
    let slots = order.len();
    (0..slots / 2)
        .filter_map(|i| {
            let home = order[slot_occupant(slots, i, round)]?;
            let away = order[slot_occupant(slots, slots - 1 - i, round)]?;
            Some((home, away))
        })
        .collect()
}

/// Index into the fixed order of whoever sits at `position` in `round`
fn slot_occupant(slots: usize, position: usize, round: usize) -> usize {
    if position == 0 || slots < 2 {
        return position;
    }
    let ring = slots - 1;
    1 + (position - 1 + ring - round % ring) % ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn normalized(pair: (ParticipantId, ParticipantId)) -> (ParticipantId, ParticipantId) {
        (pair.0.min(pair.1), pair.0.max(pair.1))
    }

    #[test]
    fn test_rejects_fewer_than_two_participants() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = round_robin(&[], &mut rng).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientParticipants {
                needed: 2,
                current: 0
            }
        ));

        let err = round_robin(&[5, 5, 5], &mut rng).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientParticipants { current: 1, .. }
        ));
    }

    #[test]
    fn test_two_participants_single_round() {
        let mut rng = StdRng::seed_from_u64(1);
        let schedule = round_robin(&[1, 2], &mut rng).unwrap();
        assert_eq!(schedule.rounds.len(), 1);
        assert_eq!(schedule.pair_count(), 1);
        assert_eq!(normalized(schedule.rounds[0].pairs[0]), (1, 2));
    }

    #[test]
    fn test_four_participants_three_rounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let schedule = round_robin(&[1, 2, 3, 4], &mut rng).unwrap();
        assert_eq!(schedule.rounds.len(), 3);
        for round in &schedule.rounds {
            assert_eq!(round.pairs.len(), 2);
        }

        let pairs: HashSet<_> = schedule.pairs().map(normalized).collect();
        assert_eq!(pairs.len(), 6);
    }

    #[test]
    fn test_odd_count_uses_bye() {
        let mut rng = StdRng::seed_from_u64(7);
        let schedule = round_robin(&[1, 2, 3, 4, 5], &mut rng).unwrap();
        assert_eq!(schedule.rounds.len(), 5);
        assert_eq!(schedule.pair_count(), 10);
        for round in &schedule.rounds {
            assert_eq!(round.pairs.len(), 2, "one participant rests each round");
        }
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let ids = [11, 12, 13, 14, 15, 16];
        let first = round_robin(&ids, &mut StdRng::seed_from_u64(99)).unwrap();
        let second = round_robin(&ids, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rotation_matches_circle_method() {
        let order: Vec<Option<ParticipantId>> = (0..6).map(Some).collect();
        assert_eq!(round_pairs(&order, 0), vec![(0, 5), (1, 4), (2, 3)]);
        // Last slot moves to position 1, everything else shifts right
        assert_eq!(round_pairs(&order, 1), vec![(0, 4), (5, 3), (1, 2)]);
        assert_eq!(round_pairs(&order, 5), round_pairs(&order, 0));
    }

    #[test]
    fn test_round_pairs_skips_bye() {
        let order = vec![Some(1), Some(2), Some(3), None];
        let pairs = round_pairs(&order, 0);
        assert_eq!(pairs, vec![(2, 3)]);
    }
}
