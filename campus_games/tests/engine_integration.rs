//! Integration tests for the tournament engine.
//!
//! Runs the full schedule → games → scores → standings flow against the
//! in-memory store.

use campus_games::db::{MemoryTournamentStore, ParticipantScope, TournamentStore};
use campus_games::tournament::{
    EngineConfig, EngineError, GameStatus, LeaderboardEntry, Matchup, NewGame, Outcome,
    ParticipantId, RankPoints, TournamentEngine,
};
use std::collections::HashMap;
use std::sync::Arc;

const EVENT: i64 = 10;

async fn setup_engine(participants: &[ParticipantId]) -> TournamentEngine<MemoryTournamentStore> {
    let store = MemoryTournamentStore::new();
    store.register_participants(EVENT, participants).await;
    store
        .set_rank_points(
            EVENT,
            RankPoints::new()
                .with_rank(1, 10)
                .with_rank(2, 6)
                .with_rank(3, 3)
                .with_rank(4, 1),
        )
        .await;

    TournamentEngine::new(
        Arc::new(store),
        EngineConfig {
            shuffle_seed: Some(2024),
            ..Default::default()
        },
    )
}

fn find_matchup(matchups: &[Matchup], x: ParticipantId, y: ParticipantId) -> &Matchup {
    matchups
        .iter()
        .find(|m| m.involves(x) && m.involves(y))
        .expect("every pair has a matchup")
}

/// Create the next game of the pair's matchup and report `winner` beating the other side
async fn play(
    engine: &TournamentEngine<MemoryTournamentStore>,
    matchups: &[Matchup],
    winner: ParticipantId,
    loser: ParticipantId,
) {
    let matchup = find_matchup(matchups, winner, loser);
    let played = engine.list_games(matchup.id).await.unwrap().len() as i32;
    let game = engine
        .create_game(NewGame {
            matchup_id: matchup.id,
            game_number: played + 1,
            status: GameStatus::Pending,
            scheduled_at: None,
        })
        .await
        .unwrap();

    let (score_a, score_b) = if matchup.participant_a == winner {
        (3, 1)
    } else {
        (1, 3)
    };
    engine
        .submit_game_score(game.id, score_a, score_b)
        .await
        .unwrap();
}

fn by_participant(leaderboard: &[LeaderboardEntry]) -> HashMap<ParticipantId, (u32, i32)> {
    leaderboard
        .iter()
        .map(|e| (e.participant_id, (e.rank, e.points)))
        .collect()
}

#[tokio::test]
async fn test_full_event_standings() {
    let engine = setup_engine(&[1, 2, 3, 4]).await;
    let generated = engine.generate_schedule(EVENT, 1).await.unwrap();
    assert_eq!(generated.schedule.rounds.len(), 3);
    assert_eq!(generated.matchups.len(), 6);

    // 1 beats 2 and 3, 2 beats 3 and 4, 3 beats 4, 4 beats 1
    play(&engine, &generated.matchups, 1, 2).await;
    play(&engine, &generated.matchups, 1, 3).await;
    play(&engine, &generated.matchups, 2, 3).await;
    play(&engine, &generated.matchups, 2, 4).await;
    play(&engine, &generated.matchups, 3, 4).await;
    play(&engine, &generated.matchups, 4, 1).await;

    let standings = by_participant(&engine.get_standings(EVENT).await.unwrap());
    assert_eq!(standings[&1], (1, 10));
    assert_eq!(standings[&2], (1, 10));
    assert_eq!(standings[&3], (3, 3));
    assert_eq!(standings[&4], (3, 3));

    let matchups = engine.list_matchups(EVENT).await.unwrap();
    assert!(matchups.iter().all(|m| m.winner.is_some()));
}

#[tokio::test]
async fn test_best_of_three_needs_two_wins() {
    let engine = setup_engine(&[1, 2]).await;
    let generated = engine.generate_schedule(EVENT, 3).await.unwrap();
    let matchup_id = generated.matchups[0].id;

    play(&engine, &generated.matchups, 1, 2).await;
    assert_eq!(engine.get_matchup(matchup_id).await.unwrap().winner, None);

    play(&engine, &generated.matchups, 2, 1).await;
    assert_eq!(engine.get_matchup(matchup_id).await.unwrap().winner, None);

    play(&engine, &generated.matchups, 2, 1).await;
    assert_eq!(engine.get_matchup(matchup_id).await.unwrap().winner, Some(2));

    let standings = engine.get_standings(EVENT).await.unwrap();
    assert_eq!(standings[0].participant_id, 2);
    assert_eq!((standings[0].rank, standings[0].points), (1, 10));
    assert_eq!((standings[1].rank, standings[1].points), (2, 6));
}

#[tokio::test]
async fn test_draw_extends_and_allows_extra_game() {
    let engine = setup_engine(&[1, 2]).await;
    let generated = engine.generate_schedule(EVENT, 1).await.unwrap();
    let matchup = &generated.matchups[0];

    let first = engine
        .create_game(NewGame {
            matchup_id: matchup.id,
            game_number: 1,
            status: GameStatus::Ongoing,
            scheduled_at: None,
        })
        .await
        .unwrap();
    let submission = engine.submit_game_score(first.id, 1, 1).await.unwrap();
    assert_eq!(submission.matchup.required_games, 2);
    assert_eq!(submission.game.outcome_a, Outcome::Unknown);
    assert_eq!(submission.game.status, GameStatus::Ended);

    // Game 2 only becomes valid after the draw
    let second = engine
        .create_game(NewGame {
            matchup_id: matchup.id,
            game_number: 2,
            status: GameStatus::Pending,
            scheduled_at: None,
        })
        .await
        .unwrap();
    let submission = engine.submit_game_score(second.id, 0, 2).await.unwrap();
    assert_eq!(submission.matchup.required_games, 2);
    assert_eq!(submission.matchup.winner, Some(matchup.participant_b));
    assert!(submission.standings_changed);
}

#[tokio::test]
async fn test_corrected_score_moves_winner() {
    let engine = setup_engine(&[1, 2]).await;
    let generated = engine.generate_schedule(EVENT, 1).await.unwrap();
    let matchup = &generated.matchups[0];

    let game = engine
        .create_game(NewGame {
            matchup_id: matchup.id,
            game_number: 1,
            status: GameStatus::Pending,
            scheduled_at: None,
        })
        .await
        .unwrap();

    let first = engine.submit_game_score(game.id, 5, 0).await.unwrap();
    assert_eq!(first.matchup.winner, Some(matchup.participant_a));

    let corrected = engine.submit_game_score(game.id, 0, 5).await.unwrap();
    assert_eq!(corrected.matchup.winner, Some(matchup.participant_b));
    assert!(corrected.standings_changed);
    assert_eq!(corrected.leaderboard[0].participant_id, matchup.participant_b);

    // Same score again leaves everything as is
    let repeated = engine.submit_game_score(game.id, 0, 5).await.unwrap();
    assert!(!repeated.standings_changed);
    assert_eq!(repeated.leaderboard, corrected.leaderboard);
}

#[tokio::test]
async fn test_odd_participant_count() {
    let engine = setup_engine(&[1, 2, 3, 4, 5]).await;
    let generated = engine.generate_schedule(EVENT, 1).await.unwrap();

    assert_eq!(generated.schedule.rounds.len(), 5);
    assert_eq!(generated.matchups.len(), 10);
    for participant in 1..=5 {
        let played = generated
            .matchups
            .iter()
            .filter(|m| m.involves(participant))
            .count();
        assert_eq!(played, 4);
    }
    assert_eq!(generated.leaderboard.len(), 5);
}

#[tokio::test]
async fn test_global_scope_uses_every_participant() {
    let store = MemoryTournamentStore::new();
    store.register_participants(EVENT, &[1, 2]).await;
    store.add_participants(&[3]).await;

    let engine = TournamentEngine::new(
        Arc::new(store),
        EngineConfig {
            participant_scope: ParticipantScope::Global,
            shuffle_seed: Some(1),
        },
    );

    let generated = engine.generate_schedule(EVENT, 1).await.unwrap();
    assert_eq!(generated.matchups.len(), 3);
}

#[tokio::test]
async fn test_failed_commit_rolls_back_schedule() {
    let engine = setup_engine(&[1, 2, 3, 4]).await;
    engine.store().fail_next_commit();

    let err = engine.generate_schedule(EVENT, 1).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(engine.list_matchups(EVENT).await.unwrap().is_empty());
    assert!(engine.get_standings(EVENT).await.unwrap().is_empty());

    // A retry succeeds on a clean slate
    let generated = engine.generate_schedule(EVENT, 1).await.unwrap();
    assert_eq!(generated.matchups.len(), 6);
}

#[tokio::test]
async fn test_failed_commit_rolls_back_score() {
    let engine = setup_engine(&[1, 2]).await;
    let generated = engine.generate_schedule(EVENT, 1).await.unwrap();
    let matchup = &generated.matchups[0];
    let game = engine
        .create_game(NewGame {
            matchup_id: matchup.id,
            game_number: 1,
            status: GameStatus::Pending,
            scheduled_at: None,
        })
        .await
        .unwrap();
    let before = engine.get_standings(EVENT).await.unwrap();

    engine.store().fail_next_commit();
    assert!(matches!(
        engine.submit_game_score(game.id, 2, 0).await,
        Err(EngineError::StoreUnavailable(_))
    ));

    let stored = engine.get_game(game.id).await.unwrap();
    assert_eq!(stored.score_a, None);
    assert_eq!(stored.status, GameStatus::Pending);
    assert_eq!(engine.get_matchup(matchup.id).await.unwrap().winner, None);
    assert_eq!(engine.get_standings(EVENT).await.unwrap(), before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_match_recompute() {
    let participants: Vec<ParticipantId> = (1..=8).collect();
    let engine = setup_engine(&participants).await;
    let generated = engine.generate_schedule(EVENT, 1).await.unwrap();

    let mut game_ids = Vec::new();
    for matchup in &generated.matchups {
        let game = engine
            .create_game(NewGame {
                matchup_id: matchup.id,
                game_number: 1,
                status: GameStatus::Pending,
                scheduled_at: None,
            })
            .await
            .unwrap();
        // Lower ID always wins
        let scores = if matchup.participant_a < matchup.participant_b {
            (2, 0)
        } else {
            (0, 2)
        };
        game_ids.push((game.id, scores));
    }

    let handles: Vec<_> = game_ids
        .into_iter()
        .map(|(game_id, (a, b))| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.submit_game_score(game_id, a, b).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let live = engine.get_standings(EVENT).await.unwrap();
    let recomputed = engine.recompute_standings(EVENT).await.unwrap();
    assert_eq!(by_participant(&live), by_participant(&recomputed));

    let ranks = by_participant(&live);
    for participant in 1..=8 {
        assert_eq!(ranks[&participant].0, participant as u32);
    }
}

#[tokio::test]
async fn test_recompute_is_idempotent() {
    let engine = setup_engine(&[1, 2, 3]).await;
    let generated = engine.generate_schedule(EVENT, 1).await.unwrap();
    play(&engine, &generated.matchups, 3, 1).await;

    let first = engine.recompute_standings(EVENT).await.unwrap();
    let second = engine.recompute_standings(EVENT).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0].participant_id, 3);
}

#[tokio::test]
async fn test_clear_then_regenerate() {
    let engine = setup_engine(&[1, 2, 3]).await;
    let generated = engine.generate_schedule(EVENT, 1).await.unwrap();
    play(&engine, &generated.matchups, 1, 2).await;

    assert!(matches!(
        engine.generate_schedule(EVENT, 1).await,
        Err(EngineError::DuplicateScheduleConflict(EVENT))
    ));

    let cleared = engine.clear_schedule(EVENT).await.unwrap();
    assert_eq!(cleared.matchups, 3);
    assert_eq!(cleared.games, 1);
    assert_eq!(cleared.leaderboard_rows, 3);
    assert!(engine.store().list_matchups(EVENT).await.unwrap().is_empty());

    let regenerated = engine.generate_schedule(EVENT, 3).await.unwrap();
    assert!(regenerated.matchups.iter().all(|m| m.required_games == 3));
}
