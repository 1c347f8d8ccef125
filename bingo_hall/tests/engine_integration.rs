//! End-to-end engine tests on a paused clock.
//!
//! The tokio clock auto-advances whenever every task is blocked on a
//! timer, so a full round (60s countdown, 5s between draws, 10s reset)
//! plays out instantly while preserving the real firing order.

mod common;

use bingo_hall::{
    BingoCard, GameError, GameManager, GameStatus, GameStore, Rooms, ServerEvent,
    models::{GameId, UserId},
};
use common::MemStore;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

const ENTRY_FEE: i64 = 10;

struct Harness {
    store: Arc<MemStore>,
    manager: GameManager,
    game_id: GameId,
}

async fn harness() -> Harness {
    let store = Arc::new(MemStore::new());
    let rooms = Arc::new(Rooms::new());
    let manager = GameManager::new(store.clone(), store.clone(), rooms);
    let lobby = store.create_lobby(ENTRY_FEE).await.unwrap();
    let game_id = lobby.games[0].game.id;
    Harness {
        store,
        manager,
        game_id,
    }
}

async fn subscribe(h: &Harness) -> mpsc::Receiver<ServerEvent> {
    let (tx, rx) = mpsc::channel(256);
    h.manager
        .join_game_room(h.game_id, Uuid::new_v4(), tx)
        .await
        .unwrap();
    rx
}

async fn claim(h: &Harness, user_id: UserId, seat_number: u8) -> Result<(), GameError> {
    let (tx, _rx) = mpsc::channel(256);
    h.manager
        .claim_seat(h.game_id, user_id, seat_number, Uuid::new_v4(), tx)
        .await
}

/// Receives events until one matches, panicking if the stream stalls.
async fn wait_for<F>(rx: &mut mpsc::Receiver<ServerEvent>, mut pred: F) -> ServerEvent
where
    F: FnMut(&ServerEvent) -> bool,
{
    loop {
        let event = tokio::time::timeout(Duration::from_secs(1000), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed");
        if pred(&event) {
            return event;
        }
    }
}

fn hydrate_active(h: &Harness, card: BingoCard, called: Vec<u8>, prize_pool: i64) {
    h.store.with_game_mut(h.game_id, |game| {
        game.status = GameStatus::Active;
        game.master_card = Some(card);
        game.called_numbers = called;
        game.prize_pool = prize_pool;
    });
}

#[tokio::test(start_paused = true)]
async fn full_table_plays_a_complete_round() {
    let h = harness().await;
    let mut rx = subscribe(&h).await;

    let users: Vec<_> = (1..=15)
        .map(|i| h.store.add_user(&format!("player{i}"), 100))
        .collect();
    for (i, user) in users.iter().enumerate() {
        claim(&h, user.id, (i + 1) as u8).await.unwrap();
    }

    // The 15th seat starts the countdown.
    let event = wait_for(&mut rx, |e| matches!(e, ServerEvent::CountdownStart { .. })).await;
    match event {
        ServerEvent::CountdownStart { time_left } => assert_eq!(time_left, 60),
        _ => unreachable!(),
    }
    for user in &users {
        assert_eq!(h.store.balance_of(user.id), 100 - ENTRY_FEE);
    }
    assert_eq!(h.store.game_record(h.game_id).status, GameStatus::Countdown);

    // A 16th player finds the door closed.
    let late = h.store.add_user("latecomer", 100);
    let err = claim(&h, late.id, 1).await.unwrap_err();
    assert!(matches!(err, GameError::GameNotAvailable));
    assert_eq!(h.store.balance_of(late.id), 100);

    // Countdown elapses; the round begins with the full pot.
    let event = wait_for(&mut rx, |e| matches!(e, ServerEvent::GameStarted { .. })).await;
    match event {
        ServerEvent::GameStarted {
            prize_pool,
            interval,
            ..
        } => {
            assert_eq!(prize_pool, 15 * ENTRY_FEE);
            assert_eq!(interval, 5000);
        }
        _ => unreachable!(),
    }

    // Draws continue until some seat's row completes.
    let event = wait_for(&mut rx, |e| matches!(e, ServerEvent::GameEnded { .. })).await;
    let winner_id = match event {
        ServerEvent::GameEnded {
            winner_id,
            prize_pool,
            called_numbers,
        } => {
            assert_eq!(prize_pool, 15 * ENTRY_FEE);
            assert!(!called_numbers.is_empty());
            winner_id.expect("a full table always produces a winner")
        }
        _ => unreachable!(),
    };
    assert!(users.iter().any(|u| u.id == winner_id));
    assert_eq!(
        h.store.balance_of(winner_id),
        100 - ENTRY_FEE + 15 * ENTRY_FEE
    );

    // After the reset delay the game is fresh again.
    wait_for(&mut rx, |e| matches!(e, ServerEvent::GameReset)).await;
    let record = h.store.game_record(h.game_id);
    assert_eq!(record.status, GameStatus::Waiting);
    assert!(record.called_numbers.is_empty());
    assert!(record.master_card.is_none());
    assert_eq!(record.prize_pool, 0);
    assert_eq!(h.store.seat_count(h.game_id), 0);
}

#[tokio::test(start_paused = true)]
async fn lobbies_come_with_four_waiting_games() {
    let h = harness().await;
    let lobby = h.store.list_lobbies().await.unwrap().remove(0);

    assert_eq!(lobby.lobby.entry_fee, ENTRY_FEE);
    assert_eq!(lobby.games.len(), 4);
    for (i, view) in lobby.games.iter().enumerate() {
        assert_eq!(view.game.game_number, (i + 1) as i32);
        assert_eq!(view.game.status, GameStatus::Waiting);
        assert!(view.game.master_card.is_none());
        assert!(view.seats.is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn occupied_seat_cannot_be_claimed_twice() {
    let h = harness().await;
    let alice = h.store.add_user("alice", 100);
    let bob = h.store.add_user("bob", 100);

    claim(&h, alice.id, 5).await.unwrap();
    let err = claim(&h, bob.id, 5).await.unwrap_err();
    assert!(matches!(err, GameError::SeatTaken));
    assert_eq!(err.client_message(), "Seat already taken");

    // The rejected claim costs nothing.
    assert_eq!(h.store.balance_of(bob.id), 100);
    assert_eq!(h.store.seat_count(h.game_id), 1);
}

#[tokio::test(start_paused = true)]
async fn third_seat_for_the_same_user_is_rejected() {
    let h = harness().await;
    let user = h.store.add_user("greedy", 100);

    claim(&h, user.id, 1).await.unwrap();
    claim(&h, user.id, 2).await.unwrap();
    let err = claim(&h, user.id, 3).await.unwrap_err();
    assert!(matches!(err, GameError::SeatLimitReached));
    assert_eq!(err.client_message(), "Max 2 seats per player");

    assert_eq!(h.store.balance_of(user.id), 100 - 2 * ENTRY_FEE);
    assert_eq!(h.store.seat_count(h.game_id), 2);
}

#[tokio::test(start_paused = true)]
async fn short_balance_blocks_the_claim() {
    let h = harness().await;
    let user = h.store.add_user("broke", ENTRY_FEE - 1);

    let err = claim(&h, user.id, 1).await.unwrap_err();
    assert!(matches!(err, GameError::InsufficientBalance));
    assert_eq!(err.client_message(), "Insufficient balance");

    assert_eq!(h.store.balance_of(user.id), ENTRY_FEE - 1);
    assert_eq!(h.store.seat_count(h.game_id), 0);
}

#[tokio::test(start_paused = true)]
async fn seat_number_must_be_in_range() {
    let h = harness().await;
    let user = h.store.add_user("edge", 100);

    for seat in [0u8, 16] {
        let err = claim(&h, user.id, seat).await.unwrap_err();
        assert!(matches!(err, GameError::InvalidSeatNumber), "seat {seat}");
    }
    assert_eq!(h.store.balance_of(user.id), 100);
}

#[tokio::test(start_paused = true)]
async fn claims_are_rejected_once_the_round_runs() {
    let h = harness().await;
    let user = h.store.add_user("late", 100);
    hydrate_active(&h, BingoCard::generate(7), vec![1, 2, 3], 50);

    let err = claim(&h, user.id, 4).await.unwrap_err();
    assert!(matches!(err, GameError::GameNotAvailable));
    assert_eq!(err.client_message(), "Game not available");
}

#[tokio::test(start_paused = true)]
async fn unknown_user_and_game_are_rejected() {
    let h = harness().await;

    let err = claim(&h, 999, 1).await.unwrap_err();
    assert!(matches!(err, GameError::UserNotFound));

    let user = h.store.add_user("lost", 100);
    let (tx, _rx) = mpsc::channel(8);
    let err = h
        .manager
        .claim_seat(424242, user.id, 1, Uuid::new_v4(), tx)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::GameNotFound));
}

#[tokio::test(start_paused = true)]
async fn forced_start_with_no_seats_exhausts_all_numbers() {
    let h = harness().await;
    let mut rx = subscribe(&h).await;

    h.manager.admin_start(h.game_id).await.unwrap();

    let event = wait_for(&mut rx, |e| matches!(e, ServerEvent::GameStarted { .. })).await;
    match event {
        ServerEvent::GameStarted { prize_pool, .. } => assert_eq!(prize_pool, 0),
        _ => unreachable!(),
    }

    // With nobody seated there is no winner; all 75 numbers get drawn.
    let mut draws = Vec::new();
    loop {
        let event = wait_for(&mut rx, |_| true).await;
        match event {
            ServerEvent::NumberCalled { number, .. } => draws.push(number),
            ServerEvent::GameEnded {
                winner_id,
                called_numbers,
                ..
            } => {
                assert_eq!(winner_id, None);
                assert_eq!(called_numbers.len(), 75);
                break;
            }
            _ => {}
        }
    }
    assert_eq!(draws.len(), 75);
    let unique: HashSet<u8> = draws.iter().copied().collect();
    assert_eq!(unique.len(), 75);
    assert!(draws.iter().all(|n| (1..=75).contains(n)));

    wait_for(&mut rx, |e| matches!(e, ServerEvent::GameReset)).await;
    let record = h.store.game_record(h.game_id);
    assert_eq!(record.status, GameStatus::Waiting);
    assert!(record.called_numbers.is_empty());
}

#[tokio::test(start_paused = true)]
async fn forced_start_cancels_a_running_countdown() {
    let h = harness().await;
    let mut rx = subscribe(&h).await;

    for i in 1..=15u8 {
        let user = h.store.add_user(&format!("p{i}"), 100);
        claim(&h, user.id, i).await.unwrap();
    }
    wait_for(&mut rx, |e| matches!(e, ServerEvent::CountdownStart { .. })).await;

    // Start immediately instead of waiting out the 60 seconds.
    h.manager.admin_start(h.game_id).await.unwrap();

    // The stale countdown timer must not restart the round.
    let mut starts = 0;
    loop {
        let event = wait_for(&mut rx, |_| true).await;
        match event {
            ServerEvent::GameStarted { .. } => starts += 1,
            ServerEvent::GameReset => break,
            _ => {}
        }
    }
    assert_eq!(starts, 1);
}

#[tokio::test(start_paused = true)]
async fn forced_start_is_rejected_after_the_round_ends() {
    let h = harness().await;
    h.store.with_game_mut(h.game_id, |game| {
        game.status = GameStatus::Finished;
    });

    let err = h.manager.admin_start(h.game_id).await.unwrap_err();
    assert!(matches!(err, GameError::GameNotAvailable));
}

#[tokio::test(start_paused = true)]
async fn marking_a_called_number_is_recorded_and_idempotent() {
    let h = harness().await;
    let user = h.store.add_user("marker", 100);
    let card = BingoCard::generate(42);
    let row = *card.row(1);
    // Four of five called: marking cannot finish the row yet.
    hydrate_active(&h, card, row[..4].to_vec(), 50);
    h.store.insert_seat(h.game_id, user.id, 1);

    h.manager.mark_cell(h.game_id, user.id, row[0]).await.unwrap();
    assert_eq!(h.store.marked_cells(h.game_id, user.id), vec![row[0]]);

    h.manager.mark_cell(h.game_id, user.id, row[0]).await.unwrap();
    assert_eq!(h.store.marked_cells(h.game_id, user.id), vec![row[0]]);

    assert_eq!(h.store.game_record(h.game_id).status, GameStatus::Active);
}

#[tokio::test(start_paused = true)]
async fn marking_an_uncalled_number_is_rejected() {
    let h = harness().await;
    let user = h.store.add_user("eager", 100);
    let card = BingoCard::generate(42);
    let row = *card.row(1);
    hydrate_active(&h, card, row[..4].to_vec(), 50);
    h.store.insert_seat(h.game_id, user.id, 1);

    let err = h
        .manager
        .mark_cell(h.game_id, user.id, row[4])
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NumberNotCalled(n) if n == row[4]));
    assert!(h.store.marked_cells(h.game_id, user.id).is_empty());
}

#[tokio::test(start_paused = true)]
async fn marking_without_a_seat_is_rejected() {
    let h = harness().await;
    let user = h.store.add_user("spectator", 100);
    let card = BingoCard::generate(42);
    let called = card.row(1).to_vec();
    hydrate_active(&h, card, called.clone(), 50);

    let err = h
        .manager
        .mark_cell(h.game_id, user.id, called[0])
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NotSeated));
}

#[tokio::test(start_paused = true)]
async fn marking_is_rejected_before_the_round_starts() {
    let h = harness().await;
    let user = h.store.add_user("early", 100);

    let err = h.manager.mark_cell(h.game_id, user.id, 7).await.unwrap_err();
    assert!(matches!(err, GameError::GameNotAvailable));
}

#[tokio::test(start_paused = true)]
async fn mark_completing_a_row_wins_the_pot() {
    let h = harness().await;
    let user = h.store.add_user("winner", 50);
    let card = BingoCard::generate(42);
    let row = *card.row(3);
    hydrate_active(&h, card, row.to_vec(), 20);
    h.store.insert_seat(h.game_id, user.id, 3);
    let mut rx = subscribe(&h).await;

    h.manager.mark_cell(h.game_id, user.id, row[0]).await.unwrap();

    let event = wait_for(&mut rx, |e| matches!(e, ServerEvent::GameEnded { .. })).await;
    match event {
        ServerEvent::GameEnded {
            winner_id,
            prize_pool,
            ..
        } => {
            assert_eq!(winner_id, Some(user.id));
            assert_eq!(prize_pool, 20);
        }
        _ => unreachable!(),
    }
    assert_eq!(h.store.balance_of(user.id), 70);
    assert_eq!(h.store.game_record(h.game_id).winner_id, Some(user.id));

    wait_for(&mut rx, |e| matches!(e, ServerEvent::GameReset)).await;
    assert_eq!(h.store.seat_count(h.game_id), 0);
}

#[tokio::test(start_paused = true)]
async fn single_seat_round_always_finds_its_winner() {
    let h = harness().await;
    let user = h.store.add_user("solo", 100);
    let mut rx = subscribe(&h).await;

    claim(&h, user.id, 1).await.unwrap();
    h.manager.admin_start(h.game_id).await.unwrap();

    // The lone row completes at latest when the deck is exhausted.
    let event = wait_for(&mut rx, |e| matches!(e, ServerEvent::GameEnded { .. })).await;
    match event {
        ServerEvent::GameEnded {
            winner_id,
            prize_pool,
            ..
        } => {
            assert_eq!(winner_id, Some(user.id));
            assert_eq!(prize_pool, ENTRY_FEE);
        }
        _ => unreachable!(),
    }
    // Buy-in comes back as the whole pot.
    assert_eq!(h.store.balance_of(user.id), 100);
}

#[tokio::test(start_paused = true)]
async fn interval_changes_are_validated_broadcast_and_persisted() {
    let h = harness().await;
    let mut rx = subscribe(&h).await;

    for bad in [0, -500] {
        let err = h.manager.set_interval(h.game_id, bad).await.unwrap_err();
        assert!(matches!(err, GameError::InvalidInterval(n) if n == bad));
    }

    h.manager.set_interval(h.game_id, 1000).await.unwrap();
    let event = wait_for(&mut rx, |e| matches!(e, ServerEvent::IntervalUpdated { .. })).await;
    match event {
        ServerEvent::IntervalUpdated { interval } => assert_eq!(interval, 1000),
        _ => unreachable!(),
    }
    assert_eq!(h.store.game_record(h.game_id).interval_ms, 1000);
}

#[tokio::test(start_paused = true)]
async fn every_seat_claim_broadcasts_the_updated_game() {
    let h = harness().await;
    let mut rx = subscribe(&h).await;
    let user = h.store.add_user("watcher", 100);

    claim(&h, user.id, 9).await.unwrap();

    let event = wait_for(&mut rx, |e| matches!(e, ServerEvent::GameUpdated { .. })).await;
    match event {
        ServerEvent::GameUpdated { game } => {
            assert_eq!(game.seats.len(), 1);
            assert_eq!(game.seats[0].seat.seat_number, 9);
            assert_eq!(game.seats[0].user.id, user.id);
        }
        _ => unreachable!(),
    }
}
