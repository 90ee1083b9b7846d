use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_test::{assert_err, assert_ok};

use super::*;
use crate::model::*;

const M: Ms = 60_000; // 1 minute in ms
const H: Ms = 60 * M; // 1 hour in ms
/// 2025-09-20T00:00:00Z
const DAY: Ms = 1_758_326_400_000;

fn at(hour: Ms, minute: Ms) -> Ms {
    DAY + hour * H + minute * M
}

fn iv(start: Ms, end: Ms) -> Interval {
    Interval::new(start, end).unwrap()
}

async fn book(engine: &Engine, room: &str, start: Ms, end: Ms) -> BookingOutcome {
    engine
        .book_room(BookingRequest::new(room, start, end))
        .await
        .unwrap()
}

// ── Booking ──────────────────────────────────────────────

#[tokio::test]
async fn sequential_disjoint_bookings_all_succeed() {
    let engine = Engine::new();
    // Booked out of order on purpose.
    let slots = [(14, 15), (8, 9), (10, 12), (12, 13)];
    for (s, e) in slots {
        let outcome = book(&engine, "A-101", at(s, 0), at(e, 0)).await;
        assert!(outcome.is_new);
        assert_eq!(outcome.interval, iv(at(s, 0), at(e, 0)));
    }

    let list = engine.list_reservations("A-101").await.unwrap();
    assert_eq!(
        list,
        vec![
            iv(at(8, 0), at(9, 0)),
            iv(at(10, 0), at(12, 0)),
            iv(at(12, 0), at(13, 0)),
            iv(at(14, 0), at(15, 0)),
        ]
    );
}

#[tokio::test]
async fn overlapping_booking_reports_existing_interval() {
    let engine = Engine::new();
    let first = book(&engine, "A", at(8, 0), at(10, 0)).await;
    assert!(first.is_new);

    for (s, e) in [(at(9, 0), at(11, 0)), (at(7, 0), at(8, 1)), (at(7, 0), at(12, 0)), (at(8, 30), at(9, 30))] {
        let outcome = book(&engine, "A", s, e).await;
        assert!(!outcome.is_new, "[{s}, {e}) should collide");
        assert_eq!(outcome.room_id, "A");
        assert_eq!(outcome.interval, iv(at(8, 0), at(10, 0)));
    }

    // Conflicts never touch the store.
    assert_eq!(engine.list_reservations("A").await.unwrap().len(), 1);
}

#[tokio::test]
async fn adjacent_bookings_do_not_collide() {
    let engine = Engine::new();
    assert!(book(&engine, "A", at(12, 0), at(13, 0)).await.is_new);
    assert!(book(&engine, "A", at(13, 0), at(14, 0)).await.is_new);
    assert!(book(&engine, "A", at(11, 0), at(12, 0)).await.is_new);
    assert_eq!(engine.list_reservations("A").await.unwrap().len(), 3);
}

#[tokio::test]
async fn sub_minute_precision_is_truncated() {
    let engine = Engine::new();
    assert!(book(&engine, "A", at(12, 0), at(13, 0)).await.is_new);

    let outcome = book(&engine, "A", at(12, 0) + 59_999, at(12, 30)).await;
    assert!(!outcome.is_new);
    assert_eq!(outcome.interval, iv(at(12, 0), at(13, 0)));
}

#[tokio::test]
async fn recorded_interval_is_normalized() {
    let engine = Engine::new();
    let outcome = book(&engine, "A", at(9, 0) + 12_345, at(10, 0) + 59_999).await;
    assert!(outcome.is_new);
    assert_eq!(outcome.interval, iv(at(9, 0), at(10, 0)));
}

#[tokio::test]
async fn room_id_is_trimmed_everywhere() {
    let engine = Engine::new();
    let outcome = book(&engine, "  A-101 ", at(8, 0), at(9, 0)).await;
    assert_eq!(outcome.room_id, "A-101");

    // Same room regardless of surrounding whitespace.
    let conflict = book(&engine, "A-101\t", at(8, 30), at(9, 30)).await;
    assert!(!conflict.is_new);
    assert_eq!(conflict.room_id, "A-101");

    assert_eq!(engine.list_reservations(" A-101").await.unwrap().len(), 1);
    let all = engine.list_all_reservations().await.unwrap();
    assert_eq!(all.keys().collect::<Vec<_>>(), vec!["A-101"]);
}

// ── Validation ───────────────────────────────────────────

#[tokio::test]
async fn invalid_requests_fail_before_touching_registry() {
    let engine = Engine::new();

    let cases = [
        (BookingRequest { room_id: None, start: Some(at(8, 0)), end: Some(at(9, 0)) }, ValidationError::MissingRoomId),
        (BookingRequest::new("   ", at(8, 0), at(9, 0)), ValidationError::BlankRoomId),
        (
            BookingRequest { room_id: Some("A".into()), start: None, end: Some(at(9, 0)) },
            ValidationError::Interval(IntervalError::MissingStart),
        ),
        (
            BookingRequest { room_id: Some("A".into()), start: Some(at(8, 0)), end: None },
            ValidationError::Interval(IntervalError::MissingEnd),
        ),
        (BookingRequest::new("A", at(9, 0), at(9, 0)), ValidationError::Interval(IntervalError::Empty)),
        (BookingRequest::new("A", at(10, 0), at(9, 0)), ValidationError::Interval(IntervalError::Reversed)),
        (
            BookingRequest::new("A", at(9, 0) + 1_000, at(9, 0) + 30_000),
            ValidationError::Interval(IntervalError::Empty),
        ),
    ];

    for (request, expected) in cases {
        let err = engine.book_room(request).await.unwrap_err();
        assert_eq!(err, EngineError::ValidationFailed(expected));
        assert!(!err.is_retryable());
    }
    assert_eq!(engine.registry().room_count(), 0);
}

#[tokio::test]
async fn list_unknown_room_fails() {
    let engine = Engine::new();
    let result = engine.list_reservations("ghost").await;
    assert!(matches!(result, Err(EngineError::UnknownResource(ref id)) if id == "ghost"));
}

#[tokio::test]
async fn list_blank_room_id_fails_validation() {
    let engine = Engine::new();
    let result = engine.list_reservations("  ").await;
    assert_eq!(result, Err(EngineError::ValidationFailed(ValidationError::BlankRoomId)));
}

// ── Availability ─────────────────────────────────────────

#[tokio::test]
async fn find_available_on_single_booked_room() {
    let engine = Engine::new();
    book(&engine, "R-1", at(8, 0), at(10, 0)).await;

    let busy = engine.find_available_room(Some(at(8, 0)), Some(at(9, 0))).await.unwrap();
    assert_eq!(busy, None);

    let free = engine.find_available_room(Some(at(10, 0)), Some(at(11, 0))).await.unwrap();
    assert_eq!(free.as_deref(), Some("R-1"));
}

#[tokio::test]
async fn find_available_with_no_rooms_is_none() {
    let engine = Engine::new();
    let found = assert_ok!(engine.find_available_room(Some(at(8, 0)), Some(at(9, 0))).await);
    assert_eq!(found, None);
}

#[tokio::test]
async fn find_available_skips_busy_rooms() {
    let engine = Engine::new();
    book(&engine, "R-1", at(8, 0), at(10, 0)).await;
    book(&engine, "R-2", at(9, 0), at(11, 0)).await;
    book(&engine, "R-3", at(6, 0), at(8, 0)).await;

    let found = engine.find_available_room(Some(at(8, 30)), Some(at(9, 30))).await.unwrap();
    assert_eq!(found.as_deref(), Some("R-3"));

    let found = engine.find_available_room(Some(at(7, 0)), Some(at(11, 0))).await.unwrap();
    assert_eq!(found, None);

    // Several candidates: any of them is acceptable.
    let found = engine.find_available_room(Some(at(12, 0)), Some(at(13, 0))).await.unwrap();
    assert!(matches!(found.as_deref(), Some("R-1" | "R-2" | "R-3")));
}

#[tokio::test]
async fn find_available_validates_interval() {
    let engine = Engine::new();
    let err = assert_err!(engine.find_available_room(None, Some(at(9, 0))).await);
    assert_eq!(err, EngineError::InvalidInterval(IntervalError::MissingStart));

    let err = assert_err!(engine.find_available_room(Some(at(9, 0)), Some(at(8, 0))).await);
    assert_eq!(err, EngineError::InvalidInterval(IntervalError::Reversed));
}

#[tokio::test]
async fn find_available_result_can_be_booked() {
    let engine = Engine::new();
    book(&engine, "R-1", at(8, 0), at(10, 0)).await;
    book(&engine, "R-2", at(10, 0), at(12, 0)).await;

    let room = engine
        .find_available_room(Some(at(9, 0)), Some(at(10, 0)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(room, "R-2");
    assert!(book(&engine, &room, at(9, 0), at(10, 0)).await.is_new);
}

// ── Listing & reset ──────────────────────────────────────

#[tokio::test]
async fn list_all_groups_by_room() {
    let engine = Engine::new();
    book(&engine, "B", at(10, 0), at(11, 0)).await;
    book(&engine, "A", at(9, 0), at(10, 0)).await;
    book(&engine, "A", at(8, 0), at(9, 0)).await;

    let all = engine.list_all_reservations().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all["A"], vec![iv(at(8, 0), at(9, 0)), iv(at(9, 0), at(10, 0))]);
    assert_eq!(all["B"], vec![iv(at(10, 0), at(11, 0))]);
}

#[tokio::test]
async fn list_all_on_empty_engine() {
    let engine = Engine::new();
    assert!(engine.list_all_reservations().await.unwrap().is_empty());
}

#[tokio::test]
async fn listing_is_a_snapshot() {
    let engine = Engine::new();
    book(&engine, "A", at(8, 0), at(9, 0)).await;
    let before = engine.list_reservations("A").await.unwrap();
    book(&engine, "A", at(9, 0), at(10, 0)).await;
    assert_eq!(before.len(), 1);
    assert_eq!(engine.list_reservations("A").await.unwrap().len(), 2);
}

#[tokio::test]
async fn reset_forgets_everything() {
    let engine = Engine::new();
    book(&engine, "A", at(8, 0), at(9, 0)).await;
    book(&engine, "B", at(8, 0), at(9, 0)).await;

    engine.reset();

    assert!(engine.list_all_reservations().await.unwrap().is_empty());
    assert!(matches!(
        engine.list_reservations("A").await,
        Err(EngineError::UnknownResource(_))
    ));
    // The freed slot can be booked again.
    assert!(book(&engine, "A", at(8, 0), at(9, 0)).await.is_new);
}

#[tokio::test]
async fn engines_are_independent() {
    let a = Engine::new();
    let b = Engine::new();
    book(&a, "A", at(8, 0), at(9, 0)).await;

    assert!(matches!(b.list_reservations("A").await, Err(EngineError::UnknownResource(_))));
    assert!(book(&b, "A", at(8, 0), at(9, 0)).await.is_new);
}

// ── Concurrency ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_disjoint_bookings_on_one_room() {
    const WORKERS: i64 = 16;
    const PER_WORKER: i64 = 50;

    let engine = Arc::new(Engine::new());
    let mut tasks = JoinSet::new();
    for w in 0..WORKERS {
        let engine = engine.clone();
        tasks.spawn(async move {
            let mut outcomes = Vec::with_capacity(PER_WORKER as usize);
            for m in 0..PER_WORKER {
                // Interleave workers so neighbours in time come from different tasks.
                let slot = m * WORKERS + w;
                let start = DAY + slot * 30 * M;
                let outcome = engine
                    .book_room(BookingRequest::new("shared", start, start + 30 * M))
                    .await
                    .unwrap();
                outcomes.push(outcome);
            }
            outcomes
        });
    }

    while let Some(result) = tasks.join_next().await {
        for outcome in result.unwrap() {
            assert!(outcome.is_new, "false conflict on {}", outcome.interval);
        }
    }

    let list = engine.list_reservations("shared").await.unwrap();
    assert_eq!(list.len(), (WORKERS * PER_WORKER) as usize);
    assert!(list.windows(2).all(|w| w[0].end() <= w[1].start()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_identical_bookings_have_one_winner() {
    let engine = Arc::new(Engine::new());
    let mut tasks = JoinSet::new();
    for _ in 0..32 {
        let engine = engine.clone();
        tasks.spawn(async move {
            engine
                .book_room(BookingRequest::new("hot", at(9, 0), at(10, 0)))
                .await
                .unwrap()
        });
    }

    let mut winners = 0;
    while let Some(result) = tasks.join_next().await {
        let outcome = result.unwrap();
        assert_eq!(outcome.interval, iv(at(9, 0), at(10, 0)));
        if outcome.is_new {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(engine.list_reservations("hot").await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_across_rooms() {
    let engine = Arc::new(Engine::new());
    let mut tasks = JoinSet::new();
    for r in 0..8 {
        let engine = engine.clone();
        tasks.spawn(async move {
            let room = format!("room-{r}");
            for h in 0..24 {
                let outcome = engine
                    .book_room(BookingRequest::new(room.as_str(), at(h, 0), at(h, 0) + H))
                    .await
                    .unwrap();
                assert!(outcome.is_new);
            }
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    let all = engine.list_all_reservations().await.unwrap();
    assert_eq!(all.len(), 8);
    assert!(all.values().all(|list| list.len() == 24));
    assert_eq!(
        engine.find_available_room(Some(at(3, 0)), Some(at(4, 0))).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn locked_room_reports_busy() {
    let engine = Engine::with_lock_timeout(Duration::from_millis(50));
    book(&engine, "A", at(8, 0), at(9, 0)).await;

    let held = engine.registry().get("A").unwrap().write_owned().await;

    let err = engine
        .book_room(BookingRequest::new("A", at(10, 0), at(11, 0)))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ResourceBusy("A".into()));
    assert!(err.is_retryable());

    let err = engine.list_reservations("A").await.unwrap_err();
    assert_eq!(err, EngineError::ResourceBusy("A".into()));

    // Other rooms are unaffected by A's lock.
    assert!(book(&engine, "B", at(10, 0), at(11, 0)).await.is_new);

    drop(held);

    // The timed-out attempt left no trace; the retry goes through.
    assert_eq!(engine.list_reservations("A").await.unwrap().len(), 1);
    assert!(book(&engine, "A", at(10, 0), at(11, 0)).await.is_new);
}

#[tokio::test]
async fn scans_do_not_hang_on_a_locked_room() {
    let engine = Engine::with_lock_timeout(Duration::from_millis(50));
    book(&engine, "A", at(8, 0), at(9, 0)).await;
    let held = engine.registry().get("A").unwrap().write_owned().await;

    // Only room known and it is locked: skipped, nothing found.
    let found = tokio::time::timeout(
        Duration::from_secs(2),
        engine.find_available_room(Some(at(10, 0)), Some(at(11, 0))),
    )
    .await
    .expect("availability scan waited on a locked room");
    assert_eq!(found, Ok(None));

    // A free unlocked room is still found.
    book(&engine, "B", at(8, 0), at(9, 0)).await;
    let found = tokio::time::timeout(
        Duration::from_secs(2),
        engine.find_available_room(Some(at(10, 0)), Some(at(11, 0))),
    )
    .await
    .expect("availability scan waited on a locked room");
    assert_eq!(found.unwrap().as_deref(), Some("B"));

    let listed = tokio::time::timeout(Duration::from_secs(2), engine.list_all_reservations())
        .await
        .expect("listing waited past the lock timeout");
    assert_eq!(listed, Err(EngineError::ResourceBusy("A".into())));

    drop(held);
    let all = engine.list_all_reservations().await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(engine.find_available_room(Some(at(10, 0)), Some(at(11, 0))).await.unwrap().is_some());
}

#[tokio::test]
async fn waiting_booking_proceeds_once_lock_is_released() {
    let engine = Arc::new(Engine::with_lock_timeout(Duration::from_secs(5)));
    book(&engine, "A", at(8, 0), at(9, 0)).await;
    let held = engine.registry().get("A").unwrap().write_owned().await;

    let waiter = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .book_room(BookingRequest::new("A", at(9, 0), at(10, 0)))
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());
    drop(held);

    let outcome = waiter.await.unwrap().unwrap();
    assert!(outcome.is_new);
}

#[test]
fn default_lock_timeout_is_sixty_seconds() {
    assert_eq!(Engine::new().lock_timeout(), Duration::from_secs(60));
    assert_eq!(DEFAULT_LOCK_TIMEOUT, Duration::from_secs(60));
}

#[test]
fn outcome_serializes_with_interval_bounds() {
    let outcome = BookingOutcome {
        room_id: "A".into(),
        interval: iv(at(8, 0), at(9, 0)),
        is_new: true,
    };
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["room_id"], "A");
    assert_eq!(json["interval"]["start"], at(8, 0));
    assert_eq!(json["interval"]["end"], at(9, 0));
    assert_eq!(json["is_new"], true);
}
