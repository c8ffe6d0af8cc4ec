mod common;

use common::*;
use order_alerts::backend::memory::NewOrder;
use order_alerts::backend::mock::MockBackend;
use order_alerts::backend::MemoryBackend;
use order_alerts::error::{BackendError, TimelineError};
use order_alerts::model::{EventId, OrderId, OrderSummary, OrderTimeline, StatusEvent, TenantId};
use order_alerts::timeline::{Stage, TimelineWatcher};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const REFETCH: Duration = Duration::from_secs(15);

fn snapshot(address: &str, events: &[(&str, &str)]) -> OrderTimeline {
    OrderTimeline {
        order: OrderSummary {
            id: OrderId::from("o1"),
            order_number: "#1001".into(),
            total: Decimal::new(1800, 2),
            created_at: t0(),
            delivery_address: Some(address.into()),
        },
        events: events
            .iter()
            .enumerate()
            .map(|(i, (id, event_type))| StatusEvent {
                id: EventId::from(*id),
                order_id: OrderId::from("o1"),
                event_type: (*event_type).into(),
                note: String::new(),
                at: t0() + chrono::Duration::minutes(i as i64),
                actor: None,
            })
            .collect(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_pushed_events_apply_incrementally() {
    let clock = manual_clock();
    let backend = Arc::new(MemoryBackend::new(Arc::new(clock.clone())));
    let id = backend
        .place_order(NewOrder {
            tenant: TenantId::from("shop"),
            order_number: "#1001".into(),
            total: Decimal::new(1800, 2),
            window: Duration::from_secs(120),
            delivery_address: None,
        })
        .unwrap();

    let token = CancellationToken::new();
    let (mut timeline, task) = TimelineWatcher::new(backend.clone(), id.clone(), REFETCH)
        .start(token.clone())
        .await
        .unwrap();
    assert_eq!(timeline.borrow().current_stage(), Stage::Pending);

    backend
        .record_event(&id, "confirmed", "Accepted by merchant", Some("merchant"))
        .unwrap();
    timeline.changed().await.unwrap();
    assert_eq!(timeline.borrow_and_update().current_stage(), Stage::Confirmed);

    backend
        .record_event(&id, "teleported", "New courier type", None)
        .unwrap();
    timeline.changed().await.unwrap();
    {
        let current = timeline.borrow_and_update();
        assert_eq!(current.entries().len(), 3);
        assert_eq!(current.current_status(), Some("teleported"));
        assert_eq!(current.current_stage(), Stage::Confirmed);
        assert!(!current.entries()[2].recognized);
    }

    token.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_refetch_replaces_wholesale_and_survives_failures() {
    let backend = Arc::new(MockBackend::new());
    backend
        .expect_timeline()
        .return_ok(snapshot("1 Old Street", &[("e1", "pending")]));
    backend
        .expect_timeline()
        .return_err(BackendError::Network("timeout".into()));
    backend.expect_timeline().return_ok(snapshot(
        "9 New Road",
        &[("e1", "pending"), ("e2", "confirmed"), ("e3", "out_for_delivery")],
    ));

    let token = CancellationToken::new();
    let (mut timeline, task) = TimelineWatcher::new(backend.clone(), OrderId::from("o1"), REFETCH)
        .start(token.clone())
        .await
        .unwrap();

    // The failed refetch at 15 s changes nothing; the one at 30 s does.
    timeline.changed().await.unwrap();
    assert_eq!(backend.timeline_calls(), 3);
    {
        let current = timeline.borrow_and_update();
        assert_eq!(current.current_stage(), Stage::Shipped);
        assert!((current.progress() - 0.8).abs() < f64::EPSILON);
        assert_eq!(current.order().delivery_address.as_deref(), Some("9 New Road"));
    }

    token.cancel();
    task.await.unwrap();
    backend.verify();
}

#[tokio::test(start_paused = true)]
async fn test_watcher_stops_when_view_closes() {
    let backend = Arc::new(MockBackend::new());
    backend
        .expect_timeline()
        .return_ok(snapshot("1 Old Street", &[("e1", "pending")]));

    let (timeline, task) = TimelineWatcher::new(backend.clone(), OrderId::from("o1"), REFETCH)
        .start(CancellationToken::new())
        .await
        .unwrap();
    drop(timeline);

    tokio::time::timeout(Duration::from_secs(60), task)
        .await
        .expect("watcher kept running")
        .unwrap();
    assert_eq!(backend.timeline_calls(), 1);
}

#[tokio::test]
async fn test_initial_fetch_failure_is_reported() {
    let backend = Arc::new(MockBackend::new());
    backend
        .expect_timeline()
        .return_err(BackendError::NotFound(OrderId::from("o1")));

    let result = TimelineWatcher::new(backend, OrderId::from("o1"), REFETCH)
        .start(CancellationToken::new())
        .await;
    assert!(matches!(
        result,
        Err(TimelineError::Fetch(BackendError::NotFound(_)))
    ));
}
