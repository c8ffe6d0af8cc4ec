mod common;

use common::*;
use order_alerts::backend::mock::MockBackend;
use order_alerts::capability::{Capabilities, NoAudio, Permission};
use order_alerts::clock::{Clock, ManualClock};
use order_alerts::error::{BackendError, PollError};
use order_alerts::events::{AlertEvent, EvictReason};
use order_alerts::model::{OrderId, TenantId};
use order_alerts::poller::PendingOrderPoller;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const POLL: Duration = Duration::from_secs(10);

fn poller(
    backend: &Arc<MockBackend>,
    ws: &WorkingSet,
    clock: &ManualClock,
    capabilities: Capabilities,
) -> PendingOrderPoller {
    PendingOrderPoller::new(
        backend.clone(),
        ws.client.clone(),
        TenantId::from("shop"),
        Arc::new(clock.clone()),
        capabilities,
        POLL,
    )
}

fn ids(names: &[&str]) -> Vec<OrderId> {
    names.iter().map(|n| OrderId::from(*n)).collect()
}

#[tokio::test(start_paused = true)]
async fn test_working_set_converges_on_latest_successful_poll() {
    let clock = manual_clock();
    let backend = Arc::new(MockBackend::new());
    let o1 = pending_order("o1", &clock, 300);
    let o2 = pending_order("o2", &clock, 300);
    let o3 = pending_order("o3", &clock, 300);
    backend.expect_pending().return_ok(vec![o1, o2.clone()]);
    backend.expect_pending().return_ok(vec![o2, o3.clone()]);
    backend
        .expect_pending()
        .return_err(BackendError::Network("connection reset".into()));
    backend.expect_pending().return_ok(vec![o3]);

    let mut ws = WorkingSet::start(&clock, Capabilities::none());
    let mut poller = poller(&backend, &ws, &clock, Capabilities::none());

    poller.poll_once().await.unwrap();
    assert_eq!(ws.client.ids().await.unwrap(), ids(&["o1", "o2"]));

    let report = poller.poll_once().await.unwrap();
    assert_eq!(report.added, ids(&["o3"]));
    assert_eq!(report.evicted, ids(&["o1"]));
    assert_eq!(ws.client.ids().await.unwrap(), ids(&["o2", "o3"]));

    // A failed poll leaves the set as it was.
    let err = poller.poll_once().await.unwrap_err();
    assert!(matches!(err, PollError::Fetch(BackendError::Network(_))));
    assert_eq!(ws.client.ids().await.unwrap(), ids(&["o2", "o3"]));

    poller.poll_once().await.unwrap();
    assert_eq!(ws.client.ids().await.unwrap(), ids(&["o3"]));

    let evictions: Vec<AlertEvent> = drain(&mut ws.events).into_iter().filter(is_evicted).collect();
    assert_eq!(
        evictions,
        vec![
            AlertEvent::Evicted {
                order_id: OrderId::from("o1"),
                reason: EvictReason::NoLongerPending
            },
            AlertEvent::Evicted {
                order_id: OrderId::from("o2"),
                reason: EvictReason::NoLongerPending
            },
        ]
    );
    backend.verify();
    drop(poller);
    ws.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_poll_failures_are_reported_not_raised() {
    let clock = manual_clock();
    let backend = Arc::new(MockBackend::new());
    backend.expect_pending().return_ok(vec![pending_order("o1", &clock, 300)]);
    backend.expect_pending().return_err(BackendError::Timeout);
    backend
        .expect_pending()
        .return_err(BackendError::Server("502".into()));
    backend.expect_pending().return_ok(vec![pending_order("o1", &clock, 300)]);

    let mut ws = WorkingSet::start(&clock, Capabilities::none());
    let mut poller = poller(&backend, &ws, &clock, Capabilities::none());
    let status = poller.status();

    poller.poll_once().await.unwrap();
    let first_success = status.borrow().last_success;
    assert!(first_success.is_some());

    clock.advance(POLL);
    assert!(poller.poll_once().await.is_err());
    clock.advance(POLL);
    assert!(poller.poll_once().await.is_err());
    {
        let current = status.borrow();
        assert_eq!(current.consecutive_failures, 2);
        assert_eq!(current.last_success, first_success);
        assert!(current.last_error.is_some());
        assert!(current.is_stale(clock.now(), Duration::from_secs(15)));
    }
    assert_eq!(ws.client.ids().await.unwrap(), ids(&["o1"]));
    let failures = drain(&mut ws.events)
        .into_iter()
        .filter(|e| matches!(e, AlertEvent::PollFailed { .. }))
        .count();
    assert_eq!(failures, 2);

    poller.poll_once().await.unwrap();
    assert_eq!(status.borrow().consecutive_failures, 0);
    assert!(status.borrow().last_error.is_none());
    drop(poller);
    ws.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_dismissed_alert_returns_while_still_pending() {
    let clock = manual_clock();
    let backend = Arc::new(MockBackend::new());
    let order = pending_order("o1", &clock, 300);
    backend.expect_pending().return_ok(vec![order.clone()]);
    backend.expect_pending().return_ok(vec![order]);

    let mut ws = WorkingSet::start(&clock, Capabilities::none());
    let mut poller = poller(&backend, &ws, &clock, Capabilities::none());

    poller.poll_once().await.unwrap();
    assert!(ws
        .client
        .evict(OrderId::from("o1"), EvictReason::Dismissed)
        .await
        .unwrap());
    assert!(ws.client.ids().await.unwrap().is_empty());

    let report = poller.poll_once().await.unwrap();
    assert_eq!(report.added, ids(&["o1"]));

    let raised = drain(&mut ws.events)
        .into_iter()
        .filter(|e| matches!(e, AlertEvent::Raised { .. }))
        .count();
    assert_eq!(raised, 2);
    drop(poller);
    ws.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_orders_past_their_local_deadline_are_not_raised() {
    let clock = manual_clock();
    let backend = Arc::new(MockBackend::new());
    let overdue = pending_order("late", &clock, 60);
    let fresh = pending_order("fresh", &clock, 600);
    backend.expect_pending().return_ok(vec![overdue, fresh]);

    let ws = WorkingSet::start(&clock, Capabilities::none());
    let mut poller = poller(&backend, &ws, &clock, Capabilities::none());

    // The server's auto-accept of "late" is due but it is still listed.
    clock.advance(Duration::from_secs(61));
    poller.poll_once().await.unwrap();
    assert_eq!(ws.client.ids().await.unwrap(), ids(&["fresh"]));
    drop(poller);
    ws.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_permission_requested_once_at_activation() {
    let clock = manual_clock();
    let backend = Arc::new(MockBackend::new());
    let ws = WorkingSet::start(&clock, Capabilities::none());

    let undecided = Arc::new(FakeNotifier::new(Permission::Default, Permission::Granted));
    let mut first = poller(
        &backend,
        &ws,
        &clock,
        Capabilities::new(Arc::new(NoAudio), undecided.clone()),
    );
    assert_eq!(first.activate().await, Permission::Granted);
    assert_eq!(first.activate().await, Permission::Granted);
    assert_eq!(undecided.requests(), 1);

    let denied = Arc::new(FakeNotifier::new(Permission::Denied, Permission::Granted));
    let mut second = poller(
        &backend,
        &ws,
        &clock,
        Capabilities::new(Arc::new(NoAudio), denied.clone()),
    );
    assert_eq!(second.activate().await, Permission::Denied);
    assert_eq!(denied.requests(), 0);

    drop((first, second));
    ws.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_run_polls_on_interval_until_cancelled() {
    let clock = manual_clock();
    let backend = Arc::new(MockBackend::new());
    for _ in 0..3 {
        backend.expect_pending().return_ok(vec![pending_order("o1", &clock, 300)]);
    }

    let ws = WorkingSet::start(&clock, Capabilities::none());
    let runner = poller(&backend, &ws, &clock, Capabilities::none());
    let token = CancellationToken::new();
    let task = tokio::spawn(runner.run(token.clone()));

    // Immediately, then at 10 s and 20 s.
    tokio::time::sleep(POLL * 2 + Duration::from_millis(100)).await;
    token.cancel();
    task.await.unwrap();

    assert_eq!(backend.pending_calls(), 3);
    assert_eq!(backend.unscripted_calls(), 0);
    assert_eq!(ws.client.ids().await.unwrap(), ids(&["o1"]));
    ws.stop().await;
}
