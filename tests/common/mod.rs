#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use order_alerts::alert_actor::{self, AlertContext};
use order_alerts::capability::{AudioCue, Capabilities, CapabilityError, Notification, Notifier, Permission};
use order_alerts::clients::WorkingSetClient;
use order_alerts::clock::{Clock, ManualClock};
use order_alerts::events::{event_bus, AlertEvent};
use order_alerts::model::{AcceptanceStatus, EventId, OrderId, PendingOrder, StatusEvent};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const TICK: Duration = Duration::from_secs(1);

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn manual_clock() -> ManualClock {
    ManualClock::new(t0())
}

/// A pending order placed at `clock`'s now with a `window_secs` window.
pub fn pending_order(id: &str, clock: &ManualClock, window_secs: u64) -> PendingOrder {
    let now = clock.now();
    PendingOrder {
        id: OrderId::from(id),
        order_number: format!("#{id}"),
        total: Decimal::new(3150, 2),
        acceptance_deadline: now + chrono::Duration::seconds(window_secs as i64),
        auto_accept_timer_secs: window_secs,
        acceptance_status: AcceptanceStatus::Pending,
        created_at: now,
    }
}

pub fn confirmed_event(id: &OrderId, clock: &ManualClock) -> StatusEvent {
    StatusEvent {
        id: EventId::from("evt_confirmed"),
        order_id: id.clone(),
        event_type: "confirmed".into(),
        note: "Accepted by merchant".into(),
        at: clock.now(),
        actor: Some("merchant".into()),
    }
}

/// Audio that counts plays and can be made to fail.
#[derive(Default)]
pub struct CountingAudio {
    pub plays: AtomicUsize,
    pub blocked: bool,
}

impl CountingAudio {
    pub fn blocked() -> Self {
        Self {
            blocked: true,
            ..Self::default()
        }
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioCue for CountingAudio {
    async fn play(&self) -> Result<(), CapabilityError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        if self.blocked {
            Err(CapabilityError::Blocked("autoplay policy".into()))
        } else {
            Ok(())
        }
    }
}

/// A notification service whose permission answer is scripted.
pub struct FakeNotifier {
    permission: Mutex<Permission>,
    answer: Permission,
    pub requests: AtomicUsize,
    pub sent: Mutex<Vec<Notification>>,
}

impl FakeNotifier {
    pub fn new(permission: Permission, answer: Permission) -> Self {
        Self {
            permission: Mutex::new(permission),
            answer,
            requests: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap()
    }

    async fn request_permission(&self) -> Permission {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.permission.lock().unwrap() = self.answer;
        self.answer
    }

    async fn notify(&self, notification: &Notification) -> Result<(), CapabilityError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// A running working-set actor without a desk around it.
pub struct WorkingSet {
    pub client: WorkingSetClient,
    pub events: broadcast::Receiver<AlertEvent>,
    pub shutdown: CancellationToken,
    pub handle: JoinHandle<()>,
}

impl WorkingSet {
    pub fn start(clock: &ManualClock, capabilities: Capabilities) -> Self {
        let events = event_bus(256);
        let receiver = events.subscribe();
        let shutdown = CancellationToken::new();
        let (actor, client) = alert_actor::new(16, events.clone());
        let context = AlertContext {
            clock: Arc::new(clock.clone()),
            capabilities,
            events,
            tick_interval: TICK,
            shutdown: shutdown.clone(),
            working_set: client.downgrade(),
        };
        let handle = tokio::spawn(actor.run(context));
        Self {
            client,
            events: receiver,
            shutdown,
            handle,
        }
    }

    /// Cancel every ticker, close the mailbox, and wait for the actor.
    /// Hands back the event receiver.
    pub async fn stop(self) -> broadcast::Receiver<AlertEvent> {
        self.shutdown.cancel();
        drop(self.client);
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("actor did not stop")
            .expect("actor panicked");
        self.events
    }
}

/// Next event matching `pred`, skipping others. Panics after ten virtual
/// minutes or if the bus closes.
pub async fn wait_for<F>(rx: &mut broadcast::Receiver<AlertEvent>, mut pred: F) -> AlertEvent
where
    F: FnMut(&AlertEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(600), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Every event currently queued, without waiting.
pub fn drain(rx: &mut broadcast::Receiver<AlertEvent>) -> Vec<AlertEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => return events,
        }
    }
}

pub fn is_evicted(event: &AlertEvent) -> bool {
    matches!(event, AlertEvent::Evicted { .. })
}
