//! An in-process backend that plays the server's part: it owns orders and
//! their history, lets the first accept win, and runs the authoritative
//! auto-accept sweep.

use crate::backend::OrderBackend;
use crate::clock::Clock;
use crate::error::BackendError;
use crate::model::{
    AcceptParams, AcceptanceStatus, EventId, OrderId, OrderSummary, OrderTimeline, PendingOrder,
    StatusEvent, TenantId,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const SUBSCRIBER_BUFFER: usize = 32;

/// An order as a customer places it.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub tenant: TenantId,
    pub order_number: String,
    pub total: Decimal,
    pub window: Duration,
    pub delivery_address: Option<String>,
}

struct StoredOrder {
    tenant: TenantId,
    order: PendingOrder,
    summary: OrderSummary,
    events: Vec<StatusEvent>,
}

#[derive(Default)]
struct State {
    orders: HashMap<OrderId, StoredOrder>,
    subscribers: HashMap<OrderId, Vec<mpsc::Sender<StatusEvent>>>,
    next_order: u64,
    next_event: u64,
}

impl State {
    fn append(
        &mut self,
        id: &OrderId,
        event_type: &str,
        note: &str,
        actor: Option<&str>,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<StatusEvent, BackendError> {
        self.next_event += 1;
        let event = StatusEvent {
            id: EventId(format!("evt_{}", self.next_event)),
            order_id: id.clone(),
            event_type: event_type.to_string(),
            note: note.to_string(),
            at,
            actor: actor.map(str::to_string),
        };
        let stored = self
            .orders
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(id.clone()))?;
        stored.events.push(event.clone());

        if let Some(subscribers) = self.subscribers.get_mut(id) {
            subscribers.retain(|tx| !matches!(tx.try_send(event.clone()), Err(TrySendError::Closed(_))));
        }
        Ok(event)
    }
}

pub struct MemoryBackend {
    clock: Arc<dyn Clock>,
    min_window: Duration,
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            min_window: Duration::ZERO,
            state: Mutex::new(State::default()),
        }
    }

    /// Refuse orders whose acceptance window is shorter than `min_window`.
    pub fn with_min_window(mut self, min_window: Duration) -> Self {
        self.min_window = min_window;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn place_order(&self, new: NewOrder) -> Result<OrderId, BackendError> {
        if new.window < self.min_window {
            return Err(BackendError::Validation(format!(
                "acceptance window {:?} is shorter than the minimum {:?}",
                new.window, self.min_window
            )));
        }
        let window = chrono::Duration::from_std(new.window)
            .map_err(|e| BackendError::Validation(e.to_string()))?;
        let now = self.clock.now();

        let mut state = self.state();
        state.next_order += 1;
        let id = OrderId(format!("ord_{}", state.next_order));
        let order = PendingOrder {
            id: id.clone(),
            order_number: new.order_number.clone(),
            total: new.total,
            acceptance_deadline: now + window,
            auto_accept_timer_secs: new.window.as_secs(),
            acceptance_status: AcceptanceStatus::Pending,
            created_at: now,
        };
        let summary = OrderSummary {
            id: id.clone(),
            order_number: new.order_number,
            total: new.total,
            created_at: now,
            delivery_address: new.delivery_address,
        };
        state.orders.insert(
            id.clone(),
            StoredOrder {
                tenant: new.tenant,
                order,
                summary,
                events: Vec::new(),
            },
        );
        state.append(&id, "pending", "Order placed", None, now)?;
        info!(order_id = %id, "Order placed");
        Ok(id)
    }

    /// Auto-accept every pending order whose deadline has passed.
    pub fn sweep_expired(&self) -> Vec<OrderId> {
        let now = self.clock.now();
        let mut state = self.state();
        let due: Vec<OrderId> = state
            .orders
            .values()
            .filter(|s| s.order.is_pending() && s.order.acceptance_deadline <= now)
            .map(|s| s.order.id.clone())
            .collect();

        for id in &due {
            if let Some(stored) = state.orders.get_mut(id) {
                stored.order.acceptance_status = AcceptanceStatus::AutoAccepted;
            }
            let _ = state.append(id, "confirmed", "Auto-accepted", Some("system"), now);
            info!(order_id = %id, "Order auto-accepted");
        }
        due
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `every` until cancelled.
    pub fn spawn_auto_accept(self: Arc<Self>, every: Duration, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        self.sweep_expired();
                    }
                }
            }
            debug!("Auto-accept sweep stopped");
        })
    }

    /// Append a lifecycle event, as fulfilment staff would.
    pub fn record_event(
        &self,
        id: &OrderId,
        event_type: &str,
        note: &str,
        actor: Option<&str>,
    ) -> Result<StatusEvent, BackendError> {
        let now = self.clock.now();
        self.state().append(id, event_type, note, actor, now)
    }

    pub fn set_delivery_address(&self, id: &OrderId, address: &str) -> Result<(), BackendError> {
        let mut state = self.state();
        let stored = state
            .orders
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(id.clone()))?;
        stored.summary.delivery_address = Some(address.to_string());
        Ok(())
    }

    pub fn acceptance_status(&self, id: &OrderId) -> Option<AcceptanceStatus> {
        self.state()
            .orders
            .get(id)
            .map(|s| s.order.acceptance_status)
    }

    pub fn events(&self, id: &OrderId) -> Vec<StatusEvent> {
        self.state()
            .orders
            .get(id)
            .map(|s| s.events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl OrderBackend for MemoryBackend {
    async fn pending_orders(&self, tenant: &TenantId) -> Result<Vec<PendingOrder>, BackendError> {
        let mut pending: Vec<PendingOrder> = self
            .state()
            .orders
            .values()
            .filter(|s| &s.tenant == tenant && s.order.is_pending())
            .map(|s| s.order.clone())
            .collect();
        pending.sort_by_key(|o| o.created_at);
        Ok(pending)
    }

    async fn accept_order(
        &self,
        id: &OrderId,
        params: &AcceptParams,
    ) -> Result<StatusEvent, BackendError> {
        let now = self.clock.now();
        params.validate(now).map_err(BackendError::Validation)?;

        let mut state = self.state();
        let stored = state
            .orders
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(id.clone()))?;
        if !stored.order.is_pending() {
            return Err(BackendError::NotPending(id.clone()));
        }
        stored.order.acceptance_status = AcceptanceStatus::Accepted;

        let note = params.notes.as_deref().unwrap_or("Accepted by merchant");
        let event = state.append(id, "confirmed", note, Some("merchant"), now)?;
        info!(order_id = %id, "Order accepted");
        Ok(event)
    }

    async fn order_timeline(&self, id: &OrderId) -> Result<OrderTimeline, BackendError> {
        let state = self.state();
        let stored = state
            .orders
            .get(id)
            .ok_or_else(|| BackendError::NotFound(id.clone()))?;
        Ok(OrderTimeline {
            order: stored.summary.clone(),
            events: stored.events.clone(),
        })
    }

    async fn subscribe(&self, id: &OrderId) -> Option<mpsc::Receiver<StatusEvent>> {
        let mut state = self.state();
        if !state.orders.contains_key(id) {
            return None;
        }
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        state.subscribers.entry(id.clone()).or_default().push(tx);
        Some(rx)
    }
}
