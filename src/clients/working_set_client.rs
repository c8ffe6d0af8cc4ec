//! # Working Set Client
//!
//! The only door into the working set. The poller reconciles through it,
//! the accept coordinator claims and evicts through it, and each alert's
//! task steps its countdown through it. Evictions are announced on the event
//! bus here, and only when something was actually removed, so a racing
//! accept and poll never announce the same order twice.
use crate::alert_actor::{Alert, AlertAction, AlertActionResult, AlertError, AlertView, TickOutcome};
use crate::capability::EscalationOutcome;
use crate::events::{AlertEvent, EventBus, EvictReason};
use crate::model::{OrderId, PendingOrder};
use async_trait::async_trait;
use keyed_actor::{ActorClient, FrameworkError, ReconcileReport, ResourceClient, WeakResourceClient};
use tracing::{debug, info, instrument};

/// Result of trying to claim an alert's accept control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptClaim {
    Claimed,
    AlreadyInFlight,
    /// No alert for this order on this client.
    NotTracked,
}

#[derive(Clone)]
pub struct WorkingSetClient {
    inner: ResourceClient<Alert>,
    events: EventBus,
}

impl WorkingSetClient {
    pub fn new(inner: ResourceClient<Alert>, events: EventBus) -> Self {
        Self { inner, events }
    }

    pub fn downgrade(&self) -> WeakWorkingSet {
        WeakWorkingSet {
            inner: self.inner.downgrade(),
            events: self.events.clone(),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Replace the set of alerts with the given pending orders, by id.
    #[instrument(skip(self, orders), fields(count = orders.len()))]
    pub async fn reconcile(
        &self,
        orders: Vec<PendingOrder>,
    ) -> Result<ReconcileReport<OrderId>, AlertError> {
        let report = self.inner.reconcile(orders).await?;
        Ok(self.settle(report))
    }

    /// Reconcile a listing fetched after [`checkpoint`](Self::checkpoint)
    /// returned `since`. Orders resolved locally in the meantime stay gone.
    #[instrument(skip(self, orders), fields(count = orders.len()))]
    pub async fn reconcile_since(
        &self,
        orders: Vec<PendingOrder>,
        since: u64,
    ) -> Result<ReconcileReport<OrderId>, AlertError> {
        let report = self.inner.reconcile_since(orders, since).await?;
        Ok(self.settle(report))
    }

    /// Read before fetching a listing that will be passed to
    /// [`reconcile_since`](Self::reconcile_since).
    pub async fn checkpoint(&self) -> Result<u64, AlertError> {
        Ok(self.inner.checkpoint().await?)
    }

    fn settle(&self, report: ReconcileReport<OrderId>) -> ReconcileReport<OrderId> {
        for id in &report.withheld {
            debug!(order_id = %id, "Resolved since the listing was fetched, not raised");
        }
        for id in &report.evicted {
            self.announce_eviction(id.clone(), EvictReason::NoLongerPending);
        }
        for (id, reason) in &report.rejected {
            debug!(order_id = %id, %reason, "Alert not raised");
        }
        report
    }

    /// Raise an alert for one order unless it already has one.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn raise(&self, order: PendingOrder) -> Result<bool, AlertError> {
        Ok(self.inner.insert(order).await?)
    }

    /// Remove the alert of an order that is no longer pending on the server.
    /// A listing fetched before this call will not raise it again.
    /// Returns `false` if there was no alert to remove.
    #[instrument(skip(self))]
    pub async fn resolve(&self, id: OrderId, reason: EvictReason) -> Result<bool, AlertError> {
        let removed = self.inner.retire(id.clone()).await?.is_some();
        if removed {
            info!(order_id = %id, ?reason, "Alert resolved");
            self.announce_eviction(id, reason);
        }
        Ok(removed)
    }

    /// Remove the alert. Returns `false` if it was already gone.
    #[instrument(skip(self))]
    pub async fn evict(&self, id: OrderId, reason: EvictReason) -> Result<bool, AlertError> {
        let removed = self.inner.evict(id.clone()).await?.is_some();
        if removed {
            info!(order_id = %id, ?reason, "Alert evicted");
            self.announce_eviction(id, reason);
        }
        Ok(removed)
    }

    pub async fn tick(&self, id: OrderId) -> Result<TickOutcome, AlertError> {
        match self.inner.perform_action(id, AlertAction::Tick).await? {
            AlertActionResult::Tick(outcome) => Ok(outcome),
            _ => Err(AlertError::UnexpectedResult("Tick")),
        }
    }

    pub async fn record_escalation(
        &self,
        id: OrderId,
        outcome: EscalationOutcome,
    ) -> Result<bool, AlertError> {
        match self
            .inner
            .perform_action(id, AlertAction::RecordEscalation(outcome))
            .await?
        {
            AlertActionResult::RecordEscalation(recorded) => Ok(recorded),
            _ => Err(AlertError::UnexpectedResult("RecordEscalation")),
        }
    }

    #[instrument(skip(self))]
    pub async fn begin_accept(&self, id: OrderId) -> Result<AcceptClaim, AlertError> {
        match self.inner.perform_action(id, AlertAction::BeginAccept).await {
            Ok(AlertActionResult::BeginAccept(true)) => Ok(AcceptClaim::Claimed),
            Ok(AlertActionResult::BeginAccept(false)) => Ok(AcceptClaim::AlreadyInFlight),
            Ok(_) => Err(AlertError::UnexpectedResult("BeginAccept")),
            Err(FrameworkError::NotFound(_)) => Ok(AcceptClaim::NotTracked),
            Err(e) => Err(e.into()),
        }
    }

    /// Re-enable the accept control. A no-op if the alert is gone.
    #[instrument(skip(self))]
    pub async fn end_accept(&self, id: OrderId) -> Result<(), AlertError> {
        match self.inner.perform_action(id, AlertAction::EndAccept).await {
            Ok(_) | Err(FrameworkError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Current alerts, soonest deadline first.
    pub async fn views(&self) -> Result<Vec<AlertView>, AlertError> {
        let mut alerts = self.list().await?;
        alerts.sort_by_key(|alert| alert.order().acceptance_deadline);
        Ok(alerts.iter().map(Alert::view).collect())
    }

    /// Ids of the current alerts, sorted.
    pub async fn ids(&self) -> Result<Vec<OrderId>, AlertError> {
        let mut ids: Vec<OrderId> = self
            .list()
            .await?
            .into_iter()
            .map(|alert| alert.id().clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn announce_eviction(&self, order_id: OrderId, reason: EvictReason) {
        let _ = self.events.send(AlertEvent::Evicted { order_id, reason });
    }
}

#[async_trait]
impl ActorClient<Alert> for WorkingSetClient {
    type Error = AlertError;

    fn inner(&self) -> &ResourceClient<Alert> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        e.into()
    }
}

/// A working-set handle that does not keep the actor running.
#[derive(Clone)]
pub struct WeakWorkingSet {
    inner: WeakResourceClient<Alert>,
    events: EventBus,
}

impl WeakWorkingSet {
    pub fn upgrade(&self) -> Option<WorkingSetClient> {
        self.inner
            .upgrade()
            .map(|inner| WorkingSetClient::new(inner, self.events.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_bus;
    use keyed_actor::mock::{create_mock_client, expect_action, MockClient};

    #[tokio::test]
    async fn test_begin_accept_maps_missing_alert_to_not_tracked() {
        let mut mock = MockClient::<Alert>::new();
        mock.expect_action(OrderId::from("o1"))
            .return_err(FrameworkError::NotFound("o1".into()));
        mock.expect_action(OrderId::from("o1"))
            .return_ok(AlertActionResult::BeginAccept(false));

        let client = WorkingSetClient::new(mock.client(), event_bus(8));
        assert_eq!(
            client.begin_accept(OrderId::from("o1")).await.unwrap(),
            AcceptClaim::NotTracked
        );
        assert_eq!(
            client.begin_accept(OrderId::from("o1")).await.unwrap(),
            AcceptClaim::AlreadyInFlight
        );
        mock.verify();
    }

    #[tokio::test]
    async fn test_evict_announces_only_real_removals() {
        let mut mock = MockClient::<Alert>::new();
        mock.expect_evict(OrderId::from("o1")).return_ok(None);

        let events = event_bus(8);
        let mut rx = events.subscribe();
        let client = WorkingSetClient::new(mock.client(), events);

        assert!(!client
            .evict(OrderId::from("o1"), EvictReason::Dismissed)
            .await
            .unwrap());
        assert!(rx.try_recv().is_err());
        mock.verify();
    }

    #[tokio::test]
    async fn test_tick_sends_tick_action() {
        let (inner, mut receiver) = create_mock_client::<Alert>(4);
        let client = WorkingSetClient::new(inner, event_bus(8));

        let task = tokio::spawn(async move { client.tick(OrderId::from("o7")).await });

        let (id, action, responder) = expect_action(&mut receiver)
            .await
            .expect("Expected Action request");
        assert_eq!(id, OrderId::from("o7"));
        assert!(matches!(action, AlertAction::Tick));
        responder
            .send(Ok(AlertActionResult::Tick(TickOutcome::Expired)))
            .unwrap();

        assert_eq!(task.await.unwrap().unwrap(), TickOutcome::Expired);
    }
}
