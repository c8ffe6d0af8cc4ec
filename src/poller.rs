//! # Pending-Order Poller
//!
//! Owns the working set. Every `poll_interval` it fetches the tenant's pending
//! orders and reconciles the alerts against them in one actor message: new
//! ids raise alerts, missing ids are evicted, and ids seen before are left
//! alone. A failed fetch leaves the working set exactly as it was; the next
//! scheduled poll is the retry.

use crate::backend::OrderBackend;
use crate::capability::{Capabilities, Permission};
use crate::clients::WorkingSetClient;
use crate::clock::{self, Clock};
use crate::error::PollError;
use crate::events::AlertEvent;
use crate::model::{OrderId, PendingOrder, TenantId};
use chrono::{DateTime, Utc};
use keyed_actor::ReconcileReport;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// What the "last updated" indicator renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollStatus {
    pub last_success: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub last_error: Option<PollError>,
}

impl PollStatus {
    /// True when the working set has not been confirmed by a successful poll
    /// within `stale_after`. A desk that never polled successfully is stale.
    pub fn is_stale(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        match self.last_success {
            // Time since `at`, floored at zero.
            Some(at) => clock::remaining(now, at) > stale_after,
            None => true,
        }
    }
}

pub struct PendingOrderPoller {
    backend: Arc<dyn OrderBackend>,
    working_set: WorkingSetClient,
    tenant: TenantId,
    clock: Arc<dyn Clock>,
    capabilities: Capabilities,
    interval: Duration,
    status: watch::Sender<PollStatus>,
    short_window_warned: HashSet<OrderId>,
    activated: bool,
}

impl PendingOrderPoller {
    pub fn new(
        backend: Arc<dyn OrderBackend>,
        working_set: WorkingSetClient,
        tenant: TenantId,
        clock: Arc<dyn Clock>,
        capabilities: Capabilities,
        interval: Duration,
    ) -> Self {
        let (status, _) = watch::channel(PollStatus::default());
        Self {
            backend,
            working_set,
            tenant,
            clock,
            capabilities,
            interval,
            status,
            short_window_warned: HashSet::new(),
            activated: false,
        }
    }

    pub fn status(&self) -> watch::Receiver<PollStatus> {
        self.status.subscribe()
    }

    /// Ask for notification permission, once per poller and only if the host
    /// has never decided.
    pub async fn activate(&mut self) -> Permission {
        if self.activated {
            return self.capabilities.notifier.permission();
        }
        self.activated = true;
        let permission = self.capabilities.ensure_notification_permission().await;
        info!(?permission, "Poller activated");
        permission
    }

    /// One fetch and reconcile. On failure nothing in the working set changes.
    #[instrument(skip(self), fields(tenant = %self.tenant))]
    pub async fn poll_once(&mut self) -> Result<ReconcileReport<OrderId>, PollError> {
        let attempted = self.clock.now();
        self.status.send_modify(|s| s.last_attempt = Some(attempted));

        // Taken before the fetch: accepts that land while it is in flight win.
        let since = match self.working_set.checkpoint().await {
            Ok(since) => since,
            Err(e) => return Err(self.record_failure(PollError::WorkingSet(e.to_string()))),
        };
        let fetched = match self.backend.pending_orders(&self.tenant).await {
            Ok(orders) => orders,
            Err(e) => return Err(self.record_failure(e.into())),
        };
        let orders = self.admissible(fetched);

        let report = match self.working_set.reconcile_since(orders, since).await {
            Ok(report) => report,
            Err(e) => return Err(self.record_failure(PollError::WorkingSet(e.to_string()))),
        };

        let succeeded = self.clock.now();
        self.status.send_modify(|s| {
            s.last_success = Some(succeeded);
            s.consecutive_failures = 0;
            s.last_error = None;
        });
        if !report.is_unchanged() {
            info!(
                added = report.added.len(),
                evicted = report.evicted.len(),
                kept = report.kept.len(),
                "Working set reconciled"
            );
        }
        Ok(report)
    }

    /// Poll on the interval until `token` is cancelled. The first poll runs
    /// immediately.
    pub async fn run(mut self, token: CancellationToken) {
        self.activate().await;

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    // Failures are already recorded and published.
                    let _ = self.poll_once().await;
                }
            }
        }
        info!("Poller stopped");
    }

    /// Orders that should have an alert right now.
    fn admissible(&mut self, fetched: Vec<PendingOrder>) -> Vec<PendingOrder> {
        let now = self.clock.now();
        let mut orders = Vec::with_capacity(fetched.len());
        for order in fetched {
            if !order.is_pending() {
                debug!(order_id = %order.id, status = ?order.acceptance_status, "Skipping resolved order");
                continue;
            }
            if clock::remaining(order.acceptance_deadline, now) == Duration::ZERO {
                debug!(order_id = %order.id, "Deadline elapsed locally, awaiting server auto-accept");
                continue;
            }
            if order.auto_accept_timer() < self.interval * 2
                && self.short_window_warned.insert(order.id.clone())
            {
                warn!(
                    order_id = %order.id,
                    window = ?order.auto_accept_timer(),
                    poll_interval = ?self.interval,
                    "Acceptance window shorter than two poll intervals, alert may be missed"
                );
            }
            orders.push(order);
        }
        let current: HashSet<&OrderId> = orders.iter().map(|o| &o.id).collect();
        self.short_window_warned.retain(|id| current.contains(id));
        orders
    }

    fn record_failure(&self, error: PollError) -> PollError {
        let mut failures = 0;
        self.status.send_modify(|s| {
            s.consecutive_failures += 1;
            s.last_error = Some(error.clone());
            failures = s.consecutive_failures;
        });
        warn!(error = %error, consecutive_failures = failures, "Poll failed, keeping working set");
        let _ = self.working_set.events().send(AlertEvent::PollFailed {
            error: error.to_string(),
        });
        error
    }
}
