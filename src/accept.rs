//! # Accept Coordinator
//!
//! Performs the merchant's accept for one order. The alert's accept control is
//! claimed inside the working-set actor before the request goes out, so a
//! second click while the first is in flight resolves immediately without a
//! second request. The server's "not pending anymore" answer counts as
//! success: the order no longer needs this client.

use crate::alert_actor::AlertError;
use crate::backend::OrderBackend;
use crate::clients::{AcceptClaim, WeakWorkingSet, WorkingSetClient};
use crate::clock::Clock;
use crate::error::{AcceptError, BackendError, FailureKind};
use crate::events::{AlertEvent, EventBus, EvictReason};
use crate::model::{AcceptParams, OrderId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// How a successful (or success-equivalent) accept ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// This call accepted the order.
    Accepted,
    /// The order had already left `pending` (another session, or auto-accept).
    AlreadyResolved,
    /// Another accept for this order is still running; nothing was sent.
    InFlight,
}

#[derive(Clone)]
pub struct AcceptCoordinator {
    backend: Arc<dyn OrderBackend>,
    working_set: WeakWorkingSet,
    events: EventBus,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl AcceptCoordinator {
    pub fn new(
        backend: Arc<dyn OrderBackend>,
        working_set: WeakWorkingSet,
        events: EventBus,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            working_set,
            events,
            clock,
            timeout,
        }
    }

    #[instrument(skip(self, params))]
    pub async fn accept(
        &self,
        id: OrderId,
        params: AcceptParams,
    ) -> Result<AcceptOutcome, AcceptError> {
        if let Err(message) = params.validate(self.clock.now()) {
            return Err(self.failed(&id, AcceptError::Validation(message)));
        }

        let working_set = self.working_set().ok_or(AcceptError::Unavailable)?;
        let tracked = match working_set.begin_accept(id.clone()).await {
            Ok(AcceptClaim::AlreadyInFlight) => {
                debug!("Accept already in flight");
                return Ok(AcceptOutcome::InFlight);
            }
            Ok(AcceptClaim::Claimed) => true,
            Ok(AcceptClaim::NotTracked) => {
                debug!("No local alert, accepting anyway");
                false
            }
            Err(e) => return Err(self.failed(&id, claim_error(e))),
        };
        // The request must not keep a shut-down desk alive.
        drop(working_set);

        let response = tokio::time::timeout(self.timeout, self.backend.accept_order(&id, &params)).await;
        let result = match response {
            Ok(Ok(_event)) => Ok(AcceptOutcome::Accepted),
            Ok(Err(e)) if e.kind() == FailureKind::TerminalBenign => {
                Ok(AcceptOutcome::AlreadyResolved)
            }
            Ok(Err(e)) => Err(accept_error(e)),
            Err(_elapsed) => Err(AcceptError::Timeout),
        };

        let Some(working_set) = self.working_set() else {
            debug!("Desk gone before accept completed");
            return result;
        };
        match result {
            Ok(outcome) => {
                let reason = match outcome {
                    AcceptOutcome::Accepted => EvictReason::Accepted,
                    _ => EvictReason::AlreadyResolved,
                };
                info!(?outcome, "Accept resolved");
                self.evict_resolved(&working_set, id, reason, tracked).await;
                Ok(outcome)
            }
            Err(error) => {
                if let Err(e) = working_set.end_accept(id.clone()).await {
                    debug!(error = %e, "Could not re-enable accept");
                }
                Err(self.failed(&id, error))
            }
        }
    }

    fn working_set(&self) -> Option<WorkingSetClient> {
        self.working_set.upgrade()
    }

    /// Evict optimistically, and keep a poll already in flight from raising
    /// the order again. If this call claimed the alert but a poll evicted it
    /// meanwhile, the notice carrying the outcome is still sent once.
    async fn evict_resolved(
        &self,
        working_set: &WorkingSetClient,
        id: OrderId,
        reason: EvictReason,
        tracked: bool,
    ) {
        match working_set.resolve(id.clone(), reason).await {
            Ok(false) if tracked => {
                let _ = self.events.send(AlertEvent::Evicted {
                    order_id: id,
                    reason,
                });
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Eviction after accept failed"),
        }
    }

    fn failed(&self, id: &OrderId, error: AcceptError) -> AcceptError {
        warn!(order_id = %id, error = %error, "Accept failed");
        let _ = self.events.send(AlertEvent::AcceptFailed {
            order_id: id.clone(),
            error: error.clone(),
        });
        error
    }
}

fn accept_error(e: BackendError) -> AcceptError {
    match e {
        BackendError::Validation(message) => AcceptError::Validation(message),
        BackendError::Timeout => AcceptError::Timeout,
        other => AcceptError::Retryable(other.to_string()),
    }
}

fn claim_error(e: AlertError) -> AcceptError {
    match e {
        AlertError::Closed => AcceptError::Unavailable,
        other => AcceptError::Retryable(other.to_string()),
    }
}
