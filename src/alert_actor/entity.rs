//! [`ActorEntity`] implementation for [`Alert`]: one pending order's alert,
//! from the moment a poll first reports it until it leaves the working set.

use crate::alert_actor::countdown::{Countdown, TickOutcome};
use crate::alert_actor::error::AlertError;
use crate::capability::{Capabilities, EscalationOutcome};
use crate::clients::WeakWorkingSet;
use crate::clock::Clock;
use crate::events::{AlertEvent, EventBus, EvictReason};
use crate::model::{OrderId, PendingOrder};
use async_trait::async_trait;
use keyed_actor::ActorEntity;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

/// Dependencies shared by every alert, injected when the actor starts.
#[derive(Clone)]
pub struct AlertContext {
    pub clock: Arc<dyn Clock>,
    pub capabilities: Capabilities,
    pub events: EventBus,
    pub tick_interval: Duration,
    /// Parent of every alert's task token; cancelled on desk shutdown.
    pub shutdown: CancellationToken,
    pub working_set: WeakWorkingSet,
}

/// Entity-specific operations on an alert.
#[derive(Debug, Clone)]
pub enum AlertAction {
    /// Recompute the countdown from the clock.
    Tick,
    RecordEscalation(EscalationOutcome),
    /// Claim the accept control. Fails softly if already claimed.
    BeginAccept,
    /// Release the accept control after a failed attempt.
    EndAccept,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertActionResult {
    Tick(TickOutcome),
    /// `false` when an outcome had already been recorded.
    RecordEscalation(bool),
    /// `false` when an accept was already in flight.
    BeginAccept(bool),
    EndAccept,
}

/// Alert state as the alerting surface renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertView {
    pub order_id: OrderId,
    pub order_number: String,
    pub total: Decimal,
    pub remaining: Duration,
    pub progress: f64,
    pub escalation: Option<EscalationOutcome>,
    pub accept_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct Alert {
    order: PendingOrder,
    countdown: Countdown,
    escalation: Option<EscalationOutcome>,
    accept_in_flight: bool,
    task: CancellationToken,
}

impl Alert {
    pub fn order(&self) -> &PendingOrder {
        &self.order
    }

    pub fn id(&self) -> &OrderId {
        &self.order.id
    }

    pub fn remaining(&self) -> Duration {
        self.countdown.remaining()
    }

    pub fn progress(&self) -> f64 {
        self.countdown.progress()
    }

    pub fn escalation(&self) -> Option<EscalationOutcome> {
        self.escalation
    }

    pub fn is_accept_in_flight(&self) -> bool {
        self.accept_in_flight
    }

    pub fn view(&self) -> AlertView {
        AlertView {
            order_id: self.order.id.clone(),
            order_number: self.order.order_number.clone(),
            total: self.order.total,
            remaining: self.remaining(),
            progress: self.progress(),
            escalation: self.escalation,
            accept_enabled: !self.accept_in_flight && !self.countdown.is_expired(),
        }
    }
}

#[async_trait]
impl ActorEntity for Alert {
    type Id = OrderId;
    type Create = PendingOrder;
    type Action = AlertAction;
    type ActionResult = AlertActionResult;
    type Context = AlertContext;
    type Error = AlertError;

    fn key_of(order: &PendingOrder) -> OrderId {
        order.id.clone()
    }

    fn from_create_params(order: PendingOrder) -> Result<Self, Self::Error> {
        if !order.is_pending() {
            return Err(AlertError::NotPending(order.id));
        }
        Ok(Self {
            countdown: Countdown::new(order.acceptance_deadline, order.auto_accept_timer()),
            order,
            escalation: None,
            accept_in_flight: false,
            task: CancellationToken::new(),
        })
    }

    async fn on_create(&mut self, ctx: &AlertContext) -> Result<(), Self::Error> {
        self.countdown.tick(ctx.clock.now());
        self.task = ctx.shutdown.child_token();

        let _ = ctx.events.send(AlertEvent::Raised {
            order_id: self.order.id.clone(),
            order_number: self.order.order_number.clone(),
            total: self.order.total,
        });
        info!(order_id = %self.order.id, remaining = ?self.remaining(), "Alert raised");

        let span = tracing::info_span!("alert", order_id = %self.order.id);
        tokio::spawn(
            run_alert_task(self.order.clone(), self.task.clone(), ctx.clone()).instrument(span),
        );
        Ok(())
    }

    async fn on_evict(&self, _ctx: &AlertContext) {
        self.task.cancel();
    }

    async fn handle_action(
        &mut self,
        action: AlertAction,
        ctx: &AlertContext,
    ) -> Result<AlertActionResult, Self::Error> {
        match action {
            AlertAction::Tick => Ok(AlertActionResult::Tick(
                self.countdown.tick(ctx.clock.now()),
            )),
            AlertAction::RecordEscalation(outcome) => {
                if self.escalation.is_some() {
                    return Ok(AlertActionResult::RecordEscalation(false));
                }
                self.escalation = Some(outcome);
                Ok(AlertActionResult::RecordEscalation(true))
            }
            AlertAction::BeginAccept => {
                if self.accept_in_flight {
                    return Ok(AlertActionResult::BeginAccept(false));
                }
                self.accept_in_flight = true;
                Ok(AlertActionResult::BeginAccept(true))
            }
            AlertAction::EndAccept => {
                self.accept_in_flight = false;
                Ok(AlertActionResult::EndAccept)
            }
        }
    }
}

/// Escalates once, then steps the countdown until it expires or the alert
/// is evicted. Every completion is checked against the token and the
/// working set's liveness before it acts.
async fn run_alert_task(order: PendingOrder, token: CancellationToken, ctx: AlertContext) {
    let id = order.id.clone();
    let escalation = ctx.capabilities.escalate(&order);
    tokio::pin!(escalation);
    let mut escalated = false;

    let mut interval = tokio::time::interval(ctx.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; on_create already took that reading.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            outcome = &mut escalation, if !escalated => {
                escalated = true;
                report_escalation(&id, outcome, &ctx).await;
            }
            _ = interval.tick() => {
                let Some(working_set) = ctx.working_set.upgrade() else { break };
                let outcome = working_set.tick(id.clone()).await;
                if token.is_cancelled() {
                    break;
                }
                match outcome {
                    Ok(TickOutcome::Running { remaining, progress }) => {
                        let _ = ctx.events.send(AlertEvent::Tick {
                            order_id: id.clone(),
                            remaining,
                            progress,
                        });
                    }
                    // Finished here means the deadline had already passed in on_create.
                    Ok(TickOutcome::Expired | TickOutcome::Finished) => {
                        // The server owns auto-accept; this only hides the alert.
                        info!("Deadline reached, assuming auto-accept");
                        if let Err(e) = working_set.evict(id.clone(), EvictReason::AutoAccepted).await {
                            debug!(error = %e, "Eviction after deadline failed");
                        }
                        break;
                    }
                    Err(e) => {
                        debug!(error = %e, "Tick rejected, stopping");
                        break;
                    }
                }
            }
        }
    }
    debug!("Alert task stopped");
}

async fn report_escalation(id: &OrderId, outcome: EscalationOutcome, ctx: &AlertContext) {
    let Some(working_set) = ctx.working_set.upgrade() else {
        return;
    };
    match working_set.record_escalation(id.clone(), outcome).await {
        Ok(true) => {
            let _ = ctx.events.send(AlertEvent::Escalated {
                order_id: id.clone(),
                outcome,
            });
            if outcome == EscalationOutcome::Exhausted {
                warn!("Escalation exhausted, merchant must watch the dashboard");
                let _ = ctx.events.send(AlertEvent::WatchDashboard {
                    order_id: id.clone(),
                });
            }
        }
        Ok(false) => debug!("Escalation already recorded"),
        Err(e) => debug!(error = %e, "Escalation outcome not recorded"),
    }
}
