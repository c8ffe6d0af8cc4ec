//! Notices for the alerting surface.
//!
//! Everything the UI shows about alerts (a new order, a countdown step, the
//! one success toast, the auto-accepted message, a retryable accept error,
//! a poll failure) arrives as an [`AlertEvent`] on one broadcast channel.

use crate::capability::EscalationOutcome;
use crate::error::AcceptError;
use crate::model::OrderId;
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::sync::broadcast;

/// Why an alert left the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    /// This client's accept succeeded.
    Accepted,
    /// This client tried to accept but the server had already moved on.
    AlreadyResolved,
    /// The local countdown reached zero. Advisory: the server decides.
    AutoAccepted,
    /// Hidden locally. The next poll re-raises it if still pending.
    Dismissed,
    /// A poll no longer listed the order.
    NoLongerPending,
}

impl EvictReason {
    /// Text for the user, where the eviction deserves one.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            EvictReason::Accepted => Some("Order accepted"),
            EvictReason::AlreadyResolved => Some("Order was already handled"),
            EvictReason::AutoAccepted => Some("Order was auto-accepted"),
            EvictReason::Dismissed | EvictReason::NoLongerPending => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertEvent {
    Raised {
        order_id: OrderId,
        order_number: String,
        total: Decimal,
    },
    Escalated {
        order_id: OrderId,
        outcome: EscalationOutcome,
    },
    /// Neither audio nor a notification reached the merchant.
    WatchDashboard { order_id: OrderId },
    Tick {
        order_id: OrderId,
        remaining: Duration,
        progress: f64,
    },
    AcceptFailed {
        order_id: OrderId,
        error: AcceptError,
    },
    Evicted {
        order_id: OrderId,
        reason: EvictReason,
    },
    PollFailed { error: String },
}

pub type EventBus = broadcast::Sender<AlertEvent>;

pub fn event_bus(capacity: usize) -> EventBus {
    broadcast::channel(capacity).0
}
