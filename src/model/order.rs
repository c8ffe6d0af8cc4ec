//! Orders awaiting merchant acceptance, as reported by the backend.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;

/// Longest note a merchant may attach when accepting.
pub const MAX_ACCEPT_NOTE_CHARS: usize = 500;

/// Opaque, server-assigned order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The storefront whose orders this client watches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an order stands with respect to merchant acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceStatus {
    Pending,
    Accepted,
    AutoAccepted,
    Expired,
}

impl AcceptanceStatus {
    /// Every status except `Pending` is final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AcceptanceStatus::Pending)
    }
}

/// An order in the acceptance window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub id: OrderId,
    pub order_number: String,
    pub total: Decimal,
    /// Instant after which the server auto-accepts.
    pub acceptance_deadline: DateTime<Utc>,
    /// Length of the whole window. Only used for the progress ratio.
    pub auto_accept_timer_secs: u64,
    pub acceptance_status: AcceptanceStatus,
    pub created_at: DateTime<Utc>,
}

impl PendingOrder {
    pub fn auto_accept_timer(&self) -> Duration {
        Duration::from_secs(self.auto_accept_timer_secs)
    }

    pub fn is_pending(&self) -> bool {
        self.acceptance_status == AcceptanceStatus::Pending
    }
}

/// Optional parameters of an accept request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcceptParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AcceptParams {
    /// Checks the parameters against `now`, returning a message fit for
    /// showing next to the accept control.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), String> {
        if let Some(eta) = self.estimated_delivery_time {
            if eta <= now {
                return Err("estimated delivery time must be in the future".to_string());
            }
        }
        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_ACCEPT_NOTE_CHARS {
                return Err(format!(
                    "notes must be at most {MAX_ACCEPT_NOTE_CHARS} characters"
                ));
            }
        }
        Ok(())
    }
}
