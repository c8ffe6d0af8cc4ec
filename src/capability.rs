//! # Host Capabilities
//!
//! Audio playback and system notifications are host services that may be
//! missing or blocked. They are injected as trait objects; [`NoAudio`] and
//! [`NoNotifier`] stand in when the host has neither, so the alerting code
//! never probes the environment itself.

use crate::model::PendingOrder;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CapabilityError {
    #[error("Capability unavailable")]
    Unavailable,

    #[error("Blocked by host: {0}")]
    Blocked(String),
}

/// The host's answer to "may we show notifications?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Never asked.
    Default,
    Granted,
    Denied,
}

/// Payload of a system notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new_order(order: &PendingOrder) -> Self {
        Self {
            title: format!("New order {}", order.order_number),
            body: format!("Total {}. Accept before it is auto-accepted.", order.total),
        }
    }
}

#[async_trait]
pub trait AudioCue: Send + Sync {
    async fn play(&self) -> Result<(), CapabilityError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn permission(&self) -> Permission;

    /// Ask the user. Only meaningful while the permission is `Default`.
    async fn request_permission(&self) -> Permission;

    async fn notify(&self, notification: &Notification) -> Result<(), CapabilityError>;
}

/// Audio for hosts that cannot play sound.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAudio;

#[async_trait]
impl AudioCue for NoAudio {
    async fn play(&self) -> Result<(), CapabilityError> {
        Err(CapabilityError::Unavailable)
    }
}

/// Notifications for hosts without a notification service.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNotifier;

#[async_trait]
impl Notifier for NoNotifier {
    fn permission(&self) -> Permission {
        Permission::Denied
    }

    async fn request_permission(&self) -> Permission {
        Permission::Denied
    }

    async fn notify(&self, _notification: &Notification) -> Result<(), CapabilityError> {
        Err(CapabilityError::Unavailable)
    }
}

/// Which step of the escalation path reached the merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationOutcome {
    Audible,
    Notified,
    /// Nothing worked; the merchant has to watch the dashboard.
    Exhausted,
}

/// The capabilities an alert escalates through.
#[derive(Clone)]
pub struct Capabilities {
    pub audio: Arc<dyn AudioCue>,
    pub notifier: Arc<dyn Notifier>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::none()
    }
}

impl Capabilities {
    pub fn new(audio: Arc<dyn AudioCue>, notifier: Arc<dyn Notifier>) -> Self {
        Self { audio, notifier }
    }

    /// A host with neither audio nor notifications.
    pub fn none() -> Self {
        Self::new(Arc::new(NoAudio), Arc::new(NoNotifier))
    }

    /// Audio first, then a notification if permission was granted earlier.
    /// Permission is never requested here.
    pub async fn escalate(&self, order: &PendingOrder) -> EscalationOutcome {
        match self.audio.play().await {
            Ok(()) => return EscalationOutcome::Audible,
            Err(e) => debug!(order_id = %order.id, error = %e, "Audio cue failed"),
        }

        if self.notifier.permission() != Permission::Granted {
            warn!(order_id = %order.id, "No audible or visible escalation available");
            return EscalationOutcome::Exhausted;
        }
        match self.notifier.notify(&Notification::new_order(order)).await {
            Ok(()) => EscalationOutcome::Notified,
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "Notification failed");
                EscalationOutcome::Exhausted
            }
        }
    }

    /// Ask for notification permission if the host has never been asked.
    /// Returns the permission in effect afterwards.
    pub async fn ensure_notification_permission(&self) -> Permission {
        match self.notifier.permission() {
            Permission::Default => {
                let answer = self.notifier.request_permission().await;
                debug!(?answer, "Notification permission requested");
                answer
            }
            decided => decided,
        }
    }
}
