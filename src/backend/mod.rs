//! # Backend Collaborators
//!
//! The calls this crate makes against the storefront API. Transport is out of
//! scope: an HTTP client, the in-process [`MemoryBackend`], and the scripted
//! [`mock::MockBackend`] all implement [`OrderBackend`].

pub mod memory;
pub mod mock;

pub use memory::MemoryBackend;

use crate::error::BackendError;
use crate::model::{AcceptParams, OrderId, OrderTimeline, PendingOrder, StatusEvent, TenantId};
use async_trait::async_trait;
use tokio::sync::mpsc;

#[async_trait]
pub trait OrderBackend: Send + Sync {
    /// Orders of `tenant` currently awaiting acceptance.
    async fn pending_orders(&self, tenant: &TenantId) -> Result<Vec<PendingOrder>, BackendError>;

    /// Accept the order. An order that already left `pending` answers
    /// [`BackendError::NotPending`].
    async fn accept_order(
        &self,
        id: &OrderId,
        params: &AcceptParams,
    ) -> Result<StatusEvent, BackendError>;

    async fn order_timeline(&self, id: &OrderId) -> Result<OrderTimeline, BackendError>;

    /// Live status events for one order, if the backend can push them.
    /// `None` means callers fall back to re-fetching.
    async fn subscribe(&self, _id: &OrderId) -> Option<mpsc::Receiver<StatusEvent>> {
        None
    }
}
