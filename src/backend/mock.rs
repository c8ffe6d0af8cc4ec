//! # Scripted Backend
//!
//! `MockBackend` answers each call from a queue of scripted responses, in
//! order, per method. It is the backend counterpart of
//! [`keyed_actor::mock::MockClient`]: use it to drive the poller and the
//! accept coordinator through failures, delays, and races a real server
//! rarely produces on demand.
//!
//! ```rust
//! use order_alerts::backend::mock::MockBackend;
//! use order_alerts::backend::OrderBackend;
//! use order_alerts::error::BackendError;
//! use order_alerts::model::TenantId;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = MockBackend::new();
//!     backend.expect_pending().return_err(BackendError::Network("reset".into()));
//!
//!     let result = backend.pending_orders(&TenantId::from("shop")).await;
//!     assert!(result.is_err());
//!     backend.verify();
//! }
//! ```
//!
//! A call with nothing scripted answers `BackendError::Server` instead of
//! panicking, so a stray background poll cannot abort a test from inside a
//! spawned task; check [`MockBackend::unscripted_calls`] instead.

use crate::backend::OrderBackend;
use crate::error::BackendError;
use crate::model::{AcceptParams, OrderId, OrderTimeline, PendingOrder, StatusEvent, TenantId};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

struct Scripted<R> {
    delay: Option<Duration>,
    response: Result<R, BackendError>,
}

type Script<R> = Arc<Mutex<VecDeque<Scripted<R>>>>;

fn queue<R>(script: &Script<R>) -> MutexGuard<'_, VecDeque<Scripted<R>>> {
    script.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Calls {
    pending: AtomicUsize,
    accept: AtomicUsize,
    timeline: AtomicUsize,
    unscripted: AtomicUsize,
}

#[derive(Default)]
pub struct MockBackend {
    pending: Script<Vec<PendingOrder>>,
    accept: Script<StatusEvent>,
    timeline: Script<OrderTimeline>,
    calls: Calls,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_pending(&self) -> ResponseBuilder<Vec<PendingOrder>> {
        ResponseBuilder::new(self.pending.clone())
    }

    pub fn expect_accept(&self) -> ResponseBuilder<StatusEvent> {
        ResponseBuilder::new(self.accept.clone())
    }

    pub fn expect_timeline(&self) -> ResponseBuilder<OrderTimeline> {
        ResponseBuilder::new(self.timeline.clone())
    }

    pub fn pending_calls(&self) -> usize {
        self.calls.pending.load(Ordering::SeqCst)
    }

    pub fn accept_calls(&self) -> usize {
        self.calls.accept.load(Ordering::SeqCst)
    }

    pub fn timeline_calls(&self) -> usize {
        self.calls.timeline.load(Ordering::SeqCst)
    }

    pub fn unscripted_calls(&self) -> usize {
        self.calls.unscripted.load(Ordering::SeqCst)
    }

    /// Panics unless every scripted response was consumed.
    pub fn verify(&self) {
        let remaining =
            queue(&self.pending).len() + queue(&self.accept).len() + queue(&self.timeline).len();
        if remaining > 0 {
            panic!("Not all scripted responses were used. {remaining} remaining");
        }
    }

    async fn answer<R>(&self, script: &Script<R>) -> Result<R, BackendError> {
        let next = queue(script).pop_front();
        let Some(scripted) = next else {
            self.calls.unscripted.fetch_add(1, Ordering::SeqCst);
            return Err(BackendError::Server("no scripted response".into()));
        };
        if let Some(delay) = scripted.delay {
            tokio::time::sleep(delay).await;
        }
        scripted.response
    }
}

#[async_trait]
impl OrderBackend for MockBackend {
    async fn pending_orders(&self, _tenant: &TenantId) -> Result<Vec<PendingOrder>, BackendError> {
        self.calls.pending.fetch_add(1, Ordering::SeqCst);
        self.answer(&self.pending).await
    }

    async fn accept_order(
        &self,
        _id: &OrderId,
        _params: &AcceptParams,
    ) -> Result<StatusEvent, BackendError> {
        self.calls.accept.fetch_add(1, Ordering::SeqCst);
        self.answer(&self.accept).await
    }

    async fn order_timeline(&self, _id: &OrderId) -> Result<OrderTimeline, BackendError> {
        self.calls.timeline.fetch_add(1, Ordering::SeqCst);
        self.answer(&self.timeline).await
    }
}

/// Builder returned by the `expect_*` methods.
pub struct ResponseBuilder<R> {
    script: Script<R>,
    delay: Option<Duration>,
}

impl<R> ResponseBuilder<R> {
    fn new(script: Script<R>) -> Self {
        Self {
            script,
            delay: None,
        }
    }

    /// Hold the response back for `delay` before answering.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn return_ok(self, value: R) {
        self.push(Ok(value));
    }

    pub fn return_err(self, error: BackendError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<R, BackendError>) {
        queue(&self.script).push_back(Scripted {
            delay: self.delay,
            response,
        });
    }
}
