//! # Mock Clients & Testing Guide
//!
//! `MockClient<T>` hands out a real [`ResourceClient<T>`] whose requests are
//! answered from a queue of expectations instead of a running actor. Use it to
//! test the logic *around* a client (coordinators, pollers) deterministically,
//! including failures that a real actor rarely produces.
//!
//! | Feature | MockClient | Real Actor |
//! |---------|------------|------------|
//! | **State** | None, answers are scripted | Real store and hooks |
//! | **Error Injection** | `return_err` | Needs a failing hook |
//! | **Use Case** | Client-side orchestration | The entity itself, end to end |
//!
//! ```rust
//! use keyed_actor::mock::MockClient;
//! use keyed_actor::{ActorEntity, FrameworkError};
//! use async_trait::async_trait;
//!
//! #[derive(Clone, Debug)] struct Job { key: u32 }
//! #[derive(Debug)] enum JobAction {}
//! #[derive(Debug, thiserror::Error)] #[error("Err")] struct JobError;
//!
//! #[async_trait]
//! impl ActorEntity for Job {
//!     type Id = u32; type Create = u32; type Action = JobAction;
//!     type ActionResult = (); type Context = (); type Error = JobError;
//!     fn key_of(params: &u32) -> u32 { *params }
//!     fn from_create_params(key: u32) -> Result<Self, JobError> { Ok(Self { key }) }
//!     async fn handle_action(&mut self, _: JobAction, _: &()) -> Result<(), JobError> { Ok(()) }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mock = MockClient::<Job>::new();
//!     let client = mock.client();
//!
//!     mock.expect_evict(1).return_err(FrameworkError::ActorClosed);
//!
//!     let result = client.evict(1).await;
//!     assert!(matches!(result, Err(FrameworkError::ActorClosed)));
//!     mock.verify();
//! }
//! ```
//!
//! For tests that need to inspect the request payload, use
//! [`create_mock_client`] with [`expect_action`], [`expect_evict`] or
//! [`expect_reconcile`] and answer through the returned responder.

use crate::client::ResourceClient;
use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::{ReconcileReport, ResourceRequest};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

enum Expectation<T: ActorEntity> {
    Insert(Result<bool, FrameworkError>),
    Get(Result<Option<T>, FrameworkError>),
    List(Result<Vec<T>, FrameworkError>),
    Reconcile(Result<ReconcileReport<T::Id>, FrameworkError>),
    Evict(Result<Option<T>, FrameworkError>),
    Retire(Result<Option<T>, FrameworkError>),
    Checkpoint(Result<u64, FrameworkError>),
    Action(Result<T::ActionResult, FrameworkError>),
}

type Queue<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

/// A mock client answering requests in the order expectations were queued.
///
/// A request that does not match the next expectation panics inside the
/// answering task; the caller then sees `ActorDropped`.
pub struct MockClient<T: ActorEntity> {
    client: ResourceClient<T>,
    expectations: Queue<T>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: ActorEntity> Default for MockClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ActorEntity> MockClient<T> {
    /// Creates a new mock client with no expectations.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<ResourceRequest<T>>(100);
        let expectations: Queue<T> = Arc::new(Mutex::new(VecDeque::new()));
        let queue = expectations.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = queue.lock().unwrap().pop_front();
                match (request, expectation) {
                    (ResourceRequest::Insert { respond_to, .. }, Some(Expectation::Insert(r))) => {
                        let _ = respond_to.send(r);
                    }
                    (ResourceRequest::Get { respond_to, .. }, Some(Expectation::Get(r))) => {
                        let _ = respond_to.send(r);
                    }
                    (ResourceRequest::List { respond_to }, Some(Expectation::List(r))) => {
                        let _ = respond_to.send(r);
                    }
                    (
                        ResourceRequest::Reconcile { respond_to, .. },
                        Some(Expectation::Reconcile(r)),
                    ) => {
                        let _ = respond_to.send(r);
                    }
                    (ResourceRequest::Evict { respond_to, .. }, Some(Expectation::Evict(r))) => {
                        let _ = respond_to.send(r);
                    }
                    (ResourceRequest::Retire { respond_to, .. }, Some(Expectation::Retire(r))) => {
                        let _ = respond_to.send(r);
                    }
                    (ResourceRequest::Checkpoint { respond_to }, Some(Expectation::Checkpoint(r))) => {
                        let _ = respond_to.send(r);
                    }
                    (ResourceRequest::Action { respond_to, .. }, Some(Expectation::Action(r))) => {
                        let _ = respond_to.send(r);
                    }
                    _ => {
                        panic!("Unexpected request or expectation mismatch");
                    }
                }
            }
        });

        Self {
            client: ResourceClient::new(sender),
            expectations,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> ResourceClient<T> {
        self.client.clone()
    }

    pub fn expect_insert(&mut self) -> ExpectationBuilder<T, bool> {
        self.builder(Expectation::Insert)
    }

    pub fn expect_get(&mut self, _id: T::Id) -> ExpectationBuilder<T, Option<T>> {
        self.builder(Expectation::Get)
    }

    pub fn expect_list(&mut self) -> ExpectationBuilder<T, Vec<T>> {
        self.builder(Expectation::List)
    }

    pub fn expect_reconcile(&mut self) -> ExpectationBuilder<T, ReconcileReport<T::Id>> {
        self.builder(Expectation::Reconcile)
    }

    pub fn expect_evict(&mut self, _id: T::Id) -> ExpectationBuilder<T, Option<T>> {
        self.builder(Expectation::Evict)
    }

    pub fn expect_retire(&mut self, _id: T::Id) -> ExpectationBuilder<T, Option<T>> {
        self.builder(Expectation::Retire)
    }

    pub fn expect_checkpoint(&mut self) -> ExpectationBuilder<T, u64> {
        self.builder(Expectation::Checkpoint)
    }

    pub fn expect_action(&mut self, _id: T::Id) -> ExpectationBuilder<T, T::ActionResult> {
        self.builder(Expectation::Action)
    }

    fn builder<R>(
        &self,
        wrap: fn(Result<R, FrameworkError>) -> Expectation<T>,
    ) -> ExpectationBuilder<T, R> {
        ExpectationBuilder {
            wrap,
            expectations: self.expectations.clone(),
        }
    }

    /// Panics unless every queued expectation was consumed.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }
}

/// Builder returned by the `expect_*` methods.
pub struct ExpectationBuilder<T: ActorEntity, R> {
    wrap: fn(Result<R, FrameworkError>) -> Expectation<T>,
    expectations: Queue<T>,
}

impl<T: ActorEntity, R> ExpectationBuilder<T, R> {
    /// Queue a successful answer.
    pub fn return_ok(self, value: R) {
        self.expectations
            .lock()
            .unwrap()
            .push_back((self.wrap)(Ok(value)));
    }

    /// Queue a failed answer.
    pub fn return_err(self, error: FrameworkError) {
        self.expectations
            .lock()
            .unwrap()
            .push_back((self.wrap)(Err(error)));
    }
}

// =============================================================================
// RAW REQUEST HELPERS
// =============================================================================

/// Creates a client whose requests arrive on the returned receiver.
pub fn create_mock_client<T: ActorEntity>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Next message, if it is an Action request.
pub async fn expect_action<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(
    T::Id,
    T::Action,
    oneshot::Sender<Result<T::ActionResult, FrameworkError>>,
)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action {
            id,
            action,
            respond_to,
        }) => Some((id, action, respond_to)),
        _ => None,
    }
}

/// Next message, if it is an Evict request.
pub async fn expect_evict<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, oneshot::Sender<Result<Option<T>, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Evict { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Next message, if it is a Reconcile request.
pub async fn expect_reconcile<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(
    Vec<T::Create>,
    oneshot::Sender<Result<ReconcileReport<T::Id>, FrameworkError>>,
)> {
    match receiver.recv().await {
        Some(ResourceRequest::Reconcile {
            snapshot,
            respond_to,
            ..
        }) => Some((snapshot, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Clone, Debug, PartialEq)]
    struct Lease {
        key: String,
    }

    #[derive(Debug)]
    enum LeaseAction {
        Renew,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("Lease error")]
    struct LeaseError;

    #[async_trait]
    impl ActorEntity for Lease {
        type Id = String;
        type Create = String;
        type Action = LeaseAction;
        type ActionResult = u32;
        type Context = ();
        type Error = LeaseError;

        fn key_of(params: &String) -> String {
            params.clone()
        }

        fn from_create_params(key: String) -> Result<Self, Self::Error> {
            Ok(Self { key })
        }

        async fn handle_action(&mut self, _: LeaseAction, _: &()) -> Result<u32, Self::Error> {
            Ok(1)
        }
    }

    #[tokio::test]
    async fn test_raw_reconcile_round_trip() {
        let (client, mut receiver) = create_mock_client::<Lease>(10);

        let task = tokio::spawn(async move { client.reconcile(vec!["a".into()]).await });

        let (snapshot, responder) = expect_reconcile(&mut receiver)
            .await
            .expect("Expected Reconcile request");
        assert_eq!(snapshot, vec!["a".to_string()]);
        responder
            .send(Ok(ReconcileReport {
                added: vec!["a".into()],
                ..ReconcileReport::default()
            }))
            .unwrap();

        let report = task.await.unwrap().unwrap();
        assert_eq!(report.added, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_client_with_expectations() {
        let mut mock = MockClient::<Lease>::new();
        mock.expect_insert().return_ok(true);
        mock.expect_action("a".into()).return_ok(7);
        mock.expect_get("a".into()).return_ok(Some(Lease { key: "a".into() }));

        let client = mock.client();
        assert!(client.insert("a".into()).await.unwrap());
        assert_eq!(client.perform_action("a".into(), LeaseAction::Renew).await.unwrap(), 7);
        assert_eq!(client.get("a".into()).await.unwrap().unwrap().key, "a");

        mock.verify();
    }
}
