//! # Generic Client
//!
//! Strong and weak handles for talking to a [`ResourceActor`](crate::ResourceActor).

use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::{ReconcileReport, ResourceRequest};
use tokio::sync::{mpsc, oneshot};

/// ## ResourceClient
///
/// A type-safe, async handle to a `ResourceActor<T>`. It forwards requests
/// over a Tokio mpsc channel and awaits the answer on a oneshot channel.
/// Cloning is cheap (only the sender is cloned). The actor shuts down once
/// every strong client is dropped.
pub struct ResourceClient<T: ActorEntity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
}

impl<T: ActorEntity> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: ActorEntity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender }
    }

    /// A handle that does not keep the actor alive.
    pub fn downgrade(&self) -> WeakResourceClient<T> {
        WeakResourceClient {
            sender: self.sender.downgrade(),
        }
    }

    /// True once the actor's receiver has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<R, FrameworkError>>) -> ResourceRequest<T>,
    ) -> Result<R, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    /// Create the entity unless its key is already present.
    /// Returns `true` if it was created.
    pub async fn insert(&self, params: T::Create) -> Result<bool, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Insert { params, respond_to })
            .await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Get { id, respond_to })
            .await
    }

    pub async fn list(&self) -> Result<Vec<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::List { respond_to })
            .await
    }

    /// Make the store's key set equal to the snapshot's key set.
    ///
    /// The snapshot is taken as current: keys retired earlier are created
    /// again if it lists them.
    pub async fn reconcile(
        &self,
        snapshot: Vec<T::Create>,
    ) -> Result<ReconcileReport<T::Id>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Reconcile {
            snapshot,
            since: None,
            respond_to,
        })
        .await
    }

    /// Like [`reconcile`](Self::reconcile) for a snapshot fetched after
    /// `since` was read from [`checkpoint`](Self::checkpoint). Keys retired
    /// after that checkpoint are withheld instead of created.
    pub async fn reconcile_since(
        &self,
        snapshot: Vec<T::Create>,
        since: u64,
    ) -> Result<ReconcileReport<T::Id>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Reconcile {
            snapshot,
            since: Some(since),
            respond_to,
        })
        .await
    }

    /// The current retirement sequence number.
    pub async fn checkpoint(&self) -> Result<u64, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Checkpoint { respond_to })
            .await
    }

    /// Remove the entity. Evicting an absent key yields `Ok(None)`.
    pub async fn evict(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Evict { id, respond_to })
            .await
    }

    /// Evict and remember the key, so a snapshot older than this call cannot
    /// bring it back. The key is remembered even if it was absent.
    pub async fn retire(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Retire { id, respond_to })
            .await
    }

    pub async fn perform_action(
        &self,
        id: T::Id,
        action: T::Action,
    ) -> Result<T::ActionResult, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Action {
            id,
            action,
            respond_to,
        })
        .await
    }
}

/// A non-owning client for background tasks.
///
/// Upgrading fails once the actor has shut down, which gives tasks a cheap
/// liveness check before they act on a completion.
pub struct WeakResourceClient<T: ActorEntity> {
    sender: mpsc::WeakSender<ResourceRequest<T>>,
}

impl<T: ActorEntity> Clone for WeakResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: ActorEntity> WeakResourceClient<T> {
    pub fn upgrade(&self) -> Option<ResourceClient<T>> {
        self.sender.upgrade().map(ResourceClient::new)
    }
}
