//! # Keyed Actor Server
//!
//! `ResourceActor` owns a store of entities keyed by caller-provided ids and
//! processes requests one at a time. It is the single writer of that store:
//! clients and background tasks can only ask it to change.

use crate::client::ResourceClient;
use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::{ReconcileReport, ResourceRequest};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// ## ResourceActor
///
/// The server half of the actor. It owns the store and the receiving end of
/// the mailbox.
///
/// **Concurrency model**: each message is handled to completion before the
/// next one is read, including any `on_create`/`on_evict` hook it triggers.
/// A `Reconcile` therefore reads and rewrites the key set as one step, and
/// no `Evict` or `Action` can observe it half-applied. No `Mutex` is needed
/// around the store.
///
/// # Usage Pattern
///
/// 1. **Create**: `ResourceActor::new()` returns the actor and a client.
/// 2. **Wire**: build the context, possibly holding `client.downgrade()`.
/// 3. **Run**: spawn `actor.run(context)`.
///
/// ```rust
/// use keyed_actor::{ActorEntity, ResourceActor};
/// use async_trait::async_trait;
///
/// #[derive(Clone, Debug)] struct Job { key: String }
/// #[derive(Debug)] enum JobAction {}
/// #[derive(Debug)] struct JobError;
/// impl std::fmt::Display for JobError {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "job error") }
/// }
/// impl std::error::Error for JobError {}
///
/// #[async_trait]
/// impl ActorEntity for Job {
///     type Id = String;
///     type Create = String;
///     type Action = JobAction;
///     type ActionResult = ();
///     type Context = ();
///     type Error = JobError;
///
///     fn key_of(params: &String) -> String { params.clone() }
///     fn from_create_params(key: String) -> Result<Self, JobError> { Ok(Self { key }) }
///     async fn handle_action(&mut self, _: JobAction, _: &()) -> Result<(), JobError> { Ok(()) }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let (actor, client) = ResourceActor::<Job>::new(10);
///     tokio::spawn(actor.run(()));
///
///     let report = client.reconcile(vec!["a".into(), "b".into()]).await.unwrap();
///     assert_eq!(report.added.len(), 2);
///     let report = client.reconcile(vec!["b".into()]).await.unwrap();
///     assert_eq!(report.evicted, vec!["a".to_string()]);
/// }
/// ```
pub struct ResourceActor<T: ActorEntity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
    /// Bumped on every `Retire`.
    sequence: u64,
    /// Retired keys and the sequence number they were retired at.
    retired: HashMap<T::Id, u64>,
}

impl<T: ActorEntity> ResourceActor<T> {
    /// Creates a new `ResourceActor` and its associated `ResourceClient`.
    ///
    /// `buffer_size` is the mailbox capacity; senders wait when it is full.
    pub fn new(buffer_size: usize) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
            sequence: 0,
            retired: HashMap::new(),
        };
        (actor, ResourceClient::new(sender))
    }

    /// Runs the event loop until every strong client is dropped, then
    /// evicts whatever is left so entity hooks can release their resources.
    pub async fn run(mut self, context: T::Context) {
        let entity_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(entity_type, "Actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Insert { params, respond_to } => {
                    debug!(entity_type, ?params, "Insert");
                    let id = T::key_of(&params);
                    if self.store.contains_key(&id) {
                        debug!(entity_type, %id, "Already present");
                        let _ = respond_to.send(Ok(false));
                        continue;
                    }
                    let result = self.admit(id, params, &context).await;
                    let _ = respond_to.send(result.map(|_| true));
                }
                ResourceRequest::Get { id, respond_to } => {
                    let item = self.store.get(&id).cloned();
                    debug!(entity_type, %id, found = item.is_some(), "Get");
                    let _ = respond_to.send(Ok(item));
                }
                ResourceRequest::List { respond_to } => {
                    let items = self.store.values().cloned().collect();
                    let _ = respond_to.send(Ok(items));
                }
                ResourceRequest::Reconcile {
                    snapshot,
                    since,
                    respond_to,
                } => {
                    let since = since.unwrap_or(self.sequence);
                    let report = self.reconcile(snapshot, since, &context).await;
                    if !report.is_unchanged() {
                        info!(
                            entity_type,
                            added = report.added.len(),
                            kept = report.kept.len(),
                            evicted = report.evicted.len(),
                            rejected = report.rejected.len(),
                            withheld = report.withheld.len(),
                            size = self.store.len(),
                            "Reconciled"
                        );
                    }
                    let _ = respond_to.send(Ok(report));
                }
                ResourceRequest::Evict { id, respond_to } => {
                    let removed = self.remove(&id, &context).await;
                    let _ = respond_to.send(Ok(removed));
                }
                ResourceRequest::Retire { id, respond_to } => {
                    self.sequence += 1;
                    self.retired.insert(id.clone(), self.sequence);
                    debug!(entity_type, %id, sequence = self.sequence, "Retire");
                    let removed = self.remove(&id, &context).await;
                    let _ = respond_to.send(Ok(removed));
                }
                ResourceRequest::Checkpoint { respond_to } => {
                    let _ = respond_to.send(Ok(self.sequence));
                }
                ResourceRequest::Action {
                    id,
                    action,
                    respond_to,
                } => {
                    debug!(entity_type, %id, ?action, "Action");
                    if let Some(item) = self.store.get_mut(&id) {
                        let result = item
                            .handle_action(action, &context)
                            .await
                            .map_err(|e| FrameworkError::EntityError(Box::new(e)));
                        if let Err(e) = &result {
                            warn!(entity_type, %id, error = %e, "Action failed");
                        }
                        let _ = respond_to.send(result);
                    } else {
                        debug!(entity_type, %id, "Not found");
                        let _ = respond_to.send(Err(FrameworkError::NotFound(id.to_string())));
                    }
                }
            }
        }

        let remaining = self.store.len();
        for (_, item) in self.store.drain() {
            item.on_evict(&context).await;
        }
        info!(entity_type, evicted = remaining, "Shutdown");
    }

    async fn admit(
        &mut self,
        id: T::Id,
        params: T::Create,
        context: &T::Context,
    ) -> Result<(), FrameworkError> {
        let mut item = T::from_create_params(params).map_err(|e| {
            warn!(%id, error = %e, "Create failed");
            FrameworkError::EntityError(Box::new(e))
        })?;
        item.on_create(context).await.map_err(|e| {
            warn!(%id, error = %e, "on_create failed");
            FrameworkError::EntityError(Box::new(e))
        })?;
        self.store.insert(id.clone(), item);
        info!(%id, size = self.store.len(), "Created");
        Ok(())
    }

    async fn remove(&mut self, id: &T::Id, context: &T::Context) -> Option<T> {
        let removed = self.store.remove(id);
        match &removed {
            Some(item) => {
                item.on_evict(context).await;
                info!(%id, size = self.store.len(), "Evicted");
            }
            None => debug!(%id, "Evict of absent key"),
        }
        removed
    }

    /// `since` is the sequence number the snapshot was taken at. Keys retired
    /// later are withheld. Afterwards only retirements that are newer than
    /// the snapshot and still listed by it are remembered.
    async fn reconcile(
        &mut self,
        snapshot: Vec<T::Create>,
        since: u64,
        context: &T::Context,
    ) -> ReconcileReport<T::Id> {
        let mut report = ReconcileReport::default();
        let mut seen = HashSet::with_capacity(snapshot.len());

        for params in snapshot {
            let id = T::key_of(&params);
            if !seen.insert(id.clone()) {
                continue;
            }
            if self.store.contains_key(&id) {
                report.kept.push(id);
                continue;
            }
            if self.retired.get(&id).is_some_and(|&at| at > since) {
                debug!(%id, "Retired after snapshot, withheld");
                report.withheld.push(id);
                continue;
            }
            match self.admit(id.clone(), params, context).await {
                Ok(()) => report.added.push(id),
                Err(e) => report.rejected.push((id, e.to_string())),
            }
        }

        let stale: Vec<T::Id> = self
            .store
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(item) = self.store.remove(&id) {
                item.on_evict(context).await;
                report.evicted.push(id);
            }
        }
        self.retired.retain(|id, at| *at > since && seen.contains(id));
        report
    }
}
