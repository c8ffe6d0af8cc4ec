//! # Generic Messages
//!
//! The request envelope exchanged between a [`ResourceClient`](crate::ResourceClient)
//! and its [`ResourceActor`](crate::ResourceActor).

use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by actors.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Outcome of a [`ResourceRequest::Reconcile`].
///
/// Every key of the snapshot and of the previous store lands in exactly one
/// of `added`, `kept`, `withheld`, `rejected` (snapshot side) or `evicted`
/// (store side).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport<Id> {
    pub added: Vec<Id>,
    pub kept: Vec<Id>,
    pub evicted: Vec<Id>,
    pub rejected: Vec<(Id, String)>,
    /// Keys retired after the snapshot was taken; not created again.
    pub withheld: Vec<Id>,
}

impl<Id> Default for ReconcileReport<Id> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            kept: Vec::new(),
            evicted: Vec::new(),
            rejected: Vec::new(),
            withheld: Vec::new(),
        }
    }
}

impl<Id> ReconcileReport<Id> {
    /// True when the reconcile neither added nor evicted anything.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.evicted.is_empty() && self.rejected.is_empty()
    }
}

/// Internal message type sent to the actor.
///
/// The store is keyed by identifiers the caller already owns (the key is
/// derived from the create payload), so there is no id generation here.
/// `Reconcile` replaces the whole key set in one step, which is what keeps it
/// atomic with respect to concurrent `Evict` and `Action` requests.
///
/// `Retire` is an `Evict` that also remembers the key with the next sequence
/// number. A `Reconcile` carrying `since` (a `Checkpoint` taken before its
/// snapshot was fetched) will not re-create a key retired after that point.
#[derive(Debug)]
pub enum ResourceRequest<T: ActorEntity> {
    Insert {
        params: T::Create,
        respond_to: Response<bool>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    List {
        respond_to: Response<Vec<T>>,
    },
    Reconcile {
        snapshot: Vec<T::Create>,
        since: Option<u64>,
        respond_to: Response<ReconcileReport<T::Id>>,
    },
    Evict {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    Retire {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    Checkpoint {
        respond_to: Response<u64>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
}
