//! # Keyed Actor
//!
//! A single-writer actor that owns a map from caller-supplied keys to
//! entities. It follows the Actor Model on Tokio: one task owns the state, and
//! everything else talks to it through a cloneable client over an mpsc
//! mailbox, receiving answers on oneshot channels.
//!
//! ## Why a keyed store?
//!
//! Working sets driven by an external source of truth (a server listing, a
//! poll result) are naturally keyed by the source's ids. Instead of generating
//! ids, the actor derives each entity's key from its create payload and offers
//! a `reconcile` operation that makes the store's key set equal to a snapshot:
//! new keys are created, shared keys are left untouched, missing keys are
//! evicted. Because the actor handles one message at a time, reconcile is
//! atomic with respect to concurrent evictions and actions.
//!
//! ## Architecture Overview
//!
//! 1. **Entity Layer** ([`ActorEntity`]) - domain state and lifecycle hooks
//! 2. **Runtime Layer** ([`ResourceActor`]) - mailbox loop, store ownership
//! 3. **Interface Layer** ([`ResourceClient`], [`WeakResourceClient`]) - typed requests
//!
//! ## Context Injection
//!
//! The entity `Context` is passed to [`ResourceActor::run`], not to
//! [`ResourceActor::new`]. A context can therefore carry a
//! [`WeakResourceClient`] pointing back at the same actor, so an entity's
//! background task can ask for its own eviction without keeping the actor
//! alive after every real client is gone.
//!
//! ## Shutdown
//!
//! Dropping every strong client closes the mailbox. The loop then evicts all
//! remaining entities through `on_evict`, so timers and tasks owned by
//! entities stop with the actor.
//!
//! ## Testing
//!
//! See [`mock`] for a scripted client that needs no running actor.

pub mod actor;
pub mod client;
pub mod client_trait;
pub mod entity;
pub mod error;
pub mod message;
pub mod mock;

pub use actor::ResourceActor;
pub use client::{ResourceClient, WeakResourceClient};
pub use client_trait::ActorClient;
pub use entity::ActorEntity;
pub use error::FrameworkError;
pub use message::{ReconcileReport, ResourceRequest, Response};
