//! # ActorEntity Trait
//!
//! The contract every entity held by a [`ResourceActor`](crate::ResourceActor)
//! implements: how its key is derived from the create payload, how it is
//! built, what happens when it enters and leaves the store, and which
//! entity-specific actions it understands.
//!
//! # Provided Methods (Hooks)
//! - [`ActorEntity::on_create`]
//! - [`ActorEntity::on_evict`]
//!
//! Both default to doing nothing.

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any entity must implement to be managed by a `ResourceActor`.
///
/// # Async & Context
/// Hooks are async so they can call other actors or host services. The
/// `Context` is handed to `run()` rather than `new()`, which lets an entity's
/// context hold a (weak) client back to its own actor.
#[async_trait]
pub trait ActorEntity: Clone + Send + Sync + 'static {
    /// The key of this entity inside the store. Supplied by the caller.
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;

    /// The data required to create a new instance.
    type Create: Send + Sync + Debug;

    /// Enum of entity-specific operations.
    type Action: Send + Sync + Debug;

    /// The result type returned by custom actions.
    type ActionResult: Send + Sync + Debug;

    /// The runtime context (dependencies) injected into the actor.
    /// Use `()` if no dependencies are needed.
    type Context: Send + Sync;

    /// The error type for this entity.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The key a create payload will be stored under.
    fn key_of(params: &Self::Create) -> Self::Id;

    /// Construct the entity from its payload.
    /// This is called synchronously before `on_create`.
    fn from_create_params(params: Self::Create) -> Result<Self, Self::Error>;

    // --- Lifecycle Hooks (Async) ---

    /// Called once, right before the entity is inserted into the store.
    /// An error keeps the entity out of the store.
    async fn on_create(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called once, after the entity has been removed from the store,
    /// including removal at actor shutdown. Eviction cannot be refused.
    async fn on_evict(&self, _ctx: &Self::Context) {}

    // --- Action Handler (Async) ---

    /// Handle a custom entity-specific action.
    async fn handle_action(
        &mut self,
        action: Self::Action,
        ctx: &Self::Context,
    ) -> Result<Self::ActionResult, Self::Error>;
}
