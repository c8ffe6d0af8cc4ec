//! The alert presenter: one [`Alert`] per pending order, held by a
//! single-writer keyed actor that is the working set.

pub mod countdown;
pub mod entity;
pub mod error;

pub use countdown::*;
pub use entity::*;
pub use error::*;

use crate::clients::WorkingSetClient;
use crate::events::EventBus;
use keyed_actor::ResourceActor;

/// Creates the working-set actor and its client.
///
/// The actor still has to be started with an [`AlertContext`], which usually
/// carries `client.downgrade()` so alerts can request their own eviction.
pub fn new(mailbox_capacity: usize, events: EventBus) -> (ResourceActor<Alert>, WorkingSetClient) {
    let (actor, generic_client) = ResourceActor::new(mailbox_capacity);
    (actor, WorkingSetClient::new(generic_client, events))
}
