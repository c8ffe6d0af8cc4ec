//! # Desk Lifecycle & Orchestration
//!
//! Starting, wiring, and stopping the pieces of an alert desk.
//!
//! ## Wiring
//!
//! The working-set actor is created first, with no dependencies. Its alerts
//! need to step their own countdowns and request their own eviction, so the
//! actor's context carries a **weak** handle to the actor itself, injected at
//! `run()`:
//!
//! ```rust,ignore
//! let (actor, working_set) = alert_actor::new(capacity, events.clone());
//! let context = AlertContext {
//!     working_set: working_set.downgrade(),
//!     shutdown: shutdown.clone(),
//!     ..
//! };
//! tokio::spawn(actor.run(context));
//! ```
//!
//! A strong handle in the context would keep the mailbox open forever; the
//! weak one lets the actor stop once the desk and the poller let go.
//!
//! ## Shutdown
//!
//! 1. **Cancel the root token**: every alert ticker, the poller, and any
//!    timeline watcher stop at their next await point
//! 2. **Drop the desk's handles**: with the poller's handle gone too, the
//!    mailbox closes
//! 3. **Actor evicts what is left**: `on_evict` runs for every remaining alert
//! 4. **Await the tasks**
//!
//! An accept still in flight at that point completes against the backend,
//! finds the working set gone, and returns its outcome without touching it.

pub mod desk;
pub mod tracing;

pub use desk::*;
pub use tracing::*;
