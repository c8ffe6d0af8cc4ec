//! # Order Alerts
//!
//! > **Pending-order alerting and acceptance-deadline coordination for a
//! > merchant dashboard.**
//!
//! A merchant has a bounded window to accept each new order; when the window
//! runs out the server auto-accepts it. This crate keeps a client-side
//! **working set** of alerts for the orders still awaiting acceptance, counts
//! each one down against its deadline, escalates through audio and system
//! notifications, and performs the merchant's accept exactly once. It also
//! renders an order's status history as a timeline for detail views.
//!
//! ## Design
//!
//! ### One writer for the working set
//! The working set is a [`keyed_actor::ResourceActor`] keyed by order id.
//! Poll reconciliation, optimistic eviction after an accept, dismissals, and
//! countdown steps are all messages to that one task, so each runs to
//! completion before the next is read. No locks, no interleaving between
//! reading the set and writing it.
//!
//! ### Advisory client deadline
//! The local countdown reaching zero only hides the alert with an
//! "auto-accepted" notice. The client never calls accept on the merchant's
//! behalf; the server's auto-accept is authoritative.
//!
//! ### Capabilities are injected
//! Audio and notifications are [`capability::AudioCue`] and
//! [`capability::Notifier`] trait objects with no-op fallbacks, chosen at
//! construction. Core logic never probes the host.
//!
//! ### Stale beats empty
//! A failed poll changes nothing in the working set. [`poller::PollStatus`]
//! tells the surface how old its data is instead.
//!
//! ## Module Tour
//!
//! - [`clock`]: remaining-time arithmetic and the injectable wall clock
//! - [`alert_actor`]: the [`Alert`](alert_actor::Alert) entity, its countdown,
//!   and its per-alert ticker task
//! - [`clients`]: [`WorkingSetClient`](clients::WorkingSetClient), the typed door
//!   into the working set
//! - [`poller`]: fetch-and-reconcile on an interval
//! - [`accept`]: the in-flight-guarded, idempotent accept
//! - [`timeline`]: the status timeline engine and its watcher
//! - [`backend`]: collaborator contracts, an in-memory server, and a scripted mock
//! - [`lifecycle`]: [`AlertDesk`](lifecycle::AlertDesk) wiring and shutdown,
//!   tracing setup
//! - [`config`], [`error`], [`events`], [`model`], [`capability`]
//!
//! ## Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run -- desk.toml
//! ```

pub mod accept;
pub mod alert_actor;
pub mod backend;
pub mod capability;
pub mod clients;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod model;
pub mod poller;
pub mod timeline;
