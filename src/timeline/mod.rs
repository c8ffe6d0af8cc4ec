//! # Status Timeline Engine
//!
//! Renders an order's lifecycle from its status history: canonical
//! [`Stage`]s, current position, progress, an estimated completion time,
//! and an audit of irregular transitions. Independent of the alert desk; a
//! [`TimelineWatcher`] keeps one order's timeline current.

pub mod engine;
pub mod stage;
pub mod watcher;

pub use engine::*;
pub use stage::*;
pub use watcher::*;
