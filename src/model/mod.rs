//! Plain data records exchanged with the backend.

pub mod order;
pub mod timeline;

pub use order::*;
pub use timeline::*;
