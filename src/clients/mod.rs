//! Domain wrappers around [`ResourceClient`](keyed_actor::ResourceClient).

pub mod working_set_client;

pub use working_set_client::*;
