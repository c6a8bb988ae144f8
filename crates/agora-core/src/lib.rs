//! Entity models, topic registry and realtime classification for the Agora
//! commerce and messaging platform.
//!
//! This crate is deliberately free of HTTP and realtime transports. It
//! defines the wire ⇄ model contract every resource follows, the catalog of
//! pub/sub topics, and the pure functions that turn an inbound realtime
//! message into a typed domain event. `agora-client` layers I/O on top.

pub mod entities;
pub mod entity;
pub mod error;
pub mod realtime;
pub mod topics;

pub use entity::{ActiveFlag, Entity, EntityKind, Operation, SerializeOptions};
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
