//! Async client for the Agora REST and realtime APIs.
//!
//! [`Universe`] is the entry point: it owns the HTTP [`Transport`], the
//! shared [`RealtimeClient`] connection, and hands out remote-operation
//! helpers for every entity type defined in [`agora_core`].
//!
//! ```rust,ignore
//! let config = ClientConfig::load(Some(Path::new("agora.toml")))?;
//! let mut universe = Universe::connect(&config, Arc::new(realtime))?;
//! universe.init().await?;
//!
//! let mut person = universe.people().get("p1").await?;
//! let addresses = universe.people().addresses(&person)?.fetch(&ListQuery::default()).await?;
//! ```

pub mod config;
pub mod error;
pub mod feeds;
pub mod messages;
pub mod people;
pub mod realtime;
pub mod remote;
pub mod transport;
pub mod universe;

pub use agora_core::{entities, entity::Entity};
pub use config::ClientConfig;
pub use error::{Error, RemoteError, Result};
pub use realtime::{MemoryRealtime, RealtimeClient, RealtimeError, Watcher};
pub use remote::{Context, ListQuery, Relation, Remote};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport, TransportError};
pub use universe::Universe;
