//! Error types for `agora-client`.

use std::sync::Arc;

use agora_core::{EntityKind, Operation};
use thiserror::Error;

use crate::{realtime::RealtimeError, transport::TransportError};

/// A remote operation on an entity failed.
///
/// Every {entity × operation} pair gets its own identity (see
/// [`RemoteError::name`]); the transport failure that caused it is kept as
/// the error source.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RemoteError {
  pub entity:    EntityKind,
  pub operation: Operation,
  pub message:   String,
  #[source]
  pub cause:     TransportError,
}

impl RemoteError {
  pub fn new(entity: EntityKind, operation: Operation, cause: TransportError) -> Self {
    Self {
      entity,
      operation,
      message: format!("Could not {operation} {entity}."),
      cause,
    }
  }

  /// Replace the default human-readable message.
  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = message.into();
    self
  }

  /// The error's type name, e.g. `PersonFetchRemoteError`.
  pub fn name(&self) -> String {
    format!(
      "{}{}RemoteError",
      self.entity.type_name(),
      self.operation.type_name()
    )
  }

  /// Whether this is the given {entity × operation} error.
  pub fn is(&self, entity: EntityKind, operation: Operation) -> bool {
    self.entity == entity && self.operation == operation
  }
}

#[derive(Debug, Error)]
pub enum Error {
  /// Shared with the error listeners it was reported to.
  #[error(transparent)]
  Remote(#[from] Arc<RemoteError>),

  /// Local validation (e.g. a missing id) failed before any request was sent.
  #[error(transparent)]
  Core(#[from] agora_core::Error),

  #[error("realtime error: {0}")]
  Realtime(#[from] RealtimeError),

  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("transport setup error: {0}")]
  Transport(#[from] TransportError),
}

impl Error {
  pub fn as_remote(&self) -> Option<&RemoteError> {
    match self {
      Self::Remote(e) => Some(e.as_ref()),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
