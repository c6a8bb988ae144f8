//! Error types for `agora-core`.

use thiserror::Error;

use crate::entity::{EntityKind, Operation};

#[derive(Debug, Error)]
pub enum Error {
  /// A local precondition failed before any network call was attempted.
  #[error("cannot {operation} {entity}: missing {}", missing.join(", "))]
  Precondition {
    entity:    EntityKind,
    operation: Operation,
    missing:   Vec<&'static str>,
  },

  #[error("payload error: {0}")]
  Payload(#[from] serde_json::Error),
}

impl Error {
  /// Shorthand for a precondition failure on a single missing field.
  pub fn missing(
    entity: EntityKind,
    operation: Operation,
    field: &'static str,
  ) -> Self {
    Self::Precondition { entity, operation, missing: vec![field] }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
