//! The serialization contract shared by every remote resource.
//!
//! An entity is split in two halves: a `Payload`, the snake_case wire record
//! exactly as the API sends it, and the entity itself, the typed in-memory
//! model. [`Entity::deserialize`] and [`Entity::serialize`] map between them
//! and never perform I/O; remote operations live in `agora-client`.

use std::fmt;

use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result};

// ─── Kinds and operations ────────────────────────────────────────────────────

/// Every resource type the SDK models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
  Person,
  Email,
  Phonenumber,
  Address,
  ChannelUser,
  Cart,
  Order,
  Deal,
  Feed,
  Event,
  Message,
  MessageTemplate,
}

impl EntityKind {
  /// PascalCase name, as used in error type names (`PersonFetchRemoteError`).
  pub fn type_name(self) -> &'static str {
    match self {
      Self::Person => "Person",
      Self::Email => "Email",
      Self::Phonenumber => "Phonenumber",
      Self::Address => "Address",
      Self::ChannelUser => "ChannelUser",
      Self::Cart => "Cart",
      Self::Order => "Order",
      Self::Deal => "Deal",
      Self::Feed => "Feed",
      Self::Event => "Event",
      Self::Message => "Message",
      Self::MessageTemplate => "MessageTemplate",
    }
  }

  fn label(self) -> &'static str {
    match self {
      Self::Person => "person",
      Self::Email => "email",
      Self::Phonenumber => "phonenumber",
      Self::Address => "address",
      Self::ChannelUser => "channel user",
      Self::Cart => "cart",
      Self::Order => "order",
      Self::Deal => "deal",
      Self::Feed => "feed",
      Self::Event => "event",
      Self::Message => "message",
      Self::MessageTemplate => "message template",
    }
  }
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// A remote (or precondition-checked) operation on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
  Init,
  Fetch,
  FetchAll,
  FetchCount,
  Create,
  Patch,
  Delete,
  Merge,
  PreviewNotification,
  FetchEvents,
  CreateEvent,
  Reply,
}

impl Operation {
  /// PascalCase name, as used in error type names.
  pub fn type_name(self) -> &'static str {
    match self {
      Self::Init => "Initialization",
      Self::Fetch => "Fetch",
      Self::FetchAll => "FetchAll",
      Self::FetchCount => "FetchCount",
      Self::Create => "Create",
      Self::Patch => "Patch",
      Self::Delete => "Delete",
      Self::Merge => "Merge",
      Self::PreviewNotification => "PreviewNotification",
      Self::FetchEvents => "FetchEvents",
      Self::CreateEvent => "CreateEvent",
      Self::Reply => "Reply",
    }
  }

  fn verb(self) -> &'static str {
    match self {
      Self::Init => "initialize",
      Self::Fetch => "fetch",
      Self::FetchAll => "fetch all",
      Self::FetchCount => "count",
      Self::Create => "create",
      Self::Patch => "patch",
      Self::Delete => "delete",
      Self::Merge => "merge",
      Self::PreviewNotification => "preview notification for",
      Self::FetchEvents => "fetch events of",
      Self::CreateEvent => "create event on",
      Self::Reply => "reply to",
    }
  }
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.verb())
  }
}

// ─── Serialize options ───────────────────────────────────────────────────────

/// How the `active` flag is projected back onto the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveFlag {
  /// Always emit `active: true`, whatever the stored value. This is what the
  /// platform's other SDKs send, so inactive records cannot be written back.
  #[default]
  Legacy,
  /// Emit the stored value, defaulting to `true` when it was never set.
  Preserve,
}

/// Options threaded through [`Entity::serialize_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializeOptions {
  pub active: ActiveFlag,
}

impl SerializeOptions {
  pub fn preserving_active() -> Self {
    Self { active: ActiveFlag::Preserve }
  }

  /// The wire value for an `active` flag whose stored value is `stored`.
  pub fn active(&self, stored: Option<bool>) -> Option<bool> {
    match self.active {
      ActiveFlag::Legacy => Some(true),
      ActiveFlag::Preserve => Some(stored.unwrap_or(true)),
    }
  }

  /// The wire value for a `deleted` flag. Always written, whatever the
  /// options, so an absent flag reads back as `false`.
  pub fn deleted(stored: bool) -> Option<bool> { Some(stored) }
}

// ─── Entity ──────────────────────────────────────────────────────────────────

/// Uniform lifecycle for resources backed by the remote API.
///
/// An entity built with [`Entity::create`] (or fetched directly) is
/// *initialized* and carries complete data. One built with
/// [`Entity::stand_in`], typically a nested reference inside a parent's
/// payload, carries partial data until it is fetched.
pub trait Entity: Sized + Default {
  /// The wire record. Every field is optional and absent fields are skipped
  /// on output.
  type Payload: Serialize + DeserializeOwned + Clone + Default + fmt::Debug;

  const KIND: EntityKind;

  /// Collection path relative to the API base, e.g. `api/v0/people`.
  const ENDPOINT: &'static str;

  /// Payload keys managed through dedicated sub-resource endpoints. They are
  /// stripped from PATCH bodies.
  const RELATIONS: &'static [&'static str] = &[];

  fn id(&self) -> Option<&str>;

  fn is_initialized(&self) -> bool;

  fn set_initialized(&mut self, initialized: bool);

  /// Replace this entity's state from `payload`. Scalar fields absent from
  /// the payload become unset; nested collections absent from the payload
  /// keep their previous value.
  fn deserialize(&mut self, payload: Self::Payload);

  fn serialize_with(&self, options: &SerializeOptions) -> Self::Payload;

  fn serialize(&self) -> Self::Payload {
    self.serialize_with(&SerializeOptions::default())
  }

  /// Build a complete, initialized entity.
  fn create(payload: Self::Payload) -> Self {
    let mut entity = Self::default();
    entity.set_initialized(true);
    entity.deserialize(payload);
    entity
  }

  /// Build a partial stand-in from a parent's embedded payload.
  fn stand_in(payload: Self::Payload) -> Self {
    let mut entity = Self::default();
    entity.deserialize(payload);
    entity
  }

  /// Decode a raw JSON record and build the entity from it.
  fn from_value(value: serde_json::Value, initialized: bool) -> Result<Self> {
    let payload = serde_json::from_value(value)?;
    Ok(if initialized {
      Self::create(payload)
    } else {
      Self::stand_in(payload)
    })
  }

  fn to_value(&self, options: &SerializeOptions) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(self.serialize_with(options))?)
  }

  fn require_id(&self, operation: Operation) -> Result<&str> {
    self
      .id()
      .ok_or_else(|| Error::missing(Self::KIND, operation, "id"))
  }

  /// Path of the collection this entity lives in. Sub-resources override
  /// this to scope the path by their parent.
  fn collection_path(&self, _operation: Operation) -> Result<String> {
    Ok(Self::ENDPOINT.to_owned())
  }

  /// Path of this entity's own resource; requires an id.
  fn resource_path(&self, operation: Operation) -> Result<String> {
    let id = self.require_id(operation)?;
    Ok(format!("{}/{id}", self.collection_path(operation)?))
  }
}

// ─── Timestamps ──────────────────────────────────────────────────────────────

/// Serde adapter for optional ISO-8601 timestamps.
///
/// Output always carries millisecond precision and a `Z` suffix, the shape
/// the API itself emits.
pub mod iso8601 {
  use chrono::{DateTime, SecondsFormat, Utc};
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    match value {
      Some(ts) => serializer
        .serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
      None => serializer.serialize_none(),
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D,
  ) -> Result<Option<DateTime<Utc>>, D::Error>
  where
    D: Deserializer<'de>,
  {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw
      .map(|s| {
        DateTime::parse_from_rfc3339(&s)
          .map(|ts| ts.with_timezone(&Utc))
          .map_err(serde::de::Error::custom)
      })
      .transpose()
  }
}

/// Build a list of nested entities, inheriting the parent's lifecycle state.
pub fn nested<E: Entity>(payloads: Vec<E::Payload>, initialized: bool) -> Vec<E> {
  payloads
    .into_iter()
    .map(|p| if initialized { E::create(p) } else { E::stand_in(p) })
    .collect()
}

/// Project nested entities back onto the wire.
pub fn nested_payloads<E: Entity>(
  entities: &[E],
  options: &SerializeOptions,
) -> Vec<E::Payload> {
  entities.iter().map(|e| e.serialize_with(options)).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn legacy_active_flag_is_always_true() {
    let opts = SerializeOptions::default();
    assert_eq!(opts.active(Some(false)), Some(true));
    assert_eq!(opts.active(None), Some(true));
  }

  #[test]
  fn preserved_active_flag_keeps_false() {
    let opts = SerializeOptions::preserving_active();
    assert_eq!(opts.active(Some(false)), Some(false));
    assert_eq!(opts.active(None), Some(true));
  }

  #[test]
  fn deleted_flag_is_always_written() {
    assert_eq!(SerializeOptions::deleted(false), Some(false));
    assert_eq!(SerializeOptions::deleted(true), Some(true));
  }

  #[test]
  fn operation_and_kind_render_error_names() {
    assert_eq!(EntityKind::ChannelUser.type_name(), "ChannelUser");
    assert_eq!(Operation::Init.type_name(), "Initialization");
    assert_eq!(EntityKind::MessageTemplate.to_string(), "message template");
  }
}
