//! Feeds and the events that make up their timeline.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::message::Message;
use crate::{
  Error, Result,
  entity::{Entity, EntityKind, Operation, SerializeOptions, iso8601},
};

// ─── Feed ────────────────────────────────────────────────────────────────────

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedPayload {
  pub id:                 Option<String>,
  pub name:               Option<String>,
  pub participants:       Option<Vec<String>>,
  pub agents:             Option<Vec<String>>,
  #[serde(with = "iso8601")]
  pub latest_activity_at: Option<DateTime<Utc>>,
  #[serde(with = "iso8601")]
  pub created_at:         Option<DateTime<Utc>>,
  #[serde(with = "iso8601")]
  pub updated_at:         Option<DateTime<Utc>>,
  pub deleted:            Option<bool>,
  pub active:             Option<bool>,
}

/// A conversation thread with one or more people.
///
/// `events` is client-side state: it accumulates every event fetched so far
/// and is never part of the wire payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
  pub id:                 Option<String>,
  pub name:               Option<String>,
  /// Person ids.
  pub participants:       Option<Vec<String>>,
  /// Staff user ids.
  pub agents:             Option<Vec<String>>,
  pub latest_activity_at: Option<DateTime<Utc>>,
  pub created_at:         Option<DateTime<Utc>>,
  pub updated_at:         Option<DateTime<Utc>>,
  pub deleted:            bool,
  pub active:             Option<bool>,
  events:                 HashMap<String, Event>,
  initialized:            bool,
}

impl Feed {
  /// A stand-in carrying nothing but an id, as built from a topic segment.
  pub fn with_id(id: impl Into<String>) -> Self {
    Self { id: Some(id.into()), ..Default::default() }
  }

  /// `api/v0/feeds/{id}/events`
  pub fn events_path(&self, operation: Operation) -> Result<String> {
    Ok(format!("{}/events", self.resource_path(operation)?))
  }

  /// Insert or replace `events` by id, then return every event this feed
  /// holds, not just the ones passed in. Events without an id cannot be
  /// keyed and are skipped.
  pub fn upsert_events(
    &mut self,
    events: impl IntoIterator<Item = Event>,
  ) -> Vec<Event> {
    for event in events {
      match event.id.clone() {
        Some(id) => {
          self.events.insert(id, event);
        }
        None => {
          tracing::warn!(feed = ?self.id, "skipping feed event without an id");
        }
      }
    }
    self.events.values().cloned().collect()
  }

  pub fn events(&self) -> impl Iterator<Item = &Event> { self.events.values() }

  pub fn event(&self, id: &str) -> Option<&Event> { self.events.get(id) }

  pub fn event_count(&self) -> usize { self.events.len() }
}

impl Entity for Feed {
  type Payload = FeedPayload;

  const KIND: EntityKind = EntityKind::Feed;
  const ENDPOINT: &'static str = "api/v0/feeds";

  fn id(&self) -> Option<&str> { self.id.as_deref() }

  fn is_initialized(&self) -> bool { self.initialized }

  fn set_initialized(&mut self, initialized: bool) {
    self.initialized = initialized;
  }

  fn deserialize(&mut self, p: FeedPayload) {
    self.id = p.id;
    self.name = p.name;
    self.participants = p.participants;
    self.agents = p.agents;
    self.latest_activity_at = p.latest_activity_at;
    self.created_at = p.created_at;
    self.updated_at = p.updated_at;
    self.deleted = p.deleted.unwrap_or(false);
    self.active = p.active;
  }

  fn serialize_with(&self, options: &SerializeOptions) -> FeedPayload {
    FeedPayload {
      id:                 self.id.clone(),
      name:               self.name.clone(),
      participants:       self.participants.clone(),
      agents:             self.agents.clone(),
      latest_activity_at: self.latest_activity_at,
      created_at:         self.created_at,
      updated_at:         self.updated_at,
      deleted:            SerializeOptions::deleted(self.deleted),
      active:             options.active(self.active),
    }
  }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// What happened in a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
  Message,
  Merge,
  Order,
  Cart,
  Deal,
  Other(String),
}

impl EventType {
  pub fn as_str(&self) -> &str {
    match self {
      Self::Message => "message",
      Self::Merge => "merge",
      Self::Order => "order",
      Self::Cart => "cart",
      Self::Deal => "deal",
      Self::Other(s) => s,
    }
  }
}

impl From<String> for EventType {
  fn from(s: String) -> Self {
    match s.as_str() {
      "message" => Self::Message,
      "merge" => Self::Merge,
      "order" => Self::Order,
      "cart" => Self::Cart,
      "deal" => Self::Deal,
      _ => Self::Other(s),
    }
  }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventPayload {
  pub id:            Option<String>,
  pub feed:          Option<String>,
  #[serde(rename = "type")]
  pub kind:          Option<String>,
  pub resource_type: Option<String>,
  pub resource:      Option<serde_json::Value>,
  pub context:       Option<serde_json::Value>,
  pub annotations:   Option<serde_json::Value>,
  #[serde(with = "iso8601")]
  pub created_at:    Option<DateTime<Utc>>,
  #[serde(with = "iso8601")]
  pub updated_at:    Option<DateTime<Utc>>,
  pub deleted:       Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
  pub id:            Option<String>,
  pub feed:          Option<String>,
  pub kind:          Option<EventType>,
  pub resource_type: Option<String>,
  /// The raw record this event is about (a message, an order, …).
  pub resource:      Option<serde_json::Value>,
  pub context:       Option<serde_json::Value>,
  pub annotations:   Option<serde_json::Value>,
  pub created_at:    Option<DateTime<Utc>>,
  pub updated_at:    Option<DateTime<Utc>>,
  pub deleted:       bool,
  initialized:       bool,
}

impl Event {
  /// Rehydrate the resource as a [`Message`] when this is a message event.
  pub fn message(&self) -> Option<Message> {
    if self.kind != Some(EventType::Message) {
      return None;
    }
    let resource = self.resource.clone()?;
    match Message::from_value(resource, self.initialized) {
      Ok(message) => Some(message),
      Err(e) => {
        tracing::warn!(event = ?self.id, error = %e, "malformed message resource");
        None
      }
    }
  }
}

impl Entity for Event {
  type Payload = EventPayload;

  const KIND: EntityKind = EntityKind::Event;
  const ENDPOINT: &'static str = "events";

  fn id(&self) -> Option<&str> { self.id.as_deref() }

  fn is_initialized(&self) -> bool { self.initialized }

  fn set_initialized(&mut self, initialized: bool) {
    self.initialized = initialized;
  }

  fn deserialize(&mut self, p: EventPayload) {
    self.id = p.id;
    self.feed = p.feed;
    self.kind = p.kind.map(EventType::from);
    self.resource_type = p.resource_type;
    self.resource = p.resource;
    self.context = p.context;
    self.annotations = p.annotations;
    self.created_at = p.created_at;
    self.updated_at = p.updated_at;
    self.deleted = p.deleted.unwrap_or(false);
  }

  fn serialize_with(&self, _options: &SerializeOptions) -> EventPayload {
    EventPayload {
      id:            self.id.clone(),
      feed:          self.feed.clone(),
      kind:          self.kind.as_ref().map(|k| k.as_str().to_owned()),
      resource_type: self.resource_type.clone(),
      resource:      self.resource.clone(),
      context:       self.context.clone(),
      annotations:   self.annotations.clone(),
      created_at:    self.created_at,
      updated_at:    self.updated_at,
      deleted:       SerializeOptions::deleted(self.deleted),
    }
  }

  /// `api/v0/feeds/{feed}/events`
  fn collection_path(&self, operation: Operation) -> Result<String> {
    let feed = self
      .feed
      .as_deref()
      .ok_or_else(|| Error::missing(Self::KIND, operation, "feed"))?;
    Ok(format!("{}/{feed}/{}", Feed::ENDPOINT, Self::ENDPOINT))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn event(id: &str) -> Event {
    Event::create(EventPayload {
      id: Some(id.into()),
      feed: Some("f1".into()),
      kind: Some("message".into()),
      ..Default::default()
    })
  }

  #[test]
  fn upsert_is_additive() {
    let mut feed = Feed::with_id("f1");
    let first = feed.upsert_events([event("a")]);
    assert_eq!(first.len(), 1);

    let second = feed.upsert_events([event("b")]);
    let mut ids: Vec<_> = second.iter().filter_map(|e| e.id.clone()).collect();
    ids.sort();
    assert_eq!(ids, ["a", "b"]);
  }

  #[test]
  fn upsert_replaces_by_id() {
    let mut feed = Feed::with_id("f1");
    feed.upsert_events([event("a")]);
    let mut replacement = event("a");
    replacement.kind = Some(EventType::Merge);
    let all = feed.upsert_events([replacement]);
    assert_eq!(all.len(), 1);
    assert_eq!(feed.event("a").unwrap().kind, Some(EventType::Merge));
  }

  #[test]
  fn events_without_id_are_skipped() {
    let mut feed = Feed::with_id("f1");
    let all = feed.upsert_events([Event::default()]);
    assert!(all.is_empty());
  }

  #[test]
  fn unknown_event_type_round_trips() {
    let payload = EventPayload {
      id: Some("e1".into()),
      kind: Some("custom_signal".into()),
      deleted: Some(false),
      ..Default::default()
    };
    let event = Event::create(payload.clone());
    assert_eq!(event.kind, Some(EventType::Other("custom_signal".into())));
    assert_eq!(event.serialize(), payload);
  }

  #[test]
  fn message_event_rehydrates_its_resource() {
    let mut e = event("e1");
    e.resource = Some(serde_json::json!({ "id": "m1", "content": { "body": "hi" } }));
    let message = e.message().unwrap();
    assert_eq!(message.id.as_deref(), Some("m1"));
    assert_eq!(message.body(), Some("hi"));
  }

  #[test]
  fn event_path_is_scoped_by_feed() {
    assert_eq!(
      event("e1").resource_path(Operation::Fetch).unwrap(),
      "api/v0/feeds/f1/events/e1"
    );
  }
}
