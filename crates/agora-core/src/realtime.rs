//! Classification of inbound realtime messages into typed domain events.
//!
//! Each realtime-capable aggregate (universe, feed, person) has a default
//! topic set and a pure classifier. A classifier tests the inbound topic
//! against its templates in a fixed priority order, stops at the first
//! match, and rehydrates any embedded record into a typed entity. Topics
//! that match nothing classify to `None`.

use serde::{Deserialize, Serialize};

use crate::{
  entities::{Event, Feed, Message, Person},
  entity::Entity,
  topics::{self, CLIENT_ID, Topic, TopicData},
};

/// A message as delivered by the realtime transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeMessage {
  pub topic:   String,
  #[serde(default)]
  pub payload: serde_json::Value,
}

impl RealtimeMessage {
  pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
    Self { topic: topic.into(), payload }
  }
}

/// Build `E` from `payload[key]`. A record that fails to decode is logged and
/// dropped; the event itself is still delivered.
fn rehydrate<E: Entity>(
  payload: &serde_json::Value,
  key: &str,
  initialized: bool,
) -> Option<E> {
  let value = payload.get(key)?;
  match E::from_value(value.clone(), initialized) {
    Ok(entity) => Some(entity),
    Err(e) => {
      tracing::warn!(kind = %E::KIND, error = %e, "dropping malformed realtime record");
      None
    }
  }
}

/// The feed named by `topic`'s first wildcard level: the embedded `feed`
/// record when there is one, else a stand-in carrying only the id.
fn feed_from(msg: &RealtimeMessage, template: Topic) -> Feed {
  rehydrate::<Feed>(&msg.payload, "feed", false).unwrap_or_else(|| {
    template
      .wildcard_level(&msg.topic, 0)
      .map(Feed::with_id)
      .unwrap_or_default()
  })
}

// ─── Universe ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum UniverseEvent {
  /// The platform acknowledged this client's arm request.
  Armed { raw: RealtimeMessage },
  Message {
    raw:     RealtimeMessage,
    message: Option<Message>,
  },
  FeedsMessages {
    raw:     RealtimeMessage,
    feed:    Feed,
    message: Option<Message>,
  },
  FeedsEvents {
    raw:   RealtimeMessage,
    feed:  Feed,
    event: Option<Event>,
  },
  FeedsActivities {
    raw:  RealtimeMessage,
    feed: Feed,
  },
  Feeds {
    raw:  RealtimeMessage,
    feed: Feed,
  },
  People {
    raw:    RealtimeMessage,
    person: Option<Person>,
  },
}

impl UniverseEvent {
  /// The name this event is emitted under.
  pub fn name(&self) -> &'static str {
    match self {
      Self::Armed { .. } => "armed",
      Self::Message { .. } => "universe:message",
      Self::FeedsMessages { .. } => "universe:feeds:messages",
      Self::FeedsEvents { .. } => "universe:feeds:events",
      Self::FeedsActivities { .. } => "universe:feeds:activities",
      Self::Feeds { .. } => "universe:feeds",
      Self::People { .. } => "universe:people",
    }
  }

  pub fn raw(&self) -> &RealtimeMessage {
    match self {
      Self::Armed { raw }
      | Self::Message { raw, .. }
      | Self::FeedsMessages { raw, .. }
      | Self::FeedsEvents { raw, .. }
      | Self::FeedsActivities { raw, .. }
      | Self::Feeds { raw, .. }
      | Self::People { raw, .. } => raw,
    }
  }
}

/// Topics a universe subscribes to on initialization.
pub fn universe_topics(client_id: &str) -> Vec<String> {
  let client = TopicData::new().with(CLIENT_ID, client_id);
  vec![
    topics::CLIENT_ARM.generate(Some(&client)),
    topics::MESSAGE.generate(None),
    topics::FEEDS_MESSAGES.generate(None),
    topics::FEEDS_EVENTS.generate(None),
    topics::FEEDS_ACTIVITIES.generate(None),
    topics::FEEDS.generate(None),
    topics::PEOPLE.generate(None),
  ]
}

/// Classify a message received by the universe owning `client_id`.
pub fn classify_universe(
  msg: &RealtimeMessage,
  client_id: &str,
) -> Option<UniverseEvent> {
  let client = TopicData::new().with(CLIENT_ID, client_id);
  let topic = msg.topic.as_str();
  let raw = msg.clone();

  if topics::CLIENT_ARM.is_topic(topic, Some(&client)) {
    return Some(UniverseEvent::Armed { raw });
  }
  if topics::MESSAGE.is_topic(topic, None) {
    let message = rehydrate(&msg.payload, "message", true);
    return Some(UniverseEvent::Message { raw, message });
  }
  if topics::FEEDS_MESSAGES.is_topic(topic, None) {
    let feed = feed_from(msg, topics::FEEDS_MESSAGES);
    let message = rehydrate(&msg.payload, "message", true);
    return Some(UniverseEvent::FeedsMessages { raw, feed, message });
  }
  if topics::FEEDS_EVENTS.is_topic(topic, None) {
    let feed = feed_from(msg, topics::FEEDS_EVENTS);
    let event = rehydrate(&msg.payload, "event", true);
    return Some(UniverseEvent::FeedsEvents { raw, feed, event });
  }
  if topics::FEEDS_ACTIVITIES.is_topic(topic, None) {
    let feed = feed_from(msg, topics::FEEDS_ACTIVITIES);
    return Some(UniverseEvent::FeedsActivities { raw, feed });
  }
  if topics::FEEDS.is_topic(topic, None) {
    let feed = feed_from(msg, topics::FEEDS);
    return Some(UniverseEvent::Feeds { raw, feed });
  }
  if topics::PEOPLE.is_topic(topic, None) {
    let person = rehydrate(&msg.payload, "person", true);
    return Some(UniverseEvent::People { raw, person });
  }

  tracing::trace!(topic, "universe ignoring unmatched topic");
  None
}

// ─── Feed ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum FeedEvent {
  Message {
    raw:     RealtimeMessage,
    feed:    Feed,
    message: Option<Message>,
  },
  Event {
    raw:   RealtimeMessage,
    feed:  Feed,
    event: Option<Event>,
  },
}

impl FeedEvent {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Message { .. } => "feed:message",
      Self::Event { .. } => "feed:event",
    }
  }

  pub fn raw(&self) -> &RealtimeMessage {
    match self {
      Self::Message { raw, .. } | Self::Event { raw, .. } => raw,
    }
  }
}

pub fn feed_topics(feed_id: &str) -> Vec<String> {
  let data = TopicData::id(feed_id);
  vec![
    topics::FEED_MESSAGES.generate(Some(&data)),
    topics::FEED_EVENTS.generate(Some(&data)),
  ]
}

/// Classify a message for the feed `feed_id`; messages about other feeds
/// classify to `None`.
pub fn classify_feed(msg: &RealtimeMessage, feed_id: &str) -> Option<FeedEvent> {
  let data = TopicData::id(feed_id);
  let topic = msg.topic.as_str();
  let raw = msg.clone();

  if topics::FEED_MESSAGES.is_topic(topic, Some(&data)) {
    let message = rehydrate(&msg.payload, "message", true);
    let feed = Feed::with_id(feed_id);
    return Some(FeedEvent::Message { raw, feed, message });
  }
  if topics::FEED_EVENTS.is_topic(topic, Some(&data)) {
    let event = rehydrate(&msg.payload, "event", true);
    let feed = Feed::with_id(feed_id);
    return Some(FeedEvent::Event { raw, feed, event });
  }

  tracing::trace!(topic, feed_id, "feed ignoring unmatched topic");
  None
}

// ─── Person ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum PersonEvent {
  Change {
    raw:    RealtimeMessage,
    person: Option<Person>,
  },
}

impl PersonEvent {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Change { .. } => "person:change",
    }
  }

  pub fn raw(&self) -> &RealtimeMessage {
    match self {
      Self::Change { raw, .. } => raw,
    }
  }
}

pub fn person_topics(person_id: &str) -> Vec<String> {
  vec![topics::PERSON.generate(Some(&TopicData::id(person_id)))]
}

pub fn classify_person(
  msg: &RealtimeMessage,
  person_id: &str,
) -> Option<PersonEvent> {
  let topic = msg.topic.as_str();
  if topics::PERSON.is_topic(topic, Some(&TopicData::id(person_id))) {
    let person = rehydrate(&msg.payload, "person", true);
    return Some(PersonEvent::Change { raw: msg.clone(), person });
  }

  tracing::trace!(topic, person_id, "person ignoring unmatched topic");
  None
}
