//! Realtime topic templates.
//!
//! A template is a `/`-separated topic name whose segments are literals,
//! MQTT single-level wildcards (`+`) or named placeholders (`${id}`).
//! Generating a topic fills placeholders from [`TopicData`], falling back to
//! `+` so the result can be used as a subscription filter. Matching works the
//! other way round: given a concrete inbound topic, decide whether it belongs
//! to the template and, for scoped templates, to a particular entity.

use std::collections::BTreeMap;

/// Placeholder name for an entity id segment.
pub const ID: &str = "id";
/// Placeholder name for the realtime client id segment.
pub const CLIENT_ID: &str = "clientId";

const WILDCARD: &str = "+";
const MULTI_WILDCARD: &str = "#";

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Any message in the universe.
pub const MESSAGE: Topic = Topic::new("api/message");
/// Any change to any feed.
pub const FEEDS: Topic = Topic::new("api/feeds/+");
pub const FEEDS_ACTIVITIES: Topic = Topic::new("api/feeds/+/activities");
pub const FEEDS_MESSAGES: Topic = Topic::new("api/feeds/+/messages");
pub const FEEDS_EVENTS: Topic = Topic::new("api/feeds/+/events");
/// Any change to any person.
pub const PEOPLE: Topic = Topic::new("api/people/+");
/// Messages in one feed.
pub const FEED_MESSAGES: Topic = Topic::new("api/feeds/${id}/messages");
/// Events in one feed.
pub const FEED_EVENTS: Topic = Topic::new("api/feeds/${id}/events");
/// Changes to one person.
pub const PERSON: Topic = Topic::new("api/people/${id}");
/// Arm acknowledgements addressed to one realtime client.
pub const CLIENT_ARM: Topic = Topic::new("api/clients/${clientId}/arm");

// ─── TopicData ───────────────────────────────────────────────────────────────

/// Values for a template's placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicData(BTreeMap<String, String>);

impl TopicData {
  pub fn new() -> Self { Self::default() }

  /// Data carrying only an entity id.
  pub fn id(id: impl Into<String>) -> Self { Self::new().with(ID, id) }

  pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.0.insert(name.into(), value.into());
    self
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.0.get(name).map(String::as_str)
  }
}

// ─── Topic ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
  Literal(&'a str),
  Wildcard,
  Placeholder(&'a str),
}

fn parse_segment(segment: &str) -> Segment<'_> {
  if segment == WILDCARD {
    Segment::Wildcard
  } else if let Some(name) = segment
    .strip_prefix("${")
    .and_then(|rest| rest.strip_suffix('}'))
  {
    Segment::Placeholder(name)
  } else {
    Segment::Literal(segment)
  }
}

/// A concrete topic level: non-empty and free of wildcards.
fn is_concrete(level: &str) -> bool {
  !level.is_empty() && level != WILDCARD && level != MULTI_WILDCARD
}

/// A topic template. Stateless; the catalog entries are `const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topic {
  template: &'static str,
}

impl Topic {
  pub const fn new(template: &'static str) -> Self { Self { template } }

  pub fn template(&self) -> &'static str { self.template }

  /// Whether the template has placeholders that tie it to one entity.
  pub fn is_scoped(&self) -> bool {
    self
      .segments()
      .any(|s| matches!(s, Segment::Placeholder(_)))
  }

  fn segments(&self) -> impl Iterator<Item = Segment<'static>> {
    self.template.split('/').map(parse_segment)
  }

  /// Fill placeholders from `data`; anything missing becomes `+`.
  pub fn generate(&self, data: Option<&TopicData>) -> String {
    self
      .segments()
      .map(|segment| match segment {
        Segment::Literal(l) => l,
        Segment::Wildcard => WILDCARD,
        Segment::Placeholder(name) => data
          .and_then(|d| d.get(name))
          .unwrap_or(WILDCARD),
      })
      .collect::<Vec<_>>()
      .join("/")
  }

  /// Whether the concrete `topic` belongs to this template. When `data`
  /// supplies a value for a placeholder, that segment must equal it.
  ///
  /// Only concrete inbound topics match: a level that is empty, `+` or `#`
  /// never does. So `is_topic(generate(data), data)` holds when `data`
  /// fills every placeholder of a template without `+` segments, and is
  /// false for the filters `generate` yields otherwise.
  pub fn is_topic(&self, topic: &str, data: Option<&TopicData>) -> bool {
    let mut levels = topic.split('/');
    for segment in self.segments() {
      let Some(level) = levels.next() else { return false };
      if !is_concrete(level) {
        return false;
      }
      let ok = match segment {
        Segment::Literal(l) => l == level,
        Segment::Wildcard => true,
        Segment::Placeholder(name) => {
          data.and_then(|d| d.get(name)).is_none_or(|v| v == level)
        }
      };
      if !ok {
        return false;
      }
    }
    levels.next().is_none()
  }

  /// The value of placeholder `name` in `topic`, if the topic matches.
  pub fn extract<'t>(&self, topic: &'t str, name: &str) -> Option<&'t str> {
    if !self.is_topic(topic, None) {
      return None;
    }
    self
      .segments()
      .zip(topic.split('/'))
      .find_map(|(segment, level)| {
        (segment == Segment::Placeholder(name)).then_some(level)
      })
  }

  /// The concrete level at wildcard position `index` (0-based among the
  /// template's `+` segments), if the topic matches.
  pub fn wildcard_level<'t>(&self, topic: &'t str, index: usize) -> Option<&'t str> {
    if !self.is_topic(topic, None) {
      return None;
    }
    self
      .segments()
      .zip(topic.split('/'))
      .filter(|(segment, _)| *segment == Segment::Wildcard)
      .nth(index)
      .map(|(_, level)| level)
  }
}

/// MQTT filter matching: `+` matches one level, a trailing `#` matches the
/// parent level and everything below it.
pub fn filter_matches(filter: &str, topic: &str) -> bool {
  let mut levels = topic.split('/');
  for f in filter.split('/') {
    if f == MULTI_WILDCARD {
      return true;
    }
    match levels.next() {
      Some(level) if f == WILDCARD || f == level => {}
      _ => return false,
    }
  }
  levels.next().is_none()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generate_fills_placeholders() {
    let data = TopicData::id("f1");
    assert_eq!(FEED_MESSAGES.generate(Some(&data)), "api/feeds/f1/messages");
    assert_eq!(
      CLIENT_ARM.generate(Some(&TopicData::new().with(CLIENT_ID, "c-9"))),
      "api/clients/c-9/arm"
    );
  }

  #[test]
  fn generate_without_data_yields_a_filter() {
    assert_eq!(FEED_MESSAGES.generate(None), "api/feeds/+/messages");
    assert_eq!(FEEDS.generate(None), "api/feeds/+");
    assert_eq!(MESSAGE.generate(None), "api/message");
  }

  #[test]
  fn generated_topic_matches_its_own_data() {
    for id in ["f1", "abc-123", "x"] {
      let data = TopicData::id(id);
      for topic in [FEED_MESSAGES, FEED_EVENTS, PERSON] {
        assert!(topic.is_topic(&topic.generate(Some(&data)), Some(&data)));
      }
    }
  }

  #[test]
  fn scoped_topic_rejects_other_ids() {
    let a = TopicData::id("a");
    let b = TopicData::id("b");
    assert!(!FEED_MESSAGES.is_topic(&FEED_MESSAGES.generate(Some(&a)), Some(&b)));
    assert!(!PERSON.is_topic(&PERSON.generate(Some(&a)), Some(&b)));
  }

  #[test]
  fn unscoped_templates_match_any_id() {
    assert!(FEEDS_MESSAGES.is_topic("api/feeds/f1/messages", None));
    assert!(FEEDS.is_topic("api/feeds/f1", None));
    assert!(!FEEDS.is_topic("api/feeds/f1/messages", None));
    assert!(!FEEDS.is_topic("api/feeds", None));
    assert!(MESSAGE.is_topic("api/message", None));
    assert!(!MESSAGE.is_topic("api/messages", None));
  }

  #[test]
  fn wildcard_topics_are_not_concrete() {
    assert!(!FEEDS.is_topic("api/feeds/+", None));
    assert!(!FEED_MESSAGES.is_topic("api/feeds/#/messages", None));
    assert!(!FEED_MESSAGES.is_topic(&FEED_MESSAGES.generate(None), None));
    assert!(MESSAGE.is_topic(&MESSAGE.generate(None), None));
  }

  #[test]
  fn extract_reads_placeholder_and_wildcard_levels() {
    assert_eq!(FEED_EVENTS.extract("api/feeds/f7/events", ID), Some("f7"));
    assert_eq!(FEED_EVENTS.extract("api/people/f7", ID), None);
    assert_eq!(FEEDS_EVENTS.wildcard_level("api/feeds/f7/events", 0), Some("f7"));
    assert_eq!(FEEDS_EVENTS.wildcard_level("api/feeds/f7/events", 1), None);
    assert!(PERSON.is_scoped());
    assert!(!PEOPLE.is_scoped());
  }

  #[test]
  fn mqtt_filters() {
    assert!(filter_matches("api/feeds/+/messages", "api/feeds/f1/messages"));
    assert!(!filter_matches("api/feeds/+/messages", "api/feeds/f1/events"));
    assert!(filter_matches("api/#", "api/feeds/f1/events"));
    assert!(filter_matches("api/feeds/#", "api/feeds"));
    assert!(!filter_matches("api/feeds/+", "api/feeds/f1/events"));
    assert!(filter_matches("api/message", "api/message"));
  }
}
