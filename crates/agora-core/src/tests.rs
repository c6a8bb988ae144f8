//! Cross-module tests: payload round-trips, nested lifecycle, and realtime
//! classification.

use serde_json::json;

use crate::{
  entities::{
    Address, Cart, CartPayload, Deal, Email, Event, EventType, Feed, Message,
    MessageTemplate, Order, Person, PersonPayload, Phonenumber,
  },
  entity::{Entity, SerializeOptions},
  realtime::{
    FeedEvent, PersonEvent, RealtimeMessage, UniverseEvent, classify_feed,
    classify_person, classify_universe, feed_topics, universe_topics,
  },
};

// ─── Round trips ─────────────────────────────────────────────────────────────

/// `serialize(create(payload)) == payload` for a payload that already spells
/// out the defaulted flags.
fn assert_round_trip<E: Entity>(value: serde_json::Value)
where
  E::Payload: PartialEq,
{
  let payload: E::Payload = serde_json::from_value(value.clone()).unwrap();
  let entity = E::create(payload.clone());
  assert_eq!(entity.serialize(), payload, "{} payload changed", E::KIND);
  assert_eq!(
    serde_json::to_value(entity.serialize()).unwrap(),
    value,
    "{} wire shape changed",
    E::KIND
  );
}

#[test]
fn every_entity_round_trips() {
  assert_round_trip::<Person>(json!({
    "id": "p1",
    "first_name": "Ada",
    "last_name": "Lovelace",
    "date_of_birth": "1815-12-10",
    "tags": ["vip"],
    "custom_properties": { "tier": "gold" },
    "created_at": "2020-01-01T00:00:00.000Z",
    "updated_at": "2020-01-02T12:30:00.250Z",
    "deleted": false,
    "active": true,
    "emails": [{ "id": "e1", "person": "p1", "value": "ada@example.com", "deleted": false, "active": true }],
    "phonenumbers": [{ "id": "ph1", "person": "p1", "type": "mobile", "value": "+44123", "deleted": false, "active": true }],
    "addresses": [{ "id": "a1", "person": "p1", "lines": ["12 St James's Square"], "locality": "London", "deleted": false, "active": true }],
    "channel_users": [{ "id": "cu1", "person": "p1", "source_type": "whatsapp", "payload": { "wa_id": "44123" }, "deleted": false }]
  }));
  assert_round_trip::<Email>(json!({ "id": "e1", "person": "p1", "type": "work", "value": "a@b.c", "deleted": false, "active": true }));
  assert_round_trip::<Phonenumber>(json!({ "id": "ph1", "person": "p1", "value": "+1", "deleted": false, "active": true }));
  assert_round_trip::<Address>(json!({ "id": "a1", "person": "p1", "country": "GB", "postal_code": "SW1Y", "deleted": false, "active": true }));
  assert_round_trip::<Cart>(json!({
    "id": "c1",
    "person": "p1",
    "status": "open",
    "amount_total_gross": 11.9,
    "items": [{ "qty": 2, "sku": "A", "vat_rate": 19, "amount": { "net": 10, "gross": 11.9 } }],
    "deleted": false
  }));
  assert_round_trip::<Order>(json!({ "id": "o1", "cart": "c1", "currency": "EUR", "deleted": false }));
  assert_round_trip::<Deal>(json!({ "id": "d1", "pipeline": "pl1", "pipeline_stage": "st1", "value": 99.5, "deleted": false }));
  assert_round_trip::<Feed>(json!({
    "id": "f1",
    "participants": ["p1"],
    "latest_activity_at": "2021-06-01T08:00:00.000Z",
    "deleted": false,
    "active": true
  }));
  assert_round_trip::<Event>(json!({
    "id": "ev1",
    "feed": "f1",
    "type": "message",
    "resource_type": "message",
    "resource": { "id": "m1" },
    "deleted": false
  }));
  assert_round_trip::<Message>(json!({
    "id": "m1",
    "feed": "f1",
    "content": { "body": "hello", "attachments": [{ "url": "https://cdn/x.png" }] },
    "author": { "person": "p1" },
    "date": "2021-06-01T08:00:00.000Z",
    "deleted": false
  }));
  assert_round_trip::<MessageTemplate>(json!({
    "id": "t1",
    "name": "shipping_update",
    "approved": true,
    "content": { "de": { "body": "Hallo" } },
    "deleted": false,
    "active": true
  }));
}

#[test]
fn absent_flags_serialize_with_defaults() {
  let person = Person::create(PersonPayload { id: Some("p1".into()), ..Default::default() });
  let out = person.serialize();
  assert_eq!(out.deleted, Some(false));
  assert_eq!(out.active, Some(true));
}

#[test]
fn inactive_flag_is_lost_in_legacy_mode_and_kept_when_preserving() {
  let person = Person::create(PersonPayload {
    id: Some("p1".into()),
    active: Some(false),
    ..Default::default()
  });
  assert_eq!(person.serialize().active, Some(true));
  assert_eq!(
    person.serialize_with(&SerializeOptions::preserving_active()).active,
    Some(false)
  );
}

#[test]
fn timestamps_are_normalised_to_milliseconds() {
  let payload: PersonPayload =
    serde_json::from_value(json!({ "id": "p1", "created_at": "2020-01-01T01:00:00+01:00" }))
      .unwrap();
  let value = serde_json::to_value(Person::create(payload).serialize()).unwrap();
  assert_eq!(value["created_at"], "2020-01-01T00:00:00.000Z");
}

#[test]
fn malformed_timestamp_is_a_payload_error() {
  let err = Person::from_value(json!({ "id": "p1", "created_at": "yesterday" }), true)
    .unwrap_err();
  assert!(matches!(err, crate::Error::Payload(_)));
}

// ─── Nested lifecycle ────────────────────────────────────────────────────────

#[test]
fn initialized_person_nests_typed_emails() {
  let person = Person::from_value(
    json!({ "id": "p1", "first_name": "Ada", "emails": [{ "id": "e1" }] }),
    true,
  )
  .unwrap();
  let emails = person.emails.as_ref().unwrap();
  assert_eq!(emails[0].id.as_deref(), Some("e1"));
  assert!(emails[0].is_initialized());
  assert_eq!(person.display_name().as_deref(), Some("Ada"));
}

#[test]
fn stand_in_person_nests_stand_ins() {
  let person =
    Person::from_value(json!({ "id": "p1", "emails": [{ "id": "e1" }] }), false).unwrap();
  assert!(!person.is_initialized());
  assert!(!person.emails.as_ref().unwrap()[0].is_initialized());
}

#[test]
fn deserialize_is_idempotent_and_keeps_absent_collections() {
  let payload: PersonPayload = serde_json::from_value(json!({
    "id": "p1",
    "first_name": "Ada",
    "phonenumbers": [{ "id": "ph1" }]
  }))
  .unwrap();
  let mut person = Person::create(payload.clone());
  person.deserialize(payload.clone());
  assert_eq!(person.serialize(), Person::create(payload).serialize());

  // A re-fetch without nested data clears scalars but keeps collections.
  person.deserialize(PersonPayload { id: Some("p1".into()), ..Default::default() });
  assert_eq!(person.first_name, None);
  assert_eq!(person.phonenumbers.as_ref().map(Vec::len), Some(1));
}

#[test]
fn cart_payload_decodes_numbers_leniently() {
  let payload: CartPayload =
    serde_json::from_value(json!({ "items": [{ "qty": 3 }] })).unwrap();
  assert_eq!(Cart::create(payload).item_count(), 3.0);
}

#[test]
fn integer_amounts_stay_integers() {
  let raw = json!({ "items": [{ "qty": 3, "amount": { "net": 10, "gross": 12 } }] });
  let payload: CartPayload = serde_json::from_value(raw.clone()).unwrap();
  let mut wire = serde_json::to_value(Cart::create(payload).serialize()).unwrap();
  wire.as_object_mut().unwrap().remove("deleted");
  assert_eq!(wire, raw);

  let deal = json!({ "id": "d1", "value": 1500, "deleted": false });
  let payload = serde_json::from_value(deal.clone()).unwrap();
  assert_eq!(serde_json::to_value(Deal::create(payload).serialize()).unwrap(), deal);
}

// ─── Realtime ────────────────────────────────────────────────────────────────

#[test]
fn universe_message_rehydrates_a_message() {
  let msg = RealtimeMessage::new(
    "api/message",
    json!({ "message": { "id": "m1", "content": { "body": "hi" } } }),
  );
  let event = classify_universe(&msg, "client-1").unwrap();
  assert_eq!(event.name(), "universe:message");
  match event {
    UniverseEvent::Message { message, raw } => {
      assert_eq!(message.unwrap().body(), Some("hi"));
      assert_eq!(raw, msg);
    }
    other => panic!("unexpected event {other:?}"),
  }
}

#[test]
fn arm_ack_takes_priority_and_is_scoped_to_the_client() {
  let mine = RealtimeMessage::new("api/clients/client-1/arm", json!({}));
  let theirs = RealtimeMessage::new("api/clients/client-2/arm", json!({}));
  assert_eq!(classify_universe(&mine, "client-1").unwrap().name(), "armed");
  assert!(classify_universe(&theirs, "client-1").is_none());
}

#[test]
fn feeds_messages_builds_feed_stand_in_from_topic() {
  let msg = RealtimeMessage::new(
    "api/feeds/f9/messages",
    json!({ "message": { "id": "m2", "feed": "f9" } }),
  );
  match classify_universe(&msg, "c").unwrap() {
    UniverseEvent::FeedsMessages { feed, message, .. } => {
      assert_eq!(feed.id.as_deref(), Some("f9"));
      assert!(!feed.is_initialized());
      assert_eq!(message.unwrap().id.as_deref(), Some("m2"));
    }
    other => panic!("unexpected event {other:?}"),
  }
}

#[test]
fn feeds_events_carry_typed_event() {
  let msg = RealtimeMessage::new(
    "api/feeds/f9/events",
    json!({ "event": { "id": "ev1", "type": "merge" } }),
  );
  match classify_universe(&msg, "c").unwrap() {
    UniverseEvent::FeedsEvents { event, .. } => {
      assert_eq!(event.unwrap().kind, Some(EventType::Merge));
    }
    other => panic!("unexpected event {other:?}"),
  }
}

#[test]
fn feed_and_people_topics_classify() {
  let feed = RealtimeMessage::new("api/feeds/f1", json!({ "feed": { "id": "f1", "name": "Support" } }));
  let activity = RealtimeMessage::new("api/feeds/f1/activities", json!({}));
  let people = RealtimeMessage::new("api/people/p1", json!({ "person": { "id": "p1" } }));

  match classify_universe(&feed, "c").unwrap() {
    UniverseEvent::Feeds { feed, .. } => assert_eq!(feed.name.as_deref(), Some("Support")),
    other => panic!("unexpected event {other:?}"),
  }
  assert_eq!(classify_universe(&activity, "c").unwrap().name(), "universe:feeds:activities");
  assert_eq!(classify_universe(&people, "c").unwrap().name(), "universe:people");
}

#[test]
fn malformed_embedded_record_still_emits() {
  let msg = RealtimeMessage::new("api/message", json!({ "message": { "date": 42 } }));
  match classify_universe(&msg, "c").unwrap() {
    UniverseEvent::Message { message, .. } => assert!(message.is_none()),
    other => panic!("unexpected event {other:?}"),
  }
}

#[test]
fn unmatched_topics_classify_to_none_everywhere() {
  let msg = RealtimeMessage::new("api/unknown/thing", json!({}));
  assert!(classify_universe(&msg, "c").is_none());
  assert!(classify_feed(&msg, "f1").is_none());
  assert!(classify_person(&msg, "p1").is_none());
}

#[test]
fn feed_classifier_only_reacts_to_its_own_feed() {
  let own = RealtimeMessage::new("api/feeds/f1/messages", json!({ "message": { "id": "m1" } }));
  let other = RealtimeMessage::new("api/feeds/f2/messages", json!({ "message": { "id": "m1" } }));
  let event = classify_feed(&own, "f1").unwrap();
  assert_eq!(event.name(), "feed:message");
  assert!(matches!(event, FeedEvent::Message { message: Some(_), .. }));
  assert!(classify_feed(&other, "f1").is_none());

  let ev = RealtimeMessage::new("api/feeds/f1/events", json!({ "event": { "id": "ev1" } }));
  assert_eq!(classify_feed(&ev, "f1").unwrap().name(), "feed:event");
}

#[test]
fn person_classifier_rehydrates_person() {
  let msg = RealtimeMessage::new("api/people/p1", json!({ "person": { "id": "p1", "first_name": "Ada" } }));
  let PersonEvent::Change { person, .. } = classify_person(&msg, "p1").unwrap();
  assert_eq!(person.unwrap().first_name.as_deref(), Some("Ada"));
  assert!(classify_person(&msg, "p2").is_none());
}

#[test]
fn default_topic_sets() {
  let topics = universe_topics("c1");
  assert_eq!(topics[0], "api/clients/c1/arm");
  assert!(topics.contains(&"api/feeds/+/messages".to_string()));
  assert_eq!(feed_topics("f1"), ["api/feeds/f1/messages", "api/feeds/f1/events"]);
}
