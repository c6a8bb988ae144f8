//! Contact methods owned by a person: emails, phone numbers, postal
//! addresses and channel users.
//!
//! Each item carries a back-reference to its person's id (not the person
//! itself) and is independently fetchable under
//! `api/v0/people/{person}/{segment}/{id}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{
  Error, Result,
  entity::{Entity, EntityKind, Operation, SerializeOptions, iso8601},
};

/// `api/v0/people/{person}/{segment}` for a person-scoped sub-resource.
pub(crate) fn person_scoped(
  person: Option<&str>,
  kind: EntityKind,
  operation: Operation,
  segment: &str,
) -> Result<String> {
  let person = person.ok_or_else(|| Error::missing(kind, operation, "person"))?;
  Ok(format!("{}/{person}/{segment}", super::person::Person::ENDPOINT))
}

// ─── Email ───────────────────────────────────────────────────────────────────

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailPayload {
  pub id:         Option<String>,
  pub person:     Option<String>,
  #[serde(rename = "type")]
  pub kind:       Option<String>,
  pub value:      Option<String>,
  pub comment:    Option<String>,
  #[serde(with = "iso8601")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(with = "iso8601")]
  pub updated_at: Option<DateTime<Utc>>,
  pub deleted:    Option<bool>,
  pub active:     Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Email {
  pub id:         Option<String>,
  pub person:     Option<String>,
  pub kind:       Option<String>,
  pub value:      Option<String>,
  pub comment:    Option<String>,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
  pub deleted:    bool,
  pub active:     Option<bool>,
  initialized:    bool,
}

impl Entity for Email {
  type Payload = EmailPayload;

  const KIND: EntityKind = EntityKind::Email;
  const ENDPOINT: &'static str = "emails";

  fn id(&self) -> Option<&str> { self.id.as_deref() }

  fn is_initialized(&self) -> bool { self.initialized }

  fn set_initialized(&mut self, initialized: bool) {
    self.initialized = initialized;
  }

  fn deserialize(&mut self, p: EmailPayload) {
    self.id = p.id;
    self.person = p.person;
    self.kind = p.kind;
    self.value = p.value;
    self.comment = p.comment;
    self.created_at = p.created_at;
    self.updated_at = p.updated_at;
    self.deleted = p.deleted.unwrap_or(false);
    self.active = p.active;
  }

  fn serialize_with(&self, options: &SerializeOptions) -> EmailPayload {
    EmailPayload {
      id:         self.id.clone(),
      person:     self.person.clone(),
      kind:       self.kind.clone(),
      value:      self.value.clone(),
      comment:    self.comment.clone(),
      created_at: self.created_at,
      updated_at: self.updated_at,
      deleted:    SerializeOptions::deleted(self.deleted),
      active:     options.active(self.active),
    }
  }

  fn collection_path(&self, operation: Operation) -> Result<String> {
    person_scoped(self.person.as_deref(), Self::KIND, operation, Self::ENDPOINT)
  }
}

// ─── Phonenumber ─────────────────────────────────────────────────────────────

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhonenumberPayload {
  pub id:         Option<String>,
  pub person:     Option<String>,
  #[serde(rename = "type")]
  pub kind:       Option<String>,
  pub value:      Option<String>,
  pub comment:    Option<String>,
  #[serde(with = "iso8601")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(with = "iso8601")]
  pub updated_at: Option<DateTime<Utc>>,
  pub deleted:    Option<bool>,
  pub active:     Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Phonenumber {
  pub id:         Option<String>,
  pub person:     Option<String>,
  /// `mobile`, `landline`, `fax`, … as labelled by the platform.
  pub kind:       Option<String>,
  pub value:      Option<String>,
  pub comment:    Option<String>,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
  pub deleted:    bool,
  pub active:     Option<bool>,
  initialized:    bool,
}

impl Entity for Phonenumber {
  type Payload = PhonenumberPayload;

  const KIND: EntityKind = EntityKind::Phonenumber;
  const ENDPOINT: &'static str = "phonenumbers";

  fn id(&self) -> Option<&str> { self.id.as_deref() }

  fn is_initialized(&self) -> bool { self.initialized }

  fn set_initialized(&mut self, initialized: bool) {
    self.initialized = initialized;
  }

  fn deserialize(&mut self, p: PhonenumberPayload) {
    self.id = p.id;
    self.person = p.person;
    self.kind = p.kind;
    self.value = p.value;
    self.comment = p.comment;
    self.created_at = p.created_at;
    self.updated_at = p.updated_at;
    self.deleted = p.deleted.unwrap_or(false);
    self.active = p.active;
  }

  fn serialize_with(&self, options: &SerializeOptions) -> PhonenumberPayload {
    PhonenumberPayload {
      id:         self.id.clone(),
      person:     self.person.clone(),
      kind:       self.kind.clone(),
      value:      self.value.clone(),
      comment:    self.comment.clone(),
      created_at: self.created_at,
      updated_at: self.updated_at,
      deleted:    SerializeOptions::deleted(self.deleted),
      active:     options.active(self.active),
    }
  }

  fn collection_path(&self, operation: Operation) -> Result<String> {
    person_scoped(self.person.as_deref(), Self::KIND, operation, Self::ENDPOINT)
  }
}

// ─── Address ─────────────────────────────────────────────────────────────────

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressPayload {
  pub id:           Option<String>,
  pub person:       Option<String>,
  #[serde(rename = "type")]
  pub kind:         Option<String>,
  pub first_name:   Option<String>,
  pub last_name:    Option<String>,
  pub organisation: Option<String>,
  pub lines:        Option<Vec<String>>,
  pub locality:     Option<String>,
  pub region:       Option<String>,
  pub postal_code:  Option<String>,
  pub country:      Option<String>,
  pub comment:      Option<String>,
  #[serde(with = "iso8601")]
  pub created_at:   Option<DateTime<Utc>>,
  #[serde(with = "iso8601")]
  pub updated_at:   Option<DateTime<Utc>>,
  pub deleted:      Option<bool>,
  pub active:       Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
  pub id:           Option<String>,
  pub person:       Option<String>,
  /// `billing`, `delivery`, … as labelled by the platform.
  pub kind:         Option<String>,
  pub first_name:   Option<String>,
  pub last_name:    Option<String>,
  pub organisation: Option<String>,
  /// Street lines, in display order.
  pub lines:        Option<Vec<String>>,
  /// City or locality.
  pub locality:     Option<String>,
  /// State, province, or region.
  pub region:       Option<String>,
  pub postal_code:  Option<String>,
  pub country:      Option<String>,
  pub comment:      Option<String>,
  pub created_at:   Option<DateTime<Utc>>,
  pub updated_at:   Option<DateTime<Utc>>,
  pub deleted:      bool,
  pub active:       Option<bool>,
  initialized:      bool,
}

impl Entity for Address {
  type Payload = AddressPayload;

  const KIND: EntityKind = EntityKind::Address;
  const ENDPOINT: &'static str = "addresses";

  fn id(&self) -> Option<&str> { self.id.as_deref() }

  fn is_initialized(&self) -> bool { self.initialized }

  fn set_initialized(&mut self, initialized: bool) {
    self.initialized = initialized;
  }

  fn deserialize(&mut self, p: AddressPayload) {
    self.id = p.id;
    self.person = p.person;
    self.kind = p.kind;
    self.first_name = p.first_name;
    self.last_name = p.last_name;
    self.organisation = p.organisation;
    self.lines = p.lines;
    self.locality = p.locality;
    self.region = p.region;
    self.postal_code = p.postal_code;
    self.country = p.country;
    self.comment = p.comment;
    self.created_at = p.created_at;
    self.updated_at = p.updated_at;
    self.deleted = p.deleted.unwrap_or(false);
    self.active = p.active;
  }

  fn serialize_with(&self, options: &SerializeOptions) -> AddressPayload {
    AddressPayload {
      id:           self.id.clone(),
      person:       self.person.clone(),
      kind:         self.kind.clone(),
      first_name:   self.first_name.clone(),
      last_name:    self.last_name.clone(),
      organisation: self.organisation.clone(),
      lines:        self.lines.clone(),
      locality:     self.locality.clone(),
      region:       self.region.clone(),
      postal_code:  self.postal_code.clone(),
      country:      self.country.clone(),
      comment:      self.comment.clone(),
      created_at:   self.created_at,
      updated_at:   self.updated_at,
      deleted:      SerializeOptions::deleted(self.deleted),
      active:       options.active(self.active),
    }
  }

  fn collection_path(&self, operation: Operation) -> Result<String> {
    person_scoped(self.person.as_deref(), Self::KIND, operation, Self::ENDPOINT)
  }
}

// ─── ChannelUser ─────────────────────────────────────────────────────────────

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelUserPayload {
  pub id:                            Option<String>,
  pub person:                        Option<String>,
  pub external_person_reference_id:  Option<String>,
  pub external_person_custom_id:     Option<String>,
  pub external_channel_reference_id: Option<String>,
  pub source_type:                   Option<String>,
  pub source_api:                    Option<String>,
  pub broker:                        Option<String>,
  pub name:                          Option<String>,
  pub username:                      Option<String>,
  pub avatar:                        Option<String>,
  pub payload:                       Option<serde_json::Value>,
  #[serde(with = "iso8601")]
  pub created_at:                    Option<DateTime<Utc>>,
  #[serde(with = "iso8601")]
  pub updated_at:                    Option<DateTime<Utc>>,
  pub deleted:                       Option<bool>,
}

/// A person's identity on one messaging channel (a WhatsApp number, a
/// Messenger PSID, …).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelUser {
  pub id:                            Option<String>,
  pub person:                        Option<String>,
  pub external_person_reference_id:  Option<String>,
  pub external_person_custom_id:     Option<String>,
  pub external_channel_reference_id: Option<String>,
  pub source_type:                   Option<String>,
  pub source_api:                    Option<String>,
  pub broker:                        Option<String>,
  pub name:                          Option<String>,
  pub username:                      Option<String>,
  pub avatar:                        Option<String>,
  /// Channel-specific profile data, passed through untouched.
  pub payload:                       Option<serde_json::Value>,
  pub created_at:                    Option<DateTime<Utc>>,
  pub updated_at:                    Option<DateTime<Utc>>,
  pub deleted:                       bool,
  initialized:                       bool,
}

impl Entity for ChannelUser {
  type Payload = ChannelUserPayload;

  const KIND: EntityKind = EntityKind::ChannelUser;
  const ENDPOINT: &'static str = "channel_users";

  fn id(&self) -> Option<&str> { self.id.as_deref() }

  fn is_initialized(&self) -> bool { self.initialized }

  fn set_initialized(&mut self, initialized: bool) {
    self.initialized = initialized;
  }

  fn deserialize(&mut self, p: ChannelUserPayload) {
    self.id = p.id;
    self.person = p.person;
    self.external_person_reference_id = p.external_person_reference_id;
    self.external_person_custom_id = p.external_person_custom_id;
    self.external_channel_reference_id = p.external_channel_reference_id;
    self.source_type = p.source_type;
    self.source_api = p.source_api;
    self.broker = p.broker;
    self.name = p.name;
    self.username = p.username;
    self.avatar = p.avatar;
    self.payload = p.payload;
    self.created_at = p.created_at;
    self.updated_at = p.updated_at;
    self.deleted = p.deleted.unwrap_or(false);
  }

  fn serialize_with(&self, _options: &SerializeOptions) -> ChannelUserPayload {
    ChannelUserPayload {
      id:                            self.id.clone(),
      person:                        self.person.clone(),
      external_person_reference_id:  self.external_person_reference_id.clone(),
      external_person_custom_id:     self.external_person_custom_id.clone(),
      external_channel_reference_id: self.external_channel_reference_id.clone(),
      source_type:                   self.source_type.clone(),
      source_api:                    self.source_api.clone(),
      broker:                        self.broker.clone(),
      name:                          self.name.clone(),
      username:                      self.username.clone(),
      avatar:                        self.avatar.clone(),
      payload:                       self.payload.clone(),
      created_at:                    self.created_at,
      updated_at:                    self.updated_at,
      deleted:                       SerializeOptions::deleted(self.deleted),
    }
  }

  fn collection_path(&self, operation: Operation) -> Result<String> {
    person_scoped(self.person.as_deref(), Self::KIND, operation, Self::ENDPOINT)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn address_paths_are_scoped_by_person() {
    let address = Address::create(AddressPayload {
      id: Some("a1".into()),
      person: Some("p1".into()),
      ..Default::default()
    });
    assert_eq!(
      address.resource_path(Operation::Fetch).unwrap(),
      "api/v0/people/p1/addresses/a1"
    );
  }

  #[test]
  fn missing_person_back_reference_is_a_precondition_error() {
    let email = Email::create(EmailPayload {
      id: Some("e1".into()),
      ..Default::default()
    });
    let err = email.resource_path(Operation::Patch).unwrap_err();
    assert!(matches!(
      err,
      Error::Precondition { entity: EntityKind::Email, operation: Operation::Patch, ref missing }
        if missing == &["person"]
    ));
  }

  #[test]
  fn phonenumber_round_trips_its_payload() {
    let payload: PhonenumberPayload = serde_json::from_value(serde_json::json!({
      "id": "ph1",
      "person": "p1",
      "type": "mobile",
      "value": "+4917612345678",
      "created_at": "2021-03-04T10:00:00.000Z",
      "deleted": false,
      "active": true,
    }))
    .unwrap();
    let number = Phonenumber::create(payload.clone());
    assert_eq!(number.kind.as_deref(), Some("mobile"));
    assert_eq!(number.serialize(), payload);
  }
}
