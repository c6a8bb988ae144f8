//! Person: the root customer record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::contact::{
  Address, AddressPayload, ChannelUser, ChannelUserPayload, Email,
  EmailPayload, Phonenumber, PhonenumberPayload,
};
use crate::entity::{
  Entity, EntityKind, SerializeOptions, iso8601, nested, nested_payloads,
};

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonPayload {
  pub id:                  Option<String>,
  pub name:                Option<String>,
  pub first_name:          Option<String>,
  pub middle_name:         Option<String>,
  pub last_name:           Option<String>,
  pub name_preference:     Option<String>,
  pub avatar:              Option<String>,
  pub gender:              Option<String>,
  /// Calendar date (`YYYY-MM-DD`), not a timestamp.
  pub date_of_birth:       Option<String>,
  pub language_preference: Option<String>,
  pub comment:             Option<String>,
  pub tags:                Option<Vec<String>>,
  pub custom_properties:   Option<serde_json::Value>,
  #[serde(with = "iso8601")]
  pub created_at:          Option<DateTime<Utc>>,
  #[serde(with = "iso8601")]
  pub updated_at:          Option<DateTime<Utc>>,
  pub deleted:             Option<bool>,
  pub active:              Option<bool>,
  pub emails:              Option<Vec<EmailPayload>>,
  pub phonenumbers:        Option<Vec<PhonenumberPayload>>,
  pub addresses:           Option<Vec<AddressPayload>>,
  pub channel_users:       Option<Vec<ChannelUserPayload>>,
}

/// A customer of the tenant.
///
/// The nested contact collections are owned by the person, but every item is
/// an entity in its own right: it carries the person's id and can be fetched
/// or patched through its own endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
  pub id:                  Option<String>,
  pub name:                Option<String>,
  pub first_name:          Option<String>,
  pub middle_name:         Option<String>,
  pub last_name:           Option<String>,
  pub name_preference:     Option<String>,
  pub avatar:              Option<String>,
  pub gender:              Option<String>,
  pub date_of_birth:       Option<String>,
  pub language_preference: Option<String>,
  pub comment:             Option<String>,
  pub tags:                Option<Vec<String>>,
  pub custom_properties:   Option<serde_json::Value>,
  pub created_at:          Option<DateTime<Utc>>,
  pub updated_at:          Option<DateTime<Utc>>,
  pub deleted:             bool,
  pub active:              Option<bool>,
  pub emails:              Option<Vec<Email>>,
  pub phonenumbers:        Option<Vec<Phonenumber>>,
  pub addresses:           Option<Vec<Address>>,
  pub channel_users:       Option<Vec<ChannelUser>>,
  initialized:             bool,
}

impl Person {
  /// A display name: the explicit `name`, else first and last name joined.
  pub fn display_name(&self) -> Option<String> {
    if let Some(name) = &self.name {
      return Some(name.clone());
    }
    let parts: Vec<&str> = [&self.first_name, &self.last_name]
      .into_iter()
      .filter_map(|p| p.as_deref())
      .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
  }

  pub fn channel_user(&self, id: &str) -> Option<&ChannelUser> {
    self
      .channel_users
      .as_deref()?
      .iter()
      .find(|cu| cu.id.as_deref() == Some(id))
  }
}

impl Entity for Person {
  type Payload = PersonPayload;

  const KIND: EntityKind = EntityKind::Person;
  const ENDPOINT: &'static str = "api/v0/people";
  const RELATIONS: &'static [&'static str] =
    &["emails", "phonenumbers", "addresses", "channel_users"];

  fn id(&self) -> Option<&str> { self.id.as_deref() }

  fn is_initialized(&self) -> bool { self.initialized }

  fn set_initialized(&mut self, initialized: bool) {
    self.initialized = initialized;
  }

  fn deserialize(&mut self, p: PersonPayload) {
    self.id = p.id;
    self.name = p.name;
    self.first_name = p.first_name;
    self.middle_name = p.middle_name;
    self.last_name = p.last_name;
    self.name_preference = p.name_preference;
    self.avatar = p.avatar;
    self.gender = p.gender;
    self.date_of_birth = p.date_of_birth;
    self.language_preference = p.language_preference;
    self.comment = p.comment;
    self.tags = p.tags;
    self.custom_properties = p.custom_properties;
    self.created_at = p.created_at;
    self.updated_at = p.updated_at;
    self.deleted = p.deleted.unwrap_or(false);
    self.active = p.active;

    let init = self.initialized;
    if let Some(emails) = p.emails {
      self.emails = Some(nested(emails, init));
    }
    if let Some(numbers) = p.phonenumbers {
      self.phonenumbers = Some(nested(numbers, init));
    }
    if let Some(addresses) = p.addresses {
      self.addresses = Some(nested(addresses, init));
    }
    if let Some(channel_users) = p.channel_users {
      self.channel_users = Some(nested(channel_users, init));
    }
  }

  fn serialize_with(&self, options: &SerializeOptions) -> PersonPayload {
    PersonPayload {
      id:                  self.id.clone(),
      name:                self.name.clone(),
      first_name:          self.first_name.clone(),
      middle_name:         self.middle_name.clone(),
      last_name:           self.last_name.clone(),
      name_preference:     self.name_preference.clone(),
      avatar:              self.avatar.clone(),
      gender:              self.gender.clone(),
      date_of_birth:       self.date_of_birth.clone(),
      language_preference: self.language_preference.clone(),
      comment:             self.comment.clone(),
      tags:                self.tags.clone(),
      custom_properties:   self.custom_properties.clone(),
      created_at:          self.created_at,
      updated_at:          self.updated_at,
      deleted:             SerializeOptions::deleted(self.deleted),
      active:              options.active(self.active),
      emails:              self.emails.as_deref().map(|e| nested_payloads(e, options)),
      phonenumbers:        self.phonenumbers.as_deref().map(|p| nested_payloads(p, options)),
      addresses:           self.addresses.as_deref().map(|a| nested_payloads(a, options)),
      channel_users:       self.channel_users.as_deref().map(|c| nested_payloads(c, options)),
    }
  }
}
