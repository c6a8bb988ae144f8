//! Messages exchanged in feeds and the templates used to send notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{
  Result,
  entity::{Entity, EntityKind, Operation, SerializeOptions, iso8601},
};

// ─── Message ─────────────────────────────────────────────────────────────────

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageContent {
  pub body:        Option<String>,
  pub attachments: Option<Vec<serde_json::Value>>,
  /// Structured content (buttons, cards, …) in the channel's own shape.
  pub payload:     Option<serde_json::Value>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageAuthor {
  /// Staff user id, for outbound messages.
  pub user:   Option<String>,
  /// Person id, for inbound messages.
  pub person: Option<String>,
  pub name:   Option<String>,
  pub avatar: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagePayload {
  pub id:                    Option<String>,
  pub feed:                  Option<String>,
  pub person:                Option<String>,
  pub source_type:           Option<String>,
  pub source_api:            Option<String>,
  pub broker:                Option<String>,
  pub external_reference_id: Option<String>,
  pub tz:                    Option<String>,
  #[serde(with = "iso8601")]
  pub date:                  Option<DateTime<Utc>>,
  pub content:               Option<MessageContent>,
  pub author:                Option<MessageAuthor>,
  pub raw_payload:           Option<serde_json::Value>,
  #[serde(with = "iso8601")]
  pub created_at:            Option<DateTime<Utc>>,
  #[serde(with = "iso8601")]
  pub updated_at:            Option<DateTime<Utc>>,
  pub deleted:               Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
  pub id:                    Option<String>,
  pub feed:                  Option<String>,
  pub person:                Option<String>,
  pub source_type:           Option<String>,
  pub source_api:            Option<String>,
  pub broker:                Option<String>,
  pub external_reference_id: Option<String>,
  pub tz:                    Option<String>,
  /// When the message was sent, as reported by the channel.
  pub date:                  Option<DateTime<Utc>>,
  pub content:               Option<MessageContent>,
  pub author:                Option<MessageAuthor>,
  pub raw_payload:           Option<serde_json::Value>,
  pub created_at:            Option<DateTime<Utc>>,
  pub updated_at:            Option<DateTime<Utc>>,
  pub deleted:               bool,
  initialized:               bool,
}

impl Message {
  pub fn body(&self) -> Option<&str> { self.content.as_ref()?.body.as_deref() }

  /// `api/v0/messages/{id}/reply`
  pub fn reply_path(&self) -> Result<String> {
    Ok(format!("{}/reply", self.resource_path(Operation::Reply)?))
  }
}

impl Entity for Message {
  type Payload = MessagePayload;

  const KIND: EntityKind = EntityKind::Message;
  const ENDPOINT: &'static str = "api/v0/messages";

  fn id(&self) -> Option<&str> { self.id.as_deref() }

  fn is_initialized(&self) -> bool { self.initialized }

  fn set_initialized(&mut self, initialized: bool) {
    self.initialized = initialized;
  }

  fn deserialize(&mut self, p: MessagePayload) {
    self.id = p.id;
    self.feed = p.feed;
    self.person = p.person;
    self.source_type = p.source_type;
    self.source_api = p.source_api;
    self.broker = p.broker;
    self.external_reference_id = p.external_reference_id;
    self.tz = p.tz;
    self.date = p.date;
    self.content = p.content;
    self.author = p.author;
    self.raw_payload = p.raw_payload;
    self.created_at = p.created_at;
    self.updated_at = p.updated_at;
    self.deleted = p.deleted.unwrap_or(false);
  }

  fn serialize_with(&self, _options: &SerializeOptions) -> MessagePayload {
    MessagePayload {
      id:                    self.id.clone(),
      feed:                  self.feed.clone(),
      person:                self.person.clone(),
      source_type:           self.source_type.clone(),
      source_api:            self.source_api.clone(),
      broker:                self.broker.clone(),
      external_reference_id: self.external_reference_id.clone(),
      tz:                    self.tz.clone(),
      date:                  self.date,
      content:               self.content.clone(),
      author:                self.author.clone(),
      raw_payload:           self.raw_payload.clone(),
      created_at:            self.created_at,
      updated_at:            self.updated_at,
      deleted:               SerializeOptions::deleted(self.deleted),
    }
  }
}

// ─── MessageTemplate ─────────────────────────────────────────────────────────

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTemplatePayload {
  pub id:            Option<String>,
  pub name:          Option<String>,
  pub comment:       Option<String>,
  pub content:       Option<serde_json::Value>,
  pub configuration: Option<serde_json::Value>,
  pub notification:  Option<serde_json::Value>,
  pub approved:      Option<bool>,
  pub tags:          Option<Vec<String>>,
  #[serde(with = "iso8601")]
  pub created_at:    Option<DateTime<Utc>>,
  #[serde(with = "iso8601")]
  pub updated_at:    Option<DateTime<Utc>>,
  pub deleted:       Option<bool>,
  pub active:        Option<bool>,
}

/// A pre-approved notification template, rendered per channel user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageTemplate {
  pub id:            Option<String>,
  pub name:          Option<String>,
  pub comment:       Option<String>,
  /// Per-language template bodies.
  pub content:       Option<serde_json::Value>,
  pub configuration: Option<serde_json::Value>,
  pub notification:  Option<serde_json::Value>,
  pub approved:      Option<bool>,
  pub tags:          Option<Vec<String>>,
  pub created_at:    Option<DateTime<Utc>>,
  pub updated_at:    Option<DateTime<Utc>>,
  pub deleted:       bool,
  pub active:        Option<bool>,
  initialized:       bool,
}

impl Entity for MessageTemplate {
  type Payload = MessageTemplatePayload;

  const KIND: EntityKind = EntityKind::MessageTemplate;
  const ENDPOINT: &'static str = "api/v0/message_templates";

  fn id(&self) -> Option<&str> { self.id.as_deref() }

  fn is_initialized(&self) -> bool { self.initialized }

  fn set_initialized(&mut self, initialized: bool) {
    self.initialized = initialized;
  }

  fn deserialize(&mut self, p: MessageTemplatePayload) {
    self.id = p.id;
    self.name = p.name;
    self.comment = p.comment;
    self.content = p.content;
    self.configuration = p.configuration;
    self.notification = p.notification;
    self.approved = p.approved;
    self.tags = p.tags;
    self.created_at = p.created_at;
    self.updated_at = p.updated_at;
    self.deleted = p.deleted.unwrap_or(false);
    self.active = p.active;
  }

  fn serialize_with(&self, options: &SerializeOptions) -> MessageTemplatePayload {
    MessageTemplatePayload {
      id:            self.id.clone(),
      name:          self.name.clone(),
      comment:       self.comment.clone(),
      content:       self.content.clone(),
      configuration: self.configuration.clone(),
      notification:  self.notification.clone(),
      approved:      self.approved,
      tags:          self.tags.clone(),
      created_at:    self.created_at,
      updated_at:    self.updated_at,
      deleted:       SerializeOptions::deleted(self.deleted),
      active:        options.active(self.active),
    }
  }
}
