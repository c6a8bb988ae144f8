//! Person-specific remote operations: sub-resource relations, merging and
//! notification previews.

use agora_core::{
  Entity, EntityKind, Operation,
  entities::{Address, Cart, ChannelUser, Deal, Email, Person, Phonenumber},
};
use serde_json::{Value, json};

use crate::{
  Result,
  remote::{Relation, Remote},
  transport::{ApiRequest, Transport},
};

impl<'a, T: Transport> Remote<'a, T, Person> {
  fn relation<E: Entity>(&self, person: &Person, segment: &str) -> Result<Relation<'a, T, E>> {
    let base = person.resource_path(Operation::FetchAll)?;
    Ok(Relation::new(self.context(), format!("{base}/{segment}")))
  }

  pub fn addresses(&self, person: &Person) -> Result<Relation<'a, T, Address>> {
    self.relation(person, "addresses")
  }

  pub fn phonenumbers(&self, person: &Person) -> Result<Relation<'a, T, Phonenumber>> {
    self.relation(person, "phonenumbers")
  }

  pub fn emails(&self, person: &Person) -> Result<Relation<'a, T, Email>> {
    self.relation(person, "emails")
  }

  pub fn channel_users(&self, person: &Person) -> Result<Relation<'a, T, ChannelUser>> {
    self.relation(person, "channel_users")
  }

  pub fn carts(&self, person: &Person) -> Result<Relation<'a, T, Cart>> {
    self.relation(person, "carts")
  }

  pub fn deals(&self, person: &Person) -> Result<Relation<'a, T, Deal>> {
    self.relation(person, "deals")
  }

  /// Merge `mergeables` into `person`; the server answers with the
  /// surviving record.
  pub async fn merge(&self, person: &Person, mergeables: &[Person]) -> Result<Person> {
    let path = format!("{}/merge", person.resource_path(Operation::Merge)?);
    let ids = mergeables
      .iter()
      .map(|m| m.require_id(Operation::Merge).map(str::to_owned))
      .collect::<agora_core::Result<Vec<_>>>()?;

    let request = ApiRequest::post(path).json(Value::from(ids));
    let resp = self.send(request, Operation::Merge).await?;
    self.decode_one(&resp, Operation::Merge)
  }

  /// Render `template_id` for one of `person`'s channel users without
  /// sending it.
  ///
  /// All three ids are required; when any is missing the error lists every
  /// missing one and nothing is sent.
  pub async fn preview_notification(
    &self,
    person: &Person,
    channel_user_id: Option<&str>,
    template_id: Option<&str>,
    language: Option<&str>,
  ) -> Result<Value> {
    let op = Operation::PreviewNotification;
    let (Some(person_id), Some(channel_user_id), Some(template_id)) =
      (person.id(), channel_user_id, template_id)
    else {
      let missing = [
        ("id", person.id().is_none()),
        ("channel_user", channel_user_id.is_none()),
        ("template", template_id.is_none()),
      ]
      .into_iter()
      .filter_map(|(field, absent)| absent.then_some(field))
      .collect();
      return Err(
        agora_core::Error::Precondition { entity: EntityKind::Person, operation: op, missing }
          .into(),
      );
    };

    let path = format!(
      "{}/{person_id}/channel_users/{channel_user_id}/notifications/templates/{template_id}/preview",
      Person::ENDPOINT
    );
    let mut body = json!({});
    if let Some(language) = language {
      body["language"] = Value::from(language);
    }

    let resp = self.send(ApiRequest::post(path).json(body), op).await?;
    resp
      .first::<Value>()
      .map_err(self.context().fail(EntityKind::Person, op))
  }
}
