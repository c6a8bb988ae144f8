//! Feed timelines.

use agora_core::{
  Entity, Operation,
  entities::{Event, EventPayload, EventType, Feed},
};
use serde_json::Value;

use crate::{
  Result,
  remote::{ListQuery, Remote},
  transport::{ApiRequest, Transport},
};

impl<T: Transport> Remote<'_, T, Feed> {
  /// Fetch a page of `feed`'s events and merge them into the events it
  /// already holds. Returns every event held after the merge.
  pub async fn fetch_events(&self, feed: &mut Feed, query: &ListQuery) -> Result<Vec<Event>> {
    let path = feed.events_path(Operation::FetchEvents)?;
    self.load_events(feed, ApiRequest::get(path).query(query.pairs())).await
  }

  /// Like [`fetch_events`](Self::fetch_events), newest first.
  pub async fn fetch_latest_events(&self, feed: &mut Feed, limit: u32) -> Result<Vec<Event>> {
    let path = format!("{}/latest", feed.events_path(Operation::FetchEvents)?);
    let query = ListQuery::limit(limit);
    self.load_events(feed, ApiRequest::get(path).query(query.pairs())).await
  }

  async fn load_events(&self, feed: &mut Feed, request: ApiRequest) -> Result<Vec<Event>> {
    let resp = self.send(request, Operation::FetchEvents).await?;
    let payloads = resp
      .items::<EventPayload>()
      .map_err(self.context().fail(Feed::KIND, Operation::FetchEvents))?;
    let fetched = payloads.into_iter().map(Event::create);
    Ok(feed.upsert_events(fetched))
  }

  /// Post a new event of `kind` to `feed` and add it to the feed's events.
  pub async fn create_event(
    &self,
    feed: &mut Feed,
    kind: EventType,
    resource: Option<Value>,
  ) -> Result<Event> {
    let op = Operation::CreateEvent;
    let path = feed.events_path(op)?;
    let payload = EventPayload {
      feed: feed.id.clone(),
      kind: Some(kind.as_str().to_owned()),
      resource,
      ..Default::default()
    };
    let body = serde_json::to_value(payload).map_err(agora_core::Error::from)?;

    let resp = self.send(ApiRequest::post(path).json(body), op).await?;
    let event = Event::create(resp.first().map_err(self.context().fail(Feed::KIND, op))?);
    feed.upsert_events([event.clone()]);
    Ok(event)
  }
}
