//! Realtime connection seam and per-aggregate watchers.
//!
//! One [`RealtimeClient`] connection is shared by every watcher. Each
//! [`Watcher`] subscribes its aggregate's topics, classifies every inbound
//! message through its [`Dispatch`], and fans the typed events out on its
//! own broadcast channel.

use std::{collections::HashMap, future::Future, sync::Arc};

use agora_core::{
  realtime::{
    FeedEvent, PersonEvent, RealtimeMessage, UniverseEvent, classify_feed,
    classify_person, classify_universe, feed_topics, person_topics,
    universe_topics,
  },
  topics::filter_matches,
};
use serde_json::Value;
use thiserror::Error;
use tokio::{
  sync::{Mutex, broadcast},
  task::JoinHandle,
};

use crate::RemoteError;

/// Buffered events per watcher before slow receivers start lagging.
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum RealtimeError {
  #[error("realtime connection is closed")]
  Closed,

  #[error("realtime transport error: {0}")]
  Transport(String),
}

// ─── RealtimeClient ──────────────────────────────────────────────────────────

/// A publish/subscribe connection to the realtime service.
pub trait RealtimeClient: Send + Sync + 'static {
  fn subscribe<'a>(
    &'a self,
    topics: &'a [String],
  ) -> impl Future<Output = Result<(), RealtimeError>> + Send + 'a;

  fn unsubscribe<'a>(
    &'a self,
    topics: &'a [String],
  ) -> impl Future<Output = Result<(), RealtimeError>> + Send + 'a;

  fn publish<'a>(
    &'a self,
    topic: &'a str,
    payload: Option<Value>,
  ) -> impl Future<Output = Result<(), RealtimeError>> + Send + 'a;

  /// Every message delivered on the connection, in arrival order.
  fn messages(&self) -> broadcast::Receiver<RealtimeMessage>;

  /// Close the connection. Further calls fail with
  /// [`RealtimeError::Closed`].
  fn destroy(&self) -> impl Future<Output = Result<(), RealtimeError>> + Send + '_;
}

// ─── MemoryRealtime ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Registry {
  /// Filter → number of active subscriptions.
  filters: HashMap<String, usize>,
  closed:  bool,
}

/// In-process loopback connection: a published message is delivered back to
/// the connection when one of its subscribed filters matches.
pub struct MemoryRealtime {
  registry: Mutex<Registry>,
  sender:   broadcast::Sender<RealtimeMessage>,
}

impl Default for MemoryRealtime {
  fn default() -> Self { Self::new() }
}

impl MemoryRealtime {
  pub fn new() -> Self {
    let (sender, _) = broadcast::channel(EVENT_CAPACITY);
    Self { registry: Mutex::new(Registry::default()), sender }
  }

  /// Currently subscribed filters, sorted.
  pub async fn subscriptions(&self) -> Vec<String> {
    let registry = self.registry.lock().await;
    let mut filters: Vec<_> = registry.filters.keys().cloned().collect();
    filters.sort();
    filters
  }

  pub async fn is_closed(&self) -> bool { self.registry.lock().await.closed }
}

impl RealtimeClient for MemoryRealtime {
  async fn subscribe<'a>(&'a self, topics: &'a [String]) -> Result<(), RealtimeError> {
    let mut registry = self.registry.lock().await;
    if registry.closed {
      return Err(RealtimeError::Closed);
    }
    for topic in topics {
      *registry.filters.entry(topic.clone()).or_default() += 1;
    }
    tracing::debug!(?topics, "realtime subscribe");
    Ok(())
  }

  async fn unsubscribe<'a>(&'a self, topics: &'a [String]) -> Result<(), RealtimeError> {
    let mut registry = self.registry.lock().await;
    if registry.closed {
      return Err(RealtimeError::Closed);
    }
    for topic in topics {
      if let Some(count) = registry.filters.get_mut(topic) {
        *count -= 1;
        if *count == 0 {
          registry.filters.remove(topic);
        }
      }
    }
    tracing::debug!(?topics, "realtime unsubscribe");
    Ok(())
  }

  async fn publish<'a>(
    &'a self,
    topic: &'a str,
    payload: Option<Value>,
  ) -> Result<(), RealtimeError> {
    let registry = self.registry.lock().await;
    if registry.closed {
      return Err(RealtimeError::Closed);
    }
    if registry.filters.keys().any(|f| filter_matches(f, topic)) {
      let payload = payload.unwrap_or_else(|| Value::Object(Default::default()));
      let msg = RealtimeMessage::new(topic, payload);
      // No receivers just means nobody is listening yet.
      let _ = self.sender.send(msg);
    }
    Ok(())
  }

  fn messages(&self) -> broadcast::Receiver<RealtimeMessage> {
    self.sender.subscribe()
  }

  async fn destroy(&self) -> Result<(), RealtimeError> {
    let mut registry = self.registry.lock().await;
    registry.filters.clear();
    registry.closed = true;
    tracing::debug!("realtime connection destroyed");
    Ok(())
  }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// How one aggregate maps the connection's messages to its own events.
pub trait Dispatch: Send + Sync + 'static {
  type Event: Clone + Send + std::fmt::Debug + 'static;

  /// Topics subscribed on `init`.
  fn topics(&self) -> Vec<String>;

  fn classify(&self, msg: &RealtimeMessage) -> Option<Self::Event>;

  fn event_name(event: &Self::Event) -> &'static str;
}

pub struct UniverseDispatch {
  pub client_id: String,
}

impl Dispatch for UniverseDispatch {
  type Event = UniverseEvent;

  fn topics(&self) -> Vec<String> { universe_topics(&self.client_id) }

  fn classify(&self, msg: &RealtimeMessage) -> Option<UniverseEvent> {
    classify_universe(msg, &self.client_id)
  }

  fn event_name(event: &UniverseEvent) -> &'static str { event.name() }
}

pub struct FeedDispatch {
  pub feed_id: String,
}

impl Dispatch for FeedDispatch {
  type Event = FeedEvent;

  fn topics(&self) -> Vec<String> { feed_topics(&self.feed_id) }

  fn classify(&self, msg: &RealtimeMessage) -> Option<FeedEvent> {
    classify_feed(msg, &self.feed_id)
  }

  fn event_name(event: &FeedEvent) -> &'static str { event.name() }
}

pub struct PersonDispatch {
  pub person_id: String,
}

impl Dispatch for PersonDispatch {
  type Event = PersonEvent;

  fn topics(&self) -> Vec<String> { person_topics(&self.person_id) }

  fn classify(&self, msg: &RealtimeMessage) -> Option<PersonEvent> {
    classify_person(msg, &self.person_id)
  }

  fn event_name(event: &PersonEvent) -> &'static str { event.name() }
}

// ─── Watcher ─────────────────────────────────────────────────────────────────

/// Classify `msg` and broadcast the result to `events`' receivers.
fn dispatch_one<D: Dispatch>(
  dispatch: &D,
  events: &broadcast::Sender<D::Event>,
  msg: &RealtimeMessage,
) -> Option<D::Event> {
  let event = dispatch.classify(msg)?;
  tracing::trace!(topic = %msg.topic, event = D::event_name(&event), "dispatching");
  // Sending with no receivers fails; nobody listening is fine.
  let _ = events.send(event.clone());
  Some(event)
}

/// Realtime subscription for one aggregate.
///
/// `Unsubscribed` until [`init`](Self::init), `Listening` until
/// [`deinitialize`](Self::deinitialize). Calling `init` while already
/// listening, or `deinitialize` while not, does nothing.
///
/// Besides its events a watcher carries an error channel. Watchers handed
/// out by a [`Universe`](crate::Universe) share the universe's, which sees
/// every remote error raised through it.
pub struct Watcher<D: Dispatch, R: RealtimeClient> {
  dispatch: Arc<D>,
  realtime: Arc<R>,
  events:   broadcast::Sender<D::Event>,
  errors:   broadcast::Sender<Arc<RemoteError>>,
  listener: Option<JoinHandle<()>>,
}

impl<D: Dispatch, R: RealtimeClient> Watcher<D, R> {
  pub fn new(dispatch: D, realtime: Arc<R>) -> Self {
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    let (errors, _) = broadcast::channel(EVENT_CAPACITY);
    Self {
      dispatch: Arc::new(dispatch),
      realtime,
      events,
      errors,
      listener: None,
    }
  }

  /// Report errors on `errors` instead of a private channel.
  pub(crate) fn with_errors(mut self, errors: broadcast::Sender<Arc<RemoteError>>) -> Self {
    self.errors = errors;
    self
  }

  pub fn dispatch(&self) -> &D { &self.dispatch }

  pub fn is_listening(&self) -> bool { self.listener.is_some() }

  /// A receiver for every event dispatched from now on.
  pub fn subscribe(&self) -> broadcast::Receiver<D::Event> { self.events.subscribe() }

  /// A receiver for every remote error reported from now on.
  pub fn errors(&self) -> broadcast::Receiver<Arc<RemoteError>> { self.errors.subscribe() }

  pub async fn init(&mut self) -> Result<(), RealtimeError> {
    if self.listener.is_some() {
      return Ok(());
    }
    self.realtime.subscribe(&self.dispatch.topics()).await?;

    let mut messages = self.realtime.messages();
    let dispatch = Arc::clone(&self.dispatch);
    let events = self.events.clone();
    self.listener = Some(tokio::spawn(async move {
      loop {
        match messages.recv().await {
          Ok(msg) => {
            dispatch_one(&*dispatch, &events, &msg);
          }
          Err(broadcast::error::RecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "realtime listener lagged; messages dropped");
          }
          Err(broadcast::error::RecvError::Closed) => break,
        }
      }
    }));
    Ok(())
  }

  /// Classify one message synchronously and fan it out. Returns the event,
  /// or `None` for topics this aggregate does not handle.
  pub fn handle_message(&self, msg: &RealtimeMessage) -> Option<D::Event> {
    dispatch_one(&*self.dispatch, &self.events, msg)
  }

  /// Stop listening, unsubscribe, and close every outstanding event
  /// receiver. Topics are only released by a watcher that holds them, so
  /// a connection shared with other watchers keeps their subscriptions.
  pub async fn deinitialize(&mut self) -> Result<(), RealtimeError> {
    let Some(listener) = self.listener.take() else {
      return Ok(());
    };
    listener.abort();
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    self.events = events;
    self.realtime.unsubscribe(&self.dispatch.topics()).await
  }
}

impl<D: Dispatch, R: RealtimeClient> Drop for Watcher<D, R> {
  fn drop(&mut self) {
    if let Some(listener) = self.listener.take() {
      listener.abort();
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[tokio::test]
  async fn loopback_delivers_only_subscribed_topics() {
    let realtime = MemoryRealtime::new();
    let mut rx = realtime.messages();
    realtime
      .subscribe(&["api/feeds/+/messages".to_owned()])
      .await
      .unwrap();

    realtime.publish("api/people/p1", None).await.unwrap();
    realtime
      .publish("api/feeds/f1/messages", Some(json!({ "n": 1 })))
      .await
      .unwrap();

    let msg = rx.recv().await.unwrap();
    assert_eq!(msg.topic, "api/feeds/f1/messages");
    assert_eq!(msg.payload["n"], 1);
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn overlapping_subscriptions_are_counted() {
    let realtime = MemoryRealtime::new();
    let topic = vec!["api/message".to_owned()];
    realtime.subscribe(&topic).await.unwrap();
    realtime.subscribe(&topic).await.unwrap();
    realtime.unsubscribe(&topic).await.unwrap();
    assert_eq!(realtime.subscriptions().await, topic);
    realtime.unsubscribe(&topic).await.unwrap();
    assert!(realtime.subscriptions().await.is_empty());
  }

  #[tokio::test]
  async fn destroyed_connection_rejects_calls() {
    let realtime = MemoryRealtime::new();
    realtime.destroy().await.unwrap();
    assert!(realtime.is_closed().await);
    assert!(matches!(
      realtime.publish("api/message", None).await,
      Err(RealtimeError::Closed)
    ));
    assert!(matches!(
      realtime.subscribe(&["api/message".to_owned()]).await,
      Err(RealtimeError::Closed)
    ));
  }

  #[tokio::test]
  async fn watcher_lifecycle() {
    let realtime = Arc::new(MemoryRealtime::new());
    let mut watcher = Watcher::new(
      FeedDispatch { feed_id: "f1".into() },
      Arc::clone(&realtime),
    );
    assert!(!watcher.is_listening());

    watcher.init().await.unwrap();
    watcher.init().await.unwrap();
    assert!(watcher.is_listening());
    assert_eq!(
      realtime.subscriptions().await,
      vec!["api/feeds/f1/events", "api/feeds/f1/messages"]
    );

    let mut events = watcher.subscribe();
    realtime
      .publish("api/feeds/f1/messages", Some(json!({ "message": { "id": "m1" } })))
      .await
      .unwrap();
    let event = events.recv().await.unwrap();
    assert_eq!(event.name(), "feed:message");

    watcher.deinitialize().await.unwrap();
    assert!(!watcher.is_listening());
    assert!(events.recv().await.is_err());
    assert!(realtime.subscriptions().await.is_empty());
  }

  #[tokio::test]
  async fn teardown_keeps_a_sibling_watchers_topics() {
    let realtime = Arc::new(MemoryRealtime::new());
    let feed = || FeedDispatch { feed_id: "f1".into() };
    let mut first = Watcher::new(feed(), Arc::clone(&realtime));
    let mut second = Watcher::new(feed(), Arc::clone(&realtime));
    first.init().await.unwrap();
    second.init().await.unwrap();

    second.deinitialize().await.unwrap();
    second.deinitialize().await.unwrap();
    let mut never_started = Watcher::new(feed(), Arc::clone(&realtime));
    never_started.deinitialize().await.unwrap();

    assert_eq!(
      realtime.subscriptions().await,
      vec!["api/feeds/f1/events", "api/feeds/f1/messages"]
    );
    let mut events = first.subscribe();
    realtime.publish("api/feeds/f1/events", None).await.unwrap();
    assert_eq!(events.recv().await.unwrap().name(), "feed:event");
  }

  #[test]
  fn handle_message_without_receivers_still_classifies() {
    let watcher = Watcher::new(
      PersonDispatch { person_id: "p1".into() },
      Arc::new(MemoryRealtime::new()),
    );
    let msg = RealtimeMessage::new("api/people/p1", json!({}));
    assert!(watcher.handle_message(&msg).is_some());
    let other = RealtimeMessage::new("api/people/p2", json!({}));
    assert!(watcher.handle_message(&other).is_none());
  }
}
