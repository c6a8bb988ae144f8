//! The root aggregate.

use std::sync::Arc;

use agora_core::{
  Entity, Operation,
  entities::{
    Cart, CartPayload, Deal, DealPayload, Event, EventPayload, Feed, FeedPayload,
    Message, MessagePayload, MessageTemplate, MessageTemplatePayload, Order,
    OrderPayload, Person, PersonPayload,
  },
  realtime::{RealtimeMessage, UniverseEvent},
  topics::{self, CLIENT_ID, TopicData},
};
use tokio::sync::broadcast;

use crate::{
  RemoteError, Result,
  config::ClientConfig,
  realtime::{FeedDispatch, PersonDispatch, RealtimeClient, UniverseDispatch, Watcher},
  remote::{Context, Remote},
  transport::{HttpTransport, Transport},
};

/// One tenant's view of the platform: entity factories, remote collections
/// and the tenant-wide realtime stream.
pub struct Universe<T: Transport, R: RealtimeClient> {
  ctx:       Context<T>,
  realtime:  Arc<R>,
  client_id: String,
  watcher:   Watcher<UniverseDispatch, R>,
}

impl<R: RealtimeClient> Universe<HttpTransport, R> {
  /// A universe talking HTTP to `config.base_url`.
  pub fn connect(config: &ClientConfig, realtime: Arc<R>) -> Result<Self> {
    Ok(Self::new(config, HttpTransport::new(config)?, realtime))
  }
}

impl<T: Transport, R: RealtimeClient> Universe<T, R> {
  pub fn new(config: &ClientConfig, transport: T, realtime: Arc<R>) -> Self {
    let client_id = config
      .client_id
      .clone()
      .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let ctx = Context::new(transport, config.serialize_options());
    let watcher = Watcher::new(
      UniverseDispatch { client_id: client_id.clone() },
      Arc::clone(&realtime),
    )
    .with_errors(ctx.error_sender());
    Self { ctx, realtime, client_id, watcher }
  }

  pub fn client_id(&self) -> &str { &self.client_id }

  pub fn context(&self) -> &Context<T> { &self.ctx }

  pub fn realtime(&self) -> &Arc<R> { &self.realtime }

  // ─── Factories ─────────────────────────────────────────────────────────────

  pub fn person(&self, payload: PersonPayload) -> Person { Person::create(payload) }

  pub fn cart(&self, payload: CartPayload) -> Cart { Cart::create(payload) }

  pub fn order(&self, payload: OrderPayload) -> Order { Order::create(payload) }

  pub fn deal(&self, payload: DealPayload) -> Deal { Deal::create(payload) }

  pub fn feed(&self, payload: FeedPayload) -> Feed { Feed::create(payload) }

  pub fn event(&self, payload: EventPayload) -> Event { Event::create(payload) }

  pub fn message(&self, payload: MessagePayload) -> Message { Message::create(payload) }

  pub fn message_template(&self, payload: MessageTemplatePayload) -> MessageTemplate {
    MessageTemplate::create(payload)
  }

  // ─── Collections ───────────────────────────────────────────────────────────

  pub fn people(&self) -> Remote<'_, T, Person> { Remote::new(&self.ctx) }

  pub fn carts(&self) -> Remote<'_, T, Cart> { Remote::new(&self.ctx) }

  pub fn orders(&self) -> Remote<'_, T, Order> { Remote::new(&self.ctx) }

  pub fn deals(&self) -> Remote<'_, T, Deal> { Remote::new(&self.ctx) }

  pub fn feeds(&self) -> Remote<'_, T, Feed> { Remote::new(&self.ctx) }

  pub fn messages(&self) -> Remote<'_, T, Message> { Remote::new(&self.ctx) }

  pub fn message_templates(&self) -> Remote<'_, T, MessageTemplate> {
    Remote::new(&self.ctx)
  }

  // ─── Realtime ──────────────────────────────────────────────────────────────

  /// Subscribe to the universe topics and start dispatching.
  pub async fn init(&mut self) -> Result<()> {
    self.watcher.init().await?;
    tracing::debug!(client_id = %self.client_id, "universe listening");
    Ok(())
  }

  /// Unsubscribe, close every event receiver and destroy the shared
  /// realtime connection. The connection is destroyed even when
  /// unsubscribing fails; the first failure is returned.
  pub async fn deinitialize(&mut self) -> Result<()> {
    let unsubscribed = self.watcher.deinitialize().await;
    let destroyed = self.realtime.destroy().await;
    tracing::debug!(client_id = %self.client_id, "universe closed");
    unsubscribed.and(destroyed)?;
    Ok(())
  }

  pub fn is_listening(&self) -> bool { self.watcher.is_listening() }

  pub fn handle_message(&self, msg: &RealtimeMessage) -> Option<UniverseEvent> {
    self.watcher.handle_message(msg)
  }

  pub fn events(&self) -> broadcast::Receiver<UniverseEvent> { self.watcher.subscribe() }

  /// Every remote error raised through this universe from now on, in
  /// addition to the `Err` its caller receives.
  pub fn errors(&self) -> broadcast::Receiver<Arc<RemoteError>> { self.ctx.errors() }

  /// Ask the platform to start pushing this client's realtime traffic.
  pub async fn arm(&self) -> Result<()> {
    let data = TopicData::new().with(CLIENT_ID, self.client_id.as_str());
    let topic = topics::CLIENT_ARM.generate(Some(&data));
    self.realtime.publish(&topic, None).await?;
    Ok(())
  }

  /// A watcher for one feed's messages and events, on the shared connection.
  pub fn watch_feed(&self, feed: &Feed) -> Result<Watcher<FeedDispatch, R>> {
    let feed_id = feed.require_id(Operation::Init)?.to_owned();
    let watcher = Watcher::new(FeedDispatch { feed_id }, Arc::clone(&self.realtime));
    Ok(watcher.with_errors(self.ctx.error_sender()))
  }

  /// A watcher for changes to one person, on the shared connection.
  pub fn watch_person(&self, person: &Person) -> Result<Watcher<PersonDispatch, R>> {
    let person_id = person.require_id(Operation::Init)?.to_owned();
    let watcher = Watcher::new(PersonDispatch { person_id }, Arc::clone(&self.realtime));
    Ok(watcher.with_errors(self.ctx.error_sender()))
  }
}
