//! Remote operations shared by every entity type.
//!
//! A [`Remote`] is a cheap, borrowed handle pairing the shared [`Context`]
//! with one collection path. All operations check their local
//! preconditions first; a request is sent only once they hold, and any
//! failure after that point comes back as a [`RemoteError`] tagged with the
//! entity and operation.
//!
//! [`RemoteError`]: crate::RemoteError

use std::{marker::PhantomData, sync::Arc};

use agora_core::{Entity, EntityKind, Operation, SerializeOptions};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::{
  Error, RemoteError, Result,
  transport::{ApiRequest, ApiResponse, Transport, TransportError},
};

/// Buffered remote errors before slow error listeners start lagging.
const ERROR_CAPACITY: usize = 64;

/// Transport, serialization settings and the error channel shared by
/// everything a universe hands out.
pub struct Context<T> {
  transport: T,
  options:   SerializeOptions,
  errors:    broadcast::Sender<Arc<RemoteError>>,
}

impl<T: Transport> Context<T> {
  pub fn new(transport: T, options: SerializeOptions) -> Self {
    let (errors, _) = broadcast::channel(ERROR_CAPACITY);
    Self { transport, options, errors }
  }

  pub fn transport(&self) -> &T { &self.transport }

  pub fn options(&self) -> &SerializeOptions { &self.options }

  /// A receiver for every remote error raised from now on. The failing
  /// call still returns the same error to its caller.
  pub fn errors(&self) -> broadcast::Receiver<Arc<RemoteError>> {
    self.errors.subscribe()
  }

  pub(crate) fn error_sender(&self) -> broadcast::Sender<Arc<RemoteError>> {
    self.errors.clone()
  }

  /// Wrap a transport failure into the {entity × operation} error and
  /// report it to the error listeners.
  pub(crate) fn fail(
    &self,
    entity: EntityKind,
    operation: Operation,
  ) -> impl FnOnce(TransportError) -> Error + '_ {
    move |cause| {
      let err = Arc::new(RemoteError::new(entity, operation, cause));
      tracing::debug!(error = %err, name = %err.name(), "remote operation failed");
      // No receivers just means nobody registered an error listener.
      let _ = self.errors.send(Arc::clone(&err));
      Error::Remote(err)
    }
  }
}

// ─── ListQuery ───────────────────────────────────────────────────────────────

/// Pagination and filters for collection reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
  pub limit:   Option<u32>,
  pub offset:  Option<u32>,
  /// Free-text search.
  pub q:       Option<String>,
  /// Additional `key=value` filters, passed through as given.
  pub filters: Vec<(String, String)>,
}

impl ListQuery {
  pub fn limit(limit: u32) -> Self {
    Self { limit: Some(limit), ..Default::default() }
  }

  pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.filters.push((key.into(), value.into()));
    self
  }

  pub(crate) fn pairs(&self) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Some(limit) = self.limit {
      pairs.push(("limit".to_owned(), limit.to_string()));
    }
    if let Some(offset) = self.offset {
      pairs.push(("offset".to_owned(), offset.to_string()));
    }
    if let Some(q) = &self.q {
      pairs.push(("q".to_owned(), q.clone()));
    }
    pairs.extend(self.filters.iter().cloned());
    pairs
  }
}

// ─── Remote ──────────────────────────────────────────────────────────────────

/// Remote operations for entities of type `E` living under `path`.
pub struct Remote<'a, T, E> {
  ctx:     &'a Context<T>,
  path:    String,
  _entity: PhantomData<fn() -> E>,
}

impl<'a, T: Transport, E: Entity> Remote<'a, T, E> {
  /// Operations on `E`'s top-level collection.
  pub fn new(ctx: &'a Context<T>) -> Self { Self::at(ctx, E::ENDPOINT) }

  /// Operations on a collection at an explicit path.
  pub fn at(ctx: &'a Context<T>, path: impl Into<String>) -> Self {
    Self { ctx, path: path.into(), _entity: PhantomData }
  }

  pub fn path(&self) -> &str { &self.path }

  pub(crate) fn context(&self) -> &'a Context<T> { self.ctx }

  pub(crate) async fn send(
    &self,
    request: ApiRequest,
    operation: Operation,
  ) -> Result<ApiResponse> {
    tracing::debug!(
      kind = %E::KIND,
      operation = operation.type_name(),
      method = %request.method,
      path = %request.path,
      "remote operation"
    );
    self
      .ctx
      .transport
      .send(request)
      .await
      .map_err(self.ctx.fail(E::KIND, operation))
  }

  /// Decode the first record of `resp` as `E`.
  pub(crate) fn decode_one(&self, resp: &ApiResponse, operation: Operation) -> Result<E> {
    let payload = resp
      .first::<E::Payload>()
      .map_err(self.ctx.fail(E::KIND, operation))?;
    Ok(E::create(payload))
  }

  pub(crate) fn body(&self, entity: &E) -> Result<Value> {
    Ok(entity.to_value(&self.ctx.options)?)
  }

  /// Fetch one entity by id.
  pub async fn get(&self, id: &str) -> Result<E> {
    let resp = self
      .send(ApiRequest::get(format!("{}/{id}", self.path)), Operation::Fetch)
      .await?;
    self.decode_one(&resp, Operation::Fetch)
  }

  /// Refresh `entity` from the server and mark it initialized.
  pub async fn fetch(&self, entity: &mut E) -> Result<()> {
    self.load(entity, Operation::Fetch).await
  }

  /// Fetch `entity` unless it already carries complete data.
  pub async fn init(&self, entity: &mut E) -> Result<()> {
    if entity.is_initialized() {
      return Ok(());
    }
    self.load(entity, Operation::Init).await
  }

  async fn load(&self, entity: &mut E, operation: Operation) -> Result<()> {
    let path = entity.resource_path(operation)?;
    let resp = self.send(ApiRequest::get(path), operation).await?;
    let payload = resp
      .first::<E::Payload>()
      .map_err(self.ctx.fail(E::KIND, operation))?;
    // Nested records take the parent's state when deserialized.
    entity.set_initialized(true);
    entity.deserialize(payload);
    Ok(())
  }

  pub async fn list(&self, query: &ListQuery) -> Result<Vec<E>> {
    let request = ApiRequest::get(self.path.clone()).query(query.pairs());
    let resp = self.send(request, Operation::FetchAll).await?;
    let payloads = resp
      .items::<E::Payload>()
      .map_err(self.ctx.fail(E::KIND, Operation::FetchAll))?;
    Ok(payloads.into_iter().map(E::create).collect())
  }

  /// Total number of entities in the collection.
  pub async fn count(&self) -> Result<u64> {
    let resp = self
      .send(ApiRequest::head(self.path.clone()), Operation::FetchCount)
      .await?;
    resp
      .resource_count()
      .map_err(self.ctx.fail(E::KIND, Operation::FetchCount))
  }

  /// Create `entity` on the server and return the stored record.
  pub async fn create(&self, entity: &E) -> Result<E> {
    let request = ApiRequest::post(self.path.clone()).json(self.body(entity)?);
    let resp = self.send(request, Operation::Create).await?;
    self.decode_one(&resp, Operation::Create)
  }

  /// Apply `changes` to `entity`, then take the server's version.
  ///
  /// Relation collections are never sent; they change through their own
  /// endpoints.
  pub async fn patch(&self, entity: &mut E, changes: E::Payload) -> Result<()> {
    let path = entity.resource_path(Operation::Patch)?;
    let mut body = serde_json::to_value(changes).map_err(agora_core::Error::from)?;
    if let Value::Object(fields) = &mut body {
      for relation in E::RELATIONS {
        fields.remove(*relation);
      }
    }

    let resp = self
      .send(ApiRequest::patch(path).json(body), Operation::Patch)
      .await?;
    let payload = resp
      .first::<E::Payload>()
      .map_err(self.ctx.fail(E::KIND, Operation::Patch))?;
    entity.set_initialized(true);
    entity.deserialize(payload);
    Ok(())
  }

  pub async fn delete(&self, entity: &E) -> Result<()> {
    let path = entity.resource_path(Operation::Delete)?;
    self.send(ApiRequest::delete(path), Operation::Delete).await?;
    Ok(())
  }
}

// ─── Relation ────────────────────────────────────────────────────────────────

/// A sub-resource collection owned by one parent entity, e.g. a person's
/// addresses.
pub struct Relation<'a, T, E> {
  remote: Remote<'a, T, E>,
}

impl<'a, T: Transport, E: Entity> Relation<'a, T, E> {
  pub(crate) fn new(ctx: &'a Context<T>, path: String) -> Self {
    Self { remote: Remote::at(ctx, path) }
  }

  pub fn path(&self) -> &str { self.remote.path() }

  pub async fn fetch(&self, query: &ListQuery) -> Result<Vec<E>> {
    self.remote.list(query).await
  }

  pub async fn create(&self, payload: E::Payload) -> Result<E> {
    self.remote.create(&E::create(payload)).await
  }

  pub fn from_json(&self, payloads: Vec<E::Payload>) -> Vec<E> {
    payloads.into_iter().map(E::create).collect()
  }

  pub fn to_json(&self, items: &[E]) -> Vec<E::Payload> {
    agora_core::entity::nested_payloads(items, self.remote.context().options())
  }
}
