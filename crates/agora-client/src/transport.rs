//! HTTP transport: the request/response shapes every remote operation goes
//! through, the [`Transport`] seam, and its reqwest-backed implementation.

use std::{collections::BTreeMap, future::Future};

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::config::ClientConfig;

/// Response header carrying a collection's total size.
pub const RESOURCE_COUNT_HEADER: &str = "x-resource-count";

#[derive(Debug, Error)]
pub enum TransportError {
  #[error("request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("unexpected status {status}")]
  Status { status: u16, body: Value },

  #[error("malformed response: {0}")]
  Malformed(String),

  #[error("response decode error: {0}")]
  Decode(#[from] serde_json::Error),
}

impl TransportError {
  /// The HTTP status, when the server answered at all.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Status { status, .. } => Some(*status),
      _ => None,
    }
  }
}

// ─── Request ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method:  Method,
  /// Path relative to the API base, without a leading slash.
  pub path:    String,
  pub query:   Vec<(String, String)>,
  pub body:    Option<Value>,
  pub headers: Vec<(String, String)>,
}

impl ApiRequest {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      query: Vec::new(),
      body: None,
      headers: Vec::new(),
    }
  }

  pub fn get(path: impl Into<String>) -> Self { Self::new(Method::GET, path) }

  pub fn head(path: impl Into<String>) -> Self { Self::new(Method::HEAD, path) }

  pub fn post(path: impl Into<String>) -> Self { Self::new(Method::POST, path) }

  pub fn patch(path: impl Into<String>) -> Self { Self::new(Method::PATCH, path) }

  pub fn delete(path: impl Into<String>) -> Self {
    Self::new(Method::DELETE, path)
  }

  pub fn query(
    mut self,
    pairs: impl IntoIterator<Item = (String, String)>,
  ) -> Self {
    self.query.extend(pairs);
    self
  }

  pub fn json(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }

  pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }
}

// ─── Response ────────────────────────────────────────────────────────────────

/// A decoded response. Header names are lowercase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
  pub status:  u16,
  pub headers: BTreeMap<String, String>,
  pub body:    Value,
}

impl ApiResponse {
  /// A `200 OK` with the given body.
  pub fn ok(body: Value) -> Self {
    Self { status: 200, headers: BTreeMap::new(), body }
  }

  pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
    self.headers.insert(name.to_ascii_lowercase(), value.into());
    self
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .get(&name.to_ascii_lowercase())
      .map(String::as_str)
  }

  /// Records in the `{"data": [...]}` envelope.
  pub fn items<P: DeserializeOwned>(&self) -> Result<Vec<P>, TransportError> {
    let data = self
      .body
      .get("data")
      .ok_or_else(|| TransportError::Malformed("missing `data` envelope".into()))?;
    match data {
      Value::Array(records) => records
        .iter()
        .map(|r| serde_json::from_value(r.clone()).map_err(TransportError::from))
        .collect(),
      _ => Err(TransportError::Malformed("`data` is not an array".into())),
    }
  }

  /// The first record of the envelope; single-resource endpoints answer
  /// with a one-element `data` array.
  pub fn first<P: DeserializeOwned>(&self) -> Result<P, TransportError> {
    self
      .items()?
      .into_iter()
      .next()
      .ok_or_else(|| TransportError::Malformed("empty `data` envelope".into()))
  }

  /// The collection size from `X-Resource-Count`.
  pub fn resource_count(&self) -> Result<u64, TransportError> {
    let raw = self.header(RESOURCE_COUNT_HEADER).ok_or_else(|| {
      TransportError::Malformed(format!("missing `{RESOURCE_COUNT_HEADER}` header"))
    })?;
    raw.trim().parse().map_err(|_| {
      TransportError::Malformed(format!("invalid `{RESOURCE_COUNT_HEADER}`: {raw}"))
    })
  }
}

// ─── Transport ───────────────────────────────────────────────────────────────

/// Sends API requests. Implemented over HTTP by [`HttpTransport`]; tests
/// substitute a recording mock.
pub trait Transport: Send + Sync {
  fn send(
    &self,
    request: ApiRequest,
  ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send + '_;
}

/// reqwest-backed [`Transport`].
pub struct HttpTransport {
  client:       Client,
  base_url:     String,
  access_token: Option<String>,
}

impl HttpTransport {
  pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
    let client = Client::builder().timeout(config.timeout()).build()?;
    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_owned(),
      access_token: config.access_token.clone(),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url, path.trim_start_matches('/'))
  }
}

impl Transport for HttpTransport {
  async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
    let url = self.url(&request.path);
    tracing::debug!(method = %request.method, %url, "http request");

    let mut builder = self
      .client
      .request(request.method.clone(), &url)
      .query(&request.query);
    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(token) = &self.access_token {
      builder = builder.bearer_auth(token);
    }
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let resp = builder.send().await?;
    let status = resp.status();
    let headers = resp
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned()))
      })
      .collect();
    let bytes = resp.bytes().await?;

    if !status.is_success() {
      let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
      tracing::debug!(status = status.as_u16(), %url, "http request rejected");
      return Err(TransportError::Status { status: status.as_u16(), body });
    }

    let body = if bytes.is_empty() || request.method == Method::HEAD {
      Value::Null
    } else {
      serde_json::from_slice(&bytes)?
    };
    Ok(ApiResponse { status: status.as_u16(), headers, body })
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn envelope_helpers() {
    let resp = ApiResponse::ok(json!({ "data": [{ "id": "a" }, { "id": "b" }] }));
    let items: Vec<Value> = resp.items().unwrap();
    assert_eq!(items.len(), 2);
    let first: Value = resp.first().unwrap();
    assert_eq!(first["id"], "a");
  }

  #[test]
  fn empty_envelope_is_malformed_for_first() {
    let resp = ApiResponse::ok(json!({ "data": [] }));
    assert!(matches!(
      resp.first::<Value>(),
      Err(TransportError::Malformed(_))
    ));
    let resp = ApiResponse::ok(json!({ "nope": 1 }));
    assert!(matches!(
      resp.items::<Value>(),
      Err(TransportError::Malformed(_))
    ));
  }

  #[test]
  fn resource_count_reads_header_case_insensitively() {
    let resp = ApiResponse::ok(Value::Null).with_header("X-Resource-Count", "42");
    assert_eq!(resp.resource_count().unwrap(), 42);
    let resp = ApiResponse::ok(Value::Null).with_header("X-Resource-Count", "many");
    assert!(resp.resource_count().is_err());
    assert!(ApiResponse::ok(Value::Null).resource_count().is_err());
  }

  #[test]
  fn http_transport_joins_paths() {
    let cfg = ClientConfig::new("https://acme.example/");
    let transport = HttpTransport::new(&cfg).unwrap();
    assert_eq!(transport.url("api/v0/people"), "https://acme.example/api/v0/people");
    assert_eq!(transport.url("/api/v0/people"), "https://acme.example/api/v0/people");
  }
}
