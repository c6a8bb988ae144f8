//! Client configuration.

use std::{path::Path, time::Duration};

use agora_core::{ActiveFlag, SerializeOptions};
use serde::Deserialize;

use crate::Result;

fn default_timeout_secs() -> u64 { 30 }

/// Connection and compatibility settings for a [`Universe`](crate::Universe).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
  /// API base, e.g. `https://acme.agora.example`.
  pub base_url:     String,
  /// Bearer token attached to every request, if any.
  #[serde(default)]
  pub access_token: Option<String>,
  /// Realtime client id; a random UUID when unset.
  #[serde(default)]
  pub client_id:    Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  /// How `active` flags are written back. Defaults to `legacy`.
  #[serde(default)]
  pub active_flag:  ActiveFlag,
}

impl ClientConfig {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url:     base_url.into(),
      access_token: None,
      client_id:    None,
      timeout_secs: default_timeout_secs(),
      active_flag:  ActiveFlag::default(),
    }
  }

  /// Load from an optional TOML file, overridden by `AGORA_*` environment
  /// variables (e.g. `AGORA_BASE_URL`).
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
      builder = builder.add_source(config::File::from(path).required(false));
    }
    let settings = builder
      .add_source(config::Environment::with_prefix("AGORA"))
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

  pub fn serialize_options(&self) -> SerializeOptions {
    SerializeOptions { active: self.active_flag }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_uses_documented_defaults() {
    let cfg = ClientConfig::new("https://acme.example");
    assert_eq!(cfg.timeout(), Duration::from_secs(30));
    assert_eq!(cfg.active_flag, ActiveFlag::Legacy);
    assert!(cfg.client_id.is_none());
  }

  #[test]
  fn file_settings_deserialize() {
    let dir = std::env::temp_dir().join(format!("agora-config-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("agora.toml");
    std::fs::write(
      &path,
      "base_url = \"https://acme.example\"\nclient_id = \"c-1\"\nactive_flag = \"preserve\"\n",
    )
    .unwrap();

    let cfg = ClientConfig::load(Some(&path)).unwrap();
    assert_eq!(cfg.base_url, "https://acme.example");
    assert_eq!(cfg.client_id.as_deref(), Some("c-1"));
    assert_eq!(cfg.serialize_options().active, ActiveFlag::Preserve);
    assert_eq!(cfg.timeout_secs, 30);
  }
}
