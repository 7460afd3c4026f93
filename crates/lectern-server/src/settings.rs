//! Runtime configuration, read from an optional TOML file layered under
//! `LECTERN_*` environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  pub checkout:   CheckoutConfig,
}

/// Settings of the hosted checkout provider.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
  /// Secret API key, sent as a bearer token.
  pub api_key:     String,
  #[serde(default = "default_api_base")]
  pub api_base:    String,
  /// ISO 4217 code, lowercase.
  #[serde(default = "default_currency")]
  pub currency:    String,
  /// Where the payer lands after paying.
  pub success_url: String,
  /// Where the payer lands after abandoning the checkout.
  pub cancel_url:  String,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8000 }

fn default_store_path() -> PathBuf { PathBuf::from("lectern.sqlite3") }

fn default_api_base() -> String { "https://api.stripe.com/v1/".into() }

fn default_currency() -> String { "usd".into() }

impl ServerConfig {
  /// Layer `file` (optional) under `LECTERN_*` variables, e.g.
  /// `LECTERN_CHECKOUT__API_KEY`.
  pub fn load(file: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(
        config::Environment::with_prefix("LECTERN")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}
