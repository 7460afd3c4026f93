//! [`HttpGateway`]: a [`CheckoutGateway`] speaking the Stripe-style REST API.
//!
//! Opening a checkout takes three form-encoded POSTs: a product, a price for
//! it, and a hosted checkout session selling one unit of that price.

use std::time::Duration;

use lectern_core::checkout::{CheckoutGateway, CheckoutRequest, CheckoutSession};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;
use url::Url;

use crate::settings::CheckoutConfig;

#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("invalid gateway URL: {0}")]
  Url(#[from] url::ParseError),

  #[error("gateway request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{endpoint} answered {status}: {body}")]
  Status {
    endpoint: String,
    status:   StatusCode,
    body:     String,
  },
}

/// Object creation responses only need the id.
#[derive(Debug, Deserialize)]
struct Created {
  id: String,
}

#[derive(Debug, Deserialize)]
struct Session {
  id:  String,
  url: String,
}

#[derive(Debug, Deserialize)]
struct SessionStatus {
  payment_status: String,
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpGateway {
  client:      Client,
  api_base:    Url,
  api_key:     String,
  currency:    String,
  success_url: String,
  cancel_url:  String,
}

impl HttpGateway {
  pub fn new(config: &CheckoutConfig) -> Result<Self, GatewayError> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

    // `Url::join` replaces the last segment unless the base ends in a slash.
    let mut api_base = Url::parse(&config.api_base)?;
    if !api_base.path().ends_with('/') {
      let path = format!("{}/", api_base.path());
      api_base.set_path(&path);
    }
    Url::parse(&config.success_url)?;
    Url::parse(&config.cancel_url)?;

    Ok(Self {
      client,
      api_base,
      api_key: config.api_key.clone(),
      currency: config.currency.clone(),
      success_url: config.success_url.clone(),
      cancel_url: config.cancel_url.clone(),
    })
  }

  fn endpoint(&self, path: &str) -> Result<Url, GatewayError> { Ok(self.api_base.join(path)?) }

  async fn post<T: DeserializeOwned>(
    &self,
    path: &str,
    form: &[(&str, String)],
  ) -> Result<T, GatewayError> {
    let resp = self
      .client
      .post(self.endpoint(path)?)
      .bearer_auth(&self.api_key)
      .form(form)
      .send()
      .await?;
    decode(path, resp).await
  }

  fn session_form(&self, request: &CheckoutRequest, price_id: &str) -> Vec<(&'static str, String)> {
    vec![
      ("mode", "payment".into()),
      ("success_url", self.success_url.clone()),
      ("cancel_url", self.cancel_url.clone()),
      ("line_items[0][price]", price_id.to_owned()),
      ("line_items[0][quantity]", "1".into()),
      ("metadata[payment_id]", request.payment_id.to_string()),
    ]
  }
}

async fn decode<T: DeserializeOwned>(path: &str, resp: reqwest::Response) -> Result<T, GatewayError> {
  let status = resp.status();
  if !status.is_success() {
    let body = resp.text().await.unwrap_or_default();
    return Err(GatewayError::Status { endpoint: path.to_owned(), status, body });
  }
  Ok(resp.json().await?)
}

impl CheckoutGateway for HttpGateway {
  type Error = GatewayError;

  async fn open_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
    let product: Created = self
      .post("products", &[("name", request.product_name.clone())])
      .await?;

    let price: Created = self
      .post(
        "prices",
        &[
          ("currency", self.currency.clone()),
          ("unit_amount", request.amount.to_string()),
          ("product", product.id.clone()),
        ],
      )
      .await?;

    let session: Session = self
      .post("checkout/sessions", &self.session_form(&request, &price.id))
      .await?;

    tracing::debug!(
      payment = %request.payment_id,
      session = %session.id,
      "checkout session opened"
    );
    Ok(CheckoutSession {
      product_id: product.id,
      price_id:   price.id,
      session_id: session.id,
      url:        session.url,
    })
  }

  async fn session_status<'a>(&'a self, session_id: &'a str) -> Result<String, GatewayError> {
    let path = format!("checkout/sessions/{session_id}");
    let resp = self
      .client
      .get(self.endpoint(&path)?)
      .bearer_auth(&self.api_key)
      .send()
      .await?;
    let status: SessionStatus = decode(&path, resp).await?;
    Ok(status.payment_status)
  }
}
