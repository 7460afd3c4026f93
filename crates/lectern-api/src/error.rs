//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Challenge sent with every 401.
pub const BASIC_CHALLENGE: &str = r#"Basic realm="lectern""#;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("authentication required")]
  Unauthenticated,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// The checkout gateway failed or answered with something unusable.
  #[error("gateway error: {0}")]
  Gateway(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Convert a backend error through the core taxonomy, so uniqueness and
  /// missing-reference failures keep their status codes.
  pub fn store<E: Into<lectern_core::Error>>(e: E) -> Self {
    let core: lectern_core::Error = e.into();
    core.into()
  }

  pub fn gateway(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Gateway(Box::new(e))
  }

  fn status(&self) -> StatusCode {
    match self {
      Self::Unauthenticated => StatusCode::UNAUTHORIZED,
      Self::Forbidden(_) => StatusCode::FORBIDDEN,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::Gateway(_) => StatusCode::BAD_GATEWAY,
      Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<lectern_core::Error> for ApiError {
  fn from(e: lectern_core::Error) -> Self {
    use lectern_core::Error as E;
    match e {
      E::Unauthenticated => Self::Unauthenticated,
      E::Forbidden(m) => Self::Forbidden(m),
      E::NotFound(m) => Self::NotFound(m),
      E::InvalidRequest(m) => Self::BadRequest(m),
      E::Conflict(m) => Self::Conflict(m),
      E::Store(e) => Self::Store(e),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      Self::Gateway(e) => {
        tracing::error!(error = %e, "checkout gateway failure");
        "payment gateway unavailable".to_string()
      }
      Self::Store(e) => {
        tracing::error!(error = %e, "store failure");
        "internal error".to_string()
      }
      other => other.to_string(),
    };

    let mut response = (status, Json(json!({ "error": message }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static(BASIC_CHALLENGE),
      );
    }
    response
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn core_errors_map_to_status_codes() {
    let cases = [
      (lectern_core::Error::Unauthenticated, StatusCode::UNAUTHORIZED),
      (lectern_core::Error::Forbidden("x".into()), StatusCode::FORBIDDEN),
      (lectern_core::Error::NotFound("x".into()), StatusCode::NOT_FOUND),
      (lectern_core::Error::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
      (lectern_core::Error::Conflict("x".into()), StatusCode::CONFLICT),
    ];
    for (core, status) in cases {
      assert_eq!(ApiError::from(core).into_response().status(), status);
    }
  }

  #[test]
  fn unauthenticated_carries_a_basic_challenge() {
    let response = ApiError::Unauthenticated.into_response();
    let challenge = response.headers().get(header::WWW_AUTHENTICATE).unwrap();
    assert_eq!(challenge, r#"Basic realm="lectern""#);
  }
}
