//! HTTP Basic identity provider and password hashing.
//!
//! The login name is the account's email address. A request without an
//! `Authorization` header resolves to [`Principal::Anonymous`]; a header that
//! is present but malformed, or carries wrong credentials, is rejected with
//! 401 before any handler runs.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use lectern_core::{
  checkout::CheckoutGateway,
  principal::{Identity, Principal},
  store::{LmsStore, UserStore},
};
use rand_core::OsRng;

use crate::{AppState, error::ApiError};

/// The resolved caller of a request.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Principal);

/// Hash `password` into an argon2 PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Split a `Basic` authorization header into `(email, password)`.
///
/// Returns `Ok(None)` when no header is present.
pub fn basic_credentials(headers: &HeaderMap) -> Result<Option<(String, String)>, ApiError> {
  let Some(value) = headers.get(header::AUTHORIZATION) else {
    return Ok(None);
  };

  let encoded = value
    .to_str()
    .ok()
    .and_then(|v| v.strip_prefix("Basic "))
    .ok_or(ApiError::Unauthenticated)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthenticated)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthenticated)?;

  let (email, password) = creds.split_once(':').ok_or(ApiError::Unauthenticated)?;
  Ok(Some((email.to_owned(), password.to_owned())))
}

/// Resolve the caller from request headers against `store`.
pub async fn resolve<S: UserStore>(headers: &HeaderMap, store: &S) -> Result<Principal, ApiError> {
  let Some((email, password)) = basic_credentials(headers)? else {
    return Ok(Principal::Anonymous);
  };

  let Some(creds) = store.get_credentials(&email).await.map_err(ApiError::store)? else {
    tracing::debug!(%email, "login for unknown account");
    return Err(ApiError::Unauthenticated);
  };

  let parsed = PasswordHash::new(&creds.password_hash).map_err(|_| ApiError::Unauthenticated)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .map_err(|_| {
      tracing::debug!(%email, "wrong password");
      ApiError::Unauthenticated
    })?;

  Ok(Principal::User(Identity {
    id:           creds.user.id,
    is_superuser: creds.user.is_superuser,
    is_moderator: creds.user.is_moderator,
  }))
}

impl<S, G> FromRequestParts<AppState<S, G>> for Caller
where
  S: LmsStore + 'static,
  G: CheckoutGateway + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, G>,
  ) -> Result<Self, Self::Rejection> {
    resolve(&parts.headers, state.store.as_ref()).await.map(Caller)
  }
}
