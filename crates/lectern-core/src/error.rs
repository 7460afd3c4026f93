//! Error taxonomy shared by every layer of Lectern.
//!
//! Each variant is terminal: nothing in the core recovers from one locally.
//! `Forbidden` and `NotFound` are kept distinct because the caller remedies
//! them differently.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// No valid principal for an action that requires one.
  #[error("authentication required")]
  Unauthenticated,

  /// A valid principal that the access policy denies.
  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  /// Malformed request or missing required field.
  #[error("invalid request: {0}")]
  InvalidRequest(String),

  /// Uniqueness violation surfaced from storage.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error into [`Error::Store`].
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
