//! Error type for `lectern-store-sqlite`.

use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored value that does not decode into a domain type.
  #[error("decode error: {0}")]
  Decode(String),

  /// A UNIQUE constraint rejected the write.
  #[error("{0} already exists")]
  Conflict(String),

  /// A foreign key pointed at a row that does not exist.
  #[error("referenced record not found")]
  MissingReference,
}

impl Error {
  /// Classify a failed write, naming the offending entity in the message.
  pub(crate) fn from_write(e: tokio_rusqlite::Error, what: impl Into<String>) -> Self {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, _)) = &e {
      match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
          return Self::Conflict(what.into());
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Self::MissingReference,
        _ => {}
      }
    }
    Self::Database(e)
  }
}

impl From<Error> for lectern_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Conflict(what) => Self::Conflict(format!("{what} already exists")),
      Error::MissingReference => Self::NotFound("referenced record".into()),
      other => Self::store(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
