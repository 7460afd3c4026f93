//! Integer identifiers for persisted entities.
//!
//! Each entity gets its own newtype so a lesson id can never be passed where a
//! course id is expected. All of them serialise as bare integers.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
    }

    impl From<i64> for $name {
      fn from(raw: i64) -> Self { Self(raw) }
    }
  };
}

id_type!(
  /// Primary key of a user account.
  UserId
);
id_type!(CourseId);
id_type!(LessonId);
id_type!(PaymentId);
id_type!(SubscriptionId);
