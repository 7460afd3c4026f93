//! User accounts and the two profile projections served over the API.

use serde::{Deserialize, Serialize};

use crate::{ids::UserId, payment::Payment};

/// Avatar path assigned when the user uploads none.
pub const DEFAULT_AVATAR: &str = "default/default.png";

/// Name of the group whose members are moderators.
pub const MODERATORS_GROUP: &str = "moderators";

/// A stored account. The password hash never leaves the store through this
/// type; see [`Credentials`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:           UserId,
  pub username:     String,
  /// Unique; doubles as the login name.
  pub email:        String,
  pub phone_number: Option<String>,
  pub avatar:       String,
  pub city:         Option<String>,
  pub is_superuser: bool,
  pub is_moderator: bool,
}

impl User {
  pub fn public_profile(&self) -> PublicProfile {
    PublicProfile {
      id:       self.id,
      username: self.username.clone(),
      email:    self.email.clone(),
      avatar:   self.avatar.clone(),
      city:     self.city.clone(),
    }
  }

  pub fn full_profile(&self, payments: Vec<Payment>) -> FullProfile {
    FullProfile {
      id:           self.id,
      username:     self.username.clone(),
      email:        self.email.clone(),
      phone_number: self.phone_number.clone(),
      avatar:       self.avatar.clone(),
      city:         self.city.clone(),
      payments,
    }
  }
}

/// A user together with the argon2 PHC string used to verify their password.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub user:          User,
  pub password_hash: String,
}

/// What anybody may see of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
  pub id:       UserId,
  pub username: String,
  pub email:    String,
  pub avatar:   String,
  pub city:     Option<String>,
}

/// What the account holder sees of their own account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullProfile {
  pub id:           UserId,
  pub username:     String,
  pub email:        String,
  pub phone_number: Option<String>,
  pub avatar:       String,
  pub city:         Option<String>,
  pub payments:     Vec<Payment>,
}

/// Input for creating an account. The password arrives already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  pub email:         String,
  pub password_hash: String,
  pub phone_number:  Option<String>,
  pub avatar:        Option<String>,
  pub city:          Option<String>,
  pub is_superuser:  bool,
}

impl NewUser {
  /// A plain account with no optional fields.
  pub fn new(
    username:      impl Into<String>,
    email:         impl Into<String>,
    password_hash: impl Into<String>,
  ) -> Self {
    Self {
      username:      username.into(),
      email:         email.into(),
      password_hash: password_hash.into(),
      phone_number:  None,
      avatar:        None,
      city:          None,
      is_superuser:  false,
    }
  }
}

/// Partial update of an account; `None` leaves a field untouched.
///
/// Nullable fields use a nested `Option`: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
  pub username:     Option<String>,
  pub email:        Option<String>,
  #[serde(default, with = "double_option")]
  pub phone_number: Option<Option<String>>,
  pub avatar:       Option<String>,
  #[serde(default, with = "double_option")]
  pub city:         Option<Option<String>>,
}

/// Distinguishes an absent field from an explicit `null` when deserialising.
pub(crate) mod double_option {
  use serde::{Deserialize, Deserializer};

  pub fn deserialize<'de, T, D>(d: D) -> Result<Option<Option<T>>, D::Error>
  where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
  {
    Option::<T>::deserialize(d).map(Some)
  }
}
