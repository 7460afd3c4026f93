//! The caller of an operation, as resolved by the identity provider.
//!
//! Role flags are resolved once per request. Nothing in the policy re-queries
//! group membership.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, ids::UserId};

/// A verified caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub id:           UserId,
  pub is_superuser: bool,
  /// Member of the `moderators` group.
  pub is_moderator: bool,
}

impl Identity {
  /// A plain account with no elevated role.
  pub fn member(id: UserId) -> Self {
    Self { id, is_superuser: false, is_moderator: false }
  }

  pub fn moderator(id: UserId) -> Self {
    Self { id, is_superuser: false, is_moderator: true }
  }

  pub fn superuser(id: UserId) -> Self {
    Self { id, is_superuser: true, is_moderator: false }
  }

  pub fn role(&self) -> Role {
    if self.is_superuser {
      Role::Superuser
    } else if self.is_moderator {
      Role::Moderator
    } else {
      Role::Member
    }
  }
}

/// Role category used as the first key of the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  Superuser,
  Moderator,
  Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Principal {
  #[default]
  Anonymous,
  User(Identity),
}

impl Principal {
  pub fn identity(&self) -> Option<&Identity> {
    match self {
      Self::Anonymous => None,
      Self::User(identity) => Some(identity),
    }
  }

  /// The authenticated identity, or [`Error::Unauthenticated`].
  pub fn require(&self) -> Result<&Identity> {
    self.identity().ok_or(Error::Unauthenticated)
  }
}

impl From<Identity> for Principal {
  fn from(identity: Identity) -> Self { Self::User(identity) }
}
