//! The access policy evaluator.
//!
//! [`decide`] is a pure function of the caller, the action, the resource kind
//! and (for object actions) the resource's identity and owner. The whole rule
//! set is one `match` keyed by `(role, kind, action)`, so the precedence is
//! read top to bottom.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::{
  Error, Result,
  ids::UserId,
  principal::{Identity, Principal, Role},
};

// ─── Vocabulary ──────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
  List,
  Retrieve,
  Create,
  Update,
  PartialUpdate,
  Destroy,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceKind {
  Course,
  Lesson,
  UserProfile,
  Payment,
}

/// The identity of the resource an object action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRef {
  pub id:    i64,
  /// `None` once the owning account has been removed.
  pub owner: Option<UserId>,
}

impl ResourceRef {
  pub fn new(id: impl Into<i64>, owner: Option<UserId>) -> Self {
    Self { id: id.into(), owner }
  }

  /// A user profile; its owner is the profile itself.
  pub fn profile(id: UserId) -> Self { Self { id: id.0, owner: Some(id) } }

  fn is_owned_by(&self, kind: ResourceKind, caller: &Identity) -> bool {
    match kind {
      ResourceKind::UserProfile => self.id == caller.id.0,
      _ => self.owner == Some(caller.id),
    }
  }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Which slice of the data a permitted caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
  /// Every field of every matching record.
  Full,
  /// Only `{id, username, email, avatar, city}` of each profile.
  PublicProfile,
  /// Only records owned by the caller.
  OwnRecords,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Allow(Exposure),
  Forbidden,
  Unauthenticated,
}

impl Decision {
  pub fn is_allowed(&self) -> bool { matches!(self, Self::Allow(_)) }

  /// Convert into a [`Result`], mapping denials onto the error taxonomy.
  pub fn into_result(self, action: Action, kind: ResourceKind) -> Result<Exposure> {
    match self {
      Self::Allow(exposure) => Ok(exposure),
      Self::Forbidden => Err(Error::Forbidden(format!("{action} on {kind} is not permitted"))),
      Self::Unauthenticated => Err(Error::Unauthenticated),
    }
  }
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

/// Decide whether `principal` may perform `action` on a resource of `kind`.
///
/// `resource` is the target of an object action (`retrieve`, `update`,
/// `partial_update`, `destroy`). Without it, ownership never holds.
pub fn decide(
  principal: &Principal,
  action:    Action,
  kind:      ResourceKind,
  resource:  Option<&ResourceRef>,
) -> Decision {
  // The authentication gate runs before any rule.
  let Some(caller) = principal.identity() else {
    return Decision::Unauthenticated;
  };

  let role = caller.role();
  let owns = resource.is_some_and(|r| r.is_owned_by(kind, caller));

  use Action::*;
  use ResourceKind::*;

  let permitted = match (role, kind, action) {
    (Role::Superuser, _, _) => true,

    (_, Course | Lesson, List) => true,
    (role, Course | Lesson, Retrieve | Update | PartialUpdate) => {
      role == Role::Moderator || owns
    }
    (role, Course | Lesson, Create) => role != Role::Moderator,
    (_, Course | Lesson, Destroy) => owns,

    (_, UserProfile, Update | PartialUpdate | Destroy) => owns,
    (_, UserProfile, Retrieve | List) => true,

    (_, Payment, List | Create) => true,
    (role, Payment, Retrieve) => role == Role::Moderator || owns,

    _ => false,
  };

  if permitted {
    Decision::Allow(exposure(role, kind, action, owns))
  } else {
    Decision::Forbidden
  }
}

/// Shorthand for `decide(..).into_result(..)`.
pub fn authorize(
  principal: &Principal,
  action:    Action,
  kind:      ResourceKind,
  resource:  Option<&ResourceRef>,
) -> Result<Exposure> {
  let decision = decide(principal, action, kind, resource);
  if !decision.is_allowed() {
    tracing::debug!(%action, %kind, ?decision, "access denied");
  }
  decision.into_result(action, kind)
}

fn exposure(role: Role, kind: ResourceKind, action: Action, owns: bool) -> Exposure {
  match (kind, action) {
    (ResourceKind::UserProfile, Action::List) => Exposure::PublicProfile,
    (ResourceKind::UserProfile, Action::Retrieve) if !owns => Exposure::PublicProfile,
    (ResourceKind::Payment, Action::List) if role == Role::Member => Exposure::OwnRecords,
    _ => Exposure::Full,
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;

  const OWNER: UserId = UserId(1);
  const STRANGER: UserId = UserId(2);
  const MODERATOR: UserId = UserId(3);
  const ADMIN: UserId = UserId(4);

  fn member(id: UserId) -> Principal { Identity::member(id).into() }

  fn moderator() -> Principal { Identity::moderator(MODERATOR).into() }

  fn superuser() -> Principal { Identity::superuser(ADMIN).into() }

  fn owned() -> ResourceRef { ResourceRef::new(10, Some(OWNER)) }

  #[test]
  fn superuser_is_allowed_everything() {
    for kind in ResourceKind::iter() {
      for action in Action::iter() {
        for resource in [None, Some(owned()), Some(ResourceRef::new(10, None))] {
          let decision = decide(&superuser(), action, kind, resource.as_ref());
          assert!(decision.is_allowed(), "{action} on {kind}: {decision:?}");
        }
      }
    }
  }

  #[test]
  fn anonymous_is_unauthenticated_not_forbidden() {
    for kind in ResourceKind::iter() {
      for action in Action::iter() {
        let decision = decide(&Principal::Anonymous, action, kind, Some(&owned()));
        assert_eq!(decision, Decision::Unauthenticated, "{action} on {kind}");
      }
    }
  }

  #[test]
  fn stranger_cannot_touch_someone_elses_course() {
    let stranger = member(STRANGER);
    for action in [Action::Retrieve, Action::Update, Action::PartialUpdate, Action::Destroy] {
      assert_eq!(
        decide(&stranger, action, ResourceKind::Course, Some(&owned())),
        Decision::Forbidden,
        "{action}",
      );
    }
  }

  #[test]
  fn owner_may_manage_own_course() {
    let owner = member(OWNER);
    for action in [Action::Retrieve, Action::Update, Action::PartialUpdate, Action::Destroy] {
      assert_eq!(
        decide(&owner, action, ResourceKind::Course, Some(&owned())),
        Decision::Allow(Exposure::Full),
        "{action}",
      );
    }
  }

  #[test]
  fn moderator_edits_but_never_destroys_or_creates() {
    let m = moderator();
    for kind in [ResourceKind::Course, ResourceKind::Lesson] {
      assert!(decide(&m, Action::Retrieve, kind, Some(&owned())).is_allowed());
      assert!(decide(&m, Action::Update, kind, Some(&owned())).is_allowed());
      assert!(decide(&m, Action::PartialUpdate, kind, Some(&owned())).is_allowed());
      assert_eq!(decide(&m, Action::Destroy, kind, Some(&owned())), Decision::Forbidden);
      assert_eq!(decide(&m, Action::Create, kind, None), Decision::Forbidden);
    }
  }

  #[test]
  fn moderator_on_foreign_lesson() {
    let lesson = ResourceRef::new(7, Some(OWNER));
    assert!(decide(&moderator(), Action::Retrieve, ResourceKind::Lesson, Some(&lesson)).is_allowed());
    assert_eq!(
      decide(&moderator(), Action::Destroy, ResourceKind::Lesson, Some(&lesson)),
      Decision::Forbidden,
    );
  }

  #[test]
  fn members_list_and_create_catalog_entries() {
    let m = member(STRANGER);
    for kind in [ResourceKind::Course, ResourceKind::Lesson] {
      assert_eq!(decide(&m, Action::List, kind, None), Decision::Allow(Exposure::Full));
      assert_eq!(decide(&m, Action::Create, kind, None), Decision::Allow(Exposure::Full));
    }
  }

  #[test]
  fn orphaned_course_is_only_reachable_by_elevated_roles() {
    let orphan = ResourceRef::new(10, None);
    assert_eq!(
      decide(&member(OWNER), Action::Retrieve, ResourceKind::Course, Some(&orphan)),
      Decision::Forbidden,
    );
    assert!(decide(&moderator(), Action::Retrieve, ResourceKind::Course, Some(&orphan)).is_allowed());
  }

  #[test]
  fn profile_edits_are_self_only() {
    let mine = ResourceRef::profile(OWNER);
    for action in [Action::Update, Action::PartialUpdate, Action::Destroy] {
      assert!(decide(&member(OWNER), action, ResourceKind::UserProfile, Some(&mine)).is_allowed());
      assert_eq!(
        decide(&member(STRANGER), action, ResourceKind::UserProfile, Some(&mine)),
        Decision::Forbidden,
      );
      assert_eq!(
        decide(&moderator(), action, ResourceKind::UserProfile, Some(&mine)),
        Decision::Forbidden,
      );
    }
  }

  #[test]
  fn foreign_profile_retrieve_exposes_public_subset() {
    let theirs = ResourceRef::profile(OWNER);
    assert_eq!(
      decide(&member(STRANGER), Action::Retrieve, ResourceKind::UserProfile, Some(&theirs)),
      Decision::Allow(Exposure::PublicProfile),
    );
    assert_eq!(
      decide(&member(OWNER), Action::Retrieve, ResourceKind::UserProfile, Some(&theirs)),
      Decision::Allow(Exposure::Full),
    );
    // Projection does not widen for superusers.
    assert_eq!(
      decide(&superuser(), Action::Retrieve, ResourceKind::UserProfile, Some(&theirs)),
      Decision::Allow(Exposure::PublicProfile),
    );
  }

  #[test]
  fn profile_list_is_always_public() {
    for p in [member(OWNER), moderator(), superuser()] {
      assert_eq!(
        decide(&p, Action::List, ResourceKind::UserProfile, None),
        Decision::Allow(Exposure::PublicProfile),
      );
    }
  }

  #[test]
  fn payment_list_scope_depends_on_role() {
    assert_eq!(
      decide(&member(OWNER), Action::List, ResourceKind::Payment, None),
      Decision::Allow(Exposure::OwnRecords),
    );
    assert_eq!(
      decide(&moderator(), Action::List, ResourceKind::Payment, None),
      Decision::Allow(Exposure::Full),
    );
    assert_eq!(
      decide(&superuser(), Action::List, ResourceKind::Payment, None),
      Decision::Allow(Exposure::Full),
    );
  }

  #[test]
  fn payment_retrieve_requires_ownership_or_moderation() {
    let payment = ResourceRef::new(5, Some(OWNER));
    assert!(decide(&member(OWNER), Action::Retrieve, ResourceKind::Payment, Some(&payment)).is_allowed());
    assert!(decide(&moderator(), Action::Retrieve, ResourceKind::Payment, Some(&payment)).is_allowed());
    assert_eq!(
      decide(&member(STRANGER), Action::Retrieve, ResourceKind::Payment, Some(&payment)),
      Decision::Forbidden,
    );
  }

  #[test]
  fn payments_are_never_edited_by_non_superusers() {
    let payment = ResourceRef::new(5, Some(OWNER));
    for action in [Action::Update, Action::PartialUpdate, Action::Destroy] {
      assert_eq!(
        decide(&member(OWNER), action, ResourceKind::Payment, Some(&payment)),
        Decision::Forbidden,
      );
      assert_eq!(
        decide(&moderator(), action, ResourceKind::Payment, Some(&payment)),
        Decision::Forbidden,
      );
    }
  }

  #[test]
  fn authorize_maps_denials_onto_errors() {
    let err = authorize(&member(STRANGER), Action::Destroy, ResourceKind::Course, Some(&owned()))
      .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let err = authorize(&Principal::Anonymous, Action::List, ResourceKind::Course, None)
      .unwrap_err();
    assert!(matches!(err, Error::Unauthenticated));
  }
}
