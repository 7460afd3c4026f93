//! Course subscriptions and the toggle that is their only entry point.
//!
//! A subscription is either present or absent; it is never updated. The
//! toggle reads the `(user, course)` pair and then deletes or creates it.
//! Two racing toggles may both see "absent": the store's uniqueness
//! constraint rejects the second insert, and the toggle demotes that to a
//! no-op that reports the row the winner created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  ids::{CourseId, SubscriptionId, UserId},
  store::SubscriptionStore,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
  pub id:         SubscriptionId,
  pub user:       UserId,
  pub course:     CourseId,
  pub created_at: DateTime<Utc>,
}

/// Which way a toggle went, with the key fields of the affected record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Toggled {
  /// The freshly created record.
  Added(Subscription),
  /// The record that was just deleted.
  Removed(Subscription),
}

impl Toggled {
  pub fn subscription(&self) -> &Subscription {
    match self {
      Self::Added(s) | Self::Removed(s) => s,
    }
  }
}

/// Subscribe `user` to `course`, or unsubscribe them if already subscribed.
///
/// Fails with [`Error::InvalidRequest`] when `course` is missing and with
/// [`Error::NotFound`] when it names no course; the subscription set is left
/// untouched in both cases.
pub async fn toggle<S>(store: &S, user: UserId, course: Option<CourseId>) -> Result<Toggled>
where
  S: SubscriptionStore,
{
  let course = course.ok_or_else(|| Error::InvalidRequest("course_id is required".into()))?;

  if !store.course_exists(course).await.map_err(Into::<Error>::into)? {
    return Err(Error::NotFound(format!("course {course} not found")));
  }

  if let Some(existing) = store
    .find_subscription(user, course)
    .await
    .map_err(Into::<Error>::into)?
  {
    if !store
      .delete_subscription(existing.id)
      .await
      .map_err(Into::<Error>::into)?
    {
      tracing::debug!(%user, %course, "subscription already removed concurrently");
    }
    tracing::info!(%user, %course, subscription = %existing.id, "subscription removed");
    return Ok(Toggled::Removed(existing));
  }

  let created = match store
    .create_subscription(user, course)
    .await
    .map_err(Into::<Error>::into)?
  {
    Some(created) => created,
    None => {
      // Lost the race to a concurrent toggle; report the winner's row.
      tracing::debug!(%user, %course, "subscription created concurrently");
      store
        .find_subscription(user, course)
        .await
        .map_err(Into::<Error>::into)?
        .ok_or_else(|| {
          Error::Conflict(format!(
            "subscription of user {user} to course {course} changed concurrently"
          ))
        })?
    }
  };

  tracing::info!(%user, %course, subscription = %created.id, "subscription added");
  Ok(Toggled::Added(created))
}

#[cfg(test)]
mod tests {
  use std::{
    collections::HashSet,
    sync::{
      Mutex,
      atomic::{AtomicBool, Ordering},
    },
  };

  use super::*;
  use crate::store::Store;

  /// A minimal in-memory store. With `race` set, the next lookup misses while
  /// a competing row is slipped in, as if another toggle ran in between.
  #[derive(Default)]
  struct MemoryStore {
    courses: HashSet<CourseId>,
    rows:    Mutex<Vec<Subscription>>,
    next_id: Mutex<i64>,
    race:    AtomicBool,
  }

  impl MemoryStore {
    fn with_course(course: CourseId) -> Self {
      Self { courses: HashSet::from([course]), ..Default::default() }
    }

    fn insert(&self, user: UserId, course: CourseId) -> Option<Subscription> {
      let mut rows = self.rows.lock().unwrap();
      if rows.iter().any(|s| s.user == user && s.course == course) {
        return None;
      }
      let mut next = self.next_id.lock().unwrap();
      *next += 1;
      let sub = Subscription {
        id: SubscriptionId(*next),
        user,
        course,
        created_at: Utc::now(),
      };
      rows.push(sub.clone());
      Some(sub)
    }

    fn count(&self) -> usize { self.rows.lock().unwrap().len() }
  }

  #[derive(Debug, thiserror::Error)]
  #[error("memory store error")]
  struct MemoryError;

  impl From<MemoryError> for Error {
    fn from(e: MemoryError) -> Self { Error::store(e) }
  }

  impl Store for MemoryStore {
    type Error = MemoryError;
  }

  impl SubscriptionStore for MemoryStore {
    async fn course_exists(&self, course: CourseId) -> Result<bool, MemoryError> {
      Ok(self.courses.contains(&course))
    }

    async fn find_subscription(
      &self,
      user: UserId,
      course: CourseId,
    ) -> Result<Option<Subscription>, MemoryError> {
      if self.race.swap(false, Ordering::SeqCst) {
        self.insert(user, course);
        return Ok(None);
      }
      Ok(
        self
          .rows
          .lock()
          .unwrap()
          .iter()
          .find(|s| s.user == user && s.course == course)
          .cloned(),
      )
    }

    async fn create_subscription(
      &self,
      user: UserId,
      course: CourseId,
    ) -> Result<Option<Subscription>, MemoryError> {
      Ok(self.insert(user, course))
    }

    async fn delete_subscription(&self, id: SubscriptionId) -> Result<bool, MemoryError> {
      let mut rows = self.rows.lock().unwrap();
      let before = rows.len();
      rows.retain(|s| s.id != id);
      Ok(rows.len() != before)
    }

    async fn subscriber_emails(&self, _: CourseId) -> Result<Vec<String>, MemoryError> {
      Ok(vec![])
    }
  }

  const USER: UserId = UserId(1);
  const COURSE: CourseId = CourseId(9);

  #[tokio::test]
  async fn toggle_twice_adds_then_removes() {
    let store = MemoryStore::with_course(COURSE);

    let first = toggle(&store, USER, Some(COURSE)).await.unwrap();
    let Toggled::Added(added) = first else { panic!("expected Added, got {first:?}") };
    assert_eq!((added.user, added.course), (USER, COURSE));
    assert_eq!(store.count(), 1);

    let second = toggle(&store, USER, Some(COURSE)).await.unwrap();
    assert_eq!(second, Toggled::Removed(added));
    assert_eq!(store.count(), 0);
  }

  #[tokio::test]
  async fn unknown_course_is_not_found_and_changes_nothing() {
    let store = MemoryStore::with_course(COURSE);
    let err = toggle(&store, USER, Some(CourseId(404))).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(store.count(), 0);
  }

  #[tokio::test]
  async fn missing_course_id_is_invalid() {
    let store = MemoryStore::with_course(COURSE);
    let err = toggle(&store, USER, None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
  }

  #[tokio::test]
  async fn lost_insert_race_is_a_no_op() {
    let store = MemoryStore::with_course(COURSE);
    store.race.store(true, Ordering::SeqCst);

    let outcome = toggle(&store, USER, Some(COURSE)).await.unwrap();
    assert!(matches!(outcome, Toggled::Added(ref s) if s.user == USER && s.course == COURSE));
    assert_eq!(store.count(), 1);
  }

  #[test]
  fn toggled_serialises_with_action_tag() {
    let sub = Subscription {
      id:         SubscriptionId(3),
      user:       USER,
      course:     COURSE,
      created_at: Utc::now(),
    };
    let json = serde_json::to_value(Toggled::Removed(sub)).unwrap();
    assert_eq!(json["action"], "removed");
    assert_eq!(json["course"], 9);
  }
}
