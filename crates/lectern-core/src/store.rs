//! Persistence traits and supporting query types.
//!
//! The traits are implemented by storage backends (e.g.
//! `lectern-store-sqlite`). The policy, the toggle and the HTTP layer depend
//! on these abstractions, never on a concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::{future::Future, str::FromStr};

use strum::EnumString;

use crate::{
  Error,
  account::{Credentials, NewUser, User, UserPatch},
  catalog::{Course, CoursePatch, Lesson, LessonPatch, NewCourse, NewLesson},
  checkout::CheckoutSession,
  ids::{CourseId, LessonId, PaymentId, SubscriptionId, UserId},
  payment::{NewPayment, Payment, PaymentQuery},
  subscription::Subscription,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Page window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub limit:  usize,
  pub offset: usize,
}

impl Page {
  pub const DEFAULT_SIZE: usize = 10;
  pub const MAX_SIZE: usize = 100;

  /// Build a window from 1-based `page` and `page_size` query parameters.
  ///
  /// Fails with [`Error::InvalidRequest`] when the offset does not fit a
  /// signed 64-bit integer, which is what SQL backends bind it as.
  pub fn from_params(page: Option<usize>, page_size: Option<usize>) -> Result<Self, Error> {
    let size = page_size
      .unwrap_or(Self::DEFAULT_SIZE)
      .clamp(1, Self::MAX_SIZE);
    let page = page.unwrap_or(1).max(1);
    let offset = (page - 1)
      .checked_mul(size)
      .filter(|offset| i64::try_from(*offset).is_ok())
      .ok_or_else(|| Error::InvalidRequest(format!("page {page} is out of range")))?;
    Ok(Self { limit: size, offset })
  }
}

impl Default for Page {
  fn default() -> Self { Self { limit: Self::DEFAULT_SIZE, offset: 0 } }
}

/// A sort key and direction, parsed from an `?ordering=` value such as
/// `title` or `-title`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortBy<K> {
  pub key:        K,
  pub descending: bool,
}

impl<K: FromStr + Default> SortBy<K> {
  /// An absent value yields the default key, ascending.
  pub fn parse(value: Option<&str>) -> Result<Self, Error> {
    let Some(value) = value else { return Ok(Self::default()) };
    let (descending, field) = match value.strip_prefix('-') {
      Some(field) => (true, field),
      None => (false, value),
    };
    let key = field
      .parse()
      .map_err(|_| Error::InvalidRequest(format!("cannot order by {value:?}")))?;
    Ok(Self { key, descending })
  }

  /// `ASC` or `DESC`.
  pub fn direction(&self) -> &'static str {
    if self.descending { "DESC" } else { "ASC" }
  }
}

/// Sort keys of the course list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum CourseKey {
  #[default]
  Title,
}

/// Sort keys of the lesson list. Ordering by course breaks ties by title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum LessonKey {
  #[default]
  Course,
  Title,
}

/// Sort keys of the account list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum UserKey {
  #[default]
  Id,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Shared error type of a storage backend.
///
/// Backend errors convert into the core taxonomy so uniqueness and
/// missing-reference failures reach the caller as `Conflict` and `NotFound`.
pub trait Store: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;
}

pub trait UserStore: Store {
  /// Persist a new account. Fails if the email or username is taken.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up an account and its password hash by email (the login name).
  fn get_credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + 'a;

  fn list_users(
    &self,
    page: Page,
    sort: SortBy<UserKey>,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Apply `patch`. Returns `None` if the account does not exist.
  fn update_user(
    &self,
    id: UserId,
    patch: UserPatch,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Returns `false` if there was nothing to delete.
  fn delete_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Add the account to, or remove it from, the moderators group.
  fn set_moderator(
    &self,
    id: UserId,
    moderator: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

pub trait CatalogStore: Store {
  fn create_course(
    &self,
    owner: Option<UserId>,
    input: NewCourse,
  ) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  fn get_course(
    &self,
    id: CourseId,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  fn list_courses(
    &self,
    page: Page,
    sort: SortBy<CourseKey>,
  ) -> impl Future<Output = Result<Vec<Course>, Self::Error>> + Send + '_;

  /// Apply `patch` and bump `updated_at`. Returns `None` if absent.
  fn update_course(
    &self,
    id: CourseId,
    patch: CoursePatch,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  fn delete_course(
    &self,
    id: CourseId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// The catch-all course, created on first use.
  fn default_course(&self) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  /// `input.course` must already be resolved to an existing course.
  fn create_lesson(
    &self,
    owner: Option<UserId>,
    course: CourseId,
    input: NewLesson,
  ) -> impl Future<Output = Result<Lesson, Self::Error>> + Send + '_;

  fn get_lesson(
    &self,
    id: LessonId,
  ) -> impl Future<Output = Result<Option<Lesson>, Self::Error>> + Send + '_;

  fn list_lessons(
    &self,
    page: Page,
    sort: SortBy<LessonKey>,
  ) -> impl Future<Output = Result<Vec<Lesson>, Self::Error>> + Send + '_;

  fn update_lesson(
    &self,
    id: LessonId,
    patch: LessonPatch,
  ) -> impl Future<Output = Result<Option<Lesson>, Self::Error>> + Send + '_;

  fn delete_lesson(
    &self,
    id: LessonId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

/// The persistence surface the subscription toggle needs.
///
/// Implementations must enforce uniqueness of `(user, course)` at the storage
/// level.
pub trait SubscriptionStore: Store {
  fn course_exists(
    &self,
    course: CourseId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn find_subscription(
    &self,
    user: UserId,
    course: CourseId,
  ) -> impl Future<Output = Result<Option<Subscription>, Self::Error>> + Send + '_;

  /// Insert a subscription. Returns `None`, not an error, when the uniqueness
  /// constraint rejected the row because it already exists.
  fn create_subscription(
    &self,
    user: UserId,
    course: CourseId,
  ) -> impl Future<Output = Result<Option<Subscription>, Self::Error>> + Send + '_;

  /// Returns `false` if the row was already gone.
  fn delete_subscription(
    &self,
    id: SubscriptionId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Email addresses of everybody subscribed to `course`.
  fn subscriber_emails(
    &self,
    course: CourseId,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;
}

pub trait PaymentStore: Store {
  fn create_payment(
    &self,
    input: NewPayment,
  ) -> impl Future<Output = Result<Payment, Self::Error>> + Send + '_;

  /// Returns `false` if there was nothing to delete.
  fn delete_payment(
    &self,
    id: PaymentId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn get_payment(
    &self,
    id: PaymentId,
  ) -> impl Future<Output = Result<Option<Payment>, Self::Error>> + Send + '_;

  fn list_payments<'a>(
    &'a self,
    query: &'a PaymentQuery,
  ) -> impl Future<Output = Result<Vec<Payment>, Self::Error>> + Send + 'a;

  /// Record the gateway identifiers of a checkout on a payment.
  fn attach_checkout(
    &self,
    id: PaymentId,
    session: CheckoutSession,
  ) -> impl Future<Output = Result<Option<Payment>, Self::Error>> + Send + '_;
}

/// Everything the HTTP layer needs from a backend.
pub trait LmsStore: UserStore + CatalogStore + SubscriptionStore + PaymentStore {}

impl<T> LmsStore for T where T: UserStore + CatalogStore + SubscriptionStore + PaymentStore {}
