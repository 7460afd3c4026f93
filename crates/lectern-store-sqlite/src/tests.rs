//! Integration tests for `SqliteStore` against an in-memory database.

use lectern_core::{
  account::{DEFAULT_AVATAR, NewUser, UserPatch},
  catalog::{CoursePatch, DEFAULT_COURSE_TITLE, LessonPatch, NewCourse, NewLesson},
  checkout::CheckoutSession,
  ids::{CourseId, PaymentId, UserId},
  payment::{NewPayment, PaidItem, PaymentMethod, PaymentQuery},
  store::{
    CatalogStore, CourseKey, LessonKey, Page, PaymentStore, SortBy, SubscriptionStore, UserKey,
    UserStore,
  },
  subscription::{Toggled, toggle},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, name: &str) -> UserId {
  s.create_user(NewUser::new(name, format!("{name}@example.com"), "hash"))
    .await
    .unwrap()
    .id
}

fn new_course(title: &str, price: i64) -> NewCourse {
  NewCourse { title: title.into(), preview: None, description: None, price }
}

fn new_lesson(title: &str) -> NewLesson {
  NewLesson {
    title:       title.into(),
    description: None,
    preview:     None,
    video_link:  None,
    course:      None,
    price:       0,
  }
}

fn payment(user: UserId, item: PaidItem, method: PaymentMethod) -> NewPayment {
  NewPayment { user, item, payment_amount: 1500, payment_method: method }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_user() {
  let s = store().await;
  let mut input = NewUser::new("ada", "ada@example.com", "$argon2id$stub");
  input.city = Some("London".into());
  let created = s.create_user(input).await.unwrap();

  assert_eq!(created.avatar, DEFAULT_AVATAR);
  assert_eq!(created.city.as_deref(), Some("London"));
  assert!(!created.is_superuser);
  assert!(!created.is_moderator);

  let fetched = s.get_user(created.id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_missing_user_returns_none() {
  let s = store().await;
  assert!(s.get_user(UserId(42)).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
  let s = store().await;
  s.create_user(NewUser::new("ada", "ada@example.com", "h"))
    .await
    .unwrap();
  let err = s
    .create_user(NewUser::new("ada2", "ada@example.com", "h"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(_)), "got {err:?}");

  let core: lectern_core::Error = err.into();
  assert!(matches!(core, lectern_core::Error::Conflict(_)));
}

#[tokio::test]
async fn credentials_are_looked_up_by_email() {
  let s = store().await;
  s.create_user(NewUser::new("ada", "ada@example.com", "secret-hash"))
    .await
    .unwrap();

  let creds = s.get_credentials("ada@example.com").await.unwrap().unwrap();
  assert_eq!(creds.password_hash, "secret-hash");
  assert_eq!(creds.user.username, "ada");

  assert!(s.get_credentials("ada").await.unwrap().is_none());
}

#[tokio::test]
async fn update_user_patches_only_given_fields() {
  let s = store().await;
  let mut input = NewUser::new("ada", "ada@example.com", "h");
  input.phone_number = Some("555".into());
  input.city = Some("London".into());
  let id = s.create_user(input).await.unwrap().id;

  let patch = UserPatch {
    username: Some("ada.l".into()),
    city: Some(None),
    ..Default::default()
  };
  let updated = s.update_user(id, patch).await.unwrap().unwrap();
  assert_eq!(updated.username, "ada.l");
  assert_eq!(updated.phone_number.as_deref(), Some("555"));
  assert_eq!(updated.city, None);

  assert!(
    s.update_user(UserId(999), UserPatch::default())
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn list_users_pages_by_id() {
  let s = store().await;
  for name in ["a", "b", "c"] {
    user(&s, name).await;
  }

  let by_id = SortBy::default();
  let first = s.list_users(Page { limit: 2, offset: 0 }, by_id).await.unwrap();
  let rest = s.list_users(Page { limit: 2, offset: 2 }, by_id).await.unwrap();
  assert_eq!(first.len(), 2);
  assert_eq!(rest.len(), 1);
  assert_eq!(rest[0].username, "c");

  let newest = SortBy { key: UserKey::Id, descending: true };
  let names: Vec<_> = s
    .list_users(Page::default(), newest)
    .await
    .unwrap()
    .into_iter()
    .map(|u| u.username)
    .collect();
  assert_eq!(names, ["c", "b", "a"]);
}

#[tokio::test]
async fn moderator_flag_follows_group_membership() {
  let s = store().await;
  let id = user(&s, "mod").await;

  s.set_moderator(id, true).await.unwrap();
  s.set_moderator(id, true).await.unwrap();
  assert!(s.get_user(id).await.unwrap().unwrap().is_moderator);

  s.set_moderator(id, false).await.unwrap();
  assert!(!s.get_user(id).await.unwrap().unwrap().is_moderator);
}

#[tokio::test]
async fn deleting_a_user_clears_ownership_and_cascades_records() {
  let s = store().await;
  let owner = user(&s, "owner").await;
  let course = s
    .create_course(Some(owner), new_course("Rust", 1000))
    .await
    .unwrap();
  s.create_subscription(owner, course.id).await.unwrap();
  s.create_payment(payment(owner, PaidItem::Course(course.id), PaymentMethod::Cash))
    .await
    .unwrap();

  assert!(s.delete_user(owner).await.unwrap());
  assert!(!s.delete_user(owner).await.unwrap());

  let course = s.get_course(course.id).await.unwrap().unwrap();
  assert_eq!(course.owner, None);
  assert!(s.find_subscription(owner, course.id).await.unwrap().is_none());
  let all = s.list_payments(&PaymentQuery::default()).await.unwrap();
  assert!(all.is_empty());
}

// ─── Courses and lessons ─────────────────────────────────────────────────────

#[tokio::test]
async fn course_update_bumps_updated_at() {
  let s = store().await;
  let course = s.create_course(None, new_course("Rust", 1000)).await.unwrap();

  let patch = CoursePatch { price: Some(2000), ..Default::default() };
  let updated = s.update_course(course.id, patch).await.unwrap().unwrap();
  assert_eq!(updated.price, 2000);
  assert_eq!(updated.title, "Rust");
  assert!(updated.updated_at >= course.updated_at);

  assert!(
    s.update_course(CourseId(999), CoursePatch::default())
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn duplicate_course_title_is_a_conflict() {
  let s = store().await;
  s.create_course(None, new_course("Rust", 0)).await.unwrap();
  let err = s.create_course(None, new_course("Rust", 0)).await.unwrap_err();
  assert!(matches!(err, Error::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn default_course_is_created_once() {
  let s = store().await;
  let first = s.default_course().await.unwrap();
  let second = s.default_course().await.unwrap();
  assert_eq!(first.id, second.id);
  assert_eq!(first.title, DEFAULT_COURSE_TITLE);
}

#[tokio::test]
async fn lessons_belong_to_a_course() {
  let s = store().await;
  let owner = user(&s, "owner").await;
  let course = s.create_course(Some(owner), new_course("Rust", 0)).await.unwrap();

  let lesson = s
    .create_lesson(Some(owner), course.id, new_lesson("Ownership"))
    .await
    .unwrap();
  assert_eq!(lesson.course, course.id);
  assert_eq!(lesson.owner, Some(owner));

  let patch = LessonPatch {
    video_link: Some(Some("https://youtu.be/abc".into())),
    ..Default::default()
  };
  let updated = s.update_lesson(lesson.id, patch).await.unwrap().unwrap();
  assert_eq!(updated.video_link.as_deref(), Some("https://youtu.be/abc"));

  assert_eq!(s.list_lessons(Page::default(), SortBy::default()).await.unwrap().len(), 1);

  // Lessons go with their course.
  assert!(s.delete_course(course.id).await.unwrap());
  assert!(s.get_lesson(lesson.id).await.unwrap().is_none());
}

#[tokio::test]
async fn lesson_in_unknown_course_is_a_missing_reference() {
  let s = store().await;
  let err = s
    .create_lesson(None, CourseId(77), new_lesson("Orphan"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::MissingReference), "got {err:?}");

  let core: lectern_core::Error = err.into();
  assert!(matches!(core, lectern_core::Error::NotFound(_)));
}

#[tokio::test]
async fn courses_are_listed_by_title() {
  let s = store().await;
  s.create_course(None, new_course("Zig", 0)).await.unwrap();
  s.create_course(None, new_course("Ada", 0)).await.unwrap();

  let s = &s;
  let titles = |sort: SortBy<CourseKey>| async move {
    s.list_courses(Page::default(), sort)
      .await
      .unwrap()
      .into_iter()
      .map(|c| c.title)
      .collect::<Vec<_>>()
  };
  assert_eq!(titles(SortBy::default()).await, ["Ada", "Zig"]);
  assert_eq!(
    titles(SortBy { key: CourseKey::Title, descending: true }).await,
    ["Zig", "Ada"]
  );
}

#[tokio::test]
async fn lessons_order_by_course_or_title() {
  let s = store().await;
  let first = s.create_course(None, new_course("First", 0)).await.unwrap();
  let second = s.create_course(None, new_course("Second", 0)).await.unwrap();
  s.create_lesson(None, second.id, new_lesson("Alpha")).await.unwrap();
  s.create_lesson(None, first.id, new_lesson("Omega")).await.unwrap();
  s.create_lesson(None, first.id, new_lesson("Beta")).await.unwrap();

  let s = &s;
  let titles = |sort: SortBy<LessonKey>| async move {
    s.list_lessons(Page::default(), sort)
      .await
      .unwrap()
      .into_iter()
      .map(|l| l.title)
      .collect::<Vec<_>>()
  };
  assert_eq!(titles(SortBy::default()).await, ["Beta", "Omega", "Alpha"]);
  assert_eq!(
    titles(SortBy { key: LessonKey::Course, descending: true }).await,
    ["Alpha", "Beta", "Omega"]
  );
  assert_eq!(
    titles(SortBy { key: LessonKey::Title, descending: false }).await,
    ["Alpha", "Beta", "Omega"]
  );
  assert_eq!(
    titles(SortBy { key: LessonKey::Title, descending: true }).await,
    ["Omega", "Beta", "Alpha"]
  );
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_subscription_is_reported_as_none() {
  let s = store().await;
  let u = user(&s, "u").await;
  let course = s.create_course(None, new_course("Rust", 0)).await.unwrap();

  let first = s.create_subscription(u, course.id).await.unwrap().unwrap();
  assert!(s.create_subscription(u, course.id).await.unwrap().is_none());

  let found = s.find_subscription(u, course.id).await.unwrap().unwrap();
  assert_eq!(found, first);

  assert!(s.delete_subscription(first.id).await.unwrap());
  assert!(!s.delete_subscription(first.id).await.unwrap());
}

#[tokio::test]
async fn toggle_round_trips_against_sqlite() {
  let s = store().await;
  let u = user(&s, "u").await;
  let course = s.create_course(None, new_course("Rust", 0)).await.unwrap();

  let added = toggle(&s, u, Some(course.id)).await.unwrap();
  assert!(matches!(added, Toggled::Added(_)));
  assert_eq!(s.subscriber_emails(course.id).await.unwrap(), ["u@example.com"]);

  let removed = toggle(&s, u, Some(course.id)).await.unwrap();
  assert_eq!(removed, Toggled::Removed(added.subscription().clone()));
  assert!(s.subscriber_emails(course.id).await.unwrap().is_empty());

  let err = toggle(&s, u, Some(CourseId(999))).await.unwrap_err();
  assert!(matches!(err, lectern_core::Error::NotFound(_)));
}

#[tokio::test]
async fn concurrent_toggles_leave_one_row() {
  let s = store().await;
  let u = user(&s, "u").await;
  let course = s.create_course(None, new_course("Rust", 0)).await.unwrap();

  let (a, b) = tokio::join!(
    toggle(&s, u, Some(course.id)),
    toggle(&s, u, Some(course.id)),
  );
  let (Toggled::Added(a), Toggled::Added(b)) = (a.unwrap(), b.unwrap()) else {
    panic!("both racing toggles should report the subscription as added");
  };
  assert_eq!(a.id, b.id);

  let row = s.find_subscription(u, course.id).await.unwrap().unwrap();
  assert_eq!(row.id, a.id);
  assert_eq!(s.subscriber_emails(course.id).await.unwrap(), ["u@example.com"]);
}

// ─── Payments ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn payments_filter_and_order() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let bob = user(&s, "bob").await;
  let course = s.create_course(None, new_course("Rust", 1500)).await.unwrap();
  let lesson = s
    .create_lesson(None, course.id, new_lesson("Traits"))
    .await
    .unwrap();

  let p1 = s
    .create_payment(payment(ada, PaidItem::Course(course.id), PaymentMethod::Cash))
    .await
    .unwrap();
  let p2 = s
    .create_payment(payment(ada, PaidItem::Lesson(lesson.id), PaymentMethod::Transfer))
    .await
    .unwrap();
  let p3 = s
    .create_payment(payment(bob, PaidItem::Course(course.id), PaymentMethod::Transfer))
    .await
    .unwrap();

  let ids = |ps: Vec<lectern_core::payment::Payment>| -> Vec<PaymentId> {
    ps.into_iter().map(|p| p.id).collect()
  };

  let newest_first = s.list_payments(&PaymentQuery::default()).await.unwrap();
  assert_eq!(ids(newest_first), [p3.id, p2.id, p1.id]);

  let q = PaymentQuery { oldest_first: true, ..Default::default() };
  assert_eq!(ids(s.list_payments(&q).await.unwrap()), [p1.id, p2.id, p3.id]);

  let q = PaymentQuery { user: Some(ada), ..Default::default() };
  assert_eq!(ids(s.list_payments(&q).await.unwrap()), [p2.id, p1.id]);

  let q = PaymentQuery { paid_course: Some(course.id), ..Default::default() };
  assert_eq!(ids(s.list_payments(&q).await.unwrap()), [p3.id, p1.id]);

  let q = PaymentQuery { paid_lesson: Some(lesson.id), ..Default::default() };
  assert_eq!(ids(s.list_payments(&q).await.unwrap()), [p2.id]);

  let q = PaymentQuery {
    payment_method: Some(PaymentMethod::Transfer),
    page: Some(Page { limit: 1, offset: 0 }),
    ..Default::default()
  };
  assert_eq!(ids(s.list_payments(&q).await.unwrap()), [p3.id]);
}

#[tokio::test]
async fn payments_can_be_deleted() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let course = s.create_course(None, new_course("Rust", 1500)).await.unwrap();
  let created = s
    .create_payment(payment(ada, PaidItem::Course(course.id), PaymentMethod::Transfer))
    .await
    .unwrap();

  assert!(s.delete_payment(created.id).await.unwrap());
  assert!(!s.delete_payment(created.id).await.unwrap());
  assert!(s.get_payment(created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn checkout_fields_are_attached() {
  let s = store().await;
  let ada = user(&s, "ada").await;
  let course = s.create_course(None, new_course("Rust", 1500)).await.unwrap();
  let created = s
    .create_payment(payment(ada, PaidItem::Course(course.id), PaymentMethod::Transfer))
    .await
    .unwrap();
  assert_eq!(created.checkout, None);
  assert_eq!(created.paid_course, Some(course.id));

  let session = CheckoutSession {
    product_id: "prod_1".into(),
    price_id:   "price_1".into(),
    session_id: "cs_1".into(),
    url:        "https://pay.example.com/cs_1".into(),
  };
  let updated = s
    .attach_checkout(created.id, session.clone())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.checkout, Some(session.clone()));

  assert!(s.attach_checkout(PaymentId(999), session).await.unwrap().is_none());
}
