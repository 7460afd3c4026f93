//! [`SqliteStore`]: the SQLite implementation of the Lectern store traits.

use std::path::Path;

use rusqlite::{OptionalExtension as _, types::Value};

use lectern_core::{
  account::{Credentials, DEFAULT_AVATAR, MODERATORS_GROUP, NewUser, User, UserPatch},
  catalog::{
    Course, CoursePatch, DEFAULT_COURSE_TITLE, DEFAULT_PREVIEW, Lesson, LessonPatch,
    NewCourse, NewLesson,
  },
  checkout::CheckoutSession,
  ids::{CourseId, LessonId, PaymentId, SubscriptionId, UserId},
  payment::{NewPayment, PaidItem, Payment, PaymentQuery},
  store::{
    CatalogStore, CourseKey, LessonKey, Page, PaymentStore, SortBy, Store, SubscriptionStore,
    UserKey, UserStore,
  },
  subscription::Subscription,
};

use crate::{
  Error, Result,
  encode::{
    RawCourse, RawLesson, RawPayment, RawSubscription, RawUser, encode_dt, encode_method,
    now,
  },
  schema::SCHEMA,
};

// ─── Column lists ────────────────────────────────────────────────────────────

/// Account columns in [`RawUser`] order, with city name and moderator flag
/// resolved.
pub(crate) fn user_select() -> String {
  format!(
    "SELECT u.user_id, u.username, u.email, u.phone_number, u.avatar, c.name,
            u.is_superuser,
            EXISTS (
              SELECT 1 FROM auth_group_members m
              JOIN auth_groups g ON g.group_id = m.group_id
              WHERE m.user_id = u.user_id AND g.name = '{MODERATORS_GROUP}'
            ),
            u.password_hash
     FROM users u
     LEFT JOIN cities c ON c.city_id = u.city_id"
  )
}

const COURSE_SELECT: &str = "
  SELECT course_id, title, preview, description, price, owner_id, updated_at
  FROM courses";

const LESSON_SELECT: &str = "
  SELECT lesson_id, title, description, preview, video_link, course_id, owner_id,
         price, created_at, updated_at
  FROM lessons";

const SUBSCRIPTION_SELECT: &str = "
  SELECT subscription_id, user_id, course_id, created_at
  FROM subscriptions";

const PAYMENT_SELECT: &str = "
  SELECT payment_id, user_id, payment_amount, paid_course_id, paid_lesson_id,
         payment_method, created_at, checkout_product_id, checkout_price_id,
         checkout_session_id, checkout_url
  FROM payments";

/// Resolve a city name to its row id, creating the row on first use.
fn city_id(conn: &rusqlite::Connection, name: Option<&str>) -> rusqlite::Result<Option<i64>> {
  let Some(name) = name else { return Ok(None) };
  conn.execute("INSERT OR IGNORE INTO cities (name) VALUES (?1)", [name])?;
  conn
    .query_row("SELECT city_id FROM cities WHERE name = ?1", [name], |r| r.get(0))
    .map(Some)
}

fn row_exists(conn: &rusqlite::Connection, sql: &str, id: i64) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, [id], |_| Ok(())).optional()?.is_some())
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lectern store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "sqlite store opened");
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn user_where(&self, clause: &'static str, key: Value) -> Result<Option<RawUser>> {
    let sql = format!("{} WHERE {clause}", user_select());
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, [key], RawUser::from_row).optional()?)
      })
      .await?;
    Ok(raw)
  }
}

impl Store for SqliteStore {
  type Error = Error;
}

// ─── Users ───────────────────────────────────────────────────────────────────

impl UserStore for SqliteStore {
  async fn create_user(&self, input: NewUser) -> Result<User> {
    let what       = format!("user {}", input.email);
    let created_at = encode_dt(now());
    let avatar     = input.avatar.unwrap_or_else(|| DEFAULT_AVATAR.to_owned());

    let id: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let city = city_id(&tx, input.city.as_deref())?;
        tx.execute(
          "INSERT INTO users (
             username, email, password_hash, phone_number, avatar, city_id,
             is_superuser, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            input.username,
            input.email,
            input.password_hash,
            input.phone_number,
            avatar,
            city,
            input.is_superuser,
            created_at,
          ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
      })
      .await
      .map_err(|e| Error::from_write(e, what))?;

    self
      .get_user(UserId(id))
      .await?
      .ok_or_else(|| Error::Decode(format!("user {id} vanished after insert")))
  }

  async fn get_user(&self, id: UserId) -> Result<Option<User>> {
    let raw = self.user_where("u.user_id = ?1", Value::Integer(id.0)).await?;
    Ok(raw.map(RawUser::into_user))
  }

  async fn get_credentials<'a>(&'a self, email: &'a str) -> Result<Option<Credentials>> {
    let raw = self.user_where("u.email = ?1", Value::Text(email.to_owned())).await?;
    Ok(raw.map(|raw| {
      let password_hash = raw.password_hash.clone();
      Credentials { user: raw.into_user(), password_hash }
    }))
  }

  async fn list_users(&self, page: Page, sort: SortBy<UserKey>) -> Result<Vec<User>> {
    let order = match sort.key {
      UserKey::Id => format!("u.user_id {}", sort.direction()),
    };
    let sql    = format!("{} ORDER BY {order} LIMIT ?1 OFFSET ?2", user_select());
    let limit  = page.limit as i64;
    let offset = page.offset as i64;

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![limit, offset], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawUser::into_user).collect())
  }

  async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<Option<User>> {
    let what = format!("user {id}");

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !row_exists(&tx, "SELECT 1 FROM users WHERE user_id = ?1", id.0)? {
          return Ok(false);
        }

        if let Some(username) = patch.username {
          tx.execute(
            "UPDATE users SET username = ?2 WHERE user_id = ?1",
            rusqlite::params![id.0, username],
          )?;
        }
        if let Some(email) = patch.email {
          tx.execute(
            "UPDATE users SET email = ?2 WHERE user_id = ?1",
            rusqlite::params![id.0, email],
          )?;
        }
        if let Some(phone) = patch.phone_number {
          tx.execute(
            "UPDATE users SET phone_number = ?2 WHERE user_id = ?1",
            rusqlite::params![id.0, phone],
          )?;
        }
        if let Some(avatar) = patch.avatar {
          tx.execute(
            "UPDATE users SET avatar = ?2 WHERE user_id = ?1",
            rusqlite::params![id.0, avatar],
          )?;
        }
        if let Some(city) = patch.city {
          let city = city_id(&tx, city.as_deref())?;
          tx.execute(
            "UPDATE users SET city_id = ?2 WHERE user_id = ?1",
            rusqlite::params![id.0, city],
          )?;
        }

        tx.commit()?;
        Ok(true)
      })
      .await
      .map_err(|e| Error::from_write(e, what))?;

    if !found {
      return Ok(None);
    }
    self.get_user(id).await
  }

  async fn delete_user(&self, id: UserId) -> Result<bool> {
    let n = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM users WHERE user_id = ?1", [id.0])?))
      .await?;
    Ok(n > 0)
  }

  async fn set_moderator(&self, id: UserId, moderator: bool) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT OR IGNORE INTO auth_groups (name) VALUES (?1)",
          [MODERATORS_GROUP],
        )?;
        let group: i64 = tx.query_row(
          "SELECT group_id FROM auth_groups WHERE name = ?1",
          [MODERATORS_GROUP],
          |r| r.get(0),
        )?;
        if moderator {
          tx.execute(
            "INSERT OR IGNORE INTO auth_group_members (group_id, user_id) VALUES (?1, ?2)",
            rusqlite::params![group, id.0],
          )?;
        } else {
          tx.execute(
            "DELETE FROM auth_group_members WHERE group_id = ?1 AND user_id = ?2",
            rusqlite::params![group, id.0],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(|e| Error::from_write(e, format!("moderator membership of user {id}")))
  }
}

// ─── Courses and lessons ─────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  async fn create_course(&self, owner: Option<UserId>, input: NewCourse) -> Result<Course> {
    let what       = format!("course {:?}", input.title);
    let updated_at = encode_dt(now());
    let preview    = input.preview.unwrap_or_else(|| DEFAULT_PREVIEW.to_owned());
    let owner_id   = owner.map(|o| o.0);

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO courses (title, preview, description, price, owner_id, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            input.title,
            preview,
            input.description,
            input.price,
            owner_id,
            updated_at,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(|e| Error::from_write(e, what))?;

    self
      .get_course(CourseId(id))
      .await?
      .ok_or_else(|| Error::Decode(format!("course {id} vanished after insert")))
  }

  async fn get_course(&self, id: CourseId) -> Result<Option<Course>> {
    let raw: Option<RawCourse> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{COURSE_SELECT} WHERE course_id = ?1"),
              [id.0],
              RawCourse::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawCourse::into_course).transpose()
  }

  async fn list_courses(&self, page: Page, sort: SortBy<CourseKey>) -> Result<Vec<Course>> {
    let limit  = page.limit as i64;
    let offset = page.offset as i64;
    let order  = match sort.key {
      CourseKey::Title => format!("title {0}, course_id {0}", sort.direction()),
    };

    let raws: Vec<RawCourse> = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare(&format!("{COURSE_SELECT} ORDER BY {order} LIMIT ?1 OFFSET ?2"))?;
        let rows = stmt
          .query_map(rusqlite::params![limit, offset], RawCourse::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCourse::into_course).collect()
  }

  async fn update_course(&self, id: CourseId, patch: CoursePatch) -> Result<Option<Course>> {
    let what       = format!("course {id}");
    let updated_at = encode_dt(now());

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !row_exists(&tx, "SELECT 1 FROM courses WHERE course_id = ?1", id.0)? {
          return Ok(false);
        }

        if let Some(title) = patch.title {
          tx.execute(
            "UPDATE courses SET title = ?2 WHERE course_id = ?1",
            rusqlite::params![id.0, title],
          )?;
        }
        if let Some(preview) = patch.preview {
          tx.execute(
            "UPDATE courses SET preview = ?2 WHERE course_id = ?1",
            rusqlite::params![id.0, preview],
          )?;
        }
        if let Some(description) = patch.description {
          tx.execute(
            "UPDATE courses SET description = ?2 WHERE course_id = ?1",
            rusqlite::params![id.0, description],
          )?;
        }
        if let Some(price) = patch.price {
          tx.execute(
            "UPDATE courses SET price = ?2 WHERE course_id = ?1",
            rusqlite::params![id.0, price],
          )?;
        }
        tx.execute(
          "UPDATE courses SET updated_at = ?2 WHERE course_id = ?1",
          rusqlite::params![id.0, updated_at],
        )?;

        tx.commit()?;
        Ok(true)
      })
      .await
      .map_err(|e| Error::from_write(e, what))?;

    if !found {
      return Ok(None);
    }
    self.get_course(id).await
  }

  async fn delete_course(&self, id: CourseId) -> Result<bool> {
    let n = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM courses WHERE course_id = ?1", [id.0])?))
      .await?;
    Ok(n > 0)
  }

  async fn default_course(&self) -> Result<Course> {
    let updated_at = encode_dt(now());

    let raw: RawCourse = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO courses (title, preview, price, updated_at)
           VALUES (?1, ?2, 0, ?3)",
          rusqlite::params![DEFAULT_COURSE_TITLE, DEFAULT_PREVIEW, updated_at],
        )?;
        Ok(conn.query_row(
          &format!("{COURSE_SELECT} WHERE title = ?1"),
          [DEFAULT_COURSE_TITLE],
          RawCourse::from_row,
        )?)
      })
      .await?;

    raw.into_course()
  }

  async fn create_lesson(
    &self,
    owner: Option<UserId>,
    course: CourseId,
    input: NewLesson,
  ) -> Result<Lesson> {
    let what     = format!("lesson {:?}", input.title);
    let at       = encode_dt(now());
    let preview  = input.preview.unwrap_or_else(|| DEFAULT_PREVIEW.to_owned());
    let owner_id = owner.map(|o| o.0);

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO lessons (
             title, description, preview, video_link, course_id, owner_id, price,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          rusqlite::params![
            input.title,
            input.description,
            preview,
            input.video_link,
            course.0,
            owner_id,
            input.price,
            at,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(|e| Error::from_write(e, what))?;

    self
      .get_lesson(LessonId(id))
      .await?
      .ok_or_else(|| Error::Decode(format!("lesson {id} vanished after insert")))
  }

  async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>> {
    let raw: Option<RawLesson> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{LESSON_SELECT} WHERE lesson_id = ?1"),
              [id.0],
              RawLesson::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawLesson::into_lesson).transpose()
  }

  async fn list_lessons(&self, page: Page, sort: SortBy<LessonKey>) -> Result<Vec<Lesson>> {
    let limit  = page.limit as i64;
    let offset = page.offset as i64;
    let dir    = sort.direction();
    let order  = match sort.key {
      LessonKey::Course => format!("course_id {dir}, title, lesson_id"),
      LessonKey::Title => format!("title {dir}, lesson_id {dir}"),
    };

    let raws: Vec<RawLesson> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{LESSON_SELECT} ORDER BY {order} LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit, offset], RawLesson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLesson::into_lesson).collect()
  }

  async fn update_lesson(&self, id: LessonId, patch: LessonPatch) -> Result<Option<Lesson>> {
    let what       = format!("lesson {id}");
    let updated_at = encode_dt(now());

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !row_exists(&tx, "SELECT 1 FROM lessons WHERE lesson_id = ?1", id.0)? {
          return Ok(false);
        }

        if let Some(title) = patch.title {
          tx.execute(
            "UPDATE lessons SET title = ?2 WHERE lesson_id = ?1",
            rusqlite::params![id.0, title],
          )?;
        }
        if let Some(description) = patch.description {
          tx.execute(
            "UPDATE lessons SET description = ?2 WHERE lesson_id = ?1",
            rusqlite::params![id.0, description],
          )?;
        }
        if let Some(preview) = patch.preview {
          tx.execute(
            "UPDATE lessons SET preview = ?2 WHERE lesson_id = ?1",
            rusqlite::params![id.0, preview],
          )?;
        }
        if let Some(video_link) = patch.video_link {
          tx.execute(
            "UPDATE lessons SET video_link = ?2 WHERE lesson_id = ?1",
            rusqlite::params![id.0, video_link],
          )?;
        }
        if let Some(course) = patch.course {
          tx.execute(
            "UPDATE lessons SET course_id = ?2 WHERE lesson_id = ?1",
            rusqlite::params![id.0, course.0],
          )?;
        }
        if let Some(price) = patch.price {
          tx.execute(
            "UPDATE lessons SET price = ?2 WHERE lesson_id = ?1",
            rusqlite::params![id.0, price],
          )?;
        }
        tx.execute(
          "UPDATE lessons SET updated_at = ?2 WHERE lesson_id = ?1",
          rusqlite::params![id.0, updated_at],
        )?;

        tx.commit()?;
        Ok(true)
      })
      .await
      .map_err(|e| Error::from_write(e, what))?;

    if !found {
      return Ok(None);
    }
    self.get_lesson(id).await
  }

  async fn delete_lesson(&self, id: LessonId) -> Result<bool> {
    let n = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM lessons WHERE lesson_id = ?1", [id.0])?))
      .await?;
    Ok(n > 0)
  }
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

impl SubscriptionStore for SqliteStore {
  async fn course_exists(&self, course: CourseId) -> Result<bool> {
    let exists = self
      .conn
      .call(move |conn| {
        Ok(row_exists(conn, "SELECT 1 FROM courses WHERE course_id = ?1", course.0)?)
      })
      .await?;
    Ok(exists)
  }

  async fn find_subscription(
    &self,
    user: UserId,
    course: CourseId,
  ) -> Result<Option<Subscription>> {
    let raw: Option<RawSubscription> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{SUBSCRIPTION_SELECT} WHERE user_id = ?1 AND course_id = ?2"),
              rusqlite::params![user.0, course.0],
              RawSubscription::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSubscription::into_subscription).transpose()
  }

  async fn create_subscription(
    &self,
    user: UserId,
    course: CourseId,
  ) -> Result<Option<Subscription>> {
    let created_at = now();
    let at_str     = encode_dt(created_at);

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO subscriptions (user_id, course_id, created_at) VALUES (?1, ?2, ?3)
           ON CONFLICT (user_id, course_id) DO NOTHING",
          rusqlite::params![user.0, course.0, at_str],
        )?;
        Ok((n > 0).then(|| conn.last_insert_rowid()))
      })
      .await
      .map_err(|e| Error::from_write(e, format!("subscription of user {user} to course {course}")))?;

    Ok(id.map(|id| Subscription { id: SubscriptionId(id), user, course, created_at }))
  }

  async fn delete_subscription(&self, id: SubscriptionId) -> Result<bool> {
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM subscriptions WHERE subscription_id = ?1", [id.0])?)
      })
      .await?;
    Ok(n > 0)
  }

  async fn subscriber_emails(&self, course: CourseId) -> Result<Vec<String>> {
    let emails = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT u.email
           FROM subscriptions s
           JOIN users u ON u.user_id = s.user_id
           WHERE s.course_id = ?1
           ORDER BY u.email",
        )?;
        let rows = stmt
          .query_map([course.0], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(emails)
  }
}

// ─── Payments ────────────────────────────────────────────────────────────────

impl PaymentStore for SqliteStore {
  async fn create_payment(&self, input: NewPayment) -> Result<Payment> {
    let created_at = encode_dt(now());
    let method     = encode_method(input.payment_method);
    let (course_id, lesson_id) = match input.item {
      PaidItem::Course(c) => (Some(c.0), None),
      PaidItem::Lesson(l) => (None, Some(l.0)),
    };

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO payments (
             user_id, payment_amount, paid_course_id, paid_lesson_id, payment_method,
             created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            input.user.0,
            input.payment_amount,
            course_id,
            lesson_id,
            method,
            created_at,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(|e| Error::from_write(e, "payment"))?;

    self
      .get_payment(PaymentId(id))
      .await?
      .ok_or_else(|| Error::Decode(format!("payment {id} vanished after insert")))
  }

  async fn delete_payment(&self, id: PaymentId) -> Result<bool> {
    let n = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM payments WHERE payment_id = ?1", [id.0])?))
      .await?;
    Ok(n > 0)
  }

  async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
    let raw: Option<RawPayment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{PAYMENT_SELECT} WHERE payment_id = ?1"),
              [id.0],
              RawPayment::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawPayment::into_payment).transpose()
  }

  async fn list_payments<'a>(&'a self, query: &'a PaymentQuery) -> Result<Vec<Payment>> {
    let user      = query.user.map(|u| u.0);
    let course    = query.paid_course.map(|c| c.0);
    let lesson    = query.paid_lesson.map(|l| l.0);
    let method    = query.payment_method.map(encode_method);
    let direction = if query.oldest_first { "ASC" } else { "DESC" };
    // A negative LIMIT means no limit in SQLite.
    let (limit, offset) = match query.page {
      Some(page) => (page.limit as i64, page.offset as i64),
      None => (-1, 0),
    };

    let raws: Vec<RawPayment> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "{PAYMENT_SELECT}
           WHERE (?1 IS NULL OR user_id = ?1)
             AND (?2 IS NULL OR paid_course_id = ?2)
             AND (?3 IS NULL OR paid_lesson_id = ?3)
             AND (?4 IS NULL OR payment_method = ?4)
           ORDER BY created_at {direction}, payment_id {direction}
           LIMIT ?5 OFFSET ?6"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![user, course, lesson, method, limit, offset],
            RawPayment::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPayment::into_payment).collect()
  }

  async fn attach_checkout(
    &self,
    id: PaymentId,
    session: CheckoutSession,
  ) -> Result<Option<Payment>> {
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE payments
           SET checkout_product_id = ?2, checkout_price_id = ?3,
               checkout_session_id = ?4, checkout_url = ?5
           WHERE payment_id = ?1",
          rusqlite::params![
            id.0,
            session.product_id,
            session.price_id,
            session.session_id,
            session.url,
          ],
        )?)
      })
      .await?;

    if n == 0 {
      return Ok(None);
    }
    self.get_payment(id).await
  }
}
