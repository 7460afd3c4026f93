//! Encoding and decoding helpers between Rust domain types and the plain
//! values stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that they sort lexically. Identifiers are
//! SQLite integer row ids.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use lectern_core::{
  account::User,
  catalog::{Course, Lesson},
  checkout::CheckoutSession,
  ids::{CourseId, LessonId, PaymentId, SubscriptionId, UserId},
  payment::{Payment, PaymentMethod},
  subscription::Subscription,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision the store keeps, so a value handed back
/// from a write equals the one read back later.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── PaymentMethod ───────────────────────────────────────────────────────────

pub fn encode_method(m: PaymentMethod) -> &'static str {
  match m {
    PaymentMethod::Cash => "cash",
    PaymentMethod::Transfer => "transfer",
  }
}

pub fn decode_method(s: &str) -> Result<PaymentMethod> {
  match s {
    "cash" => Ok(PaymentMethod::Cash),
    "transfer" => Ok(PaymentMethod::Transfer),
    other => Err(Error::Decode(format!("unknown payment method: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Columns selected by [`user_select`](crate::store::user_select).
pub struct RawUser {
  pub user_id:       i64,
  pub username:      String,
  pub email:         String,
  pub phone_number:  Option<String>,
  pub avatar:        String,
  pub city:          Option<String>,
  pub is_superuser:  bool,
  pub is_moderator:  bool,
  pub password_hash: String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      username:      row.get(1)?,
      email:         row.get(2)?,
      phone_number:  row.get(3)?,
      avatar:        row.get(4)?,
      city:          row.get(5)?,
      is_superuser:  row.get(6)?,
      is_moderator:  row.get(7)?,
      password_hash: row.get(8)?,
    })
  }

  pub fn into_user(self) -> User {
    User {
      id:           UserId(self.user_id),
      username:     self.username,
      email:        self.email,
      phone_number: self.phone_number,
      avatar:       self.avatar,
      city:         self.city,
      is_superuser: self.is_superuser,
      is_moderator: self.is_moderator,
    }
  }
}

pub struct RawCourse {
  pub course_id:   i64,
  pub title:       String,
  pub preview:     String,
  pub description: Option<String>,
  pub price:       i64,
  pub owner_id:    Option<i64>,
  pub updated_at:  String,
}

impl RawCourse {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      course_id:   row.get(0)?,
      title:       row.get(1)?,
      preview:     row.get(2)?,
      description: row.get(3)?,
      price:       row.get(4)?,
      owner_id:    row.get(5)?,
      updated_at:  row.get(6)?,
    })
  }

  pub fn into_course(self) -> Result<Course> {
    Ok(Course {
      id:          CourseId(self.course_id),
      title:       self.title,
      preview:     self.preview,
      description: self.description,
      price:       self.price,
      owner:       self.owner_id.map(UserId),
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawLesson {
  pub lesson_id:   i64,
  pub title:       String,
  pub description: Option<String>,
  pub preview:     String,
  pub video_link:  Option<String>,
  pub course_id:   i64,
  pub owner_id:    Option<i64>,
  pub price:       i64,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawLesson {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      lesson_id:   row.get(0)?,
      title:       row.get(1)?,
      description: row.get(2)?,
      preview:     row.get(3)?,
      video_link:  row.get(4)?,
      course_id:   row.get(5)?,
      owner_id:    row.get(6)?,
      price:       row.get(7)?,
      created_at:  row.get(8)?,
      updated_at:  row.get(9)?,
    })
  }

  pub fn into_lesson(self) -> Result<Lesson> {
    Ok(Lesson {
      id:          LessonId(self.lesson_id),
      title:       self.title,
      description: self.description,
      preview:     self.preview,
      video_link:  self.video_link,
      course:      CourseId(self.course_id),
      owner:       self.owner_id.map(UserId),
      price:       self.price,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawSubscription {
  pub subscription_id: i64,
  pub user_id:         i64,
  pub course_id:       i64,
  pub created_at:      String,
}

impl RawSubscription {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subscription_id: row.get(0)?,
      user_id:         row.get(1)?,
      course_id:       row.get(2)?,
      created_at:      row.get(3)?,
    })
  }

  pub fn into_subscription(self) -> Result<Subscription> {
    Ok(Subscription {
      id:         SubscriptionId(self.subscription_id),
      user:       UserId(self.user_id),
      course:     CourseId(self.course_id),
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawPayment {
  pub payment_id:     i64,
  pub user_id:        i64,
  pub payment_amount: i64,
  pub paid_course_id: Option<i64>,
  pub paid_lesson_id: Option<i64>,
  pub payment_method: String,
  pub created_at:     String,
  // checkout columns, all set together
  pub product_id:     Option<String>,
  pub price_id:       Option<String>,
  pub session_id:     Option<String>,
  pub url:            Option<String>,
}

impl RawPayment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      payment_id:     row.get(0)?,
      user_id:        row.get(1)?,
      payment_amount: row.get(2)?,
      paid_course_id: row.get(3)?,
      paid_lesson_id: row.get(4)?,
      payment_method: row.get(5)?,
      created_at:     row.get(6)?,
      product_id:     row.get(7)?,
      price_id:       row.get(8)?,
      session_id:     row.get(9)?,
      url:            row.get(10)?,
    })
  }

  pub fn into_payment(self) -> Result<Payment> {
    let checkout = match (self.product_id, self.price_id, self.session_id, self.url) {
      (Some(product_id), Some(price_id), Some(session_id), Some(url)) => {
        Some(CheckoutSession { product_id, price_id, session_id, url })
      }
      _ => None,
    };

    Ok(Payment {
      id: PaymentId(self.payment_id),
      user: UserId(self.user_id),
      payment_amount: self.payment_amount,
      paid_course: self.paid_course_id.map(CourseId),
      paid_lesson: self.paid_lesson_id.map(LessonId),
      payment_method: decode_method(&self.payment_method)?,
      created_at: decode_dt(&self.created_at)?,
      checkout,
    })
  }
}
