//! Payments for courses and lessons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  checkout::CheckoutSession,
  ids::{CourseId, LessonId, PaymentId, UserId},
  policy::ResourceRef,
  store::Page,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  Cash,
  Transfer,
}

/// What a payment pays for: exactly one course or exactly one lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaidItem {
  Course(CourseId),
  Lesson(LessonId),
}

impl PaidItem {
  /// Build from the two optional request fields; exactly one must be set.
  pub fn from_parts(course: Option<CourseId>, lesson: Option<LessonId>) -> Result<Self> {
    match (course, lesson) {
      (Some(c), None) => Ok(Self::Course(c)),
      (None, Some(l)) => Ok(Self::Lesson(l)),
      _ => Err(Error::InvalidRequest(
        "a payment must reference either a course or a lesson".into(),
      )),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
  pub id:             PaymentId,
  pub user:           UserId,
  /// Amount in minor currency units.
  pub payment_amount: i64,
  pub paid_course:    Option<CourseId>,
  pub paid_lesson:    Option<LessonId>,
  pub payment_method: PaymentMethod,
  pub created_at:     DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub checkout:       Option<CheckoutSession>,
}

impl Payment {
  pub fn resource(&self) -> ResourceRef { ResourceRef::new(self.id.0, Some(self.user)) }
}

#[derive(Debug, Clone)]
pub struct NewPayment {
  pub user:           UserId,
  pub item:           PaidItem,
  pub payment_amount: i64,
  pub payment_method: PaymentMethod,
}

/// Parameters for [`PaymentStore::list_payments`](crate::store::PaymentStore::list_payments).
#[derive(Debug, Clone, Default)]
pub struct PaymentQuery {
  /// Restrict to one payer.
  pub user:           Option<UserId>,
  pub paid_course:    Option<CourseId>,
  pub paid_lesson:    Option<LessonId>,
  pub payment_method: Option<PaymentMethod>,
  /// Oldest first when `true`; newest first otherwise.
  pub oldest_first:   bool,
  pub page:           Option<Page>,
}
