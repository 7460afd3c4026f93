//! Course-update notifications.
//!
//! When a course is edited after a quiet period, its subscribers are told.
//! Building the mail and deciding whether to send it happens here; delivery
//! belongs to a [`CourseUpdateNotifier`] implementation, which owns any retry
//! policy. The core fires at most once per update and never waits on it.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{catalog::Course, ids::CourseId};

/// Minimum age, in hours, of the previous edit for an update to be announced.
pub const QUIET_PERIOD_HOURS: i64 = 4;

/// Whether an edit at `now` of a course last touched at `previous` is worth
/// announcing.
pub fn is_notable(previous: DateTime<Utc>, now: DateTime<Utc>) -> bool {
  now - previous >= Duration::hours(QUIET_PERIOD_HOURS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseUpdateMail {
  pub course_id:  CourseId,
  pub subject:    String,
  pub message:    String,
  pub recipients: Vec<String>,
}

impl CourseUpdateMail {
  pub fn new(course: &Course, recipients: Vec<String>) -> Self {
    Self {
      course_id: course.id,
      subject: "Course update".to_string(),
      message: format!(
        "The materials of the course '{}' have been updated.\n\
         Come back to see what's new!",
        course.title
      ),
      recipients,
    }
  }
}

/// Delivers course-update mail. Implementations must not block the caller.
pub trait CourseUpdateNotifier: Send + Sync {
  fn course_updated(&self, mail: CourseUpdateMail);
}

/// Writes each mail to the log instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl CourseUpdateNotifier for LogNotifier {
  fn course_updated(&self, mail: CourseUpdateMail) {
    tracing::info!(
      course = %mail.course_id,
      recipients = mail.recipients.len(),
      subject = %mail.subject,
      "course update mail"
    );
  }
}
