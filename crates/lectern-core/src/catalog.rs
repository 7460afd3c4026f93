//! Courses and lessons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  account::DEFAULT_AVATAR,
  ids::{CourseId, LessonId, UserId},
  policy::ResourceRef,
};

/// Title of the catch-all course that lessons fall into when created without
/// one. Created on first use.
pub const DEFAULT_COURSE_TITLE: &str = "Outside any course";

/// Preview image path assigned when none is uploaded.
pub const DEFAULT_PREVIEW: &str = DEFAULT_AVATAR;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
  pub id:          CourseId,
  pub title:       String,
  pub preview:     String,
  pub description: Option<String>,
  /// Price in minor currency units.
  pub price:       i64,
  /// Cleared when the owning account is deleted.
  pub owner:       Option<UserId>,
  pub updated_at:  DateTime<Utc>,
}

impl Course {
  pub fn resource(&self) -> ResourceRef { ResourceRef::new(self.id.0, self.owner) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
  pub id:          LessonId,
  pub title:       String,
  pub description: Option<String>,
  pub preview:     String,
  pub video_link:  Option<String>,
  pub course:      CourseId,
  pub owner:       Option<UserId>,
  /// Price in minor currency units.
  pub price:       i64,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Lesson {
  pub fn resource(&self) -> ResourceRef { ResourceRef::new(self.id.0, self.owner) }
}

/// Input for creating a course.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCourse {
  pub title:       String,
  pub preview:     Option<String>,
  pub description: Option<String>,
  #[serde(default)]
  pub price:       i64,
}

/// Partial update of a course; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoursePatch {
  pub title:       Option<String>,
  pub preview:     Option<String>,
  #[serde(default, with = "crate::account::double_option")]
  pub description: Option<Option<String>>,
  pub price:       Option<i64>,
}

/// Input for creating a lesson. A missing `course` means the catch-all
/// course named [`DEFAULT_COURSE_TITLE`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewLesson {
  pub title:       String,
  pub description: Option<String>,
  pub preview:     Option<String>,
  pub video_link:  Option<String>,
  pub course:      Option<CourseId>,
  #[serde(default)]
  pub price:       i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LessonPatch {
  pub title:       Option<String>,
  #[serde(default, with = "crate::account::double_option")]
  pub description: Option<Option<String>>,
  pub preview:     Option<String>,
  #[serde(default, with = "crate::account::double_option")]
  pub video_link:  Option<Option<String>>,
  pub course:      Option<CourseId>,
  pub price:       Option<i64>,
}
