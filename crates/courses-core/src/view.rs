//! Transfer models returned by and accepted by
//! [`CourseService`](crate::service::CourseService).

use serde::{Deserialize, Serialize};

use crate::entity::TeacherRole;

/// One course instance in a semester listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSummary {
  pub course_instance_id: i64,
  /// The course code of the template this instance was created from.
  pub template_id:        String,
  pub name:               String,
  /// Name of the main teacher; empty when none is registered.
  pub main_teacher:       String,
}

/// Input to
/// [`CourseService::add_teacher_to_course`](crate::service::CourseService::add_teacher_to_course).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTeacherRequest {
  pub national_id: String,
  pub role:        TeacherRole,
}

/// The teacher that was just registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherAssignment {
  pub national_id: String,
  pub name:        String,
  pub role:        TeacherRole,
}
