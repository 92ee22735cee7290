//! Entity records — persons, course templates, course instances and teacher
//! registrations.
//!
//! Entities carry no behaviour beyond identity. Persons, templates and
//! instances are provisioned outside this crate and only read here; teacher
//! registrations are created by
//! [`CourseService::add_teacher_to_course`](crate::service::CourseService::add_teacher_to_course)
//! and never mutated afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::repository::{Repository, RepositorySet};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Which kind of entity an error or a repository refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum EntityKind {
  #[strum(to_string = "person")]
  Person,
  #[strum(to_string = "course template")]
  CourseTemplate,
  #[strum(to_string = "course instance")]
  CourseInstance,
  #[strum(to_string = "teacher registration")]
  TeacherRegistration,
}

/// A primary key type.
///
/// Surrogate keys may be left as a placeholder on insert; the repository then
/// hands out the successor of the largest key it holds.
pub trait Key:
  Clone + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
  /// Whether this value stands for "not assigned yet".
  fn is_placeholder(&self) -> bool { false }

  /// The next key after `max`, or `None` if this key type is never
  /// assigned by a store.
  fn successor(_max: Option<&Self>) -> Option<Self> { None }
}

impl Key for i64 {
  fn is_placeholder(&self) -> bool { *self == 0 }

  fn successor(max: Option<&Self>) -> Option<Self> {
    max.copied().unwrap_or(0).max(0).checked_add(1)
  }
}

/// Natural keys (e.g. course codes) are always supplied by the caller.
impl Key for String {
  fn is_placeholder(&self) -> bool { self.is_empty() }
}

/// A persisted record with a primary key.
///
/// `repository` and `repository_mut` locate this type's collection inside a
/// [`RepositorySet`], which is how a unit of work resolves
/// `repository::<T>()` without any runtime type lookup.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
  type Key: Key;

  const KIND: EntityKind;

  fn key(&self) -> &Self::Key;

  fn key_mut(&mut self) -> &mut Self::Key;

  fn repository(set: &RepositorySet) -> &Repository<Self>;

  fn repository_mut(set: &mut RepositorySet) -> &mut Repository<Self>;
}

macro_rules! impl_entity {
  ($ty:ident, $key:ty, $field:ident, $slot:ident) => {
    impl Entity for $ty {
      type Key = $key;

      const KIND: EntityKind = EntityKind::$ty;

      fn key(&self) -> &Self::Key { &self.$field }

      fn key_mut(&mut self) -> &mut Self::Key { &mut self.$field }

      fn repository(set: &RepositorySet) -> &Repository<Self> { &set.$slot }

      fn repository_mut(set: &mut RepositorySet) -> &mut Repository<Self> {
        &mut set.$slot
      }
    }
  };
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Any human actor known to the system, teacher or student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub id:          i64,
  pub name:        String,
  /// Ten-digit national identification number; unique per person.
  pub national_id: String,
  pub email:       String,
}

/// A reusable course definition, independent of when it is taught.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseTemplate {
  /// e.g. `T-514-VEFT`.
  pub course_code: String,
  pub name:        String,
  pub description: String,
}

/// One offering of a [`CourseTemplate`] in one semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseInstance {
  pub id:          i64,
  pub course_code: String,
  /// Year followed by term digit, e.g. `20153`.
  pub semester_id: String,
}

/// The capacity in which a person teaches a course instance.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TeacherRole {
  /// At most one per course instance.
  MainTeacher,
  AssistantTeacher,
}

/// One person's assignment to one course instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherRegistration {
  pub id:                 i64,
  pub course_instance_id: i64,
  pub national_id:        String,
  pub role:               TeacherRole,
}

impl_entity!(Person, i64, id, persons);
impl_entity!(CourseTemplate, String, course_code, course_templates);
impl_entity!(CourseInstance, i64, id, course_instances);
impl_entity!(TeacherRegistration, i64, id, teacher_registrations);
