//! Error types for `courses-core`.

use thiserror::Error;

use crate::entity::EntityKind;

/// A business rule that an operation would have violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("main teacher already assigned to course instance {course_instance_id}")]
  MainTeacherAlreadyAssigned { course_instance_id: i64 },

  #[error(
    "person {national_id} already registered to course instance {course_instance_id}"
  )]
  AlreadyRegistered {
    course_instance_id: i64,
    national_id:        String,
  },
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{kind} not found: {key}")]
  NotFound { kind: EntityKind, key: String },

  #[error("validation failed: {0}")]
  Validation(#[from] ValidationError),

  #[error("{kind} with key {key} already exists")]
  DuplicateKey { kind: EntityKind, key: String },

  #[error("cannot assign a key to a new {0}")]
  UnassignableKey(EntityKind),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn not_found(kind: EntityKind, key: impl ToString) -> Self {
    Self::NotFound {
      kind,
      key: key.to_string(),
    }
  }

  /// Wrap a backend error.
  pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
