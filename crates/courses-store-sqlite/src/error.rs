//! Error type for `courses-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),
}

impl From<Error> for courses_core::Error {
  fn from(err: Error) -> Self { courses_core::Error::store(err) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
