//! [`SqliteStore`] and its [`SqliteUnitOfWork`].

use std::{collections::HashSet, future::Future, path::Path};

use courses_core::{
  Error as CoreError,
  entity::{
    CourseInstance, CourseTemplate, EntityKind, Person, TeacherRegistration,
  },
  repository::{
    ProvideRepository, Repository, RepositorySet, Store, UnitOfWork,
  },
};
use rusqlite::{Connection, ffi};
use tracing::{debug, warn};

use crate::{
  Error, Result,
  encode::{SqlRecord, select_all},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A course registration store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
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
}

impl Store for SqliteStore {
  type Work = SqliteUnitOfWork;

  fn begin(&self) -> SqliteUnitOfWork {
    SqliteUnitOfWork {
      conn:         self.conn.clone(),
      repositories: RepositorySet::default(),
      loaded:       HashSet::new(),
      commits:      0,
    }
  }
}

// ─── Unit of work ────────────────────────────────────────────────────────────

/// A request-scoped view of the store.
///
/// Each table is read in full the first time its repository is requested and
/// is not re-read afterwards. `save` writes every staged row in one
/// transaction, settling generated ids against the table as it is then.
pub struct SqliteUnitOfWork {
  conn:         tokio_rusqlite::Connection,
  repositories: RepositorySet,
  loaded:       HashSet<EntityKind>,
  commits:      usize,
}

impl SqliteUnitOfWork {
  /// How many times `save` has completed.
  pub fn commits(&self) -> usize { self.commits }
}

impl<T: SqlRecord> ProvideRepository<T> for SqliteUnitOfWork {
  fn provide(
    &mut self,
  ) -> impl Future<Output = courses_core::Result<&mut Repository<T>>> + Send + '_
  {
    async move {
      if !self.loaded.contains(&T::KIND) {
        let rows = self
          .conn
          .call(|conn| Ok(select_all::<T>(conn)?))
          .await
          .map_err(Error::Database)?;

        debug!(kind = %T::KIND, count = rows.len(), "loaded repository");
        self.repositories.get_mut::<T>().replace(rows);
        self.loaded.insert(T::KIND);
      }
      Ok(self.repositories.get_mut::<T>())
    }
  }
}

impl UnitOfWork for SqliteUnitOfWork {
  fn save(&mut self) -> impl Future<Output = courses_core::Result<()>> + Send + '_ {
    async move {
      if self.repositories.has_staged() {
        let persons = staged::<Person>(&self.repositories);
        let templates = staged::<CourseTemplate>(&self.repositories);
        let instances = staged::<CourseInstance>(&self.repositories);
        let registrations = staged::<TeacherRegistration>(&self.repositories);

        // Referenced tables first so foreign keys resolve.
        let written = self
          .conn
          .call(move |conn| {
            let tx = conn.transaction()?;
            let written = (
              insert_all(&tx, persons)?,
              insert_all(&tx, templates)?,
              insert_all(&tx, instances)?,
              insert_all(&tx, registrations)?,
            );
            tx.commit()?;
            Ok(written)
          })
          .await;

        match written {
          Ok((persons, templates, instances, registrations)) => {
            self.repositories.get_mut::<Person>().commit_written(persons);
            self
              .repositories
              .get_mut::<CourseTemplate>()
              .commit_written(templates);
            self
              .repositories
              .get_mut::<CourseInstance>()
              .commit_written(instances);
            self
              .repositories
              .get_mut::<TeacherRegistration>()
              .commit_written(registrations);
          }
          Err(err) => {
            warn!(error = %err, "save failed; staged rows dropped");
            self.repositories.discard_staged();
            return Err(rejection(err));
          }
        }
      }

      self.commits += 1;
      debug!(commits = self.commits, "committed unit of work");
      Ok(())
    }
  }
}

fn staged<T: SqlRecord>(repositories: &RepositorySet) -> Vec<(T, bool)> {
  repositories
    .get::<T>()
    .staged_with_origin()
    .map(|(row, generated)| (row.clone(), generated))
    .collect()
}

/// Insert `rows` and return them as written. A unique-constraint failure is
/// carried out of the connection thread as the row's own [`CoreError`].
fn insert_all<T: SqlRecord>(
  conn: &Connection,
  rows: Vec<(T, bool)>,
) -> tokio_rusqlite::Result<Vec<T>> {
  rows
    .into_iter()
    .map(|(mut row, generated)| match row.insert(conn, generated) {
      Ok(()) => Ok(row),
      Err(err) => {
        let rejected =
          unique_columns(&err).map(|columns| row.unique_violation(columns));
        Err(match rejected {
          Some(rejected) => tokio_rusqlite::Error::Other(Box::new(rejected)),
          None => err.into(),
        })
      }
    })
    .collect()
}

/// The `table.column, ...` list of a failed UNIQUE or PRIMARY KEY constraint.
fn unique_columns(err: &rusqlite::Error) -> Option<&str> {
  match err {
    rusqlite::Error::SqliteFailure(failure, Some(message))
      if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
        || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
    {
      message.strip_prefix("UNIQUE constraint failed: ")
    }
    _ => None,
  }
}

fn rejection(err: tokio_rusqlite::Error) -> CoreError {
  match err {
    tokio_rusqlite::Error::Other(inner) => match inner.downcast::<CoreError>() {
      Ok(rejected) => *rejected,
      Err(inner) => Error::Database(tokio_rusqlite::Error::Other(inner)).into(),
    },
    err => Error::Database(err).into(),
  }
}
