//! In-memory unit of work, used as the test double for the service and by
//! anything that wants a store without a database.

use std::future::{Future, ready};

use tracing::debug;

use crate::{
  Result,
  entity::Entity,
  repository::{ProvideRepository, Repository, RepositorySet, UnitOfWork},
};

/// A unit of work whose committed rows live in memory.
///
/// `save` moves staged rows into the committed set and counts the commit.
#[derive(Debug, Default)]
pub struct MemoryUnitOfWork {
  repositories: RepositorySet,
  commits:      usize,
}

impl MemoryUnitOfWork {
  pub fn new() -> Self { Self::default() }

  /// Seed the committed contents of the repository for `T`.
  pub fn set_repository_data<T: Entity>(&mut self, rows: Vec<T>) {
    self.repositories.get_mut::<T>().replace(rows);
  }

  /// Read-only view of the repository for `T`, including staged rows.
  pub fn data<T: Entity>(&self) -> &Repository<T> {
    self.repositories.get::<T>()
  }

  /// How many times `save` has completed.
  pub fn commits(&self) -> usize { self.commits }
}

impl<T: Entity> ProvideRepository<T> for MemoryUnitOfWork {
  fn provide(
    &mut self,
  ) -> impl Future<Output = Result<&mut Repository<T>>> + Send + '_ {
    ready(Ok(self.repositories.get_mut::<T>()))
  }
}

impl UnitOfWork for MemoryUnitOfWork {
  fn save(&mut self) -> impl Future<Output = Result<()>> + Send + '_ {
    self.repositories.commit_staged();
    self.commits += 1;
    debug!(commits = self.commits, "committed in-memory unit of work");
    ready(Ok(()))
  }
}
