//! The repository and unit-of-work abstraction.
//!
//! A [`Repository<T>`] is the working copy of one entity collection: the rows
//! already committed to the backing store followed by rows staged in this
//! unit of work. Staged rows are visible to every read through the same
//! unit of work, and become durable when [`UnitOfWork::save`] returns.
//!
//! Backends (`memory`, `courses-store-sqlite`) differ only in where the
//! committed rows come from and where staged rows go on `save`.

use std::future::Future;

use crate::{
  Error, Result,
  entity::{
    CourseInstance, CourseTemplate, Entity, Key, Person, TeacherRegistration,
  },
};

// ─── Repository ──────────────────────────────────────────────────────────────

/// Typed accessor over all entities of type `T`, in insertion order.
#[derive(Debug, Clone)]
pub struct Repository<T> {
  committed: Vec<T>,
  staged:    Vec<T>,
  /// Parallel to `staged`: whether `insert` generated the row's key.
  generated: Vec<bool>,
}

impl<T> Default for Repository<T> {
  fn default() -> Self {
    Self {
      committed: Vec::new(),
      staged:    Vec::new(),
      generated: Vec::new(),
    }
  }
}

impl<T: Entity> Repository<T> {
  /// A repository whose committed contents are `rows`.
  pub fn new(rows: Vec<T>) -> Self {
    Self {
      committed: rows,
      staged:    Vec::new(),
      generated: Vec::new(),
    }
  }

  /// Replace the committed contents and drop anything staged.
  pub fn replace(&mut self, rows: Vec<T>) {
    self.committed = rows;
    self.discard_staged();
  }

  /// All rows, committed first, then staged. Call again to restart.
  pub fn iter(&self) -> impl Iterator<Item = &T> + Clone + '_ {
    self.committed.iter().chain(self.staged.iter())
  }

  /// All rows matching `predicate`, lazily.
  pub fn filter<'a, P>(&'a self, mut predicate: P) -> impl Iterator<Item = &'a T> + 'a
  where
    P: FnMut(&T) -> bool + 'a,
  {
    self.iter().filter(move |row| predicate(*row))
  }

  /// The first row matching `predicate`.
  pub fn find<P>(&self, mut predicate: P) -> Option<&T>
  where
    P: FnMut(&T) -> bool,
  {
    self.iter().find(|row| predicate(*row))
  }

  /// Look up a row by primary key.
  pub fn get(&self, key: &T::Key) -> Result<&T> {
    self
      .find(|row| row.key() == key)
      .ok_or_else(|| Error::not_found(T::KIND, key))
  }

  pub fn contains_key(&self, key: &T::Key) -> bool {
    self.find(|row| row.key() == key).is_some()
  }

  /// Stage `entity` for insertion and return the staged row.
  ///
  /// A placeholder key is replaced with the successor of the largest key
  /// present; an explicit key must not be taken yet. A backend shared with
  /// other writers may settle generated keys again on `save`.
  pub fn insert(&mut self, mut entity: T) -> Result<&T> {
    let generated = entity.key().is_placeholder();
    if generated {
      let max = self.iter().map(T::key).max();
      *entity.key_mut() = <T::Key as Key>::successor(max)
        .ok_or(Error::UnassignableKey(T::KIND))?;
    } else if self.contains_key(entity.key()) {
      return Err(Error::DuplicateKey {
        kind: T::KIND,
        key:  entity.key().to_string(),
      });
    }

    let index = self.staged.len();
    self.staged.push(entity);
    self.generated.push(generated);
    Ok(&self.staged[index])
  }

  /// Rows inserted since the last commit.
  pub fn staged(&self) -> &[T] { &self.staged }

  /// Staged rows paired with whether their key was generated by `insert`.
  pub fn staged_with_origin(&self) -> impl Iterator<Item = (&T, bool)> + '_ {
    self.staged.iter().zip(self.generated.iter().copied())
  }

  pub fn has_staged(&self) -> bool { !self.staged.is_empty() }

  /// Move staged rows to the committed set, preserving order.
  pub fn commit_staged(&mut self) {
    self.committed.append(&mut self.staged);
    self.generated.clear();
  }

  /// Commit `rows` in place of the staged rows. `rows` are the staged rows
  /// as the backend wrote them, in the same order.
  pub fn commit_written(&mut self, rows: Vec<T>) {
    self.discard_staged();
    self.committed.extend(rows);
  }

  pub fn discard_staged(&mut self) {
    self.staged.clear();
    self.generated.clear();
  }

  pub fn len(&self) -> usize { self.committed.len() + self.staged.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

// ─── Repository set ──────────────────────────────────────────────────────────

/// One repository per entity type. [`Entity::repository`] picks the slot.
#[derive(Debug, Clone, Default)]
pub struct RepositorySet {
  pub(crate) persons:               Repository<Person>,
  pub(crate) course_templates:      Repository<CourseTemplate>,
  pub(crate) course_instances:      Repository<CourseInstance>,
  pub(crate) teacher_registrations: Repository<TeacherRegistration>,
}

impl RepositorySet {
  pub fn get<T: Entity>(&self) -> &Repository<T> { T::repository(self) }

  pub fn get_mut<T: Entity>(&mut self) -> &mut Repository<T> {
    T::repository_mut(self)
  }

  pub fn has_staged(&self) -> bool {
    self.persons.has_staged()
      || self.course_templates.has_staged()
      || self.course_instances.has_staged()
      || self.teacher_registrations.has_staged()
  }

  pub fn commit_staged(&mut self) {
    self.persons.commit_staged();
    self.course_templates.commit_staged();
    self.course_instances.commit_staged();
    self.teacher_registrations.commit_staged();
  }

  pub fn discard_staged(&mut self) {
    self.persons.discard_staged();
    self.course_templates.discard_staged();
    self.course_instances.discard_staged();
    self.teacher_registrations.discard_staged();
  }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Access to the repository for one entity type.
///
/// Implemented once per entity type by every unit of work; callers go through
/// [`UnitOfWork::repository`] instead.
pub trait ProvideRepository<T: Entity> {
  fn provide(
    &mut self,
  ) -> impl Future<Output = Result<&mut Repository<T>>> + Send + '_;
}

/// A transactional boundary grouping repository reads and staged writes
/// behind a single commit point.
///
/// A unit of work is request-scoped and has a single writer: every method
/// takes `&mut self`.
pub trait UnitOfWork:
  Send
  + ProvideRepository<Person>
  + ProvideRepository<CourseTemplate>
  + ProvideRepository<CourseInstance>
  + ProvideRepository<TeacherRegistration>
{
  /// The repository for entity type `T`.
  fn repository<T: Entity>(
    &mut self,
  ) -> impl Future<Output = Result<&mut Repository<T>>> + Send + '_
  where
    Self: ProvideRepository<T>,
  {
    ProvideRepository::<T>::provide(self)
  }

  /// Commit every staged insert across all repositories.
  ///
  /// Either all staged rows become durable or none do. On failure the
  /// staged rows are dropped, so the unit of work again mirrors the store.
  fn save(&mut self) -> impl Future<Output = Result<()>> + Send + '_;
}

/// A backend that hands out request-scoped units of work.
pub trait Store: Send + Sync {
  type Work: UnitOfWork + 'static;

  /// Open a fresh unit of work with nothing loaded or staged.
  fn begin(&self) -> Self::Work;
}
