//! Mapping between domain entities and SQLite rows.
//!
//! Every entity is stored column-for-column. [`TeacherRole`] is stored as its
//! snake_case name. Reads are always ordered by `rowid`, which is insertion
//! order.
//!
//! Integer ids generated by a unit of work are only provisional: the row is
//! written with `MAX(id) + 1` as seen inside the saving transaction, so
//! writers that loaded the same snapshot never pick the same id.

use std::str::FromStr as _;

use courses_core::{
  Error as CoreError, ValidationError,
  entity::{
    CourseInstance, CourseTemplate, Entity, Person, TeacherRegistration,
    TeacherRole,
  },
};
use rusqlite::{
  Connection, Row, ToSql,
  types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};

// ─── TeacherRole ─────────────────────────────────────────────────────────────

/// Column adapter for [`TeacherRole`].
pub struct RoleColumn(pub TeacherRole);

impl ToSql for RoleColumn {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(ToSqlOutput::from(self.0.to_string()))
  }
}

impl FromSql for RoleColumn {
  fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
    let text = value.as_str()?;
    TeacherRole::from_str(text)
      .map(RoleColumn)
      .map_err(|e| FromSqlError::Other(Box::new(e)))
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// An entity with a table of its own.
pub trait SqlRecord: Entity {
  /// Selects every row, in insertion order.
  const SELECT: &'static str;

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

  /// Insert this row. With `generate_key` the key is first replaced by the
  /// next free one in the table.
  fn insert(
    &mut self,
    conn: &Connection,
    generate_key: bool,
  ) -> rusqlite::Result<()>;

  /// The error to report when inserting this row failed a unique
  /// constraint on `columns`, as SQLite names them (`table.column, ...`).
  fn unique_violation(&self, _columns: &str) -> CoreError {
    duplicate_key(self)
  }
}

fn duplicate_key<T: Entity>(row: &T) -> CoreError {
  CoreError::DuplicateKey {
    kind: T::KIND,
    key:  row.key().to_string(),
  }
}

fn next_id(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
  conn.query_row(
    &format!("SELECT COALESCE(MAX(id), 0) + 1 FROM {table}"),
    [],
    |row| row.get(0),
  )
}

/// Read the whole table for `T`.
pub fn select_all<T: SqlRecord>(conn: &Connection) -> rusqlite::Result<Vec<T>> {
  let mut stmt = conn.prepare(T::SELECT)?;
  let rows = stmt
    .query_map([], |row| T::from_row(row))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

impl SqlRecord for Person {
  const SELECT: &'static str =
    "SELECT id, name, national_id, email FROM persons ORDER BY rowid";

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Person {
      id:          row.get(0)?,
      name:        row.get(1)?,
      national_id: row.get(2)?,
      email:       row.get(3)?,
    })
  }

  fn insert(
    &mut self,
    conn: &Connection,
    generate_key: bool,
  ) -> rusqlite::Result<()> {
    if generate_key {
      self.id = next_id(conn, "persons")?;
    }
    conn.execute(
      "INSERT INTO persons (id, name, national_id, email) VALUES (?1, ?2, ?3, ?4)",
      rusqlite::params![self.id, self.name, self.national_id, self.email],
    )?;
    Ok(())
  }
}

impl SqlRecord for CourseTemplate {
  const SELECT: &'static str = "SELECT course_code, name, description
     FROM course_templates ORDER BY rowid";

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(CourseTemplate {
      course_code: row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
    })
  }

  // Course codes are natural keys and never generated.
  fn insert(&mut self, conn: &Connection, _: bool) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO course_templates (course_code, name, description)
       VALUES (?1, ?2, ?3)",
      rusqlite::params![self.course_code, self.name, self.description],
    )?;
    Ok(())
  }
}

impl SqlRecord for CourseInstance {
  const SELECT: &'static str = "SELECT id, course_code, semester_id
     FROM course_instances ORDER BY rowid";

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(CourseInstance {
      id:          row.get(0)?,
      course_code: row.get(1)?,
      semester_id: row.get(2)?,
    })
  }

  fn insert(
    &mut self,
    conn: &Connection,
    generate_key: bool,
  ) -> rusqlite::Result<()> {
    if generate_key {
      self.id = next_id(conn, "course_instances")?;
    }
    conn.execute(
      "INSERT INTO course_instances (id, course_code, semester_id)
       VALUES (?1, ?2, ?3)",
      rusqlite::params![self.id, self.course_code, self.semester_id],
    )?;
    Ok(())
  }
}

impl SqlRecord for TeacherRegistration {
  const SELECT: &'static str = "SELECT id, course_instance_id, national_id, role
     FROM teacher_registrations ORDER BY rowid";

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    let RoleColumn(role) = row.get(3)?;
    Ok(TeacherRegistration {
      id: row.get(0)?,
      course_instance_id: row.get(1)?,
      national_id: row.get(2)?,
      role,
    })
  }

  fn insert(
    &mut self,
    conn: &Connection,
    generate_key: bool,
  ) -> rusqlite::Result<()> {
    if generate_key {
      self.id = next_id(conn, "teacher_registrations")?;
    }
    conn.execute(
      "INSERT INTO teacher_registrations (id, course_instance_id, national_id, role)
       VALUES (?1, ?2, ?3, ?4)",
      rusqlite::params![
        self.id,
        self.course_instance_id,
        self.national_id,
        RoleColumn(self.role),
      ],
    )?;
    Ok(())
  }

  /// A writer that lost a race against another unit of work still gets the
  /// business rule it broke, not a raw constraint failure.
  fn unique_violation(&self, columns: &str) -> CoreError {
    if columns.ends_with("teacher_registrations.national_id") {
      ValidationError::AlreadyRegistered {
        course_instance_id: self.course_instance_id,
        national_id:        self.national_id.clone(),
      }
      .into()
    } else if columns == "teacher_registrations.course_instance_id" {
      ValidationError::MainTeacherAlreadyAssigned {
        course_instance_id: self.course_instance_id,
      }
      .into()
    } else {
      duplicate_key(self)
    }
  }
}
