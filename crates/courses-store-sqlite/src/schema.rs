//! SQL schema for the course registration store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
///
/// Surrogate ids are plain `UNIQUE` columns rather than `INTEGER PRIMARY
/// KEY`, so `rowid` keeps recording insertion order.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Provisioned externally; read-only to the registration service.
CREATE TABLE IF NOT EXISTS persons (
    id          INTEGER NOT NULL UNIQUE,
    name        TEXT    NOT NULL,
    national_id TEXT    NOT NULL UNIQUE,
    email       TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS course_templates (
    course_code TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS course_instances (
    id          INTEGER NOT NULL UNIQUE,
    course_code TEXT    NOT NULL REFERENCES course_templates(course_code),
    semester_id TEXT    NOT NULL
);

-- Append-only. No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS teacher_registrations (
    id                 INTEGER NOT NULL UNIQUE,
    course_instance_id INTEGER NOT NULL REFERENCES course_instances(id),
    national_id        TEXT    NOT NULL REFERENCES persons(national_id),
    role               TEXT    NOT NULL,   -- 'main_teacher' | 'assistant_teacher'
    UNIQUE (course_instance_id, national_id)
);

-- At most one main teacher per course instance.
CREATE UNIQUE INDEX IF NOT EXISTS registrations_main_teacher_idx
    ON teacher_registrations(course_instance_id)
    WHERE role = 'main_teacher';

CREATE INDEX IF NOT EXISTS course_instances_semester_idx
    ON course_instances(semester_id);

PRAGMA user_version = 1;
";
