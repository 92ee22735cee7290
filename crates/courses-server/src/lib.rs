//! Configuration loading and bulk provisioning for the course registration
//! server binary.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use courses_core::{
  entity::{CourseInstance, CourseTemplate, Entity, Person},
  repository::{ProvideRepository, UnitOfWork},
};
use serde::Deserialize;
use tracing::{info, warn};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `COURSES_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub store_path:       PathBuf,
  /// Semester listed when a request names none.
  #[serde(default)]
  pub current_semester: Option<String>,
}

/// Layer defaults, the TOML file at `path` (if present) and the environment.
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8080)?
    .set_default("store_path", "courses.db")?
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("COURSES"))
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Provisioning ─────────────────────────────────────────────────────────────

/// Externally provisioned records, as read from an import file.
///
/// Teacher registrations are deliberately absent: they are only ever created
/// through the registration service.
#[derive(Debug, Default, Deserialize)]
pub struct Provisioning {
  #[serde(default)]
  pub persons:          Vec<Person>,
  #[serde(default)]
  pub course_templates: Vec<CourseTemplate>,
  #[serde(default)]
  pub course_instances: Vec<CourseInstance>,
}

/// Stage every record in `data` and commit them together. Returns the number
/// of rows written.
///
/// If any record is rejected, nothing from `data` is left staged in `uow`.
pub async fn provision<U: UnitOfWork>(
  uow: &mut U,
  data: Provisioning,
) -> courses_core::Result<usize> {
  let count =
    data.persons.len() + data.course_templates.len() + data.course_instances.len();

  if let Err(err) = stage_all(uow, data).await {
    warn!(error = %err, "provisioning rejected; staged rows dropped");
    discard::<U, Person>(uow).await?;
    discard::<U, CourseTemplate>(uow).await?;
    discard::<U, CourseInstance>(uow).await?;
    return Err(err);
  }
  uow.save().await?;

  info!(count, "provisioned records");
  Ok(count)
}

async fn stage_all<U: UnitOfWork>(
  uow: &mut U,
  data: Provisioning,
) -> courses_core::Result<()> {
  stage(uow, data.persons).await?;
  stage(uow, data.course_templates).await?;
  stage(uow, data.course_instances).await?;
  Ok(())
}

async fn stage<U, T>(uow: &mut U, rows: Vec<T>) -> courses_core::Result<()>
where
  U: UnitOfWork + ProvideRepository<T>,
  T: Entity,
{
  let repository = uow.repository::<T>().await?;
  for row in rows {
    repository.insert(row)?;
  }
  Ok(())
}

async fn discard<U, T>(uow: &mut U) -> courses_core::Result<()>
where
  U: UnitOfWork + ProvideRepository<T>,
  T: Entity,
{
  uow.repository::<T>().await?.discard_staged();
  Ok(())
}
