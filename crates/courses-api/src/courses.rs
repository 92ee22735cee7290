//! Handlers for `/courses` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/courses` | Optional `?semester=20153`; defaults to the current semester |
//! | `POST` | `/courses/:id/teachers` | Body: [`AddTeacherRequest`]; returns 201 + assignment |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use courses_core::{
  repository::Store,
  service::CourseService,
  view::{AddTeacherRequest, CourseSummary},
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

fn service<S: Store>(state: &ApiState<S>) -> CourseService<S::Work> {
  CourseService::new(state.store.begin())
    .with_current_semester(state.current_semester.clone())
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub semester: Option<String>,
}

/// `GET /courses[?semester=<id>]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<CourseSummary>>, ApiError>
where
  S: Store + 'static,
{
  let courses = service(&state)
    .list_course_instances(params.semester.as_deref())
    .await?;
  Ok(Json(courses))
}

// ─── Add teacher ──────────────────────────────────────────────────────────────

/// `POST /courses/:id/teachers` — body: `{"national_id":"...","role":"main_teacher"}`
pub async fn add_teacher<S>(
  State(state): State<ApiState<S>>,
  Path(course_instance_id): Path<i64>,
  Json(body): Json<AddTeacherRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let assignment = service(&state)
    .add_teacher_to_course(course_instance_id, body)
    .await?;
  Ok((StatusCode::CREATED, Json(assignment)))
}
