//! [`CourseService`] — semester course listings and teacher registration.
//!
//! The service owns one unit of work for the lifetime of a request. Every
//! call reads through it, validates, and only then writes; a call that fails
//! has staged nothing.

use tracing::{debug, info, instrument, warn};

use crate::{
  Error, Result, ValidationError,
  entity::{
    CourseInstance, CourseTemplate, EntityKind, Person, TeacherRegistration,
    TeacherRole,
  },
  repository::{Repository, UnitOfWork},
  view::{AddTeacherRequest, CourseSummary, TeacherAssignment},
};

/// Business rules over course instances and their teachers.
pub struct CourseService<U> {
  uow:              U,
  current_semester: Option<String>,
}

impl<U: UnitOfWork> CourseService<U> {
  pub fn new(uow: U) -> Self {
    Self {
      uow,
      current_semester: None,
    }
  }

  /// Set the semester listed when the caller names none. Without it the
  /// newest semester present in the data is used.
  pub fn with_current_semester(mut self, semester: Option<String>) -> Self {
    self.current_semester = semester;
    self
  }

  pub fn unit_of_work(&self) -> &U { &self.uow }

  // ── Listing ─────────────────────────────────────────────────────────────

  /// Summaries of every course instance taught in `semester`, in the order
  /// the instances were created.
  ///
  /// `main_teacher` is empty for instances without a main teacher. An
  /// unknown semester yields an empty list.
  #[instrument(skip(self))]
  pub async fn list_course_instances(
    &mut self,
    semester: Option<&str>,
  ) -> Result<Vec<CourseSummary>> {
    let semester = match semester {
      Some(semester) => semester.to_owned(),
      None => match self.default_semester().await? {
        Some(semester) => semester,
        None => return Ok(Vec::new()),
      },
    };

    let instances: Vec<CourseInstance> = self
      .uow
      .repository::<CourseInstance>()
      .await?
      .filter(|instance| instance.semester_id == semester)
      .cloned()
      .collect();

    debug!(%semester, count = instances.len(), "selected course instances");
    if instances.is_empty() {
      return Ok(Vec::new());
    }

    let templates: &Repository<CourseTemplate> =
      self.uow.repository::<CourseTemplate>().await?;
    let names = instances
      .iter()
      .map(|instance| -> Result<String> {
        Ok(templates.get(&instance.course_code)?.name.clone())
      })
      .collect::<Result<Vec<_>>>()?;

    let registrations: &Repository<TeacherRegistration> =
      self.uow.repository::<TeacherRegistration>().await?;
    let main_teachers: Vec<Option<String>> = instances
      .iter()
      .map(|instance| {
        main_teacher_of(registrations, instance.id)
          .map(|registration| registration.national_id.clone())
      })
      .collect();

    let persons: &Repository<Person> = self.uow.repository::<Person>().await?;
    instances
      .into_iter()
      .zip(names)
      .zip(main_teachers)
      .map(|((instance, name), national_id)| -> Result<CourseSummary> {
        let main_teacher = match national_id {
          Some(national_id) => person_by_national_id(persons, &national_id)?
            .name
            .clone(),
          None => String::new(),
        };
        Ok(CourseSummary {
          course_instance_id: instance.id,
          template_id: instance.course_code,
          name,
          main_teacher,
        })
      })
      .collect()
  }

  async fn default_semester(&mut self) -> Result<Option<String>> {
    if let Some(semester) = &self.current_semester {
      return Ok(Some(semester.clone()));
    }

    let instances = self.uow.repository::<CourseInstance>().await?;
    Ok(instances.iter().map(|instance| &instance.semester_id).max().cloned())
  }

  // ── Registration ────────────────────────────────────────────────────────

  /// Register a person as a teacher of a course instance and commit.
  ///
  /// Checked in order: the course instance exists, the person exists, a
  /// main teacher is not already assigned (when registering one), and the
  /// person is not already registered to the instance in any role.
  #[instrument(
    skip(self, request),
    fields(national_id = %request.national_id, role = %request.role)
  )]
  pub async fn add_teacher_to_course(
    &mut self,
    course_instance_id: i64,
    request: AddTeacherRequest,
  ) -> Result<TeacherAssignment> {
    self
      .uow
      .repository::<CourseInstance>()
      .await?
      .get(&course_instance_id)?;

    let persons: &Repository<Person> = self.uow.repository::<Person>().await?;
    let name = person_by_national_id(persons, &request.national_id)?
      .name
      .clone();

    let registrations = self.uow.repository::<TeacherRegistration>().await?;

    if request.role == TeacherRole::MainTeacher
      && main_teacher_of(registrations, course_instance_id).is_some()
    {
      warn!(course_instance_id, "main teacher already assigned");
      return Err(
        ValidationError::MainTeacherAlreadyAssigned { course_instance_id }.into(),
      );
    }

    let already_registered = registrations
      .find(|registration| {
        registration.course_instance_id == course_instance_id
          && registration.national_id == request.national_id
      })
      .is_some();
    if already_registered {
      warn!(course_instance_id, "person already registered");
      return Err(
        ValidationError::AlreadyRegistered {
          course_instance_id,
          national_id: request.national_id,
        }
        .into(),
      );
    }

    registrations.insert(TeacherRegistration {
      id: 0,
      course_instance_id,
      national_id: request.national_id.clone(),
      role: request.role,
    })?;

    self.uow.save().await?;

    // The store may have settled a different id than the one staged.
    let registration_id = self
      .uow
      .repository::<TeacherRegistration>()
      .await?
      .find(|registration| {
        registration.course_instance_id == course_instance_id
          && registration.national_id == request.national_id
      })
      .map(|registration| registration.id);
    info!(?registration_id, course_instance_id, "registered teacher");

    Ok(TeacherAssignment {
      national_id: request.national_id,
      name,
      role: request.role,
    })
  }
}

fn main_teacher_of(
  registrations: &Repository<TeacherRegistration>,
  course_instance_id: i64,
) -> Option<&TeacherRegistration> {
  registrations.find(|registration| {
    registration.course_instance_id == course_instance_id
      && registration.role == TeacherRole::MainTeacher
  })
}

fn person_by_national_id<'a>(
  persons: &'a Repository<Person>,
  national_id: &str,
) -> Result<&'a Person> {
  persons
    .find(|person| person.national_id == national_id)
    .ok_or_else(|| Error::not_found(EntityKind::Person, national_id))
}
