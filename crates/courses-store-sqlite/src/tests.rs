//! Integration tests for `SqliteStore` against an in-memory database.

use courses_core::{
  Error as CoreError, ValidationError,
  entity::{
    CourseInstance, CourseTemplate, EntityKind, Person, TeacherRegistration,
    TeacherRole,
  },
  repository::{Store, UnitOfWork},
  service::CourseService,
  view::AddTeacherRequest,
};

use crate::SqliteStore;

const SSN_DABS: &str = "1203735289";
const SSN_GUNNA: &str = "1234567890";

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A store holding the two-teacher, five-instance sample data.
async fn seeded() -> SqliteStore {
  let s = store().await;
  let mut uow = s.begin();

  let persons = uow.repository::<Person>().await.unwrap();
  for (name, national_id, email) in [
    ("Daníel B. Sigurgeirsson", SSN_DABS, "dabs@ru.is"),
    ("Guðrún Guðmundsdóttir", SSN_GUNNA, "gunna@ru.is"),
  ] {
    persons
      .insert(Person {
        id:          0,
        name:        name.into(),
        national_id: national_id.into(),
        email:       email.into(),
      })
      .unwrap();
  }

  let templates = uow.repository::<CourseTemplate>().await.unwrap();
  for (code, name) in
    [("T-514-VEFT", "Vefþjónustur"), ("T-313-BATM", "Crime fighting")]
  {
    templates
      .insert(CourseTemplate {
        course_code: code.into(),
        name:        name.into(),
        description: String::new(),
      })
      .unwrap();
  }

  let instances = uow.repository::<CourseInstance>().await.unwrap();
  for (id, code, semester) in [
    (1337, "T-514-VEFT", "20153"),
    (1338, "T-514-VEFT", "20163"),
    (1339, "T-313-BATM", "20163"),
    (1341, "T-313-BATM", "20143"),
    (1340, "T-514-VEFT", "20143"),
  ] {
    instances
      .insert(CourseInstance {
        id,
        course_code: code.into(),
        semester_id: semester.into(),
      })
      .unwrap();
  }

  let registrations = uow.repository::<TeacherRegistration>().await.unwrap();
  for (id, instance, national_id, role) in [
    (101, 1337, SSN_DABS, TeacherRole::MainTeacher),
    (102, 1337, SSN_GUNNA, TeacherRole::AssistantTeacher),
    (103, 1341, SSN_DABS, TeacherRole::MainTeacher),
    (104, 1340, SSN_GUNNA, TeacherRole::MainTeacher),
  ] {
    registrations
      .insert(TeacherRegistration {
        id,
        course_instance_id: instance,
        national_id: national_id.into(),
        role,
      })
      .unwrap();
  }

  uow.save().await.unwrap();
  s
}

fn request(national_id: &str, role: TeacherRole) -> AddTeacherRequest {
  AddTeacherRequest {
    national_id: national_id.into(),
    role,
  }
}

// ─── Unit of work ────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_store_has_empty_repositories() {
  let s = store().await;
  let mut uow = s.begin();
  assert!(uow.repository::<Person>().await.unwrap().is_empty());
  assert!(
    uow
      .repository::<TeacherRegistration>()
      .await
      .unwrap()
      .is_empty()
  );
}

#[tokio::test]
async fn saved_rows_are_read_back_in_insertion_order() {
  let s = seeded().await;
  let mut uow = s.begin();

  let persons = uow.repository::<Person>().await.unwrap();
  let ids: Vec<i64> = persons.iter().map(|p| p.id).collect();
  assert_eq!(ids, [1, 2]);

  let instances = uow.repository::<CourseInstance>().await.unwrap();
  let ids: Vec<i64> = instances.iter().map(|c| c.id).collect();
  assert_eq!(ids, [1337, 1338, 1339, 1341, 1340]);
}

#[tokio::test]
async fn roles_round_trip() {
  let s = seeded().await;
  let mut uow = s.begin();

  let registrations = uow.repository::<TeacherRegistration>().await.unwrap();
  assert_eq!(registrations.get(&101).unwrap().role, TeacherRole::MainTeacher);
  assert_eq!(
    registrations.get(&102).unwrap().role,
    TeacherRole::AssistantTeacher
  );
}

#[tokio::test]
async fn staged_rows_are_invisible_to_other_units_of_work() {
  let s = seeded().await;

  let mut writer = s.begin();
  writer
    .repository::<TeacherRegistration>()
    .await
    .unwrap()
    .insert(TeacherRegistration {
      id:                 0,
      course_instance_id: 1338,
      national_id:        SSN_DABS.into(),
      role:               TeacherRole::AssistantTeacher,
    })
    .unwrap();

  let mut reader = s.begin();
  assert_eq!(
    reader
      .repository::<TeacherRegistration>()
      .await
      .unwrap()
      .len(),
    4
  );

  writer.save().await.unwrap();
  assert_eq!(writer.commits(), 1);

  let mut later = s.begin();
  let registrations = later.repository::<TeacherRegistration>().await.unwrap();
  assert_eq!(registrations.len(), 5);
  assert_eq!(registrations.get(&105).unwrap().national_id, SSN_DABS);
}

#[tokio::test]
async fn save_with_nothing_staged_still_counts() {
  let s = seeded().await;
  let mut uow = s.begin();
  uow.save().await.unwrap();
  assert_eq!(uow.commits(), 1);
}

#[tokio::test]
async fn foreign_key_violation_fails_save_and_drops_staged_rows() {
  let s = seeded().await;
  let mut uow = s.begin();

  uow
    .repository::<TeacherRegistration>()
    .await
    .unwrap()
    .insert(TeacherRegistration {
      id:                 0,
      course_instance_id: 9999,
      national_id:        SSN_DABS.into(),
      role:               TeacherRole::AssistantTeacher,
    })
    .unwrap();

  let err = uow.save().await.unwrap_err();
  assert!(matches!(err, CoreError::Store(_)));
  assert_eq!(uow.commits(), 0);

  let registrations = uow.repository::<TeacherRegistration>().await.unwrap();
  assert!(!registrations.has_staged());
  assert_eq!(registrations.len(), 4);
}

#[tokio::test]
async fn schema_rejects_second_main_teacher_from_racing_writers() {
  let s = seeded().await;

  let mut first = s.begin();
  let mut second = s.begin();

  // Both load before either commits, so both see no main teacher on 1338.
  for (uow, id, national_id) in
    [(&mut first, 200, SSN_DABS), (&mut second, 201, SSN_GUNNA)]
  {
    uow
      .repository::<TeacherRegistration>()
      .await
      .unwrap()
      .insert(TeacherRegistration {
        id,
        course_instance_id: 1338,
        national_id: national_id.into(),
        role: TeacherRole::MainTeacher,
      })
      .unwrap();
  }

  first.save().await.unwrap();
  assert!(matches!(
    second.save().await,
    Err(CoreError::Validation(
      ValidationError::MainTeacherAlreadyAssigned { course_instance_id: 1338 }
    ))
  ));

  let mut check = s.begin();
  let mains = check
    .repository::<TeacherRegistration>()
    .await
    .unwrap()
    .filter(|r| r.course_instance_id == 1338 && r.role == TeacherRole::MainTeacher)
    .count();
  assert_eq!(mains, 1);
}

#[tokio::test]
async fn schema_rejects_same_person_from_racing_writers() {
  let s = seeded().await;

  let mut first = s.begin();
  let mut second = s.begin();

  for uow in [&mut first, &mut second] {
    uow
      .repository::<TeacherRegistration>()
      .await
      .unwrap()
      .insert(TeacherRegistration {
        id:                 0,
        course_instance_id: 1339,
        national_id:        SSN_GUNNA.into(),
        role:               TeacherRole::AssistantTeacher,
      })
      .unwrap();
  }

  first.save().await.unwrap();
  let err = second.save().await.unwrap_err();
  assert!(matches!(
    err,
    CoreError::Validation(ValidationError::AlreadyRegistered {
      course_instance_id: 1339,
      ..
    })
  ));
  assert!(
    !second
      .repository::<TeacherRegistration>()
      .await
      .unwrap()
      .has_staged()
  );
}

#[tokio::test]
async fn generated_ids_are_settled_at_save() {
  let s = seeded().await;

  // Both stage id 105 from the same snapshot.
  let mut first = s.begin();
  let mut second = s.begin();
  for (uow, course_instance_id, national_id) in
    [(&mut first, 1338, SSN_DABS), (&mut second, 1339, SSN_GUNNA)]
  {
    let staged = uow
      .repository::<TeacherRegistration>()
      .await
      .unwrap()
      .insert(TeacherRegistration {
        id: 0,
        course_instance_id,
        national_id: national_id.into(),
        role: TeacherRole::AssistantTeacher,
      })
      .unwrap();
    assert_eq!(staged.id, 105);
  }

  first.save().await.unwrap();
  second.save().await.unwrap();

  let committed = second.repository::<TeacherRegistration>().await.unwrap();
  assert_eq!(committed.get(&106).unwrap().course_instance_id, 1339);

  let mut check = s.begin();
  let registrations = check.repository::<TeacherRegistration>().await.unwrap();
  assert_eq!(registrations.len(), 6);
  assert_eq!(registrations.get(&105).unwrap().national_id, SSN_DABS);
  assert_eq!(registrations.get(&106).unwrap().national_id, SSN_GUNNA);
}

// ─── Service over SQLite ─────────────────────────────────────────────────────

#[tokio::test]
async fn service_lists_semester_with_main_teachers() {
  let s = seeded().await;
  let mut service = CourseService::new(s.begin());

  let result = service.list_course_instances(Some("20143")).await.unwrap();
  assert_eq!(result.len(), 2);
  assert_eq!(result[0].course_instance_id, 1341);
  assert_eq!(result[0].main_teacher, "Daníel B. Sigurgeirsson");
  assert_eq!(result[1].course_instance_id, 1340);
  assert_eq!(result[1].main_teacher, "Guðrún Guðmundsdóttir");
}

#[tokio::test]
async fn service_registration_is_durable() {
  let s = seeded().await;

  let mut service = CourseService::new(s.begin());
  let assignment = service
    .add_teacher_to_course(1339, request(SSN_GUNNA, TeacherRole::MainTeacher))
    .await
    .unwrap();
  assert_eq!(assignment.name, "Guðrún Guðmundsdóttir");
  assert_eq!(service.unit_of_work().commits(), 1);

  let mut fresh = CourseService::new(s.begin());
  let result = fresh.list_course_instances(Some("20163")).await.unwrap();
  assert_eq!(result[0].main_teacher, "");
  assert_eq!(result[1].main_teacher, "Guðrún Guðmundsdóttir");
}

#[tokio::test]
async fn service_rejects_duplicate_registration() {
  let s = seeded().await;
  let mut service = CourseService::new(s.begin());

  let err = service
    .add_teacher_to_course(1337, request(SSN_GUNNA, TeacherRole::AssistantTeacher))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    CoreError::Validation(ValidationError::AlreadyRegistered { .. })
  ));
  assert_eq!(service.unit_of_work().commits(), 0);
}

#[tokio::test]
async fn service_reports_unknown_course_instance() {
  let s = seeded().await;
  let mut service = CourseService::new(s.begin());

  let err = service
    .add_teacher_to_course(9999, request(SSN_GUNNA, TeacherRole::MainTeacher))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    CoreError::NotFound { kind: EntityKind::CourseInstance, .. }
  ));
}

#[tokio::test]
async fn services_on_stale_snapshots_register_unrelated_teachers() {
  let s = seeded().await;

  // Loads the registrations before the other service commits.
  let mut late = CourseService::new(s.begin());
  late.list_course_instances(Some("20163")).await.unwrap();

  let mut early = CourseService::new(s.begin());
  early
    .add_teacher_to_course(1338, request(SSN_DABS, TeacherRole::AssistantTeacher))
    .await
    .unwrap();

  let assignment = late
    .add_teacher_to_course(1339, request(SSN_GUNNA, TeacherRole::AssistantTeacher))
    .await
    .unwrap();
  assert_eq!(assignment.name, "Guðrún Guðmundsdóttir");
  assert_eq!(late.unit_of_work().commits(), 1);

  let mut check = s.begin();
  assert_eq!(
    check
      .repository::<TeacherRegistration>()
      .await
      .unwrap()
      .len(),
    6
  );
}

#[tokio::test]
async fn service_losing_main_teacher_race_reports_validation_error() {
  let s = seeded().await;

  let mut late = CourseService::new(s.begin());
  late.list_course_instances(Some("20163")).await.unwrap();

  let mut early = CourseService::new(s.begin());
  early
    .add_teacher_to_course(1339, request(SSN_DABS, TeacherRole::MainTeacher))
    .await
    .unwrap();

  let err = late
    .add_teacher_to_course(1339, request(SSN_GUNNA, TeacherRole::MainTeacher))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    CoreError::Validation(ValidationError::MainTeacherAlreadyAssigned { .. })
  ));
  assert_eq!(late.unit_of_work().commits(), 0);
}
