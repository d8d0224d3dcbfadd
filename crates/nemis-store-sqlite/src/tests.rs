//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, NaiveDate, Utc};
use nemis_core::{
  identity::{NewIdentity, Role, Session},
  import::{LocationRow, parse_locations_csv},
  learner::{Gender, Grade, NewLearner, Relationship},
  location::{LocationChain, LocationRef},
  school::{NewSchool, SchoolLevel},
  scope::OrgScope,
  staff::{
    NewClassAssignment, NewStream, NewSubjectAssignment, NewTeacher, StaffRole, TeacherQuery,
    TeacherUpdate,
  },
  store::SchoolStore,
  subject::{GradeLevel, NewSubject},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// Two counties, three subcounties, one ward each:
/// Nairobi/Westlands/Parklands, Nairobi/Langata/Karen, Mombasa/Nyali/Frere Town.
async fn seed_locations(s: &SqliteStore) {
  s.import_locations(vec![
    LocationRow::new("Nairobi", "Westlands", "Parklands"),
    LocationRow::new("Nairobi", "Langata", "Karen"),
    LocationRow::new("Mombasa", "Nyali", "Frere Town"),
  ])
  .await
  .unwrap();
}

async fn chain(s: &SqliteStore, county: &str, sub_county: &str) -> LocationChain {
  let county = s
    .list_counties()
    .await
    .unwrap()
    .into_iter()
    .find(|c| c.name == county)
    .unwrap();
  let sub = s
    .subcounties_of(county.id)
    .await
    .unwrap()
    .into_iter()
    .find(|sc| sc.name == sub_county)
    .unwrap();
  let ward = s.wards_of(sub.id).await.unwrap().remove(0);
  LocationChain { county_id: county.id, sub_county_id: sub.id, ward_id: ward.id }
}

async fn school(s: &SqliteStore, code: &str, location: LocationChain) -> i64 {
  s.create_school(NewSchool {
    name: format!("School {code}"),
    code: code.into(),
    level: SchoolLevel::Primary,
    location,
    address: None,
  })
  .await
  .unwrap()
  .id
}

fn teacher_identity(username: &str) -> NewIdentity {
  NewIdentity {
    username: username.into(),
    password_hash: "x".into(),
    first_name: "Grace".into(),
    last_name: username.into(),
    email: format!("{username}@example.com"),
    ..Default::default()
  }
}

fn new_teacher(school_id: i64, tsc: &str) -> NewTeacher {
  NewTeacher {
    school_id,
    role: StaffRole::SubjectTeacher,
    tsc_number: tsc.into(),
    phone: Some("0700000000".into()),
    date_joined: None,
  }
}

fn new_learner(bcn: &str, school_id: i64, location: LocationChain) -> NewLearner {
  NewLearner {
    birth_certificate_number: bcn.into(),
    admission_number: format!("ADM-{bcn}"),
    first_name: "Amani".into(),
    middle_name: None,
    last_name: "Otieno".into(),
    date_of_birth: NaiveDate::from_ymd_opt(2016, 3, 1),
    gender: Gender::Female,
    school_id,
    grade: Grade::Grade2,
    year: 2025,
    admission_date: NaiveDate::from_ymd_opt(2024, 1, 8),
    class_teacher_id: None,
    parent_full_name: "Mary Otieno".into(),
    parent_contact: "0711111111".into(),
    relationship: Relationship::Mother,
    location,
    postal_address: "P.O. Box 1".into(),
    subject_ids: vec![],
  }
}

// ─── Locations ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn csv_import_is_idempotent_and_skips_countyless_rows() {
  let s = store().await;
  let csv = "county,sub_county,ward\n\
             Nairobi,Westlands,Parklands\n\
             Nairobi,Westlands,Parklands\n\
             ,Orphan,Nowhere\n\
             Nairobi,Westlands,Kangemi\n";
  let rows = parse_locations_csv(csv).unwrap();

  let first = s.import_locations(rows.clone()).await.unwrap();
  assert_eq!(first.rows, 3);
  assert_eq!(first.skipped, 1);
  assert_eq!(first.counties_created, 1);
  assert_eq!(first.sub_counties_created, 1);
  assert_eq!(first.wards_created, 2);

  let second = s.import_locations(rows).await.unwrap();
  assert_eq!(second.counties_created + second.sub_counties_created + second.wards_created, 0);

  let counties = s.list_counties().await.unwrap();
  assert_eq!(counties.len(), 1);
  let subs = s.subcounties_of(counties[0].id).await.unwrap();
  assert_eq!(subs.len(), 1);
  let wards = s.wards_of(subs[0].id).await.unwrap();
  let names: Vec<_> = wards.iter().map(|w| w.name.as_str()).collect();
  assert_eq!(names, ["Kangemi", "Parklands"], "wards are ordered by name");
}

#[tokio::test]
async fn referenced_location_cannot_be_deleted() {
  let s = store().await;
  seed_locations(&s).await;
  let westlands = chain(&s, "Nairobi", "Westlands").await;
  school(&s, "W001", westlands).await;

  let err = s.delete_location(LocationRef::County(westlands.county_id)).await.unwrap_err();
  assert!(matches!(err, Error::Protected(_)), "{err:?}");
  let err = s.delete_location(LocationRef::Ward(westlands.ward_id)).await.unwrap_err();
  assert!(matches!(err, Error::Protected(_)), "{err:?}");

  // Unreferenced parts of the hierarchy cascade.
  let nyali = chain(&s, "Mombasa", "Nyali").await;
  s.delete_location(LocationRef::County(nyali.county_id)).await.unwrap();
  assert!(s.wards_of(nyali.sub_county_id).await.unwrap().is_empty());

  let err = s.delete_location(LocationRef::Ward(9999)).await.unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
}

// ─── Schools ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn school_location_chain_must_be_consistent() {
  let s = store().await;
  seed_locations(&s).await;
  let westlands = chain(&s, "Nairobi", "Westlands").await;
  let nyali = chain(&s, "Mombasa", "Nyali").await;

  let mixed = LocationChain { ward_id: nyali.ward_id, ..westlands };
  let err = s
    .create_school(NewSchool {
      name: "Mixed".into(),
      code: "M001".into(),
      level: SchoolLevel::Secondary,
      location: mixed,
      address: None,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(nemis_core::Error::ValidationFailed { .. })));
}

#[tokio::test]
async fn duplicate_school_code_is_a_conflict() {
  let s = store().await;
  seed_locations(&s).await;
  let westlands = chain(&s, "Nairobi", "Westlands").await;
  school(&s, "W001", westlands).await;

  let err = s
    .create_school(NewSchool {
      name: "Another".into(),
      code: "W001".into(),
      level: SchoolLevel::Primary,
      location: westlands,
      address: Some("  ".into()),
    })
    .await
    .unwrap_err();
  assert!(matches!(&err, Error::Conflict(m) if m.contains("code")), "{err:?}");
}

#[tokio::test]
async fn school_listing_follows_scope() {
  let s = store().await;
  seed_locations(&s).await;
  let westlands = chain(&s, "Nairobi", "Westlands").await;
  let langata = chain(&s, "Nairobi", "Langata").await;
  let nyali = chain(&s, "Mombasa", "Nyali").await;
  let x = school(&s, "X", westlands).await;
  let y = school(&s, "Y", langata).await;
  school(&s, "Z", nyali).await;

  let ids = |schools: Vec<nemis_core::school::School>| schools.into_iter().map(|s| s.id).collect::<Vec<_>>();

  assert_eq!(s.list_schools(OrgScope::All).await.unwrap().len(), 3);
  assert_eq!(ids(s.list_schools(OrgScope::County(westlands.county_id)).await.unwrap()), [x, y]);
  assert_eq!(ids(s.list_schools(OrgScope::SubCounty(westlands.sub_county_id)).await.unwrap()), [x]);
  assert_eq!(ids(s.list_schools(OrgScope::School(y)).await.unwrap()), [y]);
  assert!(s.list_schools(OrgScope::Empty).await.unwrap().is_empty());

  assert!(s.get_school(x, OrgScope::SubCounty(langata.sub_county_id)).await.unwrap().is_none());
  assert!(s.get_school(x, OrgScope::County(westlands.county_id)).await.unwrap().is_some());
}

// ─── Identities & sessions ───────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
  let s = store().await;
  let input = NewIdentity {
    username: "cs".into(),
    password_hash: "h".into(),
    role: Some(Role::CabinetSecretary),
    ..Default::default()
  };
  let created = s.create_identity(input.clone()).await.unwrap();
  assert_eq!(created.role, Some(Role::CabinetSecretary));
  assert!(created.is_active);

  let err = s.create_identity(input).await.unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn sessions_resolve_until_expiry() {
  let s = store().await;
  let who = s
    .create_identity(NewIdentity { username: "u".into(), password_hash: "h".into(), ..Default::default() })
    .await
    .unwrap();
  let now = Utc::now();
  s.create_session(Session {
    token_hash:  "abc".into(),
    identity_id: who.id,
    created_at:  now,
    expires_at:  now + Duration::hours(1),
  })
  .await
  .unwrap();

  let found = s.session_identity("abc", now).await.unwrap().unwrap();
  assert_eq!(found.id, who.id);
  assert!(s.session_identity("abc", now + Duration::hours(2)).await.unwrap().is_none());
  assert!(s.session_identity("nope", now).await.unwrap().is_none());

  s.delete_session("abc").await.unwrap();
  assert!(s.session_identity("abc", now).await.unwrap().is_none());
}

#[tokio::test]
async fn deactivation_ends_sessions() {
  let s = store().await;
  let who = s
    .create_identity(NewIdentity { username: "u".into(), password_hash: "h".into(), ..Default::default() })
    .await
    .unwrap();
  let now = Utc::now();
  s.create_session(Session {
    token_hash:  "abc".into(),
    identity_id: who.id,
    created_at:  now,
    expires_at:  now + Duration::hours(1),
  })
  .await
  .unwrap();

  s.set_identity_active("u", false).await.unwrap();
  assert!(s.session_identity("abc", now).await.unwrap().is_none());
  let stored = s.find_identity_by_username("u").await.unwrap().unwrap();
  assert!(!stored.is_active);

  s.set_identity_active("u", true).await.unwrap();
  assert!(s.find_identity_by_username("u").await.unwrap().unwrap().is_active);
  assert!(matches!(
    s.set_identity_active("ghost", false).await,
    Err(Error::NotFound { .. })
  ));
}

// ─── Teachers ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn teacher_creation_binds_identity_role_and_school() {
  let s = store().await;
  seed_locations(&s).await;
  let x = school(&s, "X", chain(&s, "Nairobi", "Westlands").await).await;

  let mut input = new_teacher(x, "TSC1");
  input.role = StaffRole::SchoolAdmin;
  let t = s.create_teacher(teacher_identity("admin"), input).await.unwrap();

  let identity = s.get_identity(t.identity_id).await.unwrap().unwrap();
  assert_eq!(identity.role, Some(Role::SchoolAdmin));
  assert_eq!(identity.school_id, Some(x));
  assert_eq!(s.linked_school(t.identity_id).await.unwrap(), Some(x));
  assert_eq!(t.date_joined, Utc::now().date_naive());
}

#[tokio::test]
async fn teacher_creation_is_atomic_on_duplicate_tsc() {
  let s = store().await;
  seed_locations(&s).await;
  let x = school(&s, "X", chain(&s, "Nairobi", "Westlands").await).await;
  s.create_teacher(teacher_identity("first"), new_teacher(x, "TSC1")).await.unwrap();

  let err = s
    .create_teacher(teacher_identity("second"), new_teacher(x, "TSC1"))
    .await
    .unwrap_err();
  assert!(matches!(&err, Error::Conflict(m) if m.contains("TSC")), "{err:?}");
  assert!(
    s.find_identity_by_username("second").await.unwrap().is_none(),
    "identity row must roll back with the teacher row"
  );
}

#[tokio::test]
async fn teacher_search_and_scope() {
  let s = store().await;
  seed_locations(&s).await;
  let x = school(&s, "X", chain(&s, "Nairobi", "Westlands").await).await;
  let y = school(&s, "Y", chain(&s, "Mombasa", "Nyali").await).await;
  s.create_teacher(teacher_identity("wanjiru"), new_teacher(x, "T1")).await.unwrap();
  s.create_teacher(teacher_identity("achieng"), new_teacher(x, "T2")).await.unwrap();
  let other = s.create_teacher(teacher_identity("mwangi"), new_teacher(y, "T3")).await.unwrap();

  let all_x = s.list_teachers(OrgScope::School(x), &TeacherQuery::default()).await.unwrap();
  let names: Vec<_> = all_x.iter().map(|t| t.last_name.as_str()).collect();
  assert_eq!(names, ["achieng", "wanjiru"]);

  let q = TeacherQuery { text: Some("WANJ".into()) };
  assert_eq!(s.list_teachers(OrgScope::School(x), &q).await.unwrap().len(), 1);
  let q = TeacherQuery { text: Some("mwangi".into()) };
  assert!(s.list_teachers(OrgScope::School(x), &q).await.unwrap().is_empty());

  assert!(s.get_teacher(other.id, OrgScope::School(x)).await.unwrap().is_none());
}

#[tokio::test]
async fn teacher_update_touches_both_rows() {
  let s = store().await;
  seed_locations(&s).await;
  let x = school(&s, "X", chain(&s, "Nairobi", "Westlands").await).await;
  let t = s.create_teacher(teacher_identity("kamau"), new_teacher(x, "T1")).await.unwrap();

  let updated = s
    .update_teacher(t.id, TeacherUpdate {
      first_name: Some("Peter".into()),
      phone: Some("0722000000".into()),
      role: Some(StaffRole::SchoolAdmin),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.first_name, "Peter");
  assert_eq!(updated.last_name, "kamau");
  assert_eq!(updated.phone.as_deref(), Some("0722000000"));
  assert_eq!(updated.role, StaffRole::SchoolAdmin);
  let identity = s.get_identity(t.identity_id).await.unwrap().unwrap();
  assert_eq!(identity.role, Some(Role::SchoolAdmin));

  let err = s.update_teacher(999, TeacherUpdate::default()).await.unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn deleting_a_teacher_removes_identity_and_clears_class_teacher() {
  let s = store().await;
  seed_locations(&s).await;
  let loc = chain(&s, "Nairobi", "Westlands").await;
  let x = school(&s, "X", loc).await;
  let t = s.create_teacher(teacher_identity("otieno"), new_teacher(x, "T1")).await.unwrap();

  let mut learner = new_learner("BC1", x, loc);
  learner.class_teacher_id = Some(t.id);
  s.create_learner(learner).await.unwrap();

  s.delete_teacher(t.id).await.unwrap();
  assert!(s.get_identity(t.identity_id).await.unwrap().is_none());
  let learner = s.get_learner("BC1", OrgScope::All).await.unwrap().unwrap();
  assert_eq!(learner.class_teacher_id, None);
}

// ─── Streams & assignments ───────────────────────────────────────────────────

#[tokio::test]
async fn one_class_teacher_per_stream_and_year() {
  let s = store().await;
  seed_locations(&s).await;
  let x = school(&s, "X", chain(&s, "Nairobi", "Westlands").await).await;
  let a = s.create_teacher(teacher_identity("a"), new_teacher(x, "T1")).await.unwrap();
  let b = s.create_teacher(teacher_identity("b"), new_teacher(x, "T2")).await.unwrap();
  let stream = s
    .create_stream(NewStream { school_id: x, grade: "Grade 5".into(), name: "A".into() })
    .await
    .unwrap();

  let assign = |teacher_id, year, is_class_teacher| NewClassAssignment {
    teacher_id,
    stream_id: stream.id,
    year,
    is_class_teacher,
  };
  s.create_class_assignment(assign(a.id, 2025, true)).await.unwrap();

  let err = s.create_class_assignment(assign(b.id, 2025, true)).await.unwrap_err();
  assert!(matches!(&err, Error::Conflict(m) if m.contains("class teacher")), "{err:?}");

  // A plain assignment and another year are both fine.
  s.create_class_assignment(assign(b.id, 2025, false)).await.unwrap();
  s.create_class_assignment(assign(b.id, 2026, true)).await.unwrap();
  assert_eq!(s.class_assignments_for(b.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn assignments_cannot_cross_schools() {
  let s = store().await;
  seed_locations(&s).await;
  let x = school(&s, "X", chain(&s, "Nairobi", "Westlands").await).await;
  let y = school(&s, "Y", chain(&s, "Mombasa", "Nyali").await).await;
  let t = s.create_teacher(teacher_identity("a"), new_teacher(x, "T1")).await.unwrap();
  let foreign = s
    .create_stream(NewStream { school_id: y, grade: "Grade 1".into(), name: "B".into() })
    .await
    .unwrap();
  let home = s
    .create_stream(NewStream { school_id: x, grade: "Grade 1".into(), name: "B".into() })
    .await
    .unwrap();

  let err = s
    .create_class_assignment(NewClassAssignment {
      teacher_id: t.id,
      stream_id: foreign.id,
      year: 2025,
      is_class_teacher: false,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(nemis_core::Error::ValidationFailed { .. })));

  let y_subject = s
    .create_subject(NewSubject {
      name: "Kiswahili Y".into(),
      grade_level: GradeLevel::LowerPrimary,
      is_compulsory: false,
      school_id: Some(y),
    })
    .await
    .unwrap();
  let err = s
    .create_subject_assignment(NewSubjectAssignment {
      teacher_id: t.id,
      subject_id: y_subject.id,
      stream_id: home.id,
      year: 2025,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(nemis_core::Error::ValidationFailed { .. })));

  let national = s
    .create_subject(NewSubject {
      name: "Mathematics".into(),
      grade_level: GradeLevel::LowerPrimary,
      is_compulsory: true,
      school_id: None,
    })
    .await
    .unwrap();
  s.create_subject_assignment(NewSubjectAssignment {
    teacher_id: t.id,
    subject_id: national.id,
    stream_id: home.id,
    year: 2025,
  })
  .await
  .unwrap();
  assert_eq!(s.list_subject_assignments(OrgScope::School(x)).await.unwrap().len(), 1);
  assert!(s.list_subject_assignments(OrgScope::School(y)).await.unwrap().is_empty());
}

// ─── Subjects & learners ─────────────────────────────────────────────────────

#[tokio::test]
async fn subjects_visible_are_national_plus_scoped_school() {
  let s = store().await;
  seed_locations(&s).await;
  let x = school(&s, "X", chain(&s, "Nairobi", "Westlands").await).await;
  let y = school(&s, "Y", chain(&s, "Mombasa", "Nyali").await).await;
  for (name, school_id) in [("English", None), ("Art X", Some(x)), ("Art Y", Some(y))] {
    s.create_subject(NewSubject {
      name: name.into(),
      grade_level: GradeLevel::UpperPrimary,
      is_compulsory: false,
      school_id,
    })
    .await
    .unwrap();
  }

  let names = |v: Vec<nemis_core::subject::Subject>| v.into_iter().map(|s| s.name).collect::<Vec<_>>();
  assert_eq!(names(s.list_subjects(OrgScope::School(x)).await.unwrap()), ["Art X", "English"]);
  assert_eq!(names(s.list_subjects(OrgScope::Empty).await.unwrap()), ["English"]);
  assert_eq!(s.list_subjects(OrgScope::All).await.unwrap().len(), 3);
}

#[tokio::test]
async fn learners_get_compulsory_subjects_of_their_phase() {
  let s = store().await;
  seed_locations(&s).await;
  let loc = chain(&s, "Nairobi", "Westlands").await;
  let x = school(&s, "X", loc).await;
  let subject = |name: &str, level, compulsory| NewSubject {
    name: name.into(),
    grade_level: level,
    is_compulsory: compulsory,
    school_id: None,
  };
  let maths = s.create_subject(subject("Maths LP", GradeLevel::LowerPrimary, true)).await.unwrap();
  let music = s.create_subject(subject("Music LP", GradeLevel::LowerPrimary, false)).await.unwrap();
  s.create_subject(subject("Maths JS", GradeLevel::JuniorSecondary, true)).await.unwrap();

  let mut input = new_learner("BC1", x, loc);
  input.subject_ids = vec![music.id];
  let learner = s.create_learner(input.clone()).await.unwrap();
  assert_eq!(learner.subject_ids, vec![maths.id, music.id]);

  let err = s.create_learner(input.clone()).await.unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));

  // Moving to Grade 7 swaps in the junior-secondary compulsory set.
  input.grade = Grade::Grade7;
  input.subject_ids = vec![];
  let moved = s.update_learner("BC1", input).await.unwrap();
  assert_eq!(moved.subject_ids.len(), 1);
  assert_ne!(moved.subject_ids[0], maths.id);
}

#[tokio::test]
async fn learner_lookup_is_scoped_and_summaries_count_under_scope() {
  let s = store().await;
  seed_locations(&s).await;
  let westlands = chain(&s, "Nairobi", "Westlands").await;
  let nyali = chain(&s, "Mombasa", "Nyali").await;
  let x = school(&s, "X", westlands).await;
  let y = school(&s, "Y", nyali).await;
  s.create_teacher(teacher_identity("a"), new_teacher(x, "T1")).await.unwrap();
  s.create_learner(new_learner("BC1", x, westlands)).await.unwrap();
  // Home location need not match the school's.
  s.create_learner(new_learner("BC2", y, westlands)).await.unwrap();

  assert!(s.get_learner("BC2", OrgScope::School(x)).await.unwrap().is_none());
  assert!(s.get_learner("BC2", OrgScope::County(nyali.county_id)).await.unwrap().is_some());
  assert_eq!(s.list_learners(OrgScope::SubCounty(westlands.sub_county_id)).await.unwrap().len(), 1);

  let national = s.summarize(OrgScope::All).await.unwrap();
  assert_eq!((national.schools, national.teachers, national.learners), (2, 1, 2));
  let county = s.summarize(OrgScope::County(nyali.county_id)).await.unwrap();
  assert_eq!((county.schools, county.teachers, county.learners), (1, 0, 1));
  assert_eq!(s.summarize(OrgScope::Empty).await.unwrap(), Default::default());
}

#[tokio::test]
async fn learner_class_teacher_must_belong_to_the_school() {
  let s = store().await;
  seed_locations(&s).await;
  let loc = chain(&s, "Nairobi", "Westlands").await;
  let x = school(&s, "X", loc).await;
  let y = school(&s, "Y", chain(&s, "Mombasa", "Nyali").await).await;
  let t = s.create_teacher(teacher_identity("a"), new_teacher(y, "T1")).await.unwrap();

  let mut input = new_learner("BC1", x, loc);
  input.class_teacher_id = Some(t.id);
  let err = s.create_learner(input).await.unwrap_err();
  assert!(matches!(err, Error::Core(nemis_core::Error::ValidationFailed { ref field, .. }) if field == "class_teacher_id"));
  assert!(s.list_learners(OrgScope::All).await.unwrap().is_empty());
}
