//! The `SchoolStore` trait and supporting read models.
//!
//! The trait is implemented by storage backends (e.g. `nemis-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.
//!
//! Every read that lists or counts org entities takes an [`OrgScope`]; the
//! backend must apply it before returning rows.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
  identity::{Identity, NewIdentity, Session},
  import::{ImportSummary, LocationRow},
  learner::{Learner, NewLearner},
  location::{County, LocationOption, LocationRef},
  school::{NewSchool, School},
  scope::OrgScope,
  staff::{
    ClassAssignment, NewClassAssignment, NewStream, NewSubjectAssignment, NewTeacher, Stream,
    SubjectAssignment, Teacher, TeacherQuery, TeacherUpdate,
  },
  subject::{NewSubject, Subject},
};

// ─── Read models ─────────────────────────────────────────────────────────────

/// Dashboard counts under a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
  pub schools:  u64,
  pub teachers: u64,
  pub learners: u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a NEMIS store backend.
///
/// Multi-row writes (teacher + identity creation, teacher update and
/// deletion) are atomic: either every row is written or none is.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SchoolStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Identities & sessions ─────────────────────────────────────────────

  /// Persist a new identity. A duplicate username is an integrity conflict.
  fn create_identity(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  fn get_identity(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  fn find_identity_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  fn set_profile_image(
    &self,
    identity_id: i64,
    path: Option<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Enable or disable login for `username`. Disabling also ends every open
  /// session of the identity.
  fn set_identity_active<'a>(
    &'a self,
    username: &'a str,
    active: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The school of the staff profile linked to `identity_id`, if any.
  fn linked_school(
    &self,
    identity_id: i64,
  ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send + '_;

  fn create_session(
    &self,
    session: Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The active identity owning an unexpired session, if any. Sessions of
  /// inactive identities resolve to `None`.
  fn session_identity<'a>(
    &'a self,
    token_hash: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  fn delete_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Locations ─────────────────────────────────────────────────────────

  fn list_counties(&self) -> impl Future<Output = Result<Vec<County>, Self::Error>> + Send + '_;

  /// Subcounties of a county, ordered by name.
  fn subcounties_of(
    &self,
    county_id: i64,
  ) -> impl Future<Output = Result<Vec<LocationOption>, Self::Error>> + Send + '_;

  /// Wards of a subcounty, ordered by name.
  fn wards_of(
    &self,
    sub_county_id: i64,
  ) -> impl Future<Output = Result<Vec<LocationOption>, Self::Error>> + Send + '_;

  /// Get-or-create every level named by `rows`. Rows without a county are
  /// skipped; re-importing the same rows creates nothing.
  fn import_locations(
    &self,
    rows: Vec<LocationRow>,
  ) -> impl Future<Output = Result<ImportSummary, Self::Error>> + Send + '_;

  /// Delete a location node (and its descendants). Fails while any school or
  /// learner references the node or a descendant.
  fn delete_location(
    &self,
    location: LocationRef,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Schools ───────────────────────────────────────────────────────────

  fn create_school(
    &self,
    input: NewSchool,
  ) -> impl Future<Output = Result<School, Self::Error>> + Send + '_;

  /// A school by id, or `None` if it does not exist or lies outside `scope`.
  fn get_school(
    &self,
    id: i64,
    scope: OrgScope,
  ) -> impl Future<Output = Result<Option<School>, Self::Error>> + Send + '_;

  fn list_schools(
    &self,
    scope: OrgScope,
  ) -> impl Future<Output = Result<Vec<School>, Self::Error>> + Send + '_;

  // ── Teachers ──────────────────────────────────────────────────────────

  /// Create an identity and its staff profile in one transaction.
  fn create_teacher(
    &self,
    identity: NewIdentity,
    teacher: NewTeacher,
  ) -> impl Future<Output = Result<Teacher, Self::Error>> + Send + '_;

  fn get_teacher(
    &self,
    id: i64,
    scope: OrgScope,
  ) -> impl Future<Output = Result<Option<Teacher>, Self::Error>> + Send + '_;

  fn teacher_for_identity(
    &self,
    identity_id: i64,
  ) -> impl Future<Output = Result<Option<Teacher>, Self::Error>> + Send + '_;

  fn list_teachers<'a>(
    &'a self,
    scope: OrgScope,
    query: &'a TeacherQuery,
  ) -> impl Future<Output = Result<Vec<Teacher>, Self::Error>> + Send + 'a;

  /// Update a teacher and its identity in one transaction.
  fn update_teacher(
    &self,
    id: i64,
    update: TeacherUpdate,
  ) -> impl Future<Output = Result<Teacher, Self::Error>> + Send + '_;

  /// Delete a teacher together with its identity.
  fn delete_teacher(&self, id: i64) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Streams & assignments ─────────────────────────────────────────────

  fn create_stream(
    &self,
    input: NewStream,
  ) -> impl Future<Output = Result<Stream, Self::Error>> + Send + '_;

  fn list_streams(
    &self,
    scope: OrgScope,
  ) -> impl Future<Output = Result<Vec<Stream>, Self::Error>> + Send + '_;

  /// Fails with a conflict if the stream already has a class teacher for the
  /// year, or if the same teacher/stream/year assignment exists.
  fn create_class_assignment(
    &self,
    input: NewClassAssignment,
  ) -> impl Future<Output = Result<ClassAssignment, Self::Error>> + Send + '_;

  fn class_assignments_for(
    &self,
    teacher_id: i64,
  ) -> impl Future<Output = Result<Vec<ClassAssignment>, Self::Error>> + Send + '_;

  fn create_subject_assignment(
    &self,
    input: NewSubjectAssignment,
  ) -> impl Future<Output = Result<SubjectAssignment, Self::Error>> + Send + '_;

  fn subject_assignments_for(
    &self,
    teacher_id: i64,
  ) -> impl Future<Output = Result<Vec<SubjectAssignment>, Self::Error>> + Send + '_;

  fn list_subject_assignments(
    &self,
    scope: OrgScope,
  ) -> impl Future<Output = Result<Vec<SubjectAssignment>, Self::Error>> + Send + '_;

  // ── Subjects ──────────────────────────────────────────────────────────

  fn create_subject(
    &self,
    input: NewSubject,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  /// National subjects plus school subjects visible under `scope`.
  fn list_subjects(
    &self,
    scope: OrgScope,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  // ── Learners ──────────────────────────────────────────────────────────

  /// Create a learner; compulsory subjects of the learner's phase (national
  /// or of the learner's school) are attached alongside `subject_ids`.
  fn create_learner(
    &self,
    input: NewLearner,
  ) -> impl Future<Output = Result<Learner, Self::Error>> + Send + '_;

  fn get_learner<'a>(
    &'a self,
    birth_certificate_number: &'a str,
    scope: OrgScope,
  ) -> impl Future<Output = Result<Option<Learner>, Self::Error>> + Send + 'a;

  fn list_learners(
    &self,
    scope: OrgScope,
  ) -> impl Future<Output = Result<Vec<Learner>, Self::Error>> + Send + '_;

  /// Replace every editable field of a learner. The key is not changed.
  fn update_learner<'a>(
    &'a self,
    birth_certificate_number: &'a str,
    input: NewLearner,
  ) -> impl Future<Output = Result<Learner, Self::Error>> + Send + 'a;

  // ── Dashboards ────────────────────────────────────────────────────────

  fn summarize(
    &self,
    scope: OrgScope,
  ) -> impl Future<Output = Result<Summary, Self::Error>> + Send + '_;
}
