//! Handlers for staff management under `/teachers/*`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/teachers/list/[?q=]` | Search over names, email and phone |
//! | `POST` | `/teachers/` | Creates the identity too; credentials are mailed, or shown once when mail is not delivered |
//! | `GET`/`PUT`/`DELETE` | `/teachers/{id}` | 404 outside the scope |
//! | `GET`/`POST` | `/teachers/streams/` | |
//! | `POST` | `/teachers/class-assignments/` | One class teacher per stream and year |
//! | `GET`/`POST` | `/teachers/subject-assignments/` | |
//!
//! Every route here is for school admins (and superusers).

use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
  response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use nemis_core::{
  access::STAFF_MANAGERS,
  identity::NewIdentity,
  staff::{
    NewClassAssignment, NewStream, NewSubjectAssignment, NewTeacher, StaffRole, Teacher,
    TeacherQuery, TeacherUpdate,
  },
  store::SchoolStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{Viewer, hash_password},
  error::Error,
  handlers::{body, target_school},
  page::{Flash, Message, Page, redirect_with},
  session::generate_password,
};

const LIST_PATH: &str = "/teachers/list/";

async fn visible_teacher<S: SchoolStore + 'static>(
  state: &AppState<S>,
  viewer: &Viewer,
  id: i64,
) -> Result<Teacher, Error> {
  state
    .store
    .get_teacher(id, viewer.scope)
    .await
    .map_err(Error::from_store)?
    .ok_or_else(|| Error::NotFound(format!("teacher {id} not found")))
}

/// A teacher the viewer may assign, reported against the form field.
async fn assignable_teacher<S: SchoolStore + 'static>(
  state: &AppState<S>,
  viewer: &Viewer,
  id: i64,
) -> Result<Teacher, Error> {
  state
    .store
    .get_teacher(id, viewer.scope)
    .await
    .map_err(Error::from_store)?
    .ok_or_else(|| Error::validation("teacher_id", "Select a valid teacher."))
}

// ─── List & search ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub q: Option<String>,
}

/// `GET /teachers/list/[?q=<text>]`
pub async fn list<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
  Query(params): Query<ListParams>,
) -> Result<Response, Error> {
  viewer.require(STAFF_MANAGERS)?;
  let query = TeacherQuery { text: params.q.filter(|q| !q.trim().is_empty()) };
  let teachers = state
    .store
    .list_teachers(viewer.scope, &query)
    .await
    .map_err(Error::from_store)?;
  Ok(
    Page::new("Teachers")
      .flash(flash)
      .with("q", &query.text)
      .with("teachers", teachers)
      .into_response(),
  )
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub username:    String,
  pub first_name:  String,
  pub last_name:   String,
  pub email:       String,
  pub tsc_number:  String,
  #[serde(default)]
  pub phone:       Option<String>,
  pub role:        StaffRole,
  #[serde(default)]
  pub date_joined: Option<NaiveDate>,
  /// Ignored for school admins, who always add staff to their own school.
  #[serde(default)]
  pub school_id:   Option<i64>,
}

fn credentials_mail(teacher: &Teacher, password: &str) -> String {
  format!(
    "Hello {}\nUsername: {}\nPassword: {}",
    teacher.full_name(),
    teacher.username,
    password
  )
}

/// `POST /teachers/`
pub async fn create<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  input: Result<Json<CreateBody>, JsonRejection>,
) -> Result<Response, Error> {
  viewer.require(STAFF_MANAGERS)?;
  let input = body(input)?;
  let school_id = target_school(&state, viewer.scope, input.school_id).await?;

  let password = generate_password();
  let identity = NewIdentity {
    username: input.username.trim().to_owned(),
    password_hash: hash_password(&password)?,
    first_name: input.first_name,
    last_name: input.last_name,
    email: input.email,
    ..Default::default()
  };
  let teacher = NewTeacher {
    school_id,
    role: input.role,
    tsc_number: input.tsc_number,
    phone: input.phone,
    date_joined: input.date_joined,
  };
  identity.validate()?;
  teacher.validate()?;

  let teacher = state
    .store
    .create_teacher(identity, teacher)
    .await
    .map_err(Error::from_store)?;

  let mut messages = Vec::new();
  let mail = credentials_mail(&teacher, &password);
  let delivered = match state.mailer.send(&teacher.email, "Your Teacher Account", &mail) {
    Ok(()) => state.mailer.delivers(),
    Err(e) => {
      tracing::warn!(error = %e, teacher = teacher.id, "credential mail not sent");
      messages.push(Message::warning("Teacher added but email failed to send."));
      false
    }
  };
  if !delivered {
    messages.push(Message::info(format!(
      "Temporary password for {}: {password}",
      teacher.username
    )));
  }
  messages.push(Message::success("Teacher added successfully."));
  Ok(redirect_with(LIST_PATH, &messages))
}

// ─── Detail, update, delete ──────────────────────────────────────────────────

/// `GET /teachers/{id}`
pub async fn detail<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
  Path(id): Path<i64>,
) -> Result<Response, Error> {
  viewer.require(STAFF_MANAGERS)?;
  let teacher = visible_teacher(&state, &viewer, id).await?;
  let classes = state
    .store
    .class_assignments_for(id)
    .await
    .map_err(Error::from_store)?;
  let subjects = state
    .store
    .subject_assignments_for(id)
    .await
    .map_err(Error::from_store)?;
  Ok(
    Page::new(teacher.full_name())
      .flash(flash)
      .with("teacher", teacher)
      .with("class_assignments", classes)
      .with("subject_assignments", subjects)
      .into_response(),
  )
}

/// `PUT /teachers/{id}`
pub async fn update<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  Path(id): Path<i64>,
  input: Result<Json<TeacherUpdate>, JsonRejection>,
) -> Result<Response, Error> {
  viewer.require(STAFF_MANAGERS)?;
  let input = body(input)?;
  visible_teacher(&state, &viewer, id).await?;
  input.validate()?;

  let teacher = state
    .store
    .update_teacher(id, input)
    .await
    .map_err(Error::from_store)?;
  Ok(
    Page::new(teacher.full_name())
      .message(Message::success("Teacher updated successfully."))
      .with("teacher", teacher)
      .into_response(),
  )
}

/// `DELETE /teachers/{id}`
pub async fn delete<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  Path(id): Path<i64>,
) -> Result<Response, Error> {
  viewer.require(STAFF_MANAGERS)?;
  visible_teacher(&state, &viewer, id).await?;
  state
    .store
    .delete_teacher(id)
    .await
    .map_err(Error::from_store)?;
  Ok(redirect_with(LIST_PATH, &[Message::success("Teacher deleted successfully.")]))
}

// ─── Streams ─────────────────────────────────────────────────────────────────

/// `GET /teachers/streams/`
pub async fn streams<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
) -> Result<Response, Error> {
  viewer.require(STAFF_MANAGERS)?;
  let streams = state
    .store
    .list_streams(viewer.scope)
    .await
    .map_err(Error::from_store)?;
  Ok(
    Page::new("Streams")
      .flash(flash)
      .with("streams", streams)
      .into_response(),
  )
}

#[derive(Debug, Deserialize)]
pub struct StreamBody {
  pub grade:     String,
  pub name:      String,
  #[serde(default)]
  pub school_id: Option<i64>,
}

/// `POST /teachers/streams/`
pub async fn create_stream<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  input: Result<Json<StreamBody>, JsonRejection>,
) -> Result<Response, Error> {
  viewer.require(STAFF_MANAGERS)?;
  let input = body(input)?;
  let school_id = target_school(&state, viewer.scope, input.school_id).await?;
  let stream = NewStream { school_id, grade: input.grade, name: input.name };
  stream.validate()?;

  state
    .store
    .create_stream(stream)
    .await
    .map_err(Error::from_store)?;
  Ok(redirect_with(
    "/teachers/streams/",
    &[Message::success("Stream added successfully.")],
  ))
}

// ─── Assignments ─────────────────────────────────────────────────────────────

/// `POST /teachers/class-assignments/`
pub async fn create_class_assignment<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  input: Result<Json<NewClassAssignment>, JsonRejection>,
) -> Result<Response, Error> {
  viewer.require(STAFF_MANAGERS)?;
  let input = body(input)?;
  input.validate()?;
  let teacher = assignable_teacher(&state, &viewer, input.teacher_id).await?;

  state
    .store
    .create_class_assignment(input)
    .await
    .map_err(Error::from_store)?;
  Ok(redirect_with(
    &format!("/teachers/{}", teacher.id),
    &[Message::success("Class assignment added successfully.")],
  ))
}

/// `GET /teachers/subject-assignments/`
pub async fn subject_assignments<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
) -> Result<Response, Error> {
  viewer.require(STAFF_MANAGERS)?;
  let assignments = state
    .store
    .list_subject_assignments(viewer.scope)
    .await
    .map_err(Error::from_store)?;
  Ok(
    Page::new("Subject Assignments")
      .flash(flash)
      .with("subject_assignments", assignments)
      .into_response(),
  )
}

/// `POST /teachers/subject-assignments/`
pub async fn create_subject_assignment<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  input: Result<Json<NewSubjectAssignment>, JsonRejection>,
) -> Result<Response, Error> {
  viewer.require(STAFF_MANAGERS)?;
  let input = body(input)?;
  input.validate()?;
  assignable_teacher(&state, &viewer, input.teacher_id).await?;

  state
    .store
    .create_subject_assignment(input)
    .await
    .map_err(Error::from_store)?;
  Ok(redirect_with(
    "/teachers/subject-assignments/",
    &[Message::success("Subject assignment added successfully.")],
  ))
}
