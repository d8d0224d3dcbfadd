//! Handlers for `/subjects/`.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  response::{IntoResponse, Response},
};
use nemis_core::{
  access::SUBJECT_MANAGERS, identity::Role, store::SchoolStore, subject::NewSubject,
};

use crate::{
  AppState,
  auth::Viewer,
  error::Error,
  handlers::{body, target_school},
  page::{Flash, Message, Page, redirect_with},
};

/// `GET /subjects/`, national subjects plus the school subjects in scope.
pub async fn list<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
) -> Result<Response, Error> {
  viewer.require_login()?;
  let subjects = state
    .store
    .list_subjects(viewer.scope)
    .await
    .map_err(Error::from_store)?;
  Ok(
    Page::new("Subjects")
      .flash(flash)
      .with("subjects", subjects)
      .into_response(),
  )
}

/// `POST /subjects/`. School admins add subjects of their own school; the
/// cabinet secretary adds national ones. A superuser may do either.
pub async fn create<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  input: Result<Json<NewSubject>, JsonRejection>,
) -> Result<Response, Error> {
  let identity = viewer.require(SUBJECT_MANAGERS)?;
  let mut input = body(input)?;
  input.school_id = match identity.role {
    _ if identity.is_superuser => match input.school_id {
      Some(id) => Some(target_school(&state, viewer.scope, Some(id)).await?),
      None => None,
    },
    Some(Role::CabinetSecretary) => None,
    _ => Some(target_school(&state, viewer.scope, None).await?),
  };
  input.validate()?;

  let subject = state
    .store
    .create_subject(input)
    .await
    .map_err(Error::from_store)?;
  tracing::debug!(subject = subject.id, school = ?subject.school_id, "subject added");
  Ok(redirect_with("/subjects/", &[Message::success("Subject added successfully.")]))
}
