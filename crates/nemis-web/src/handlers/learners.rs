//! Handlers for `/learners/*`.
//!
//! Learners are keyed by birth-certificate number. School-level viewers
//! always write into their own school, whatever the body says.

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  response::{IntoResponse, Response},
};
use nemis_core::{access::LEARNER_MANAGERS, learner::NewLearner, store::SchoolStore};

use crate::{
  AppState,
  auth::Viewer,
  error::Error,
  handlers::{body, target_school},
  page::{Flash, Message, Page, redirect_with},
};

/// `GET /learners/`
pub async fn list<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
) -> Result<Response, Error> {
  viewer.require(LEARNER_MANAGERS)?;
  let learners = state
    .store
    .list_learners(viewer.scope)
    .await
    .map_err(Error::from_store)?;
  Ok(
    Page::new("Learners")
      .flash(flash)
      .with("learners", learners)
      .into_response(),
  )
}

/// `POST /learners/`
pub async fn create<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  input: Result<Json<NewLearner>, JsonRejection>,
) -> Result<Response, Error> {
  viewer.require(LEARNER_MANAGERS)?;
  let mut input = body(input)?;
  input.school_id = target_school(&state, viewer.scope, Some(input.school_id)).await?;
  input.validate()?;

  let learner = state
    .store
    .create_learner(input)
    .await
    .map_err(Error::from_store)?;
  tracing::debug!(learner = %learner.birth_certificate_number, subjects = learner.subject_ids.len(), "learner registered");
  Ok(redirect_with("/learners/", &[Message::success("Learner registered successfully.")]))
}

/// `GET /learners/{bcn}`
pub async fn detail<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
  Path(bcn): Path<String>,
) -> Result<Response, Error> {
  viewer.require(LEARNER_MANAGERS)?;
  let learner = state
    .store
    .get_learner(&bcn, viewer.scope)
    .await
    .map_err(Error::from_store)?
    .ok_or_else(|| Error::NotFound(format!("learner {bcn} not found")))?;
  Ok(
    Page::new(learner.full_name())
      .flash(flash)
      .with("learner", learner)
      .into_response(),
  )
}

/// `PUT /learners/{bcn}`, replacing every editable field. The key in the
/// path wins over the one in the body.
pub async fn update<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  Path(bcn): Path<String>,
  input: Result<Json<NewLearner>, JsonRejection>,
) -> Result<Response, Error> {
  viewer.require(LEARNER_MANAGERS)?;
  let mut input = body(input)?;
  state
    .store
    .get_learner(&bcn, viewer.scope)
    .await
    .map_err(Error::from_store)?
    .ok_or_else(|| Error::NotFound(format!("learner {bcn} not found")))?;

  input.birth_certificate_number = bcn.clone();
  input.school_id = target_school(&state, viewer.scope, Some(input.school_id)).await?;
  input.validate()?;

  let learner = state
    .store
    .update_learner(&bcn, input)
    .await
    .map_err(Error::from_store)?;
  Ok(
    Page::new(learner.full_name())
      .message(Message::success("Learner updated successfully."))
      .with("learner", learner)
      .into_response(),
  )
}
