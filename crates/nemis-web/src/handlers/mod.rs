pub mod accounts;
pub mod home;
pub mod learners;
pub mod locations;
pub mod schools;
pub mod subjects;
pub mod teachers;

use axum::{Json, extract::rejection::JsonRejection};
use nemis_core::{scope::OrgScope, store::SchoolStore};

use crate::{AppState, error::Error};

/// Unwrap a JSON body. Bodies are taken as `Result` so the gate runs before
/// a malformed body is reported.
pub(crate) fn body<T>(input: Result<Json<T>, JsonRejection>) -> Result<T, Error> {
  input
    .map(|Json(value)| value)
    .map_err(|rejection| Error::BadRequest(rejection.body_text()))
}

/// The school a write lands in. School-level viewers always write into their
/// own school; wider scopes must name a school they can see.
pub(crate) async fn target_school<S: SchoolStore>(
  state: &AppState<S>,
  scope: OrgScope,
  requested: Option<i64>,
) -> Result<i64, Error> {
  if let Some(own) = scope.school() {
    return Ok(own);
  }
  let id = requested.ok_or_else(|| Error::validation("school_id", "This field is required."))?;
  state
    .store
    .get_school(id, scope)
    .await
    .map_err(Error::from_store)?
    .ok_or_else(|| Error::validation("school_id", "Select a valid school."))?;
  Ok(id)
}
