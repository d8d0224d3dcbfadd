//! Handlers for `/schools/*`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/schools/` | Scoped list |
//! | `POST` | `/schools/` | JSON [`NewSchool`]; location must lie in the viewer's scope |
//! | `GET`  | `/schools/{id}` | 404 outside the scope |

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  response::{IntoResponse, Response},
};
use nemis_core::{
  access::SCHOOL_MANAGERS, location::LocationChain, school::NewSchool, scope::OrgScope,
  store::SchoolStore,
};

use crate::{
  AppState,
  auth::Viewer,
  error::Error,
  handlers::body,
  page::{Flash, Message, Page, redirect_with},
};

/// Whether a viewer under `scope` may register a school at `location`.
/// School-level viewers are not tied to a unit of the location tree.
fn location_in_scope(scope: OrgScope, location: &LocationChain) -> bool {
  match scope {
    OrgScope::All | OrgScope::School(_) => true,
    OrgScope::County(id) => location.county_id == id,
    OrgScope::SubCounty(id) => location.sub_county_id == id,
    OrgScope::Empty => false,
  }
}

/// `GET /schools/`
pub async fn list<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
) -> Result<Response, Error> {
  viewer.require(SCHOOL_MANAGERS)?;
  let schools = state
    .store
    .list_schools(viewer.scope)
    .await
    .map_err(Error::from_store)?;
  Ok(
    Page::new("Schools")
      .flash(flash)
      .with("schools", schools)
      .into_response(),
  )
}

/// `POST /schools/`
pub async fn create<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  input: Result<Json<NewSchool>, JsonRejection>,
) -> Result<Response, Error> {
  viewer.require(SCHOOL_MANAGERS)?;
  let input = body(input)?;
  input.validate()?;
  if !location_in_scope(viewer.scope, &input.location) {
    return Err(Error::validation("county_id", "Select a location within your jurisdiction."));
  }

  let school = state
    .store
    .create_school(input)
    .await
    .map_err(Error::from_store)?;
  Ok(redirect_with(
    &format!("/schools/{}", school.id),
    &[Message::success("School registered successfully.")],
  ))
}

/// `GET /schools/{id}`
pub async fn detail<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
  Path(id): Path<i64>,
) -> Result<Response, Error> {
  viewer.require(SCHOOL_MANAGERS)?;
  let school = state
    .store
    .get_school(id, viewer.scope)
    .await
    .map_err(Error::from_store)?
    .ok_or_else(|| Error::NotFound(format!("school {id} not found")))?;
  Ok(
    Page::new(school.name.clone())
      .flash(flash)
      .with("school", school)
      .into_response(),
  )
}
