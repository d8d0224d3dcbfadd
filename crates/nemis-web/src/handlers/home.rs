//! The global home, the role dashboards and the teacher home.
//!
//! Every count is taken under the viewer's [`OrgScope`].

use axum::{
  extract::State,
  response::{IntoResponse, Response},
};
use nemis_core::{
  access::{LEARNER_MANAGERS, SCHOOL_MANAGERS, STAFF_MANAGERS, authorize, route_home},
  identity::Role,
  scope::OrgScope,
  store::SchoolStore,
};
use serde::Serialize;

use crate::{
  AppState,
  auth::Viewer,
  error::Error,
  page::{Flash, Page},
};

#[derive(Debug, Serialize)]
struct Card {
  label: &'static str,
  path:  &'static str,
}

/// Sections of the site, each with the roles that may open it.
const SECTIONS: &[(&str, &str, &[Role])] = &[
  ("Schools", "/schools/", SCHOOL_MANAGERS),
  ("Teachers", "/teachers/list/", STAFF_MANAGERS),
  ("Learners", "/learners/", LEARNER_MANAGERS),
];

async fn dashboard<S: SchoolStore + 'static>(
  state: &AppState<S>,
  viewer: &Viewer,
  flash: Flash,
  title: &str,
  allowed: &[Role],
) -> Result<Page, Error> {
  let identity = viewer.require(allowed)?;
  let summary = state
    .store
    .summarize(viewer.scope)
    .await
    .map_err(Error::from_store)?;
  Ok(
    Page::new(title)
      .flash(flash)
      .with("viewer", identity)
      .with("scope", viewer.scope)
      .with("summary", summary),
  )
}

/// `GET /`
pub async fn global<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
) -> Result<Response, Error> {
  let identity = viewer.require_login()?;
  let home = route_home(identity);
  let mut cards = vec![Card { label: "Subjects", path: "/subjects/" }];
  cards.extend(
    SECTIONS
      .iter()
      .filter(|(_, _, allowed)| authorize(Some(identity), allowed).is_allowed())
      .map(|&(label, path, _)| Card { label, path }),
  );

  let summary = state
    .store
    .summarize(viewer.scope)
    .await
    .map_err(Error::from_store)?;
  Ok(
    Page::new("Home")
      .flash(flash)
      .with("viewer", identity)
      .with("scope", viewer.scope)
      .with("summary", summary)
      .with("home", home.path())
      .with("cards", cards)
      .into_response(),
  )
}

/// `GET /dashboards/cabinet/`
pub async fn cabinet<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
) -> Result<Response, Error> {
  let page = dashboard(&state, &viewer, flash, "Cabinet Dashboard", &[Role::CabinetSecretary]).await?;
  Ok(page.into_response())
}

/// `GET /dashboards/county/`
pub async fn county<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
) -> Result<Response, Error> {
  let page = dashboard(&state, &viewer, flash, "County Dashboard", &[Role::CountyDirector]).await?;
  Ok(page.into_response())
}

/// `GET /dashboards/subcounty/`
pub async fn subcounty<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
) -> Result<Response, Error> {
  let page =
    dashboard(&state, &viewer, flash, "Subcounty Dashboard", &[Role::SubcountyDirector]).await?;
  Ok(page.into_response())
}

/// `GET /dashboards/school-admin/`
pub async fn school_admin<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
) -> Result<Response, Error> {
  let page = dashboard(&state, &viewer, flash, "School Dashboard", &[Role::SchoolAdmin]).await?;
  Ok(page.into_response())
}

/// `GET /dashboards/teacher/`, the scoped counts plus the viewer's own
/// class and subject assignments.
pub async fn teacher<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
) -> Result<Response, Error> {
  let page = dashboard(&state, &viewer, flash, "Teacher Dashboard", &[Role::Teacher]).await?;
  let Some(identity) = &viewer.identity else {
    return Ok(page.into_response());
  };

  let profile = state
    .store
    .teacher_for_identity(identity.id)
    .await
    .map_err(Error::from_store)?;
  let (classes, subjects) = match &profile {
    Some(teacher) => (
      state
        .store
        .class_assignments_for(teacher.id)
        .await
        .map_err(Error::from_store)?,
      state
        .store
        .subject_assignments_for(teacher.id)
        .await
        .map_err(Error::from_store)?,
    ),
    None => (Vec::new(), Vec::new()),
  };

  Ok(
    page
      .with("teacher", &profile)
      .with("class_assignment_count", classes.len())
      .with("subject_assignment_count", subjects.len())
      .with("class_assignments", classes)
      .with("subject_assignments", subjects)
      .into_response(),
  )
}

/// `GET /teachers/`, the landing page of teachers; open to every role that
/// works with learners.
pub async fn teacher_home<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
) -> Result<Response, Error> {
  let page = dashboard(&state, &viewer, flash, "Teachers", LEARNER_MANAGERS).await?;
  let school = match viewer.scope {
    OrgScope::School(id) => state
      .store
      .get_school(id, viewer.scope)
      .await
      .map_err(Error::from_store)?,
    _ => None,
  };
  Ok(page.with("school", school).into_response())
}
