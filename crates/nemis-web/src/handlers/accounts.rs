//! Handlers for `/accounts/*`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/accounts/login/` | Signed-in viewers are sent to their home |
//! | `POST` | `/accounts/login/` | Form: `username`, `password`, `next?`; signed-in viewers are sent home |
//! | `GET`/`POST` | `/accounts/logout/` | Ends the session |
//! | `PUT`  | `/accounts/profile-image` | Raw image body, `image/*`, ≤ 5 MB |

use axum::{
  Form,
  extract::{Query, State, rejection::FormRejection},
  http::{HeaderMap, header},
  response::{IntoResponse, Redirect, Response},
};
use bytes::Bytes;
use chrono::{Duration, Utc};
use nemis_core::{
  access::route_home, identity::Session, redirect::validate_next, store::SchoolStore,
  validate::validate_profile_image,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::{Viewer, verify_password},
  error::Error,
  page::{Flash, Message, Page, redirect_with},
  session::{SESSION_COOKIE, cookie, digest, expired, new_token},
};

pub const LOGIN_PATH: &str = "/accounts/login/";

const INVALID_CREDENTIALS: &str = "Invalid username or password.";
const INACTIVE_ACCOUNT: &str = "Your account is inactive. Contact admin.";

fn host(headers: &HeaderMap) -> &str {
  headers
    .get(header::HOST)
    .and_then(|v| v.to_str().ok())
    .unwrap_or("")
}

fn safe_next<S>(state: &AppState<S>, headers: &HeaderMap, next: Option<&str>) -> Option<String> {
  validate_next(
    next,
    host(headers),
    &state.config.allowed_hosts,
    state.config.secure_cookies,
  )
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NextParam {
  pub next: Option<String>,
}

/// `GET /accounts/login/[?next=…]`
pub async fn login_page<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  flash: Flash,
  headers: HeaderMap,
  Query(params): Query<NextParam>,
) -> Response {
  if let Some(identity) = &viewer.identity {
    return Redirect::to(route_home(identity).path()).into_response();
  }
  Page::new("Login")
    .flash(flash)
    .with("next", safe_next(&state, &headers, params.next.as_deref()))
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
  pub username: String,
  pub password: String,
  #[serde(default)]
  pub next:     Option<String>,
}

fn login_refused<S>(state: &AppState<S>, headers: &HeaderMap, form: &LoginForm, text: &str) -> Response {
  Page::new("Login")
    .message(Message::error(text))
    .with("username", &form.username)
    .with("next", safe_next(state, headers, form.next.as_deref()))
    .into_response()
}

/// `POST /accounts/login/`
pub async fn login<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  headers: HeaderMap,
  form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, Error> {
  if let Some(identity) = &viewer.identity {
    return Ok(Redirect::to(route_home(identity).path()).into_response());
  }
  let Form(form) = form.map_err(|rejection| Error::BadRequest(rejection.body_text()))?;

  let identity = state
    .store
    .find_identity_by_username(form.username.trim())
    .await
    .map_err(Error::from_store)?;
  let Some(identity) = identity.filter(|i| verify_password(&form.password, &i.password_hash))
  else {
    tracing::info!(username = %form.username, "login refused");
    return Ok(login_refused(&state, &headers, &form, INVALID_CREDENTIALS));
  };
  if !identity.is_active {
    tracing::info!(username = %identity.username, "login refused for inactive account");
    return Ok(login_refused(&state, &headers, &form, INACTIVE_ACCOUNT));
  }

  let token = new_token();
  let now = Utc::now();
  state
    .store
    .create_session(Session {
      token_hash:  digest(&token),
      identity_id: identity.id,
      created_at:  now,
      expires_at:  now + Duration::hours(state.config.session_ttl_hours),
    })
    .await
    .map_err(Error::from_store)?;
  tracing::info!(username = %identity.username, "login");

  let to = safe_next(&state, &headers, form.next.as_deref())
    .unwrap_or_else(|| route_home(&identity).path().to_owned());
  let mut res = Redirect::to(&to).into_response();
  let max_age = state.config.session_ttl_hours * 3600;
  if let Some(value) = cookie(SESSION_COOKIE, &token, Some(max_age), state.config.secure_cookies) {
    res.headers_mut().append(header::SET_COOKIE, value);
  }
  Ok(res)
}

// ─── Logout ──────────────────────────────────────────────────────────────────

/// `GET|POST /accounts/logout/`
pub async fn logout<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
) -> Result<Response, Error> {
  if let Some(token_hash) = &viewer.session {
    state
      .store
      .delete_session(token_hash)
      .await
      .map_err(Error::from_store)?;
  }
  let mut res = redirect_with(LOGIN_PATH, &[Message::success("Logged out successfully.")]);
  if let Some(value) = expired(SESSION_COOKIE) {
    res.headers_mut().append(header::SET_COOKIE, value);
  }
  Ok(res)
}

// ─── Profile image ───────────────────────────────────────────────────────────

/// `PUT /accounts/profile-image`
pub async fn profile_image<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  headers: HeaderMap,
  image: Bytes,
) -> Result<Response, Error> {
  let identity = viewer.require_login()?;
  let content_type = headers
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok());
  let ext = validate_profile_image(content_type, image.len())?;

  let dir = state.config.media_dir.join("profile_images");
  tokio::fs::create_dir_all(&dir).await.map_err(Error::internal)?;
  let name = format!("{}.{ext}", Uuid::new_v4());
  tokio::fs::write(dir.join(&name), &image)
    .await
    .map_err(Error::internal)?;

  let stored = format!("profile_images/{name}");
  state
    .store
    .set_profile_image(identity.id, Some(stored.clone()))
    .await
    .map_err(Error::from_store)?;

  if let Some(previous) = &identity.profile_image
    && let Err(e) = tokio::fs::remove_file(state.config.media_dir.join(previous)).await
  {
    tracing::warn!(error = %e, path = %previous, "could not remove previous profile image");
  }
  tracing::info!(identity = identity.id, path = %stored, "profile image updated");

  Ok(
    Page::new("Profile")
      .message(Message::success("Profile image updated."))
      .with("profile_image", stored)
      .into_response(),
  )
}
