//! Session-cookie extractor, the gate adapter and password hashing.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use nemis_core::{
  access::{Decision, DenyReason, authorize},
  identity::{Identity, Role},
  scope::OrgScope,
  store::SchoolStore,
};
use rand_core::OsRng;

use crate::{
  AppState,
  error::Error,
  session::{SESSION_COOKIE, digest, read_cookie},
};

/// Who is making the request. Resolving never fails on a missing or stale
/// session; handlers decide with [`Viewer::require`].
#[derive(Debug)]
pub struct Viewer {
  pub identity: Option<Identity>,
  pub scope:    OrgScope,
  /// Digest of the session token, when one resolved.
  pub session:  Option<String>,
  /// Path and query of the request, offered back as `next` on login.
  pub path:     String,
}

impl Viewer {
  fn anonymous(path: String) -> Self {
    Self { identity: None, scope: OrgScope::Empty, session: None, path }
  }

  fn login_required(&self) -> Error { Error::LoginRequired { next: self.path.clone() } }

  /// Run the gate for an operation open to `allowed`.
  pub fn require(&self, allowed: &[Role]) -> Result<&Identity, Error> {
    match authorize(self.identity.as_ref(), allowed) {
      Decision::Allow => self.identity.as_ref().ok_or_else(|| self.login_required()),
      Decision::Deny(DenyReason::Forbidden) => Err(Error::Forbidden),
      Decision::Deny(DenyReason::MustLogin) => Err(self.login_required()),
    }
  }

  /// Any authenticated identity, with or without a role.
  pub fn require_login(&self) -> Result<&Identity, Error> {
    self.identity.as_ref().ok_or_else(|| self.login_required())
  }
}

impl<S> FromRequestParts<AppState<S>> for Viewer
where
  S: SchoolStore + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let path = parts
      .uri
      .path_and_query()
      .map_or("/", |pq| pq.as_str())
      .to_owned();
    let Some(token) = read_cookie(&parts.headers, SESSION_COOKIE) else {
      return Ok(Viewer::anonymous(path));
    };

    let token_hash = digest(&token);
    let identity = state
      .store
      .session_identity(&token_hash, Utc::now())
      .await
      .map_err(Error::from_store)?;
    let Some(identity) = identity else {
      return Ok(Viewer::anonymous(path));
    };

    let linked = match identity.role {
      Some(Role::Teacher | Role::SchoolAdmin) if identity.school_id.is_none() => state
        .store
        .linked_school(identity.id)
        .await
        .map_err(Error::from_store)?,
      _ => None,
    };
    let scope = OrgScope::resolve(&identity, linked);

    Ok(Viewer { identity: Some(identity), scope, session: Some(token_hash), path })
  }
}

// ─── Passwords ───────────────────────────────────────────────────────────────

/// The argon2 PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Internal(format!("argon2 error: {e}").into()))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
}
