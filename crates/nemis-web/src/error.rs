//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use nemis_core::access::DenyReason;
use serde_json::json;
use thiserror::Error;

use crate::page::{Message, redirect_with};

#[derive(Debug, Error)]
pub enum Error {
  /// No session. `next` is the path the viewer asked for.
  #[error("login required")]
  LoginRequired { next: String },
  #[error("forbidden")]
  Forbidden,
  #[error("{field}: {message}")]
  Validation { field: String, message: String },
  #[error("conflict: {0}")]
  Conflict(String),
  #[error("not found: {0}")]
  NotFound(String),
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("service degraded: {0}")]
  Degraded(String),
  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Convert any store error through the core taxonomy.
  pub fn from_store<E: Into<nemis_core::Error>>(e: E) -> Self {
    let core: nemis_core::Error = e.into();
    core.into()
  }

  pub fn validation(field: &str, message: &str) -> Self {
    Error::Validation { field: field.to_owned(), message: message.to_owned() }
  }

  pub fn internal(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Error::Internal(Box::new(e))
  }
}

impl From<nemis_core::Error> for Error {
  fn from(e: nemis_core::Error) -> Self {
    use nemis_core::Error as Core;
    match e {
      Core::AuthenticationRequired => Error::LoginRequired { next: "/".to_owned() },
      Core::AuthorizationDenied => Error::Forbidden,
      Core::ValidationFailed { field, message } => Error::Validation { field, message },
      Core::NotFound { entity, key } => Error::NotFound(format!("{entity} {key} not found")),
      Core::IntegrityConflict(message) => Error::Conflict(message),
      Core::ExternalServiceDegraded(message) => Error::Degraded(message),
      Core::Store(e) => Error::Internal(e),
    }
  }
}

/// 422 with `{errors: {field: [message]}}`, the shape of a rejected form.
fn form_errors(field: &str, message: &str) -> Response {
  let mut errors = serde_json::Map::new();
  errors.insert(field.to_owned(), json!([message]));
  (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "errors": errors }))).into_response()
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::LoginRequired { next } => {
        let next: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
        redirect_with(
          &format!("/accounts/login/?next={next}"),
          &[Message::error(DenyReason::MustLogin.message())],
        )
      }
      Error::Forbidden => redirect_with("/", &[Message::error(DenyReason::Forbidden.message())]),
      Error::Validation { field, message } => form_errors(&field, &message),
      Error::Conflict(message) => form_errors("form", &message),
      Error::NotFound(message) => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
      }
      Error::BadRequest(message) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
      }
      Error::Degraded(message) => {
        tracing::warn!(%message, "collaborator unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": message }))).into_response()
      }
      Error::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": "Internal server error." })),
        )
          .into_response()
      }
    }
  }
}
