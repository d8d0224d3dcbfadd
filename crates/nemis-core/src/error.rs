//! Error taxonomy shared by every layer.
//!
//! Each variant is recovered at the request boundary; none of them is fatal
//! to the process.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("authentication required")]
  AuthenticationRequired,

  #[error("permission denied")]
  AuthorizationDenied,

  #[error("{field}: {message}")]
  ValidationFailed { field: String, message: String },

  #[error("{entity} not found: {key}")]
  NotFound { entity: &'static str, key: String },

  #[error("integrity conflict: {0}")]
  IntegrityConflict(String),

  /// A collaborator (e.g. mail delivery) failed; the operation itself stands.
  #[error("external service degraded: {0}")]
  ExternalServiceDegraded(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::ValidationFailed { field: field.into(), message: message.into() }
  }

  pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
    Self::NotFound { entity, key: key.to_string() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
