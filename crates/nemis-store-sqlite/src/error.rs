//! Error type for `nemis-store-sqlite`.
//!
//! Constraint failures raised by SQLite are classified here so callers see an
//! integrity conflict instead of a raw database error.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] nemis_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  /// A unique or primary-key constraint was violated.
  #[error("{0}")]
  Conflict(String),

  /// A foreign-key constraint refused the write, e.g. deleting a location
  /// that a school still references.
  #[error("{0}")]
  Protected(String),

  #[error("{entity} not found: {key}")]
  NotFound { entity: &'static str, key: String },

  #[error("could not decode column `{column}`: {value:?}")]
  Decode { column: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
    Self::NotFound { entity, key: key.to_string() }
  }

  pub(crate) fn validation(field: &str, message: &str) -> Self {
    Self::Core(nemis_core::Error::validation(field, message))
  }
}

/// Wrap a domain rejection so it can leave a `Connection::call` closure.
pub(crate) fn reject(error: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(error))
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Other(inner) => match inner.downcast::<Error>() {
        Ok(ours) => *ours,
        Err(other) => Error::Database(tokio_rusqlite::Error::Other(other)),
      },
      tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, message))
        if failure.code == ErrorCode::ConstraintViolation =>
      {
        let message = message.unwrap_or_default();
        if message.starts_with("UNIQUE") || message.starts_with("PRIMARY KEY") {
          Error::Conflict(describe_unique(&message))
        } else if message.starts_with("FOREIGN KEY") {
          Error::Protected(
            "The record is still referenced by other records and cannot be changed.".to_owned(),
          )
        } else {
          Error::Conflict(message)
        }
      }
      other => Error::Database(other),
    }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self { tokio_rusqlite::Error::Rusqlite(e).into() }
}

/// Human-readable message for a `UNIQUE constraint failed: <columns>` error.
/// More specific column lists come first.
fn describe_unique(message: &str) -> String {
  const KNOWN: &[(&str, &str)] = &[
    ("identities.username", "A user with that username already exists."),
    ("teachers.tsc_number", "A teacher with that TSC number already exists."),
    ("teachers.identity_id", "That user already has a staff profile."),
    ("schools.code", "A school with that code already exists."),
    ("subjects.name", "A subject with that name already exists."),
    ("streams.school_id, streams.grade, streams.name", "That stream already exists in this school."),
    (
      "class_assignments.teacher_id, class_assignments.stream_id, class_assignments.year",
      "This teacher is already assigned to that stream for the year.",
    ),
    (
      "class_assignments.stream_id, class_assignments.year",
      "This stream already has a class teacher for that year.",
    ),
    (
      "subject_assignments.teacher_id",
      "This teacher already teaches that subject in the stream for the year.",
    ),
    (
      "learners.birth_certificate_number",
      "A learner with that birth certificate number already exists.",
    ),
    ("learners.admission_number", "A learner with that admission number already exists."),
    ("counties.name", "A county with that name already exists."),
  ];
  KNOWN
    .iter()
    .find(|(columns, _)| message.contains(columns))
    .map(|(_, text)| (*text).to_owned())
    .unwrap_or_else(|| message.to_owned())
}

impl From<Error> for nemis_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(inner) => inner,
      Error::Conflict(msg) | Error::Protected(msg) => nemis_core::Error::IntegrityConflict(msg),
      Error::NotFound { entity, key } => nemis_core::Error::NotFound { entity, key },
      other @ (Error::Database(_) | Error::Decode { .. }) => {
        nemis_core::Error::Store(Box::new(other))
      }
    }
  }
}
