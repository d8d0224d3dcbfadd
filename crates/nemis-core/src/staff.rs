//! Teaching staff, streams and the assignments that tie them together.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result, identity::Role, subject::GradeLevel};

// ─── Staff role ──────────────────────────────────────────────────────────────

/// Position of a staff member within a school. Distinct from the identity's
/// [`Role`], which governs access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StaffRole {
  SchoolAdmin,
  HeadTeacher,
  ClassTeacher,
  SubjectTeacher,
  SupportStaff,
}

impl StaffRole {
  /// The access role given to the identity created alongside a staff profile.
  pub fn identity_role(self) -> Role {
    match self {
      StaffRole::SchoolAdmin => Role::SchoolAdmin,
      _ => Role::Teacher,
    }
  }
}

// ─── Teacher ─────────────────────────────────────────────────────────────────

/// A staff profile joined with the account fields of its identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
  pub id:            i64,
  pub identity_id:   i64,
  pub school_id:     i64,
  pub role:          StaffRole,
  pub tsc_number:    String,
  pub phone:         Option<String>,
  pub date_joined:   NaiveDate,
  pub profile_image: Option<String>,
  pub username:      String,
  pub first_name:    String,
  pub last_name:     String,
  pub email:         String,
}

impl Teacher {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name).trim().to_owned()
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTeacher {
  pub school_id:   i64,
  pub role:        StaffRole,
  pub tsc_number:  String,
  pub phone:       Option<String>,
  /// Defaults to today when absent.
  pub date_joined: Option<NaiveDate>,
}

impl NewTeacher {
  pub fn validate(&self) -> Result<()> {
    let tsc = self.tsc_number.trim();
    if tsc.is_empty() {
      return Err(Error::validation("tsc_number", "This field is required."));
    }
    if tsc.chars().count() > 20 {
      return Err(Error::validation("tsc_number", "Ensure this value has at most 20 characters."));
    }
    validate_phone(self.phone.as_deref())
  }
}

/// Editable fields of an existing teacher and its identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeacherUpdate {
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub role:       Option<StaffRole>,
}

impl TeacherUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(email) = &self.email
      && !email.is_empty()
      && !email.contains('@')
    {
      return Err(Error::validation("email", "Enter a valid email address."));
    }
    validate_phone(self.phone.as_deref())
  }
}

fn validate_phone(phone: Option<&str>) -> Result<()> {
  match phone {
    Some(p) if p.chars().count() > 20 => {
      Err(Error::validation("phone", "Ensure this value has at most 20 characters."))
    }
    _ => Ok(()),
  }
}

/// Filters for teacher listings.
#[derive(Debug, Clone, Default)]
pub struct TeacherQuery {
  /// Case-insensitive match over first/last name, email and phone.
  pub text: Option<String>,
}

// ─── Stream ──────────────────────────────────────────────────────────────────

/// A grade-level grouping within a school, e.g. "Grade 5 - A".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stream {
  pub id:        i64,
  pub school_id: i64,
  pub grade:     String,
  pub name:      String,
}

impl Stream {
  pub fn phase(&self) -> GradeLevel { GradeLevel::from_grade_label(&self.grade) }

  pub fn label(&self) -> String { format!("{} - {}", self.grade, self.name) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStream {
  pub school_id: i64,
  pub grade:     String,
  pub name:      String,
}

impl NewStream {
  pub fn validate(&self) -> Result<()> {
    if self.grade.trim().is_empty() {
      return Err(Error::validation("grade", "This field is required."));
    }
    if self.name.trim().is_empty() {
      return Err(Error::validation("name", "This field is required."));
    }
    if self.name.chars().count() > 10 {
      return Err(Error::validation("name", "Ensure this value has at most 10 characters."));
    }
    Ok(())
  }
}

// ─── Assignments ─────────────────────────────────────────────────────────────

/// Places a teacher in a stream for a school year. At most one assignment per
/// `(stream, year)` may carry `is_class_teacher`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassAssignment {
  pub id:               i64,
  pub teacher_id:       i64,
  pub stream_id:        i64,
  pub year:             i32,
  pub is_class_teacher: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClassAssignment {
  pub teacher_id:       i64,
  pub stream_id:        i64,
  pub year:             i32,
  #[serde(default)]
  pub is_class_teacher: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectAssignment {
  pub id:         i64,
  pub teacher_id: i64,
  pub subject_id: i64,
  pub stream_id:  i64,
  pub year:       i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubjectAssignment {
  pub teacher_id: i64,
  pub subject_id: i64,
  pub stream_id:  i64,
  pub year:       i32,
}

pub(crate) fn validate_year(year: i32) -> Result<()> {
  if !(2000..=2100).contains(&year) {
    return Err(Error::validation("year", "Enter a school year between 2000 and 2100."));
  }
  Ok(())
}

impl NewClassAssignment {
  pub fn validate(&self) -> Result<()> { validate_year(self.year) }
}

impl NewSubjectAssignment {
  pub fn validate(&self) -> Result<()> { validate_year(self.year) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn staff_roles_map_to_access_roles() {
    assert_eq!(StaffRole::SchoolAdmin.identity_role(), Role::SchoolAdmin);
    assert_eq!(StaffRole::HeadTeacher.identity_role(), Role::Teacher);
    assert_eq!(StaffRole::SupportStaff.identity_role(), Role::Teacher);
  }

  #[test]
  fn stream_phase_follows_grade() {
    let stream = Stream { id: 1, school_id: 1, grade: "Grade 5".into(), name: "A".into() };
    assert_eq!(stream.phase(), GradeLevel::UpperPrimary);
    assert_eq!(stream.label(), "Grade 5 - A");
  }

  #[test]
  fn assignment_year_is_bounded() {
    let a = NewClassAssignment { teacher_id: 1, stream_id: 1, year: 1999, is_class_teacher: true };
    assert!(a.validate().is_err());
    let a = NewClassAssignment { year: 2025, ..a };
    assert!(a.validate().is_ok());
  }
}
