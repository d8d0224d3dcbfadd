//! Curriculum subjects and the grade bands (phases) they belong to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result};

/// Curriculum phase. Subjects are offered per phase; grades and streams map
/// onto exactly one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum GradeLevel {
  PrePrimary,
  LowerPrimary,
  UpperPrimary,
  JuniorSecondary,
  SeniorSecondary,
}

impl GradeLevel {
  pub fn label(self) -> &'static str {
    match self {
      GradeLevel::PrePrimary => "Pre-Primary",
      GradeLevel::LowerPrimary => "Lower Primary",
      GradeLevel::UpperPrimary => "Upper Primary",
      GradeLevel::JuniorSecondary => "Junior Secondary",
      GradeLevel::SeniorSecondary => "Senior Secondary",
    }
  }

  /// Phase of a free-form grade label such as `"PP2"`, `"Grade 5"` or `"7"`.
  ///
  /// Labels without a recognisable grade number fall into senior secondary.
  pub fn from_grade_label(grade: &str) -> Self {
    let g = grade.trim().to_ascii_lowercase();
    if g.contains("pp") {
      return GradeLevel::PrePrimary;
    }
    let number: Option<u32> = g
      .split(|c: char| !c.is_ascii_digit())
      .find(|part| !part.is_empty())
      .and_then(|part| part.parse().ok());
    match number {
      Some(1..=3) => GradeLevel::LowerPrimary,
      Some(4..=6) => GradeLevel::UpperPrimary,
      Some(7..=9) => GradeLevel::JuniorSecondary,
      _ => GradeLevel::SeniorSecondary,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
  pub id:            i64,
  pub name:          String,
  pub grade_level:   GradeLevel,
  /// Compulsory subjects are attached to every new learner of the phase.
  pub is_compulsory: bool,
  /// `None` for national curriculum subjects.
  pub school_id:     Option<i64>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubject {
  pub name:          String,
  pub grade_level:   GradeLevel,
  #[serde(default)]
  pub is_compulsory: bool,
  #[serde(default)]
  pub school_id:     Option<i64>,
}

impl NewSubject {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::validation("name", "This field is required."));
    }
    if self.name.chars().count() > 100 {
      return Err(Error::validation("name", "Ensure this value has at most 100 characters."));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn grade_labels_map_to_phases() {
    assert_eq!(GradeLevel::from_grade_label("PP1"), GradeLevel::PrePrimary);
    assert_eq!(GradeLevel::from_grade_label("Grade 3"), GradeLevel::LowerPrimary);
    assert_eq!(GradeLevel::from_grade_label("grade 6"), GradeLevel::UpperPrimary);
    assert_eq!(GradeLevel::from_grade_label("Grade 9"), GradeLevel::JuniorSecondary);
    assert_eq!(GradeLevel::from_grade_label("Grade 10"), GradeLevel::SeniorSecondary);
    assert_eq!(GradeLevel::from_grade_label("Form"), GradeLevel::SeniorSecondary);
  }
}
