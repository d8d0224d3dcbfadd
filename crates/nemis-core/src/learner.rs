//! Learners.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{Error, Result, location::LocationChain, subject::GradeLevel};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
pub enum Grade {
  #[serde(rename = "PP1")]
  #[strum(serialize = "PP1")]
  Pp1,
  #[serde(rename = "PP2")]
  #[strum(serialize = "PP2")]
  Pp2,
  #[serde(rename = "Grade 1")]
  #[strum(serialize = "Grade 1")]
  Grade1,
  #[serde(rename = "Grade 2")]
  #[strum(serialize = "Grade 2")]
  Grade2,
  #[serde(rename = "Grade 3")]
  #[strum(serialize = "Grade 3")]
  Grade3,
  #[serde(rename = "Grade 4")]
  #[strum(serialize = "Grade 4")]
  Grade4,
  #[serde(rename = "Grade 5")]
  #[strum(serialize = "Grade 5")]
  Grade5,
  #[serde(rename = "Grade 6")]
  #[strum(serialize = "Grade 6")]
  Grade6,
  #[serde(rename = "Grade 7")]
  #[strum(serialize = "Grade 7")]
  Grade7,
  #[serde(rename = "Grade 8")]
  #[strum(serialize = "Grade 8")]
  Grade8,
  #[serde(rename = "Grade 9")]
  #[strum(serialize = "Grade 9")]
  Grade9,
  #[serde(rename = "Grade 10")]
  #[strum(serialize = "Grade 10")]
  Grade10,
  #[serde(rename = "Grade 11")]
  #[strum(serialize = "Grade 11")]
  Grade11,
  #[serde(rename = "Grade 12")]
  #[strum(serialize = "Grade 12")]
  Grade12,
}

impl Grade {
  pub fn level(self) -> GradeLevel { GradeLevel::from_grade_label(self.as_ref()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum Gender {
  #[serde(rename = "M")]
  #[strum(serialize = "M")]
  Male,
  #[serde(rename = "F")]
  #[strum(serialize = "F")]
  Female,
  #[serde(rename = "O")]
  #[strum(serialize = "O")]
  Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum Relationship {
  Mother,
  Father,
  Guardian,
  Other,
}

/// A learner record. The birth-certificate number is the primary key.
///
/// `location` is the learner's home location; it is not required to match
/// the school's location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learner {
  pub birth_certificate_number: String,
  pub admission_number:         String,
  pub first_name:               String,
  pub middle_name:              Option<String>,
  pub last_name:                String,
  pub date_of_birth:            Option<NaiveDate>,
  pub gender:                   Gender,
  pub school_id:                i64,
  pub grade:                    Grade,
  pub year:                     i32,
  pub admission_date:           NaiveDate,
  pub class_teacher_id:         Option<i64>,
  pub profile_image:            Option<String>,
  pub parent_full_name:         String,
  pub parent_contact:           String,
  pub relationship:             Relationship,
  #[serde(flatten)]
  pub location:                 LocationChain,
  pub postal_address:           String,
  pub subject_ids:              Vec<i64>,
}

impl Learner {
  pub fn full_name(&self) -> String {
    match &self.middle_name {
      Some(m) if !m.is_empty() => format!("{} {} {}", self.first_name, m, self.last_name),
      _ => format!("{} {}", self.first_name, self.last_name),
    }
  }
}

/// Create/replace input for a learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLearner {
  pub birth_certificate_number: String,
  pub admission_number:         String,
  pub first_name:               String,
  #[serde(default)]
  pub middle_name:              Option<String>,
  pub last_name:                String,
  #[serde(default)]
  pub date_of_birth:            Option<NaiveDate>,
  pub gender:                   Gender,
  pub school_id:                i64,
  pub grade:                    Grade,
  pub year:                     i32,
  /// Defaults to today when absent.
  #[serde(default)]
  pub admission_date:           Option<NaiveDate>,
  #[serde(default)]
  pub class_teacher_id:         Option<i64>,
  pub parent_full_name:         String,
  pub parent_contact:           String,
  pub relationship:             Relationship,
  #[serde(flatten)]
  pub location:                 LocationChain,
  pub postal_address:           String,
  /// Optional subjects; compulsory ones for the grade's phase are added on
  /// creation.
  #[serde(default)]
  pub subject_ids:              Vec<i64>,
}

impl NewLearner {
  pub fn validate(&self) -> Result<()> {
    required("birth_certificate_number", &self.birth_certificate_number, 50)?;
    required("admission_number", &self.admission_number, 20)?;
    required("first_name", &self.first_name, 50)?;
    required("last_name", &self.last_name, 50)?;
    required("parent_full_name", &self.parent_full_name, 100)?;
    required("parent_contact", &self.parent_contact, 15)?;
    required("postal_address", &self.postal_address, 100)?;
    crate::staff::validate_year(self.year)?;
    if let (Some(dob), Some(admitted)) = (self.date_of_birth, self.admission_date)
      && dob > admitted
    {
      return Err(Error::validation("date_of_birth", "Date of birth is after the admission date."));
    }
    Ok(())
  }
}

fn required(field: &str, value: &str, max: usize) -> Result<()> {
  let value = value.trim();
  if value.is_empty() {
    return Err(Error::validation(field, "This field is required."));
  }
  if value.chars().count() > max {
    return Err(Error::validation(
      field,
      format!("Ensure this value has at most {max} characters."),
    ));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn grade_labels_roundtrip_through_strum() {
    for grade in Grade::iter() {
      assert_eq!(Grade::from_str(grade.as_ref()).unwrap(), grade);
    }
    assert_eq!(Grade::Grade10.to_string(), "Grade 10");
  }

  #[test]
  fn grades_map_to_phases() {
    assert_eq!(Grade::Pp2.level(), GradeLevel::PrePrimary);
    assert_eq!(Grade::Grade1.level(), GradeLevel::LowerPrimary);
    assert_eq!(Grade::Grade12.level(), GradeLevel::SeniorSecondary);
  }
}
