//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are fixed-width RFC 3339 UTC strings, dates are `YYYY-MM-DD`,
//! and enums use their `strum` string form.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use nemis_core::{
  identity::Identity,
  learner::Learner,
  location::LocationChain,
  school::School,
  staff::{ClassAssignment, Stream, SubjectAssignment, Teacher},
  subject::Subject,
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(column: &'static str, s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|_| Error::Decode { column, value: s.to_owned() })
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(column: &'static str, s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| Error::Decode { column, value: s.to_owned() })
}

pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::Decode { column, value: s.to_owned() })
}

// ─── Identities ──────────────────────────────────────────────────────────────

pub const IDENTITY_COLUMNS: &str = "i.id, i.username, i.password_hash, i.first_name, i.last_name, \
   i.email, i.role, i.is_active, i.is_superuser, i.profile_image, i.county_id, i.sub_county_id, \
   i.school_id, i.date_joined";

pub struct RawIdentity {
  pub id:            i64,
  pub username:      String,
  pub password_hash: String,
  pub first_name:    String,
  pub last_name:     String,
  pub email:         String,
  pub role:          Option<String>,
  pub is_active:     bool,
  pub is_superuser:  bool,
  pub profile_image: Option<String>,
  pub county_id:     Option<i64>,
  pub sub_county_id: Option<i64>,
  pub school_id:     Option<i64>,
  pub date_joined:   String,
}

impl RawIdentity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      username:      row.get(1)?,
      password_hash: row.get(2)?,
      first_name:    row.get(3)?,
      last_name:     row.get(4)?,
      email:         row.get(5)?,
      role:          row.get(6)?,
      is_active:     row.get(7)?,
      is_superuser:  row.get(8)?,
      profile_image: row.get(9)?,
      county_id:     row.get(10)?,
      sub_county_id: row.get(11)?,
      school_id:     row.get(12)?,
      date_joined:   row.get(13)?,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      id:            self.id,
      username:      self.username,
      password_hash: self.password_hash,
      first_name:    self.first_name,
      last_name:     self.last_name,
      email:         self.email,
      role:          self.role.as_deref().map(|r| decode_enum("role", r)).transpose()?,
      is_active:     self.is_active,
      is_superuser:  self.is_superuser,
      profile_image: self.profile_image,
      county_id:     self.county_id,
      sub_county_id: self.sub_county_id,
      school_id:     self.school_id,
      date_joined:   decode_dt("date_joined", &self.date_joined)?,
    })
  }
}

// ─── Schools ─────────────────────────────────────────────────────────────────

pub const SCHOOL_COLUMNS: &str =
  "s.id, s.name, s.code, s.level, s.county_id, s.sub_county_id, s.ward_id, s.address";

pub struct RawSchool {
  pub id:            i64,
  pub name:          String,
  pub code:          String,
  pub level:         String,
  pub county_id:     i64,
  pub sub_county_id: i64,
  pub ward_id:       i64,
  pub address:       Option<String>,
}

impl RawSchool {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      name:          row.get(1)?,
      code:          row.get(2)?,
      level:         row.get(3)?,
      county_id:     row.get(4)?,
      sub_county_id: row.get(5)?,
      ward_id:       row.get(6)?,
      address:       row.get(7)?,
    })
  }

  pub fn into_school(self) -> Result<School> {
    Ok(School {
      id:            self.id,
      name:          self.name,
      code:          self.code,
      level:         decode_enum("level", &self.level)?,
      county_id:     self.county_id,
      sub_county_id: self.sub_county_id,
      ward_id:       self.ward_id,
      address:       self.address,
    })
  }
}

// ─── Teachers ────────────────────────────────────────────────────────────────

/// Staff profile joined with its identity (`t` and `i`).
pub const TEACHER_COLUMNS: &str = "t.id, t.identity_id, t.school_id, t.role, t.tsc_number, \
   t.phone, t.date_joined, i.profile_image, i.username, i.first_name, i.last_name, i.email";

pub struct RawTeacher {
  pub id:            i64,
  pub identity_id:   i64,
  pub school_id:     i64,
  pub role:          String,
  pub tsc_number:    String,
  pub phone:         Option<String>,
  pub date_joined:   String,
  pub profile_image: Option<String>,
  pub username:      String,
  pub first_name:    String,
  pub last_name:     String,
  pub email:         String,
}

impl RawTeacher {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      identity_id:   row.get(1)?,
      school_id:     row.get(2)?,
      role:          row.get(3)?,
      tsc_number:    row.get(4)?,
      phone:         row.get(5)?,
      date_joined:   row.get(6)?,
      profile_image: row.get(7)?,
      username:      row.get(8)?,
      first_name:    row.get(9)?,
      last_name:     row.get(10)?,
      email:         row.get(11)?,
    })
  }

  pub fn into_teacher(self) -> Result<Teacher> {
    Ok(Teacher {
      id:            self.id,
      identity_id:   self.identity_id,
      school_id:     self.school_id,
      role:          decode_enum("role", &self.role)?,
      tsc_number:    self.tsc_number,
      phone:         self.phone,
      date_joined:   decode_date("date_joined", &self.date_joined)?,
      profile_image: self.profile_image,
      username:      self.username,
      first_name:    self.first_name,
      last_name:     self.last_name,
      email:         self.email,
    })
  }
}

// ─── Streams & assignments ───────────────────────────────────────────────────

pub const STREAM_COLUMNS: &str = "st.id, st.school_id, st.grade, st.name";

pub fn stream_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Stream> {
  Ok(Stream { id: row.get(0)?, school_id: row.get(1)?, grade: row.get(2)?, name: row.get(3)? })
}

pub const CLASS_ASSIGNMENT_COLUMNS: &str =
  "ca.id, ca.teacher_id, ca.stream_id, ca.year, ca.is_class_teacher";

pub fn class_assignment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClassAssignment> {
  Ok(ClassAssignment {
    id:               row.get(0)?,
    teacher_id:       row.get(1)?,
    stream_id:        row.get(2)?,
    year:             row.get(3)?,
    is_class_teacher: row.get(4)?,
  })
}

pub const SUBJECT_ASSIGNMENT_COLUMNS: &str =
  "sa.id, sa.teacher_id, sa.subject_id, sa.stream_id, sa.year";

pub fn subject_assignment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SubjectAssignment> {
  Ok(SubjectAssignment {
    id:         row.get(0)?,
    teacher_id: row.get(1)?,
    subject_id: row.get(2)?,
    stream_id:  row.get(3)?,
    year:       row.get(4)?,
  })
}

// ─── Subjects ────────────────────────────────────────────────────────────────

pub const SUBJECT_COLUMNS: &str =
  "sub.id, sub.name, sub.grade_level, sub.is_compulsory, sub.school_id, sub.created_at, sub.updated_at";

pub struct RawSubject {
  pub id:            i64,
  pub name:          String,
  pub grade_level:   String,
  pub is_compulsory: bool,
  pub school_id:     Option<i64>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawSubject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      name:          row.get(1)?,
      grade_level:   row.get(2)?,
      is_compulsory: row.get(3)?,
      school_id:     row.get(4)?,
      created_at:    row.get(5)?,
      updated_at:    row.get(6)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      id:            self.id,
      name:          self.name,
      grade_level:   decode_enum("grade_level", &self.grade_level)?,
      is_compulsory: self.is_compulsory,
      school_id:     self.school_id,
      created_at:    decode_dt("created_at", &self.created_at)?,
      updated_at:    decode_dt("updated_at", &self.updated_at)?,
    })
  }
}

// ─── Learners ────────────────────────────────────────────────────────────────

pub const LEARNER_COLUMNS: &str = "l.birth_certificate_number, l.admission_number, l.first_name, \
   l.middle_name, l.last_name, l.date_of_birth, l.gender, l.school_id, l.grade, l.year, \
   l.admission_date, l.class_teacher_id, l.profile_image, l.parent_full_name, l.parent_contact, \
   l.relationship, l.county_id, l.sub_county_id, l.ward_id, l.postal_address";

pub struct RawLearner {
  pub birth_certificate_number: String,
  pub admission_number:         String,
  pub first_name:               String,
  pub middle_name:              Option<String>,
  pub last_name:                String,
  pub date_of_birth:            Option<String>,
  pub gender:                   String,
  pub school_id:                i64,
  pub grade:                    String,
  pub year:                     i32,
  pub admission_date:           String,
  pub class_teacher_id:         Option<i64>,
  pub profile_image:            Option<String>,
  pub parent_full_name:         String,
  pub parent_contact:           String,
  pub relationship:             String,
  pub county_id:                i64,
  pub sub_county_id:            i64,
  pub ward_id:                  i64,
  pub postal_address:           String,
  /// Filled by a second query over `learner_subjects`.
  pub subject_ids:              Vec<i64>,
}

impl RawLearner {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      birth_certificate_number: row.get(0)?,
      admission_number:         row.get(1)?,
      first_name:               row.get(2)?,
      middle_name:              row.get(3)?,
      last_name:                row.get(4)?,
      date_of_birth:            row.get(5)?,
      gender:                   row.get(6)?,
      school_id:                row.get(7)?,
      grade:                    row.get(8)?,
      year:                     row.get(9)?,
      admission_date:           row.get(10)?,
      class_teacher_id:         row.get(11)?,
      profile_image:            row.get(12)?,
      parent_full_name:         row.get(13)?,
      parent_contact:           row.get(14)?,
      relationship:             row.get(15)?,
      county_id:                row.get(16)?,
      sub_county_id:            row.get(17)?,
      ward_id:                  row.get(18)?,
      postal_address:           row.get(19)?,
      subject_ids:              Vec::new(),
    })
  }

  pub fn into_learner(self) -> Result<Learner> {
    Ok(Learner {
      birth_certificate_number: self.birth_certificate_number,
      admission_number:         self.admission_number,
      first_name:               self.first_name,
      middle_name:              self.middle_name,
      last_name:                self.last_name,
      date_of_birth:            self
        .date_of_birth
        .as_deref()
        .map(|d| decode_date("date_of_birth", d))
        .transpose()?,
      gender:                   decode_enum("gender", &self.gender)?,
      school_id:                self.school_id,
      grade:                    decode_enum("grade", &self.grade)?,
      year:                     self.year,
      admission_date:           decode_date("admission_date", &self.admission_date)?,
      class_teacher_id:         self.class_teacher_id,
      profile_image:            self.profile_image,
      parent_full_name:         self.parent_full_name,
      parent_contact:           self.parent_contact,
      relationship:             decode_enum("relationship", &self.relationship)?,
      location:                 LocationChain {
        county_id:     self.county_id,
        sub_county_id: self.sub_county_id,
        ward_id:       self.ward_id,
      },
      postal_address:           self.postal_address,
      subject_ids:              self.subject_ids,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_are_fixed_width_and_sortable() {
    let early = DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z").unwrap().with_timezone(&Utc);
    let late = DateTime::parse_from_rfc3339("2025-01-02T03:04:05.5Z").unwrap().with_timezone(&Utc);
    let (a, b) = (encode_dt(early), encode_dt(late));
    assert_eq!(a.len(), b.len());
    assert!(a < b);
    assert_eq!(decode_dt("t", &a).unwrap(), early);
  }

  #[test]
  fn bad_enum_values_name_their_column() {
    let err = decode_enum::<nemis_core::learner::Gender>("gender", "X").unwrap_err();
    assert!(matches!(err, Error::Decode { column: "gender", .. }));
  }
}
