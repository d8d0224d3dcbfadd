//! Identities, the login accounts of the system, and their roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

// ─── Role ────────────────────────────────────────────────────────────────────

/// Position of an identity in the education hierarchy.
///
/// The string form (`cabinet_secretary`, `subcounty_director`, …) is what the
/// store persists and what the JSON API exchanges.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  CabinetSecretary,
  CountyDirector,
  SubcountyDirector,
  SchoolAdmin,
  Teacher,
  Learner,
}

impl Role {
  /// Human-readable label, e.g. "Subcounty Director".
  pub fn label(self) -> &'static str {
    match self {
      Role::CabinetSecretary => "Cabinet Secretary",
      Role::CountyDirector => "County Director",
      Role::SubcountyDirector => "Subcounty Director",
      Role::SchoolAdmin => "School Admin",
      Role::Teacher => "Teacher",
      Role::Learner => "Learner",
    }
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// A persisted login account.
///
/// `county_id`, `sub_county_id` and `school_id` bind directors and school
/// admins to the unit they oversee. Teachers are usually bound through their
/// [`Teacher`](crate::staff::Teacher) profile instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
  pub id:            i64,
  pub username:      String,
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  pub first_name:    String,
  pub last_name:     String,
  pub email:         String,
  pub role:          Option<Role>,
  pub is_active:     bool,
  pub is_superuser:  bool,
  pub profile_image: Option<String>,
  pub county_id:     Option<i64>,
  pub sub_county_id: Option<i64>,
  pub school_id:     Option<i64>,
  pub date_joined:   DateTime<Utc>,
}

impl Identity {
  pub fn full_name(&self) -> String {
    let full = format!("{} {}", self.first_name, self.last_name);
    let full = full.trim();
    if full.is_empty() {
      self.username.clone()
    } else {
      full.to_owned()
    }
  }
}

/// Input for creating an identity. The role is always explicit; there is no
/// implicit default.
#[derive(Debug, Clone, Default)]
pub struct NewIdentity {
  pub username:      String,
  pub password_hash: String,
  pub first_name:    String,
  pub last_name:     String,
  pub email:         String,
  pub role:          Option<Role>,
  pub is_superuser:  bool,
  pub county_id:     Option<i64>,
  pub sub_county_id: Option<i64>,
  pub school_id:     Option<i64>,
}

impl NewIdentity {
  pub fn validate(&self) -> crate::Result<()> {
    let username = self.username.trim();
    if username.is_empty() {
      return Err(crate::Error::validation("username", "This field is required."));
    }
    if username.len() > 150
      || !username.chars().all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
      return Err(crate::Error::validation(
        "username",
        "Enter a valid username of at most 150 letters, digits and @/./+/-/_ characters.",
      ));
    }
    if !self.email.is_empty() && !self.email.contains('@') {
      return Err(crate::Error::validation("email", "Enter a valid email address."));
    }
    Ok(())
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// A login session. Only the digest of the bearer token is persisted.
#[derive(Debug, Clone)]
pub struct Session {
  pub token_hash:  String,
  pub identity_id: i64,
  pub created_at:  DateTime<Utc>,
  pub expires_at:  DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn role_string_forms_match_stored_values() {
    assert_eq!(Role::SubcountyDirector.to_string(), "subcounty_director");
    assert_eq!(Role::from_str("cabinet_secretary").unwrap(), Role::CabinetSecretary);
    assert!(Role::from_str("head_teacher").is_err());
  }

  #[test]
  fn username_rules() {
    let mut input = NewIdentity { username: "jane.doe".into(), ..Default::default() };
    assert!(input.validate().is_ok());
    input.username = "jane doe".into();
    assert!(input.validate().is_err());
    input.username = "  ".into();
    assert!(input.validate().is_err());
  }

  #[test]
  fn full_name_falls_back_to_username() {
    let identity = Identity {
      id:            1,
      username:      "jdoe".into(),
      password_hash: String::new(),
      first_name:    String::new(),
      last_name:     String::new(),
      email:         String::new(),
      role:          None,
      is_active:     true,
      is_superuser:  false,
      profile_image: None,
      county_id:     None,
      sub_county_id: None,
      school_id:     None,
      date_joined:   Utc::now(),
    };
    assert_eq!(identity.full_name(), "jdoe");
  }
}
