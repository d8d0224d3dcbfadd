//! Schools.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result, location::LocationChain};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum SchoolLevel {
  PrePrimary,
  Primary,
  Secondary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
  pub id:            i64,
  pub name:          String,
  /// Unique national school code.
  pub code:          String,
  pub level:         SchoolLevel,
  pub county_id:     i64,
  pub sub_county_id: i64,
  pub ward_id:       i64,
  pub address:       Option<String>,
}

impl School {
  pub fn location(&self) -> LocationChain {
    LocationChain {
      county_id:     self.county_id,
      sub_county_id: self.sub_county_id,
      ward_id:       self.ward_id,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSchool {
  pub name:     String,
  pub code:     String,
  pub level:    SchoolLevel,
  #[serde(flatten)]
  pub location: LocationChain,
  pub address:  Option<String>,
}

impl NewSchool {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::validation("name", "This field is required."));
    }
    if self.name.chars().count() > 100 {
      return Err(Error::validation("name", "Ensure this value has at most 100 characters."));
    }
    let code = self.code.trim();
    if code.is_empty() {
      return Err(Error::validation("code", "This field is required."));
    }
    if code.chars().count() > 20 {
      return Err(Error::validation("code", "Ensure this value has at most 20 characters."));
    }
    Ok(())
  }
}
