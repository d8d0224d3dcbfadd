//! Three-level location reference data: county ⊃ subcounty ⊃ ward.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct County {
  pub id:   i64,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCounty {
  pub id:        i64,
  pub county_id: i64,
  pub name:      String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ward {
  pub id:            i64,
  pub sub_county_id: i64,
  pub name:          String,
}

/// The `{id, name}` pair returned by the cascading-dropdown endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationOption {
  pub id:   i64,
  pub name: String,
}

/// A fully-specified location chain as carried by schools and learners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationChain {
  pub county_id:     i64,
  pub sub_county_id: i64,
  pub ward_id:       i64,
}

/// Addresses one node of the hierarchy, e.g. for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationRef {
  County(i64),
  SubCounty(i64),
  Ward(i64),
}
