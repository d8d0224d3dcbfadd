//! Organizational scope: the narrowest unit an identity may see.
//!
//! Scope is resolved once per request from the identity and, for teachers,
//! the school of their staff profile. Every listing and dashboard count is
//! filtered through it; an unresolvable scope admits nothing.

use serde::Serialize;

use crate::identity::{Identity, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OrgScope {
  /// Every row, nationally.
  All,
  County(i64),
  SubCounty(i64),
  School(i64),
  /// Nothing at all.
  Empty,
}

/// Where a row sits in the hierarchy. For teachers and learners this is the
/// placement of their school.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
  pub school_id:     i64,
  pub county_id:     i64,
  pub sub_county_id: i64,
}

impl OrgScope {
  /// Resolve the scope of `identity`. `linked_school` is the school of the
  /// identity's staff profile, if it has one.
  pub fn resolve(identity: &Identity, linked_school: Option<i64>) -> Self {
    if identity.is_superuser {
      return OrgScope::All;
    }
    match identity.role {
      Some(Role::CabinetSecretary) => OrgScope::All,
      Some(Role::CountyDirector) => identity.county_id.map_or(OrgScope::Empty, OrgScope::County),
      Some(Role::SubcountyDirector) => {
        identity.sub_county_id.map_or(OrgScope::Empty, OrgScope::SubCounty)
      }
      Some(Role::SchoolAdmin | Role::Teacher) => identity
        .school_id
        .or(linked_school)
        .map_or(OrgScope::Empty, OrgScope::School),
      Some(Role::Learner) | None => OrgScope::Empty,
    }
  }

  /// Whether a row at `placement` is visible under this scope.
  pub fn admits(&self, placement: &Placement) -> bool {
    match *self {
      OrgScope::All => true,
      OrgScope::County(id) => placement.county_id == id,
      OrgScope::SubCounty(id) => placement.sub_county_id == id,
      OrgScope::School(id) => placement.school_id == id,
      OrgScope::Empty => false,
    }
  }

  /// The school writes are pinned to, for school-level scopes.
  pub fn school(&self) -> Option<i64> {
    match *self {
      OrgScope::School(id) => Some(id),
      _ => None,
    }
  }
}
