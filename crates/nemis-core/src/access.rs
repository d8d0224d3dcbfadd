//! The authorization gate and the role router.
//!
//! Both are pure functions of the identity: no I/O, no shared state. Handlers
//! call [`authorize`] first thing and translate a [`Decision::Deny`] into a
//! redirect; login flows call [`route_home`] to pick a landing page.

use serde::Serialize;

use crate::identity::{Identity, Role};

// ─── Gate ────────────────────────────────────────────────────────────────────

/// Why the gate refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
  /// No authenticated identity; the caller sends the user to the login screen.
  MustLogin,
  /// Authenticated but outside the permitted roles; the caller sends the user
  /// to the global home screen.
  Forbidden,
}

impl DenyReason {
  pub fn as_str(self) -> &'static str {
    match self {
      DenyReason::MustLogin => "must_login",
      DenyReason::Forbidden => "forbidden",
    }
  }

  /// The message queued for display on the page the user is redirected to.
  pub fn message(self) -> &'static str {
    match self {
      DenyReason::MustLogin => "You must be logged in to access this page.",
      DenyReason::Forbidden => "You do not have permission to access this page.",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Allow,
  Deny(DenyReason),
}

impl Decision {
  pub fn is_allowed(self) -> bool { matches!(self, Decision::Allow) }
}

/// Decide whether `identity` may reach an operation guarded by `allowed`.
///
/// A superuser passes regardless of role, including when no role is set.
pub fn authorize(identity: Option<&Identity>, allowed: &[Role]) -> Decision {
  let Some(identity) = identity else {
    return Decision::Deny(DenyReason::MustLogin);
  };
  if identity.is_superuser {
    return Decision::Allow;
  }
  match identity.role {
    Some(role) if allowed.contains(&role) => Decision::Allow,
    _ => Decision::Deny(DenyReason::Forbidden),
  }
}

// ─── Role sets used by the HTTP surface ──────────────────────────────────────

pub const ALL_ROLES: &[Role] = &[
  Role::CabinetSecretary,
  Role::CountyDirector,
  Role::SubcountyDirector,
  Role::SchoolAdmin,
  Role::Teacher,
  Role::Learner,
];

/// Roles that may browse and register schools.
pub const SCHOOL_MANAGERS: &[Role] = &[
  Role::SchoolAdmin,
  Role::SubcountyDirector,
  Role::CountyDirector,
  Role::CabinetSecretary,
];

/// Roles that may browse and edit learners (and see the teacher home).
pub const LEARNER_MANAGERS: &[Role] = &[
  Role::Teacher,
  Role::SchoolAdmin,
  Role::SubcountyDirector,
  Role::CountyDirector,
  Role::CabinetSecretary,
];

/// Roles that manage staff, streams and assignments of a school.
pub const STAFF_MANAGERS: &[Role] = &[Role::SchoolAdmin];

/// Roles that may add subjects (school-local or national).
pub const SUBJECT_MANAGERS: &[Role] = &[Role::SchoolAdmin, Role::CabinetSecretary];

// ─── Role router ─────────────────────────────────────────────────────────────

/// Landing page of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
  CabinetHome,
  CountyHome,
  SubcountyHome,
  SchoolList,
  TeacherHome,
  GlobalHome,
}

impl Destination {
  pub fn path(self) -> &'static str {
    match self {
      Destination::CabinetHome => "/dashboards/cabinet/",
      Destination::CountyHome => "/dashboards/county/",
      Destination::SubcountyHome => "/dashboards/subcounty/",
      Destination::SchoolList => "/schools/",
      Destination::TeacherHome => "/teachers/",
      Destination::GlobalHome => "/",
    }
  }
}

/// Map an identity to its home destination. Learners and identities without
/// a role land on the global home.
pub fn route_home(identity: &Identity) -> Destination {
  match identity.role {
    Some(Role::CabinetSecretary) => Destination::CabinetHome,
    Some(Role::CountyDirector) => Destination::CountyHome,
    Some(Role::SubcountyDirector) => Destination::SubcountyHome,
    Some(Role::SchoolAdmin) => Destination::SchoolList,
    Some(Role::Teacher) => Destination::TeacherHome,
    Some(Role::Learner) | None => Destination::GlobalHome,
  }
}
