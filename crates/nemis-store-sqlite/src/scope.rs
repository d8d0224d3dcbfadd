//! SQL rendering of [`OrgScope`].
//!
//! Every scoped query joins `schools s` and includes [`SCOPE_CLAUSE`], binding
//! the pair from [`scope_params`] as `?1` and `?2`. Query-specific parameters
//! start at `?3`.

use nemis_core::scope::OrgScope;

/// Admits a row of school `s` under the bound scope. `empty` matches no
/// branch, so an empty scope admits nothing.
pub const SCOPE_CLAUSE: &str = "(?1 = 'all'
     OR (?1 = 'county'     AND s.county_id     = ?2)
     OR (?1 = 'sub_county' AND s.sub_county_id = ?2)
     OR (?1 = 'school'     AND s.id            = ?2))";

pub fn scope_params(scope: OrgScope) -> (&'static str, Option<i64>) {
  match scope {
    OrgScope::All => ("all", None),
    OrgScope::County(id) => ("county", Some(id)),
    OrgScope::SubCounty(id) => ("sub_county", Some(id)),
    OrgScope::School(id) => ("school", Some(id)),
    OrgScope::Empty => ("empty", None),
  }
}
