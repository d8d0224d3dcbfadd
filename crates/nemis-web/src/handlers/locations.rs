//! Cascading-dropdown endpoints for the location tree.
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | `GET`  | `/locations/subcounties?county_id=` | `{"subcounties":[{id,name}]}` |
//! | `GET`  | `/locations/wards?subcounty_id=` | `{"wards":[{id,name}]}` |
//!
//! A missing or unparsable parameter yields an empty list.

use axum::{
  Json,
  extract::{Query, State},
};
use nemis_core::store::SchoolStore;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, auth::Viewer, error::Error};

fn id_param(raw: Option<&str>) -> Option<i64> { raw.and_then(|v| v.trim().parse().ok()) }

#[derive(Debug, Deserialize)]
pub struct CountyParam {
  pub county_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubCountyParam {
  pub subcounty_id: Option<String>,
}

/// `GET /locations/subcounties`
pub async fn subcounties<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  Query(params): Query<CountyParam>,
) -> Result<Json<Value>, Error> {
  viewer.require_login()?;
  let items = match id_param(params.county_id.as_deref()) {
    Some(id) => state.store.subcounties_of(id).await.map_err(Error::from_store)?,
    None => Vec::new(),
  };
  Ok(Json(json!({ "subcounties": items })))
}

/// `GET /locations/wards`
pub async fn wards<S: SchoolStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: Viewer,
  Query(params): Query<SubCountyParam>,
) -> Result<Json<Value>, Error> {
  viewer.require_login()?;
  let items = match id_param(params.subcounty_id.as_deref()) {
    Some(id) => state.store.wards_of(id).await.map_err(Error::from_store)?,
    None => Vec::new(),
  };
  Ok(Json(json!({ "wards": items })))
}
