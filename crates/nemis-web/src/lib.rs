//! HTTP surface of NEMIS.
//!
//! Exposes an axum [`Router`] over any [`SchoolStore`]. Pages are JSON
//! contexts (see [`page`]); every route runs the authorization gate and
//! filters rows through the viewer's org scope.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod page;
pub mod session;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post, put},
};
use nemis_core::{store::SchoolStore, validate::MAX_PROFILE_IMAGE_BYTES};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{accounts, home, learners, locations, schools, subjects, teachers};
use mail::Mailer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `NEMIS_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  /// Hosts besides the request's own that `?next=` may point at.
  pub allowed_hosts:     Vec<String>,
  /// Mark the session cookie `Secure` and refuse `http:` redirect targets.
  pub secure_cookies:    bool,
  pub session_ttl_hours: i64,
  pub media_dir:         PathBuf,
  pub mail_from:         String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:              "127.0.0.1".to_owned(),
      port:              8000,
      store_path:        PathBuf::from("nemis.db"),
      allowed_hosts:     Vec::new(),
      secure_cookies:    false,
      session_ttl_hours: 24 * 14,
      media_dir:         PathBuf::from("media"),
      mail_from:         "no-reply@nemis.local".to_owned(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub mailer: Arc<dyn Mailer>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      config: Arc::clone(&self.config),
      mailer: Arc::clone(&self.mailer),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the NEMIS [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SchoolStore + 'static,
{
  Router::new()
    .route("/",                               get(home::global::<S>))
    .route("/dashboards/cabinet/",            get(home::cabinet::<S>))
    .route("/dashboards/county/",             get(home::county::<S>))
    .route("/dashboards/subcounty/",          get(home::subcounty::<S>))
    .route("/dashboards/school-admin/",       get(home::school_admin::<S>))
    .route("/dashboards/teacher/",            get(home::teacher::<S>))
    // Accounts
    .route("/accounts/login/",                get(accounts::login_page::<S>).post(accounts::login::<S>))
    .route("/accounts/logout/",               get(accounts::logout::<S>).post(accounts::logout::<S>))
    .route(
      "/accounts/profile-image",
      put(accounts::profile_image::<S>)
        .layer(DefaultBodyLimit::max(MAX_PROFILE_IMAGE_BYTES + 1024 * 1024)),
    )
    // Schools
    .route("/schools/",                       get(schools::list::<S>).post(schools::create::<S>))
    .route("/schools/{id}",                   get(schools::detail::<S>))
    // Staff
    .route("/teachers/",                      get(home::teacher_home::<S>).post(teachers::create::<S>))
    .route("/teachers/list/",                 get(teachers::list::<S>))
    .route("/teachers/streams/",              get(teachers::streams::<S>).post(teachers::create_stream::<S>))
    .route("/teachers/class-assignments/",    post(teachers::create_class_assignment::<S>))
    .route(
      "/teachers/subject-assignments/",
      get(teachers::subject_assignments::<S>).post(teachers::create_subject_assignment::<S>),
    )
    .route(
      "/teachers/{id}",
      get(teachers::detail::<S>)
        .put(teachers::update::<S>)
        .delete(teachers::delete::<S>),
    )
    // Learners & subjects
    .route("/learners/",                      get(learners::list::<S>).post(learners::create::<S>))
    .route("/learners/{bcn}",                 get(learners::detail::<S>).put(learners::update::<S>))
    .route("/subjects/",                      get(subjects::list::<S>).post(subjects::create::<S>))
    // Cascading dropdowns
    .route("/locations/subcounties",          get(locations::subcounties::<S>))
    .route("/locations/wards",                get(locations::wards::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, Response, StatusCode, header},
  };
  use chrono::{Duration, Utc};
  use nemis_core::{
    identity::{NewIdentity, Role, Session},
    import::LocationRow,
    location::LocationChain,
    school::{NewSchool, SchoolLevel},
    staff::{NewStream, NewTeacher, StaffRole, TeacherQuery},
  };
  use nemis_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use crate::{
    auth::hash_password,
    mail::LogMailer,
    page::{Level, Message, decode, redirect_with},
    session::{digest, new_token},
  };

  struct FailingMailer;

  impl Mailer for FailingMailer {
    fn send(&self, _: &str, _: &str, _: &str) -> nemis_core::Result<()> {
      Err(nemis_core::Error::ExternalServiceDegraded("smtp unreachable".into()))
    }
  }

  async fn make_state_with(mailer: Arc<dyn Mailer>) -> AppState<SqliteStore> {
    AppState {
      store: Arc::new(SqliteStore::open_in_memory().await.unwrap()),
      config: Arc::new(ServerConfig {
        media_dir: std::env::temp_dir().join(format!("nemis-media-{}", uuid::Uuid::new_v4())),
        ..ServerConfig::default()
      }),
      mailer,
    }
  }

  async fn make_state() -> AppState<SqliteStore> {
    make_state_with(Arc::new(LogMailer { from: "no-reply@nemis.local".into() })).await
  }

  /// Create an identity with password `pw`.
  async fn identity(
    state: &AppState<SqliteStore>,
    username: &str,
    role: Option<Role>,
    is_superuser: bool,
    school_id: Option<i64>,
  ) -> i64 {
    state
      .store
      .create_identity(NewIdentity {
        username: username.into(),
        password_hash: hash_password("pw").unwrap(),
        email: format!("{username}@example.com"),
        role,
        is_superuser,
        school_id,
        ..Default::default()
      })
      .await
      .unwrap()
      .id
  }

  /// A `Cookie` header value carrying a fresh session for `identity_id`.
  async fn session_cookie(state: &AppState<SqliteStore>, identity_id: i64) -> String {
    let token = new_token();
    let now = Utc::now();
    state
      .store
      .create_session(Session {
        token_hash: digest(&token),
        identity_id,
        created_at: now,
        expires_at: now + Duration::hours(1),
      })
      .await
      .unwrap();
    format!("nemis_session={token}")
  }

  async fn location(state: &AppState<SqliteStore>) -> LocationChain {
    state
      .store
      .import_locations(vec![
        LocationRow::new("Nairobi", "Westlands", "Parklands"),
        LocationRow::new("Nairobi", "Langata", "Karen"),
        LocationRow::new("Nairobi", "Embakasi", "Utawala"),
      ])
      .await
      .unwrap();
    let county = state.store.list_counties().await.unwrap().remove(0);
    let sub = state.store.subcounties_of(county.id).await.unwrap().remove(0);
    let ward = state.store.wards_of(sub.id).await.unwrap().remove(0);
    LocationChain { county_id: county.id, sub_county_id: sub.id, ward_id: ward.id }
  }

  async fn school(state: &AppState<SqliteStore>, code: &str, location: LocationChain) -> i64 {
    state
      .store
      .create_school(NewSchool {
        name: format!("School {code}"),
        code: code.into(),
        level: SchoolLevel::Primary,
        location,
        address: None,
      })
      .await
      .unwrap()
      .id
  }

  async fn send(
    state: &AppState<SqliteStore>,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    content_type: Option<&str>,
    body: impl Into<Body>,
  ) -> Response<Body> {
    let mut builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::HOST, "app.example.com");
    if let Some(cookie) = cookie {
      builder = builder.header(header::COOKIE, cookie);
    }
    if let Some(content_type) = content_type {
      builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    router(state.clone())
      .oneshot(builder.body(body.into()).unwrap())
      .await
      .unwrap()
  }

  async fn get(state: &AppState<SqliteStore>, uri: &str, cookie: Option<&str>) -> Response<Body> {
    send(state, "GET", uri, cookie, None, Body::empty()).await
  }

  async fn post_json(
    state: &AppState<SqliteStore>,
    uri: &str,
    cookie: &str,
    body: Value,
  ) -> Response<Body> {
    send(state, "POST", uri, Some(cookie), Some("application/json"), body.to_string()).await
  }

  async fn json_body(res: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn location_header(res: &Response<Body>) -> &str {
    res.headers()[header::LOCATION].to_str().unwrap()
  }

  fn set_cookies(res: &Response<Body>) -> Vec<String> {
    res
      .headers()
      .get_all(header::SET_COOKIE)
      .iter()
      .map(|v| v.to_str().unwrap().to_owned())
      .collect()
  }

  /// The messages queued by a redirect.
  fn flashed(res: &Response<Body>) -> Vec<Message> {
    set_cookies(res)
      .iter()
      .find_map(|c| c.strip_prefix("nemis_flash="))
      .and_then(|rest| rest.split(';').next())
      .map(decode)
      .unwrap_or_default()
  }

  // ── Gate ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn unauthenticated_is_sent_to_login_with_next() {
    let state = make_state().await;
    let res = get(&state, "/schools/", None).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_header(&res), "/accounts/login/?next=%2Fschools%2F");
    assert_eq!(
      flashed(&res),
      vec![Message::error("You must be logged in to access this page.")]
    );
  }

  #[tokio::test]
  async fn teacher_is_sent_home_from_schools() {
    let state = make_state().await;
    let id = identity(&state, "tr", Some(Role::Teacher), false, None).await;
    let cookie = session_cookie(&state, id).await;

    let res = get(&state, "/schools/", Some(&cookie)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_header(&res), "/");
    assert_eq!(
      flashed(&res),
      vec![Message::error("You do not have permission to access this page.")]
    );
  }

  #[tokio::test]
  async fn superuser_without_role_passes_every_gate() {
    let state = make_state().await;
    let id = identity(&state, "root", None, true, None).await;
    let cookie = session_cookie(&state, id).await;

    for uri in ["/schools/", "/teachers/list/", "/dashboards/cabinet/", "/learners/"] {
      let res = get(&state, uri, Some(&cookie)).await;
      assert_eq!(res.status(), StatusCode::OK, "{uri}");
    }
  }

  // ── Login & logout ──────────────────────────────────────────────────────────

  async fn login(state: &AppState<SqliteStore>, form: &str) -> Response<Body> {
    send(
      state,
      "POST",
      "/accounts/login/",
      None,
      Some("application/x-www-form-urlencoded"),
      form.to_owned(),
    )
    .await
  }

  #[tokio::test]
  async fn login_routes_by_role_and_sets_session_cookie() {
    let state = make_state().await;
    identity(&state, "cs", Some(Role::CabinetSecretary), false, None).await;

    let res = login(&state, "username=cs&password=pw").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_header(&res), "/dashboards/cabinet/");
    let cookies = set_cookies(&res);
    assert!(cookies.iter().any(|c| c.starts_with("nemis_session=") && c.contains("HttpOnly")));

    let session = cookies[0].split(';').next().unwrap().to_owned();
    let page = get(&state, "/dashboards/cabinet/", Some(&session)).await;
    assert_eq!(page.status(), StatusCode::OK);

    // Revisiting the login screen goes straight home.
    let again = get(&state, "/accounts/login/", Some(&session)).await;
    assert_eq!(location_header(&again), "/dashboards/cabinet/");
  }

  #[tokio::test]
  async fn signed_in_viewer_posting_login_is_sent_home() {
    let state = make_state().await;
    let id = identity(&state, "cs", Some(Role::CabinetSecretary), false, None).await;
    identity(&state, "other", Some(Role::CountyDirector), false, None).await;
    let cookie = session_cookie(&state, id).await;

    let res = send(
      &state,
      "POST",
      "/accounts/login/",
      Some(&cookie),
      Some("application/x-www-form-urlencoded"),
      "username=other&password=pw",
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_header(&res), "/dashboards/cabinet/");
    assert!(set_cookies(&res).is_empty());
  }

  #[tokio::test]
  async fn login_honours_only_safe_next() {
    let state = make_state().await;
    identity(&state, "cs", Some(Role::CabinetSecretary), false, None).await;

    let res = login(&state, "username=cs&password=pw&next=https%3A%2F%2Fevil.example.com%2F").await;
    assert_eq!(location_header(&res), "/dashboards/cabinet/");

    let res = login(&state, "username=cs&password=pw&next=%2Fteachers%2F").await;
    assert_eq!(location_header(&res), "/teachers/");

    let res = login(&state, "username=cs&password=pw&next=https%3A%2F%2Fapp.example.com%2Fschools%2F").await;
    assert_eq!(location_header(&res), "https://app.example.com/schools/");
  }

  #[tokio::test]
  async fn login_refuses_bad_credentials_and_inactive_accounts() {
    let state = make_state().await;
    identity(&state, "cs", Some(Role::CabinetSecretary), false, None).await;

    let res = login(&state, "username=cs&password=nope").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(set_cookies(&res).is_empty());
    let page = json_body(res).await;
    assert_eq!(page["messages"][0]["text"], "Invalid username or password.");

    state.store.set_identity_active("cs", false).await.unwrap();
    let page = json_body(login(&state, "username=cs&password=pw").await).await;
    assert_eq!(page["messages"][0]["text"], "Your account is inactive. Contact admin.");
  }

  #[tokio::test]
  async fn logout_ends_session_and_flashes() {
    let state = make_state().await;
    let id = identity(&state, "cs", Some(Role::CabinetSecretary), false, None).await;
    let cookie = session_cookie(&state, id).await;

    let res = get(&state, "/accounts/logout/", Some(&cookie)).await;
    assert_eq!(location_header(&res), "/accounts/login/");
    assert_eq!(flashed(&res), vec![Message::success("Logged out successfully.")]);

    let after = get(&state, "/", Some(&cookie)).await;
    assert_eq!(after.status(), StatusCode::SEE_OTHER);
  }

  // ── Flash ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn flash_is_shown_once() {
    let state = make_state().await;
    let id = identity(&state, "cs", Some(Role::CabinetSecretary), false, None).await;
    let session = session_cookie(&state, id).await;

    let queued = redirect_with("/", &[Message::success("School registered successfully.")]);
    let flash = set_cookies(&queued)[0].split(';').next().unwrap().to_owned();

    let res = get(&state, "/", Some(&format!("{session}; {flash}"))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(set_cookies(&res).iter().any(|c| c.starts_with("nemis_flash=;") && c.contains("Max-Age=0")));
    let page = json_body(res).await;
    assert_eq!(page["messages"][0]["text"], "School registered successfully.");

    let page = json_body(get(&state, "/", Some(&session)).await).await;
    assert_eq!(page["messages"], json!([]));
  }

  // ── Locations ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn location_dropdowns_are_ordered_by_name() {
    let state = make_state().await;
    let chain = location(&state).await;
    let id = identity(&state, "learner", Some(Role::Learner), false, None).await;
    let cookie = session_cookie(&state, id).await;

    let uri = format!("/locations/subcounties?county_id={}", chain.county_id);
    let body = json_body(get(&state, &uri, Some(&cookie)).await).await;
    let names: Vec<&str> = body["subcounties"]
      .as_array()
      .unwrap()
      .iter()
      .map(|sc| sc["name"].as_str().unwrap())
      .collect();
    assert_eq!(names, ["Embakasi", "Langata", "Westlands"]);

    let uri = format!("/locations/wards?subcounty_id={}", chain.sub_county_id);
    let body = json_body(get(&state, &uri, Some(&cookie)).await).await;
    assert_eq!(body["wards"].as_array().unwrap().len(), 1);

    let body = json_body(get(&state, "/locations/wards", Some(&cookie)).await).await;
    assert_eq!(body, json!({ "wards": [] }));
  }

  #[tokio::test]
  async fn unparsable_location_ids_yield_empty_lists() {
    let state = make_state().await;
    location(&state).await;
    let id = identity(&state, "learner", Some(Role::Learner), false, None).await;
    let cookie = session_cookie(&state, id).await;

    let res = get(&state, "/locations/subcounties?county_id=abc", Some(&cookie)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await, json!({ "subcounties": [] }));

    let res = get(&state, "/locations/wards?subcounty_id=", Some(&cookie)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await, json!({ "wards": [] }));
  }

  // ── Staff ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn teacher_creation_survives_mail_failure() {
    let state = make_state_with(Arc::new(FailingMailer)).await;
    let chain = location(&state).await;
    let x = school(&state, "X", chain).await;
    let admin = identity(&state, "admin", Some(Role::SchoolAdmin), false, Some(x)).await;
    let cookie = session_cookie(&state, admin).await;

    let res = post_json(
      &state,
      "/teachers/",
      &cookie,
      json!({
        "username": "grace",
        "first_name": "Grace",
        "last_name": "Wanjiru",
        "email": "grace@example.com",
        "tsc_number": "TSC-100",
        "role": "class_teacher",
      }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_header(&res), "/teachers/list/");
    let levels: Vec<Level> = flashed(&res).iter().map(|m| m.level).collect();
    assert_eq!(levels, [Level::Warning, Level::Info, Level::Success]);

    let listed = state
      .store
      .list_teachers(nemis_core::scope::OrgScope::School(x), &TeacherQuery::default())
      .await
      .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].school_id, x);
  }

  #[tokio::test]
  async fn undelivered_credentials_are_shown_to_the_admin_once() {
    let state = make_state().await;
    let chain = location(&state).await;
    let x = school(&state, "X", chain).await;
    let admin = identity(&state, "admin", Some(Role::SchoolAdmin), false, Some(x)).await;
    let cookie = session_cookie(&state, admin).await;

    let res = post_json(
      &state,
      "/teachers/",
      &cookie,
      json!({
        "username": "otieno",
        "first_name": "Peter",
        "last_name": "Otieno",
        "email": "otieno@example.com",
        "tsc_number": "TSC-200",
        "role": "subject_teacher",
      }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let messages = flashed(&res);
    assert_eq!(messages.last(), Some(&Message::success("Teacher added successfully.")));
    let shown = messages
      .iter()
      .find(|m| m.level == Level::Info)
      .unwrap();
    let password = shown
      .text
      .strip_prefix("Temporary password for otieno: ")
      .unwrap();

    // The shown password is the one the teacher signs in with.
    let signed_in = login(&state, &format!("username=otieno&password={password}")).await;
    assert_eq!(signed_in.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_header(&signed_in), "/teachers/");
  }

  #[tokio::test]
  async fn second_class_teacher_is_a_form_error() {
    let state = make_state().await;
    let chain = location(&state).await;
    let x = school(&state, "X", chain).await;
    let admin = identity(&state, "admin", Some(Role::SchoolAdmin), false, Some(x)).await;
    let cookie = session_cookie(&state, admin).await;

    let stream = state
      .store
      .create_stream(NewStream { school_id: x, grade: "Grade 5".into(), name: "A".into() })
      .await
      .unwrap();
    let mut teachers = Vec::new();
    for (username, tsc) in [("t1", "TSC1"), ("t2", "TSC2")] {
      let t = state
        .store
        .create_teacher(
          NewIdentity { username: username.into(), password_hash: "x".into(), ..Default::default() },
          NewTeacher {
            school_id:   x,
            role:        StaffRole::ClassTeacher,
            tsc_number:  tsc.into(),
            phone:       None,
            date_joined: None,
          },
        )
        .await
        .unwrap();
      teachers.push(t.id);
    }

    let assign = |teacher_id: i64| {
      json!({ "teacher_id": teacher_id, "stream_id": stream.id, "year": 2025, "is_class_teacher": true })
    };
    let res = post_json(&state, "/teachers/class-assignments/", &cookie, assign(teachers[0])).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let res = post_json(&state, "/teachers/class-assignments/", &cookie, assign(teachers[1])).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(res).await;
    assert!(body["errors"]["form"][0].as_str().is_some());
  }

  // ── Learners ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn school_admin_registers_learners_into_own_school() {
    let state = make_state().await;
    let chain = location(&state).await;
    let x = school(&state, "X", chain).await;
    let y = school(&state, "Y", chain).await;
    let admin = identity(&state, "admin", Some(Role::SchoolAdmin), false, Some(x)).await;
    let cookie = session_cookie(&state, admin).await;

    let res = post_json(
      &state,
      "/learners/",
      &cookie,
      json!({
        "birth_certificate_number": "BC-1",
        "admission_number": "ADM-1",
        "first_name": "Amani",
        "last_name": "Otieno",
        "gender": "F",
        "school_id": y,
        "grade": "Grade 5",
        "year": 2025,
        "parent_full_name": "Mary Otieno",
        "parent_contact": "0700000000",
        "relationship": "Mother",
        "county_id": chain.county_id,
        "sub_county_id": chain.sub_county_id,
        "ward_id": chain.ward_id,
        "postal_address": "P.O. Box 1",
      }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let page = json_body(get(&state, "/learners/BC-1", Some(&cookie)).await).await;
    assert_eq!(page["learner"]["school_id"], x);
  }

  // ── Profile image ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn profile_image_accepts_only_images() {
    let state = make_state().await;
    let id = identity(&state, "cs", Some(Role::CabinetSecretary), false, None).await;
    let cookie = session_cookie(&state, id).await;

    let res = send(
      &state,
      "PUT",
      "/accounts/profile-image",
      Some(&cookie),
      Some("application/pdf"),
      b"%PDF".to_vec(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = send(
      &state,
      "PUT",
      "/accounts/profile-image",
      Some(&cookie),
      Some("image/png"),
      vec![0x89, b'P', b'N', b'G'],
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let page = json_body(res).await;
    let stored = page["profile_image"].as_str().unwrap().to_owned();
    assert!(stored.starts_with("profile_images/") && stored.ends_with(".png"));
    assert!(state.config.media_dir.join(&stored).exists());

    let identity = state.store.get_identity(id).await.unwrap().unwrap();
    assert_eq!(identity.profile_image.as_deref(), Some(stored.as_str()));
    let _ = std::fs::remove_dir_all(&state.config.media_dir);
  }
}
