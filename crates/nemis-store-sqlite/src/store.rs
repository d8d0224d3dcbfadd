//! [`SqliteStore`], the SQLite implementation of [`SchoolStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, params};

use nemis_core::{
  identity::{Identity, NewIdentity, Session},
  import::{ImportSummary, LocationRow},
  learner::{Learner, NewLearner},
  location::{County, LocationChain, LocationOption, LocationRef},
  school::{NewSchool, School},
  scope::OrgScope,
  staff::{
    ClassAssignment, NewClassAssignment, NewStream, NewSubjectAssignment, NewTeacher, Stream,
    SubjectAssignment, Teacher, TeacherQuery, TeacherUpdate,
  },
  store::{SchoolStore, Summary},
  subject::{NewSubject, Subject},
};

use crate::{
  Error, Result,
  encode::{
    CLASS_ASSIGNMENT_COLUMNS, IDENTITY_COLUMNS, LEARNER_COLUMNS, RawIdentity, RawLearner,
    RawSchool, RawSubject, RawTeacher, SCHOOL_COLUMNS, STREAM_COLUMNS, SUBJECT_ASSIGNMENT_COLUMNS,
    SUBJECT_COLUMNS, TEACHER_COLUMNS, class_assignment_from_row, encode_date, encode_dt,
    stream_from_row, subject_assignment_from_row,
  },
  error::reject,
  schema::SCHEMA,
  scope::{SCOPE_CLAUSE, scope_params},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A NEMIS store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection handle is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Closure helpers ─────────────────────────────────────────────────────────
//
// These run on the connection thread, inside `Connection::call`. Domain
// rejections leave through `reject`.

fn insert_identity(
  conn: &rusqlite::Connection,
  input: &NewIdentity,
  now: &str,
) -> tokio_rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO identities (
       username, password_hash, first_name, last_name, email, role,
       is_superuser, county_id, sub_county_id, school_id, date_joined
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    params![
      input.username.trim(),
      input.password_hash,
      input.first_name.trim(),
      input.last_name.trim(),
      input.email.trim(),
      input.role.map(|r| r.to_string()),
      input.is_superuser,
      input.county_id,
      input.sub_county_id,
      input.school_id,
      now,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

/// The ward must lie in the subcounty, and the subcounty in the county.
fn check_chain(conn: &rusqlite::Connection, chain: LocationChain) -> tokio_rusqlite::Result<()> {
  let consistent = conn
    .query_row(
      "SELECT 1 FROM wards w
       JOIN sub_counties sc ON sc.id = w.sub_county_id
       WHERE w.id = ?1 AND sc.id = ?2 AND sc.county_id = ?3",
      params![chain.ward_id, chain.sub_county_id, chain.county_id],
      |_| Ok(()),
    )
    .optional()?
    .is_some();
  if !consistent {
    return Err(reject(Error::validation(
      "ward_id",
      "Select a ward within the chosen subcounty and county.",
    )));
  }
  Ok(())
}

fn school_exists(conn: &rusqlite::Connection, school_id: i64) -> tokio_rusqlite::Result<()> {
  let found = conn
    .query_row("SELECT 1 FROM schools WHERE id = ?1", params![school_id], |_| Ok(()))
    .optional()?
    .is_some();
  if !found {
    return Err(reject(Error::validation("school_id", "Select a valid school.")));
  }
  Ok(())
}

fn teacher_school(conn: &rusqlite::Connection, teacher_id: i64) -> tokio_rusqlite::Result<i64> {
  conn
    .query_row("SELECT school_id FROM teachers WHERE id = ?1", params![teacher_id], |r| r.get(0))
    .optional()?
    .ok_or_else(|| reject(Error::validation("teacher_id", "Select a valid teacher.")))
}

fn stream_school(conn: &rusqlite::Connection, stream_id: i64) -> tokio_rusqlite::Result<i64> {
  conn
    .query_row("SELECT school_id FROM streams WHERE id = ?1", params![stream_id], |r| r.get(0))
    .optional()?
    .ok_or_else(|| reject(Error::validation("stream_id", "Select a valid stream.")))
}

/// Whether subject `subject_id` may be used at `school_id`: national subjects
/// are usable everywhere, school subjects only at their own school.
fn subject_usable_at(
  conn: &rusqlite::Connection,
  subject_id: i64,
  school_id: i64,
) -> tokio_rusqlite::Result<bool> {
  let owner: Option<Option<i64>> = conn
    .query_row("SELECT school_id FROM subjects WHERE id = ?1", params![subject_id], |r| r.get(0))
    .optional()?;
  Ok(match owner {
    None => false,
    Some(None) => true,
    Some(Some(owner)) => owner == school_id,
  })
}

/// Shared reference checks for learner creation and replacement.
fn check_learner_refs(conn: &rusqlite::Connection, input: &NewLearner) -> tokio_rusqlite::Result<()> {
  school_exists(conn, input.school_id)?;
  check_chain(conn, input.location)?;
  if let Some(teacher_id) = input.class_teacher_id
    && teacher_school(conn, teacher_id)? != input.school_id
  {
    return Err(reject(Error::validation(
      "class_teacher_id",
      "Select a teacher of the learner's school.",
    )));
  }
  for &subject_id in &input.subject_ids {
    if !subject_usable_at(conn, subject_id, input.school_id)? {
      return Err(reject(Error::validation("subject_ids", "Select valid subjects.")));
    }
  }
  Ok(())
}

/// Replace the learner's subject set with the compulsory subjects of its
/// phase plus the requested ones.
fn attach_subjects(
  conn: &rusqlite::Connection,
  key: &str,
  input: &NewLearner,
) -> tokio_rusqlite::Result<()> {
  conn.execute("DELETE FROM learner_subjects WHERE learner_bcn = ?1", params![key])?;
  conn.execute(
    "INSERT OR IGNORE INTO learner_subjects (learner_bcn, subject_id)
     SELECT ?1, id FROM subjects
     WHERE is_compulsory = 1
       AND grade_level = ?2
       AND (school_id IS NULL OR school_id = ?3)",
    params![key, input.grade.level().to_string(), input.school_id],
  )?;
  let mut stmt = conn
    .prepare("INSERT OR IGNORE INTO learner_subjects (learner_bcn, subject_id) VALUES (?1, ?2)")?;
  for subject_id in &input.subject_ids {
    stmt.execute(params![key, subject_id])?;
  }
  Ok(())
}

fn load_subject_ids(
  conn: &rusqlite::Connection,
  learners: &mut [RawLearner],
) -> rusqlite::Result<()> {
  let mut stmt = conn.prepare(
    "SELECT subject_id FROM learner_subjects WHERE learner_bcn = ?1 ORDER BY subject_id",
  )?;
  for learner in learners.iter_mut() {
    learner.subject_ids = stmt
      .query_map(params![learner.birth_certificate_number], |r| r.get(0))?
      .collect::<rusqlite::Result<Vec<i64>>>()?;
  }
  Ok(())
}

/// Insert `name` (with its parent columns) if absent; return the row id and
/// whether it was created.
fn get_or_create(
  conn: &rusqlite::Connection,
  insert: &str,
  select: &str,
  params: &[&dyn rusqlite::ToSql],
) -> rusqlite::Result<(i64, bool)> {
  let created = conn.execute(insert, params)? == 1;
  let id = conn.query_row(select, params, |r| r.get(0))?;
  Ok((id, created))
}

fn trimmed(value: Option<&str>) -> Option<&str> { value.map(str::trim).filter(|v| !v.is_empty()) }

// ─── SchoolStore impl ────────────────────────────────────────────────────────

impl SchoolStore for SqliteStore {
  type Error = Error;

  // ── Identities & sessions ─────────────────────────────────────────────────

  async fn create_identity(&self, input: NewIdentity) -> Result<Identity> {
    input.validate()?;
    let now = encode_dt(Utc::now());

    let id = self
      .conn
      .call(move |conn| insert_identity(conn, &input, &now))
      .await?;

    tracing::info!(identity_id = id, "identity created");
    self.get_identity(id).await?.ok_or_else(|| Error::not_found("identity", id))
  }

  async fn get_identity(&self, id: i64) -> Result<Option<Identity>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {IDENTITY_COLUMNS} FROM identities i WHERE i.id = ?1"),
              params![id],
              RawIdentity::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn find_identity_by_username(&self, username: &str) -> Result<Option<Identity>> {
    let username = username.trim().to_owned();

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {IDENTITY_COLUMNS} FROM identities i WHERE i.username = ?1"),
              params![username],
              RawIdentity::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn set_profile_image(&self, identity_id: i64, path: Option<String>) -> Result<()> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE identities SET profile_image = ?2 WHERE id = ?1",
          params![identity_id, path],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::not_found("identity", identity_id));
    }
    Ok(())
  }

  async fn set_identity_active(&self, username: &str, active: bool) -> Result<()> {
    let key = username.to_owned();
    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE identities SET is_active = ?2 WHERE username = ?1",
          params![key, active],
        )?;
        if !active {
          tx.execute(
            "DELETE FROM sessions
             WHERE identity_id = (SELECT id FROM identities WHERE username = ?1)",
            params![key],
          )?;
        }
        tx.commit()?;
        Ok(changed)
      })
      .await?;

    if changed == 0 {
      return Err(Error::not_found("identity", username));
    }
    tracing::info!(%username, active, "identity activation changed");
    Ok(())
  }

  async fn linked_school(&self, identity_id: i64) -> Result<Option<i64>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT school_id FROM teachers WHERE identity_id = ?1",
                params![identity_id],
                |r| r.get(0),
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn create_session(&self, session: Session) -> Result<()> {
    let created = encode_dt(session.created_at);
    let expires = encode_dt(session.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, identity_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![session.token_hash, session.identity_id, created, expires],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn session_identity(
    &self,
    token_hash: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<Identity>> {
    let token_hash = token_hash.to_owned();
    let now = encode_dt(now);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {IDENTITY_COLUMNS}
                 FROM sessions se
                 JOIN identities i ON i.id = se.identity_id
                 WHERE se.token_hash = ?1
                   AND se.expires_at > ?2
                   AND i.is_active = 1"
              ),
              params![token_hash, now],
              RawIdentity::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn delete_session(&self, token_hash: &str) -> Result<()> {
    let token_hash = token_hash.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM sessions WHERE token_hash = ?1", params![token_hash])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Locations ─────────────────────────────────────────────────────────────

  async fn list_counties(&self) -> Result<Vec<County>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare("SELECT id, name FROM counties ORDER BY name")?;
          let rows = stmt
            .query_map([], |r| Ok(County { id: r.get(0)?, name: r.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn subcounties_of(&self, county_id: i64) -> Result<Vec<LocationOption>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt =
            conn.prepare("SELECT id, name FROM sub_counties WHERE county_id = ?1 ORDER BY name")?;
          let rows = stmt
            .query_map(params![county_id], |r| Ok(LocationOption { id: r.get(0)?, name: r.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn wards_of(&self, sub_county_id: i64) -> Result<Vec<LocationOption>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt =
            conn.prepare("SELECT id, name FROM wards WHERE sub_county_id = ?1 ORDER BY name")?;
          let rows = stmt
            .query_map(params![sub_county_id], |r| {
              Ok(LocationOption { id: r.get(0)?, name: r.get(1)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn import_locations(&self, rows: Vec<LocationRow>) -> Result<ImportSummary> {
    let summary = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut summary = ImportSummary::default();

        for row in &rows {
          if row.county.is_empty() {
            summary.skipped += 1;
            continue;
          }
          summary.rows += 1;

          let (county_id, created) = get_or_create(
            &tx,
            "INSERT OR IGNORE INTO counties (name) VALUES (?1)",
            "SELECT id FROM counties WHERE name = ?1",
            params![row.county],
          )?;
          summary.counties_created += usize::from(created);

          if row.sub_county.is_empty() {
            continue;
          }
          let (sub_county_id, created) = get_or_create(
            &tx,
            "INSERT OR IGNORE INTO sub_counties (county_id, name) VALUES (?1, ?2)",
            "SELECT id FROM sub_counties WHERE county_id = ?1 AND name = ?2",
            params![county_id, row.sub_county],
          )?;
          summary.sub_counties_created += usize::from(created);

          if row.ward.is_empty() {
            continue;
          }
          let (_, created) = get_or_create(
            &tx,
            "INSERT OR IGNORE INTO wards (sub_county_id, name) VALUES (?1, ?2)",
            "SELECT id FROM wards WHERE sub_county_id = ?1 AND name = ?2",
            params![sub_county_id, row.ward],
          )?;
          summary.wards_created += usize::from(created);
        }

        tx.commit()?;
        Ok(summary)
      })
      .await?;

    tracing::info!(
      rows = summary.rows,
      skipped = summary.skipped,
      counties = summary.counties_created,
      sub_counties = summary.sub_counties_created,
      wards = summary.wards_created,
      "location import applied"
    );
    Ok(summary)
  }

  async fn delete_location(&self, location: LocationRef) -> Result<()> {
    let (sql, entity, id) = match location {
      LocationRef::County(id) => ("DELETE FROM counties WHERE id = ?1", "county", id),
      LocationRef::SubCounty(id) => ("DELETE FROM sub_counties WHERE id = ?1", "subcounty", id),
      LocationRef::Ward(id) => ("DELETE FROM wards WHERE id = ?1", "ward", id),
    };

    let deleted = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, params![id])?))
      .await
      .map_err(Error::from)
      .map_err(|e| match e {
        Error::Protected(_) => Error::Protected(format!(
          "The {entity} is referenced by schools or learners and cannot be deleted."
        )),
        other => other,
      })?;

    if deleted == 0 {
      return Err(Error::not_found(entity, id));
    }
    tracing::info!(entity, id, "location deleted");
    Ok(())
  }

  // ── Schools ───────────────────────────────────────────────────────────────

  async fn create_school(&self, input: NewSchool) -> Result<School> {
    input.validate()?;

    let id = self
      .conn
      .call(move |conn| {
        check_chain(conn, input.location)?;
        conn.execute(
          "INSERT INTO schools (name, code, level, county_id, sub_county_id, ward_id, address)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![
            input.name.trim(),
            input.code.trim(),
            input.level.to_string(),
            input.location.county_id,
            input.location.sub_county_id,
            input.location.ward_id,
            trimmed(input.address.as_deref()),
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    tracing::info!(school_id = id, "school created");
    self.get_school(id, OrgScope::All).await?.ok_or_else(|| Error::not_found("school", id))
  }

  async fn get_school(&self, id: i64, scope: OrgScope) -> Result<Option<School>> {
    let (kind, scope_id) = scope_params(scope);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SCHOOL_COLUMNS} FROM schools s WHERE {SCOPE_CLAUSE} AND s.id = ?3"),
              params![kind, scope_id, id],
              RawSchool::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSchool::into_school).transpose()
  }

  async fn list_schools(&self, scope: OrgScope) -> Result<Vec<School>> {
    let (kind, scope_id) = scope_params(scope);

    let raws: Vec<RawSchool> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SCHOOL_COLUMNS} FROM schools s WHERE {SCOPE_CLAUSE} ORDER BY s.name, s.id"
        ))?;
        let rows = stmt
          .query_map(params![kind, scope_id], RawSchool::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSchool::into_school).collect()
  }

  // ── Teachers ──────────────────────────────────────────────────────────────

  /// The identity's role and school binding are taken from the staff profile.
  async fn create_teacher(&self, mut identity: NewIdentity, teacher: NewTeacher) -> Result<Teacher> {
    identity.role = Some(teacher.role.identity_role());
    identity.school_id = Some(teacher.school_id);
    identity.validate()?;
    teacher.validate()?;

    let now = Utc::now();
    let joined = encode_date(teacher.date_joined.unwrap_or_else(|| now.date_naive()));
    let now = encode_dt(now);

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        school_exists(&tx, teacher.school_id)?;
        let identity_id = insert_identity(&tx, &identity, &now)?;
        tx.execute(
          "INSERT INTO teachers (identity_id, school_id, role, tsc_number, phone, date_joined)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![
            identity_id,
            teacher.school_id,
            teacher.role.to_string(),
            teacher.tsc_number.trim(),
            trimmed(teacher.phone.as_deref()),
            joined,
          ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
      })
      .await?;

    tracing::info!(teacher_id = id, "teacher created");
    self.get_teacher(id, OrgScope::All).await?.ok_or_else(|| Error::not_found("teacher", id))
  }

  async fn get_teacher(&self, id: i64, scope: OrgScope) -> Result<Option<Teacher>> {
    let (kind, scope_id) = scope_params(scope);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {TEACHER_COLUMNS}
                 FROM teachers t
                 JOIN identities i ON i.id = t.identity_id
                 JOIN schools    s ON s.id = t.school_id
                 WHERE {SCOPE_CLAUSE} AND t.id = ?3"
              ),
              params![kind, scope_id, id],
              RawTeacher::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTeacher::into_teacher).transpose()
  }

  async fn teacher_for_identity(&self, identity_id: i64) -> Result<Option<Teacher>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {TEACHER_COLUMNS}
                 FROM teachers t
                 JOIN identities i ON i.id = t.identity_id
                 WHERE t.identity_id = ?1"
              ),
              params![identity_id],
              RawTeacher::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTeacher::into_teacher).transpose()
  }

  async fn list_teachers(&self, scope: OrgScope, query: &TeacherQuery) -> Result<Vec<Teacher>> {
    let (kind, scope_id) = scope_params(scope);
    let pattern = trimmed(query.text.as_deref()).map(|t| format!("%{t}%"));

    let raws: Vec<RawTeacher> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TEACHER_COLUMNS}
           FROM teachers t
           JOIN identities i ON i.id = t.identity_id
           JOIN schools    s ON s.id = t.school_id
           WHERE {SCOPE_CLAUSE}
             AND (?3 IS NULL
                  OR i.first_name LIKE ?3
                  OR i.last_name  LIKE ?3
                  OR i.email      LIKE ?3
                  OR t.phone      LIKE ?3)
           ORDER BY i.last_name, i.first_name, t.id"
        ))?;
        let rows = stmt
          .query_map(params![kind, scope_id, pattern], RawTeacher::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTeacher::into_teacher).collect()
  }

  async fn update_teacher(&self, id: i64, update: TeacherUpdate) -> Result<Teacher> {
    update.validate()?;
    let staff_role = update.role.map(|r| r.to_string());
    let identity_role = update.role.map(|r| r.identity_role().to_string());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let identity_id: i64 = tx
          .query_row("SELECT identity_id FROM teachers WHERE id = ?1", params![id], |r| r.get(0))
          .optional()?
          .ok_or_else(|| reject(Error::not_found("teacher", id)))?;

        tx.execute(
          "UPDATE identities SET
             first_name = COALESCE(?2, first_name),
             last_name  = COALESCE(?3, last_name),
             email      = COALESCE(?4, email),
             role       = COALESCE(?5, role)
           WHERE id = ?1",
          params![
            identity_id,
            update.first_name.as_deref().map(str::trim),
            update.last_name.as_deref().map(str::trim),
            update.email.as_deref().map(str::trim),
            identity_role,
          ],
        )?;
        tx.execute(
          "UPDATE teachers SET
             phone = COALESCE(?2, phone),
             role  = COALESCE(?3, role)
           WHERE id = ?1",
          params![id, update.phone.as_deref().map(str::trim), staff_role],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::info!(teacher_id = id, "teacher updated");
    self.get_teacher(id, OrgScope::All).await?.ok_or_else(|| Error::not_found("teacher", id))
  }

  async fn delete_teacher(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let identity_id: i64 = tx
          .query_row("SELECT identity_id FROM teachers WHERE id = ?1", params![id], |r| r.get(0))
          .optional()?
          .ok_or_else(|| reject(Error::not_found("teacher", id)))?;
        tx.execute("DELETE FROM teachers WHERE id = ?1", params![id])?;
        tx.execute("DELETE FROM identities WHERE id = ?1", params![identity_id])?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::info!(teacher_id = id, "teacher deleted with its identity");
    Ok(())
  }

  // ── Streams & assignments ─────────────────────────────────────────────────

  async fn create_stream(&self, input: NewStream) -> Result<Stream> {
    input.validate()?;
    let grade = input.grade.trim().to_owned();
    let name = input.name.trim().to_owned();
    let school_id = input.school_id;

    let (g, n) = (grade.clone(), name.clone());
    let id = self
      .conn
      .call(move |conn| {
        school_exists(conn, school_id)?;
        conn.execute(
          "INSERT INTO streams (school_id, grade, name) VALUES (?1, ?2, ?3)",
          params![school_id, g, n],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Stream { id, school_id, grade, name })
  }

  async fn list_streams(&self, scope: OrgScope) -> Result<Vec<Stream>> {
    let (kind, scope_id) = scope_params(scope);

    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {STREAM_COLUMNS}
             FROM streams st
             JOIN schools s ON s.id = st.school_id
             WHERE {SCOPE_CLAUSE}
             ORDER BY st.grade, st.name"
          ))?;
          let rows = stmt
            .query_map(params![kind, scope_id], stream_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn create_class_assignment(&self, input: NewClassAssignment) -> Result<ClassAssignment> {
    input.validate()?;
    let NewClassAssignment { teacher_id, stream_id, year, is_class_teacher } = input;

    let id = self
      .conn
      .call(move |conn| {
        if teacher_school(conn, teacher_id)? != stream_school(conn, stream_id)? {
          return Err(reject(Error::validation(
            "stream_id",
            "The stream belongs to a different school than the teacher.",
          )));
        }
        conn.execute(
          "INSERT INTO class_assignments (teacher_id, stream_id, year, is_class_teacher)
           VALUES (?1, ?2, ?3, ?4)",
          params![teacher_id, stream_id, year, is_class_teacher],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    tracing::info!(assignment_id = id, teacher_id, stream_id, year, "class assignment created");
    Ok(ClassAssignment { id, teacher_id, stream_id, year, is_class_teacher })
  }

  async fn class_assignments_for(&self, teacher_id: i64) -> Result<Vec<ClassAssignment>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {CLASS_ASSIGNMENT_COLUMNS} FROM class_assignments ca
             WHERE ca.teacher_id = ?1
             ORDER BY ca.year DESC, ca.id"
          ))?;
          let rows = stmt
            .query_map(params![teacher_id], class_assignment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn create_subject_assignment(
    &self,
    input: NewSubjectAssignment,
  ) -> Result<SubjectAssignment> {
    input.validate()?;
    let NewSubjectAssignment { teacher_id, subject_id, stream_id, year } = input;

    let id = self
      .conn
      .call(move |conn| {
        let school_id = teacher_school(conn, teacher_id)?;
        if stream_school(conn, stream_id)? != school_id {
          return Err(reject(Error::validation(
            "stream_id",
            "The stream belongs to a different school than the teacher.",
          )));
        }
        if !subject_usable_at(conn, subject_id, school_id)? {
          return Err(reject(Error::validation(
            "subject_id",
            "Select a national subject or one of the teacher's school.",
          )));
        }
        conn.execute(
          "INSERT INTO subject_assignments (teacher_id, subject_id, stream_id, year)
           VALUES (?1, ?2, ?3, ?4)",
          params![teacher_id, subject_id, stream_id, year],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    tracing::info!(assignment_id = id, teacher_id, subject_id, stream_id, year, "subject assignment created");
    Ok(SubjectAssignment { id, teacher_id, subject_id, stream_id, year })
  }

  async fn subject_assignments_for(&self, teacher_id: i64) -> Result<Vec<SubjectAssignment>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {SUBJECT_ASSIGNMENT_COLUMNS} FROM subject_assignments sa
             WHERE sa.teacher_id = ?1
             ORDER BY sa.year DESC, sa.id"
          ))?;
          let rows = stmt
            .query_map(params![teacher_id], subject_assignment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn list_subject_assignments(&self, scope: OrgScope) -> Result<Vec<SubjectAssignment>> {
    let (kind, scope_id) = scope_params(scope);

    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {SUBJECT_ASSIGNMENT_COLUMNS}
             FROM subject_assignments sa
             JOIN teachers t ON t.id = sa.teacher_id
             JOIN schools  s ON s.id = t.school_id
             WHERE {SCOPE_CLAUSE}
             ORDER BY sa.year DESC, sa.id"
          ))?;
          let rows = stmt
            .query_map(params![kind, scope_id], subject_assignment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn create_subject(&self, input: NewSubject) -> Result<Subject> {
    input.validate()?;
    let now = Utc::now();
    let stamp = encode_dt(now);
    let name = input.name.trim().to_owned();
    let level = input.grade_level.to_string();
    let (school_id, is_compulsory) = (input.school_id, input.is_compulsory);

    let n = name.clone();
    let id = self
      .conn
      .call(move |conn| {
        if let Some(school_id) = school_id {
          school_exists(conn, school_id)?;
        }
        conn.execute(
          "INSERT INTO subjects (name, grade_level, is_compulsory, school_id, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          params![n, level, is_compulsory, school_id, stamp],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    tracing::info!(subject_id = id, national = school_id.is_none(), "subject created");
    Ok(Subject {
      id,
      name,
      grade_level: input.grade_level,
      is_compulsory,
      school_id,
      created_at: now,
      updated_at: now,
    })
  }

  async fn list_subjects(&self, scope: OrgScope) -> Result<Vec<Subject>> {
    let (kind, scope_id) = scope_params(scope);

    let raws: Vec<RawSubject> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBJECT_COLUMNS}
           FROM subjects sub
           WHERE sub.school_id IS NULL
              OR sub.school_id IN (SELECT s.id FROM schools s WHERE {SCOPE_CLAUSE})
           ORDER BY sub.name"
        ))?;
        let rows = stmt
          .query_map(params![kind, scope_id], RawSubject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  // ── Learners ──────────────────────────────────────────────────────────────

  async fn create_learner(&self, input: NewLearner) -> Result<Learner> {
    input.validate()?;
    let key = input.birth_certificate_number.trim().to_owned();
    let admitted = encode_date(input.admission_date.unwrap_or_else(|| Utc::now().date_naive()));

    let bcn = key.clone();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        check_learner_refs(&tx, &input)?;
        tx.execute(
          "INSERT INTO learners (
             birth_certificate_number, admission_number, first_name, middle_name, last_name,
             date_of_birth, gender, school_id, grade, year, admission_date, class_teacher_id,
             parent_full_name, parent_contact, relationship,
             county_id, sub_county_id, ward_id, postal_address
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
          params![
            bcn,
            input.admission_number.trim(),
            input.first_name.trim(),
            trimmed(input.middle_name.as_deref()),
            input.last_name.trim(),
            input.date_of_birth.map(encode_date),
            input.gender.to_string(),
            input.school_id,
            input.grade.to_string(),
            input.year,
            admitted,
            input.class_teacher_id,
            input.parent_full_name.trim(),
            input.parent_contact.trim(),
            input.relationship.to_string(),
            input.location.county_id,
            input.location.sub_county_id,
            input.location.ward_id,
            input.postal_address.trim(),
          ],
        )?;
        attach_subjects(&tx, &bcn, &input)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::info!(learner = %key, "learner created");
    self
      .get_learner(&key, OrgScope::All)
      .await?
      .ok_or_else(|| Error::not_found("learner", key))
  }

  async fn get_learner(
    &self,
    birth_certificate_number: &str,
    scope: OrgScope,
  ) -> Result<Option<Learner>> {
    let (kind, scope_id) = scope_params(scope);
    let key = birth_certificate_number.trim().to_owned();

    let raw = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!(
              "SELECT {LEARNER_COLUMNS}
               FROM learners l
               JOIN schools s ON s.id = l.school_id
               WHERE {SCOPE_CLAUSE} AND l.birth_certificate_number = ?3"
            ),
            params![kind, scope_id, key],
            RawLearner::from_row,
          )
          .optional()?;
        let Some(raw) = raw else { return Ok(None) };
        let mut found = [raw];
        load_subject_ids(conn, &mut found)?;
        let [raw] = found;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawLearner::into_learner).transpose()
  }

  async fn list_learners(&self, scope: OrgScope) -> Result<Vec<Learner>> {
    let (kind, scope_id) = scope_params(scope);

    let raws: Vec<RawLearner> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {LEARNER_COLUMNS}
           FROM learners l
           JOIN schools s ON s.id = l.school_id
           WHERE {SCOPE_CLAUSE}
           ORDER BY l.last_name, l.first_name, l.birth_certificate_number"
        ))?;
        let mut rows = stmt
          .query_map(params![kind, scope_id], RawLearner::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        load_subject_ids(conn, &mut rows)?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLearner::into_learner).collect()
  }

  async fn update_learner(&self, birth_certificate_number: &str, input: NewLearner) -> Result<Learner> {
    input.validate()?;
    let key = birth_certificate_number.trim().to_owned();

    let bcn = key.clone();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        check_learner_refs(&tx, &input)?;
        let changed = tx.execute(
          "UPDATE learners SET
             admission_number = ?2, first_name = ?3, middle_name = ?4, last_name = ?5,
             date_of_birth = ?6, gender = ?7, school_id = ?8, grade = ?9, year = ?10,
             admission_date = COALESCE(?11, admission_date), class_teacher_id = ?12,
             parent_full_name = ?13, parent_contact = ?14, relationship = ?15,
             county_id = ?16, sub_county_id = ?17, ward_id = ?18, postal_address = ?19
           WHERE birth_certificate_number = ?1",
          params![
            bcn,
            input.admission_number.trim(),
            input.first_name.trim(),
            trimmed(input.middle_name.as_deref()),
            input.last_name.trim(),
            input.date_of_birth.map(encode_date),
            input.gender.to_string(),
            input.school_id,
            input.grade.to_string(),
            input.year,
            input.admission_date.map(encode_date),
            input.class_teacher_id,
            input.parent_full_name.trim(),
            input.parent_contact.trim(),
            input.relationship.to_string(),
            input.location.county_id,
            input.location.sub_county_id,
            input.location.ward_id,
            input.postal_address.trim(),
          ],
        )?;
        if changed == 0 {
          return Err(reject(Error::not_found("learner", bcn)));
        }
        attach_subjects(&tx, &bcn, &input)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::info!(learner = %key, "learner updated");
    self
      .get_learner(&key, OrgScope::All)
      .await?
      .ok_or_else(|| Error::not_found("learner", key))
  }

  // ── Dashboards ────────────────────────────────────────────────────────────

  async fn summarize(&self, scope: OrgScope) -> Result<Summary> {
    let (kind, scope_id) = scope_params(scope);

    let (schools, teachers, learners): (i64, i64, i64) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "SELECT
               (SELECT COUNT(*) FROM schools s WHERE {SCOPE_CLAUSE}),
               (SELECT COUNT(*) FROM teachers t JOIN schools s ON s.id = t.school_id
                 WHERE {SCOPE_CLAUSE}),
               (SELECT COUNT(*) FROM learners l JOIN schools s ON s.id = l.school_id
                 WHERE {SCOPE_CLAUSE})"
          ),
          params![kind, scope_id],
          |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?)
      })
      .await?;

    Ok(Summary {
      schools:  schools.unsigned_abs(),
      teachers: teachers.unsigned_abs(),
      learners: learners.unsigned_abs(),
    })
  }
}
