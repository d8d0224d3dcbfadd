//! SQL schema for the NEMIS SQLite store.
//!
//! Executed once at connection startup. The `PRAGMA user_version` stamp is
//! where future migrations will branch.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
///
/// Location rows cascade down their own hierarchy but are `RESTRICT`ed by
/// schools and learners, so a referenced county, subcounty or ward cannot be
/// deleted. Timestamps are RFC 3339 UTC strings with a fixed width so they
/// compare lexically; dates are `YYYY-MM-DD`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Locations ────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS counties (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS sub_counties (
    id         INTEGER PRIMARY KEY,
    county_id  INTEGER NOT NULL REFERENCES counties(id) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    UNIQUE (county_id, name)
);

CREATE TABLE IF NOT EXISTS wards (
    id             INTEGER PRIMARY KEY,
    sub_county_id  INTEGER NOT NULL REFERENCES sub_counties(id) ON DELETE CASCADE,
    name           TEXT NOT NULL,
    UNIQUE (sub_county_id, name)
);

-- ── Schools ──────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS schools (
    id             INTEGER PRIMARY KEY,
    name           TEXT NOT NULL,
    code           TEXT NOT NULL UNIQUE,
    level          TEXT NOT NULL,      -- 'PrePrimary' | 'Primary' | 'Secondary'
    county_id      INTEGER NOT NULL REFERENCES counties(id)     ON DELETE RESTRICT,
    sub_county_id  INTEGER NOT NULL REFERENCES sub_counties(id) ON DELETE RESTRICT,
    ward_id        INTEGER NOT NULL REFERENCES wards(id)        ON DELETE RESTRICT,
    address        TEXT
);

-- ── Identities & sessions ────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS identities (
    id             INTEGER PRIMARY KEY,
    username       TEXT NOT NULL UNIQUE,
    password_hash  TEXT NOT NULL,
    first_name     TEXT NOT NULL DEFAULT '',
    last_name      TEXT NOT NULL DEFAULT '',
    email          TEXT NOT NULL DEFAULT '',
    role           TEXT,               -- snake_case Role or NULL
    is_active      INTEGER NOT NULL DEFAULT 1,
    is_superuser   INTEGER NOT NULL DEFAULT 0,
    profile_image  TEXT,
    county_id      INTEGER REFERENCES counties(id)     ON DELETE SET NULL,
    sub_county_id  INTEGER REFERENCES sub_counties(id) ON DELETE SET NULL,
    school_id      INTEGER REFERENCES schools(id)      ON DELETE SET NULL,
    date_joined    TEXT NOT NULL
);

-- Only the SHA-256 of the bearer token is kept.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash   TEXT PRIMARY KEY,
    identity_id  INTEGER NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
    created_at   TEXT NOT NULL,
    expires_at   TEXT NOT NULL
);

-- ── Staff ────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS teachers (
    id           INTEGER PRIMARY KEY,
    identity_id  INTEGER NOT NULL UNIQUE REFERENCES identities(id) ON DELETE CASCADE,
    school_id    INTEGER NOT NULL REFERENCES schools(id) ON DELETE CASCADE,
    role         TEXT NOT NULL,        -- snake_case StaffRole
    tsc_number   TEXT NOT NULL UNIQUE,
    phone        TEXT,
    date_joined  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS streams (
    id         INTEGER PRIMARY KEY,
    school_id  INTEGER NOT NULL REFERENCES schools(id) ON DELETE CASCADE,
    grade      TEXT NOT NULL,
    name       TEXT NOT NULL,
    UNIQUE (school_id, grade, name)
);

CREATE TABLE IF NOT EXISTS class_assignments (
    id                INTEGER PRIMARY KEY,
    teacher_id        INTEGER NOT NULL REFERENCES teachers(id) ON DELETE CASCADE,
    stream_id         INTEGER NOT NULL REFERENCES streams(id)  ON DELETE CASCADE,
    year              INTEGER NOT NULL,
    is_class_teacher  INTEGER NOT NULL DEFAULT 0,
    UNIQUE (teacher_id, stream_id, year)
);

-- At most one class teacher per stream and year.
CREATE UNIQUE INDEX IF NOT EXISTS class_teacher_per_stream_year
    ON class_assignments(stream_id, year) WHERE is_class_teacher = 1;

-- ── Curriculum ───────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS subjects (
    id             INTEGER PRIMARY KEY,
    name           TEXT NOT NULL UNIQUE,
    grade_level    TEXT NOT NULL,      -- GradeLevel variant name
    is_compulsory  INTEGER NOT NULL DEFAULT 0,
    school_id      INTEGER REFERENCES schools(id) ON DELETE CASCADE,  -- NULL = national
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subject_assignments (
    id          INTEGER PRIMARY KEY,
    teacher_id  INTEGER NOT NULL REFERENCES teachers(id) ON DELETE CASCADE,
    subject_id  INTEGER NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
    stream_id   INTEGER NOT NULL REFERENCES streams(id)  ON DELETE CASCADE,
    year        INTEGER NOT NULL,
    UNIQUE (teacher_id, subject_id, stream_id, year)
);

-- ── Learners ─────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS learners (
    birth_certificate_number  TEXT PRIMARY KEY,
    admission_number          TEXT NOT NULL UNIQUE,
    first_name                TEXT NOT NULL,
    middle_name               TEXT,
    last_name                 TEXT NOT NULL,
    date_of_birth             TEXT,
    gender                    TEXT NOT NULL,   -- 'M' | 'F' | 'O'
    school_id                 INTEGER NOT NULL REFERENCES schools(id) ON DELETE CASCADE,
    grade                     TEXT NOT NULL,   -- 'PP1' .. 'Grade 12'
    year                      INTEGER NOT NULL,
    admission_date            TEXT NOT NULL,
    class_teacher_id          INTEGER REFERENCES teachers(id) ON DELETE SET NULL,
    profile_image             TEXT,
    parent_full_name          TEXT NOT NULL,
    parent_contact            TEXT NOT NULL,
    relationship              TEXT NOT NULL,
    county_id                 INTEGER NOT NULL REFERENCES counties(id)     ON DELETE RESTRICT,
    sub_county_id             INTEGER NOT NULL REFERENCES sub_counties(id) ON DELETE RESTRICT,
    ward_id                   INTEGER NOT NULL REFERENCES wards(id)        ON DELETE RESTRICT,
    postal_address            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS learner_subjects (
    learner_bcn  TEXT NOT NULL REFERENCES learners(birth_certificate_number) ON DELETE CASCADE,
    subject_id   INTEGER NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
    PRIMARY KEY (learner_bcn, subject_id)
);

CREATE INDEX IF NOT EXISTS schools_county_idx      ON schools(county_id);
CREATE INDEX IF NOT EXISTS schools_sub_county_idx  ON schools(sub_county_id);
CREATE INDEX IF NOT EXISTS teachers_school_idx     ON teachers(school_id);
CREATE INDEX IF NOT EXISTS learners_school_idx     ON learners(school_id);
CREATE INDEX IF NOT EXISTS sessions_identity_idx   ON sessions(identity_id);

PRAGMA user_version = 1;
";
