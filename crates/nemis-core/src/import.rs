//! Parsing of the `locations.csv` reference file.
//!
//! Pipeline:
//!   raw &str
//!     └─ split_records()  → Vec<Vec<String>>   (RFC 4180 quoting)
//!          └─ header lookup → LocationRow per data record
//!
//! Upserting the rows is the store's job
//! ([`SchoolStore::import_locations`](crate::store::SchoolStore::import_locations)).

use serde::Serialize;

use crate::{Error, Result};

/// One `(county, sub_county, ward)` line. Values are trimmed; any of them may
/// be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRow {
  pub county:     String,
  pub sub_county: String,
  pub ward:       String,
}

impl LocationRow {
  pub fn new(county: &str, sub_county: &str, ward: &str) -> Self {
    Self {
      county:     county.trim().to_owned(),
      sub_county: sub_county.trim().to_owned(),
      ward:       ward.trim().to_owned(),
    }
  }
}

/// Outcome of an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
  /// Rows with a county name, i.e. rows that were applied.
  pub rows:                 usize,
  /// Rows skipped for lacking a county.
  pub skipped:              usize,
  pub counties_created:     usize,
  pub sub_counties_created: usize,
  pub wards_created:        usize,
}

/// Parse CSV text with a header row naming `county`, `sub_county` and `ward`
/// columns (any order, extra columns ignored). Missing `sub_county`/`ward`
/// columns read as empty; a missing `county` column is an error.
pub fn parse_locations_csv(input: &str) -> Result<Vec<LocationRow>> {
  let input = input.strip_prefix('\u{feff}').unwrap_or(input);
  let mut records = split_records(input)?.into_iter();

  let header = records
    .next()
    .ok_or_else(|| Error::validation("file", "CSV file is empty."))?;
  let column = |name: &str| {
    header
      .iter()
      .position(|h| h.trim().eq_ignore_ascii_case(name))
  };
  let county_col = column("county")
    .ok_or_else(|| Error::validation("file", "CSV header has no `county` column."))?;
  let sub_county_col = column("sub_county");
  let ward_col = column("ward");

  let field = |record: &[String], col: Option<usize>| -> String {
    col
      .and_then(|c| record.get(c))
      .map(|v| v.trim().to_owned())
      .unwrap_or_default()
  };

  Ok(
    records
      .filter(|r| !(r.len() == 1 && r[0].trim().is_empty()))
      .map(|r| LocationRow {
        county:     field(r.as_slice(), Some(county_col)),
        sub_county: field(r.as_slice(), sub_county_col),
        ward:       field(r.as_slice(), ward_col),
      })
      .collect(),
  )
}

/// Split CSV text into records of fields. Handles quoted fields containing
/// commas, doubled quotes and line breaks; tolerates CRLF and LF.
pub(crate) fn split_records(input: &str) -> Result<Vec<Vec<String>>> {
  let mut records = Vec::new();
  let mut record = Vec::new();
  let mut field = String::new();
  let mut in_quotes = false;
  let mut chars = input.chars().peekable();
  let mut line = 1usize;

  while let Some(c) = chars.next() {
    if in_quotes {
      match c {
        '"' if chars.peek() == Some(&'"') => {
          chars.next();
          field.push('"');
        }
        '"' => in_quotes = false,
        '\n' => {
          line += 1;
          field.push(c);
        }
        _ => field.push(c),
      }
      continue;
    }
    match c {
      '"' if field.trim().is_empty() => {
        field.clear();
        in_quotes = true;
      }
      ',' => record.push(std::mem::take(&mut field)),
      '\r' if chars.peek() == Some(&'\n') => {}
      '\n' => {
        line += 1;
        record.push(std::mem::take(&mut field));
        records.push(std::mem::take(&mut record));
      }
      _ => field.push(c),
    }
  }

  if in_quotes {
    return Err(Error::validation("file", format!("unterminated quoted field near line {line}")));
  }
  if !field.is_empty() || !record.is_empty() {
    record.push(field);
    records.push(record);
  }
  Ok(records)
}
