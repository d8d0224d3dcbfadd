//! Session tokens and cookie plumbing.
//!
//! A session token is 32 random bytes, hex-encoded, handed to the browser in
//! the `nemis_session` cookie. The store only ever sees its SHA-256 digest.

use axum::http::{HeaderMap, HeaderValue, header};
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest, Sha256};

pub const SESSION_COOKIE: &str = "nemis_session";
pub const FLASH_COOKIE: &str = "nemis_flash";

/// A fresh bearer token.
pub fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// The digest persisted in place of `token`.
pub fn digest(token: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(token.as_bytes());
  hex::encode(hasher.finalize())
}

/// Read cookie `name` from every `Cookie` header of the request.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(key, _)| *key == name)
    .map(|(_, value)| value.trim_matches('"').to_owned())
    .filter(|value| !value.is_empty())
}

/// A `Set-Cookie` value. `max_age: None` yields a browser-session cookie and
/// `Some(0)` expires the cookie immediately.
pub fn cookie(name: &str, value: &str, max_age: Option<i64>, secure: bool) -> Option<HeaderValue> {
  let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
  if let Some(age) = max_age {
    cookie.push_str(&format!("; Max-Age={age}"));
  }
  if secure {
    cookie.push_str("; Secure");
  }
  HeaderValue::from_str(&cookie).ok()
}

/// A `Set-Cookie` value that removes cookie `name`.
pub fn expired(name: &str) -> Option<HeaderValue> { cookie(name, "", Some(0), false) }

/// Eight characters from an alphabet without look-alike glyphs, used for the
/// initial password of staff accounts.
pub fn generate_password() -> String {
  const ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";
  let mut bytes = [0u8; 8];
  OsRng.fill_bytes(&mut bytes);
  bytes
    .iter()
    .map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tokens_are_unique_and_digests_stable() {
    let (a, b) = (new_token(), new_token());
    assert_eq!(a.len(), 64);
    assert_ne!(a, b);
    assert_eq!(digest(&a), digest(&a));
    assert_ne!(digest(&a), a);
  }

  #[test]
  fn reads_cookie_among_others() {
    let mut headers = HeaderMap::new();
    headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; nemis_session=abc"));
    headers.append(header::COOKIE, HeaderValue::from_static("nemis_flash=xyz"));
    assert_eq!(read_cookie(&headers, SESSION_COOKIE).as_deref(), Some("abc"));
    assert_eq!(read_cookie(&headers, FLASH_COOKIE).as_deref(), Some("xyz"));
    assert_eq!(read_cookie(&headers, "missing"), None);
  }

  #[test]
  fn cookie_attributes() {
    let v = cookie(SESSION_COOKIE, "t", Some(60), true).unwrap();
    let v = v.to_str().unwrap();
    assert!(v.contains("HttpOnly") && v.contains("SameSite=Lax") && v.contains("Secure"));
    assert!(v.contains("Max-Age=60"));
  }

  #[test]
  fn generated_passwords_use_the_alphabet() {
    let p = generate_password();
    assert_eq!(p.len(), 8);
    assert!(p.chars().all(|c| c.is_ascii_alphanumeric() && !"il1oO0I".contains(c)));
  }
}
