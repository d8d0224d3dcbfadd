//! Validation of client-supplied "return to" targets (`?next=`).
//!
//! The login flow must never redirect to a host it does not control. Every
//! use of a `next` value goes through [`validate_next`] first.

use url::Url;

/// Return `candidate` if it is safe to redirect to, `None` otherwise.
///
/// Accepted: relative references (`/teachers/`, `learners/?page=2`) and
/// absolute `http`/`https` URLs whose authority is `current_host` or one of
/// `allowed_hosts`. When `is_secure` is set, absolute `http:` targets are
/// refused. Backslashes are treated as forward slashes, as browsers do.
pub fn validate_next(
  candidate: Option<&str>,
  current_host: &str,
  allowed_hosts: &[String],
  is_secure: bool,
) -> Option<String> {
  let candidate = candidate?.trim();
  if candidate.is_empty() {
    return None;
  }
  if candidate.chars().any(char::is_control) {
    return None;
  }

  let hosts: Vec<String> = std::iter::once(current_host)
    .chain(allowed_hosts.iter().map(String::as_str))
    .filter(|h| !h.is_empty())
    .map(str::to_ascii_lowercase)
    .collect();

  let normalised = candidate.replace('\\', "/");
  if is_safe(candidate, &hosts, is_secure) && is_safe(&normalised, &hosts, is_secure) {
    Some(candidate.to_owned())
  } else {
    None
  }
}

fn is_safe(target: &str, hosts: &[String], is_secure: bool) -> bool {
  // Browsers collapse extra leading slashes into an authority.
  if target.starts_with("///") {
    return false;
  }

  if let Some(rest) = target.strip_prefix("//") {
    // Scheme-relative: inherits the current scheme, so only the host matters.
    return match Url::parse(&format!("https://{rest}")) {
      Ok(url) => authority_allowed(&url, hosts),
      Err(_) => false,
    };
  }

  match Url::parse(target) {
    Ok(url) => {
      if !matches!(url.scheme(), "http" | "https") {
        return false;
      }
      if is_secure && url.scheme() != "https" {
        return false;
      }
      authority_allowed(&url, hosts)
    }
    // No scheme: a path relative to the current origin.
    Err(url::ParseError::RelativeUrlWithoutBase) => true,
    Err(_) => false,
  }
}

fn authority_allowed(url: &Url, hosts: &[String]) -> bool {
  let Some(host) = url.host_str() else {
    return false;
  };
  let host = host.to_ascii_lowercase();
  let authority = match url.port() {
    Some(port) => format!("{host}:{port}"),
    None => host,
  };
  hosts.iter().any(|allowed| *allowed == authority)
}

#[cfg(test)]
mod tests {
  use super::*;

  const HOST: &str = "app.example.com";

  fn check(candidate: &str) -> Option<String> {
    validate_next(Some(candidate), HOST, &[], false)
  }

  #[test]
  fn rejects_foreign_host() {
    assert_eq!(check("https://evil.example.com/"), None);
    assert_eq!(check("http://evil.example.com/teachers/"), None);
  }

  #[test]
  fn accepts_relative_paths() {
    assert_eq!(check("/teachers/"), Some("/teachers/".into()));
    assert_eq!(check("learners/?page=2"), Some("learners/?page=2".into()));
  }

  #[test]
  fn accepts_current_and_allow_listed_hosts() {
    assert!(check("https://app.example.com/schools/").is_some());
    let allowed = vec!["portal.example.com".to_string()];
    assert!(validate_next(Some("https://portal.example.com/"), HOST, &allowed, false).is_some());
    assert!(validate_next(Some("https://evil.example.com/"), HOST, &allowed, false).is_none());
  }

  #[test]
  fn rejects_absent_and_blank() {
    assert_eq!(validate_next(None, HOST, &[], false), None);
    assert_eq!(check("   "), None);
  }

  #[test]
  fn rejects_scheme_relative_and_backslash_tricks() {
    assert_eq!(check("//evil.example.com/"), None);
    assert_eq!(check("///evil.example.com/"), None);
    assert_eq!(check("\\\\evil.example.com"), None);
    assert_eq!(check("/\\evil.example.com"), None);
    assert!(check("//app.example.com/teachers/").is_some());
  }

  #[test]
  fn rejects_other_schemes_and_control_chars() {
    assert_eq!(check("javascript:alert(1)"), None);
    assert_eq!(check("ftp://app.example.com/"), None);
    assert_eq!(check("/teachers/\n"), Some("/teachers/".into()));
    assert_eq!(check("/teach\u{0}ers/"), None);
  }

  #[test]
  fn secure_connection_refuses_plain_http() {
    assert!(validate_next(Some("http://app.example.com/"), HOST, &[], true).is_none());
    assert!(validate_next(Some("https://app.example.com/"), HOST, &[], true).is_some());
    assert!(validate_next(Some("/schools/"), HOST, &[], true).is_some());
  }

  #[test]
  fn port_must_match_when_host_carries_one() {
    let host = "localhost:8000";
    assert!(validate_next(Some("http://localhost:8000/"), host, &[], false).is_some());
    assert!(validate_next(Some("http://localhost:9000/"), host, &[], false).is_none());
  }
}
