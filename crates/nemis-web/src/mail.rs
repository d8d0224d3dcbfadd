//! Outgoing mail.
//!
//! Delivery is best-effort: callers log and surface a failure but never undo
//! the operation that triggered the message.

use nemis_core::{Error, Result};

pub trait Mailer: Send + Sync {
  fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;

  /// Whether a successful [`send`](Mailer::send) reaches the recipient.
  /// Callers show credentials to the operator when it does not.
  fn delivers(&self) -> bool { true }
}

/// Writes messages to the log instead of delivering them. The body carries
/// credentials, so it is only emitted at `debug`.
pub struct LogMailer {
  pub from: String,
}

impl Mailer for LogMailer {
  fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
    if !to.contains('@') {
      return Err(Error::ExternalServiceDegraded(format!("cannot deliver to {to:?}")));
    }
    tracing::info!(from = %self.from, %to, %subject, "mail queued");
    tracing::debug!(%to, %body, "mail body");
    Ok(())
  }

  fn delivers(&self) -> bool { false }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn refuses_addresses_without_domain() {
    let mailer = LogMailer { from: "no-reply@nemis.local".into() };
    assert!(mailer.send("grace@example.com", "Hi", "body").is_ok());
    assert!(matches!(
      mailer.send("", "Hi", "body"),
      Err(Error::ExternalServiceDegraded(_))
    ));
    assert!(!mailer.delivers());
  }
}
