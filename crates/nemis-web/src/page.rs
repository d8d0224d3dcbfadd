//! JSON page contexts and one-shot flash messages.
//!
//! Every page is rendered as `{title, messages, ...context}`. Messages queued
//! before a redirect travel in the `nemis_flash` cookie (base64url JSON) and
//! are shown by the next page that takes a [`Flash`], which also expires the
//! cookie.

use std::convert::Infallible;

use axum::{
  Json,
  extract::FromRequestParts,
  http::{StatusCode, header, request::Parts},
  response::{IntoResponse, Redirect, Response},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::session::{FLASH_COOKIE, cookie, expired, read_cookie};

// ─── Messages ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
  Success,
  Info,
  Warning,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub level: Level,
  pub text:  String,
}

impl Message {
  pub fn new(level: Level, text: impl Into<String>) -> Self { Self { level, text: text.into() } }

  pub fn success(text: impl Into<String>) -> Self { Self::new(Level::Success, text) }

  pub fn info(text: impl Into<String>) -> Self { Self::new(Level::Info, text) }

  pub fn warning(text: impl Into<String>) -> Self { Self::new(Level::Warning, text) }

  pub fn error(text: impl Into<String>) -> Self { Self::new(Level::Error, text) }
}

fn encode(messages: &[Message]) -> Option<String> {
  serde_json::to_vec(messages)
    .ok()
    .map(|json| URL_SAFE_NO_PAD.encode(json))
}

pub(crate) fn decode(raw: &str) -> Vec<Message> {
  URL_SAFE_NO_PAD
    .decode(raw)
    .ok()
    .and_then(|json| serde_json::from_slice(&json).ok())
    .unwrap_or_default()
}

// ─── Flash extractor ─────────────────────────────────────────────────────────

/// Messages queued by the previous response. Never rejects; a missing or
/// garbled cookie reads as no messages.
#[derive(Debug, Default)]
pub struct Flash(pub Vec<Message>);

impl<St: Send + Sync> FromRequestParts<St> for Flash {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
    Ok(Flash(
      read_cookie(&parts.headers, FLASH_COOKIE)
        .map(|raw| decode(&raw))
        .unwrap_or_default(),
    ))
  }
}

/// A `303 See Other` to `to`, queueing `messages` for the next page.
pub fn redirect_with(to: &str, messages: &[Message]) -> Response {
  let mut res = Redirect::to(to).into_response();
  if !messages.is_empty()
    && let Some(value) = encode(messages).and_then(|raw| cookie(FLASH_COOKIE, &raw, None, false))
  {
    res.headers_mut().append(header::SET_COOKIE, value);
  }
  res
}

// ─── Page ────────────────────────────────────────────────────────────────────

pub struct Page {
  title:    String,
  messages: Vec<Message>,
  consumed: bool,
  context:  Map<String, Value>,
}

impl Page {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title:    title.into(),
      messages: Vec::new(),
      consumed: false,
      context:  Map::new(),
    }
  }

  /// Show the queued messages on this page and expire the flash cookie.
  pub fn flash(mut self, flash: Flash) -> Self {
    self.consumed |= !flash.0.is_empty();
    self.messages.extend(flash.0);
    self
  }

  pub fn message(mut self, message: Message) -> Self {
    self.messages.push(message);
    self
  }

  /// Add `key` to the page context. Values that fail to serialise render as
  /// `null`.
  pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
    let value = serde_json::to_value(value).unwrap_or(Value::Null);
    self.context.insert(key.to_owned(), value);
    self
  }
}

impl IntoResponse for Page {
  fn into_response(self) -> Response {
    let mut body = Map::new();
    body.insert("title".into(), Value::String(self.title));
    body.insert(
      "messages".into(),
      serde_json::to_value(&self.messages).unwrap_or(Value::Array(Vec::new())),
    );
    body.extend(self.context);

    let mut res = (StatusCode::OK, Json(Value::Object(body))).into_response();
    if self.consumed
      && let Some(value) = expired(FLASH_COOKIE)
    {
      res.headers_mut().append(header::SET_COOKIE, value);
    }
    res
  }
}
