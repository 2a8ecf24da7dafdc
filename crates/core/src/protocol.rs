//! Push-channel message shapes.
//!
//! Every message is a JSON array whose first element names the message:
//!
//! - client → server: `["mount", url, locales, timezone, timezoneOffset]`,
//!   `["navigate", url, ...args]` (a bare `["/path", ...args]` is accepted
//!   as a navigate)
//! - server → client: `["update-text", selector, text]`,
//!   `["update-in", selector, patch]`, `["redirect", href]`,
//!   `["set-title", title]`

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::render::VNode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("message is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("message must be a non-empty array")]
    NotAnArray,

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("message is missing a url")]
    MissingUrl,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Mount {
        url: String,
        locales: Vec<String>,
        timezone: Option<String>,
        timezone_offset: Option<i64>,
    },
    Navigate {
        url: String,
        args: Vec<Value>,
    },
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Array(mut items) = value else {
            return Err(ProtocolError::NotAnArray);
        };
        if items.is_empty() {
            return Err(ProtocolError::NotAnArray);
        }

        let kind = match items.remove(0) {
            Value::String(kind) => kind,
            other => return Err(ProtocolError::UnknownType(other.to_string())),
        };

        match kind.as_str() {
            "mount" => {
                let mut items = items.into_iter();
                let url = take_url(items.next())?;
                let locales = parse_locales(items.next());
                let timezone = match items.next() {
                    Some(Value::String(tz)) if !tz.is_empty() && tz != "null" => Some(tz),
                    _ => None,
                };
                let timezone_offset = items.next().and_then(|v| v.as_i64());
                Ok(ClientMessage::Mount {
                    url,
                    locales,
                    timezone,
                    timezone_offset,
                })
            }
            "navigate" => {
                let mut items = items.into_iter();
                let url = take_url(items.next())?;
                Ok(ClientMessage::Navigate {
                    url,
                    args: items.collect(),
                })
            }
            path if path.starts_with('/') => Ok(ClientMessage::Navigate {
                url: kind.clone(),
                args: items,
            }),
            _ => Err(ProtocolError::UnknownType(kind)),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            ClientMessage::Mount { url, .. } | ClientMessage::Navigate { url, .. } => url,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Mount { .. } => "mount",
            ClientMessage::Navigate { .. } => "navigate",
        }
    }
}

fn take_url(value: Option<Value>) -> Result<String, ProtocolError> {
    match value {
        Some(Value::String(url)) if url.starts_with('/') => Ok(url),
        _ => Err(ProtocolError::MissingUrl),
    }
}

fn parse_locales(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(list)) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    UpdateText { selector: String, text: String },
    UpdateIn { selector: String, patch: VNode },
    Redirect { href: String },
    SetTitle { title: String },
}

impl ServerMessage {
    pub fn update_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::UpdateText {
            selector: selector.into(),
            text: text.into(),
        }
    }

    pub fn update_in(selector: impl Into<String>, patch: VNode) -> Self {
        Self::UpdateIn {
            selector: selector.into(),
            patch,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::UpdateText { .. } => "update-text",
            ServerMessage::UpdateIn { .. } => "update-in",
            ServerMessage::Redirect { .. } => "redirect",
            ServerMessage::SetTitle { .. } => "set-title",
        }
    }

    pub fn to_json(&self) -> String {
        // Serializing strings and patches cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Serialize for ServerMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ServerMessage::UpdateText { selector, text } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(self.kind())?;
                seq.serialize_element(selector)?;
                seq.serialize_element(text)?;
                seq.end()
            }
            ServerMessage::UpdateIn { selector, patch } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(self.kind())?;
                seq.serialize_element(selector)?;
                seq.serialize_element(patch)?;
                seq.end()
            }
            ServerMessage::Redirect { href: value } | ServerMessage::SetTitle { title: value } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(self.kind())?;
                seq.serialize_element(value)?;
                seq.end()
            }
        }
    }
}
