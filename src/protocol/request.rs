//! Outgoing request variants and the wire envelope wrapping them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PROTOCOL_VERSION: &str = "1.0";

/// The kind of request sent to the skill, independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    SessionStarted,
    Launch,
    Intent,
    Utterance,
    SessionEnded,
}

impl RequestKind {
    /// Whether the skill is expected to answer this kind with a payload.
    #[must_use]
    pub const fn expects_response(self) -> bool {
        matches!(self, Self::Launch | Self::Intent | Self::Utterance)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SessionStarted => "SessionStartedRequest",
            Self::Launch => "LaunchRequest",
            Self::Intent => "IntentRequest",
            Self::Utterance => "UtteranceRequest",
            Self::SessionEnded => "SessionEndedRequest",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEndedReason {
    UserInitiated,
    Error,
    ExceededMaxReprompts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    pub value: String,
}

impl Slot {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A request to send to the skill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    SessionStarted,
    Launch,
    Intent {
        name: String,
        slots: BTreeMap<String, Slot>,
    },
    /// Free-form text; only meaningful to transports that run recognition.
    Utterance { text: String },
    SessionEnded { reason: SessionEndedReason },
}

impl Request {
    /// Build an intent request from `(name, value)` slot pairs.
    pub fn intent<I, K, V>(name: impl Into<String>, slots: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let slots = slots
            .into_iter()
            .map(|(key, value)| {
                let key = key.into();
                (key.clone(), Slot::new(key, value))
            })
            .collect();
        Self::Intent {
            name: name.into(),
            slots,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::SessionStarted => RequestKind::SessionStarted,
            Self::Launch => RequestKind::Launch,
            Self::Intent { .. } => RequestKind::Intent,
            Self::Utterance { .. } => RequestKind::Utterance,
            Self::SessionEnded { .. } => RequestKind::SessionEnded,
        }
    }

    /// Short label used in logs and error messages.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Intent { name, .. } => format!("{} {name}", self.kind()),
            _ => self.kind().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub application_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub new: bool,
    pub session_id: String,
    pub application: Application,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemContext {
    pub application: Application,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(rename = "System")]
    pub system: SystemContext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentPayload {
    pub name: String,
    #[serde(default)]
    pub slots: BTreeMap<String, Slot>,
}

/// The `request` object of the envelope; kind-specific fields are flattened in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    #[serde(rename = "type")]
    pub request_type: String,
    pub request_id: String,
    pub timestamp: String,
    pub locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<SessionEndedReason>,
}

impl RequestPayload {
    #[must_use]
    pub fn new(request: &Request, request_id: String, timestamp: String, locale: String) -> Self {
        let mut payload = Self {
            request_type: request.kind().as_str().to_string(),
            request_id,
            timestamp,
            locale,
            intent: None,
            text: None,
            reason: None,
        };
        match request {
            Request::SessionStarted | Request::Launch => {}
            Request::Intent { name, slots } => {
                payload.intent = Some(IntentPayload {
                    name: name.clone(),
                    slots: slots.clone(),
                });
            }
            Request::Utterance { text } => payload.text = Some(text.clone()),
            Request::SessionEnded { reason } => payload.reason = Some(*reason),
        }
        payload
    }
}

/// The complete `{version, session, context, request}` structure sent to a skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub version: String,
    pub session: SessionPayload,
    pub context: Context,
    pub request: RequestPayload,
}

impl RequestEnvelope {
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
