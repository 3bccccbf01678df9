//! Typed view over the skill's response envelope.
//!
//! Unknown card and directive types parse as `Unsupported` so that a skill
//! emitting, say, a display template does not fail every other check.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CheckError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Speech {
    #[serde(rename = "SSML")]
    Ssml { ssml: String },
    PlainText { text: String },
}

impl Speech {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Ssml { ssml } => ssml,
            Self::PlainText { text } => text,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Card {
    Simple {
        #[serde(default)]
        title: String,
        #[serde(default)]
        content: String,
    },
    Standard {
        #[serde(default)]
        title: String,
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<CardImage>,
    },
    LinkAccount {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayBehavior {
    ReplaceAll,
    Enqueue,
    ReplaceEnqueued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClearBehavior {
    ClearAll,
    ClearEnqueued,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_previous_token: Option<String>,
    #[serde(default)]
    pub offset_in_milliseconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<Stream>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Directive {
    #[serde(rename = "AudioPlayer.Play", rename_all = "camelCase")]
    Play {
        play_behavior: PlayBehavior,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio_item: Option<AudioItem>,
    },
    #[serde(rename = "AudioPlayer.Stop")]
    Stop,
    #[serde(rename = "AudioPlayer.ClearQueue", rename_all = "camelCase")]
    ClearQueue { clear_behavior: ClearBehavior },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reprompt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<Speech>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_end_session: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<Speech>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reprompt: Option<Reprompt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<Directive>,
}

/// The `{version, sessionAttributes, response}` structure returned by a skill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_attributes: Option<Map<String, Value>>,
    #[serde(default)]
    pub response: ResponseBody,
}

impl ResponseEnvelope {
    /// Parse raw bytes from a transport.
    ///
    /// Returns `Ok(None)` for an empty payload so callers can treat it the
    /// same as a transport that answered nothing.
    pub fn parse(bytes: &[u8]) -> Result<Option<Self>> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(bytes)
            .map(Some)
            .map_err(|err| CheckError::Protocol(format!("malformed response envelope: {err}")))
    }

    #[must_use]
    pub const fn should_end_session(&self) -> Option<bool> {
        self.response.should_end_session
    }

    #[must_use]
    pub const fn output_speech(&self) -> Option<&Speech> {
        self.response.output_speech.as_ref()
    }

    #[must_use]
    pub fn reprompt_speech(&self) -> Option<&Speech> {
        self.response
            .reprompt
            .as_ref()
            .and_then(|reprompt| reprompt.output_speech.as_ref())
    }

    #[must_use]
    pub const fn card(&self) -> Option<&Card> {
        self.response.card.as_ref()
    }

    #[must_use]
    pub fn directives(&self) -> &[Directive] {
        &self.response.directives
    }

    #[must_use]
    pub const fn session_attributes(&self) -> Option<&Map<String, Value>> {
        self.session_attributes.as_ref()
    }

    /// First play directive, if any.
    #[must_use]
    pub fn play_directive(&self) -> Option<&Directive> {
        self.directives()
            .iter()
            .find(|d| matches!(d, Directive::Play { .. }))
    }

    #[must_use]
    pub fn stop_directive(&self) -> Option<&Directive> {
        self.directives()
            .iter()
            .find(|d| matches!(d, Directive::Stop))
    }

    #[must_use]
    pub fn clear_queue_directive(&self) -> Option<&Directive> {
        self.directives()
            .iter()
            .find(|d| matches!(d, Directive::ClearQueue { .. }))
    }
}
