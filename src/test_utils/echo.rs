//! In-process skill used by unit tests.
//!
//! - Launch: SSML greeting, plain-text reprompt, session stays open.
//! - `AMAZON.StopIntent`: plain-text goodbye, session ends.
//! - `PlayIntent`: `AudioPlayer.Play` with `REPLACE_ENQUEUED`.
//! - Any other intent: simple card titled with the intent name; the slots
//!   become the session attributes (replacing whatever was there).
//! - Utterance: echoes the text as plain speech.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value, json};

use crate::error::Result;
use crate::protocol::{RequestEnvelope, RequestKind};
use crate::transport::FnTransport;

/// Every envelope the skill received, in order.
#[derive(Debug, Clone, Default)]
pub struct Recorded(Rc<RefCell<Vec<RequestEnvelope>>>);

impl Recorded {
    #[must_use]
    pub fn request_types(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .map(|envelope| envelope.request.request_type.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EchoSkill {
    recorded: Recorded,
}

impl EchoSkill {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn recorded(&self) -> Recorded {
        self.recorded.clone()
    }

    pub fn transport(
        &self,
    ) -> FnTransport<impl FnMut(&RequestEnvelope) -> Result<Option<Value>> + use<>> {
        let recorded = self.recorded.clone();
        FnTransport::new(move |envelope: &RequestEnvelope| {
            recorded.0.borrow_mut().push(envelope.clone());
            Ok(respond(envelope))
        })
    }
}

fn respond(envelope: &RequestEnvelope) -> Option<Value> {
    let request = &envelope.request;
    if request.request_type == RequestKind::Launch.as_str() {
        return Some(json!({
            "version": "1.0",
            "response": {
                "outputSpeech": {"type": "SSML", "ssml": "<speak>hi</speak>"},
                "reprompt": {"outputSpeech": {"type": "PlainText", "text": "say something"}},
                "shouldEndSession": false
            }
        }));
    }
    if request.request_type == RequestKind::Utterance.as_str() {
        let text = request.text.clone().unwrap_or_default();
        return Some(json!({
            "version": "1.0",
            "response": {
                "outputSpeech": {"type": "PlainText", "text": text},
                "shouldEndSession": false
            }
        }));
    }
    let intent = request.intent.as_ref()?;
    let body = match intent.name.as_str() {
        "AMAZON.StopIntent" => json!({
            "outputSpeech": {"type": "PlainText", "text": "bye"},
            "shouldEndSession": true
        }),
        "PlayIntent" => json!({
            "directives": [{
                "type": "AudioPlayer.Play",
                "playBehavior": "REPLACE_ENQUEUED",
                "audioItem": {"stream": {
                    "url": "https://example.com/track.mp3",
                    "token": "track-1",
                    "offsetInMilliseconds": 0
                }}
            }],
            "shouldEndSession": false
        }),
        name => {
            let content = intent
                .slots
                .values()
                .map(|slot| format!("{}={}", slot.name, slot.value))
                .collect::<Vec<_>>()
                .join(",");
            json!({
                "outputSpeech": {"type": "PlainText", "text": format!("ok {name}")},
                "card": {"type": "Simple", "title": name, "content": content},
                "shouldEndSession": false
            })
        }
    };
    let attributes: Map<String, Value> = intent
        .slots
        .values()
        .map(|slot| (slot.name.clone(), Value::String(slot.value.clone())))
        .collect();
    Some(json!({"version": "1.0", "sessionAttributes": attributes, "response": body}))
}
