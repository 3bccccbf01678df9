//! Common test utilities shared across integration tests.
//!
//! Only the public crate API is used here.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value, json};
use skillcheck::Result;
use skillcheck::protocol::RequestEnvelope;
use skillcheck::transport::FnTransport;

pub type Log = Rc<RefCell<Vec<RequestEnvelope>>>;

/// Skill that echoes intent slots into the session attributes.
///
/// Launch answers with SSML "hi"; `AMAZON.StopIntent` ends the session;
/// other intents answer with a simple card titled after the intent.
pub fn echo_skill(log: &Log) -> FnTransport<impl FnMut(&RequestEnvelope) -> Result<Option<Value>> + use<>> {
    let log = Rc::clone(log);
    FnTransport::new(move |envelope: &RequestEnvelope| {
        log.borrow_mut().push(envelope.clone());
        Ok(echo(envelope))
    })
}

/// Skill that answers every conversational request with the next queued
/// response, then with an empty open response once the queue runs dry.
pub fn scripted_skill(
    log: &Log,
    responses: Vec<Value>,
) -> FnTransport<impl FnMut(&RequestEnvelope) -> Result<Option<Value>> + use<>> {
    let log = Rc::clone(log);
    let mut queue = responses.into_iter();
    FnTransport::new(move |envelope: &RequestEnvelope| {
        log.borrow_mut().push(envelope.clone());
        if !is_conversational(envelope) {
            return Ok(None);
        }
        Ok(Some(queue.next().unwrap_or_else(|| {
            json!({"version": "1.0", "response": {"shouldEndSession": false}})
        })))
    })
}

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn request_types(log: &Log) -> Vec<String> {
    log.borrow()
        .iter()
        .map(|envelope| envelope.request.request_type.clone())
        .collect()
}

fn is_conversational(envelope: &RequestEnvelope) -> bool {
    matches!(
        envelope.request.request_type.as_str(),
        "LaunchRequest" | "IntentRequest" | "UtteranceRequest"
    )
}

fn echo(envelope: &RequestEnvelope) -> Option<Value> {
    if !is_conversational(envelope) {
        return None;
    }
    let Some(intent) = &envelope.request.intent else {
        return Some(json!({
            "version": "1.0",
            "response": {
                "outputSpeech": {"type": "SSML", "ssml": "<speak>hi</speak>"},
                "shouldEndSession": false
            }
        }));
    };
    let attributes: Map<String, Value> = intent
        .slots
        .values()
        .map(|slot| (slot.name.clone(), Value::String(slot.value.clone())))
        .collect();
    let end = intent.name == "AMAZON.StopIntent";
    Some(json!({
        "version": "1.0",
        "sessionAttributes": attributes,
        "response": {
            "outputSpeech": {"type": "PlainText", "text": format!("ok {}", intent.name)},
            "card": {"type": "Simple", "title": intent.name, "content": "echo"},
            "shouldEndSession": end
        }
    }))
}
