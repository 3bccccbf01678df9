//! In-process transport invoking a Rust handler directly.

use serde_json::Value;

use crate::error::Result;
use crate::protocol::{RequestEnvelope, RequestKind};

use super::Transport;

/// Wraps a closure acting as the skill's request handler.
///
/// The handler sees the decoded envelope and returns the response JSON, or
/// `None` for requests it does not answer.
pub struct FnTransport<F> {
    handler: F,
}

impl<F> FnTransport<F>
where
    F: FnMut(&RequestEnvelope) -> Result<Option<Value>>,
{
    pub const fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> Transport for FnTransport<F>
where
    F: FnMut(&RequestEnvelope) -> Result<Option<Value>>,
{
    fn fire(&mut self, kind: RequestKind, envelope: &[u8]) -> Result<Option<Vec<u8>>> {
        let envelope = RequestEnvelope::from_bytes(envelope)?;
        tracing::trace!(%kind, request_id = %envelope.request.request_id, "invoking local handler");
        match (self.handler)(&envelope)? {
            Some(response) => Ok(Some(serde_json::to_vec(&response)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        Application, Context, Request, RequestPayload, SessionPayload, SystemContext, User,
    };
    use serde_json::json;

    fn envelope_bytes(request: &Request) -> Vec<u8> {
        let application = Application {
            application_id: "app".to_string(),
        };
        let user = User {
            user_id: "user".to_string(),
            access_token: None,
        };
        RequestEnvelope {
            version: "1.0".to_string(),
            session: SessionPayload {
                new: false,
                session_id: "SessionId.x".to_string(),
                application: application.clone(),
                attributes: serde_json::Map::new(),
                user: user.clone(),
            },
            context: Context {
                system: SystemContext { application, user },
            },
            request: RequestPayload::new(request, "rid".to_string(), "ts".to_string(), "en-US".to_string()),
        }
        .to_bytes()
        .unwrap()
    }

    #[test]
    fn handler_sees_decoded_envelope() {
        let mut seen = Vec::new();
        let mut transport = FnTransport::new(|envelope: &RequestEnvelope| {
            seen.push(envelope.request.request_type.clone());
            Ok(Some(json!({"version": "1.0", "response": {}})))
        });
        let bytes = transport
            .fire(RequestKind::Launch, &envelope_bytes(&Request::Launch))
            .unwrap()
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["version"], "1.0");
        drop(transport);
        assert_eq!(seen, vec!["LaunchRequest".to_string()]);
    }

    #[test]
    fn handler_may_answer_nothing() {
        let mut transport = FnTransport::new(|_: &RequestEnvelope| Ok(None));
        let answer = transport
            .fire(RequestKind::SessionStarted, &envelope_bytes(&Request::SessionStarted))
            .unwrap();
        assert!(answer.is_none());
    }
}
