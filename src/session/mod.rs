//! Session state machine
//!
//! A [`SessionActor`] owns one conversation with the skill: it builds every
//! outgoing envelope, pushes it through the transport, and folds the answer
//! back into the session (attributes replaced wholesale, `closed` taken from
//! `shouldEndSession`).
//!
//! ```text
//! Created --start()--> Started --request--> Open <--> Closed
//! ```
//!
//! Everything is synchronous: each call blocks until the transport answers.

mod identity;

pub use identity::{Identity, MAX_TIMESTAMP_OFFSET_SECS, timestamp_offset};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{CheckError, Result};
use crate::evaluate::{Assertion, Asset, Evaluator, Pattern, SessionCheck};
use crate::protocol::{
    Context, PROTOCOL_VERSION, Request, RequestEnvelope, RequestKind, RequestPayload,
    ResponseEnvelope, SessionEndedReason, SessionPayload, SystemContext, ids,
};
use crate::transport::Transport;

/// Which request kinds may still be sent once the skill closed the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosedSessionPolicy {
    /// Nothing goes out after close.
    RejectAll,
    /// Only `SessionEnded` is let through.
    #[default]
    AllowSessionEnded,
    /// `Launch` and `SessionEnded` are let through.
    AllowLaunchAndSessionEnded,
}

impl ClosedSessionPolicy {
    #[must_use]
    pub const fn allows(self, kind: RequestKind) -> bool {
        match self {
            Self::RejectAll => false,
            Self::AllowSessionEnded => matches!(kind, RequestKind::SessionEnded),
            Self::AllowLaunchAndSessionEnded => {
                matches!(kind, RequestKind::SessionEnded | RequestKind::Launch)
            }
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RejectAll => "reject_all",
            Self::AllowSessionEnded => "allow_session_ended",
            Self::AllowLaunchAndSessionEnded => "allow_launch_and_session_ended",
        }
    }
}

impl fmt::Display for ClosedSessionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClosedSessionPolicy {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "reject_all" => Ok(Self::RejectAll),
            "allow_session_ended" => Ok(Self::AllowSessionEnded),
            "allow_launch_and_session_ended" => Ok(Self::AllowLaunchAndSessionEnded),
            _ => Err(CheckError::Config(format!(
                "invalid closed-session policy {s} (expected reject_all|allow_session_ended|allow_launch_and_session_ended)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Started,
    Open,
    Closed,
}

/// Conversation state carried in every envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    /// True until the session-started probe has gone out.
    pub new: bool,
    pub attributes: Map<String, Value>,
    pub closed: bool,
}

impl Session {
    fn new() -> Self {
        Self {
            id: ids::session_id(),
            new: true,
            attributes: Map::new(),
            closed: false,
        }
    }
}

pub struct SessionActor<'t> {
    identity: Identity,
    policy: ClosedSessionPolicy,
    session: Session,
    state: SessionState,
    transport: &'t mut dyn Transport,
    last_response: Option<ResponseEnvelope>,
    requests_fired: usize,
}

impl<'t> SessionActor<'t> {
    pub fn new(
        identity: Identity,
        policy: ClosedSessionPolicy,
        transport: &'t mut dyn Transport,
    ) -> Self {
        Self {
            identity,
            policy,
            session: Session::new(),
            state: SessionState::Created,
            transport,
            last_response: None,
            requests_fired: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub const fn policy(&self) -> ClosedSessionPolicy {
        self.policy
    }

    /// Response to the most recent request that produced one.
    #[must_use]
    pub const fn last_response(&self) -> Option<&ResponseEnvelope> {
        self.last_response.as_ref()
    }

    #[must_use]
    pub const fn requests_fired(&self) -> usize {
        self.requests_fired
    }

    /// Fire the session-started probe. Its answer, if any, is ignored.
    pub fn start(&mut self) -> Result<()> {
        self.fire(Request::SessionStarted).map(|_| ())
    }

    /// Build the envelope for `request` against the current session.
    ///
    /// Only the session-started probe carries `new = true`.
    pub fn envelope(&self, request: &Request) -> Result<RequestEnvelope> {
        let kind = request.kind();
        match (self.state, kind) {
            (SessionState::Created, RequestKind::SessionStarted) => {}
            (_, RequestKind::SessionStarted) => {
                return Err(CheckError::State(format!(
                    "session {} already started",
                    self.session.id
                )));
            }
            (SessionState::Created, _) => {
                return Err(CheckError::State(format!(
                    "cannot send {kind} before the session is started"
                )));
            }
            _ => {}
        }
        if self.session.closed && !self.policy.allows(kind) {
            return Err(CheckError::State(format!(
                "cannot send {} on closed session {} (policy {})",
                request.label(),
                self.session.id,
                self.policy
            )));
        }

        let application = self.identity.application();
        let user = self.identity.user();
        Ok(RequestEnvelope {
            version: PROTOCOL_VERSION.to_string(),
            session: SessionPayload {
                new: self.session.new,
                session_id: self.session.id.clone(),
                application: application.clone(),
                attributes: self.session.attributes.clone(),
                user: user.clone(),
            },
            context: Context {
                system: SystemContext { application, user },
            },
            request: RequestPayload::new(
                request,
                ids::request_id(),
                self.identity.timestamp()?,
                self.identity.locale.clone(),
            ),
        })
    }

    /// Fold a non-empty response into the session.
    pub fn apply_response(&mut self, response: &ResponseEnvelope) {
        self.session.closed = response.should_end_session().unwrap_or(false);
        self.session.attributes = response.session_attributes().cloned().unwrap_or_default();
        self.set_state(if self.session.closed {
            SessionState::Closed
        } else {
            SessionState::Open
        });
    }

    /// Send one request and apply its answer.
    ///
    /// Returns the parsed response for kinds that expect one.
    pub fn fire(&mut self, request: Request) -> Result<Option<&ResponseEnvelope>> {
        let kind = request.kind();
        let envelope = self.envelope(&request)?;
        debug!(
            session_id = %self.session.id,
            request_id = %envelope.request.request_id,
            request = %request.label(),
            "firing request"
        );
        let answer = self.transport.fire(kind, &envelope.to_bytes()?)?;
        self.requests_fired += 1;

        match kind {
            RequestKind::SessionStarted => {
                self.session.new = false;
                self.set_state(SessionState::Started);
                return Ok(None);
            }
            RequestKind::SessionEnded => {
                self.session.closed = true;
                self.set_state(SessionState::Closed);
                return Ok(None);
            }
            RequestKind::Launch | RequestKind::Intent | RequestKind::Utterance => {}
        }

        let response = match answer {
            Some(bytes) => ResponseEnvelope::parse(&bytes)?,
            None => None,
        };
        let Some(response) = response else {
            return Err(CheckError::Protocol(format!(
                "skill returned no response to {}",
                request.label()
            )));
        };
        self.apply_response(&response);
        Ok(Some(&*self.last_response.insert(response)))
    }

    pub fn launch(&mut self) -> Result<Turn<'_, 't>> {
        self.converse(Request::Launch)
    }

    pub fn intent<I, K, V>(&mut self, name: &str, slots: I) -> Result<Turn<'_, 't>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.converse(Request::intent(name, slots))
    }

    pub fn say(&mut self, text: &str) -> Result<Turn<'_, 't>> {
        self.converse(Request::Utterance {
            text: text.to_string(),
        })
    }

    pub fn end_session(&mut self, reason: SessionEndedReason) -> Result<()> {
        self.fire(Request::SessionEnded { reason }).map(|_| ())
    }

    /// Block the calling thread for `duration`. Not cancellable.
    pub fn delay(&mut self, duration: Duration) -> &mut Self {
        debug!(session_id = %self.session.id, ?duration, "delaying");
        std::thread::sleep(duration);
        self
    }

    fn converse(&mut self, request: Request) -> Result<Turn<'_, 't>> {
        let response = self
            .fire(request)?
            .cloned()
            .ok_or_else(|| CheckError::Protocol("request produced no response".to_string()))?;
        Ok(Turn {
            actor: self,
            response,
        })
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            trace!(session_id = %self.session.id, from = ?self.state, to = ?next, "session transition");
            self.state = next;
        }
    }
}

/// One answered request: check the response, then hand control back with
/// [`Turn::done`].
pub struct Turn<'s, 't> {
    actor: &'s mut SessionActor<'t>,
    response: ResponseEnvelope,
}

impl<'s, 't> Turn<'s, 't> {
    #[must_use]
    pub const fn response(&self) -> &ResponseEnvelope {
        &self.response
    }

    #[must_use]
    pub const fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.response)
    }

    #[must_use]
    pub fn is_true(&self, assertion: Assertion) -> bool {
        self.evaluator().is_true(assertion)
    }

    #[must_use]
    pub fn is_false(&self, assertion: Assertion) -> bool {
        self.evaluator().is_false(assertion)
    }

    pub fn assert_true(self, assertion: Assertion) -> Result<Self> {
        self.evaluator().assert_true(assertion)?;
        Ok(self)
    }

    pub fn assert_false(self, assertion: Assertion) -> Result<Self> {
        self.evaluator().assert_false(assertion)?;
        Ok(self)
    }

    pub fn assert_exists(self, asset: Asset) -> Result<Self> {
        self.evaluator().assert_exists(asset)?;
        Ok(self)
    }

    pub fn assert_equals(self, asset: Asset, expected: Option<&str>) -> Result<Self> {
        self.evaluator().assert_equals(asset, expected)?;
        Ok(self)
    }

    pub fn assert_matches(self, asset: Asset, pattern: &Pattern) -> Result<Self> {
        self.evaluator().assert_matches(asset, pattern)?;
        Ok(self)
    }

    pub fn assert_session_state(self, key: &str, check: &SessionCheck) -> Result<Self> {
        self.evaluator().assert_session_state(key, check)?;
        Ok(self)
    }

    /// Return to the session for the next request.
    pub fn done(self) -> &'s mut SessionActor<'t> {
        self.actor
    }
}
