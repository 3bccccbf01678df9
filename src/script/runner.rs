//! Script execution against a transport.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{CheckError, Result};
use crate::evaluate::{Evaluator, Predicate, value_text};
use crate::protocol::{Request, RequestKind, ResponseEnvelope, SessionEndedReason};
use crate::session::{ClosedSessionPolicy, Identity, SessionActor};
use crate::transport::Transport;

use super::Script;
use super::action::{Action, Node, Param, SlotValue};

/// Counters collected while a script runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub script: String,
    pub sessions: usize,
    pub requests: usize,
    pub checks: usize,
    pub conditions_taken: usize,
    pub conditions_skipped: usize,
}

/// Runs scripts; every session gets a fresh state machine over the same
/// identity and policy.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    identity: Identity,
    policy: ClosedSessionPolicy,
}

impl ScriptRunner {
    #[must_use]
    pub const fn new(identity: Identity, policy: ClosedSessionPolicy) -> Self {
        Self { identity, policy }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Identity::from_config(&config.identity)?,
            config.session.closed_policy,
        ))
    }

    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Run every session in order. The first failure aborts the run.
    pub fn execute_script(&self, script: &Script, transport: &mut dyn Transport) -> Result<RunReport> {
        let mut report = RunReport {
            script: script.name.clone(),
            ..RunReport::default()
        };
        for (index, session) in script.sessions.iter().enumerate() {
            debug!(script = %script.name, session = index + 1, "starting session");
            self.execute_session(session, transport, &mut report)?;
        }
        info!(
            script = %script.name,
            sessions = report.sessions,
            requests = report.requests,
            checks = report.checks,
            "script passed"
        );
        Ok(report)
    }

    /// Start a session, run `node`, then end the session as the user unless
    /// the skill already closed it.
    pub fn execute_session(
        &self,
        node: &Node,
        transport: &mut dyn Transport,
        report: &mut RunReport,
    ) -> Result<()> {
        let mut actor = SessionActor::new(self.identity.clone(), self.policy, transport);
        actor.start()?;
        let outcome = execute_action(&mut actor, node, report);
        report.requests += actor.requests_fired();
        outcome?;

        if actor.session().closed {
            debug!(session_id = %actor.session().id, "skill closed the session");
        } else {
            actor.end_session(SessionEndedReason::UserInitiated)?;
            report.requests += 1;
        }
        report.sessions += 1;
        Ok(())
    }
}

/// Run one node: fire its request (if it names one), check its assertions,
/// run the bodies of its true conditions, then its follow-up nodes.
pub fn execute_action(actor: &mut SessionActor<'_>, node: &Node, report: &mut RunReport) -> Result<()> {
    for param in node.params() {
        if let Param::Delay(duration) = param {
            actor.delay(*duration);
        }
    }
    if let Some(kind) = node.request_kind() {
        let request = build_request(node, kind, actor.last_response())?;
        actor.fire(request)?;
    }

    for action in &node.actions {
        if let Action::Assertion(predicate) = action {
            evaluator(actor, predicate)?.check(predicate)?;
            report.checks += 1;
        }
    }
    for action in &node.actions {
        if let Action::Condition(predicate, body) = action {
            if evaluator(actor, predicate)?.holds(predicate) {
                debug!(condition = %predicate, "condition holds");
                report.conditions_taken += 1;
                execute_action(actor, body, report)?;
            } else {
                debug!(condition = %predicate, "condition does not hold; skipping");
                report.conditions_skipped += 1;
            }
        }
    }
    for action in &node.actions {
        if let Action::Sequence(next) = action {
            execute_action(actor, next, report)?;
        }
    }
    Ok(())
}

fn evaluator<'a>(actor: &'a SessionActor<'_>, predicate: &Predicate) -> Result<Evaluator<'a>> {
    actor.last_response().map(Evaluator::new).ok_or_else(|| {
        CheckError::State(format!("no response to check '{predicate}' against"))
    })
}

fn build_request(node: &Node, kind: RequestKind, previous: Option<&ResponseEnvelope>) -> Result<Request> {
    match kind {
        RequestKind::Launch => Ok(Request::Launch),
        RequestKind::Utterance => node
            .params()
            .find_map(|param| match param {
                Param::Utterance(text) => Some(Request::Utterance { text: text.clone() }),
                _ => None,
            })
            .ok_or_else(|| CheckError::Script("utterance request without text".to_string())),
        RequestKind::Intent => {
            let name = node
                .params()
                .find_map(|param| match param {
                    Param::Intent(name) => Some(name.as_str()),
                    _ => None,
                })
                .ok_or_else(|| CheckError::Script("intent request without a name".to_string()))?;
            let mut slots = Vec::new();
            for param in node.params() {
                if let Param::Slot(key, value) = param {
                    slots.push((key.clone(), resolve(value, previous)?));
                }
            }
            Ok(Request::intent(name, slots))
        }
        RequestKind::SessionStarted | RequestKind::SessionEnded => Err(CheckError::Script(
            format!("{kind} cannot be sent from a script"),
        )),
    }
}

/// Resolve a slot value; references read the response before this request.
fn resolve(value: &SlotValue, previous: Option<&ResponseEnvelope>) -> Result<String> {
    match value {
        SlotValue::Literal(text) => Ok(text.clone()),
        SlotValue::Reference(asset) => {
            let Some(response) = previous else {
                return Err(CheckError::UnresolvedReference {
                    reference: asset.to_string(),
                    reason: "no previous response".to_string(),
                });
            };
            Evaluator::new(response)
                .value(*asset)
                .map(|value| value_text(&value))
                .ok_or_else(|| CheckError::UnresolvedReference {
                    reference: asset.to_string(),
                    reason: "asset absent from the previous response".to_string(),
                })
        }
    }
}
