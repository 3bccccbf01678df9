//! Conversation scripts
//!
//! A script is a YAML document:
//!
//! ```yaml
//! name: greeting
//! description: launch, ask, stop
//! tags: [smoke]
//! sessions:
//!   - - launch: true
//!     - HasOutputSpeechIsSsml
//!     - HasCard:
//!         - SimpleCardTitle == Welcome
//!     - - intent: AskIntent
//!         topic: $SimpleCard.Title
//!       - session.topic == Welcome
//! ```
//!
//! Loading parses the YAML into a [`ScriptNode`] tree and lowers each
//! session into typed [`Action`]s; unknown names fail here, not mid-run.

mod action;
mod node;
mod runner;

pub use action::{Action, Node, Param, SlotValue, parse_delay};
pub use node::ScriptNode;
pub use runner::{RunReport, ScriptRunner, execute_action};

use std::path::Path;

use serde::Deserialize;

use crate::error::{CheckError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScript {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    sessions: Vec<serde_yaml::Value>,
}

/// A loaded, fully lowered script.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub sessions: Vec<Node>,
}

impl Script {
    /// Parse and lower a YAML script. `marker` prefixes deferred references.
    pub fn parse(raw: &str, marker: char) -> Result<Self> {
        let raw: RawScript = serde_yaml::from_str(raw)?;
        if raw.name.trim().is_empty() {
            return Err(CheckError::Script("script name is empty".to_string()));
        }
        if raw.sessions.is_empty() {
            return Err(CheckError::Script(format!(
                "script '{}' has no sessions",
                raw.name
            )));
        }
        let sessions = raw
            .sessions
            .iter()
            .enumerate()
            .map(|(index, session)| {
                ScriptNode::from_yaml(session)
                    .and_then(|node| Node::lower(&node, marker))
                    .map_err(|err| match err {
                        CheckError::Script(msg) => {
                            CheckError::Script(format!("session {}: {msg}", index + 1))
                        }
                        other => other,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: raw.name,
            description: raw.description,
            tags: raw.tags,
            sessions,
        })
    }

    pub fn from_file(path: &Path, marker: char) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            CheckError::Script(format!("failed to read script {}: {err}", path.display()))
        })?;
        Self::parse(&raw, marker)
    }
}
