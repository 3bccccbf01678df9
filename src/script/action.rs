//! Typed actions lowered from the generic script tree.
//!
//! Lowering classifies each list entry by shape:
//!
//! | entry                        | action                        |
//! |------------------------------|-------------------------------|
//! | text                         | [`Action::Assertion`]         |
//! | map with only scalar values  | one [`Action::Param`] per key |
//! | map with only list values    | one [`Action::Condition`] per key |
//! | list                         | [`Action::Sequence`]          |
//!
//! The keys `intent`, `utterance`, `launch`, `delay` and `request` are
//! reserved; any other key is a slot. A slot that shares a reserved name is
//! written with a `slot.` prefix (`slot.delay: 5`). `launch` only takes
//! `true`.
//!
//! Every name is resolved here, so a script that lowers cleanly can only
//! fail at run time because of what the skill answers.

use std::time::Duration;

use crate::error::{CheckError, Result};
use crate::evaluate::{Asset, Predicate};
use crate::protocol::RequestKind;

use super::node::ScriptNode;

/// A slot value: literal text, or an asset read from the previous response.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    Literal(String),
    Reference(Asset),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Intent(String),
    Utterance(String),
    Launch,
    Delay(Duration),
    /// Forces the request kind instead of the intent > utterance > launch order.
    Request(RequestKind),
    Slot(String, SlotValue),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Assertion(Predicate),
    Param(Param),
    Condition(Predicate, Node),
    Sequence(Node),
}

/// One lowered list: the request it fires plus what happens around it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub actions: Vec<Action>,
}

impl Node {
    /// Lower a list node. `marker` prefixes deferred slot references.
    pub fn lower(node: &ScriptNode, marker: char) -> Result<Self> {
        let ScriptNode::List(items) = node else {
            return Err(CheckError::Script(format!(
                "expected a list of actions, got {}",
                node.shape()
            )));
        };
        let mut actions = Vec::with_capacity(items.len());
        for item in items {
            lower_item(item, marker, &mut actions)?;
        }
        let lowered = Self { actions };
        lowered.validate_request()?;
        Ok(lowered)
    }

    pub fn params(&self) -> impl Iterator<Item = &Param> {
        self.actions.iter().filter_map(|action| match action {
            Action::Param(param) => Some(param),
            _ => None,
        })
    }

    /// The request kind this node fires, if any.
    #[must_use]
    pub fn request_kind(&self) -> Option<RequestKind> {
        let mut forced = None;
        let (mut intent, mut utterance, mut launch) = (false, false, false);
        for param in self.params() {
            match param {
                Param::Request(kind) => forced = Some(*kind),
                Param::Intent(_) => intent = true,
                Param::Utterance(_) => utterance = true,
                Param::Launch => launch = true,
                Param::Delay(_) | Param::Slot(..) => {}
            }
        }
        forced.or(if intent {
            Some(RequestKind::Intent)
        } else if utterance {
            Some(RequestKind::Utterance)
        } else if launch {
            Some(RequestKind::Launch)
        } else {
            None
        })
    }

    fn validate_request(&self) -> Result<()> {
        let has = |wanted: fn(&Param) -> bool| self.params().any(wanted);
        match self.request_kind() {
            Some(RequestKind::Intent) if !has(|p| matches!(p, Param::Intent(_))) => Err(
                CheckError::Script("request: intent needs an intent name".to_string()),
            ),
            Some(RequestKind::Utterance) if !has(|p| matches!(p, Param::Utterance(_))) => Err(
                CheckError::Script("request: utterance needs an utterance".to_string()),
            ),
            Some(RequestKind::Intent) => Ok(()),
            _ if has(|p| matches!(p, Param::Slot(..))) => Err(CheckError::Script(
                "slots given without an intent request".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

fn lower_item(item: &ScriptNode, marker: char, actions: &mut Vec<Action>) -> Result<()> {
    match item {
        ScriptNode::Text(text) => actions.push(Action::Assertion(Predicate::parse(text)?)),
        ScriptNode::List(_) => actions.push(Action::Sequence(Node::lower(item, marker)?)),
        ScriptNode::Map(entries) => {
            if entries.is_empty() {
                return Err(CheckError::Script("empty map in script".to_string()));
            }
            let lists = entries.iter().filter(|(_, value)| value.is_list()).count();
            if lists == entries.len() {
                for (key, body) in entries {
                    actions.push(Action::Condition(
                        Predicate::parse(key)?,
                        Node::lower(body, marker)?,
                    ));
                }
            } else if lists == 0 {
                for (key, value) in entries {
                    let Some(text) = value.as_text() else {
                        return Err(CheckError::Script(format!(
                            "parameter '{key}' must be a scalar, got {}",
                            value.shape()
                        )));
                    };
                    actions.push(Action::Param(lower_param(key, text, marker)?));
                }
            } else {
                let keys: Vec<&str> = entries.iter().map(|(key, _)| key.as_str()).collect();
                return Err(CheckError::Script(format!(
                    "map mixes parameters and conditions: {}",
                    keys.join(", ")
                )));
            }
        }
    }
    Ok(())
}

const SLOT_PREFIX: &str = "slot.";

fn lower_param(key: &str, value: &str, marker: char) -> Result<Param> {
    match key {
        "intent" => non_empty(key, value).map(|name| Param::Intent(name.to_string())),
        "utterance" => non_empty(key, value).map(|text| Param::Utterance(text.to_string())),
        "launch" => match value.trim() {
            "true" => Ok(Param::Launch),
            other => Err(CheckError::Script(format!(
                "launch only accepts true, got '{other}'"
            ))),
        },
        "delay" => parse_delay(value).map(Param::Delay),
        "request" => match value.trim() {
            "launch" => Ok(Param::Request(RequestKind::Launch)),
            "intent" => Ok(Param::Request(RequestKind::Intent)),
            "utterance" => Ok(Param::Request(RequestKind::Utterance)),
            other => Err(CheckError::Script(format!(
                "unknown request type '{other}' (expected launch|intent|utterance)"
            ))),
        },
        slot => {
            let name = slot.strip_prefix(SLOT_PREFIX).unwrap_or(slot);
            if name.is_empty() {
                return Err(CheckError::Script(format!("missing slot name in '{slot}'")));
            }
            Ok(Param::Slot(name.to_string(), lower_slot_value(value, marker)?))
        }
    }
}

fn lower_slot_value(value: &str, marker: char) -> Result<SlotValue> {
    let Some(name) = value.strip_prefix(marker) else {
        return Ok(SlotValue::Literal(value.to_string()));
    };
    Asset::from_name(name)
        .map(SlotValue::Reference)
        .ok_or_else(|| CheckError::Script(format!("unknown asset in reference '{value}'")))
}

fn non_empty<'v>(key: &str, value: &'v str) -> Result<&'v str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CheckError::Script(format!("'{key}' needs a value")));
    }
    Ok(value)
}

/// Milliseconds as a bare number, or a humantime string such as `1s 500ms`.
pub fn parse_delay(value: &str) -> Result<Duration> {
    let value = value.trim();
    if let Ok(millis) = value.parse::<u64>() {
        return Ok(Duration::from_millis(millis));
    }
    humantime::parse_duration(value)
        .map_err(|err| CheckError::Script(format!("invalid delay '{value}': {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::Assertion;
    use crate::test_utils::{TestCase, run_table_tests};

    fn lower(raw: &str) -> Result<Node> {
        let value: serde_yaml::Value = serde_yaml::from_str(raw).unwrap();
        Node::lower(&ScriptNode::from_yaml(&value)?, '$')
    }

    #[test]
    fn classifies_by_shape() {
        let node = lower(
            r"
- intent: Foo
  bar: 1
- HasOutputSpeech
- HasCard:
    - SimpleCardTitle == Hello
- - launch: true
",
        )
        .unwrap();
        assert_eq!(
            node.actions[0],
            Action::Param(Param::Intent("Foo".to_string()))
        );
        assert_eq!(
            node.actions[1],
            Action::Param(Param::Slot(
                "bar".to_string(),
                SlotValue::Literal("1".to_string())
            ))
        );
        assert_eq!(
            node.actions[2],
            Action::Assertion(Predicate::Assertion(Assertion::HasOutputSpeech))
        );
        assert!(matches!(
            &node.actions[3],
            Action::Condition(Predicate::Assertion(Assertion::HasCard), body) if body.actions.len() == 1
        ));
        assert!(matches!(&node.actions[4], Action::Sequence(_)));
        assert_eq!(node.request_kind(), Some(RequestKind::Intent));
    }

    #[test]
    fn mixed_map_is_rejected() {
        let err = lower("- intent: Foo\n  HasCard: [SessionEnded]\n").unwrap_err();
        assert!(err.to_string().contains("mixes"), "{err}");
    }

    #[test]
    fn request_priority_and_override() {
        assert_eq!(
            lower("- utterance: hi\n  launch: true\n").unwrap().request_kind(),
            Some(RequestKind::Utterance)
        );
        assert_eq!(
            lower("- intent: Foo\n  utterance: hi\n  request: utterance\n")
                .unwrap()
                .request_kind(),
            Some(RequestKind::Utterance)
        );
        assert_eq!(lower("- HasCard\n").unwrap().request_kind(), None);
    }

    #[test]
    fn invalid_parameters_fail_at_load() {
        for raw in [
            "- request: reboot\n",
            "- request: intent\n",
            "- delay: soon\n  launch: true\n",
            "- launch: true\n  city: Berlin\n",
            "- intent: Foo\n  city: $NoSuchAsset\n",
            "- intent: ''\n",
            "- launch: false\n",
            "- launch: yes please\n",
            "- intent: Foo\n  slot.: x\n",
            "- NotAnAssertion\n",
            "- {}\n",
            "HasCard\n",
        ] {
            assert!(
                matches!(lower(raw), Err(CheckError::Script(_))),
                "expected script error for {raw:?}"
            );
        }
    }

    #[test]
    fn prefixed_slots_may_use_reserved_names() {
        let node = lower("- intent: Timer\n  slot.delay: 5\n  slot.city: Berlin\n").unwrap();
        let slots: Vec<&Param> = node
            .params()
            .filter(|param| matches!(param, Param::Slot(..)))
            .collect();
        assert_eq!(
            slots,
            [
                &Param::Slot("delay".to_string(), SlotValue::Literal("5".to_string())),
                &Param::Slot("city".to_string(), SlotValue::Literal("Berlin".to_string())),
            ]
        );
        assert!(!node.params().any(|param| matches!(param, Param::Delay(_))));
    }

    #[test]
    fn references_use_the_marker() {
        let node = lower("- intent: Foo\n  title: $SimpleCard.Title\n  price: 5$\n").unwrap();
        let slots: Vec<&Param> = node
            .params()
            .filter(|param| matches!(param, Param::Slot(..)))
            .collect();
        assert_eq!(
            slots,
            [
                &Param::Slot(
                    "title".to_string(),
                    SlotValue::Reference(Asset::SimpleCardTitle)
                ),
                &Param::Slot("price".to_string(), SlotValue::Literal("5$".to_string())),
            ]
        );
    }

    #[test]
    fn delay_accepts_millis_and_humantime() {
        let cases = vec![
            TestCase {
                name: "bare millis",
                input: "200",
                expected: Some(Duration::from_millis(200)),
            },
            TestCase {
                name: "humantime",
                input: "1s 500ms",
                expected: Some(Duration::from_millis(1500)),
            },
            TestCase {
                name: "padded",
                input: " 2m ",
                expected: Some(Duration::from_secs(120)),
            },
            TestCase {
                name: "negative",
                input: "-5",
                expected: None,
            },
            TestCase {
                name: "words",
                input: "soon",
                expected: None,
            },
        ];
        run_table_tests(cases, |input| parse_delay(input).ok()).unwrap();
    }
}
