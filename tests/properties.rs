mod common;

use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::{Map, Value, json};
use skillcheck::CheckError;
use skillcheck::evaluate::{Assertion, Asset, Evaluator, Pattern};
use skillcheck::protocol::ResponseEnvelope;
use skillcheck::session::{ClosedSessionPolicy, Identity, SessionActor};

use common::{new_log, scripted_skill};

fn response_strategy() -> impl Strategy<Value = Value> {
    let end = prop::option::of(any::<bool>());
    let card = prop_oneof![
        Just(Value::Null),
        "[a-z ]{0,12}".prop_map(|title| json!({"type": "Simple", "title": title, "content": "c"})),
        "[a-z ]{0,12}".prop_map(|title| json!({"type": "LinkAccount", "title": title})),
    ];
    let directive = prop_oneof![
        Just(json!({"type": "AudioPlayer.Stop"})),
        Just(json!({"type": "AudioPlayer.ClearQueue", "clearBehavior": "CLEAR_ALL"})),
        Just(json!({"type": "AudioPlayer.Play", "playBehavior": "ENQUEUE"})),
        Just(json!({"type": "Display.RenderTemplate"})),
    ];
    (end, card, prop::collection::vec(directive, 0..3)).prop_map(|(end, card, directives)| {
        let mut body = Map::new();
        if let Some(end) = end {
            body.insert("shouldEndSession".to_string(), json!(end));
        }
        if !card.is_null() {
            body.insert("card".to_string(), card);
        }
        body.insert("directives".to_string(), Value::Array(directives));
        json!({"version": "1.0", "response": body})
    })
}

proptest! {
    #[test]
    fn assertions_are_idempotent(raw in response_strategy()) {
        let response: ResponseEnvelope = serde_json::from_value(raw).unwrap();
        let evaluator = Evaluator::new(&response);
        for assertion in Assertion::ALL {
            let first = evaluator.is_true(assertion);
            prop_assert_eq!(evaluator.is_true(assertion), first);
            prop_assert_eq!(evaluator.is_false(assertion), !first);
        }
    }

    #[test]
    fn session_flags_are_complementary(raw in response_strategy()) {
        let response: ResponseEnvelope = serde_json::from_value(raw).unwrap();
        let evaluator = Evaluator::new(&response);
        prop_assert_ne!(
            evaluator.is_true(Assertion::SessionEnded),
            evaluator.is_true(Assertion::SessionStillOpen)
        );
    }

    #[test]
    fn child_assets_imply_parents(raw in response_strategy()) {
        let response: ResponseEnvelope = serde_json::from_value(raw).unwrap();
        let evaluator = Evaluator::new(&response);
        for asset in Asset::ALL {
            if let Some(parent) = asset.parent() {
                if evaluator.exists(asset) {
                    prop_assert!(evaluator.exists(parent), "{} without {}", asset, parent);
                }
            }
        }
    }

    #[test]
    fn attributes_round_trip_exactly(
        first in prop::collection::btree_map("[a-z]{1,6}", "[a-zA-Z0-9 ]{0,8}", 0..5),
        second in prop::collection::btree_map("[a-z]{1,6}", "[a-zA-Z0-9 ]{0,8}", 0..5),
    ) {
        let to_map = |attrs: &BTreeMap<String, String>| -> Map<String, Value> {
            attrs.iter().map(|(k, v)| (k.clone(), json!(v))).collect()
        };
        let log = new_log();
        let mut transport = scripted_skill(
            &log,
            vec![
                json!({"sessionAttributes": to_map(&first), "response": {}}),
                json!({"sessionAttributes": to_map(&second), "response": {}}),
            ],
        );
        let mut actor = SessionActor::new(
            Identity::generated(),
            ClosedSessionPolicy::default(),
            &mut transport,
        );
        actor.start().unwrap();
        actor.launch().unwrap().done();
        actor.launch().unwrap().done();
        actor.launch().unwrap().done();

        let envelopes = log.borrow();
        prop_assert_eq!(&envelopes[2].session.attributes, &to_map(&first));
        prop_assert_eq!(&envelopes[3].session.attributes, &to_map(&second));
        prop_assert!(envelopes[1..].iter().all(|envelope| !envelope.session.new));
    }

    #[test]
    fn patterns_match_whole_text(text in "[a-zA-Z0-9 ]{0,16}", suffix in "[a-z]{1,4}") {
        let pattern = Pattern::new(&regex::escape(&text)).unwrap();
        prop_assert!(pattern.is_match(&text));
        let extended = format!("{text}{suffix}");
        prop_assert!(!pattern.is_match(&extended));
    }

    #[test]
    fn closed_sessions_reject_intents(title in "[a-z]{1,8}") {
        let log = new_log();
        let mut transport = scripted_skill(
            &log,
            vec![json!({"response": {"shouldEndSession": true, "card": {"type": "LinkAccount", "title": title}}})],
        );
        let mut actor = SessionActor::new(
            Identity::generated(),
            ClosedSessionPolicy::default(),
            &mut transport,
        );
        actor.start().unwrap();
        actor.launch().unwrap().done();
        let rejected = matches!(
            actor.intent("Any", Vec::<(String, String)>::new()),
            Err(CheckError::State(_))
        );
        prop_assert!(rejected);
        prop_assert_eq!(log.borrow().len(), 2);
    }
}
