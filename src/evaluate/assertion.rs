//! Closed vocabulary of whole-response predicates.

use std::fmt;
use std::str::FromStr;

use serde_json::{Value, json};

use crate::error::CheckError;
use crate::protocol::{Card, ClearBehavior, Directive, PlayBehavior, ResponseEnvelope, Speech};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Assertion {
    SessionEnded,
    SessionStillOpen,
    HasCard,
    HasCardIsSimple,
    HasCardIsStandard,
    HasCardIsLinkAccount,
    HasRepromptSpeech,
    HasRepromptSpeechIsSsml,
    HasRepromptSpeechIsPlainText,
    HasOutputSpeech,
    HasOutputSpeechIsSsml,
    HasOutputSpeechIsPlainText,
    HasDirective,
    HasDirectiveIsPlay,
    HasDirectiveIsPlayWithReplaceAll,
    HasDirectiveIsPlayWithEnqueue,
    HasDirectiveIsPlayWithReplaceEnqueued,
    HasDirectiveIsStop,
    HasDirectiveIsClearQueue,
    HasDirectiveIsClearQueueWithClearAll,
    HasDirectiveIsClearQueueWithClearEnqueued,
}

impl Assertion {
    pub const ALL: [Self; 21] = [
        Self::SessionEnded,
        Self::SessionStillOpen,
        Self::HasCard,
        Self::HasCardIsSimple,
        Self::HasCardIsStandard,
        Self::HasCardIsLinkAccount,
        Self::HasRepromptSpeech,
        Self::HasRepromptSpeechIsSsml,
        Self::HasRepromptSpeechIsPlainText,
        Self::HasOutputSpeech,
        Self::HasOutputSpeechIsSsml,
        Self::HasOutputSpeechIsPlainText,
        Self::HasDirective,
        Self::HasDirectiveIsPlay,
        Self::HasDirectiveIsPlayWithReplaceAll,
        Self::HasDirectiveIsPlayWithEnqueue,
        Self::HasDirectiveIsPlayWithReplaceEnqueued,
        Self::HasDirectiveIsStop,
        Self::HasDirectiveIsClearQueue,
        Self::HasDirectiveIsClearQueueWithClearAll,
        Self::HasDirectiveIsClearQueueWithClearEnqueued,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SessionEnded => "SessionEnded",
            Self::SessionStillOpen => "SessionStillOpen",
            Self::HasCard => "HasCard",
            Self::HasCardIsSimple => "HasCardIsSimple",
            Self::HasCardIsStandard => "HasCardIsStandard",
            Self::HasCardIsLinkAccount => "HasCardIsLinkAccount",
            Self::HasRepromptSpeech => "HasRepromptSpeech",
            Self::HasRepromptSpeechIsSsml => "HasRepromptSpeechIsSsml",
            Self::HasRepromptSpeechIsPlainText => "HasRepromptSpeechIsPlainText",
            Self::HasOutputSpeech => "HasOutputSpeech",
            Self::HasOutputSpeechIsSsml => "HasOutputSpeechIsSsml",
            Self::HasOutputSpeechIsPlainText => "HasOutputSpeechIsPlainText",
            Self::HasDirective => "HasDirective",
            Self::HasDirectiveIsPlay => "HasDirectiveIsPlay",
            Self::HasDirectiveIsPlayWithReplaceAll => "HasDirectiveIsPlayWithReplaceAll",
            Self::HasDirectiveIsPlayWithEnqueue => "HasDirectiveIsPlayWithEnqueue",
            Self::HasDirectiveIsPlayWithReplaceEnqueued => "HasDirectiveIsPlayWithReplaceEnqueued",
            Self::HasDirectiveIsStop => "HasDirectiveIsStop",
            Self::HasDirectiveIsClearQueue => "HasDirectiveIsClearQueue",
            Self::HasDirectiveIsClearQueueWithClearAll => "HasDirectiveIsClearQueueWithClearAll",
            Self::HasDirectiveIsClearQueueWithClearEnqueued => {
                "HasDirectiveIsClearQueueWithClearEnqueued"
            }
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    /// Evaluate against a response. Never fails.
    #[must_use]
    pub fn evaluate(self, response: &ResponseEnvelope) -> bool {
        let card = response.card();
        let directives = response.directives();
        match self {
            Self::SessionEnded => response.should_end_session() == Some(true),
            Self::SessionStillOpen => response.should_end_session() != Some(true),
            Self::HasCard => card.is_some(),
            Self::HasCardIsSimple => matches!(card, Some(Card::Simple { .. })),
            Self::HasCardIsStandard => matches!(card, Some(Card::Standard { .. })),
            Self::HasCardIsLinkAccount => matches!(card, Some(Card::LinkAccount { .. })),
            Self::HasRepromptSpeech => response.reprompt_speech().is_some(),
            Self::HasRepromptSpeechIsSsml => {
                matches!(response.reprompt_speech(), Some(Speech::Ssml { .. }))
            }
            Self::HasRepromptSpeechIsPlainText => {
                matches!(response.reprompt_speech(), Some(Speech::PlainText { .. }))
            }
            Self::HasOutputSpeech => response.output_speech().is_some(),
            Self::HasOutputSpeechIsSsml => {
                matches!(response.output_speech(), Some(Speech::Ssml { .. }))
            }
            Self::HasOutputSpeechIsPlainText => {
                matches!(response.output_speech(), Some(Speech::PlainText { .. }))
            }
            Self::HasDirective => !directives.is_empty(),
            Self::HasDirectiveIsPlay => response.play_directive().is_some(),
            Self::HasDirectiveIsPlayWithReplaceAll => has_play(directives, PlayBehavior::ReplaceAll),
            Self::HasDirectiveIsPlayWithEnqueue => has_play(directives, PlayBehavior::Enqueue),
            Self::HasDirectiveIsPlayWithReplaceEnqueued => {
                has_play(directives, PlayBehavior::ReplaceEnqueued)
            }
            Self::HasDirectiveIsStop => response.stop_directive().is_some(),
            Self::HasDirectiveIsClearQueue => response.clear_queue_directive().is_some(),
            Self::HasDirectiveIsClearQueueWithClearAll => {
                has_clear_queue(directives, ClearBehavior::ClearAll)
            }
            Self::HasDirectiveIsClearQueueWithClearEnqueued => {
                has_clear_queue(directives, ClearBehavior::ClearEnqueued)
            }
        }
    }

    /// The part of the response this assertion looks at, for error messages.
    #[must_use]
    pub fn observed(self, response: &ResponseEnvelope) -> String {
        let value = match self {
            Self::SessionEnded | Self::SessionStillOpen => json!(response.should_end_session()),
            Self::HasCard
            | Self::HasCardIsSimple
            | Self::HasCardIsStandard
            | Self::HasCardIsLinkAccount => json!(response.card()),
            Self::HasRepromptSpeech
            | Self::HasRepromptSpeechIsSsml
            | Self::HasRepromptSpeechIsPlainText => json!(response.reprompt_speech()),
            Self::HasOutputSpeech
            | Self::HasOutputSpeechIsSsml
            | Self::HasOutputSpeechIsPlainText => json!(response.output_speech()),
            _ => Value::Array(
                response
                    .directives()
                    .iter()
                    .map(|d| json!(d))
                    .collect(),
            ),
        };
        value.to_string()
    }
}

fn has_play(directives: &[Directive], behavior: PlayBehavior) -> bool {
    directives.iter().any(
        |d| matches!(d, Directive::Play { play_behavior, .. } if *play_behavior == behavior),
    )
}

fn has_clear_queue(directives: &[Directive], behavior: ClearBehavior) -> bool {
    directives.iter().any(
        |d| matches!(d, Directive::ClearQueue { clear_behavior } if *clear_behavior == behavior),
    )
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Assertion {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| CheckError::Script(format!("unknown assertion '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: Value) -> ResponseEnvelope {
        serde_json::from_value(json!({"version": "1.0", "response": body})).unwrap()
    }

    #[test]
    fn names_round_trip_through_lookup() {
        for assertion in Assertion::ALL {
            assert_eq!(Assertion::from_name(assertion.name()), Some(assertion));
        }
        assert!(Assertion::from_name("HasCards").is_none());
        assert!("hascard".parse::<Assertion>().is_err());
    }

    #[test]
    fn session_flags() {
        let ended = response(json!({"shouldEndSession": true}));
        let open = response(json!({"shouldEndSession": false}));
        let unset = response(json!({}));
        assert!(Assertion::SessionEnded.evaluate(&ended));
        assert!(!Assertion::SessionStillOpen.evaluate(&ended));
        assert!(Assertion::SessionStillOpen.evaluate(&open));
        assert!(Assertion::SessionStillOpen.evaluate(&unset));
        assert!(!Assertion::SessionEnded.evaluate(&unset));
    }

    #[test]
    fn card_variants() {
        let standard = response(json!({"card": {"type": "Standard", "title": "t", "text": "x"}}));
        assert!(Assertion::HasCard.evaluate(&standard));
        assert!(Assertion::HasCardIsStandard.evaluate(&standard));
        assert!(!Assertion::HasCardIsSimple.evaluate(&standard));
        assert!(!Assertion::HasCardIsLinkAccount.evaluate(&standard));

        let link = response(json!({"card": {"type": "LinkAccount"}}));
        assert!(Assertion::HasCardIsLinkAccount.evaluate(&link));
        assert!(!Assertion::HasCard.evaluate(&response(json!({}))));
    }

    #[test]
    fn speech_variants() {
        let r = response(json!({
            "outputSpeech": {"type": "PlainText", "text": "hello"},
            "reprompt": {"outputSpeech": {"type": "SSML", "ssml": "<speak>?</speak>"}}
        }));
        assert!(Assertion::HasOutputSpeechIsPlainText.evaluate(&r));
        assert!(!Assertion::HasOutputSpeechIsSsml.evaluate(&r));
        assert!(Assertion::HasRepromptSpeech.evaluate(&r));
        assert!(Assertion::HasRepromptSpeechIsSsml.evaluate(&r));
        assert!(!Assertion::HasRepromptSpeechIsPlainText.evaluate(&r));
    }

    #[test]
    fn clear_queue_behaviors() {
        let r = response(json!({
            "directives": [{"type": "AudioPlayer.ClearQueue", "clearBehavior": "CLEAR_ENQUEUED"}]
        }));
        assert!(Assertion::HasDirective.evaluate(&r));
        assert!(Assertion::HasDirectiveIsClearQueue.evaluate(&r));
        assert!(Assertion::HasDirectiveIsClearQueueWithClearEnqueued.evaluate(&r));
        assert!(!Assertion::HasDirectiveIsClearQueueWithClearAll.evaluate(&r));
        assert!(!Assertion::HasDirectiveIsStop.evaluate(&r));
        assert!(!Assertion::HasDirectiveIsPlay.evaluate(&r));
    }

    #[test]
    fn observed_reports_the_relevant_part() {
        let r = response(json!({"shouldEndSession": true}));
        assert_eq!(Assertion::SessionStillOpen.observed(&r), "true");
        assert_eq!(Assertion::HasCard.observed(&r), "null");
        assert_eq!(Assertion::HasDirective.observed(&r), "[]");
    }
}
