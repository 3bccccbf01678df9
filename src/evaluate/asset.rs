//! Closed vocabulary of named value locations inside a response.
//!
//! Assets form a tree: `StandardCardImageSmall` only exists when
//! `StandardCardImage` does, which only exists when the card is a
//! `Standard` card, and so on up to the root asset.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::CheckError;
use crate::protocol::{AudioItem, Card, CardImage, Directive, ResponseEnvelope, Speech, Stream};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
    Card,
    SimpleCard,
    SimpleCardTitle,
    SimpleCardContent,
    StandardCard,
    StandardCardTitle,
    StandardCardText,
    StandardCardImage,
    StandardCardImageSmall,
    StandardCardImageLarge,
    LinkAccountCard,
    LinkAccountCardTitle,
    OutputSpeech,
    OutputSpeechSsml,
    OutputSpeechPlainText,
    RepromptSpeech,
    RepromptSpeechSsml,
    RepromptSpeechPlainText,
    DirectivePlay,
    DirectivePlayBehavior,
    DirectivePlayAudioItem,
    DirectivePlayAudioItemStream,
    DirectivePlayAudioItemStreamUrl,
    DirectivePlayAudioItemStreamToken,
    DirectivePlayAudioItemStreamPreviousToken,
    DirectivePlayAudioItemStreamOffset,
    DirectiveStop,
    DirectiveClearQueue,
    DirectiveClearQueueBehavior,
}

impl Asset {
    pub const ALL: [Self; 29] = [
        Self::Card,
        Self::SimpleCard,
        Self::SimpleCardTitle,
        Self::SimpleCardContent,
        Self::StandardCard,
        Self::StandardCardTitle,
        Self::StandardCardText,
        Self::StandardCardImage,
        Self::StandardCardImageSmall,
        Self::StandardCardImageLarge,
        Self::LinkAccountCard,
        Self::LinkAccountCardTitle,
        Self::OutputSpeech,
        Self::OutputSpeechSsml,
        Self::OutputSpeechPlainText,
        Self::RepromptSpeech,
        Self::RepromptSpeechSsml,
        Self::RepromptSpeechPlainText,
        Self::DirectivePlay,
        Self::DirectivePlayBehavior,
        Self::DirectivePlayAudioItem,
        Self::DirectivePlayAudioItemStream,
        Self::DirectivePlayAudioItemStreamUrl,
        Self::DirectivePlayAudioItemStreamToken,
        Self::DirectivePlayAudioItemStreamPreviousToken,
        Self::DirectivePlayAudioItemStreamOffset,
        Self::DirectiveStop,
        Self::DirectiveClearQueue,
        Self::DirectiveClearQueueBehavior,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Card => "Card",
            Self::SimpleCard => "SimpleCard",
            Self::SimpleCardTitle => "SimpleCardTitle",
            Self::SimpleCardContent => "SimpleCardContent",
            Self::StandardCard => "StandardCard",
            Self::StandardCardTitle => "StandardCardTitle",
            Self::StandardCardText => "StandardCardText",
            Self::StandardCardImage => "StandardCardImage",
            Self::StandardCardImageSmall => "StandardCardImageSmall",
            Self::StandardCardImageLarge => "StandardCardImageLarge",
            Self::LinkAccountCard => "LinkAccountCard",
            Self::LinkAccountCardTitle => "LinkAccountCardTitle",
            Self::OutputSpeech => "OutputSpeech",
            Self::OutputSpeechSsml => "OutputSpeechSsml",
            Self::OutputSpeechPlainText => "OutputSpeechPlainText",
            Self::RepromptSpeech => "RepromptSpeech",
            Self::RepromptSpeechSsml => "RepromptSpeechSsml",
            Self::RepromptSpeechPlainText => "RepromptSpeechPlainText",
            Self::DirectivePlay => "DirectivePlay",
            Self::DirectivePlayBehavior => "DirectivePlayBehavior",
            Self::DirectivePlayAudioItem => "DirectivePlayAudioItem",
            Self::DirectivePlayAudioItemStream => "DirectivePlayAudioItemStream",
            Self::DirectivePlayAudioItemStreamUrl => "DirectivePlayAudioItemStreamUrl",
            Self::DirectivePlayAudioItemStreamToken => "DirectivePlayAudioItemStreamToken",
            Self::DirectivePlayAudioItemStreamPreviousToken => {
                "DirectivePlayAudioItemStreamPreviousToken"
            }
            Self::DirectivePlayAudioItemStreamOffset => "DirectivePlayAudioItemStreamOffset",
            Self::DirectiveStop => "DirectiveStop",
            Self::DirectiveClearQueue => "DirectiveClearQueue",
            Self::DirectiveClearQueueBehavior => "DirectiveClearQueueBehavior",
        }
    }

    /// Look up an asset by canonical name or dotted path
    /// (`StandardCard.Image.Small` is `StandardCardImageSmall`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let canonical: String = name.chars().filter(|c| *c != '.').collect();
        Self::ALL.into_iter().find(|a| a.name() == canonical)
    }

    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Card | Self::OutputSpeech | Self::RepromptSpeech => None,
            Self::DirectivePlay | Self::DirectiveStop | Self::DirectiveClearQueue => None,
            Self::SimpleCard | Self::StandardCard | Self::LinkAccountCard => Some(Self::Card),
            Self::SimpleCardTitle | Self::SimpleCardContent => Some(Self::SimpleCard),
            Self::StandardCardTitle | Self::StandardCardText | Self::StandardCardImage => {
                Some(Self::StandardCard)
            }
            Self::StandardCardImageSmall | Self::StandardCardImageLarge => {
                Some(Self::StandardCardImage)
            }
            Self::LinkAccountCardTitle => Some(Self::LinkAccountCard),
            Self::OutputSpeechSsml | Self::OutputSpeechPlainText => Some(Self::OutputSpeech),
            Self::RepromptSpeechSsml | Self::RepromptSpeechPlainText => Some(Self::RepromptSpeech),
            Self::DirectivePlayBehavior | Self::DirectivePlayAudioItem => Some(Self::DirectivePlay),
            Self::DirectivePlayAudioItemStream => Some(Self::DirectivePlayAudioItem),
            Self::DirectivePlayAudioItemStreamUrl
            | Self::DirectivePlayAudioItemStreamToken
            | Self::DirectivePlayAudioItemStreamPreviousToken
            | Self::DirectivePlayAudioItemStreamOffset => Some(Self::DirectivePlayAudioItemStream),
            Self::DirectiveClearQueueBehavior => Some(Self::DirectiveClearQueue),
        }
    }

    /// Resolve the asset's value, or `None` when it is absent.
    #[must_use]
    pub fn resolve(self, response: &ResponseEnvelope) -> Option<Value> {
        match self {
            Self::Card => response.card().and_then(to_json),
            Self::SimpleCard => simple_card(response).and_then(to_json),
            Self::SimpleCardTitle => match simple_card(response)? {
                Card::Simple { title, .. } => Some(text(title)),
                _ => None,
            },
            Self::SimpleCardContent => match simple_card(response)? {
                Card::Simple { content, .. } => Some(text(content)),
                _ => None,
            },
            Self::StandardCard => standard_card(response).and_then(to_json),
            Self::StandardCardTitle => match standard_card(response)? {
                Card::Standard { title, .. } => Some(text(title)),
                _ => None,
            },
            Self::StandardCardText => match standard_card(response)? {
                Card::Standard { text: body, .. } => Some(text(body)),
                _ => None,
            },
            Self::StandardCardImage => card_image(response).and_then(to_json),
            Self::StandardCardImageSmall => card_image(response)?.small_image_url.as_deref().map(text),
            Self::StandardCardImageLarge => card_image(response)?.large_image_url.as_deref().map(text),
            Self::LinkAccountCard => link_account_card(response).and_then(to_json),
            Self::LinkAccountCardTitle => match link_account_card(response)? {
                Card::LinkAccount { title } => title.as_deref().map(text),
                _ => None,
            },
            Self::OutputSpeech => response.output_speech().and_then(to_json),
            Self::OutputSpeechSsml => ssml(response.output_speech()),
            Self::OutputSpeechPlainText => plain_text(response.output_speech()),
            Self::RepromptSpeech => response.reprompt_speech().and_then(to_json),
            Self::RepromptSpeechSsml => ssml(response.reprompt_speech()),
            Self::RepromptSpeechPlainText => plain_text(response.reprompt_speech()),
            Self::DirectivePlay => response.play_directive().and_then(to_json),
            Self::DirectivePlayBehavior => match response.play_directive()? {
                Directive::Play { play_behavior, .. } => to_json(play_behavior),
                _ => None,
            },
            Self::DirectivePlayAudioItem => audio_item(response).and_then(to_json),
            Self::DirectivePlayAudioItemStream => stream(response).and_then(to_json),
            Self::DirectivePlayAudioItemStreamUrl => stream(response)?.url.as_deref().map(text),
            Self::DirectivePlayAudioItemStreamToken => {
                stream(response)?.token.as_deref().map(text)
            }
            Self::DirectivePlayAudioItemStreamPreviousToken => {
                stream(response)?.expected_previous_token.as_deref().map(text)
            }
            Self::DirectivePlayAudioItemStreamOffset => {
                stream(response).map(|s| Value::from(s.offset_in_milliseconds))
            }
            Self::DirectiveStop => response.stop_directive().and_then(to_json),
            Self::DirectiveClearQueue => response.clear_queue_directive().and_then(to_json),
            Self::DirectiveClearQueueBehavior => match response.clear_queue_directive()? {
                Directive::ClearQueue { clear_behavior } => to_json(clear_behavior),
                _ => None,
            },
        }
    }
}

fn to_json<T: Serialize>(value: T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

fn text(value: &str) -> Value {
    Value::String(value.to_string())
}

fn simple_card(response: &ResponseEnvelope) -> Option<&Card> {
    response.card().filter(|c| matches!(c, Card::Simple { .. }))
}

fn standard_card(response: &ResponseEnvelope) -> Option<&Card> {
    response.card().filter(|c| matches!(c, Card::Standard { .. }))
}

fn link_account_card(response: &ResponseEnvelope) -> Option<&Card> {
    response.card().filter(|c| matches!(c, Card::LinkAccount { .. }))
}

fn card_image(response: &ResponseEnvelope) -> Option<&CardImage> {
    match standard_card(response)? {
        Card::Standard { image, .. } => image.as_ref(),
        _ => None,
    }
}

fn ssml(speech: Option<&Speech>) -> Option<Value> {
    match speech? {
        Speech::Ssml { ssml } => Some(text(ssml)),
        Speech::PlainText { .. } => None,
    }
}

fn plain_text(speech: Option<&Speech>) -> Option<Value> {
    match speech? {
        Speech::PlainText { text: body } => Some(text(body)),
        Speech::Ssml { .. } => None,
    }
}

fn audio_item(response: &ResponseEnvelope) -> Option<&AudioItem> {
    match response.play_directive()? {
        Directive::Play { audio_item, .. } => audio_item.as_ref(),
        _ => None,
    }
}

fn stream(response: &ResponseEnvelope) -> Option<&Stream> {
    audio_item(response)?.stream.as_ref()
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Asset {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| CheckError::Script(format!("unknown asset '{s}'")))
    }
}
