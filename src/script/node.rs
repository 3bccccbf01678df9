//! Generic script tree as parsed from YAML, before any meaning is assigned.

use serde_yaml::Value as Yaml;

use crate::error::{CheckError, Result};

/// One node of the untyped tree: text, an ordered map, or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptNode {
    Text(String),
    Map(Vec<(String, ScriptNode)>),
    List(Vec<ScriptNode>),
}

impl ScriptNode {
    /// Convert a YAML value. Scalars become text (`null` becomes empty text);
    /// map keys must be scalars; tagged values are rejected.
    pub fn from_yaml(value: &Yaml) -> Result<Self> {
        match value {
            Yaml::Sequence(items) => items
                .iter()
                .map(Self::from_yaml)
                .collect::<Result<_>>()
                .map(Self::List),
            Yaml::Mapping(mapping) => mapping
                .iter()
                .map(|(key, value)| {
                    let key = scalar_text(key).ok_or_else(|| {
                        CheckError::Script(format!("map keys must be scalars, got {key:?}"))
                    })?;
                    Ok((key, Self::from_yaml(value)?))
                })
                .collect::<Result<_>>()
                .map(Self::Map),
            Yaml::Tagged(tagged) => Err(CheckError::Script(format!(
                "tagged values are not supported: {}",
                tagged.tag
            ))),
            scalar => scalar_text(scalar)
                .map(Self::Text)
                .ok_or_else(|| CheckError::Script(format!("unsupported value {scalar:?}"))),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Short shape name for error messages.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Map(_) => "map",
            Self::List(_) => "list",
        }
    }
}

fn scalar_text(value: &Yaml) -> Option<String> {
    match value {
        Yaml::Null => Some(String::new()),
        Yaml::Bool(flag) => Some(flag.to_string()),
        Yaml::Number(number) => Some(number.to_string()),
        Yaml::String(text) => Some(text.clone()),
        _ => None,
    }
}
