//! Predicates combine the closed vocabularies into checkable statements.

use std::fmt;

use regex::Regex;

use crate::error::{CheckError, Result};

use super::{Assertion, Asset};

/// A regular expression that must match the whole text.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{source})$"))
            .map_err(|err| CheckError::Config(format!("invalid pattern {source:?}: {err}")))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// A check against one session attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCheck {
    Exists,
    NotNull,
    NotBlank,
    Equals(String),
    Contains(String),
    Matches(Pattern),
}

impl SessionCheck {
    /// Label naming the check and its key, e.g. `sessionStateEquals(bar, 1)`.
    #[must_use]
    pub fn describe(&self, key: &str) -> String {
        match self {
            Self::Exists => format!("sessionStateExists({key})"),
            Self::NotNull => format!("sessionStateNotNull({key})"),
            Self::NotBlank => format!("sessionStateNotBlank({key})"),
            Self::Equals(expected) => format!("sessionStateEquals({key}, {expected})"),
            Self::Contains(needle) => format!("sessionStateContains({key}, {needle})"),
            Self::Matches(pattern) => format!("sessionStateMatches({key}, {})", pattern.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Assertion(Assertion),
    AssetExists(Asset),
    AssetEquals(Asset, String),
    AssetMatches(Asset, Pattern),
    SessionState(String, SessionCheck),
}

const SESSION_PREFIX: &str = "session.";

impl Predicate {
    /// Parse the textual form used in scripts.
    ///
    /// Accepted: an assertion name, an asset name, `<Asset> == <text>`,
    /// `<Asset> =~ <regex>`, `session.<key>`, `session.<key> == <text>` and
    /// `session.<key> =~ <regex>`. Unknown names are script errors.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        // The leftmost operator wins, so a right-hand side may contain the other.
        let operator = [" == ", " =~ "]
            .into_iter()
            .filter_map(|op| text.find(op).map(|at| (at, op)))
            .min_by_key(|(at, _)| *at);
        if let Some((at, op)) = operator {
            let (lhs, rhs) = (&text[..at], text[at + op.len()..].trim());
            if op == " == " {
                let expected = unquote(rhs).to_string();
                return match session_key(lhs)? {
                    Some(key) => Ok(Self::SessionState(key, SessionCheck::Equals(expected))),
                    None => Ok(Self::AssetEquals(parse_asset(lhs)?, expected)),
                };
            }
            let pattern = Pattern::new(unquote(rhs))
                .map_err(|err| CheckError::Script(format!("in '{text}': {err}")))?;
            return match session_key(lhs)? {
                Some(key) => Ok(Self::SessionState(key, SessionCheck::Matches(pattern))),
                None => Ok(Self::AssetMatches(parse_asset(lhs)?, pattern)),
            };
        }
        if let Some(key) = session_key(text)? {
            return Ok(Self::SessionState(key, SessionCheck::Exists));
        }
        if let Some(assertion) = Assertion::from_name(text) {
            return Ok(Self::Assertion(assertion));
        }
        Asset::from_name(text).map(Self::AssetExists).ok_or_else(|| {
            CheckError::Script(format!("unknown assertion or asset '{text}'"))
        })
    }
}

fn session_key(lhs: &str) -> Result<Option<String>> {
    let Some(key) = lhs.trim().strip_prefix(SESSION_PREFIX) else {
        return Ok(None);
    };
    if key.is_empty() {
        return Err(CheckError::Script(format!("missing session attribute key in '{lhs}'")));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(CheckError::Script(format!(
            "session attribute key '{key}' contains whitespace"
        )));
    }
    Ok(Some(key.to_string()))
}

fn parse_asset(name: &str) -> Result<Asset> {
    name.trim().parse()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assertion(assertion) => write!(f, "{assertion}"),
            Self::AssetExists(asset) => write!(f, "{asset}"),
            Self::AssetEquals(asset, expected) => write!(f, "{asset} == {expected}"),
            Self::AssetMatches(asset, pattern) => write!(f, "{asset} =~ {}", pattern.as_str()),
            Self::SessionState(key, check) => f.write_str(&check.describe(key)),
        }
    }
}
