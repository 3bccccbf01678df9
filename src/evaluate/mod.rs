//! Response evaluation
//!
//! Read-only checks over one parsed response envelope: the closed assertion
//! vocabulary, the asset tree, and the session-attribute family. The `is_*`
//! style methods never fail; the `assert_*` forms raise
//! [`CheckError::Validation`] naming the failed check and, where there is
//! one, the observed value.

mod assertion;
mod asset;
mod predicate;

pub use assertion::Assertion;
pub use asset::Asset;
pub use predicate::{Pattern, Predicate, SessionCheck};

use serde_json::{Map, Value};

use crate::error::{CheckError, Result};
use crate::protocol::ResponseEnvelope;

#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'r> {
    response: &'r ResponseEnvelope,
}

impl<'r> Evaluator<'r> {
    #[must_use]
    pub const fn new(response: &'r ResponseEnvelope) -> Self {
        Self { response }
    }

    #[must_use]
    pub const fn response(&self) -> &'r ResponseEnvelope {
        self.response
    }

    // Assertions

    #[must_use]
    pub fn is_true(&self, assertion: Assertion) -> bool {
        assertion.evaluate(self.response)
    }

    #[must_use]
    pub fn is_false(&self, assertion: Assertion) -> bool {
        !self.is_true(assertion)
    }

    pub fn assert_true(&self, assertion: Assertion) -> Result<()> {
        if self.is_true(assertion) {
            Ok(())
        } else {
            Err(CheckError::validation(
                assertion.name(),
                Some(assertion.observed(self.response)),
            ))
        }
    }

    pub fn assert_false(&self, assertion: Assertion) -> Result<()> {
        if self.is_false(assertion) {
            Ok(())
        } else {
            Err(CheckError::validation(
                format!("not {}", assertion.name()),
                Some(assertion.observed(self.response)),
            ))
        }
    }

    // Assets

    #[must_use]
    pub fn value(&self, asset: Asset) -> Option<Value> {
        asset.resolve(self.response)
    }

    #[must_use]
    pub fn exists(&self, asset: Asset) -> bool {
        self.value(asset).is_some()
    }

    /// Compare an asset with `expected`; `None` means "absent".
    ///
    /// Structured values compare as canonical JSON text, scalar leaves by
    /// value.
    #[must_use]
    pub fn equals(&self, asset: Asset, expected: Option<&str>) -> bool {
        match (self.value(asset), expected) {
            (None, None) => true,
            (Some(actual), Some(expected)) => value_equals(&actual, expected),
            _ => false,
        }
    }

    #[must_use]
    pub fn matches(&self, asset: Asset, pattern: &Pattern) -> bool {
        self.value(asset)
            .is_some_and(|actual| pattern.is_match(&value_text(&actual)))
    }

    pub fn assert_exists(&self, asset: Asset) -> Result<()> {
        if self.exists(asset) {
            Ok(())
        } else {
            Err(CheckError::validation(format!("exists({asset})"), None))
        }
    }

    pub fn assert_equals(&self, asset: Asset, expected: Option<&str>) -> Result<()> {
        if self.equals(asset, expected) {
            return Ok(());
        }
        Err(CheckError::validation(
            format!("equals({asset}, {})", expected.unwrap_or("null")),
            Some(self.observed(asset)),
        ))
    }

    pub fn assert_matches(&self, asset: Asset, pattern: &Pattern) -> Result<()> {
        if self.matches(asset, pattern) {
            return Ok(());
        }
        Err(CheckError::validation(
            format!("matches({asset}, {})", pattern.as_str()),
            Some(self.observed(asset)),
        ))
    }

    fn observed(&self, asset: Asset) -> String {
        self.value(asset)
            .map_or_else(|| "absent".to_string(), |v| value_text(&v))
    }

    // Session attributes

    #[must_use]
    pub fn session_attributes(&self) -> Option<&'r Map<String, Value>> {
        self.response.session_attributes()
    }

    /// Attribute value with a `{name, value}` slot shape unwrapped to `value`.
    #[must_use]
    pub fn session_state(&self, key: &str) -> Option<&'r Value> {
        let value = self.session_attributes()?.get(key)?;
        Some(unwrap_slot(value))
    }

    #[must_use]
    pub fn session_state_exists(&self, key: &str) -> bool {
        self.check_session_state(key, &SessionCheck::Exists)
    }

    #[must_use]
    pub fn session_state_not_null(&self, key: &str) -> bool {
        self.check_session_state(key, &SessionCheck::NotNull)
    }

    #[must_use]
    pub fn session_state_not_blank(&self, key: &str) -> bool {
        self.check_session_state(key, &SessionCheck::NotBlank)
    }

    #[must_use]
    pub fn session_state_equals(&self, key: &str, expected: &str) -> bool {
        self.check_session_state(key, &SessionCheck::Equals(expected.to_string()))
    }

    #[must_use]
    pub fn session_state_contains(&self, key: &str, needle: &str) -> bool {
        self.check_session_state(key, &SessionCheck::Contains(needle.to_string()))
    }

    #[must_use]
    pub fn session_state_matches(&self, key: &str, pattern: &Pattern) -> bool {
        self.check_session_state(key, &SessionCheck::Matches(pattern.clone()))
    }

    #[must_use]
    pub fn check_session_state(&self, key: &str, check: &SessionCheck) -> bool {
        let value = self.session_state(key);
        match check {
            SessionCheck::Exists => value.is_some(),
            SessionCheck::NotNull => value.is_some_and(|v| !v.is_null()),
            SessionCheck::NotBlank => value
                .filter(|v| !v.is_null())
                .is_some_and(|v| !value_text(v).trim().is_empty()),
            SessionCheck::Equals(expected) => value.is_some_and(|v| value_equals(v, expected)),
            SessionCheck::Contains(needle) => {
                value.is_some_and(|v| value_text(v).contains(needle.as_str()))
            }
            SessionCheck::Matches(pattern) => {
                value.is_some_and(|v| pattern.is_match(&value_text(v)))
            }
        }
    }

    pub fn assert_session_state(&self, key: &str, check: &SessionCheck) -> Result<()> {
        if self.check_session_state(key, check) {
            return Ok(());
        }
        let observed = self
            .session_state(key)
            .map_or_else(|| "absent".to_string(), value_text);
        Err(CheckError::validation(check.describe(key), Some(observed)))
    }

    // Predicates

    #[must_use]
    pub fn holds(&self, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Assertion(assertion) => self.is_true(*assertion),
            Predicate::AssetExists(asset) => self.exists(*asset),
            Predicate::AssetEquals(asset, expected) => self.equals(*asset, Some(expected)),
            Predicate::AssetMatches(asset, pattern) => self.matches(*asset, pattern),
            Predicate::SessionState(key, check) => self.check_session_state(key, check),
        }
    }

    pub fn check(&self, predicate: &Predicate) -> Result<()> {
        match predicate {
            Predicate::Assertion(assertion) => self.assert_true(*assertion),
            Predicate::AssetExists(asset) => self.assert_exists(*asset),
            Predicate::AssetEquals(asset, expected) => self.assert_equals(*asset, Some(expected)),
            Predicate::AssetMatches(asset, pattern) => self.assert_matches(*asset, pattern),
            Predicate::SessionState(key, check) => self.assert_session_state(key, check),
        }
    }
}

fn unwrap_slot(value: &Value) -> &Value {
    match value {
        Value::Object(map) if map.contains_key("name") && map.contains_key("value") => {
            &map["value"]
        }
        _ => value,
    }
}

/// Text form of a value: strings as-is, everything else as canonical JSON.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => canonical(other).to_string(),
    }
}

fn value_equals(actual: &Value, expected: &str) -> bool {
    match actual {
        Value::Object(_) | Value::Array(_) => {
            let expected = serde_json::from_str::<Value>(expected)
                .map_or_else(|_| expected.to_string(), |v| canonical(&v).to_string());
            value_text(actual) == expected
        }
        _ => value_text(actual) == expected,
    }
}

/// Rebuild a value with object keys in sorted order.
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonical(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}
