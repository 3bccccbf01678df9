//! Error taxonomy for skillcheck.
//!
//! Every error is fatal to the run that raised it. Nothing in the core
//! retries; the HTTPS transport's single auth refresh happens before an
//! error ever reaches this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    /// Invalid setup (config file, identity, closed-session policy, marker).
    #[error("configuration error: {0}")]
    Config(String),

    /// A request was not allowed in the current session state.
    #[error("session state error: {0}")]
    State(String),

    /// The skill answered with a missing or malformed payload.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An assertion or asset check failed against a response.
    #[error("validation failed: {check}{}", observed_suffix(.observed.as_deref()))]
    Validation {
        check: String,
        observed: Option<String>,
    },

    /// Unknown or malformed name in a script document.
    #[error("script error: {0}")]
    Script(String),

    /// A deferred slot value could not be looked up on the previous response.
    #[error("unresolved reference '{reference}': {reason}")]
    UnresolvedReference { reference: String, reason: String },

    /// Opaque failure reported by a transport implementation.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn observed_suffix(observed: Option<&str>) -> String {
    observed.map_or_else(String::new, |value| format!(" (observed: {value})"))
}

impl CheckError {
    /// Build a validation error for a named check.
    pub fn validation(check: impl Into<String>, observed: Option<String>) -> Self {
        Self::Validation {
            check: check.into(),
            observed,
        }
    }

    /// Stable machine-readable code used by robot output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration_error",
            Self::State(_) => "state_error",
            Self::Protocol(_) => "protocol_error",
            Self::Validation { .. } => "validation_error",
            Self::Script(_) => "script_error",
            Self::UnresolvedReference { .. } => "unresolved_reference_error",
            Self::Transport(_) => "transport_error",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Yaml(_) => "yaml_error",
            Self::Toml(_) => "toml_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
