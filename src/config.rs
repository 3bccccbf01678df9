use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CheckError, Result};
use crate::protocol::ids;
use crate::session::{self, ClosedSessionPolicy};

pub const CONFIG_FILE_NAME: &str = "skillcheck.toml";

static LOCALE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}-[A-Z]{2}$").expect("locale regex"));

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

impl Config {
    /// Load defaults, then the global and project files (or only the explicit
    /// one), then `SKILLCHECK_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>, project_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("SKILLCHECK_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            match Self::load_patch(&path)? {
                Some(patch) => config.merge_patch(patch),
                None => {
                    return Err(CheckError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_patch(&project_root.join(CONFIG_FILE_NAME))? {
                config.merge_patch(project);
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a single TOML document on top of the defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let patch: ConfigPatch = toml::from_str(raw)
            .map_err(|err| CheckError::Config(format!("parse config: {err}")))?;
        let mut config = Self::default();
        config.merge_patch(patch);
        config.validate()?;
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("skillcheck/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| CheckError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| CheckError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.identity {
            self.identity.merge(patch);
        }
        if let Some(patch) = patch.session {
            self.session.merge(patch);
        }
        if let Some(patch) = patch.script {
            self.script.merge(patch);
        }
        if let Some(patch) = patch.transport {
            self.transport.merge(patch);
        }
    }

    /// Apply `SKILLCHECK_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SKILLCHECK_APPLICATION_ID") {
            self.identity.application_id = Some(value);
        }
        if let Some(value) = lookup("SKILLCHECK_USER_ID") {
            self.identity.user_id = Some(value);
        }
        if let Some(value) = lookup("SKILLCHECK_ACCESS_TOKEN") {
            self.identity.access_token = Some(value);
        }
        if let Some(value) = lookup("SKILLCHECK_LOCALE") {
            self.identity.locale = value;
        }
        if let Some(value) = lookup("SKILLCHECK_TIMESTAMP_OFFSET_SECS") {
            self.identity.timestamp_offset_secs = value.parse::<i64>().map_err(|err| {
                CheckError::Config(format!(
                    "invalid SKILLCHECK_TIMESTAMP_OFFSET_SECS value {value}: {err}"
                ))
            })?;
        }

        if let Some(value) = lookup("SKILLCHECK_CLOSED_POLICY") {
            self.session.closed_policy = value.parse()?;
        }

        if let Some(value) = lookup("SKILLCHECK_REFERENCE_MARKER") {
            self.script.reference_marker = parse_marker(&value)?;
        }

        if let Some(value) = lookup("SKILLCHECK_ENDPOINT") {
            self.transport.endpoint = Some(value);
        }
        if let Some(value) = lookup("SKILLCHECK_TIMEOUT") {
            self.transport.timeout = humantime::parse_duration(&value).map_err(|err| {
                CheckError::Config(format!("invalid SKILLCHECK_TIMEOUT value {value}: {err}"))
            })?;
        }
        if let Some(value) = lookup("SKILLCHECK_OAUTH_REFRESH_TOKEN") {
            self.transport
                .oauth
                .get_or_insert_with(OAuthConfig::default)
                .refresh_token = value;
        }
        if let Some(value) = lookup("SKILLCHECK_OAUTH_CLIENT_SECRET") {
            self.transport
                .oauth
                .get_or_insert_with(OAuthConfig::default)
                .client_secret = value;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.identity.validate()?;
        self.script.validate()?;
        self.transport.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Generated per run when unset.
    #[serde(default)]
    pub application_id: Option<String>,
    /// Generated per run when unset.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Added to the wall clock when stamping requests.
    #[serde(default)]
    pub timestamp_offset_secs: i64,
}

fn default_locale() -> String {
    "en-US".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            application_id: None,
            user_id: None,
            access_token: None,
            locale: default_locale(),
            timestamp_offset_secs: 0,
        }
    }
}

impl IdentityConfig {
    fn merge(&mut self, patch: IdentityPatch) {
        if let Some(value) = patch.application_id {
            self.application_id = Some(value);
        }
        if let Some(value) = patch.user_id {
            self.user_id = Some(value);
        }
        if let Some(value) = patch.access_token {
            self.access_token = Some(value);
        }
        if let Some(value) = patch.locale {
            self.locale = value;
        }
        if let Some(value) = patch.timestamp_offset_secs {
            self.timestamp_offset_secs = value;
        }
    }

    fn validate(&self) -> Result<()> {
        if !LOCALE_RE.is_match(&self.locale) {
            return Err(CheckError::Config(format!(
                "invalid locale {:?} (expected ll-CC, e.g. en-US)",
                self.locale
            )));
        }
        for (field, value) in [
            ("application_id", &self.application_id),
            ("user_id", &self.user_id),
            ("access_token", &self.access_token),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(CheckError::Config(format!("identity.{field} is empty")));
            }
        }
        if let Some(id) = self.application_id.as_deref().filter(|id| !ids::is_application_id(id)) {
            return Err(CheckError::Config(format!(
                "identity.application_id {id:?} is not {}<uuid>",
                ids::APPLICATION_ID_PREFIX
            )));
        }
        if let Some(id) = self.user_id.as_deref().filter(|id| !ids::is_user_id(id)) {
            return Err(CheckError::Config(format!(
                "identity.user_id {id:?} is not {}[A-Z0-9]+",
                ids::USER_ID_PREFIX
            )));
        }
        session::timestamp_offset(self.timestamp_offset_secs)
            .map_err(|_| {
                CheckError::Config(format!(
                    "identity.timestamp_offset_secs out of range: {} (limit ±{})",
                    self.timestamp_offset_secs,
                    session::MAX_TIMESTAMP_OFFSET_SECS
                ))
            })
            .map(drop)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub closed_policy: ClosedSessionPolicy,
}

impl SessionConfig {
    fn merge(&mut self, patch: SessionPatch) {
        if let Some(value) = patch.closed_policy {
            self.closed_policy = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Slot values starting with this character are looked up as assets on
    /// the previous response.
    #[serde(default = "default_marker")]
    pub reference_marker: char,
}

const fn default_marker() -> char {
    '$'
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            reference_marker: default_marker(),
        }
    }
}

impl ScriptConfig {
    fn merge(&mut self, patch: ScriptPatch) {
        if let Some(value) = patch.reference_marker {
            self.reference_marker = value;
        }
    }

    fn validate(&self) -> Result<()> {
        let marker = self.reference_marker;
        if marker.is_alphanumeric() || marker.is_whitespace() {
            return Err(CheckError::Config(format!(
                "script.reference_marker must be a symbol, got {marker:?}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default)]
    pub oauth: Option<OAuthConfig>,
}

const fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: default_timeout(),
            oauth: None,
        }
    }
}

impl TransportConfig {
    fn merge(&mut self, patch: TransportPatch) {
        if let Some(value) = patch.endpoint {
            self.endpoint = Some(value);
        }
        if let Some(value) = patch.timeout {
            self.timeout = value;
        }
        if let Some(value) = patch.oauth {
            self.oauth = Some(value);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(CheckError::Config("transport.timeout must be positive".to_string()));
        }
        if let Some(oauth) = &self.oauth {
            for (field, value) in [
                ("token_url", &oauth.token_url),
                ("client_id", &oauth.client_id),
                ("client_secret", &oauth.client_secret),
                ("refresh_token", &oauth.refresh_token),
            ] {
                if value.trim().is_empty() {
                    return Err(CheckError::Config(format!(
                        "transport.oauth.{field} is empty"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub token_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub identity: Option<IdentityPatch>,
    pub session: Option<SessionPatch>,
    pub script: Option<ScriptPatch>,
    pub transport: Option<TransportPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IdentityPatch {
    pub application_id: Option<String>,
    pub user_id: Option<String>,
    pub access_token: Option<String>,
    pub locale: Option<String>,
    pub timestamp_offset_secs: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SessionPatch {
    pub closed_policy: Option<ClosedSessionPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ScriptPatch {
    pub reference_marker: Option<char>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TransportPatch {
    pub endpoint: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub oauth: Option<OAuthConfig>,
}

fn parse_marker(value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(marker), None) => Ok(marker),
        _ => Err(CheckError::Config(format!(
            "reference marker must be exactly one character, got {value:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.identity.locale, "en-US");
        assert_eq!(config.script.reference_marker, '$');
        assert_eq!(config.session.closed_policy, ClosedSessionPolicy::AllowSessionEnded);
        assert_eq!(config.transport.timeout, Duration::from_secs(10));
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = Config::from_toml_str(
            r#"
[identity]
locale = "de-DE"
timestamp_offset_secs = -3600

[session]
closed_policy = "reject_all"

[script]
reference_marker = "@"

[transport]
endpoint = "https://skill.example.com/"
timeout = "2s"
"#,
        )
        .unwrap();
        assert_eq!(config.identity.locale, "de-DE");
        assert_eq!(config.identity.timestamp_offset_secs, -3600);
        assert_eq!(config.session.closed_policy, ClosedSessionPolicy::RejectAll);
        assert_eq!(config.script.reference_marker, '@');
        assert_eq!(config.transport.timeout, Duration::from_secs(2));
        assert_eq!(
            config.transport.endpoint.as_deref(),
            Some("https://skill.example.com/")
        );
    }

    #[test]
    fn invalid_locale_is_rejected() {
        let err = Config::from_toml_str("[identity]\nlocale = \"english\"\n").unwrap_err();
        assert!(matches!(err, CheckError::Config(_)));
        assert!(err.to_string().contains("locale"));
    }

    #[test]
    fn malformed_ids_are_rejected() {
        let err = Config::from_toml_str("[identity]\napplication_id = \"garbage\"\n").unwrap_err();
        assert!(matches!(err, CheckError::Config(_)));
        assert!(err.to_string().contains("application_id"), "{err}");

        let err = Config::from_toml_str("[identity]\nuser_id = \"amzn1.ask.account.lower\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("user_id"), "{err}");

        let config = Config::from_toml_str(
            "[identity]\napplication_id = \"amzn1.ask.skill.6f1c2b0e-3a4d-4e5f-8a9b-0c1d2e3f4a5b\"\nuser_id = \"amzn1.ask.account.ABC123\"\n",
        )
        .unwrap();
        assert_eq!(config.identity.user_id.as_deref(), Some("amzn1.ask.account.ABC123"));
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let err = Config::from_toml_str("[identity]\ntimestamp_offset_secs = 10000000000000\n")
            .unwrap_err();
        assert!(matches!(err, CheckError::Config(_)));
        assert!(err.to_string().contains("timestamp_offset_secs"), "{err}");
    }

    #[test]
    fn alphanumeric_marker_is_rejected() {
        let err = Config::from_toml_str("[script]\nreference_marker = \"x\"\n").unwrap_err();
        assert!(err.to_string().contains("reference_marker"));
    }

    #[test]
    fn incomplete_oauth_is_rejected() {
        let err = Config::from_toml_str(
            "[transport.oauth]\ntoken_url = \"https://auth\"\nclient_id = \"id\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("transport.oauth.client_secret"));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("SKILLCHECK_LOCALE", "en-GB"),
            ("SKILLCHECK_CLOSED_POLICY", "allow_launch_and_session_ended"),
            ("SKILLCHECK_REFERENCE_MARKER", "#"),
            ("SKILLCHECK_TIMEOUT", "500ms"),
            ("SKILLCHECK_TIMESTAMP_OFFSET_SECS", "60"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(ToString::to_string))
            .unwrap();
        assert_eq!(config.identity.locale, "en-GB");
        assert_eq!(
            config.session.closed_policy,
            ClosedSessionPolicy::AllowLaunchAndSessionEnded
        );
        assert_eq!(config.script.reference_marker, '#');
        assert_eq!(config.transport.timeout, Duration::from_millis(500));
        assert_eq!(config.identity.timestamp_offset_secs, 60);
    }

    #[test]
    fn bad_env_values_are_config_errors() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|key| (key == "SKILLCHECK_REFERENCE_MARKER").then(|| "$$".to_string()))
            .unwrap_err();
        assert!(matches!(err, CheckError::Config(_)));

        let err = config
            .apply_overrides(|key| (key == "SKILLCHECK_CLOSED_POLICY").then(|| "sometimes".to_string()))
            .unwrap_err();
        assert!(matches!(err, CheckError::Config(_)));
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[identity]\nlocale = \"fr-FR\"\n").unwrap();
        let config = Config::load(Some(&path), dir.path()).unwrap();
        assert_eq!(config.identity.locale, "fr-FR");
    }

    #[test]
    fn load_rejects_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = Config::load(Some(&missing), dir.path()).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
