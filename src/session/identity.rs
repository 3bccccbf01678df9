//! Who is talking to the skill, and when.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

use crate::config::IdentityConfig;
use crate::error::{CheckError, Result};
use crate::protocol::{Application, User, ids};

/// Largest clock shift accepted from configuration: one hundred years.
pub const MAX_TIMESTAMP_OFFSET_SECS: i64 = 100 * 366 * 24 * 60 * 60;

/// Convert a configured offset, rejecting shifts outside
/// [`MAX_TIMESTAMP_OFFSET_SECS`].
pub fn timestamp_offset(secs: i64) -> Result<TimeDelta> {
    TimeDelta::try_seconds(secs)
        .filter(|_| secs.unsigned_abs() <= MAX_TIMESTAMP_OFFSET_SECS.unsigned_abs())
        .ok_or_else(|| CheckError::Config(format!("timestamp offset out of range: {secs}s")))
}

/// Application, user and locale shared by every session of a run.
///
/// The virtual clock is the wall clock shifted by an offset fixed when the
/// identity is built, so scripted runs can pretend to happen at another time.
#[derive(Debug, Clone)]
pub struct Identity {
    pub application_id: String,
    pub user_id: String,
    pub access_token: Option<String>,
    pub locale: String,
    timestamp_offset: TimeDelta,
}

impl Identity {
    /// Identity with freshly generated ids, `en-US`, and no clock offset.
    #[must_use]
    pub fn generated() -> Self {
        Self {
            application_id: ids::application_id(),
            user_id: ids::user_id(),
            access_token: None,
            locale: "en-US".to_string(),
            timestamp_offset: TimeDelta::zero(),
        }
    }

    /// Build from config, generating any id the config leaves unset.
    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        let timestamp_offset = timestamp_offset(config.timestamp_offset_secs)?;
        Ok(Self {
            application_id: config
                .application_id
                .clone()
                .unwrap_or_else(ids::application_id),
            user_id: config.user_id.clone().unwrap_or_else(ids::user_id),
            access_token: config.access_token.clone(),
            locale: config.locale.clone(),
            timestamp_offset,
        })
    }

    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    #[must_use]
    pub const fn with_timestamp_offset(mut self, offset: TimeDelta) -> Self {
        self.timestamp_offset = offset;
        self
    }

    #[must_use]
    pub const fn timestamp_offset(&self) -> TimeDelta {
        self.timestamp_offset
    }

    /// Current virtual time.
    pub fn now(&self) -> Result<DateTime<Utc>> {
        Utc::now()
            .checked_add_signed(self.timestamp_offset)
            .ok_or_else(|| {
                CheckError::Config(format!(
                    "virtual clock out of range (offset {}s)",
                    self.timestamp_offset.num_seconds()
                ))
            })
    }

    /// Current virtual time in the wire format (`2024-01-01T12:00:00Z`).
    pub fn timestamp(&self) -> Result<String> {
        Ok(self.now()?.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub(crate) fn application(&self) -> Application {
        Application {
            application_id: self.application_id.clone(),
        }
    }

    pub(crate) fn user(&self) -> User {
        User {
            user_id: self.user_id.clone(),
            access_token: self.access_token.clone(),
        }
    }
}
