//! Identifier generation for sessions, requests, users and applications.

use rand::Rng;
use uuid::Uuid;

pub const SESSION_ID_PREFIX: &str = "SessionId.";
pub const REQUEST_ID_PREFIX: &str = "amzn1.echo-api.request.";
pub const USER_ID_PREFIX: &str = "amzn1.ask.account.";
pub const APPLICATION_ID_PREFIX: &str = "amzn1.ask.skill.";

/// Number of random characters following [`USER_ID_PREFIX`].
pub const USER_ID_SUFFIX_LEN: usize = 207;

const USER_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[must_use]
pub fn session_id() -> String {
    format!("{SESSION_ID_PREFIX}{}", Uuid::new_v4())
}

#[must_use]
pub fn request_id() -> String {
    format!("{REQUEST_ID_PREFIX}{}", Uuid::new_v4())
}

#[must_use]
pub fn application_id() -> String {
    format!("{APPLICATION_ID_PREFIX}{}", Uuid::new_v4())
}

#[must_use]
pub fn user_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..USER_ID_SUFFIX_LEN)
        .map(|_| char::from(USER_ID_ALPHABET[rng.random_range(0..USER_ID_ALPHABET.len())]))
        .collect();
    format!("{USER_ID_PREFIX}{suffix}")
}

/// `amzn1.ask.skill.` followed by a UUID.
#[must_use]
pub fn is_application_id(id: &str) -> bool {
    id.strip_prefix(APPLICATION_ID_PREFIX)
        .is_some_and(|rest| Uuid::parse_str(rest).is_ok())
}

/// `amzn1.ask.account.` followed by upper-case letters and digits.
#[must_use]
pub fn is_user_id(id: &str) -> bool {
    id.strip_prefix(USER_ID_PREFIX).is_some_and(|rest| {
        !rest.is_empty() && rest.bytes().all(|b| USER_ID_ALPHABET.contains(&b))
    })
}
