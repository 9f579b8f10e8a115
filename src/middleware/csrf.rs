//! CSRF protection.
//!
//! One token is generated per cookie session and rendered into every form as
//! a hidden `csrf_token` field. POST handlers call `validate_csrf_token` (or
//! `validate_csrf_pairs` for forms bound as raw key/value pairs) before doing
//! any work.

use actix_web::{error, Error};
use rand::{distributions::Alphanumeric, Rng};

pub const CSRF_TOKEN_LENGTH: usize = 32;
pub const CSRF_FIELD: &str = "csrf_token";
const CSRF_SESSION_KEY: &str = "csrf_token";

pub fn generate_csrf_token() -> String {
    let mut rng = rand::thread_rng();
    (0..CSRF_TOKEN_LENGTH)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

/// Returns the session's token, creating one on first use.
pub fn get_or_create_csrf_token(session: &actix_session::Session) -> Result<String, Error> {
    if let Ok(Some(token)) = session.get::<String>(CSRF_SESSION_KEY) {
        return Ok(token);
    }
    let token = generate_csrf_token();
    session.insert(CSRF_SESSION_KEY, &token).map_err(|e| {
        log::error!("get_or_create_csrf_token: {}", e);
        error::ErrorInternalServerError("Could not start a form session.")
    })?;
    Ok(token)
}

pub fn validate_csrf_token(
    session: &actix_session::Session,
    provided_token: &str,
) -> Result<(), Error> {
    let stored = session
        .get::<String>(CSRF_SESSION_KEY)
        .map_err(|e| {
            log::error!("validate_csrf_token: {}", e);
            error::ErrorInternalServerError("Could not read the form session.")
        })?
        .ok_or_else(|| error::ErrorForbidden("This form has expired. Reload the page and try again."))?;

    if tokens_match(provided_token, &stored) {
        Ok(())
    } else {
        log::warn!("Rejected a form post with a mismatched CSRF token");
        Err(error::ErrorForbidden("This form has expired. Reload the page and try again."))
    }
}

/// Validates the `csrf_token` entry of a form bound as key/value pairs.
pub fn validate_csrf_pairs(
    session: &actix_session::Session,
    pairs: &[(String, String)],
) -> Result<(), Error> {
    let provided = pairs
        .iter()
        .find(|(k, _)| k == CSRF_FIELD)
        .map(|(_, v)| v.as_str())
        .unwrap_or("");
    validate_csrf_token(session, provided)
}

/// Compares without short-circuiting on the first differing byte.
fn tokens_match(a: &str, b: &str) -> bool {
    if a.len() != b.len() || a.is_empty() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_alphanumeric() {
        let token = generate_csrf_token();
        assert_eq!(token.len(), CSRF_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_csrf_token());
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abc", "abd"));
        assert!(!tokens_match("abc", "abcd"));
        assert!(!tokens_match("", ""));
    }
}
