//! One-shot messages carried across a redirect in the cookie session.

use actix_session::Session;

const FLASH_KEY: &str = "flash";

pub fn set_flash(session: &Session, message: impl Into<String>) {
    if let Err(e) = session.insert(FLASH_KEY, message.into()) {
        log::error!("set_flash: {}", e);
    }
}

/// Reads and clears the pending message.
pub fn take_flash(session: &Session) -> Option<String> {
    match session.remove_as::<String>(FLASH_KEY) {
        Some(Ok(message)) => Some(message),
        Some(Err(raw)) => {
            log::warn!("take_flash: discarding malformed flash value {}", raw);
            None
        }
        None => None,
    }
}
