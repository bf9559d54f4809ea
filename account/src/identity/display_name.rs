//! Display names and the strings used to complain about them.
//!
//! Names come from two places: typed by the user during onboarding, or
//! recovered from a configuration message when a device is linked. Both go
//! through [`validate_display_name`] before they reach the self-conversation.
//!
//! User-facing messages are looked up through a [`Localizer`] handed in by
//! the caller, so this crate never needs to know which language the UI speaks.

use thiserror::Error;

use crate::config::MAX_NAME_LENGTH_BYTES;

/// Lookup key for the "name is empty" message.
pub const DISPLAY_NAME_EMPTY_KEY: &str = "displayNameEmpty";

/// Lookup key for the "name is too long" message.
pub const DISPLAY_NAME_TOO_LONG_KEY: &str = "displayNameErrorDescriptionShorter";

/// Looks up user-facing strings by key.
pub trait Localizer: Send + Sync {
    /// Localized text for `key`. Unknown keys should return something
    /// printable rather than fail.
    fn lookup(&self, key: &str) -> String;
}

/// Built-in English strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishStrings;

impl Localizer for EnglishStrings {
    fn lookup(&self, key: &str) -> String {
        match key {
            DISPLAY_NAME_EMPTY_KEY => "Please enter a display name".to_string(),
            DISPLAY_NAME_TOO_LONG_KEY => "Please enter a shorter display name".to_string(),
            other => other.to_string(),
        }
    }
}

/// Why a display name was refused. `message` is already localized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayNameError {
    #[error("{message}")]
    Empty { message: String },

    #[error("{message}")]
    TooLong { message: String, bytes: usize },
}

/// Strip characters that render as nothing or reorder surrounding text:
/// control characters, zero-width characters and bidi overrides.
pub fn sanitize_display_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && !is_invisible_format(*c))
        .collect()
}

fn is_invisible_format(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2069}'
            | '\u{FEFF}'
    )
}

/// Sanitize and trim `name`, then check it is non-empty and fits in
/// [`MAX_NAME_LENGTH_BYTES`]. Returns the name to store.
pub fn validate_display_name(
    name: &str,
    localizer: &dyn Localizer,
) -> Result<String, DisplayNameError> {
    let sanitized = sanitize_display_name(name);
    let trimmed = sanitized.trim();

    if trimmed.is_empty() {
        return Err(DisplayNameError::Empty {
            message: localizer.lookup(DISPLAY_NAME_EMPTY_KEY),
        });
    }
    if trimmed.len() > MAX_NAME_LENGTH_BYTES {
        return Err(DisplayNameError::TooLong {
            message: localizer.lookup(DISPLAY_NAME_TOO_LONG_KEY),
            bytes: trimmed.len(),
        });
    }
    Ok(trimmed.to_string())
}
