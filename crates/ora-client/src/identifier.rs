//! Oracle identifier handling.
//!
//! Unquoted identifiers are case-insensitive and stored upper case in the data
//! dictionary; double-quoted identifiers keep their case. Catalog lookups must
//! use the dictionary form, so every schema and table name is normalized here
//! before it reaches a bind value or a cache key.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

/// Maximum identifier length (12.2+ long identifiers).
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

static UNQUOTED_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[A-Za-z][A-Za-z0-9_$#]*$").unwrap()
});

/// Validate an unquoted identifier (schema, table, column name).
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidIdentifier(
            "identifier cannot be empty".into(),
        ));
    }

    if name.chars().count() > MAX_IDENTIFIER_LENGTH || !UNQUOTED_RE.is_match(name) {
        return Err(Error::InvalidIdentifier(format!(
            "invalid identifier '{name}': must start with a letter, \
             contain only alphanumerics/_/$/#, and be 1-{MAX_IDENTIFIER_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Convert a user-supplied identifier to its data dictionary form.
///
/// `orders` becomes `ORDERS`; `"Orders"` becomes `Orders`.
pub fn normalize_identifier(name: &str) -> Result<String> {
    let name = name.trim();

    if let Some(inner) = name.strip_prefix('"') {
        let inner = inner.strip_suffix('"').ok_or_else(|| {
            Error::InvalidIdentifier(format!("unterminated quoted identifier '{name}'"))
        })?;
        if inner.is_empty()
            || inner.contains(['"', '\0'])
            || inner.chars().count() > MAX_IDENTIFIER_LENGTH
        {
            return Err(Error::InvalidIdentifier(format!(
                "invalid quoted identifier '{name}'"
            )));
        }
        return Ok(inner.to_string());
    }

    validate_identifier(name)?;
    Ok(name.to_uppercase())
}

/// Render a dictionary-form identifier for use in SQL text.
///
/// Names that would survive case folding are written bare; anything else is
/// double-quoted.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    let bare = UNQUOTED_RE.is_match(name) && name == name.to_uppercase();
    if bare {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}
