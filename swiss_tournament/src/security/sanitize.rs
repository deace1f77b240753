//! Player name sanitization.
//!
//! Names come from untrusted callers and end up in rendered pages elsewhere,
//! so markup is neutralized before storage: markup-significant characters are
//! escaped as HTML entities and control characters are dropped.

use crate::tournament::{TournamentError, TournamentResult};

/// Escape markup in a player name
///
/// Returns `InvalidName` when nothing printable is left.
///
/// # Example
///
/// ```
/// use swiss_tournament::security::sanitize_name;
///
/// let name = sanitize_name("<script>alert(1)</script>Bobby").unwrap();
/// assert_eq!(name, "&lt;script&gt;alert(1)&lt;/script&gt;Bobby");
/// ```
pub fn sanitize_name(raw: &str) -> TournamentResult<String> {
    let trimmed = raw.trim();
    let mut clean = String::with_capacity(trimmed.len());

    for c in trimmed.chars() {
        match c {
            '&' => clean.push_str("&amp;"),
            '<' => clean.push_str("&lt;"),
            '>' => clean.push_str("&gt;"),
            '"' => clean.push_str("&quot;"),
            '\'' => clean.push_str("&#x27;"),
            c if c.is_control() => {}
            c => clean.push(c),
        }
    }

    if clean.trim().is_empty() {
        return Err(TournamentError::InvalidName(raw.to_string()));
    }

    Ok(clean)
}
