//! Helpers for the `key|value` text carried inside string packets
//!
//! A protocol message is a set of newline separated `key|value` lines. When
//! the first line is `action|<name>` the message selects a server action,
//! anything else is free chat text.

/// Prefix marking a text packet as an action rather than chat
pub const ACTION_PREFIX: &str = "action|";

/// Returns the action name when `body` starts with `action|`.
///
/// The name runs up to the first line break, or to the end of the body.
pub fn action(body: &str) -> Option<&str> {
    let rest = body.strip_prefix(ACTION_PREFIX)?;
    Some(rest.split('\n').next().unwrap_or(rest))
}

/// Returns the value of the first line whose key is exactly `key`.
///
/// Keys are compared whole, never as substrings: `username|x` does not
/// answer a lookup for `name`, and a `name|` buried inside another line's
/// value is ignored. Well-formed messages give the same result either way.
pub fn field<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    body.lines()
        .filter_map(|line| line.split_once('|'))
        .find(|(k, _)| *k == key)
        .map(|(_, value)| value)
}
