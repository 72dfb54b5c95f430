//! CSS serialization helpers.
//!
//! Generated selectors embed ids, classes and attribute values taken from the
//! page. They are escaped here so every generated selector parses and matches
//! the element it was generated from.

use std::fmt::Write;

/// Escapes a CSS identifier (id, class, attribute name).
///
/// Follows the CSSOM `CSS.escape()` serialization rules.
#[must_use]
pub fn escape_ident(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    let first = ident.chars().next();
    let single = ident.chars().count() == 1;

    for (position, ch) in ident.chars().enumerate() {
        match ch {
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1F}' | '\u{7F}' => push_hex(&mut out, ch),
            '0'..='9' if position == 0 => push_hex(&mut out, ch),
            '0'..='9' if position == 1 && first == Some('-') => push_hex(&mut out, ch),
            '-' if position == 0 && single => out.push_str("\\-"),
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => out.push(ch),
            _ if !ch.is_ascii() => out.push(ch),
            _ => {
                out.push('\\');
                out.push(ch);
            }
        }
    }

    out
}

/// Escapes a value for use inside a double-quoted attribute predicate.
#[must_use]
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());

    for ch in value.chars() {
        match ch {
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1F}' | '\u{7F}' => push_hex(&mut out, ch),
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Builds `[name="value"]`.
#[must_use]
pub fn attribute_predicate(name: &str, value: &str) -> String {
    format!("[{}=\"{}\"]", escape_ident(name), escape_string(value))
}

fn push_hex(out: &mut String, ch: char) {
    let _ = write!(out, "\\{:x} ", u32::from(ch));
}

// ============================================================================
// Tests
// ============================================================================
