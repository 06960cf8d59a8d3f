//! Escaping shared by the XML-based encoders.

use std::borrow::Cow;

/// Characters XML 1.0 does not allow in documents at all.
fn is_forbidden(ch: char) -> bool {
    matches!(
        ch,
        '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}'
    )
}

/// Escape the five reserved markup characters and drop characters XML cannot carry.
pub(crate) fn escape(raw: &str) -> Cow<'_, str> {
    if !raw.contains(|ch: char| matches!(ch, '&' | '<' | '>' | '"' | '\'') || is_forbidden(ch)) {
        return Cow::Borrowed(raw);
    }

    let mut escaped = String::with_capacity(raw.len() + 16);
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            forbidden if is_forbidden(forbidden) => {}
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}
