//! Escaping for text embedded in a JavaScript template literal inside an
//! HTML `<script>` element.
//!
//! `escape_template_literal` and `unescape_template_literal` are exact
//! inverses. Escaped characters:
//! - `\` (escape introducer)
//! - `` ` `` (literal delimiter)
//! - `$` (interpolation trigger)
//! - `<` (would allow `</script>` to close the element)

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EscapeError {
    #[error("unsupported escape sequence at byte {0}")]
    BadEscape(usize),
    #[error("template literal is not terminated")]
    Unterminated,
}

/// Escape `raw` so it can sit between backticks in a script
pub fn escape_template_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / 8);
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' => out.push_str("\\$"),
            '<' => out.push_str("\\x3C"),
            other => out.push(other),
        }
    }
    out
}

/// Decode an escaped literal body, stopping at the first unescaped
/// backtick. Returns the decoded text and the byte offset of the closing
/// backtick within `escaped`.
pub fn unescape_template_literal(escaped: &str) -> Result<(String, usize), EscapeError> {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.char_indices();

    while let Some((pos, c)) = chars.next() {
        match c {
            '`' => return Ok((out, pos)),
            '\\' => match chars.next() {
                Some((_, '\\')) => out.push('\\'),
                Some((_, '`')) => out.push('`'),
                Some((_, '$')) => out.push('$'),
                Some((_, 'x')) => {
                    let hex: String = chars.by_ref().take(2).map(|(_, h)| h).collect();
                    if hex.eq_ignore_ascii_case("3c") {
                        out.push('<');
                    } else {
                        return Err(EscapeError::BadEscape(pos));
                    }
                }
                Some(_) => return Err(EscapeError::BadEscape(pos)),
                None => return Err(EscapeError::Unterminated),
            },
            other => out.push(other),
        }
    }

    Err(EscapeError::Unterminated)
}

/// Serialize a value as JSON that is safe to inline in a `<script>` element
pub fn script_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(value)?.replace('<', "\\u003c"))
}

/// Minimal HTML escaping for text placed in element content or attributes
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '`' => out.push_str("&#96;"),
            other => out.push(other),
        }
    }
    out
}

/// Inverse of [`escape_html`]
pub fn unescape_html(escaped: &str) -> String {
    escaped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#96;", "`")
        .replace("&amp;", "&")
}
